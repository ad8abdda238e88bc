//! # folio-db: Storage and Sale Workflow for Folio
//!
//! This crate provides database access and the transactional sale workflow
//! for the Folio bookstore back-office. It uses SQLite with sqlx for async
//! operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Folio Data Flow                                  │
//! │                                                                         │
//! │  Front-end action (register sale)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     folio-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────────────────────────────────────────────┐    │   │
//! │  │   │  SaleCoordinator (coordinator.rs)                     │    │   │
//! │  │   │  begin → add_line → complete ─► ReceiptSink            │    │   │
//! │  │   └──────────────┬───────────────────────┬────────────────┘    │   │
//! │  │                  │ TxScope (scope.rs)    │                     │   │
//! │  │   ┌──────────────▼──────┐   ┌────────────▼───────┐             │   │
//! │  │   │  Repositories       │   │  inventory.rs      │             │   │
//! │  │   │  author, book,      │   │  adjust_stock      │             │   │
//! │  │   │  client, sale,      │   └────────────────────┘             │   │
//! │  │   │  line_item          │                                      │   │
//! │  │   └──────────┬──────────┘                                      │   │
//! │  │   ┌──────────▼──────────┐   ┌────────────────────┐             │   │
//! │  │   │  Database (pool.rs) │   │  Migrations        │             │   │
//! │  │   └─────────────────────┘   └────────────────────┘             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (folio.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`config`] - Environment-driven application settings
//! - [`error`] - Database error types
//! - [`repository`] - Stores for authors, books, clients, sales, line items
//! - [`inventory`] - Stock adjustment for physical books
//! - [`scope`] - Transactional scope
//! - [`coordinator`] - The sale workflow
//! - [`receipt`] - Receipt sinks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_db::{Database, DbConfig, FileReceiptSink, SaleCoordinator};
//! use folio_core::{PaymentMethod, SaleDraft};
//!
//! let db = Database::new(DbConfig::new("./folio.db")).await?;
//! let coordinator = SaleCoordinator::new(db, Arc::new(FileReceiptSink::new("./receipts")));
//!
//! let sale = coordinator.begin(client_id).await?;
//! let mut draft = SaleDraft::for_sale(&sale)?;
//! coordinator.add_line_by_id(&mut draft, book_id, 2).await?;
//! let done = coordinator.complete(draft, PaymentMethod::Card).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod coordinator;
pub mod error;
pub mod inventory;
pub mod migrations;
pub mod pool;
pub mod receipt;
pub mod repository;
pub mod scope;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError};
pub use coordinator::{CompletedSale, ReceiptOutcome, Restock, SaleCoordinator};
pub use error::{DbError, DbResult};
pub use inventory::StockAdjustment;
pub use pool::{Database, DbConfig};
pub use receipt::{FileReceiptSink, MemoryReceiptSink, ReceiptError, ReceiptHandle, ReceiptSink};
pub use scope::TxScope;

// Repository re-exports for convenience
pub use repository::author::AuthorRepository;
pub use repository::book::BookRepository;
pub use repository::client::ClientRepository;
pub use repository::line_item::LineItemRepository;
pub use repository::sale::SaleRepository;

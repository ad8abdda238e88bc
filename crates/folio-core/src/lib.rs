//! # folio-core: Pure Business Logic for Folio
//!
//! This crate is the domain heart of the Folio bookstore back-office. It
//! contains types and rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Folio Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Console / Desktop front-ends (thin)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ folio-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   sale    │  │  receipt  │  │   │
//! │  │   │  Book     │  │   Money   │  │ SaleDraft │  │  Receipt  │  │   │
//! │  │   │  Sale     │  │           │  │ add_line  │  │  render   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            folio-db (stores, inventory, coordinator)            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Author, Client, Book, Sale, SaleLineItem)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`sale`] - Sale draft: line pricing and stock checks before commit
//! - [`receipt`] - Receipt content and plain-text rendering
//! - [`validation`] - Field-level format checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use folio_core::money::Money;
//!
//! let price = Money::from_cents(1000); // 10.00
//! let subtotal = price.multiply_quantity(3);
//! assert_eq!(subtotal.to_string(), "30.00");
//! ```

pub mod error;
pub mod money;
pub mod receipt;
pub mod sale;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use receipt::{Receipt, ReceiptLine};
pub use sale::{LineCandidate, SaleDraft};
pub use types::*;

/// Maximum number of lines in a single sale.
pub const MAX_SALE_LINES: usize = 100;

/// Maximum quantity on a single line.
///
/// Guards against typing 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Number of digits in a client's document number.
pub const DOCUMENT_NUMBER_LEN: usize = 8;

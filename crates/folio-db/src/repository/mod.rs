//! # Repository Module
//!
//! Database repository implementations for Folio.
//!
//! ## Two Entry Points Per Store
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Front-end / seed                        SaleCoordinator               │
//! │       │                                        │                        │
//! │       │ db.books().get_by_id(7)                │ TxScope::begin(pool)  │
//! │       ▼                                        ▼                        │
//! │  BookRepository { pool }              book::get_by_id(scope.conn(), 7) │
//! │  ├── acquires a pooled connection           (connection-level fn,      │
//! │  └── calls the connection-level fn ───────►  runs inside the scope)    │
//! │                                                                         │
//! │  Stores never open transactions themselves.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`AuthorRepository`](author::AuthorRepository) - Author CRUD
//! - [`BookRepository`](book::BookRepository) - Catalog CRUD, ISBN lookup, restocking
//! - [`ClientRepository`](client::ClientRepository) - Client CRUD, document lookup
//! - [`SaleRepository`](sale::SaleRepository) - Sale headers
//! - [`LineItemRepository`](line_item::LineItemRepository) - Line-item ledger

pub mod author;
pub mod book;
pub mod client;
pub mod line_item;
pub mod sale;

use crate::error::DbError;

/// Replaces the column-only `UniqueViolation` produced by the sqlx mapping
/// with the business field and the offending value.
pub(crate) fn name_duplicate(err: DbError, field: &str, value: &str) -> DbError {
    match err {
        DbError::UniqueViolation { .. } => DbError::duplicate(field, value),
        other => other,
    }
}

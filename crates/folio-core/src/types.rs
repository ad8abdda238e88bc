//! # Domain Types
//!
//! Core domain types used throughout Folio.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────┐  writes  ┌─────────────────────────┐                  │
//! │  │   Author    │◄─────────│          Book           │                  │
//! │  └─────────────┘          │  format: BookFormat     │                  │
//! │                           │   ├── Physical {stock}  │                  │
//! │                           │   ├── Digital           │                  │
//! │                           │   └── Audiobook         │                  │
//! │                           └────────────▲────────────┘                  │
//! │                                        │ book_id                       │
//! │  ┌─────────────┐  buys   ┌─────────────┴───────────┐                  │
//! │  │   Client    │◄────────│   Sale ──owns──► SaleLineItem             │
//! │  └─────────────┘         │   status: SaleStatus    │                  │
//! │                          │   payment: PaymentMethod│                  │
//! │                          └─────────────────────────┘                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity is keyed by a storage-assigned surrogate key (`INTEGER
//! PRIMARY KEY`). Business identifiers (document number, ISBN) are unique
//! but never used as foreign keys.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

pub type AuthorId = i64;
pub type ClientId = i64;
pub type BookId = i64;
pub type SaleId = i64;
pub type LineItemId = i64;

// =============================================================================
// Author
// =============================================================================

/// A registered author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
    pub birth_date: NaiveDate,
    pub nationality: Option<String>,
    pub biography: Option<String>,
}

/// Input for registering or updating an author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuthor {
    pub name: String,
    pub birth_date: NaiveDate,
    pub nationality: Option<String>,
    pub biography: Option<String>,
}

// =============================================================================
// Client
// =============================================================================

/// A registered client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    /// Fixed-format numeric identity document, unique across clients.
    pub document_number: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Assigned by the store at creation, never by the caller.
    pub registered_at: DateTime<Utc>,
}

/// Input for registering or updating a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub document_number: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// Book Formats
// =============================================================================

/// Discriminant of [`BookFormat`], stored in the `kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum BookKind {
    Physical,
    Digital,
    Audiobook,
}

impl BookKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BookKind::Physical => "physical",
            BookKind::Digital => "digital",
            BookKind::Audiobook => "audiobook",
        }
    }
}

impl fmt::Display for BookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes only a printed book has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalDetails {
    /// Binding type, e.g. "hardcover" or "paperback".
    pub binding: String,
    /// Edition number, starting at 1.
    pub edition: i32,
    /// Copies on hand. Never negative.
    pub stock: i64,
}

/// Attributes only an e-book has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalDetails {
    /// File extension without the dot, e.g. "epub" or "pdf".
    pub file_extension: String,
    /// Whether the licence allows printing.
    pub printable: bool,
}

/// Attributes only an audiobook has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudiobookDetails {
    pub duration_minutes: i32,
    pub platform: String,
    pub narrator: String,
}

/// The variant-specific part of a book.
///
/// Only the attributes of the book's own kind exist; a physical book cannot
/// carry a narrator and a digital book has no stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BookFormat {
    Physical(PhysicalDetails),
    Digital(DigitalDetails),
    Audiobook(AudiobookDetails),
}

impl BookFormat {
    pub const fn kind(&self) -> BookKind {
        match self {
            BookFormat::Physical(_) => BookKind::Physical,
            BookFormat::Digital(_) => BookKind::Digital,
            BookFormat::Audiobook(_) => BookKind::Audiobook,
        }
    }

    /// Stock on hand; `None` for formats without inventory.
    pub const fn stock(&self) -> Option<i64> {
        match self {
            BookFormat::Physical(details) => Some(details.stock),
            _ => None,
        }
    }

    pub const fn is_physical(&self) -> bool {
        matches!(self, BookFormat::Physical(_))
    }
}

// =============================================================================
// Book
// =============================================================================

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub isbn: Option<String>,
    pub publisher: String,
    pub publication_year: i32,
    /// Price in cents (smallest currency unit).
    pub price_cents: i64,
    pub genre: Option<String>,
    pub format: BookFormat,
    pub author_id: AuthorId,
    pub registered_at: DateTime<Utc>,
}

impl Book {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn kind(&self) -> BookKind {
        self.format.kind()
    }

    #[inline]
    pub fn stock(&self) -> Option<i64> {
        self.format.stock()
    }
}

/// Input for registering or updating a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub isbn: Option<String>,
    pub publisher: String,
    pub publication_year: i32,
    pub price_cents: i64,
    pub genre: Option<String>,
    pub format: BookFormat,
    pub author_id: AuthorId,
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// ```text
/// Pending ──complete()──► Completed ──cancel()──► Cancelled
///    │                                               ▲
///    └─────────────────cancel()──────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Header exists, nothing committed against inventory.
    #[default]
    Pending,
    /// Line items persisted and stock decremented.
    Completed,
    /// Explicitly cancelled.
    Cancelled,
}

impl SaleStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Transfer,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the payment method typed by an operator.
impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "credit" | "debit" => Ok(PaymentMethod::Card),
            "transfer" | "bank transfer" => Ok(PaymentMethod::Transfer),
            other => Err(ValidationError::InvalidFormat {
                field: "payment method".to_string(),
                reason: format!("'{other}' is not one of cash, card, transfer"),
            }),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A sale header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: SaleId,
    pub client_id: ClientId,
    pub created_at: DateTime<Utc>,
    /// Zero while pending; sum of line subtotals once completed.
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Sale Line Item
// =============================================================================

/// A persisted line of a sale.
///
/// The unit price is a snapshot taken when the book was added to the sale.
/// `subtotal` is derived: every setter recomputes it, so
/// `subtotal == quantity × unit_price` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLineItem {
    id: LineItemId,
    sale_id: SaleId,
    book_id: BookId,
    quantity: i64,
    unit_price_cents: i64,
    subtotal_cents: i64,
}

impl SaleLineItem {
    /// Builds a line item, validating the quantity.
    pub fn new(
        id: LineItemId,
        sale_id: SaleId,
        book_id: BookId,
        quantity: i64,
        unit_price: Money,
    ) -> Result<Self, ValidationError> {
        let mut item = SaleLineItem {
            id,
            sale_id,
            book_id,
            quantity: 0,
            unit_price_cents: unit_price.cents(),
            subtotal_cents: 0,
        };
        item.set_quantity(quantity)?;
        Ok(item)
    }

    #[inline]
    pub fn id(&self) -> LineItemId {
        self.id
    }

    #[inline]
    pub fn sale_id(&self) -> SaleId {
        self.sale_id
    }

    #[inline]
    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    #[inline]
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// Changes the quantity and recomputes the subtotal.
    pub fn set_quantity(&mut self, quantity: i64) -> Result<(), ValidationError> {
        if quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            });
        }
        self.quantity = quantity;
        self.recompute_subtotal();
        Ok(())
    }

    /// Replaces the unit price and recomputes the subtotal.
    pub fn set_unit_price(&mut self, unit_price: Money) {
        self.unit_price_cents = unit_price.cents();
        self.recompute_subtotal();
    }

    fn recompute_subtotal(&mut self) {
        self.subtotal_cents = self.unit_price().multiply_quantity(self.quantity).cents();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

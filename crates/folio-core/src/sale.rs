//! # Sale Draft
//!
//! The in-memory intake phase of a sale: lines are priced and checked
//! against stock here, before anything touches storage.
//!
//! ## Sale Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  begin(client)        ── Pending header persisted (folio-db)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleDraft::add_line  ── THIS MODULE: validate qty, check stock,        │
//! │  SaleDraft::add_line     snapshot unit price, compute subtotal          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  complete(draft)      ── one transaction: lines + stock + header        │
//! │                          (folio-db coordinator)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Semantics
//! The unit price is copied from the book when the line is added. A later
//! catalog price change never reaches an in-flight or completed sale.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Book, BookId, BookKind, ClientId, Sale, SaleId, SaleStatus};
use crate::validation::validate_quantity;
use crate::MAX_SALE_LINES;

// =============================================================================
// Line Candidate
// =============================================================================

/// A priced line that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCandidate {
    book_id: BookId,
    title: String,
    kind: BookKind,
    quantity: i64,
    unit_price: Money,
    subtotal: Money,
}

impl LineCandidate {
    #[inline]
    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    /// Title at the time the line was added.
    #[inline]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[inline]
    pub fn kind(&self) -> BookKind {
        self.kind
    }

    /// Whether completing this line must decrement inventory.
    #[inline]
    pub fn is_physical(&self) -> bool {
        self.kind == BookKind::Physical
    }

    #[inline]
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        self.subtotal
    }
}

// =============================================================================
// Sale Draft
// =============================================================================

/// Lines collected for a pending sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDraft {
    sale_id: SaleId,
    client_id: ClientId,
    lines: Vec<LineCandidate>,
}

impl SaleDraft {
    /// Starts a draft for a pending sale header.
    ///
    /// ## Errors
    /// `InvalidSaleStatus` if the sale is not Pending.
    pub fn for_sale(sale: &Sale) -> CoreResult<Self> {
        if sale.status != SaleStatus::Pending {
            return Err(CoreError::InvalidSaleStatus {
                sale_id: sale.id,
                current_status: sale.status.to_string(),
                operation: "add lines".to_string(),
            });
        }

        Ok(SaleDraft {
            sale_id: sale.id,
            client_id: sale.client_id,
            lines: Vec::new(),
        })
    }

    #[inline]
    pub fn sale_id(&self) -> SaleId {
        self.sale_id
    }

    #[inline]
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    #[inline]
    pub fn lines(&self) -> &[LineCandidate] {
        &self.lines
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total quantity of `book_id` already in the draft.
    pub fn quantity_of(&self, book_id: BookId) -> i64 {
        self.lines
            .iter()
            .filter(|line| line.book_id == book_id)
            .map(|line| line.quantity)
            .sum()
    }

    /// Sum of all line subtotals. `add_line` refuses any line that would
    /// push this past `i64::MAX` cents.
    pub fn total(&self) -> Money {
        self.lines.iter().map(LineCandidate::subtotal).sum()
    }

    /// Adds `quantity` copies of `book` to the draft.
    ///
    /// ## Rules
    /// ```text
    /// quantity <= 0 or > 999             → ValidationError
    /// draft already has 100 lines        → ValidationError
    /// subtotal or sale total overflows   → ValidationError
    /// Physical and quantity (plus what
    ///   the draft already holds of this
    ///   book) exceeds stock              → InsufficientStock { available }
    /// Digital / Audiobook                → no stock check
    /// ```
    ///
    /// `available` is what remains for this draft: current stock minus the
    /// copies earlier lines already claim.
    pub fn add_line(&mut self, book: &Book, quantity: i64) -> CoreResult<&LineCandidate> {
        validate_quantity(quantity)?;

        if self.lines.len() >= MAX_SALE_LINES {
            return Err(ValidationError::OutOfRange {
                field: "sale lines".to_string(),
                min: 1,
                max: MAX_SALE_LINES as i64,
            }
            .into());
        }

        if let Some(stock) = book.stock() {
            let available = (stock - self.quantity_of(book.id)).max(0);
            if quantity > available {
                return Err(CoreError::InsufficientStock {
                    book_id: book.id,
                    title: book.title.clone(),
                    available,
                    requested: quantity,
                });
            }
        }

        let unit_price = book.price();
        let subtotal = unit_price
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "line subtotal".to_string(),
                min: 0,
                max: i64::MAX,
            })?;
        if self.total().checked_add(subtotal).is_none() {
            return Err(ValidationError::OutOfRange {
                field: "sale total".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        self.lines.push(LineCandidate {
            book_id: book.id,
            title: book.title.clone(),
            kind: book.kind(),
            quantity,
            unit_price,
            subtotal,
        });

        Ok(&self.lines[self.lines.len() - 1])
    }

    /// Drops every line for `book_id`. Returns how many lines were removed.
    pub fn remove_book(&mut self, book_id: BookId) -> usize {
        let before = self.lines.len();
        self.lines.retain(|line| line.book_id != book_id);
        before - self.lines.len()
    }

    /// Fails with `EmptySale` when there is nothing to complete.
    pub fn ensure_not_empty(&self) -> Result<(), ValidationError> {
        if self.lines.is_empty() {
            return Err(ValidationError::EmptySale);
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

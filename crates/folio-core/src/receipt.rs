//! # Receipt Model
//!
//! The logical content of a sale receipt and its plain-text rendering.
//! Where the text ends up (file, printer, memory) is decided by a receipt
//! sink in folio-db.
//!
//! ## Content
//! ```text
//! ┌────────────────────────────────────────┐
//! │             Folio Books                │  store name (optional)
//! │ Sale #12          2026-10-16 14:03:11  │  sale id, timestamp
//! │ Client: Ana Torres (45879632)          │  client name, document
//! │ Payment: cash      Status: completed   │
//! │────────────────────────────────────────│
//! │ Dune                                   │  one block per line
//! │   3 x 10.00                    30.00   │  qty × unit price = subtotal
//! │────────────────────────────────────────│
//! │ TOTAL                          30.00   │  equals Sale.total_cents
//! └────────────────────────────────────────┘
//! ```
//! The byte layout is not a compatibility contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Book, BookId, Client, PaymentMethod, Sale, SaleId, SaleLineItem, SaleStatus};

/// Width of the rendered receipt in characters.
pub const RECEIPT_WIDTH: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub title: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub store_name: Option<String>,
    pub sale_id: SaleId,
    pub timestamp: DateTime<Utc>,
    pub client_name: String,
    pub client_document: String,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub lines: Vec<ReceiptLine>,
    pub total: Money,
}

impl Receipt {
    /// Assembles a receipt from a stored sale.
    ///
    /// ## Errors
    /// - `NotFound` if a line references a book missing from `books`
    /// - `ReceiptMismatch` if the line subtotals do not add up to the sale
    ///   total
    pub fn build(
        sale: &Sale,
        client: &Client,
        items: &[SaleLineItem],
        books: &HashMap<BookId, Book>,
    ) -> CoreResult<Self> {
        let lines = items
            .iter()
            .map(|item| -> CoreResult<ReceiptLine> {
                let book = books
                    .get(&item.book_id())
                    .ok_or_else(|| CoreError::not_found("Book", item.book_id()))?;
                Ok(ReceiptLine {
                    title: book.title.clone(),
                    quantity: item.quantity(),
                    unit_price: item.unit_price(),
                    subtotal: item.subtotal(),
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        let lines_total = Money::checked_sum(lines.iter().map(|line| line.subtotal));
        if lines_total != Some(sale.total()) {
            return Err(CoreError::ReceiptMismatch {
                sale_id: sale.id,
                lines_total: lines_total.map_or(i64::MAX, |total| total.cents()),
                sale_total: sale.total_cents,
            });
        }

        Ok(Receipt {
            store_name: None,
            sale_id: sale.id,
            timestamp: sale.completed_at.unwrap_or(sale.created_at),
            client_name: client.name.clone(),
            client_document: client.document_number.clone(),
            payment_method: sale.payment_method,
            status: sale.status,
            lines,
            total: sale.total(),
        })
    }

    /// Sets the store name printed in the header.
    pub fn with_store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = Some(name.into());
        self
    }

    /// Renders the receipt as plain text.
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

/// The plain-text layout shown in the module docs.
impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(RECEIPT_WIDTH);

        if let Some(store) = &self.store_name {
            writeln!(f, "{:^width$}", store, width = RECEIPT_WIDTH)?;
        }
        let sale_label = format!("Sale #{}", self.sale_id);
        let stamp = self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        writeln!(f, "{}", two_columns(&sale_label, &stamp))?;
        writeln!(f, "Client: {} ({})", self.client_name, self.client_document)?;
        writeln!(
            f,
            "{}",
            two_columns(
                &format!("Payment: {}", self.payment_method),
                &format!("Status: {}", self.status)
            )
        )?;
        writeln!(f, "{rule}")?;

        for line in &self.lines {
            writeln!(f, "{}", line.title)?;
            writeln!(
                f,
                "{}",
                two_columns(
                    &format!("  {} x {}", line.quantity, line.unit_price),
                    &line.subtotal.to_string()
                )
            )?;
        }

        writeln!(f, "{rule}")?;
        writeln!(f, "{}", two_columns("TOTAL", &self.total.to_string()))
    }
}

/// Left text, right text, padded to the receipt width.
fn two_columns(left: &str, right: &str) -> String {
    let used = left.chars().count() + right.chars().count();
    let pad = RECEIPT_WIDTH.saturating_sub(used).max(1);
    format!("{left}{}{right}", " ".repeat(pad))
}

// =============================================================================
// Unit Tests
// =============================================================================

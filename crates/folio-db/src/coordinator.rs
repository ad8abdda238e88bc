//! # Sale Transaction Coordinator
//!
//! Drives a sale from an empty header to a committed, receipted record.
//!
//! ## Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  begin(client)            Pending header, total 0      (no scope)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  add_line(draft, ..)      SaleDraft in memory          (no storage)    │
//! │       │  × n                                                            │
//! │       ▼                                                                 │
//! │  complete(draft, pay)     ┌──────── TxScope ─────────┐                  │
//! │                           │ for each line:           │                  │
//! │                           │   ledger insert          │                  │
//! │                           │   stock -= quantity      │                  │
//! │                           │ header → Completed       │                  │
//! │                           └─── COMMIT / ROLLBACK ────┘                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  receipt sink             after commit; failure is reported, the sale  │
//! │                           stays Completed                              │
//! │                                                                         │
//! │  cancel(sale)             status → Cancelled, stock back if Completed  │
//! │  cancel_or_delete(sale)   lines + header gone, stock back if Completed │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The coordinator is the only component that opens transactional scopes.
//! Everything between `TxScope::begin` and `TxScope::finish` runs on the
//! scope's connection, so a failure at any point leaves no line item, no
//! stock change and no status change behind.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::inventory::{self, StockAdjustment};
use crate::pool::Database;
use crate::receipt::{ReceiptHandle, ReceiptSink};
use crate::repository::{book, client, line_item, sale};
use crate::scope::TxScope;
use folio_core::{
    Book, BookId, ClientId, LineCandidate, Money, PaymentMethod, Receipt, Sale, SaleDraft, SaleId,
    SaleLineItem, SaleStatus, ValidationError,
};

/// What happened to the receipt of a committed sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptOutcome {
    Rendered(ReceiptHandle),
    Failed(String),
}

impl ReceiptOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, ReceiptOutcome::Rendered(_))
    }
}

/// A sale that has been committed.
#[derive(Debug, Clone)]
pub struct CompletedSale {
    pub sale: Sale,
    pub items: Vec<SaleLineItem>,
    pub receipt: ReceiptOutcome,
}

/// Stock given back by a cancellation or deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restock {
    pub book_id: BookId,
    pub quantity: i64,
    pub stock: i64,
}

pub struct SaleCoordinator {
    db: Database,
    sink: Arc<dyn ReceiptSink>,
    store_name: Option<String>,
}

impl SaleCoordinator {
    pub fn new(db: Database, sink: Arc<dyn ReceiptSink>) -> Self {
        SaleCoordinator {
            db,
            sink,
            store_name: None,
        }
    }

    /// Prints `name` at the top of every receipt.
    pub fn with_store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = Some(name.into());
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Begin / Add Line
    // =========================================================================

    /// Opens a Pending sale for `client_id`.
    ///
    /// Start collecting lines with `SaleDraft::for_sale(&sale)`.
    ///
    /// ## Errors
    /// `NotFound` if the client doesn't exist.
    pub async fn begin(&self, client_id: ClientId) -> DbResult<Sale> {
        let mut conn = self.db.pool().acquire().await?;
        if client::get_by_id(&mut conn, client_id).await?.is_none() {
            return Err(DbError::not_found("Client", client_id));
        }

        let sale = sale::insert_pending(&mut conn, client_id, Utc::now()).await?;
        info!(sale_id = sale.id, client_id, "Sale begun");

        Ok(sale)
    }

    /// An empty draft for a sale that is still Pending.
    pub async fn draft(&self, sale_id: SaleId) -> DbResult<SaleDraft> {
        let sale = self.load_sale(sale_id).await?;
        Ok(SaleDraft::for_sale(&sale)?)
    }

    /// Adds `quantity` copies of `book` to the draft. Nothing is written.
    ///
    /// ## Errors
    /// - `Validation` for a quantity outside 1..=999
    /// - `InsufficientStock` if the draft would claim more physical copies
    ///   than the book has
    pub fn add_line(
        &self,
        draft: &mut SaleDraft,
        book: &Book,
        quantity: i64,
    ) -> DbResult<LineCandidate> {
        Ok(draft.add_line(book, quantity)?.clone())
    }

    /// Like [`add_line`](Self::add_line), looking the book up first so the
    /// stock check sees the current value.
    pub async fn add_line_by_id(
        &self,
        draft: &mut SaleDraft,
        book_id: BookId,
        quantity: i64,
    ) -> DbResult<LineCandidate> {
        let book = self
            .db
            .books()
            .get_by_id(book_id)
            .await?
            .ok_or_else(|| DbError::not_found("Book", book_id))?;

        self.add_line(draft, &book, quantity)
    }

    // =========================================================================
    // Complete
    // =========================================================================

    /// Commits the draft: line items, stock decrements and the Completed
    /// header as one atomic block, then hands the receipt to the sink.
    ///
    /// ## Errors
    /// - `Validation(EmptySale)` for a draft without lines (storage untouched)
    /// - `NotFound` / `InvalidSaleStatus` if the header is gone or no longer
    ///   Pending
    /// - `TransactionFailed(cause)` if anything inside the block failed,
    ///   e.g. `InsufficientStock` because another sale took the last copies
    /// - `RollbackFailed` if undoing the block failed as well
    ///
    /// A receipt failure is not an error: see [`CompletedSale::receipt`].
    pub async fn complete(
        &self,
        draft: SaleDraft,
        payment_method: PaymentMethod,
    ) -> DbResult<CompletedSale> {
        draft.ensure_not_empty()?;

        let header = self.load_sale(draft.sale_id()).await?;
        if header.status != SaleStatus::Pending {
            return Err(DbError::InvalidSaleStatus {
                sale_id: header.id,
                current_status: header.status.to_string(),
                operation: "complete".to_string(),
            });
        }

        let mut scope = TxScope::begin(self.db.pool()).await?;
        let result = Self::write_sale(&mut scope, &draft, payment_method, Utc::now()).await;
        let (sale, items) = scope.finish(result).await?;

        info!(
            sale_id = sale.id,
            lines = items.len(),
            total = %sale.total(),
            payment_method = %sale.payment_method,
            "Sale completed"
        );

        let receipt = self.deliver_receipt(&sale, &items).await;
        Ok(CompletedSale {
            sale,
            items,
            receipt,
        })
    }

    /// Body of the atomic block of [`complete`](Self::complete).
    async fn write_sale(
        scope: &mut TxScope,
        draft: &SaleDraft,
        payment_method: PaymentMethod,
        completed_at: DateTime<Utc>,
    ) -> DbResult<(Sale, Vec<SaleLineItem>)> {
        let mut items = Vec::with_capacity(draft.lines().len());

        for line in draft.lines() {
            let item = line_item::insert(
                scope.conn(),
                draft.sale_id(),
                line.book_id(),
                line.quantity(),
                line.unit_price(),
            )
            .await?;

            if line.is_physical() {
                inventory::adjust_stock(scope.conn(), line.book_id(), -line.quantity()).await?;
            }

            items.push(item);
        }

        let total = Money::checked_sum(items.iter().map(SaleLineItem::subtotal)).ok_or_else(|| {
            ValidationError::OutOfRange {
                field: "sale total".to_string(),
                min: 0,
                max: i64::MAX,
            }
        })?;
        let sale = sale::mark_completed(
            scope.conn(),
            draft.sale_id(),
            total,
            payment_method,
            completed_at,
        )
        .await?;

        Ok((sale, items))
    }

    // =========================================================================
    // Cancel / Delete
    // =========================================================================

    /// Marks a sale Cancelled, keeping its lines for history.
    ///
    /// A Completed sale gives its physical copies back in the same atomic
    /// block; a Pending one never took any.
    ///
    /// ## Errors
    /// `InvalidSaleStatus` if the sale is already Cancelled.
    pub async fn cancel(&self, sale_id: SaleId) -> DbResult<(Sale, Vec<Restock>)> {
        let current = self.load_sale(sale_id).await?;
        if current.status == SaleStatus::Cancelled {
            return Err(DbError::InvalidSaleStatus {
                sale_id,
                current_status: current.status.to_string(),
                operation: "cancel".to_string(),
            });
        }

        let mut scope = TxScope::begin(self.db.pool()).await?;
        let result = Self::cancel_in_scope(&mut scope, sale_id, current.status).await;
        let (sale, restocked) = scope.finish(result).await?;

        info!(
            sale_id,
            previous = %current.status,
            restocked = restocked.len(),
            "Sale cancelled"
        );
        Ok((sale, restocked))
    }

    /// Removes a sale and its lines.
    ///
    /// Stock is given back only if the sale was Completed: a Pending sale
    /// never took any, and a Cancelled one already returned it.
    pub async fn cancel_or_delete(&self, sale_id: SaleId) -> DbResult<Vec<Restock>> {
        let current = self.load_sale(sale_id).await?;

        let mut scope = TxScope::begin(self.db.pool()).await?;
        let result = Self::delete_in_scope(&mut scope, sale_id, current.status).await;
        let restocked = scope.finish(result).await?;

        info!(
            sale_id,
            previous = %current.status,
            restocked = restocked.len(),
            "Sale deleted"
        );
        Ok(restocked)
    }

    async fn cancel_in_scope(
        scope: &mut TxScope,
        sale_id: SaleId,
        from: SaleStatus,
    ) -> DbResult<(Sale, Vec<Restock>)> {
        let restocked = if from == SaleStatus::Completed {
            Self::restore_stock(scope, sale_id).await?
        } else {
            Vec::new()
        };
        let sale = sale::set_status(scope.conn(), sale_id, from, SaleStatus::Cancelled).await?;
        Ok((sale, restocked))
    }

    async fn delete_in_scope(
        scope: &mut TxScope,
        sale_id: SaleId,
        status: SaleStatus,
    ) -> DbResult<Vec<Restock>> {
        // Re-read inside the scope: the status decides whether stock returns.
        let stored = sale::get_by_id(scope.conn(), sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;
        if stored.status != status {
            return Err(DbError::InvalidSaleStatus {
                sale_id,
                current_status: stored.status.to_string(),
                operation: format!("delete as {status}"),
            });
        }

        let restocked = if status == SaleStatus::Completed {
            Self::restore_stock(scope, sale_id).await?
        } else {
            Vec::new()
        };
        line_item::delete_for_sale(scope.conn(), sale_id).await?;
        sale::delete(scope.conn(), sale_id).await?;
        Ok(restocked)
    }

    /// Adds every physical line of `sale_id` back to stock.
    async fn restore_stock(scope: &mut TxScope, sale_id: SaleId) -> DbResult<Vec<Restock>> {
        let items = line_item::list_by_sale(scope.conn(), sale_id).await?;
        let mut restocked = Vec::new();

        for item in items {
            match inventory::adjust_stock(scope.conn(), item.book_id(), item.quantity()).await? {
                StockAdjustment::Applied { book_id, stock } => restocked.push(Restock {
                    book_id,
                    quantity: item.quantity(),
                    stock,
                }),
                StockAdjustment::NotPhysical => {}
            }
        }

        Ok(restocked)
    }

    // =========================================================================
    // Receipts / Housekeeping
    // =========================================================================

    /// Renders the receipt of a Completed sale again.
    ///
    /// ## Errors
    /// `InvalidSaleStatus` unless the sale is Completed.
    pub async fn reissue_receipt(&self, sale_id: SaleId) -> DbResult<ReceiptOutcome> {
        let sale = self.load_sale(sale_id).await?;
        if sale.status != SaleStatus::Completed {
            return Err(DbError::InvalidSaleStatus {
                sale_id,
                current_status: sale.status.to_string(),
                operation: "reissue receipt".to_string(),
            });
        }

        let items = self.db.line_items().list_by_sale(sale_id).await?;
        Ok(self.deliver_receipt(&sale, &items).await)
    }

    /// Deletes Pending sales created before `cutoff`. They hold no stock.
    pub async fn purge_stale_pending(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let mut scope = TxScope::begin(self.db.pool()).await?;
        let result = sale::purge_pending_before(scope.conn(), cutoff).await;
        let purged = scope.finish(result).await?;

        if purged > 0 {
            info!(purged, %cutoff, "Stale pending sales purged");
        }
        Ok(purged)
    }

    async fn load_sale(&self, sale_id: SaleId) -> DbResult<Sale> {
        self.db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))
    }

    /// Builds the receipt and hands it to the sink. Never fails: problems
    /// are logged and reported in the outcome.
    async fn deliver_receipt(&self, sale: &Sale, items: &[SaleLineItem]) -> ReceiptOutcome {
        let receipt = match self.build_receipt(sale, items).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(sale_id = sale.id, error = %e, "Could not assemble receipt");
                return ReceiptOutcome::Failed(e.to_string());
            }
        };

        match self.sink.render(&receipt).await {
            Ok(handle) => ReceiptOutcome::Rendered(handle),
            Err(e) => {
                warn!(sale_id = sale.id, error = %e, "Receipt sink failed");
                ReceiptOutcome::Failed(e.to_string())
            }
        }
    }

    async fn build_receipt(&self, sale: &Sale, items: &[SaleLineItem]) -> DbResult<Receipt> {
        let mut conn = self.db.pool().acquire().await?;

        let client = client::get_by_id(&mut conn, sale.client_id)
            .await?
            .ok_or_else(|| DbError::not_found("Client", sale.client_id))?;

        let mut books: HashMap<BookId, Book> = HashMap::new();
        for item in items {
            if books.contains_key(&item.book_id()) {
                continue;
            }
            if let Some(found) = book::get_by_id(&mut conn, item.book_id()).await? {
                books.insert(found.id, found);
            }
        }

        let receipt = Receipt::build(sale, &client, items, &books)?;
        Ok(match &self.store_name {
            Some(name) => receipt.with_store_name(name.clone()),
            None => receipt,
        })
    }
}

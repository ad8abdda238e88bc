//! End-to-end tests of the sale workflow against an in-memory database.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;

use folio_core::{
    BookFormat, BookId, ClientId, DigitalDetails, NewAuthor, NewBook, NewClient, PaymentMethod,
    PhysicalDetails, Receipt, SaleDraft, SaleStatus, ValidationError,
};
use folio_db::{
    Database, DbConfig, DbError, MemoryReceiptSink, ReceiptError, ReceiptHandle, ReceiptOutcome,
    ReceiptSink, SaleCoordinator,
};

// =============================================================================
// Fixtures
// =============================================================================

struct Shop {
    db: Database,
    sink: Arc<MemoryReceiptSink>,
    coordinator: SaleCoordinator,
    client: ClientId,
    /// Physical, stock 5, price 10.00
    printed: BookId,
    /// Digital, price 7.00
    ebook: BookId,
}

async fn shop() -> Shop {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();

    let author = db
        .authors()
        .insert(&NewAuthor {
            name: "Frank Herbert".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1920, 10, 8).unwrap(),
            nationality: Some("American".to_string()),
            biography: None,
        })
        .await
        .unwrap();

    let client = db
        .clients()
        .insert(&NewClient {
            name: "Ana Torres".to_string(),
            document_number: "45879632".to_string(),
            email: None,
            phone: None,
        })
        .await
        .unwrap();

    let printed = db
        .books()
        .insert(&book(
            "Dune",
            1000,
            author.id,
            BookFormat::Physical(PhysicalDetails {
                binding: "paperback".to_string(),
                edition: 1,
                stock: 5,
            }),
        ))
        .await
        .unwrap();

    let ebook = db
        .books()
        .insert(&book(
            "Dune Messiah",
            700,
            author.id,
            BookFormat::Digital(DigitalDetails {
                file_extension: "epub".to_string(),
                printable: false,
            }),
        ))
        .await
        .unwrap();

    let sink = Arc::new(MemoryReceiptSink::new());
    let coordinator =
        SaleCoordinator::new(db.clone(), sink.clone()).with_store_name("Folio Books");

    Shop {
        db,
        sink,
        coordinator,
        client: client.id,
        printed: printed.id,
        ebook: ebook.id,
    }
}

fn book(title: &str, price_cents: i64, author_id: i64, format: BookFormat) -> NewBook {
    NewBook {
        title: title.to_string(),
        isbn: None,
        publisher: "Chilton".to_string(),
        publication_year: 1965,
        price_cents,
        genre: None,
        format,
        author_id,
    }
}

impl Shop {
    async fn stock(&self, book_id: BookId) -> Option<i64> {
        self.db
            .books()
            .get_by_id(book_id)
            .await
            .unwrap()
            .unwrap()
            .stock()
    }

    async fn status(&self, sale_id: i64) -> Option<SaleStatus> {
        self.db
            .sales()
            .get_by_id(sale_id)
            .await
            .unwrap()
            .map(|sale| sale.status)
    }

    async fn draft(&self) -> SaleDraft {
        let sale = self.coordinator.begin(self.client).await.unwrap();
        SaleDraft::for_sale(&sale).unwrap()
    }
}

/// Sink that refuses everything.
struct BrokenPrinter;

#[async_trait]
impl ReceiptSink for BrokenPrinter {
    async fn render(&self, _receipt: &Receipt) -> Result<ReceiptHandle, ReceiptError> {
        Err(ReceiptError::Rejected("printer offline".to_string()))
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn completes_a_physical_sale() {
    let shop = shop().await;
    let mut draft = shop.draft().await;

    shop.coordinator
        .add_line_by_id(&mut draft, shop.printed, 3)
        .await
        .unwrap();
    let done = shop
        .coordinator
        .complete(draft, PaymentMethod::Cash)
        .await
        .unwrap();

    assert_eq!(done.sale.total_cents, 3000);
    assert_eq!(done.sale.status, SaleStatus::Completed);
    assert_eq!(done.sale.payment_method, PaymentMethod::Cash);
    assert!(done.sale.completed_at.is_some());
    assert_eq!(done.items.len(), 1);
    assert_eq!(shop.stock(shop.printed).await, Some(2));

    // Stored state matches what was returned.
    let stored = shop.db.sales().get_by_id(done.sale.id).await.unwrap().unwrap();
    assert_eq!(stored, done.sale);

    assert!(done.receipt.is_rendered());
    let text = shop.sink.last().await.unwrap();
    assert!(text.contains("Folio Books"));
    assert!(text.contains("Ana Torres (45879632)"));
    assert!(text.contains("3 x 10.00"));
    assert!(text.lines().last().unwrap().ends_with("30.00"));
}

#[tokio::test]
async fn insufficient_stock_is_rejected_while_adding() {
    let shop = shop().await;
    let mut draft = shop.draft().await;
    let sale_id = draft.sale_id();

    let err = shop
        .coordinator
        .add_line_by_id(&mut draft, shop.printed, 10)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DbError::InsufficientStock {
            available: 5,
            requested: 10,
            ..
        }
    ));
    assert!(draft.is_empty());
    assert_eq!(shop.stock(shop.printed).await, Some(5));
    assert!(shop.db.line_items().list_by_sale(sale_id).await.unwrap().is_empty());
    assert_eq!(shop.status(sale_id).await, Some(SaleStatus::Pending));
}

#[tokio::test]
async fn digital_lines_leave_inventory_alone() {
    let shop = shop().await;
    let mut draft = shop.draft().await;

    shop.coordinator
        .add_line_by_id(&mut draft, shop.ebook, 2)
        .await
        .unwrap();
    let done = shop
        .coordinator
        .complete(draft, PaymentMethod::Transfer)
        .await
        .unwrap();

    assert_eq!(done.sale.total_cents, 1400);
    assert_eq!(shop.stock(shop.ebook).await, None);
    assert_eq!(shop.stock(shop.printed).await, Some(5));
}

#[tokio::test]
async fn storage_fault_rolls_back_everything() {
    let shop = shop().await;

    // The second line of any sale fails to insert.
    sqlx::query(
        r#"
        CREATE TRIGGER fail_second_line
        BEFORE INSERT ON sale_line_items
        WHEN (SELECT COUNT(*) FROM sale_line_items WHERE sale_id = NEW.sale_id) >= 1
        BEGIN
            SELECT RAISE(ABORT, 'simulated storage fault');
        END
        "#,
    )
    .execute(shop.db.pool())
    .await
    .unwrap();

    let mut draft = shop.draft().await;
    let sale_id = draft.sale_id();
    shop.coordinator
        .add_line_by_id(&mut draft, shop.printed, 3)
        .await
        .unwrap();
    shop.coordinator
        .add_line_by_id(&mut draft, shop.ebook, 1)
        .await
        .unwrap();

    let err = shop
        .coordinator
        .complete(draft, PaymentMethod::Card)
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::TransactionFailed(_)));
    assert!(matches!(
        err.root_cause(),
        DbError::QueryFailed(msg) if msg.contains("simulated storage fault")
    ));

    assert_eq!(shop.stock(shop.printed).await, Some(5));
    assert!(shop.db.line_items().list_by_sale(sale_id).await.unwrap().is_empty());
    let sale = shop.db.sales().get_by_id(sale_id).await.unwrap().unwrap();
    assert_eq!(sale.status, SaleStatus::Pending);
    assert_eq!(sale.total_cents, 0);
    assert!(shop.sink.rendered().await.is_empty());
}

#[tokio::test]
async fn deleting_a_completed_sale_restores_stock() {
    let shop = shop().await;
    let mut draft = shop.draft().await;
    shop.coordinator
        .add_line_by_id(&mut draft, shop.printed, 3)
        .await
        .unwrap();
    let done = shop
        .coordinator
        .complete(draft, PaymentMethod::Cash)
        .await
        .unwrap();
    assert_eq!(shop.stock(shop.printed).await, Some(2));

    let restocked = shop.coordinator.cancel_or_delete(done.sale.id).await.unwrap();

    assert_eq!(restocked.len(), 1);
    assert_eq!(restocked[0].stock, 5);
    assert_eq!(shop.stock(shop.printed).await, Some(5));
    assert_eq!(shop.status(done.sale.id).await, None);
    assert!(shop
        .db
        .line_items()
        .list_by_sale(done.sale.id)
        .await
        .unwrap()
        .is_empty());
}

// =============================================================================
// Stock Races and Lifecycle
// =============================================================================

#[tokio::test]
async fn second_sale_for_the_last_copies_fails_at_commit() {
    let shop = shop().await;

    let mut first = shop.draft().await;
    let mut second = shop.draft().await;
    let second_id = second.sale_id();

    // Both drafts saw 5 copies.
    shop.coordinator
        .add_line_by_id(&mut first, shop.printed, 3)
        .await
        .unwrap();
    shop.coordinator
        .add_line_by_id(&mut second, shop.printed, 3)
        .await
        .unwrap();

    shop.coordinator
        .complete(first, PaymentMethod::Cash)
        .await
        .unwrap();
    let err = shop
        .coordinator
        .complete(second, PaymentMethod::Cash)
        .await
        .unwrap_err();

    assert!(matches!(
        err.root_cause(),
        DbError::InsufficientStock {
            available: 2,
            requested: 3,
            ..
        }
    ));
    assert_eq!(shop.stock(shop.printed).await, Some(2));
    assert_eq!(shop.status(second_id).await, Some(SaleStatus::Pending));
    assert!(shop.db.line_items().list_by_sale(second_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn repeated_lines_count_against_the_same_stock() {
    let shop = shop().await;
    let mut draft = shop.draft().await;

    shop.coordinator
        .add_line_by_id(&mut draft, shop.printed, 4)
        .await
        .unwrap();
    let err = shop
        .coordinator
        .add_line_by_id(&mut draft, shop.printed, 2)
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::InsufficientStock { available: 1, .. }));
    assert_eq!(draft.lines().len(), 1);
}

#[tokio::test]
async fn empty_sale_cannot_complete() {
    let shop = shop().await;
    let draft = shop.draft().await;
    let sale_id = draft.sale_id();

    let err = shop
        .coordinator
        .complete(draft, PaymentMethod::Cash)
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::Validation(ValidationError::EmptySale)));
    assert_eq!(shop.status(sale_id).await, Some(SaleStatus::Pending));
}

#[tokio::test]
async fn invalid_quantities_are_rejected() {
    let shop = shop().await;
    let mut draft = shop.draft().await;

    for quantity in [0, -1, 1000] {
        let err = shop
            .coordinator
            .add_line_by_id(&mut draft, shop.ebook, quantity)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)), "quantity {quantity}");
    }
    assert!(draft.is_empty());
}

#[tokio::test]
async fn unknown_client_or_book() {
    let shop = shop().await;

    assert!(matches!(
        shop.coordinator.begin(shop.client + 100).await,
        Err(DbError::NotFound { .. })
    ));

    let mut draft = shop.draft().await;
    assert!(matches!(
        shop.coordinator.add_line_by_id(&mut draft, 999, 1).await,
        Err(DbError::NotFound { .. })
    ));
}

#[tokio::test]
async fn a_sale_completes_only_once() {
    let shop = shop().await;
    let mut draft = shop.draft().await;
    shop.coordinator
        .add_line_by_id(&mut draft, shop.printed, 1)
        .await
        .unwrap();

    shop.coordinator
        .complete(draft.clone(), PaymentMethod::Cash)
        .await
        .unwrap();
    let err = shop
        .coordinator
        .complete(draft, PaymentMethod::Cash)
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::InvalidSaleStatus { .. }));
    assert_eq!(shop.stock(shop.printed).await, Some(4));
}

#[tokio::test]
async fn cancelling_a_completed_sale_returns_stock_once() {
    let shop = shop().await;
    let mut draft = shop.draft().await;
    shop.coordinator
        .add_line_by_id(&mut draft, shop.printed, 2)
        .await
        .unwrap();
    let done = shop
        .coordinator
        .complete(draft, PaymentMethod::Card)
        .await
        .unwrap();
    assert_eq!(shop.stock(shop.printed).await, Some(3));

    let (cancelled, restocked) = shop.coordinator.cancel(done.sale.id).await.unwrap();
    assert_eq!(cancelled.status, SaleStatus::Cancelled);
    assert_eq!(restocked.len(), 1);
    assert_eq!(shop.stock(shop.printed).await, Some(5));

    // Lines stay for history.
    assert_eq!(
        shop.db
            .line_items()
            .list_by_sale(done.sale.id)
            .await
            .unwrap()
            .len(),
        1
    );

    assert!(matches!(
        shop.coordinator.cancel(done.sale.id).await,
        Err(DbError::InvalidSaleStatus { .. })
    ));

    // Deleting the cancelled sale must not restock a second time.
    let restocked = shop.coordinator.cancel_or_delete(done.sale.id).await.unwrap();
    assert!(restocked.is_empty());
    assert_eq!(shop.stock(shop.printed).await, Some(5));
}

#[tokio::test]
async fn cancelling_or_deleting_a_pending_sale_touches_no_stock() {
    let shop = shop().await;

    let pending = shop.draft().await;
    let (cancelled, restocked) = shop.coordinator.cancel(pending.sale_id()).await.unwrap();
    assert_eq!(cancelled.status, SaleStatus::Cancelled);
    assert!(restocked.is_empty());

    let other = shop.draft().await;
    assert!(shop
        .coordinator
        .cancel_or_delete(other.sale_id())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(shop.status(other.sale_id()).await, None);
    assert_eq!(shop.stock(shop.printed).await, Some(5));
}

#[tokio::test]
async fn receipt_failure_does_not_undo_the_sale() {
    let shop = shop().await;
    let coordinator = SaleCoordinator::new(shop.db.clone(), Arc::new(BrokenPrinter));

    let sale = coordinator.begin(shop.client).await.unwrap();
    let mut draft = SaleDraft::for_sale(&sale).unwrap();
    coordinator
        .add_line_by_id(&mut draft, shop.printed, 1)
        .await
        .unwrap();
    let done = coordinator
        .complete(draft, PaymentMethod::Cash)
        .await
        .unwrap();

    assert!(matches!(&done.receipt, ReceiptOutcome::Failed(msg) if msg.contains("printer offline")));
    assert_eq!(shop.status(sale.id).await, Some(SaleStatus::Completed));
    assert_eq!(shop.stock(shop.printed).await, Some(4));
}

#[tokio::test]
async fn receipts_can_be_reissued_for_completed_sales_only() {
    let shop = shop().await;

    let pending = shop.draft().await;
    assert!(matches!(
        shop.coordinator.reissue_receipt(pending.sale_id()).await,
        Err(DbError::InvalidSaleStatus { .. })
    ));

    let mut draft = shop.draft().await;
    shop.coordinator
        .add_line_by_id(&mut draft, shop.printed, 2)
        .await
        .unwrap();
    let done = shop
        .coordinator
        .complete(draft, PaymentMethod::Cash)
        .await
        .unwrap();

    let again = shop.coordinator.reissue_receipt(done.sale.id).await.unwrap();
    assert_eq!(again, ReceiptOutcome::Rendered(ReceiptHandle::Memory(1)));

    let rendered = shop.sink.rendered().await;
    assert_eq!(rendered.len(), 2);
    assert_eq!(rendered[0], rendered[1]);
}

#[tokio::test]
async fn stale_pending_sales_are_purged() {
    let shop = shop().await;

    let stale = shop.draft().await;
    let mut kept = shop.draft().await;
    shop.coordinator
        .add_line_by_id(&mut kept, shop.printed, 1)
        .await
        .unwrap();
    let done = shop
        .coordinator
        .complete(kept, PaymentMethod::Cash)
        .await
        .unwrap();

    let purged = shop
        .coordinator
        .purge_stale_pending(Utc::now() + Duration::seconds(1))
        .await
        .unwrap();

    assert_eq!(purged, 1);
    assert_eq!(shop.status(stale.sale_id()).await, None);
    assert_eq!(shop.status(done.sale.id).await, Some(SaleStatus::Completed));
}

// =============================================================================
// Money and Ledger Properties
// =============================================================================

#[tokio::test]
async fn totals_are_exact_and_reconcile_with_the_ledger() {
    let shop = shop().await;
    let cheap = shop
        .db
        .books()
        .insert(&book(
            "Pamphlet",
            10, // 0.10
            shop.db.authors().list().await.unwrap()[0].id,
            BookFormat::Physical(PhysicalDetails {
                binding: "stapled".to_string(),
                edition: 1,
                stock: 100,
            }),
        ))
        .await
        .unwrap();

    let mut draft = shop.draft().await;
    shop.coordinator
        .add_line_by_id(&mut draft, cheap.id, 3)
        .await
        .unwrap();
    shop.coordinator
        .add_line_by_id(&mut draft, shop.ebook, 1)
        .await
        .unwrap();
    shop.coordinator
        .add_line_by_id(&mut draft, shop.printed, 2)
        .await
        .unwrap();
    let done = shop
        .coordinator
        .complete(draft, PaymentMethod::Card)
        .await
        .unwrap();

    // 0.30 + 7.00 + 20.00
    assert_eq!(done.sale.total().to_string(), "27.30");

    let ledger = shop
        .db
        .line_items()
        .sum_subtotals_for_sale(done.sale.id)
        .await
        .unwrap();
    assert_eq!(ledger, done.sale.total());

    for item in shop.db.line_items().list_by_sale(done.sale.id).await.unwrap() {
        assert_eq!(item.subtotal(), item.unit_price().multiply_quantity(item.quantity()));
    }
}

#[tokio::test]
async fn sale_total_overflow_is_a_validation_error() {
    let shop = shop().await;
    let author_id = shop.db.authors().list().await.unwrap()[0].id;
    let collector = shop
        .db
        .books()
        .insert(&book(
            "Collector's Folio",
            i64::MAX / 999,
            author_id,
            BookFormat::Digital(DigitalDetails {
                file_extension: "pdf".to_string(),
                printable: true,
            }),
        ))
        .await
        .unwrap();

    let mut draft = shop.draft().await;
    let sale_id = draft.sale_id();
    shop.coordinator
        .add_line_by_id(&mut draft, collector.id, 999)
        .await
        .unwrap();
    let err = shop
        .coordinator
        .add_line_by_id(&mut draft, collector.id, 999)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DbError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "sale total"
    ));
    assert_eq!(draft.lines().len(), 1);

    // The single line still fits and completes with an exact total.
    let done = shop
        .coordinator
        .complete(draft, PaymentMethod::Card)
        .await
        .unwrap();
    assert_eq!(done.sale.total_cents, (i64::MAX / 999) * 999);
    assert_eq!(shop.status(sale_id).await, Some(SaleStatus::Completed));
}

#[tokio::test]
async fn unit_price_is_a_snapshot() {
    let shop = shop().await;
    let mut draft = shop.draft().await;
    shop.coordinator
        .add_line_by_id(&mut draft, shop.ebook, 1)
        .await
        .unwrap();

    // Price changes after the line was added.
    let mut repriced = shop.db.books().get_by_id(shop.ebook).await.unwrap().unwrap();
    repriced.price_cents = 900;
    shop.db
        .books()
        .update(
            shop.ebook,
            &NewBook {
                title: repriced.title,
                isbn: repriced.isbn,
                publisher: repriced.publisher,
                publication_year: repriced.publication_year,
                price_cents: repriced.price_cents,
                genre: repriced.genre,
                format: repriced.format,
                author_id: repriced.author_id,
            },
        )
        .await
        .unwrap();

    let done = shop
        .coordinator
        .complete(draft, PaymentMethod::Cash)
        .await
        .unwrap();
    assert_eq!(done.items[0].unit_price().cents(), 700);
    assert_eq!(done.sale.total_cents, 700);
}

#[tokio::test]
async fn sold_books_and_buying_clients_cannot_be_deleted() {
    let shop = shop().await;
    let mut draft = shop.draft().await;
    shop.coordinator
        .add_line_by_id(&mut draft, shop.printed, 1)
        .await
        .unwrap();
    shop.coordinator
        .complete(draft, PaymentMethod::Cash)
        .await
        .unwrap();

    let err = shop.db.books().delete(shop.printed).await.unwrap_err();
    assert!(err.is_integrity_violation());
    let err = shop.db.clients().delete(shop.client).await.unwrap_err();
    assert!(err.is_integrity_violation());

    assert_eq!(
        shop.db.line_items().list_by_book(shop.printed).await.unwrap().len(),
        1
    );
}

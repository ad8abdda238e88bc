//! # Book Repository
//!
//! Database operations for the catalog.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  books row                               Book                           │
//! │  ─────────                               ────                           │
//! │  id, title, isbn, publisher, ...   ──►   common fields                  │
//! │  kind = 'physical'                 ──►   format: Physical {             │
//! │    stock, binding, edition                 binding, edition, stock }    │
//! │  kind = 'digital'                  ──►   format: Digital {              │
//! │    file_extension, printable               file_extension, printable }  │
//! │  kind = 'audiobook'                ──►   format: Audiobook {            │
//! │    duration_minutes, platform,             duration_minutes, platform,  │
//! │    narrator                                narrator }                   │
//! │                                                                         │
//! │  Columns of other kinds are NULL (enforced by a table CHECK).          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{author, name_duplicate};
use crate::error::{DbError, DbResult};
use crate::inventory::{self, StockAdjustment};
use folio_core::validation::validate_new_book;
use folio_core::{
    AudiobookDetails, AuthorId, Book, BookFormat, BookId, BookKind, DigitalDetails, NewBook,
    PhysicalDetails,
};

const BOOK_COLUMNS: &str = "id, title, isbn, publisher, publication_year, price_cents, genre, \
     kind, stock, binding, edition, file_extension, printable, \
     duration_minutes, platform, narrator, author_id, registered_at";

// =============================================================================
// Row Mapping
// =============================================================================

/// Flat row as stored; converted into [`Book`] with its format variant.
#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    id: BookId,
    title: String,
    isbn: Option<String>,
    publisher: String,
    publication_year: i32,
    price_cents: i64,
    genre: Option<String>,
    kind: BookKind,
    stock: Option<i64>,
    binding: Option<String>,
    edition: Option<i32>,
    file_extension: Option<String>,
    printable: Option<bool>,
    duration_minutes: Option<i32>,
    platform: Option<String>,
    narrator: Option<String>,
    author_id: AuthorId,
    registered_at: DateTime<Utc>,
}

impl TryFrom<BookRow> for Book {
    type Error = DbError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let incomplete =
            || DbError::Internal(format!("book {} has incomplete {} columns", row.id, row.kind));

        let format = match row.kind {
            BookKind::Physical => BookFormat::Physical(PhysicalDetails {
                binding: row.binding.ok_or_else(incomplete)?,
                edition: row.edition.ok_or_else(incomplete)?,
                stock: row.stock.ok_or_else(incomplete)?,
            }),
            BookKind::Digital => BookFormat::Digital(DigitalDetails {
                file_extension: row.file_extension.ok_or_else(incomplete)?,
                printable: row.printable.ok_or_else(incomplete)?,
            }),
            BookKind::Audiobook => BookFormat::Audiobook(AudiobookDetails {
                duration_minutes: row.duration_minutes.ok_or_else(incomplete)?,
                platform: row.platform.ok_or_else(incomplete)?,
                narrator: row.narrator.ok_or_else(incomplete)?,
            }),
        };

        Ok(Book {
            id: row.id,
            title: row.title,
            isbn: row.isbn,
            publisher: row.publisher,
            publication_year: row.publication_year,
            price_cents: row.price_cents,
            genre: row.genre,
            format,
            author_id: row.author_id,
            registered_at: row.registered_at,
        })
    }
}

/// Variant columns in table order: stock, binding, edition, file_extension,
/// printable, duration_minutes, platform, narrator.
struct FormatColumns<'a> {
    stock: Option<i64>,
    binding: Option<&'a str>,
    edition: Option<i32>,
    file_extension: Option<&'a str>,
    printable: Option<bool>,
    duration_minutes: Option<i32>,
    platform: Option<&'a str>,
    narrator: Option<&'a str>,
}

impl<'a> From<&'a BookFormat> for FormatColumns<'a> {
    fn from(format: &'a BookFormat) -> Self {
        let mut cols = FormatColumns {
            stock: None,
            binding: None,
            edition: None,
            file_extension: None,
            printable: None,
            duration_minutes: None,
            platform: None,
            narrator: None,
        };
        match format {
            BookFormat::Physical(d) => {
                cols.stock = Some(d.stock);
                cols.binding = Some(&d.binding);
                cols.edition = Some(d.edition);
            }
            BookFormat::Digital(d) => {
                cols.file_extension = Some(&d.file_extension);
                cols.printable = Some(d.printable);
            }
            BookFormat::Audiobook(d) => {
                cols.duration_minutes = Some(d.duration_minutes);
                cols.platform = Some(&d.platform);
                cols.narrator = Some(&d.narrator);
            }
        }
        cols
    }
}

// =============================================================================
// Connection-level Operations
// =============================================================================

pub async fn get_by_id(conn: &mut SqliteConnection, id: BookId) -> DbResult<Option<Book>> {
    let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1");
    let row = sqlx::query_as::<_, BookRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.map(Book::try_from).transpose()
}

async fn fetch_all(pool: &SqlitePool, sql: &str, bind: Option<i64>) -> DbResult<Vec<Book>> {
    let mut query = sqlx::query_as::<_, BookRow>(sql);
    if let Some(value) = bind {
        query = query.bind(value);
    }
    query
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(Book::try_from)
        .collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    /// Creates a new BookRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BookRepository { pool }
    }

    /// Registers a book. The ISBN is stored normalized.
    ///
    /// ## Errors
    /// - `Validation` for malformed fields
    /// - `NotFound` if the author doesn't exist
    /// - `UniqueViolation` if the ISBN is already registered
    pub async fn insert(&self, book: &NewBook) -> DbResult<Book> {
        let book = validate_new_book(book, Utc::now().year())?;
        let mut conn = self.pool.acquire().await?;
        if !author::exists(&mut conn, book.author_id).await? {
            return Err(DbError::not_found("Author", book.author_id));
        }

        let registered_at = Utc::now();
        let cols = FormatColumns::from(&book.format);

        debug!(title = %book.title, kind = %book.format.kind(), "Inserting book");

        let result = sqlx::query(
            r#"
            INSERT INTO books (
                title, isbn, publisher, publication_year, price_cents, genre, kind,
                stock, binding, edition, file_extension, printable,
                duration_minutes, platform, narrator, author_id, registered_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17
            )
            "#,
        )
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(book.price_cents)
        .bind(&book.genre)
        .bind(book.format.kind())
        .bind(cols.stock)
        .bind(cols.binding)
        .bind(cols.edition)
        .bind(cols.file_extension)
        .bind(cols.printable)
        .bind(cols.duration_minutes)
        .bind(cols.platform)
        .bind(cols.narrator)
        .bind(book.author_id)
        .bind(registered_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| name_duplicate(e.into(), "isbn", book.isbn.as_deref().unwrap_or("")))?;

        Ok(Book {
            id: result.last_insert_rowid(),
            title: book.title,
            isbn: book.isbn,
            publisher: book.publisher,
            publication_year: book.publication_year,
            price_cents: book.price_cents,
            genre: book.genre,
            format: book.format,
            author_id: book.author_id,
            registered_at,
        })
    }

    /// Gets a book by ID.
    pub async fn get_by_id(&self, id: BookId) -> DbResult<Option<Book>> {
        let mut conn = self.pool.acquire().await?;
        get_by_id(&mut conn, id).await
    }

    /// Gets a book by ISBN, in any hyphenation.
    pub async fn get_by_isbn(&self, isbn: &str) -> DbResult<Option<Book>> {
        let isbn = folio_core::validation::normalize_isbn(isbn)?;
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE isbn = ?1");
        let row = sqlx::query_as::<_, BookRow>(&sql)
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Book::try_from).transpose()
    }

    /// The whole catalog, by title.
    pub async fn list(&self) -> DbResult<Vec<Book>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY title, id");
        fetch_all(&self.pool, &sql, None).await
    }

    /// Books written by one author, by publication year.
    pub async fn list_by_author(&self, author_id: AuthorId) -> DbResult<Vec<Book>> {
        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE author_id = ?1 ORDER BY publication_year, id"
        );
        fetch_all(&self.pool, &sql, Some(author_id)).await
    }

    /// Replaces every editable field of a book, including its format.
    /// `registered_at` is kept.
    pub async fn update(&self, id: BookId, book: &NewBook) -> DbResult<Book> {
        let book = validate_new_book(book, Utc::now().year())?;
        let mut conn = self.pool.acquire().await?;
        if !author::exists(&mut conn, book.author_id).await? {
            return Err(DbError::not_found("Author", book.author_id));
        }

        let cols = FormatColumns::from(&book.format);
        debug!(id, title = %book.title, kind = %book.format.kind(), "Updating book");

        let sql = format!(
            r#"
            UPDATE books SET
                title = ?1, isbn = ?2, publisher = ?3, publication_year = ?4,
                price_cents = ?5, genre = ?6, kind = ?7,
                stock = ?8, binding = ?9, edition = ?10, file_extension = ?11,
                printable = ?12, duration_minutes = ?13, platform = ?14,
                narrator = ?15, author_id = ?16
            WHERE id = ?17
            RETURNING {BOOK_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, BookRow>(&sql)
            .bind(&book.title)
            .bind(&book.isbn)
            .bind(&book.publisher)
            .bind(book.publication_year)
            .bind(book.price_cents)
            .bind(&book.genre)
            .bind(book.format.kind())
            .bind(cols.stock)
            .bind(cols.binding)
            .bind(cols.edition)
            .bind(cols.file_extension)
            .bind(cols.printable)
            .bind(cols.duration_minutes)
            .bind(cols.platform)
            .bind(cols.narrator)
            .bind(book.author_id)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| name_duplicate(e.into(), "isbn", book.isbn.as_deref().unwrap_or("")))?;

        row.ok_or_else(|| DbError::not_found("Book", id))
            .and_then(Book::try_from)
    }

    /// Deletes a book that was never sold.
    ///
    /// ## Errors
    /// - `DeleteBlocked` while any sale line references the book
    /// - `NotFound` if the book doesn't exist
    pub async fn delete(&self, id: BookId) -> DbResult<()> {
        let lines: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sale_line_items WHERE book_id = ?1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if lines > 0 {
            return Err(DbError::delete_blocked(
                "Book",
                id,
                format!("{lines} sale line(s) still reference this book"),
            ));
        }

        debug!(id, "Deleting book");
        let result = sqlx::query("DELETE FROM books WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Book", id));
        }
        Ok(())
    }

    /// Restocks (positive `delta`) or writes off (negative) copies outside
    /// any sale.
    pub async fn adjust_stock(&self, id: BookId, delta: i64) -> DbResult<StockAdjustment> {
        let mut conn = self.pool.acquire().await?;
        let outcome = inventory::adjust_stock(&mut conn, id, delta).await?;
        if let StockAdjustment::Applied { stock, .. } = outcome {
            info!(book_id = id, delta, stock, "Stock adjusted manually");
        }
        Ok(outcome)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use folio_core::{NewAuthor, ValidationError};

    async fn setup() -> (Database, AuthorId) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let author = db
            .authors()
            .insert(&NewAuthor {
                name: "Frank Herbert".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1920, 10, 8).unwrap(),
                nationality: None,
                biography: None,
            })
            .await
            .unwrap();
        (db, author.id)
    }

    fn dune(author_id: AuthorId, format: BookFormat) -> NewBook {
        NewBook {
            title: "Dune".to_string(),
            isbn: Some("978-0-441-17271-9".to_string()),
            publisher: "Ace".to_string(),
            publication_year: 1965,
            price_cents: 1099,
            genre: Some("Science fiction".to_string()),
            format,
            author_id,
        }
    }

    fn paperback(stock: i64) -> BookFormat {
        BookFormat::Physical(PhysicalDetails {
            binding: "paperback".to_string(),
            edition: 1,
            stock,
        })
    }

    #[tokio::test]
    async fn test_each_format_round_trips() {
        let (db, author_id) = setup().await;
        let repo = db.books();

        let formats = [
            paperback(4),
            BookFormat::Digital(DigitalDetails {
                file_extension: "epub".to_string(),
                printable: true,
            }),
            BookFormat::Audiobook(AudiobookDetails {
                duration_minutes: 1260,
                platform: "Audible".to_string(),
                narrator: "Scott Brick".to_string(),
            }),
        ];

        for format in formats {
            let mut new_book = dune(author_id, format.clone());
            new_book.isbn = None;
            let stored = repo.insert(&new_book).await.unwrap();
            let loaded = repo.get_by_id(stored.id).await.unwrap().unwrap();
            assert_eq!(loaded.format, format);
            assert_eq!(loaded, stored);
        }

        assert_eq!(repo.list_by_author(author_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_isbn_normalized_and_unique() {
        let (db, author_id) = setup().await;
        let repo = db.books();

        let stored = repo.insert(&dune(author_id, paperback(1))).await.unwrap();
        assert_eq!(stored.isbn.as_deref(), Some("9780441172719"));
        assert_eq!(
            repo.get_by_isbn("978 0 441 17271 9").await.unwrap().map(|b| b.id),
            Some(stored.id)
        );

        let err = repo.insert(&dune(author_id, paperback(2))).await.unwrap_err();
        assert!(err.is_integrity_violation());
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "isbn"));
    }

    #[tokio::test]
    async fn test_insert_requires_author() {
        let (db, author_id) = setup().await;
        assert!(matches!(
            db.books().insert(&dune(author_id + 1, paperback(1))).await,
            Err(DbError::NotFound { ref entity, .. }) if entity == "Author"
        ));
    }

    #[tokio::test]
    async fn test_insert_rejects_bad_fields() {
        let (db, author_id) = setup().await;
        let mut free = dune(author_id, paperback(1));
        free.price_cents = 0;
        assert!(matches!(
            db.books().insert(&free).await,
            Err(DbError::Validation(ValidationError::MustBePositive { .. }))
        ));
    }

    #[tokio::test]
    async fn test_update_can_change_format() {
        let (db, author_id) = setup().await;
        let repo = db.books();
        let stored = repo.insert(&dune(author_id, paperback(3))).await.unwrap();

        let digital = BookFormat::Digital(DigitalDetails {
            file_extension: "pdf".to_string(),
            printable: false,
        });
        let updated = repo
            .update(stored.id, &dune(author_id, digital.clone()))
            .await
            .unwrap();

        assert_eq!(updated.format, digital);
        assert_eq!(updated.stock(), None);
        assert_eq!(updated.registered_at, stored.registered_at);
    }

    #[tokio::test]
    async fn test_restock_and_delete() {
        let (db, author_id) = setup().await;
        let repo = db.books();
        let stored = repo.insert(&dune(author_id, paperback(0))).await.unwrap();

        assert_eq!(
            repo.adjust_stock(stored.id, 10).await.unwrap(),
            StockAdjustment::Applied {
                book_id: stored.id,
                stock: 10
            }
        );

        repo.delete(stored.id).await.unwrap();
        assert_eq!(repo.get_by_id(stored.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_author_with_books_cannot_be_deleted() {
        let (db, author_id) = setup().await;
        db.books().insert(&dune(author_id, paperback(1))).await.unwrap();

        let err = db.authors().delete(author_id).await.unwrap_err();
        assert!(matches!(err, DbError::DeleteBlocked { .. }));
        assert!(db.authors().get_by_id(author_id).await.unwrap().is_some());
    }
}

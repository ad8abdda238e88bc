//! # Author Repository
//!
//! Database operations for authors.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use folio_core::validation::validate_new_author;
use folio_core::{Author, AuthorId, NewAuthor};

pub async fn get_by_id(conn: &mut SqliteConnection, id: AuthorId) -> DbResult<Option<Author>> {
    let author = sqlx::query_as::<_, Author>(
        "SELECT id, name, birth_date, nationality, biography FROM authors WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(author)
}

pub async fn exists(conn: &mut SqliteConnection, id: AuthorId) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM authors WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

/// Repository for author database operations.
#[derive(Debug, Clone)]
pub struct AuthorRepository {
    pool: SqlitePool,
}

impl AuthorRepository {
    /// Creates a new AuthorRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuthorRepository { pool }
    }

    /// Registers an author.
    pub async fn insert(&self, author: &NewAuthor) -> DbResult<Author> {
        validate_new_author(author)?;
        debug!(name = %author.name, "Inserting author");

        let result = sqlx::query(
            "INSERT INTO authors (name, birth_date, nationality, biography) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&author.name)
        .bind(author.birth_date)
        .bind(&author.nationality)
        .bind(&author.biography)
        .execute(&self.pool)
        .await?;

        Ok(Author {
            id: result.last_insert_rowid(),
            name: author.name.clone(),
            birth_date: author.birth_date,
            nationality: author.nationality.clone(),
            biography: author.biography.clone(),
        })
    }

    /// Gets an author by ID.
    pub async fn get_by_id(&self, id: AuthorId) -> DbResult<Option<Author>> {
        let mut conn = self.pool.acquire().await?;
        get_by_id(&mut conn, id).await
    }

    /// All authors, alphabetically.
    pub async fn list(&self) -> DbResult<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>(
            "SELECT id, name, birth_date, nationality, biography FROM authors ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(authors)
    }

    /// Replaces every editable field of an author.
    pub async fn update(&self, id: AuthorId, author: &NewAuthor) -> DbResult<Author> {
        validate_new_author(author)?;
        debug!(id, name = %author.name, "Updating author");

        let result = sqlx::query(
            "UPDATE authors SET name = ?1, birth_date = ?2, nationality = ?3, biography = ?4 WHERE id = ?5",
        )
        .bind(&author.name)
        .bind(author.birth_date)
        .bind(&author.nationality)
        .bind(&author.biography)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Author", id));
        }

        Ok(Author {
            id,
            name: author.name.clone(),
            birth_date: author.birth_date,
            nationality: author.nationality.clone(),
            biography: author.biography.clone(),
        })
    }

    /// Deletes an author with no books.
    ///
    /// ## Errors
    /// - `DeleteBlocked` while any book references the author
    /// - `NotFound` if the author doesn't exist
    pub async fn delete(&self, id: AuthorId) -> DbResult<()> {
        let books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE author_id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if books > 0 {
            return Err(DbError::delete_blocked(
                "Author",
                id,
                format!("{books} book(s) still reference this author"),
            ));
        }

        debug!(id, "Deleting author");
        let result = sqlx::query("DELETE FROM authors WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Author", id));
        }
        Ok(())
    }
}

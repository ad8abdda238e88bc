//! # Client Repository
//!
//! Database operations for clients. The document number is the business
//! key: unique, fixed format, never used as a foreign key.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::name_duplicate;
use crate::error::{DbError, DbResult};
use folio_core::validation::validate_new_client;
use folio_core::{Client, ClientId, NewClient};

const CLIENT_COLUMNS: &str = "id, name, document_number, email, phone, registered_at";

pub async fn get_by_id(conn: &mut SqliteConnection, id: ClientId) -> DbResult<Option<Client>> {
    let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1");
    let client = sqlx::query_as::<_, Client>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(client)
}

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    /// Creates a new ClientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Registers a client. `registered_at` is stamped here.
    ///
    /// ## Errors
    /// - `Validation` for malformed fields
    /// - `UniqueViolation` if the document number is already registered
    pub async fn insert(&self, client: &NewClient) -> DbResult<Client> {
        validate_new_client(client)?;
        let registered_at = Utc::now();

        debug!(document = %client.document_number, "Inserting client");

        let result = sqlx::query(
            r#"
            INSERT INTO clients (name, document_number, email, phone, registered_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&client.name)
        .bind(&client.document_number)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(registered_at)
        .execute(&self.pool)
        .await
        .map_err(|e| name_duplicate(e.into(), "document_number", &client.document_number))?;

        Ok(Client {
            id: result.last_insert_rowid(),
            name: client.name.clone(),
            document_number: client.document_number.clone(),
            email: client.email.clone(),
            phone: client.phone.clone(),
            registered_at,
        })
    }

    /// Gets a client by ID.
    pub async fn get_by_id(&self, id: ClientId) -> DbResult<Option<Client>> {
        let mut conn = self.pool.acquire().await?;
        get_by_id(&mut conn, id).await
    }

    /// Gets a client by document number.
    pub async fn get_by_document(&self, document_number: &str) -> DbResult<Option<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE document_number = ?1");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(document_number.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    /// All clients, alphabetically.
    pub async fn list(&self) -> DbResult<Vec<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY name, id");
        let clients = sqlx::query_as::<_, Client>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(clients)
    }

    /// Replaces the editable fields of a client. `registered_at` is kept.
    pub async fn update(&self, id: ClientId, client: &NewClient) -> DbResult<Client> {
        validate_new_client(client)?;
        debug!(id, document = %client.document_number, "Updating client");

        let sql = format!(
            "UPDATE clients SET name = ?1, document_number = ?2, email = ?3, phone = ?4
             WHERE id = ?5
             RETURNING {CLIENT_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Client>(&sql)
            .bind(&client.name)
            .bind(&client.document_number)
            .bind(&client.email)
            .bind(&client.phone)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| name_duplicate(e.into(), "document_number", &client.document_number))?;

        updated.ok_or_else(|| DbError::not_found("Client", id))
    }

    /// Deletes a client with no sales.
    ///
    /// ## Errors
    /// - `DeleteBlocked` while any sale references the client
    /// - `NotFound` if the client doesn't exist
    pub async fn delete(&self, id: ClientId) -> DbResult<()> {
        let sales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE client_id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if sales > 0 {
            return Err(DbError::delete_blocked(
                "Client",
                id,
                format!("{sales} sale(s) still reference this client"),
            ));
        }

        debug!(id, "Deleting client");
        let result = sqlx::query("DELETE FROM clients WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }
        Ok(())
    }
}

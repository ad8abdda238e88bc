//! # Seed Data Generator
//!
//! Populates the database with a small demo catalog for development and
//! registers one sale through the coordinator.
//!
//! ## Usage
//! ```bash
//! # Paths from FOLIO_DB_PATH / FOLIO_RECEIPT_DIR (or their defaults)
//! cargo run -p folio-db --bin seed
//!
//! # Explicit paths
//! cargo run -p folio-db --bin seed -- --db ./data/folio.db --receipts ./data/receipts
//! ```
//!
//! ## Generated Data
//! - Authors, each with books in every format (physical, digital, audiobook)
//! - Clients with valid document numbers
//! - One completed sale, with its receipt written to the receipt directory

use chrono::NaiveDate;
use folio_core::{
    AudiobookDetails, BookFormat, DigitalDetails, NewAuthor, NewBook, NewClient, PaymentMethod,
    PhysicalDetails, SaleDraft,
};
use folio_db::{AppConfig, Database, FileReceiptSink, ReceiptOutcome, SaleCoordinator};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// (name, birth date, nationality, books: (title, isbn, publisher, year, price cents))
type AuthorSeed = (
    &'static str,
    (i32, u32, u32),
    &'static str,
    &'static [(&'static str, &'static str, &'static str, i32, i64)],
);

const AUTHORS: &[AuthorSeed] = &[
    (
        "Ursula K. Le Guin",
        (1929, 10, 21),
        "American",
        &[
            ("A Wizard of Earthsea", "9780547773742", "Parnassus", 1968, 1299),
            ("The Left Hand of Darkness", "9780441478125", "Ace", 1969, 1499),
        ],
    ),
    (
        "Jorge Luis Borges",
        (1899, 8, 24),
        "Argentine",
        &[
            ("Ficciones", "9780802130303", "Sur", 1944, 1150),
            ("El Aleph", "9788499089515", "Losada", 1949, 1050),
        ],
    ),
    (
        "Octavia E. Butler",
        (1947, 6, 22),
        "American",
        &[("Kindred", "9780807083697", "Doubleday", 1979, 1699)],
    ),
];

/// (name, document number, email)
const CLIENTS: &[(&str, &str, &str)] = &[
    ("Ana Torres", "45879632", "ana.torres@example.com"),
    ("Bruno Díaz", "30111222", "bruno.diaz@example.com"),
    ("Carla Méndez", "27654321", "carla.mendez@example.com"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,folio=debug,sqlx=warn")),
        )
        .init();

    let mut config = AppConfig::from_env()?;

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--receipts" | "-r" => {
                if i + 1 < args.len() {
                    config.receipt_dir = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Folio Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: ./folio.db)");
                println!("  -r, --receipts <DIR>   Receipt directory (default: ./receipts)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            other => warn!(argument = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(
        db = %config.database_path.display(),
        receipts = %config.receipt_dir.display(),
        "Seeding Folio database"
    );

    let db = Database::new(config.db_config()).await?;

    if !db.books().list().await?.is_empty() {
        warn!("Database already has a catalog; delete the file to regenerate");
        return Ok(());
    }

    // Catalog: every author's first book in all three formats, the rest printed.
    let mut physical_ids = Vec::new();
    for (name, (y, m, d), nationality, books) in AUTHORS {
        let author = db
            .authors()
            .insert(&NewAuthor {
                name: name.to_string(),
                birth_date: NaiveDate::from_ymd_opt(*y, *m, *d)
                    .ok_or("invalid birth date in seed data")?,
                nationality: Some(nationality.to_string()),
                biography: None,
            })
            .await?;

        for (index, (title, isbn, publisher, year, price_cents)) in books.iter().enumerate() {
            let printed = db
                .books()
                .insert(&NewBook {
                    title: title.to_string(),
                    isbn: Some(isbn.to_string()),
                    publisher: publisher.to_string(),
                    publication_year: *year,
                    price_cents: *price_cents,
                    genre: Some("Fiction".to_string()),
                    format: BookFormat::Physical(PhysicalDetails {
                        binding: "paperback".to_string(),
                        edition: 1,
                        stock: 10,
                    }),
                    author_id: author.id,
                })
                .await?;
            physical_ids.push(printed.id);

            if index > 0 {
                continue;
            }

            let editions = [
                BookFormat::Digital(DigitalDetails {
                    file_extension: "epub".to_string(),
                    printable: false,
                }),
                BookFormat::Audiobook(AudiobookDetails {
                    duration_minutes: 420,
                    platform: "Audible".to_string(),
                    narrator: "Robin Miles".to_string(),
                }),
            ];
            for format in editions {
                db.books()
                    .insert(&NewBook {
                        title: format!("{title} ({})", format.kind()),
                        isbn: None,
                        publisher: publisher.to_string(),
                        publication_year: *year,
                        price_cents: price_cents * 7 / 10,
                        genre: Some("Fiction".to_string()),
                        format,
                        author_id: author.id,
                    })
                    .await?;
            }
        }
    }

    let mut client_ids = Vec::new();
    for (name, document, email) in CLIENTS {
        let client = db
            .clients()
            .insert(&NewClient {
                name: name.to_string(),
                document_number: document.to_string(),
                email: Some(email.to_string()),
                phone: None,
            })
            .await?;
        client_ids.push(client.id);
    }

    info!(
        books = db.books().list().await?.len(),
        clients = client_ids.len(),
        "Catalog created"
    );

    // One demo sale through the full workflow.
    let sink = Arc::new(FileReceiptSink::new(&config.receipt_dir));
    let mut coordinator = SaleCoordinator::new(db.clone(), sink);
    if let Some(store_name) = &config.store_name {
        coordinator = coordinator.with_store_name(store_name.clone());
    }

    let first_client = client_ids.first().copied().ok_or("no clients seeded")?;
    let sale = coordinator.begin(first_client).await?;
    let mut draft = SaleDraft::for_sale(&sale)?;
    for book_id in physical_ids.iter().take(2) {
        coordinator.add_line_by_id(&mut draft, *book_id, 2).await?;
    }
    let done = coordinator.complete(draft, PaymentMethod::Card).await?;

    match &done.receipt {
        ReceiptOutcome::Rendered(handle) => {
            info!(sale_id = done.sale.id, total = %done.sale.total(), ?handle, "Demo sale registered")
        }
        ReceiptOutcome::Failed(reason) => {
            warn!(sale_id = done.sale.id, %reason, "Demo sale registered without receipt")
        }
    }

    db.close().await;
    info!("Seed complete");
    Ok(())
}

//! # Validation Module
//!
//! Field-level format checks for Folio records.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (pure Rust)                                      │
//! │  ├── Required fields, lengths, numeric ranges                          │
//! │  └── Document number / ISBN / email formats                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Stores (folio-db)                                            │
//! │  ├── Referenced author / client exists                                 │
//! │  └── Uniqueness (document number, ISBN)                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints (variant columns, stock >= 0)        │
//! │  └── UNIQUE and FOREIGN KEY constraints                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{BookFormat, NewAuthor, NewBook, NewClient};
use crate::{DOCUMENT_NUMBER_LEN, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Earliest publication year accepted for a catalog entry.
pub const MIN_PUBLICATION_YEAR: i32 = 1450;

// =============================================================================
// String Validators
// =============================================================================

/// Checks that a required text field is present and not longer than `max`.
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Checks an optional text field: absent is fine, present must fit in `max`.
pub fn validate_optional(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates a client's document number.
///
/// ## Rules
/// - Exactly [`DOCUMENT_NUMBER_LEN`] ASCII digits, nothing else
///
/// ## Example
/// ```rust
/// use folio_core::validation::validate_document_number;
///
/// assert!(validate_document_number("45879632").is_ok());
/// assert!(validate_document_number("4587963").is_err());
/// assert!(validate_document_number("4587963A").is_err());
/// ```
pub fn validate_document_number(document: &str) -> ValidationResult<()> {
    if document.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "document number".to_string(),
        });
    }

    if document.len() != DOCUMENT_NUMBER_LEN || !document.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "document number".to_string(),
            reason: format!("must be exactly {DOCUMENT_NUMBER_LEN} digits"),
        });
    }

    Ok(())
}

/// Validates an email address (shape only: `local@domain.tld`).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "expected an address like name@example.com".to_string(),
    };

    let (local, domain) = email.trim().split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.contains(char::is_whitespace) {
        return Err(invalid());
    }

    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && tld.len() >= 2 => Ok(()),
        _ => Err(invalid()),
    }
}

/// Validates a phone number: 7 to 15 digits, an optional leading `+`.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let digits = phone.trim().strip_prefix('+').unwrap_or(phone.trim());

    if !(7..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain 7 to 15 digits".to_string(),
        });
    }

    Ok(())
}

/// Normalizes an ISBN by dropping hyphens and spaces, then checks its shape.
///
/// ## Rules
/// - 13 digits, or
/// - 10 characters: 9 digits followed by a digit or `X`
///
/// ## Example
/// ```rust
/// use folio_core::validation::normalize_isbn;
///
/// assert_eq!(normalize_isbn("978-0-441-17271-9").unwrap(), "9780441172719");
/// assert_eq!(normalize_isbn("0-441-17271-x").unwrap(), "044117271X");
/// assert!(normalize_isbn("12345").is_err());
/// ```
pub fn normalize_isbn(isbn: &str) -> ValidationResult<String> {
    let compact: String = isbn
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let valid = match compact.len() {
        13 => compact.chars().all(|c| c.is_ascii_digit()),
        10 => {
            let (body, check) = compact.split_at(9);
            body.chars().all(|c| c.is_ascii_digit())
                && check.chars().all(|c| c.is_ascii_digit() || c == 'X')
        }
        _ => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "isbn".to_string(),
            reason: "must be 10 or 13 digits (ISBN-10 may end in X)".to_string(),
        });
    }

    Ok(compact)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_ITEM_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a book price: strictly positive.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a publication year against the current year supplied by the
/// caller (this crate never reads the clock).
pub fn validate_publication_year(year: i32, current_year: i32) -> ValidationResult<()> {
    if year < MIN_PUBLICATION_YEAR || year > current_year {
        return Err(ValidationError::OutOfRange {
            field: "publication year".to_string(),
            min: MIN_PUBLICATION_YEAR as i64,
            max: current_year as i64,
        });
    }

    Ok(())
}

/// Validates the variant-specific attributes of a book.
pub fn validate_book_format(format: &BookFormat) -> ValidationResult<()> {
    match format {
        BookFormat::Physical(details) => {
            validate_required("binding", &details.binding, 50)?;
            if details.edition <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "edition".to_string(),
                });
            }
            if details.stock < 0 {
                return Err(ValidationError::OutOfRange {
                    field: "stock".to_string(),
                    min: 0,
                    max: i64::MAX,
                });
            }
        }
        BookFormat::Digital(details) => {
            validate_required("file extension", &details.file_extension, 10)?;
            if !details
                .file_extension
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
            {
                return Err(ValidationError::InvalidFormat {
                    field: "file extension".to_string(),
                    reason: "letters and digits only, without the dot".to_string(),
                });
            }
        }
        BookFormat::Audiobook(details) => {
            if details.duration_minutes <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "duration".to_string(),
                });
            }
            validate_required("platform", &details.platform, 100)?;
            validate_required("narrator", &details.narrator, 100)?;
        }
    }

    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

pub fn validate_new_author(author: &NewAuthor) -> ValidationResult<()> {
    validate_required("name", &author.name, 100)?;
    validate_optional("nationality", author.nationality.as_deref(), 50)?;
    validate_optional("biography", author.biography.as_deref(), 2000)?;
    Ok(())
}

pub fn validate_new_client(client: &NewClient) -> ValidationResult<()> {
    validate_required("name", &client.name, 100)?;
    validate_document_number(&client.document_number)?;
    if let Some(email) = &client.email {
        validate_email(email)?;
    }
    if let Some(phone) = &client.phone {
        validate_phone(phone)?;
    }
    Ok(())
}

/// Validates a book and returns it with its ISBN normalized.
pub fn validate_new_book(book: &NewBook, current_year: i32) -> ValidationResult<NewBook> {
    validate_required("title", &book.title, 200)?;
    validate_required("publisher", &book.publisher, 100)?;
    validate_optional("genre", book.genre.as_deref(), 50)?;
    validate_publication_year(book.publication_year, current_year)?;
    validate_price_cents(book.price_cents)?;
    validate_book_format(&book.format)?;

    let isbn = book.isbn.as_deref().map(normalize_isbn).transpose()?;

    Ok(NewBook {
        isbn,
        ..book.clone()
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AudiobookDetails, DigitalDetails, PhysicalDetails};

    fn physical(stock: i64, edition: i32) -> BookFormat {
        BookFormat::Physical(PhysicalDetails {
            binding: "hardcover".to_string(),
            edition,
            stock,
        })
    }

    #[test]
    fn test_validate_required() {
        assert!(validate_required("name", "Gabriel", 100).is_ok());
        assert_eq!(
            validate_required("name", "   ", 100),
            Err(ValidationError::Required {
                field: "name".to_string()
            })
        );
        assert!(validate_required("name", &"a".repeat(101), 100).is_err());
    }

    #[test]
    fn test_validate_document_number() {
        assert!(validate_document_number("12345678").is_ok());
        assert!(validate_document_number("").is_err());
        assert!(validate_document_number("1234567").is_err());
        assert!(validate_document_number("123456789").is_err());
        assert!(validate_document_number("1234 678").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("ana.maria@mail.co.uk").is_ok());
        assert!(validate_email("ana").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ana@example").is_err());
        assert!(validate_email("ana@@example.com").is_err());
        assert!(validate_email("an a@example.com").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("987654321").is_ok());
        assert!(validate_phone("+51987654321").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("98-765-4321").is_err());
    }

    #[test]
    fn test_normalize_isbn() {
        assert_eq!(normalize_isbn("978 0 441 17271 9").unwrap(), "9780441172719");
        assert_eq!(normalize_isbn("0441172717").unwrap(), "0441172717");
        assert!(normalize_isbn("97804411727X9").is_err());
        assert!(normalize_isbn("X441172717").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_book_format() {
        assert!(validate_book_format(&physical(0, 1)).is_ok());
        assert!(validate_book_format(&physical(-1, 1)).is_err());
        assert!(validate_book_format(&physical(3, 0)).is_err());

        let digital = BookFormat::Digital(DigitalDetails {
            file_extension: ".pdf".to_string(),
            printable: true,
        });
        assert!(validate_book_format(&digital).is_err());

        let audio = BookFormat::Audiobook(AudiobookDetails {
            duration_minutes: 0,
            platform: "Storytel".to_string(),
            narrator: "Someone".to_string(),
        });
        assert!(validate_book_format(&audio).is_err());
    }

    #[test]
    fn test_validate_new_book_normalizes_isbn() {
        let book = NewBook {
            title: "Cien años de soledad".to_string(),
            isbn: Some("978-0-06-088328-7".to_string()),
            publisher: "Sudamericana".to_string(),
            publication_year: 1967,
            price_cents: 4590,
            genre: Some("Novel".to_string()),
            format: physical(5, 1),
            author_id: 1,
        };

        let validated = validate_new_book(&book, 2026).unwrap();
        assert_eq!(validated.isbn.as_deref(), Some("9780060883287"));

        let future = NewBook {
            publication_year: 2030,
            ..book.clone()
        };
        assert!(validate_new_book(&future, 2026).is_err());

        let free = NewBook {
            price_cents: 0,
            ..book
        };
        assert!(validate_new_book(&free, 2026).is_err());
    }

    #[test]
    fn test_validate_new_client() {
        let client = NewClient {
            name: "Ana Torres".to_string(),
            document_number: "45879632".to_string(),
            email: Some("ana@example.com".to_string()),
            phone: None,
        };
        assert!(validate_new_client(&client).is_ok());

        let bad_email = NewClient {
            email: Some("nope".to_string()),
            ..client
        };
        assert!(validate_new_client(&bad_email).is_err());
    }
}

//! # Validation Module
//!
//! Input validation utilities for the cafe back end.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  ├── Types, enums, quantity decimals                                   │
//! │  └── Rejected with 400 before a handler runs                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Request validation (Rust)                                    │
//! │  ├── THIS MODULE: field shapes and numeric bounds                      │
//! │  └── Collected into ValidationErrors, one entry per field              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE constraints (product code, email, slug)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cafe_core::validation::{validate_code, validate_percent_bps};
//!
//! assert!(validate_code("P1").is_ok());
//! assert!(validate_percent_bps("discount_bps", 10_001).is_err());
//! ```

use crate::error::{ValidationError, ValidationErrors};
use crate::financial::LineRequest;
use crate::money::Percent;
use crate::quantity::Quantity;
use crate::{MAX_LINE_ITEMS, MAX_LINE_QUANTITY_UNITS, MAX_MONEY_CENTS, MAX_NOTES_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a trimmed text field against a length range.
pub fn validate_text(field: &str, value: &str, min: usize, max: usize) -> ValidationResult<()> {
    let len = value.trim().chars().count();

    if len == 0 && min > 0 {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if len < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        });
    }

    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 50 characters
/// - Only letters, digits, hyphens, underscores
///
/// ## Example
/// ```rust
/// use cafe_core::validation::validate_code;
///
/// assert!(validate_code("LATTE-L").is_ok());
/// assert!(validate_code("").is_err());
/// assert!(validate_code("has space").is_err());
/// ```
pub fn validate_code(code: &str) -> ValidationResult<()> {
    validate_text("code", code, 1, 50)?;

    if !code
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name (1..=200 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, 1, 200)
}

/// Validates an email address.
///
/// Only the shape is checked: one `@`, a non-empty local part, and a dot
/// inside the domain.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    validate_text("email", email, 1, 254)?;

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must be a valid email address".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.contains(char::is_whitespace)
    {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a password (8..=128 characters).
pub fn validate_password(password: &str) -> ValidationResult<()> {
    let len = password.chars().count();
    if len < 8 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        });
    }
    if len > 128 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 128,
        });
    }
    Ok(())
}

/// Validates optional free-text notes.
pub fn validate_notes(field: &str, notes: Option<&str>) -> ValidationResult<()> {
    match notes {
        Some(text) if text.chars().count() > MAX_NOTES_LEN => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTES_LEN,
        }),
        _ => Ok(()),
    }
}

/// Validates a blog slug: lowercase letters, digits and single dashes.
pub fn validate_slug(slug: &str) -> ValidationResult<()> {
    validate_text("slug", slug, 1, 200)?;

    let well_formed = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--");

    if !well_formed {
        return Err(ValidationError::InvalidFormat {
            field: "slug".to_string(),
            reason: "must be lowercase words separated by single dashes".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a non-negative amount in cents (prices, tax, paid amounts).
///
/// ## Example
/// ```rust
/// use cafe_core::validation::validate_non_negative_cents;
///
/// assert!(validate_non_negative_cents("price_cents", 0).is_ok());
/// assert!(validate_non_negative_cents("price_cents", -100).is_err());
/// assert!(validate_non_negative_cents("price_cents", i64::MAX).is_err());
/// ```
pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_MONEY_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_MONEY_CENTS,
        });
    }

    Ok(())
}

/// Validates a strictly positive amount in cents (expenses, cash entries).
pub fn validate_positive_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    if cents > MAX_MONEY_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_MONEY_CENTS,
        });
    }

    Ok(())
}

/// Validates a percentage in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%), inclusive
pub fn validate_percent_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if !Percent::from_bps(bps).is_valid() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: Percent::MAX_BPS as i64,
        });
    }

    Ok(())
}

/// Validates a stock level or threshold (≥ 0).
pub fn validate_stock_quantity(field: &str, quantity: Quantity) -> ValidationResult<()> {
    if quantity.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Which kind of record a line belongs to.
///
/// Sale lines count whole units; invoice lines allow hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Sale,
    Invoice,
}

/// Validates a line quantity.
///
/// ## Rules
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Sale line:     whole number, 1 ..= 9999                                │
/// │  Invoice line:  0.01 ..= 9999                                           │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_line_quantity(kind: LineKind, quantity: Quantity) -> ValidationResult<()> {
    let field = "quantity".to_string();
    let max = Quantity::from_units(MAX_LINE_QUANTITY_UNITS);

    if !quantity.is_positive() {
        return Err(ValidationError::MustBePositive { field });
    }

    if kind == LineKind::Sale && !quantity.is_whole() {
        return Err(ValidationError::InvalidFormat {
            field,
            reason: "must be a whole number".to_string(),
        });
    }

    if quantity > max {
        return Err(ValidationError::OutOfRange {
            field,
            min: if kind == LineKind::Sale { 1 } else { 0 },
            max: MAX_LINE_QUANTITY_UNITS,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the line list of a sale or invoice.
///
/// Every failing line is reported under `items[i]`.
pub fn validate_line_requests(kind: LineKind, items: &[LineRequest]) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if items.is_empty() {
        errors.push(ValidationError::Required {
            field: "items".to_string(),
        });
    } else if items.len() > MAX_LINE_ITEMS {
        errors.push(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    for (i, item) in items.iter().enumerate() {
        let prefix = format!("items[{}]", i);
        if let Err(err) = validate_uuid("product_id", &item.product_id) {
            errors.push(err.within(&prefix));
        }
        if let Err(err) = validate_line_quantity(kind, item.quantity) {
            errors.push(err.within(&prefix));
        }
        if let Err(err) = validate_percent_bps("discount_bps", item.discount_bps) {
            errors.push(err.within(&prefix));
        }
    }

    errors
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use cafe_core::validation::validate_uuid;
///
/// assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PID: &str = "550e8400-e29b-41d4-a716-446655440000";

    fn line(quantity: Quantity, discount_bps: u32) -> LineRequest {
        LineRequest {
            product_id: PID.to_string(),
            quantity,
            discount_bps,
        }
    }

    #[test]
    fn test_validate_code() {
        assert!(validate_code("P1").is_ok());
        assert!(validate_code("COLD_BREW-500").is_ok());

        assert!(validate_code("").is_err());
        assert!(validate_code("   ").is_err());
        assert!(validate_code("has space").is_err());
        assert!(validate_code(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("owner@cafe.test").is_ok());
        assert!(validate_email("owner@cafe").is_err());
        assert!(validate_email("@cafe.test").is_err());
        assert!(validate_email("a@b@c.test").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("longenough").is_ok());
        assert!(matches!(
            validate_password("short"),
            Err(ValidationError::TooShort { min: 8, .. })
        ));
    }

    #[test]
    fn test_sale_quantity_must_be_whole() {
        assert!(validate_line_quantity(LineKind::Sale, Quantity::from_units(1)).is_ok());
        assert!(validate_line_quantity(LineKind::Sale, Quantity::from_hundredths(150)).is_err());
        assert!(validate_line_quantity(LineKind::Sale, Quantity::zero()).is_err());
    }

    #[test]
    fn test_invoice_quantity_allows_hundredths() {
        assert!(validate_line_quantity(LineKind::Invoice, Quantity::from_hundredths(1)).is_ok());
        assert!(validate_line_quantity(LineKind::Invoice, Quantity::zero()).is_err());
        assert!(validate_line_quantity(
            LineKind::Invoice,
            Quantity::from_units(MAX_LINE_QUANTITY_UNITS + 1)
        )
        .is_err());
    }

    #[test]
    fn test_amounts_are_capped() {
        assert!(validate_non_negative_cents("tax_cents", MAX_MONEY_CENTS).is_ok());
        assert!(matches!(
            validate_non_negative_cents("tax_cents", i64::MAX),
            Err(ValidationError::OutOfRange { max: MAX_MONEY_CENTS, .. })
        ));
        assert!(validate_positive_cents("amount_cents", MAX_MONEY_CENTS).is_ok());
        assert!(matches!(
            validate_positive_cents("amount_cents", MAX_MONEY_CENTS + 1),
            Err(ValidationError::OutOfRange { min: 1, .. })
        ));
        assert!(matches!(
            validate_positive_cents("amount_cents", 0),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_validate_percent_bps() {
        assert!(validate_percent_bps("discount_bps", 0).is_ok());
        assert!(validate_percent_bps("discount_bps", 10_000).is_ok());
        assert!(validate_percent_bps("discount_bps", 10_001).is_err());
    }

    #[test]
    fn test_line_requests_report_every_line() {
        let items = vec![
            line(Quantity::from_units(1), 0),
            line(Quantity::zero(), 20_000),
        ];
        let errors = validate_line_requests(LineKind::Sale, &items);
        let fields: Vec<String> = errors.field_errors().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["items[1].quantity", "items[1].discount_bps"]);
    }

    #[test]
    fn test_empty_line_list() {
        let errors = validate_line_requests(LineKind::Invoice, &[]);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("new-espresso-blend").is_ok());
        assert!(validate_slug("Upper").is_err());
        assert!(validate_slug("double--dash").is_err());
        assert!(validate_slug("-edge").is_err());
    }

    #[test]
    fn test_validate_notes() {
        assert!(validate_notes("notes", None).is_ok());
        assert!(validate_notes("notes", Some("ok")).is_ok());
        assert!(validate_notes("notes", Some(&"x".repeat(MAX_NOTES_LEN + 1))).is_err());
    }
}

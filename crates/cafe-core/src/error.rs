//! # Error Types
//!
//! Domain-specific error types for cafe-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cafe-core errors (this file)                                          │
//! │  ├── CoreError         - Business rule rejections                      │
//! │  ├── ValidationError   - One field failed a rule                       │
//! │  └── ValidationErrors  - Every failing field of one request            │
//! │                                                                         │
//! │  cafe-db errors (separate crate)                                       │
//! │  └── DbError           - Database failures, wraps CoreError            │
//! │                                                                         │
//! │  REST errors (in app)                                                  │
//! │  └── ApiError          - What the client sees (JSON envelope)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (code, id, amounts)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use ts_rs::TS;

use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. The API layer maps
/// each variant to an HTTP status category.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced entity does not exist for the acting owner.
    ///
    /// ## When This Occurs
    /// - The id doesn't exist at all
    /// - The record belongs to another owner (indistinguishable on purpose)
    /// - A line item references a deactivated product
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Not enough stock to move a line outbound.
    ///
    /// ## User Workflow
    /// ```text
    /// Sale line (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { code: "P1", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole sale rolled back, stock stays at 3
    /// ```
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: Quantity,
        requested: Quantity,
    },

    /// A manual withdrawal would take the cash balance below zero.
    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Money, requested: Money },

    /// The entity is not in the lifecycle state the operation needs.
    ///
    /// ## When This Occurs
    /// - Cancelling a sale or invoice twice
    /// - Adding a payment to a draft or cancelled invoice
    /// - Voiding a confirmed invoice
    #[error("{entity} {id} is {status}, cannot {operation}")]
    InvalidState {
        entity: &'static str,
        id: String,
        status: String,
        operation: &'static str,
    },

    /// A payment amount is out of range or not increasing.
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Field-level input failures.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

impl CoreError {
    /// Shorthand for [`CoreError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        CoreError::Validation(ValidationErrors::from(err))
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// The name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }

    /// Re-anchors the error under a parent path, e.g. `items[2].quantity`.
    pub fn within(mut self, prefix: &str) -> Self {
        let field = match &mut self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        };
        *field = format!("{}.{}", prefix, field);
        self
    }
}

/// Serializable field/message pair for the error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl From<&ValidationError> for FieldError {
    fn from(err: &ValidationError) -> Self {
        FieldError {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Validation Errors (collector)
// =============================================================================

/// Every failing field of one request.
///
/// Validators push into this instead of returning on the first failure so
/// the client sees all problems at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure.
    pub fn push(&mut self, err: ValidationError) {
        self.0.push(err);
    }

    /// Records the error side of a validator result.
    pub fn check<T>(&mut self, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.0.push(err);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// `Ok(())` when nothing failed.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Field-level detail for the error envelope.
    pub fn field_errors(&self) -> Vec<FieldError> {
        self.0.iter().map(FieldError::from).collect()
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(err: ValidationError) -> Self {
        ValidationErrors(vec![err])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            code: "P1".to_string(),
            available: Quantity::from_units(3),
            requested: Quantity::from_units(5),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for P1: available 3, requested 5"
        );

        let err = CoreError::not_found("Product", "abc");
        assert_eq!(err.to_string(), "Product not found: abc");
    }

    #[test]
    fn test_invalid_state_message() {
        let err = CoreError::InvalidState {
            entity: "Sale",
            id: "s1".to_string(),
            status: "cancelled".to_string(),
            operation: "cancel",
        };
        assert_eq!(err.to_string(), "Sale s1 is cancelled, cannot cancel");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "code".to_string(),
        };
        assert_eq!(err.to_string(), "code is required");

        let err = ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        };
        assert_eq!(err.to_string(), "password must be at least 8 characters");
    }

    #[test]
    fn test_within_prefixes_field() {
        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .within("items[1]");
        assert_eq!(err.field(), "items[1].quantity");
    }

    #[test]
    fn test_collector() {
        let mut errors = ValidationErrors::new();
        assert!(errors.check(Ok::<_, ValidationError>(1)).is_some());
        errors.check::<()>(Err(ValidationError::Required {
            field: "name".to_string(),
        }));
        errors.push(ValidationError::MustBePositive {
            field: "amount_cents".to_string(),
        });

        assert_eq!(errors.len(), 2);
        let details = errors.field_errors();
        assert_eq!(details[0].field, "name");
        assert_eq!(details[1].message, "amount_cents must be positive");
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

//! API routes.
//!
//! ## Structure
//!
//! - [`health`] - liveness and database check
//! - [`auth`] - register, login, current user
//! - [`users`] - staff accounts under an owner
//! - [`products`] - catalog and stock
//! - [`sales`] - counter sales
//! - [`invoices`] - sale and purchase invoices
//! - [`expenses`] - operating costs
//! - [`cash_register`] - ledger, balance, manual transactions
//! - [`reports`] - read-only aggregations
//! - [`blog`] - content management and the public blog

use axum::Router;
use cafe_core::ValidationError;
use cafe_db::DateRange;
use chrono::NaiveDate;

use crate::AppState;

pub mod auth;
pub mod blog;
pub mod cash_register;
pub mod expenses;
pub mod health;
pub mod invoices;
pub mod products;
pub mod reports;
pub mod sales;
pub mod users;

/// Every route, without middleware or state.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(users::router())
        .merge(products::router())
        .merge(sales::router())
        .merge(invoices::router())
        .merge(expenses::router())
        .merge(cash_register::router())
        .merge(reports::router())
        .merge(blog::router())
}

/// Builds an inclusive day range from `?from=&to=`, rejecting inverted bounds.
pub(crate) fn date_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<DateRange, ValidationError> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ValidationError::InvalidFormat {
                field: "from".to_string(),
                reason: "must not be after `to`".to_string(),
            });
        }
    }
    Ok(DateRange::new(from, to))
}

/// Trims an optional text field, dropping it when blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_bounds() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();

        assert!(date_range(Some(d("2024-03-01")), Some(d("2024-03-31"))).is_ok());
        assert!(date_range(Some(d("2024-03-01")), Some(d("2024-03-01"))).is_ok());
        assert!(date_range(None, Some(d("2024-03-01"))).is_ok());

        let err = date_range(Some(d("2024-04-01")), Some(d("2024-03-01"))).unwrap_err();
        assert_eq!(err.field(), "from");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  hi ".to_string())), Some("hi".to_string()));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }
}

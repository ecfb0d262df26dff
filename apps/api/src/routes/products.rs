//! Product API handlers.
//!
//! Reads are open to any principal of the owner; writes need
//! `products:manage`. Stock only changes through financial events or the
//! explicit adjustment endpoint.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use cafe_core::validation::{
    validate_code, validate_non_negative_cents, validate_notes, validate_product_name,
    validate_search_query, validate_stock_quantity, validate_text,
};
use cafe_core::{Permission, Quantity, ValidationError, ValidationErrors};
use cafe_db::{NewProduct, ProductFilter, ProductUpdate};
use serde::Deserialize;
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::{created, done, ok, with_message, ApiJson, ApiQuery};
use crate::routes::non_blank;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list).post(create))
        .route("/api/products/low-stock", get(low_stock))
        .route(
            "/api/products/{id}",
            get(get_by_id).put(update).delete(deactivate),
        )
        .route("/api/products/{id}/stock", post(adjust_stock))
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub cost_cents: i64,
    #[serde(default)]
    pub stock_quantity: Quantity,
    #[serde(default)]
    pub minimum_stock: Quantity,
}

impl CreateProductRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_code(&self.code));
        errors.check(validate_product_name(&self.name));
        errors.check(validate_notes("description", self.description.as_deref()));
        if let Some(category) = &self.category {
            errors.check(validate_text("category", category, 0, 100));
        }
        errors.check(validate_non_negative_cents("price_cents", self.price_cents));
        errors.check(validate_non_negative_cents("cost_cents", self.cost_cents));
        errors.check(validate_stock_quantity("stock_quantity", self.stock_quantity));
        errors.check(validate_stock_quantity("minimum_stock", self.minimum_stock));
        errors.into_result()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    pub minimum_stock: Option<Quantity>,
    pub is_active: Option<bool>,
}

impl UpdateProductRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(code) = &self.code {
            errors.check(validate_code(code));
        }
        if let Some(name) = &self.name {
            errors.check(validate_product_name(name));
        }
        errors.check(validate_notes("description", self.description.as_deref()));
        if let Some(category) = &self.category {
            errors.check(validate_text("category", category, 0, 100));
        }
        if let Some(price) = self.price_cents {
            errors.check(validate_non_negative_cents("price_cents", price));
        }
        if let Some(cost) = self.cost_cents {
            errors.check(validate_non_negative_cents("cost_cents", cost));
        }
        if let Some(minimum) = self.minimum_stock {
            errors.check(validate_stock_quantity("minimum_stock", minimum));
        }
        errors.into_result()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StockAdjustmentRequest {
    /// Signed change, e.g. `-2` for breakage or `12.5` for a recount.
    pub delta: Quantity,
    pub reason: Option<String>,
}

impl StockAdjustmentRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.delta == Quantity::zero() {
            errors.push(ValidationError::InvalidFormat {
                field: "delta".to_string(),
                reason: "must not be zero".to_string(),
            });
        }
        if let Some(reason) = &self.reason {
            errors.check(validate_text("reason", reason, 0, 200));
        }
        errors.into_result()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/products
async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<impl IntoResponse> {
    let search = match query.search {
        Some(search) => Some(validate_search_query(&search)?).filter(|s| !s.is_empty()),
        None => None,
    };
    let filter = ProductFilter {
        category: non_blank(query.category),
        search,
        active: query.active,
    };

    let products = state.db.products().list(user.owner_id(), &filter).await?;
    Ok(ok(products))
}

/// GET /api/products/low-stock
async fn low_stock(State(state): State<AppState>, user: CurrentUser) -> ApiResult<impl IntoResponse> {
    let products = state.db.products().low_stock(user.owner_id()).await?;
    Ok(ok(products))
}

/// GET /api/products/{id}
async fn get_by_id(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let product = state.db.products().find(user.owner_id(), &id).await?;
    Ok(ok(product))
}

/// POST /api/products
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreateProductRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::ProductsManage)?;
    req.validate()?;

    let product = state
        .db
        .products()
        .insert(
            user.owner_id(),
            NewProduct {
                code: req.code.trim().to_string(),
                name: req.name.trim().to_string(),
                description: non_blank(req.description),
                category: non_blank(req.category),
                price_cents: req.price_cents,
                cost_cents: req.cost_cents,
                stock_quantity: req.stock_quantity,
                minimum_stock: req.minimum_stock,
            },
        )
        .await?;

    info!(product_id = %product.id, code = %product.code, "Created product");
    Ok(created("Product created", product))
}

/// PUT /api/products/{id}
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateProductRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::ProductsManage)?;
    req.validate()?;

    let changes = ProductUpdate {
        code: req.code.map(|c| c.trim().to_string()),
        name: req.name.map(|n| n.trim().to_string()),
        description: req.description,
        category: req.category,
        price_cents: req.price_cents,
        cost_cents: req.cost_cents,
        minimum_stock: req.minimum_stock,
        is_active: req.is_active,
    };
    let product = state
        .db
        .products()
        .update(user.owner_id(), &id, changes)
        .await?;

    Ok(with_message("Product updated", product))
}

/// DELETE /api/products/{id} - soft delete
async fn deactivate(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::ProductsManage)?;
    state.db.products().deactivate(user.owner_id(), &id).await?;

    info!(product_id = %id, "Deactivated product");
    Ok(done("Product deactivated"))
}

/// POST /api/products/{id}/stock
async fn adjust_stock(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StockAdjustmentRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::ProductsManage)?;
    req.validate()?;

    let product = state
        .db
        .products()
        .adjust_stock(user.owner_id(), &id, req.delta)
        .await?;

    info!(
        product_id = %id,
        delta = %req.delta,
        stock = %product.stock_quantity,
        reason = req.reason.as_deref().unwrap_or("-"),
        "Adjusted stock"
    );
    Ok(with_message("Stock adjusted", product))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_product_validation() {
        let req = CreateProductRequest {
            code: "has space".to_string(),
            name: String::new(),
            description: None,
            category: None,
            price_cents: -1,
            cost_cents: 0,
            stock_quantity: Quantity::from_units(-1),
            minimum_stock: Quantity::zero(),
        };
        let errors = req.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field().to_string()).collect();
        assert_eq!(fields, vec!["code", "name", "price_cents", "stock_quantity"]);
    }

    #[test]
    fn test_zero_adjustment_rejected() {
        let req = StockAdjustmentRequest {
            delta: Quantity::zero(),
            reason: None,
        };
        assert!(req.validate().is_err());

        let req = StockAdjustmentRequest {
            delta: Quantity::from_hundredths(-250),
            reason: Some("spillage".to_string()),
        };
        assert!(req.validate().is_ok());
    }
}

//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - CRUD scoped by owner
//! - Substring search over code and name
//! - Stock movement (manual adjustment and recorder-driven)
//!
//! ## Conditional Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Outbound movement of 5 units                                           │
//! │                                                                         │
//! │  UPDATE products                                                        │
//! │     SET stock_hundredths = stock_hundredths - 500                       │
//! │   WHERE id = ? AND owner_id = ? AND stock_hundredths >= 500             │
//! │       │                                                                 │
//! │       ├── 1 row  → moved                                                │
//! │       └── 0 rows → re-read product → InsufficientStock                  │
//! │                                                                         │
//! │  The check and the decrement are one statement, so two concurrent      │
//! │  sales can never both take the last unit.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, generate_id};
use cafe_core::financial::{ensure_stock, StockDirection};
use cafe_core::{CoreError, Product, Quantity};

const PRODUCT_COLUMNS: &str = "id, owner_id, code, name, description, category, \
     price_cents, cost_cents, stock_hundredths, minimum_stock_hundredths, \
     is_active, created_at, updated_at";

// =============================================================================
// Rows and Inputs
// =============================================================================

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    owner_id: String,
    code: String,
    name: String,
    description: Option<String>,
    category: Option<String>,
    price_cents: i64,
    cost_cents: i64,
    stock_hundredths: i64,
    minimum_stock_hundredths: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            owner_id: row.owner_id,
            code: row.code,
            name: row.name,
            description: row.description,
            category: row.category,
            price_cents: row.price_cents,
            cost_cents: row.cost_cents,
            stock_quantity: Quantity::from_hundredths(row.stock_hundredths),
            minimum_stock: Quantity::from_hundredths(row.minimum_stock_hundredths),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub stock_quantity: Quantity,
    pub minimum_stock: Quantity,
}

/// Partial update; `None` leaves a field unchanged.
///
/// Stock is not editable here. It only moves through sales, invoices and
/// [`ProductRepository::adjust_stock`].
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    pub minimum_stock: Option<Quantity>,
    pub is_active: Option<bool>,
}

/// List filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    /// Substring match on code or name.
    pub search: Option<String>,
    /// `None` lists active products only.
    pub active: Option<bool>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.insert(owner_id, new_product).await?;
/// let low = repo.low_stock(owner_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## Errors
    /// `UniqueViolation` when the owner already has a product with this code.
    pub async fn insert(&self, owner_id: &str, new: NewProduct) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            owner_id: owner_id.to_string(),
            code: new.code.trim().to_string(),
            name: new.name.trim().to_string(),
            description: new.description,
            category: new.category,
            price_cents: new.price_cents,
            cost_cents: new.cost_cents,
            stock_quantity: new.stock_quantity,
            minimum_stock: new.minimum_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, code = %product.code, owner_id, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, owner_id, code, name, description, category,
                price_cents, cost_cents, stock_hundredths, minimum_stock_hundredths,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&product.id)
        .bind(&product.owner_id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock_quantity.hundredths())
        .bind(product.minimum_stock.hundredths())
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&product.code))?;

        Ok(product)
    }

    /// Gets a product by ID, active or not.
    pub async fn get(&self, owner_id: &str, id: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE id = ?1 AND owner_id = ?2",
            PRODUCT_COLUMNS
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Gets a product by ID or fails with `NotFound`.
    pub async fn find(&self, owner_id: &str, id: &str) -> DbResult<Product> {
        self.get(owner_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Lists products, ordered by name.
    pub async fn list(&self, owner_id: &str, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));
        let active = filter.active.unwrap_or(true);

        let sql = format!(
            r#"
            SELECT {}
            FROM products
            WHERE owner_id = ?1
              AND is_active = ?2
              AND (?3 IS NULL OR category = ?3)
              AND (?4 IS NULL OR name LIKE ?4 OR code LIKE ?4)
            ORDER BY name
            "#,
            PRODUCT_COLUMNS
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(owner_id)
            .bind(active)
            .bind(&filter.category)
            .bind(&search)
            .fetch_all(&self.pool)
            .await?;

        debug!(owner_id, count = rows.len(), "Listed products");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Active products at or below their minimum stock.
    pub async fn low_stock(&self, owner_id: &str) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM products
            WHERE owner_id = ?1
              AND is_active = 1
              AND stock_hundredths <= minimum_stock_hundredths
            ORDER BY stock_hundredths, name
            "#,
            PRODUCT_COLUMNS
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Applies a partial update.
    pub async fn update(
        &self,
        owner_id: &str,
        id: &str,
        changes: ProductUpdate,
    ) -> DbResult<Product> {
        let mut product = self.find(owner_id, id).await?;

        if let Some(code) = changes.code {
            product.code = code.trim().to_string();
        }
        if let Some(name) = changes.name {
            product.name = name.trim().to_string();
        }
        if let Some(description) = changes.description {
            product.description = Some(description);
        }
        if let Some(category) = changes.category {
            product.category = Some(category);
        }
        if let Some(price) = changes.price_cents {
            product.price_cents = price;
        }
        if let Some(cost) = changes.cost_cents {
            product.cost_cents = cost;
        }
        if let Some(minimum) = changes.minimum_stock {
            product.minimum_stock = minimum;
        }
        if let Some(active) = changes.is_active {
            product.is_active = active;
        }
        product.updated_at = Utc::now();

        debug!(id, owner_id, "Updating product");

        sqlx::query(
            r#"
            UPDATE products SET
                code = ?3,
                name = ?4,
                description = ?5,
                category = ?6,
                price_cents = ?7,
                cost_cents = ?8,
                minimum_stock_hundredths = ?9,
                is_active = ?10,
                updated_at = ?11
            WHERE id = ?1 AND owner_id = ?2
            "#,
        )
        .bind(&product.id)
        .bind(owner_id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.minimum_stock.hundredths())
        .bind(product.is_active)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&product.code))?;

        Ok(product)
    }

    /// Soft-deletes a product.
    ///
    /// Sales and invoices keep their snapshots; the product just stops
    /// appearing in lists and can no longer be put on new lines.
    pub async fn deactivate(&self, owner_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?3 WHERE id = ?1 AND owner_id = ?2",
        )
        .bind(id)
        .bind(owner_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(id, owner_id, "Deactivated product");
        Ok(())
    }

    /// Adjusts stock by a signed delta (stocktake, waste, breakage).
    ///
    /// ## Errors
    /// `InsufficientStock` if the result would be negative.
    pub async fn adjust_stock(&self, owner_id: &str, id: &str, delta: Quantity) -> DbResult<Product> {
        let mut tx = begin_write(&self.pool).await?;
        let product = fetch_product(&mut tx, owner_id, id).await?;

        let direction = if delta.is_negative() {
            StockDirection::Outbound
        } else {
            StockDirection::Inbound
        };
        let magnitude = if delta.is_negative() { -delta } else { delta };
        move_stock(&mut tx, &product, magnitude, direction).await?;
        tx.commit().await?;

        debug!(id, owner_id, delta = %delta, "Adjusted stock");
        self.find(owner_id, id).await
    }

    /// Counts active products for an owner.
    pub async fn count(&self, owner_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE owner_id = ?1 AND is_active = 1",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers (shared with the recorder)
// =============================================================================

/// Loads a product on the given connection.
pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> DbResult<Product> {
    let sql = format!(
        "SELECT {} FROM products WHERE id = ?1 AND owner_id = ?2",
        PRODUCT_COLUMNS
    );
    sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Product::from)
        .ok_or_else(|| DbError::not_found("Product", id))
}

/// Loads a product that may go on a new line.
pub(crate) async fn fetch_active_product(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> DbResult<Product> {
    let product = fetch_product(conn, owner_id, id).await?;
    if !product.is_active {
        return Err(CoreError::not_found("Product", id).into());
    }
    Ok(product)
}

/// Moves stock for one product.
///
/// Outbound moves are conditional; when the row doesn't match, the product
/// is re-read so the error reports the stock actually available.
pub(crate) async fn move_stock(
    conn: &mut SqliteConnection,
    product: &Product,
    quantity: Quantity,
    direction: StockDirection,
) -> DbResult<()> {
    let delta = direction.delta(quantity).hundredths();
    let now = Utc::now();

    let result = match direction {
        StockDirection::Outbound => {
            sqlx::query(
                r#"
                UPDATE products
                   SET stock_hundredths = stock_hundredths + ?3, updated_at = ?4
                 WHERE id = ?1 AND owner_id = ?2 AND stock_hundredths >= ?5
                "#,
            )
            .bind(&product.id)
            .bind(&product.owner_id)
            .bind(delta)
            .bind(now)
            .bind(quantity.hundredths())
            .execute(&mut *conn)
            .await?
        }
        StockDirection::Inbound => {
            sqlx::query(
                r#"
                UPDATE products
                   SET stock_hundredths = stock_hundredths + ?3, updated_at = ?4
                 WHERE id = ?1 AND owner_id = ?2
                "#,
            )
            .bind(&product.id)
            .bind(&product.owner_id)
            .bind(delta)
            .bind(now)
            .execute(&mut *conn)
            .await?
        }
    };

    if result.rows_affected() == 0 {
        let current = fetch_product(conn, &product.owner_id, &product.id).await?;
        ensure_stock(&current, quantity)?;
        return Err(DbError::Internal(format!(
            "stock update for product {} matched no rows",
            product.id
        )));
    }

    debug!(
        product_id = %product.id,
        code = %product.code,
        delta,
        "Moved stock"
    );
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn espresso() -> NewProduct {
        NewProduct {
            code: "ESP".to_string(),
            name: "Espresso".to_string(),
            description: None,
            category: Some("coffee".to_string()),
            price_cents: 250,
            cost_cents: 80,
            stock_quantity: Quantity::from_units(10),
            minimum_stock: Quantity::from_units(3),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let product = repo.insert("owner-1", espresso()).await.unwrap();
        let found = repo.find("owner-1", &product.id).await.unwrap();
        assert_eq!(found.code, "ESP");
        assert_eq!(found.stock_quantity, Quantity::from_units(10));

        // Other owners can't see it
        assert!(repo.get("owner-2", &product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_per_owner() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert("owner-1", espresso()).await.unwrap();
        let err = repo.insert("owner-1", espresso()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "code"));

        // Same code under another owner is fine
        assert!(repo.insert("owner-2", espresso()).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_filters_and_soft_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let esp = repo.insert("o", espresso()).await.unwrap();
        let mut croissant = espresso();
        croissant.code = "CRO".to_string();
        croissant.name = "Croissant".to_string();
        croissant.category = Some("bakery".to_string());
        repo.insert("o", croissant).await.unwrap();

        let filter = ProductFilter {
            search: Some("cro".to_string()),
            ..Default::default()
        };
        let found = repo.list("o", &filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "CRO");

        repo.deactivate("o", &esp.id).await.unwrap();
        let active = repo.list("o", &ProductFilter::default()).await.unwrap();
        assert_eq!(active.len(), 1);
        let inactive = repo
            .list(
                "o",
                &ProductFilter {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(inactive[0].id, esp.id);
    }

    #[tokio::test]
    async fn test_adjust_stock_and_low_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let product = repo.insert("o", espresso()).await.unwrap();

        let updated = repo
            .adjust_stock("o", &product.id, Quantity::from_units(-8))
            .await
            .unwrap();
        assert_eq!(updated.stock_quantity, Quantity::from_units(2));

        let low = repo.low_stock("o").await.unwrap();
        assert_eq!(low.len(), 1);

        let err = repo
            .adjust_stock("o", &product.id, Quantity::from_units(-5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { .. })
        ));
        assert_eq!(
            repo.find("o", &product.id).await.unwrap().stock_quantity,
            Quantity::from_units(2)
        );
    }

    #[tokio::test]
    async fn test_update_product() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let product = repo.insert("o", espresso()).await.unwrap();

        let updated = repo
            .update(
                "o",
                &product.id,
                ProductUpdate {
                    price_cents: Some(300),
                    name: Some("Double Espresso".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price_cents, 300);
        assert_eq!(updated.name, "Double Espresso");
        assert_eq!(updated.cost_cents, 80);
    }
}

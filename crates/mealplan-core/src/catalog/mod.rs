//! The `Catalog` trait -- read-only food lookup used when a plan is read
//! back.
//!
//! The reconciler never consults the catalog while saving. The trait is
//! object-safe so callers can hold an `Arc<dyn Catalog>`.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use mealplan_db::models::FoodItem;
use mealplan_db::queries::foods;

/// What a read needs to know about one food.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodInfo {
    pub name: String,
    /// Price of one serving.
    pub unit_price: f64,
    /// Calories of one serving.
    pub calories: f64,
}

impl From<FoodItem> for FoodInfo {
    fn from(item: FoodItem) -> Self {
        Self {
            name: item.name,
            unit_price: item.price,
            calories: item.calories,
        }
    }
}

/// Resolves food identifiers to display names, prices, and calories.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Look up every id in `food_ids` at once.
    ///
    /// Ids the catalog does not know are absent from the returned map; that
    /// is not an error.
    async fn resolve_foods(&self, food_ids: &[i32]) -> Result<HashMap<i32, FoodInfo>>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn Catalog) {}
};

/// Catalog backed by the `food_items` table.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn resolve_foods(&self, food_ids: &[i32]) -> Result<HashMap<i32, FoodInfo>> {
        let items = foods::get_food_items(&self.pool, food_ids).await?;
        Ok(items
            .into_iter()
            .map(|item| (item.id, FoodInfo::from(item)))
            .collect())
    }
}

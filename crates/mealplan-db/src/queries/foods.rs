//! Read access to the `food_items` catalog table.
//!
//! The catalog is maintained elsewhere; `insert_food_item` exists for
//! seeding and tests.

use anyhow::{Context, Result};
use sqlx::PgExecutor;

use crate::models::FoodItem;

/// Fields of a catalog entry to insert.
#[derive(Debug, Clone, Copy)]
pub struct NewFoodItem<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub image: Option<&'a str>,
    pub price: f64,
    pub calories: f64,
}

/// Insert a catalog entry.
pub async fn insert_food_item<'e, E: PgExecutor<'e>>(
    executor: E,
    item: &NewFoodItem<'_>,
) -> Result<FoodItem> {
    let food = sqlx::query_as::<_, FoodItem>(
        "INSERT INTO food_items (name, description, image, price, calories) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(item.name)
    .bind(item.description)
    .bind(item.image)
    .bind(item.price)
    .bind(item.calories)
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to insert food item {:?}", item.name))?;

    Ok(food)
}

/// Fetch the catalog entries for a set of ids. Unknown ids are skipped.
pub async fn get_food_items<'e, E: PgExecutor<'e>>(executor: E, ids: &[i32]) -> Result<Vec<FoodItem>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let foods = sqlx::query_as::<_, FoodItem>(
        "SELECT * FROM food_items WHERE id = ANY($1) ORDER BY id",
    )
    .bind(ids)
    .fetch_all(executor)
    .await
    .context("failed to fetch food items")?;

    Ok(foods)
}

//! Database query functions for the `meal_plan_details` table.

use anyhow::{Context, Result};
use sqlx::PgExecutor;

use crate::models::{MealPlanDetail, PlannedMeal};

/// Delete every detail row of a plan. Returns the number of rows removed.
pub async fn delete_details_for_plan<'e, E: PgExecutor<'e>>(
    executor: E,
    meal_plan_id: i32,
) -> Result<u64> {
    let result = sqlx::query("DELETE FROM meal_plan_details WHERE meal_plan_id = $1")
        .bind(meal_plan_id)
        .execute(executor)
        .await
        .with_context(|| format!("failed to delete details of meal plan {meal_plan_id}"))?;

    Ok(result.rows_affected())
}

/// Insert all `meals` for a plan in a single statement.
///
/// Each row's `position` is its index in `meals`, which is the order reads
/// return. An empty slice issues no statement.
pub async fn insert_details<'e, E: PgExecutor<'e>>(
    executor: E,
    meal_plan_id: i32,
    meals: &[PlannedMeal],
) -> Result<u64> {
    if meals.is_empty() {
        return Ok(0);
    }

    let count = i32::try_from(meals.len()).context("too many meals in one plan")?;
    let positions: Vec<i32> = (0..count).collect();
    let meal_times: Vec<String> = meals.iter().map(|m| m.meal_time.to_string()).collect();
    let days: Vec<String> = meals.iter().map(|m| m.day_of_week.to_string()).collect();
    let food_ids: Vec<i32> = meals.iter().map(|m| m.food_id).collect();
    let quantities: Vec<i32> = meals.iter().map(|m| m.quantity).collect();

    let result = sqlx::query(
        "INSERT INTO meal_plan_details \
             (meal_plan_id, position, meal_time, day_of_week, food_id, quantity) \
         SELECT $1, t.position, t.meal_time, t.day_of_week, t.food_id, t.quantity \
         FROM UNNEST($2::int4[], $3::text[], $4::text[], $5::int4[], $6::int4[]) \
             AS t(position, meal_time, day_of_week, food_id, quantity)",
    )
    .bind(meal_plan_id)
    .bind(positions)
    .bind(meal_times)
    .bind(days)
    .bind(food_ids)
    .bind(quantities)
    .execute(executor)
    .await
    .with_context(|| format!("failed to insert details of meal plan {meal_plan_id}"))?;

    Ok(result.rows_affected())
}

/// Fetch the details of every listed plan in one query, grouped by plan and
/// ordered by request position within each plan.
pub async fn list_details_for_plans<'e, E: PgExecutor<'e>>(
    executor: E,
    meal_plan_ids: &[i32],
) -> Result<Vec<MealPlanDetail>> {
    if meal_plan_ids.is_empty() {
        return Ok(Vec::new());
    }

    let details = sqlx::query_as::<_, MealPlanDetail>(
        "SELECT * FROM meal_plan_details \
         WHERE meal_plan_id = ANY($1) \
         ORDER BY meal_plan_id, position",
    )
    .bind(meal_plan_ids)
    .fetch_all(executor)
    .await
    .context("failed to list meal plan details")?;

    Ok(details)
}

/// Count the detail rows referencing a plan.
pub async fn count_details_for_plan<'e, E: PgExecutor<'e>>(
    executor: E,
    meal_plan_id: i32,
) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM meal_plan_details WHERE meal_plan_id = $1")
            .bind(meal_plan_id)
            .fetch_one(executor)
            .await
            .context("failed to count meal plan details")?;

    Ok(count)
}

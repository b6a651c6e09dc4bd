//! Database query functions for the `meal_plans` table.
//!
//! Every function is generic over [`PgExecutor`] so it can run against the
//! pool directly or inside a caller-owned transaction.

use anyhow::{Context, Result};
use sqlx::PgExecutor;

use crate::models::{MealPlan, MealPlanHeader};

/// Advisory lock key guarding identifier allocation ("mealplan" in ASCII).
pub const ID_ALLOCATION_LOCK_KEY: i64 = 0x6d65_616c_706c_616e;

/// Take the identifier-allocation lock exclusively for the rest of the
/// current transaction.
///
/// Held by creates across the recycle scan and the header insert, so no two
/// creates can claim the same identifier and no other writer can change
/// which identifiers are recyclable in between.
pub async fn lock_id_allocation<'e, E: PgExecutor<'e>>(executor: E) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(ID_ALLOCATION_LOCK_KEY)
        .execute(executor)
        .await
        .context("failed to acquire id allocation lock")?;

    Ok(())
}

/// Take the identifier-allocation lock in shared mode for the rest of the
/// current transaction.
///
/// Updates and deletes hold it so they never interleave with a create's
/// recycle scan, while still running concurrently with each other.
pub async fn lock_id_allocation_shared<'e, E: PgExecutor<'e>>(executor: E) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock_shared($1)")
        .bind(ID_ALLOCATION_LOCK_KEY)
        .execute(executor)
        .await
        .context("failed to acquire shared id allocation lock")?;

    Ok(())
}

/// Insert a header and let the id sequence assign its identifier.
pub async fn insert_plan<'e, E: PgExecutor<'e>>(
    executor: E,
    header: &MealPlanHeader,
) -> Result<MealPlan> {
    let plan = sqlx::query_as::<_, MealPlan>(
        "INSERT INTO meal_plans (range_start, range_end, people_count, children_count, total_cost) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(header.range_start)
    .bind(header.range_end)
    .bind(header.people_count)
    .bind(header.children_count)
    .bind(header.total_cost)
    .fetch_one(executor)
    .await
    .context("failed to insert meal plan")?;

    Ok(plan)
}

/// Write a header under an explicit identifier.
///
/// Used when recycling: the identifier is either a gap left by a delete or
/// a header that currently has no details. In the latter case the existing
/// header is overwritten in place and treated as freshly created.
pub async fn upsert_plan_with_id<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i32,
    header: &MealPlanHeader,
) -> Result<MealPlan> {
    let plan = sqlx::query_as::<_, MealPlan>(
        "INSERT INTO meal_plans (id, range_start, range_end, people_count, children_count, total_cost) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (id) DO UPDATE SET \
             range_start = EXCLUDED.range_start, \
             range_end = EXCLUDED.range_end, \
             people_count = EXCLUDED.people_count, \
             children_count = EXCLUDED.children_count, \
             total_cost = EXCLUDED.total_cost, \
             created_at = now(), \
             updated_at = now() \
         RETURNING *",
    )
    .bind(id)
    .bind(header.range_start)
    .bind(header.range_end)
    .bind(header.people_count)
    .bind(header.children_count)
    .bind(header.total_cost)
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to insert meal plan with id {id}"))?;

    Ok(plan)
}

/// Overwrite the header fields of an existing plan.
///
/// Returns `None` when no plan has this identifier.
pub async fn update_plan<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i32,
    header: &MealPlanHeader,
) -> Result<Option<MealPlan>> {
    let plan = sqlx::query_as::<_, MealPlan>(
        "UPDATE meal_plans \
         SET range_start = $1, range_end = $2, people_count = $3, \
             children_count = $4, total_cost = $5, updated_at = now() \
         WHERE id = $6 \
         RETURNING *",
    )
    .bind(header.range_start)
    .bind(header.range_end)
    .bind(header.people_count)
    .bind(header.children_count)
    .bind(header.total_cost)
    .bind(id)
    .fetch_optional(executor)
    .await
    .with_context(|| format!("failed to update meal plan {id}"))?;

    Ok(plan)
}

/// Delete a header. Returns the number of rows removed (0 or 1).
///
/// Fails with a foreign key violation if details still reference it.
pub async fn delete_plan<'e, E: PgExecutor<'e>>(executor: E, id: i32) -> Result<u64> {
    let result = sqlx::query("DELETE FROM meal_plans WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .with_context(|| format!("failed to delete meal plan {id}"))?;

    Ok(result.rows_affected())
}

/// Fetch a plan header by its identifier.
pub async fn get_plan<'e, E: PgExecutor<'e>>(executor: E, id: i32) -> Result<Option<MealPlan>> {
    let plan = sqlx::query_as::<_, MealPlan>("SELECT * FROM meal_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("failed to fetch meal plan")?;

    Ok(plan)
}

/// List all plan headers, newest identifier first.
pub async fn list_plans<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<MealPlan>> {
    let plans = sqlx::query_as::<_, MealPlan>("SELECT * FROM meal_plans ORDER BY id DESC")
        .fetch_all(executor)
        .await
        .context("failed to list meal plans")?;

    Ok(plans)
}

/// Find the smallest identifier a new plan may take over.
///
/// Candidates are headers with no detail rows, plus identifiers the id
/// sequence has already issued that no header currently holds. Every
/// candidate is at most the sequence's last value, so ids handed out later
/// by the sequence never collide with a recycled one.
///
/// Computed fresh on every call.
pub async fn smallest_recyclable_id<'e, E: PgExecutor<'e>>(executor: E) -> Result<Option<i32>> {
    let id: Option<i32> = sqlx::query_scalar(
        "SELECT MIN(free.id) FROM ( \
             SELECT p.id FROM meal_plans p \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM meal_plan_details d WHERE d.meal_plan_id = p.id \
             ) \
             UNION ALL \
             SELECT g.id FROM generate_series( \
                 1, \
                 COALESCE( \
                     pg_sequence_last_value(pg_get_serial_sequence('meal_plans', 'id')::regclass), \
                     0 \
                 )::integer \
             ) AS g(id) \
             WHERE NOT EXISTS (SELECT 1 FROM meal_plans p WHERE p.id = g.id) \
         ) AS free",
    )
    .fetch_one(executor)
    .await
    .context("failed to scan for recyclable meal plan ids")?;

    Ok(id)
}

/// Count plan headers.
pub async fn count_plans<'e, E: PgExecutor<'e>>(executor: E) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM meal_plans")
        .fetch_one(executor)
        .await
        .context("failed to count meal plans")?;

    Ok(count)
}

//! Plan reconciler write path: save (create or update) and delete.
//!
//! Each operation runs inside one database transaction. Creates take the
//! identifier-allocation advisory lock exclusively before scanning for a
//! recyclable identifier; updates and deletes take it shared. Any failing
//! step drops the transaction, which rolls everything back.

use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};

use mealplan_db::models::{MealPlanHeader, PlannedMeal};
use mealplan_db::queries::{plan_details, plans};

use super::error::{PlanError, PlanStep};
use super::request::{SaveOutcome, SavePlanRequest};

/// Save a meal plan, creating it or replacing an existing one.
///
/// - Without `meal_plan_id`: allocates the smallest recyclable identifier
///   (a header with no details, or a gap left by a delete), or a fresh
///   sequence value when there is none, then inserts the header and meals.
/// - With `meal_plan_id`: overwrites the header, deletes every existing
///   detail row, and inserts `meals`. Fails with [`PlanError::NotFound`] if
///   the plan does not exist.
///
/// Either way, on success the plan's details are exactly `request.meals` in
/// order; on failure nothing is written.
pub async fn save_meal_plan(
    pool: &PgPool,
    request: &SavePlanRequest,
) -> Result<SaveOutcome, PlanError> {
    request.validate()?;
    let header = request.header();

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| PlanError::storage(PlanStep::BeginTransaction, e))?;

    let outcome = match request.meal_plan_id {
        Some(id) => replace_plan(&mut tx, id, &header, &request.meals).await?,
        None => create_plan(&mut tx, &header, &request.meals).await?,
    };

    tx.commit()
        .await
        .map_err(|e| PlanError::storage(PlanStep::Commit, e))?;

    info!(
        meal_plan_id = outcome.meal_plan_id,
        created = outcome.created,
        recycled = outcome.recycled,
        meals = request.meals.len(),
        "meal plan saved"
    );
    Ok(outcome)
}

/// Create path: pick an identifier, write the header, then the meals.
async fn create_plan(
    conn: &mut PgConnection,
    header: &MealPlanHeader,
    meals: &[PlannedMeal],
) -> Result<SaveOutcome, PlanError> {
    plans::lock_id_allocation(&mut *conn)
        .await
        .map_err(|e| PlanError::storage(PlanStep::IdAllocationLock, e))?;

    let recyclable = plans::smallest_recyclable_id(&mut *conn)
        .await
        .map_err(|e| PlanError::storage(PlanStep::RecycleScan, e))?;

    let plan = match recyclable {
        Some(id) => {
            debug!(meal_plan_id = id, "reusing recyclable meal plan id");
            plans::upsert_plan_with_id(&mut *conn, id, header).await
        }
        None => plans::insert_plan(&mut *conn, header).await,
    }
    .map_err(|e| PlanError::storage(PlanStep::HeaderWrite, e))?;

    plan_details::insert_details(&mut *conn, plan.id, meals)
        .await
        .map_err(|e| PlanError::storage(PlanStep::DetailInsert, e))?;

    Ok(SaveOutcome {
        meal_plan_id: plan.id,
        created: true,
        recycled: recyclable.is_some(),
    })
}

/// Update path: overwrite the header, then replace the meals wholesale.
async fn replace_plan(
    conn: &mut PgConnection,
    id: i32,
    header: &MealPlanHeader,
    meals: &[PlannedMeal],
) -> Result<SaveOutcome, PlanError> {
    plans::lock_id_allocation_shared(&mut *conn)
        .await
        .map_err(|e| PlanError::storage(PlanStep::IdAllocationLock, e))?;

    let updated = plans::update_plan(&mut *conn, id, header)
        .await
        .map_err(|e| PlanError::storage(PlanStep::HeaderWrite, e))?;
    if updated.is_none() {
        return Err(PlanError::NotFound(id));
    }

    let removed = plan_details::delete_details_for_plan(&mut *conn, id)
        .await
        .map_err(|e| PlanError::storage(PlanStep::DetailDelete, e))?;

    plan_details::insert_details(&mut *conn, id, meals)
        .await
        .map_err(|e| PlanError::storage(PlanStep::DetailInsert, e))?;

    debug!(meal_plan_id = id, removed, inserted = meals.len(), "replaced meal plan details");
    Ok(SaveOutcome {
        meal_plan_id: id,
        created: false,
        recycled: false,
    })
}

/// Delete a plan: its details first, then its header.
///
/// Returns [`PlanError::NotFound`] without changing anything when no plan
/// has this identifier. The identifier becomes recyclable for the next
/// create.
pub async fn delete_meal_plan(pool: &PgPool, id: i32) -> Result<(), PlanError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| PlanError::storage(PlanStep::BeginTransaction, e))?;

    plans::lock_id_allocation_shared(&mut *tx)
        .await
        .map_err(|e| PlanError::storage(PlanStep::IdAllocationLock, e))?;

    let removed = plan_details::delete_details_for_plan(&mut *tx, id)
        .await
        .map_err(|e| PlanError::storage(PlanStep::DetailDelete, e))?;

    let deleted = plans::delete_plan(&mut *tx, id)
        .await
        .map_err(|e| PlanError::storage(PlanStep::HeaderDelete, e))?;
    if deleted == 0 {
        return Err(PlanError::NotFound(id));
    }

    tx.commit()
        .await
        .map_err(|e| PlanError::storage(PlanStep::Commit, e))?;

    info!(meal_plan_id = id, details = removed, "meal plan deleted");
    Ok(())
}

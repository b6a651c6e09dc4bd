//! Plan reconciler read path: list all plans or assemble one.
//!
//! Headers and details are fetched inside one repeatable-read transaction so
//! a concurrent save can never be observed half-applied. Details for every
//! fetched header come from a single batched query and are grouped in
//! memory.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use mealplan_db::models::{MealPlan, MealPlanDetail, PlannedMeal};
use mealplan_db::queries::{plan_details, plans};

use super::error::{PlanError, PlanStep};
use crate::catalog::{Catalog, FoodInfo};

/// A plan header with its meals in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlanWithDetails {
    #[serde(flatten)]
    pub plan: MealPlan,
    pub details: Vec<ListedMeal>,
}

/// One meal of a listed plan, named from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedMeal {
    #[serde(flatten)]
    pub meal: PlannedMeal,
    /// `None` when the catalog has no entry for `food_id`.
    pub food_name: Option<String>,
}

/// One meal of an assembled plan, enriched from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlanLine {
    #[serde(flatten)]
    pub meal: PlannedMeal,
    /// `None` when the catalog has no entry for `food_id`.
    pub food_name: Option<String>,
    pub line_price: f64,
    pub line_calories: f64,
}

/// A fully assembled plan with catalog names and running totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlanView {
    #[serde(flatten)]
    pub plan: MealPlan,
    pub details: Vec<MealPlanLine>,
    pub total_calories: f64,
    pub total_price: f64,
}

async fn begin_snapshot(pool: &PgPool) -> Result<Transaction<'static, Postgres>, PlanError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| PlanError::storage(PlanStep::BeginTransaction, e))?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await
        .map_err(|e| PlanError::storage(PlanStep::BeginTransaction, e))?;
    Ok(tx)
}

/// List every plan, newest identifier first, each with its meals named
/// from `catalog`.
///
/// A plan without details carries an empty `details` list. Every food across
/// the whole listing is resolved with a single catalog call.
pub async fn list_meal_plans(
    pool: &PgPool,
    catalog: &dyn Catalog,
) -> Result<Vec<MealPlanWithDetails>, PlanError> {
    let mut tx = begin_snapshot(pool).await?;

    let headers = plans::list_plans(&mut *tx)
        .await
        .map_err(|e| PlanError::storage(PlanStep::HeaderRead, e))?;

    let ids: Vec<i32> = headers.iter().map(|p| p.id).collect();
    let details = plan_details::list_details_for_plans(&mut *tx, &ids)
        .await
        .map_err(|e| PlanError::storage(PlanStep::DetailRead, e))?;

    tx.commit()
        .await
        .map_err(|e| PlanError::storage(PlanStep::Commit, e))?;

    let foods = resolve_foods(catalog, &details).await?;

    let mut grouped = group_details(details);
    Ok(headers
        .into_iter()
        .map(|plan| {
            let details = grouped
                .remove(&plan.id)
                .unwrap_or_default()
                .iter()
                .map(|detail| ListedMeal {
                    meal: detail.to_planned(),
                    food_name: foods.get(&detail.food_id).map(|f| f.name.clone()),
                })
                .collect();
            MealPlanWithDetails { plan, details }
        })
        .collect())
}

/// Fetch one plan and enrich its meals from `catalog`.
pub async fn get_meal_plan(
    pool: &PgPool,
    catalog: &dyn Catalog,
    id: i32,
) -> Result<MealPlanView, PlanError> {
    let mut tx = begin_snapshot(pool).await?;

    let plan = plans::get_plan(&mut *tx, id)
        .await
        .map_err(|e| PlanError::storage(PlanStep::HeaderRead, e))?
        .ok_or(PlanError::NotFound(id))?;

    let details = plan_details::list_details_for_plans(&mut *tx, &[id])
        .await
        .map_err(|e| PlanError::storage(PlanStep::DetailRead, e))?;

    tx.commit()
        .await
        .map_err(|e| PlanError::storage(PlanStep::Commit, e))?;

    let foods = resolve_foods(catalog, &details).await?;
    Ok(assemble_view(plan, &details, &foods))
}

/// Look up each distinct food referenced by `details`, once.
async fn resolve_foods(
    catalog: &dyn Catalog,
    details: &[MealPlanDetail],
) -> Result<HashMap<i32, FoodInfo>, PlanError> {
    if details.is_empty() {
        return Ok(HashMap::new());
    }
    let food_ids: Vec<i32> = details
        .iter()
        .map(|d| d.food_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    catalog
        .resolve_foods(&food_ids)
        .await
        .map_err(|e| PlanError::storage(PlanStep::CatalogLookup, e))
}

/// Group detail rows by plan, keeping each plan's rows in the order given.
pub fn group_details(details: Vec<MealPlanDetail>) -> HashMap<i32, Vec<MealPlanDetail>> {
    let mut grouped: HashMap<i32, Vec<MealPlanDetail>> = HashMap::new();
    for detail in details {
        grouped.entry(detail.meal_plan_id).or_default().push(detail);
    }
    grouped
}

/// Build the enriched view of one plan.
///
/// Each line contributes `unit_price * quantity` and `calories * quantity`
/// to the totals, using catalog figures as given. Lines whose food is
/// unknown to the catalog contribute nothing.
pub fn assemble_view(
    plan: MealPlan,
    details: &[MealPlanDetail],
    foods: &HashMap<i32, FoodInfo>,
) -> MealPlanView {
    let lines: Vec<MealPlanLine> = details
        .iter()
        .map(|detail| {
            let food = foods.get(&detail.food_id);
            let quantity = f64::from(detail.quantity);
            MealPlanLine {
                meal: detail.to_planned(),
                food_name: food.map(|f| f.name.clone()),
                line_price: food.map_or(0.0, |f| f.unit_price * quantity),
                line_calories: food.map_or(0.0, |f| f.calories * quantity),
            }
        })
        .collect();

    let total_price: f64 = lines.iter().map(|l| l.line_price).sum();
    let total_calories: f64 = lines.iter().map(|l| l.line_calories).sum();

    MealPlanView {
        plan,
        details: lines,
        total_calories,
        total_price,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use mealplan_db::models::{DayOfWeek, MealTime};

    use super::*;

    fn plan(id: i32) -> MealPlan {
        MealPlan {
            id,
            range_start: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            range_end: NaiveDate::from_ymd_opt(2024, 6, 9).unwrap(),
            people_count: 2,
            children_count: 0,
            total_cost: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn detail(row: i64, plan_id: i32, position: i32, food_id: i32, quantity: i32) -> MealPlanDetail {
        MealPlanDetail {
            id: row,
            meal_plan_id: plan_id,
            position,
            meal_time: MealTime::Lunch,
            day_of_week: DayOfWeek::Wednesday,
            food_id,
            quantity,
        }
    }

    #[test]
    fn group_details_preserves_order_per_plan() {
        let grouped = group_details(vec![
            detail(1, 1, 0, 10, 1),
            detail(2, 2, 0, 11, 1),
            detail(3, 1, 1, 12, 1),
        ]);
        let plan_one: Vec<i32> = grouped[&1].iter().map(|d| d.food_id).collect();
        assert_eq!(plan_one, vec![10, 12]);
        assert_eq!(grouped[&2].len(), 1);
        assert!(!grouped.contains_key(&3));
    }

    #[test]
    fn assemble_view_sums_line_contributions() {
        let mut foods = HashMap::new();
        foods.insert(
            10,
            FoodInfo {
                name: "pho".into(),
                unit_price: 45_000.0,
                calories: 420.0,
            },
        );
        foods.insert(
            12,
            FoodInfo {
                name: "che".into(),
                unit_price: 15_000.0,
                calories: 250.0,
            },
        );

        let view = assemble_view(
            plan(1),
            &[detail(1, 1, 0, 10, 2), detail(2, 1, 1, 12, 1)],
            &foods,
        );

        assert_eq!(view.details.len(), 2);
        assert_eq!(view.details[0].food_name.as_deref(), Some("pho"));
        assert_eq!(view.details[0].line_price, 90_000.0);
        assert_eq!(view.details[0].line_calories, 840.0);
        assert_eq!(view.total_price, 105_000.0);
        assert_eq!(view.total_calories, 1_090.0);
    }

    #[test]
    fn assemble_view_tolerates_unknown_food() {
        let view = assemble_view(plan(4), &[detail(1, 4, 0, 99, 3)], &HashMap::new());
        assert_eq!(view.details[0].food_name, None);
        assert_eq!(view.details[0].meal.quantity, 3);
        assert_eq!(view.total_price, 0.0);
        assert_eq!(view.total_calories, 0.0);
    }

    #[test]
    fn assemble_view_of_empty_plan() {
        let view = assemble_view(plan(5), &[], &HashMap::new());
        assert!(view.details.is_empty());
        assert_eq!(view.total_price, 0.0);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], 5);
        assert_eq!(json["details"], serde_json::json!([]));
    }
}

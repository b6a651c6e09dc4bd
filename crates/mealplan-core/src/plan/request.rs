//! Save request and outcome types, with validation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use mealplan_db::models::{MealPlanHeader, PlannedMeal};

use super::error::PlanError;

/// A client's submission of a full meal plan.
///
/// Without `meal_plan_id` the save creates a plan; with it, the save
/// overwrites that plan's header and replaces all of its meals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavePlanRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_plan_id: Option<i32>,
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    #[serde(default)]
    pub people_count: i32,
    #[serde(default)]
    pub children_count: i32,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub meals: Vec<PlannedMeal>,
}

impl SavePlanRequest {
    /// The header fields to write.
    pub fn header(&self) -> MealPlanHeader {
        MealPlanHeader {
            range_start: self.range_start,
            range_end: self.range_end,
            people_count: self.people_count,
            children_count: self.children_count,
            total_cost: self.total_cost,
        }
    }

    /// Check the request before any statement runs.
    ///
    /// Reports every problem found, not just the first.
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut problems: Vec<String> = Vec::new();

        if let Some(id) = self.meal_plan_id.filter(|id| *id <= 0) {
            problems.push(format!("meal_plan_id must be positive, got {id}"));
        }
        if self.range_end < self.range_start {
            problems.push(format!(
                "range_end {} precedes range_start {}",
                self.range_end, self.range_start
            ));
        }
        if self.people_count < 0 {
            problems.push(format!("people_count must not be negative, got {}", self.people_count));
        }
        if self.children_count < 0 {
            problems.push(format!(
                "children_count must not be negative, got {}",
                self.children_count
            ));
        }
        // Stored as given; only values PostgreSQL can round-trip are refused.
        if !self.total_cost.is_finite() {
            problems.push(format!("total_cost must be a finite number, got {}", self.total_cost));
        }
        for (index, meal) in self.meals.iter().enumerate() {
            if meal.quantity <= 0 {
                problems.push(format!(
                    "meals[{index}] ({} {}): quantity must be positive, got {}",
                    meal.day_of_week, meal.meal_time, meal.quantity
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(PlanError::Invalid(problems.join("; ")))
        }
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    /// The identifier the plan is stored under.
    pub meal_plan_id: i32,
    /// `true` when the save created a plan rather than updating one.
    pub created: bool,
    /// `true` when a created plan took over a recyclable identifier.
    pub recycled: bool,
}

#[cfg(test)]
mod tests {
    use mealplan_db::models::{DayOfWeek, MealTime};

    use super::*;

    fn request() -> SavePlanRequest {
        SavePlanRequest {
            meal_plan_id: None,
            range_start: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            range_end: NaiveDate::from_ymd_opt(2024, 6, 9).unwrap(),
            people_count: 2,
            children_count: 1,
            total_cost: 120_000.0,
            meals: vec![PlannedMeal {
                meal_time: MealTime::Breakfast,
                day_of_week: DayOfWeek::Monday,
                food_id: 7,
                quantity: 2,
            }],
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn single_day_range_is_valid() {
        let mut req = request();
        req.range_end = req.range_start;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn reversed_range_is_rejected() {
        let mut req = request();
        req.range_end = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let err = req.validate().unwrap_err();
        assert!(err.is_invalid());
        assert!(err.to_string().contains("precedes range_start"), "{err}");
    }

    #[test]
    fn every_problem_is_reported() {
        let mut req = request();
        req.people_count = -1;
        req.total_cost = f64::NAN;
        req.meals[0].quantity = 0;
        let msg = req.validate().unwrap_err().to_string();
        assert!(msg.contains("people_count"), "{msg}");
        assert!(msg.contains("total_cost"), "{msg}");
        assert!(msg.contains("meals[0] (monday breakfast)"), "{msg}");
    }

    #[test]
    fn total_cost_is_taken_verbatim() {
        let mut req = request();
        req.total_cost = -2_500.5;
        assert!(req.validate().is_ok());

        req.total_cost = f64::INFINITY;
        assert!(req.validate().unwrap_err().to_string().contains("total_cost"));
    }

    #[test]
    fn non_positive_plan_id_is_rejected() {
        let mut req = request();
        req.meal_plan_id = Some(0);
        assert!(req.validate().unwrap_err().is_invalid());
    }

    #[test]
    fn deserializes_with_defaults() {
        let req: SavePlanRequest = serde_json::from_str(
            r#"{"range_start":"2024-06-03","range_end":"2024-06-09"}"#,
        )
        .unwrap();
        assert_eq!(req.meal_plan_id, None);
        assert_eq!(req.people_count, 0);
        assert!(req.meals.is_empty());
        assert!(req.validate().is_ok());
    }
}

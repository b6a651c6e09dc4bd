//! The plan reconciler: save, delete, list, and read-assembly of meal plans.

pub mod error;
pub mod read;
pub mod request;
pub mod service;

pub use error::{PlanError, PlanStep};
pub use read::{
    ListedMeal, MealPlanLine, MealPlanView, MealPlanWithDetails, get_meal_plan, list_meal_plans,
};
pub use request::{SaveOutcome, SavePlanRequest};
pub use service::{delete_meal_plan, save_meal_plan};

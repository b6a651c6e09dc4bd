use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which meal of the day a detail row fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MealTime {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealTime {
    pub const ALL: [MealTime; 4] = [Self::Breakfast, Self::Lunch, Self::Dinner, Self::Snack];
}

impl fmt::Display for MealTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
        };
        f.write_str(s)
    }
}

impl FromStr for MealTime {
    type Err = MealTimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            "snack" => Ok(Self::Snack),
            _ => Err(MealTimeParseError(s.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`MealTime`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid meal time: {0:?}")]
pub struct MealTimeParseError(pub String);

// ---------------------------------------------------------------------------

/// Day of the week a detail row is scheduled for.
///
/// Stored as the full lowercase name; three-letter abbreviations are accepted
/// on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeek {
    #[serde(alias = "mon")]
    Monday,
    #[serde(alias = "tue")]
    Tuesday,
    #[serde(alias = "wed")]
    Wednesday,
    #[serde(alias = "thu")]
    Thursday,
    #[serde(alias = "fri")]
    Friday,
    #[serde(alias = "sat")]
    Saturday,
    #[serde(alias = "sun")]
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        };
        f.write_str(s)
    }
}

impl FromStr for DayOfWeek {
    type Err = DayOfWeekParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "monday" | "mon" => Ok(Self::Monday),
            "tuesday" | "tue" => Ok(Self::Tuesday),
            "wednesday" | "wed" => Ok(Self::Wednesday),
            "thursday" | "thu" => Ok(Self::Thursday),
            "friday" | "fri" => Ok(Self::Friday),
            "saturday" | "sat" => Ok(Self::Saturday),
            "sunday" | "sun" => Ok(Self::Sunday),
            _ => Err(DayOfWeekParseError(s.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`DayOfWeek`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid day of week: {0:?}")]
pub struct DayOfWeekParseError(pub String);

// ---------------------------------------------------------------------------
// Write-side structs
// ---------------------------------------------------------------------------

/// Header fields written on every save. The identifier travels separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlanHeader {
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub people_count: i32,
    pub children_count: i32,
    /// Computed by the client and stored verbatim.
    pub total_cost: f64,
}

/// One meal slot, as submitted by a client and as read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedMeal {
    pub meal_time: MealTime,
    pub day_of_week: DayOfWeek,
    pub food_id: i32,
    pub quantity: i32,
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A meal plan header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MealPlan {
    pub id: i32,
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub people_count: i32,
    pub children_count: i32,
    pub total_cost: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored meal slot assignment belonging to one plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MealPlanDetail {
    pub id: i64,
    pub meal_plan_id: i32,
    /// Index of the meal in the save request that produced this row.
    pub position: i32,
    pub meal_time: MealTime,
    pub day_of_week: DayOfWeek,
    pub food_id: i32,
    pub quantity: i32,
}

impl MealPlanDetail {
    /// The submitted shape of this row, without storage bookkeeping.
    pub fn to_planned(&self) -> PlannedMeal {
        PlannedMeal {
            meal_time: self.meal_time,
            day_of_week: self.day_of_week,
            food_id: self.food_id,
            quantity: self.quantity,
        }
    }
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FoodItem {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    /// Price of one serving.
    pub price: f64,
    /// Calories of one serving.
    pub calories: f64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

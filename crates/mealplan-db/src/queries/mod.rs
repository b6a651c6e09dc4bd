pub mod foods;
pub mod plan_details;
pub mod plans;

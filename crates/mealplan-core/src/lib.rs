//! Meal plan reconciliation: deciding create versus update, recycling plan
//! identifiers, replacing detail rows atomically, and assembling plans for
//! reads.

pub mod catalog;
pub mod plan;

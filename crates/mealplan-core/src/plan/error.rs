//! Error taxonomy for the plan reconciler.

use std::fmt;

use thiserror::Error;
use tracing::warn;

/// The storage step a reconciler operation was executing when it failed.
///
/// Every save and delete runs in a single transaction, so a failure at any
/// step means the store is unchanged. The step is still reported so an
/// operator can tell which statement the database rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStep {
    BeginTransaction,
    IdAllocationLock,
    RecycleScan,
    HeaderWrite,
    DetailDelete,
    DetailInsert,
    HeaderDelete,
    HeaderRead,
    DetailRead,
    CatalogLookup,
    Commit,
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BeginTransaction => "begin transaction",
            Self::IdAllocationLock => "id allocation lock",
            Self::RecycleScan => "recycle scan",
            Self::HeaderWrite => "header write",
            Self::DetailDelete => "detail delete",
            Self::DetailInsert => "detail insert",
            Self::HeaderDelete => "header delete",
            Self::HeaderRead => "header read",
            Self::DetailRead => "detail read",
            Self::CatalogLookup => "catalog lookup",
            Self::Commit => "commit",
        };
        f.write_str(s)
    }
}

/// Errors returned by reconciler operations.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The referenced plan identifier does not exist.
    #[error("meal plan {0} not found")]
    NotFound(i32),

    /// The request was rejected before anything was written.
    #[error("invalid meal plan: {0}")]
    Invalid(String),

    /// The database failed while executing `step`.
    #[error("meal plan {step} failed: {cause:#}")]
    Storage {
        step: PlanStep,
        cause: anyhow::Error,
    },
}

impl PlanError {
    /// Wrap a storage failure, recording which step raised it.
    pub fn storage(step: PlanStep, cause: impl Into<anyhow::Error>) -> Self {
        let cause = cause.into();
        warn!(%step, error = %format!("{cause:#}"), "meal plan storage step failed");
        Self::Storage { step, cause }
    }

    /// The failed storage step, if this is a storage failure.
    pub fn step(&self) -> Option<PlanStep> {
        match self {
            Self::Storage { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn storage_error_names_the_step() {
        let err = PlanError::storage(
            PlanStep::DetailInsert,
            anyhow!("foreign key violation").context("failed to insert details of meal plan 4"),
        );
        assert_eq!(err.step(), Some(PlanStep::DetailInsert));
        assert_eq!(
            err.to_string(),
            "meal plan detail insert failed: failed to insert details of meal plan 4: foreign key violation"
        );
    }

    #[test]
    fn not_found_and_invalid_have_no_step() {
        let missing = PlanError::NotFound(12);
        assert!(missing.is_not_found());
        assert_eq!(missing.step(), None);
        assert_eq!(missing.to_string(), "meal plan 12 not found");

        let invalid = PlanError::Invalid("quantity must be positive".into());
        assert!(invalid.is_invalid());
        assert!(!invalid.is_not_found());
    }

    #[test]
    fn steps_display_distinctly() {
        let steps = [
            PlanStep::BeginTransaction,
            PlanStep::IdAllocationLock,
            PlanStep::RecycleScan,
            PlanStep::HeaderWrite,
            PlanStep::DetailDelete,
            PlanStep::DetailInsert,
            PlanStep::HeaderDelete,
            PlanStep::HeaderRead,
            PlanStep::DetailRead,
            PlanStep::CatalogLookup,
            PlanStep::Commit,
        ];
        let names: std::collections::HashSet<String> =
            steps.iter().map(ToString::to_string).collect();
        assert_eq!(names.len(), steps.len());
    }
}

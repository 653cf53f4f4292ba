//! Data model for the Arbiter evaluator.
//!
//! Criteria and specifications are immutable once built. Results are
//! created once per evaluation and shared through `Arc`, so the same
//! result object can sit behind several references.

pub mod criterion;
pub mod result;
pub mod values;

use std::fmt;

pub use criterion::{
    CompositeCriterion, Criterion, CriterionKind, CriterionReference, Criteria, QueryCriterion,
    Specification,
};
pub use result::{CompositeResult, EvaluationResult, QueryResult, ReferenceResult};
pub use values::{Value, OPERATOR_PREFIX};

// ──────────────────────────────────────────────
// Evaluation state
// ──────────────────────────────────────────────

/// Three-valued verdict of a criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationState {
    Matched,
    NotMatched,
    Undetermined,
}

impl EvaluationState {
    pub const ALL: [EvaluationState; 3] = [
        EvaluationState::Matched,
        EvaluationState::NotMatched,
        EvaluationState::Undetermined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationState::Matched => "MATCHED",
            EvaluationState::NotMatched => "NOT_MATCHED",
            EvaluationState::Undetermined => "UNDETERMINED",
        }
    }

    /// True for MATCHED and NOT_MATCHED.
    pub fn is_determined(&self) -> bool {
        !matches!(self, EvaluationState::Undetermined)
    }

    pub fn from_bool(b: bool) -> Self {
        if b {
            EvaluationState::Matched
        } else {
            EvaluationState::NotMatched
        }
    }
}

impl fmt::Display for EvaluationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────────────────────────────────
// Junction
// ──────────────────────────────────────────────

/// How a composite criterion combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Junction {
    And,
    Or,
}

impl Junction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Junction::And => "AND",
            Junction::Or => "OR",
        }
    }

    /// Parse `"AND"` / `"OR"`, ignoring ASCII case.
    pub fn parse(s: &str) -> Option<Self> {
        arbiter_interchange::InterchangeJunction::parse(s).map(Junction::from)
    }
}

impl From<arbiter_interchange::InterchangeJunction> for Junction {
    fn from(j: arbiter_interchange::InterchangeJunction) -> Self {
        match j {
            arbiter_interchange::InterchangeJunction::And => Junction::And,
            arbiter_interchange::InterchangeJunction::Or => Junction::Or,
        }
    }
}

impl fmt::Display for Junction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

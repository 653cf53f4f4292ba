//! Three-valued (Kleene) conjunction and disjunction.
//!
//! NOT_MATCHED absorbs under AND and MATCHED absorbs under OR; UNDETERMINED
//! survives only when no absorbing value is present.

use crate::types::EvaluationState::{self, Matched, NotMatched, Undetermined};
use crate::types::Junction;

pub fn and(a: EvaluationState, b: EvaluationState) -> EvaluationState {
    match (a, b) {
        (NotMatched, _) | (_, NotMatched) => NotMatched,
        (Matched, Matched) => Matched,
        _ => Undetermined,
    }
}

pub fn or(a: EvaluationState, b: EvaluationState) -> EvaluationState {
    match (a, b) {
        (Matched, _) | (_, Matched) => Matched,
        (NotMatched, NotMatched) => NotMatched,
        _ => Undetermined,
    }
}

impl Junction {
    /// Starting value of a left-to-right reduction: MATCHED for AND,
    /// NOT_MATCHED for OR.
    pub fn identity(&self) -> EvaluationState {
        match self {
            Junction::And => Matched,
            Junction::Or => NotMatched,
        }
    }

    pub fn apply(&self, a: EvaluationState, b: EvaluationState) -> EvaluationState {
        match self {
            Junction::And => and(a, b),
            Junction::Or => or(a, b),
        }
    }
}

/// Reduce `states` with the junction's combinator. An empty input is
/// UNDETERMINED rather than the junction's identity: a group with nothing
/// in it has not established anything.
pub fn combine(
    junction: Junction,
    states: impl IntoIterator<Item = EvaluationState>,
) -> EvaluationState {
    let mut states = states.into_iter().peekable();
    if states.peek().is_none() {
        return Undetermined;
    }
    states.fold(junction.identity(), |acc, s| junction.apply(acc, s))
}

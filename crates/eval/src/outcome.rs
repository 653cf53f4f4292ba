//! Aggregated result of one evaluation.

use std::sync::Arc;

use serde::Serialize;

use crate::context::EvaluationContext;
use crate::types::{EvaluationResult, EvaluationState, Specification};

/// Every criterion result of one evaluation, in specification pre-order,
/// with counts per state.
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub specification_id: String,
    pub results: Vec<Arc<EvaluationResult>>,
    pub summary: Summary,
}

impl EvaluationOutcome {
    /// Collect the results of every criterion in the tree from `context`.
    pub(crate) fn assemble(specification: &Specification, context: &EvaluationContext) -> Self {
        let results: Vec<Arc<EvaluationResult>> = specification
            .iter()
            .filter_map(|criterion| context.get_cached(criterion.id()))
            .collect();
        EvaluationOutcome::new(specification.id(), results)
    }

    pub fn new(specification_id: impl Into<String>, results: Vec<Arc<EvaluationResult>>) -> Self {
        let summary = Summary::from_results(&results);
        EvaluationOutcome {
            specification_id: specification_id.into(),
            results,
            summary,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Arc<EvaluationResult>> {
        self.results.iter().find(|r| r.id() == id)
    }

    pub fn with_state(
        &self,
        state: EvaluationState,
    ) -> impl Iterator<Item = &Arc<EvaluationResult>> + '_ {
        self.results.iter().filter(move |r| r.state() == state)
    }

    pub fn is_fully_determined(&self) -> bool {
        self.summary.fully_determined()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "specification_id": self.specification_id,
            "results": self.results.iter().map(|r| r.to_json()).collect::<Vec<_>>(),
            "summary": self.summary,
        })
    }
}

/// Per-state counts over an outcome's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Summary {
    total: usize,
    matched: usize,
    not_matched: usize,
    undetermined: usize,
    fully_determined: bool,
}

impl Summary {
    pub fn from_results<'a, I>(results: I) -> Summary
    where
        I: IntoIterator<Item = &'a Arc<EvaluationResult>>,
    {
        let mut summary = Summary::default();
        for result in results {
            summary.total += 1;
            match result.state() {
                EvaluationState::Matched => summary.matched += 1,
                EvaluationState::NotMatched => summary.not_matched += 1,
                EvaluationState::Undetermined => summary.undetermined += 1,
            }
        }
        summary.fully_determined = summary.undetermined == 0;
        summary
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn matched(&self) -> usize {
        self.matched
    }

    pub fn not_matched(&self) -> usize {
        self.not_matched
    }

    pub fn undetermined(&self) -> usize {
        self.undetermined
    }

    /// True when no result is UNDETERMINED. An empty outcome counts as
    /// fully determined.
    pub fn fully_determined(&self) -> bool {
        self.fully_determined
    }
}

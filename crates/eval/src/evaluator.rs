//! Criterion tree evaluation.
//!
//! `Evaluator::evaluate` builds a fresh [`EvaluationContext`], fans the
//! top-level criteria out over a rayon pool in two passes (query leaves
//! and composites first, then references) and assembles the outcome from
//! the context. Every criterion goes through
//! [`EvaluationContext::get_or_evaluate`], so a criterion reached from
//! several places is matched once.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::config::EvaluatorConfig;
use crate::context::EvaluationContext;
use crate::error::ConfigError;
use crate::kleene;
use crate::matcher::QueryMatcher;
use crate::operators::OperatorRegistry;
use crate::outcome::EvaluationOutcome;
use crate::types::{
    CompositeCriterion, CompositeResult, Criterion, CriterionKind, CriterionReference,
    EvaluationResult, EvaluationState, QueryCriterion, QueryResult, ReferenceResult,
    Specification, Value,
};

/// Evaluates specifications against documents. Holds no per-document
/// state; one evaluator can serve many concurrent `evaluate` calls.
#[derive(Debug)]
pub struct Evaluator {
    matcher: QueryMatcher,
    pool: Option<rayon::ThreadPool>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}

impl Evaluator {
    /// Built-in operators, default configuration, global rayon pool.
    pub fn new() -> Self {
        Evaluator {
            matcher: QueryMatcher::default(),
            pool: None,
        }
    }

    pub fn with_config(config: EvaluatorConfig) -> Result<Self, ConfigError> {
        Evaluator::builder().config(config).build()
    }

    pub fn builder() -> EvaluatorBuilder {
        EvaluatorBuilder::default()
    }

    pub fn matcher(&self) -> &QueryMatcher {
        &self.matcher
    }

    /// Evaluate every criterion of `specification` against `document`.
    ///
    /// Never fails: missing data, unknown operators and dangling references
    /// all surface as criterion states.
    pub fn evaluate(&self, document: &Value, specification: &Specification) -> EvaluationOutcome {
        let span = tracing::debug_span!("evaluate", specification = specification.id());
        let _entered = span.enter();

        let context = EvaluationContext::new();
        let run = Run {
            matcher: &self.matcher,
            document,
            specification,
            context: &context,
            span: &span,
        };
        match &self.pool {
            Some(pool) => pool.install(|| run.fan_out()),
            None => run.fan_out(),
        }

        let outcome = EvaluationOutcome::assemble(specification, &context);
        let summary = &outcome.summary;
        debug!(
            total = summary.total(),
            matched = summary.matched(),
            not_matched = summary.not_matched(),
            undetermined = summary.undetermined(),
            evaluations = context.evaluations(),
            "evaluation finished"
        );
        outcome
    }
}

/// Builder for an [`Evaluator`] with custom configuration or operators.
#[derive(Debug, Default)]
pub struct EvaluatorBuilder {
    config: EvaluatorConfig,
    operators: Option<OperatorRegistry>,
}

impl EvaluatorBuilder {
    pub fn config(mut self, config: EvaluatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the built-in registry. Start from
    /// [`OperatorRegistry::with_builtins`] to extend rather than replace.
    pub fn operators(mut self, operators: OperatorRegistry) -> Self {
        self.operators = Some(operators);
        self
    }

    pub fn build(self) -> Result<Evaluator, ConfigError> {
        self.config.validate()?;
        let pool = match self.config.worker_threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("arbiter-eval-{}", i))
                    .build()
                    .map_err(|e| ConfigError::ThreadPool(e.to_string()))?,
            ),
            None => None,
        };
        let operators = self.operators.unwrap_or_default();
        Ok(Evaluator {
            matcher: QueryMatcher::new(operators, &self.config),
            pool,
        })
    }
}

// ──────────────────────────────────────────────
// One evaluation
// ──────────────────────────────────────────────

struct Run<'a> {
    matcher: &'a QueryMatcher,
    document: &'a Value,
    specification: &'a Specification,
    context: &'a EvaluationContext,
    /// Re-entered on pool workers so their events nest under `evaluate`.
    span: &'a tracing::Span,
}

impl Run<'_> {
    fn fan_out(&self) {
        let (references, others): (Vec<&Criterion>, Vec<&Criterion>) = self
            .specification
            .criteria()
            .iter()
            .partition(|c| c.kind() == CriterionKind::Reference);

        others.par_iter().for_each(|criterion| {
            self.span.in_scope(|| self.evaluate(criterion));
        });
        references.par_iter().for_each(|criterion| {
            self.span.in_scope(|| self.evaluate(criterion));
        });
    }

    fn evaluate(&self, criterion: &Criterion) -> Arc<EvaluationResult> {
        self.context
            .get_or_evaluate(criterion.id(), || self.dispatch(criterion))
    }

    fn dispatch(&self, criterion: &Criterion) -> EvaluationResult {
        let result = match criterion {
            Criterion::Query(q) => self.evaluate_query(q),
            Criterion::Composite(c) => self.evaluate_composite(c),
            Criterion::Reference(r) => self.evaluate_reference(r),
        };
        trace!(criterion = result.id(), state = %result.state(), "evaluated");
        result
    }

    fn evaluate_query(&self, criterion: &QueryCriterion) -> EvaluationResult {
        if is_empty_query(&criterion.query) {
            return EvaluationResult::Query(QueryResult {
                id: criterion.id.clone(),
                state: EvaluationState::Undetermined,
                missing_paths: Vec::new(),
                reason: Some(format!("criterion definition not found for '{}'", criterion.id)),
            });
        }
        let outcome = self.matcher.match_document(self.document, &criterion.query);
        EvaluationResult::Query(QueryResult {
            id: criterion.id.clone(),
            state: outcome.state,
            missing_paths: outcome.missing_paths,
            reason: outcome.reason,
        })
    }

    fn evaluate_composite(&self, criterion: &CompositeCriterion) -> EvaluationResult {
        let children: Vec<Arc<EvaluationResult>> = criterion
            .criteria
            .iter()
            .map(|child| self.evaluate(child))
            .collect();
        let state = kleene::combine(criterion.junction, children.iter().map(|c| c.state()));
        let reason = composite_reason(state, &children);
        EvaluationResult::Composite(CompositeResult {
            id: criterion.id.clone(),
            state,
            junction: criterion.junction,
            children,
            reason,
        })
    }

    /// Cached target first; a target that exists but has not run yet is
    /// pulled in, so the outcome never depends on scheduling order.
    fn evaluate_reference(&self, reference: &CriterionReference) -> EvaluationResult {
        let target = self
            .context
            .get_cached(&reference.target_id)
            .or_else(|| {
                self.specification
                    .find(&reference.target_id)
                    .map(|target| self.evaluate(target))
            })
            .unwrap_or_else(|| {
                debug!(
                    reference = %reference.id,
                    target = %reference.target_id,
                    "dangling reference"
                );
                Arc::new(EvaluationResult::Query(QueryResult {
                    id: reference.target_id.clone(),
                    state: EvaluationState::Undetermined,
                    missing_paths: Vec::new(),
                    reason: Some(format!(
                        "referenced criterion '{}' not found",
                        reference.target_id
                    )),
                }))
            });
        EvaluationResult::Reference(ReferenceResult {
            id: reference.id.clone(),
            target,
        })
    }
}

fn is_empty_query(query: &Value) -> bool {
    match query {
        Value::Null => true,
        Value::Map(fields) => fields.is_empty(),
        _ => false,
    }
}

/// Names the children that decided a non-matching composite.
fn composite_reason(
    state: EvaluationState,
    children: &[Arc<EvaluationResult>],
) -> Option<String> {
    if children.is_empty() {
        return Some("composite has no criteria".to_string());
    }
    if state == EvaluationState::Matched {
        return None;
    }
    let deciding: Vec<&str> = children
        .iter()
        .filter(|c| c.state() == state)
        .map(|c| c.id())
        .collect();
    Some(format!("{} children: {}", state, deciding.join(", ")))
}

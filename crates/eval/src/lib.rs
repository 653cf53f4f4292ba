//! Arbiter criterion evaluator -- evaluates a specification (a tree of
//! query, composite and reference criteria) against a JSON-like document
//! and reports a MATCHED / NOT_MATCHED / UNDETERMINED verdict for every
//! criterion.
//!
//! Missing data never fails an evaluation: it makes the affected
//! criteria UNDETERMINED, and Kleene three-valued logic carries that
//! uncertainty up through AND/OR groups. Each criterion is evaluated at
//! most once per call, however many references point at it.

pub mod builder;
pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod kleene;
pub mod matcher;
pub mod operators;
pub mod outcome;
pub mod path;
pub mod pattern_cache;
pub mod types;

pub use builder::{all_of, any_of, query, reference, CompositeBuilder, SpecificationBuilder};
pub use config::{EvaluatorConfig, IncomparablePolicy};
pub use context::EvaluationContext;
pub use error::{ConfigError, SpecificationError};
pub use evaluator::{Evaluator, EvaluatorBuilder};
pub use matcher::{MatchOutcome, QueryMatcher};
pub use operators::{InvalidOperatorName, Operator, OperatorContext, OperatorError, OperatorRegistry};
pub use outcome::{EvaluationOutcome, Summary};
pub use types::{
    Criterion, EvaluationResult, EvaluationState, Junction, Specification, Value,
};

/// Evaluate `specification` against `document` with a default evaluator.
pub fn evaluate(document: &Value, specification: &Specification) -> EvaluationOutcome {
    Evaluator::new().evaluate(document, specification)
}

/// Evaluate interchange JSON against a JSON document.
///
/// This is the top-level entry point for callers holding raw JSON; it
/// fails only when the specification does not validate.
pub fn evaluate_json(
    specification: &serde_json::Value,
    document: &serde_json::Value,
) -> Result<EvaluationOutcome, SpecificationError> {
    let specification = Specification::from_interchange(specification)?;
    Ok(evaluate(&Value::from_json(document), &specification))
}

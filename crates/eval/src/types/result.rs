//! Evaluation results, mirroring the criterion variants.

use std::sync::Arc;

use super::{EvaluationState, Junction};

/// Outcome of evaluating one criterion against one document.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationResult {
    Query(QueryResult),
    Composite(CompositeResult),
    Reference(ReferenceResult),
}

/// Result of a query leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub id: String,
    pub state: EvaluationState,
    /// Document paths that could not be resolved.
    pub missing_paths: Vec<String>,
    pub reason: Option<String>,
}

/// Result of an AND/OR group, keeping every child result for tracing.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeResult {
    pub id: String,
    pub state: EvaluationState,
    pub junction: Junction,
    pub children: Vec<Arc<EvaluationResult>>,
    pub reason: Option<String>,
}

/// Result of a reference: the referenced result, shared, not copied.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceResult {
    pub id: String,
    pub target: Arc<EvaluationResult>,
}

impl EvaluationResult {
    pub fn id(&self) -> &str {
        match self {
            EvaluationResult::Query(r) => &r.id,
            EvaluationResult::Composite(r) => &r.id,
            EvaluationResult::Reference(r) => &r.id,
        }
    }

    /// State of this result; references report their target's state.
    pub fn state(&self) -> EvaluationState {
        match self {
            EvaluationResult::Query(r) => r.state,
            EvaluationResult::Composite(r) => r.state,
            EvaluationResult::Reference(r) => r.target.state(),
        }
    }

    /// Failure reason; references report their target's reason.
    pub fn reason(&self) -> Option<&str> {
        match self {
            EvaluationResult::Query(r) => r.reason.as_deref(),
            EvaluationResult::Composite(r) => r.reason.as_deref(),
            EvaluationResult::Reference(r) => r.target.reason(),
        }
    }

    /// Missing paths of a query leaf, or of a reference's resolved leaf.
    /// Composites report theirs through their children.
    pub fn missing_paths(&self) -> &[String] {
        match self.resolve() {
            EvaluationResult::Query(r) => &r.missing_paths,
            _ => &[],
        }
    }

    /// Follow reference chains to the first non-reference result.
    pub fn resolve(&self) -> &EvaluationResult {
        let mut current = self;
        while let EvaluationResult::Reference(r) = current {
            current = r.target.as_ref();
        }
        current
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EvaluationResult::Query(_) => "query",
            EvaluationResult::Composite(_) => "composite",
            EvaluationResult::Reference(_) => "reference",
        }
    }

    /// Render the result tree as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("id".to_string(), serde_json::json!(self.id()));
        obj.insert("kind".to_string(), serde_json::json!(self.kind()));
        obj.insert("state".to_string(), serde_json::json!(self.state().as_str()));
        if let Some(reason) = self.reason() {
            obj.insert("reason".to_string(), serde_json::json!(reason));
        }
        match self {
            EvaluationResult::Query(r) => {
                if !r.missing_paths.is_empty() {
                    obj.insert("missing_paths".to_string(), serde_json::json!(r.missing_paths));
                }
            }
            EvaluationResult::Composite(r) => {
                obj.insert("junction".to_string(), serde_json::json!(r.junction.as_str()));
                let children: Vec<serde_json::Value> =
                    r.children.iter().map(|c| c.to_json()).collect();
                obj.insert("children".to_string(), serde_json::Value::Array(children));
            }
            EvaluationResult::Reference(r) => {
                obj.insert("target".to_string(), serde_json::json!(r.target.id()));
            }
        }
        serde_json::Value::Object(obj)
    }
}

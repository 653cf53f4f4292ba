//! Query matcher: walks a query against a document value.
//!
//! A query has three shapes:
//! - a scalar, compared for equality;
//! - a list, matched element-wise against a list of the same length;
//! - a map, which is either an operator map (any `$`-prefixed key, handed
//!   to the operator registry) or a field map (each key resolved as a
//!   dotted path and matched recursively).
//!
//! Child outcomes combine with priority UNDETERMINED > NOT_MATCHED > MATCHED,
//! and the missing paths of every child are kept, so one evaluation
//! reports every absent field rather than only the first.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::{EvaluatorConfig, IncomparablePolicy};
use crate::operators::{OperatorContext, OperatorError, OperatorRegistry};
use crate::path;
use crate::pattern_cache::PatternCache;
use crate::types::{EvaluationState, Value};

/// The only operator that is consulted when the value is null or absent.
const EXISTS: &str = "$exists";

static NULL: Value = Value::Null;

/// Tri-state outcome of matching a (sub-)query.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub state: EvaluationState,
    pub missing_paths: Vec<String>,
    pub reason: Option<String>,
}

impl MatchOutcome {
    pub fn matched() -> Self {
        MatchOutcome {
            state: EvaluationState::Matched,
            missing_paths: Vec::new(),
            reason: None,
        }
    }

    pub fn not_matched(reason: impl Into<String>) -> Self {
        MatchOutcome {
            state: EvaluationState::NotMatched,
            missing_paths: Vec::new(),
            reason: Some(reason.into()),
        }
    }

    pub fn undetermined(reason: impl Into<String>, missing_paths: Vec<String>) -> Self {
        MatchOutcome {
            state: EvaluationState::Undetermined,
            missing_paths,
            reason: Some(reason.into()),
        }
    }

    /// Combine child outcomes: any UNDETERMINED wins, then any NOT_MATCHED.
    /// The reason is the first one of the winning state. An empty input
    /// is MATCHED.
    pub fn combine(outcomes: impl IntoIterator<Item = MatchOutcome>) -> MatchOutcome {
        let mut state = EvaluationState::Matched;
        let mut missing_paths = Vec::new();
        let mut undetermined_reason = None;
        let mut failed_reason = None;

        for outcome in outcomes {
            match outcome.state {
                EvaluationState::Matched => {}
                EvaluationState::NotMatched => {
                    if state == EvaluationState::Matched {
                        state = EvaluationState::NotMatched;
                    }
                    if failed_reason.is_none() {
                        failed_reason = outcome.reason;
                    }
                }
                EvaluationState::Undetermined => {
                    state = EvaluationState::Undetermined;
                    if undetermined_reason.is_none() {
                        undetermined_reason = outcome.reason;
                    }
                }
            }
            missing_paths.extend(outcome.missing_paths);
        }

        let reason = match state {
            EvaluationState::Matched => None,
            EvaluationState::NotMatched => failed_reason,
            EvaluationState::Undetermined => undetermined_reason,
        };
        MatchOutcome {
            state,
            missing_paths,
            reason,
        }
    }
}

/// Matches queries against documents. Owns its operator registry and
/// pattern cache; safe to share across threads.
#[derive(Debug)]
pub struct QueryMatcher {
    operators: OperatorRegistry,
    patterns: PatternCache,
    incomparable: IncomparablePolicy,
}

impl Default for QueryMatcher {
    fn default() -> Self {
        QueryMatcher::new(OperatorRegistry::with_builtins(), &EvaluatorConfig::default())
    }
}

impl QueryMatcher {
    pub fn new(operators: OperatorRegistry, config: &EvaluatorConfig) -> Self {
        QueryMatcher {
            operators,
            patterns: PatternCache::new(config.pattern_cache_capacity),
            incomparable: config.incomparable,
        }
    }

    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    pub fn patterns(&self) -> &PatternCache {
        &self.patterns
    }

    pub fn incomparable_policy(&self) -> IncomparablePolicy {
        self.incomparable
    }

    /// Match a query against a whole document.
    pub fn match_document(&self, document: &Value, query: &Value) -> MatchOutcome {
        self.match_value(Some(document), query, "")
    }

    /// Match `query` against `value` found at `path`; `None` means the path
    /// was absent.
    pub fn match_value(&self, value: Option<&Value>, query: &Value, path: &str) -> MatchOutcome {
        let value = match value {
            Some(v) if !v.is_null() => v,
            _ if accepts_null(query) => &NULL,
            _ => {
                let at = path::display(path);
                return MatchOutcome::undetermined(
                    format!("missing data at {}", at),
                    vec![at.to_string()],
                );
            }
        };

        match query {
            Value::Map(fields) if query.is_operator_map() => {
                self.match_operators(value, fields, path)
            }
            Value::Map(fields) => self.match_fields(value, fields, path),
            Value::List(items) => self.match_list(value, items, path),
            scalar => match_scalar(value, scalar, path),
        }
    }

    fn match_operators(
        &self,
        value: &Value,
        operators: &BTreeMap<String, Value>,
        path: &str,
    ) -> MatchOutcome {
        let at = path::display(path);
        if let Some(unknown) = operators.keys().find(|name| !self.operators.has_operator(name)) {
            return unknown_operator(unknown);
        }

        let cx = OperatorContext::new(self, path);
        for (name, operand) in operators {
            match self.operators.evaluate(name, value, operand, &cx) {
                Some(Ok(true)) => {}
                Some(Ok(false)) => {
                    return MatchOutcome::not_matched(format!(
                        "{}: {} does not satisfy {} {}",
                        at, value, name, operand
                    ));
                }
                Some(Err(err @ OperatorError::Incomparable { .. })) => {
                    debug!(path = at, error = %err, "incomparable operands");
                    return MatchOutcome::undetermined(format!("{} at {}", err, at), Vec::new());
                }
                Some(Err(err)) => {
                    debug!(path = at, error = %err, "operator failed");
                    return MatchOutcome::not_matched(format!("{} at {}", err, at));
                }
                None => return unknown_operator(name),
            }
        }
        MatchOutcome::matched()
    }

    fn match_fields(
        &self,
        value: &Value,
        fields: &BTreeMap<String, Value>,
        path: &str,
    ) -> MatchOutcome {
        if !matches!(value, Value::Map(_)) {
            return MatchOutcome::not_matched(format!(
                "expected object at {}, got {}",
                path::display(path),
                value.type_name()
            ));
        }
        MatchOutcome::combine(fields.iter().map(|(field, sub_query)| {
            let child_path = path::join(path, field);
            self.match_value(path::resolve(value, field), sub_query, &child_path)
        }))
    }

    fn match_list(&self, value: &Value, items: &[Value], path: &str) -> MatchOutcome {
        let actual = match value {
            Value::List(actual) if actual.len() == items.len() => actual,
            _ => {
                return MatchOutcome::not_matched(format!(
                    "expected array of length {} at {}, got {}",
                    items.len(),
                    path::display(path),
                    describe(value)
                ));
            }
        };
        MatchOutcome::combine(
            actual
                .iter()
                .zip(items)
                .enumerate()
                .map(|(i, (element, query))| {
                    self.match_value(Some(element), query, &path::index(path, i))
                }),
        )
    }
}

fn match_scalar(value: &Value, expected: &Value, path: &str) -> MatchOutcome {
    if value == expected {
        MatchOutcome::matched()
    } else {
        MatchOutcome::not_matched(format!(
            "{}: expected {}, got {}",
            path::display(path),
            expected,
            value
        ))
    }
}

fn accepts_null(query: &Value) -> bool {
    query
        .as_map()
        .map(|fields| fields.contains_key(EXISTS))
        .unwrap_or(false)
}

fn unknown_operator(name: &str) -> MatchOutcome {
    MatchOutcome::undetermined(format!("Unknown operator: {}", name), Vec::new())
}

fn describe(value: &Value) -> String {
    match value {
        Value::List(items) => format!("array of length {}", items.len()),
        other => other.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(document: serde_json::Value, query: serde_json::Value) -> MatchOutcome {
        QueryMatcher::default()
            .match_document(&Value::from_json(&document), &Value::from_json(&query))
    }

    #[test]
    fn operator_on_present_field() {
        let outcome = run(json!({ "age": 25 }), json!({ "age": { "$gte": 18 } }));
        assert_eq!(outcome, MatchOutcome::matched());
    }

    #[test]
    fn absent_field_is_undetermined_with_path() {
        let outcome = run(json!({}), json!({ "age": { "$gte": 18 } }));
        assert_eq!(outcome.state, EvaluationState::Undetermined);
        assert_eq!(outcome.missing_paths, vec!["age"]);
        assert_eq!(outcome.reason.as_deref(), Some("missing data at age"));
    }

    #[test]
    fn present_null_is_missing_data_too() {
        let outcome = run(json!({ "age": null }), json!({ "age": 18 }));
        assert_eq!(outcome.state, EvaluationState::Undetermined);
        assert_eq!(outcome.missing_paths, vec!["age"]);
    }

    #[test]
    fn null_root_reports_root() {
        let outcome = run(json!(null), json!({ "age": 18 }));
        assert_eq!(outcome.missing_paths, vec!["root"]);
    }

    #[test]
    fn exists_sees_absent_and_null_values() {
        assert_eq!(
            run(json!({}), json!({ "middle": { "$exists": false } })).state,
            EvaluationState::Matched
        );
        assert_eq!(
            run(json!({ "middle": null }), json!({ "middle": { "$exists": false } })).state,
            EvaluationState::Matched
        );
        assert_eq!(
            run(json!({}), json!({ "middle": { "$exists": true } })).state,
            EvaluationState::NotMatched
        );
        assert_eq!(
            run(json!({ "middle": "J" }), json!({ "middle": { "$exists": true } })).state,
            EvaluationState::Matched
        );
    }

    #[test]
    fn failing_operator_is_not_matched() {
        let outcome = run(json!({ "age": 15 }), json!({ "age": { "$gte": 18 } }));
        assert_eq!(outcome.state, EvaluationState::NotMatched);
        assert_eq!(outcome.reason.as_deref(), Some("age: 15 does not satisfy $gte 18"));
        assert!(outcome.missing_paths.is_empty());
    }

    #[test]
    fn unknown_operator_is_undetermined_without_path() {
        let outcome = run(json!({ "age": 15 }), json!({ "age": { "$gte": 18, "$near": 3 } }));
        assert_eq!(outcome.state, EvaluationState::Undetermined);
        assert_eq!(outcome.reason.as_deref(), Some("Unknown operator: $near"));
        assert!(outcome.missing_paths.is_empty());
    }

    #[test]
    fn mixed_operator_map_treats_plain_keys_as_unknown() {
        let outcome = run(json!({ "a": { "b": 1 } }), json!({ "a": { "$exists": true, "b": 1 } }));
        assert_eq!(outcome.state, EvaluationState::Undetermined);
        assert_eq!(outcome.reason.as_deref(), Some("Unknown operator: b"));
    }

    #[test]
    fn type_mismatch_is_not_matched() {
        let outcome = run(json!({ "role": "admin" }), json!({ "role": { "$in": "admin" } }));
        assert_eq!(outcome.state, EvaluationState::NotMatched);
        assert!(outcome.reason.unwrap().contains("$in expects an array operand"));
    }

    #[test]
    fn bad_pattern_is_not_matched() {
        let outcome = run(json!({ "name": "x" }), json!({ "name": { "$regex": "[" } }));
        assert_eq!(outcome.state, EvaluationState::NotMatched);
        assert!(outcome.reason.unwrap().contains("invalid pattern"));
    }

    #[test]
    fn incomparable_operands_are_undetermined_by_default() {
        let outcome = run(json!({ "age": "old" }), json!({ "age": { "$gt": 18 } }));
        assert_eq!(outcome.state, EvaluationState::Undetermined);
        assert!(outcome.missing_paths.is_empty());
        assert!(outcome.reason.unwrap().starts_with("incomparable operands for $gt"));
    }

    #[test]
    fn mixed_type_equality_is_undetermined_by_default() {
        for query in [json!({ "x": { "$eq": 5 } }), json!({ "x": { "$ne": 5 } })] {
            let outcome = run(json!({ "x": "abc" }), query);
            assert_eq!(outcome.state, EvaluationState::Undetermined);
            assert!(outcome.missing_paths.is_empty());
            assert!(outcome.reason.unwrap().contains("string and number"));
        }
    }

    #[test]
    fn permissive_policy_treats_mixed_types_as_equal() {
        let config = EvaluatorConfig {
            incomparable: IncomparablePolicy::Equal,
            ..EvaluatorConfig::default()
        };
        let matcher = QueryMatcher::new(OperatorRegistry::with_builtins(), &config);
        let document = Value::from_json(&json!({ "x": "abc" }));
        let state = |query: serde_json::Value| {
            matcher.match_document(&document, &Value::from_json(&query)).state
        };
        assert_eq!(state(json!({ "x": { "$eq": 5 } })), EvaluationState::Matched);
        assert_eq!(state(json!({ "x": { "$ne": 5 } })), EvaluationState::NotMatched);
        assert_eq!(state(json!({ "x": { "$gte": 5 } })), EvaluationState::Matched);
    }

    #[test]
    fn all_and_size_together() {
        let outcome = run(
            json!({ "tags": ["a", "b", "c"] }),
            json!({ "tags": { "$all": ["a", "b"], "$size": 3 } }),
        );
        assert_eq!(outcome.state, EvaluationState::Matched);
    }

    #[test]
    fn nested_field_maps_build_dotted_paths() {
        let outcome = run(
            json!({ "applicant": { "address": {} } }),
            json!({ "applicant": { "address": { "city": "Oslo" }, "age": { "$gt": 1 } } }),
        );
        assert_eq!(outcome.state, EvaluationState::Undetermined);
        assert_eq!(outcome.missing_paths, vec!["applicant.address.city", "applicant.age"]);
    }

    #[test]
    fn dotted_keys_navigate() {
        let document = json!({ "applicant": { "address": { "city": "Oslo" } } });
        assert_eq!(
            run(document.clone(), json!({ "applicant.address.city": "Oslo" })).state,
            EvaluationState::Matched
        );
        let outcome = run(document, json!({ "applicant.address.zip": "0150" }));
        assert_eq!(outcome.missing_paths, vec!["applicant.address.zip"]);
    }

    #[test]
    fn field_map_against_scalar_is_not_matched() {
        let outcome = run(json!({ "applicant": 7 }), json!({ "applicant": { "age": 3 } }));
        assert_eq!(outcome.state, EvaluationState::NotMatched);
        assert_eq!(outcome.reason.as_deref(), Some("expected object at applicant, got number"));
    }

    #[test]
    fn undetermined_beats_not_matched() {
        let outcome = run(
            json!({ "age": 10 }),
            json!({ "age": { "$gte": 18 }, "income": { "$gt": 0 } }),
        );
        assert_eq!(outcome.state, EvaluationState::Undetermined);
        assert_eq!(outcome.missing_paths, vec!["income"]);
        assert_eq!(outcome.reason.as_deref(), Some("missing data at income"));
    }

    #[test]
    fn list_query_matches_element_wise() {
        assert_eq!(
            run(json!({ "pair": [1, "x"] }), json!({ "pair": [1, "x"] })).state,
            EvaluationState::Matched
        );
        assert_eq!(
            run(json!({ "pair": [1, "x", 3] }), json!({ "pair": [1, "x"] })).state,
            EvaluationState::NotMatched
        );
        let outcome = run(
            json!({ "pair": [{ "a": 1 }, {}] }),
            json!({ "pair": [{ "a": 1 }, { "b": { "$gt": 0 } }] }),
        );
        assert_eq!(outcome.state, EvaluationState::Undetermined);
        assert_eq!(outcome.missing_paths, vec!["pair[1].b"]);
    }

    #[test]
    fn scalar_queries_never_undetermined_when_present() {
        let outcome = run(json!({ "status": "open" }), json!({ "status": "closed" }));
        assert_eq!(outcome.state, EvaluationState::NotMatched);
        assert_eq!(outcome.reason.as_deref(), Some("status: expected closed, got open"));
    }

    #[test]
    fn combine_keeps_first_reason_of_winning_state() {
        let combined = MatchOutcome::combine(vec![
            MatchOutcome::not_matched("first failure"),
            MatchOutcome::undetermined("first gap", vec!["a".to_string()]),
            MatchOutcome::undetermined("second gap", vec!["b".to_string()]),
        ]);
        assert_eq!(combined.state, EvaluationState::Undetermined);
        assert_eq!(combined.reason.as_deref(), Some("first gap"));
        assert_eq!(combined.missing_paths, vec!["a", "b"]);
        assert_eq!(MatchOutcome::combine(Vec::new()), MatchOutcome::matched());
    }
}

//! Named query operators and the registry that dispatches them.
//!
//! An operator is a predicate over (document value, operand). Operators
//! never decide UNDETERMINED on their own: a wrong-shaped operand or value
//! is an [`OperatorError::TypeMismatch`], which the matcher turns into
//! NOT_MATCHED. The one exception is [`OperatorError::Incomparable`],
//! raised by the comparison operators (`$eq` through `$lte`) under
//! [`IncomparablePolicy::Undetermined`].
//!
//! | Operator | Matches when |
//! |---|---|
//! | `$eq` / `$ne` | value equals / differs from operand (numbers as doubles, lists and objects structurally) |
//! | `$gt` `$gte` `$lt` `$lte` | ordering of numbers, strings or booleans |
//! | `$in` / `$nin` | value (or any element of a list value) is / is not in the operand list |
//! | `$all` | list value contains every operand element |
//! | `$size` | list value has exactly operand elements |
//! | `$exists` | operand `true` and value non-null, or operand `false` and value null |
//! | `$type` | canonical type name of value equals operand |
//! | `$regex` | operand pattern is found in the string form of value |
//! | `$elemMatch` | some element of a list value matches the operand sub-query |

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::IncomparablePolicy;
use crate::matcher::QueryMatcher;
use crate::path;
use crate::pattern_cache::PatternCache;
use crate::types::{EvaluationState, Value, OPERATOR_PREFIX};

/// Why an operator could not produce a plain boolean.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperatorError {
    #[error("{operator} expects {expected}, got {got}")]
    TypeMismatch {
        operator: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("{operator}: invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        operator: String,
        pattern: String,
        message: String,
    },

    #[error("incomparable operands for {operator}: {left} and {right}")]
    Incomparable {
        operator: String,
        left: &'static str,
        right: &'static str,
    },
}

impl OperatorError {
    pub fn type_mismatch(operator: &str, expected: &'static str, got: &Value) -> Self {
        OperatorError::TypeMismatch {
            operator: operator.to_string(),
            expected,
            got: got.type_name(),
        }
    }
}

/// What an operator sees besides its two arguments.
pub struct OperatorContext<'a> {
    matcher: &'a QueryMatcher,
    path: &'a str,
}

impl<'a> OperatorContext<'a> {
    pub fn new(matcher: &'a QueryMatcher, path: &'a str) -> Self {
        OperatorContext { matcher, path }
    }

    /// Document path of the value being tested.
    pub fn path(&self) -> &str {
        self.path
    }

    pub fn patterns(&self) -> &PatternCache {
        self.matcher.patterns()
    }

    pub fn incomparable_policy(&self) -> IncomparablePolicy {
        self.matcher.incomparable_policy()
    }

    /// Run a full sub-query against `value` located at `at`; true only on MATCHED.
    pub fn matches(&self, value: &Value, query: &Value, at: &str) -> bool {
        self.matcher.match_value(Some(value), query, at).state == EvaluationState::Matched
    }
}

/// A named predicate over (document value, operand).
pub trait Operator: Send + Sync {
    fn apply(
        &self,
        value: &Value,
        operand: &Value,
        cx: &OperatorContext<'_>,
    ) -> Result<bool, OperatorError>;
}

impl<F> Operator for F
where
    F: Fn(&Value, &Value, &OperatorContext<'_>) -> Result<bool, OperatorError> + Send + Sync,
{
    fn apply(
        &self,
        value: &Value,
        operand: &Value,
        cx: &OperatorContext<'_>,
    ) -> Result<bool, OperatorError> {
        self(value, operand, cx)
    }
}

/// Error from [`OperatorRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("operator name '{0}' must start with '$'")]
pub struct InvalidOperatorName(pub String);

/// Name -> operator table.
#[derive(Clone)]
pub struct OperatorRegistry {
    operators: HashMap<String, Arc<dyn Operator>>,
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("operators", &self.names())
            .finish()
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        OperatorRegistry::with_builtins()
    }
}

impl OperatorRegistry {
    /// A registry with no operators at all.
    pub fn empty() -> Self {
        OperatorRegistry {
            operators: HashMap::new(),
        }
    }

    /// The fourteen built-in operators.
    pub fn with_builtins() -> Self {
        let mut registry = OperatorRegistry::empty();
        registry.insert("$eq", op_eq);
        registry.insert("$ne", op_ne);
        registry.insert("$gt", op_gt);
        registry.insert("$gte", op_gte);
        registry.insert("$lt", op_lt);
        registry.insert("$lte", op_lte);
        registry.insert("$in", op_in);
        registry.insert("$nin", op_nin);
        registry.insert("$all", op_all);
        registry.insert("$size", op_size);
        registry.insert("$exists", op_exists);
        registry.insert("$type", op_type);
        registry.insert("$regex", op_regex);
        registry.insert("$elemMatch", op_elem_match);
        registry
    }

    /// Add or replace an operator.
    pub fn register(
        &mut self,
        name: &str,
        operator: impl Operator + 'static,
    ) -> Result<(), InvalidOperatorName> {
        if !name.starts_with(OPERATOR_PREFIX) || name.len() == 1 {
            return Err(InvalidOperatorName(name.to_string()));
        }
        self.insert(name, operator);
        Ok(())
    }

    fn insert(&mut self, name: &str, operator: impl Operator + 'static) {
        self.operators.insert(name.to_string(), Arc::new(operator));
    }

    pub fn has_operator(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    /// Sorted operator names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operators.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Apply operator `name`; `None` when no such operator is registered.
    pub fn evaluate(
        &self,
        name: &str,
        value: &Value,
        operand: &Value,
        cx: &OperatorContext<'_>,
    ) -> Option<Result<bool, OperatorError>> {
        self.operators
            .get(name)
            .map(|op| op.apply(value, operand, cx))
    }
}

// ──────────────────────────────────────────────
// Built-in operators
// ──────────────────────────────────────────────

fn op_eq(value: &Value, operand: &Value, cx: &OperatorContext<'_>) -> Result<bool, OperatorError> {
    equality("$eq", value, operand, cx)
}

fn op_ne(value: &Value, operand: &Value, cx: &OperatorContext<'_>) -> Result<bool, OperatorError> {
    equality("$ne", value, operand, cx).map(|equal| !equal)
}

/// Structural whenever null, a list or an object is involved, or the pair
/// is orderable. Two unorderable scalars are incomparable and follow the
/// policy like the ordering operators.
fn equality(
    operator: &str,
    value: &Value,
    operand: &Value,
    cx: &OperatorContext<'_>,
) -> Result<bool, OperatorError> {
    let scalar = |v: &Value| !matches!(v, Value::Null | Value::List(_) | Value::Map(_));
    let structural =
        !(scalar(value) && scalar(operand)) || value.compare(operand).is_some();
    if structural {
        return Ok(value == operand);
    }
    ordering(operator, value, operand, cx).map(|o| o == Ordering::Equal)
}

fn op_gt(value: &Value, operand: &Value, cx: &OperatorContext<'_>) -> Result<bool, OperatorError> {
    ordering("$gt", value, operand, cx).map(|o| o == Ordering::Greater)
}

fn op_gte(value: &Value, operand: &Value, cx: &OperatorContext<'_>) -> Result<bool, OperatorError> {
    ordering("$gte", value, operand, cx).map(|o| o != Ordering::Less)
}

fn op_lt(value: &Value, operand: &Value, cx: &OperatorContext<'_>) -> Result<bool, OperatorError> {
    ordering("$lt", value, operand, cx).map(|o| o == Ordering::Less)
}

fn op_lte(value: &Value, operand: &Value, cx: &OperatorContext<'_>) -> Result<bool, OperatorError> {
    ordering("$lte", value, operand, cx).map(|o| o != Ordering::Greater)
}

fn ordering(
    operator: &str,
    value: &Value,
    operand: &Value,
    cx: &OperatorContext<'_>,
) -> Result<Ordering, OperatorError> {
    match value.compare(operand) {
        Some(o) => Ok(o),
        None => match cx.incomparable_policy() {
            IncomparablePolicy::Equal => Ok(Ordering::Equal),
            IncomparablePolicy::Undetermined => Err(OperatorError::Incomparable {
                operator: operator.to_string(),
                left: value.type_name(),
                right: operand.type_name(),
            }),
        },
    }
}

fn op_in(value: &Value, operand: &Value, _cx: &OperatorContext<'_>) -> Result<bool, OperatorError> {
    membership("$in", value, operand)
}

fn op_nin(value: &Value, operand: &Value, _cx: &OperatorContext<'_>) -> Result<bool, OperatorError> {
    membership("$nin", value, operand).map(|found| !found)
}

/// For a list value: does any element appear in the operand list.
fn membership(operator: &str, value: &Value, operand: &Value) -> Result<bool, OperatorError> {
    let candidates = operand
        .as_list()
        .ok_or_else(|| OperatorError::type_mismatch(operator, "an array operand", operand))?;
    Ok(match value {
        Value::List(items) => items.iter().any(|item| candidates.contains(item)),
        scalar => candidates.contains(scalar),
    })
}

fn op_all(value: &Value, operand: &Value, _cx: &OperatorContext<'_>) -> Result<bool, OperatorError> {
    let required = operand
        .as_list()
        .ok_or_else(|| OperatorError::type_mismatch("$all", "an array operand", operand))?;
    let items = value
        .as_list()
        .ok_or_else(|| OperatorError::type_mismatch("$all", "an array value", value))?;
    Ok(required.iter().all(|r| items.contains(r)))
}

fn op_size(value: &Value, operand: &Value, _cx: &OperatorContext<'_>) -> Result<bool, OperatorError> {
    let items = value
        .as_list()
        .ok_or_else(|| OperatorError::type_mismatch("$size", "an array value", value))?;
    let expected = operand
        .as_f64()
        .filter(|n| n.is_finite())
        .ok_or_else(|| OperatorError::type_mismatch("$size", "a numeric operand", operand))?;
    // Truncates like an integer cast of the operand.
    Ok(expected >= 0.0 && items.len() == expected.trunc() as usize)
}

fn op_exists(value: &Value, operand: &Value, _cx: &OperatorContext<'_>) -> Result<bool, OperatorError> {
    let want = operand
        .as_bool()
        .ok_or_else(|| OperatorError::type_mismatch("$exists", "a boolean operand", operand))?;
    Ok(want == !value.is_null())
}

fn op_type(value: &Value, operand: &Value, _cx: &OperatorContext<'_>) -> Result<bool, OperatorError> {
    let name = operand
        .as_str()
        .ok_or_else(|| OperatorError::type_mismatch("$type", "a string operand", operand))?;
    Ok(value.type_name() == name)
}

fn op_regex(value: &Value, operand: &Value, cx: &OperatorContext<'_>) -> Result<bool, OperatorError> {
    let pattern = operand
        .as_str()
        .ok_or_else(|| OperatorError::type_mismatch("$regex", "a string pattern", operand))?;
    let regex = cx
        .patterns()
        .get_or_compile(pattern)
        .map_err(|e| OperatorError::InvalidPattern {
            operator: "$regex".to_string(),
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
    Ok(regex.is_match(&value.to_string()))
}

fn op_elem_match(
    value: &Value,
    operand: &Value,
    cx: &OperatorContext<'_>,
) -> Result<bool, OperatorError> {
    let items = value
        .as_list()
        .ok_or_else(|| OperatorError::type_mismatch("$elemMatch", "an array value", value))?;
    Ok(items
        .iter()
        .enumerate()
        .any(|(i, item)| cx.matches(item, operand, &path::index(cx.path(), i))))
}

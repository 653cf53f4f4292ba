//! Deserialization from specification documents into typed structs.
//!
//! The main entry point is [`from_interchange`], which takes a
//! `&serde_json::Value` and produces an [`InterchangeSpecification`].
//! [`from_str`] accepts JSON or YAML text.

use crate::types::*;

/// Errors during specification deserialization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterchangeError {
    /// The specification is missing a required top-level field.
    #[error("specification missing required field: '{field}'")]
    MissingField { field: String },
    /// A criterion is malformed. `id` is the criterion id when known,
    /// otherwise its position (e.g. `criteria[2]`).
    #[error("criterion '{id}': {message}")]
    CriterionError { id: String, message: String },
    /// The document structure is invalid.
    #[error("invalid specification: {0}")]
    InvalidSpecification(String),
    /// The text could not be parsed in the given format.
    #[error("invalid {format}: {message}")]
    Parse { format: Format, message: String },
}

/// Parse JSON or YAML text into a JSON value tree.
pub fn parse_document(text: &str, format: Format) -> Result<serde_json::Value, InterchangeError> {
    match format {
        Format::Json => serde_json::from_str(text).map_err(|e| InterchangeError::Parse {
            format,
            message: e.to_string(),
        }),
        Format::Yaml => serde_yaml::from_str(text).map_err(|e| InterchangeError::Parse {
            format,
            message: e.to_string(),
        }),
    }
}

/// Parse specification text in the given format.
pub fn from_str(text: &str, format: Format) -> Result<InterchangeSpecification, InterchangeError> {
    let value = parse_document(text, format)?;
    from_interchange(&value)
}

/// Deserialize a specification document into typed structs.
///
/// Each criterion is dispatched on its optional `kind` field. Without one,
/// the kind is inferred from the keys present: `query` for leaves,
/// `junction`/`criteria` for composites, `ref` for references.
pub fn from_interchange(
    spec: &serde_json::Value,
) -> Result<InterchangeSpecification, InterchangeError> {
    if !spec.is_object() {
        return Err(InterchangeError::InvalidSpecification(
            "specification must be an object".to_string(),
        ));
    }

    let id = spec
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| InterchangeError::MissingField {
            field: "id".to_string(),
        })?
        .to_string();

    let criteria_arr = spec
        .get("criteria")
        .and_then(|c| c.as_array())
        .ok_or_else(|| InterchangeError::MissingField {
            field: "criteria".to_string(),
        })?;

    let criteria = parse_criteria(criteria_arr, "criteria")?;

    Ok(InterchangeSpecification { id, criteria })
}

// ── Parsing helpers ─────────────────────────────────────────────────

fn parse_criteria(
    arr: &[serde_json::Value],
    location: &str,
) -> Result<Vec<InterchangeCriterion>, InterchangeError> {
    arr.iter()
        .enumerate()
        .map(|(idx, obj)| parse_criterion(obj, &format!("{}[{}]", location, idx)))
        .collect()
}

fn parse_criterion(
    obj: &serde_json::Value,
    location: &str,
) -> Result<InterchangeCriterion, InterchangeError> {
    if !obj.is_object() {
        return Err(InterchangeError::CriterionError {
            id: location.to_string(),
            message: "criterion must be an object".to_string(),
        });
    }

    let id = obj
        .get("id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| InterchangeError::CriterionError {
            id: location.to_string(),
            message: "missing 'id' field".to_string(),
        })?;

    let kind = match obj.get("kind") {
        Some(k) => k
            .as_str()
            .ok_or_else(|| criterion_error(&id, "'kind' must be a string"))?
            .to_string(),
        None => infer_kind(obj).ok_or_else(|| {
            criterion_error(
                &id,
                "cannot infer kind: expected one of 'query', 'junction'/'criteria', 'ref'",
            )
        })?,
    };

    match kind.as_str() {
        "query" => {
            let query = obj
                .get("query")
                .cloned()
                .ok_or_else(|| criterion_error(&id, "missing 'query' field"))?;
            Ok(InterchangeCriterion::Query { id, query })
        }
        "composite" => {
            let junction_str = obj
                .get("junction")
                .and_then(|j| j.as_str())
                .ok_or_else(|| criterion_error(&id, "missing 'junction' field"))?;
            let junction = InterchangeJunction::parse(junction_str).ok_or_else(|| {
                criterion_error(
                    &id,
                    &format!("unknown junction '{}', expected AND or OR", junction_str),
                )
            })?;
            let children = obj
                .get("criteria")
                .and_then(|c| c.as_array())
                .ok_or_else(|| criterion_error(&id, "missing 'criteria' array"))?;
            let criteria = parse_criteria(children, &format!("{}.criteria", id))?;
            Ok(InterchangeCriterion::Composite {
                id,
                junction,
                criteria,
            })
        }
        "reference" => {
            let target = obj
                .get("ref")
                .and_then(|r| r.as_str())
                .map(|s| s.to_string())
                .ok_or_else(|| criterion_error(&id, "missing 'ref' field"))?;
            Ok(InterchangeCriterion::Reference { id, target })
        }
        other => Err(criterion_error(&id, &format!("unknown kind '{}'", other))),
    }
}

fn infer_kind(obj: &serde_json::Value) -> Option<String> {
    let kind = if obj.get("query").is_some() {
        "query"
    } else if obj.get("junction").is_some() || obj.get("criteria").is_some() {
        "composite"
    } else if obj.get("ref").is_some() {
        "reference"
    } else {
        return None;
    };
    Some(kind.to_string())
}

fn criterion_error(id: &str, message: &str) -> InterchangeError {
    InterchangeError::CriterionError {
        id: id.to_string(),
        message: message.to_string(),
    }
}

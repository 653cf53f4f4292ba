//! Typed structs representing the Arbiter specification interchange format.

use std::fmt;
use std::path::Path;

/// Top-level interchange specification.
#[derive(Debug, Clone, PartialEq)]
pub struct InterchangeSpecification {
    /// Specification identifier.
    pub id: String,
    /// Top-level criteria in declaration order.
    pub criteria: Vec<InterchangeCriterion>,
}

impl InterchangeSpecification {
    /// Count every criterion in the tree, nested composite children included.
    pub fn criterion_count(&self) -> usize {
        fn count(criteria: &[InterchangeCriterion]) -> usize {
            criteria
                .iter()
                .map(|c| match c {
                    InterchangeCriterion::Composite { criteria, .. } => 1 + count(criteria),
                    _ => 1,
                })
                .sum()
        }
        count(&self.criteria)
    }
}

/// A single criterion as it appears in a specification document.
#[derive(Debug, Clone, PartialEq)]
pub enum InterchangeCriterion {
    /// Leaf criterion holding a document query.
    Query {
        id: String,
        query: serde_json::Value,
    },
    /// AND/OR group over nested criteria.
    Composite {
        id: String,
        junction: InterchangeJunction,
        criteria: Vec<InterchangeCriterion>,
    },
    /// Pointer to another criterion's id, resolved at evaluation time.
    Reference { id: String, target: String },
}

impl InterchangeCriterion {
    pub fn id(&self) -> &str {
        match self {
            InterchangeCriterion::Query { id, .. }
            | InterchangeCriterion::Composite { id, .. }
            | InterchangeCriterion::Reference { id, .. } => id,
        }
    }

    /// The `kind` tag this criterion serializes under.
    pub fn kind(&self) -> &'static str {
        match self {
            InterchangeCriterion::Query { .. } => "query",
            InterchangeCriterion::Composite { .. } => "composite",
            InterchangeCriterion::Reference { .. } => "reference",
        }
    }
}

/// Junction of a composite criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterchangeJunction {
    And,
    Or,
}

impl InterchangeJunction {
    /// Parse `"AND"` / `"OR"`, ignoring ASCII case.
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("and") {
            Some(InterchangeJunction::And)
        } else if s.eq_ignore_ascii_case("or") {
            Some(InterchangeJunction::Or)
        } else {
            None
        }
    }
}

/// Text format of a specification or document file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Pick the format from a file extension: `.yaml`/`.yml` are YAML,
    /// everything else is JSON.
    pub fn from_path(path: &Path) -> Format {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Format::Yaml
            }
            _ => Format::Json,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => write!(f, "JSON"),
            Format::Yaml => write!(f, "YAML"),
        }
    }
}

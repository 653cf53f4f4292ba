//! Construction-time errors.
//!
//! Evaluation itself never fails: every problem met while matching a
//! document becomes a criterion state. Only building a specification or
//! an evaluator can return an error.

use std::path::PathBuf;

use arbiter_interchange::InterchangeError;

/// A specification that cannot be evaluated safely.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecificationError {
    #[error("specification id must not be empty")]
    EmptySpecificationId,

    #[error("criterion id must not be empty")]
    EmptyCriterionId,

    /// A specification (or a builder-made composite) with no criteria.
    #[error("'{id}' must contain at least one criterion")]
    EmptyCriteria { id: String },

    #[error("reference '{id}' has an empty target id")]
    EmptyReferenceTarget { id: String },

    /// Criterion ids must be unique across the whole tree, nested ones included.
    #[error("duplicate criterion id: '{id}'")]
    DuplicateId { id: String },

    /// The chain starts and ends with the same id.
    #[error("circular reference: {}", chain.join(" -> "))]
    CircularReference { chain: Vec<String> },

    #[error(transparent)]
    Interchange(#[from] InterchangeError),
}

/// Invalid or unreadable evaluator configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse configuration: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("could not build worker pool: {0}")]
    ThreadPool(String),
}

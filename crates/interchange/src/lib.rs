//! arbiter-interchange: specification interchange types and deserialization.
//!
//! Provides typed structs for the three criterion kinds (query, composite,
//! reference) and two entry points: [`from_interchange`], which walks an
//! already-parsed `serde_json::Value`, and [`from_str`], which first parses
//! JSON or YAML text into that tree.
//!
//! Queries are kept as raw `serde_json::Value` trees. Converting them into
//! evaluator values is the evaluator's job.

pub mod deserialize;
pub mod types;

pub use deserialize::{from_interchange, from_str, parse_document, InterchangeError};
pub use types::*;

//! Criteria and specifications.
//!
//! A `Specification` is validated once at construction: ids are non-empty
//! and unique across the whole tree, and the dependency graph formed by
//! composite children and reference targets has no cycles. The evaluator
//! relies on both properties for its at-most-once guarantee.

use std::collections::HashMap;

use arbiter_interchange::{InterchangeCriterion, InterchangeSpecification};

use super::{Junction, Value};
use crate::error::SpecificationError;

/// A named, evaluable check.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Query(QueryCriterion),
    Composite(CompositeCriterion),
    Reference(CriterionReference),
}

/// Leaf criterion: a query matched against the document root.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCriterion {
    pub id: String,
    pub query: Value,
}

/// AND/OR group of nested criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeCriterion {
    pub id: String,
    pub junction: Junction,
    pub criteria: Vec<Criterion>,
}

/// Delegates to another criterion's result, looked up by id at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub struct CriterionReference {
    pub id: String,
    pub target_id: String,
}

/// Discriminant of a [`Criterion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriterionKind {
    Query,
    Composite,
    Reference,
}

impl CriterionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CriterionKind::Query => "query",
            CriterionKind::Composite => "composite",
            CriterionKind::Reference => "reference",
        }
    }
}

impl Criterion {
    pub fn id(&self) -> &str {
        match self {
            Criterion::Query(q) => &q.id,
            Criterion::Composite(c) => &c.id,
            Criterion::Reference(r) => &r.id,
        }
    }

    pub fn kind(&self) -> CriterionKind {
        match self {
            Criterion::Query(_) => CriterionKind::Query,
            Criterion::Composite(_) => CriterionKind::Composite,
            Criterion::Reference(_) => CriterionKind::Reference,
        }
    }

    /// Direct children of a composite; empty for the other kinds.
    pub fn children(&self) -> &[Criterion] {
        match self {
            Criterion::Composite(c) => &c.criteria,
            _ => &[],
        }
    }

    fn from_interchange(c: &InterchangeCriterion) -> Criterion {
        match c {
            InterchangeCriterion::Query { id, query } => Criterion::Query(QueryCriterion {
                id: id.clone(),
                query: Value::from_json(query),
            }),
            InterchangeCriterion::Composite {
                id,
                junction,
                criteria,
            } => Criterion::Composite(CompositeCriterion {
                id: id.clone(),
                junction: Junction::from(*junction),
                criteria: criteria.iter().map(Criterion::from_interchange).collect(),
            }),
            InterchangeCriterion::Reference { id, target } => {
                Criterion::Reference(CriterionReference {
                    id: id.clone(),
                    target_id: target.clone(),
                })
            }
        }
    }
}

// ──────────────────────────────────────────────
// Specification
// ──────────────────────────────────────────────

/// A validated, immutable list of criteria.
#[derive(Debug, Clone)]
pub struct Specification {
    id: String,
    criteria: Vec<Criterion>,
    /// Criterion id -> child-index route from the top-level list.
    index: HashMap<String, Vec<usize>>,
}

impl Specification {
    /// Build and validate a specification.
    pub fn new(
        id: impl Into<String>,
        criteria: Vec<Criterion>,
    ) -> Result<Specification, SpecificationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(SpecificationError::EmptySpecificationId);
        }
        if criteria.is_empty() {
            return Err(SpecificationError::EmptyCriteria { id });
        }

        let mut index = HashMap::new();
        let mut route = Vec::new();
        index_criteria(&criteria, &mut route, &mut index)?;

        let spec = Specification {
            id,
            criteria,
            index,
        };
        spec.check_acyclic()?;
        Ok(spec)
    }

    /// Convert an interchange document and validate it.
    pub fn from_interchange(spec: &serde_json::Value) -> Result<Specification, SpecificationError> {
        let parsed = arbiter_interchange::from_interchange(spec)?;
        Specification::from_parsed(&parsed)
    }

    /// Validate an already-deserialized interchange specification.
    pub fn from_parsed(parsed: &InterchangeSpecification) -> Result<Specification, SpecificationError> {
        let criteria = parsed
            .criteria
            .iter()
            .map(Criterion::from_interchange)
            .collect();
        Specification::new(parsed.id.clone(), criteria)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Top-level criteria in declaration order.
    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    /// Number of criteria in the whole tree.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Find any criterion in the tree by id, nested ones included.
    pub fn find(&self, id: &str) -> Option<&Criterion> {
        let route = self.index.get(id)?;
        let (first, rest) = route.split_first()?;
        let mut current = self.criteria.get(*first)?;
        for idx in rest {
            current = current.children().get(*idx)?;
        }
        Some(current)
    }

    /// Walk every criterion in pre-order: each composite before its children.
    pub fn iter(&self) -> Criteria<'_> {
        Criteria {
            stack: self.criteria.iter().rev().collect(),
        }
    }

    /// Reject dependency cycles through references. Composite nesting alone
    /// is a tree; a cycle needs at least one reference edge.
    fn check_acyclic(&self) -> Result<(), SpecificationError> {
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut chain: Vec<&str> = Vec::new();
        for criterion in self.iter() {
            self.visit(criterion, &mut marks, &mut chain)?;
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        criterion: &'a Criterion,
        marks: &mut HashMap<&'a str, Mark>,
        chain: &mut Vec<&'a str>,
    ) -> Result<(), SpecificationError> {
        let id = criterion.id();
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Active) => {
                let start = chain.iter().position(|c| *c == id).unwrap_or(0);
                let mut cycle: Vec<String> = chain[start..].iter().map(|c| c.to_string()).collect();
                cycle.push(id.to_string());
                return Err(SpecificationError::CircularReference { chain: cycle });
            }
            None => {}
        }

        marks.insert(id, Mark::Active);
        chain.push(id);
        match criterion {
            Criterion::Composite(c) => {
                for child in &c.criteria {
                    self.visit(child, marks, chain)?;
                }
            }
            Criterion::Reference(r) => {
                if let Some(target) = self.find(&r.target_id) {
                    self.visit(target, marks, chain)?;
                }
            }
            Criterion::Query(_) => {}
        }
        chain.pop();
        marks.insert(id, Mark::Done);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

fn index_criteria(
    criteria: &[Criterion],
    route: &mut Vec<usize>,
    index: &mut HashMap<String, Vec<usize>>,
) -> Result<(), SpecificationError> {
    for (i, criterion) in criteria.iter().enumerate() {
        let id = criterion.id();
        if id.trim().is_empty() {
            return Err(SpecificationError::EmptyCriterionId);
        }
        if let Criterion::Reference(r) = criterion {
            if r.target_id.trim().is_empty() {
                return Err(SpecificationError::EmptyReferenceTarget { id: id.to_string() });
            }
        }
        route.push(i);
        if index.insert(id.to_string(), route.clone()).is_some() {
            return Err(SpecificationError::DuplicateId { id: id.to_string() });
        }
        index_criteria(criterion.children(), route, index)?;
        route.pop();
    }
    Ok(())
}

/// Pre-order iterator over a specification's criteria.
pub struct Criteria<'a> {
    stack: Vec<&'a Criterion>,
}

impl<'a> Iterator for Criteria<'a> {
    type Item = &'a Criterion;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children().iter().rev());
        Some(next)
    }
}

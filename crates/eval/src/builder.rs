//! Fluent construction of criteria and specifications.
//!
//! Builders only assemble; [`Specification::new`] does all validation.

use crate::error::SpecificationError;
use crate::types::{
    CompositeCriterion, Criterion, CriterionReference, Junction, QueryCriterion, Specification,
    Value,
};

/// Query leaf from anything convertible to a [`Value`], usually a
/// `serde_json::json!` literal.
pub fn query(id: impl Into<String>, query: impl Into<Value>) -> Criterion {
    Criterion::Query(QueryCriterion {
        id: id.into(),
        query: query.into(),
    })
}

pub fn all_of(id: impl Into<String>, criteria: Vec<Criterion>) -> Criterion {
    group(id, Junction::And, criteria)
}

pub fn any_of(id: impl Into<String>, criteria: Vec<Criterion>) -> Criterion {
    group(id, Junction::Or, criteria)
}

pub fn reference(id: impl Into<String>, target: impl Into<String>) -> Criterion {
    Criterion::Reference(CriterionReference {
        id: id.into(),
        target_id: target.into(),
    })
}

fn group(id: impl Into<String>, junction: Junction, criteria: Vec<Criterion>) -> Criterion {
    Criterion::Composite(CompositeCriterion {
        id: id.into(),
        junction,
        criteria,
    })
}

#[derive(Debug, Clone)]
pub struct SpecificationBuilder {
    id: String,
    criteria: Vec<Criterion>,
}

impl SpecificationBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        SpecificationBuilder {
            id: id.into(),
            criteria: Vec::new(),
        }
    }

    pub fn criterion(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    pub fn build(self) -> Result<Specification, SpecificationError> {
        Specification::new(self.id, self.criteria)
    }
}

/// Builds one AND/OR group child by child.
#[derive(Debug, Clone)]
pub struct CompositeBuilder {
    id: String,
    junction: Junction,
    criteria: Vec<Criterion>,
}

impl CompositeBuilder {
    pub fn new(id: impl Into<String>, junction: Junction) -> Self {
        CompositeBuilder {
            id: id.into(),
            junction,
            criteria: Vec::new(),
        }
    }

    pub fn child(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Fails on a group without children.
    pub fn build(self) -> Result<Criterion, SpecificationError> {
        if self.criteria.is_empty() {
            return Err(SpecificationError::EmptyCriteria { id: self.id });
        }
        Ok(group(self.id, self.junction, self.criteria))
    }
}

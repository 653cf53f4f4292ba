//! Property tests for the three-valued combinators and the evaluator.

use arbiter_eval::kleene::{self, and, or};
use arbiter_eval::{
    all_of, any_of, query, reference, EvaluationResult, EvaluationState, Evaluator, Junction,
    Specification, SpecificationBuilder, Value,
};
use proptest::prelude::*;
use serde_json::json;

fn state() -> impl Strategy<Value = EvaluationState> {
    prop_oneof![
        Just(EvaluationState::Matched),
        Just(EvaluationState::NotMatched),
        Just(EvaluationState::Undetermined),
    ]
}

/// Documents where every field may be present, null or absent.
fn document() -> impl Strategy<Value = serde_json::Value> {
    (
        prop::option::of(prop::option::of(0i64..40)),
        prop::option::of(prop::sample::select(vec!["DE", "FR", "US", "JP"])),
        prop::option::of(prop::collection::vec(
            prop::sample::select(vec!["x", "y", "z"]),
            0..4,
        )),
    )
        .prop_map(|(age, country, tags)| {
            let mut doc = serde_json::Map::new();
            match age {
                Some(Some(n)) => {
                    doc.insert("age".to_string(), json!(n));
                }
                Some(None) => {
                    doc.insert("age".to_string(), serde_json::Value::Null);
                }
                None => {}
            }
            if let Some(c) = country {
                doc.insert("country".to_string(), json!(c));
            }
            if let Some(t) = tags {
                doc.insert("tags".to_string(), json!(t));
            }
            serde_json::Value::Object(doc)
        })
}

fn mixed_specification() -> Specification {
    SpecificationBuilder::new("mixed")
        .criterion(query("adult", json!({ "age": { "$gte": 18 } })))
        .criterion(query("eu", json!({ "country": { "$in": ["DE", "FR"] } })))
        .criterion(query("tagged", json!({ "tags": { "$all": ["x"] } })))
        .criterion(query("no-age", json!({ "age": { "$exists": false } })))
        .criterion(all_of(
            "adult-eu",
            vec![reference("adult-ref", "adult"), reference("eu-ref", "eu")],
        ))
        .criterion(any_of(
            "any",
            vec![
                reference("tagged-ref", "tagged"),
                query("few-tags", json!({ "tags": { "$size": 1 } })),
                all_of("nested", vec![reference("nested-ref", "adult-eu")]),
            ],
        ))
        .build()
        .unwrap()
}

/// The state a composite must have given its children.
fn check_composites(result: &EvaluationResult) -> Result<(), TestCaseError> {
    if let EvaluationResult::Composite(c) = result {
        let expected = kleene::combine(c.junction, c.children.iter().map(|r| r.state()));
        prop_assert_eq!(c.state, expected, "composite {}", c.id);
        for child in &c.children {
            check_composites(child)?;
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn junctions_commute(a in state(), b in state()) {
        prop_assert_eq!(and(a, b), and(b, a));
        prop_assert_eq!(or(a, b), or(b, a));
    }

    #[test]
    fn known_values_absorb(x in state()) {
        prop_assert_eq!(and(EvaluationState::NotMatched, x), EvaluationState::NotMatched);
        prop_assert_eq!(or(EvaluationState::Matched, x), EvaluationState::Matched);
    }

    #[test]
    fn junctions_associate(a in state(), b in state(), c in state()) {
        prop_assert_eq!(and(and(a, b), c), and(a, and(b, c)));
        prop_assert_eq!(or(or(a, b), c), or(a, or(b, c)));
    }

    #[test]
    fn combine_ignores_order(states in prop::collection::vec(state(), 1..8)) {
        let forward = kleene::combine(Junction::And, states.iter().copied());
        let backward = kleene::combine(Junction::And, states.iter().rev().copied());
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn summary_accounts_for_every_result(doc in document()) {
        let outcome = Evaluator::new().evaluate(&Value::from_json(&doc), &mixed_specification());
        let summary = &outcome.summary;
        prop_assert_eq!(summary.total(), outcome.results.len());
        prop_assert_eq!(
            summary.matched() + summary.not_matched() + summary.undetermined(),
            summary.total()
        );
        prop_assert_eq!(summary.fully_determined(), summary.undetermined() == 0);
    }

    #[test]
    fn composites_follow_kleene_logic(doc in document()) {
        let outcome = Evaluator::new().evaluate(&Value::from_json(&doc), &mixed_specification());
        for result in &outcome.results {
            check_composites(result)?;
        }
    }

    #[test]
    fn evaluation_is_idempotent(doc in document()) {
        let spec = mixed_specification();
        let document = Value::from_json(&doc);
        let evaluator = Evaluator::new();
        let first = evaluator.evaluate(&document, &spec);
        let second = evaluator.evaluate(&document, &spec);
        prop_assert_eq!(first.to_json(), second.to_json());
    }

    #[test]
    fn absent_age_is_never_a_verdict(doc in document()) {
        let has_age = doc.get("age").map(|a| !a.is_null()).unwrap_or(false);
        let outcome = Evaluator::new().evaluate(&Value::from_json(&doc), &mixed_specification());
        let adult = outcome.get("adult").unwrap();
        prop_assert_eq!(adult.state().is_determined(), has_age);
        prop_assert!(outcome.get("no-age").unwrap().state().is_determined());
    }
}

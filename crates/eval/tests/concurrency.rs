//! Single-flight evaluation under concurrent load.
//!
//! A counting operator records every time the query matcher actually
//! runs the shared criterion; fan-out over many worker threads must not
//! raise the count above one per evaluation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arbiter_eval::{
    all_of, any_of, query, reference, EvaluationResult, EvaluationState, Evaluator,
    EvaluatorConfig, Operator, OperatorContext, OperatorError, OperatorRegistry,
    SpecificationBuilder, Specification, Value,
};
use serde_json::json;

struct Counted {
    calls: Arc<AtomicUsize>,
}

impl Operator for Counted {
    fn apply(
        &self,
        value: &Value,
        operand: &Value,
        _cx: &OperatorContext<'_>,
    ) -> Result<bool, OperatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Hold the slot long enough for other workers to arrive.
        std::thread::sleep(std::time::Duration::from_millis(5));
        Ok(value == operand)
    }
}

fn counting_evaluator(threads: usize) -> (Evaluator, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut operators = OperatorRegistry::with_builtins();
    operators
        .register(
            "$counted",
            Counted {
                calls: Arc::clone(&calls),
            },
        )
        .unwrap();
    let evaluator = Evaluator::builder()
        .config(EvaluatorConfig {
            worker_threads: Some(threads),
            ..EvaluatorConfig::default()
        })
        .operators(operators)
        .build()
        .unwrap();
    (evaluator, calls)
}

/// One shared query reached through many references, some nested.
fn fan_in_specification(references: usize) -> Specification {
    let mut builder = SpecificationBuilder::new("fan-in");
    for i in 0..references {
        builder = builder.criterion(reference(format!("ref-{}", i), "shared"));
    }
    builder = builder.criterion(query("shared", json!({ "flag": { "$counted": true } })));
    for i in 0..references {
        builder = builder.criterion(all_of(
            format!("group-{}", i),
            vec![
                reference(format!("group-{}-ref", i), "shared"),
                any_of(
                    format!("group-{}-or", i),
                    vec![reference(format!("group-{}-or-ref", i), "shared")],
                ),
            ],
        ));
    }
    builder.build().unwrap()
}

fn target_of(result: &EvaluationResult) -> &Arc<EvaluationResult> {
    match result {
        EvaluationResult::Reference(r) => &r.target,
        other => panic!("expected reference, got {:?}", other),
    }
}

#[test]
fn shared_criterion_runs_once() {
    let (evaluator, calls) = counting_evaluator(8);
    let spec = fan_in_specification(32);
    let document = Value::from_json(&json!({ "flag": true }));

    let outcome = evaluator.evaluate(&document, &spec);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(outcome.is_fully_determined());
    assert_eq!(outcome.summary.matched(), outcome.summary.total());
}

#[test]
fn every_reference_shares_one_result() {
    let (evaluator, _calls) = counting_evaluator(8);
    let spec = fan_in_specification(16);
    let outcome = evaluator.evaluate(&Value::from_json(&json!({ "flag": false })), &spec);

    let shared = outcome.get("shared").unwrap();
    assert_eq!(shared.state(), EvaluationState::NotMatched);
    let references: Vec<_> = outcome
        .results
        .iter()
        .filter(|r| r.id().contains("ref"))
        .collect();
    assert_eq!(references.len(), 48);
    for r in references {
        assert!(Arc::ptr_eq(target_of(r), shared), "{} copied its target", r.id());
    }
}

#[test]
fn fresh_context_per_evaluation() {
    let (evaluator, calls) = counting_evaluator(4);
    let spec = fan_in_specification(8);
    let document = Value::from_json(&json!({ "flag": true }));

    let first = evaluator.evaluate(&document, &spec);
    let second = evaluator.evaluate(&document, &spec);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(first.to_json(), second.to_json());
    assert!(!Arc::ptr_eq(
        first.get("shared").unwrap(),
        second.get("shared").unwrap()
    ));
}

#[test]
fn concurrent_evaluations_share_one_evaluator() {
    let (evaluator, calls) = counting_evaluator(4);
    let spec = fan_in_specification(8);

    std::thread::scope(|scope| {
        for i in 0..6 {
            let evaluator = &evaluator;
            let spec = &spec;
            scope.spawn(move || {
                let document = Value::from_json(&json!({ "flag": i % 2 == 0 }));
                let outcome = evaluator.evaluate(&document, spec);
                let expected = if i % 2 == 0 {
                    EvaluationState::Matched
                } else {
                    EvaluationState::NotMatched
                };
                assert_eq!(outcome.get("shared").unwrap().state(), expected);
            });
        }
    });

    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

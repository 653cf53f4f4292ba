//! Text rendering of an evaluation outcome.

use std::collections::HashMap;
use std::fmt::Write;

use arbiter_eval::{Criterion, EvaluationOutcome, EvaluationResult, Specification};

/// One line per criterion, indented by nesting depth, then a summary line.
pub fn render(spec: &Specification, outcome: &EvaluationOutcome) -> String {
    let results: HashMap<&str, &EvaluationResult> =
        outcome.results.iter().map(|r| (r.id(), &**r)).collect();

    let mut out = String::new();
    let _ = writeln!(out, "Specification: {}", outcome.specification_id);
    for criterion in spec.criteria() {
        render_criterion(&mut out, criterion, &results, 1);
    }

    let s = &outcome.summary;
    let _ = writeln!(
        out,
        "\n{} criteria: {} matched, {} not matched, {} undetermined",
        s.total(),
        s.matched(),
        s.not_matched(),
        s.undetermined()
    );
    if !s.fully_determined() {
        let _ = writeln!(out, "Outcome is not fully determined");
    }
    out
}

fn render_criterion(
    out: &mut String,
    criterion: &Criterion,
    results: &HashMap<&str, &EvaluationResult>,
    depth: usize,
) {
    let indent = "  ".repeat(depth);
    let Some(&result) = results.get(criterion.id()) else {
        let _ = writeln!(out, "{}[{:<12}] {}", indent, "?", criterion.id());
        return;
    };

    let mut line = format!("{}[{:<12}] {}", indent, result.state().as_str(), result.id());
    match result {
        EvaluationResult::Composite(c) => {
            let _ = write!(line, " ({})", c.junction);
        }
        EvaluationResult::Reference(r) => {
            let _ = write!(line, " -> {}", r.target.id());
        }
        EvaluationResult::Query(_) => {}
    }
    if let Some(reason) = result.reason() {
        let _ = write!(line, " -- {}", reason);
    }
    let missing = result.missing_paths();
    if !missing.is_empty() {
        let _ = write!(line, " [missing: {}]", missing.join(", "));
    }
    let _ = writeln!(out, "{}", line);

    for child in criterion.children() {
        render_criterion(out, child, results, depth + 1);
    }
}

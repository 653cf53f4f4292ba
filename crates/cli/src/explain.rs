//! `arbiter explain` -- the criterion tree of a specification, without
//! evaluating anything.

use std::fmt::Write;

use arbiter_eval::{Criterion, Specification};

/// Output format for the explain command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainFormat {
    Terminal,
    Markdown,
}

pub fn explain(spec: &Specification, format: ExplainFormat) -> String {
    let mut out = String::new();
    match format {
        ExplainFormat::Terminal => {
            let _ = writeln!(out, "Specification {} ({} criteria)", spec.id(), spec.len());
        }
        ExplainFormat::Markdown => {
            let _ = writeln!(out, "# Specification `{}`\n", spec.id());
            let _ = writeln!(out, "{} criteria.\n", spec.len());
        }
    }
    for criterion in spec.criteria() {
        explain_criterion(&mut out, spec, criterion, format, 0);
    }
    out
}

/// The same tree as a JSON document, for `--output json`.
pub fn explain_json(spec: &Specification) -> serde_json::Value {
    serde_json::json!({
        "id": spec.id(),
        "criteria": spec.len(),
        "tree": spec
            .criteria()
            .iter()
            .map(|c| criterion_json(spec, c))
            .collect::<Vec<_>>(),
    })
}

fn criterion_json(spec: &Specification, criterion: &Criterion) -> serde_json::Value {
    match criterion {
        Criterion::Query(q) => serde_json::json!({
            "id": q.id,
            "kind": "query",
            "query": q.query.to_json(),
        }),
        Criterion::Composite(c) => serde_json::json!({
            "id": c.id,
            "kind": "composite",
            "junction": c.junction.to_string(),
            "criteria": c
                .criteria
                .iter()
                .map(|child| criterion_json(spec, child))
                .collect::<Vec<_>>(),
        }),
        Criterion::Reference(r) => serde_json::json!({
            "id": r.id,
            "kind": "reference",
            "target": r.target_id,
            "dangling": !spec.contains(&r.target_id),
        }),
    }
}

fn explain_criterion(
    out: &mut String,
    spec: &Specification,
    criterion: &Criterion,
    format: ExplainFormat,
    depth: usize,
) {
    let description = match criterion {
        Criterion::Query(q) => match format {
            ExplainFormat::Terminal => format!("query {}", q.query),
            ExplainFormat::Markdown => format!("query `{}`", q.query),
        },
        Criterion::Composite(c) => format!("{} of {}", c.junction, c.criteria.len()),
        Criterion::Reference(r) => {
            if spec.contains(&r.target_id) {
                format!("ref -> {}", r.target_id)
            } else {
                format!("ref -> {} (dangling)", r.target_id)
            }
        }
    };

    match format {
        ExplainFormat::Terminal => {
            let indent = "  ".repeat(depth + 1);
            let _ = writeln!(out, "{}{}: {}", indent, criterion.id(), description);
        }
        ExplainFormat::Markdown => {
            let indent = "  ".repeat(depth);
            let _ = writeln!(out, "{}- **{}** {}", indent, criterion.id(), description);
        }
    }
    for child in criterion.children() {
        explain_criterion(out, spec, child, format, depth + 1);
    }
}

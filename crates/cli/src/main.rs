mod explain;
mod report;

use std::path::{Path, PathBuf};
use std::process;

use arbiter_eval::{Evaluator, EvaluatorConfig, Specification, Value};
use arbiter_interchange::Format;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Output format for the explain subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExplainOutputFormat {
    Terminal,
    Markdown,
}

/// Three-valued criterion evaluator.
#[derive(Parser)]
#[command(name = "arbiter", version, about = "Three-valued criterion evaluator")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a specification against a document
    Eval {
        /// Path to the specification (.json, .yaml or .yml)
        spec: PathBuf,
        /// Path to the document to evaluate (.json, .yaml or .yml)
        #[arg(long)]
        document: PathBuf,
        /// Path to an evaluator configuration TOML file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Exit with code 2 when any criterion is UNDETERMINED
        #[arg(long)]
        strict: bool,
    },

    /// Parse and validate a specification without evaluating it
    Validate {
        /// Path to the specification
        spec: PathBuf,
    },

    /// Print the criterion tree of a specification
    Explain {
        /// Path to the specification
        spec: PathBuf,
        /// Output format (terminal or markdown)
        #[arg(long, default_value = "terminal")]
        format: ExplainOutputFormat,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Eval {
            spec,
            document,
            config,
            strict,
        } => {
            cmd_eval(
                &spec,
                &document,
                config.as_deref(),
                strict,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Validate { spec } => {
            cmd_validate(&spec, cli.output, cli.quiet);
        }
        Commands::Explain { spec, format } => {
            cmd_explain(&spec, format, cli.output, cli.quiet);
        }
    }
}

/// Logs go to stderr; `ARBITER_LOG` takes precedence over `RUST_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("ARBITER_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn cmd_eval(
    spec_path: &Path,
    document_path: &Path,
    config_path: Option<&Path>,
    strict: bool,
    output: OutputFormat,
    quiet: bool,
) {
    let config = match config_path {
        Some(path) => match EvaluatorConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                report_error(&format!("error: {}", e), output, quiet);
                process::exit(1);
            }
        },
        None => EvaluatorConfig::default(),
    };
    let evaluator = match Evaluator::with_config(config) {
        Ok(e) => e,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let spec = load_specification(spec_path, output, quiet);
    let document = load_document(document_path, output, quiet);
    debug!(
        specification = spec.id(),
        criteria = spec.len(),
        "evaluating"
    );

    let outcome = evaluator.evaluate(&document, &spec);

    if !quiet {
        match output {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome.to_json())
                        .unwrap_or_else(|e| format!("serialization error: {}", e))
                );
            }
            OutputFormat::Text => {
                print!("{}", report::render(&spec, &outcome));
            }
        }
    }

    if strict && !outcome.is_fully_determined() {
        process::exit(2);
    }
}

fn cmd_validate(spec_path: &Path, output: OutputFormat, quiet: bool) {
    let spec = load_specification(spec_path, output, quiet);
    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => {
            let result = serde_json::json!({
                "valid": true,
                "id": spec.id(),
                "criteria": spec.len(),
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&result)
                    .unwrap_or_else(|e| format!("serialization error: {}", e))
            );
        }
        OutputFormat::Text => {
            println!("Valid: {} ({} criteria)", spec.id(), spec.len());
        }
    }
}

fn cmd_explain(
    spec_path: &Path,
    format: ExplainOutputFormat,
    output: OutputFormat,
    quiet: bool,
) {
    let spec = load_specification(spec_path, output, quiet);
    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&explain::explain_json(&spec))
                    .unwrap_or_else(|e| format!("serialization error: {}", e))
            );
        }
        OutputFormat::Text => {
            let explain_format = match format {
                ExplainOutputFormat::Terminal => explain::ExplainFormat::Terminal,
                ExplainOutputFormat::Markdown => explain::ExplainFormat::Markdown,
            };
            print!("{}", explain::explain(&spec, explain_format));
        }
    }
}

/// Read and validate a specification, exiting with code 1 on failure.
fn load_specification(path: &Path, output: OutputFormat, quiet: bool) -> Specification {
    let text = read_file(path, "specification", output, quiet);
    let format = Format::from_path(path);
    let parsed = match arbiter_interchange::from_str(&text, format) {
        Ok(p) => p,
        Err(e) => {
            let msg = format!("error: invalid specification {}: {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match Specification::from_parsed(&parsed) {
        Ok(spec) => spec,
        Err(e) => {
            let msg = format!("error: invalid specification {}: {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn load_document(path: &Path, output: OutputFormat, quiet: bool) -> Value {
    let text = read_file(path, "document", output, quiet);
    match arbiter_interchange::parse_document(&text, Format::from_path(path)) {
        Ok(json) => Value::from_json(&json),
        Err(e) => {
            let msg = format!("error: invalid document {}: {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn read_file(path: &Path, what: &str, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => {
            let msg = format!("error: {} file not found: {}", what, path.display());
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

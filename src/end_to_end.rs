//! Code to configure and run the interpreter on a source expression.

use std::collections::HashSet;
use std::fs;

use clap::Parser;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::box_tree_impl::box_tree_ast::Expression;
use crate::box_tree_impl::box_tree_parsing::{parse, ParseError};
use crate::library::{Library, LibraryError, DEFAULT_LIBRARY};
use crate::test_harness::run_tests_with_limit;

/// Config for the interpreter. Instantiate via `InterpreterConfig::parse()`.
#[derive(Parser, Debug, Clone, Default)]
#[command(version, about, long_about = None)]
pub struct InterpreterConfig {
    /// Expression to evaluate.
    #[arg(short, long, conflicts_with = "src_filepath")]
    pub expression: Option<String>,

    /// File containing the expression to evaluate.
    #[arg(short, long)]
    pub src_filepath: Option<String>,

    /// Maximum number of reduction steps.
    #[arg(short, long, default_value_t = 100)]
    pub max_steps: usize,

    /// Expand library names before reducing.
    #[arg(short, long)]
    pub apply_library: bool,

    /// Match library names case-insensitively when expanding.
    #[arg(short, long)]
    pub ignore_case: bool,

    /// Rewrite the result back into library names.
    #[arg(short, long)]
    pub reverse_library: bool,

    /// Print every intermediate expression.
    #[arg(long)]
    pub show_steps: bool,

    /// Print the default library and exit.
    #[arg(long)]
    pub list_library: bool,

    /// Run the built-in reduction cases and exit.
    #[arg(long)]
    pub run_tests: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Errors that may be thrown when running the interpreter.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Interpreter configuration error: {0}")]
    ConfigError(String),

    #[error("Input file error: {0}")]
    InputFileError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    #[error("Library error: {0}")]
    LibraryError(#[from] LibraryError),
}

// Source text from either the inline expression or the input file.
fn read_source(config: &InterpreterConfig) -> Result<String, RunError> {
    match (&config.expression, &config.src_filepath) {
        (Some(expression), None) => Ok(expression.clone()),
        (None, Some(src_filepath)) => Ok(fs::read_to_string(src_filepath)?),
        (Some(_), Some(_)) => Err(RunError::ConfigError(String::from(
            "Pass either an expression or a source file, not both",
        ))),
        (None, None) => Err(RunError::ConfigError(String::from(
            "No expression or source file given",
        ))),
    }
}

// One line per entry: name, source, and description when present.
fn library_listing(library: &Library) -> String {
    library
        .iter()
        .map(|(name, entry)| match &entry.description {
            Some(description) => format!("{} = {}  ({})", name, entry.source, description),
            None => format!("{} = {}", name, entry.source),
        })
        .collect::<Vec<String>>()
        .join("\n")
}

// Repeated forward rewriting with case-insensitive lookup.
fn expand_ignore_case(
    library: &Library,
    expression: &Expression,
    max_passes: usize,
) -> Result<Expression, LibraryError> {
    let exclude = HashSet::new();
    let mut expanded = expression.clone();

    for _ in 0..max_passes {
        let has_library_name = expanded
            .get_free_variables()
            .iter()
            .any(|name| library.get_ignore_case(name).is_some());
        if !has_library_name {
            break;
        }
        expanded = expanded.apply_library_ignore_case(Some(library), Some(&exclude))?;
    }

    Ok(expanded)
}

/// Evaluate a single expression according to the config and render the
/// output.
pub fn evaluate(config: &InterpreterConfig, source: &str) -> Result<String, RunError> {
    let library = &*DEFAULT_LIBRARY;
    let mut expression = parse(source)?;
    info!("input: {}", expression);

    if config.apply_library {
        expression = if config.ignore_case {
            expand_ignore_case(library, &expression, config.max_steps)?
        } else {
            library.expand(&expression, &HashSet::new(), config.max_steps)?
        };
        debug!("expanded: {}", expression);
    }

    let mut lines = Vec::new();
    let normalization = expression.normalize_with(config.max_steps, |_, step| {
        if config.show_steps {
            lines.push(step.to_string());
        }
    });
    let mut result = normalization.expression;
    if !normalization.reached_normal_form {
        warn!(
            "no normal form reached within {} steps",
            normalization.steps
        );
    }

    if config.reverse_library {
        result = result.reverse_library(Some(library));
    }

    if !config.show_steps || config.reverse_library {
        lines.push(result.to_string());
    }
    if !normalization.reached_normal_form {
        lines.push(format!(
            "(no normal form within {} steps)",
            normalization.steps
        ));
    }

    Ok(lines.join("\n"))
}

/// Run an interpreter (i.e. the lexer, parser, and reduction) given an
/// interpreter config.
pub fn run_interpreter(config: &InterpreterConfig) -> Result<String, RunError> {
    if config.list_library {
        return Ok(library_listing(&DEFAULT_LIBRARY));
    }

    if config.run_tests {
        return Ok(run_tests_with_limit(None, config.max_steps).to_string());
    }

    let source = read_source(config)?;
    evaluate(config, &source)
}

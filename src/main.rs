//! Reduce a given lambda expression and print the result to standard output.
//!
//! Example usage:
//!
//!     cargo run -- \
//!         --apply-library --reverse-library \
//!         --expression "+ 2 3"

use clap::Parser;
use lambda_engine::end_to_end::{run_interpreter, InterpreterConfig};
use tracing::Level;

fn main() {
    let interpreter_config = InterpreterConfig::parse();

    let max_level = if interpreter_config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .init();

    let interpreter_result = run_interpreter(&interpreter_config);

    match interpreter_result {
        Ok(execution_result) => {
            println!("{}", execution_result);
        }

        Err(run_error) => {
            eprintln!("{}", run_error);
            std::process::exit(1);
        }
    }
}

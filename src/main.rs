//! # lra
//!
//! `lra` is a command-line driver for the incremental Simplex procedure in
//! `lra_simplex`. It reads problem scripts that declare variables, define
//! rows, assert bounds inside nested scopes and request checks, and reports
//! a model or a minimal-looking conflict for every check.
//!
//! ## Usage
//!
//! ```sh
//! lra [OPTIONS] [PATH] [SUBCOMMAND]
//! ```
//!
//! ### Subcommands
//!
//! 1.  **`file`**: Solve a problem file.
//!     ```sh
//!     lra file --path problem.lra [OPTIONS]
//!     ```
//!
//! 2.  **`text`**: Solve a problem given inline.
//!     ```sh
//!     lra text --input "v x y\nb x >= 1\nb x < 1\ncheck"
//!     ```
//!
//! 3.  **`dir`**: Solve every `.lra` file below a directory.
//!     ```sh
//!     lra dir --path benchmarks/ --stats
//!     ```
//!
//! 4.  **`completions`**: Print a shell completion script.
//!
//! ### Common Options
//!
//! -   `-d, --debug`, `-v, --verbose`: Logging level (`RUST_LOG` overrides both).
//! -   `--verify`: Check models against rows and bounds, and conflicts by elimination.
//! -   `-s, --stats`: Print problem and search statistics.
//! -   `-p, --print-model`: Print the model of every satisfiable check.
//! -   `--no-early-conflict`, `--heuristic-limit <N>`, `--paranoid`: Search tuning.

use crate::command_line::cli::{Cli, Commands, init_tracing, solve_dir, solve_file, solve_text};
use clap::{CommandFactory, Parser};
use std::process::ExitCode;

mod command_line;

/// Global allocator using `tikv-jemallocator` for memory usage tracking.
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let common = match &cli.command {
        Some(
            Commands::File { common, .. }
            | Commands::Text { common, .. }
            | Commands::Dir { common, .. },
        ) => common,
        Some(Commands::Completions { .. }) | None => &cli.common,
    };
    init_tracing(common);

    let outcome = match &cli.command {
        Some(Commands::File { path, common }) => solve_file(path, common),
        Some(Commands::Text { input, common }) => solve_text(input, common),
        Some(Commands::Dir { path, common }) => solve_dir(path, common),
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(*shell, &mut Cli::command(), "lra", &mut std::io::stdout());
            Ok(true)
        }
        None => match &cli.path {
            Some(path) if path.is_dir() => solve_dir(path, &cli.common),
            Some(path) => solve_file(path, &cli.common),
            None => {
                eprintln!("No command provided. Use --help for more information.");
                return ExitCode::FAILURE;
            }
        },
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("Verification failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

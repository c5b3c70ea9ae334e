#![allow(clippy::cast_precision_loss)]

use clap::{Args, Parser, Subcommand};
use itertools::Itertools;
use lra_simplex::lra::config::SimplexConfig;
use lra_simplex::lra::error::{LraError, Result};
use lra_simplex::lra::problem::{CheckResult, Problem, Verdict};
use lra_simplex::lra::statistics::SimplexStats;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tikv_jemalloc_ctl::{epoch, stats};
use tracing_subscriber::EnvFilter;

/// Defines the command-line interface of the `lra` application.
///
/// Uses `clap` for parsing arguments.
#[derive(Parser, Debug)]
#[command(
    name = "lra",
    version,
    about = "An incremental Simplex solver for linear real arithmetic"
)]
pub(crate) struct Cli {
    /// An optional path argument. If provided without a subcommand, it's treated as the
    /// path to a problem file to solve.
    pub path: Option<PathBuf>,

    /// Specifies the subcommand to execute (e.g. `file`, `text`, `dir`).
    #[clap(subcommand)]
    pub command: Option<Commands>,

    /// Common options applicable to all commands.
    #[command(flatten)]
    pub common: CommonOptions,
}

/// Enumerates the available subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Solve a problem file.
    File {
        /// Path to the problem file.
        #[arg(long)]
        path: PathBuf,

        /// Common options for this subcommand.
        #[command(flatten)]
        common: CommonOptions,
    },

    /// Solve a problem provided as plain text.
    Text {
        /// The problem script, one command per line (e.g. "v x\nb x >= 1\ncheck").
        #[arg(short, long)]
        input: String,

        /// Common options for this subcommand.
        #[command(flatten)]
        common: CommonOptions,
    },

    /// Solve every `.lra` file below a directory.
    Dir {
        /// Path to the directory.
        #[arg(long)]
        path: PathBuf,

        /// Common options for this subcommand.
        #[command(flatten)]
        common: CommonOptions,
    },

    /// Generate shell completion scripts.
    Completions {
        /// The shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Defines common command-line options shared across different subcommands.
#[derive(Args, Debug, Default, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct CommonOptions {
    /// Enable debug logging.
    #[arg(short, long, default_value_t = false)]
    pub(crate) debug: bool,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub(crate) verbose: u8,

    /// Check every model against the rows and bounds, and re-derive every conflict.
    #[arg(long, default_value_t = false)]
    pub(crate) verify: bool,

    /// Print problem and search statistics.
    #[arg(short, long, default_value_t = false)]
    pub(crate) stats: bool,

    /// Print the model of every satisfiable check.
    #[arg(short, long, default_value_t = false)]
    pub(crate) print_model: bool,

    /// Skip the scan for conflicts before pivoting.
    #[arg(long, default_value_t = false)]
    pub(crate) no_early_conflict: bool,

    /// Pivots before switching to Bland's rule (default: number of variables).
    #[arg(long)]
    pub(crate) heuristic_limit: Option<usize>,

    /// Verify the tableau after every pivot (debug builds only).
    #[arg(long, default_value_t = false)]
    pub(crate) paranoid: bool,
}

impl CommonOptions {
    /// Maps the options onto the procedure's configuration.
    pub(crate) const fn config(&self) -> SimplexConfig {
        SimplexConfig {
            early_conflict_scan: !self.no_early_conflict,
            heuristic_iteration_limit: self.heuristic_limit,
            paranoid_checks: self.paranoid,
        }
    }

    const fn log_level(&self) -> &'static str {
        match (self.debug, self.verbose) {
            (true, 0..=2) | (false, 2) => "debug",
            (false, 0) => "warn",
            (false, 1) => "info",
            _ => "trace",
        }
    }
}

/// Installs the `tracing` subscriber. `RUST_LOG` takes precedence over the options.
pub(crate) fn init_tracing(common: &CommonOptions) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(common.log_level()));
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("Logging disabled: {e}");
    }
}

/// Parses and solves a problem file.
///
/// # Errors
///
/// If the file cannot be read or parsed.
pub(crate) fn solve_file(path: &Path, common: &CommonOptions) -> Result<bool> {
    let time = Instant::now();
    let problem = Problem::parse_file(path)?;
    let parse_time = time.elapsed();

    Ok(solve_and_report(&problem, common, Some(path), parse_time))
}

/// Parses and solves a problem given as text.
///
/// # Errors
///
/// If the text cannot be parsed.
pub(crate) fn solve_text(input: &str, common: &CommonOptions) -> Result<bool> {
    let time = Instant::now();
    let problem = Problem::parse(&input.replace("\\n", "\n"))?;
    let parse_time = time.elapsed();

    Ok(solve_and_report(&problem, common, None, parse_time))
}

/// Solves every `.lra` file below `path`.
///
/// # Errors
///
/// If `path` is not a directory, or a file cannot be read or parsed.
pub(crate) fn solve_dir(path: &Path, common: &CommonOptions) -> Result<bool> {
    if !path.is_dir() {
        return Err(LraError::Io(std::io::Error::new(
            std::io::ErrorKind::NotADirectory,
            format!("not a directory: {}", path.display()),
        )));
    }

    let mut verified = true;
    for entry in walkdir::WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
    {
        let file_path = entry.path();
        if !file_path.is_file() {
            continue;
        }
        if file_path.extension().is_none_or(|ext| ext != "lra") {
            eprintln!("Skipping non-problem file: {}", file_path.display());
            continue;
        }

        verified &= solve_file(file_path, common)?;
    }

    Ok(verified)
}

/// Runs a problem and reports results, verification and statistics.
///
/// Returns `false` if verification was requested and some result failed it.
pub(crate) fn solve_and_report(
    problem: &Problem,
    common: &CommonOptions,
    label: Option<&Path>,
    parse_time: Duration,
) -> bool {
    if let Some(name) = label {
        println!("Solving: {}", name.display());
    }

    epoch::advance().ok();
    let time = Instant::now();
    let (results, solver_stats) = problem.run_with_stats(common.config());
    let elapsed = time.elapsed();

    let (allocated_mib, resident_mib) = memory_usage();

    print_results(problem, &results, common.print_model);

    let verified = !common.verify || verify_results(problem, &results);

    if common.stats {
        print_stats(
            parse_time,
            elapsed,
            problem,
            &results,
            &solver_stats,
            allocated_mib,
            resident_mib,
        );
    }

    verified
}

fn memory_usage() -> (f64, f64) {
    epoch::advance().ok();
    let allocated = stats::allocated::mib().and_then(|m| m.read()).unwrap_or(0);
    let resident = stats::resident::mib().and_then(|m| m.read()).unwrap_or(0);
    (
        allocated as f64 / (1024.0 * 1024.0),
        resident as f64 / (1024.0 * 1024.0),
    )
}

fn print_results(problem: &Problem, results: &[CheckResult], print_model: bool) {
    for (i, result) in results.iter().enumerate() {
        match &result.verdict {
            Verdict::Sat(model) => {
                println!("check {i}: SAT");
                if print_model {
                    for (var, value) in model.values.iter().enumerate() {
                        println!("  {} = {value}", problem.name(var));
                    }
                }
            }
            Verdict::Unsat(conflict) => {
                let literals = conflict
                    .iter()
                    .map(|&ordinal| problem.describe(ordinal))
                    .join(", ");
                println!("check {i}: UNSAT ({literals})");
            }
        }
    }
}

/// Verifies every result, printing the outcome.
pub(crate) fn verify_results(problem: &Problem, results: &[CheckResult]) -> bool {
    let failed = results
        .iter()
        .positions(|result| !problem.verify(result))
        .collect_vec();
    println!("Verified: {:?}", failed.is_empty());
    for i in &failed {
        eprintln!("check {i} failed verification");
    }
    failed.is_empty()
}

/// Helper function to print a single statistic line in a formatted table row.
pub(crate) fn stat_line(label: &str, value: impl std::fmt::Display) {
    println!("|  {label:<28} {value:>18}  |");
}

/// Helper function to print a statistic line that includes a rate (value/second).
pub(crate) fn stat_line_with_rate(label: &str, value: usize, elapsed: f64) {
    let rate = if elapsed > 0.0 {
        value as f64 / elapsed
    } else {
        0.0
    };
    println!("|  {label:<20} {value:>12} ({rate:>9.0}/sec)  |");
}

/// Prints a summary of problem and search statistics.
pub(crate) fn print_stats(
    parse_time: Duration,
    elapsed: Duration,
    problem: &Problem,
    results: &[CheckResult],
    s: &SimplexStats,
    allocated: f64,
    resident: f64,
) {
    let elapsed_secs = elapsed.as_secs_f64();
    let sat = results.iter().filter(|r| r.is_sat()).count();

    println!("\n=======================[ Problem Statistics ]=========================");
    stat_line("Parse time (s)", format!("{:.3}", parse_time.as_secs_f64()));
    stat_line("Variables", problem.num_variables());
    stat_line("Rows", problem.rows(usize::MAX).count());
    stat_line("Bound literals", problem.literals().len());
    stat_line("Checks", results.len());

    println!("========================[ Search Statistics ]========================");
    stat_line_with_rate("Pivots", s.pivots, elapsed_secs);
    stat_line_with_rate("Updates", s.updates, elapsed_secs);
    stat_line("Assert lower conflicts", s.assert_lower_conflicts);
    stat_line("Assert upper conflicts", s.assert_upper_conflicts);
    stat_line("Assert equality conflicts", s.assert_equality_conflicts);
    stat_line("Update conflicts", s.update_conflicts);
    stat_line("Early conflicts", s.early_conflicts);
    stat_line("Early conflict improvements", s.early_conflict_improvements);
    stat_line("Pivots after conflict", s.pivots_after_conflict);
    stat_line("Checks with wasteful pivots", s.checks_with_wasteful_pivots);
    stat_line("Bland's rule switches", s.anti_cycle_switches);
    stat_line("Memory usage (MiB)", format!("{allocated:.2}"));
    stat_line("Resident memory (MiB)", format!("{resident:.2}"));
    stat_line("CPU time (s)", format!("{elapsed_secs:.3}"));
    println!("=====================================================================");

    println!("\n{sat} SATISFIABLE, {} UNSATISFIABLE", results.len() - sat);
}

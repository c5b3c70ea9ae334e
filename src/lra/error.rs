#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Error types.
//!
//! The decision procedure itself never fails: infeasibility is an answer, not an
//! error. [`LraError`] covers the problem format and I/O; [`InvariantViolation`] is
//! what the verification pass reports when internal bookkeeping went wrong.

use crate::lra::ArithVar;
use crate::lra::delta_rational::DeltaRational;
use thiserror::Error;

/// Errors of the problem format and its driver.
#[derive(Debug, Error)]
pub enum LraError {
    /// A line could not be parsed.
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// A name was used before being declared with `v`.
    #[error("line {line}: unknown variable `{name}`")]
    UnknownVariable {
        /// 1-based line number.
        line: usize,
        /// The offending name.
        name: String,
    },

    /// A name was declared twice.
    #[error("line {line}: variable `{name}` declared twice")]
    DuplicateVariable {
        /// 1-based line number.
        line: usize,
        /// The offending name.
        name: String,
    },

    /// A row was given for a variable that already has one, or that is used by a row.
    #[error("line {line}: `{name}` cannot be defined by a row here")]
    InvalidRow {
        /// 1-based line number.
        line: usize,
        /// The offending name.
        name: String,
    },

    /// Reading the input failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand for results of the problem layer.
pub type Result<T> = std::result::Result<T, LraError>;

/// A broken internal invariant, found by the verification pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// A basic variable's value differs from the value of its row.
    #[error("row of x{basic} evaluates to {computed}, but x{basic} is assigned {assigned}")]
    RowMismatch {
        /// The basic variable.
        basic: ArithVar,
        /// Its stored value.
        assigned: DeltaRational,
        /// The value recomputed from the row.
        computed: DeltaRational,
    },

    /// A row mentions a basic variable.
    #[error("row of x{basic} mentions basic variable x{var}")]
    BasicInRow {
        /// The row owner.
        basic: ArithVar,
        /// The basic variable found in the row.
        var: ArithVar,
    },

    /// A row stores a zero coefficient.
    #[error("row of x{basic} stores a zero coefficient for x{var}")]
    ZeroCoefficient {
        /// The row owner.
        basic: ArithVar,
        /// The variable with the zero coefficient.
        var: ArithVar,
    },

    /// A variable is flagged basic but owns no row, or the other way around.
    #[error("x{var} is flagged basic = {flagged} but owns a row = {has_row}")]
    Partition {
        /// The variable.
        var: ArithVar,
        /// Its basic flag.
        flagged: bool,
        /// Whether it owns a row.
        has_row: bool,
    },

    /// The column index disagrees with the rows.
    #[error("column of x{var} has {indexed} rows indexed but {actual} rows mention it")]
    ColumnIndex {
        /// The variable.
        var: ArithVar,
        /// The count kept by the index.
        indexed: usize,
        /// The count found by scanning rows.
        actual: usize,
    },
}

#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Linear real arithmetic: an incremental general Simplex over exact rationals.
//!
//! The building blocks, leaf to root:
//!
//! - [`delta_rational`]: values `c + kδ` used for every assignment and bound.
//! - [`partial_model`]: per-variable assignment, bounds and their justifications.
//! - [`basic_manager`] and [`tableau`]: the basis and the row system.
//! - [`simplex`]: the decision procedure itself.
//! - [`conflict`], [`statistics`], [`config`]: the seams to the caller.
//!
//! [`problem`] is a small text format on top of the public API, used by the `lra`
//! binary and the integration tests.

/// `c + kδ` arithmetic.
pub mod delta_rational;

/// Bit-set partition of basic and nonbasic variables.
pub mod basic_manager;

/// Sparse row system with pivoting.
pub mod tableau;

/// Assignments, safe assignments and bounds.
pub mod partial_model;

/// Conflicts and the sink that receives them.
pub mod conflict;

/// Observer hooks and counters.
pub mod statistics;

/// Tunables of the decision procedure.
pub mod config;

/// Error types.
pub mod error;

/// Selection queues and the pivot stage.
pub mod selection;

/// The Simplex decision procedure.
pub mod simplex;

/// Line-oriented problem format and its runner.
pub mod problem;

/// Index of an arithmetic variable. Allocated by the caller, never by the procedure.
pub type ArithVar = usize;

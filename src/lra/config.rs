#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Tunables of the decision procedure.

/// Knobs of [`SimplexDecisionProcedure`](crate::lra::simplex::SimplexDecisionProcedure).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimplexConfig {
    /// Scan all queued variables for a conflict before pivoting, keeping the smallest.
    pub early_conflict_scan: bool,
    /// Pivots in the heuristic stage before switching to Bland's rule.
    /// `None` uses the number of registered variables.
    pub heuristic_iteration_limit: Option<usize>,
    /// Verify the tableau after every pivot. Only honoured in debug builds.
    pub paranoid_checks: bool,
}

impl Default for SimplexConfig {
    fn default() -> Self {
        Self {
            early_conflict_scan: true,
            heuristic_iteration_limit: None,
            paranoid_checks: false,
        }
    }
}

impl SimplexConfig {
    /// The heuristic stage length for a procedure with `num_vars` registered variables.
    #[must_use]
    pub fn iteration_limit(&self, num_vars: usize) -> usize {
        self.heuristic_iteration_limit.unwrap_or(num_vars)
    }
}

#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Instrumentation of the decision procedure.
//!
//! The procedure reports events to an injected [`SimplexObserver`] instead of
//! touching any global registry. [`SimplexStats`] counts them, [`NoStats`] drops
//! them.

/// Receives events from the decision procedure. Every hook defaults to a no-op.
pub trait SimplexObserver {
    /// A basis exchange was performed.
    fn on_pivot(&mut self) {}

    /// A nonbasic variable was moved by `update`.
    fn on_update(&mut self) {}

    /// A lower bound assertion conflicted with the upper bound.
    fn on_assert_lower_conflict(&mut self) {}

    /// An upper bound assertion conflicted with the lower bound.
    fn on_assert_upper_conflict(&mut self) {}

    /// An equality assertion conflicted with a bound.
    fn on_assert_equality_conflict(&mut self) {}

    /// The fixpoint search ended in a conflict.
    fn on_update_conflict(&mut self) {}

    /// The early scan found a conflict before any pivot.
    fn on_early_conflict(&mut self) {}

    /// The early scan found a conflict smaller than one it already had.
    fn on_early_conflict_improvement(&mut self) {}

    /// A pivot was made although a conflict was already derivable.
    fn on_pivot_after_conflict(&mut self) {}

    /// A search ended with a conflict that was derivable before its last pivots.
    fn on_wasteful_check(&mut self) {}

    /// The search switched from the heuristic stage to Bland's rule.
    fn on_anti_cycle_switch(&mut self) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoStats;

impl SimplexObserver for NoStats {}

/// Counts every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimplexStats {
    /// Basis exchanges.
    pub pivots: usize,
    /// Nonbasic updates.
    pub updates: usize,
    /// Conflicts found by `assert_lower`.
    pub assert_lower_conflicts: usize,
    /// Conflicts found by `assert_upper`.
    pub assert_upper_conflicts: usize,
    /// Conflicts found by `assert_equality`.
    pub assert_equality_conflicts: usize,
    /// Conflicts found by the fixpoint search.
    pub update_conflicts: usize,
    /// Conflicts found by the early scan.
    pub early_conflicts: usize,
    /// Times the early scan replaced its conflict with a smaller one.
    pub early_conflict_improvements: usize,
    /// Pivots made after a conflict had become derivable.
    pub pivots_after_conflict: usize,
    /// Searches that pivoted past a derivable conflict.
    pub checks_with_wasteful_pivots: usize,
    /// Switches to Bland's rule.
    pub anti_cycle_switches: usize,
}

impl SimplexStats {
    /// Total conflicts of every kind.
    #[must_use]
    pub const fn conflicts(&self) -> usize {
        self.assert_lower_conflicts
            + self.assert_upper_conflicts
            + self.assert_equality_conflicts
            + self.update_conflicts
    }
}

impl SimplexObserver for SimplexStats {
    fn on_pivot(&mut self) {
        self.pivots += 1;
    }

    fn on_update(&mut self) {
        self.updates += 1;
    }

    fn on_assert_lower_conflict(&mut self) {
        self.assert_lower_conflicts += 1;
    }

    fn on_assert_upper_conflict(&mut self) {
        self.assert_upper_conflicts += 1;
    }

    fn on_assert_equality_conflict(&mut self) {
        self.assert_equality_conflicts += 1;
    }

    fn on_update_conflict(&mut self) {
        self.update_conflicts += 1;
    }

    fn on_early_conflict(&mut self) {
        self.early_conflicts += 1;
    }

    fn on_early_conflict_improvement(&mut self) {
        self.early_conflict_improvements += 1;
    }

    fn on_pivot_after_conflict(&mut self) {
        self.pivots_after_conflict += 1;
    }

    fn on_wasteful_check(&mut self) {
        self.checks_with_wasteful_pivots += 1;
    }

    fn on_anti_cycle_switch(&mut self) {
        self.anti_cycle_switches += 1;
    }
}

impl<O: SimplexObserver + ?Sized> SimplexObserver for &mut O {
    fn on_pivot(&mut self) {
        (**self).on_pivot();
    }

    fn on_update(&mut self) {
        (**self).on_update();
    }

    fn on_assert_lower_conflict(&mut self) {
        (**self).on_assert_lower_conflict();
    }

    fn on_assert_upper_conflict(&mut self) {
        (**self).on_assert_upper_conflict();
    }

    fn on_assert_equality_conflict(&mut self) {
        (**self).on_assert_equality_conflict();
    }

    fn on_update_conflict(&mut self) {
        (**self).on_update_conflict();
    }

    fn on_early_conflict(&mut self) {
        (**self).on_early_conflict();
    }

    fn on_early_conflict_improvement(&mut self) {
        (**self).on_early_conflict_improvement();
    }

    fn on_pivot_after_conflict(&mut self) {
        (**self).on_pivot_after_conflict();
    }

    fn on_wasteful_check(&mut self) {
        (**self).on_wasteful_check();
    }

    fn on_anti_cycle_switch(&mut self) {
        (**self).on_anti_cycle_switch();
    }
}

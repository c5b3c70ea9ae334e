#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Which inconsistent variable to repair next, and with which partner.
//!
//! The search runs in two stages. The heuristic stage repairs the variable with the
//! largest bound violation first and prefers partners that appear in few rows. It is
//! fast in practice but can cycle, so after a bounded number of pivots the search
//! switches to Bland's rule: smallest inconsistent variable, smallest eligible
//! partner. That stage always terminates.
//!
//! Entries are deleted lazily: a variable stays queued after it became nonbasic or
//! consistent, and the consumer skips it when it is popped.

use crate::lra::ArithVar;
use crate::lra::delta_rational::DeltaRational;
use core::cmp::Reverse;
use itertools::Itertools;
use std::collections::BinaryHeap;

/// The search stage, selecting both queue discipline and partner rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PivotStage {
    /// Largest violation first, partner in fewest rows.
    #[default]
    Heuristic,
    /// Bland's rule: smallest index first, for both sides of the pivot.
    AntiCycle,
}

impl PivotStage {
    /// Picks a pivot partner among `eligible`, which must be in ascending index order.
    ///
    /// Heuristic: the candidate with the smallest `row_count`, earliest on ties.
    /// Anti-cycle: the first candidate.
    pub fn choose_partner<I, F>(self, eligible: I, row_count: F) -> Option<ArithVar>
    where
        I: IntoIterator<Item = ArithVar>,
        F: Fn(ArithVar) -> usize,
    {
        let mut eligible = eligible.into_iter();
        match self {
            Self::Heuristic => eligible.min_by_key(|&var| row_count(var)),
            Self::AntiCycle => eligible.next(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Violation {
    amount: DeltaRational,
    var: Reverse<ArithVar>,
}

/// The two queues of inconsistent basic variables and the current stage.
#[derive(Debug, Clone, Default)]
pub struct SelectionQueues {
    stage: PivotStage,
    by_violation: BinaryHeap<Violation>,
    by_index: BinaryHeap<Reverse<ArithVar>>,
}

impl SelectionQueues {
    /// Creates empty queues in the heuristic stage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current stage.
    #[must_use]
    pub const fn stage(&self) -> PivotStage {
        self.stage
    }

    /// Number of queued entries, stale ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_violation.len() + self.by_index.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_violation.is_empty() && self.by_index.is_empty()
    }

    /// Queues `var`. The violation amount is only used in the heuristic stage.
    pub fn push(&mut self, var: ArithVar, amount: DeltaRational) {
        match self.stage {
            PivotStage::Heuristic => self.by_violation.push(Violation {
                amount,
                var: Reverse(var),
            }),
            PivotStage::AntiCycle => self.by_index.push(Reverse(var)),
        }
    }

    /// Pops the next candidate of the current stage.
    pub fn pop(&mut self) -> Option<ArithVar> {
        match self.stage {
            PivotStage::Heuristic => self.by_violation.pop().map(|v| v.var.0),
            PivotStage::AntiCycle => self.by_index.pop().map(|Reverse(var)| var),
        }
    }

    /// Moves every heuristic entry into the index queue and switches to Bland's rule.
    pub fn switch_to_anti_cycle(&mut self) {
        let moved = self.by_violation.drain().map(|v| v.var);
        self.by_index.extend(moved);
        self.stage = PivotStage::AntiCycle;
    }

    /// Distinct queued variables in ascending order, stale ones included.
    #[must_use]
    pub fn queued(&self) -> Vec<ArithVar> {
        self.by_violation
            .iter()
            .map(|v| v.var.0)
            .chain(self.by_index.iter().map(|Reverse(var)| *var))
            .sorted_unstable()
            .dedup()
            .collect_vec()
    }

    /// Empties both queues without changing the stage, returning the distinct
    /// variables that were queued.
    pub fn take(&mut self) -> Vec<ArithVar> {
        let queued = self.queued();
        self.by_violation.clear();
        self.by_index.clear();
        queued
    }

    /// Empties both queues and returns to the heuristic stage.
    pub fn reset(&mut self) {
        self.by_violation.clear();
        self.by_index.clear();
        self.stage = PivotStage::Heuristic;
    }
}

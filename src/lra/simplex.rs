#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! The incremental Simplex decision procedure.
//!
//! This is the general Simplex of Dutertre and de Moura: the tableau is a fixed set
//! of row equations, every variable may carry a lower and an upper bound, and the
//! procedure looks for an assignment satisfying all equations and bounds at once.
//!
//! Invariants kept between public calls:
//!
//! - every basic variable equals the value of its row;
//! - every nonbasic variable lies within its bounds;
//! - every basic variable outside its bounds is queued for repair.
//!
//! Bounds are asserted one at a time. An assertion either detects a direct clash
//! with the opposite bound of the same variable or installs the bound, moving a
//! nonbasic variable onto it if necessary. Repairing the basic variables is
//! deferred to [`SimplexDecisionProcedure::update_inconsistent_vars`], which pivots
//! until every bound holds or some row proves that one cannot.

use crate::lra::ArithVar;
use crate::lra::conflict::{Conflict, ConflictSink};
use crate::lra::config::SimplexConfig;
use crate::lra::delta_rational::DeltaRational;
use crate::lra::error::InvariantViolation;
use crate::lra::partial_model::ArithPartialModel;
use crate::lra::selection::{PivotStage, SelectionQueues};
use crate::lra::statistics::{SimplexObserver, SimplexStats};
use crate::lra::tableau::Tableau;
use bit_vec::BitVec;
use itertools::Itertools;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use std::fmt::Debug;
use std::hash::Hash;
use tracing::{debug, trace};

/// Decides whether a running search should stop early.
///
/// Consulted before every pivot.
pub trait ResourceBudget {
    /// Returns `true` once the search must stop.
    fn exhausted(&mut self) -> bool;
}

/// A budget that never runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Unlimited;

impl ResourceBudget for Unlimited {
    fn exhausted(&mut self) -> bool {
        false
    }
}

/// A budget of a fixed number of pivots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PivotLimit {
    remaining: usize,
}

impl PivotLimit {
    /// Allows `pivots` more pivots.
    #[must_use]
    pub const fn new(pivots: usize) -> Self {
        Self { remaining: pivots }
    }

    /// Pivots still allowed.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.remaining
    }
}

impl ResourceBudget for PivotLimit {
    fn exhausted(&mut self) -> bool {
        if self.remaining == 0 {
            true
        } else {
            self.remaining -= 1;
            false
        }
    }
}

impl<F: FnMut() -> bool> ResourceBudget for F {
    fn exhausted(&mut self) -> bool {
        self()
    }
}

/// How a search ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome<T> {
    /// Every bound holds under the current assignment.
    Sat,
    /// The asserted bounds are infeasible; the conflict was also sent to the sink.
    Unsat(Conflict<T>),
    /// The budget ran out. Inconsistent variables stay queued for the next call.
    Interrupted,
}

impl<T> SearchOutcome<T> {
    /// Returns `true` for [`SearchOutcome::Sat`].
    #[must_use]
    pub const fn is_sat(&self) -> bool {
        matches!(self, Self::Sat)
    }

    /// The conflict, if the search proved infeasibility.
    #[must_use]
    pub fn conflict(self) -> Option<Conflict<T>> {
        match self {
            Self::Unsat(conflict) => Some(conflict),
            Self::Sat | Self::Interrupted => None,
        }
    }
}

/// Which bound a basic variable violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum BoundViolation {
    BelowLower,
    AboveUpper,
}

/// The Simplex decision procedure.
///
/// `T` is the justification token attached to every bound, `S` receives conflicts
/// and `O` observes what the procedure does.
#[derive(Debug, Clone)]
pub struct SimplexDecisionProcedure<T, S, O = SimplexStats> {
    config: SimplexConfig,
    model: ArithPartialModel<T>,
    tableau: Tableau,
    queues: SelectionQueues,
    registered: BitVec,
    num_vars: usize,
    found_conflict: bool,
    pivots_since_conflict: usize,
    iterations: usize,
    sink: S,
    observer: O,
}

impl<T, S> SimplexDecisionProcedure<T, S, SimplexStats>
where
    T: Clone + Eq + Hash + Debug,
    S: ConflictSink<T>,
{
    /// A procedure with the default configuration that counts statistics.
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self::with_observer(SimplexConfig::default(), sink, SimplexStats::default())
    }

    /// A procedure with the given configuration that counts statistics.
    #[must_use]
    pub fn with_config(config: SimplexConfig, sink: S) -> Self {
        Self::with_observer(config, sink, SimplexStats::default())
    }
}

impl<T, S, O> SimplexDecisionProcedure<T, S, O>
where
    T: Clone + Eq + Hash + Debug,
    S: ConflictSink<T>,
    O: SimplexObserver,
{
    /// A procedure reporting to a custom observer.
    #[must_use]
    pub fn with_observer(config: SimplexConfig, sink: S, observer: O) -> Self {
        Self {
            config,
            model: ArithPartialModel::new(),
            tableau: Tableau::new(),
            queues: SelectionQueues::new(),
            registered: BitVec::new(),
            num_vars: 0,
            found_conflict: false,
            pivots_since_conflict: 0,
            iterations: 0,
            sink,
            observer,
        }
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &SimplexConfig {
        &self.config
    }

    /// The observer.
    #[must_use]
    pub const fn observer(&self) -> &O {
        &self.observer
    }

    /// The observer, mutably.
    pub const fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// The conflict sink.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// The conflict sink, mutably.
    pub const fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Assignments and bounds.
    #[must_use]
    pub const fn model(&self) -> &ArithPartialModel<T> {
        &self.model
    }

    /// The row system.
    #[must_use]
    pub const fn tableau(&self) -> &Tableau {
        &self.tableau
    }

    /// Number of registered variables.
    #[must_use]
    pub const fn num_variables(&self) -> usize {
        self.num_vars
    }

    /// Returns `true` if `var` has been registered.
    #[must_use]
    pub fn is_registered(&self, var: ArithVar) -> bool {
        self.registered.get(var).unwrap_or(false)
    }

    /// Returns `true` if `var` currently owns a row.
    #[must_use]
    pub fn is_basic(&self, var: ArithVar) -> bool {
        self.tableau.is_basic(var)
    }

    /// The current value of `var`.
    #[must_use]
    pub fn assignment(&self, var: ArithVar) -> &DeltaRational {
        self.model.assignment(var)
    }

    /// Registers `var` as a nonbasic variable with value zero and no bounds.
    ///
    /// Registering an already registered variable does nothing.
    pub fn add_variable(&mut self, var: ArithVar) {
        if self.is_registered(var) {
            return;
        }
        if var >= self.registered.len() {
            self.registered.grow(var + 1 - self.registered.len(), false);
        }
        self.registered.set(var, true);
        self.num_vars += 1;
        self.tableau.increase_size(var);
        self.model.initialize(var, DeltaRational::zero());
        trace!(var, "registered variable");
    }

    /// Makes `basic` a basic variable defined by `basic = Σ coeff * var`.
    ///
    /// `basic` must not be basic already and must not appear in any row. Basic
    /// variables in the definition are replaced by their rows. The value of `basic`
    /// becomes the value of its row; bounds it already carries are then checked.
    pub fn add_row<I>(&mut self, basic: ArithVar, definition: I)
    where
        I: IntoIterator<Item = (ArithVar, BigRational)>,
    {
        let definition = definition.into_iter().collect_vec();
        self.add_variable(basic);
        for (var, _) in &definition {
            self.add_variable(*var);
        }

        self.tableau.add_row(basic, definition);

        let value = self.compute_row_value(basic, false);
        let safe = self.compute_row_value(basic, true);
        debug!(basic, %value, len = self.tableau.lookup(basic).len(), "added row");
        self.model.set_assignment_and_safe(basic, value, safe);
        self.check_basic_variable(basic);
    }

    /// Asserts `x >= c`. Returns `true` iff the assertion clashes with the upper bound
    /// of `x`; the conflict is then sent to the sink and the bound is not installed.
    pub fn assert_lower(&mut self, x: ArithVar, c: DeltaRational, token: T) -> bool {
        self.add_variable(x);
        debug!(x, %c, ?token, "assert lower");

        if self.model.below_lower_bound(x, &c, false) {
            return false;
        }
        if self.model.above_upper_bound(x, &c, true) {
            let upper = self.model.upper_constraint(x).cloned();
            let conflict = Conflict::new(upper.into_iter().chain([token]));
            self.observer.on_assert_lower_conflict();
            self.raise(conflict);
            return true;
        }

        self.model.set_lower_bound(x, c.clone(), token);

        if self.is_basic(x) {
            self.check_basic_variable(x);
        } else if self.model.assignment(x) < &c {
            self.update(x, c);
        }
        self.model.print_model(x);
        false
    }

    /// Asserts `x <= c`. Returns `true` iff the assertion clashes with the lower bound
    /// of `x`; the conflict is then sent to the sink and the bound is not installed.
    pub fn assert_upper(&mut self, x: ArithVar, c: DeltaRational, token: T) -> bool {
        self.add_variable(x);
        debug!(x, %c, ?token, "assert upper");

        if self.model.above_upper_bound(x, &c, false) {
            return false;
        }
        if self.model.below_lower_bound(x, &c, true) {
            let lower = self.model.lower_constraint(x).cloned();
            let conflict = Conflict::new(lower.into_iter().chain([token]));
            self.observer.on_assert_upper_conflict();
            self.raise(conflict);
            return true;
        }

        self.model.set_upper_bound(x, c.clone(), token);

        if self.is_basic(x) {
            self.check_basic_variable(x);
        } else if self.model.assignment(x) > &c {
            self.update(x, c);
        }
        self.model.print_model(x);
        false
    }

    /// Asserts `x = c`, installing both bounds with the same token. Returns `true` iff
    /// the assertion clashes with an existing bound of `x`.
    pub fn assert_equality(&mut self, x: ArithVar, c: DeltaRational, token: T) -> bool {
        self.add_variable(x);
        debug!(x, %c, ?token, "assert equality");

        if self.model.below_lower_bound(x, &c, false) && self.model.above_upper_bound(x, &c, false)
        {
            return false;
        }

        let clash = if self.model.above_upper_bound(x, &c, true) {
            Some(self.model.upper_constraint(x).cloned())
        } else if self.model.below_lower_bound(x, &c, true) {
            Some(self.model.lower_constraint(x).cloned())
        } else {
            None
        };
        if let Some(existing) = clash {
            let conflict = Conflict::new(existing.into_iter().chain([token]));
            self.observer.on_assert_equality_conflict();
            self.raise(conflict);
            return true;
        }

        self.model.set_lower_bound(x, c.clone(), token.clone());
        self.model.set_upper_bound(x, c.clone(), token);

        if self.is_basic(x) {
            self.check_basic_variable(x);
        } else if self.model.assignment(x) != &c {
            self.update(x, c);
        }
        self.model.print_model(x);
        false
    }

    /// Moves the nonbasic variable `x` to `value`, shifting every basic variable
    /// whose row mentions it.
    pub fn update(&mut self, x: ArithVar, value: DeltaRational) {
        debug_assert!(!self.is_basic(x), "update of basic variable {x}");

        let diff = &value - self.model.assignment(x);
        for basic in self.tableau.column(x) {
            let Some(coeff) = self.tableau.lookup(basic).lookup(x) else {
                continue;
            };
            let next = self.model.assignment(basic) + &(&diff * coeff);
            self.model.set_assignment(basic, next);
            self.check_basic_variable(basic);
        }

        trace!(x, %value, "update");
        self.model.set_assignment(x, value);
        self.observer.on_update();
    }

    /// Sets the basic `x_i` to `value` by moving the nonbasic `x_j`, then exchanges
    /// them in the basis.
    pub fn pivot_and_update(&mut self, x_i: ArithVar, x_j: ArithVar, value: DeltaRational) {
        debug_assert!(self.is_basic(x_i), "leaving variable {x_i} is not basic");
        debug_assert!(!self.is_basic(x_j), "entering variable {x_j} is basic");

        let Some(a_ij) = self.tableau.lookup(x_i).lookup(x_j).cloned() else {
            unreachable!("x{x_j} does not occur in the row of x{x_i}");
        };

        let theta = (&value - self.model.assignment(x_i)).div_rational(&a_ij);
        debug!(x_i, x_j, %value, %theta, "pivot and update");

        self.model.set_assignment(x_i, value);
        let next_j = self.model.assignment(x_j) + &theta;
        self.model.set_assignment(x_j, next_j);

        for x_k in self.tableau.column(x_j) {
            if x_k == x_i {
                continue;
            }
            let Some(a_kj) = self.tableau.lookup(x_k).lookup(x_j) else {
                continue;
            };
            let next = self.model.assignment(x_k) + &(&theta * a_kj);
            self.model.set_assignment(x_k, next);
            self.check_basic_variable(x_k);
        }

        self.observer.on_pivot();
        if self.found_conflict {
            self.pivots_since_conflict += 1;
            if self.pivots_since_conflict == 1 {
                self.observer.on_wasteful_check();
            }
            self.observer.on_pivot_after_conflict();
        }

        self.tableau.pivot(x_i, x_j);
        self.check_basic_variable(x_j);

        if !self.found_conflict {
            if let Some(violation) = self.violation(x_j) {
                self.found_conflict = self.select_slack(x_j, violation).is_none();
            }
        }
    }

    /// Repairs inconsistent basic variables until every bound holds or a conflict is
    /// found. The conflict is sent to the sink and returned.
    pub fn update_inconsistent_vars(&mut self) -> Option<Conflict<T>> {
        self.update_inconsistent_vars_with_budget(&mut Unlimited)
            .conflict()
    }

    /// Like [`Self::update_inconsistent_vars`], but stops when `budget` runs out.
    pub fn update_inconsistent_vars_with_budget<B: ResourceBudget>(
        &mut self,
        budget: &mut B,
    ) -> SearchOutcome<T> {
        if self.queues.is_empty() {
            self.finish_search();
            return SearchOutcome::Sat;
        }
        debug!(queued = self.queues.len(), "update inconsistent vars");

        self.found_conflict = false;
        self.pivots_since_conflict = 0;

        let early = if self.config.early_conflict_scan && self.queues.len() > 1 {
            self.select_initial_conflict()
        } else {
            None
        };
        let outcome = match early {
            Some(conflict) => SearchOutcome::Unsat(conflict),
            None => self.search(budget),
        };

        match &outcome {
            SearchOutcome::Sat => {
                self.finish_search();
                debug!("consistent");
            }
            SearchOutcome::Unsat(conflict) => {
                self.finish_search();
                self.recheck_basics();
                self.raise(conflict.clone());
            }
            SearchOutcome::Interrupted => {
                for var in self.queues.take() {
                    if self.is_basic(var) {
                        self.check_basic_variable(var);
                    }
                }
                debug!(queued = self.queues.len(), "interrupted");
            }
        }
        outcome
    }

    /// Returns to the heuristic stage with an empty queue.
    fn finish_search(&mut self) {
        self.queues.reset();
        self.iterations = 0;
    }

    /// Pivots until done or out of budget. The stage and iteration count carry over
    /// an interruption, so resumed searches still reach Bland's rule.
    fn search<B: ResourceBudget>(&mut self, budget: &mut B) -> SearchOutcome<T> {
        let limit = self.config.iteration_limit(self.num_vars);

        loop {
            if self.config.paranoid_checks {
                debug_assert_eq!(self.check_invariants(), Ok(()));
            }
            if self.queues.stage() == PivotStage::Heuristic && self.iterations >= limit {
                debug!(iterations = self.iterations, "switching to Bland's rule");
                self.queues.switch_to_anti_cycle();
                self.observer.on_anti_cycle_switch();
            }
            if budget.exhausted() {
                return SearchOutcome::Interrupted;
            }

            let Some(x_i) = self.select_smallest_inconsistent_var() else {
                return SearchOutcome::Sat;
            };
            self.iterations += 1;

            let Some(violation) = self.violation(x_i) else {
                continue;
            };
            let target = match violation {
                BoundViolation::BelowLower => self.model.lower_bound(x_i).cloned(),
                BoundViolation::AboveUpper => self.model.upper_bound(x_i).cloned(),
            };
            let (Some(target), Some(x_j)) = (target, self.select_slack(x_i, violation)) else {
                self.observer.on_update_conflict();
                return SearchOutcome::Unsat(self.generate_conflict(x_i, violation));
            };

            self.pivot_and_update(x_i, x_j, target);

            if let Some(conflict) = self.check_basic_for_conflict(x_j) {
                self.observer.on_update_conflict();
                return SearchOutcome::Unsat(conflict);
            }
        }
    }

    /// Pops queued variables until one is basic and inconsistent.
    fn select_smallest_inconsistent_var(&mut self) -> Option<ArithVar> {
        while let Some(var) = self.queues.pop() {
            if self.is_basic(var) && !self.model.assignment_is_consistent(var) {
                return Some(var);
            }
        }
        None
    }

    /// Checks every queued variable for a conflict without pivoting and keeps the
    /// smallest one found. Queued inconsistent variables stay queued.
    fn select_initial_conflict(&mut self) -> Option<Conflict<T>> {
        let mut candidates = Vec::with_capacity(self.queues.len());
        while let Some(var) = self.queues.pop() {
            if self.is_basic(var)
                && !self.model.assignment_is_consistent(var)
                && !candidates.contains(&var)
            {
                candidates.push(var);
            }
        }

        let mut best: Option<Conflict<T>> = None;
        let mut changes = 0_usize;
        for var in candidates {
            self.check_basic_variable(var);
            if let Some(conflict) = self.check_basic_for_conflict(var) {
                self.observer.on_early_conflict();
                if best.as_ref().is_none_or(|b| conflict.len() < b.len()) {
                    changes += 1;
                    best = Some(conflict);
                }
            }
        }
        if changes > 1 {
            self.observer.on_early_conflict_improvement();
        }
        if let Some(conflict) = &best {
            debug!(len = conflict.len(), "early conflict");
        }
        best
    }

    fn violation(&self, var: ArithVar) -> Option<BoundViolation> {
        let value = self.model.assignment(var);
        if self.model.below_lower_bound(var, value, true) {
            Some(BoundViolation::BelowLower)
        } else if self.model.above_upper_bound(var, value, true) {
            Some(BoundViolation::AboveUpper)
        } else {
            None
        }
    }

    /// A nonbasic partner that can move `x_i` towards the bound it violates.
    fn select_slack(&self, x_i: ArithVar, violation: BoundViolation) -> Option<ArithVar> {
        let model = &self.model;
        let eligible = self
            .tableau
            .lookup(x_i)
            .iter()
            .filter(|(nonbasic, a)| {
                let increase = match violation {
                    BoundViolation::BelowLower => a.is_positive(),
                    BoundViolation::AboveUpper => a.is_negative(),
                };
                if increase {
                    model.strictly_below_upper_bound(*nonbasic)
                } else {
                    model.strictly_above_lower_bound(*nonbasic)
                }
            })
            .map(|(nonbasic, _)| nonbasic);

        self.queues
            .stage()
            .choose_partner(eligible, |var| self.tableau.row_count(var))
    }

    /// The conflict proving that `basic` cannot be repaired, if it cannot.
    pub fn check_basic_for_conflict(&self, basic: ArithVar) -> Option<Conflict<T>> {
        debug_assert!(self.is_basic(basic), "variable {basic} is not basic");
        let violation = self.violation(basic)?;
        if self.select_slack(basic, violation).is_some() {
            return None;
        }
        Some(self.generate_conflict(basic, violation))
    }

    /// The violated bound of `basic` plus, for every row entry, the bound that keeps
    /// that entry from moving `basic` back.
    fn generate_conflict(&self, basic: ArithVar, violation: BoundViolation) -> Conflict<T> {
        let row = self.tableau.lookup(basic);
        let violated = match violation {
            BoundViolation::BelowLower => self.model.lower_constraint(basic),
            BoundViolation::AboveUpper => self.model.upper_constraint(basic),
        };
        let blocking = row.iter().map(|(nonbasic, a)| {
            let upper = match violation {
                BoundViolation::BelowLower => a.is_positive(),
                BoundViolation::AboveUpper => a.is_negative(),
            };
            let token = if upper {
                self.model.upper_constraint(nonbasic)
            } else {
                self.model.lower_constraint(nonbasic)
            };
            debug_assert!(token.is_some(), "x{nonbasic} has no blocking bound");
            token
        });

        debug!(basic, ?violation, "generating conflict");
        Conflict::new(std::iter::once(violated).chain(blocking).flatten().cloned())
    }

    /// Queues `basic` if its value lies outside its bounds.
    fn check_basic_variable(&mut self, basic: ArithVar) {
        debug_assert!(self.is_basic(basic), "variable {basic} is not basic");
        let value = self.model.assignment(basic);
        let amount = match self.violation(basic) {
            None => return,
            Some(BoundViolation::BelowLower) => self
                .model
                .lower_bound(basic)
                .map(|lower| lower - value),
            Some(BoundViolation::AboveUpper) => self
                .model
                .upper_bound(basic)
                .map(|upper| value - upper),
        };
        trace!(basic, "queued inconsistent variable");
        self.queues.push(basic, amount.unwrap_or_default());
    }

    /// Recomputes the value of `basic` from its row, using current or safe values.
    #[must_use]
    pub fn compute_row_value(&self, basic: ArithVar, use_safe: bool) -> DeltaRational {
        self.tableau
            .lookup(basic)
            .iter()
            .fold(DeltaRational::zero(), |sum, (nonbasic, coeff)| {
                sum + self.model.get_assignment(nonbasic, use_safe) * coeff
            })
    }

    /// Makes the current assignment the one restored by
    /// [`Self::revert_assignment_changes`].
    pub fn commit_assignment_changes(&mut self) {
        self.model.commit_assignment_changes();
    }

    /// Restores the last committed assignment.
    ///
    /// Nonbasic variables left outside bounds asserted since the commit are moved onto
    /// those bounds, and inconsistent basic variables are queued again.
    pub fn revert_assignment_changes(&mut self) {
        self.model.revert_assignment_changes();

        let nonbasics = (0..self.tableau.num_variables())
            .filter(|&var| self.is_registered(var) && !self.is_basic(var))
            .collect_vec();
        for var in nonbasics {
            let value = self.model.assignment(var);
            let clamp = if self.model.below_lower_bound(var, value, true) {
                self.model.lower_bound(var).cloned()
            } else if self.model.above_upper_bound(var, value, true) {
                self.model.upper_bound(var).cloned()
            } else {
                None
            };
            if let Some(bound) = clamp {
                self.update(var, bound);
            }
        }

        self.recheck_basics();
        debug!(queued = self.queues.len(), "reverted assignment");
    }

    /// Opens a bound scope.
    pub fn push(&mut self) {
        self.model.push_scope();
    }

    /// Closes the innermost bound scope, restoring the bounds in force when it was
    /// opened, and queues basic variables that are inconsistent afterwards.
    pub fn pop(&mut self) {
        let restored = self.model.pop_scope();
        debug!(restored = restored.len(), "popped bound scope");
        self.recheck_basics();
    }

    fn recheck_basics(&mut self) {
        for basic in self.tableau.basics().iter().collect_vec() {
            self.check_basic_variable(basic);
        }
    }

    /// Verifies the partition, the rows, the column index and every row's value.
    ///
    /// # Errors
    ///
    /// The first broken invariant found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut column_counts = vec![0_usize; self.tableau.num_variables()];

        for var in 0..self.tableau.num_variables() {
            let flagged = self.tableau.is_basic(var);
            let has_row = self.tableau.get_row(var).is_some();
            if flagged != has_row {
                return Err(InvariantViolation::Partition {
                    var,
                    flagged,
                    has_row,
                });
            }
        }

        for row in self.tableau.rows() {
            let basic = row.basic();
            for (var, coeff) in row.iter() {
                if self.tableau.is_basic(var) {
                    return Err(InvariantViolation::BasicInRow { basic, var });
                }
                if coeff.is_zero() {
                    return Err(InvariantViolation::ZeroCoefficient { basic, var });
                }
                column_counts[var] += 1;
            }

            let computed = self.compute_row_value(basic, false);
            let assigned = self.model.assignment(basic);
            if &computed != assigned {
                return Err(InvariantViolation::RowMismatch {
                    basic,
                    assigned: assigned.clone(),
                    computed,
                });
            }
        }

        for (var, &actual) in column_counts.iter().enumerate() {
            let indexed = self.tableau.row_count(var);
            if indexed != actual {
                return Err(InvariantViolation::ColumnIndex {
                    var,
                    indexed,
                    actual,
                });
            }
        }

        Ok(())
    }

    /// Returns `true` if every registered variable lies within its bounds.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        (0..self.model.len())
            .filter(|&var| self.is_registered(var))
            .all(|var| self.model.assignment_is_consistent(var))
    }

    fn raise(&mut self, conflict: Conflict<T>) {
        debug!(tokens = ?conflict.tokens(), "conflict");
        self.sink.report(conflict);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    type Procedure = SimplexDecisionProcedure<&'static str, Vec<Conflict<&'static str>>>;

    fn q(n: i64) -> BigRational {
        BigRational::from_integer(BigInt::from(n))
    }

    fn d(n: i64) -> DeltaRational {
        DeltaRational::from_integer(n)
    }

    fn procedure() -> Procedure {
        SimplexDecisionProcedure::new(Vec::new())
    }

    fn sorted(conflict: &Conflict<&'static str>) -> Vec<&'static str> {
        conflict.iter().copied().sorted().collect()
    }

    #[test]
    fn test_direct_conflict_on_assert() {
        let mut simplex = procedure();
        simplex.add_variable(0);

        assert!(!simplex.assert_lower(0, d(2), "x>=2"));
        assert_eq!(simplex.assignment(0), &d(2));
        assert!(simplex.assert_upper(0, d(1), "x<=1"));

        assert_eq!(simplex.sink().len(), 1);
        assert_eq!(sorted(&simplex.sink()[0]), vec!["x<=1", "x>=2"]);
        assert_eq!(simplex.observer().assert_upper_conflicts, 1);
        assert!(!simplex.model().has_upper_bound(0));
    }

    #[test]
    fn test_derived_conflict_through_row() {
        let mut simplex = procedure();
        // z = x + y
        simplex.add_row(2, vec![(0, q(1)), (1, q(1))]);

        assert!(!simplex.assert_lower(0, d(0), "x>=0"));
        assert!(!simplex.assert_lower(1, d(0), "y>=0"));
        assert!(!simplex.assert_upper(2, d(-1), "z<=-1"));

        let conflict = simplex.update_inconsistent_vars();
        let conflict = conflict.as_ref().map(sorted);
        assert_eq!(conflict, Some(vec!["x>=0", "y>=0", "z<=-1"]));
        assert_eq!(simplex.sink().len(), 1);
        assert_eq!(simplex.observer().update_conflicts, 1);
    }

    #[test]
    fn test_pivoting_reaches_feasible_assignment() {
        let mut simplex = procedure();
        // s = x + y, t = x - y
        simplex.add_row(2, vec![(0, q(1)), (1, q(1))]);
        simplex.add_row(3, vec![(0, q(1)), (1, q(-1))]);

        assert!(!simplex.assert_lower(2, d(4), "s>=4"));
        assert!(!simplex.assert_upper(3, d(0), "t<=0"));
        assert!(!simplex.assert_lower(3, d(-2), "t>=-2"));

        assert_eq!(simplex.update_inconsistent_vars(), None);
        assert!(simplex.is_consistent());
        assert_eq!(simplex.check_invariants(), Ok(()));
        assert!(simplex.observer().pivots >= 1);
        assert!(simplex.sink().is_empty());
    }

    #[test]
    fn test_redundant_assertions_are_no_ops() {
        let mut simplex = procedure();
        simplex.add_variable(0);
        assert!(!simplex.assert_lower(0, d(3), "x>=3"));
        assert!(!simplex.assert_lower(0, d(1), "x>=1"));
        assert!(!simplex.assert_lower(0, d(3), "x>=3 again"));

        assert_eq!(simplex.model().lower_constraint(0), Some(&"x>=3"));
        assert_eq!(simplex.observer().updates, 1);

        assert!(!simplex.assert_upper(0, d(9), "x<=9"));
        assert!(!simplex.assert_upper(0, d(10), "x<=10"));
        assert_eq!(simplex.model().upper_constraint(0), Some(&"x<=9"));
    }

    #[test]
    fn test_strict_bounds_use_delta() {
        let mut simplex = procedure();
        simplex.add_variable(0);
        assert!(!simplex.assert_lower(0, DeltaRational::strictly_above(q(1)), "x>1"));
        assert!(simplex.assert_upper(0, d(1), "x<=1"));

        let mut simplex = procedure();
        simplex.add_variable(0);
        assert!(!simplex.assert_lower(0, d(1), "x>=1"));
        assert!(!simplex.assert_upper(0, d(1), "x<=1"));
        assert!(simplex.sink().is_empty());
    }

    #[test]
    fn test_assert_equality() {
        let mut simplex = procedure();
        simplex.add_row(1, vec![(0, q(2))]);

        assert!(!simplex.assert_equality(0, d(3), "x=3"));
        assert_eq!(simplex.assignment(0), &d(3));
        assert_eq!(simplex.assignment(1), &d(6));
        assert_eq!(simplex.model().lower_constraint(0), Some(&"x=3"));
        assert_eq!(simplex.model().upper_constraint(0), Some(&"x=3"));

        assert!(!simplex.assert_equality(0, d(3), "x=3 again"));
        assert!(simplex.assert_equality(0, d(4), "x=4"));
        assert_eq!(sorted(&simplex.sink()[0]), vec!["x=3", "x=4"]);
        assert_eq!(simplex.observer().assert_equality_conflicts, 1);
    }

    #[test]
    fn test_anti_cycle_stage_terminates() {
        let config = SimplexConfig {
            heuristic_iteration_limit: Some(0),
            early_conflict_scan: false,
            ..SimplexConfig::default()
        };
        let mut simplex: Procedure = SimplexDecisionProcedure::with_config(config, Vec::new());
        // a cycle of differences: s3 = x0 - x1, s4 = x1 - x2, s5 = x2 - x0
        simplex.add_row(3, vec![(0, q(1)), (1, q(-1))]);
        simplex.add_row(4, vec![(1, q(1)), (2, q(-1))]);
        simplex.add_row(5, vec![(2, q(1)), (0, q(-1))]);

        assert!(!simplex.assert_lower(3, d(0), "s3>=0"));
        assert!(!simplex.assert_lower(4, d(0), "s4>=0"));
        assert!(!simplex.assert_lower(5, d(0), "s5>=0"));
        assert!(!simplex.assert_lower(0, d(1), "x0>=1"));
        assert!(!simplex.assert_upper(1, d(5), "x1<=5"));

        assert_eq!(simplex.update_inconsistent_vars(), None);
        assert!(simplex.is_consistent());
        assert_eq!(simplex.check_invariants(), Ok(()));
        assert_eq!(simplex.observer().anti_cycle_switches, 1);
    }

    #[test]
    fn test_early_scan_keeps_smallest_conflict() {
        let mut simplex = procedure();
        // u = x + y + z, v = x
        simplex.add_row(3, vec![(0, q(1)), (1, q(1)), (2, q(1))]);
        simplex.add_row(4, vec![(0, q(1))]);

        assert!(!simplex.assert_lower(0, d(0), "x>=0"));
        assert!(!simplex.assert_lower(1, d(0), "y>=0"));
        assert!(!simplex.assert_lower(2, d(0), "z>=0"));
        assert!(!simplex.assert_upper(3, d(-5), "u<=-5"));
        assert!(!simplex.assert_upper(4, d(-1), "v<=-1"));

        let conflict = simplex.update_inconsistent_vars();
        assert_eq!(conflict.as_ref().map(sorted), Some(vec!["v<=-1", "x>=0"]));
        assert_eq!(simplex.observer().early_conflicts, 2);
        assert_eq!(simplex.observer().pivots, 0);
    }

    #[test]
    fn test_pop_restores_bounds_and_search_recovers() {
        let mut simplex = procedure();
        simplex.add_row(1, vec![(0, q(1))]);
        assert!(!simplex.assert_lower(0, d(0), "x>=0"));
        simplex.commit_assignment_changes();

        simplex.push();
        assert!(!simplex.assert_upper(1, d(-1), "s<=-1"));
        assert!(simplex.update_inconsistent_vars().is_some());
        simplex.revert_assignment_changes();
        simplex.pop();

        assert!(!simplex.model().has_upper_bound(1));
        assert_eq!(simplex.update_inconsistent_vars(), None);
        assert!(simplex.is_consistent());
        assert_eq!(simplex.check_invariants(), Ok(()));
    }

    #[test]
    fn test_revert_restores_committed_values() {
        let mut simplex = procedure();
        simplex.add_row(2, vec![(0, q(1)), (1, q(1))]);
        simplex.commit_assignment_changes();

        simplex.push();
        assert!(!simplex.assert_lower(2, d(10), "s>=10"));
        assert_eq!(simplex.update_inconsistent_vars(), None);
        // x = s - y after the pivot
        assert!(simplex.is_basic(0));
        assert_eq!(simplex.compute_row_value(0, true), d(0));
        assert_eq!(simplex.compute_row_value(0, false), d(10));

        simplex.pop();
        simplex.revert_assignment_changes();
        assert_eq!(simplex.assignment(2), &d(0));
        assert_eq!(simplex.check_invariants(), Ok(()));
    }

    #[test]
    fn test_budget_interrupts_and_resumes() {
        let mut simplex = procedure();
        simplex.add_row(2, vec![(0, q(1)), (1, q(1))]);
        assert!(!simplex.assert_lower(2, d(3), "s>=3"));

        let outcome = simplex.update_inconsistent_vars_with_budget(&mut PivotLimit::new(0));
        assert_eq!(outcome, SearchOutcome::Interrupted);
        assert_eq!(simplex.check_invariants(), Ok(()));

        let outcome = simplex.update_inconsistent_vars_with_budget(&mut PivotLimit::new(10));
        assert_eq!(outcome, SearchOutcome::Sat);
        assert!(simplex.is_consistent());
    }

    #[test]
    fn test_repeated_search_after_conflict_reports_it_again() {
        let mut simplex = procedure();
        // z = x + y
        simplex.add_row(2, vec![(0, q(1)), (1, q(1))]);
        assert!(!simplex.assert_lower(0, d(0), "x>=0"));
        assert!(!simplex.assert_lower(1, d(0), "y>=0"));
        assert!(!simplex.assert_upper(2, d(-1), "z<=-1"));

        let first = simplex.update_inconsistent_vars();
        assert_eq!(first.as_ref().map(sorted), Some(vec!["x>=0", "y>=0", "z<=-1"]));
        assert!(!simplex.is_consistent());

        let second = simplex.update_inconsistent_vars();
        assert_eq!(second, first);
        assert_eq!(simplex.sink().len(), 2);
        assert_eq!(simplex.check_invariants(), Ok(()));
    }

    #[test]
    fn test_observer_can_be_swapped() {
        use crate::lra::statistics::NoStats;

        let mut simplex: SimplexDecisionProcedure<u32, Vec<Conflict<u32>>, NoStats> =
            SimplexDecisionProcedure::with_observer(SimplexConfig::default(), Vec::new(), NoStats);
        simplex.add_row(1, vec![(0, q(1))]);
        assert!(!simplex.assert_lower(1, d(1), 7));
        assert_eq!(simplex.update_inconsistent_vars(), None);
        assert_eq!(simplex.assignment(0), &d(1));
    }
}

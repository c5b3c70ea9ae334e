#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Per-variable assignment and bound bookkeeping.
//!
//! The store keeps, for every registered variable, its current value, the lower and
//! upper bound currently in force, and the justification token that installed each
//! bound. All lookups are O(1) array accesses keyed by [`ArithVar`].
//!
//! Two pieces of history are kept on top of the current state:
//!
//! - **Safe assignments.** The first time a variable's value changes after a commit,
//!   its previous value is remembered. `revert_assignment_changes` restores those
//!   values, `commit_assignment_changes` forgets them.
//! - **Bound scopes.** Inside a scope every bound overwrite is recorded on a trail,
//!   in the style of a solver trail, so `pop_scope` can restore the bounds (and
//!   their tokens) that were in force when the scope was opened.

use crate::lra::ArithVar;
use crate::lra::delta_rational::DeltaRational;
use std::fmt::Debug;
use tracing::trace;

/// A bound value together with the token that justified it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bound<T> {
    /// The bound, with strictness folded into the infinitesimal part.
    pub value: DeltaRational,
    /// The justification supplied with the assertion that installed the bound.
    pub token: T,
}

impl<T> Bound<T> {
    /// Pairs a value with its justification.
    pub const fn new(value: DeltaRational, token: T) -> Self {
        Self { value, token }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum BoundKind {
    Lower,
    Upper,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BoundChange<T> {
    var: ArithVar,
    kind: BoundKind,
    previous: Option<Bound<T>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct VarState<T> {
    assignment: DeltaRational,
    safe: Option<DeltaRational>,
    lower: Option<Bound<T>>,
    upper: Option<Bound<T>>,
}

impl<T> Default for VarState<T> {
    fn default() -> Self {
        Self {
            assignment: DeltaRational::zero(),
            safe: None,
            lower: None,
            upper: None,
        }
    }
}

/// Assignments and bounds of every registered variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArithPartialModel<T> {
    vars: Vec<VarState<T>>,
    changed: Vec<ArithVar>,
    trail: Vec<BoundChange<T>>,
    scopes: Vec<usize>,
}

impl<T> Default for ArithPartialModel<T> {
    fn default() -> Self {
        Self {
            vars: Vec::new(),
            changed: Vec::new(),
            trail: Vec::new(),
            scopes: Vec::new(),
        }
    }
}

impl<T: Clone + Debug> ArithPartialModel<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `var` with the given initial value and no bounds.
    pub fn initialize(&mut self, var: ArithVar, value: DeltaRational) {
        if var >= self.vars.len() {
            self.vars.resize_with(var + 1, VarState::default);
        }
        self.vars[var] = VarState {
            assignment: value,
            ..VarState::default()
        };
    }

    /// Number of variable slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` if no variable has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// The current value of `var`.
    #[must_use]
    pub fn assignment(&self, var: ArithVar) -> &DeltaRational {
        &self.vars[var].assignment
    }

    /// The last committed value of `var`: its current value if it has not changed
    /// since the last commit.
    #[must_use]
    pub fn safe_assignment(&self, var: ArithVar) -> &DeltaRational {
        let state = &self.vars[var];
        state.safe.as_ref().unwrap_or(&state.assignment)
    }

    /// Either the current or the safe value of `var`.
    #[must_use]
    pub fn get_assignment(&self, var: ArithVar, use_safe: bool) -> &DeltaRational {
        if use_safe {
            self.safe_assignment(var)
        } else {
            self.assignment(var)
        }
    }

    /// Overwrites the value of `var`.
    pub fn set_assignment(&mut self, var: ArithVar, value: DeltaRational) {
        let state = &mut self.vars[var];
        if state.safe.is_none() {
            let previous = std::mem::replace(&mut state.assignment, value);
            state.safe = Some(previous);
            self.changed.push(var);
        } else {
            state.assignment = value;
        }
    }

    /// Overwrites both the current and the safe value of `var`.
    ///
    /// Used when a variable's value is derived afresh, e.g. when it becomes the owner
    /// of a new row and both values follow from the row.
    pub fn set_assignment_and_safe(
        &mut self,
        var: ArithVar,
        value: DeltaRational,
        safe: DeltaRational,
    ) {
        let state = &mut self.vars[var];
        state.assignment = value;
        if state.assignment == safe {
            state.safe = None;
        } else {
            if state.safe.is_none() {
                self.changed.push(var);
            }
            state.safe = Some(safe);
        }
    }

    /// Accepts every value change since the last commit as the new safe assignment.
    pub fn commit_assignment_changes(&mut self) {
        for var in self.changed.drain(..) {
            self.vars[var].safe = None;
        }
    }

    /// Restores every value changed since the last commit.
    pub fn revert_assignment_changes(&mut self) {
        for var in self.changed.drain(..) {
            let state = &mut self.vars[var];
            if let Some(safe) = state.safe.take() {
                state.assignment = safe;
            }
        }
    }

    /// Returns `true` if `var` has a lower bound.
    #[must_use]
    pub fn has_lower_bound(&self, var: ArithVar) -> bool {
        self.vars[var].lower.is_some()
    }

    /// Returns `true` if `var` has an upper bound.
    #[must_use]
    pub fn has_upper_bound(&self, var: ArithVar) -> bool {
        self.vars[var].upper.is_some()
    }

    /// Returns `true` if `var` has either bound.
    #[must_use]
    pub fn has_either_bound(&self, var: ArithVar) -> bool {
        self.has_lower_bound(var) || self.has_upper_bound(var)
    }

    /// The lower bound value of `var`.
    #[must_use]
    pub fn lower_bound(&self, var: ArithVar) -> Option<&DeltaRational> {
        self.vars[var].lower.as_ref().map(|b| &b.value)
    }

    /// The upper bound value of `var`.
    #[must_use]
    pub fn upper_bound(&self, var: ArithVar) -> Option<&DeltaRational> {
        self.vars[var].upper.as_ref().map(|b| &b.value)
    }

    /// The token that justified the lower bound of `var`.
    #[must_use]
    pub fn lower_constraint(&self, var: ArithVar) -> Option<&T> {
        self.vars[var].lower.as_ref().map(|b| &b.token)
    }

    /// The token that justified the upper bound of `var`.
    #[must_use]
    pub fn upper_constraint(&self, var: ArithVar) -> Option<&T> {
        self.vars[var].upper.as_ref().map(|b| &b.token)
    }

    /// Installs a lower bound, replacing the previous one.
    pub fn set_lower_bound(&mut self, var: ArithVar, value: DeltaRational, token: T) {
        let previous = self.vars[var].lower.replace(Bound::new(value, token));
        self.record(var, BoundKind::Lower, previous);
    }

    /// Installs an upper bound, replacing the previous one.
    pub fn set_upper_bound(&mut self, var: ArithVar, value: DeltaRational, token: T) {
        let previous = self.vars[var].upper.replace(Bound::new(value, token));
        self.record(var, BoundKind::Upper, previous);
    }

    fn record(&mut self, var: ArithVar, kind: BoundKind, previous: Option<Bound<T>>) {
        if !self.scopes.is_empty() {
            self.trail.push(BoundChange {
                var,
                kind,
                previous,
            });
        }
    }

    /// Is `value` below the lower bound of `var`?
    ///
    /// Strict: `value < lower`. Non-strict: `value <= lower`. Always `false` without a
    /// lower bound.
    #[must_use]
    pub fn below_lower_bound(&self, var: ArithVar, value: &DeltaRational, strict: bool) -> bool {
        self.lower_bound(var)
            .is_some_and(|lower| if strict { value < lower } else { value <= lower })
    }

    /// Is `value` above the upper bound of `var`?
    ///
    /// Strict: `value > upper`. Non-strict: `value >= upper`. Always `false` without an
    /// upper bound.
    #[must_use]
    pub fn above_upper_bound(&self, var: ArithVar, value: &DeltaRational, strict: bool) -> bool {
        self.upper_bound(var)
            .is_some_and(|upper| if strict { value > upper } else { value >= upper })
    }

    /// Can `var` still increase without leaving its bounds?
    #[must_use]
    pub fn strictly_below_upper_bound(&self, var: ArithVar) -> bool {
        self.upper_bound(var)
            .is_none_or(|upper| self.assignment(var) < upper)
    }

    /// Can `var` still decrease without leaving its bounds?
    #[must_use]
    pub fn strictly_above_lower_bound(&self, var: ArithVar) -> bool {
        self.lower_bound(var)
            .is_none_or(|lower| self.assignment(var) > lower)
    }

    /// Does the current value of `var` lie within its bounds?
    #[must_use]
    pub fn assignment_is_consistent(&self, var: ArithVar) -> bool {
        let value = self.assignment(var);
        !self.below_lower_bound(var, value, true) && !self.above_upper_bound(var, value, true)
    }

    /// Opens a bound scope.
    pub fn push_scope(&mut self) {
        self.scopes.push(self.trail.len());
    }

    /// Closes the innermost bound scope, restoring every bound overwritten inside it.
    ///
    /// Returns the variables whose bounds were restored. Does nothing without an open
    /// scope.
    pub fn pop_scope(&mut self) -> Vec<ArithVar> {
        let Some(mark) = self.scopes.pop() else {
            return Vec::new();
        };

        let mut restored = Vec::with_capacity(self.trail.len() - mark);
        while self.trail.len() > mark {
            let Some(change) = self.trail.pop() else {
                break;
            };
            let state = &mut self.vars[change.var];
            match change.kind {
                BoundKind::Lower => state.lower = change.previous,
                BoundKind::Upper => state.upper = change.previous,
            }
            restored.push(change.var);
        }
        restored
    }

    /// Number of open bound scopes.
    #[must_use]
    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Traces the value and bounds of `var`.
    pub fn print_model(&self, var: ArithVar) {
        let state = &self.vars[var];
        trace!(
            var,
            assignment = %state.assignment,
            lower = ?state.lower.as_ref().map(|b| b.value.to_string()),
            upper = ?state.upper.as_ref().map(|b| b.value.to_string()),
            "model"
        );
    }
}

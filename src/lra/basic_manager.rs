#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Tracks which variables are currently basic.
//!
//! Membership is a bit per registered variable; every registered variable that
//! is not a member is nonbasic, so the two partitions are disjoint and cover
//! the registered variables by construction.

use crate::lra::ArithVar;
use bit_vec::BitVec;

/// Bit-set of the basic variables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BasicManager {
    members: BitVec,
    len: usize,
}

impl BasicManager {
    /// Creates an empty partition over no variables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grows the universe so that `var` can be a member. New variables start nonbasic.
    pub fn increase_size(&mut self, var: ArithVar) {
        if var >= self.members.len() {
            self.members.grow(var + 1 - self.members.len(), false);
        }
    }

    /// Number of variables the partition covers.
    #[must_use]
    pub fn universe(&self) -> usize {
        self.members.len()
    }

    /// Number of basic variables.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no variable is basic.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if `var` is currently basic.
    #[must_use]
    pub fn is_member(&self, var: ArithVar) -> bool {
        self.members.get(var).unwrap_or(false)
    }

    /// Marks `var` basic.
    pub fn add(&mut self, var: ArithVar) {
        debug_assert!(!self.is_member(var), "variable {var} is already basic");
        self.increase_size(var);
        self.members.set(var, true);
        self.len += 1;
    }

    /// Marks `var` nonbasic.
    pub fn remove(&mut self, var: ArithVar) {
        debug_assert!(self.is_member(var), "variable {var} is not basic");
        self.members.set(var, false);
        self.len -= 1;
    }

    /// Basic variables in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ArithVar> + '_ {
        self.members
            .iter()
            .enumerate()
            .filter_map(|(var, basic)| basic.then_some(var))
    }
}

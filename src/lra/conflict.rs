#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Conflicts and where they go.
//!
//! A [`Conflict`] is a conjunction of justification tokens that cannot hold at the
//! same time. Once built it is handed to a [`ConflictSink`] and never changed.

use core::fmt::{Display, Formatter};
use core::ops::Index;
use smallvec::SmallVec;
use std::fmt::Debug;

/// A contradictory conjunction of justification tokens, without duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Conflict<T> {
    tokens: SmallVec<[T; 8]>,
}

impl<T: PartialEq> Conflict<T> {
    /// Builds a conflict from tokens, keeping the first occurrence of each.
    pub fn new<I: IntoIterator<Item = T>>(tokens: I) -> Self {
        let mut unique: SmallVec<[T; 8]> = SmallVec::new();
        for token in tokens {
            if !unique.contains(&token) {
                unique.push(token);
            }
        }
        Self { tokens: unique }
    }
}

impl<T> Conflict<T> {
    /// Number of distinct tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` for the empty conjunction. Never produced by the procedure.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The tokens in the order they were collected.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.tokens.iter()
    }

    /// The tokens as a slice.
    #[must_use]
    pub fn tokens(&self) -> &[T] {
        &self.tokens
    }

    /// Consumes the conflict, returning its tokens.
    #[must_use]
    pub fn into_tokens(self) -> Vec<T> {
        self.tokens.into_vec()
    }
}

impl<T> Index<usize> for Conflict<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.tokens[index]
    }
}

impl<'a, T> IntoIterator for &'a Conflict<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

impl<T: Display> Display for Conflict<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "(and")?;
        for token in &self.tokens {
            write!(f, " {token}")?;
        }
        write!(f, ")")
    }
}

/// Receives conflicts as the procedure finds them.
///
/// Called at most once per assertion or fixpoint search.
pub trait ConflictSink<T> {
    /// Takes ownership of a finished conflict.
    fn report(&mut self, conflict: Conflict<T>);
}

impl<T> ConflictSink<T> for Vec<Conflict<T>> {
    fn report(&mut self, conflict: Conflict<T>) {
        self.push(conflict);
    }
}

impl<T, S: ConflictSink<T> + ?Sized> ConflictSink<T> for &mut S {
    fn report(&mut self, conflict: Conflict<T>) {
        (**self).report(conflict);
    }
}

/// Adapts a closure into a [`ConflictSink`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FnSink<F>(pub F);

impl<T, F: FnMut(Conflict<T>)> ConflictSink<T> for FnSink<F> {
    fn report(&mut self, conflict: Conflict<T>) {
        (self.0)(conflict);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_deduplicated() {
        let conflict = Conflict::new([3, 1, 3, 2, 1]);
        assert_eq!(conflict.tokens(), &[3, 1, 2]);
        assert_eq!(conflict.len(), 3);
        assert_eq!(conflict[0], 3);
    }

    #[test]
    fn test_display() {
        let conflict = Conflict::new(["x>=2", "x<=1"]);
        assert_eq!(conflict.to_string(), "(and x>=2 x<=1)");
    }

    #[test]
    fn test_sinks() {
        let mut collected: Vec<Conflict<u32>> = Vec::new();
        collected.report(Conflict::new([1, 2]));
        assert_eq!(collected.len(), 1);

        let mut seen = 0;
        let mut sink = FnSink(|c: Conflict<u32>| seen += c.len());
        sink.report(Conflict::new([4, 5, 6]));
        drop(sink);
        assert_eq!(seen, 3);
    }
}

#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Sparse tableau in equality form.
//!
//! Every basic variable owns exactly one row expressing it as a linear
//! combination of nonbasic variables:
//!
//! ```text
//! x_b = Σ a_bj * x_j      (x_j nonbasic, a_bj != 0)
//! ```
//!
//! Rows are addressed by the basic variable's index, never by reference, so a
//! pivot can restructure many rows at once. Row entries are kept sorted by
//! variable, which gives every row a structural iteration order that does not
//! depend on the current assignment.
//!
//! Alongside the rows the tableau keeps a column index: for every variable, the
//! set of basic variables whose row mentions it. This answers `row_count` in O(1)
//! and lets updates and pivots touch only the rows that actually change.

use crate::lra::ArithVar;
use crate::lra::basic_manager::BasicManager;
use core::cmp::Ordering;
use itertools::Itertools;
use num_rational::BigRational;
use num_traits::Zero;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Variables collected from a column, small enough to live on the stack in the common case.
pub type ColumnVars = SmallVec<[ArithVar; 16]>;

/// The row owned by one basic variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    basic: ArithVar,
    entries: Vec<(ArithVar, BigRational)>,
}

impl Row {
    /// The basic variable defined by this row.
    #[must_use]
    pub const fn basic(&self) -> ArithVar {
        self.basic
    }

    /// Number of nonzero entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the basic variable is identically zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nonzero entries in ascending variable order.
    pub fn iter(&self) -> impl Iterator<Item = (ArithVar, &BigRational)> + '_ {
        self.entries.iter().map(|(var, coeff)| (*var, coeff))
    }

    /// Returns `true` if `var` has a nonzero coefficient in this row.
    #[must_use]
    pub fn has(&self, var: ArithVar) -> bool {
        self.position(var).is_ok()
    }

    /// The coefficient of `var`, if nonzero.
    #[must_use]
    pub fn lookup(&self, var: ArithVar) -> Option<&BigRational> {
        self.position(var).ok().map(|i| &self.entries[i].1)
    }

    fn position(&self, var: ArithVar) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&var, |(v, _)| *v)
    }

    fn remove(&mut self, var: ArithVar) -> Option<BigRational> {
        self.position(var).ok().map(|i| self.entries.remove(i).1)
    }

    /// `self += mult * source`, keeping `columns` in sync with the entries that
    /// appear or cancel out.
    fn add_multiple(
        &mut self,
        mult: &BigRational,
        source: &[(ArithVar, BigRational)],
        columns: &mut [FxHashSet<ArithVar>],
    ) {
        let basic = self.basic;
        let old = std::mem::take(&mut self.entries);
        let mut merged = Vec::with_capacity(old.len() + source.len());
        let mut ours = old.into_iter().peekable();
        let mut theirs = source.iter().peekable();

        loop {
            let order = match (ours.peek().map(|e| e.0), theirs.peek().map(|e| e.0)) {
                (None, None) => break,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(&b),
            };

            match order {
                Ordering::Less => merged.extend(ours.next()),
                Ordering::Greater => {
                    if let Some((var, coeff)) = theirs.next() {
                        columns[*var].insert(basic);
                        merged.push((*var, coeff * mult));
                    }
                }
                Ordering::Equal => {
                    if let (Some((var, a)), Some((_, b))) = (ours.next(), theirs.next()) {
                        let sum = a + b * mult;
                        if sum.is_zero() {
                            columns[var].remove(&basic);
                        } else {
                            merged.push((var, sum));
                        }
                    }
                }
            }
        }

        self.entries = merged;
    }
}

/// The tableau: one row per basic variable plus the column index.
#[derive(Debug, Clone, Default)]
pub struct Tableau {
    rows: Vec<Option<Row>>,
    columns: Vec<FxHashSet<ArithVar>>,
    basics: BasicManager,
}

impl Tableau {
    /// Creates an empty tableau.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes room for `var`. Variables are nonbasic until given a row.
    pub fn increase_size(&mut self, var: ArithVar) {
        if var >= self.rows.len() {
            self.rows.resize_with(var + 1, || None);
            self.columns.resize_with(var + 1, FxHashSet::default);
        }
        self.basics.increase_size(var);
    }

    /// Number of variables the tableau has room for.
    #[must_use]
    pub fn num_variables(&self) -> usize {
        self.rows.len()
    }

    /// Number of rows, i.e. basic variables.
    #[must_use]
    pub const fn num_rows(&self) -> usize {
        self.basics.len()
    }

    /// The basic/nonbasic partition.
    #[must_use]
    pub const fn basics(&self) -> &BasicManager {
        &self.basics
    }

    /// Returns `true` if `var` currently owns a row.
    #[must_use]
    pub fn is_basic(&self, var: ArithVar) -> bool {
        self.basics.is_member(var)
    }

    /// The row owned by `basic`.
    ///
    /// # Panics
    ///
    /// If `basic` is not basic. Callers check membership first.
    #[must_use]
    pub fn lookup(&self, basic: ArithVar) -> &Row {
        self.get_row(basic)
            .unwrap_or_else(|| panic!("variable {basic} does not own a tableau row"))
    }

    /// The row owned by `basic`, or `None` if it is nonbasic.
    #[must_use]
    pub fn get_row(&self, basic: ArithVar) -> Option<&Row> {
        self.rows.get(basic).and_then(Option::as_ref)
    }

    /// All rows, in ascending order of their basic variable.
    pub fn rows(&self) -> impl Iterator<Item = &Row> + '_ {
        self.rows.iter().flatten()
    }

    /// Number of rows whose definition mentions `var`.
    #[must_use]
    pub fn row_count(&self, var: ArithVar) -> usize {
        self.columns.get(var).map_or(0, FxHashSet::len)
    }

    /// Returns `true` if some row mentions `var`.
    #[must_use]
    pub fn has(&self, var: ArithVar) -> bool {
        self.row_count(var) > 0
    }

    /// The basic variables whose rows mention `var`, in ascending order.
    #[must_use]
    pub fn column(&self, var: ArithVar) -> ColumnVars {
        let mut vars: ColumnVars = self
            .columns
            .get(var)
            .map(|c| c.iter().copied().collect())
            .unwrap_or_default();
        vars.sort_unstable();
        vars
    }

    /// Adds a row making `basic` basic, with the definition
    /// `basic = Σ coeff * var`.
    ///
    /// Basic variables inside the definition are replaced by their own rows, so the
    /// stored row mentions only nonbasic variables. Repeated variables are summed and
    /// zero coefficients dropped.
    pub fn add_row<I>(&mut self, basic: ArithVar, definition: I)
    where
        I: IntoIterator<Item = (ArithVar, BigRational)>,
    {
        self.increase_size(basic);
        debug_assert!(!self.is_basic(basic), "variable {basic} already owns a row");
        debug_assert!(!self.has(basic), "variable {basic} is used by an existing row");

        let mut accumulated: FxHashMap<ArithVar, BigRational> = FxHashMap::default();
        for (var, coeff) in definition {
            debug_assert_ne!(var, basic, "a row cannot mention its own basic variable");
            self.increase_size(var);
            match self.get_row(var) {
                Some(row) => {
                    for (nonbasic, a) in row.iter() {
                        *accumulated.entry(nonbasic).or_insert_with(BigRational::zero) +=
                            a * &coeff;
                    }
                }
                None => {
                    *accumulated.entry(var).or_insert_with(BigRational::zero) += coeff;
                }
            }
        }

        let entries = accumulated
            .into_iter()
            .filter(|(_, coeff)| !coeff.is_zero())
            .sorted_unstable_by_key(|(var, _)| *var)
            .collect_vec();

        for (var, _) in &entries {
            self.columns[*var].insert(basic);
        }

        self.rows[basic] = Some(Row { basic, entries });
        self.basics.add(basic);
    }

    /// Exchanges `leaving` (basic) with `entering` (nonbasic, mentioned in the row of
    /// `leaving`).
    ///
    /// The row of `leaving` is solved for `entering`, and that solved form is
    /// substituted into every other row that mentions `entering`. Afterwards
    /// `entering` owns the solved row and `leaving` is nonbasic.
    pub fn pivot(&mut self, leaving: ArithVar, entering: ArithVar) {
        debug_assert!(self.is_basic(leaving), "leaving variable {leaving} is not basic");
        debug_assert!(!self.is_basic(entering), "entering variable {entering} is basic");

        let Some(mut row) = self.rows[leaving].take() else {
            unreachable!("leaving variable {leaving} does not own a row");
        };
        let Some(a_le) = row.remove(entering) else {
            unreachable!("pivot on a zero coefficient: {entering} not in row of {leaving}");
        };
        debug_assert!(!a_le.is_zero());

        for (var, _) in &row.entries {
            self.columns[*var].remove(&leaving);
        }
        self.columns[entering].remove(&leaving);

        // entering = (1/a) leaving - Σ (a_k/a) x_k
        let inverse = a_le.recip();
        let mut entries = row
            .entries
            .into_iter()
            .map(|(var, coeff)| (var, -(coeff * &inverse)))
            .collect_vec();
        let at = entries.partition_point(|(var, _)| *var < leaving);
        entries.insert(at, (leaving, inverse));

        for (var, _) in &entries {
            self.columns[*var].insert(entering);
        }

        let solved = Row {
            basic: entering,
            entries,
        };

        let Self { rows, columns, .. } = self;
        let dependents = columns[entering].iter().copied().collect::<ColumnVars>();
        for basic in dependents {
            if let Some(target) = rows[basic].as_mut() {
                if let Some(coeff) = target.remove(entering) {
                    target.add_multiple(&coeff, &solved.entries, columns);
                }
            }
        }
        columns[entering].clear();

        self.rows[entering] = Some(solved);
        self.basics.remove(leaving);
        self.basics.add(entering);
    }
}

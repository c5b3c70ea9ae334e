#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! A line-oriented text format for feeding the decision procedure.
//!
//! ```text
//! c a comment
//! v x y s            declare variables
//! r s x 1 y -2/3     define s = x - 2/3 y
//! b x >= 2           assert a bound (>=, >, <=, <, =)
//! push               open a bound scope
//! check              run the search and report
//! pop                close the innermost scope
//! ```
//!
//! Coefficients and constants are integers, fractions (`-2/3`) or decimals (`0.25`).
//! Every `b` line is a bound literal whose justification token is its 0-based
//! ordinal among the `b` lines. Bounds accumulate until popped; each `check` reports
//! on all bounds in force at that point.

use crate::lra::ArithVar;
use crate::lra::conflict::Conflict;
use crate::lra::config::SimplexConfig;
use crate::lra::delta_rational::DeltaRational;
use crate::lra::error::{LraError, Result};
use crate::lra::simplex::SimplexDecisionProcedure;
use crate::lra::statistics::SimplexStats;
use core::fmt::{Display, Formatter};
use core::str::FromStr;
use itertools::Itertools;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use rustc_hash::{FxHashMap, FxHashSet};
use std::io::{self, BufRead};
use std::path::Path;
use tracing::debug;

/// The comparison of a bound literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// `>=`
    Ge,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `<`
    Lt,
    /// `=`
    Eq,
}

impl Relation {
    /// Does `lhs relation rhs` hold?
    #[must_use]
    pub fn holds(self, lhs: &BigRational, rhs: &BigRational) -> bool {
        match self {
            Self::Ge => lhs >= rhs,
            Self::Gt => lhs > rhs,
            Self::Le => lhs <= rhs,
            Self::Lt => lhs < rhs,
            Self::Eq => lhs == rhs,
        }
    }
}

impl FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            ">=" => Ok(Self::Ge),
            ">" => Ok(Self::Gt),
            "<=" => Ok(Self::Le),
            "<" => Ok(Self::Lt),
            "=" | "==" => Ok(Self::Eq),
            _ => Err(format!("unknown relation `{s}`")),
        }
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::Ge => ">=",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Lt => "<",
            Self::Eq => "=",
        };
        write!(f, "{s}")
    }
}

/// A bound literal `var relation constant`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoundLiteral {
    /// The constrained variable.
    pub var: ArithVar,
    /// The comparison.
    pub relation: Relation,
    /// The right-hand side.
    pub constant: BigRational,
}

/// One step of a problem script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `basic = Σ coeff * var`.
    Row {
        /// The defined variable.
        basic: ArithVar,
        /// The definition.
        definition: Vec<(ArithVar, BigRational)>,
    },
    /// Assert the bound literal with this ordinal.
    Bound(usize),
    /// Open a bound scope.
    Push,
    /// Close the innermost bound scope.
    Pop,
    /// Run the search and record a [`CheckResult`].
    Check,
}

/// A model concretised for a positive `δ` small enough to satisfy every bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    /// The chosen `δ`.
    pub delta: BigRational,
    /// Symbolic values, indexed by variable.
    pub symbolic: Vec<DeltaRational>,
    /// Concrete values, indexed by variable.
    pub values: Vec<BigRational>,
}

/// The answer of one `check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// All bounds in force hold under the model.
    Sat(Model),
    /// The bound literals with these ordinals cannot hold together.
    Unsat(Conflict<usize>),
}

/// The outcome of one `check`, together with the context needed to verify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// The answer.
    pub verdict: Verdict,
    /// Ordinals of the bound literals in force.
    pub active: Vec<usize>,
    /// Number of rows defined before the check.
    pub rows: usize,
}

impl CheckResult {
    /// Returns `true` for a satisfiable check.
    #[must_use]
    pub const fn is_sat(&self) -> bool {
        matches!(self.verdict, Verdict::Sat(_))
    }
}

/// A parsed problem script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Problem {
    names: Vec<String>,
    index: FxHashMap<String, ArithVar>,
    literals: Vec<BoundLiteral>,
    commands: Vec<Command>,
}

impl Problem {
    /// Parses a script held in memory.
    ///
    /// # Errors
    ///
    /// The first malformed line.
    pub fn parse(input: &str) -> Result<Self> {
        Self::parse_reader(io::Cursor::new(input))
    }

    /// Parses a script file.
    ///
    /// # Errors
    ///
    /// If the file cannot be read or a line is malformed.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::parse_reader(io::BufReader::new(file))
    }

    /// Parses a script from any buffered reader.
    ///
    /// # Errors
    ///
    /// If reading fails or a line is malformed.
    pub fn parse_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut parser = Parser::default();
        for (i, line) in reader.lines().enumerate() {
            parser.line(i + 1, &line?)?;
        }
        Ok(parser.problem)
    }

    /// Number of declared variables.
    #[must_use]
    pub fn num_variables(&self) -> usize {
        self.names.len()
    }

    /// The name of `var`.
    #[must_use]
    pub fn name(&self, var: ArithVar) -> &str {
        &self.names[var]
    }

    /// The variable declared as `name`.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<ArithVar> {
        self.index.get(name).copied()
    }

    /// All bound literals, by ordinal.
    #[must_use]
    pub fn literals(&self) -> &[BoundLiteral] {
        &self.literals
    }

    /// The script.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// The first `count` row definitions.
    pub fn rows(&self, count: usize) -> impl Iterator<Item = (ArithVar, &[(ArithVar, BigRational)])> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                Command::Row { basic, definition } => Some((*basic, definition.as_slice())),
                _ => None,
            })
            .take(count)
    }

    /// Renders a bound literal with variable names.
    #[must_use]
    pub fn describe(&self, ordinal: usize) -> String {
        let literal = &self.literals[ordinal];
        format!(
            "{} {} {}",
            self.names[literal.var], literal.relation, literal.constant
        )
    }

    /// Runs the script, returning one result per `check`.
    #[must_use]
    pub fn run(&self, config: SimplexConfig) -> Vec<CheckResult> {
        self.run_with_stats(config).0
    }

    /// Runs the script, also returning the collected statistics.
    #[must_use]
    pub fn run_with_stats(&self, config: SimplexConfig) -> (Vec<CheckResult>, SimplexStats) {
        let mut simplex = SimplexDecisionProcedure::with_config(config, Vec::new());
        for var in 0..self.names.len() {
            simplex.add_variable(var);
        }

        let mut results = Vec::new();
        let mut scopes: Vec<Vec<usize>> = vec![Vec::new()];
        let mut rows = 0;
        let mut unsat: Option<Conflict<usize>> = None;

        for command in &self.commands {
            match command {
                Command::Row { basic, definition } => {
                    simplex.add_row(*basic, definition.iter().cloned());
                    rows += 1;
                }
                Command::Bound(ordinal) => {
                    if let Some(scope) = scopes.last_mut() {
                        scope.push(*ordinal);
                    }
                    if unsat.is_none() && self.assert(&mut simplex, *ordinal) {
                        unsat = simplex.sink_mut().pop();
                    }
                }
                Command::Push => {
                    simplex.push();
                    scopes.push(Vec::new());
                }
                Command::Pop => {
                    let dropped = scopes.pop().unwrap_or_default();
                    let cleared = unsat
                        .as_ref()
                        .is_some_and(|conflict| conflict.iter().any(|t| dropped.contains(t)));
                    if cleared {
                        unsat = None;
                        simplex.revert_assignment_changes();
                    }
                    simplex.pop();
                }
                Command::Check => {
                    if unsat.is_none() {
                        match simplex.update_inconsistent_vars() {
                            Some(conflict) => unsat = Some(conflict),
                            None => simplex.commit_assignment_changes(),
                        }
                    }
                    let active = scopes.concat();
                    let verdict = match &unsat {
                        Some(conflict) => Verdict::Unsat(conflict.clone()),
                        None => Verdict::Sat(self.model(&simplex, &active)),
                    };
                    debug!(check = results.len(), sat = unsat.is_none(), "check");
                    results.push(CheckResult {
                        verdict,
                        active,
                        rows,
                    });
                }
            }
        }

        let stats = *simplex.observer();
        (results, stats)
    }

    fn assert(
        &self,
        simplex: &mut SimplexDecisionProcedure<usize, Vec<Conflict<usize>>>,
        ordinal: usize,
    ) -> bool {
        let literal = &self.literals[ordinal];
        let c = literal.constant.clone();
        match literal.relation {
            Relation::Ge => simplex.assert_lower(literal.var, DeltaRational::from(c), ordinal),
            Relation::Gt => {
                simplex.assert_lower(literal.var, DeltaRational::strictly_above(c), ordinal)
            }
            Relation::Le => simplex.assert_upper(literal.var, DeltaRational::from(c), ordinal),
            Relation::Lt => {
                simplex.assert_upper(literal.var, DeltaRational::strictly_below(c), ordinal)
            }
            Relation::Eq => simplex.assert_equality(literal.var, DeltaRational::from(c), ordinal),
        }
    }

    fn model(
        &self,
        simplex: &SimplexDecisionProcedure<usize, Vec<Conflict<usize>>>,
        active: &[usize],
    ) -> Model {
        let symbolic = (0..self.names.len())
            .map(|var| simplex.assignment(var).clone())
            .collect_vec();

        let delta = active
            .iter()
            .map(|&ordinal| &self.literals[ordinal])
            .filter_map(|literal| {
                let value = &symbolic[literal.var];
                let c = literal.constant.clone();
                match literal.relation {
                    Relation::Ge => delta_limit(value, &DeltaRational::from(c)),
                    Relation::Gt => delta_limit(value, &DeltaRational::strictly_above(c)),
                    Relation::Le => delta_limit(&DeltaRational::from(c), value),
                    Relation::Lt => delta_limit(&DeltaRational::strictly_below(c), value),
                    Relation::Eq => None,
                }
            })
            .fold(BigRational::one(), |best, limit| best.min(limit));

        let values = symbolic.iter().map(|v| v.substitute(&delta)).collect_vec();
        Model {
            delta,
            symbolic,
            values,
        }
    }

    /// Checks a result against the script.
    ///
    /// A model must satisfy every row defined before the check and every bound in
    /// force. A conflict must consist of bounds in force, and those bounds alone
    /// (with the same rows) must again be found infeasible.
    #[must_use]
    pub fn verify(&self, result: &CheckResult) -> bool {
        match &result.verdict {
            Verdict::Sat(model) => self.verify_model(model, result),
            Verdict::Unsat(conflict) => self.verify_conflict(conflict, result),
        }
    }

    fn verify_model(&self, model: &Model, result: &CheckResult) -> bool {
        let rows_hold = self.rows(result.rows).all(|(basic, definition)| {
            let sum = definition
                .iter()
                .fold(BigRational::zero(), |sum, (var, coeff)| {
                    sum + coeff * &model.values[*var]
                });
            sum == model.values[basic]
        });

        let bounds_hold = result.active.iter().all(|&ordinal| {
            let literal = &self.literals[ordinal];
            literal
                .relation
                .holds(&model.values[literal.var], &literal.constant)
        });

        rows_hold && bounds_hold
    }

    fn verify_conflict(&self, conflict: &Conflict<usize>, result: &CheckResult) -> bool {
        if conflict.is_empty() || !conflict.iter().all(|t| result.active.contains(t)) {
            return false;
        }

        let mut simplex = SimplexDecisionProcedure::new(Vec::new());
        for var in 0..self.names.len() {
            simplex.add_variable(var);
        }
        for (basic, definition) in self.rows(result.rows) {
            simplex.add_row(basic, definition.iter().cloned());
        }
        for &ordinal in conflict.tokens().iter().sorted() {
            if self.assert(&mut simplex, ordinal) {
                return true;
            }
        }
        simplex.update_inconsistent_vars().is_some()
    }
}

/// The largest `δ` for which `lhs >= rhs` still holds after substitution, if the
/// order depends on `δ` at all.
fn delta_limit(lhs: &DeltaRational, rhs: &DeltaRational) -> Option<BigRational> {
    let dc = lhs.rational() - rhs.rational();
    let dk = rhs.infinitesimal() - lhs.infinitesimal();
    (dc.is_positive() && dk.is_positive()).then(|| dc / dk)
}

#[derive(Debug, Default)]
struct Parser {
    problem: Problem,
    defined: FxHashSet<ArithVar>,
    used: FxHashSet<ArithVar>,
    depth: usize,
}

impl Parser {
    fn line(&mut self, line: usize, text: &str) -> Result<()> {
        let mut parts = text.split_whitespace();
        let Some(keyword) = parts.next() else {
            return Ok(());
        };
        let args = parts.collect_vec();

        match keyword {
            "c" => Ok(()),
            "v" => args.into_iter().try_for_each(|name| self.declare(line, name)),
            "r" => self.row(line, &args),
            "b" => self.bound(line, &args),
            "push" => {
                self.depth += 1;
                self.problem.commands.push(Command::Push);
                Ok(())
            }
            "pop" => {
                if self.depth == 0 {
                    return Err(parse_error(line, "`pop` without a matching `push`"));
                }
                self.depth -= 1;
                self.problem.commands.push(Command::Pop);
                Ok(())
            }
            "check" => {
                self.problem.commands.push(Command::Check);
                Ok(())
            }
            other => Err(parse_error(line, &format!("unknown command `{other}`"))),
        }
    }

    fn declare(&mut self, line: usize, name: &str) -> Result<()> {
        if self.problem.index.contains_key(name) {
            return Err(LraError::DuplicateVariable {
                line,
                name: name.to_string(),
            });
        }
        let var = self.problem.names.len();
        self.problem.names.push(name.to_string());
        self.problem.index.insert(name.to_string(), var);
        Ok(())
    }

    fn lookup(&self, line: usize, name: &str) -> Result<ArithVar> {
        self.problem
            .variable(name)
            .ok_or_else(|| LraError::UnknownVariable {
                line,
                name: name.to_string(),
            })
    }

    fn row(&mut self, line: usize, args: &[&str]) -> Result<()> {
        let Some((name, terms)) = args.split_first() else {
            return Err(parse_error(line, "`r` needs a variable to define"));
        };
        if terms.is_empty() || terms.len() % 2 != 0 {
            return Err(parse_error(line, "`r` needs `variable coefficient` pairs"));
        }

        let basic = self.lookup(line, name)?;
        if self.defined.contains(&basic) || self.used.contains(&basic) {
            return Err(LraError::InvalidRow {
                line,
                name: (*name).to_string(),
            });
        }

        let mut definition = Vec::with_capacity(terms.len() / 2);
        for (var_name, coeff) in terms.iter().tuples() {
            let var = self.lookup(line, var_name)?;
            if var == basic {
                return Err(LraError::InvalidRow {
                    line,
                    name: (*name).to_string(),
                });
            }
            definition.push((var, parse_rational(line, coeff)?));
        }

        self.used.extend(definition.iter().map(|(var, _)| *var));
        self.defined.insert(basic);
        self.problem
            .commands
            .push(Command::Row { basic, definition });
        Ok(())
    }

    fn bound(&mut self, line: usize, args: &[&str]) -> Result<()> {
        let [name, relation, constant] = args else {
            return Err(parse_error(line, "`b` needs `variable relation constant`"));
        };
        let var = self.lookup(line, name)?;
        let relation = relation
            .parse::<Relation>()
            .map_err(|message| parse_error(line, &message))?;
        let constant = parse_rational(line, constant)?;

        let ordinal = self.problem.literals.len();
        self.problem.literals.push(BoundLiteral {
            var,
            relation,
            constant,
        });
        self.problem.commands.push(Command::Bound(ordinal));
        Ok(())
    }
}

fn parse_error(line: usize, message: &str) -> LraError {
    LraError::Parse {
        line,
        message: message.to_string(),
    }
}

/// Parses `n`, `n/d` or a decimal such as `-0.25`.
fn parse_rational(line: usize, s: &str) -> Result<BigRational> {
    let invalid = || parse_error(line, &format!("invalid number `{s}`"));

    if let Some((int, frac)) = s.split_once('.') {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let negative = int.starts_with('-');
        let int = if int.is_empty() || int == "-" || int == "+" {
            BigInt::zero()
        } else {
            int.parse::<BigInt>().map_err(|_| invalid())?
        };
        let frac_digits = frac.parse::<BigInt>().map_err(|_| invalid())?;
        let scale = num_traits::pow(BigInt::from(10), frac.len());
        let magnitude = BigRational::new(int.abs() * &scale + frac_digits, scale);
        return Ok(if negative { -magnitude } else { magnitude });
    }

    let value = s.parse::<BigRational>().map_err(|_| invalid())?;
    Ok(value)
}

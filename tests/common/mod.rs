#![allow(dead_code)]

use lra_simplex::lra::conflict::Conflict;
use lra_simplex::lra::config::SimplexConfig;
use lra_simplex::lra::delta_rational::DeltaRational;
use lra_simplex::lra::simplex::SimplexDecisionProcedure;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use proptest::prelude::*;

pub type Simplex = SimplexDecisionProcedure<usize, Vec<Conflict<usize>>>;

pub fn rat(n: i64) -> BigRational {
    BigRational::from_integer(n.into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rel {
    Ge,
    Gt,
    Le,
    Lt,
    Eq,
}

#[derive(Debug, Clone)]
pub struct Bound {
    pub var: usize,
    pub rel: Rel,
    pub constant: i64,
}

/// `originals` free variables; row `k` defines variable `originals + k` as the
/// dot product of `rows[k]` with the free variables.
#[derive(Debug, Clone)]
pub struct Instance {
    pub originals: usize,
    pub rows: Vec<Vec<i64>>,
    pub bounds: Vec<Bound>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Sat,
    Unsat(Vec<usize>),
}

impl Instance {
    pub fn num_vars(&self) -> usize {
        self.originals + self.rows.len()
    }

    /// Builds the procedure with all rows and no bounds.
    pub fn build(&self, config: SimplexConfig) -> Simplex {
        let mut simplex = SimplexDecisionProcedure::with_config(config, Vec::new());
        for var in 0..self.num_vars() {
            simplex.add_variable(var);
        }
        for (k, row) in self.rows.iter().enumerate() {
            let definition = row
                .iter()
                .enumerate()
                .filter(|(_, a)| **a != 0)
                .map(|(var, a)| (var, rat(*a)))
                .collect::<Vec<_>>();
            simplex.add_row(self.originals + k, definition);
        }
        simplex
    }

    /// Asserts bound `i`; returns the direct conflict if there is one.
    pub fn assert(&self, simplex: &mut Simplex, i: usize) -> Option<Vec<usize>> {
        let bound = &self.bounds[i];
        let c = rat(bound.constant);
        let clash = match bound.rel {
            Rel::Ge => simplex.assert_lower(bound.var, DeltaRational::from(c), i),
            Rel::Gt => simplex.assert_lower(bound.var, DeltaRational::strictly_above(c), i),
            Rel::Le => simplex.assert_upper(bound.var, DeltaRational::from(c), i),
            Rel::Lt => simplex.assert_upper(bound.var, DeltaRational::strictly_below(c), i),
            Rel::Eq => simplex.assert_equality(bound.var, DeltaRational::from(c), i),
        };
        clash.then(|| {
            simplex
                .sink()
                .last()
                .map(|conflict| conflict.tokens().to_vec())
                .unwrap_or_default()
        })
    }

    /// Asserts the bounds one at a time, searching after each, and stops at the
    /// first conflict.
    pub fn solve(&self, config: SimplexConfig) -> (Outcome, Simplex) {
        let mut simplex = self.build(config);
        for i in 0..self.bounds.len() {
            if let Some(tokens) = self.assert(&mut simplex, i) {
                return (Outcome::Unsat(tokens), simplex);
            }
            if let Some(conflict) = simplex.update_inconsistent_vars() {
                return (Outcome::Unsat(conflict.into_tokens()), simplex);
            }
        }
        (Outcome::Sat, simplex)
    }

    /// Does the current assignment satisfy the rows and the first `count` bounds?
    pub fn satisfied_by(&self, simplex: &Simplex, count: usize) -> bool {
        self.satisfies(simplex, &(0..count).collect::<Vec<_>>())
    }

    /// Does the current assignment satisfy the rows and the chosen bounds?
    pub fn satisfies(&self, simplex: &Simplex, chosen: &[usize]) -> bool {
        let rows_hold = self.rows.iter().enumerate().all(|(k, row)| {
            let sum = row
                .iter()
                .enumerate()
                .fold(DeltaRational::zero(), |sum, (var, a)| {
                    sum + simplex.assignment(var) * &rat(*a)
                });
            &sum == simplex.assignment(self.originals + k)
        });
        let bounds_hold = chosen.iter().map(|&i| &self.bounds[i]).all(|bound| {
            let value = simplex.assignment(bound.var);
            let c = rat(bound.constant);
            match bound.rel {
                Rel::Ge => *value >= DeltaRational::from(c),
                Rel::Gt => *value >= DeltaRational::strictly_above(c),
                Rel::Le => *value <= DeltaRational::from(c),
                Rel::Lt => *value <= DeltaRational::strictly_below(c),
                Rel::Eq => *value == DeltaRational::from(c),
            }
        });
        rows_hold && bounds_hold
    }

    /// The chosen bounds as constraints over the free variables.
    fn constraints(&self, chosen: &[usize]) -> Vec<Linear> {
        let mut system = Vec::new();
        for &i in chosen {
            let bound = &self.bounds[i];
            let expr = if bound.var < self.originals {
                (0..self.originals)
                    .map(|v| rat(i64::from(v == bound.var)))
                    .collect::<Vec<_>>()
            } else {
                self.rows[bound.var - self.originals]
                    .iter()
                    .map(|a| rat(*a))
                    .collect()
            };
            let c = rat(bound.constant);
            let ge = |strict| Linear {
                coeffs: expr.clone(),
                strict,
                constant: c.clone(),
            };
            let le = |strict| Linear {
                coeffs: expr.iter().map(|a| -a).collect(),
                strict,
                constant: -c.clone(),
            };
            match bound.rel {
                Rel::Ge => system.push(ge(false)),
                Rel::Gt => system.push(ge(true)),
                Rel::Le => system.push(le(false)),
                Rel::Lt => system.push(le(true)),
                Rel::Eq => {
                    system.push(ge(false));
                    system.push(le(false));
                }
            }
        }
        system
    }

    /// Decides, by Fourier-Motzkin elimination, whether the rows together with the
    /// chosen bounds have a real solution.
    pub fn feasible(&self, chosen: &[usize]) -> bool {
        fourier_motzkin(self.originals, self.constraints(chosen))
    }
}

/// `Σ coeffs[i] * x_i > constant` if `strict`, `>=` otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Linear {
    coeffs: Vec<BigRational>,
    strict: bool,
    constant: BigRational,
}

impl Linear {
    fn is_trivial(&self) -> bool {
        self.coeffs.iter().all(Zero::is_zero)
    }

    fn trivially_holds(&self) -> bool {
        let zero = BigRational::zero();
        if self.strict {
            zero > self.constant
        } else {
            zero >= self.constant
        }
    }
}

fn fourier_motzkin(num_vars: usize, mut system: Vec<Linear>) -> bool {
    for var in 0..num_vars {
        let mut positive = Vec::new();
        let mut negative = Vec::new();
        let mut rest = Vec::new();
        for constraint in system {
            if constraint.coeffs[var].is_positive() {
                positive.push(constraint);
            } else if constraint.coeffs[var].is_negative() {
                negative.push(constraint);
            } else {
                rest.push(constraint);
            }
        }

        for p in &positive {
            for n in &negative {
                let a = p.coeffs[var].clone();
                let b = -n.coeffs[var].clone();
                let combined = Linear {
                    coeffs: p
                        .coeffs
                        .iter()
                        .zip(&n.coeffs)
                        .map(|(pc, nc)| pc * &b + nc * &a)
                        .collect(),
                    strict: p.strict || n.strict,
                    constant: &p.constant * &b + &n.constant * &a,
                };
                if !rest.contains(&combined) {
                    rest.push(combined);
                }
            }
        }

        if rest
            .iter()
            .any(|c| c.is_trivial() && !c.trivially_holds())
        {
            return false;
        }
        rest.retain(|c| !c.is_trivial());
        system = rest;
    }
    system.iter().all(Linear::trivially_holds)
}

pub fn relation() -> impl Strategy<Value = Rel> {
    prop_oneof![
        Just(Rel::Ge),
        Just(Rel::Gt),
        Just(Rel::Le),
        Just(Rel::Lt),
        Just(Rel::Eq),
    ]
}

prop_compose! {
    fn row_sets(originals: usize)(
        rows in prop::collection::vec(prop::collection::vec(-3i64..=3, originals), 0..=3)
    ) -> Vec<Vec<i64>> {
        rows.into_iter()
            .map(|mut row| {
                if row.iter().all(|a| *a == 0) {
                    row[0] = 1;
                }
                row
            })
            .collect()
    }
}

prop_compose! {
    /// Small instances: up to three free variables, three rows and six bounds.
    pub fn instance()(originals in 1usize..=3)(
        rows in row_sets(originals),
        bounds in prop::collection::vec((0usize..6, relation(), -4i64..=4), 1..=6),
        originals in Just(originals),
    ) -> Instance {
        let num_vars = originals + rows.len();
        let bounds = bounds
            .into_iter()
            .map(|(var, rel, constant)| Bound { var: var % num_vars, rel, constant })
            .collect();
        Instance { originals, rows, bounds }
    }
}

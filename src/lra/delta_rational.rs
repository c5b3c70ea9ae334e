#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Rationals extended with a symbolic infinitesimal.
//!
//! A `DeltaRational` is a value `c + kδ` where `c` and `k` are exact rationals and
//! `δ` is a positive infinitesimal: smaller than every positive rational, but
//! greater than zero. Strict bounds become non-strict ones over these values:
//! `x > c` is `x >= c + δ` and `x < c` is `x <= c - δ`. Values are compared
//! lexicographically on `(c, k)`, which is exactly the order obtained by picking
//! any sufficiently small concrete `δ`.

use core::cmp::Ordering;
use core::fmt::{Display, Formatter};
use core::ops::{Add, Mul, Neg, Sub};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

/// A rational `c` offset by `k` infinitesimals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeltaRational {
    c: BigRational,
    k: BigRational,
}

impl DeltaRational {
    /// Builds `c + kδ`.
    #[must_use]
    pub const fn new(c: BigRational, k: BigRational) -> Self {
        Self { c, k }
    }

    /// The value `0 + 0δ`.
    #[must_use]
    pub fn zero() -> Self {
        Self::new(BigRational::zero(), BigRational::zero())
    }

    /// A plain rational with no infinitesimal part.
    #[must_use]
    pub fn from_rational(c: BigRational) -> Self {
        Self::new(c, BigRational::zero())
    }

    /// A plain integer with no infinitesimal part.
    #[must_use]
    pub fn from_integer(n: i64) -> Self {
        Self::from_rational(BigRational::from_integer(BigInt::from(n)))
    }

    /// The smallest value strictly above `c`, i.e. `c + δ`.
    ///
    /// Used as the bound value of `x > c`.
    #[must_use]
    pub fn strictly_above(c: BigRational) -> Self {
        Self::new(c, BigRational::one())
    }

    /// The largest value strictly below `c`, i.e. `c - δ`.
    ///
    /// Used as the bound value of `x < c`.
    #[must_use]
    pub fn strictly_below(c: BigRational) -> Self {
        Self::new(c, -BigRational::one())
    }

    /// The standard (rational) part `c`.
    #[must_use]
    pub const fn rational(&self) -> &BigRational {
        &self.c
    }

    /// The infinitesimal coefficient `k`.
    #[must_use]
    pub const fn infinitesimal(&self) -> &BigRational {
        &self.k
    }

    /// Returns `true` when both components are zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.c.is_zero() && self.k.is_zero()
    }

    /// Sign of the value under the lexicographic order.
    #[must_use]
    pub fn sign(&self) -> Ordering {
        if self.c.is_positive() {
            Ordering::Greater
        } else if self.c.is_negative() {
            Ordering::Less
        } else {
            self.k.cmp(&BigRational::zero())
        }
    }

    /// Multiplies both components by `r`.
    #[must_use]
    pub fn scale(&self, r: &BigRational) -> Self {
        Self::new(&self.c * r, &self.k * r)
    }

    /// Divides both components by a nonzero rational.
    #[must_use]
    pub fn div_rational(&self, r: &BigRational) -> Self {
        debug_assert!(!r.is_zero(), "division of a delta-rational by zero");
        self.scale(&r.recip())
    }

    /// Concretises the value for a given choice of `δ`.
    #[must_use]
    pub fn substitute(&self, delta: &BigRational) -> BigRational {
        &self.c + &self.k * delta
    }
}

impl Default for DeltaRational {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<BigRational> for DeltaRational {
    fn from(c: BigRational) -> Self {
        Self::from_rational(c)
    }
}

impl From<i64> for DeltaRational {
    fn from(n: i64) -> Self {
        Self::from_integer(n)
    }
}

impl PartialOrd for DeltaRational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DeltaRational {
    fn cmp(&self, other: &Self) -> Ordering {
        self.c.cmp(&other.c).then_with(|| self.k.cmp(&other.k))
    }
}

impl Add<&DeltaRational> for &DeltaRational {
    type Output = DeltaRational;

    fn add(self, rhs: &DeltaRational) -> Self::Output {
        DeltaRational::new(&self.c + &rhs.c, &self.k + &rhs.k)
    }
}

impl Add for DeltaRational {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        &self + &rhs
    }
}

impl Sub<&DeltaRational> for &DeltaRational {
    type Output = DeltaRational;

    fn sub(self, rhs: &DeltaRational) -> Self::Output {
        DeltaRational::new(&self.c - &rhs.c, &self.k - &rhs.k)
    }
}

impl Sub for DeltaRational {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        &self - &rhs
    }
}

impl Mul<&BigRational> for &DeltaRational {
    type Output = DeltaRational;

    fn mul(self, rhs: &BigRational) -> Self::Output {
        self.scale(rhs)
    }
}

impl Mul<&BigRational> for DeltaRational {
    type Output = Self;

    fn mul(self, rhs: &BigRational) -> Self::Output {
        self.scale(rhs)
    }
}

impl Neg for &DeltaRational {
    type Output = DeltaRational;

    fn neg(self) -> Self::Output {
        DeltaRational::new(-&self.c, -&self.k)
    }
}

impl Neg for DeltaRational {
    type Output = Self;

    fn neg(self) -> Self::Output {
        -&self
    }
}

impl Display for DeltaRational {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        if self.k.is_zero() {
            write!(f, "{}", self.c)
        } else if self.k.is_negative() {
            write!(f, "{}-{}δ", self.c, -&self.k)
        } else {
            write!(f, "{}+{}δ", self.c, self.k)
        }
    }
}

#![deny(missing_docs)]
//! This crate provides an incremental Simplex decision procedure for linear real
//! arithmetic, with exact rational arithmetic and conflict explanations.
//!
//! ```
//! use lra_simplex::lra::conflict::Conflict;
//! use lra_simplex::lra::delta_rational::DeltaRational;
//! use lra_simplex::lra::simplex::SimplexDecisionProcedure;
//! use num_rational::BigRational;
//!
//! let mut simplex = SimplexDecisionProcedure::new(Vec::<Conflict<&str>>::new());
//! // z = x + y
//! simplex.add_row(2, vec![(0, BigRational::from_integer(1.into())), (1, BigRational::from_integer(1.into()))]);
//! assert!(!simplex.assert_lower(0, DeltaRational::from(0), "x >= 0"));
//! assert!(!simplex.assert_lower(1, DeltaRational::from(0), "y >= 0"));
//! assert!(!simplex.assert_upper(2, DeltaRational::from(-1), "z <= -1"));
//!
//! let conflict = simplex.update_inconsistent_vars().expect("infeasible");
//! assert_eq!(conflict.len(), 3);
//! ```

/// The `lra` module implements the Simplex core and a small text format on top of it.
pub mod lra;

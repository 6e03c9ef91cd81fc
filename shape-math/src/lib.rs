//! shape-math - Numerical support for surface-brightness profiles
//!
//! This crate provides the numeric building blocks used by the profile
//! algebra in `sbprofile`:
//!
//! - **Matrix** - 2x2 affine maps (rotation, scale, shear, principal axes)
//! - **Table** - 1-D lookup tables with selectable interpolants
//! - **Spline** - Natural cubic spline
//! - **Integrate** - Gauss–Legendre quadrature and Hankel transforms
//! - **Bessel** - J0 and J1
//! - **Special** - Gamma and regularized incomplete gamma functions
//!
//! # Example
//!
//! ```
//! use shape_math::{hankel0, gamma_p_inverse};
//!
//! // Half-light scale of an exponential disk
//! let b = gamma_p_inverse(2.0, 0.5).unwrap();
//! assert!((b - 1.6783).abs() < 1e-3);
//!
//! // Total flux of a unit Gaussian via its Hankel transform at k = 0
//! let flux = hankel0(|r| (-0.5 * r * r).exp(), 0.0, 10.0);
//! assert!((flux - 2.0 * std::f64::consts::PI).abs() < 1e-8);
//! ```

use thiserror::Error;

pub mod bessel;
pub mod integrate;
pub mod matrix2;
pub mod special;
pub mod spline;
pub mod table;

// Re-export commonly used types
pub use bessel::{j0, j1};
pub use integrate::{gauss_legendre, hankel0, integrate_breakpoints};
pub use matrix2::{
    invert_matrix, principal_axes, rotation_matrix, scale_matrix, shear_matrix,
    SingularMatrixError,
};
pub use special::{bisect, gamma, gamma_p, gamma_p_inverse, gamma_q, ln_gamma};
pub use spline::CubicSpline;
pub use table::{Interpolant, Table, TableError};

/// Failures of the iterative numeric routines.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MathError {
    /// Argument outside the function's domain
    #[error("invalid argument {name} = {value}")]
    InvalidArgument { name: &'static str, value: f64 },

    /// Iteration limit reached before the tolerance was met
    #[error("{routine} did not converge in {iterations} iterations")]
    NoConvergence {
        routine: &'static str,
        iterations: usize,
    },

    /// Root finder endpoints do not straddle a sign change
    #[error("no sign change between {lo} and {hi}")]
    NoBracket { lo: f64, hi: f64 },

    /// Lookup table failure
    #[error(transparent)]
    Table(#[from] TableError),
}

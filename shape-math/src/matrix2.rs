//! Linear maps for distorting profiles
//!
//! Rotations, scalings and shears, inversion with a singularity check, and the
//! principal axis lengths of the ellipse a map produces from the unit circle.

use nalgebra::{Matrix2, Vector2};
use thiserror::Error;

/// A profile map that collapses the plane and so has no inverse.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("singular matrix: determinant={determinant:.6e}")]
pub struct SingularMatrixError {
    pub determinant: f64,
}

/// Maps with `|det|` below this would scale a profile's flux to nothing.
const DETERMINANT_EPSILON: f64 = 1e-10;

/// Inverse of a profile map, needed to pull image-plane positions back to
/// the undistorted profile.
///
/// # Errors
/// `SingularMatrixError` when `|det|` is below 1e-10.
pub fn invert_matrix(matrix: &Matrix2<f64>) -> Result<Matrix2<f64>, SingularMatrixError> {
    let det = matrix.determinant();
    let singular = SingularMatrixError { determinant: det };
    if det.abs() < DETERMINANT_EPSILON {
        return Err(singular);
    }
    matrix.try_inverse().ok_or(singular)
}

/// Counter-clockwise rotation of a profile by `angle_rad`.
pub fn rotation_matrix(angle_rad: f64) -> Matrix2<f64> {
    let (s, c) = angle_rad.sin_cos();
    Matrix2::new(c, -s, s, c)
}

/// Stretch by `sx` along x and `sy` along y. Flux scales by `sx·sy`.
pub fn scale_matrix(sx: f64, sy: f64) -> Matrix2<f64> {
    Matrix2::from_diagonal(&Vector2::new(sx, sy))
}

/// Area-preserving shear from reduced shear components `(g1, g2)`.
///
/// The result is `[[1+g1, g2], [g2, 1-g1]] / sqrt(1 - g²)`, which has unit
/// determinant so a sheared profile keeps its flux.
///
/// # Returns
/// * `None` if `|g| >= 1`, where the map degenerates
pub fn shear_matrix(g1: f64, g2: f64) -> Option<Matrix2<f64>> {
    let gsq = g1 * g1 + g2 * g2;
    if gsq >= 1.0 {
        return None;
    }
    let norm = 1.0 / (1.0 - gsq).sqrt();
    Some(Matrix2::new(
        norm * (1.0 + g1),
        norm * g2,
        norm * g2,
        norm * (1.0 - g1),
    ))
}

/// Major and minor semi-axis lengths of the ellipse that `matrix` maps the
/// unit circle onto (the singular values of the matrix).
///
/// Closed form for 2x2: with `h1 = |(a+d, b-c)|` and `h2 = |(a-d, b+c)|`,
/// the singular values are `(h1 ± h2) / 2`.
pub fn principal_axes(matrix: &Matrix2<f64>) -> (f64, f64) {
    let (a, b, c, d) = (matrix[(0, 0)], matrix[(0, 1)], matrix[(1, 0)], matrix[(1, 1)]);
    let h1 = (a + d).hypot(b - c);
    let h2 = (a - d).hypot(b + c);
    let major = 0.5 * (h1 + h2).abs();
    let minor = 0.5 * (h1 - h2).abs();
    if major < minor {
        (minor, major)
    } else {
        (major, minor)
    }
}

/// True when `matrix` is a rotation combined with a uniform scale
/// (`a == d` and `b == -c`), i.e. it maps circles to circles.
pub fn is_rotation_scale(matrix: &Matrix2<f64>) -> bool {
    matrix[(0, 0)] == matrix[(1, 1)] && matrix[(0, 1)] == -matrix[(1, 0)]
}

/// Apply the transpose of `matrix` to `v` (used for wavevectors).
pub fn transpose_apply(matrix: &Matrix2<f64>, v: &Vector2<f64>) -> Vector2<f64> {
    matrix.transpose() * v
}

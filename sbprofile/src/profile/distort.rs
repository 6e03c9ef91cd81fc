//! Affine distortion: a linear map followed by a translation.
//!
//! The distorted profile is `I'(x) = I(M⁻¹(x - x0))`. Surface brightness is
//! preserved, so flux grows by `|det M|`, and in Fourier space
//! `Ĩ'(k) = |det M| Ĩ(Mᵀk) e^{-i k·x0}`.

use nalgebra::{Matrix2, Vector2};
use rustfft::num_complex::Complex64;

use shape_math::matrix2::{is_rotation_scale, transpose_apply};
use shape_math::{invert_matrix, principal_axes};

use crate::deviate::UniformDeviate;
use crate::error::ProfileError;
use crate::photon::PhotonArray;
use crate::render::KGrid;

use super::{Profile, SbProfile, MOCK_INF};

/// Child profile seen through `x -> M x + x0`.
#[derive(Debug, Clone)]
pub struct Distort {
    child: Box<SbProfile>,
    matrix: Matrix2<f64>,
    inverse: Matrix2<f64>,
    offset: Vector2<f64>,
    abs_det: f64,
    major: f64,
    minor: f64,
}

impl Distort {
    /// # Errors
    /// `Singular` if `matrix` has no inverse.
    pub fn new(
        child: SbProfile,
        matrix: Matrix2<f64>,
        offset: Vector2<f64>,
    ) -> Result<Self, ProfileError> {
        let inverse = invert_matrix(&matrix)?;
        let (major, minor) = principal_axes(&matrix);
        Ok(Self {
            child: Box::new(child),
            matrix,
            inverse,
            offset,
            abs_det: matrix.determinant().abs(),
            major,
            minor,
        })
    }

    pub fn child(&self) -> &SbProfile {
        &self.child
    }

    pub fn matrix(&self) -> Matrix2<f64> {
        self.matrix
    }

    pub fn offset(&self) -> Vector2<f64> {
        self.offset
    }

    pub fn abs_det(&self) -> f64 {
        self.abs_det
    }

    fn phase(&self, k: Vector2<f64>) -> Complex64 {
        Complex64::from_polar(1.0, -k.dot(&self.offset))
    }
}

impl Profile for Distort {
    fn x_value(&self, p: Vector2<f64>) -> Result<f64, ProfileError> {
        self.child.x_value(self.inverse * (p - self.offset))
    }

    fn k_value(&self, k: Vector2<f64>) -> Complex64 {
        let value = self.child.k_value(transpose_apply(&self.matrix, &k)) * self.abs_det;
        if self.offset == Vector2::zeros() {
            value
        } else {
            value * self.phase(k)
        }
    }

    fn max_k(&self) -> f64 {
        (self.child.max_k() / self.minor).min(MOCK_INF)
    }

    fn step_k(&self) -> f64 {
        (self.child.step_k() / self.major).min(MOCK_INF)
    }

    fn is_axisymmetric(&self) -> bool {
        is_rotation_scale(&self.matrix)
            && self.offset == Vector2::zeros()
            && self.child.is_axisymmetric()
    }

    fn is_analytic_x(&self) -> bool {
        self.child.is_analytic_x()
    }

    fn is_analytic_k(&self) -> bool {
        self.child.is_analytic_k()
    }

    fn centroid(&self) -> Result<Vector2<f64>, ProfileError> {
        Ok(self.offset + self.matrix * self.child.centroid()?)
    }

    fn flux(&self) -> f64 {
        self.child.flux() * self.abs_det
    }

    fn set_flux(&mut self, flux: f64) -> Result<(), ProfileError> {
        self.child.set_flux(flux / self.abs_det)
    }

    fn positive_flux(&self) -> f64 {
        self.child.positive_flux() * self.abs_det
    }

    fn negative_flux(&self) -> f64 {
        self.child.negative_flux() * self.abs_det
    }

    /// Child photons are mapped through `M p + x0` and scaled by `|det M|`.
    fn shoot(&self, n: usize, ud: &mut dyn UniformDeviate) -> Result<PhotonArray, ProfileError> {
        let mut photons = self.child.shoot(n, ud)?;
        let m = self.matrix;
        let x0 = self.offset;
        photons.map_positions(|x, y| {
            (
                m[(0, 0)] * x + m[(0, 1)] * y + x0.x,
                m[(1, 0)] * x + m[(1, 1)] * y + x0.y,
            )
        });
        photons.scale_flux(self.abs_det);
        Ok(photons)
    }

    /// The phase factor separates into a column term and a row term, so it
    /// is computed once per column and once per row.
    fn fill_k_grid(&self, grid: &mut KGrid) {
        let n = grid.size();
        let column_phase: Vec<Complex64> = (0..n)
            .map(|ix| Complex64::from_polar(self.abs_det, -grid.wavenumber(ix) * self.offset.x))
            .collect();
        for iy in 0..n {
            let ky = grid.wavenumber(iy);
            let row_phase = Complex64::from_polar(1.0, -ky * self.offset.y);
            for ix in 0..n {
                let k = Vector2::new(grid.wavenumber(ix), ky);
                let value = self.child.k_value(transpose_apply(&self.matrix, &k));
                grid.array_mut()[[iy, ix]] = value * column_phase[ix] * row_phase;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{BoxProfile, Gaussian};
    use crate::render::KGrid;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shape_math::{rotation_matrix, scale_matrix};
    use std::f64::consts::FRAC_PI_2;

    fn gaussian() -> SbProfile {
        Gaussian::new(2.0, 1.0).unwrap().into()
    }

    #[test]
    fn test_identity_round_trip() {
        let d = Distort::new(gaussian(), Matrix2::identity(), Vector2::zeros()).unwrap();
        let g = gaussian();
        for p in [Vector2::new(0.0, 0.0), Vector2::new(0.7, -1.2)] {
            assert_relative_eq!(d.x_value(p).unwrap(), g.x_value(p).unwrap());
            assert_relative_eq!(d.k_value(p).re, g.k_value(p).re);
        }
        assert_relative_eq!(d.flux(), 2.0);
        assert!(d.is_axisymmetric());
    }

    #[test]
    fn test_singular_rejected() {
        let m = Matrix2::new(1.0, 2.0, 2.0, 4.0);
        assert!(matches!(
            Distort::new(gaussian(), m, Vector2::zeros()),
            Err(ProfileError::Singular(_))
        ));
    }

    #[test]
    fn test_rotated_box() {
        let b: SbProfile = BoxProfile::new(2.0, 1.0, 1.0).unwrap().into();
        let d = Distort::new(b, rotation_matrix(FRAC_PI_2), Vector2::zeros()).unwrap();
        // The wide axis now lies along y
        assert!(d.x_value(Vector2::new(0.0, 0.9)).unwrap() > 0.0);
        assert_eq!(d.x_value(Vector2::new(0.9, 0.0)).unwrap(), 0.0);
        assert!(!d.is_axisymmetric());
    }

    #[test]
    fn test_stretch_and_shift() {
        let m = scale_matrix(2.0, 0.5);
        let d = Distort::new(gaussian(), m, Vector2::new(1.0, 1.0)).unwrap();
        assert_relative_eq!(d.flux(), 2.0, epsilon = 1e-14);
        assert_relative_eq!(d.max_k(), gaussian().max_k() / 0.5, epsilon = 1e-12);
        assert_relative_eq!(d.step_k(), gaussian().step_k() / 2.0, epsilon = 1e-12);
        let c = d.centroid().unwrap();
        assert_relative_eq!(c.x, 1.0);
        assert_relative_eq!(c.y, 1.0);
        // A shift changes only the phase
        let k = Vector2::new(0.4, -0.3);
        assert_relative_eq!(
            d.k_value(k).norm(),
            gaussian().k_value(Vector2::new(0.8, -0.15)).re,
            epsilon = 1e-14
        );
        assert!(!d.is_axisymmetric());
    }

    #[test]
    fn test_grid_matches_pointwise() {
        let m = Matrix2::new(1.2, 0.3, -0.1, 0.8);
        let d = Distort::new(gaussian(), m, Vector2::new(0.4, -0.7)).unwrap();
        let mut grid = KGrid::new(8, 0.5);
        d.fill_k_grid(&mut grid);
        for iy in 0..8 {
            for ix in 0..8 {
                let k = Vector2::new(grid.wavenumber(ix), grid.wavenumber(iy));
                let expected = d.k_value(k);
                let got = grid.array()[[iy, ix]];
                assert_relative_eq!(got.re, expected.re, epsilon = 1e-12);
                assert_relative_eq!(got.im, expected.im, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_shoot_maps_photons() {
        let m = scale_matrix(3.0, 1.0);
        let d = Distort::new(gaussian(), m, Vector2::new(5.0, 0.0)).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let photons = d.shoot(20_000, &mut rng).unwrap();
        assert_relative_eq!(photons.total_flux(), 6.0, epsilon = 1e-9);
        let c = photons.centroid().unwrap();
        assert_relative_eq!(c.x, 5.0, epsilon = 0.06);
        assert_relative_eq!(c.y, 0.0, epsilon = 0.03);
    }
}

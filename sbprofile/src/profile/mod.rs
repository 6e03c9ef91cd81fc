//! Surface-brightness profiles and their composition algebra.
//!
//! Every leaf shape and every combinator implements [`Profile`]. The closed
//! sum type [`SbProfile`] wraps them all; combinators own their children as
//! `SbProfile` values, so composing a profile copies it and later changes to
//! the original never reach the composite.
//!
//! # Example
//!
//! ```
//! use sbprofile::profile::{Convolve, Exponential, Gaussian, Profile, SbProfile};
//!
//! let galaxy: SbProfile = Exponential::new(100.0, 1.5).unwrap().into();
//! let galaxy = galaxy.shear(0.2, 0.0).unwrap();
//! let psf = Gaussian::new(1.0, 0.7).unwrap();
//!
//! let observed = Convolve::from_profiles(vec![galaxy, psf.into()]);
//! assert!((observed.flux() - 100.0).abs() < 1e-9);
//! assert!(!observed.is_analytic_x());
//! ```

use std::f64::consts::PI;

use nalgebra::{Matrix2, Vector2};
use rustfft::num_complex::Complex64;

use shape_math::matrix2::{rotation_matrix, scale_matrix, shear_matrix};

use crate::deviate::UniformDeviate;
use crate::error::ProfileError;
use crate::photon::PhotonArray;
use crate::render::{KGrid, ProfileImage};

mod add;
mod airy;
mod box_profile;
mod convolve;
mod delta;
mod distort;
mod exponential;
mod gaussian;
mod moffat;
mod sersic;

pub use add::Add;
pub use airy::Airy;
pub use box_profile::BoxProfile;
pub use convolve::Convolve;
pub use delta::DeltaFunction;
pub use distort::Distort;
pub use exponential::Exponential;
pub use gaussian::Gaussian;
pub use moffat::Moffat;
pub use sersic::{Sersic, SersicInfo};

/// Stand-in for an infinite surface brightness or band limit.
pub const MOCK_INF: f64 = 1.0e300;

/// Operations every surface-brightness profile supports.
pub trait Profile {
    /// Surface brightness at position `p`.
    ///
    /// # Errors
    /// `Unsupported` when the profile has no real-space form.
    fn x_value(&self, p: Vector2<f64>) -> Result<f64, ProfileError>;

    /// Fourier amplitude at wavevector `k`, with `k_value(0) == flux()`.
    fn k_value(&self, k: Vector2<f64>) -> Complex64;

    /// Wavenumber beyond which the Fourier amplitude is negligible.
    fn max_k(&self) -> f64;

    /// Largest k-space sample step that avoids real-space aliasing.
    fn step_k(&self) -> f64;

    /// Real-space sample spacing that resolves `max_k`.
    fn nyquist_dx(&self) -> f64 {
        PI / self.max_k()
    }

    fn is_axisymmetric(&self) -> bool;

    /// True when `x_value` is available.
    fn is_analytic_x(&self) -> bool;

    /// True when `k_value` is computed directly rather than by transform.
    fn is_analytic_k(&self) -> bool {
        true
    }

    fn centroid(&self) -> Result<Vector2<f64>, ProfileError>;

    fn flux(&self) -> f64;

    /// Rescale to total `flux`.
    fn set_flux(&mut self, flux: f64) -> Result<(), ProfileError>;

    /// Flux expected in positive photons when shooting.
    fn positive_flux(&self) -> f64 {
        self.flux().max(0.0)
    }

    /// Magnitude of the flux expected in negative photons when shooting.
    fn negative_flux(&self) -> f64 {
        (-self.flux()).max(0.0)
    }

    /// Draw `n` photons whose fluxes sum to `flux()` in expectation.
    fn shoot(&self, n: usize, ud: &mut dyn UniformDeviate) -> Result<PhotonArray, ProfileError>;

    /// Fill `grid` with Fourier amplitudes, one `k_value` per cell.
    fn fill_k_grid(&self, grid: &mut KGrid) {
        let n = grid.size();
        for iy in 0..n {
            let ky = grid.wavenumber(iy);
            for ix in 0..n {
                let kx = grid.wavenumber(ix);
                grid.array_mut()[[iy, ix]] = self.k_value(Vector2::new(kx, ky));
            }
        }
    }

    /// Fill `image` with surface brightness sampled at pixel centers.
    fn fill_x_grid(&self, image: &mut ProfileImage) -> Result<(), ProfileError> {
        let (ny, nx) = image.array().dim();
        for iy in 0..ny {
            for ix in 0..nx {
                let p = image.position(ix, iy);
                image.array_mut()[[iy, ix]] = self.x_value(p)?;
            }
        }
        Ok(())
    }
}

/// Any leaf or combinator profile.
///
/// `Clone` is the deep duplicate used when a profile is composed: children
/// are copied by value, and only the immutable shape-parameter tables are
/// shared.
#[derive(Debug, Clone)]
pub enum SbProfile {
    Gaussian(Gaussian),
    Exponential(Exponential),
    Sersic(Sersic),
    Airy(Airy),
    Box(BoxProfile),
    Moffat(Moffat),
    Delta(DeltaFunction),
    Add(Add),
    Convolve(Convolve),
    Distort(Distort),
}

macro_rules! dispatch {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            SbProfile::Gaussian($inner) => $body,
            SbProfile::Exponential($inner) => $body,
            SbProfile::Sersic($inner) => $body,
            SbProfile::Airy($inner) => $body,
            SbProfile::Box($inner) => $body,
            SbProfile::Moffat($inner) => $body,
            SbProfile::Delta($inner) => $body,
            SbProfile::Add($inner) => $body,
            SbProfile::Convolve($inner) => $body,
            SbProfile::Distort($inner) => $body,
        }
    };
}

macro_rules! impl_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for SbProfile {
                fn from(profile: $ty) -> Self {
                    SbProfile::$variant(profile)
                }
            }
        )*
    };
}

impl_from!(
    Gaussian(Gaussian),
    Exponential(Exponential),
    Sersic(Sersic),
    Airy(Airy),
    Box(BoxProfile),
    Moffat(Moffat),
    Delta(DeltaFunction),
    Add(Add),
    Convolve(Convolve),
    Distort(Distort),
);

impl Profile for SbProfile {
    fn x_value(&self, p: Vector2<f64>) -> Result<f64, ProfileError> {
        dispatch!(self, inner => inner.x_value(p))
    }

    fn k_value(&self, k: Vector2<f64>) -> Complex64 {
        dispatch!(self, inner => inner.k_value(k))
    }

    fn max_k(&self) -> f64 {
        dispatch!(self, inner => inner.max_k())
    }

    fn step_k(&self) -> f64 {
        dispatch!(self, inner => inner.step_k())
    }

    fn nyquist_dx(&self) -> f64 {
        dispatch!(self, inner => inner.nyquist_dx())
    }

    fn is_axisymmetric(&self) -> bool {
        dispatch!(self, inner => inner.is_axisymmetric())
    }

    fn is_analytic_x(&self) -> bool {
        dispatch!(self, inner => inner.is_analytic_x())
    }

    fn is_analytic_k(&self) -> bool {
        dispatch!(self, inner => inner.is_analytic_k())
    }

    fn centroid(&self) -> Result<Vector2<f64>, ProfileError> {
        dispatch!(self, inner => inner.centroid())
    }

    fn flux(&self) -> f64 {
        dispatch!(self, inner => inner.flux())
    }

    fn set_flux(&mut self, flux: f64) -> Result<(), ProfileError> {
        dispatch!(self, inner => inner.set_flux(flux))
    }

    fn positive_flux(&self) -> f64 {
        dispatch!(self, inner => inner.positive_flux())
    }

    fn negative_flux(&self) -> f64 {
        dispatch!(self, inner => inner.negative_flux())
    }

    fn shoot(&self, n: usize, ud: &mut dyn UniformDeviate) -> Result<PhotonArray, ProfileError> {
        dispatch!(self, inner => inner.shoot(n, ud))
    }

    fn fill_k_grid(&self, grid: &mut KGrid) {
        dispatch!(self, inner => inner.fill_k_grid(grid))
    }

    fn fill_x_grid(&self, image: &mut ProfileImage) -> Result<(), ProfileError> {
        dispatch!(self, inner => inner.fill_x_grid(image))
    }
}

impl SbProfile {
    /// Short variant name, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SbProfile::Gaussian(_) => "Gaussian",
            SbProfile::Exponential(_) => "Exponential",
            SbProfile::Sersic(_) => "Sersic",
            SbProfile::Airy(_) => "Airy",
            SbProfile::Box(_) => "Box",
            SbProfile::Moffat(_) => "Moffat",
            SbProfile::Delta(_) => "DeltaFunction",
            SbProfile::Add(_) => "Add",
            SbProfile::Convolve(_) => "Convolve",
            SbProfile::Distort(_) => "Distort",
        }
    }

    /// Apply the linear map `matrix` and then translate by `offset`.
    ///
    /// Surface brightness is preserved, so the flux scales by `|det(matrix)|`.
    /// Distorting a distortion folds the two maps into one node.
    ///
    /// # Errors
    /// `Singular` if the combined map cannot be inverted.
    pub fn distort(
        &self,
        matrix: Matrix2<f64>,
        offset: Vector2<f64>,
    ) -> Result<SbProfile, ProfileError> {
        let distorted = match self {
            SbProfile::Distort(inner) => Distort::new(
                inner.child().clone(),
                matrix * inner.matrix(),
                matrix * inner.offset() + offset,
            )?,
            other => Distort::new(other.clone(), matrix, offset)?,
        };
        Ok(distorted.into())
    }

    /// Area-preserving shear by reduced shear `(g1, g2)`.
    pub fn shear(&self, g1: f64, g2: f64) -> Result<SbProfile, ProfileError> {
        let matrix = shear_matrix(g1, g2).ok_or(ProfileError::InvalidParameter {
            name: "|g|",
            value: g1.hypot(g2),
            reason: "reduced shear must be below 1",
        })?;
        self.distort(matrix, Vector2::zeros())
    }

    /// Rotate counter-clockwise by `theta` radians.
    pub fn rotate(&self, theta: f64) -> Result<SbProfile, ProfileError> {
        self.distort(rotation_matrix(theta), Vector2::zeros())
    }

    /// Translate by `(dx, dy)`.
    pub fn shift(&self, dx: f64, dy: f64) -> Result<SbProfile, ProfileError> {
        self.distort(Matrix2::identity(), Vector2::new(dx, dy))
    }

    /// Scale linear size by `scale`, keeping surface brightness (the flux
    /// grows by `scale²`).
    pub fn expand(&self, scale: f64) -> Result<SbProfile, ProfileError> {
        self.distort(scale_matrix(scale, scale), Vector2::zeros())
    }

    /// Flux and position when this profile is a point source: a delta
    /// function, possibly distorted, or a convolution of point sources.
    pub fn point_source(&self) -> Option<(f64, Vector2<f64>)> {
        match self {
            SbProfile::Delta(delta) => Some((delta.flux(), Vector2::zeros())),
            SbProfile::Distort(distort) => distort
                .child()
                .point_source()
                .map(|(flux, at)| {
                    (flux * distort.abs_det(), distort.matrix() * at + distort.offset())
                }),
            SbProfile::Convolve(convolve) => convolve.point_source(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_clone_is_independent() {
        let original: SbProfile = Gaussian::new(2.0, 1.0).unwrap().into();
        let mut copy = original.clone();
        copy.set_flux(7.0).unwrap();
        assert_relative_eq!(original.flux(), 2.0);
        assert_relative_eq!(copy.flux(), 7.0);
    }

    #[test]
    fn test_nested_distortions_fold() {
        let base: SbProfile = Exponential::new(1.0, 1.0).unwrap().into();
        let twice = base.shift(1.0, 0.0).unwrap().expand(2.0).unwrap();
        match &twice {
            SbProfile::Distort(d) => assert!(matches!(d.child(), SbProfile::Exponential(_))),
            other => panic!("expected a single Distort, got {}", other.kind()),
        }
        let c = twice.centroid().unwrap();
        assert_relative_eq!(c.x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(twice.flux(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_point_source_detection() {
        let delta: SbProfile = DeltaFunction::new(3.0).unwrap().into();
        let moved = delta.shift(0.5, -1.0).unwrap();
        let (flux, at) = moved.point_source().unwrap();
        assert_relative_eq!(flux, 3.0);
        assert_relative_eq!(at.x, 0.5);
        assert_relative_eq!(at.y, -1.0);

        let gaussian: SbProfile = Gaussian::new(1.0, 1.0).unwrap().into();
        assert!(gaussian.point_source().is_none());
    }

    #[test]
    fn test_bad_shear_rejected() {
        let g: SbProfile = Gaussian::new(1.0, 1.0).unwrap().into();
        assert!(matches!(
            g.shear(0.9, 0.9),
            Err(ProfileError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_nyquist_dx() {
        let g: SbProfile = Gaussian::new(1.0, 2.0).unwrap().into();
        assert_relative_eq!(g.nyquist_dx(), PI / g.max_k());
    }
}

//! Convolution of any number of profiles.

use log::debug;
use nalgebra::Vector2;
use rustfft::num_complex::Complex64;

use crate::deviate::UniformDeviate;
use crate::error::ProfileError;
use crate::photon::PhotonArray;
use crate::render::KGrid;

use super::{Profile, SbProfile, MOCK_INF};

/// Convolution of child profiles times a flux rescale factor.
///
/// Only the Fourier transform is available in general. Real-space values
/// exist when every child but one is a point source, since convolving with a
/// point source is a shift.
#[derive(Debug, Clone)]
pub struct Convolve {
    children: Vec<SbProfile>,
    flux_scale: f64,
}

impl Default for Convolve {
    fn default() -> Self {
        Self::new()
    }
}

impl Convolve {
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
            flux_scale: 1.0,
        }
    }

    pub fn from_profiles(children: Vec<SbProfile>) -> Self {
        Self {
            children,
            flux_scale: 1.0,
        }
    }

    /// Append a factor to the convolution.
    pub fn add(&mut self, profile: SbProfile) {
        self.children.push(profile);
    }

    pub fn children(&self) -> &[SbProfile] {
        &self.children
    }

    pub fn flux_scale(&self) -> f64 {
        self.flux_scale
    }

    fn flux_product(&self) -> f64 {
        self.children.iter().map(|c| c.flux()).product()
    }

    /// Total flux and position when every child is a point source.
    pub fn point_source(&self) -> Option<(f64, Vector2<f64>)> {
        self.children
            .iter()
            .try_fold((self.flux_scale, Vector2::zeros()), |(flux, at), child| {
                child
                    .point_source()
                    .map(|(f, offset)| (flux * f, at + offset))
            })
    }

    /// The one child that is not a point source, plus the combined flux and
    /// offset of all the point sources.
    fn shifted_remainder(&self) -> Option<(Option<&SbProfile>, f64, Vector2<f64>)> {
        let mut rest = None;
        let mut flux = self.flux_scale;
        let mut offset = Vector2::zeros();
        for child in &self.children {
            match child.point_source() {
                Some((f, at)) => {
                    flux *= f;
                    offset += at;
                }
                None if rest.is_none() => rest = Some(child),
                None => return None,
            }
        }
        Some((rest, flux, offset))
    }
}

impl Profile for Convolve {
    fn x_value(&self, p: Vector2<f64>) -> Result<f64, ProfileError> {
        let unsupported = ProfileError::Unsupported {
            operation: "x_value",
            profile: "Convolve",
        };
        match self.shifted_remainder() {
            Some((Some(rest), flux, offset)) if rest.is_analytic_x() => {
                Ok(flux * rest.x_value(p - offset)?)
            }
            Some((None, flux, offset)) => {
                if p == offset {
                    Ok(if flux >= 0.0 { MOCK_INF } else { -MOCK_INF })
                } else {
                    Ok(0.0)
                }
            }
            _ => Err(unsupported),
        }
    }

    fn k_value(&self, k: Vector2<f64>) -> Complex64 {
        self.children
            .iter()
            .fold(Complex64::new(self.flux_scale, 0.0), |acc, c| acc * c.k_value(k))
    }

    fn max_k(&self) -> f64 {
        self.children.iter().map(|c| c.max_k()).fold(MOCK_INF, f64::min)
    }

    fn step_k(&self) -> f64 {
        self.children.iter().map(|c| c.step_k()).fold(MOCK_INF, f64::min)
    }

    fn is_axisymmetric(&self) -> bool {
        self.children.iter().all(|c| c.is_axisymmetric())
    }

    fn is_analytic_x(&self) -> bool {
        match self.shifted_remainder() {
            Some((Some(rest), _, _)) => rest.is_analytic_x(),
            _ => false,
        }
    }

    fn is_analytic_k(&self) -> bool {
        self.children.iter().all(|c| c.is_analytic_k())
    }

    fn centroid(&self) -> Result<Vector2<f64>, ProfileError> {
        self.children
            .iter()
            .try_fold(Vector2::zeros(), |sum, c| Ok(sum + c.centroid()?))
    }

    fn flux(&self) -> f64 {
        self.flux_scale * self.flux_product()
    }

    fn set_flux(&mut self, flux: f64) -> Result<(), ProfileError> {
        let product = self.flux_product();
        if product == 0.0 {
            return Err(ProfileError::ZeroFlux {
                operation: "convolution set_flux",
            });
        }
        self.flux_scale = flux / product;
        Ok(())
    }

    /// Positive and negative parts pair up: `(p₁ - n₁)(p₂ - n₂)` has
    /// positive part `p₁p₂ + n₁n₂`.
    fn positive_flux(&self) -> f64 {
        self.signed_parts().0
    }

    fn negative_flux(&self) -> f64 {
        self.signed_parts().1
    }

    /// Shoots `n` photons from every child and pairs them by index. The
    /// second child is paired directly; each further child is paired after
    /// a shuffle so same-index correlations do not accumulate.
    fn shoot(&self, n: usize, ud: &mut dyn UniformDeviate) -> Result<PhotonArray, ProfileError> {
        let (first, rest) = self.children.split_first().ok_or(ProfileError::Unsupported {
            operation: "shoot",
            profile: "empty Convolve",
        })?;
        debug!("convolution shoot: {n} photons through {} children", self.children.len());

        let mut photons = first.shoot(n, ud)?;
        for (i, child) in rest.iter().enumerate() {
            let other = child.shoot(n, ud)?;
            if i == 0 {
                photons.convolve(&other)?;
            } else {
                photons.convolve_shuffle(&other, ud)?;
            }
        }
        photons.scale_flux(self.flux_scale);
        Ok(photons)
    }

    fn fill_k_grid(&self, grid: &mut KGrid) {
        grid.array_mut().fill(Complex64::new(self.flux_scale, 0.0));
        let mut scratch = KGrid::new(grid.size(), grid.dk());
        for child in &self.children {
            child.fill_k_grid(&mut scratch);
            *grid.array_mut() *= scratch.array();
        }
    }
}

impl Convolve {
    fn signed_parts(&self) -> (f64, f64) {
        let (mut pos, mut neg) = (1.0, 0.0);
        for child in &self.children {
            let (p, n) = (child.positive_flux(), child.negative_flux());
            (pos, neg) = (pos * p + neg * n, pos * n + neg * p);
        }
        if self.flux_scale >= 0.0 {
            (self.flux_scale * pos, self.flux_scale * neg)
        } else {
            (-self.flux_scale * neg, -self.flux_scale * pos)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{BoxProfile, DeltaFunction, Gaussian};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn gaussian(flux: f64, sigma: f64) -> SbProfile {
        Gaussian::new(flux, sigma).unwrap().into()
    }

    #[test]
    fn test_gaussians_compose() {
        let conv = Convolve::from_profiles(vec![gaussian(2.0, 0.6), gaussian(1.5, 0.8)]);
        let combined = Gaussian::new(3.0, 1.0).unwrap();
        assert_relative_eq!(conv.flux(), 3.0, epsilon = 1e-12);
        for k in [0.0, 0.5, 1.7] {
            let kv = Vector2::new(k, 0.3);
            assert_relative_eq!(conv.k_value(kv).re, combined.k_value(kv).re, epsilon = 1e-12);
        }
        assert!(conv.max_k() <= gaussian(1.0, 0.6).max_k());
        assert!(conv.x_value(Vector2::zeros()).is_err());
    }

    #[test]
    fn test_point_source_shift() {
        let delta: SbProfile = DeltaFunction::new(2.0).unwrap().into();
        let conv = Convolve::from_profiles(vec![
            gaussian(1.0, 1.0),
            delta.shift(1.0, -0.5).unwrap(),
        ]);
        assert!(conv.is_analytic_x());
        let g = Gaussian::new(2.0, 1.0).unwrap();
        let p = Vector2::new(0.3, 0.2);
        assert_relative_eq!(
            conv.x_value(p).unwrap(),
            g.x_value(p - Vector2::new(1.0, -0.5)).unwrap(),
            epsilon = 1e-14
        );
        assert_relative_eq!(conv.centroid().unwrap().x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_all_points() {
        let a: SbProfile = DeltaFunction::new(2.0).unwrap().into();
        let b = a.shift(0.5, 0.0).unwrap();
        let conv = Convolve::from_profiles(vec![a, b]);
        let (flux, at) = conv.point_source().unwrap();
        assert_relative_eq!(flux, 4.0);
        assert_relative_eq!(at.x, 0.5);
        assert!(!conv.is_analytic_x());
        assert_eq!(conv.x_value(Vector2::new(0.5, 0.0)).unwrap(), MOCK_INF);
        assert_eq!(conv.x_value(Vector2::zeros()).unwrap(), 0.0);
    }

    #[test]
    fn test_set_flux() {
        let mut conv = Convolve::from_profiles(vec![gaussian(2.0, 1.0), gaussian(3.0, 1.0)]);
        conv.set_flux(1.0).unwrap();
        assert_relative_eq!(conv.flux(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(conv.flux_scale(), 1.0 / 6.0, epsilon = 1e-12);

        let mut zero = Convolve::from_profiles(vec![gaussian(0.0, 1.0)]);
        assert!(matches!(zero.set_flux(1.0), Err(ProfileError::ZeroFlux { .. })));
    }

    #[test]
    fn test_signed_parts() {
        let mut conv = Convolve::from_profiles(vec![gaussian(-2.0, 1.0), gaussian(3.0, 1.0)]);
        assert_relative_eq!(conv.positive_flux(), 0.0);
        assert_relative_eq!(conv.negative_flux(), 6.0);
        conv.set_flux(6.0).unwrap();
        assert_relative_eq!(conv.positive_flux(), 6.0, epsilon = 1e-12);
        assert_relative_eq!(conv.negative_flux(), 0.0);
    }

    #[test]
    fn test_shoot_flux_and_width() {
        let conv = Convolve::from_profiles(vec![
            gaussian(2.0, 0.6),
            gaussian(1.0, 0.8),
            BoxProfile::new(0.2, 0.0, 1.0).unwrap().into(),
        ]);
        let mut rng = StdRng::seed_from_u64(21);
        let n = 20_000;
        let photons = conv.shoot(n, &mut rng).unwrap();
        assert_eq!(photons.len(), n);
        assert_relative_eq!(photons.total_flux(), 2.0, epsilon = 1e-9);
        // Variances add: 2 (0.36 + 0.64) + 2 (0.04 / 12)
        let mean_rsq = photons.iter().map(|(x, y, _)| x * x + y * y).sum::<f64>() / n as f64;
        assert_relative_eq!(mean_rsq, 2.0 + 0.08 / 12.0, max_relative = 0.03);
    }

    #[test]
    fn test_empty() {
        let conv = Convolve::new();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(conv.shoot(5, &mut rng).is_err());
        assert_eq!(conv.flux(), 1.0);
    }
}

//! Point source at the origin.

use nalgebra::Vector2;
use rustfft::num_complex::Complex64;

use crate::deviate::UniformDeviate;
use crate::error::{require_finite, ProfileError};
use crate::photon::PhotonArray;

use super::{Profile, MOCK_INF};

/// Dirac delta carrying `flux`.
///
/// Its Fourier transform is flat, so it has no band limit and no real-space
/// sampling; it is meant to be convolved with something smooth.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaFunction {
    flux: f64,
}

impl DeltaFunction {
    pub fn new(flux: f64) -> Result<Self, ProfileError> {
        Ok(Self {
            flux: require_finite("flux", flux)?,
        })
    }
}

impl Profile for DeltaFunction {
    fn x_value(&self, p: Vector2<f64>) -> Result<f64, ProfileError> {
        if p.x == 0.0 && p.y == 0.0 {
            Ok(if self.flux >= 0.0 { MOCK_INF } else { -MOCK_INF })
        } else {
            Ok(0.0)
        }
    }

    fn k_value(&self, _k: Vector2<f64>) -> Complex64 {
        Complex64::new(self.flux, 0.0)
    }

    fn max_k(&self) -> f64 {
        MOCK_INF
    }

    fn step_k(&self) -> f64 {
        MOCK_INF
    }

    fn is_axisymmetric(&self) -> bool {
        true
    }

    fn is_analytic_x(&self) -> bool {
        false
    }

    fn centroid(&self) -> Result<Vector2<f64>, ProfileError> {
        Ok(Vector2::zeros())
    }

    fn flux(&self) -> f64 {
        self.flux
    }

    fn set_flux(&mut self, flux: f64) -> Result<(), ProfileError> {
        self.flux = require_finite("flux", flux)?;
        Ok(())
    }

    /// Consumes no deviates.
    fn shoot(&self, n: usize, _ud: &mut dyn UniformDeviate) -> Result<PhotonArray, ProfileError> {
        let mut photons = PhotonArray::new(n);
        if n > 0 {
            let flux_per_photon = self.flux / n as f64;
            for i in 0..n {
                photons.set_photon(i, 0.0, 0.0, flux_per_photon);
            }
        }
        Ok(photons)
    }
}

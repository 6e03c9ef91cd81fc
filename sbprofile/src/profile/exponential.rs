//! Exponential disk, `I(r) ∝ exp(-r / r0)`.

use std::f64::consts::PI;

use nalgebra::Vector2;
use rustfft::num_complex::Complex64;

use crate::deviate::UniformDeviate;
use crate::error::{require_finite, require_positive, ProfileError};
use crate::params::GsParams;
use crate::photon::PhotonArray;
use crate::radial::shoot_isotropic;

use super::Profile;

const NEWTON_ITERATIONS: usize = 60;
const NEWTON_TOLERANCE: f64 = 1e-12;

/// Exponential disk with total `flux` and scale length `r0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Exponential {
    flux: f64,
    r0: f64,
    params: GsParams,
}

impl Exponential {
    pub fn new(flux: f64, r0: f64) -> Result<Self, ProfileError> {
        Self::with_params(flux, r0, &GsParams::default())
    }

    pub fn with_params(flux: f64, r0: f64, params: &GsParams) -> Result<Self, ProfileError> {
        Ok(Self {
            flux: require_finite("flux", flux)?,
            r0: require_positive("r0", r0)?,
            params: *params,
        })
    }

    pub fn scale_radius(&self) -> f64 {
        self.r0
    }
}

/// Radius in units of `r0` enclosing `fraction` of the flux.
///
/// Solves `(1 + R) e^-R = 1 - fraction` by Newton iteration, falling back to
/// bisection when a step leaves the bracket.
fn enclosed_radius(fraction: f64) -> f64 {
    let target = 1.0 - fraction;
    if target >= 1.0 {
        return 0.0;
    }
    let residual = |r: f64| (1.0 + r) * (-r).exp() - target;

    // (1 + R) e^-R <= 1.25 e^(-R/2), which bounds the root from above
    let mut lo = 0.0;
    let mut hi = 2.0 * (1.25 / target).ln();
    let mut r = (2.0 * fraction).sqrt().min(hi);
    for _ in 0..NEWTON_ITERATIONS {
        let f = residual(r);
        if f > 0.0 {
            lo = r;
        } else {
            hi = r;
        }
        let slope = -r * (-r).exp();
        let mut next = if slope != 0.0 { r - f / slope } else { 0.5 * (lo + hi) };
        if !(next > lo && next < hi) {
            next = 0.5 * (lo + hi);
        }
        if (next - r).abs() < NEWTON_TOLERANCE * (1.0 + r) {
            return next;
        }
        r = next;
    }
    r
}

impl Profile for Exponential {
    fn x_value(&self, p: Vector2<f64>) -> Result<f64, ProfileError> {
        let r = p.norm();
        Ok(self.flux / (2.0 * PI * self.r0 * self.r0) * (-r / self.r0).exp())
    }

    fn k_value(&self, k: Vector2<f64>) -> Complex64 {
        let ksq = k.norm_squared() * self.r0 * self.r0;
        let temp = 1.0 + ksq;
        Complex64::new(self.flux / (temp * temp.sqrt()), 0.0)
    }

    /// Where `(1 + k²r0²)^-1.5` falls to the threshold, and at least 10/r0.
    fn max_k(&self) -> f64 {
        10.0_f64.max(self.params.maxk_threshold.powf(-1.0 / 3.0)) / self.r0
    }

    /// Radius enclosing `1 - alias_threshold` of the flux, at least 6 r0.
    fn step_k(&self) -> f64 {
        let log_thr = -self.params.alias_threshold.ln();
        let mut r = log_thr;
        for _ in 0..3 {
            r = log_thr + (1.0 + r).ln();
        }
        PI / (r.max(6.0) * self.r0)
    }

    fn is_axisymmetric(&self) -> bool {
        true
    }

    fn is_analytic_x(&self) -> bool {
        true
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

    /// Unit-disk draw (about 2.55 deviates) then Newton inversion of the
    /// enclosed-flux curve.
    fn shoot(&self, n: usize, ud: &mut dyn UniformDeviate) -> Result<PhotonArray, ProfileError> {
        Ok(shoot_isotropic(n, self.flux, ud, |u| self.r0 * enclosed_radius(u)))
    }
}

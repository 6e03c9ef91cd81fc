//! Uniform rectangle (top-hat), most often the pixel response.

use std::f64::consts::PI;

use nalgebra::Vector2;
use rustfft::num_complex::Complex64;

use crate::deviate::UniformDeviate;
use crate::error::{require_finite, require_positive, ProfileError};
use crate::params::GsParams;
use crate::photon::PhotonArray;

use super::Profile;

/// `sin(x) / x`, with the removable singularity filled in.
fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-4 {
        1.0 - x * x / 6.0
    } else {
        x.sin() / x
    }
}

/// Box of width `xw` and height `yw` centred on the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxProfile {
    xw: f64,
    yw: f64,
    flux: f64,
    norm: f64,
    params: GsParams,
}

impl BoxProfile {
    /// A `yw` of 0 makes the box square.
    pub fn new(xw: f64, yw: f64, flux: f64) -> Result<Self, ProfileError> {
        Self::with_params(xw, yw, flux, &GsParams::default())
    }

    pub fn with_params(
        xw: f64,
        yw: f64,
        flux: f64,
        params: &GsParams,
    ) -> Result<Self, ProfileError> {
        let xw = require_positive("xw", xw)?;
        let yw = if yw == 0.0 { xw } else { require_positive("yw", yw)? };
        let flux = require_finite("flux", flux)?;
        Ok(Self {
            xw,
            yw,
            flux,
            norm: flux / (xw * yw),
            params: *params,
        })
    }

    pub fn width(&self) -> f64 {
        self.xw
    }

    pub fn height(&self) -> f64 {
        self.yw
    }
}

impl Profile for BoxProfile {
    fn x_value(&self, p: Vector2<f64>) -> Result<f64, ProfileError> {
        if p.x.abs() < 0.5 * self.xw && p.y.abs() < 0.5 * self.yw {
            Ok(self.norm)
        } else {
            Ok(0.0)
        }
    }

    fn k_value(&self, k: Vector2<f64>) -> Complex64 {
        let value = self.flux * sinc(0.5 * k.x * self.xw) * sinc(0.5 * k.y * self.yw);
        Complex64::new(value, 0.0)
    }

    /// The sinc envelope `2/(k w)` reaches the threshold at `2/(thr w)`.
    fn max_k(&self) -> f64 {
        2.0 / (self.params.maxk_threshold * self.xw.max(self.yw))
    }

    fn step_k(&self) -> f64 {
        PI / self.xw.max(self.yw) / 2.0
    }

    fn is_axisymmetric(&self) -> bool {
        false
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
        self.norm = self.flux / (self.xw * self.yw);
        Ok(())
    }

    /// Two deviates per photon, one per axis.
    fn shoot(&self, n: usize, ud: &mut dyn UniformDeviate) -> Result<PhotonArray, ProfileError> {
        let mut photons = PhotonArray::new(n);
        if n == 0 {
            return Ok(photons);
        }
        let flux_per_photon = self.flux / n as f64;
        for i in 0..n {
            let x = (ud.next_uniform() - 0.5) * self.xw;
            let y = (ud.next_uniform() - 0.5) * self.yw;
            photons.set_photon(i, x, y, flux_per_photon);
        }
        Ok(photons)
    }
}

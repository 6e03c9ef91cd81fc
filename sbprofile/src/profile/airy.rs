//! Airy point spread function of a circular aperture with optional central
//! obscuration.
//!
//! # Physics Background
//!
//! For an aperture of diameter `D` (in units of wavelength, so `D` carries
//! inverse length) and linear obscuration `ε`, the image-plane intensity is
//!
//! ```text
//! I(r) = I₀ · [(2J₁(ν)/ν − ε² · 2J₁(εν)/(εν)) / (1 − ε²)]²,   ν = π D r
//! ```
//!
//! with `I₀ = π D² (1 − ε²) / 4` per unit flux. Its Fourier transform is the
//! autocorrelation of the annular pupil, which is exact geometry: the overlap
//! area of two annuli whose centres are `k / (π D)` apart, in units where the
//! outer pupil radius is 1. The transform vanishes beyond `k = 2π D`.

use std::f64::consts::PI;
use std::sync::Arc;

use log::debug;
use nalgebra::Vector2;
use once_cell::sync::Lazy;
use rustfft::num_complex::Complex64;

use shape_math::{bisect, j1};

use crate::cache::{ParamKey, ShapeCache};
use crate::deviate::UniformDeviate;
use crate::error::{require_finite, require_positive, ProfileError};
use crate::params::GsParams;
use crate::photon::PhotonArray;
use crate::radial::{shoot_isotropic, RadialSampler};

use super::Profile;

/// Radial samples per unit of `r·D` in the photon sampler.
const SAMPLES_PER_UNIT: f64 = 40.0;

type AiryKey = (ParamKey, ParamKey);

static AIRY_CACHE: Lazy<ShapeCache<AiryKey, AiryInfo>> =
    Lazy::new(|| ShapeCache::with_default_capacity("airy"));

/// Area of the part of a circle of radius `r` beyond a chord at distance `h`
/// from its centre.
fn chord(r: f64, h: f64) -> f64 {
    if h >= r {
        return 0.0;
    }
    if h <= -r {
        return PI * r * r;
    }
    r * r * (h / r).acos() - h * (r * r - h * h).sqrt()
}

/// Overlap area of circles of radii `r1`, `r2` with centres `d` apart.
fn circle_intersection(r1: f64, r2: f64, d: f64) -> f64 {
    if d >= r1 + r2 {
        return 0.0;
    }
    if d <= (r1 - r2).abs() {
        let r = r1.min(r2);
        return PI * r * r;
    }
    let h1 = (d * d + r1 * r1 - r2 * r2) / (2.0 * d);
    chord(r1, h1) + chord(r2, d - h1)
}

/// Overlap area of two annuli (outer radius 1, inner radius `inner`) with
/// centres `t` apart.
fn annuli_intersect(inner: f64, t: f64) -> f64 {
    circle_intersection(1.0, 1.0, t) - 2.0 * circle_intersection(1.0, inner, t)
        + circle_intersection(inner, inner, t)
}

/// Field amplitude at `ν = π D r`, normalized to 1 at the centre.
fn amplitude(nu: f64, obscuration: f64) -> f64 {
    if nu < 1e-10 {
        return 1.0;
    }
    let mut amp = 2.0 * j1(nu) / nu;
    if obscuration > 0.0 {
        let e_nu = obscuration * nu;
        amp -= obscuration * obscuration * 2.0 * j1(e_nu) / e_nu;
    }
    amp / (1.0 - obscuration * obscuration)
}

/// `stepK / D`: the enclosed-flux tail of the Airy pattern falls as
/// `1/(π² ρ)`, cut at the alias threshold, capped at five rings.
fn scaled_step_k(obscuration: f64, alias_threshold: f64) -> f64 {
    (alias_threshold * 0.5 * PI.powi(3) * (1.0 - obscuration)).min(PI / 5.0)
}

/// Obscuration-dependent precomputations, in units where `D = 1`.
#[derive(Debug)]
pub struct AiryInfo {
    obscuration: f64,
    sampler: RadialSampler,
    /// Half width at half maximum in units of `1/D`
    half_max_radius: f64,
    /// First dark ring in units of `1/D`
    first_zero: f64,
}

impl AiryInfo {
    fn get(obscuration: f64, params: &GsParams) -> Result<Arc<AiryInfo>, ProfileError> {
        let key = (
            ParamKey::from(obscuration),
            ParamKey::from(params.alias_threshold),
        );
        AIRY_CACHE.get_or_try_insert_with(key, || AiryInfo::build(obscuration, params))
    }

    fn build(obscuration: f64, params: &GsParams) -> Result<Self, ProfileError> {
        let intensity = |rho: f64| amplitude(PI * rho, obscuration).powi(2);
        let amp = |rho: f64| amplitude(PI * rho, obscuration);

        let rho_max = PI / scaled_step_k(obscuration, params.alias_threshold);
        let n_samples = (rho_max * SAMPLES_PER_UNIT).ceil() as usize;
        let radii: Vec<f64> = (0..=n_samples)
            .map(|i| rho_max * i as f64 / n_samples as f64)
            .collect();
        let sampler = RadialSampler::from_profile(&radii, intensity)?;

        // Intensity falls through one half before the amplitude first crosses zero
        let half_max_radius = bisect(|rho| Ok(intensity(rho) - 0.5), 0.0, 1.0, 1e-10)?;
        let first_zero = bisect(|rho| Ok(amp(rho)), 1.0, 1.6, 1e-10)
            .or_else(|_| bisect(|rho| Ok(amp(rho)), 0.5, 1.0, 1e-10))?;

        debug!(
            "built Airy sampler obscuration={obscuration}: {} samples to r·D = {rho_max:.2}",
            radii.len()
        );
        Ok(Self {
            obscuration,
            sampler,
            half_max_radius,
            first_zero,
        })
    }
}

/// Airy profile for aperture `d` (inverse length), linear `obscuration` in
/// `[0, 1)` and total `flux`.
#[derive(Debug, Clone)]
pub struct Airy {
    d: f64,
    flux: f64,
    /// Peak surface brightness per unit flux
    norm: f64,
    params: GsParams,
    info: Arc<AiryInfo>,
}

impl Airy {
    pub fn new(d: f64, obscuration: f64, flux: f64) -> Result<Self, ProfileError> {
        Self::with_params(d, obscuration, flux, &GsParams::default())
    }

    pub fn with_params(
        d: f64,
        obscuration: f64,
        flux: f64,
        params: &GsParams,
    ) -> Result<Self, ProfileError> {
        let d = require_positive("D", d)?;
        let flux = require_finite("flux", flux)?;
        if !(0.0..1.0).contains(&obscuration) {
            return Err(ProfileError::invalid(
                "obscuration",
                obscuration,
                "must lie in [0, 1)",
            ));
        }
        let info = AiryInfo::get(obscuration, params)?;
        Ok(Self {
            d,
            flux,
            norm: PI * d * d * (1.0 - obscuration * obscuration) / 4.0,
            params: *params,
            info,
        })
    }

    pub fn obscuration(&self) -> f64 {
        self.info.obscuration
    }

    /// Full width at half maximum.
    pub fn fwhm(&self) -> f64 {
        2.0 * self.info.half_max_radius / self.d
    }

    /// Radius of the first dark ring.
    pub fn first_zero(&self) -> f64 {
        self.info.first_zero / self.d
    }
}

impl Profile for Airy {
    fn x_value(&self, p: Vector2<f64>) -> Result<f64, ProfileError> {
        let nu = PI * self.d * p.norm();
        let amp = amplitude(nu, self.info.obscuration);
        Ok(self.flux * self.norm * amp * amp)
    }

    fn k_value(&self, k: Vector2<f64>) -> Complex64 {
        let t = k.norm() / (PI * self.d);
        let eps = self.info.obscuration;
        let mtf = annuli_intersect(eps, t) / (PI * (1.0 - eps * eps));
        Complex64::new(self.flux * mtf, 0.0)
    }

    /// The pupil autocorrelation is exactly zero beyond twice the pupil radius.
    fn max_k(&self) -> f64 {
        2.0 * PI * self.d
    }

    fn step_k(&self) -> f64 {
        scaled_step_k(self.info.obscuration, self.params.alias_threshold) * self.d
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

    /// Unit-disk draw (about 2.55 deviates) through the tabulated enclosed
    /// flux, truncated where the tail drops below the alias threshold.
    fn shoot(&self, n: usize, ud: &mut dyn UniformDeviate) -> Result<PhotonArray, ProfileError> {
        let sampler = &self.info.sampler;
        let inv_d = 1.0 / self.d;
        Ok(shoot_isotropic(n, self.flux, ud, |u| sampler.radius(u) * inv_d))
    }
}

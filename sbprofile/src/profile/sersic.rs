//! Sersic profile, `I(r) ∝ exp(-b (r / re)^(1/n))`.
//!
//! The Fourier transform has no closed form. For each Sersic index a
//! [`SersicInfo`] is built once and shared through a process-wide cache. It
//! holds the normalization, the low-k Taylor coefficients, a Hankel-transform
//! table in `ln k`, the band limits and a radial photon sampler, all in units
//! of the half-light radius.

use std::f64::consts::PI;
use std::sync::Arc;

use log::{debug, info};
use nalgebra::Vector2;
use once_cell::sync::Lazy;
use rustfft::num_complex::Complex64;

use shape_math::special::{gamma_p, gamma_p_inverse, ln_gamma};
use shape_math::{hankel0, Interpolant, Table};

use crate::cache::{ParamKey, ShapeCache};
use crate::deviate::UniformDeviate;
use crate::error::{require_finite, require_positive, ProfileError};
use crate::params::GsParams;
use crate::photon::PhotonArray;
use crate::radial::{shoot_isotropic, RadialSampler};

use super::Profile;

/// Supported range of the Sersic index.
const MIN_INDEX: f64 = 0.3;
const MAX_INDEX: f64 = 6.2;

/// Flux fraction beyond the Hankel integration radius.
const INTEGRATION_TAIL: f64 = 1e-6;

/// Flux fraction beyond the largest radius photons are drawn at.
const SHOOT_TAIL: f64 = 1e-5;

/// Accuracy required of the low-k Taylor expansion.
const TAYLOR_ACCURACY: f64 = 1e-5;

/// Consecutive sub-threshold samples that end the table.
const TAIL_SAMPLES: usize = 5;

/// Largest number of quadrature panels spent on one transform; beyond the
/// matching wavenumber the cusp power law is used.
const PANEL_BUDGET: f64 = 100_000.0;

const SAMPLER_POINTS: usize = 2000;

type SersicKey = (ParamKey, ParamKey, ParamKey, ParamKey);

static SERSIC_CACHE: Lazy<ShapeCache<SersicKey, SersicInfo>> =
    Lazy::new(|| ShapeCache::with_default_capacity("sersic"));

/// Derived quantities for one Sersic index, in units of the half-light radius.
#[derive(Debug)]
pub struct SersicInfo {
    n: f64,
    /// `P(2n, b) = 1/2`
    b: f64,
    /// Central surface brightness of a unit-flux, unit-`re` profile
    norm: f64,
    kderiv2: f64,
    kderiv4: f64,
    ksq_min: f64,
    table: Table,
    /// Asymptotic log-log slope of the transform, `-(2 + 1/n)`
    tail_slope: f64,
    max_k: f64,
    step_k: f64,
    sampler: RadialSampler,
}

impl SersicInfo {
    /// Shared info for index `n`, built on first use.
    pub fn get(n: f64, params: &GsParams) -> Result<Arc<SersicInfo>, ProfileError> {
        let key = (
            ParamKey::from(n),
            ParamKey::from(params.maxk_threshold),
            ParamKey::from(params.alias_threshold),
            ParamKey::from(params.table_spacing),
        );
        SERSIC_CACHE.get_or_try_insert_with(key, || SersicInfo::build(n, params))
    }

    fn build(n: f64, params: &GsParams) -> Result<Self, ProfileError> {
        let two_n = 2.0 * n;
        let b = gamma_p_inverse(two_n, 0.5)?;
        let ln_b = b.ln();
        let ln_gamma_2n = ln_gamma(two_n);

        let norm = (two_n * ln_b - (2.0 * PI * n).ln() - ln_gamma_2n).exp();
        let kderiv2 = -(ln_gamma(4.0 * n) - ln_gamma_2n - two_n * ln_b).exp() / 4.0;
        let kderiv4 = (ln_gamma(6.0 * n) - ln_gamma_2n - 4.0 * n * ln_b).exp() / 64.0;
        let kderiv6 = (ln_gamma(8.0 * n) - ln_gamma_2n - 6.0 * n * ln_b).exp() / 2304.0;
        let ksq_min = (TAYLOR_ACCURACY / kderiv6).cbrt();

        let radius_enclosing = |fraction: f64| -> Result<f64, ProfileError> {
            Ok((gamma_p_inverse(two_n, fraction)? / b).powf(n))
        };
        let r_integrate = radius_enclosing(1.0 - INTEGRATION_TAIL)?;
        let profile = |s: f64| norm * (-b * s.powf(1.0 / n)).exp();

        // Hankel table from the edge of the Taylor region outwards
        let dlnk = params.table_spacing;
        let threshold = params.maxk_threshold;
        let k_budget = PANEL_BUDGET * std::f64::consts::FRAC_PI_2 / r_integrate;
        let mut ln_k = 0.5 * ksq_min.ln();
        let mut args = Vec::new();
        let mut values = Vec::new();
        let mut below = 0;
        let mut max_k = None;
        loop {
            let k = ln_k.exp();
            let value = hankel0(profile, k, r_integrate);
            args.push(ln_k);
            values.push(value);

            if value.abs() < threshold {
                if below == 0 {
                    max_k = Some(k);
                }
                below += 1;
            } else {
                below = 0;
                max_k = None;
            }
            if (below >= TAIL_SAMPLES || k > k_budget) && args.len() >= 4 {
                break;
            }
            ln_k += dlnk;
        }
        let tail_slope = -(2.0 + 1.0 / n);
        let max_k = match max_k {
            Some(k) => k,
            None => {
                // Table stopped at the panel budget: follow the power law
                let k_end = ln_k.exp();
                let f_end = values.last().copied().unwrap_or(threshold).abs();
                k_end * (f_end / threshold).powf(-1.0 / tail_slope)
            }
        };

        let step_k = PI / radius_enclosing(1.0 - params.alias_threshold)?;

        // Radial sampler on a grid in the gamma variable x = b s^(1/n),
        // packed towards the centre
        let x_max = gamma_p_inverse(two_n, 1.0 - SHOOT_TAIL)?;
        let mut radii = Vec::with_capacity(SAMPLER_POINTS + 1);
        let mut cdf = Vec::with_capacity(SAMPLER_POINTS + 1);
        for i in 0..=SAMPLER_POINTS {
            let t = i as f64 / SAMPLER_POINTS as f64;
            let x = x_max * t * t;
            radii.push((x / b).powf(n));
            cdf.push(gamma_p(two_n, x)?);
        }
        let sampler = RadialSampler::from_cdf(&radii, &cdf)?;

        let table = Table::new(args, values, Interpolant::Spline)?;
        info!(
            "built Sersic table n={n}: {} samples, b={b:.5}, maxK={max_k:.4}, stepK={step_k:.5}",
            table.size()
        );

        Ok(Self {
            n,
            b,
            norm,
            kderiv2,
            kderiv4,
            ksq_min,
            table,
            tail_slope,
            max_k,
            step_k,
            sampler,
        })
    }

    pub fn n(&self) -> f64 {
        self.n
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    /// Surface brightness of the unit profile at radius `s`.
    fn x_value(&self, s: f64) -> f64 {
        self.norm * (-self.b * s.powf(1.0 / self.n)).exp()
    }

    /// Transform of the unit profile at squared wavenumber `ksq`.
    fn k_value(&self, ksq: f64) -> f64 {
        if ksq < self.ksq_min {
            return 1.0 + ksq * (self.kderiv2 + ksq * self.kderiv4);
        }
        let ln_k = 0.5 * ksq.ln();
        if ln_k <= self.table.arg_max() {
            return self.table.eval(ln_k).unwrap_or(0.0);
        }
        let ln_end = self.table.arg_max();
        let f_end = self.table.values().last().copied().unwrap_or(0.0);
        f_end * (self.tail_slope * (ln_k - ln_end)).exp()
    }
}

/// Sersic profile of index `n`, total `flux` and half-light radius `re`.
#[derive(Debug, Clone)]
pub struct Sersic {
    flux: f64,
    re: f64,
    info: Arc<SersicInfo>,
}

impl Sersic {
    pub fn new(n: f64, flux: f64, re: f64) -> Result<Self, ProfileError> {
        Self::with_params(n, flux, re, &GsParams::default())
    }

    pub fn with_params(
        n: f64,
        flux: f64,
        re: f64,
        params: &GsParams,
    ) -> Result<Self, ProfileError> {
        if !(MIN_INDEX..=MAX_INDEX).contains(&n) {
            return Err(ProfileError::invalid(
                "n",
                n,
                "Sersic index must lie in [0.3, 6.2]",
            ));
        }
        let flux = require_finite("flux", flux)?;
        let re = require_positive("re", re)?;
        let info = SersicInfo::get(n, params)?;
        debug!("Sersic n={n} flux={flux} re={re}");
        Ok(Self { flux, re, info })
    }

    /// De Vaucouleurs profile: the `n = 4` Sersic.
    pub fn de_vaucouleurs(flux: f64, re: f64) -> Result<Self, ProfileError> {
        Self::new(4.0, flux, re)
    }

    pub fn n(&self) -> f64 {
        self.info.n
    }

    pub fn half_light_radius(&self) -> f64 {
        self.re
    }

    /// Shared shape-parameter entry.
    pub fn info(&self) -> &Arc<SersicInfo> {
        &self.info
    }
}

impl Profile for Sersic {
    fn x_value(&self, p: Vector2<f64>) -> Result<f64, ProfileError> {
        let s = p.norm() / self.re;
        Ok(self.flux * self.info.x_value(s) / (self.re * self.re))
    }

    fn k_value(&self, k: Vector2<f64>) -> Complex64 {
        let ksq = k.norm_squared() * self.re * self.re;
        Complex64::new(self.flux * self.info.k_value(ksq), 0.0)
    }

    fn max_k(&self) -> f64 {
        self.info.max_k / self.re
    }

    fn step_k(&self) -> f64 {
        self.info.step_k / self.re
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

    /// Unit-disk draw (about 2.55 deviates) mapped through the tabulated
    /// inverse of the enclosed flux.
    fn shoot(&self, n: usize, ud: &mut dyn UniformDeviate) -> Result<PhotonArray, ProfileError> {
        let sampler = &self.info.sampler;
        Ok(shoot_isotropic(n, self.flux, ud, |u| self.re * sampler.radius(u)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Exponential;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_index_one_matches_exponential() {
        let r0 = 0.8;
        let b = gamma_p_inverse(2.0, 0.5).unwrap();
        let sersic = Sersic::new(1.0, 2.0, b * r0).unwrap();
        let exponential = Exponential::new(2.0, r0).unwrap();

        for k in [0.0, 0.01, 0.3, 1.0, 3.0, 8.0] {
            let kv = Vector2::new(k, 0.0);
            assert_relative_eq!(
                sersic.k_value(kv).re,
                exponential.k_value(kv).re,
                epsilon = 2e-4
            );
        }
        let p = Vector2::new(0.3, 0.4);
        assert_relative_eq!(
            sersic.x_value(p).unwrap(),
            exponential.x_value(p).unwrap(),
            max_relative = 1e-8
        );
    }

    #[test]
    fn test_cache_shares_info() {
        let a = Sersic::new(2.5, 1.0, 1.0).unwrap();
        let b = Sersic::new(2.5, 3.0, 0.5).unwrap();
        assert!(Arc::ptr_eq(a.info(), b.info()));
        assert_eq!(a.n(), 2.5);
    }

    #[test]
    fn test_de_vaucouleurs() {
        let dv = Sersic::de_vaucouleurs(1.0, 1.0).unwrap();
        assert_eq!(dv.n(), 4.0);
        assert_relative_eq!(dv.info().b(), 7.669_249, epsilon = 1e-5);
        assert_relative_eq!(dv.k_value(Vector2::zeros()).re, 1.0, epsilon = 1e-12);
        // Strongly cusped: needs far more bandwidth than an exponential
        assert!(dv.max_k() > 50.0);
        // The transform falls monotonically across the table
        let k1 = dv.k_value(Vector2::new(1.0, 0.0)).re;
        let k2 = dv.k_value(Vector2::new(5.0, 0.0)).re;
        assert!(k1 > k2 && k2 > 0.0);
    }

    #[test]
    fn test_invalid_index() {
        assert!(Sersic::new(0.1, 1.0, 1.0).is_err());
        assert!(Sersic::new(7.0, 1.0, 1.0).is_err());
        assert!(Sersic::new(2.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_shoot_half_light_radius() {
        let sersic = Sersic::new(2.0, 1.0, 1.5).unwrap();
        let mut rng = StdRng::seed_from_u64(2024);
        let n = 20_000;
        let photons = sersic.shoot(n, &mut rng).unwrap();
        assert_relative_eq!(photons.total_flux(), 1.0, epsilon = 1e-9);

        let mut radii: Vec<f64> = photons.iter().map(|(x, y, _)| x.hypot(y)).collect();
        radii.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let median = radii[n / 2];
        assert_relative_eq!(median, 1.5, max_relative = 0.03);
    }
}

//! Truncated Moffat profile, `I(r) ∝ (1 + (r / rD)²)^-β` for `r < R_trunc`.
//!
//! Lengths inside [`MoffatInfo`] are in units of the scale radius `rD`. The
//! truncation radius is given in units of the FWHM, so it is a fixed number
//! of `rD` for a given `β` and resizing a profile never rebuilds its table.

use std::f64::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

use log::{debug, info};
use nalgebra::Vector2;
use once_cell::sync::Lazy;
use rustfft::num_complex::Complex64;

use shape_math::integrate::hankel_breakpoints;
use shape_math::{hankel0, integrate_breakpoints, Interpolant, Table};

use crate::cache::{ParamKey, ShapeCache};
use crate::deviate::UniformDeviate;
use crate::error::{require_finite, require_positive, ProfileError};
use crate::params::GsParams;
use crate::photon::PhotonArray;
use crate::radial::shoot_isotropic;

use super::Profile;

const TAYLOR_ACCURACY: f64 = 1e-5;
const TAIL_SAMPLES: usize = 5;
const PANEL_BUDGET: f64 = 100_000.0;

type MoffatKey = (ParamKey, ParamKey, ParamKey, ParamKey, ParamKey);

static MOFFAT_CACHE: Lazy<ShapeCache<MoffatKey, MoffatInfo>> =
    Lazy::new(|| ShapeCache::with_default_capacity("moffat"));

/// Shape-dependent quantities for one `(β, truncation)` pair.
#[derive(Debug)]
struct MoffatInfo {
    beta: f64,
    fwhm_rd: f64,
    max_r_rd: f64,
    /// Fraction of the untruncated flux inside the truncation radius
    flux_factor: f64,
    re_rd: f64,
    norm: f64,
    ksq_min: f64,
    mom2: f64,
    mom4: f64,
    /// Transform against ln k; zero beyond the last sample
    table: Table,
    max_k: f64,
    step_k: f64,
}

impl MoffatInfo {
    fn get(beta: f64, trunc: f64, params: &GsParams) -> Result<Arc<MoffatInfo>, ProfileError> {
        let key = (
            ParamKey::from(beta),
            ParamKey::from(trunc),
            ParamKey::from(params.maxk_threshold),
            ParamKey::from(params.alias_threshold),
            ParamKey::from(params.table_spacing),
        );
        MOFFAT_CACHE.get_or_try_insert_with(key, || MoffatInfo::build(beta, trunc, params))
    }

    fn build(beta: f64, trunc: f64, params: &GsParams) -> Result<Self, ProfileError> {
        let fwhm_rd = 2.0 * (2.0_f64.powf(1.0 / beta) - 1.0).sqrt();
        let max_r_rd = fwhm_rd * trunc;
        let flux_factor = 1.0 - (1.0 + max_r_rd * max_r_rd).powf(1.0 - beta);
        let re_rd = ((1.0 - 0.5 * flux_factor).powf(1.0 / (1.0 - beta)) - 1.0).sqrt();
        let norm = (beta - 1.0) / (PI * flux_factor);

        let profile = |s: f64| norm * (1.0 + s * s).powf(-beta);

        let points = hankel_breakpoints(0.0, max_r_rd);
        let moment = |power: i32| {
            let integrand = |s: f64| 2.0 * PI * s.powi(power + 1) * profile(s);
            integrate_breakpoints(&integrand, &points)
        };
        let mom2 = moment(2);
        let mom4 = moment(4);
        let mom6 = moment(6);
        let ksq_min = (TAYLOR_ACCURACY * 2304.0 / mom6).cbrt();

        let threshold = params.maxk_threshold;
        let k_budget = PANEL_BUDGET * FRAC_PI_2 / max_r_rd;
        let mut ln_k = 0.5 * ksq_min.ln();
        let mut args = Vec::new();
        let mut values = Vec::new();
        let mut below = 0;
        let mut max_k = None;
        loop {
            let k = ln_k.exp();
            let value = hankel0(profile, k, max_r_rd);
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
            ln_k += params.table_spacing;
        }
        let max_k = max_k.unwrap_or_else(|| ln_k.exp());

        // Radius enclosing all but the alias fraction
        let u = 1.0 - params.alias_threshold;
        let r_alias = ((1.0 - u * flux_factor).powf(1.0 / (1.0 - beta)) - 1.0).sqrt();
        let step_k = PI / r_alias.min(max_r_rd);

        let table = Table::new(args, values, Interpolant::Spline)?;
        info!(
            "built Moffat table beta={beta} trunc={trunc}: {} samples, maxK={max_k:.4}, stepK={step_k:.5}",
            table.size()
        );

        Ok(Self {
            beta,
            fwhm_rd,
            max_r_rd,
            flux_factor,
            re_rd,
            norm,
            ksq_min,
            mom2,
            mom4,
            table,
            max_k,
            step_k,
        })
    }

    fn x_value(&self, s_sq: f64) -> f64 {
        if s_sq > self.max_r_rd * self.max_r_rd {
            0.0
        } else {
            self.norm * (1.0 + s_sq).powf(-self.beta)
        }
    }

    fn k_value(&self, ksq: f64) -> f64 {
        if ksq < self.ksq_min {
            return 1.0 - ksq * (self.mom2 / 4.0 - ksq * self.mom4 / 64.0);
        }
        let ln_k = 0.5 * ksq.ln();
        if ln_k > self.table.arg_max() {
            return 0.0;
        }
        self.table.eval(ln_k).unwrap_or(0.0)
    }

    /// Radius in `rD` enclosing fraction `u` of the truncated flux.
    fn enclosed_radius(&self, u: f64) -> f64 {
        let s_sq = (1.0 - u * self.flux_factor).powf(1.0 / (1.0 - self.beta)) - 1.0;
        s_sq.max(0.0).sqrt().min(self.max_r_rd)
    }
}

/// Moffat profile with index `beta`, truncated at `truncation_fwhm` FWHMs.
#[derive(Debug, Clone)]
pub struct Moffat {
    flux: f64,
    rd: f64,
    info: Arc<MoffatInfo>,
}

impl Moffat {
    /// Build from the half-light radius `re`.
    ///
    /// # Errors
    /// `InvalidParameter` unless `beta > 1`, `truncation_fwhm > 0` and
    /// `re > 0`.
    pub fn new(beta: f64, truncation_fwhm: f64, flux: f64, re: f64) -> Result<Self, ProfileError> {
        Self::with_params(beta, truncation_fwhm, flux, re, &GsParams::default())
    }

    pub fn with_params(
        beta: f64,
        truncation_fwhm: f64,
        flux: f64,
        re: f64,
        params: &GsParams,
    ) -> Result<Self, ProfileError> {
        if beta.is_nan() || beta <= 1.0 {
            return Err(ProfileError::invalid("beta", beta, "Moffat index must exceed 1"));
        }
        let trunc = require_positive("truncation_fwhm", truncation_fwhm)?;
        let flux = require_finite("flux", flux)?;
        let re = require_positive("re", re)?;
        let info = MoffatInfo::get(beta, trunc, params)?;
        let rd = re / info.re_rd;
        debug!("Moffat beta={beta} trunc={trunc} flux={flux} rD={rd}");
        Ok(Self { flux, rd, info })
    }

    pub fn beta(&self) -> f64 {
        self.info.beta
    }

    pub fn fwhm(&self) -> f64 {
        self.rd * self.info.fwhm_rd
    }

    pub fn half_light_radius(&self) -> f64 {
        self.rd * self.info.re_rd
    }

    pub fn scale_radius(&self) -> f64 {
        self.rd
    }

    /// Fraction of the untruncated profile's flux kept inside the cutoff.
    pub fn flux_fraction(&self) -> f64 {
        self.info.flux_factor
    }

    /// Resize so the FWHM becomes `fwhm`.
    pub fn set_fwhm(&mut self, fwhm: f64) -> Result<(), ProfileError> {
        self.rd = require_positive("fwhm", fwhm)? / self.info.fwhm_rd;
        Ok(())
    }

    /// Resize so the scale radius becomes `rd`.
    pub fn set_rd(&mut self, rd: f64) -> Result<(), ProfileError> {
        self.rd = require_positive("rd", rd)?;
        Ok(())
    }
}

impl Profile for Moffat {
    fn x_value(&self, p: Vector2<f64>) -> Result<f64, ProfileError> {
        let s_sq = p.norm_squared() / (self.rd * self.rd);
        Ok(self.flux * self.info.x_value(s_sq) / (self.rd * self.rd))
    }

    fn k_value(&self, k: Vector2<f64>) -> Complex64 {
        let ksq = k.norm_squared() * self.rd * self.rd;
        Complex64::new(self.flux * self.info.k_value(ksq), 0.0)
    }

    fn max_k(&self) -> f64 {
        self.info.max_k / self.rd
    }

    fn step_k(&self) -> f64 {
        self.info.step_k / self.rd
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

    /// The enclosed flux inverts in closed form.
    fn shoot(&self, n: usize, ud: &mut dyn UniformDeviate) -> Result<PhotonArray, ProfileError> {
        let info = &self.info;
        Ok(shoot_isotropic(n, self.flux, ud, |u| self.rd * info.enclosed_radius(u)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rejects_shallow_index() {
        assert!(Moffat::new(1.0, 2.0, 1.0, 1.0).is_err());
        assert!(Moffat::new(3.0, 0.0, 1.0, 1.0).is_err());
        assert!(Moffat::new(3.0, 2.0, 1.0, -1.0).is_err());
    }

    #[test]
    fn test_half_light_radius_and_fwhm() {
        let m = Moffat::new(3.0, 4.0, 2.0, 1.5).unwrap();
        assert_relative_eq!(m.half_light_radius(), 1.5, epsilon = 1e-12);
        // Half maximum at r = FWHM / 2
        let center = m.x_value(Vector2::zeros()).unwrap();
        let edge = m.x_value(Vector2::new(0.5 * m.fwhm(), 0.0)).unwrap();
        assert_relative_eq!(edge / center, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_truncation_cuts_light() {
        let m = Moffat::new(2.5, 2.0, 1.0, 1.0).unwrap();
        let beyond = Vector2::new(1.01 * 2.0 * m.fwhm(), 0.0);
        assert_eq!(m.x_value(beyond).unwrap(), 0.0);
        assert!(m.flux_fraction() < 1.0);
    }

    #[test]
    fn test_fourier_normalization() {
        let m = Moffat::new(3.5, 3.0, 4.0, 0.8).unwrap();
        assert_relative_eq!(m.k_value(Vector2::zeros()).re, 4.0, epsilon = 1e-12);
        // Continuity across the edge of the Taylor region
        let k_edge = m.info.ksq_min.sqrt() / m.rd;
        let below = m.k_value(Vector2::new(0.999 * k_edge, 0.0)).re;
        let above = m.k_value(Vector2::new(1.001 * k_edge, 0.0)).re;
        assert_relative_eq!(below, above, epsilon = 1e-3);
        assert!(m.k_value(Vector2::new(10.0 * m.max_k(), 0.0)).re.abs() < 4e-3);
    }

    #[test]
    fn test_resize_shares_table() {
        let mut m = Moffat::new(3.0, 3.0, 1.0, 1.0).unwrap();
        let before = Arc::clone(&m.info);
        m.set_fwhm(2.0).unwrap();
        assert_relative_eq!(m.fwhm(), 2.0, epsilon = 1e-12);
        m.set_rd(0.5).unwrap();
        assert_relative_eq!(m.scale_radius(), 0.5);
        assert!(Arc::ptr_eq(&before, &m.info));
        assert_relative_eq!(m.max_k() * 0.5, before.max_k, epsilon = 1e-12);
    }

    #[test]
    fn test_shoot_half_light() {
        let m = Moffat::new(3.0, 5.0, 2.0, 1.2).unwrap();
        let mut rng = StdRng::seed_from_u64(123);
        let n = 20_000;
        let photons = m.shoot(n, &mut rng).unwrap();
        assert_relative_eq!(photons.total_flux(), 2.0, epsilon = 1e-9);
        let inside = photons.iter().filter(|(x, y, _)| x.hypot(*y) < 1.2).count();
        assert_relative_eq!(inside as f64 / n as f64, 0.5, epsilon = 0.015);
    }
}

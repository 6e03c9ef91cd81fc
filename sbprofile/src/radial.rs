//! Inverse-CDF sampling of isotropic radial distributions.
//!
//! Profiles without a closed-form inverse for their enclosed flux tabulate
//! the cumulative distribution once and invert it by table lookup.

use shape_math::{gauss_legendre, Interpolant, Table};

use crate::deviate::{unit_disk, UniformDeviate};
use crate::error::ProfileError;
use crate::photon::PhotonArray;

/// Tabulated inverse of a radial cumulative flux distribution.
#[derive(Debug, Clone)]
pub struct RadialSampler {
    /// Radius as a function of enclosed fraction
    inverse: Table,
    r_max: f64,
}

impl RadialSampler {
    /// Build from sampled `(radius, enclosed flux)` pairs.
    ///
    /// The enclosed flux is normalized to 1 at the last sample; samples where
    /// it fails to increase are skipped.
    ///
    /// # Errors
    /// `InvalidParameter` if the enclosed flux is not positive at the end,
    /// or if fewer than two increasing samples remain.
    pub fn from_cdf(radii: &[f64], cdf: &[f64]) -> Result<Self, ProfileError> {
        let total = cdf.last().copied().unwrap_or(0.0);
        if total.is_nan() || total <= 0.0 {
            return Err(ProfileError::invalid(
                "enclosed flux",
                total,
                "radial distribution must enclose positive flux",
            ));
        }

        let mut fractions = Vec::with_capacity(cdf.len());
        let mut values = Vec::with_capacity(cdf.len());
        for (&r, &c) in radii.iter().zip(cdf) {
            let fraction = c / total;
            if fractions.last().map_or(true, |&last| fraction > last) {
                fractions.push(fraction);
                values.push(r);
            }
        }

        let r_max = values.last().copied().unwrap_or(0.0);
        let inverse = Table::new(fractions, values, Interpolant::Linear)?;
        Ok(Self { inverse, r_max })
    }

    /// Integrate `2π r f(r)` over the breakpoints `radii` and build the
    /// sampler from the running total.
    pub fn from_profile<F>(radii: &[f64], profile: F) -> Result<Self, ProfileError>
    where
        F: Fn(f64) -> f64,
    {
        let integrand = |r: f64| 2.0 * std::f64::consts::PI * r * profile(r);
        let mut cdf = Vec::with_capacity(radii.len());
        let mut running = 0.0;
        cdf.push(0.0);
        for w in radii.windows(2) {
            running += gauss_legendre(&integrand, w[0], w[1]);
            cdf.push(running);
        }
        Self::from_cdf(radii, &cdf)
    }

    /// Radius enclosing fraction `u` of the flux.
    pub fn radius(&self, u: f64) -> f64 {
        let u = u.clamp(self.inverse.arg_min(), self.inverse.arg_max());
        self.inverse.eval(u).unwrap_or(self.r_max)
    }

    /// Largest radius the sampler can return.
    pub fn r_max(&self) -> f64 {
        self.r_max
    }
}

/// Shoot `n` photons from an isotropic profile of total `flux`.
///
/// A point drawn uniformly in the unit disk supplies both the direction and
/// the enclosed fraction `u = r²`, which `radius_for` maps to a radius.
/// Consumes about 2.55 deviates per photon.
pub(crate) fn shoot_isotropic<F>(
    n: usize,
    flux: f64,
    ud: &mut dyn UniformDeviate,
    radius_for: F,
) -> PhotonArray
where
    F: Fn(f64) -> f64,
{
    let mut photons = PhotonArray::new(n);
    if n == 0 {
        return photons;
    }
    let flux_per_photon = flux / n as f64;
    for i in 0..n {
        let (x, y, rsq) = unit_disk(ud);
        let stretch = radius_for(rsq) / rsq.sqrt();
        photons.set_photon(i, x * stretch, y * stretch, flux_per_photon);
    }
    photons
}

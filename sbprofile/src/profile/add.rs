//! Superposition: the sum of any number of profiles.

use log::debug;
use nalgebra::Vector2;
use rustfft::num_complex::Complex64;

use crate::deviate::UniformDeviate;
use crate::error::ProfileError;
use crate::photon::PhotonArray;
use crate::render::{KGrid, ProfileImage};

use super::{Profile, SbProfile, MOCK_INF};

/// Sum of child profiles, each carried with its own multiplicative factor.
///
/// Children are stored by value; later changes to the profiles passed in do
/// not reach the sum.
#[derive(Debug, Clone, Default)]
pub struct Add {
    terms: Vec<(SbProfile, f64)>,
}

impl Add {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_profiles(profiles: Vec<SbProfile>) -> Self {
        Self {
            terms: profiles.into_iter().map(|p| (p, 1.0)).collect(),
        }
    }

    /// Append a summand.
    pub fn add(&mut self, profile: SbProfile) {
        self.add_scaled(profile, 1.0);
    }

    /// Append `factor` times `profile`.
    pub fn add_scaled(&mut self, profile: SbProfile, factor: f64) {
        self.terms.push((profile, factor));
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Summands and their factors, in insertion order.
    pub fn terms(&self) -> impl Iterator<Item = (&SbProfile, f64)> + '_ {
        self.terms.iter().map(|(p, f)| (p, *f))
    }

    /// Signed flux contributed by each term.
    fn weights(&self) -> Vec<f64> {
        self.terms.iter().map(|(p, f)| f * p.flux()).collect()
    }

    /// Positive plus negative flux of each term: the flux its photons carry
    /// in magnitude. Equals `|weights()|` for terms of a single sign.
    fn absolute_weights(&self) -> Vec<f64> {
        self.terms
            .iter()
            .map(|(p, f)| f.abs() * (p.positive_flux() + p.negative_flux()))
            .collect()
    }
}

/// Fractions of the photon budget for terms carrying absolute fluxes
/// `weights`. A sum with no flux at all splits the budget evenly.
fn allocation_fractions(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total == 0.0 {
        return vec![1.0 / weights.len() as f64; weights.len()];
    }
    weights.iter().map(|w| w / total).collect()
}

/// Split `n` into integer counts proportional to `fractions`, handing the
/// leftover units to the largest remainders.
fn largest_remainder(n: usize, fractions: &[f64]) -> Vec<usize> {
    let exact: Vec<f64> = fractions.iter().map(|f| f * n as f64).collect();
    let mut counts: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();
    let assigned: usize = counts.iter().sum();
    let mut order: Vec<usize> = (0..fractions.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra)
    });
    for &i in order.iter().take(n.saturating_sub(assigned)) {
        counts[i] += 1;
    }
    counts
}

impl Profile for Add {
    fn x_value(&self, p: Vector2<f64>) -> Result<f64, ProfileError> {
        self.terms
            .iter()
            .try_fold(0.0, |sum, (child, f)| Ok(sum + f * child.x_value(p)?))
    }

    fn k_value(&self, k: Vector2<f64>) -> Complex64 {
        self.terms
            .iter()
            .map(|(child, f)| child.k_value(k) * *f)
            .sum()
    }

    fn max_k(&self) -> f64 {
        self.terms.iter().map(|(c, _)| c.max_k()).fold(0.0, f64::max)
    }

    fn step_k(&self) -> f64 {
        self.terms.iter().map(|(c, _)| c.step_k()).fold(MOCK_INF, f64::min)
    }

    fn is_axisymmetric(&self) -> bool {
        self.terms.iter().all(|(c, _)| c.is_axisymmetric())
    }

    fn is_analytic_x(&self) -> bool {
        self.terms.iter().all(|(c, _)| c.is_analytic_x())
    }

    fn is_analytic_k(&self) -> bool {
        self.terms.iter().all(|(c, _)| c.is_analytic_k())
    }

    fn centroid(&self) -> Result<Vector2<f64>, ProfileError> {
        let mut total = 0.0;
        let mut weighted = Vector2::zeros();
        for (child, f) in &self.terms {
            let w = f * child.flux();
            if w != 0.0 {
                weighted += child.centroid()? * w;
                total += w;
            }
        }
        if total == 0.0 {
            return Err(ProfileError::ZeroFlux {
                operation: "superposition centroid",
            });
        }
        Ok(weighted / total)
    }

    fn flux(&self) -> f64 {
        self.weights().iter().sum()
    }

    fn set_flux(&mut self, flux: f64) -> Result<(), ProfileError> {
        let current = self.flux();
        if current == 0.0 {
            return Err(ProfileError::ZeroFlux {
                operation: "superposition set_flux",
            });
        }
        let ratio = flux / current;
        for (_, f) in &mut self.terms {
            *f *= ratio;
        }
        Ok(())
    }

    fn positive_flux(&self) -> f64 {
        self.terms
            .iter()
            .map(|(c, f)| {
                if *f >= 0.0 {
                    f * c.positive_flux()
                } else {
                    -f * c.negative_flux()
                }
            })
            .sum()
    }

    fn negative_flux(&self) -> f64 {
        self.terms
            .iter()
            .map(|(c, f)| {
                if *f >= 0.0 {
                    f * c.negative_flux()
                } else {
                    -f * c.positive_flux()
                }
            })
            .sum()
    }

    /// Photons are split among the terms by absolute flux and each term is
    /// shot independently; buffers are concatenated in term order. Every
    /// photon ends up with magnitude `(positive_flux + negative_flux) / n`, so
    /// terms with cancelling regions are sampled even when their net flux is
    /// zero.
    fn shoot(&self, n: usize, ud: &mut dyn UniformDeviate) -> Result<PhotonArray, ProfileError> {
        if self.terms.is_empty() {
            return Err(ProfileError::Unsupported {
                operation: "shoot",
                profile: "empty Add",
            });
        }
        let absolute = self.absolute_weights();
        let counts = largest_remainder(n, &allocation_fractions(&absolute));
        let total_absolute: f64 = absolute.iter().sum();
        if self.negative_flux() > 0.0 {
            debug!("superposition shoot: mixed-sign photons, absolute fluxes {absolute:?}");
        }
        debug!("superposition shoot: {n} photons split as {counts:?}");

        let mut photons = PhotonArray::default();
        photons.reserve(n);
        for ((child, f), &count) in self.terms.iter().zip(&counts) {
            if count == 0 {
                continue;
            }
            let mut part = child.shoot(count, ud)?;
            let shot_absolute = part.absolute_flux();
            if total_absolute > 0.0 && shot_absolute > 0.0 {
                let target = total_absolute * count as f64 / n as f64;
                part.scale_flux(f.signum() * target / shot_absolute);
            } else {
                part.scale_flux(*f);
            }
            photons.append(&part);
        }
        Ok(photons)
    }

    fn fill_k_grid(&self, grid: &mut KGrid) {
        grid.array_mut().fill(Complex64::new(0.0, 0.0));
        let mut scratch = KGrid::new(grid.size(), grid.dk());
        for (child, f) in &self.terms {
            child.fill_k_grid(&mut scratch);
            grid.array_mut().scaled_add(Complex64::new(*f, 0.0), scratch.array());
        }
    }

    fn fill_x_grid(&self, image: &mut ProfileImage) -> Result<(), ProfileError> {
        let (ny, nx) = image.array().dim();
        image.array_mut().fill(0.0);
        let mut scratch = ProfileImage::new(nx, ny, image.scale());
        for (child, f) in &self.terms {
            child.fill_x_grid(&mut scratch)?;
            image.array_mut().scaled_add(*f, scratch.array());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Exponential, Gaussian};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn gaussian(flux: f64, sigma: f64) -> SbProfile {
        Gaussian::new(flux, sigma).unwrap().into()
    }

    #[test]
    fn test_largest_remainder_sums_to_n() {
        let counts = largest_remainder(10, &[0.25, 0.25, 0.5]);
        assert_eq!(counts.iter().sum::<usize>(), 10);
        assert_eq!(counts[2], 5);

        let counts = largest_remainder(7, &[1.0 / 3.0; 3]);
        assert_eq!(counts.iter().sum::<usize>(), 7);
        assert!(counts.iter().all(|&c| c == 2 || c == 3));
    }

    #[test]
    fn test_allocation_fractions() {
        let fractions = allocation_fractions(&[3.0, 1.0]);
        assert_relative_eq!(fractions[0], 0.75);
        assert_relative_eq!(fractions[1], 0.25);
        assert_eq!(allocation_fractions(&[0.0, 0.0]), vec![0.5, 0.5]);
    }

    #[test]
    fn test_flux_and_centroid() {
        let shifted = gaussian(1.0, 1.0).shift(2.0, 0.0).unwrap();
        let sum = Add::from_profiles(vec![gaussian(3.0, 1.0), shifted]);
        assert_relative_eq!(sum.flux(), 4.0);
        assert_relative_eq!(sum.centroid().unwrap().x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_set_flux_scales_terms() {
        let mut sum = Add::new();
        sum.add(gaussian(1.0, 1.0));
        sum.add_scaled(gaussian(2.0, 2.0), 0.5);
        assert_relative_eq!(sum.flux(), 2.0);
        sum.set_flux(6.0).unwrap();
        assert_relative_eq!(sum.flux(), 6.0, epsilon = 1e-12);
        assert_relative_eq!(sum.k_value(Vector2::zeros()).re, 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_sum() {
        let sum = Add::new();
        assert_eq!(sum.flux(), 0.0);
        assert_eq!(sum.max_k(), 0.0);
        assert!(sum.centroid().is_err());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            sum.shoot(10, &mut rng),
            Err(ProfileError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_signed_fluxes() {
        let mut sum = Add::new();
        sum.add(gaussian(3.0, 1.0));
        sum.add_scaled(Exponential::new(1.0, 0.5).unwrap().into(), -1.0);
        assert_relative_eq!(sum.flux(), 2.0);
        assert_relative_eq!(sum.positive_flux(), 3.0);
        assert_relative_eq!(sum.negative_flux(), 1.0);
        assert_relative_eq!(sum.positive_flux() - sum.negative_flux(), sum.flux());

        let mut rng = StdRng::seed_from_u64(8);
        let photons = sum.shoot(4000, &mut rng).unwrap();
        assert_eq!(photons.len(), 4000);
        assert_relative_eq!(photons.total_flux(), 2.0, epsilon = 1e-9);
        let negative = photons.iter().filter(|(_, _, f)| *f < 0.0).count();
        assert_eq!(negative, 1000);
    }

    #[test]
    fn test_shoot_partitions_by_flux() {
        let sum = Add::from_profiles(vec![gaussian(1.0, 1.0), gaussian(3.0, 0.1)]);
        let mut rng = StdRng::seed_from_u64(5);
        let photons = sum.shoot(1000, &mut rng).unwrap();
        assert_relative_eq!(photons.total_flux(), 4.0, epsilon = 1e-9);
        // Every photon carries the same magnitude
        assert!(photons.iter().all(|(_, _, f)| (f - 0.004).abs() < 1e-12));
    }

    #[test]
    fn test_cancelling_term_still_receives_photons() {
        let mut dipole = Add::new();
        dipole.add(gaussian(3.0, 1.0));
        dipole.add_scaled(gaussian(3.0, 0.5), -1.0);
        assert_eq!(dipole.flux(), 0.0);
        let outer = Add::from_profiles(vec![gaussian(1.0, 1.0), dipole.into()]);
        assert_relative_eq!(outer.positive_flux(), 4.0);
        assert_relative_eq!(outer.negative_flux(), 3.0);

        let n = 100_000;
        let mut rng = StdRng::seed_from_u64(21);
        let photons = outer.shoot(n, &mut rng).unwrap();
        assert_eq!(photons.len(), n);
        let shot_positive: f64 = photons.iter().map(|(_, _, f)| f.max(0.0)).sum();
        let shot_negative: f64 = photons.iter().map(|(_, _, f)| (-f).max(0.0)).sum();
        assert_relative_eq!(shot_positive, 4.0, max_relative = 1e-3);
        assert_relative_eq!(shot_negative, 3.0, max_relative = 1e-3);
        assert_relative_eq!(photons.total_flux(), 1.0, max_relative = 1e-3);
        // Photon magnitudes are common across terms
        let magnitude = 7.0 / n as f64;
        assert!(photons
            .iter()
            .all(|(_, _, f)| (f.abs() - magnitude).abs() < 1e-9 * magnitude));
    }
}

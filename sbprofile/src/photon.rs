//! Photon sample buffer: weighted positions drawn from a profile.
//!
//! Shooting a profile produces a [`PhotonArray`] whose fluxes sum to the
//! profile's flux in expectation. Convolution is realized by pairing two
//! equal-length buffers photon by photon, which costs O(N) rather than the
//! O(N²) of every cross pair. The pairing is unbiased in total flux; the
//! shuffled form breaks the correlation between photons that share an index.

use nalgebra::Vector2;

use crate::deviate::{index_below, UniformDeviate};
use crate::error::ProfileError;
use crate::render::ProfileImage;

/// Ordered collection of `(x, y, flux)` samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotonArray {
    x: Vec<f64>,
    y: Vec<f64>,
    flux: Vec<f64>,
}

impl PhotonArray {
    /// `n` photons at the origin carrying zero flux.
    pub fn new(n: usize) -> Self {
        Self {
            x: vec![0.0; n],
            y: vec![0.0; n],
            flux: vec![0.0; n],
        }
    }

    /// Build from parallel coordinate and flux vectors.
    ///
    /// # Errors
    /// `LengthMismatch` if the vectors differ in length.
    pub fn from_vecs(x: Vec<f64>, y: Vec<f64>, flux: Vec<f64>) -> Result<Self, ProfileError> {
        if x.len() != y.len() {
            return Err(ProfileError::LengthMismatch {
                left: x.len(),
                right: y.len(),
            });
        }
        if x.len() != flux.len() {
            return Err(ProfileError::LengthMismatch {
                left: x.len(),
                right: flux.len(),
            });
        }
        Ok(Self { x, y, flux })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.x.reserve(additional);
        self.y.reserve(additional);
        self.flux.reserve(additional);
    }

    /// Overwrite photon `i`.
    ///
    /// # Panics
    /// If `i` is out of range.
    pub fn set_photon(&mut self, i: usize, x: f64, y: f64, flux: f64) {
        self.x[i] = x;
        self.y[i] = y;
        self.flux[i] = flux;
    }

    /// Append one photon.
    pub fn push(&mut self, x: f64, y: f64, flux: f64) {
        self.x.push(x);
        self.y.push(y);
        self.flux.push(flux);
    }

    pub fn x(&self, i: usize) -> f64 {
        self.x[i]
    }

    pub fn y(&self, i: usize) -> f64 {
        self.y[i]
    }

    pub fn flux(&self, i: usize) -> f64 {
        self.flux[i]
    }

    /// Iterate photons as `(x, y, flux)`.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.flux)
            .map(|((&x, &y), &flux)| (x, y, flux))
    }

    /// Sum of photon fluxes.
    pub fn total_flux(&self) -> f64 {
        self.flux.iter().sum()
    }

    /// Sum of photon flux magnitudes.
    pub fn absolute_flux(&self) -> f64 {
        self.flux.iter().map(|f| f.abs()).sum()
    }

    /// Rescale so the fluxes sum to `flux`. Does nothing when the current
    /// total is zero.
    pub fn set_total_flux(&mut self, flux: f64) {
        let current = self.total_flux();
        if current == 0.0 {
            return;
        }
        self.scale_flux(flux / current);
    }

    /// Multiply every photon flux by `factor`.
    pub fn scale_flux(&mut self, factor: f64) {
        self.flux.iter_mut().for_each(|f| *f *= factor);
    }

    /// Concatenate `other` after this buffer.
    pub fn append(&mut self, other: &PhotonArray) {
        self.x.extend_from_slice(&other.x);
        self.y.extend_from_slice(&other.y);
        self.flux.extend_from_slice(&other.flux);
    }

    /// Apply `map` to every photon position, leaving fluxes untouched.
    pub fn map_positions<F>(&mut self, map: F)
    where
        F: Fn(f64, f64) -> (f64, f64),
    {
        for (x, y) in self.x.iter_mut().zip(self.y.iter_mut()) {
            let (nx, ny) = map(*x, *y);
            *x = nx;
            *y = ny;
        }
    }

    /// Combine with `rhs` index by index: positions add, fluxes multiply.
    ///
    /// Each output flux is `flux[i] * rhs.flux[i] * N`, so when both inputs
    /// carry `F/N` per photon the output total is `F_self * F_rhs`.
    ///
    /// # Errors
    /// `LengthMismatch` if the buffers differ in length.
    pub fn convolve(&mut self, rhs: &PhotonArray) -> Result<(), ProfileError> {
        self.check_same_length(rhs)?;
        let n = self.len() as f64;
        for i in 0..self.len() {
            self.x[i] += rhs.x[i];
            self.y[i] += rhs.y[i];
            self.flux[i] *= rhs.flux[i] * n;
        }
        Ok(())
    }

    /// As [`convolve`](Self::convolve), but this buffer is randomly permuted
    /// (Fisher–Yates, one deviate per photon) as it is paired with `rhs`.
    pub fn convolve_shuffle(
        &mut self,
        rhs: &PhotonArray,
        ud: &mut dyn UniformDeviate,
    ) -> Result<(), ProfileError> {
        self.check_same_length(rhs)?;
        let n = self.len() as f64;
        for i_out in (0..self.len()).rev() {
            let i_in = index_below(ud, i_out + 1);
            self.x.swap(i_in, i_out);
            self.y.swap(i_in, i_out);
            self.flux.swap(i_in, i_out);

            self.x[i_out] += rhs.x[i_out];
            self.y[i_out] += rhs.y[i_out];
            self.flux[i_out] *= rhs.flux[i_out] * n;
        }
        Ok(())
    }

    fn check_same_length(&self, rhs: &PhotonArray) -> Result<(), ProfileError> {
        if self.len() != rhs.len() {
            return Err(ProfileError::LengthMismatch {
                left: self.len(),
                right: rhs.len(),
            });
        }
        Ok(())
    }

    /// Bin photons into `image` by nearest pixel, as surface brightness.
    ///
    /// Photons landing outside the image, or at a non-finite position, are
    /// dropped.
    ///
    /// # Returns
    /// Total flux actually added
    pub fn add_to(&self, image: &mut ProfileImage) -> f64 {
        let scale = image.scale();
        let inv_area = 1.0 / (scale * scale);
        let (ny, nx) = image.array().dim();
        let (cx, cy) = image.origin();
        let data = image.array_mut();

        let mut added = 0.0;
        for (x, y, flux) in self.iter() {
            if !(x.is_finite() && y.is_finite()) {
                continue;
            }
            let ix = (x / scale).round() + cx as f64;
            let iy = (y / scale).round() + cy as f64;
            if ix < 0.0 || iy < 0.0 || ix >= nx as f64 || iy >= ny as f64 {
                continue;
            }
            data[[iy as usize, ix as usize]] += flux * inv_area;
            added += flux;
        }
        added
    }

    /// Flux-weighted mean position.
    ///
    /// # Errors
    /// `ZeroFlux` when the fluxes sum to zero.
    pub fn centroid(&self) -> Result<Vector2<f64>, ProfileError> {
        let total = self.total_flux();
        if total == 0.0 {
            return Err(ProfileError::ZeroFlux {
                operation: "photon centroid",
            });
        }
        let (sx, sy) = self
            .iter()
            .fold((0.0, 0.0), |(sx, sy), (x, y, f)| (sx + x * f, sy + y * f));
        Ok(Vector2::new(sx / total, sy / total))
    }
}

//! Sample grids that profiles are drawn into.

use nalgebra::Vector2;
use ndarray::Array2;
use rustfft::num_complex::Complex64;

use crate::error::ProfileError;

/// Real-space image of surface brightness.
///
/// Pixel `(ix, iy)` is stored at `[[iy, ix]]` and its centre sits at
/// `((ix - nx/2) * scale, (iy - ny/2) * scale)`, so the origin falls on pixel
/// `(nx/2, ny/2)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileImage {
    data: Array2<f64>,
    scale: f64,
}

/// Real-space fill target; the same grid the renderer writes.
pub type XGrid = ProfileImage;

impl ProfileImage {
    /// Zeroed `nx` by `ny` image with pixel size `scale`.
    pub fn new(nx: usize, ny: usize, scale: f64) -> Self {
        Self {
            data: Array2::zeros((ny, nx)),
            scale,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// `(nx, ny)`
    pub fn dim(&self) -> (usize, usize) {
        let (ny, nx) = self.data.dim();
        (nx, ny)
    }

    pub fn array(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn array_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    /// Pixel holding the coordinate origin, as `(ix, iy)`.
    pub fn origin(&self) -> (usize, usize) {
        let (nx, ny) = self.dim();
        (nx / 2, ny / 2)
    }

    /// Centre of pixel `(ix, iy)` in profile coordinates.
    pub fn position(&self, ix: usize, iy: usize) -> Vector2<f64> {
        let (cx, cy) = self.origin();
        Vector2::new(
            (ix as f64 - cx as f64) * self.scale,
            (iy as f64 - cy as f64) * self.scale,
        )
    }

    /// Flux in the image: the pixel sum times the pixel area.
    pub fn total_flux(&self) -> f64 {
        self.data.sum() * self.scale * self.scale
    }

    /// Flux-weighted mean pixel position.
    ///
    /// # Errors
    /// `ZeroFlux` when the image sums to zero.
    pub fn centroid(&self) -> Result<Vector2<f64>, ProfileError> {
        let total = self.data.sum();
        if total == 0.0 {
            return Err(ProfileError::ZeroFlux {
                operation: "image centroid",
            });
        }
        let mut weighted = Vector2::zeros();
        for ((iy, ix), &value) in self.data.indexed_iter() {
            weighted += self.position(ix, iy) * value;
        }
        Ok(weighted / total)
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }
}

/// Square grid of Fourier amplitudes in FFT order.
///
/// Index `i` holds wavenumber `i * dk` for `i < n/2` and `(i - n) * dk`
/// above, so the zero frequency is at `[[0, 0]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct KGrid {
    data: Array2<Complex64>,
    dk: f64,
}

impl KGrid {
    pub fn new(n: usize, dk: f64) -> Self {
        Self {
            data: Array2::zeros((n, n)),
            dk,
        }
    }

    pub fn size(&self) -> usize {
        self.data.nrows()
    }

    pub fn dk(&self) -> f64 {
        self.dk
    }

    /// Signed wavenumber of row or column `i`.
    pub fn wavenumber(&self, i: usize) -> f64 {
        let n = self.size();
        if i < n / 2 {
            i as f64 * self.dk
        } else {
            (i as f64 - n as f64) * self.dk
        }
    }

    pub fn array(&self) -> &Array2<Complex64> {
        &self.data
    }

    pub fn array_mut(&mut self) -> &mut Array2<Complex64> {
        &mut self.data
    }
}

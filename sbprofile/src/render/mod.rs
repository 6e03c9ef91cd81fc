//! Drawing profiles onto pixel grids.
//!
//! Three routes produce an image of surface brightness:
//!
//! * [`draw_real`] samples `x_value` at every pixel centre
//! * [`draw_fourier`] fills a k-space grid and inverse-transforms it
//! * [`draw_shoot`] bins photons drawn from the profile
//!
//! [`draw`] picks between the first two from the profile's capabilities.

use std::f64::consts::PI;

use log::{debug, warn};
use ndarray::Array2;
use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;

use crate::deviate::UniformDeviate;
use crate::error::ProfileError;
use crate::params::GsParams;
use crate::profile::Profile;

mod image;

pub use image::{KGrid, ProfileImage, XGrid};

/// Sample the profile at each pixel centre.
///
/// # Returns
/// Flux contained in the image
pub fn draw_real<P: Profile + ?Sized>(
    profile: &P,
    image: &mut ProfileImage,
) -> Result<f64, ProfileError> {
    profile.fill_x_grid(image)?;
    Ok(image.total_flux())
}

/// Smallest size of the form `2ⁿ` or `3·2ⁿ` at least `required`, bounded by
/// the configured FFT limits.
///
/// # Errors
/// `FftTooLarge` if the size would exceed `maximum_fft_size`.
pub fn fft_size(required: f64, params: &GsParams) -> Result<usize, ProfileError> {
    let maximum = params.maximum_fft_size;
    if required.is_nan() || required > maximum as f64 {
        return Err(ProfileError::FftTooLarge {
            requested: if required.is_finite() { required.ceil() as usize } else { usize::MAX },
            maximum,
        });
    }
    let target = (required.ceil() as usize).max(params.minimum_fft_size);
    let mut power = 1;
    while power < target {
        power <<= 1;
    }
    let n = if 3 * (power / 4) >= target { 3 * (power / 4) } else { power };
    if n > maximum {
        return Err(ProfileError::FftTooLarge {
            requested: n,
            maximum,
        });
    }
    Ok(n)
}

/// In-place unnormalized inverse 2-D transform of a square grid, done as
/// row transforms, a transpose, row transforms and a transpose back.
fn inverse_fft_2d(data: &mut Array2<Complex64>) {
    let n = data.nrows();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_inverse(n);

    let mut buffer: Vec<Complex64> = data.iter().copied().collect();
    fft.process(&mut buffer);
    let mut transposed = transpose(&buffer, n);
    fft.process(&mut transposed);
    let result = transpose(&transposed, n);

    for ((iy, ix), value) in data.indexed_iter_mut() {
        *value = result[iy * n + ix];
    }
}

fn transpose(buffer: &[Complex64], n: usize) -> Vec<Complex64> {
    let mut out = vec![Complex64::new(0.0, 0.0); buffer.len()];
    for row in 0..n {
        for col in 0..n {
            out[col * n + row] = buffer[row * n + col];
        }
    }
    out
}

/// Render through Fourier space.
///
/// The FFT grid covers at least `wmult` times the real-space extent implied
/// by `step_k`, and at least the image itself. The result is periodic on the
/// FFT grid, so light beyond it wraps around.
///
/// # Arguments
/// * `profile` - Profile to draw
/// * `image` - Destination; its pixel scale sets the sampling
/// * `params` - FFT size bounds
/// * `wmult` - Factor enlarging the FFT grid beyond the minimum
///
/// # Returns
/// Flux contained in the image
pub fn draw_fourier<P: Profile + ?Sized>(
    profile: &P,
    image: &mut ProfileImage,
    params: &GsParams,
    wmult: f64,
) -> Result<f64, ProfileError> {
    let dx = image.scale();
    if dx > profile.nyquist_dx() {
        warn!(
            "pixel scale {dx} exceeds Nyquist spacing {:.4}; image will alias",
            profile.nyquist_dx()
        );
    }
    let (nx, ny) = image.dim();
    let required = (nx.max(ny) as f64).max(wmult * 2.0 * PI / (profile.step_k() * dx));
    let n = fft_size(required, params)?;
    let dk = 2.0 * PI / (n as f64 * dx);
    debug!("Fourier draw: {n}x{n} grid, dk={dk:.5}");

    let mut grid = KGrid::new(n, dk);
    profile.fill_k_grid(&mut grid);
    inverse_fft_2d(grid.array_mut());

    let norm = dk * dk / (4.0 * PI * PI);
    let (cx, cy) = image.origin();
    let wrap = |i: usize, c: usize| (i as isize - c as isize).rem_euclid(n as isize) as usize;
    let source = grid.array();
    for ((iy, ix), value) in image.array_mut().indexed_iter_mut() {
        *value = source[[wrap(iy, cy), wrap(ix, cx)]].re * norm;
    }
    Ok(image.total_flux())
}

/// Draw in real space when the profile allows it, through Fourier space
/// otherwise.
pub fn draw<P: Profile + ?Sized>(
    profile: &P,
    image: &mut ProfileImage,
    params: &GsParams,
) -> Result<f64, ProfileError> {
    if profile.is_analytic_x() {
        draw_real(profile, image)
    } else {
        draw_fourier(profile, image, params, 1.0)
    }
}

/// Fill `grid` with the profile's Fourier amplitudes.
pub fn draw_k<P: Profile + ?Sized>(profile: &P, grid: &mut KGrid) {
    profile.fill_k_grid(grid);
}

/// Clear `image`, shoot `n` photons and bin them.
///
/// # Returns
/// Flux of the photons that landed on the image
pub fn draw_shoot<P: Profile + ?Sized>(
    profile: &P,
    image: &mut ProfileImage,
    n: usize,
    ud: &mut dyn UniformDeviate,
) -> Result<f64, ProfileError> {
    image.clear();
    let photons = profile.shoot(n, ud)?;
    Ok(photons.add_to(image))
}

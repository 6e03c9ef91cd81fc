//! Composite Gauss–Legendre quadrature and the zeroth-order Hankel transform.
//!
//! Tabulated Fourier profiles are built from
//! `F(k) = ∫₀^rmax f(r) J0(k r) 2π r dr`. The integrand oscillates with period
//! `2π/k` and most profiles have a cusp or steep core at the origin, so the
//! interval is split into panels no wider than a quarter period and refined
//! geometrically towards `r = 0`. Each panel gets an 8-point rule.

use crate::bessel::j0;

/// Nodes and weights of the 8-point Gauss–Legendre rule on [-1, 1], as
/// `(node, weight)` for the positive half.
const GL8: [(f64, f64); 4] = [
    (0.183_434_642_495_649_8, 0.362_683_783_378_362_0),
    (0.525_532_409_916_329_0, 0.313_706_645_877_887_3),
    (0.796_666_477_413_626_7, 0.222_381_034_453_374_5),
    (0.960_289_856_497_536_3, 0.101_228_536_290_376_3),
];

/// Number of geometric refinements of the first panel towards the origin.
const ORIGIN_REFINEMENTS: usize = 24;

/// Minimum panels across `[0, rmax]` regardless of frequency.
const MIN_PANELS: f64 = 64.0;

/// 8-point Gauss–Legendre estimate of `∫_a^b f(x) dx`.
pub fn gauss_legendre<F>(f: &F, a: f64, b: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    let half = 0.5 * (b - a);
    let mid = 0.5 * (a + b);
    let sum: f64 = GL8
        .iter()
        .map(|&(node, weight)| weight * (f(mid - half * node) + f(mid + half * node)))
        .sum();
    sum * half
}

/// Sum of 8-point rules over consecutive panels `[points[i], points[i+1]]`.
pub fn integrate_breakpoints<F>(f: &F, points: &[f64]) -> f64
where
    F: Fn(f64) -> f64,
{
    points
        .windows(2)
        .map(|w| gauss_legendre(f, w[0], w[1]))
        .sum()
}

/// Breakpoints for an integrand on `[0, rmax]` oscillating at wavenumber `k`.
///
/// # Arguments
/// * `k` - Wavenumber of the oscillating factor (0 for none)
/// * `rmax` - Upper integration limit
///
/// # Returns
/// Strictly increasing breakpoints from 0 to `rmax`
pub fn hankel_breakpoints(k: f64, rmax: f64) -> Vec<f64> {
    let mut width = rmax / MIN_PANELS;
    if k > 0.0 {
        width = width.min(std::f64::consts::FRAC_PI_2 / k);
    }
    let n_uniform = (rmax / width).ceil() as usize;
    let width = rmax / n_uniform as f64;

    // Halve the first panel repeatedly so a cusp at r = 0 is resolved
    let mut points = Vec::with_capacity(n_uniform + ORIGIN_REFINEMENTS + 1);
    points.push(0.0);
    points.extend((1..=ORIGIN_REFINEMENTS).rev().map(|j| width / (1u64 << j) as f64));
    points.extend((1..=n_uniform).map(|i| i as f64 * width));
    points
}

/// Zeroth-order Hankel transform `∫₀^rmax f(r) J0(k r) 2π r dr`.
pub fn hankel0<F>(f: F, k: f64, rmax: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    let points = hankel_breakpoints(k, rmax);
    let integrand = |r: f64| f(r) * j0(k * r) * r;
    2.0 * std::f64::consts::PI * integrate_breakpoints(&integrand, &points)
}

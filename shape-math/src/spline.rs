/// Natural cubic spline through tabulated samples.
///
/// Second derivatives vanish at both ends. Used by [`crate::table::Table`]
/// for the `Spline` interpolant, where smooth Fourier-amplitude tables need
/// continuous first and second derivatives between samples.
///
/// Each segment is `S(x) = a + b(x-xi) + c(x-xi)² + d(x-xi)³`.
///
/// ```rust
/// use shape_math::spline::CubicSpline;
///
/// let spline = CubicSpline::new(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0, 4.0, 9.0]);
/// let mid = spline.evaluate(1.5);
/// assert!((mid - 2.25).abs() < 0.1);
/// ```
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    coeffs: Vec<[f64; 4]>,
}

impl CubicSpline {
    /// Build a spline from strictly increasing `x` and matching `y`.
    ///
    /// # Panics
    /// - If x and y vectors have different lengths
    /// - If fewer than 2 points are provided
    /// - If x values are not strictly increasing
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        assert_eq!(x.len(), y.len(), "X and Y vectors must have same length");
        assert!(x.len() >= 2, "Need at least 2 points for interpolation");
        assert!(
            x.windows(2).all(|w| w[1] > w[0]),
            "X values must be sorted in ascending order"
        );

        let coeffs = Self::solve_coefficients(&x, &y);
        Self { x, y, coeffs }
    }

    /// Thomas-algorithm solve of the tridiagonal system for the natural spline.
    fn solve_coefficients(x: &[f64], y: &[f64]) -> Vec<[f64; 4]> {
        let n = x.len();
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

        let mut alpha = vec![0.0; n];
        for i in 1..n - 1 {
            alpha[i] = 3.0 / h[i] * (y[i + 1] - y[i]) - 3.0 / h[i - 1] * (y[i] - y[i - 1]);
        }

        let mut l = vec![1.0; n];
        let mut mu = vec![0.0; n];
        let mut z = vec![0.0; n];
        for i in 1..n - 1 {
            l[i] = 2.0 * (x[i + 1] - x[i - 1]) - h[i - 1] * mu[i - 1];
            mu[i] = h[i] / l[i];
            z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
        }

        let mut c = vec![0.0; n];
        let mut coeffs = vec![[0.0; 4]; n - 1];
        for j in (0..n - 1).rev() {
            c[j] = z[j] - mu[j] * c[j + 1];
            let b = (y[j + 1] - y[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
            let d = (c[j + 1] - c[j]) / (3.0 * h[j]);
            coeffs[j] = [y[j], b, c[j], d];
        }
        coeffs
    }

    /// Evaluate the spline at `x`; values outside the sampled range clamp to
    /// the end samples.
    pub fn evaluate(&self, x: f64) -> f64 {
        let last = self.x.len() - 1;
        if x <= self.x[0] {
            return self.y[0];
        }
        if x >= self.x[last] {
            return self.y[last];
        }

        let segment = self.find_segment(x);
        let dx = x - self.x[segment];
        let [a, b, c, d] = self.coeffs[segment];
        a + dx * (b + dx * (c + dx * d))
    }

    /// Index of the left endpoint of the segment containing `x`.
    fn find_segment(&self, x: f64) -> usize {
        // partition_point gives the first sample strictly greater than x
        let upper = self.x.partition_point(|&xi| xi <= x);
        upper.saturating_sub(1).min(self.coeffs.len() - 1)
    }

    /// Sample abscissae.
    pub fn knots(&self) -> &[f64] {
        &self.x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_interpolation() {
        let spline = CubicSpline::new(vec![0.0, 1.0], vec![0.0, 1.0]);
        assert!((spline.evaluate(0.5) - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_passes_through_knots() {
        let x = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let y = vec![0.0, 1.0, 0.0, -1.0, 0.0];
        let spline = CubicSpline::new(x.clone(), y.clone());

        for (xi, yi) in x.iter().zip(y.iter()) {
            assert!((spline.evaluate(*xi) - yi).abs() < 1e-10);
        }
    }

    #[test]
    #[should_panic(expected = "X and Y vectors must have same length")]
    fn test_mismatched_lengths() {
        CubicSpline::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0]);
    }

    #[test]
    #[should_panic(expected = "X values must be sorted in ascending order")]
    fn test_unsorted_x() {
        CubicSpline::new(vec![0.0, 2.0, 1.0], vec![0.0, 4.0, 1.0]);
    }

    #[test]
    fn test_boundary_clamping() {
        let spline = CubicSpline::new(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0, 4.0, 9.0]);
        assert!((spline.evaluate(-1.0) - 0.0).abs() < 1e-10);
        assert!((spline.evaluate(5.0) - 9.0).abs() < 1e-10);
    }

    #[test]
    fn test_smooth_function_accuracy() {
        let x: Vec<f64> = (0..=40).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|v| (-v).exp()).collect();
        let spline = CubicSpline::new(x, y);

        for x in [0.55_f64, 1.23, 2.71, 3.33] {
            let exact = (-x).exp();
            assert!((spline.evaluate(x) - exact).abs() < 1e-5);
        }
    }
}

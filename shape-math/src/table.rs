//! One-dimensional lookup tables built from `(argument, value)` samples.
//!
//! Tabulated profiles (Sersic and Moffat Fourier transforms, radial photon
//! distributions) are built once from expensive integrals and then queried
//! many times. A [`Table`] stores the samples together with the interpolation
//! rule used between them.
//!
//! # Example
//!
//! ```
//! use shape_math::table::{Interpolant, Table};
//!
//! let table = Table::from_fn(0.0, 2.0, 201, |x| x.exp(), Interpolant::Spline).unwrap();
//! let approx_value = table.eval(1.3).unwrap();
//! assert!((approx_value - 1.3_f64.exp()).abs() < 1e-6);
//! ```

use crate::spline::CubicSpline;
use thiserror::Error;

/// Error type for lookup table operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    /// Value is outside the domain bounds
    #[error("Value {value} is outside domain bounds ({min}, {max})")]
    OutOfBounds { value: f64, min: f64, max: f64 },

    /// Argument and value arrays differ in length
    #[error("table arguments ({args}) and values ({values}) differ in length")]
    LengthMismatch { args: usize, values: usize },

    /// Too few samples for the requested interpolant
    #[error("table needs at least {required} samples, got {got}")]
    TooFewSamples { required: usize, got: usize },

    /// Arguments are not strictly increasing
    #[error("table arguments must be strictly increasing (index {index})")]
    Unsorted { index: usize },
}

/// Interpolation rule between table samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolant {
    /// Straight line between neighbouring samples
    Linear,
    /// Natural cubic spline through all samples
    Spline,
    /// Value of the sample at or below the argument
    Floor,
    /// Value of the sample at or above the argument
    Ceil,
    /// Value of the nearest sample
    Nearest,
}

impl std::str::FromStr for Interpolant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "spline" => Ok(Self::Spline),
            "floor" => Ok(Self::Floor),
            "ceil" => Ok(Self::Ceil),
            "nearest" => Ok(Self::Nearest),
            other => Err(format!("unknown interpolant '{other}'")),
        }
    }
}

/// Lookup table over sorted arguments.
#[derive(Debug, Clone)]
pub struct Table {
    args: Vec<f64>,
    values: Vec<f64>,
    interpolant: Interpolant,
    spline: Option<CubicSpline>,
}

impl Table {
    /// Build a table from matching argument and value samples.
    ///
    /// # Errors
    /// Length mismatch, fewer than 2 samples, or arguments that are not
    /// strictly increasing.
    pub fn new(
        args: Vec<f64>,
        values: Vec<f64>,
        interpolant: Interpolant,
    ) -> Result<Self, TableError> {
        if args.len() != values.len() {
            return Err(TableError::LengthMismatch {
                args: args.len(),
                values: values.len(),
            });
        }
        if args.len() < 2 {
            return Err(TableError::TooFewSamples {
                required: 2,
                got: args.len(),
            });
        }
        if let Some(index) = args.windows(2).position(|w| w[1] <= w[0]) {
            return Err(TableError::Unsorted { index: index + 1 });
        }

        let spline = match interpolant {
            Interpolant::Spline => Some(CubicSpline::new(args.clone(), values.clone())),
            _ => None,
        };

        Ok(Self {
            args,
            values,
            interpolant,
            spline,
        })
    }

    /// Tabulate `f` at `n_points` evenly spaced arguments over `[x_min, x_max]`.
    pub fn from_fn<F>(
        x_min: f64,
        x_max: f64,
        n_points: usize,
        f: F,
        interpolant: Interpolant,
    ) -> Result<Self, TableError>
    where
        F: Fn(f64) -> f64,
    {
        if n_points < 2 {
            return Err(TableError::TooFewSamples {
                required: 2,
                got: n_points,
            });
        }
        let dx = (x_max - x_min) / (n_points - 1) as f64;
        let args: Vec<f64> = (0..n_points).map(|i| x_min + i as f64 * dx).collect();
        let values = args.iter().map(|&x| f(x)).collect();
        Self::new(args, values, interpolant)
    }

    /// Interpolated value at `x`.
    ///
    /// # Errors
    /// `OutOfBounds` when `x` lies outside `[arg_min, arg_max]`.
    pub fn eval(&self, x: f64) -> Result<f64, TableError> {
        if !self.contains(x) {
            return Err(TableError::OutOfBounds {
                value: x,
                min: self.arg_min(),
                max: self.arg_max(),
            });
        }
        Ok(self.interpolate(x))
    }

    /// Interpolate every argument in `xs`.
    pub fn eval_many(&self, xs: &[f64]) -> Result<Vec<f64>, TableError> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }

    fn interpolate(&self, x: f64) -> f64 {
        if let Some(spline) = &self.spline {
            return spline.evaluate(x);
        }

        let upper = self.args.partition_point(|&a| a <= x).clamp(1, self.args.len() - 1);
        let lower = upper - 1;
        let (x0, x1) = (self.args[lower], self.args[upper]);
        let (y0, y1) = (self.values[lower], self.values[upper]);

        match self.interpolant {
            Interpolant::Linear | Interpolant::Spline => {
                let t = (x - x0) / (x1 - x0);
                y0 + t * (y1 - y0)
            }
            Interpolant::Floor => {
                if x >= x1 {
                    y1
                } else {
                    y0
                }
            }
            Interpolant::Ceil => {
                if x <= x0 {
                    y0
                } else {
                    y1
                }
            }
            Interpolant::Nearest => {
                if x - x0 <= x1 - x {
                    y0
                } else {
                    y1
                }
            }
        }
    }

    /// Smallest tabulated argument.
    pub fn arg_min(&self) -> f64 {
        self.args[0]
    }

    /// Largest tabulated argument.
    pub fn arg_max(&self) -> f64 {
        self.args[self.args.len() - 1]
    }

    /// Number of samples.
    pub fn size(&self) -> usize {
        self.args.len()
    }

    /// Interpolation rule in use.
    pub fn interpolant(&self) -> Interpolant {
        self.interpolant
    }

    /// Check if a value is within the table's domain.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.arg_min() && x <= self.arg_max()
    }

    /// Tabulated arguments.
    pub fn args(&self) -> &[f64] {
        &self.args
    }

    /// Tabulated values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

//! Bessel functions of the first kind, orders 0 and 1.
//!
//! Small arguments use scilib's series evaluation. For `|x| >= ASYMPTOTIC_MIN`
//! the series loses digits to cancellation, so the Abramowitz & Stegun
//! (9.4.3, 9.4.6) modulus/phase polynomials take over; their absolute error
//! is below 1e-7 over that range.

use scilib::math::bessel;

/// Argument above which the modulus/phase form is used.
const ASYMPTOTIC_MIN: f64 = 5.0;

/// J0(x)
pub fn j0(x: f64) -> f64 {
    let ax = x.abs();
    if ax == 0.0 {
        return 1.0;
    }
    if ax < ASYMPTOTIC_MIN {
        return bessel::j_n(0, ax);
    }

    let t = 3.0 / ax;
    let f0 = 0.797_884_56
        + t * (-0.000_000_77
            + t * (-0.005_527_40
                + t * (-0.000_095_12 + t * (0.001_372_37 + t * (-0.000_728_05 + t * 0.000_144_76)))));
    let theta0 = ax - 0.785_398_16
        + t * (-0.041_663_97
            + t * (-0.000_039_54
                + t * (0.002_625_73 + t * (-0.000_541_25 + t * (-0.000_293_33 + t * 0.000_135_58)))));
    f0 * theta0.cos() / ax.sqrt()
}

/// J1(x)
pub fn j1(x: f64) -> f64 {
    let ax = x.abs();
    let value = if ax == 0.0 {
        0.0
    } else if ax < ASYMPTOTIC_MIN {
        bessel::j_n(1, ax)
    } else {
        let t = 3.0 / ax;
        let f1 = 0.797_884_56
            + t * (0.000_001_56
                + t * (0.016_596_67
                    + t * (0.000_171_05
                        + t * (-0.002_495_11 + t * (0.001_136_53 + t * -0.000_200_33)))));
        let theta1 = ax - 2.356_194_49
            + t * (0.124_996_12
                + t * (0.000_056_50
                    + t * (-0.006_378_79
                        + t * (0.000_743_48 + t * (0.000_798_24 + t * -0.000_291_66)))));
        f1 * theta1.cos() / ax.sqrt()
    };
    if x < 0.0 {
        -value
    } else {
        value
    }
}

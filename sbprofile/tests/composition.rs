//! Composition invariants across leaves and combinators

use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use approx::assert_relative_eq;
use nalgebra::{Matrix2, Vector2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use sbprofile::profile::{
    Add, Airy, BoxProfile, Convolve, DeltaFunction, Distort, Exponential, Gaussian, Moffat,
    Profile, SbProfile, Sersic,
};
use sbprofile::{draw_fourier, GsParams, PhotonArray, ProfileError, ProfileImage, ShapeCache};

fn gaussian(flux: f64, sigma: f64) -> SbProfile {
    Gaussian::new(flux, sigma).unwrap().into()
}

fn leaves() -> Vec<SbProfile> {
    vec![
        gaussian(2.0, 1.0),
        Exponential::new(1.5, 0.7).unwrap().into(),
        Sersic::new(2.5, 0.8, 1.1).unwrap().into(),
        Moffat::new(3.0, 4.0, 1.2, 0.9).unwrap().into(),
        Airy::new(2.0, 0.2, 0.6).unwrap().into(),
        BoxProfile::new(0.5, 0.3, 3.0).unwrap().into(),
    ]
}

#[test]
fn test_flux_conservation() {
    let children = leaves();
    let sum: f64 = children.iter().map(|c| c.flux()).sum();
    let product: f64 = children.iter().map(|c| c.flux()).product();

    let added = Add::from_profiles(children.clone());
    assert_relative_eq!(added.flux(), sum, epsilon = 1e-12);

    let mut convolved = Convolve::from_profiles(children.clone());
    assert_relative_eq!(convolved.flux(), product, epsilon = 1e-12);
    convolved.set_flux(2.0 * product).unwrap();
    assert_relative_eq!(convolved.flux_scale(), 2.0, epsilon = 1e-12);
    assert_relative_eq!(convolved.flux(), 2.0 * product, epsilon = 1e-12);

    let m = Matrix2::new(1.3, 0.4, -0.2, 0.9);
    for child in children {
        let distorted = Distort::new(child.clone(), m, Vector2::new(0.1, 0.2)).unwrap();
        assert_relative_eq!(
            distorted.flux(),
            child.flux() * m.determinant().abs(),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            distorted.k_value(Vector2::zeros()).re,
            distorted.flux(),
            epsilon = 1e-9
        );
    }
}

#[test]
fn test_band_limit_monotonicity() {
    let children = leaves();
    let added = Add::from_profiles(children.clone());
    let convolved = Convolve::from_profiles(children.clone());
    for child in &children {
        assert!(added.max_k() >= child.max_k());
        assert!(convolved.max_k() <= child.max_k());
        assert!(added.step_k() <= child.step_k());
        assert!(convolved.step_k() <= child.step_k());
    }
}

#[test]
fn test_identity_distortion_round_trip() {
    for child in leaves() {
        let d = Distort::new(child.clone(), Matrix2::identity(), Vector2::zeros()).unwrap();
        for p in [Vector2::new(0.05, 0.0), Vector2::new(0.3, -0.7)] {
            assert_eq!(d.x_value(p).unwrap(), child.x_value(p).unwrap());
            assert_eq!(d.k_value(p), child.k_value(p));
        }
        assert_eq!(d.flux(), child.flux());
        assert_eq!(d.centroid().unwrap(), child.centroid().unwrap());
    }
}

#[test]
fn test_shoot_flux_expectation() {
    let n = 10_000;
    let mut rng = StdRng::seed_from_u64(2024);
    for leaf in leaves() {
        let photons = leaf.shoot(n, &mut rng).unwrap();
        assert_eq!(photons.len(), n);
        assert_relative_eq!(
            photons.total_flux(),
            leaf.flux(),
            max_relative = 3.0 / (n as f64).sqrt()
        );
    }

    let mut mixed = Add::new();
    mixed.add(gaussian(4.0, 1.0));
    mixed.add_scaled(gaussian(1.0, 0.3), -1.0);
    assert_relative_eq!(
        mixed.positive_flux() - mixed.negative_flux(),
        mixed.flux(),
        epsilon = 1e-12
    );
    let photons = mixed.shoot(n, &mut rng).unwrap();
    assert_relative_eq!(photons.total_flux(), mixed.flux(), max_relative = 0.03);
}

#[test]
fn test_photon_combination() {
    let n = 1000;
    let mut rng = StdRng::seed_from_u64(77);
    let a = gaussian(2.0, 1.0).shoot(n, &mut rng).unwrap();
    let b = Exponential::new(3.0, 0.5).unwrap().shoot(n, &mut rng).unwrap();

    let mut direct = a.clone();
    direct.convolve(&b).unwrap();
    assert_eq!(direct.len(), n);
    for i in 0..n {
        assert_relative_eq!(direct.x(i), a.x(i) + b.x(i));
        assert_relative_eq!(direct.y(i), a.y(i) + b.y(i));
    }
    assert_relative_eq!(direct.total_flux(), 6.0, epsilon = 1e-9);

    let mut shuffled = a.clone();
    shuffled.convolve_shuffle(&b, &mut rng).unwrap();
    assert_eq!(shuffled.len(), n);
    assert_relative_eq!(shuffled.total_flux(), 6.0, epsilon = 1e-9);
    let moved = (0..n).filter(|&i| shuffled.x(i) != direct.x(i)).count();
    assert!(moved > n / 2);

    let short = PhotonArray::new(n - 1);
    assert!(matches!(
        direct.convolve(&short),
        Err(ProfileError::LengthMismatch { .. })
    ));
}

#[test]
fn test_scenario_superposed_gaussians() {
    let a = gaussian(2.0, 1.0);
    let b = gaussian(3.0, 1.0);
    let sum = Add::from_profiles(vec![a.clone(), b.clone()]);
    assert_relative_eq!(sum.flux(), 5.0);
    let c = sum.centroid().unwrap();
    assert_eq!(c, Vector2::zeros());
    assert_eq!(sum.max_k(), a.max_k().max(b.max_k()));
    assert_eq!(a.max_k(), b.max_k());
    assert!(sum.is_axisymmetric());
}

#[test]
fn test_scenario_box_self_convolution() {
    let pixel: SbProfile = BoxProfile::new(1.0, 1.0, 1.0).unwrap().into();
    let conv = Convolve::from_profiles(vec![pixel.clone(), pixel]);
    assert_relative_eq!(conv.k_value(Vector2::zeros()).re, 1.0);
    assert!(!conv.is_analytic_x());
    assert!(conv.x_value(Vector2::zeros()).is_err());
}

#[test]
fn test_scenario_rotated_gaussian() {
    let g = gaussian(1.0, 2.0);
    let rotated = g.rotate(FRAC_PI_2).unwrap();
    let c = rotated.centroid().unwrap();
    assert_relative_eq!(c.x, 0.0);
    assert_relative_eq!(c.y, 0.0);
    assert_relative_eq!(rotated.max_k(), g.max_k(), epsilon = 1e-12);
    assert_relative_eq!(rotated.step_k(), g.step_k(), epsilon = 1e-12);
    assert_relative_eq!(rotated.flux(), 1.0, epsilon = 1e-12);
    assert!(rotated.is_axisymmetric());
}

#[test]
fn test_composites_copy_their_children() {
    let mut original = gaussian(1.0, 1.0);
    let conv = Convolve::from_profiles(vec![original.clone(), gaussian(2.0, 0.5)]);
    original.set_flux(10.0).unwrap();
    assert_relative_eq!(conv.flux(), 2.0);
}

#[test]
fn test_point_source_convolution_is_a_shift() {
    let star: SbProfile = DeltaFunction::new(1.0).unwrap().into();
    let star = star.shift(0.5, 0.25).unwrap();
    let psf = gaussian(1.0, 0.6);
    let image = Convolve::from_profiles(vec![star, psf.clone()]);
    assert!(image.is_analytic_x());
    let p = Vector2::new(0.7, 0.1);
    assert_relative_eq!(
        image.x_value(p).unwrap(),
        psf.x_value(p - Vector2::new(0.5, 0.25)).unwrap(),
        epsilon = 1e-14
    );
}

#[test]
fn test_cache_capacity_and_identity() {
    let cache: ShapeCache<u32, Vec<f64>> = ShapeCache::new("test", 2);
    let first = cache.get_or_try_insert_with(1, || Ok(vec![1.0])).unwrap();
    let again = cache.get_or_try_insert_with(1, || Ok(vec![9.0])).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    cache.get_or_try_insert_with(2, || Ok(vec![2.0])).unwrap();
    assert!(matches!(
        cache.get_or_try_insert_with(3, || Ok(vec![3.0])),
        Err(ProfileError::CacheFull { capacity: 2, .. })
    ));

    let a = Sersic::new(3.0, 1.0, 1.0).unwrap();
    let b = Sersic::new(3.0, 5.0, 2.0).unwrap();
    assert!(Arc::ptr_eq(a.info(), b.info()));
}

#[test]
fn test_psf_normalization() {
    let moffat = Moffat::new(2.5, 3.0, 7.0, 1.0).unwrap();
    let airy = Airy::new(1.5, 0.0, 7.0).unwrap();
    assert_relative_eq!(moffat.k_value(Vector2::zeros()).re, 7.0, epsilon = 1e-12);
    assert_relative_eq!(airy.k_value(Vector2::zeros()).re, 7.0, epsilon = 1e-12);
}

#[test]
fn test_fourier_draw_recovers_flux() {
    let galaxy: SbProfile = Exponential::new(50.0, 0.5).unwrap().into();
    let galaxy = galaxy.shear(0.1, 0.05).unwrap();
    let observed = Convolve::from_profiles(vec![
        galaxy,
        gaussian(1.0, 0.4),
        BoxProfile::new(0.1, 0.0, 1.0).unwrap().into(),
    ]);
    let mut image = ProfileImage::new(128, 128, 0.1);
    let flux = draw_fourier(&observed, &mut image, &GsParams::default(), 1.0).unwrap();
    assert_relative_eq!(flux, 50.0, max_relative = 5e-3);
}

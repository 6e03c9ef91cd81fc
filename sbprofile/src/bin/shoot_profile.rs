//! Render a bulge-plus-disk galaxy by FFT and by photon shooting
//!
//! The galaxy is a sheared de Vaucouleurs bulge plus an exponential disk,
//! convolved with a Moffat or Airy PSF and a square pixel response. Both
//! renderings are compared on flux and centroid.
//!
//! Usage:
//! ```
//! cargo run --bin shoot_profile -- [OPTIONS]
//! ```
//!
//! See --help for detailed options.

use clap::{Parser, ValueEnum};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use sbprofile::profile::{
    Add, Airy, BoxProfile, Convolve, Exponential, Moffat, Profile, SbProfile, Sersic,
};
use sbprofile::{draw_fourier, draw_shoot, GsParams, ProfileImage};

/// PSF models available on the command line
#[derive(Debug, Clone, ValueEnum)]
enum PsfModel {
    /// Truncated Moffat with beta = 3
    Moffat,
    /// Airy disk with a 30% central obscuration
    Airy,
}

impl std::fmt::Display for PsfModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PsfModel::Moffat => write!(f, "moffat"),
            PsfModel::Airy => write!(f, "airy"),
        }
    }
}

/// Command line arguments for the profile renderer
#[derive(Parser, Debug)]
#[command(
    name = "Shoot Profile",
    about = "Renders a PSF-convolved galaxy by FFT and by photon shooting",
    long_about = None
)]
struct Args {
    /// JSON file overriding accuracy settings
    #[arg(long)]
    config: Option<String>,

    /// Seed for the photon shooting deviates
    #[arg(long, default_value_t = 1234)]
    seed: u64,

    /// Number of photons to shoot
    #[arg(long, default_value_t = 1_000_000)]
    n_photons: usize,

    /// PSF model
    #[arg(long, default_value_t = PsfModel::Moffat)]
    psf: PsfModel,

    /// PSF FWHM (Moffat) or lambda/D (Airy), in arcsec
    #[arg(long, default_value_t = 0.7)]
    psf_size: f64,

    /// Total galaxy flux
    #[arg(long, default_value_t = 1000.0)]
    flux: f64,

    /// Fraction of the flux in the bulge
    #[arg(long, default_value_t = 0.3)]
    bulge_fraction: f64,

    /// Reduced shear applied to the bulge
    #[arg(long, default_value_t = 0.2)]
    g1: f64,

    /// Pixel scale in arcsec
    #[arg(long, default_value_t = 0.2)]
    pixel_scale: f64,

    /// Image size in pixels
    #[arg(long, default_value_t = 64)]
    size: usize,
}

fn build_psf(args: &Args, params: &GsParams) -> Result<SbProfile, Box<dyn std::error::Error>> {
    let psf: SbProfile = match args.psf {
        PsfModel::Moffat => {
            let mut moffat = Moffat::with_params(3.0, 4.0, 1.0, 1.0, params)?;
            moffat.set_fwhm(args.psf_size)?;
            moffat.into()
        }
        PsfModel::Airy => Airy::with_params(1.0 / args.psf_size, 0.3, 1.0, params)?.into(),
    };
    Ok(psf)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging from environment variables
    env_logger::init();

    let args = Args::parse();
    let params = match &args.config {
        Some(path) => GsParams::from_json_file(path)?,
        None => GsParams::default(),
    };

    let bulge: SbProfile =
        Sersic::with_params(4.0, args.bulge_fraction * args.flux, 0.6, &params)?.into();
    let bulge = bulge.shear(args.g1, 0.0)?;
    let disk: SbProfile =
        Exponential::with_params((1.0 - args.bulge_fraction) * args.flux, 0.8, &params)?.into();
    let galaxy = Add::from_profiles(vec![bulge, disk]);

    let psf = build_psf(&args, &params)?;
    let pixel = BoxProfile::with_params(args.pixel_scale, 0.0, 1.0, &params)?;
    let observed = Convolve::from_profiles(vec![galaxy.into(), psf, pixel.into()]);

    println!("Shoot Profile");
    println!("=============");
    println!("  PSF: {} ({:.3} arcsec)", args.psf, args.psf_size);
    println!("  Flux: {:.2}", observed.flux());
    println!("  maxK: {:.4}  stepK: {:.5}", observed.max_k(), observed.step_k());

    let mut fft_image = ProfileImage::new(args.size, args.size, args.pixel_scale);
    let fft_flux = draw_fourier(&observed, &mut fft_image, &params, 1.0)?;
    info!("FFT rendering complete");

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut shot_image = ProfileImage::new(args.size, args.size, args.pixel_scale);
    let shot_flux = draw_shoot(&observed, &mut shot_image, args.n_photons, &mut rng)?;
    info!("Shot {} photons with seed {}", args.n_photons, args.seed);

    let fft_centroid = fft_image.centroid()?;
    let shot_centroid = shot_image.centroid()?;
    let flux_ratio = shot_flux / fft_flux;
    if (flux_ratio - 1.0).abs() > 0.01 {
        warn!("shot and FFT fluxes differ by {:.2}%", 100.0 * (flux_ratio - 1.0));
    }

    println!();
    println!("{:<8} {:>12} {:>12} {:>12}", "Method", "Flux", "Centroid x", "Centroid y");
    println!(
        "{:<8} {:>12.3} {:>12.5} {:>12.5}",
        "FFT", fft_flux, fft_centroid.x, fft_centroid.y
    );
    println!(
        "{:<8} {:>12.3} {:>12.5} {:>12.5}",
        "Shoot", shot_flux, shot_centroid.x, shot_centroid.y
    );

    Ok(())
}

//! Two-dimensional surface-brightness profiles
//!
//! Galaxy, star and PSF shapes are built from analytic and tabulated leaf
//! profiles and composed with three combinators: superposition
//! ([`profile::Add`]), convolution ([`profile::Convolve`]) and affine
//! distortion ([`profile::Distort`]). Every profile can be evaluated in real
//! and Fourier space, reports its flux, centroid and band limits, and can be
//! rendered either by FFT or by Monte-Carlo photon shooting.
//!
//! Shape-dependent tables (Sersic, Moffat and Airy) are built once per shape
//! parameter and shared process-wide through a bounded cache.

pub mod cache;
pub mod deviate;
pub mod error;
pub mod params;
pub mod photon;
pub mod profile;
pub mod radial;
pub mod render;

// Re-exports for easier access
pub use cache::{ParamKey, ShapeCache, MAX_CACHED_TABLES};
pub use deviate::{unit_disk, UniformDeviate};
pub use error::ProfileError;
pub use params::GsParams;
pub use photon::PhotonArray;
pub use profile::{
    Add, Airy, BoxProfile, Convolve, DeltaFunction, Distort, Exponential, Gaussian, Moffat,
    Profile, SbProfile, Sersic, MOCK_INF,
};
pub use render::{draw, draw_fourier, draw_k, draw_real, draw_shoot, KGrid, ProfileImage, XGrid};

//! Physical constants and instrument-fixed values used across the analysis
//! modules.

/// Planck constant in J s (CODATA 2018 exact value).
pub const PLANCK_CONSTANT: f64 = 6.626_070_15e-34;

/// Speed of light in vacuum in m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Elementary charge in C, the joule-electronvolt relationship.
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;

/// Wavelength of the He-Ne interferometry laser in nm.
pub const HENE_WAVELENGTH_NM: f64 = 632.8;

/// Refractive index of vacuum.
pub const VACUUM_INDEX: f64 = 1.0;

/// Refractive index of the MgF2 substrate window at 632.8 nm.
pub const SUBSTRATE_INDEX: f64 = 1.377;

/// Scale applied against the storage-ring beam current when normalizing the
/// photocurrent channel.
pub const BEAM_NORMALIZATION: f64 = 180.0;

/// Number of entries in the display color cycle.
pub const PALETTE_LEN: usize = 10;

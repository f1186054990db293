//! DUVET core: the numerical data model of a UV-VIS photoabsorption
//! spectroscopy end-station.
//!
//! Two workflows live here. Raw monochromator scans are averaged into
//! [`Spectrum`] absorbance curves, decomposed into gaussian peaks (with an
//! optional Rayleigh scattering baseline), stitched across wavelength ranges
//! and exported with full provenance. Independently, laser-interferometry
//! time scans recorded during ice growth are fitted with a sloped sinusoid by
//! [`DepositionTimeScan`] to extract the film's refractive index and
//! deposition rate.
//!
//! Fitting is synchronous and CPU-bound; embedding applications are expected
//! to keep these calls off any interactive thread. Instances own their state
//! exclusively and provide no internal locking.

pub mod common;
pub mod domain;
pub mod modules;
pub mod numerics;

pub use domain::{DataFormatError, DomainError, DuvetError, DuvetResult, FitError, Measured};
pub use modules::deposition::{DepositionFit, DepositionFitRequest, DepositionTimeScan};
pub use modules::scan::SingleScan;
pub use modules::spectrum::{
    CustomComponent, PeakFit, PeakFitRequest, Spectrum, stitch_spectra,
};
pub use numerics::least_squares::ParameterGuess;

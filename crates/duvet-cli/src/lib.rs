//! Command-line front end for the DUVET analysis core: batch spectrum
//! averaging, peak fitting and deposition-rate extraction.

pub mod cli;

//! Interferometric deposition time scans: fringe fitting, refractive index
//! and ice growth rate.

mod model;
mod parser;

pub use model::sloped_sinusoid;

use crate::domain::{DomainError, DuvetError, DuvetResult, FitError, Measured};
use crate::modules::serialization::{format_field, format_optional_field, write_text_artifact};
use crate::numerics::extrema::{relative_maxima, relative_minima};
use crate::numerics::least_squares::{self, ParameterGuess};
use crate::numerics::smoothing::gaussian_smooth;
use model::{SlopedSinusoid, growth_per_fringe, refractive_index_from_extrema};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Standard deviation, in samples, of the optional pre-fit smoothing.
pub const SMOOTHING_SIGMA: f64 = 7.0;

/// The raw nine-channel time-scan table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeScanColumns {
    pub time: Vec<f64>,
    pub ch0_raw: Vec<f64>,
    pub ch0_volts: Vec<f64>,
    /// The interferometric signal channel.
    pub ch2_volts: Vec<f64>,
    pub ch3_volts: Vec<f64>,
    pub z_motor: Vec<f64>,
    pub beam_current: Vec<f64>,
    pub temperature: Vec<f64>,
    pub absorbance: Vec<f64>,
}

impl TimeScanColumns {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Configuration of one deposition-rate fit.
#[derive(Debug, Clone, Copy)]
pub struct DepositionFitRequest {
    /// Guesses for m, c, tc, w, A. Defaults cover a typical deposition.
    pub guesses: Option<[ParameterGuess; 5]>,
    /// Window start in seconds, exclusive.
    pub t_start: f64,
    /// Window end in seconds, exclusive.
    pub t_end: f64,
    /// Angle between the laser and the substrate normal, in degrees.
    pub incidence_angle_degrees: f64,
    /// Smooth the interferometric channel before fitting.
    pub smoothing: bool,
}

impl Default for DepositionFitRequest {
    fn default() -> Self {
        Self {
            guesses: None,
            t_start: 0.0,
            t_end: f64::INFINITY,
            incidence_angle_degrees: 22.0,
            smoothing: true,
        }
    }
}

/// Everything derived from a successful deposition fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepositionFit {
    pub slope: Measured,
    pub intercept: Measured,
    pub phase_shift: Measured,
    pub period: Measured,
    pub amplitude: Measured,
    pub reduced_chi_square: f64,
    /// Film index from the fringe extrema; its error carries over from the
    /// fitted amplitude.
    pub refractive_index: Measured,
    /// Ice growth rate in nm/s.
    pub deposition_rate: Measured,
    /// `(time, signal)` of the last fitted fringe minimum.
    pub r_min: (f64, f64),
    /// `(time, signal)` of the last fitted fringe maximum.
    pub r_max: (f64, f64),
    /// True when no relative extremum existed and the global extrema of the
    /// fitted curve were used instead.
    pub extrema_from_fallback: bool,
}

/// A laser-interferometry time series recorded while an ice film grows.
#[derive(Debug, Clone)]
pub struct DepositionTimeScan {
    source: PathBuf,
    pub data: TimeScanColumns,
    smoothed: Option<Vec<f64>>,
    best_fit: Option<Vec<f64>>,
    fit: Option<DepositionFit>,
}

impl DepositionTimeScan {
    pub fn from_file(path: impl AsRef<Path>) -> DuvetResult<Self> {
        let path = path.as_ref();
        let data = parser::parse_timescan_file(path)?;
        Ok(Self::from_columns(path, data))
    }

    pub(crate) fn from_columns(path: &Path, data: TimeScanColumns) -> Self {
        Self {
            source: path.to_path_buf(),
            data,
            smoothed: None,
            best_fit: None,
            fit: None,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn fit(&self) -> Option<&DepositionFit> {
        self.fit.as_ref()
    }

    /// Smoothed interferometric channel, NaN outside the fit window. Absent
    /// when the last fit ran without smoothing.
    pub fn smoothed(&self) -> Option<&[f64]> {
        self.smoothed.as_deref()
    }

    /// Fitted curve, NaN outside the fit window.
    pub fn best_fit(&self) -> Option<&[f64]> {
        self.best_fit.as_deref()
    }

    /// Fit the sloped sinusoid to the interferometric channel and derive the
    /// film's refractive index and deposition rate from the fringe extrema.
    ///
    /// The reduced chi-square keeps the historical `/5` denominator and is
    /// always evaluated against the raw (unsmoothed) channel. Refitting
    /// replaces the stored fit columns wholesale.
    pub fn find_deposition_rate(
        &mut self,
        request: &DepositionFitRequest,
    ) -> DuvetResult<&DepositionFit> {
        let mut window_indices = Vec::new();
        let mut window_t = Vec::new();
        let mut window_signal = Vec::new();
        for (index, (&t, &signal)) in self.data.time.iter().zip(&self.data.ch2_volts).enumerate() {
            if t > request.t_start && t < request.t_end {
                window_indices.push(index);
                window_t.push(t);
                window_signal.push(signal);
            }
        }
        if window_t.is_empty() {
            return Err(FitError::EmptyWindow {
                lower: request.t_start,
                upper: request.t_end,
            }
            .into());
        }

        let fit_target = if request.smoothing {
            gaussian_smooth(&window_signal, SMOOTHING_SIGMA)
        } else {
            window_signal.clone()
        };

        let guesses = request.guesses.unwrap_or_else(model::default_guesses);
        let fitted = least_squares::curve_fit(&SlopedSinusoid, &window_t, &fit_target, &guesses)?;

        let slope = Measured::new(fitted.parameters[0], fitted.errors[0]);
        let intercept = Measured::new(fitted.parameters[1], fitted.errors[1]);
        let phase_shift = Measured::new(fitted.parameters[2], fitted.errors[2]);
        let period = Measured::new(fitted.parameters[3], fitted.errors[3]);
        let amplitude = Measured::new(fitted.parameters[4], fitted.errors[4]);

        let curve = &fitted.best_fit;
        let reduced_chi_square = window_signal
            .iter()
            .zip(curve)
            .map(|(&raw, &fit)| (raw - fit).powi(2) / fit)
            .sum::<f64>()
            / 5.0;

        let maxima = relative_maxima(curve);
        let (r_max, max_from_fallback) = match maxima.last() {
            Some(&index) => ((window_t[index], curve[index]), false),
            None => {
                tracing::warn!(
                    "no relative maximum on the fitted curve, taking the global maximum"
                );
                let index = argmax(curve);
                ((window_t[index], curve[index]), true)
            }
        };
        let minima = relative_minima(curve);
        let (r_min, min_from_fallback) = match minima.last() {
            Some(&index) => ((window_t[index], curve[index]), false),
            None => {
                tracing::warn!(
                    "no relative minimum on the fitted curve, taking the global minimum"
                );
                let index = argmin(curve);
                ((window_t[index], curve[index]), true)
            }
        };

        let refractive_index = refractive_index_from_extrema(r_min.1, r_max.1);
        if refractive_index < 1.0 {
            tracing::warn!(
                refractive_index,
                "refractive index below 1 is not physical; check the fit"
            );
        }

        let growth = growth_per_fringe(refractive_index, request.incidence_angle_degrees);
        let growth_error = amplitude.error.map(|error| error / refractive_index);
        let rate = growth / (2.0 * period.value);
        let rate_error = match (growth_error, period.error) {
            (Some(growth_error), Some(period_error)) => Some(
                ((growth_error / growth).powi(2) + (period_error / period.value).powi(2)).sqrt(),
            ),
            _ => None,
        };

        let total = self.data.len();
        let mut best_fit_column = vec![f64::NAN; total];
        for (window_position, &data_index) in window_indices.iter().enumerate() {
            best_fit_column[data_index] = curve[window_position];
        }
        self.best_fit = Some(best_fit_column);
        self.smoothed = request.smoothing.then(|| {
            let mut smoothed_column = vec![f64::NAN; total];
            for (window_position, &data_index) in window_indices.iter().enumerate() {
                smoothed_column[data_index] = fit_target[window_position];
            }
            smoothed_column
        });

        let fit = DepositionFit {
            slope,
            intercept,
            phase_shift,
            period,
            amplitude,
            reduced_chi_square,
            refractive_index: Measured::new(refractive_index, amplitude.error),
            deposition_rate: Measured::new(rate, rate_error),
            r_min,
            r_max,
            extrema_from_fallback: max_from_fallback || min_from_fallback,
        };
        tracing::debug!(
            rate,
            refractive_index,
            redchi2 = reduced_chi_square,
            "deposition fit complete"
        );
        Ok(self.fit.insert(fit))
    }

    /// Thickness in nm of an ice deposited at the fitted rate for
    /// `deposition_seconds`.
    pub fn find_thickness(&self, deposition_seconds: f64) -> DuvetResult<Measured> {
        let fit = self.fit.as_ref().ok_or(DomainError::RateNotComputed)?;
        Ok(fit.deposition_rate.scaled(deposition_seconds))
    }

    /// Seconds needed to deposit an ice of `thickness_nm` at the fitted rate.
    pub fn find_deposition_time(&self, thickness_nm: f64) -> DuvetResult<Measured> {
        let fit = self.fit.as_ref().ok_or(DomainError::RateNotComputed)?;
        let seconds = thickness_nm / fit.deposition_rate.value;
        Ok(Measured::new(
            seconds,
            fit.deposition_rate
                .relative_error()
                .map(|relative| seconds * relative),
        ))
    }

    /// Fitted and derived parameters as `(name, value +- error)` rows.
    pub fn parameter_table(&self) -> DuvetResult<Vec<(&'static str, Measured)>> {
        let fit = self.fit.as_ref().ok_or(DomainError::RateNotComputed)?;
        Ok(vec![
            ("m", fit.slope),
            ("c", fit.intercept),
            ("tc", fit.phase_shift),
            ("w", fit.period),
            ("A", fit.amplitude),
            ("deposition rate (nm/s)", fit.deposition_rate),
            ("refractive index", fit.refractive_index),
            ("redchi2", Measured::exact(fit.reduced_chi_square)),
        ])
    }

    /// Write the fitted parameters as a `name,value,error` table.
    pub fn export(&self, path: &Path) -> DuvetResult<()> {
        let rows = self.parameter_table()?;
        let mut out = String::from("name,value,error\n");
        for (name, measured) in rows {
            let _ = writeln!(
                out,
                "{name},{},{}",
                format_field(measured.value),
                format_optional_field(measured.error)
            );
        }
        write_text_artifact(path, &out).map_err(|source| DuvetError::Io {
            action: "write deposition export",
            path: path.to_path_buf(),
            source,
        })
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (index, &value) in values.iter().enumerate() {
        if value > values[best] {
            best = index;
        }
    }
    best
}

fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (index, &value) in values.iter().enumerate() {
        if value < values[best] {
            best = index;
        }
    }
    best
}

//! Multi-gaussian peak fitting with candidate-count model selection.

use super::Spectrum;
use super::model::{
    self, CustomComponent, DecodedParameters, ParameterLayout, PeakModel, gaussian, scattering,
};
use crate::domain::{DomainError, DuvetResult, FitError, Measured};
use crate::numerics::interpolate::interp_with_fill;
use crate::numerics::least_squares::{self, CurveFit, LeastSquaresError, ParameterGuess};
use serde::Serialize;
use std::ops::RangeInclusive;

/// Configuration of one peak-fitting session.
#[derive(Debug, Clone)]
pub struct PeakFitRequest {
    /// Wavelength window, exclusive on both ends.
    pub window: (f64, f64),
    /// Candidate gaussian counts to try; the reduced chi-square closest to
    /// one decides which candidate is kept.
    pub gaussian_counts: RangeInclusive<usize>,
    /// Include the Rayleigh scattering baseline in the model.
    pub include_scattering: bool,
    /// Fixed curves mixed in with fitted scale factors.
    pub custom_components: Vec<CustomComponent>,
    /// Guesses for the largest candidate, in layout order. Auto-generated
    /// when absent.
    pub guesses: Option<Vec<ParameterGuess>>,
}

impl Default for PeakFitRequest {
    fn default() -> Self {
        Self {
            window: (120.0, 340.0),
            gaussian_counts: 1..=3,
            include_scattering: false,
            custom_components: Vec::new(),
            guesses: None,
        }
    }
}

/// One reconstructed sub-curve of the accepted fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitComponent {
    pub label: String,
    pub wavelength: Vec<f64>,
    pub absorbance: Vec<f64>,
}

/// The accepted fit and everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakFit {
    pub reduced_chi_square: f64,
    pub gaussian_count: usize,
    pub included_scattering: bool,
    pub parameters: DecodedParameters,
    /// Gaussian centers with their fit errors.
    pub peaks: Vec<Measured>,
    pub components: Vec<FitComponent>,
    pub covariance: Option<Vec<Vec<f64>>>,
}

struct Candidate {
    count: usize,
    fit: CurveFit,
    reduced_chi_square: f64,
}

impl Spectrum {
    /// Fit the absorbance curve with each candidate number of gaussians and
    /// keep the candidate whose reduced chi-square lands closest to one.
    ///
    /// The fit target is `absorbance + offset` inside the window; the stored
    /// `best_fit` is shifted back so it lines up with the unoffset
    /// absorbance. Masked (NaN) absorbance points carry no information and
    /// are excluded from the fit.
    ///
    /// The reduced chi-square keeps the historical convention of this
    /// instrument's tooling: `sum((fit - absorbance)^2 / fit)` divided by the
    /// parameter count, not by the statistical degrees of freedom.
    pub fn fit_peaks(&mut self, request: &PeakFitRequest) -> DuvetResult<&PeakFit> {
        let (lower, upper) = request.window;
        let data = self.data.as_ref().ok_or_else(|| DomainError::NotAveraged {
            name: self.name.clone(),
        })?;
        let full_wavelength = data.wavelength.clone();
        let full_absorbance = data.absorbance.clone();

        self.changelog.record(format!(
            "initializing fitting procedure with fit limits {lower} and {upper} nm"
        ));
        self.changelog.record(if request.include_scattering {
            "scattering baseline will be included in the fit"
        } else {
            "scattering baseline will not be included in the fit"
        });

        let mut window_indices = Vec::new();
        let mut window_wl = Vec::new();
        let mut window_ab = Vec::new();
        for (index, (&wavelength, &absorbance)) in
            full_wavelength.iter().zip(&full_absorbance).enumerate()
        {
            if wavelength > lower && wavelength < upper && absorbance.is_finite() {
                window_indices.push(index);
                window_wl.push(wavelength);
                window_ab.push(absorbance);
            }
        }
        if window_wl.is_empty() {
            return Err(FitError::EmptyWindow { lower, upper }.into());
        }
        let target: Vec<f64> = window_ab
            .iter()
            .map(|&absorbance| absorbance + self.offset)
            .collect();

        let mut component_curves = Vec::with_capacity(request.custom_components.len());
        for component in &request.custom_components {
            let resampled = interp_with_fill(
                &window_wl,
                &component.wavelength,
                &component.absorbance,
                0.0,
            )
            .map_err(|error| {
                FitError::Solver(LeastSquaresError::Model {
                    reason: format!("custom component '{}': {error}", component.label),
                })
            })?;
            component_curves.push(resampled);
        }

        let counts: Vec<usize> = request.gaussian_counts.clone().collect();
        let Some(&max_count) = counts.last() else {
            return Err(FitError::NoCandidates.into());
        };
        self.changelog.record(format!(
            "fitting will use between {} and {max_count} gaussian functions",
            counts[0]
        ));

        let guesses = match &request.guesses {
            Some(guesses) => guesses.clone(),
            None => {
                self.changelog
                    .record("no guesses provided, generating automatic guesses");
                let centers = model::linspace(window_wl[0], window_wl[window_wl.len() - 1], max_count);
                model::auto_guesses(component_curves.len(), request.include_scattering, &centers)
            }
        };
        let needed = ParameterLayout::new(
            component_curves.len(),
            request.include_scattering,
            max_count,
        )
        .len();
        if guesses.len() < needed {
            return Err(FitError::GuessCount {
                needed,
                found: guesses.len(),
            }
            .into());
        }

        let mut candidates = Vec::with_capacity(counts.len());
        for &count in &counts {
            self.changelog
                .record(format!("attempting fit with {count} gaussians"));
            let peak_model =
                PeakModel::new(component_curves.clone(), request.include_scattering, count);
            let parameter_count = peak_model.layout().len();
            let fit = least_squares::curve_fit(
                &peak_model,
                &window_wl,
                &target,
                &guesses[..parameter_count],
            )
            .map_err(FitError::Solver)?;

            let reduced_chi_square = window_ab
                .iter()
                .zip(&fit.best_fit)
                .map(|(&absorbance, &fitted)| (fitted - absorbance).powi(2) / fitted)
                .sum::<f64>()
                / parameter_count as f64;
            self.changelog.record(format!(
                "fit success with {count} gaussians and reduced chi2 {reduced_chi_square:.4}"
            ));
            candidates.push(Candidate {
                count,
                fit,
                reduced_chi_square,
            });
        }

        // Model selection: closest to 1.0, first candidate wins ties.
        let mut best_index = 0;
        for (index, candidate) in candidates.iter().enumerate() {
            let this_distance = (1.0 - candidate.reduced_chi_square).abs();
            let best_distance = (1.0 - candidates[best_index].reduced_chi_square).abs();
            if this_distance < best_distance {
                best_index = index;
            }
        }
        let best = candidates.remove(best_index);
        self.changelog.record(format!(
            "the best fit was achieved with {} gaussians and a reduced chi2 of {:.4}",
            best.count, best.reduced_chi_square
        ));

        let mut best_fit_column = vec![f64::NAN; full_wavelength.len()];
        for (window_position, &data_index) in window_indices.iter().enumerate() {
            best_fit_column[data_index] = best.fit.best_fit[window_position] - self.offset;
        }
        let residuals: Vec<f64> = full_absorbance
            .iter()
            .zip(&best_fit_column)
            .map(|(&absorbance, &fitted)| absorbance - fitted)
            .collect();

        let layout = ParameterLayout::new(
            component_curves.len(),
            request.include_scattering,
            best.count,
        );
        let decoded = layout.decode(&best.fit.parameters, &best.fit.errors);
        let peaks: Vec<Measured> = decoded.gaussians.iter().map(|peak| peak.center).collect();

        let mut components = Vec::new();
        for (index, component) in request.custom_components.iter().enumerate() {
            let scale = decoded.component_scales[index].value;
            components.push(FitComponent {
                label: component.label.clone(),
                wavelength: window_wl.clone(),
                absorbance: component_curves[index]
                    .iter()
                    .map(|&value| scale * value)
                    .collect(),
            });
        }
        if let Some(parameters) = decoded.scattering {
            let curve: Vec<f64> = full_wavelength
                .iter()
                .map(|&wavelength| {
                    scattering(wavelength, parameters.m.value, parameters.k.value)
                        .unwrap_or(f64::NAN)
                })
                .collect();
            components.push(FitComponent {
                label: "scattering".to_string(),
                wavelength: full_wavelength.clone(),
                absorbance: curve,
            });
        }
        for (peak_index, parameters) in decoded.gaussians.iter().enumerate() {
            let curve: Vec<f64> = full_wavelength
                .iter()
                .map(|&wavelength| {
                    gaussian(
                        wavelength,
                        parameters.amplitude.value,
                        parameters.center.value,
                        parameters.sigma.value,
                    )
                })
                .collect();
            components.push(FitComponent {
                label: format!("gaussian {}", peak_index + 1),
                wavelength: full_wavelength.clone(),
                absorbance: curve,
            });
        }

        let data = self.data.as_mut().ok_or_else(|| DomainError::NotAveraged {
            name: self.name.clone(),
        })?;
        data.best_fit = Some(best_fit_column);
        data.residuals = Some(residuals);

        let peak_fit = PeakFit {
            reduced_chi_square: best.reduced_chi_square,
            gaussian_count: best.count,
            included_scattering: request.include_scattering,
            parameters: decoded,
            peaks,
            components,
            covariance: best.fit.covariance,
        };
        Ok(self.fit.insert(peak_fit))
    }
}

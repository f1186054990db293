//! Peak-fit model functions and the typed layout of the flat optimizer
//! parameter vector.

use crate::domain::{DomainError, Measured};
use crate::numerics::least_squares::{CurveModel, LeastSquaresError, ParameterGuess};
use serde::Serialize;
use std::f64::consts::PI;

/// Lower bound applied to auto-generated gaussian widths, in nanometers.
/// Keeps the normalized gaussian finite as the optimizer explores.
pub const SIGMA_FLOOR: f64 = 1.0e-3;

pub(super) const GAUSSIAN_SPAN: usize = 3;
pub(super) const SCATTERING_SPAN: usize = 2;

/// Gaussian with integrated area `amplitude`, centered at `center`.
pub fn gaussian(x: f64, amplitude: f64, center: f64, sigma: f64) -> f64 {
    let z = (x - center) / sigma;
    amplitude / (sigma * (2.0 * PI).sqrt()) * (-0.5 * z * z).exp()
}

/// Rayleigh scattering baseline, `k ln(1/(1 - m wavelength^-4))`, equation 11
/// of Ioppolo et al. 2021 (A&A 646, A172). The argument of the logarithm must
/// stay positive; a violation is a typed error, never a silent NaN.
pub fn scattering(wavelength: f64, m: f64, k: f64) -> Result<f64, DomainError> {
    let argument = 1.0 - m * wavelength.powi(-4);
    if argument <= 0.0 {
        return Err(DomainError::ScatteringArgument {
            m,
            wavelength,
            argument,
        });
    }
    Ok(k * (1.0 / argument).ln())
}

/// A caller-supplied curve mixed into the fit with one fitted scale factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomComponent {
    pub label: String,
    pub wavelength: Vec<f64>,
    pub absorbance: Vec<f64>,
}

/// One typed group of the flat parameter vector, in optimizer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParameterGroup {
    /// Scale factor of one custom component.
    ComponentScale { component: usize },
    /// Rayleigh baseline steepness `m` and amplitude `k`.
    Scattering,
    /// Amplitude, center, standard deviation of one gaussian.
    Gaussian { peak: usize },
}

impl ParameterGroup {
    pub const fn span(self) -> usize {
        match self {
            Self::ComponentScale { .. } => 1,
            Self::Scattering => SCATTERING_SPAN,
            Self::Gaussian { .. } => GAUSSIAN_SPAN,
        }
    }
}

/// Ordered description of how the flat parameter vector is partitioned:
/// custom-component scales first, then the scattering pair when enabled,
/// then three entries per gaussian. Encoding and decoding both go through
/// this layout, so the optimizer-facing ordering has a single owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterLayout {
    groups: Vec<ParameterGroup>,
}

impl ParameterLayout {
    pub fn new(component_count: usize, include_scattering: bool, gaussian_count: usize) -> Self {
        let mut groups = Vec::new();
        for component in 0..component_count {
            groups.push(ParameterGroup::ComponentScale { component });
        }
        if include_scattering {
            groups.push(ParameterGroup::Scattering);
        }
        for peak in 0..gaussian_count {
            groups.push(ParameterGroup::Gaussian { peak });
        }
        Self { groups }
    }

    pub fn groups(&self) -> &[ParameterGroup] {
        &self.groups
    }

    /// Total number of flat parameters the layout describes.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|group| group.span()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Split flat values and their errors back into typed groups.
    pub fn decode(&self, values: &[f64], errors: &[Option<f64>]) -> DecodedParameters {
        let mut decoded = DecodedParameters::default();
        let mut cursor = 0;
        for group in &self.groups {
            let span = group.span();
            let slot = |offset: usize| {
                Measured::new(
                    values[cursor + offset],
                    errors.get(cursor + offset).copied().flatten(),
                )
            };
            match group {
                ParameterGroup::ComponentScale { .. } => decoded.component_scales.push(slot(0)),
                ParameterGroup::Scattering => {
                    decoded.scattering = Some(ScatteringParameters {
                        m: slot(0),
                        k: slot(1),
                    });
                }
                ParameterGroup::Gaussian { .. } => decoded.gaussians.push(GaussianParameters {
                    amplitude: slot(0),
                    center: slot(1),
                    sigma: slot(2),
                }),
            }
            cursor += span;
        }
        decoded
    }
}

/// Fitted Rayleigh baseline parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatteringParameters {
    pub m: Measured,
    pub k: Measured,
}

/// Fitted parameters of one gaussian component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GaussianParameters {
    pub amplitude: Measured,
    pub center: Measured,
    pub sigma: Measured,
}

/// The flat fit parameters decoded into their typed groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecodedParameters {
    pub component_scales: Vec<Measured>,
    pub scattering: Option<ScatteringParameters>,
    pub gaussians: Vec<GaussianParameters>,
}

/// Default guesses for a fit session whose largest candidate uses
/// `centers.len()` gaussians: scales and scattering start at 1, amplitudes
/// at 1, sigmas at 5 nm, centers evenly spaced across the fit window.
pub(super) fn auto_guesses(
    component_count: usize,
    include_scattering: bool,
    centers: &[f64],
) -> Vec<ParameterGuess> {
    let mut guesses = Vec::new();
    for _ in 0..component_count {
        guesses.push(ParameterGuess::non_negative(1.0));
    }
    if include_scattering {
        guesses.push(ParameterGuess::non_negative(1.0)); // m
        guesses.push(ParameterGuess::non_negative(1.0)); // k
    }
    for &center in centers {
        guesses.push(ParameterGuess::non_negative(1.0));
        guesses.push(ParameterGuess::non_negative(center));
        guesses.push(ParameterGuess::new(SIGMA_FLOOR, 5.0, f64::INFINITY));
    }
    guesses
}

/// `count` values evenly spaced from `start` to `end` inclusive.
pub(super) fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..count)
            .map(|index| start + (end - start) * index as f64 / (count - 1) as f64)
            .collect(),
    }
}

/// The composite fit function: scaled custom components, plus the Rayleigh
/// baseline when enabled, plus `gaussian_count` gaussians. Component curves
/// must already be resampled onto the fit grid.
#[derive(Debug, Clone)]
pub(super) struct PeakModel {
    components: Vec<Vec<f64>>,
    include_scattering: bool,
    gaussian_count: usize,
}

impl PeakModel {
    pub(super) fn new(
        components: Vec<Vec<f64>>,
        include_scattering: bool,
        gaussian_count: usize,
    ) -> Self {
        Self {
            components,
            include_scattering,
            gaussian_count,
        }
    }

    pub(super) fn layout(&self) -> ParameterLayout {
        ParameterLayout::new(
            self.components.len(),
            self.include_scattering,
            self.gaussian_count,
        )
    }
}

impl CurveModel for PeakModel {
    fn evaluate(&self, x: &[f64], params: &[f64]) -> Result<Vec<f64>, LeastSquaresError> {
        let expected = self.layout().len();
        if params.len() != expected {
            return Err(LeastSquaresError::Model {
                reason: format!(
                    "peak model expects {expected} parameters, got {}",
                    params.len()
                ),
            });
        }

        let mut y = vec![0.0; x.len()];
        let mut cursor = 0;

        for component in &self.components {
            let scale = params[cursor];
            cursor += 1;
            for (value, &contribution) in y.iter_mut().zip(component) {
                *value += scale * contribution;
            }
        }

        if self.include_scattering {
            let (m, k) = (params[cursor], params[cursor + 1]);
            cursor += SCATTERING_SPAN;
            for (value, &xi) in y.iter_mut().zip(x) {
                *value += scattering(xi, m, k).map_err(|error| LeastSquaresError::Model {
                    reason: error.to_string(),
                })?;
            }
        }

        for _ in 0..self.gaussian_count {
            let (amplitude, center, sigma) =
                (params[cursor], params[cursor + 1], params[cursor + 2]);
            cursor += GAUSSIAN_SPAN;
            for (value, &xi) in y.iter_mut().zip(x) {
                *value += gaussian(xi, amplitude, center, sigma);
            }
        }

        Ok(y)
    }
}

/// Rayleigh baseline plus a constant offset, fitted to caller-chosen flat
/// regions during baseline subtraction.
#[derive(Debug, Clone, Copy)]
pub(super) struct ScatteringBaseline;

impl CurveModel for ScatteringBaseline {
    fn evaluate(&self, x: &[f64], params: &[f64]) -> Result<Vec<f64>, LeastSquaresError> {
        let (m, k, offset) = (params[0], params[1], params[2]);
        x.iter()
            .map(|&xi| {
                scattering(xi, m, k)
                    .map(|value| value + offset)
                    .map_err(|error| LeastSquaresError::Model {
                        reason: error.to_string(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CurveModel, ParameterGroup, ParameterLayout, PeakModel, auto_guesses, gaussian, linspace,
        scattering,
    };
    use crate::domain::DomainError;
    use approx::assert_relative_eq;

    #[test]
    fn gaussian_is_normalized_to_its_amplitude() {
        // Integrate numerically over a wide grid.
        let step = 0.01;
        let integral: f64 = (0..100_000)
            .map(|index| gaussian(index as f64 * step - 500.0, 2.0, 10.0, 5.0) * step)
            .sum();
        assert_relative_eq!(integral, 2.0, max_relative = 1.0e-6);

        let peak_height = gaussian(10.0, 2.0, 10.0, 5.0);
        assert_relative_eq!(
            peak_height,
            2.0 / (5.0 * (2.0 * std::f64::consts::PI).sqrt()),
            max_relative = 1.0e-12
        );
    }

    #[test]
    fn scattering_rejects_arguments_outside_its_domain() {
        // 500^-4 is tiny, so a huge m is needed to violate the domain.
        let m = 2.0 * 500.0_f64.powi(4);
        let error = scattering(500.0, m, 1.0).expect_err("argument <= 0 should fail");
        assert!(matches!(error, DomainError::ScatteringArgument { .. }));

        let value = scattering(500.0, 1.0, 1.0).expect("tiny m is in-domain");
        assert!(value.is_finite());
    }

    #[test]
    fn layout_orders_scales_then_scattering_then_gaussians() {
        let layout = ParameterLayout::new(2, true, 3);
        assert_eq!(layout.len(), 2 + 2 + 9);
        assert_eq!(
            layout.groups()[0],
            ParameterGroup::ComponentScale { component: 0 }
        );
        assert_eq!(layout.groups()[2], ParameterGroup::Scattering);
        assert_eq!(layout.groups()[3], ParameterGroup::Gaussian { peak: 0 });
    }

    #[test]
    fn decode_splits_values_and_errors_into_groups() {
        let layout = ParameterLayout::new(1, true, 1);
        let values = [0.5, 1.0, 2.0, 3.0, 250.0, 7.0];
        let errors = [Some(0.1), Some(0.2), None, Some(0.3), Some(1.5), None];

        let decoded = layout.decode(&values, &errors);
        assert_eq!(decoded.component_scales.len(), 1);
        assert_eq!(decoded.component_scales[0].value, 0.5);

        let scattering = decoded.scattering.expect("scattering group present");
        assert_eq!(scattering.m.value, 1.0);
        assert_eq!(scattering.k.error, None);

        assert_eq!(decoded.gaussians.len(), 1);
        assert_eq!(decoded.gaussians[0].center.value, 250.0);
        assert_eq!(decoded.gaussians[0].center.error, Some(1.5));
    }

    #[test]
    fn auto_guesses_cover_the_largest_candidate() {
        let centers = linspace(120.0, 340.0, 4);
        let guesses = auto_guesses(1, true, &centers);
        assert_eq!(guesses.len(), 1 + 2 + 12);
        // Gaussian centers land on the window edges and interior points:
        // layout is [scale, m, k, (amp, center, sigma) x 4].
        assert_eq!(guesses[4].guess, 120.0);
        assert_eq!(guesses[13].guess, 340.0);
        // Sigmas carry the positive floor.
        assert!(guesses[5].lower > 0.0);
    }

    #[test]
    fn peak_model_sums_its_enabled_terms() {
        let x = [200.0, 250.0, 300.0];
        let component = vec![1.0, 2.0, 3.0];
        let model = PeakModel::new(vec![component], false, 1);

        // scale 2, one gaussian centered mid-grid
        let params = [2.0, 1.0, 250.0, 10.0];
        let y = model.evaluate(&x, &params).expect("evaluation should succeed");
        assert_relative_eq!(y[0], 2.0 + gaussian(200.0, 1.0, 250.0, 10.0));
        assert_relative_eq!(y[1], 4.0 + gaussian(250.0, 1.0, 250.0, 10.0));
        assert_relative_eq!(y[2], 6.0 + gaussian(300.0, 1.0, 250.0, 10.0));
    }

    #[test]
    fn peak_model_rejects_mismatched_parameter_counts() {
        let model = PeakModel::new(Vec::new(), true, 1);
        let error = model
            .evaluate(&[200.0], &[1.0, 1.0])
            .expect_err("5 parameters are required");
        assert!(error.to_string().contains("expects 5 parameters"));
    }

    #[test]
    fn linspace_spans_the_interval_inclusively() {
        assert_eq!(linspace(0.0, 10.0, 3), vec![0.0, 5.0, 10.0]);
        assert_eq!(linspace(1.0, 2.0, 1), vec![1.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }
}

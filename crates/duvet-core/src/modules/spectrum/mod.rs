//! The averaged, calibrated absorbance spectrum and its operations.

mod fit;
mod model;
mod stitch;

pub use fit::{FitComponent, PeakFit, PeakFitRequest};
pub use model::{
    CustomComponent, DecodedParameters, GaussianParameters, ParameterGroup, ParameterLayout,
    SIGMA_FLOOR, ScatteringParameters, gaussian, scattering,
};
pub use stitch::stitch_spectra;

use crate::common::palette::ColorCycle;
use crate::domain::{Changelog, DomainError, DuvetError, DuvetResult, Measured};
use crate::modules::scan::{ScanColumns, SingleScan};
use crate::modules::serialization::{format_field, write_text_artifact};
use crate::numerics::least_squares::ParameterGuess;
use model::ScatteringBaseline;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// The absorbance table. Columns that only exist after a later processing
/// step are typed as optional instead of being probed at runtime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectrumData {
    pub wavelength: Vec<f64>,
    pub absorbance: Vec<f64>,
    /// Pre-shift absorbance, captured by the first baseline subtraction.
    pub raw_absorbance: Option<Vec<f64>>,
    /// Fitted scattering baseline, when one was subtracted.
    pub baseline: Option<Vec<f64>>,
    /// Best-fit curve, NaN outside the fit window.
    pub best_fit: Option<Vec<f64>>,
    /// `absorbance - best_fit`, NaN wherever either side is masked.
    pub residuals: Option<Vec<f64>>,
}

impl SpectrumData {
    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
    DashDot,
}

impl LineStyle {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Dashed => "dashed",
            Self::Dotted => "dotted",
            Self::DashDot => "dashdot",
        }
    }
}

/// How `subtract_baseline` picks its zero point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineMethod {
    /// Shift so the minimum absorbance in the search window becomes zero.
    Min,
    /// Shift so the last point in the search window becomes zero.
    Right,
}

impl BaselineMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Right => "right",
        }
    }
}

/// Fitted region-baseline parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineFit {
    pub m: Measured,
    pub k: Measured,
    pub offset: Measured,
}

/// The averaged result of one or more background/sample scan pairs.
#[derive(Debug, Clone)]
pub struct Spectrum {
    name: String,
    description: String,
    backgrounds: Vec<SingleScan>,
    samples: Vec<SingleScan>,
    background_mean: Option<ScanColumns>,
    sample_mean: Option<ScanColumns>,
    data: Option<SpectrumData>,
    color: ColorCycle,
    line_style: LineStyle,
    line_width: f64,
    visible: bool,
    offset: f64,
    changelog: Changelog,
    fit: Option<PeakFit>,
    baseline_fit: Option<BaselineFit>,
}

impl Spectrum {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut changelog = Changelog::default();
        changelog.record(format!("initialized spectrum '{name}'"));
        Self {
            name,
            description: String::new(),
            backgrounds: Vec::new(),
            samples: Vec::new(),
            background_mean: None,
            sample_mean: None,
            data: None,
            color: ColorCycle::next_in_creation_order(),
            line_style: LineStyle::Solid,
            line_width: 2.0,
            visible: true,
            offset: 0.0,
            changelog,
            fit: None,
            baseline_fit: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, new_name: impl Into<String>) {
        self.name = new_name.into();
        self.changelog.record(format!("changed name to {}", self.name));
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn backgrounds(&self) -> &[SingleScan] {
        &self.backgrounds
    }

    pub fn samples(&self) -> &[SingleScan] {
        &self.samples
    }

    pub fn data(&self) -> Option<&SpectrumData> {
        self.data.as_ref()
    }

    pub fn background_mean(&self) -> Option<&ScanColumns> {
        self.background_mean.as_ref()
    }

    pub fn sample_mean(&self) -> Option<&ScanColumns> {
        self.sample_mean.as_ref()
    }

    pub fn fit(&self) -> Option<&PeakFit> {
        self.fit.as_ref()
    }

    /// Fitted gaussian centers with their errors, once `fit_peaks` has run.
    pub fn peaks(&self) -> Option<&[Measured]> {
        self.fit.as_ref().map(|fit| fit.peaks.as_slice())
    }

    pub fn baseline_fit(&self) -> Option<&BaselineFit> {
        self.baseline_fit.as_ref()
    }

    pub fn changelog(&self) -> &Changelog {
        &self.changelog
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Pure display/fit-input shift; never baked into `absorbance`.
    pub fn set_offset(&mut self, offset: f64) {
        let old = self.offset;
        self.offset = offset;
        self.changelog
            .record(format!("changed offset from {old} to {offset}"));
    }

    pub fn color(&self) -> &'static str {
        self.color.hex()
    }

    pub fn cycle_color(&mut self) {
        let old = self.color.hex();
        self.color.cycle();
        self.changelog
            .record(format!("changed color from {old} to {}", self.color.hex()));
    }

    /// Jump to a specific palette entry (wrapping on overflow).
    pub fn set_color_index(&mut self, index: usize) {
        let old = self.color.hex();
        self.color = ColorCycle::from_index(index);
        self.changelog
            .record(format!("changed color from {old} to {}", self.color.hex()));
    }

    pub fn line_style(&self) -> LineStyle {
        self.line_style
    }

    pub fn set_line_style(&mut self, style: LineStyle) {
        let old = self.line_style;
        self.line_style = style;
        self.changelog.record(format!(
            "linestyle changed from {} to {}",
            old.as_str(),
            style.as_str()
        ));
    }

    pub fn line_width(&self) -> f64 {
        self.line_width
    }

    pub fn set_line_width(&mut self, width: f64) {
        let old = self.line_width;
        self.line_width = width;
        self.changelog
            .record(format!("linewidth changed from {old} to {width}"));
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn flip_visibility(&mut self) {
        self.visible = !self.visible;
        self.changelog.record(format!(
            "flipped visibility from {} to {}",
            !self.visible, self.visible
        ));
    }

    /// Attach a background scan file and return the created scan.
    pub fn add_background(&mut self, path: impl AsRef<Path>) -> DuvetResult<&SingleScan> {
        let scan = SingleScan::from_file(path.as_ref())?;
        self.changelog
            .record(format!("added bkgd file {}", path.as_ref().display()));
        self.backgrounds.push(scan);
        let index = self.backgrounds.len() - 1;
        Ok(&self.backgrounds[index])
    }

    /// Attach a sample scan file and return the created scan.
    pub fn add_sample(&mut self, path: impl AsRef<Path>) -> DuvetResult<&SingleScan> {
        let scan = SingleScan::from_file(path.as_ref())?;
        self.changelog
            .record(format!("added sample file {}", path.as_ref().display()));
        self.samples.push(scan);
        let index = self.samples.len() - 1;
        Ok(&self.samples[index])
    }

    /// Detach the first background whose source path matches. Returns
    /// whether anything was removed.
    pub fn remove_background(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let Some(index) = self
            .backgrounds
            .iter()
            .position(|scan| scan.source() == path)
        else {
            return false;
        };
        self.backgrounds.remove(index);
        self.changelog
            .record(format!("removed bkgd file {}", path.display()));
        true
    }

    /// Detach the first sample whose source path matches.
    pub fn remove_sample(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let Some(index) = self.samples.iter().position(|scan| scan.source() == path) else {
            return false;
        };
        self.samples.remove(index);
        self.changelog
            .record(format!("removed sample file {}", path.display()));
        true
    }

    /// Average the attached scans and recompute the absorbance curve.
    ///
    /// With no sample scans the sample signal is defined as all-zero and the
    /// absorbance as identically zero. Otherwise the absorbance is
    /// `log10(background/sample)` wherever the ratio is positive and NaN
    /// where it is not; masked points are values, not errors.
    pub fn average_scans(&mut self) -> DuvetResult<()> {
        if self.backgrounds.is_empty() {
            return Err(DomainError::NoBackgrounds {
                name: self.name.clone(),
            }
            .into());
        }

        self.changelog.record("began scan averaging");
        let tables: Vec<&ScanColumns> = self.backgrounds.iter().map(|scan| &scan.data).collect();
        let background = ScanColumns::mean_of(&tables);
        self.changelog.record("finished background processing");

        let sample = if self.samples.is_empty() {
            background.zero_signal_copy()
        } else {
            let tables: Vec<&ScanColumns> = self.samples.iter().map(|scan| &scan.data).collect();
            ScanColumns::mean_of(&tables)
        };
        self.changelog.record("finished sample processing");

        let wavelength = background.wavelength.clone();
        let absorbance = if sample.normalized_signal.iter().all(|&signal| signal == 0.0) {
            // The explicit no-sample convention: zero, not log-of-zero.
            vec![0.0; wavelength.len()]
        } else {
            (0..wavelength.len())
                .map(|row| {
                    let numerator = background
                        .normalized_signal
                        .get(row)
                        .copied()
                        .unwrap_or(f64::NAN);
                    let denominator =
                        sample.normalized_signal.get(row).copied().unwrap_or(f64::NAN);
                    let ratio = numerator / denominator;
                    if ratio > 0.0 { ratio.log10() } else { f64::NAN }
                })
                .collect()
        };

        self.changelog.record(format!(
            "finished absorbance calculation using {} bkgds and {} samples",
            self.backgrounds.len(),
            self.samples.len().max(1)
        ));

        self.background_mean = Some(background);
        self.sample_mean = Some(sample);
        self.data = Some(SpectrumData {
            wavelength,
            absorbance,
            raw_absorbance: None,
            baseline: None,
            best_fit: None,
            residuals: None,
        });
        Ok(())
    }

    /// Shift the absorbance so a chosen point becomes zero. The first call
    /// snapshots the unshifted values; repeated calls keep searching on that
    /// snapshot, so the operation is idempotent.
    pub fn subtract_baseline(
        &mut self,
        limits: Option<(f64, f64)>,
        method: BaselineMethod,
    ) -> DuvetResult<()> {
        let data = self.data.as_mut().ok_or_else(|| DomainError::NotAveraged {
            name: self.name.clone(),
        })?;
        let source = data
            .raw_absorbance
            .clone()
            .unwrap_or_else(|| data.absorbance.clone());

        let in_window = |wavelength: f64| {
            limits.is_none_or(|(lower, upper)| wavelength >= lower && wavelength <= upper)
        };
        let window: Vec<usize> = (0..data.len())
            .filter(|&index| in_window(data.wavelength[index]))
            .collect();
        let (window_lower, window_upper) =
            limits.unwrap_or((f64::NEG_INFINITY, f64::INFINITY));
        if window.is_empty() {
            return Err(DomainError::EmptyBaselineWindow {
                lower: window_lower,
                upper: window_upper,
            }
            .into());
        }

        let shift = match method {
            BaselineMethod::Min => -window
                .iter()
                .map(|&index| source[index])
                .filter(|value| !value.is_nan())
                .fold(f64::INFINITY, f64::min),
            BaselineMethod::Right => -source[window[window.len() - 1]],
        };
        if !shift.is_finite() {
            return Err(DomainError::EmptyBaselineWindow {
                lower: window_lower,
                upper: window_upper,
            }
            .into());
        }

        if data.raw_absorbance.is_none() {
            data.raw_absorbance = Some(data.absorbance.clone());
        }
        data.absorbance = source.iter().map(|value| value + shift).collect();

        self.changelog.record(format!(
            "baseline subtracted using the '{}' method and a shift of {shift}",
            method.as_str()
        ));
        Ok(())
    }

    /// Fit a Rayleigh baseline (plus constant) to caller-chosen flat regions
    /// and subtract it from the absorbance. Uses the same `raw_absorbance`
    /// snapshot discipline as [`Spectrum::subtract_baseline`].
    pub fn fit_scattering_baseline(
        &mut self,
        regions: &[(f64, f64)],
        guesses: Option<[ParameterGuess; 3]>,
    ) -> DuvetResult<()> {
        let data = self.data.as_ref().ok_or_else(|| DomainError::NotAveraged {
            name: self.name.clone(),
        })?;
        let source = data
            .raw_absorbance
            .as_ref()
            .unwrap_or(&data.absorbance);

        let mut region_wl = Vec::new();
        let mut region_ab = Vec::new();
        for (index, (&wavelength, &absorbance)) in
            data.wavelength.iter().zip(source).enumerate()
        {
            let selected = regions
                .iter()
                .any(|&(lower, upper)| wavelength > lower && wavelength < upper);
            if selected && absorbance.is_finite() {
                region_wl.push(wavelength);
                region_ab.push(source[index]);
            }
        }
        if region_wl.is_empty() {
            let lower = regions.iter().map(|region| region.0).fold(f64::INFINITY, f64::min);
            let upper = regions
                .iter()
                .map(|region| region.1)
                .fold(f64::NEG_INFINITY, f64::max);
            return Err(DomainError::EmptyBaselineWindow { lower, upper }.into());
        }

        let guesses = guesses.unwrap_or([
            ParameterGuess::non_negative(1.0),
            ParameterGuess::non_negative(1.0),
            ParameterGuess::unbounded(0.0),
        ]);
        use crate::numerics::least_squares::CurveModel as _;
        let fitted =
            crate::numerics::least_squares::curve_fit(&ScatteringBaseline, &region_wl, &region_ab, &guesses)?;

        let baseline = ScatteringBaseline
            .evaluate(&data.wavelength, &fitted.parameters)
            .map_err(DuvetError::from)?;

        let data = self.data.as_mut().ok_or_else(|| DomainError::NotAveraged {
            name: self.name.clone(),
        })?;
        let source = data
            .raw_absorbance
            .clone()
            .unwrap_or_else(|| data.absorbance.clone());
        if data.raw_absorbance.is_none() {
            data.raw_absorbance = Some(data.absorbance.clone());
        }
        data.absorbance = source
            .iter()
            .zip(&baseline)
            .map(|(&value, &fitted)| value - fitted)
            .collect();
        data.baseline = Some(baseline);

        self.baseline_fit = Some(BaselineFit {
            m: Measured::new(fitted.parameters[0], fitted.errors[0]),
            k: Measured::new(fitted.parameters[1], fitted.errors[1]),
            offset: Measured::new(fitted.parameters[2], fitted.errors[2]),
        });
        self.changelog.record(format!(
            "scattering baseline fitted over {} regions and subtracted",
            regions.len()
        ));
        Ok(())
    }

    /// Write the spectrum as a self-describing text file: description block,
    /// attributes block, fit-parameters block, changelog, then the data
    /// table. Refuses without writing when the description is empty.
    pub fn export(&self, path: &Path) -> DuvetResult<()> {
        if self.description.trim().is_empty() {
            return Err(DomainError::MissingDescription {
                name: self.name.clone(),
            }
            .into());
        }

        let mut out = String::new();
        section_header(&mut out, "Spectrum Description");
        let _ = writeln!(out, "Name: {}\n", self.name);
        let _ = writeln!(out, "{}\n", self.description);
        let background_files: Vec<String> = self
            .backgrounds
            .iter()
            .map(|scan| scan.source().display().to_string())
            .collect();
        let sample_files: Vec<String> = self
            .samples
            .iter()
            .map(|scan| scan.source().display().to_string())
            .collect();
        let _ = writeln!(out, "Background Files: {background_files:?}");
        let _ = writeln!(out, "Sample Files: {sample_files:?}\n");

        section_header(&mut out, "Object and Plotting Attributes");
        let _ = writeln!(out, "Offset: {}", self.offset);
        let _ = writeln!(out, "Visible: {}", self.visible);
        let _ = writeln!(out, "Color: {}", self.color.hex());
        let _ = writeln!(out, "Linestyle: {}", self.line_style.as_str());
        let _ = writeln!(out, "Linewidth: {}\n", self.line_width);

        section_header(&mut out, "Fit Parameters");
        match &self.baseline_fit {
            Some(baseline) => {
                let _ = writeln!(
                    out,
                    "Baseline parameters: m = {}, k = {}, b = {}",
                    measured_field(baseline.m),
                    measured_field(baseline.k),
                    measured_field(baseline.offset)
                );
            }
            None => {
                let _ = writeln!(out, "Baseline parameters: none");
            }
        }
        match &self.fit {
            Some(fit) => {
                let peaks: Vec<String> = fit
                    .peaks
                    .iter()
                    .map(|peak| measured_field(*peak))
                    .collect();
                let _ = writeln!(out, "Peak positions: {}", peaks.join("; "));
                let _ = writeln!(out, "Reduced chi square: {}", fit.reduced_chi_square);
                let _ = writeln!(out, "Gaussian count: {}\n", fit.gaussian_count);
            }
            None => {
                let _ = writeln!(out, "Peak positions: none");
                let _ = writeln!(out, "Reduced chi square: none");
                let _ = writeln!(out, "Gaussian count: none\n");
            }
        }

        section_header(&mut out, "Changelog");
        out.push_str(&self.changelog.render());
        out.push('\n');

        section_header(&mut out, "Spectroscopic Data");
        if let Some(data) = &self.data {
            let mut columns: Vec<(&str, &[f64])> = vec![
                ("wavelength", &data.wavelength),
                ("absorbance", &data.absorbance),
            ];
            if let Some(raw) = &data.raw_absorbance {
                columns.push(("raw_absorbance", raw));
            }
            if let Some(baseline) = &data.baseline {
                columns.push(("baseline", baseline));
            }
            if let Some(best_fit) = &data.best_fit {
                columns.push(("best_fit", best_fit));
            }
            if let Some(residuals) = &data.residuals {
                columns.push(("residuals", residuals));
            }

            let header: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
            let _ = writeln!(out, "{}", header.join(","));
            for row in 0..data.len() {
                let fields: Vec<String> = columns
                    .iter()
                    .map(|(_, values)| format_field(values.get(row).copied().unwrap_or(f64::NAN)))
                    .collect();
                let _ = writeln!(out, "{}", fields.join(","));
            }
        }

        write_text_artifact(path, &out).map_err(|source| DuvetError::Io {
            action: "write spectrum export",
            path: path.to_path_buf(),
            source,
        })
    }
}

fn section_header(out: &mut String, title: &str) {
    out.push_str("#----------------------------------------------------\n");
    let _ = writeln!(out, "# {title}");
    out.push_str("#----------------------------------------------------\n");
}

fn measured_field(measured: Measured) -> String {
    match measured.error {
        Some(error) => format!("{} +- {}", measured.value, error),
        None => measured.value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{BaselineMethod, LineStyle, Spectrum, SpectrumData};
    use crate::domain::{DomainError, DuvetError};
    use crate::modules::scan::{ScanColumns, SingleScan};
    use std::path::Path;

    pub(super) fn scan_with_signal(wavelengths: &[f64], signals: &[f64]) -> SingleScan {
        let columns = ScanColumns {
            lambda: wavelengths.to_vec(),
            wavelength: wavelengths.to_vec(),
            normalized_signal: signals.to_vec(),
            ..ScanColumns::default()
        };
        SingleScan::from_columns(Path::new("synthetic.txt"), columns)
    }

    pub(super) fn averaged_spectrum(
        name: &str,
        wavelengths: &[f64],
        absorbance: &[f64],
    ) -> Spectrum {
        let mut spectrum = Spectrum::new(name);
        spectrum.data = Some(SpectrumData {
            wavelength: wavelengths.to_vec(),
            absorbance: absorbance.to_vec(),
            ..SpectrumData::default()
        });
        spectrum
    }

    fn spectrum_with_scans(background: &[f64], sample: Option<&[f64]>) -> Spectrum {
        let wavelengths: Vec<f64> = (0..background.len())
            .map(|index| 120.0 + index as f64)
            .collect();
        let mut spectrum = Spectrum::new("test");
        spectrum
            .backgrounds
            .push(scan_with_signal(&wavelengths, background));
        if let Some(signals) = sample {
            spectrum.samples.push(scan_with_signal(&wavelengths, signals));
        }
        spectrum
    }

    #[test]
    fn zero_sample_spectra_average_to_identically_zero_absorbance() {
        let mut spectrum = spectrum_with_scans(&[5.0, 6.0, 7.0], None);
        spectrum.average_scans().expect("averaging should succeed");

        let data = spectrum.data().expect("data should exist");
        assert_eq!(data.len(), 3);
        assert!(data.absorbance.iter().all(|&value| value == 0.0));
    }

    #[test]
    fn masked_log_leaves_nan_only_where_the_ratio_is_not_positive() {
        let mut spectrum =
            spectrum_with_scans(&[10.0, 10.0, 10.0, 10.0], Some(&[1.0, -2.0, 0.0, 10.0]));
        spectrum.average_scans().expect("averaging should succeed");

        let data = spectrum.data().expect("data should exist");
        assert!((data.absorbance[0] - 1.0).abs() < 1.0e-12); // log10(10)
        assert!(data.absorbance[1].is_nan()); // negative ratio is masked
        // A zero sample point gives an infinite ratio, which is positive and
        // therefore not masked.
        assert!(data.absorbance[2].is_infinite() && data.absorbance[2] > 0.0);
        assert_eq!(data.absorbance[3], 0.0); // log10(1)
    }

    #[test]
    fn averaging_without_backgrounds_is_a_typed_error() {
        let mut spectrum = Spectrum::new("empty");
        let error = spectrum.average_scans().expect_err("no backgrounds");
        assert!(matches!(
            error,
            DuvetError::Domain(DomainError::NoBackgrounds { .. })
        ));
    }

    #[test]
    fn offset_changes_never_mutate_the_absorbance_column() {
        let mut spectrum = spectrum_with_scans(&[10.0, 10.0], Some(&[1.0, 1.0]));
        spectrum.average_scans().expect("averaging should succeed");
        let before = spectrum.data().expect("data").absorbance.clone();

        spectrum.set_offset(0.75);
        assert_eq!(spectrum.offset(), 0.75);
        assert_eq!(spectrum.data().expect("data").absorbance, before);
    }

    #[test]
    fn baseline_subtraction_is_idempotent_on_the_raw_snapshot() {
        // Dyadic values keep the shift arithmetic exact.
        let mut spectrum = averaged_spectrum(
            "baseline",
            &[120.0, 121.0, 122.0, 123.0],
            &[0.5, 0.125, 0.375, 0.25],
        );

        spectrum
            .subtract_baseline(None, BaselineMethod::Min)
            .expect("first subtraction");
        let first = spectrum.data().expect("data").absorbance.clone();
        assert_eq!(first, vec![0.375, 0.0, 0.25, 0.125]);

        spectrum
            .subtract_baseline(None, BaselineMethod::Min)
            .expect("second subtraction");
        assert_eq!(spectrum.data().expect("data").absorbance, first);

        let raw = spectrum
            .data()
            .expect("data")
            .raw_absorbance
            .clone()
            .expect("raw snapshot");
        assert_eq!(raw, vec![0.5, 0.125, 0.375, 0.25]);
    }

    #[test]
    fn right_method_zeroes_the_last_point_of_the_window() {
        let mut spectrum = averaged_spectrum(
            "baseline",
            &[120.0, 121.0, 122.0, 123.0],
            &[0.5, 0.125, 0.375, 0.25],
        );
        spectrum
            .subtract_baseline(Some((120.0, 122.0)), BaselineMethod::Right)
            .expect("subtraction");

        let data = spectrum.data().expect("data");
        assert_eq!(data.absorbance, vec![0.125, -0.25, 0.0, -0.125]);
    }

    #[test]
    fn export_refuses_without_a_description() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let target = dir.path().join("spectrum.txt");
        let spectrum = averaged_spectrum("undocumented", &[120.0], &[0.0]);

        let error = spectrum
            .export(&target)
            .expect_err("export without description");
        assert!(matches!(
            error,
            DuvetError::Domain(DomainError::MissingDescription { .. })
        ));
        assert!(!target.exists(), "no file may be written on refusal");
    }

    #[test]
    fn every_mutating_operation_appends_one_changelog_record() {
        let mut spectrum = averaged_spectrum("log", &[120.0, 121.0], &[0.2, 0.1]);
        let before = spectrum.changelog().len();

        spectrum.set_offset(0.1);
        spectrum.cycle_color();
        spectrum.set_line_style(LineStyle::Dashed);
        spectrum.set_line_width(3.0);
        spectrum.flip_visibility();
        spectrum.rename("renamed");
        spectrum
            .subtract_baseline(None, BaselineMethod::Min)
            .expect("subtraction");

        assert_eq!(spectrum.changelog().len(), before + 7);
    }

    #[test]
    fn removing_scans_matches_on_the_source_path() {
        let mut spectrum = Spectrum::new("removal");
        spectrum
            .backgrounds
            .push(scan_with_signal(&[120.0], &[1.0]));

        assert!(!spectrum.remove_background("other.txt"));
        assert_eq!(spectrum.backgrounds().len(), 1);
        assert!(spectrum.remove_background("synthetic.txt"));
        assert!(spectrum.backgrounds().is_empty());
    }
}

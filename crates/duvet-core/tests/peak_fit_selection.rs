//! Model selection across candidate gaussian counts on a synthetic
//! two-peak absorbance curve.

use duvet_core::modules::spectrum::gaussian;
use duvet_core::{ParameterGuess, PeakFitRequest, Spectrum};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SCAN_HEADER_LINES: usize = 16;

fn write_scan(dir: &TempDir, name: &str, wavelengths: &[f64], signals: &[f64]) -> PathBuf {
    let mut content = String::new();
    for index in 0..SCAN_HEADER_LINES {
        content.push_str(&format!("# header line {index}\n"));
    }
    for (&wavelength, &signal) in wavelengths.iter().zip(signals) {
        let photocurrent = signal / 2.0;
        content.push_str(&format!(
            "{wavelength} {photocurrent} 0.1 0.2 0.3 10.0 90.0 15.0 1.0e-9 0.0 0.5 0.5\n"
        ));
    }
    let path = dir.path().join(name);
    fs::write(&path, content).expect("fixture should be writable");
    path
}

/// Two well-separated gaussians; any single-gaussian fit is decisively bad.
fn true_absorbance(wavelength: f64) -> f64 {
    gaussian(wavelength, 15.0, 200.0, 10.0) + gaussian(wavelength, 20.0, 290.0, 12.0)
}

/// Small deterministic pseudo-noise; high-frequency, so no extra gaussian
/// can absorb it.
fn noise(index: usize) -> f64 {
    1.0e-3 * ((index * 37 % 17) as f64 / 17.0 - 0.5)
}

fn synthetic_spectrum(dir: &TempDir) -> Spectrum {
    let wavelengths: Vec<f64> = (0..221).map(|index| 120.0 + index as f64).collect();
    let background_signal = vec![10.0; wavelengths.len()];
    let sample_signal: Vec<f64> = wavelengths
        .iter()
        .enumerate()
        .map(|(index, &wavelength)| {
            10.0 / 10.0_f64.powf(true_absorbance(wavelength) + noise(index))
        })
        .collect();

    let background = write_scan(dir, "bkgd.txt", &wavelengths, &background_signal);
    let sample = write_scan(dir, "sample.txt", &wavelengths, &sample_signal);

    let mut spectrum = Spectrum::new("two-peaks");
    spectrum.add_background(&background).expect("background");
    spectrum.add_sample(&sample).expect("sample");
    spectrum.average_scans().expect("averaging");
    spectrum
}

/// Guesses covering the largest candidate (4 gaussians), in layout order.
fn guesses_for_four() -> Vec<ParameterGuess> {
    let mut guesses = Vec::new();
    for center in [205.0, 284.0, 240.0, 260.0] {
        guesses.push(ParameterGuess::non_negative(10.0));
        guesses.push(ParameterGuess::non_negative(center));
        guesses.push(ParameterGuess::new(1.0e-3, 8.0, f64::INFINITY));
    }
    guesses
}

#[test]
fn the_two_gaussian_candidate_wins_and_recovers_the_centers() {
    let dir = TempDir::new().expect("tempdir");
    let mut spectrum = synthetic_spectrum(&dir);

    // The window stays where the peaks carry weight; far tails would let the
    // legacy chi-square statistic be dominated by near-zero fit values.
    let request = PeakFitRequest {
        window: (170.0, 320.0),
        gaussian_counts: 1..=4,
        guesses: Some(guesses_for_four()),
        ..PeakFitRequest::default()
    };
    let fit = spectrum.fit_peaks(&request).expect("fit should converge");

    assert_eq!(
        fit.gaussian_count, 2,
        "the candidate whose reduced chi-square sits closest to 1 must be n = 2"
    );

    let mut centers: Vec<f64> = fit.peaks.iter().map(|peak| peak.value).collect();
    centers.sort_by(f64::total_cmp);
    assert!(
        (centers[0] - 200.0).abs() < 1.0,
        "first center off: {}",
        centers[0]
    );
    assert!(
        (centers[1] - 290.0).abs() < 1.0,
        "second center off: {}",
        centers[1]
    );

    // Residuals of the kept fit sit at the injected noise floor, far below
    // the peak heights.
    let data = spectrum.data().expect("data");
    let residuals = data.residuals.as_ref().expect("residuals");
    let worst = residuals
        .iter()
        .filter(|value| value.is_finite())
        .fold(0.0_f64, |acc, &value| acc.max(value.abs()));
    assert!(worst < 5.0e-3, "worst residual {worst}");
}

#[test]
fn rerunning_the_selection_is_deterministic() {
    let dir = TempDir::new().expect("tempdir");
    let request = PeakFitRequest {
        window: (170.0, 320.0),
        gaussian_counts: 1..=3,
        guesses: Some(guesses_for_four()),
        ..PeakFitRequest::default()
    };

    let mut first = synthetic_spectrum(&dir);
    let mut second = synthetic_spectrum(&dir);
    let first_fit = first.fit_peaks(&request).expect("first fit").clone();
    let second_fit = second.fit_peaks(&request).expect("second fit").clone();

    assert_eq!(first_fit.gaussian_count, second_fit.gaussian_count);
    assert_eq!(first_fit.peaks, second_fit.peaks);
    assert_eq!(
        first_fit.reduced_chi_square.to_bits(),
        second_fit.reduced_chi_square.to_bits(),
        "identical inputs must reproduce bit-identical statistics"
    );
}

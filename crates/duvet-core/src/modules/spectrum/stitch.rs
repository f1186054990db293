//! Combining averaged spectra into one wavelength-continuous curve.

use super::{Spectrum, SpectrumData};
use crate::domain::{Changelog, DomainError, DuvetResult};

struct MergePoint {
    wavelength: f64,
    absorbance: f64,
    resolution: f64,
    sample_count: usize,
}

/// Merge two or more averaged spectra into a single spectrum.
///
/// Each input's display offset is folded into its absorbance contribution
/// before merging; the fold is deliberate and cannot be undone downstream,
/// so inputs with nonzero offsets are warned about. Where the same exact
/// wavelength appears in several inputs, the spectrum with the finer
/// sampling resolution wins; a resolution tie goes to the spectrum with more
/// sample scans (a signal-to-noise proxy); a tie in both keeps the value
/// seen first. The output is sorted ascending in wavelength.
pub fn stitch_spectra(spectra: &[Spectrum]) -> DuvetResult<Spectrum> {
    if spectra.len() < 2 {
        return Err(DomainError::TooFewSpectra {
            count: spectra.len(),
        }
        .into());
    }

    let mut inputs = Vec::with_capacity(spectra.len());
    for spectrum in spectra {
        let data = spectrum
            .data
            .as_ref()
            .ok_or_else(|| DomainError::NotAveraged {
                name: spectrum.name.clone(),
            })?;
        inputs.push((spectrum, data));
    }

    let mut changelog = Changelog::default();
    let names: Vec<&str> = spectra.iter().map(|spectrum| spectrum.name()).collect();
    changelog.record(format!(
        "began stitching with {} spectra: {names:?}",
        spectra.len()
    ));

    let offsets: Vec<f64> = spectra.iter().map(|spectrum| spectrum.offset).collect();
    if offsets.iter().any(|&offset| offset != 0.0) {
        tracing::warn!(
            ?offsets,
            "stitching spectra with non-zero offsets; the offsets are folded \
             into the stitched absorbance"
        );
        changelog.record(format!(
            "alert: non-zero offsets {offsets:?} were added to their spectra's \
             absorbance while stitching"
        ));
    }

    let mut points = Vec::new();
    for (spectrum, data) in &inputs {
        let resolution = sampling_resolution(&data.wavelength);
        for (&wavelength, &absorbance) in data.wavelength.iter().zip(&data.absorbance) {
            points.push(MergePoint {
                wavelength,
                absorbance: absorbance + spectrum.offset,
                resolution,
                sample_count: spectrum.samples.len(),
            });
        }
    }
    // Stable sort keeps insertion order within equal wavelengths, which is
    // what makes "first seen wins" well defined.
    points.sort_by(|a, b| a.wavelength.total_cmp(&b.wavelength));

    let mut merged: Vec<MergePoint> = Vec::with_capacity(points.len());
    for point in points {
        match merged.last_mut() {
            Some(kept) if kept.wavelength == point.wavelength => {
                let finer = point.resolution < kept.resolution;
                let same_resolution_more_scans = point.resolution == kept.resolution
                    && point.sample_count > kept.sample_count;
                if finer || same_resolution_more_scans {
                    *kept = point;
                }
            }
            _ => merged.push(point),
        }
    }

    let wavelength: Vec<f64> = merged.iter().map(|point| point.wavelength).collect();
    let absorbance: Vec<f64> = merged.iter().map(|point| point.absorbance).collect();
    changelog.record(format!(
        "finished stitching; the stitched spectrum has wavelength limits [{}, {}]",
        wavelength.first().copied().unwrap_or(f64::NAN),
        wavelength.last().copied().unwrap_or(f64::NAN)
    ));

    let first = &spectra[0];
    Ok(Spectrum {
        name: names.join("-"),
        description: String::new(),
        backgrounds: spectra
            .iter()
            .flat_map(|spectrum| spectrum.backgrounds.iter().cloned())
            .collect(),
        samples: spectra
            .iter()
            .flat_map(|spectrum| spectrum.samples.iter().cloned())
            .collect(),
        background_mean: None,
        sample_mean: None,
        data: Some(SpectrumData {
            wavelength,
            absorbance,
            raw_absorbance: None,
            baseline: None,
            best_fit: None,
            residuals: None,
        }),
        color: first.color,
        line_style: first.line_style,
        line_width: first.line_width,
        visible: true,
        offset: 0.0,
        changelog,
        fit: None,
        baseline_fit: None,
    })
}

/// The finest wavelength step of a grid; infinite for degenerate grids so a
/// single-point spectrum never wins a resolution contest.
fn sampling_resolution(wavelength: &[f64]) -> f64 {
    wavelength
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .fold(f64::INFINITY, f64::min)
}

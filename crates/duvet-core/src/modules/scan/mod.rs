//! A single raw instrument sweep (background or sample).

mod parser;

pub(crate) use parser::parse_rows;

use crate::common::palette::ColorCycle;
use crate::domain::DuvetResult;
use std::path::{Path, PathBuf};

/// Columnar storage for one scan: the twelve raw acquisition channels plus
/// the two derived columns. Derived columns are filled once at construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanColumns {
    pub lambda: Vec<f64>,
    pub photocurrent: Vec<f64>,
    pub ch1_volts: Vec<f64>,
    pub ch2_volts: Vec<f64>,
    pub ch3_volts: Vec<f64>,
    pub z_motor: Vec<f64>,
    pub beam_current: Vec<f64>,
    pub temperature: Vec<f64>,
    pub chamber_pressure: Vec<f64>,
    pub time: Vec<f64>,
    pub monitor_x: Vec<f64>,
    pub monitor_y: Vec<f64>,
    /// Beam-current-normalized photocurrent.
    pub normalized_signal: Vec<f64>,
    /// Copy of `lambda`, the axis every downstream table is keyed on.
    pub wavelength: Vec<f64>,
}

impl ScanColumns {
    pub fn len(&self) -> usize {
        self.lambda.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lambda.is_empty()
    }

    /// Row-index column-wise mean across several tables. Tables may be
    /// ragged; a row averages whatever entries exist at that index, skipping
    /// NaN, and is NaN only when no finite entry exists.
    pub(crate) fn mean_of(tables: &[&Self]) -> Self {
        Self {
            lambda: mean_columns(tables.iter().map(|table| &table.lambda)),
            photocurrent: mean_columns(tables.iter().map(|table| &table.photocurrent)),
            ch1_volts: mean_columns(tables.iter().map(|table| &table.ch1_volts)),
            ch2_volts: mean_columns(tables.iter().map(|table| &table.ch2_volts)),
            ch3_volts: mean_columns(tables.iter().map(|table| &table.ch3_volts)),
            z_motor: mean_columns(tables.iter().map(|table| &table.z_motor)),
            beam_current: mean_columns(tables.iter().map(|table| &table.beam_current)),
            temperature: mean_columns(tables.iter().map(|table| &table.temperature)),
            chamber_pressure: mean_columns(tables.iter().map(|table| &table.chamber_pressure)),
            time: mean_columns(tables.iter().map(|table| &table.time)),
            monitor_x: mean_columns(tables.iter().map(|table| &table.monitor_x)),
            monitor_y: mean_columns(tables.iter().map(|table| &table.monitor_y)),
            normalized_signal: mean_columns(tables.iter().map(|table| &table.normalized_signal)),
            wavelength: mean_columns(tables.iter().map(|table| &table.wavelength)),
        }
    }

    /// The same table with the signal channel forced to zero; stands in for
    /// the sample when no sample scans are attached.
    pub(crate) fn zero_signal_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.normalized_signal = vec![0.0; copy.normalized_signal.len()];
        copy
    }
}

fn mean_columns<'a>(columns: impl Iterator<Item = &'a Vec<f64>> + Clone) -> Vec<f64> {
    let rows = columns.clone().map(Vec::len).max().unwrap_or(0);
    (0..rows)
        .map(|row| {
            let mut sum = 0.0;
            let mut count = 0_usize;
            for column in columns.clone() {
                if let Some(&value) = column.get(row)
                    && value.is_finite()
                {
                    sum += value;
                    count += 1;
                }
            }
            if count == 0 { f64::NAN } else { sum / count as f64 }
        })
        .collect()
}

/// One raw scan file attached to a spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleScan {
    source: PathBuf,
    name: String,
    pub data: ScanColumns,
    color: ColorCycle,
    visible: bool,
}

impl SingleScan {
    pub fn from_file(path: impl AsRef<Path>) -> DuvetResult<Self> {
        let path = path.as_ref();
        let data = parser::parse_scan_file(path)?;
        Ok(Self::from_columns(path, data))
    }

    pub(crate) fn from_columns(path: &Path, data: ScanColumns) -> Self {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| {
                name.to_string_lossy().into_owned()
            });
        Self {
            source: path.to_path_buf(),
            name,
            data,
            color: ColorCycle::next_in_creation_order(),
            visible: true,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &'static str {
        self.color.hex()
    }

    /// Advance the display color to the next palette entry.
    pub fn cycle_color(&mut self) {
        self.color.cycle();
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Toggle whether plots should draw this scan.
    pub fn flip_visibility(&mut self) {
        self.visible = !self.visible;
    }
}

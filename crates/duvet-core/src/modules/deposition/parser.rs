//! Parser for laser-interferometry time-scan files.

use super::TimeScanColumns;
use crate::domain::{DuvetError, DuvetResult};
use crate::modules::scan::parse_rows;
use std::fs;
use std::path::Path;

/// Header lines before the first data row of a time-scan file.
pub(super) const TIMESCAN_HEADER_LINES: usize = 3;

pub(super) const TIMESCAN_COLUMNS: [&str; 9] = [
    "Time/s",
    "Ch0/V",
    "Ch0/volts",
    "Ch2/volts",
    "Ch3/volts",
    "Z_Motor",
    "Beam_current",
    "temperature",
    "Absorbance",
];

pub(super) fn parse_timescan_file(path: &Path) -> DuvetResult<TimeScanColumns> {
    let source = fs::read_to_string(path).map_err(|source| DuvetError::Io {
        action: "read time-scan file",
        path: path.to_path_buf(),
        source,
    })?;

    let rows = parse_rows(path, &source, TIMESCAN_HEADER_LINES, &TIMESCAN_COLUMNS)?;

    let mut columns = TimeScanColumns::default();
    for row in rows {
        columns.time.push(row[0]);
        columns.ch0_raw.push(row[1]);
        columns.ch0_volts.push(row[2]);
        columns.ch2_volts.push(row[3]);
        columns.ch3_volts.push(row[4]);
        columns.z_motor.push(row[5]);
        columns.beam_current.push(row[6]);
        columns.temperature.push(row[7]);
        columns.absorbance.push(row[8]);
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::{TIMESCAN_HEADER_LINES, parse_timescan_file};
    use crate::domain::{DataFormatError, DuvetError};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn nine_column_rows_parse_into_the_time_scan_table() {
        let dir = TempDir::new().expect("tempdir");
        let mut content = String::new();
        for index in 0..TIMESCAN_HEADER_LINES {
            content.push_str(&format!("# header {index}\n"));
        }
        content.push_str("0.0 0.1 0.1 1.00 0.0 5.0 90.0 15.0 0.0\n");
        content.push_str("1.0 0.1 0.1 1.01 0.0 5.0 90.0 15.0 0.0\n");
        let path = dir.path().join("timescan.txt");
        fs::write(&path, content).expect("fixture should be writable");

        let columns = parse_timescan_file(&path).expect("time scan should parse");
        assert_eq!(columns.len(), 2);
        assert_eq!(columns.time, vec![0.0, 1.0]);
        assert_eq!(columns.ch2_volts, vec![1.00, 1.01]);
    }

    #[test]
    fn wrong_column_counts_are_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("bad.txt");
        fs::write(&path, "#\n#\n#\n1.0 2.0 3.0\n").expect("fixture should be writable");

        let error = parse_timescan_file(&path).expect_err("three columns should fail");
        assert!(matches!(
            error,
            DuvetError::DataFormat(DataFormatError::ColumnCount {
                expected: 9,
                found: 3,
                ..
            })
        ));
    }
}

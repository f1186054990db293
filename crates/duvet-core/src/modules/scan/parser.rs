//! Parser for raw monochromator scan files.
//!
//! The acquisition software writes a fixed prose header followed by
//! whitespace-delimited rows of exactly twelve channels. A row with any other
//! shape means the file is not what we think it is, so the whole load fails
//! rather than risking misaligned columns.

use super::ScanColumns;
use crate::common::constants::BEAM_NORMALIZATION;
use crate::domain::{DataFormatError, DuvetError, DuvetResult};
use std::fs;
use std::path::Path;

/// Header lines before the first data row of a scan file.
pub(super) const SCAN_HEADER_LINES: usize = 16;

pub(super) const SCAN_COLUMNS: [&str; 12] = [
    "Lambda",
    "Keith/nA",
    "Ch1/volts",
    "Ch2/volts",
    "Ch3/volts",
    "Z_Motor",
    "Beam_current",
    "temperature",
    "GC_Pres",
    "Time",
    "UBX_x",
    "UBX_y",
];

pub(super) fn parse_scan_file(path: &Path) -> DuvetResult<ScanColumns> {
    let source = fs::read_to_string(path).map_err(|source| DuvetError::Io {
        action: "read scan file",
        path: path.to_path_buf(),
        source,
    })?;

    let rows = parse_rows(path, &source, SCAN_HEADER_LINES, &SCAN_COLUMNS)?;

    let mut columns = ScanColumns::default();
    for row in rows {
        columns.lambda.push(row[0]);
        columns.photocurrent.push(row[1]);
        columns.ch1_volts.push(row[2]);
        columns.ch2_volts.push(row[3]);
        columns.ch3_volts.push(row[4]);
        columns.z_motor.push(row[5]);
        columns.beam_current.push(row[6]);
        columns.temperature.push(row[7]);
        columns.chamber_pressure.push(row[8]);
        columns.time.push(row[9]);
        columns.monitor_x.push(row[10]);
        columns.monitor_y.push(row[11]);
    }

    // Derived columns, computed once and never mutated in place.
    columns.normalized_signal = columns
        .photocurrent
        .iter()
        .zip(&columns.beam_current)
        .map(|(&photocurrent, &beam_current)| BEAM_NORMALIZATION / beam_current * photocurrent)
        .collect();
    columns.wavelength = columns.lambda.clone();

    Ok(columns)
}

/// Shared fixed-column reader: skip `header_lines`, then demand exactly
/// `column_names.len()` numeric tokens per non-empty line.
pub(crate) fn parse_rows(
    path: &Path,
    source: &str,
    header_lines: usize,
    column_names: &[&'static str],
) -> DuvetResult<Vec<Vec<f64>>> {
    let lines: Vec<&str> = source.lines().collect();
    if lines.len() <= header_lines {
        return Err(DataFormatError::TruncatedHeader {
            path: path.to_path_buf(),
            header_lines,
        }
        .into());
    }

    let mut rows = Vec::new();
    for (offset, line) in lines[header_lines..].iter().enumerate() {
        let line_number = header_lines + offset + 1;
        if line.trim().is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != column_names.len() {
            return Err(DataFormatError::ColumnCount {
                path: path.to_path_buf(),
                line: line_number,
                expected: column_names.len(),
                found: tokens.len(),
            }
            .into());
        }

        let mut row = Vec::with_capacity(tokens.len());
        for (column_index, token) in tokens.iter().enumerate() {
            let value = token.parse::<f64>().map_err(|_| DataFormatError::NumericField {
                path: path.to_path_buf(),
                line: line_number,
                column: column_names[column_index],
                token: (*token).to_string(),
            })?;
            row.push(value);
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(DataFormatError::EmptyTable {
            path: path.to_path_buf(),
        }
        .into());
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::{SCAN_HEADER_LINES, parse_scan_file};
    use crate::domain::{DataFormatError, DuvetError};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_scan(dir: &TempDir, name: &str, rows: &[&str]) -> PathBuf {
        let mut content = String::new();
        for index in 0..SCAN_HEADER_LINES {
            content.push_str(&format!("# header line {index}\n"));
        }
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        let path = dir.path().join(name);
        fs::write(&path, content).expect("fixture should be writable");
        path
    }

    #[test]
    fn a_well_formed_scan_gains_its_derived_columns() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_scan(
            &dir,
            "scan.txt",
            &[
                "120.0 4.5 0.1 0.2 0.3 10.0 90.0 15.0 1.0e-9 0.0 0.5 0.5",
                "121.0 4.6 0.1 0.2 0.3 10.0 90.0 15.0 1.0e-9 1.0 0.5 0.5",
            ],
        );

        let columns = parse_scan_file(&path).expect("scan should parse");
        assert_eq!(columns.len(), 2);
        assert_eq!(columns.wavelength, columns.lambda);
        // 180 / 90 * 4.5 = 9.0
        assert_eq!(columns.normalized_signal[0], 9.0);
    }

    #[test]
    fn wrong_column_counts_fail_fast_with_the_line_number() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_scan(&dir, "bad.txt", &["120.0 4.5 0.1"]);

        let error = parse_scan_file(&path).expect_err("short row should fail");
        match error {
            DuvetError::DataFormat(DataFormatError::ColumnCount {
                line,
                expected,
                found,
                ..
            }) => {
                assert_eq!(line, SCAN_HEADER_LINES + 1);
                assert_eq!(expected, 12);
                assert_eq!(found, 3);
            }
            other => panic!("expected ColumnCount, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_fields_name_their_column() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_scan(
            &dir,
            "bad.txt",
            &["120.0 oops 0.1 0.2 0.3 10.0 90.0 15.0 1.0e-9 0.0 0.5 0.5"],
        );

        let error = parse_scan_file(&path).expect_err("bad token should fail");
        match error {
            DuvetError::DataFormat(DataFormatError::NumericField { column, token, .. }) => {
                assert_eq!(column, "Keith/nA");
                assert_eq!(token, "oops");
            }
            other => panic!("expected NumericField, got {other:?}"),
        }
    }

    #[test]
    fn files_shorter_than_the_header_are_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("tiny.txt");
        fs::write(&path, "just one line\n").expect("fixture should be writable");

        let error = parse_scan_file(&path).expect_err("truncated file should fail");
        assert!(matches!(
            error,
            DuvetError::DataFormat(DataFormatError::TruncatedHeader { header_lines, .. })
                if header_lines == SCAN_HEADER_LINES
        ));
    }
}

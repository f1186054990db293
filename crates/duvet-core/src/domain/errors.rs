use crate::numerics::least_squares::LeastSquaresError;
use std::path::PathBuf;

pub type DuvetResult<T> = Result<T, DuvetError>;

/// Top-level error for every fallible core operation.
#[derive(Debug, thiserror::Error)]
pub enum DuvetError {
    #[error(transparent)]
    DataFormat(#[from] DataFormatError),
    #[error(transparent)]
    Fit(#[from] FitError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("failed to {action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<LeastSquaresError> for DuvetError {
    fn from(source: LeastSquaresError) -> Self {
        Self::Fit(FitError::Solver(source))
    }
}

/// A raw instrument file did not match its fixed column contract. Fatal to
/// the load: no partially parsed or misaligned table is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataFormatError {
    #[error("'{}' line {line}: expected {expected} columns, found {found}", path.display())]
    ColumnCount {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("'{}' line {line}: column '{column}' holds unparseable value '{token}'", path.display())]
    NumericField {
        path: PathBuf,
        line: usize,
        column: &'static str,
        token: String,
    },
    #[error("'{}' ends inside its {header_lines}-line header", path.display())]
    TruncatedHeader { path: PathBuf, header_lines: usize },
    #[error("'{}' contains no data rows after the header", path.display())]
    EmptyTable { path: PathBuf },
}

/// A nonlinear fit attempt failed. The caller may retry with different
/// guesses; no degenerate "best" result is returned in place of an error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error(transparent)]
    Solver(#[from] LeastSquaresError),
    #[error("no data points inside the fit window ({lower}, {upper})")]
    EmptyWindow { lower: f64, upper: f64 },
    #[error("guess vector holds {found} parameters but the largest candidate needs {needed}")]
    GuessCount { needed: usize, found: usize },
    #[error("the candidate gaussian-count range is empty")]
    NoCandidates,
}

/// A physics or lifecycle precondition was violated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error(
        "scattering argument 1 - m*wavelength^-4 = {argument} is not positive \
         (m = {m}, wavelength = {wavelength} nm)"
    )]
    ScatteringArgument {
        m: f64,
        wavelength: f64,
        argument: f64,
    },
    #[error("spectrum '{name}' needs a description before it can be exported")]
    MissingDescription { name: String },
    #[error("spectrum '{name}' has no background scans to average")]
    NoBackgrounds { name: String },
    #[error("spectrum '{name}' has no averaged data; run average_scans first")]
    NotAveraged { name: String },
    #[error("no data points inside the baseline window [{lower}, {upper}]")]
    EmptyBaselineWindow { lower: f64, upper: f64 },
    #[error("deposition rate has not been fitted yet; run find_deposition_rate first")]
    RateNotComputed,
    #[error("stitching needs at least two spectra, got {count}")]
    TooFewSpectra { count: usize },
}

#[cfg(test)]
mod tests {
    use super::{DataFormatError, DomainError, DuvetError};
    use std::path::PathBuf;

    #[test]
    fn column_count_error_names_the_offending_line() {
        let error = DataFormatError::ColumnCount {
            path: PathBuf::from("scan_041.txt"),
            line: 19,
            expected: 12,
            found: 9,
        };
        assert_eq!(
            error.to_string(),
            "'scan_041.txt' line 19: expected 12 columns, found 9"
        );
    }

    #[test]
    fn domain_errors_convert_into_the_top_level_error() {
        let error: DuvetError = DomainError::RateNotComputed.into();
        assert!(matches!(
            error,
            DuvetError::Domain(DomainError::RateNotComputed)
        ));
    }
}

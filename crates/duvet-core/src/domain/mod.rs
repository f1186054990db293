pub mod errors;

pub use errors::{DataFormatError, DomainError, DuvetError, DuvetResult, FitError};

use chrono::Local;
use serde::Serialize;

const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// A fitted or derived quantity with its one-sigma uncertainty, when one is
/// available. The error is absent when the covariance of the underlying fit
/// was singular.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measured {
    pub value: f64,
    pub error: Option<f64>,
}

impl Measured {
    pub const fn new(value: f64, error: Option<f64>) -> Self {
        Self { value, error }
    }

    pub const fn exact(value: f64) -> Self {
        Self { value, error: None }
    }

    /// The error as a fraction of the value.
    pub fn relative_error(&self) -> Option<f64> {
        self.error.map(|error| error / self.value)
    }

    /// Scale value and error together, preserving the relative error.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            value: self.value * factor,
            error: self.error.map(|error| error * factor.abs()),
        }
    }
}

/// One timestamped entry in an instance's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub timestamp: String,
    pub message: String,
}

/// Append-only history of everything that happened to a spectrum. Rendered
/// to text only at export time; live observation goes through `tracing`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Changelog {
    records: Vec<ChangeRecord>,
}

impl Changelog {
    pub fn record(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(target: "duvet::changelog", "{message}");
        self.records.push(ChangeRecord {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            message,
        });
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One `timestamp message` line per record.
    pub fn render(&self) -> String {
        let mut rendered = String::new();
        for record in &self.records {
            rendered.push_str(&record.timestamp);
            rendered.push(' ');
            rendered.push_str(&record.message);
            rendered.push('\n');
        }
        rendered
    }
}

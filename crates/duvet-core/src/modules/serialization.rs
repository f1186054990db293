//! Text-artifact helpers shared by the spectrum and deposition exporters.

use std::fs;
use std::path::Path;

/// Canonicalize line endings and guarantee a trailing newline so repeated
/// exports of identical state produce identical bytes.
pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, normalize_text_artifact(content))
}

/// Render one delimited field. NaN marks a masked entry and becomes an empty
/// field, the convention the downstream tooling already parses.
pub fn format_field(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        format!("{value}")
    }
}

pub fn format_optional_field(value: Option<f64>) -> String {
    value.map_or_else(String::new, |value| format_field(value))
}

#[cfg(test)]
mod tests {
    use super::{format_field, format_optional_field, normalize_text_artifact, write_text_artifact};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn normalize_text_artifact_uses_canonical_line_endings() {
        let normalized = normalize_text_artifact("alpha\r\nbeta\rgamma");
        assert_eq!(normalized, "alpha\nbeta\ngamma\n");
    }

    #[test]
    fn repeated_writes_produce_identical_bytes() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("spectrum.txt");
        let input = "line 1\r\nline 2";

        write_text_artifact(&path, input).expect("first write should succeed");
        let first = fs::read(&path).expect("artifact should be readable");
        write_text_artifact(&path, input).expect("second write should succeed");
        let second = fs::read(&path).expect("artifact should be readable");

        assert_eq!(first, second);
        assert_eq!(second, b"line 1\nline 2\n");
    }

    #[test]
    fn masked_values_render_as_empty_fields() {
        assert_eq!(format_field(1.5), "1.5");
        assert_eq!(format_field(f64::NAN), "");
        assert_eq!(format_optional_field(None), "");
        assert_eq!(format_optional_field(Some(0.25)), "0.25");
    }
}

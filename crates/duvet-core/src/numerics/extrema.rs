//! Relative extrema of sampled curves.

/// Indices whose value is strictly greater than both immediate neighbors.
/// Endpoints and plateau samples are never extrema.
pub fn relative_maxima(values: &[f64]) -> Vec<usize> {
    interior_indices(values, |center, neighbor| center > neighbor)
}

/// Indices whose value is strictly less than both immediate neighbors.
pub fn relative_minima(values: &[f64]) -> Vec<usize> {
    interior_indices(values, |center, neighbor| center < neighbor)
}

fn interior_indices(values: &[f64], beats: impl Fn(f64, f64) -> bool) -> Vec<usize> {
    let mut indices = Vec::new();
    for index in 1..values.len().saturating_sub(1) {
        let center = values[index];
        if beats(center, values[index - 1]) && beats(center, values[index + 1]) {
            indices.push(index);
        }
    }
    indices
}

//! Linear interpolation onto a query grid.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpolationError {
    #[error("sample grids differ in length: x={x_len}, y={y_len}")]
    LengthMismatch { x_len: usize, y_len: usize },
    #[error("sample grid is empty")]
    EmptySamples,
    #[error("sample grid must be strictly increasing at index {index}")]
    UnsortedSamples { index: usize },
}

/// Linearly interpolate `(sample_x, sample_y)` at every point of `query`.
/// Queries outside the sampled range take `fill`; queries exactly on the
/// range edges take the edge sample.
pub fn interp_with_fill(
    query: &[f64],
    sample_x: &[f64],
    sample_y: &[f64],
    fill: f64,
) -> Result<Vec<f64>, InterpolationError> {
    if sample_x.len() != sample_y.len() {
        return Err(InterpolationError::LengthMismatch {
            x_len: sample_x.len(),
            y_len: sample_y.len(),
        });
    }
    if sample_x.is_empty() {
        return Err(InterpolationError::EmptySamples);
    }
    for index in 1..sample_x.len() {
        if sample_x[index] <= sample_x[index - 1] {
            return Err(InterpolationError::UnsortedSamples { index });
        }
    }

    let last = sample_x.len() - 1;
    let interpolated = query
        .iter()
        .map(|&point| {
            if point < sample_x[0] || point > sample_x[last] {
                return fill;
            }
            match sample_x.binary_search_by(|probe| probe.total_cmp(&point)) {
                Ok(index) => sample_y[index],
                Err(upper) => {
                    let lower = upper - 1;
                    let x0 = sample_x[lower];
                    let x1 = sample_x[upper];
                    let fraction = (point - x0) / (x1 - x0);
                    sample_y[lower] + (sample_y[upper] - sample_y[lower]) * fraction
                }
            }
        })
        .collect();

    Ok(interpolated)
}

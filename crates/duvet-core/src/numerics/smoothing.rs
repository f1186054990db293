//! Gaussian kernel smoothing for noisy interferometry channels.

/// Smooth `values` with a normalized Gaussian kernel of standard deviation
/// `sigma` samples. The kernel is truncated at four standard deviations and
/// out-of-range taps clamp to the nearest edge sample.
pub fn gaussian_smooth(values: &[f64], sigma: f64) -> Vec<f64> {
    if values.is_empty() || sigma <= 0.0 {
        return values.to_vec();
    }

    let radius = (4.0 * sigma).round() as isize;
    let mut weights = Vec::with_capacity((2 * radius + 1) as usize);
    for offset in -radius..=radius {
        let z = offset as f64 / sigma;
        weights.push((-0.5 * z * z).exp());
    }
    let total: f64 = weights.iter().sum();
    for weight in &mut weights {
        *weight /= total;
    }

    let last = values.len() as isize - 1;
    let mut smoothed = Vec::with_capacity(values.len());
    for center in 0..values.len() as isize {
        let mut accumulated = 0.0;
        for (tap, weight) in weights.iter().enumerate() {
            let index = (center + tap as isize - radius).clamp(0, last);
            accumulated += weight * values[index as usize];
        }
        smoothed.push(accumulated);
    }
    smoothed
}

#[cfg(test)]
mod tests {
    use super::gaussian_smooth;
    use approx::assert_relative_eq;

    #[test]
    fn constant_signals_are_unchanged() {
        let smoothed = gaussian_smooth(&[3.25; 80], 7.0);
        for value in smoothed {
            assert_relative_eq!(value, 3.25, max_relative = 1.0e-12);
        }
    }

    #[test]
    fn a_linear_ramp_is_preserved_away_from_the_edges() {
        let ramp: Vec<f64> = (0..200).map(|index| index as f64 * 0.5).collect();
        let smoothed = gaussian_smooth(&ramp, 7.0);
        // A symmetric kernel leaves a linear signal untouched in the interior.
        for index in 30..170 {
            assert_relative_eq!(smoothed[index], ramp[index], max_relative = 1.0e-9);
        }
    }

    #[test]
    fn smoothing_damps_a_spike_without_moving_its_center() {
        let mut spiky = vec![0.0; 61];
        spiky[30] = 1.0;
        let smoothed = gaussian_smooth(&spiky, 3.0);

        let peak_index = smoothed
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(index, _)| index)
            .expect("smoothed signal should have a maximum");
        assert_eq!(peak_index, 30);
        assert!(smoothed[30] < 1.0);
        assert!(smoothed[27] > 0.0);
    }

    #[test]
    fn zero_sigma_and_empty_input_pass_through() {
        assert_eq!(gaussian_smooth(&[], 7.0), Vec::<f64>::new());
        assert_eq!(gaussian_smooth(&[1.0, 2.0], 0.0), vec![1.0, 2.0]);
    }
}

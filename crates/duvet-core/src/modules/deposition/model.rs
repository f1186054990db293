//! The sloped-sinusoid fringe model and the thin-film optics derived from
//! its extrema.

use crate::common::constants::{HENE_WAVELENGTH_NM, SUBSTRATE_INDEX, VACUUM_INDEX};
use crate::numerics::least_squares::{CurveModel, LeastSquaresError, ParameterGuess};
use std::f64::consts::PI;

/// Linear drift plus interference fringes:
/// `y = m t + c + A sin(pi (t - tc) / w)`. One full fringe spans `2 w`
/// seconds.
pub fn sloped_sinusoid(t: f64, m: f64, c: f64, tc: f64, w: f64, amplitude: f64) -> f64 {
    m * t + c + amplitude * (PI * (t - tc) / w).sin()
}

#[derive(Debug, Clone, Copy)]
pub(super) struct SlopedSinusoid;

impl CurveModel for SlopedSinusoid {
    fn evaluate(&self, x: &[f64], params: &[f64]) -> Result<Vec<f64>, LeastSquaresError> {
        if params.len() != 5 {
            return Err(LeastSquaresError::Model {
                reason: format!("sloped sinusoid expects 5 parameters, got {}", params.len()),
            });
        }
        let (m, c, tc, w, amplitude) = (params[0], params[1], params[2], params[3], params[4]);
        Ok(x.iter()
            .map(|&t| sloped_sinusoid(t, m, c, tc, w, amplitude))
            .collect())
    }
}

/// Default guesses for a typical deposition: a near-flat drift, a fringe
/// period of a few hundred seconds and a small positive amplitude. The
/// period is bounded positive; the amplitude is kept within 0..=100.
pub(super) fn default_guesses() -> [ParameterGuess; 5] {
    [
        ParameterGuess::unbounded(3.0e-6),            // m
        ParameterGuess::unbounded(0.0),               // c
        ParameterGuess::unbounded(200.0),             // tc
        ParameterGuess::new(0.0, 300.0, f64::INFINITY), // w
        ParameterGuess::new(0.0, 0.1, 100.0),         // A
    ]
}

/// Film refractive index from the fringe extrema, after Born & Wolf:
/// `n = sqrt(n1 n3 (1 - k) / (1 + k))` with
/// `k = ((n1 - n3)/(n1 + n3)) sqrt(Rmin/Rmax)`, `n1` vacuum and `n3` the
/// substrate at 632.8 nm.
pub(super) fn refractive_index_from_extrema(r_min: f64, r_max: f64) -> f64 {
    let k = ((VACUUM_INDEX - SUBSTRATE_INDEX) / (VACUUM_INDEX + SUBSTRATE_INDEX))
        * (r_min / r_max).sqrt();
    (VACUUM_INDEX * SUBSTRATE_INDEX * (1.0 - k) / (1.0 + k)).sqrt()
}

/// Film growth per interference fringe in nm. Snell's law turns the
/// incidence angle into the in-film propagation angle; see equation 8 of
/// Ioppolo et al. 2021 (A&A 646, A172).
pub(super) fn growth_per_fringe(refractive_index: f64, incidence_degrees: f64) -> f64 {
    let theta1 = incidence_degrees.to_radians();
    let theta2 = (VACUUM_INDEX * theta1.sin() / refractive_index).asin();
    HENE_WAVELENGTH_NM / (2.0 * refractive_index * theta2.cos())
}

#[cfg(test)]
mod tests {
    use super::{growth_per_fringe, refractive_index_from_extrema, sloped_sinusoid};
    use approx::assert_relative_eq;

    #[test]
    fn the_sinusoid_peaks_a_quarter_period_after_its_phase_shift() {
        // With m = 0 the maximum sits at t = tc + w/2.
        let (c, tc, w, amplitude) = (1.0, 100.0, 400.0, 0.25);
        let peak = sloped_sinusoid(tc + w / 2.0, 0.0, c, tc, w, amplitude);
        assert_relative_eq!(peak, c + amplitude, max_relative = 1.0e-12);

        let trough = sloped_sinusoid(tc + 1.5 * w, 0.0, c, tc, w, amplitude);
        assert_relative_eq!(trough, c - amplitude, max_relative = 1.0e-12);
    }

    #[test]
    fn equal_extrema_give_the_geometric_mean_index() {
        // Rmin == Rmax makes k = (n1-n3)/(n1+n3) and n = sqrt(n1 n3 (1-k)/(1+k)).
        let n = refractive_index_from_extrema(1.0, 1.0);
        let k: f64 = (1.0 - 1.377) / (1.0 + 1.377);
        let expected = (1.377 * (1.0 - k) / (1.0 + k)).sqrt();
        assert_relative_eq!(n, expected, max_relative = 1.0e-12);
    }

    #[test]
    fn deeper_fringes_pull_the_index_toward_the_geometric_mean() {
        // Rmin -> 0 is the perfect anti-reflection case, n = sqrt(n1 n3).
        let shallow = refractive_index_from_extrema(0.9, 1.0);
        let deep = refractive_index_from_extrema(0.5, 1.0);
        let ideal = 1.377_f64.sqrt();
        assert!((deep - ideal).abs() < (shallow - ideal).abs());
        assert!(deep > ideal && shallow > ideal);
    }

    #[test]
    fn normal_incidence_growth_is_half_a_wavelength_over_n() {
        let n = 1.3;
        assert_relative_eq!(
            growth_per_fringe(n, 0.0),
            632.8 / (2.0 * n),
            max_relative = 1.0e-12
        );
        // Oblique incidence always lengthens the in-film path.
        assert!(growth_per_fringe(n, 22.0) > growth_per_fringe(n, 0.0));
    }
}

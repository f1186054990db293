//! Bounded nonlinear least-squares curve fitting.
//!
//! A Levenberg-Marquardt solver over box-bounded parameter vectors: damped
//! normal equations built from a forward-difference Jacobian, steps clamped
//! into the feasible box, damping raised until a step descends. The solver is
//! fully deterministic, so refitting identical data with identical guesses
//! reproduces identical parameters.
//!
//! Parameter uncertainties come from the covariance `s^2 (J^T J)^-1` with
//! `s^2 = SSR / (n_points - n_params)`. When `J^T J` cannot be inverted the
//! uncertainties are reported as absent rather than failing the fit, so model
//! selection can still compare candidates with degenerate components.

use super::linalg::{self, DenseMatrix, LinalgError};
use serde::Serialize;

const MAX_ITERATIONS: usize = 400;
const JACOBIAN_STEP: f64 = 1.0e-8;
const COST_TOLERANCE: f64 = 1.0e-12;
const STEP_TOLERANCE: f64 = 1.0e-10;
const LAMBDA_INITIAL: f64 = 1.0e-3;
const LAMBDA_INCREASE: f64 = 10.0;
const LAMBDA_DECREASE: f64 = 10.0;
const LAMBDA_CEILING: f64 = 1.0e12;
const LAMBDA_FLOOR: f64 = 1.0e-12;
const DIAG_FLOOR: f64 = 1.0e-12;

/// A model curve evaluated over an abscissa grid at a flat parameter vector.
pub trait CurveModel {
    fn evaluate(&self, x: &[f64], params: &[f64]) -> Result<Vec<f64>, LeastSquaresError>;
}

/// An initial parameter value with its box bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterGuess {
    pub lower: f64,
    pub guess: f64,
    pub upper: f64,
}

impl ParameterGuess {
    pub const fn new(lower: f64, guess: f64, upper: f64) -> Self {
        Self {
            lower,
            guess,
            upper,
        }
    }

    pub const fn unbounded(guess: f64) -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            guess,
            upper: f64::INFINITY,
        }
    }

    pub const fn non_negative(guess: f64) -> Self {
        Self {
            lower: 0.0,
            guess,
            upper: f64::INFINITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LeastSquaresError {
    #[error("model evaluation failed: {reason}")]
    Model { reason: String },
    #[error("model produced a non-finite value at point {index}")]
    NonFiniteModel { index: usize },
    #[error("data contains a non-finite value at point {index}")]
    NonFiniteData { index: usize },
    #[error("x and y lengths differ: {x_len} vs {y_len}")]
    LengthMismatch { x_len: usize, y_len: usize },
    #[error("guess {index} violates its bounds ({lower} <= {guess} <= {upper} must hold)")]
    InfeasibleBounds {
        index: usize,
        lower: f64,
        guess: f64,
        upper: f64,
    },
    #[error("fit needs more data points ({points}) than parameters ({parameters})")]
    UnderdeterminedSystem { points: usize, parameters: usize },
    #[error("damped normal equations could not be solved: {source}")]
    NormalEquations {
        #[from]
        source: LinalgError,
    },
    #[error("no convergence after {iterations} iterations")]
    NotConverged { iterations: usize },
}

/// The outcome of a converged fit.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveFit {
    pub parameters: Vec<f64>,
    /// One-sigma uncertainty per parameter; absent when the covariance was
    /// singular.
    pub errors: Vec<Option<f64>>,
    pub covariance: Option<Vec<Vec<f64>>>,
    /// The model evaluated at the solution over the input grid.
    pub best_fit: Vec<f64>,
    /// Sum of squared residuals at the solution.
    pub cost: f64,
    pub iterations: usize,
}

/// Fit `model` to `(x, y)` starting from `guesses`, keeping every parameter
/// inside its bounds.
pub fn curve_fit<M: CurveModel>(
    model: &M,
    x: &[f64],
    y: &[f64],
    guesses: &[ParameterGuess],
) -> Result<CurveFit, LeastSquaresError> {
    validate_inputs(x, y, guesses)?;

    let mut params: Vec<f64> = guesses.iter().map(|guess| guess.guess).collect();
    let mut residuals = residuals_for(model, x, y, &params)?;
    let mut cost = sum_of_squares(&residuals);

    let mut lambda = LAMBDA_INITIAL;
    let mut converged = false;
    let mut iterations = 0;

    for iteration in 1..=MAX_ITERATIONS {
        iterations = iteration;

        let columns = jacobian_columns(model, x, &params, guesses)?;
        let (jtj, jtr) = normal_equations(&columns, &residuals);

        let mut accepted = false;
        while lambda <= LAMBDA_CEILING {
            let damped = damp(&jtj, lambda);
            let rhs: Vec<f64> = jtr.iter().map(|value| -value).collect();
            let step = match linalg::lu_solve(&damped, &rhs) {
                Ok(step) => step,
                Err(_) => {
                    lambda *= LAMBDA_INCREASE;
                    continue;
                }
            };

            let trial: Vec<f64> = params
                .iter()
                .zip(&step)
                .zip(guesses)
                .map(|((&param, &delta), guess)| (param + delta).clamp(guess.lower, guess.upper))
                .collect();

            let trial_residuals = match residuals_for(model, x, y, &trial) {
                Ok(trial_residuals) => trial_residuals,
                Err(_) => {
                    // The step left the model's domain; shorten it.
                    lambda *= LAMBDA_INCREASE;
                    continue;
                }
            };
            let trial_cost = sum_of_squares(&trial_residuals);

            if trial_cost < cost {
                let reduction = (cost - trial_cost) / cost.max(f64::MIN_POSITIVE);
                let step_size = params
                    .iter()
                    .zip(&trial)
                    .map(|(&old, &new)| (new - old).abs() / (1.0 + old.abs()))
                    .fold(0.0_f64, f64::max);

                params = trial;
                residuals = trial_residuals;
                cost = trial_cost;
                lambda = (lambda / LAMBDA_DECREASE).max(LAMBDA_FLOOR);
                accepted = true;

                if reduction < COST_TOLERANCE || step_size < STEP_TOLERANCE {
                    converged = true;
                }
                break;
            }

            lambda *= LAMBDA_INCREASE;
        }

        if !accepted {
            // No damping produced a descending step: the solver sits at a
            // minimum of the (possibly bound-constrained) cost surface.
            converged = true;
        }
        if converged {
            break;
        }
    }

    if !converged {
        return Err(LeastSquaresError::NotConverged {
            iterations: MAX_ITERATIONS,
        });
    }

    let best_fit: Vec<f64> = residuals
        .iter()
        .zip(y)
        .map(|(&residual, &datum)| residual + datum)
        .collect();

    let (errors, covariance) = covariance_estimate(model, x, &params, guesses, cost, y.len())?;

    Ok(CurveFit {
        parameters: params,
        errors,
        covariance,
        best_fit,
        cost,
        iterations,
    })
}

fn validate_inputs(
    x: &[f64],
    y: &[f64],
    guesses: &[ParameterGuess],
) -> Result<(), LeastSquaresError> {
    if x.len() != y.len() {
        return Err(LeastSquaresError::LengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    if let Some(index) = y.iter().position(|value| !value.is_finite()) {
        return Err(LeastSquaresError::NonFiniteData { index });
    }
    if x.len() <= guesses.len() {
        return Err(LeastSquaresError::UnderdeterminedSystem {
            points: x.len(),
            parameters: guesses.len(),
        });
    }
    for (index, guess) in guesses.iter().enumerate() {
        let feasible = guess.guess.is_finite()
            && guess.lower <= guess.guess
            && guess.guess <= guess.upper;
        if !feasible {
            return Err(LeastSquaresError::InfeasibleBounds {
                index,
                lower: guess.lower,
                guess: guess.guess,
                upper: guess.upper,
            });
        }
    }
    Ok(())
}

fn residuals_for<M: CurveModel>(
    model: &M,
    x: &[f64],
    y: &[f64],
    params: &[f64],
) -> Result<Vec<f64>, LeastSquaresError> {
    let fit = model.evaluate(x, params)?;
    if let Some(index) = fit.iter().position(|value| !value.is_finite()) {
        return Err(LeastSquaresError::NonFiniteModel { index });
    }
    Ok(fit.iter().zip(y).map(|(&f, &datum)| f - datum).collect())
}

fn sum_of_squares(residuals: &[f64]) -> f64 {
    residuals.iter().map(|residual| residual * residual).sum()
}

/// Forward-difference Jacobian, one column per parameter. Steps that would
/// leave the feasible box are taken backwards; a parameter whose box is
/// narrower than the step contributes a zero column.
fn jacobian_columns<M: CurveModel>(
    model: &M,
    x: &[f64],
    params: &[f64],
    guesses: &[ParameterGuess],
) -> Result<Vec<Vec<f64>>, LeastSquaresError> {
    let base = model.evaluate(x, params)?;
    let mut columns = vec![vec![0.0; x.len()]; params.len()];

    for (index, column) in columns.iter_mut().enumerate() {
        let mut h = JACOBIAN_STEP * params[index].abs().max(1.0);
        if params[index] + h > guesses[index].upper {
            h = -h;
        }
        let stepped_value = params[index] + h;
        if stepped_value < guesses[index].lower || stepped_value > guesses[index].upper {
            continue;
        }

        let mut stepped = params.to_vec();
        stepped[index] = stepped_value;
        let perturbed = model.evaluate(x, &stepped)?;
        for (point, entry) in column.iter_mut().enumerate() {
            *entry = (perturbed[point] - base[point]) / h;
        }
    }

    Ok(columns)
}

fn normal_equations(columns: &[Vec<f64>], residuals: &[f64]) -> (DenseMatrix, Vec<f64>) {
    let n = columns.len();
    let mut jtj = DenseMatrix::zeros(n, n);
    let mut jtr = vec![0.0; n];

    for a in 0..n {
        for b in a..n {
            let dot: f64 = columns[a]
                .iter()
                .zip(&columns[b])
                .map(|(&left, &right)| left * right)
                .sum();
            jtj[(a, b)] = dot;
            jtj[(b, a)] = dot;
        }
        jtr[a] = columns[a]
            .iter()
            .zip(residuals)
            .map(|(&entry, &residual)| entry * residual)
            .sum();
    }

    (jtj, jtr)
}

fn damp(jtj: &DenseMatrix, lambda: f64) -> DenseMatrix {
    let mut damped = jtj.clone();
    for index in 0..jtj.nrows() {
        let diagonal = jtj[(index, index)];
        damped[(index, index)] = diagonal + lambda * diagonal.max(DIAG_FLOOR);
    }
    damped
}

#[allow(clippy::type_complexity)]
fn covariance_estimate<M: CurveModel>(
    model: &M,
    x: &[f64],
    params: &[f64],
    guesses: &[ParameterGuess],
    cost: f64,
    points: usize,
) -> Result<(Vec<Option<f64>>, Option<Vec<Vec<f64>>>), LeastSquaresError> {
    let columns = jacobian_columns(model, x, params, guesses)?;
    let (jtj, _) = normal_equations(&columns, &vec![0.0; points]);

    let dof = points - params.len();
    let variance = cost / dof as f64;

    match linalg::lu_invert(&jtj) {
        Ok(inverse) => {
            let n = params.len();
            let mut covariance = vec![vec![0.0; n]; n];
            for (row, covariance_row) in covariance.iter_mut().enumerate() {
                for (col, entry) in covariance_row.iter_mut().enumerate() {
                    *entry = inverse[(row, col)] * variance;
                }
            }
            let errors = (0..n)
                .map(|index| {
                    let diagonal = covariance[index][index];
                    (diagonal >= 0.0).then(|| diagonal.sqrt())
                })
                .collect();
            Ok((errors, Some(covariance)))
        }
        Err(_) => Ok((vec![None; params.len()], None)),
    }
}

pub mod extrema;
pub mod interpolate;
pub mod least_squares;
pub mod linalg;
pub mod smoothing;

pub use extrema::{relative_maxima, relative_minima};
pub use interpolate::{InterpolationError, interp_with_fill};
pub use least_squares::{CurveFit, CurveModel, LeastSquaresError, ParameterGuess, curve_fit};
pub use linalg::{DenseMatrix, LinalgError, lu_factorize, lu_invert, lu_solve};
pub use smoothing::gaussian_smooth;

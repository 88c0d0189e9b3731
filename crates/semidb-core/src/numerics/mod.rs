pub mod least_squares;

pub use least_squares::{
    LeastSquaresError, LeastSquaresOptions, LeastSquaresSolution, levenberg_marquardt,
};

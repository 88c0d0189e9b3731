//! One-parameter bowing fit
//! E(x) = (1 − x)·E(0) + x·E(1) − b·x·(1 − x)
//! with E(0) and E(1) pinned to the first and last samples.

use crate::numerics::{LeastSquaresError, LeastSquaresOptions, levenberg_marquardt};
use serde::Serialize;

pub const MIN_BOWING_SAMPLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BowingSample {
    pub x: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BowingFit {
    pub bowing: f64,
    pub start_value: f64,
    pub end_value: f64,
    pub residual_sum_of_squares: f64,
    pub iterations: usize,
    pub samples: Vec<BowingSample>,
}

impl BowingFit {
    pub fn evaluate(&self, x: f64) -> f64 {
        bowing_model(x, self.start_value, self.end_value, self.bowing)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BowingError {
    #[error("{found} samples, at least {required} required")]
    InsufficientSamples { found: usize, required: usize },
    #[error(transparent)]
    Fit(#[from] LeastSquaresError),
}

pub fn bowing_model(x: f64, start_value: f64, end_value: f64, bowing: f64) -> f64 {
    (1.0 - x) * start_value + x * end_value - bowing * x * (1.0 - x)
}

/// Fits `b` to samples ordered by composition.
pub fn fit_bowing_parameter(samples: &[BowingSample]) -> Result<BowingFit, BowingError> {
    if samples.len() < MIN_BOWING_SAMPLES {
        return Err(BowingError::InsufficientSamples {
            found: samples.len(),
            required: MIN_BOWING_SAMPLES,
        });
    }

    let mut ordered = samples.to_vec();
    ordered.sort_by(|left, right| left.x.total_cmp(&right.x));
    let start_value = ordered[0].value;
    let end_value = ordered[ordered.len() - 1].value;

    let xs: Vec<f64> = ordered.iter().map(|sample| sample.x).collect();
    let ys: Vec<f64> = ordered.iter().map(|sample| sample.value).collect();
    let solution = levenberg_marquardt(
        |x, parameters| bowing_model(x, start_value, end_value, parameters[0]),
        &xs,
        &ys,
        &[0.0],
        &LeastSquaresOptions::default(),
    )?;

    Ok(BowingFit {
        bowing: solution.parameters[0],
        start_value,
        end_value,
        residual_sum_of_squares: solution.residual_sum_of_squares,
        iterations: solution.iterations,
        samples: ordered,
    })
}

#[cfg(test)]
mod tests {
    use super::{BowingError, BowingSample, bowing_model, fit_bowing_parameter};

    fn synthetic(xs: &[f64], bowing: f64, noise: f64) -> Vec<BowingSample> {
        xs.iter()
            .enumerate()
            .map(|(index, x)| {
                let jitter = if index % 2 == 0 { noise } else { -noise };
                BowingSample {
                    x: *x,
                    value: bowing_model(*x, 1.0, 2.0, bowing) + jitter,
                }
            })
            .collect()
    }

    #[test]
    fn recovers_bowing_from_exact_samples() {
        let samples = synthetic(&[0.0, 0.25, 0.5, 0.75, 1.0], 0.5, 0.0);
        let fit = fit_bowing_parameter(&samples).expect("fit should converge");

        assert!((fit.bowing - 0.5).abs() <= 1.0e-8, "b = {}", fit.bowing);
        assert_eq!(fit.start_value, 1.0);
        assert_eq!(fit.end_value, 2.0);
        assert!((fit.evaluate(0.5) - 1.375).abs() <= 1.0e-8);
    }

    #[test]
    fn recovers_bowing_with_negligible_noise_and_unsorted_input() {
        let samples = synthetic(&[0.5, 1.0, 0.125, 0.0, 0.875, 0.375], 0.5, 1.0e-9);
        let fit = fit_bowing_parameter(&samples).expect("fit should converge");

        assert!((fit.bowing - 0.5).abs() <= 1.0e-6, "b = {}", fit.bowing);
        assert_eq!(fit.samples.first().map(|sample| sample.x), Some(0.0));
        assert_eq!(fit.samples.last().map(|sample| sample.x), Some(1.0));
    }

    #[test]
    fn negative_bowing_is_supported() {
        let samples = synthetic(&[0.0, 0.2, 0.4, 0.6, 0.8, 1.0], -1.25, 0.0);
        let fit = fit_bowing_parameter(&samples).expect("fit should converge");
        assert!((fit.bowing + 1.25).abs() <= 1.0e-8, "b = {}", fit.bowing);
    }

    #[test]
    fn three_samples_are_enough() {
        let samples = synthetic(&[0.0, 0.5, 1.0], 0.5, 0.0);
        let fit = fit_bowing_parameter(&samples).expect("fit should converge");

        assert!((fit.bowing - 0.5).abs() <= 1.0e-8, "b = {}", fit.bowing);
        assert_eq!(fit.samples.len(), 3);
    }

    #[test]
    fn endpoints_come_from_the_outermost_samples_when_the_range_is_interior() {
        let samples = synthetic(&[0.5, 0.75, 0.25, 0.6], 0.5, 0.0);
        let lowest = bowing_model(0.25, 1.0, 2.0, 0.5);
        let highest = bowing_model(0.75, 1.0, 2.0, 0.5);
        let fit = fit_bowing_parameter(&samples).expect("fit should converge");

        assert_eq!(fit.samples[0].x, 0.25);
        assert_eq!(fit.start_value, lowest);
        assert_eq!(fit.end_value, highest);
        assert_eq!(fit.evaluate(0.0), lowest);
        assert_eq!(fit.evaluate(1.0), highest);
        assert!(fit.bowing.is_finite());
        assert!(fit.residual_sum_of_squares.is_finite());
    }

    #[test]
    fn fewer_than_three_samples_are_skipped() {
        let samples = synthetic(&[0.0, 1.0], 0.5, 0.0);
        assert_eq!(
            fit_bowing_parameter(&samples),
            Err(BowingError::InsufficientSamples {
                found: 2,
                required: 3
            })
        );
    }
}

use faer::Mat;

const SINGULAR_PIVOT_EPSILON: f64 = 1.0e-300;
const MAX_DAMPING: f64 = 1.0e16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeastSquaresOptions {
    pub max_iterations: usize,
    /// Converged once every parameter step is below this fraction of the
    /// parameter magnitude.
    pub step_tolerance: f64,
    /// Converged once the residual sum of squares drops below this.
    pub residual_tolerance: f64,
    pub initial_damping: f64,
}

impl Default for LeastSquaresOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            step_tolerance: 1.0e-12,
            residual_tolerance: 1.0e-30,
            initial_damping: 1.0e-3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresSolution {
    pub parameters: Vec<f64>,
    pub residual_sum_of_squares: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LeastSquaresError {
    #[error("least squares requires at least one sample")]
    EmptyData,
    #[error("least squares requires at least one parameter")]
    NoParameters,
    #[error("sample length mismatch: {xs} abscissae, {ys} ordinates")]
    LengthMismatch { xs: usize, ys: usize },
    #[error("model produced a non-finite residual at iteration {iteration}")]
    NonFiniteResidual { iteration: usize },
    #[error("normal equations are singular at iteration {iteration}")]
    SingularSystem { iteration: usize },
    #[error("did not converge within {iterations} iterations")]
    NotConverged { iterations: usize },
}

/// Levenberg–Marquardt minimisation of Σ (yᵢ − model(xᵢ, p))².
///
/// The Jacobian is taken by forward differences, so `model` only needs to
/// evaluate; it is called with the abscissa and the current parameters.
pub fn levenberg_marquardt<F>(
    model: F,
    xs: &[f64],
    ys: &[f64],
    initial: &[f64],
    options: &LeastSquaresOptions,
) -> Result<LeastSquaresSolution, LeastSquaresError>
where
    F: Fn(f64, &[f64]) -> f64,
{
    if xs.len() != ys.len() {
        return Err(LeastSquaresError::LengthMismatch {
            xs: xs.len(),
            ys: ys.len(),
        });
    }
    if xs.is_empty() {
        return Err(LeastSquaresError::EmptyData);
    }
    if initial.is_empty() {
        return Err(LeastSquaresError::NoParameters);
    }

    let mut parameters = initial.to_vec();
    let mut residuals = residuals_for(&model, xs, ys, &parameters);
    let mut cost = sum_of_squares(&residuals);
    if !cost.is_finite() {
        return Err(LeastSquaresError::NonFiniteResidual { iteration: 0 });
    }
    if cost <= options.residual_tolerance {
        return Ok(LeastSquaresSolution {
            parameters,
            residual_sum_of_squares: cost,
            iterations: 0,
        });
    }

    let mut damping = options.initial_damping;
    for iteration in 1..=options.max_iterations {
        let jacobian = forward_difference_jacobian(&model, xs, &parameters);
        let (normal, gradient) = normal_equations(&jacobian, &residuals);

        loop {
            let step = solve_damped(&normal, &gradient, damping)
                .ok_or(LeastSquaresError::SingularSystem { iteration })?;

            if step_is_negligible(&step, &parameters, options.step_tolerance) {
                return Ok(LeastSquaresSolution {
                    parameters,
                    residual_sum_of_squares: cost,
                    iterations: iteration,
                });
            }

            let candidate: Vec<f64> = parameters
                .iter()
                .zip(&step)
                .map(|(value, delta)| value + delta)
                .collect();
            let candidate_residuals = residuals_for(&model, xs, ys, &candidate);
            let candidate_cost = sum_of_squares(&candidate_residuals);

            if candidate_cost.is_finite() && candidate_cost < cost {
                parameters = candidate;
                residuals = candidate_residuals;
                cost = candidate_cost;
                damping = (damping / 10.0).max(f64::MIN_POSITIVE);
                break;
            }

            damping *= 10.0;
            if damping > MAX_DAMPING {
                // No descent direction left: the current point is stationary.
                return Ok(LeastSquaresSolution {
                    parameters,
                    residual_sum_of_squares: cost,
                    iterations: iteration,
                });
            }
        }

        if cost <= options.residual_tolerance {
            return Ok(LeastSquaresSolution {
                parameters,
                residual_sum_of_squares: cost,
                iterations: iteration,
            });
        }
    }

    Err(LeastSquaresError::NotConverged {
        iterations: options.max_iterations,
    })
}

fn residuals_for<F>(model: &F, xs: &[f64], ys: &[f64], parameters: &[f64]) -> Vec<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    xs.iter()
        .zip(ys)
        .map(|(x, y)| y - model(*x, parameters))
        .collect()
}

fn sum_of_squares(values: &[f64]) -> f64 {
    values.iter().map(|value| value * value).sum()
}

fn forward_difference_jacobian<F>(model: &F, xs: &[f64], parameters: &[f64]) -> Mat<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let mut jacobian = Mat::<f64>::zeros(xs.len(), parameters.len());
    let mut shifted = parameters.to_vec();
    for column in 0..parameters.len() {
        let step = f64::EPSILON.sqrt() * parameters[column].abs().max(1.0);
        shifted[column] = parameters[column] + step;
        for (row, x) in xs.iter().enumerate() {
            jacobian[(row, column)] = (model(*x, &shifted) - model(*x, parameters)) / step;
        }
        shifted[column] = parameters[column];
    }
    jacobian
}

fn normal_equations(jacobian: &Mat<f64>, residuals: &[f64]) -> (Mat<f64>, Vec<f64>) {
    let rows = jacobian.nrows();
    let cols = jacobian.ncols();
    let mut normal = Mat::<f64>::zeros(cols, cols);
    let mut gradient = vec![0.0; cols];

    for i in 0..cols {
        for j in 0..cols {
            normal[(i, j)] = (0..rows)
                .map(|row| jacobian[(row, i)] * jacobian[(row, j)])
                .sum::<f64>();
        }
        gradient[i] = (0..rows)
            .map(|row| jacobian[(row, i)] * residuals[row])
            .sum::<f64>();
    }
    (normal, gradient)
}

/// Solves (A + λ·diag(A))·δ = g by Gaussian elimination with partial pivoting.
fn solve_damped(normal: &Mat<f64>, gradient: &[f64], damping: f64) -> Option<Vec<f64>> {
    let dimension = normal.nrows();
    let mut system = Mat::<f64>::zeros(dimension, dimension);
    let mut rhs = gradient.to_vec();
    for i in 0..dimension {
        for j in 0..dimension {
            system[(i, j)] = normal[(i, j)];
        }
        let diagonal = normal[(i, i)];
        system[(i, i)] += damping * if diagonal > 0.0 { diagonal } else { 1.0 };
    }

    for pivot in 0..dimension {
        let best = (pivot..dimension).max_by(|left, right| {
            system[(*left, pivot)]
                .abs()
                .total_cmp(&system[(*right, pivot)].abs())
        })?;
        if system[(best, pivot)].abs() < SINGULAR_PIVOT_EPSILON {
            return None;
        }
        if best != pivot {
            for col in 0..dimension {
                let held = system[(pivot, col)];
                system[(pivot, col)] = system[(best, col)];
                system[(best, col)] = held;
            }
            rhs.swap(pivot, best);
        }

        for row in pivot + 1..dimension {
            let factor = system[(row, pivot)] / system[(pivot, pivot)];
            for col in pivot..dimension {
                system[(row, col)] -= factor * system[(pivot, col)];
            }
            rhs[row] -= factor * rhs[pivot];
        }
    }

    let mut solution = vec![0.0; dimension];
    for row in (0..dimension).rev() {
        let tail: f64 = (row + 1..dimension)
            .map(|col| system[(row, col)] * solution[col])
            .sum();
        solution[row] = (rhs[row] - tail) / system[(row, row)];
    }
    solution
        .iter()
        .all(|value| value.is_finite())
        .then_some(solution)
}

fn step_is_negligible(step: &[f64], parameters: &[f64], tolerance: f64) -> bool {
    step.iter()
        .zip(parameters)
        .all(|(delta, value)| delta.abs() <= tolerance * (value.abs() + tolerance))
}

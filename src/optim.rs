use std::collections::VecDeque;

use ndarray::Array1;

use crate::errors::TrainingError;

const ARMIJO_C1: f64 = 1e-4;
const MIN_STEP: f64 = 1e-20;
const MIN_CURVATURE: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct LbfgsParams {
    pub max_iter: usize,
    /// Stop once every gradient component is at most this large in magnitude.
    pub tolerance: f64,
    /// Number of correction pairs kept for the inverse Hessian estimate.
    pub memory: usize,
}

impl Default for LbfgsParams {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-4,
            memory: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Array1<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

struct Correction {
    s: Array1<f64>,
    y: Array1<f64>,
    rho: f64,
}

/// Limited-memory BFGS with a backtracking Armijo line search.
///
/// `objective` returns the value and the gradient at a point. The search is fully
/// deterministic: the same objective and starting point always yield the same minimum.
pub fn minimize<F>(
    mut objective: F,
    x0: Array1<f64>,
    params: &LbfgsParams,
) -> Result<Minimum, TrainingError>
where
    F: FnMut(&Array1<f64>) -> (f64, Array1<f64>),
{
    let mut x = x0;
    let (mut value, mut grad) = objective(&x);
    if !value.is_finite() {
        return Err(TrainingError::NonFiniteObjective { iterations: 0 });
    }

    let mut history: VecDeque<Correction> = VecDeque::with_capacity(params.memory);
    let mut iterations = 0;

    while iterations < params.max_iter {
        if max_abs(&grad) <= params.tolerance {
            return Ok(Minimum {
                x,
                value,
                iterations,
                converged: true,
            });
        }

        let mut direction = search_direction(&grad, &history);
        let mut slope = direction.dot(&grad);
        if slope >= 0.0 {
            // the estimate lost positive definiteness, restart from steepest descent
            history.clear();
            direction = -&grad;
            slope = direction.dot(&grad);
        }

        let mut step = 1.0;
        let (next_x, next_value, next_grad) = loop {
            let candidate = &x + &(&direction * step);
            let (candidate_value, candidate_grad) = objective(&candidate);
            if candidate_value.is_finite() && candidate_value <= value + ARMIJO_C1 * step * slope {
                break (candidate, candidate_value, candidate_grad);
            }
            step *= 0.5;
            if step < MIN_STEP {
                if !candidate_value.is_finite() {
                    return Err(TrainingError::NonFiniteObjective { iterations });
                }
                log::warn!(
                    "Line search stalled after {} iterations, keeping current estimate",
                    iterations
                );
                return Ok(Minimum {
                    x,
                    value,
                    iterations,
                    converged: false,
                });
            }
        };

        let s = &next_x - &x;
        let y = &next_grad - &grad;
        let curvature = s.dot(&y);
        if curvature > MIN_CURVATURE {
            if history.len() == params.memory.max(1) {
                history.pop_front();
            }
            history.push_back(Correction {
                s,
                y,
                rho: 1.0 / curvature,
            });
        }

        x = next_x;
        value = next_value;
        grad = next_grad;
        iterations += 1;
    }

    let converged = max_abs(&grad) <= params.tolerance;
    if !converged {
        log::warn!(
            "L-BFGS reached {} iterations without converging (gradient {:e})",
            params.max_iter,
            max_abs(&grad)
        );
    }
    Ok(Minimum {
        x,
        value,
        iterations,
        converged,
    })
}

/// Two-loop recursion producing `-H * grad`.
fn search_direction(grad: &Array1<f64>, history: &VecDeque<Correction>) -> Array1<f64> {
    let mut q = grad.clone();
    let mut alphas = Vec::with_capacity(history.len());
    for c in history.iter().rev() {
        let alpha = c.rho * c.s.dot(&q);
        q.scaled_add(-alpha, &c.y);
        alphas.push(alpha);
    }

    let gamma = match history.back() {
        Some(c) => c.s.dot(&c.y) / c.y.dot(&c.y),
        None => {
            let norm = grad.dot(grad).sqrt();
            if norm > 0.0 {
                1.0 / norm
            } else {
                1.0
            }
        }
    };
    q *= gamma;

    for (c, alpha) in history.iter().zip(alphas.iter().rev()) {
        let beta = c.rho * c.y.dot(&q);
        q.scaled_add(alpha - beta, &c.s);
    }
    -q
}

fn max_abs(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0, |acc: f64, x| acc.max(x.abs()))
}

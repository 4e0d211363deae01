use std::collections::BTreeSet;

use ndarray::{s, Array1, Array2};

use crate::errors::{PredictionError, TrainingError};
use crate::optim::{minimize, LbfgsParams};
use crate::vectorizer::SparseVector;

#[derive(Debug, Clone)]
pub struct ClassifierParams {
    /// Inverse regularization strength.
    pub c: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tolerance: 1e-4,
        }
    }
}

/// Multinomial (softmax) logistic regression over sparse features.
///
/// The classes are kept sorted, so ties in the decision function resolve to the
/// lexicographically smallest tag.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    classes: Vec<String>,
    /// matrix with shape (f, c)
    /// ------------------------
    ///
    /// - f = number of features
    /// - c = number of classes
    weights: Array2<f64>,
    intercept: Array1<f64>,
}

impl LogisticRegression {
    /// Minimizes the mean cross-entropy plus `||W||² / (2·C·n)`, which has the same
    /// minimizer as `C·Σ loss + ||W||² / 2`. The intercept is not penalized.
    pub fn fit(
        features: &[SparseVector],
        labels: &[String],
        n_features: usize,
        params: &ClassifierParams,
    ) -> Result<Self, TrainingError> {
        if features.is_empty() {
            return Err(TrainingError::EmptyTrainingSet);
        }
        if features.len() != labels.len() {
            return Err(TrainingError::LabelMismatch {
                texts: features.len(),
                labels: labels.len(),
            });
        }
        if !(params.c.is_finite() && params.c > 0.0) {
            return Err(TrainingError::InvalidParameter(format!(
                "C must be a positive number, got {}",
                params.c
            )));
        }
        if let Some(x) = features.iter().find(|x| x.min_dimension() > n_features) {
            return Err(TrainingError::InvalidParameter(format!(
                "feature index {} outside a space of {} features",
                x.min_dimension() - 1,
                n_features
            )));
        }

        let classes: Vec<String> = labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let n_classes = classes.len();

        if n_classes == 1 {
            log::warn!(
                "Only one intent ('{}') to learn, every input will map to it",
                classes[0]
            );
            return Ok(Self {
                classes,
                weights: Array2::zeros((n_features, 1)),
                intercept: Array1::zeros(1),
            });
        }

        let targets: Vec<usize> = labels
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();

        let n_weights = n_features * n_classes;
        let n_samples = features.len() as f64;
        let penalty = 1.0 / (params.c * n_samples);

        let objective = |theta: &Array1<f64>| {
            let mut loss = 0.0;
            let mut grad = Array1::<f64>::zeros(theta.len());

            for (x, &target) in features.iter().zip(targets.iter()) {
                let mut scores = theta.slice(s![n_weights..]).to_owned();
                for (j, v) in x.iter() {
                    for c in 0..n_classes {
                        scores[c] += v * theta[j * n_classes + c];
                    }
                }
                let lse = log_sum_exp(&scores);
                loss += lse - scores[target];

                for c in 0..n_classes {
                    let indicator = if c == target { 1.0 } else { 0.0 };
                    let error = (scores[c] - lse).exp() - indicator;
                    grad[n_weights + c] += error;
                    for (j, v) in x.iter() {
                        grad[j * n_classes + c] += error * v;
                    }
                }
            }

            loss /= n_samples;
            grad /= n_samples;

            let w = theta.slice(s![..n_weights]);
            loss += 0.5 * penalty * w.dot(&w);
            grad.slice_mut(s![..n_weights]).scaled_add(penalty, &w);
            (loss, grad)
        };

        let lbfgs = LbfgsParams {
            max_iter: params.max_iter,
            tolerance: params.tolerance,
            ..LbfgsParams::default()
        };
        let minimum = minimize(objective, Array1::zeros(n_weights + n_classes), &lbfgs)?;
        log::info!(
            "Trained {} classes over {} features in {} iterations (loss {:.6}, converged: {})",
            n_classes,
            n_features,
            minimum.iterations,
            minimum.value,
            minimum.converged
        );

        let theta = minimum.x;
        let weights = Array2::from_shape_fn((n_features, n_classes), |(j, c)| {
            theta[j * n_classes + c]
        });
        let intercept = theta.slice(s![n_weights..]).to_owned();

        Ok(Self {
            classes,
            weights,
            intercept,
        })
    }

    pub fn decision_function(&self, x: &SparseVector) -> Result<Array1<f64>, PredictionError> {
        let dimension = self.weights.nrows();
        if x.min_dimension() > dimension {
            return Err(PredictionError::FeatureOutOfRange {
                index: x.min_dimension() - 1,
                dimension,
            });
        }
        let mut scores = self.intercept.clone();
        for (j, v) in x.iter() {
            scores.scaled_add(v, &self.weights.row(j));
        }
        Ok(scores)
    }

    pub fn predict(&self, x: &SparseVector) -> Result<&str, PredictionError> {
        let scores = self.decision_function(x)?;
        let best = scores
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, &score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((i, score)),
            })
            .map(|(i, _)| i)
            .ok_or(PredictionError::NoClasses)?;
        Ok(&self.classes[best])
    }

    /// Class probabilities, aligned with [`LogisticRegression::classes`].
    pub fn predict_proba(&self, x: &SparseVector) -> Result<Array1<f64>, PredictionError> {
        let scores = self.decision_function(x)?;
        if scores.is_empty() {
            return Err(PredictionError::NoClasses);
        }
        if scores.len() == 1 {
            return Ok(Array1::ones(1));
        }
        let lse = log_sum_exp(&scores);
        Ok(scores.mapv(|s| (s - lse).exp()))
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.weights.nrows()
    }
}

fn log_sum_exp(scores: &Array1<f64>) -> f64 {
    let max = scores.fold(f64::NEG_INFINITY, |acc, &x| acc.max(x));
    max + scores.mapv(|x| (x - max).exp()).sum().ln()
}

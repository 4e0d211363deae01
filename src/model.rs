use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, IntentRecord};
use crate::classifier::{ClassifierParams, LogisticRegression};
use crate::errors::{PredictionError, TrainingError};
use crate::vectorizer::TfidfVectorizer;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ModelConfig {
    /// Inverse regularization strength of the classifier.
    pub c: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let params = ClassifierParams::default();
        Self {
            c: params.c,
            max_iter: params.max_iter,
            tolerance: params.tolerance,
        }
    }
}

impl From<&ModelConfig> for ClassifierParams {
    fn from(config: &ModelConfig) -> Self {
        Self {
            c: config.c,
            max_iter: config.max_iter,
            tolerance: config.tolerance,
        }
    }
}

/// Lower-cased patterns paired with their intent tag, one example per pattern.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub texts: Vec<String>,
    pub labels: Vec<String>,
}

impl TrainingSet {
    pub fn from_records(records: &[IntentRecord]) -> Self {
        let mut set = Self::default();
        for intent in records {
            for pattern in &intent.patterns {
                set.texts.push(pattern.to_lowercase());
                set.labels.push(intent.tag.clone());
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// Fitted vector space and classifier. Immutable once trained.
#[derive(Debug, Clone)]
pub struct IntentModel {
    vectorizer: TfidfVectorizer,
    classifier: LogisticRegression,
}

impl IntentModel {
    pub fn train(catalog: &Catalog, config: &ModelConfig) -> Result<Self, TrainingError> {
        Self::train_on(catalog.intents(), config)
    }

    pub fn train_on(records: &[IntentRecord], config: &ModelConfig) -> Result<Self, TrainingError> {
        let training_set = TrainingSet::from_records(records);
        if training_set.is_empty() {
            return Err(TrainingError::EmptyTrainingSet);
        }
        log::info!(
            "Training intent model on {} examples from {} intents...",
            training_set.len(),
            records.len()
        );

        let vectorizer = TfidfVectorizer::fit(&training_set.texts)?;
        let features = vectorizer.transform_batch(&training_set.texts);
        let classifier = LogisticRegression::fit(
            &features,
            &training_set.labels,
            vectorizer.n_features(),
            &ClassifierParams::from(config),
        )?;

        Ok(Self {
            vectorizer,
            classifier,
        })
    }

    pub fn predict(&self, text: &str) -> Result<&str, PredictionError> {
        let features = self.vectorizer.transform(&text.to_lowercase());
        self.classifier.predict(&features)
    }

    /// Every known tag with its probability, most likely first.
    pub fn predict_proba(&self, text: &str) -> Result<Vec<(&str, f64)>, PredictionError> {
        let features = self.vectorizer.transform(&text.to_lowercase());
        let proba = self.classifier.predict_proba(&features)?;
        let mut ranked: Vec<(&str, f64)> = self
            .classifier
            .classes()
            .iter()
            .map(String::as_str)
            .zip(proba.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(ranked)
    }

    pub fn tags(&self) -> &[String] {
        self.classifier.classes()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.n_features()
    }
}

#[cfg(test)]
pub(crate) fn sample_catalog() -> Catalog {
    use crate::catalog::record;
    Catalog::from_records(vec![
        record(
            "greeting",
            &["Hi", "Hello", "Hey there", "Good morning"],
            &["Hello!", "Hi there, how can I help?"],
        ),
        record(
            "goodbye",
            &["Bye", "See you later", "Goodbye", "Take care"],
            &["See you!", "Goodbye, have a nice day."],
        ),
        record(
            "thanks",
            &["Thanks", "Thank you", "Thanks a lot"],
            &["Happy to help!", "Any time."],
        ),
        record(
            "hours",
            &["When are you open", "What are your opening hours", "Opening times"],
            &["We are open 9am to 5pm, Monday to Friday."],
        ),
        record(
            "fallback",
            &["??", "huh", "I don't get it"],
            &["I don't understand.", "Could you say that differently?"],
        ),
    ])
    .unwrap()
}

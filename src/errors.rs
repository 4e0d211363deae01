use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading the intent catalog. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("intent catalog not found at '{}'", .0.display())]
    MissingSource(PathBuf),
    #[error("intent catalog is malformed: {0}")]
    MalformedSource(String),
    #[error("intent catalog contains no intents")]
    EmptyCatalog,
}

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("no training examples found in the intent catalog")]
    EmptyTrainingSet,
    #[error("{texts} training texts but {labels} labels")]
    LabelMismatch { texts: usize, labels: usize },
    #[error("training objective became non-finite after {iterations} iterations")]
    NonFiniteObjective { iterations: usize },
    #[error("invalid training parameter: {0}")]
    InvalidParameter(String),
}

/// Per-turn failures. These never reach the user, they degrade to a generic reply.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("feature vector has index {index} outside a space of {dimension} features")]
    FeatureOutOfRange { index: usize, dimension: usize },
    #[error("classifier has no classes")]
    NoClasses,
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("cannot write conversation log '{}'", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("cannot read conversation log '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("invalid timestamp '{value}' in conversation log")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("conversation log i/o failure on '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that keeps the engine from entering its serving state.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Training(#[from] TrainingError),
}

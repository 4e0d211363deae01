//! Intent-classification chat responder.
//!
//! Intents are loaded once from a JSON catalog, a TF-IDF vector space and a
//! multinomial logistic regression are trained on their example patterns, and
//! every user message is answered with a random response of the predicted intent.

pub mod catalog;
pub mod classifier;
pub mod conversation;
pub mod engine;
pub mod errors;
pub mod model;
pub mod optim;
pub mod responder;
pub mod server;
pub mod settings;
pub mod tokenizer;
pub mod vectorizer;

pub use catalog::{Catalog, IntentRecord, FALLBACK_TAG};
pub use conversation::{
    ConversationLog, ConversationTurn, CsvConversationLog, MemoryConversationLog, Session,
};
pub use engine::{ChatEngine, ChatReply};
pub use errors::{CatalogError, LogError, PredictionError, StartupError, TrainingError};
pub use model::{IntentModel, ModelConfig};
pub use settings::Settings;

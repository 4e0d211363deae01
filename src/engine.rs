use chrono::{DateTime, Local};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::conversation::{ConversationLog, ConversationTurn, CsvConversationLog, Session};
use crate::errors::{LogError, PredictionError, StartupError};
use crate::model::IntentModel;
use crate::responder::{self, APOLOGY};
use crate::settings::Settings;

#[derive(Serialize, Debug, Clone)]
pub struct ChatReply {
    pub response: String,
    pub timestamp: DateTime<Local>,
    /// Whether the turn reached the durable transcript.
    pub persisted: bool,
}

/// Owns everything a turn needs: the catalog, the trained model, the random
/// source for response selection, the session and the transcript.
///
/// There is one session per engine, so an engine serves a single user.
pub struct ChatEngine {
    catalog: Catalog,
    model: IntentModel,
    rng: Mutex<StdRng>,
    session: Mutex<Session>,
    log: Box<dyn ConversationLog>,
}

impl ChatEngine {
    pub fn new(
        catalog: Catalog,
        model: IntentModel,
        rng: StdRng,
        log: Box<dyn ConversationLog>,
    ) -> Self {
        Self {
            catalog,
            model,
            rng: Mutex::new(rng),
            session: Mutex::new(Session::default()),
            log,
        }
    }

    /// Loads the catalog and trains the model. Any failure here is fatal.
    pub fn from_settings(settings: &Settings) -> Result<Self, StartupError> {
        let catalog = Catalog::load(&settings.data.intents_file)?;
        let model = IntentModel::train(&catalog, &settings.model)?;
        log::info!(
            "Intent model ready: {} tags, {} features",
            model.tags().len(),
            model.vocabulary_size()
        );

        let rng = match settings.responses.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let log = CsvConversationLog::new(&settings.data.history_file);
        Ok(Self::new(catalog, model, rng, Box::new(log)))
    }

    /// Never fails: prediction errors degrade to a generic apology.
    pub fn respond(&self, text: &str) -> String {
        match self.try_respond(text) {
            Ok(response) => response,
            Err(e) => {
                log::error!("Error generating response: {}", e);
                APOLOGY.to_string()
            }
        }
    }

    fn try_respond(&self, text: &str) -> Result<String, PredictionError> {
        let tag = self.model.predict(text)?;
        if log::log_enabled!(log::Level::Debug) {
            let ranked = self.model.predict_proba(text)?;
            log::debug!("Predicted '{}' for {:?}: {:?}", tag, text, ranked);
        }
        let mut rng = self.rng.lock();
        Ok(responder::select(&self.catalog, tag, &mut *rng))
    }

    pub fn log_turn(&self, text: &str, response: &str) -> Result<ConversationTurn, LogError> {
        let turn = ConversationTurn::new(text, response);
        self.log.append(&turn)?;
        Ok(turn)
    }

    /// The full durable transcript, oldest first.
    pub fn history(&self) -> Result<Vec<ConversationTurn>, LogError> {
        self.log.read_all()
    }

    /// One user turn: respond, record it in the session, then persist it. A
    /// persistence failure is reported through `persisted` and the session keeps the turn.
    pub fn chat(&self, text: &str) -> ChatReply {
        let response = self.respond(text);
        let turn = ConversationTurn::new(text, response);
        self.session.lock().push(turn.clone());

        let persisted = match self.log.append(&turn) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to save conversation: {}", e);
                false
            }
        };

        ChatReply {
            response: turn.response,
            timestamp: turn.timestamp,
            persisted,
        }
    }

    pub fn session(&self) -> Vec<ConversationTurn> {
        self.session.lock().turns().to_vec()
    }

    /// Empties the session and deletes the transcript.
    pub fn clear_history(&self) -> Result<(), LogError> {
        self.session.lock().clear();
        self.log.clear()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn model(&self) -> &IntentModel {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::record;
    use crate::conversation::MemoryConversationLog;
    use crate::model::{sample_catalog, ModelConfig};
    use crate::responder::NOT_UNDERSTOOD_REPLIES;

    fn engine_for(catalog: Catalog, log: Box<dyn ConversationLog>) -> ChatEngine {
        let model = IntentModel::train(&catalog, &ModelConfig::default()).unwrap();
        ChatEngine::new(catalog, model, StdRng::seed_from_u64(0), log)
    }

    fn greeting_engine() -> ChatEngine {
        let catalog = Catalog::from_records(vec![
            record("greeting", &["hi", "hello"], &["Hey there!"]),
            record("fallback", &["??"], &["I don't understand."]),
        ])
        .unwrap();
        engine_for(catalog, Box::new(MemoryConversationLog::new()))
    }

    #[test]
    fn greeting_scenario() {
        let engine = greeting_engine();

        assert_eq!(engine.respond("hello"), "Hey there!");
        let reply = engine.respond("asdkjasd");
        assert!(reply == "Hey there!" || reply == "I don't understand.");
    }

    #[test]
    fn respond_always_returns_text() {
        let engine = engine_for(sample_catalog(), Box::new(MemoryConversationLog::new()));

        for input in ["", " ", "?!?!", "qwertyuiop", "¡Hola!", "\u{1F600}", "hello\0world"] {
            assert!(!engine.respond(input).is_empty(), "input {:?}", input);
        }
    }

    #[test]
    fn responses_come_from_the_predicted_intent() {
        let engine = engine_for(sample_catalog(), Box::new(MemoryConversationLog::new()));
        let responses = &engine.catalog().get("thanks").unwrap().responses;

        for _ in 0..10 {
            assert!(responses.contains(&engine.respond("thank you")));
        }
    }

    #[test]
    fn predicted_tag_missing_from_catalog_uses_builtin_replies() {
        // model trained on one catalog, served with another that lacks its tags
        let trained_on = Catalog::from_records(vec![
            record("greeting", &["hi"], &["Hey"]),
            record("goodbye", &["bye"], &["Bye"]),
        ])
        .unwrap();
        let served =
            Catalog::from_records(vec![record("weather", &["rain"], &["Take an umbrella"])])
                .unwrap();
        let model = IntentModel::train(&trained_on, &ModelConfig::default()).unwrap();
        let engine = ChatEngine::new(
            served,
            model,
            StdRng::seed_from_u64(1),
            Box::new(MemoryConversationLog::new()),
        );

        let reply = engine.respond("hi");

        assert!(NOT_UNDERSTOOD_REPLIES.contains(&reply.as_str()));
    }

    #[test]
    fn log_turn_then_history() {
        let engine = greeting_engine();
        let before = Local::now();

        engine.log_turn("hi", "hello").unwrap();
        let history = engine.history().unwrap();

        let last = history.last().unwrap();
        assert_eq!(last.input, "hi");
        assert_eq!(last.response, "hello");
        assert!(last.timestamp >= before);
    }

    #[test]
    fn chat_records_session_and_transcript() {
        let engine = greeting_engine();

        let reply = engine.chat("hello");

        assert!(reply.persisted);
        assert_eq!(reply.response, "Hey there!");
        assert_eq!(engine.session().len(), 1);
        assert_eq!(engine.history().unwrap(), engine.session());
    }

    #[test]
    fn failing_transcript_keeps_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let broken = CsvConversationLog::new(dir.path().join("missing").join("history.csv"));
        let catalog = Catalog::from_records(vec![
            record("greeting", &["hi", "hello"], &["Hey there!"]),
            record("fallback", &["??"], &["I don't understand."]),
        ])
        .unwrap();
        let engine = engine_for(catalog, Box::new(broken));

        let reply = engine.chat("hello");

        assert!(!reply.persisted);
        assert_eq!(reply.response, "Hey there!");
        assert_eq!(engine.session()[0].input, "hello");
        assert!(engine.log_turn("hi", "hello").is_err());
    }

    #[test]
    fn clear_history_empties_both_stores() {
        let engine = greeting_engine();
        engine.chat("hi");
        engine.chat("hello");

        engine.clear_history().unwrap();

        assert!(engine.session().is_empty());
        assert!(engine.history().unwrap().is_empty());
    }

    #[test]
    fn seeded_engines_reply_identically() {
        let first = engine_for(sample_catalog(), Box::new(MemoryConversationLog::new()));
        let second = engine_for(sample_catalog(), Box::new(MemoryConversationLog::new()));

        for input in ["hi", "bye", "thanks", "when are you open", "huh", "hello"] {
            assert_eq!(first.respond(input), second.respond(input));
        }
    }

    #[test]
    fn startup_fails_without_a_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.data.intents_file = dir.path().join("intents.json");
        settings.data.history_file = dir.path().join("chat_history.csv");

        let result = ChatEngine::from_settings(&settings);

        assert!(matches!(
            result,
            Err(StartupError::Catalog(crate::errors::CatalogError::MissingSource(_)))
        ));
    }

    #[test]
    fn startup_from_settings_serves_turns() {
        let dir = tempfile::tempdir().unwrap();
        let intents = dir.path().join("intents.json");
        std::fs::write(
            &intents,
            r#"{"intents": [
                {"tag": "greeting", "patterns": ["hi", "hello"], "responses": ["Hey there!"]},
                {"tag": "goodbye", "patterns": ["bye", "see you"], "responses": ["Bye!"]}
            ]}"#,
        )
        .unwrap();
        let mut settings = Settings::default();
        settings.data.intents_file = intents;
        settings.data.history_file = dir.path().join("chat_history.csv");
        settings.responses.seed = Some(3);

        let engine = ChatEngine::from_settings(&settings).unwrap();
        engine.chat("see you");

        assert_eq!(engine.history().unwrap()[0].response, "Bye!");
        assert!(settings.data.history_file.exists());
    }
}

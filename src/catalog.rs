use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::CatalogError;

/// Tag of the catch-all intent a catalog author may define.
pub const FALLBACK_TAG: &str = "fallback";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IntentRecord {
    pub tag: String,
    pub patterns: Vec<String>,
    pub responses: Vec<String>,
}

#[derive(Deserialize)]
struct CatalogFile {
    intents: Vec<IntentRecord>,
}

/// Validated, immutable set of intents.
#[derive(Debug, Clone)]
pub struct Catalog {
    intents: Vec<IntentRecord>,
}

impl Catalog {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CatalogError::MissingSource(path.to_path_buf()),
            _ => CatalogError::MalformedSource(format!("cannot read '{}': {}", path.display(), e)),
        })?;
        let catalog = Self::from_json(&content)?;
        log::info!(
            "Loaded {} intents from '{}'",
            catalog.intents.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(content)
            .map_err(|e| CatalogError::MalformedSource(e.to_string()))?;
        Self::from_records(file.intents)
    }

    pub fn from_records(intents: Vec<IntentRecord>) -> Result<Self, CatalogError> {
        if intents.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }
        let mut seen = HashSet::new();
        for intent in &intents {
            if intent.tag.trim().is_empty() {
                return Err(CatalogError::MalformedSource("intent with a blank tag".into()));
            }
            if !seen.insert(intent.tag.as_str()) {
                return Err(CatalogError::MalformedSource(format!(
                    "duplicate tag '{}'",
                    intent.tag
                )));
            }
            if intent.patterns.is_empty() {
                return Err(CatalogError::MalformedSource(format!(
                    "intent '{}' has no patterns",
                    intent.tag
                )));
            }
            if intent.responses.is_empty() {
                return Err(CatalogError::MalformedSource(format!(
                    "intent '{}' has no responses",
                    intent.tag
                )));
            }
            if intent.responses.iter().any(|r| r.trim().is_empty()) {
                return Err(CatalogError::MalformedSource(format!(
                    "intent '{}' has a blank response",
                    intent.tag
                )));
            }
        }
        Ok(Self { intents })
    }

    pub fn get(&self, tag: &str) -> Option<&IntentRecord> {
        self.intents.iter().find(|intent| intent.tag == tag)
    }

    pub fn fallback(&self) -> Option<&IntentRecord> {
        self.get(FALLBACK_TAG)
    }

    pub fn intents(&self) -> &[IntentRecord] {
        &self.intents
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn record(tag: &str, patterns: &[&str], responses: &[&str]) -> IntentRecord {
    IntentRecord {
        tag: tag.to_string(),
        patterns: patterns.iter().map(|s| s.to_string()).collect(),
        responses: responses.iter().map(|s| s.to_string()).collect(),
    }
}

use std::collections::{BTreeMap, BTreeSet, HashMap};

use ndarray::{Array1, ArrayView1};

use crate::errors::TrainingError;
use crate::tokenizer::tokenize;

/// Feature vector holding only non-zero entries, sorted by feature index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn from_sorted(entries: Vec<(usize, f64)>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Largest feature index plus one, 0 for an empty vector.
    pub fn min_dimension(&self) -> usize {
        self.entries.last().map(|(i, _)| i + 1).unwrap_or(0)
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt()
    }
}

/// TF-IDF vector space fit on the training texts.
///
/// Feature indices follow the sorted order of the vocabulary so that two fits on
/// the same texts produce the same space. Weights use raw term counts, smoothed
/// inverse document frequency `ln((1 + n) / (1 + df)) + 1` and L2 normalization.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Array1<f64>,
}

impl TfidfVectorizer {
    pub fn fit(texts: &[String]) -> Result<Self, TrainingError> {
        if texts.is_empty() {
            return Err(TrainingError::EmptyTrainingSet);
        }

        let documents: Vec<Vec<String>> = texts.iter().map(|t| Self::analyze(t)).collect();

        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &documents {
            let unique: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
            for token in unique {
                *doc_freq.entry(token).or_insert(0) += 1;
            }
        }

        if doc_freq.is_empty() {
            log::warn!("Training texts produced an empty vocabulary");
        }

        let n_docs = documents.len() as f64;
        let mut vocabulary = HashMap::with_capacity(doc_freq.len());
        let mut idf = Array1::zeros(doc_freq.len());
        for (idx, (token, df)) in doc_freq.into_iter().enumerate() {
            idf[idx] = ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0;
            vocabulary.insert(token.to_string(), idx);
        }

        log::debug!(
            "Fitted TF-IDF space with {} features over {} texts",
            vocabulary.len(),
            documents.len()
        );
        Ok(Self { vocabulary, idf })
    }

    /// Out-of-vocabulary tokens are dropped.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in Self::analyze(text) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();
        let norm = entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in entries.iter_mut() {
                *v /= norm;
            }
        }
        SparseVector::from_sorted(entries)
    }

    pub fn transform_batch(&self, texts: &[String]) -> Vec<SparseVector> {
        texts.iter().map(|t| self.transform(t)).collect()
    }

    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    pub fn feature_index(&self, token: &str) -> Option<usize> {
        self.vocabulary.get(token).copied()
    }

    pub fn idf(&self) -> ArrayView1<'_, f64> {
        self.idf.view()
    }

    fn analyze(text: &str) -> Vec<String> {
        tokenize(&text.to_lowercase())
    }
}

use crate::catalog::Catalog;
use nalgebra::DVector;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Common English words excluded from the vocabulary.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "am", "an", "and", "any", "are", "as", "at",
    "be", "because", "been", "before", "being", "below", "between", "both", "but", "by", "can",
    "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from", "further",
    "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how", "if", "in",
    "into", "is", "it", "its", "just", "me", "more", "most", "my", "no", "nor", "not", "now",
    "of", "off", "on", "once", "only", "or", "other", "our", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "those", "through", "to", "too", "under", "until", "up", "very",
    "was", "we", "were", "what", "when", "where", "which", "while", "who", "why", "will", "with",
    "you", "your",
];

/// TF-IDF vector space over the catalog's program descriptions.
///
/// Fitted once at startup; document vectors are L2-normalized and kept in
/// catalog order, so cosine similarity is a dot product and ranking ties
/// fall back to the original row order.
pub struct SimilarityIndex {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    doc_vectors: Vec<DVector<f64>>,
}

impl SimilarityIndex {
    pub fn fit(catalog: &Catalog) -> Self {
        let documents: Vec<String> = catalog
            .records()
            .iter()
            .map(|r| r.program_description())
            .collect();

        let mut vocabulary = HashMap::new();
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        for doc in &documents {
            let unique: HashSet<String> = tokenize(doc).into_iter().collect();
            for token in unique {
                *document_frequency.entry(token.clone()).or_insert(0) += 1;
                let next = vocabulary.len();
                vocabulary.entry(token).or_insert(next);
            }
        }

        // Smoothed IDF: ln((1 + N) / (1 + df)) + 1
        let n_documents = documents.len() as f64;
        let mut idf = vec![0.0; vocabulary.len()];
        for (term, &idx) in &vocabulary {
            let df = document_frequency.get(term).copied().unwrap_or(0) as f64;
            idf[idx] = ((1.0 + n_documents) / (1.0 + df)).ln() + 1.0;
        }

        let index = Self {
            vocabulary,
            idf,
            doc_vectors: Vec::new(),
        };
        let doc_vectors = documents.iter().map(|doc| index.vectorize(doc)).collect();

        info!(
            "Similarity index fitted: {} documents, {} terms",
            documents.len(),
            index.vocabulary_size()
        );
        Self {
            doc_vectors,
            ..index
        }
    }

    /// Rank catalog rows against a free-text query. Returns `(row, cosine)`
    /// pairs above the floor, best first; ties keep catalog order. Terms the
    /// index has never seen are ignored, so an all-unknown query simply
    /// matches nothing.
    pub fn search(&self, query: &str, floor: f64) -> Vec<(usize, f64)> {
        let query_vector = self.vectorize(query);
        if query_vector.norm() == 0.0 {
            return Vec::new();
        }

        let mut hits: Vec<(usize, f64)> = self
            .doc_vectors
            .iter()
            .enumerate()
            .map(|(row, doc)| (row, query_vector.dot(doc)))
            .filter(|&(_, similarity)| similarity > floor)
            .collect();
        // Vec::sort_by is stable, so equal scores stay in catalog order.
        hits.sort_by(|a, b| b.1.total_cmp(&a.1));
        hits
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    fn vectorize(&self, text: &str) -> DVector<f64> {
        let mut vector = DVector::zeros(self.vocabulary.len());
        for token in tokenize(text) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                vector[idx] += self.idf[idx];
            }
        }
        let norm = vector.norm();
        if norm > 0.0 {
            vector /= norm;
        }
        vector
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() >= 2 && !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

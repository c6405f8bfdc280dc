//! Term-frequency vectors and cosine similarity
//!
//! The store ranks chunks with sparse bag-of-words vectors, not a learned
//! embedding model.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static TERM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid term regex"));

/// Words too common to carry any signal for ranking
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "into", "is", "it", "of", "on", "or", "that",
    "the", "this", "to", "with",
];

/// Build a sparse term-frequency vector for `text`
///
/// Terms are lowercased alphanumeric runs; stop words and single characters
/// are skipped.
pub fn term_vector(text: &str) -> HashMap<String, f32> {
    let mut vector = HashMap::new();
    for m in TERM_RE.find_iter(text) {
        let term = m.as_str().to_lowercase();
        if term.chars().count() < 2 || STOP_WORDS.contains(&term.as_str()) {
            continue;
        }
        *vector.entry(term).or_insert(0.0) += 1.0;
    }
    vector
}

/// Cosine similarity of two sparse vectors
///
/// Returns a value in [0, 1] for term-frequency vectors; 0.0 if either
/// vector is empty or zero.
pub fn cosine_similarity(a: &HashMap<String, f32>, b: &HashMap<String, f32>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(term, x)| large.get(term).map(|y| (*x as f64) * (*y as f64)))
        .sum();

    let norm_a: f64 = a.values().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    let norm_b: f64 = b.values().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();

    let denom = norm_a * norm_b;
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

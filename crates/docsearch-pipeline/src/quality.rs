//! Aggregate quality metrics over cleaned chunks. Diagnostic only; this
//! never filters anything.

use docsearch_core::types::Chunk;
use std::collections::HashSet;
use std::fmt;

/// Fixed histogram buckets in characters.
const SIZE_BUCKETS: &[(usize, Option<usize>)] = &[
    (0, Some(500)),
    (500, Some(1000)),
    (1000, Some(1500)),
    (1500, Some(2000)),
    (2000, None),
];

#[derive(Debug, Clone, PartialEq)]
pub struct QualityMetrics {
    pub total_chunks: usize,
    pub avg_chunk_size: f64,
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub chunk_size_std: f64,
    /// Ordered (bucket label, count) pairs.
    pub size_distribution: Vec<(String, usize)>,
    pub uniqueness_ratio: f64,
    pub duplicate_count: usize,
    pub vocabulary_diversity: f64,
    pub unique_words: usize,
    pub total_words: usize,
    /// Heuristic proxy for embedding-space variance, derived from the
    /// coefficient of variation of chunk sizes. Not a true embedding
    /// computation.
    pub embedding_variance_proxy: f64,
}

impl QualityMetrics {
    fn empty() -> Self {
        Self {
            total_chunks: 0,
            avg_chunk_size: 0.0,
            min_chunk_size: 0,
            max_chunk_size: 0,
            chunk_size_std: 0.0,
            size_distribution: Vec::new(),
            uniqueness_ratio: 1.0,
            duplicate_count: 0,
            vocabulary_diversity: 0.0,
            unique_words: 0,
            total_words: 0,
            embedding_variance_proxy: 0.0,
        }
    }
}

impl fmt::Display for QualityMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "chunks: {}", self.total_chunks)?;
        writeln!(
            f,
            "size: avg {:.1}, range {}-{}, std {:.1}",
            self.avg_chunk_size, self.min_chunk_size, self.max_chunk_size, self.chunk_size_std
        )?;
        for (bucket, count) in &self.size_distribution {
            let pct = if self.total_chunks > 0 {
                *count as f64 / self.total_chunks as f64 * 100.0
            } else {
                0.0
            };
            writeln!(f, "  {bucket:>10}: {count:5} ({pct:.1}%)")?;
        }
        writeln!(
            f,
            "uniqueness: {:.3} ({} duplicates)",
            self.uniqueness_ratio, self.duplicate_count
        )?;
        writeln!(
            f,
            "vocabulary: {:.3} ({} unique / {} total words)",
            self.vocabulary_diversity, self.unique_words, self.total_words
        )?;
        write!(f, "embedding variance proxy: {:.3}", self.embedding_variance_proxy)
    }
}

/// Computes chunk statistics: size distribution, uniqueness, vocabulary
/// diversity and the size-variability proxy.
#[derive(Debug, Default)]
pub struct QualityAnalyzer;

impl QualityAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, chunks: &[Chunk]) -> QualityMetrics {
        if chunks.is_empty() {
            return QualityMetrics::empty();
        }

        let sizes: Vec<usize> = chunks.iter().map(|c| c.content.chars().count()).collect();
        let total: usize = sizes.iter().sum();
        let avg = total as f64 / sizes.len() as f64;
        let min = sizes.iter().copied().min().unwrap_or(0);
        let max = sizes.iter().copied().max().unwrap_or(0);
        let variance = sizes
            .iter()
            .map(|s| {
                let d = *s as f64 - avg;
                d * d
            })
            .sum::<f64>()
            / sizes.len() as f64;
        let std = variance.sqrt();

        let unique_texts: HashSet<&str> =
            chunks.iter().map(|c| c.content.as_str()).collect();
        let duplicate_count = chunks.len() - unique_texts.len();
        let uniqueness_ratio = unique_texts.len() as f64 / chunks.len() as f64;

        let mut total_words = 0usize;
        let mut vocabulary: HashSet<String> = HashSet::new();
        for chunk in chunks {
            for word in chunk.content.to_lowercase().split_whitespace() {
                total_words += 1;
                vocabulary.insert(word.to_string());
            }
        }
        let unique_words = vocabulary.len();
        let vocabulary_diversity = if total_words > 0 {
            unique_words as f64 / total_words as f64
        } else {
            0.0
        };

        QualityMetrics {
            total_chunks: chunks.len(),
            avg_chunk_size: avg,
            min_chunk_size: min,
            max_chunk_size: max,
            chunk_size_std: std,
            size_distribution: size_distribution(&sizes),
            uniqueness_ratio,
            duplicate_count,
            vocabulary_diversity,
            unique_words,
            total_words,
            embedding_variance_proxy: variance_proxy(avg, std, sizes.len()),
        }
    }
}

fn size_distribution(sizes: &[usize]) -> Vec<(String, usize)> {
    SIZE_BUCKETS
        .iter()
        .map(|(lo, hi)| {
            let label = match hi {
                Some(hi) => format!("{lo}-{hi}"),
                None => format!("{lo}+"),
            };
            let count = sizes
                .iter()
                .filter(|s| **s >= *lo && hi.map_or(true, |hi| **s < hi))
                .count();
            (label, count)
        })
        .collect()
}

/// Piecewise-linear map from the coefficient of variation of chunk sizes
/// to [0, 1]: very uniform or very skewed distributions score low,
/// moderate variability (cv near 0.4-0.5) scores highest.
fn variance_proxy(mean: f64, std: f64, n: usize) -> f64 {
    if n < 2 {
        return 0.5;
    }
    if mean == 0.0 {
        return 0.0;
    }
    let cv = std / mean;
    let ratio = if cv < 0.1 {
        0.3
    } else if cv > 0.8 {
        0.4
    } else {
        0.5 + (cv - 0.4) * 0.5
    };
    ratio.clamp(0.0, 1.0)
}

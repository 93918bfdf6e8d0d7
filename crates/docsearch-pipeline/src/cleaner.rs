//! Post-chunking cleanup: size filtering, exact and near-duplicate
//! removal, and frequency-based boilerplate detection.

use docsearch_core::types::Chunk;
use similar::{DiffOp, TextDiff};
use std::collections::{HashMap, HashSet};

/// Counts of chunks removed at each cleaning stage. Purely observational.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningStats {
    pub total_input: usize,
    pub exact_duplicates_removed: usize,
    pub near_duplicates_removed: usize,
    pub boilerplate_removed: usize,
    pub too_small_removed: usize,
    pub total_output: usize,
}

impl CleaningStats {
    /// Output over input; defined as 1.0 when the input is empty.
    pub fn uniqueness_ratio(&self) -> f64 {
        if self.total_input == 0 {
            1.0
        } else {
            self.total_output as f64 / self.total_input as f64
        }
    }
}

/// Removes duplicates, boilerplate, and too-small chunks.
///
/// Near-duplicate detection compares only against the most recent
/// [`ContentCleaner::NEAR_DUPLICATE_WINDOW`] accepted chunks: full
/// pairwise comparison is quadratic and the recency window captures
/// repeated template blocks within one document set.
pub struct ContentCleaner {
    min_chunk_size: usize,
    near_duplicate_threshold: f64,
    boilerplate_min_occurrences: usize,
    seen_hashes: HashSet<String>,
    seen_contents: Vec<String>,
    boilerplate_patterns: Vec<String>,
}

impl Default for ContentCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentCleaner {
    pub const MIN_CHUNK_SIZE: usize = 100;
    pub const NEAR_DUPLICATE_THRESHOLD: f64 = 0.95;
    pub const BOILERPLATE_MIN_OCCURRENCES: usize = 3;
    pub const NEAR_DUPLICATE_WINDOW: usize = 100;
    /// Only lines longer than this count toward boilerplate patterns.
    const BOILERPLATE_MIN_LINE_LEN: usize = 20;

    pub fn new() -> Self {
        Self::with_thresholds(
            Self::MIN_CHUNK_SIZE,
            Self::NEAR_DUPLICATE_THRESHOLD,
            Self::BOILERPLATE_MIN_OCCURRENCES,
        )
    }

    pub fn with_thresholds(
        min_chunk_size: usize,
        near_duplicate_threshold: f64,
        boilerplate_min_occurrences: usize,
    ) -> Self {
        Self {
            min_chunk_size,
            near_duplicate_threshold,
            boilerplate_min_occurrences,
            seen_hashes: HashSet::new(),
            seen_contents: Vec::new(),
            boilerplate_patterns: Vec::new(),
        }
    }

    /// Clean chunks in order; the first matching rule excludes a chunk.
    /// Dedup state is reset at the start of each call.
    pub fn clean_chunks(
        &mut self,
        chunks: Vec<Chunk>,
        detect_boilerplate: bool,
    ) -> (Vec<Chunk>, CleaningStats) {
        let mut stats = CleaningStats {
            total_input: chunks.len(),
            ..CleaningStats::default()
        };

        self.seen_hashes.clear();
        self.seen_contents.clear();

        if detect_boilerplate {
            self.boilerplate_patterns = self.detect_boilerplate_patterns(&chunks);
        }

        let mut cleaned = Vec::new();
        for chunk in chunks {
            let content = chunk.content.trim().to_string();

            if content.is_empty() {
                stats.too_small_removed += 1;
                continue;
            }
            if content.chars().count() < self.min_chunk_size {
                stats.too_small_removed += 1;
                continue;
            }
            let content_hash = hash_content(&content);
            if self.seen_hashes.contains(&content_hash) {
                stats.exact_duplicates_removed += 1;
                continue;
            }
            if self.is_near_duplicate(&content) {
                stats.near_duplicates_removed += 1;
                continue;
            }
            if detect_boilerplate && self.is_boilerplate(&content) {
                stats.boilerplate_removed += 1;
                continue;
            }

            self.seen_hashes.insert(content_hash);
            self.seen_contents.push(content);
            cleaned.push(chunk);
        }

        stats.total_output = cleaned.len();
        (cleaned, stats)
    }

    fn is_near_duplicate(&self, content: &str) -> bool {
        let start = self
            .seen_contents
            .len()
            .saturating_sub(Self::NEAR_DUPLICATE_WINDOW);
        self.seen_contents[start..]
            .iter()
            .any(|seen| similarity_ratio(content, seen) >= self.near_duplicate_threshold)
    }

    /// Pass 1: any trimmed line longer than 20 characters occurring at
    /// least `boilerplate_min_occurrences` times across all chunks.
    fn detect_boilerplate_patterns(&self, chunks: &[Chunk]) -> Vec<String> {
        let mut line_counts: HashMap<&str, usize> = HashMap::new();
        for chunk in chunks {
            for line in chunk.content.split('\n') {
                let line = line.trim();
                if line.chars().count() > Self::BOILERPLATE_MIN_LINE_LEN {
                    *line_counts.entry(line).or_insert(0) += 1;
                }
            }
        }
        line_counts
            .into_iter()
            .filter(|(_, count)| *count >= self.boilerplate_min_occurrences)
            .map(|(line, _)| line.to_string())
            .collect()
    }

    /// A chunk is boilerplate when more than 80% of its non-empty lines
    /// match a detected pattern.
    fn is_boilerplate(&self, content: &str) -> bool {
        if self.boilerplate_patterns.is_empty() {
            return false;
        }
        let lines: Vec<&str> = content
            .split('\n')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if lines.is_empty() {
            return false;
        }
        let matched = lines
            .iter()
            .filter(|line| {
                self.boilerplate_patterns
                    .iter()
                    .any(|pattern| line.contains(pattern.as_str()))
            })
            .count();
        matched as f64 / lines.len() as f64 > 0.8
    }
}

fn hash_content(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Similarity as a ratio of matching characters over both lengths,
/// computed from the diff's equal runs so the 0.95 threshold compares
/// exactly (2M / (len_a + len_b), difflib-style).
fn similarity_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }
    let diff = TextDiff::from_chars(a, b);
    let matches: usize = diff
        .ops()
        .iter()
        .map(|op| match op {
            DiffOp::Equal { len, .. } => *len,
            _ => 0,
        })
        .sum();
    2.0 * matches as f64 / total as f64
}

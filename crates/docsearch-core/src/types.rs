//! Domain types shared by the pipeline, index engines and the service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A loaded source document, the unit of ingestion.
///
/// - `url`: stable identity (`file://…` for local files, article URL for
///   archive records). Chunk ids are derived from it.
/// - `title`: display title (file name for local files)
/// - `text`: full document text
/// - `path`: original filesystem path when the document came from disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: String,
    pub text: String,
    pub path: Option<String>,
}

/// Metadata carried by every chunk, inherited from the parent document
/// plus the chunking decisions that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub title: String,
    pub url: String,
    pub path: Option<String>,
    pub quality_score: f64,
    pub language: String,
    pub language_multiplier: f64,
    pub chunk_index: usize,
    pub chunking_method: String,
}

/// A contiguous span of a document's text, the unit of vector indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub meta: ChunkMeta,
}

impl Chunk {
    /// Deterministic chunk identity: same document + ordinal always
    /// yields the same id, so re-indexing upserts instead of duplicating.
    pub fn id(&self) -> String {
        chunk_id(&self.meta.url, self.meta.chunk_index)
    }
}

pub fn chunk_id(url: &str, chunk_index: usize) -> String {
    format!("{url}#chunk{chunk_index}")
}

/// One entry of a ranked list returned by a single engine. `score` is
/// engine-specific; only the rank order feeds fusion.
#[derive(Debug, Clone)]
pub struct RankedHit {
    pub url: String,
    pub title: String,
    pub text: String,
    pub score: f32,
}

/// Which engine(s) contributed a fused result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    Lexical,
    Vector,
    Both,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provenance::Lexical => "bm25",
            Provenance::Vector => "vector",
            Provenance::Both => "both",
        };
        f.write_str(s)
    }
}

/// The unit returned to callers, constructed per query.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub text: String,
    pub provenance: Provenance,
    pub corpus: CorpusKind,
}

/// Which ranked lists participate in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStrategy {
    Keyword,
    Semantic,
    #[default]
    Hybrid,
}

impl SearchStrategy {
    /// Unknown strategy names silently fall back to hybrid.
    pub fn parse(s: &str) -> Self {
        match s {
            "keyword" => SearchStrategy::Keyword,
            "semantic" => SearchStrategy::Semantic,
            _ => SearchStrategy::Hybrid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStrategy::Keyword => "keyword",
            SearchStrategy::Semantic => "semantic",
            SearchStrategy::Hybrid => "hybrid",
        }
    }
}

/// The two corpora the service can route a query to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorpusKind {
    /// Static encyclopedic corpus, built once and persisted.
    Archive,
    /// Dynamic local file tree, rebuilt on demand.
    Files,
}

impl CorpusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorpusKind::Archive => "archive",
            CorpusKind::Files => "files",
        }
    }
}

/// Corpus selector accepted by the query surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Source {
    #[default]
    All,
    Archive,
    Files,
}

impl Source {
    /// Unknown source names fall back to querying all corpora.
    pub fn parse(s: &str) -> Self {
        match s {
            "archive" => Source::Archive,
            "files" => Source::Files,
            _ => Source::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_is_stable() {
        let a = chunk_id("file:///notes/a.md", 3);
        let b = chunk_id("file:///notes/a.md", 3);
        assert_eq!(a, b);
        assert_eq!(a, "file:///notes/a.md#chunk3");
        assert_ne!(a, chunk_id("file:///notes/a.md", 4));
    }

    #[test]
    fn strategy_falls_back_to_hybrid() {
        assert_eq!(SearchStrategy::parse("keyword"), SearchStrategy::Keyword);
        assert_eq!(SearchStrategy::parse("semantic"), SearchStrategy::Semantic);
        assert_eq!(SearchStrategy::parse("hybrid"), SearchStrategy::Hybrid);
        assert_eq!(SearchStrategy::parse("fancy"), SearchStrategy::Hybrid);
        assert_eq!(SearchStrategy::parse(""), SearchStrategy::Hybrid);
    }

    #[test]
    fn source_falls_back_to_all() {
        assert_eq!(Source::parse("archive"), Source::Archive);
        assert_eq!(Source::parse("files"), Source::Files);
        assert_eq!(Source::parse("everything"), Source::All);
    }
}

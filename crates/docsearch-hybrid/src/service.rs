//! Multi-corpus search service.
//!
//! Owns both corpus states behind `RwLock`s. A corpus is Unavailable
//! until a build is requested, Building while its first build runs, and
//! Ready once a fully built indexer has been swapped in. A rebuild of a
//! Ready corpus keeps serving the existing index until the replacement
//! is complete; queries never see a half-built index. Long-running
//! hosts kick builds off with `spawn_archive_build`/`spawn_files_build`
//! at startup and answer early queries with the initializing note;
//! one-shot tools await `build_archive`/`build_files` directly.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::error;

use docsearch_core::config::SearchConfig;
use docsearch_core::traits::Embedder;
use docsearch_core::types::{CorpusKind, SearchResult, SearchStrategy, Source};

use crate::indexer::{build_files_indexer, load_or_build_archive_indexer, HybridIndexer};

pub enum CorpusState {
    Unavailable,
    Building,
    Ready(Arc<HybridIndexer>),
}

impl CorpusState {
    fn describe(&self) -> String {
        match self {
            CorpusState::Unavailable => "unavailable".to_string(),
            CorpusState::Building => "building".to_string(),
            CorpusState::Ready(ix) => format!("ready ({} documents)", ix.document_count()),
        }
    }
}

pub struct SearchService {
    config: SearchConfig,
    embedder: Arc<dyn Embedder>,
    archive: RwLock<CorpusState>,
    files: RwLock<CorpusState>,
}

impl SearchService {
    pub fn new(config: SearchConfig, embedder: Arc<dyn Embedder>) -> Arc<Self> {
        Arc::new(Self {
            config,
            embedder,
            archive: RwLock::new(CorpusState::Unavailable),
            files: RwLock::new(CorpusState::Unavailable),
        })
    }

    /// Build (or reopen) the archive corpus and swap it in. A failed
    /// first build leaves the corpus Unavailable; a failed rebuild
    /// keeps the previously swapped-in index.
    pub async fn build_archive(&self, source: Option<PathBuf>) -> Result<()> {
        Self::mark_building(&self.archive).await;
        match load_or_build_archive_indexer(
            &self.config,
            Arc::clone(&self.embedder),
            source.as_deref(),
        )
        .await
        {
            Ok(indexer) => {
                *self.archive.write().await = CorpusState::Ready(Arc::new(indexer));
                Ok(())
            }
            Err(e) => {
                Self::revert_building(&self.archive).await;
                Err(e)
            }
        }
    }

    /// Rebuild the files corpus from a directory tree and swap it in.
    pub async fn build_files(&self, source_dir: PathBuf) -> Result<()> {
        Self::mark_building(&self.files).await;
        match build_files_indexer(&self.config, Arc::clone(&self.embedder), &source_dir).await {
            Ok(indexer) => {
                *self.files.write().await = CorpusState::Ready(Arc::new(indexer));
                Ok(())
            }
            Err(e) => {
                Self::revert_building(&self.files).await;
                Err(e)
            }
        }
    }

    /// Only an Unavailable corpus shows as Building; one that is
    /// already Ready keeps serving its current index while the
    /// replacement builds.
    async fn mark_building(state: &RwLock<CorpusState>) {
        let mut guard = state.write().await;
        if matches!(*guard, CorpusState::Unavailable) {
            *guard = CorpusState::Building;
        }
    }

    async fn revert_building(state: &RwLock<CorpusState>) {
        let mut guard = state.write().await;
        if matches!(*guard, CorpusState::Building) {
            *guard = CorpusState::Unavailable;
        }
    }

    /// Fire-and-forget build used at startup; queries arriving before
    /// completion get the "still initializing" note.
    pub fn spawn_archive_build(self: &Arc<Self>, source: Option<PathBuf>) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = service.build_archive(source).await {
                error!(error = %e, "archive build failed");
            }
        });
    }

    pub fn spawn_files_build(self: &Arc<Self>, source_dir: PathBuf) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = service.build_files(source_dir).await {
                error!(error = %e, "files build failed");
            }
        });
    }

    /// One line per corpus, for a status command or readiness probe.
    pub async fn status(&self) -> String {
        format!(
            "archive: {}\nfiles: {}",
            self.archive.read().await.describe(),
            self.files.read().await.describe()
        )
    }

    /// Query one or both corpora and format the answer as text.
    ///
    /// `top_k` is clamped to [1, 10]; unknown strategy names fall back
    /// to hybrid and unknown sources to all. Corpora that are building
    /// or unconfigured contribute a note instead of results.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        strategy: &str,
        source: &str,
    ) -> Result<String> {
        let top_k = top_k.clamp(1, 10);
        let strategy = SearchStrategy::parse(strategy);
        let source = Source::parse(source);

        let mut selected: Vec<(CorpusKind, &RwLock<CorpusState>)> = Vec::new();
        if matches!(source, Source::All | Source::Archive) {
            selected.push((CorpusKind::Archive, &self.archive));
        }
        if matches!(source, Source::All | Source::Files) {
            selected.push((CorpusKind::Files, &self.files));
        }

        let mut results: Vec<SearchResult> = Vec::new();
        let mut notes: Vec<String> = Vec::new();
        for (kind, state) in selected {
            let guard = state.read().await;
            match &*guard {
                CorpusState::Ready(indexer) => {
                    results.extend(indexer.search(query, top_k, strategy).await?);
                }
                CorpusState::Building => notes.push(format!(
                    "The {} index is still initializing. Try again shortly.",
                    kind.as_str()
                )),
                CorpusState::Unavailable => {
                    notes.push(format!("The {} corpus is not configured.", kind.as_str()));
                }
            }
        }

        if results.is_empty() {
            if !notes.is_empty() {
                return Ok(notes.join("\n"));
            }
            return Ok(
                "No results found for your query. Try rephrasing or using different keywords."
                    .to_string(),
            );
        }

        let formatted = format_results(&results);
        if notes.is_empty() {
            Ok(formatted)
        } else {
            Ok(format!("{}\n\n{}", notes.join("\n"), formatted))
        }
    }
}

fn format_results(results: &[SearchResult]) -> String {
    let blocks: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[Result {}]\nTitle: {}\nSource: {}\nMatched: {} ({})\nContent: {}\n",
                i + 1,
                r.title,
                r.url,
                r.provenance,
                r.corpus.as_str(),
                r.text
            )
        })
        .collect();
    blocks.join("\n---\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsearch_core::types::Provenance;

    #[test]
    fn formats_numbered_blocks() {
        let results = vec![
            SearchResult {
                title: "Apples".to_string(),
                url: "file://apples.md".to_string(),
                text: "about apples".to_string(),
                provenance: Provenance::Both,
                corpus: CorpusKind::Files,
            },
            SearchResult {
                title: "Bananas".to_string(),
                url: "file://bananas.md".to_string(),
                text: "about bananas".to_string(),
                provenance: Provenance::Lexical,
                corpus: CorpusKind::Files,
            },
        ];
        let out = format_results(&results);
        assert!(out.starts_with("[Result 1]\nTitle: Apples\n"));
        assert!(out.contains("\n---\n[Result 2]\nTitle: Bananas\n"));
        assert!(out.contains("Matched: both (files)"));
        assert!(out.contains("Matched: bm25 (files)"));
    }
}

//! Per-corpus hybrid indexers: BM25 over whole documents, vectors over
//! cleaned chunks, fused per query.
//!
//! The two corpora age differently. The archive is built once from its
//! dump and persisted (tantivy directory, LanceDB table, JSON document
//! sidecar); local files are cheap to re-read, so their lexical index
//! is rebuilt from scratch on every build while the vector table is
//! synchronized by chunk id, removing rows for chunks that no longer
//! exist.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use docsearch_core::config::{path_fingerprint, SearchConfig};
use docsearch_core::traits::Embedder;
use docsearch_core::types::{
    Chunk, CorpusKind, Document, RankedHit, SearchResult, SearchStrategy,
};
use docsearch_pipeline::{
    ChunkingConfig, ChunkingStrategy, ContentCleaner, DocumentAnalyzer, QualityAnalyzer,
};
use docsearch_text::LexicalIndexer;
use docsearch_vector::VectorStore;

use crate::fusion::reciprocal_rank_fusion;
use crate::loader;

pub const ARCHIVE_TABLE: &str = "archive";

/// One corpus worth of retrieval state. Search never mutates; builds
/// construct a whole new value.
pub struct HybridIndexer {
    corpus: CorpusKind,
    lexical: LexicalIndexer,
    vectors: VectorStore,
    embedder: Arc<dyn Embedder>,
    rrf_k: usize,
    document_count: usize,
}

impl HybridIndexer {
    pub fn corpus(&self) -> CorpusKind {
        self.corpus
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }

    /// Run the selected engines and fuse. `top_k` results are fetched
    /// from each engine; fused output is truncated to `top_k`.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        strategy: SearchStrategy,
    ) -> Result<Vec<SearchResult>> {
        let lexical_hits = match strategy {
            SearchStrategy::Semantic => Vec::new(),
            _ => self.lexical.search(query, top_k)?,
        };
        // A vector backend failure degrades to lexical-only results;
        // partial answers beat a hard error on the query path.
        let vector_hits = match strategy {
            SearchStrategy::Keyword => Vec::new(),
            _ => match self.vector_hits(query, top_k).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(error = %e, "vector search failed, continuing with lexical results");
                    Vec::new()
                }
            },
        };
        let fused = reciprocal_rank_fusion(&lexical_hits, &vector_hits, self.rrf_k);
        Ok(fused
            .into_iter()
            .take(top_k)
            .map(|h| SearchResult {
                title: h.title,
                url: h.url,
                text: h.text,
                provenance: h.provenance,
                corpus: self.corpus,
            })
            .collect())
    }

    async fn vector_hits(&self, query: &str, top_k: usize) -> Result<Vec<RankedHit>> {
        let query_vec = self.embedder.embed_batch(&[query.to_string()])?.remove(0);
        self.vectors.search(&query_vec, top_k).await
    }
}

/// Build the dynamic corpus from a directory tree. The lexical index is
/// recreated; chunk vectors are synchronized into a table derived from
/// the normalized source path, so two spellings of one directory share
/// a table and distinct directories never collide.
pub async fn build_files_indexer(
    config: &SearchConfig,
    embedder: Arc<dyn Embedder>,
    source_dir: &Path,
) -> Result<HybridIndexer> {
    info!(dir = %source_dir.display(), "building files corpus");
    let documents = loader::load_local_documents(source_dir, &config.file_extensions)?;
    if documents.is_empty() {
        warn!(dir = %source_dir.display(), "no documents found");
    }

    let lexical = LexicalIndexer::recreate(&config.files_tantivy_dir(source_dir))?;
    lexical.index_documents(&documents)?;

    let table = format!("files_{}", path_fingerprint(source_dir));
    let vectors = VectorStore::open(&config.lancedb_dir(), &table).await?;
    let chunks = run_pipeline(&documents, config);
    info!("stage 4/4: writing vector index");
    let embeddings = embed_chunks(embedder.as_ref(), &chunks)?;
    vectors.sync(&chunks, &embeddings).await?;

    info!(files = documents.len(), chunks = chunks.len(), "files corpus build complete");
    Ok(HybridIndexer {
        corpus: CorpusKind::Files,
        lexical,
        vectors,
        embedder,
        rrf_k: config.rrf_k,
        document_count: documents.len(),
    })
}

/// Open the persisted archive corpus, or build it from the JSONL dump
/// at `source` when nothing persisted exists yet.
pub async fn load_or_build_archive_indexer(
    config: &SearchConfig,
    embedder: Arc<dyn Embedder>,
    source: Option<&Path>,
) -> Result<HybridIndexer> {
    let docs_path = config.archive_docs_path();
    let lexical_dir = config.archive_tantivy_dir();
    let vectors = VectorStore::open(&config.lancedb_dir(), ARCHIVE_TABLE).await?;

    if docs_path.exists() {
        let lexical = LexicalIndexer::open_or_create(&lexical_dir)?;
        if lexical.has_documents()? {
            let documents: Vec<Document> =
                serde_json::from_str(&std::fs::read_to_string(&docs_path)?)?;
            let vector_count = vectors.count().await?;
            info!(
                documents = documents.len(),
                vectors = vector_count,
                "reusing persisted archive index"
            );
            return Ok(HybridIndexer {
                corpus: CorpusKind::Archive,
                lexical,
                vectors,
                embedder,
                rrf_k: config.rrf_k,
                document_count: documents.len(),
            });
        }
    }

    let Some(source) = source else {
        return Err(docsearch_core::error::Error::Unavailable(
            "archive index not built and no source dump given (expected JSONL of title/url/text records)"
                .to_string(),
        )
        .into());
    };

    info!(source = %source.display(), "building archive corpus");
    let documents = loader::load_archive_documents(source, config.archive_subset_size)?;
    let lexical = LexicalIndexer::recreate(&lexical_dir)?;
    lexical.index_documents(&documents)?;

    if let Some(parent) = docs_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&docs_path, serde_json::to_string(&documents)?)?;

    let chunks = run_pipeline(&documents, config);
    info!("stage 4/4: writing vector index");
    let embeddings = embed_chunks(embedder.as_ref(), &chunks)?;
    vectors.replace(&chunks, &embeddings).await?;

    info!(documents = documents.len(), chunks = chunks.len(), "archive corpus build complete");
    Ok(HybridIndexer {
        corpus: CorpusKind::Archive,
        lexical,
        vectors,
        embedder,
        rrf_k: config.rrf_k,
        document_count: documents.len(),
    })
}

/// Analyze, chunk, clean and measure. Shared by both corpus builds.
fn run_pipeline(documents: &[Document], config: &SearchConfig) -> Vec<Chunk> {
    if documents.is_empty() {
        return Vec::new();
    }

    info!("stage 1/4: analyzing and chunking documents");
    let analyzer = DocumentAnalyzer::new();
    let chunker = ChunkingStrategy::new();
    let mut all_chunks = Vec::new();
    let mut language_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut quality_sum = 0.0;
    for document in documents {
        let analysis = analyzer.analyze(&document.text, document.path.as_deref());
        *language_counts.entry(analysis.language.clone()).or_default() += 1;
        quality_sum += analysis.quality_score;

        let chunk_config = ChunkingConfig::smart(
            document.path.as_deref(),
            &analysis,
            config.chunk_target_min,
            config.chunk_target_max,
        );
        all_chunks.extend(chunker.chunk_document(document, analysis.quality_score, &chunk_config));
    }
    let avg_quality = quality_sum / documents.len() as f64;
    info!(
        chunks = all_chunks.len(),
        avg_quality = format!("{avg_quality:.3}"),
        languages = ?language_counts,
        "chunking complete"
    );

    info!("stage 2/4: cleaning content");
    let mut cleaner = ContentCleaner::with_thresholds(
        config.min_chunk_size,
        config.near_duplicate_threshold,
        config.boilerplate_min_occurrences,
    );
    let (cleaned, stats) = cleaner.clean_chunks(all_chunks, true);
    info!(
        exact_duplicates = stats.exact_duplicates_removed,
        near_duplicates = stats.near_duplicates_removed,
        boilerplate = stats.boilerplate_removed,
        too_small = stats.too_small_removed,
        uniqueness = format!("{:.3}", stats.uniqueness_ratio()),
        remaining = stats.total_output,
        "cleaning complete"
    );

    info!("stage 3/4: computing quality metrics");
    let metrics = QualityAnalyzer::new().analyze(&cleaned);
    debug!("quality report:\n{metrics}");
    info!(
        total_chunks = metrics.total_chunks,
        avg_size = format!("{:.1}", metrics.avg_chunk_size),
        uniqueness = format!("{:.3}", metrics.uniqueness_ratio),
        vocabulary = format!("{:.3}", metrics.vocabulary_diversity),
        "quality metrics computed"
    );

    cleaned
}

fn embed_chunks(embedder: &dyn Embedder, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    embedder.embed_batch(&texts)
}

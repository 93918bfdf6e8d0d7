use anyhow::Result;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{doc, Index, TantivyDocument};
use tracing::warn;

use docsearch_core::types::{Document, RankedHit};

use crate::tantivy_utils::{build_schema, register_tokenizer};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// BM25 index over whole documents. Queries search title and text,
/// results come back best-score-first.
pub struct LexicalIndexer {
    index: Index,
    url_field: tantivy::schema::Field,
    title_field: tantivy::schema::Field,
    text_field: tantivy::schema::Field,
}

impl LexicalIndexer {
    /// Wipes any existing index at `index_dir` and starts fresh. Used
    /// for corpora that are re-read from source on every build.
    pub fn recreate(index_dir: &Path) -> Result<Self> {
        if index_dir.exists() {
            std::fs::remove_dir_all(index_dir)?;
        }
        std::fs::create_dir_all(index_dir)?;
        let index = Index::create_in_dir(index_dir, build_schema())?;
        Self::from_index(index)
    }

    /// Opens a previously built index, or creates an empty one when
    /// the directory holds no index yet.
    pub fn open_or_create(index_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(index_dir)?;
        let dir = tantivy::directory::MmapDirectory::open(index_dir)?;
        let index = Index::open_or_create(dir, build_schema())?;
        Self::from_index(index)
    }

    fn from_index(index: Index) -> Result<Self> {
        register_tokenizer(&index);
        let schema = index.schema();
        let url_field = schema.get_field("url")?;
        let title_field = schema.get_field("title")?;
        let text_field = schema.get_field("text")?;
        Ok(Self { index, url_field, title_field, text_field })
    }

    /// True when the index already contains documents. Lets callers
    /// skip a rebuild after `open_or_create` found a populated index.
    pub fn has_documents(&self) -> Result<bool> {
        let reader = self.index.reader()?;
        Ok(reader.searcher().num_docs() > 0)
    }

    pub fn index_documents(&self, documents: &[Document]) -> Result<usize> {
        let mut writer = self.index.writer(WRITER_HEAP_BYTES)?;
        for document in documents {
            writer.add_document(doc!(
                self.url_field => document.url.clone(),
                self.title_field => document.title.clone(),
                self.text_field => document.text.clone(),
            ))?;
        }
        writer.commit()?;
        Ok(documents.len())
    }

    pub fn search(&self, query: &str, k: usize) -> Result<Vec<RankedHit>> {
        let reader = self.index.reader()?;
        let searcher = reader.searcher();
        let parser = QueryParser::for_index(&self.index, vec![self.title_field, self.text_field]);
        let (parsed, errors) = parser.parse_query_lenient(query);
        if !errors.is_empty() {
            warn!(query, ?errors, "query parsed leniently");
        }
        let top_docs = searcher.search(&parsed, &TopDocs::with_limit(k))?;
        let mut hits = Vec::new();
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let field_str = |field| {
                doc.get_first(field).and_then(|v| v.as_str()).unwrap_or("").to_string()
            };
            hits.push(RankedHit {
                url: field_str(self.url_field),
                title: field_str(self.title_field),
                text: field_str(self.text_field),
                score,
            });
        }
        Ok(hits)
    }
}

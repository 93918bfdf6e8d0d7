use anyhow::{anyhow, Result};
use arrow_array::{
    FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use futures::TryStreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use docsearch_core::types::{Chunk, RankedHit};

use crate::schema::{build_arrow_schema, EMBEDDING_DIM};

const INSERT_BATCH_SIZE: usize = 1000;

/// One LanceDB table of embedded chunks for a single corpus.
pub struct VectorStore {
    db: Connection,
    table_name: String,
}

impl VectorStore {
    pub async fn open(db_path: &Path, table_name: &str) -> Result<Self> {
        let db = connect(db_path.to_string_lossy().as_ref()).execute().await?;
        Ok(Self { db, table_name: table_name.to_string() })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn table_exists(&self) -> Result<bool> {
        let names = self.db.table_names().execute().await?;
        Ok(names.contains(&self.table_name))
    }

    /// Drops any existing table and writes all chunks fresh. Used for
    /// corpora rebuilt wholesale.
    pub async fn replace(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if self.table_exists().await? {
            self.db.drop_table(&self.table_name, &[]).await?;
        }
        self.write(chunks, embeddings, WriteMode::Append).await
    }

    /// Synchronizes the table with the given chunk set, keyed by chunk
    /// id: matching rows update, new rows insert, and rows whose ids
    /// are absent from the set are deleted. A document that shrank or
    /// disappeared between builds leaves no stale chunks behind.
    pub async fn sync(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.is_empty() {
            if self.table_exists().await? {
                self.db.drop_table(&self.table_name, &[]).await?;
            }
            return Ok(());
        }
        self.write(chunks, embeddings, WriteMode::Merge).await
    }

    async fn write(
        &self,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
        mode: WriteMode,
    ) -> Result<()> {
        if chunks.is_empty() {
            debug!(table = %self.table_name, "no chunks to write");
            return Ok(());
        }
        if chunks.len() != embeddings.len() {
            return Err(docsearch_core::error::Error::Operation(format!(
                "chunk/embedding count mismatch: {} vs {}",
                chunks.len(),
                embeddings.len()
            ))
            .into());
        }
        info!(table = %self.table_name, chunks = chunks.len(), "writing chunks");
        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")?
                .progress_chars("#>-"),
        );
        match mode {
            WriteMode::Append => {
                for (chunk_batch, embedding_batch) in chunks
                    .chunks(INSERT_BATCH_SIZE)
                    .zip(embeddings.chunks(INSERT_BATCH_SIZE))
                {
                    let record_batch = chunks_to_record_batch(chunk_batch, embedding_batch)?;
                    self.append_batch(record_batch).await?;
                    pb.inc(chunk_batch.len() as u64);
                }
            }
            WriteMode::Merge => {
                let mut batches = Vec::new();
                for (chunk_batch, embedding_batch) in chunks
                    .chunks(INSERT_BATCH_SIZE)
                    .zip(embeddings.chunks(INSERT_BATCH_SIZE))
                {
                    batches.push(chunks_to_record_batch(chunk_batch, embedding_batch)?);
                }
                self.merge_batches(batches).await?;
                pb.inc(chunks.len() as u64);
            }
        }
        pb.finish_and_clear();
        info!(table = %self.table_name, chunks = chunks.len(), "write complete");
        Ok(())
    }

    async fn append_batch(&self, batch: RecordBatch) -> Result<()> {
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        if self.table_exists().await? {
            let table = self.db.open_table(&self.table_name).execute().await?;
            table.add(reader).execute().await?;
        } else {
            self.db.create_table(&self.table_name, reader).execute().await?;
        }
        Ok(())
    }

    /// One merge covering every batch, so the delete clause sees the
    /// whole incoming set; merging per batch would delete the rows of
    /// batches not yet written.
    async fn merge_batches(&self, batches: Vec<RecordBatch>) -> Result<()> {
        if batches.is_empty() {
            return Ok(());
        }
        if !self.table_exists().await? {
            for batch in batches {
                self.append_batch(batch).await?;
            }
            return Ok(());
        }
        let schema = batches[0].schema();
        let reader = Box::new(RecordBatchIterator::new(batches.into_iter().map(Ok), schema));
        let table = self.db.open_table(&self.table_name).execute().await?;
        let mut mi = table.merge_insert(&["id"]);
        mi.when_matched_update_all(None)
            .when_not_matched_insert_all()
            .when_not_matched_by_source_delete(None);
        mi.execute(reader).await?;
        Ok(())
    }

    /// Nearest chunks by vector distance. A corpus whose table was
    /// never created simply has no results.
    pub async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<RankedHit>> {
        if !self.table_exists().await? {
            return Ok(Vec::new());
        }
        let table = self.db.open_table(&self.table_name).execute().await?;
        let mut stream = table.vector_search(query_vec.to_vec())?.limit(k).execute().await?;
        let mut hits = Vec::new();
        while let Some(batch) = TryStreamExt::try_next(&mut stream).await? {
            for i in 0..batch.num_rows() {
                let column_str = |name: &str| -> Result<String> {
                    let col = batch
                        .column_by_name(name)
                        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                        .ok_or_else(|| anyhow!("column {name} missing from result batch"))?;
                    Ok(col.value(i).to_string())
                };
                let score = batch
                    .column_by_name("_distance")
                    .and_then(|c| c.as_any().downcast_ref::<arrow_array::Float32Array>())
                    .map_or(0.0, |d| 1.0 - d.value(i));
                hits.push(RankedHit {
                    url: column_str("url")?,
                    title: column_str("title")?,
                    text: column_str("content")?,
                    score,
                });
            }
        }
        Ok(hits)
    }

    /// Number of rows in the table, zero when it does not exist.
    pub async fn count(&self) -> Result<usize> {
        if !self.table_exists().await? {
            return Ok(0);
        }
        let table = self.db.open_table(&self.table_name).execute().await?;
        Ok(table.count_rows(None).await?)
    }
}

#[derive(Clone, Copy)]
enum WriteMode {
    Append,
    Merge,
}

fn chunks_to_record_batch(chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<RecordBatch> {
    let schema = build_arrow_schema();
    let mut ids = Vec::with_capacity(chunks.len());
    let mut urls = Vec::with_capacity(chunks.len());
    let mut titles = Vec::with_capacity(chunks.len());
    let mut contents = Vec::with_capacity(chunks.len());
    let mut chunk_indices = Vec::with_capacity(chunks.len());
    let mut methods = Vec::with_capacity(chunks.len());
    let mut languages = Vec::with_capacity(chunks.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(chunks.len());
    for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
        if embedding.len() != EMBEDDING_DIM as usize {
            return Err(anyhow!(
                "embedding width {} does not match schema ({EMBEDDING_DIM})",
                embedding.len()
            ));
        }
        ids.push(chunk.id());
        urls.push(chunk.meta.url.clone());
        titles.push(chunk.meta.title.clone());
        contents.push(chunk.content.clone());
        chunk_indices.push(chunk.meta.chunk_index as i32);
        methods.push(chunk.meta.chunking_method.clone());
        languages.push(chunk.meta.language.clone());
        vectors.push(Some(embedding.iter().map(|&x| Some(x)).collect()));
    }
    let record_batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(urls)),
            Arc::new(StringArray::from(titles)),
            Arc::new(StringArray::from(contents)),
            Arc::new(Int32Array::from(chunk_indices)),
            Arc::new(StringArray::from(methods)),
            Arc::new(StringArray::from(languages)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<
                arrow_array::types::Float32Type,
                _,
                _,
            >(vectors.into_iter(), EMBEDDING_DIM)),
        ],
    )?;
    Ok(record_batch)
}

//! docsearch-embed
//!
//! Sentence embedding providers: the real BGE-M3 model via candle, and
//! a feature-hashing stand-in for tests and model-less environments.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod device;
pub mod hashing;
pub mod model;
pub mod tokenize;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use docsearch_core::traits::Embedder;
pub use hashing::HashEmbedder;
pub use model::EmbeddingModel;

/// Picks the embedding provider. `APP_USE_FAKE_EMBEDDINGS=1` (or
/// `true`) forces the hashing embedder; otherwise the BGE-M3 model is
/// loaded from disk.
pub fn default_embedder() -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        info!("using hashing embedder");
        return Ok(Arc::new(HashEmbedder::new()));
    }
    Ok(Arc::new(EmbeddingModel::new()?))
}

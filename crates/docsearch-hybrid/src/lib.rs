//! docsearch-hybrid
//!
//! Ties the engines together: document loading, per-corpus hybrid
//! indexers (BM25 over whole documents + vectors over chunks), RRF
//! fusion, and the multi-corpus search service.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod fusion;
pub mod indexer;
pub mod loader;
pub mod service;

pub use fusion::reciprocal_rank_fusion;
pub use indexer::HybridIndexer;
pub use service::{CorpusState, SearchService};

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

/// Width of BGE-M3 sentence embeddings. Every vector table and
/// embedder in the workspace agrees on this.
pub const EMBEDDING_DIM: usize = 1024;

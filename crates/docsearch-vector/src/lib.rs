//! docsearch-vector
//!
//! Chunk-level semantic retrieval on LanceDB. One table per corpus;
//! chunk ids make re-indexing a synchronization: changed chunks update
//! in place and vanished chunks are deleted.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod schema;
pub mod store;

pub use store::VectorStore;

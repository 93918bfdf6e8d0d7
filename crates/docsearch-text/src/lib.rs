//! docsearch-text
//!
//! BM25 lexical retrieval over whole documents, backed by tantivy.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod index;
pub mod tantivy_utils;

pub use index::LexicalIndexer;

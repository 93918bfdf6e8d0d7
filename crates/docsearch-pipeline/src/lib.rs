//! docsearch-pipeline
//!
//! Document preprocessing: quality/language analysis, content-aware
//! chunking, duplicate and boilerplate removal, and aggregate chunk
//! quality metrics. Everything here is pure and synchronous; the index
//! engines consume its output.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod analyzer;
pub mod chunking;
pub mod cleaner;
pub mod quality;

pub use analyzer::{DocumentAnalysis, DocumentAnalyzer, DocumentType};
pub use chunking::{ChunkingConfig, ChunkingMethod, ChunkingStrategy, CodeLanguage};
pub use cleaner::{CleaningStats, ContentCleaner};
pub use quality::{QualityAnalyzer, QualityMetrics};

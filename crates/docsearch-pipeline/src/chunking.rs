//! Content-aware chunking. Markdown splits on headers first, code splits
//! on syntactic boundaries, everything else falls back to recursive
//! character splitting with overlap. Sizing adapts to the detected
//! language before the overlap is computed.

use crate::analyzer::DocumentAnalysis;
use docsearch_core::types::{Chunk, ChunkMeta, Document};

const RECURSIVE_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

const PYTHON_SEPARATORS: &[&str] =
    &["\nclass ", "\ndef ", "\n\tdef ", "\n\n", "\n", " ", ""];

const JAVASCRIPT_SEPARATORS: &[&str] = &[
    "\nfunction ", "\nconst ", "\nlet ", "\nvar ", "\nclass ", "\nif ", "\nfor ", "\nwhile ",
    "\nswitch ", "\ncase ", "\ndefault ", "\n\n", "\n", " ", "",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkingMethod {
    Recursive,
    Markdown,
    Code,
}

impl ChunkingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkingMethod::Recursive => "recursive",
            ChunkingMethod::Markdown => "markdown",
            ChunkingMethod::Code => "code",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeLanguage {
    Python,
    Javascript,
}

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub method: ChunkingMethod,
    /// Target chunk size in characters, after language adjustment.
    pub chunk_size: usize,
    /// Characters carried over between consecutive chunks.
    pub chunk_overlap: usize,
    /// Markdown heading levels that start a new section (1..=this).
    pub max_header_level: usize,
    pub code_language: Option<CodeLanguage>,
    pub detected_language: String,
    pub language_multiplier: f64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            method: ChunkingMethod::Recursive,
            chunk_size: 1000,
            chunk_overlap: 200,
            max_header_level: 3,
            code_language: None,
            detected_language: "en".to_string(),
            language_multiplier: 1.0,
        }
    }
}

impl ChunkingConfig {
    /// Pick method and sizing from the document's path and analysis.
    ///
    /// Markdown gets a larger base target than plain text; the detected
    /// language scales the base before the 20% overlap is derived, so
    /// denser scripts get proportionally larger chunks and overlap.
    pub fn smart(
        path_hint: Option<&str>,
        analysis: &DocumentAnalysis,
        target_min: usize,
        target_max: usize,
    ) -> Self {
        let ext = path_hint
            .and_then(|p| p.rsplit('.').next().filter(|e| *e != p))
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let (method, code_language, base_size) = match ext.as_str() {
            "md" | "markdown" => (ChunkingMethod::Markdown, None, target_max + 200),
            "py" => (ChunkingMethod::Code, Some(CodeLanguage::Python), target_max),
            "js" | "ts" => (ChunkingMethod::Code, Some(CodeLanguage::Javascript), target_max),
            _ => (ChunkingMethod::Recursive, None, target_max),
        };

        let language_multiplier = match analysis.language.as_str() {
            "ja" => 1.2,
            "zh" => 1.15,
            "ko" => 1.1,
            _ => 1.0,
        };

        let adjusted = ((base_size as f64 * language_multiplier) as usize).max(target_min);
        let overlap = (adjusted as f64 * 0.2) as usize;

        Self {
            method,
            chunk_size: adjusted,
            chunk_overlap: overlap,
            max_header_level: 3,
            code_language,
            detected_language: analysis.language.clone(),
            language_multiplier,
        }
    }
}

/// Applies the configured chunking method to documents.
#[derive(Debug, Default)]
pub struct ChunkingStrategy;

impl ChunkingStrategy {
    pub fn new() -> Self {
        Self
    }

    /// Chunk a batch of documents with one shared config. Empty input
    /// yields an empty chunk list.
    pub fn chunk_documents(&self, documents: &[Document], config: &ChunkingConfig) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| self.chunk_document(doc, 1.0, config))
            .collect()
    }

    /// Chunk one document, propagating its metadata and the given quality
    /// score onto every produced chunk. Ordinal indices restart at zero
    /// per document so chunk ids stay stable across rebuilds.
    pub fn chunk_document(
        &self,
        doc: &Document,
        quality_score: f64,
        config: &ChunkingConfig,
    ) -> Vec<Chunk> {
        let pieces = match config.method {
            ChunkingMethod::Markdown => self.split_markdown(&doc.text, config),
            ChunkingMethod::Code => self.split_code(&doc.text, config),
            ChunkingMethod::Recursive => {
                split_recursive(&doc.text, RECURSIVE_SEPARATORS, config)
            }
        };

        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| Chunk {
                content,
                meta: ChunkMeta {
                    title: doc.title.clone(),
                    url: doc.url.clone(),
                    path: doc.path.clone(),
                    quality_score,
                    language: config.detected_language.clone(),
                    language_multiplier: config.language_multiplier,
                    chunk_index,
                    chunking_method: config.method.as_str().to_string(),
                },
            })
            .collect()
    }

    /// Header split first (keeping the header text in each section), then
    /// recursive re-split of any section still over the target size.
    fn split_markdown(&self, text: &str, config: &ChunkingConfig) -> Vec<String> {
        split_markdown_sections(text, config.max_header_level)
            .iter()
            .flat_map(|section| split_recursive(section, RECURSIVE_SEPARATORS, config))
            .collect()
    }

    fn split_code(&self, text: &str, config: &ChunkingConfig) -> Vec<String> {
        let separators = match config.code_language {
            Some(CodeLanguage::Javascript) => JAVASCRIPT_SEPARATORS,
            // Generic/python-like hierarchy when no language is given.
            Some(CodeLanguage::Python) | None => PYTHON_SEPARATORS,
        };
        split_recursive(text, separators, config)
    }
}

/// Split on heading markers up to `max_level`, fence-aware so `#` inside
/// code blocks doesn't start a section. Sections keep their header line;
/// sections empty after trimming are dropped.
fn split_markdown_sections(text: &str, max_level: usize) -> Vec<String> {
    let mut sections: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_fence = false;

    for line in text.split('\n') {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        let hashes = line.chars().take_while(|c| *c == '#').count();
        let is_header =
            !in_fence && (1..=max_level).contains(&hashes) && line.chars().nth(hashes) == Some(' ');
        if is_header && !current.trim().is_empty() {
            sections.push(std::mem::take(&mut current));
        } else if is_header {
            current.clear();
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.trim().is_empty() {
        sections.push(current);
    }
    sections
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Recursive character splitting: attempt separators in order, picking
/// the coarsest one present in the text, split, then merge adjacent
/// pieces back up to the target size with a fixed character overlap.
/// Pieces still over the target recurse with the finer separators.
fn split_recursive(text: &str, separators: &[&str], config: &ChunkingConfig) -> Vec<String> {
    let mut separator = *separators.last().unwrap_or(&"");
    let mut remaining: &[&str] = &[];
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep) {
            separator = sep;
            remaining = &separators[i + 1..];
            break;
        }
    }

    let pieces: Vec<String> = if separator.is_empty() {
        text.chars().map(|c| c.to_string()).collect()
    } else {
        text.split(separator).map(str::to_string).collect()
    };

    let mut output = Vec::new();
    let mut mergeable: Vec<String> = Vec::new();
    for piece in pieces {
        if char_len(&piece) < config.chunk_size {
            mergeable.push(piece);
            continue;
        }
        if !mergeable.is_empty() {
            output.extend(merge_pieces(&mergeable, separator, config));
            mergeable.clear();
        }
        if remaining.is_empty() {
            output.push(piece);
        } else {
            output.extend(split_recursive(&piece, remaining, config));
        }
    }
    if !mergeable.is_empty() {
        output.extend(merge_pieces(&mergeable, separator, config));
    }
    output
}

/// Greedy window merge: grow a window of pieces until adding the next one
/// would exceed the target size, emit it, then drop pieces from the front
/// until the carried-over tail fits within the overlap budget.
fn merge_pieces(pieces: &[String], separator: &str, config: &ChunkingConfig) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut docs = Vec::new();
    let mut window: std::collections::VecDeque<&String> = std::collections::VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let len = char_len(piece);
        let join_cost = if window.is_empty() { 0 } else { sep_len };
        if total + len + join_cost > config.chunk_size && !window.is_empty() {
            if let Some(doc) = join_window(&window, separator) {
                docs.push(doc);
            }
            while total > config.chunk_overlap
                || (total + len + if window.is_empty() { 0 } else { sep_len }
                    > config.chunk_size
                    && total > 0)
            {
                let Some(front) = window.pop_front() else { break };
                total -= char_len(front) + if window.is_empty() { 0 } else { sep_len };
            }
        }
        total += len + if window.is_empty() { 0 } else { sep_len };
        window.push_back(piece);
    }
    if let Some(doc) = join_window(&window, separator) {
        docs.push(doc);
    }
    docs
}

fn join_window(
    window: &std::collections::VecDeque<&String>,
    separator: &str,
) -> Option<String> {
    let joined = window
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env
//! vars, the same layering the rest of the tooling expects. A typed
//! [`SearchConfig`] view carries the options the indexing core recognizes.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Component, Path, PathBuf};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }
}

/// Options recognized by the indexing and retrieval core. Every field has
/// a default so the service starts with an empty `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of archive records ingested per build. 0 = no limit.
    pub archive_subset_size: usize,
    /// Target chunk size bounds in characters.
    pub chunk_target_min: usize,
    pub chunk_target_max: usize,
    /// Chunks shorter than this are discarded by the cleaner.
    pub min_chunk_size: usize,
    /// Inclusive similarity threshold for near-duplicate removal.
    pub near_duplicate_threshold: f64,
    /// A line repeated at least this often counts as boilerplate.
    pub boilerplate_min_occurrences: usize,
    /// RRF rank constant.
    pub rrf_k: usize,
    /// File extensions eligible for the dynamic corpus.
    pub file_extensions: Vec<String>,
    /// Directory scanned for the dynamic corpus; unset leaves the
    /// files corpus unconfigured.
    pub files_dir: Option<String>,
    /// Root for persisted index state.
    pub data_dir: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            archive_subset_size: 1_000_000,
            chunk_target_min: 500,
            chunk_target_max: 1000,
            min_chunk_size: 100,
            near_duplicate_threshold: 0.95,
            boilerplate_min_occurrences: 3,
            rrf_k: 60,
            file_extensions: vec!["md".to_string(), "txt".to_string(), "py".to_string()],
            files_dir: None,
            data_dir: "data".to_string(),
        }
    }
}

impl SearchConfig {
    pub fn from_config(cfg: &Config) -> Self {
        let d = Self::default();
        Self {
            archive_subset_size: cfg
                .get("search.archive_subset_size")
                .unwrap_or(d.archive_subset_size),
            chunk_target_min: cfg.get("search.chunk_target_min").unwrap_or(d.chunk_target_min),
            chunk_target_max: cfg.get("search.chunk_target_max").unwrap_or(d.chunk_target_max),
            min_chunk_size: cfg.get("search.min_chunk_size").unwrap_or(d.min_chunk_size),
            near_duplicate_threshold: cfg
                .get("search.near_duplicate_threshold")
                .unwrap_or(d.near_duplicate_threshold),
            boilerplate_min_occurrences: cfg
                .get("search.boilerplate_min_occurrences")
                .unwrap_or(d.boilerplate_min_occurrences),
            rrf_k: cfg.get("search.rrf_k").unwrap_or(d.rrf_k),
            file_extensions: cfg.get("search.file_extensions").unwrap_or(d.file_extensions),
            files_dir: cfg.get("search.files_dir").ok(),
            data_dir: cfg.get("data.dir").unwrap_or(d.data_dir),
        }
    }

    pub fn lancedb_dir(&self) -> PathBuf {
        Path::new(&self.data_dir).join("lancedb")
    }

    pub fn archive_tantivy_dir(&self) -> PathBuf {
        Path::new(&self.data_dir).join("archive").join("tantivy")
    }

    pub fn archive_docs_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("archive").join("documents.json")
    }

    pub fn files_tantivy_dir(&self, source_dir: &Path) -> PathBuf {
        Path::new(&self.data_dir)
            .join("files")
            .join(format!("tantivy_{}", path_fingerprint(source_dir)))
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}

/// Short stable fingerprint of a source directory. Trailing separators,
/// relative vs. absolute spellings and `.`/`..` segments all map to the
/// same value, so two spellings of one directory never get two vector
/// tables and two distinct directories never share one.
pub fn path_fingerprint(path: &Path) -> String {
    let normalized = normalize_path(path);
    let digest = blake3::hash(normalized.to_string_lossy().as_bytes());
    digest.to_hex()[..16].to_string()
}

fn normalize_path(path: &Path) -> PathBuf {
    // Prefer the filesystem's view when the directory exists; fall back
    // to lexical normalization for paths that don't resolve.
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().unwrap_or_default().join(path)
    };
    let mut out = PathBuf::new();
    for comp in absolute.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_ignores_trailing_separator_and_relative_form() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let plain = tmp.path().to_path_buf();
        let trailing = PathBuf::from(format!("{}/", plain.display()));
        let absolute = plain.canonicalize().expect("canonicalize");

        let a = path_fingerprint(&plain);
        let b = path_fingerprint(&trailing);
        let c = path_fingerprint(&absolute);
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn fingerprint_separates_distinct_directories() {
        let tmp1 = tempfile::TempDir::new().expect("tempdir");
        let tmp2 = tempfile::TempDir::new().expect("tempdir");
        assert_ne!(path_fingerprint(tmp1.path()), path_fingerprint(tmp2.path()));
    }

    #[test]
    fn defaults_cover_all_recognized_options() {
        let cfg = SearchConfig::default();
        assert_eq!(cfg.min_chunk_size, 100);
        assert_eq!(cfg.rrf_k, 60);
        assert!((cfg.near_duplicate_threshold - 0.95).abs() < f64::EPSILON);
        assert_eq!(cfg.file_extensions, vec!["md", "txt", "py"]);
    }
}

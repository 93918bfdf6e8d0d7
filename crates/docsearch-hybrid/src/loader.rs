//! Document loading for both corpora: recursive file-tree scans and
//! the archive JSONL dump.

use anyhow::Result;
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

use docsearch_core::types::Document;

/// Scan a directory tree for files with one of the given extensions.
/// Empty files are skipped; unreadable files are logged and skipped.
/// Urls are `file://` + the path relative to `dir`, so ids stay stable
/// when the tree is moved.
pub fn load_local_documents(dir: &Path, extensions: &[String]) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        return Err(docsearch_core::error::Error::InvalidConfig(format!(
            "files source is not a directory: {}",
            dir.display()
        ))
        .into());
    }
    let mut documents = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            continue;
        }
        let text = match read_file_content(path) {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        if text.trim().is_empty() {
            continue;
        }
        let relative = path.strip_prefix(dir).unwrap_or(path);
        documents.push(Document {
            url: format!("file://{}", relative.display()),
            title: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_string()),
            text,
            path: Some(path.to_string_lossy().into_owned()),
        });
    }
    info!(dir = %dir.display(), files = documents.len(), "loaded local documents");
    Ok(documents)
}

/// UTF-8 when valid, lossy otherwise. Local notes are occasionally in
/// legacy encodings and should not abort a whole build.
fn read_file_content(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

#[derive(Deserialize)]
struct ArchiveRecord {
    title: String,
    url: String,
    text: String,
}

/// Read the archive corpus from a JSONL dump of `{title, url, text}`
/// records. `limit` caps the number of records taken; 0 means no limit.
/// Malformed lines are logged and skipped.
pub fn load_archive_documents(path: &Path, limit: usize) -> Result<Vec<Document>> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let mut documents = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        if limit > 0 && documents.len() >= limit {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ArchiveRecord>(&line) {
            Ok(record) => documents.push(Document {
                url: record.url,
                title: record.title,
                text: record.text,
                path: None,
            }),
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "skipping malformed archive record");
            }
        }
    }
    info!(path = %path.display(), records = documents.len(), "loaded archive documents");
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scans_only_configured_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.md"), "# Notes\nsome markdown notes").unwrap();
        fs::write(dir.path().join("data.csv"), "a,b,c").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/deep.txt"), "nested text file").unwrap();

        let docs =
            load_local_documents(dir.path(), &["md".to_string(), "txt".to_string()]).unwrap();
        assert_eq!(docs.len(), 2);
        let urls: Vec<&str> = docs.iter().map(|d| d.url.as_str()).collect();
        assert!(urls.contains(&"file://notes.md"));
        assert!(urls.contains(&"file://sub/deep.txt"));
    }

    #[test]
    fn skips_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("empty.md"), "   \n\t\n").unwrap();
        fs::write(dir.path().join("full.md"), "real content").unwrap();
        let docs = load_local_documents(dir.path(), &["md".to_string()]).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "full.md");
    }

    #[test]
    fn title_is_file_name_and_path_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("recipe.txt"), "sourdough starter instructions").unwrap();
        let docs = load_local_documents(dir.path(), &["txt".to_string()]).unwrap();
        assert_eq!(docs[0].title, "recipe.txt");
        assert!(docs[0].path.as_deref().unwrap().ends_with("recipe.txt"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-tree");
        assert!(load_local_documents(&missing, &["md".to_string()]).is_err());
    }

    #[test]
    fn lossy_decodes_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("legacy.txt"), b"caf\xe9 notes").unwrap();
        let docs = load_local_documents(dir.path(), &["txt".to_string()]).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].text.contains("notes"));
    }

    #[test]
    fn archive_jsonl_honors_limit_and_skips_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.jsonl");
        let lines = [
            r#"{"title":"One","url":"https://example.org/1","text":"first article"}"#,
            "not json at all",
            r#"{"title":"Two","url":"https://example.org/2","text":"second article"}"#,
            r#"{"title":"Three","url":"https://example.org/3","text":"third article"}"#,
        ];
        fs::write(&path, lines.join("\n")).unwrap();

        let docs = load_archive_documents(&path, 2).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].title, "One");
        assert_eq!(docs[1].title, "Two");

        let all = load_archive_documents(&path, 0).unwrap();
        assert_eq!(all.len(), 3);
    }
}

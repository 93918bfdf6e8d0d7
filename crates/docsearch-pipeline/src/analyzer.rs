//! Document analysis: quality scoring, language detection, structure
//! metrics and issue detection. Runs before chunking and steers the
//! chunking configuration.

use serde::{Deserialize, Serialize};
use whatlang::Lang;

/// Document type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Markdown,
    CodePython,
    CodeJavascript,
    CodeTypescript,
    PlainText,
}

impl DocumentType {
    pub fn is_code(&self) -> bool {
        matches!(
            self,
            DocumentType::CodePython | DocumentType::CodeJavascript | DocumentType::CodeTypescript
        )
    }
}

/// Results of document analysis. Derived, read-only; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    /// 0-1 scale.
    pub quality_score: f64,
    /// ISO language code (e.g., "en", "ja"), "unknown" on detection failure.
    pub language: String,
    /// 0-1 heuristic scaled by cleaned-text length.
    pub language_confidence: f64,
    pub document_type: DocumentType,
    pub char_count: usize,
    pub word_count: usize,
    pub line_count: usize,
    pub avg_line_length: f64,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Analyzes documents for quality, language, structure, and potential issues.
#[derive(Debug, Default)]
pub struct DocumentAnalyzer;

impl DocumentAnalyzer {
    pub const MIN_CONTENT_LENGTH: usize = 50;
    pub const MAX_AVG_LINE_LENGTH: usize = 200;
    /// Cleaned-text length at which language confidence saturates.
    const LANG_CONFIDENCE_REF_LEN: usize = 500;

    pub fn new() -> Self {
        Self
    }

    /// Analyze `text`, using `path_hint` (a file path or URL) for type
    /// detection when available. Pure function of its inputs.
    pub fn analyze(&self, text: &str, path_hint: Option<&str>) -> DocumentAnalysis {
        let char_count = text.chars().count();
        let line_count = text.split('\n').count();
        let word_count = text.split_whitespace().count();
        let avg_line_length = if line_count > 0 {
            char_count as f64 / line_count as f64
        } else {
            0.0
        };

        let document_type = detect_document_type(text, path_hint);
        let (language, language_confidence) = detect_language(text);
        let issues = detect_issues(text, char_count, word_count, avg_line_length);
        let quality_score =
            quality_score(char_count, word_count, avg_line_length, issues.len());
        let recommendations =
            recommendations(quality_score, &issues, document_type, &language);

        DocumentAnalysis {
            quality_score,
            language,
            language_confidence,
            document_type,
            char_count,
            word_count,
            line_count,
            avg_line_length,
            issues,
            recommendations,
        }
    }
}

/// Extension hint wins; content patterns are checked in a fixed priority
/// order: markdown > python > javascript > plain text.
fn detect_document_type(text: &str, path_hint: Option<&str>) -> DocumentType {
    if let Some(path) = path_hint {
        if let Some(ext) = path.rsplit('.').next().filter(|e| *e != path) {
            match ext.to_ascii_lowercase().as_str() {
                "md" | "markdown" => return DocumentType::Markdown,
                "py" => return DocumentType::CodePython,
                "js" => return DocumentType::CodeJavascript,
                "ts" => return DocumentType::CodeTypescript,
                _ => {}
            }
        }
    }

    if text.lines().any(is_markdown_heading) {
        DocumentType::Markdown
    } else if text.lines().any(is_python_definition) {
        DocumentType::CodePython
    } else if text.lines().any(is_javascript_definition) {
        DocumentType::CodeJavascript
    } else {
        DocumentType::PlainText
    }
}

fn is_markdown_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    (1..=6).contains(&hashes) && line.chars().nth(hashes) == Some(' ')
}

fn is_python_definition(line: &str) -> bool {
    let trimmed = line.trim_start();
    (trimmed.starts_with("def ") && trimmed.contains('('))
        || (trimmed.starts_with("class ") && (trimmed.contains(':') || trimmed.contains('(')))
}

fn is_javascript_definition(line: &str) -> bool {
    let trimmed = line.trim_start();
    (trimmed.starts_with("function ") && trimmed.contains('('))
        || (trimmed.starts_with("const ") && trimmed.contains('='))
}

/// Strip fenced code blocks, URLs and inline code spans before language
/// identification so code-heavy documents don't skew toward non-prose
/// tokens, then detect. Failure yields ("unknown", 0.0).
fn detect_language(text: &str) -> (String, f64) {
    let clean = strip_non_prose(text);
    let clean_len = clean.chars().count();
    match whatlang::detect(&clean) {
        Some(info) => {
            let confidence = (clean_len as f64
                / DocumentAnalyzer::LANG_CONFIDENCE_REF_LEN as f64)
                .min(1.0);
            (iso_code(info.lang()).to_string(), confidence)
        }
        None => ("unknown".to_string(), 0.0),
    }
}

fn strip_non_prose(text: &str) -> String {
    // Fenced blocks: keep the segments outside ``` pairs. An unterminated
    // fence counts as code through end of text.
    let outside_fences: String = text
        .split("```")
        .enumerate()
        .filter(|(i, _)| i % 2 == 0)
        .map(|(_, seg)| seg)
        .collect::<Vec<_>>()
        .join(" ");

    // Inline code spans use the same alternation trick on single backticks.
    let without_inline: String = outside_fences
        .split('`')
        .enumerate()
        .filter(|(i, _)| i % 2 == 0)
        .map(|(_, seg)| seg)
        .collect::<Vec<_>>()
        .join(" ");

    // Drop URL tokens line by line, preserving line structure.
    without_inline
        .lines()
        .map(|line| {
            line.split(' ')
                .filter(|tok| !tok.starts_with("http://") && !tok.starts_with("https://"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// whatlang reports ISO 639-3; the sizing policy keys off the two-letter
/// codes the rest of the system uses.
fn iso_code(lang: Lang) -> &'static str {
    match lang {
        Lang::Eng => "en",
        Lang::Jpn => "ja",
        Lang::Cmn => "zh",
        Lang::Kor => "ko",
        Lang::Fra => "fr",
        Lang::Deu => "de",
        Lang::Spa => "es",
        Lang::Rus => "ru",
        Lang::Por => "pt",
        Lang::Ita => "it",
        other => other.code(),
    }
}

/// Fixed rule list; every applicable issue is reported.
fn detect_issues(
    text: &str,
    char_count: usize,
    word_count: usize,
    avg_line_length: f64,
) -> Vec<String> {
    let mut issues = Vec::new();

    if char_count < DocumentAnalyzer::MIN_CONTENT_LENGTH {
        issues.push(format!(
            "Content too short ({} chars, minimum {})",
            char_count,
            DocumentAnalyzer::MIN_CONTENT_LENGTH
        ));
    }

    if avg_line_length > DocumentAnalyzer::MAX_AVG_LINE_LENGTH as f64 {
        issues.push(format!(
            "Average line length too long ({avg_line_length:.0} chars)"
        ));
    }

    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() > 10 {
        let unique: std::collections::HashSet<&&str> = lines.iter().collect();
        if (unique.len() as f64 / lines.len() as f64) < 0.5 {
            issues.push("High line repetition detected".to_string());
        }
    }

    if char_count > 0 {
        let whitespace = text.chars().filter(|c| c.is_whitespace()).count();
        let ratio = whitespace as f64 / char_count as f64;
        if ratio > 0.5 {
            issues.push(format!("Excessive whitespace ({:.1}%)", ratio * 100.0));
        }
    }

    if word_count < 10 && char_count > DocumentAnalyzer::MIN_CONTENT_LENGTH {
        issues.push("Very low word count (possible non-textual content)".to_string());
    }

    issues
}

/// Multiplicative scoring starting from 1.0, clamped to [0, 1].
fn quality_score(
    char_count: usize,
    word_count: usize,
    avg_line_length: f64,
    issue_count: usize,
) -> f64 {
    let mut score = 1.0_f64;

    if char_count < DocumentAnalyzer::MIN_CONTENT_LENGTH {
        score *= char_count as f64 / DocumentAnalyzer::MIN_CONTENT_LENGTH as f64;
    }

    let max_avg = DocumentAnalyzer::MAX_AVG_LINE_LENGTH as f64;
    if avg_line_length > max_avg {
        let penalty = (avg_line_length - max_avg) / max_avg;
        score *= (1.0 - penalty).max(0.5);
    }

    score *= (1.0 - 0.1 * issue_count as f64).max(0.3);

    if char_count > 0 {
        let density = word_count as f64 / char_count as f64;
        if (0.15..=0.25).contains(&density) {
            score *= 1.1;
        }
    }

    score.clamp(0.0, 1.0)
}

fn recommendations(
    quality_score: f64,
    issues: &[String],
    doc_type: DocumentType,
    language: &str,
) -> Vec<String> {
    let mut recs = Vec::new();
    let issue_text = issues.join("; ");

    if quality_score < 0.5 {
        recs.push("Consider improving document quality before indexing".to_string());
    }
    if issue_text.contains("Content too short") {
        recs.push("Add more content for better search results".to_string());
    }
    if issue_text.contains("Average line length too long") {
        recs.push("Break long lines for better readability".to_string());
    }
    if issue_text.contains("High line repetition detected") {
        recs.push("Remove repetitive content".to_string());
    }

    if doc_type == DocumentType::Markdown && quality_score > 0.7 {
        recs.push("Use Markdown chunking strategy for best results".to_string());
    } else if doc_type.is_code() {
        recs.push("Use code-aware chunking strategy".to_string());
    }

    if language == "ja" {
        recs.push("Japanese detected: chunk size will be adjusted (1.2x)".to_string());
    } else if language == "unknown" {
        recs.push("Language detection failed: using default chunking".to_string());
    }

    if recs.is_empty() {
        recs.push("Document quality is good, ready for indexing".to_string());
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_TEXT: &str = "The quick brown fox jumps over the lazy dog.
Rust is a systems programming language focused on safety and speed.
It accomplishes these goals by being memory safe without using garbage collection.
Search engines rank documents by combining lexical and semantic signals.";

    #[test]
    fn extension_hint_beats_content() {
        let analyzer = DocumentAnalyzer::new();
        let analysis = analyzer.analyze("# Heading\nbody", Some("script.py"));
        assert_eq!(analysis.document_type, DocumentType::CodePython);
    }

    #[test]
    fn content_detection_priority() {
        let analyzer = DocumentAnalyzer::new();
        // Markdown heading wins even when code keywords appear later.
        let both = "# Title\n\ndef handler(x):\n    return x\n";
        assert_eq!(
            analyzer.analyze(both, None).document_type,
            DocumentType::Markdown
        );
        let py = "def handler(x):\n    return x\n";
        assert_eq!(
            analyzer.analyze(py, None).document_type,
            DocumentType::CodePython
        );
        let js = "function handler(x) {\n    return x;\n}\n";
        assert_eq!(
            analyzer.analyze(js, None).document_type,
            DocumentType::CodeJavascript
        );
        assert_eq!(
            analyzer.analyze(GOOD_TEXT, None).document_type,
            DocumentType::PlainText
        );
    }

    #[test]
    fn short_content_is_flagged_and_penalized() {
        let analyzer = DocumentAnalyzer::new();
        let analysis = analyzer.analyze("tiny", None);
        assert!(analysis
            .issues
            .iter()
            .any(|i| i.contains("Content too short")));
        assert!(analysis.quality_score < 0.2);
    }

    #[test]
    fn repeated_lines_are_flagged() {
        let analyzer = DocumentAnalyzer::new();
        let text = "same line of content here\n".repeat(20);
        let analysis = analyzer.analyze(&text, None);
        assert!(analysis
            .issues
            .iter()
            .any(|i| i.contains("High line repetition")));
    }

    #[test]
    fn good_document_scores_high_with_default_recommendation() {
        let analyzer = DocumentAnalyzer::new();
        let analysis = analyzer.analyze(GOOD_TEXT, Some("notes.txt"));
        assert!(analysis.issues.is_empty(), "issues: {:?}", analysis.issues);
        assert!(analysis.quality_score > 0.9);
        assert_eq!(
            analysis.recommendations,
            vec!["Document quality is good, ready for indexing".to_string()]
        );
    }

    #[test]
    fn language_detection_failure_yields_unknown() {
        let analyzer = DocumentAnalyzer::new();
        let analysis = analyzer.analyze("", None);
        assert_eq!(analysis.language, "unknown");
        assert_eq!(analysis.language_confidence, 0.0);
    }

    #[test]
    fn language_confidence_scales_with_length() {
        let analyzer = DocumentAnalyzer::new();
        let long = GOOD_TEXT.repeat(5);
        let analysis = analyzer.analyze(&long, None);
        assert_eq!(analysis.language, "en");
        assert!((analysis.language_confidence - 1.0).abs() < f64::EPSILON);

        let short = analyzer.analyze("The weather is nice today in the park.", None);
        if short.language != "unknown" {
            assert!(short.language_confidence < 1.0);
        }
    }

    #[test]
    fn code_blocks_do_not_skew_language() {
        let analyzer = DocumentAnalyzer::new();
        let text = format!(
            "{}\n```\nfn xqzt() {{ let zzz = 0xdeadbeef; }}\n```\nSee https://example.com/page for details.\n{}",
            GOOD_TEXT, GOOD_TEXT
        );
        let analysis = analyzer.analyze(&text, None);
        assert_eq!(analysis.language, "en");
    }

    #[test]
    fn all_applicable_issues_reported() {
        let analyzer = DocumentAnalyzer::new();
        // 60 chars of mostly whitespace, few words: short is not flagged
        // (>50) but whitespace and low word count both are.
        let text = format!("a{}b{}c", " ".repeat(30), " ".repeat(30));
        let analysis = analyzer.analyze(&text, None);
        assert!(analysis
            .issues
            .iter()
            .any(|i| i.contains("Excessive whitespace")));
        assert!(analysis
            .issues
            .iter()
            .any(|i| i.contains("Very low word count")));
    }
}

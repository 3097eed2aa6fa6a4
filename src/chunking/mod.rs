//! Markdown policy-document chunking.
//!
//! Splits a policy document into header-scoped, size-bounded chunks that
//! carry their heading hierarchy as metadata. Only heading levels 2, 3
//! and 6 are recognized as structure boundaries; a table-of-contents
//! block and inline anchor tags are stripped before splitting because
//! they harm retrieval quality.
//!
//! Within a heading section, text is split into overlapping windows by a
//! preference order of separators (heading markers, bold markers,
//! whitespace), falling back to grapheme-bounded hard cuts for
//! unbreakable runs. No chunk ever spans two level-2 sections, and chunk
//! indices restart at zero per section — both properties matter for
//! trustworthy `path` citations in answers.

use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1300;
/// Default overlap between consecutive windows in characters.
pub const DEFAULT_OVERLAP: usize = 200;

/// Separator preference order for intra-section splitting.
const SECTION_SEPARATORS: [&str; 5] = ["\n## ", "\n### ", "\n###### ", "\n**", " "];

#[allow(clippy::unwrap_used)]
static CONTENTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)######\s+CONTENTS").unwrap());

#[allow(clippy::unwrap_used)]
static CONTENTS_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n##\s").unwrap());

#[allow(clippy::unwrap_used)]
static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</?a[^>]*>").unwrap());

/// Heading hierarchy a chunk belongs to (levels 2, 3 and 6).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionPath {
    /// Level-2 heading text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Level-3 heading text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
    /// Level-6 heading text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsubsection: Option<String>,
}

impl SectionPath {
    /// Joins the present heading levels into a `"A > B > C"` path string.
    ///
    /// Returns `None` when no heading applies (text before the first
    /// recognized heading).
    #[must_use]
    pub fn path(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.section, &self.subsection, &self.subsubsection]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" > "))
        }
    }
}

/// A bounded span of policy text tagged with its heading path.
///
/// Immutable after index construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyChunk {
    /// Chunk text.
    pub text: String,
    /// Heading hierarchy the chunk came from.
    #[serde(flatten)]
    pub meta: SectionPath,
    /// Zero-based position within the heading section.
    pub chunk_index: usize,
}

/// Chunking parameters.
#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    /// Window size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive windows in characters.
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Removes obvious noise that harms retrieval quality.
///
/// Strips a `###### CONTENTS` block (up to, but excluding, the next
/// level-2 heading) and inline `<a>` anchor tags, then trims.
#[must_use]
pub fn clean_markdown(text: &str) -> String {
    let mut cleaned = text.to_string();

    // A CONTENTS block with no following level-2 heading is left alone,
    // matching the lookahead in the original pattern.
    loop {
        let Some((start, end)) = CONTENTS_RE.find(&cleaned).map(|m| (m.start(), m.end())) else {
            break;
        };
        let Some(stop) = CONTENTS_END_RE.find(&cleaned[end..]).map(|m| m.start()) else {
            break;
        };
        cleaned.replace_range(start..end + stop, "");
    }

    let cleaned = ANCHOR_RE.replace_all(&cleaned, "");
    cleaned.trim().to_string()
}

/// A heading-delimited section of the document.
#[derive(Debug, Clone)]
struct HeaderSection {
    path: SectionPath,
    body: String,
}

/// Splits text into sections on level-2/3/6 heading lines.
///
/// Heading lines are consumed as metadata and excluded from section
/// bodies. A level-2 heading resets the level-3 and level-6 context; a
/// level-3 heading resets level-6. Sections with empty bodies are
/// dropped.
fn split_by_headings(text: &str) -> Vec<HeaderSection> {
    let mut sections: Vec<HeaderSection> = Vec::new();
    let mut path = SectionPath::default();
    let mut lines: Vec<&str> = Vec::new();

    fn flush(sections: &mut Vec<HeaderSection>, path: &SectionPath, lines: &mut Vec<&str>) {
        let body = lines.join("\n").trim().to_string();
        lines.clear();
        if !body.is_empty() {
            sections.push(HeaderSection {
                path: path.clone(),
                body,
            });
        }
    }

    for line in text.lines() {
        if let Some(title) = line.strip_prefix("###### ") {
            flush(&mut sections, &path, &mut lines);
            path.subsubsection = Some(title.trim().to_string());
        } else if let Some(title) = line.strip_prefix("### ") {
            flush(&mut sections, &path, &mut lines);
            path.subsection = Some(title.trim().to_string());
            path.subsubsection = None;
        } else if let Some(title) = line.strip_prefix("## ") {
            flush(&mut sections, &path, &mut lines);
            path.section = Some(title.trim().to_string());
            path.subsection = None;
            path.subsubsection = None;
        } else {
            lines.push(line);
        }
    }
    flush(&mut sections, &path, &mut lines);

    sections
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Splits on `sep`, keeping the separator attached to the start of the
/// following piece so that re-joining pieces reproduces the input.
fn split_keep_separator<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    let mut bounds = vec![0];
    for (i, _) in text.match_indices(sep) {
        if i != 0 {
            bounds.push(i);
        }
    }
    bounds.push(text.len());
    bounds.dedup();
    bounds
        .windows(2)
        .map(|w| &text[w[0]..w[1]])
        .filter(|p| !p.is_empty())
        .collect()
}

/// Greedily merges small pieces into windows of at most `chunk_size`
/// characters, carrying up to `overlap` characters of trailing pieces
/// into the next window.
fn merge_pieces(pieces: &[String], chunk_size: usize, overlap: usize) -> Vec<String> {
    fn emit(current: &VecDeque<(&str, usize)>, chunks: &mut Vec<String>) {
        let joined: String = current.iter().map(|(p, _)| *p).collect();
        let trimmed = joined.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
    }

    let mut chunks = Vec::new();
    let mut current: VecDeque<(&str, usize)> = VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let plen = char_len(piece);
        if total + plen > chunk_size && !current.is_empty() {
            emit(&current, &mut chunks);
            // Drop leading pieces until the retained tail fits the
            // overlap budget and the incoming piece fits the window.
            while total > overlap || (total + plen > chunk_size && total > 0) {
                if let Some((_, dropped)) = current.pop_front() {
                    total -= dropped;
                } else {
                    break;
                }
            }
        }
        current.push_back((piece.as_str(), plen));
        total += plen;
    }
    if !current.is_empty() {
        emit(&current, &mut chunks);
    }

    chunks
}

/// Hard-cuts an unbreakable run into overlapping windows on grapheme
/// boundaries.
fn window_graphemes(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut bounds: Vec<usize> = text.grapheme_indices(true).map(|(i, _)| i).collect();
    bounds.push(text.len());
    let count = bounds.len() - 1;

    let mut out = Vec::new();
    let mut start = 0usize;
    while start < count {
        let end = (start + chunk_size).min(count);
        let window = text[bounds[start]..bounds[end]].trim();
        if !window.is_empty() {
            out.push(window.to_string());
        }
        if end == count {
            break;
        }
        start += step;
    }
    out
}

/// Recursively splits `text` by the first applicable separator, merging
/// small pieces and descending to finer separators for oversized ones.
fn split_recursive(
    text: &str,
    separators: &[&str],
    chunk_size: usize,
    overlap: usize,
) -> Vec<String> {
    let chosen = separators
        .iter()
        .enumerate()
        .find(|(_, sep)| text.contains(*sep));
    let Some((i, sep)) = chosen else {
        return window_graphemes(text, chunk_size, overlap);
    };
    let remaining = &separators[i + 1..];

    let mut final_chunks = Vec::new();
    let mut good: Vec<String> = Vec::new();

    for piece in split_keep_separator(text, sep) {
        if char_len(piece) < chunk_size {
            good.push(piece.to_string());
        } else {
            if !good.is_empty() {
                final_chunks.extend(merge_pieces(&good, chunk_size, overlap));
                good.clear();
            }
            if remaining.is_empty() {
                final_chunks.extend(window_graphemes(piece, chunk_size, overlap));
            } else {
                final_chunks.extend(split_recursive(piece, remaining, chunk_size, overlap));
            }
        }
    }
    if !good.is_empty() {
        final_chunks.extend(merge_pieces(&good, chunk_size, overlap));
    }

    final_chunks
}

/// Chunks a markdown policy document.
///
/// Cleans the text, splits on level-2/3/6 headings, then windows each
/// section body. Chunk indices restart at zero per heading section.
/// Deterministic: identical input yields identical chunk boundaries and
/// metadata.
#[must_use]
pub fn chunk_markdown(text: &str, config: &ChunkConfig) -> Vec<PolicyChunk> {
    let cleaned = clean_markdown(text);
    let mut chunks = Vec::new();

    for section in split_by_headings(&cleaned) {
        let pieces = split_recursive(
            &section.body,
            &SECTION_SEPARATORS,
            config.chunk_size,
            config.chunk_overlap,
        );
        for (chunk_index, text) in pieces.into_iter().enumerate() {
            chunks.push(PolicyChunk {
                text,
                meta: section.path.clone(),
                chunk_index,
            });
        }
    }

    chunks
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn small_config() -> ChunkConfig {
        ChunkConfig {
            chunk_size: 60,
            chunk_overlap: 15,
        }
    }

    #[test]
    fn test_clean_markdown_strips_contents_block() {
        let text = "###### CONTENTS\n- [Refunds](#refunds)\n- [Delays](#delays)\n\n## Refunds\nBody text.";
        let cleaned = clean_markdown(text);
        assert!(!cleaned.contains("[Refunds](#refunds)"));
        assert!(cleaned.starts_with("## Refunds"));
        assert!(cleaned.contains("Body text."));
    }

    #[test]
    fn test_clean_markdown_contents_without_following_section() {
        // No level-2 heading after the block: nothing is stripped.
        let text = "###### CONTENTS\n- item one\n- item two";
        let cleaned = clean_markdown(text);
        assert!(cleaned.contains("item one"));
    }

    #[test]
    fn test_clean_markdown_strips_anchor_tags() {
        let text = "## Refunds\n<a id=\"refunds\"></a>Refund within 7 days.";
        let cleaned = clean_markdown(text);
        assert!(!cleaned.contains("<a"));
        assert!(!cleaned.contains("</a>"));
        assert!(cleaned.contains("Refund within 7 days."));
    }

    #[test]
    fn test_sections_never_mix() {
        let text = "## Alpha\nalpha-only content here\n\n## Bravo\nbravo-only content here\n\n## Charlie\ncharlie-only content here";
        let chunks = chunk_markdown(text, &ChunkConfig::default());
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            let markers = ["alpha-only", "bravo-only", "charlie-only"]
                .iter()
                .filter(|m| chunk.text.contains(*m))
                .count();
            assert_eq!(markers, 1, "chunk mixes sections: {}", chunk.text);
        }
        assert_eq!(chunks[0].meta.path().as_deref(), Some("Alpha"));
        assert_eq!(chunks[2].meta.path().as_deref(), Some("Charlie"));
    }

    #[test]
    fn test_chunk_indices_restart_per_section() {
        let word = "word ".repeat(40); // 200 chars, splits under the small config
        let text = format!("## One\n{word}\n## Two\n{word}");
        let chunks = chunk_markdown(&text, &small_config());

        let one_indices: Vec<usize> = chunks
            .iter()
            .filter(|c| c.meta.section.as_deref() == Some("One"))
            .map(|c| c.chunk_index)
            .collect();
        let two_indices: Vec<usize> = chunks
            .iter()
            .filter(|c| c.meta.section.as_deref() == Some("Two"))
            .map(|c| c.chunk_index)
            .collect();

        assert!(one_indices.len() > 1);
        assert_eq!(one_indices[0], 0);
        assert_eq!(two_indices[0], 0);
        for (i, idx) in one_indices.iter().enumerate() {
            assert_eq!(*idx, i);
        }
    }

    #[test]
    fn test_heading_hierarchy() {
        let text = "## Tarmac Delays\nintro text\n### Domestic\ndomestic rules\n###### Exceptions\nexception details\n## Refunds\nrefund text";
        let chunks = chunk_markdown(text, &ChunkConfig::default());

        let paths: Vec<Option<String>> = chunks.iter().map(|c| c.meta.path()).collect();
        assert!(paths.contains(&Some("Tarmac Delays".to_string())));
        assert!(paths.contains(&Some("Tarmac Delays > Domestic".to_string())));
        assert!(paths.contains(&Some("Tarmac Delays > Domestic > Exceptions".to_string())));
        // Level-2 heading resets the deeper levels.
        assert!(paths.contains(&Some("Refunds".to_string())));
    }

    #[test]
    fn test_preamble_has_no_path() {
        let text = "Preamble before any heading.\n\n## First\nsection body";
        let chunks = chunk_markdown(text, &ChunkConfig::default());
        assert_eq!(chunks[0].meta.path(), None);
        assert!(chunks[0].text.contains("Preamble"));
    }

    #[test]
    fn test_windows_are_bounded_and_overlap() {
        let body: String = (0..120).map(|i| format!("tok{i} ")).collect();
        let text = format!("## Long\n{body}");
        let config = small_config();
        let chunks = chunk_markdown(&text, &config);

        assert!(chunks.len() > 2);
        for chunk in &chunks {
            assert!(
                chunk.text.chars().count() <= config.chunk_size,
                "oversized chunk: {}",
                chunk.text
            );
        }
        // Consecutive windows share carried-over tokens.
        let first_tail: Vec<&str> = chunks[0].text.split_whitespace().rev().take(2).collect();
        assert!(
            first_tail.iter().any(|t| chunks[1].text.contains(t)),
            "no overlap between {:?} and {:?}",
            chunks[0].text,
            chunks[1].text
        );
    }

    #[test]
    fn test_unbreakable_run_hard_cut() {
        let run = "x".repeat(200);
        let chunks = chunk_markdown(&format!("## Run\n{run}"), &small_config());
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 60);
        }
    }

    #[test]
    fn test_determinism() {
        let text = "## A\n<a id=\"a\"></a>some body text here\n### B\nmore body ".repeat(5);
        let first = chunk_markdown(&text, &ChunkConfig::default());
        let second = chunk_markdown(&text, &ChunkConfig::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_path_join_format() {
        let path = SectionPath {
            section: Some("A".to_string()),
            subsection: Some("B".to_string()),
            subsubsection: Some("C".to_string()),
        };
        assert_eq!(path.path().as_deref(), Some("A > B > C"));

        let partial = SectionPath {
            section: Some("A".to_string()),
            subsection: None,
            subsubsection: Some("C".to_string()),
        };
        assert_eq!(partial.path().as_deref(), Some("A > C"));
    }

    proptest! {
        #[test]
        fn prop_chunks_never_exceed_window(words in proptest::collection::vec("[a-z]{1,12}", 1..200)) {
            let text = format!("## Section\n{}", words.join(" "));
            let config = ChunkConfig { chunk_size: 80, chunk_overlap: 20 };
            for chunk in chunk_markdown(&text, &config) {
                prop_assert!(chunk.text.chars().count() <= 80);
            }
        }

        #[test]
        fn prop_chunking_is_deterministic(words in proptest::collection::vec("[a-z #*]{1,20}", 1..60)) {
            let text = words.join("\n");
            let config = ChunkConfig { chunk_size: 50, chunk_overlap: 10 };
            prop_assert_eq!(chunk_markdown(&text, &config), chunk_markdown(&text, &config));
        }
    }
}

//! Airline policy search tool.
//!
//! Normalizes an airline identifier against a fixed lookup of US
//! carriers, rewrites the query with airline context to bias retrieval
//! toward airline-specific passages, and searches the policy index.

use serde::Serialize;
use tracing::debug;

use crate::chunking::{ChunkConfig, chunk_markdown};
use crate::embedding::Embedder;
use crate::error::IndexError;
use crate::index::PolicyIndex;

/// Default number of matches returned per search.
pub const DEFAULT_TOP_K: usize = 3;

/// Known US carriers: 2-letter code and full name.
pub const AIRLINES: [(&str, &str); 10] = [
    ("AS", "Alaska Airlines"),
    ("G4", "Allegiant Air"),
    ("AA", "American Airlines"),
    ("DL", "Delta Air Lines"),
    ("F9", "Frontier Airlines"),
    ("HA", "Hawaiian Airlines"),
    ("B6", "JetBlue Airways"),
    ("WN", "Southwest Airlines"),
    ("NK", "Spirit Airlines"),
    ("UA", "United Airlines"),
];

/// Resolves an airline code or name to `(code, name)`.
///
/// - Known 2-letter code → `(code, Some(name))`
/// - Unknown 2-letter code → `(code, None)`
/// - Known full name (case-insensitive) → `(code, name)`
/// - Anything else → `(None, Some(input as given, trimmed))`
#[must_use]
pub fn normalize_airline(airline: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(raw) = airline else {
        return (None, None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return (None, None);
    }

    let upper = raw.to_uppercase();
    if upper.chars().count() == 2 {
        let name = AIRLINES
            .iter()
            .find(|(code, _)| *code == upper)
            .map(|(_, name)| (*name).to_string());
        return (Some(upper), name);
    }

    for (code, name) in AIRLINES {
        if upper == name.to_uppercase() {
            return (Some(code.to_string()), Some(name.to_string()));
        }
    }

    (None, Some(raw.to_string()))
}

/// One matching policy passage.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyMatchView {
    /// Passage text.
    pub text: String,
    /// Heading path, e.g. `"Refunds > Credit Card"`.
    pub path: Option<String>,
    /// Zero-based chunk index within its heading section.
    pub chunk: usize,
    /// Similarity score (higher is closer).
    pub score: f32,
}

/// Structured output of the `policy_search` tool.
#[derive(Debug, Clone, Serialize)]
pub struct PolicySearchOutput {
    /// `false` only when the query was empty after trimming.
    pub ok: bool,
    /// The query as sent to the index (after airline rewriting).
    pub query: String,
    /// Number of matches returned.
    pub match_count: usize,
    /// Ranked matches.
    pub matches: Vec<PolicyMatchView>,
    /// Resolved airline code, when recognized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airline_code: Option<String>,
    /// Resolved airline name, when recognized or passed through.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airline_name: Option<String>,
}

/// Semantic search over a chunked policy document.
///
/// Builds its index once at construction; searches are read-only and
/// deterministic. No retries, no per-session caching beyond the index
/// itself.
pub struct PolicySearchTool {
    index: PolicyIndex,
    top_k: usize,
}

impl PolicySearchTool {
    /// Chunks the policy markdown and builds the index.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if embedding fails.
    pub fn new(
        policy_text: &str,
        embedder: Box<dyn Embedder>,
        top_k: usize,
    ) -> Result<Self, IndexError> {
        let chunks = chunk_markdown(policy_text, &ChunkConfig::default());
        debug!(chunks = chunks.len(), top_k, "building policy index");
        let index = PolicyIndex::build(embedder, chunks)?;
        Ok(Self { index, top_k })
    }

    /// Number of indexed chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    /// Searches airline policies for passenger entitlements.
    ///
    /// An empty query after trimming returns an explicit failure result
    /// (`ok = false`, zero matches) without touching the index. When an
    /// airline resolves, the query is prefixed with
    /// `"<AirlineName> policy commitments: "`; an unresolved airline
    /// string is used as the prefix verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if embedding the query fails.
    pub fn query(
        &self,
        query: &str,
        airline: Option<&str>,
    ) -> Result<PolicySearchOutput, IndexError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(PolicySearchOutput {
                ok: false,
                query: String::new(),
                match_count: 0,
                matches: Vec::new(),
                airline_code: None,
                airline_name: None,
            });
        }

        let (code, name) = normalize_airline(airline);
        let rewritten = if let Some(ref name) = name {
            format!("{name} policy commitments: {trimmed}")
        } else if let Some(raw) = airline.map(str::trim).filter(|a| !a.is_empty()) {
            format!("{raw} policy commitments: {trimmed}")
        } else {
            trimmed.to_string()
        };

        let results = self.index.query(&rewritten, self.top_k)?;
        let matches: Vec<PolicyMatchView> = results
            .into_iter()
            .map(|r| PolicyMatchView {
                text: r.chunk.text.clone(),
                path: r.chunk.meta.path(),
                chunk: r.chunk.chunk_index,
                score: r.score,
            })
            .collect();

        debug!(
            matches = matches.len(),
            airline_code = code.as_deref().unwrap_or("-"),
            "policy search executed"
        );

        Ok(PolicySearchOutput {
            ok: true,
            query: rewritten,
            match_count: matches.len(),
            matches,
            airline_code: code,
            airline_name: name,
        })
    }
}

impl std::fmt::Debug for PolicySearchTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicySearchTool")
            .field("chunks", &self.index.len())
            .field("top_k", &self.top_k)
            .finish()
    }
}

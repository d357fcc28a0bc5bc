//! The primary document and its two accepted encodings.

use serde::{Deserialize, Serialize};

/// Question, reference names and outcome labels of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryDocument {
    pub query: String,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub outcomes: Vec<String>,
}

impl PrimaryDocument {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_outcomes<I, S>(mut self, outcomes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outcomes = outcomes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reference(mut self, name: impl Into<String>) -> Self {
        self.references.push(name.into());
        self
    }
}

/// Which encoding a primary document was stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryFormat {
    Json,
    LineGrammar,
}

/// A decoded primary document tagged with the grammar that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryDecode {
    Json(PrimaryDocument),
    /// `QUERY: ...` / `REF: ...` text; carries no outcome labels.
    LineGrammar(PrimaryDocument),
}

impl PrimaryDecode {
    /// Decode JSON first, falling back to the line grammar. Never fails.
    pub fn decode(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<PrimaryDocument>(bytes) {
            Ok(doc) => PrimaryDecode::Json(doc),
            Err(_) => PrimaryDecode::LineGrammar(parse_line_grammar(&String::from_utf8_lossy(bytes))),
        }
    }

    pub fn format(&self) -> PrimaryFormat {
        match self {
            PrimaryDecode::Json(_) => PrimaryFormat::Json,
            PrimaryDecode::LineGrammar(_) => PrimaryFormat::LineGrammar,
        }
    }

    pub fn document(&self) -> &PrimaryDocument {
        match self {
            PrimaryDecode::Json(doc) | PrimaryDecode::LineGrammar(doc) => doc,
        }
    }

    pub fn into_document(self) -> PrimaryDocument {
        match self {
            PrimaryDecode::Json(doc) | PrimaryDecode::LineGrammar(doc) => doc,
        }
    }
}

/// First non-empty `QUERY:` line is the query; each `REF:` line adds one reference.
fn parse_line_grammar(text: &str) -> PrimaryDocument {
    let mut doc = PrimaryDocument::default();
    let mut query_seen = false;

    for line in text.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("QUERY:") {
            let rest = rest.trim();
            if !query_seen && !rest.is_empty() {
                doc.query = rest.to_string();
                query_seen = true;
            }
        } else if let Some(rest) = line.strip_prefix("REF:") {
            let rest = rest.trim();
            if !rest.is_empty() {
                doc.references.push(rest.to_string());
            }
        }
    }
    doc
}

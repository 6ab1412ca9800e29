//! Manifest data model shared by the extractor and the reading app.
//!
//! Field names are serialized in camelCase and form a binding contract
//! with the downstream consumer of `writings.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Root structure of the generated manifest file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// When the manifest was generated.
    pub generated_at: DateTime<Utc>,
    /// One record per successfully processed source file.
    pub items: Vec<Writing>,
}

// ---------------------------------------------------------------------------
// Writing / Section / Block
// ---------------------------------------------------------------------------

/// A top-level source document mapped to one output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Writing {
    /// File stem of the source document.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Source file name, including extension.
    pub file_name: String,
    /// Whole-document plain text, kept as a fallback for readers.
    pub text: String,
    /// Sections in canonical-then-document order.
    pub sections: Vec<Section>,
}

/// A titled subdivision of a writing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Slug, unique within the owning writing.
    pub id: String,
    pub title: String,
    pub blocks: Vec<Block>,
    /// Display-oriented flattening of each block's share text.
    pub paragraphs: Vec<String>,
}

/// Kind of a content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Paragraph,
    Heading,
    Quote,
    Poetry,
    List,
}

impl BlockType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::Quote => "quote",
            Self::Poetry => "poetry",
            Self::List => "list",
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The smallest structured content unit within a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Unique within the owning section.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BlockType,
    pub text: String,
    /// `id` attribute of the source element, if any.
    pub source_id: Option<String>,
    /// Attribution lines folded in from following dash-prefixed blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    /// Rendered footnotes (`"{number}. {text}"` or `"{text}"`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub footnotes: Vec<String>,
    /// Attribution- and footnote-inclusive text for sharing.
    pub share_text: String,
}

// ---------------------------------------------------------------------------
// FootnoteEntry
// ---------------------------------------------------------------------------

/// A resolved footnote from a document's footnote list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FootnoteEntry {
    /// Anchor id that in-text references resolve against.
    pub id: String,
    /// Number label, e.g. `"1"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    pub text: String,
    /// Fragment id of the citation point (back-link target).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

impl FootnoteEntry {
    /// Render the footnote the way it appears in `Block::footnotes`.
    pub fn render(&self) -> String {
        match &self.number {
            Some(number) => format!("{number}. {}", self.text),
            None => self.text.clone(),
        }
    }
}

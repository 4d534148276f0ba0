//! Study document model
//!
//! The document structure produced by the plan generation service: a title
//! and a list of chapters, each holding markdown content and optional
//! sub-chapters. Paragraph boundaries (blank lines) define the units the
//! player chains across.

use serde::{Deserialize, Serialize};

/// A generated study document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub chapters: Vec<Chapter>,
}

/// One chapter of a study document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,

    /// Markdown content of the chapter
    pub content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_chapters: Vec<Chapter>,
}

impl Chapter {
    /// Split chapter content into paragraphs
    ///
    /// Paragraphs are separated by blank lines. Whitespace-only fragments
    /// are dropped, so consecutive blank lines do not produce empty units.
    pub fn paragraphs(&self) -> Vec<&str> {
        self.content
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }
}

impl Document {
    /// Look up a chapter by index
    pub fn chapter(&self, index: usize) -> Option<&Chapter> {
        self.chapters.get(index)
    }
}

/// Source material submitted to the plan generation service
///
/// Serialized untagged: either `{"files": [...]}` or `{"url": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceMaterial {
    /// Uploaded files with their text content
    Files { files: Vec<SourceFile> },

    /// A documentation URL to fetch and analyze
    Url { url: String },
}

/// One uploaded source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

//! Fixed-size line-window chunking of source documents.
//!
//! A document of `N` lines is split into `ceil(N / W)` consecutive,
//! non-overlapping windows of `W` lines (the last may be shorter). Each
//! window is addressed as `<path>#<start>-<end>` with 1-indexed inclusive
//! line numbers, so re-chunking unchanged content yields the same ids.
//!
//! # Example
//!
//! ```rust
//! use groundwork_db::chunking::LineChunker;
//! use groundwork_core::SourceDocument;
//!
//! let doc = SourceDocument {
//!     source_id: "src/lib.rs".to_string(),
//!     content: "a\nb\nc".to_string(),
//!     size: None,
//!     metadata: serde_json::json!({}),
//! };
//! let chunks = LineChunker::new(2).chunk(&doc);
//! assert_eq!(chunks[0].source_id, "src/lib.rs#1-2");
//! assert_eq!(chunks[1].source_id, "src/lib.rs#3-3");
//! ```

use serde_json::{Map, Value as JsonValue};

use groundwork_core::{defaults, meta_str, SourceDocument};

/// One line window of a document, not yet embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChunk {
    /// `<path-or-source-id>#<start_line>-<end_line>`.
    pub source_id: String,
    pub text: String,
    /// 1-indexed, inclusive.
    pub start_line: usize,
    /// 1-indexed, inclusive.
    pub end_line: usize,
    /// Document metadata extended with the chunk's line span.
    pub metadata: JsonValue,
}

/// Splits documents into fixed windows of `lines_per_chunk` lines.
#[derive(Debug, Clone)]
pub struct LineChunker {
    lines_per_chunk: usize,
}

impl Default for LineChunker {
    fn default() -> Self {
        Self::new(defaults::LINES_PER_CHUNK)
    }
}

impl LineChunker {
    /// A zero window size is treated as one line per chunk.
    pub fn new(lines_per_chunk: usize) -> Self {
        Self {
            lines_per_chunk: lines_per_chunk.max(1),
        }
    }

    pub fn lines_per_chunk(&self) -> usize {
        self.lines_per_chunk
    }

    /// Chunk a document. An empty document yields no chunks.
    ///
    /// Windows consisting only of whitespace are skipped so that every
    /// chunk carries text worth embedding; line numbering is unaffected.
    pub fn chunk(&self, doc: &SourceDocument) -> Vec<LineChunk> {
        let base = meta_str(&doc.metadata, "path").unwrap_or(&doc.source_id);
        let lines: Vec<&str> = doc.content.lines().collect();

        lines
            .chunks(self.lines_per_chunk)
            .enumerate()
            .filter_map(|(index, window)| {
                let start_line = index * self.lines_per_chunk + 1;
                let end_line = start_line + window.len() - 1;
                let text = window.join("\n");
                if text.trim().is_empty() {
                    return None;
                }

                let mut metadata = match &doc.metadata {
                    JsonValue::Object(map) => map.clone(),
                    _ => Map::new(),
                };
                metadata
                    .entry("path")
                    .or_insert_with(|| JsonValue::from(base));
                metadata.insert("document_id".into(), JsonValue::from(doc.source_id.as_str()));
                metadata.insert("start_line".into(), JsonValue::from(start_line));
                metadata.insert("end_line".into(), JsonValue::from(end_line));
                metadata.insert("chunk_index".into(), JsonValue::from(index));

                Some(LineChunk {
                    source_id: format!("{}#{}-{}", base, start_line, end_line),
                    text,
                    start_line,
                    end_line,
                    metadata: JsonValue::Object(metadata),
                })
            })
            .collect()
    }
}

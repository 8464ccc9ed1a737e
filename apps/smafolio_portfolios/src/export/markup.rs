//! The line markup the export template renders to.
//!
//! ```text
//! # Heading 1
//! ## Heading 2
//! ### Heading 3
//! @image data:image/png;base64,....
//! ---
//! body text (a leading `\` is dropped and never starts markup)
//! ```

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::ExportError;

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading(u8, String),
    Text(String),
    /// Decoded bytes of an embedded image.
    Image(Vec<u8>),
    Rule,
    Blank,
}

pub fn parse(doc: &str) -> Result<Vec<Block>, ExportError> {
    let mut blocks = Vec::new();
    for raw in doc.lines() {
        let line = raw.trim_end();
        let block = if line.trim().is_empty() {
            Block::Blank
        } else if let Some(escaped) = line.strip_prefix('\\') {
            Block::Text(escaped.to_string())
        } else if line == "---" {
            Block::Rule
        } else if let Some(t) = line.strip_prefix("### ") {
            Block::Heading(3, t.trim().to_string())
        } else if let Some(t) = line.strip_prefix("## ") {
            Block::Heading(2, t.trim().to_string())
        } else if let Some(t) = line.strip_prefix("# ") {
            Block::Heading(1, t.trim().to_string())
        } else if let Some(uri) = line.strip_prefix("@image ") {
            Block::Image(decode_data_uri(uri.trim())?)
        } else {
            Block::Text(line.to_string())
        };
        // runs of blank lines collapse into one
        if block == Block::Blank && matches!(blocks.last(), None | Some(Block::Blank)) {
            continue;
        }
        blocks.push(block);
    }
    while blocks.last() == Some(&Block::Blank) {
        blocks.pop();
    }
    Ok(blocks)
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>, ExportError> {
    let payload = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, b64)| b64)
        .ok_or_else(|| ExportError::Markup(format!("unsupported image source {uri:.32}")))?;
    STANDARD
        .decode(payload)
        .map_err(|e| ExportError::Markup(e.to_string()))
}

/// Escape user text for a body position: every line is prefixed with `\` so
/// it renders as text whatever it starts with.
pub fn escape_block(text: &str) -> String {
    text.lines()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                format!("\\{l}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Flatten user text onto one line, for headings and labels.
pub fn escape_inline(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn as_text(value: &tera::Value) -> String {
    match value {
        tera::Value::String(s) => s.clone(),
        tera::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// tera filter wrapping [`escape_block`].
pub fn markup_filter(
    value: &tera::Value,
    _: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    Ok(tera::Value::String(escape_block(&as_text(value))))
}

/// tera filter wrapping [`escape_inline`].
pub fn inline_filter(
    value: &tera::Value,
    _: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    Ok(tera::Value::String(escape_inline(&as_text(value))))
}

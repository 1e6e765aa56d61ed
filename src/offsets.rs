//! Offset unit conversion.
//!
//! Buffers are UTF-8 and every edit works on byte offsets. Analyzers built on
//! UTF-16 strings report offsets in UTF-16 code units; those are translated
//! against the snapshot text before a batch is applied.

use crate::violation::Span;
use serde::Deserialize;
use std::str::FromStr;

/// The unit diagnostics offsets are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetEncoding {
    #[default]
    Utf8,
    Utf16,
}

impl FromStr for OffsetEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" | "bytes" => Ok(OffsetEncoding::Utf8),
            "utf16" | "utf-16" => Ok(OffsetEncoding::Utf16),
            other => Err(format!("unknown offset encoding '{other}' (expected utf8 or utf16)")),
        }
    }
}

impl OffsetEncoding {
    /// Translate `span` into byte offsets of `text`.
    ///
    /// Returns `None` when an end of the span lies past the text or inside a
    /// surrogate pair.
    pub fn to_byte_span(self, text: &str, span: Span) -> Option<Span> {
        match self {
            OffsetEncoding::Utf8 => Some(span),
            OffsetEncoding::Utf16 => {
                let start = utf16_to_byte(text, span.start)?;
                let end = utf16_to_byte(text, span.end())?;
                Some(Span::from_range(start, end))
            }
        }
    }
}

/// Byte offset of the character starting at UTF-16 offset `units`.
pub fn utf16_to_byte(text: &str, units: usize) -> Option<usize> {
    let mut seen = 0;
    for (byte, ch) in text.char_indices() {
        if seen == units {
            return Some(byte);
        }
        if seen > units {
            return None;
        }
        seen += ch.len_utf16();
    }
    (seen == units).then_some(text.len())
}

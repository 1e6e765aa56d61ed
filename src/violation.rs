//! Violation records and the closed catalog of violation kinds.
//!
//! Every span is expressed in the coordinate space of the file text the
//! diagnostics were computed against. Records are never mutated after the
//! provider hands them over.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Version of the kind catalog. Bumped whenever a kind is added or a rule's
/// observable output changes.
pub const CATALOG_VERSION: &str = "1.0.0";

/// The closed set of violation kinds this crate knows how to repair.
///
/// Declaration order is the priority order used by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ViolationKind {
    CommentMissingSpace,
    TrailingWhitespace,
    MissingThisQualifier,
    UnnecessaryParentheses,
    TypeShouldUseAlias,
    UseEmptyConstant,
    BlankLineAfterClosingBrace,
    BlankLineBetweenElements,
    UnusedImportDirective,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown violation kind: {0}")]
pub struct UnknownKind(pub String);

impl ViolationKind {
    pub const ALL: [ViolationKind; 9] = [
        ViolationKind::CommentMissingSpace,
        ViolationKind::TrailingWhitespace,
        ViolationKind::MissingThisQualifier,
        ViolationKind::UnnecessaryParentheses,
        ViolationKind::TypeShouldUseAlias,
        ViolationKind::UseEmptyConstant,
        ViolationKind::BlankLineAfterClosingBrace,
        ViolationKind::BlankLineBetweenElements,
        ViolationKind::UnusedImportDirective,
    ];

    /// Analyzer rule id (e.g. `SA1028`).
    pub fn id(self) -> &'static str {
        match self {
            ViolationKind::CommentMissingSpace => "SA1005",
            ViolationKind::TrailingWhitespace => "SA1028",
            ViolationKind::MissingThisQualifier => "SA1101",
            ViolationKind::UnnecessaryParentheses => "SA1119",
            ViolationKind::TypeShouldUseAlias => "SA1121",
            ViolationKind::UseEmptyConstant => "SA1122",
            ViolationKind::BlankLineAfterClosingBrace => "SA1513",
            ViolationKind::BlankLineBetweenElements => "SA1516",
            ViolationKind::UnusedImportDirective => "CS8019",
        }
    }

    /// Human-readable slug (e.g. `trailing-whitespace`).
    pub fn slug(self) -> &'static str {
        match self {
            ViolationKind::CommentMissingSpace => "comment-missing-space",
            ViolationKind::TrailingWhitespace => "trailing-whitespace",
            ViolationKind::MissingThisQualifier => "missing-this-qualifier",
            ViolationKind::UnnecessaryParentheses => "unnecessary-parentheses",
            ViolationKind::TypeShouldUseAlias => "type-should-use-alias",
            ViolationKind::UseEmptyConstant => "use-empty-constant",
            ViolationKind::BlankLineAfterClosingBrace => "blank-line-after-closing-brace",
            ViolationKind::BlankLineBetweenElements => "blank-line-between-elements",
            ViolationKind::UnusedImportDirective => "unused-import-directive",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id(), self.slug())
    }
}

impl FromStr for ViolationKind {
    type Err = UnknownKind;

    /// Accepts either the rule id or the slug, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ViolationKind::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(s) || kind.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

impl TryFrom<String> for ViolationKind {
    type Error = UnknownKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ViolationKind> for String {
    fn from(kind: ViolationKind) -> Self {
        kind.id().to_string()
    }
}

/// A `start + len` range in a text buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Build from a half-open `[start, end)` range. An inverted range yields
    /// a zero-length span at `start`.
    pub fn from_range(start: usize, end: usize) -> Self {
        Self {
            start,
            len: end.saturating_sub(start),
        }
    }

    /// Exclusive end offset. Saturates, so a span whose length overflows
    /// reads as running past any text and fails bounds checks.
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

/// One located style-rule breach in one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Violation {
    pub kind: ViolationKind,
    pub file: PathBuf,
    pub span: Span,
}

impl Violation {
    pub fn new(kind: ViolationKind, file: impl Into<PathBuf>, start: usize, len: usize) -> Self {
        Self {
            kind,
            file: file.into(),
            span: Span::new(start, len),
        }
    }

    pub fn belongs_to(&self, file: &Path) -> bool {
        self.file == file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_by_id_and_slug() {
        assert_eq!("SA1028".parse::<ViolationKind>().unwrap(), ViolationKind::TrailingWhitespace);
        assert_eq!(
            "trailing-whitespace".parse::<ViolationKind>().unwrap(),
            ViolationKind::TrailingWhitespace
        );
        assert_eq!("cs8019".parse::<ViolationKind>().unwrap(), ViolationKind::UnusedImportDirective);
        assert!("SA9999".parse::<ViolationKind>().is_err());
    }

    #[test]
    fn test_catalog_order_matches_declaration() {
        let mut sorted = ViolationKind::ALL;
        sorted.sort();
        assert_eq!(sorted, ViolationKind::ALL);
        assert_eq!(ViolationKind::ALL[0].id(), "SA1005");
        assert_eq!(ViolationKind::ALL[8].id(), "CS8019");
    }

    #[test]
    fn test_span_from_range() {
        let span = Span::from_range(4, 9);
        assert_eq!(span.len, 5);
        assert_eq!(span.end(), 9);
        assert!(Span::from_range(9, 4).is_empty());
    }

    #[test]
    fn test_span_end_saturates() {
        assert_eq!(Span::new(1, usize::MAX).end(), usize::MAX);
    }

    #[test]
    fn test_kind_serde_roundtrip_uses_id() {
        let json = serde_json::to_string(&ViolationKind::UseEmptyConstant).unwrap();
        assert_eq!(json, "\"SA1122\"");
        let kind: ViolationKind = serde_json::from_str("\"use-empty-constant\"").unwrap();
        assert_eq!(kind, ViolationKind::UseEmptyConstant);
    }
}

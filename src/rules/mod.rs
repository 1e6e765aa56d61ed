//! Fix rules: one pure text transformation per violation kind.
//!
//! A [`FixRule`] turns `(text, span)` into a single [`Replacement`]. Where the
//! replacement lands is governed by its [`SpanConsumption`]; what it contains
//! is governed by its [`Transform`]. Rules never look at any span but their
//! own, which is what lets the patch applier run a whole batch against one
//! snapshot.
//!
//! The standard catalog is built with [`RuleTable::standard`] and handed to
//! the orchestrator explicitly.

pub mod alias;

pub use alias::builtin_alias;

use crate::edit::{check_range, EditError, Replacement};
use crate::violation::{Span, ViolationKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How a rule's output is positioned relative to the violation span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanConsumption {
    /// `text[..start] + new + text[start+len..]`
    ReplaceSpan,
    /// `text[..start] + text[start+len..]`
    DeleteSpan,
    /// `text[..start] + new + text[start..]`, length ignored
    InsertAtStart,
    /// `text[..start+len] + new + text[start+len..]`
    InsertAtEnd,
}

impl fmt::Display for SpanConsumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpanConsumption::ReplaceSpan => "replace-span",
            SpanConsumption::DeleteSpan => "delete-span",
            SpanConsumption::InsertAtStart => "insert-at-start",
            SpanConsumption::InsertAtEnd => "insert-at-end",
        };
        f.write_str(name)
    }
}

/// Line terminator used by rules that insert blank lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Newline {
    /// CRLF if the file already contains one, LF otherwise
    #[default]
    Auto,
    Lf,
    Crlf,
}

impl Newline {
    pub fn resolve(self, text: &str) -> &'static str {
        match self {
            Newline::Lf => "\n",
            Newline::Crlf => "\r\n",
            Newline::Auto if text.contains("\r\n") => "\r\n",
            Newline::Auto => "\n",
        }
    }
}

impl FromStr for Newline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Newline::Auto),
            "lf" => Ok(Newline::Lf),
            "crlf" => Ok(Newline::Crlf),
            other => Err(format!("unknown newline style '{other}' (expected auto, lf or crlf)")),
        }
    }
}

/// The content a rule produces for one violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    /// A fixed literal
    Literal(String),
    /// One line terminator
    Newline(Newline),
    /// Nothing
    Remove,
    /// The matched text minus its first and last character
    StripEnclosing,
    /// The keyword alias of the matched type name
    BuiltinAlias,
    /// Nothing, and the whitespace right after the span is swallowed as well
    RemoveWithTrailingWhitespace,
}

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("No fix rule registered for {0}")]
    UnknownRuleKind(ViolationKind),

    #[error("No built-in alias for `{text}` at offset {start}")]
    UnmappedAlias { start: usize, text: String },

    #[error("Span {span} is too short to strip its enclosing characters")]
    SpanTooShort { span: Span },

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// The deterministic fix for one violation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixRule {
    kind: ViolationKind,
    consumption: SpanConsumption,
    transform: Transform,
    /// Offset added to the anchor of insertions (the `//` of a comment is skipped this way)
    shift: usize,
}

impl FixRule {
    pub fn new(kind: ViolationKind, consumption: SpanConsumption, transform: Transform) -> Self {
        Self {
            kind,
            consumption,
            transform,
            shift: 0,
        }
    }

    /// Move the insertion point `shift` bytes to the right of the span anchor.
    pub fn shifted(mut self, shift: usize) -> Self {
        self.shift = shift;
        self
    }

    pub fn kind(&self) -> ViolationKind {
        self.kind
    }

    pub fn consumption(&self) -> SpanConsumption {
        self.consumption
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Compute the single replacement that fixes the violation at `span`.
    ///
    /// `text` must be the buffer the span currently refers to.
    pub fn replacement(&self, text: &str, span: Span) -> Result<Replacement, RuleError> {
        check_range(text, span.start, span.end())?;

        let (start, end) = match self.consumption {
            SpanConsumption::ReplaceSpan | SpanConsumption::DeleteSpan => (span.start, span.end()),
            SpanConsumption::InsertAtStart => {
                let at = span.start.saturating_add(self.shift);
                (at, at)
            }
            SpanConsumption::InsertAtEnd => {
                let at = span.end().saturating_add(self.shift);
                (at, at)
            }
        };
        check_range(text, start, end)?;

        if self.consumption == SpanConsumption::DeleteSpan {
            return Ok(Replacement::delete(start, end));
        }

        let matched = &text[start..end];
        let replacement = match &self.transform {
            Transform::Literal(literal) => Replacement::new(start, end, literal.clone()),
            Transform::Newline(style) => Replacement::new(start, end, style.resolve(text)),
            Transform::Remove => Replacement::delete(start, end),
            Transform::StripEnclosing => {
                let mut chars = matched.chars();
                let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
                    return Err(RuleError::SpanTooShort { span });
                };
                let inner = &matched[first.len_utf8()..matched.len() - last.len_utf8()];
                Replacement::new(start, end, inner)
            }
            Transform::BuiltinAlias => match builtin_alias(matched) {
                Some(alias) => Replacement::new(start, end, alias),
                None => {
                    return Err(RuleError::UnmappedAlias {
                        start,
                        text: matched.to_string(),
                    })
                }
            },
            Transform::RemoveWithTrailingWhitespace => {
                let rest = &text[end..];
                let trailing = rest.len() - rest.trim_start().len();
                Replacement::delete(start, end + trailing)
            }
        };

        Ok(replacement)
    }

    /// Apply this rule to a single span, returning the new text.
    pub fn apply(&self, text: &str, span: Span) -> Result<String, RuleError> {
        let replacement = self.replacement(text, span)?;
        let mut buffer = text.to_string();
        replacement.splice_into(&mut buffer)?;
        Ok(buffer)
    }
}

/// Immutable mapping from violation kind to its fix rule.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: BTreeMap<ViolationKind, FixRule>,
}

impl RuleTable {
    /// An empty table; every lookup fails until rules are added.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The full catalog. `newline` decides the terminator used by the blank-line rules.
    pub fn standard(newline: Newline) -> Self {
        use SpanConsumption::*;
        use ViolationKind::*;

        Self::empty()
            .with(FixRule::new(CommentMissingSpace, InsertAtStart, Transform::Literal(" ".into())).shifted(2))
            .with(FixRule::new(TrailingWhitespace, DeleteSpan, Transform::Remove))
            .with(FixRule::new(MissingThisQualifier, InsertAtStart, Transform::Literal("this.".into())))
            .with(FixRule::new(UnnecessaryParentheses, ReplaceSpan, Transform::StripEnclosing))
            .with(FixRule::new(TypeShouldUseAlias, ReplaceSpan, Transform::BuiltinAlias))
            .with(FixRule::new(UseEmptyConstant, ReplaceSpan, Transform::Literal("string.Empty".into())))
            .with(FixRule::new(BlankLineAfterClosingBrace, InsertAtStart, Transform::Newline(newline)))
            .with(FixRule::new(BlankLineBetweenElements, InsertAtStart, Transform::Newline(newline)))
            .with(FixRule::new(UnusedImportDirective, ReplaceSpan, Transform::RemoveWithTrailingWhitespace))
    }

    /// Add or replace the rule for `rule.kind()`.
    pub fn with(mut self, rule: FixRule) -> Self {
        self.rules.insert(rule.kind(), rule);
        self
    }

    pub fn lookup(&self, kind: ViolationKind) -> Result<&FixRule, RuleError> {
        self.rules.get(&kind).ok_or(RuleError::UnknownRuleKind(kind))
    }

    /// Rules in catalog priority order.
    pub fn iter(&self) -> impl Iterator<Item = &FixRule> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(kind: ViolationKind, text: &str, start: usize, len: usize) -> Result<String, RuleError> {
        RuleTable::standard(Newline::Lf)
            .lookup(kind)
            .unwrap()
            .apply(text, Span::new(start, len))
    }

    #[test]
    fn test_comment_missing_space() {
        assert_eq!(apply(ViolationKind::CommentMissingSpace, "//comment", 0, 9).unwrap(), "// comment");
        assert_eq!(
            apply(ViolationKind::CommentMissingSpace, "x = 1; //note", 7, 6).unwrap(),
            "x = 1; // note"
        );
    }

    #[test]
    fn test_trailing_whitespace() {
        assert_eq!(
            apply(ViolationKind::TrailingWhitespace, "int x = 1;   \n", 10, 3).unwrap(),
            "int x = 1;\n"
        );
    }

    #[test]
    fn test_missing_this_qualifier() {
        assert_eq!(
            apply(ViolationKind::MissingThisQualifier, "return value;", 7, 5).unwrap(),
            "return this.value;"
        );
    }

    #[test]
    fn test_unnecessary_parentheses() {
        assert_eq!(apply(ViolationKind::UnnecessaryParentheses, "(a + b)", 0, 7).unwrap(), "a + b");
        assert_eq!(
            apply(ViolationKind::UnnecessaryParentheses, "x = (y);", 4, 3).unwrap(),
            "x = y;"
        );
    }

    #[test]
    fn test_unnecessary_parentheses_too_short() {
        let err = apply(ViolationKind::UnnecessaryParentheses, "(", 0, 1).unwrap_err();
        assert!(matches!(err, RuleError::SpanTooShort { .. }));
    }

    #[test]
    fn test_type_alias() {
        assert_eq!(apply(ViolationKind::TypeShouldUseAlias, "Int32", 0, 5).unwrap(), "int");
        assert_eq!(
            apply(ViolationKind::TypeShouldUseAlias, "System.String s;", 0, 13).unwrap(),
            "string s;"
        );
    }

    #[test]
    fn test_type_alias_unmapped() {
        let err = apply(ViolationKind::TypeShouldUseAlias, "Foo", 0, 3).unwrap_err();
        match err {
            RuleError::UnmappedAlias { start, text } => {
                assert_eq!(start, 0);
                assert_eq!(text, "Foo");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_use_empty_constant() {
        assert_eq!(
            apply(ViolationKind::UseEmptyConstant, "var s = \"\";", 8, 2).unwrap(),
            "var s = string.Empty;"
        );
    }

    #[test]
    fn test_blank_lines() {
        let text = "}\nint x;";
        assert_eq!(apply(ViolationKind::BlankLineAfterClosingBrace, text, 2, 0).unwrap(), "}\n\nint x;");
        assert_eq!(apply(ViolationKind::BlankLineBetweenElements, text, 2, 3).unwrap(), "}\n\nint x;");
    }

    #[test]
    fn test_newline_auto_detects_crlf() {
        let rule = RuleTable::standard(Newline::Auto)
            .lookup(ViolationKind::BlankLineAfterClosingBrace)
            .unwrap()
            .clone();
        assert_eq!(rule.apply("}\r\nx", Span::new(3, 0)).unwrap(), "}\r\n\r\nx");
        assert_eq!(rule.apply("}\nx", Span::new(2, 0)).unwrap(), "}\n\nx");
    }

    #[test]
    fn test_unused_import_swallows_following_whitespace() {
        let text = "using System;\nusing System.IO;\n\nclass A {}";
        assert_eq!(
            apply(ViolationKind::UnusedImportDirective, text, 14, 16).unwrap(),
            "using System;\nclass A {}"
        );
    }

    #[test]
    fn test_insert_ignores_length() {
        // Length is irrelevant for insertions, including one that runs to the end
        assert_eq!(apply(ViolationKind::MissingThisQualifier, "x", 0, 1).unwrap(), "this.x");
    }

    #[test]
    fn test_insert_at_end() {
        let rule = FixRule::new(
            ViolationKind::UseEmptyConstant,
            SpanConsumption::InsertAtEnd,
            Transform::Literal(";".into()),
        );
        assert_eq!(rule.apply("a = b\n", Span::new(0, 5)).unwrap(), "a = b;\n");
    }

    #[test]
    fn test_delete_span_ignores_transform() {
        let rule = FixRule::new(
            ViolationKind::TrailingWhitespace,
            SpanConsumption::DeleteSpan,
            Transform::Literal("ignored".into()),
        );
        assert_eq!(rule.apply("ab  ", Span::new(2, 2)).unwrap(), "ab");
    }

    #[test]
    fn test_span_out_of_bounds() {
        let err = apply(ViolationKind::TrailingWhitespace, "abc", 2, 5).unwrap_err();
        assert!(matches!(err, RuleError::Edit(EditError::InvalidRange { .. })));
    }

    #[test]
    fn test_unknown_rule_kind() {
        let table = RuleTable::empty().with(FixRule::new(
            ViolationKind::TrailingWhitespace,
            SpanConsumption::DeleteSpan,
            Transform::Remove,
        ));
        assert!(table.lookup(ViolationKind::TrailingWhitespace).is_ok());
        assert!(matches!(
            table.lookup(ViolationKind::CommentMissingSpace),
            Err(RuleError::UnknownRuleKind(ViolationKind::CommentMissingSpace))
        ));
    }

    #[test]
    fn test_standard_table_covers_catalog() {
        let table = RuleTable::standard(Newline::Auto);
        assert_eq!(table.len(), ViolationKind::ALL.len());
        let kinds: Vec<_> = table.iter().map(FixRule::kind).collect();
        assert_eq!(kinds, ViolationKind::ALL.to_vec());
    }

    #[test]
    fn test_newline_from_str() {
        assert_eq!("CRLF".parse::<Newline>().unwrap(), Newline::Crlf);
        assert!("cr".parse::<Newline>().is_err());
    }
}

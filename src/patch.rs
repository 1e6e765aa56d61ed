//! Per-file patch application.
//!
//! Every span in a batch is valid only against the original text. Batches are
//! therefore applied back-to-front: after sorting by start offset, the
//! right-most violation is spliced first, so an edit never moves a span that
//! is still waiting to be processed. No offset translation is needed.

use crate::edit::EditError;
use crate::rules::{FixRule, RuleError, RuleTable};
use crate::violation::{Span, Violation, ViolationKind};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a span was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanProblem {
    /// The span runs past the end of the text
    OutOfBounds,
    /// An end of the span splits a multi-byte character
    NotCharBoundary,
    /// Another violation of the same kind starts at the same offset
    DuplicateStart,
    /// The span overlaps another span of the batch
    Overlaps(Span),
    /// The span cannot hold the characters the rule strips
    TooShort,
    /// The span could not be translated from the analyzer's offset unit
    Untranslatable,
}

impl fmt::Display for SpanProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanProblem::OutOfBounds => write!(f, "out of bounds"),
            SpanProblem::NotCharBoundary => write!(f, "not on a character boundary"),
            SpanProblem::DuplicateStart => write!(f, "duplicate start offset"),
            SpanProblem::Overlaps(other) => write!(f, "overlaps {}", other),
            SpanProblem::TooShort => write!(f, "too short for this rule"),
            SpanProblem::Untranslatable => write!(f, "cannot be mapped to a byte offset"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("No fix rule registered for {0}")]
    UnknownRuleKind(ViolationKind),

    #[error("No built-in alias for `{text}` at offset {start}")]
    UnmappedAlias { start: usize, text: String },

    #[error("Malformed span {span} in text of length {text_len}: {problem}")]
    MalformedSpan {
        span: Span,
        text_len: usize,
        problem: SpanProblem,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8", path.display())]
    NotUtf8 { path: PathBuf },

    #[error("{} changed on disk while it was being patched", path.display())]
    ConcurrentModification { path: PathBuf },
}

impl PatchError {
    fn from_rule(err: RuleError, span: Span, text_len: usize) -> Self {
        match err {
            RuleError::UnknownRuleKind(kind) => PatchError::UnknownRuleKind(kind),
            RuleError::UnmappedAlias { start, text } => PatchError::UnmappedAlias { start, text },
            RuleError::SpanTooShort { span } => PatchError::MalformedSpan {
                span,
                text_len,
                problem: SpanProblem::TooShort,
            },
            RuleError::Edit(other) => PatchError::from_edit(other, span, text_len),
        }
    }

    fn from_edit(err: EditError, span: Span, text_len: usize) -> Self {
        match err {
            EditError::Io { path, source } => PatchError::Io { path, source },
            EditError::NotUtf8 { path } => PatchError::NotUtf8 { path },
            EditError::ConcurrentModification { path } => PatchError::ConcurrentModification { path },
            EditError::NotCharBoundary { .. } => PatchError::MalformedSpan {
                span,
                text_len,
                problem: SpanProblem::NotCharBoundary,
            },
            EditError::InvalidRange { .. } => PatchError::MalformedSpan {
                span,
                text_len,
                problem: SpanProblem::OutOfBounds,
            },
        }
    }
}

impl From<EditError> for PatchError {
    /// File-level conversion; range errors carry no span context here.
    fn from(err: EditError) -> Self {
        match err {
            EditError::InvalidRange { start, end, len } => PatchError::MalformedSpan {
                span: Span::from_range(start, end),
                text_len: len,
                problem: SpanProblem::OutOfBounds,
            },
            other => PatchError::from_edit(other, Span::default(), 0),
        }
    }
}

impl From<RuleError> for PatchError {
    fn from(err: RuleError) -> Self {
        PatchError::from_rule(err, Span::default(), 0)
    }
}

/// One span paired with the rule that fixes it.
#[derive(Debug, Clone, Copy)]
struct Pending<'r> {
    span: Span,
    rule: &'r FixRule,
}

/// Apply `rule` to every violation of a batch and return the corrected text.
///
/// All spans must refer to `original`. The rule is applied to every span
/// given, whatever kind the violation record carries. An empty batch returns
/// `original` unchanged.
pub fn apply_batch(original: &str, violations: &[Violation], rule: &FixRule) -> Result<String, PatchError> {
    let pending = violations
        .iter()
        .map(|violation| Pending {
            span: violation.span,
            rule,
        })
        .collect();
    apply_pending(original, pending)
}

/// Apply violations of possibly different kinds against one snapshot.
///
/// Each violation is fixed by its own kind's rule from `table`.
pub fn apply_violations(original: &str, violations: &[Violation], table: &RuleTable) -> Result<String, PatchError> {
    let pending = violations
        .iter()
        .map(|violation| {
            Ok(Pending {
                span: violation.span,
                rule: table.lookup(violation.kind)?,
            })
        })
        .collect::<Result<Vec<_>, RuleError>>()?;
    apply_pending(original, pending)
}

/// Fix every `kind` violation of `file` in `text`, without touching the file system.
///
/// Violations of other kinds or other files are ignored.
pub fn fix_one(
    table: &RuleTable,
    kind: ViolationKind,
    file: &Path,
    text: &str,
    violations: &[Violation],
) -> Result<String, PatchError> {
    let rule = table.lookup(kind)?;
    let batch: Vec<Violation> = violations
        .iter()
        .filter(|violation| violation.kind == kind && violation.belongs_to(file))
        .cloned()
        .collect();
    apply_batch(text, &batch, rule)
}

fn apply_pending(original: &str, mut pending: Vec<Pending<'_>>) -> Result<String, PatchError> {
    if pending.is_empty() {
        return Ok(original.to_string());
    }

    sort_and_validate(original, &mut pending)?;

    let mut buffer = original.to_string();
    for item in pending.iter().rev() {
        let text_len = buffer.len();
        let replacement = item
            .rule
            .replacement(&buffer, item.span)
            .map_err(|err| PatchError::from_rule(err, item.span, text_len))?;
        replacement
            .splice_into(&mut buffer)
            .map_err(|err| PatchError::from_edit(err, item.span, text_len))?;
    }

    Ok(buffer)
}

/// Sort ascending by `(start, end, kind)` and reject spans the batch cannot
/// honour. The caller walks the result in reverse.
fn sort_and_validate(text: &str, pending: &mut [Pending<'_>]) -> Result<(), PatchError> {
    let text_len = text.len();
    let malformed = |span: Span, problem: SpanProblem| PatchError::MalformedSpan {
        span,
        text_len,
        problem,
    };

    for item in pending.iter() {
        let span = item.span;
        if span.end() > text_len {
            return Err(malformed(span, SpanProblem::OutOfBounds));
        }
        if !text.is_char_boundary(span.start) || !text.is_char_boundary(span.end()) {
            return Err(malformed(span, SpanProblem::NotCharBoundary));
        }
    }

    pending.sort_by(|a, b| {
        a.span
            .start
            .cmp(&b.span.start)
            .then(a.span.end().cmp(&b.span.end()))
            .then(a.rule.kind().cmp(&b.rule.kind()))
    });

    for (index, item) in pending.iter().enumerate() {
        for earlier in pending[..index].iter().rev() {
            if earlier.span.start != item.span.start {
                break;
            }
            if earlier.rule.kind() == item.rule.kind() {
                return Err(malformed(item.span, SpanProblem::DuplicateStart));
            }
        }
    }

    for window in pending.windows(2) {
        let (left, right) = (window[0].span, window[1].span);
        if right.start < left.end() {
            return Err(malformed(right, SpanProblem::Overlaps(left)));
        }
    }

    Ok(())
}

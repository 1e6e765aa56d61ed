//! Diagnostics providers: the boundary between the patch engine and whatever
//! analyzer produces violations.
//!
//! A provider is asked for one kind at a time. Offsets it returns must refer
//! to the files as they are on disk at call time, which is why the
//! orchestrator asks again before every kind instead of once per run.
//!
//! Three providers ship with the crate:
//!
//! 1. [`CannedProvider`]: fixed in-memory records, mainly a test double
//! 2. [`ReportProvider`]: JSON reports produced ahead of time
//! 3. [`CommandProvider`]: an external analyzer run once per kind

pub mod canned;
pub mod command;
pub mod report;

pub use canned::CannedProvider;
pub use command::CommandProvider;
pub use report::ReportProvider;

use crate::violation::{Span, Violation, ViolationKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Supplies the violations of one kind against the current on-disk text.
pub trait DiagnosticsProvider {
    fn violations(&mut self, kind: ViolationKind) -> Result<Vec<Violation>, ProviderError>;
}

impl<P: DiagnosticsProvider + ?Sized> DiagnosticsProvider for Box<P> {
    fn violations(&mut self, kind: ViolationKind) -> Result<Vec<Violation>, ProviderError> {
        (**self).violations(kind)
    }
}

impl<P: DiagnosticsProvider + ?Sized> DiagnosticsProvider for &mut P {
    fn violations(&mut self, kind: ViolationKind) -> Result<Vec<Violation>, ProviderError> {
        (**self).violations(kind)
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse diagnostics from {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to walk report directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to run analyzer `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Analyzer `{command}` exited with {status} and reported nothing: {stderr}")]
    AnalyzerFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Invalid record for {id} in {}: end {end} precedes start {start}", path.display())]
    InvalidRecord {
        id: String,
        path: PathBuf,
        start: usize,
        end: usize,
    },
}

/// One diagnostic as analyzers serialize it.
///
/// `id` may be a rule id (`SA1028`) or a slug (`trailing-whitespace`). The
/// span is `start` plus either `end` or `length`; `end` wins if both are set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub id: String,
    pub path: PathBuf,
    pub start: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
    #[serde(default, alias = "len", skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
}

impl DiagnosticRecord {
    pub fn kind(&self) -> Option<ViolationKind> {
        self.id.parse().ok()
    }

    pub fn span(&self) -> Result<Span, ProviderError> {
        match (self.end, self.length) {
            (Some(end), _) if end < self.start => Err(ProviderError::InvalidRecord {
                id: self.id.clone(),
                path: self.path.clone(),
                start: self.start,
                end,
            }),
            (Some(end), _) => Ok(Span::from_range(self.start, end)),
            (None, Some(length)) => Ok(Span::new(self.start, length)),
            (None, None) => Ok(Span::new(self.start, 0)),
        }
    }

    /// Path of the file, with relative paths resolved against `root`.
    pub fn resolved_path(&self, root: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            root.join(&self.path)
        }
    }
}

/// Accepted document shapes for a whole report.
#[derive(Deserialize)]
#[serde(untagged)]
enum ReportDocument {
    List(Vec<DiagnosticRecord>),
    Wrapped { diagnostics: Vec<DiagnosticRecord> },
}

/// Parse analyzer output into records.
///
/// A whole JSON document (array, or object with a `diagnostics` array) is
/// tried first. Otherwise the input is read as JSON lines, and lines that are
/// not JSON objects are skipped since analyzers mix progress output into stdout.
pub fn parse_records(input: &str, origin: &str) -> Result<Vec<DiagnosticRecord>, ProviderError> {
    let trimmed = input.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str::<ReportDocument>(trimmed)
            .map(|doc| match doc {
                ReportDocument::List(records) | ReportDocument::Wrapped { diagnostics: records } => records,
            })
            .map_err(|source| ProviderError::Json {
                origin: origin.to_string(),
                source,
            });
    }
    if let Ok(ReportDocument::Wrapped { diagnostics }) = serde_json::from_str::<ReportDocument>(trimmed) {
        return Ok(diagnostics);
    }

    let mut records = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        if !line.starts_with('{') {
            continue;
        }
        match serde_json::from_str::<DiagnosticRecord>(line) {
            Ok(record) => records.push(record),
            Err(err) => tracing::debug!(origin, %err, "skipping non-diagnostic line"),
        }
    }
    Ok(records)
}

/// Keep the records of `kind` and turn them into violations.
pub fn select<'a>(
    records: impl IntoIterator<Item = &'a DiagnosticRecord>,
    kind: ViolationKind,
    root: &Path,
) -> Result<Vec<Violation>, ProviderError> {
    let mut violations = Vec::new();
    for record in records {
        match record.kind() {
            Some(found) if found == kind => violations.push(Violation {
                kind,
                file: record.resolved_path(root),
                span: record.span()?,
            }),
            Some(_) => {}
            None => tracing::debug!(id = %record.id, "ignoring diagnostic outside the fix catalog"),
        }
    }
    Ok(violations)
}

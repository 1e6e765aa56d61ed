//! Batch orchestration across kinds and files.
//!
//! Kinds run in catalog priority order. For each kind the provider is asked
//! afresh, so its offsets describe the files as the previous kind left them.
//! Within a kind, violations are grouped per file and each file is patched as
//! one back-to-front batch against a single snapshot.
//!
//! Failures are scoped to one (file, kind) pair: they are recorded in the
//! report and the run moves on to the next file.

use crate::edit::{FileSnapshot, WriteOutcome};
use crate::offsets::OffsetEncoding;
use crate::patch::{apply_batch, PatchError, SpanProblem};
use crate::provider::{DiagnosticsProvider, ProviderError};
use crate::rules::RuleTable;
use crate::safety::{SafetyError, WorkspaceGuard};
use crate::violation::{Violation, ViolationKind};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixError {
    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("analysis failed: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Safety(#[from] SafetyError),
}

/// A failed (file, kind) pair. `file` is `None` when the analysis itself failed.
#[derive(Debug)]
pub struct Failure {
    pub kind: ViolationKind,
    pub file: Option<PathBuf>,
    pub error: FixError,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{} in {}: {}", self.kind.id(), file.display(), self.error),
            None => write!(f, "{}: {}", self.kind.id(), self.error),
        }
    }
}

/// Before and after text of one patched file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ViolationKind,
    pub before: String,
    pub after: String,
}

/// Outcome of one kind pass.
#[derive(Debug)]
pub struct KindReport {
    pub kind: ViolationKind,
    /// Violations the provider reported
    pub found: usize,
    /// Violations whose batch was applied
    pub fixed: usize,
    pub files_changed: usize,
    pub failures: Vec<Failure>,
    /// Filled only when [`FixOptions::capture_changes`] is set
    pub changes: Vec<FileChange>,
}

impl KindReport {
    fn new(kind: ViolationKind) -> Self {
        Self {
            kind,
            found: 0,
            fixed: 0,
            files_changed: 0,
            failures: Vec::new(),
            changes: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
#[must_use = "FixReport carries failures that should be reported"]
pub struct FixReport {
    pub kinds: Vec<KindReport>,
}

impl FixReport {
    /// Total number of violations fixed.
    pub fn fixed(&self) -> usize {
        self.kinds.iter().map(|k| k.fixed).sum()
    }

    pub fn found(&self) -> usize {
        self.kinds.iter().map(|k| k.found).sum()
    }

    pub fn files_changed(&self) -> usize {
        self.kinds.iter().map(|k| k.files_changed).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &Failure> {
        self.kinds.iter().flat_map(|k| k.failures.iter())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn changes(&self) -> impl Iterator<Item = &FileChange> {
        self.kinds.iter().flat_map(|k| k.changes.iter())
    }
}

#[derive(Debug, Clone)]
pub struct FixOptions {
    /// Kinds to run. Always executed in catalog order.
    pub kinds: Vec<ViolationKind>,
    /// Unit of the provider's offsets
    pub offsets: OffsetEncoding,
    /// Compute fixes without writing
    pub dry_run: bool,
    /// Keep before/after text of every changed file
    pub capture_changes: bool,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            kinds: ViolationKind::ALL.to_vec(),
            offsets: OffsetEncoding::Utf8,
            dry_run: false,
            capture_changes: false,
        }
    }
}

pub struct Orchestrator<'t, P> {
    rules: &'t RuleTable,
    provider: P,
    guard: Option<WorkspaceGuard>,
    options: FixOptions,
}

impl<'t, P: DiagnosticsProvider> Orchestrator<'t, P> {
    pub fn new(rules: &'t RuleTable, provider: P) -> Self {
        Self {
            rules,
            provider,
            guard: None,
            options: FixOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FixOptions) -> Self {
        self.options = options;
        self
    }

    /// Refuse files the guard rejects. Without a guard every path is accepted.
    pub fn with_guard(mut self, guard: WorkspaceGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Run every selected kind in priority order.
    pub fn fix_all(&mut self) -> FixReport {
        let selected: Vec<ViolationKind> = ViolationKind::ALL
            .into_iter()
            .filter(|kind| self.options.kinds.contains(kind))
            .collect();

        let mut report = FixReport::default();
        for kind in selected {
            report.kinds.push(self.fix_kind(kind));
        }
        report
    }

    /// Analyze and fix one kind across all files.
    ///
    /// Every file of this kind is written before the call returns.
    pub fn fix_kind(&mut self, kind: ViolationKind) -> KindReport {
        let mut report = KindReport::new(kind);

        let violations = match self.provider.violations(kind) {
            Ok(violations) => violations,
            Err(err) => {
                tracing::error!(kind = kind.id(), %err, "analysis failed");
                report.failures.push(Failure {
                    kind,
                    file: None,
                    error: err.into(),
                });
                return report;
            }
        };

        // Batches are keyed by canonical path so that one file reported under
        // two spellings is still patched against a single snapshot
        let mut by_file: BTreeMap<PathBuf, Vec<Violation>> = BTreeMap::new();
        let mut resolved: HashMap<PathBuf, Option<PathBuf>> = HashMap::new();
        for violation in violations {
            if violation.kind != kind {
                tracing::warn!(
                    requested = kind.id(),
                    got = violation.kind.id(),
                    "provider returned a violation of another kind; ignoring"
                );
                continue;
            }
            report.found += 1;

            let canonical = match resolved.get(&violation.file) {
                Some(entry) => entry.clone(),
                None => {
                    let entry = match self.resolve_path(&violation.file) {
                        Ok(path) => Some(path),
                        Err(err) => {
                            tracing::error!(
                                kind = kind.id(),
                                file = %violation.file.display(),
                                %err,
                                "cannot resolve file"
                            );
                            report.failures.push(Failure {
                                kind,
                                file: Some(violation.file.clone()),
                                error: err,
                            });
                            None
                        }
                    };
                    resolved.insert(violation.file.clone(), entry.clone());
                    entry
                }
            };

            if let Some(path) = canonical {
                by_file.entry(path).or_default().push(violation);
            }
        }

        tracing::info!(kind = kind.id(), found = report.found, files = by_file.len(), "fixing");

        for (file, batch) in by_file {
            match self.fix_file(kind, &file, &batch) {
                Ok(change) => {
                    report.fixed += batch.len();
                    if let Some(change) = change {
                        report.files_changed += 1;
                        if self.options.capture_changes {
                            report.changes.push(change);
                        }
                    }
                }
                Err(err) => {
                    tracing::error!(kind = kind.id(), file = %file.display(), %err, "batch aborted");
                    report.failures.push(Failure {
                        kind,
                        file: Some(file),
                        error: err,
                    });
                }
            }
        }

        report
    }

    /// Canonical form of `file`, checked by the guard when there is one.
    fn resolve_path(&self, file: &Path) -> Result<PathBuf, FixError> {
        match &self.guard {
            Some(guard) => Ok(guard.validate_path(file)?),
            None => fs::canonicalize(file).map_err(|source| {
                FixError::Patch(PatchError::Io {
                    path: file.to_path_buf(),
                    source,
                })
            }),
        }
    }

    /// Patch one file, given by its canonical path. Returns the change when the text differs.
    fn fix_file(&self, kind: ViolationKind, path: &Path, batch: &[Violation]) -> Result<Option<FileChange>, FixError> {
        let rule = self.rules.lookup(kind).map_err(PatchError::from)?;

        let snapshot = FileSnapshot::read(path).map_err(PatchError::from)?;
        let batch = translate(snapshot.text(), batch, self.options.offsets)?;
        let after = apply_batch(snapshot.text(), &batch, rule)?;

        if after == snapshot.text() {
            return Ok(None);
        }

        if self.options.dry_run {
            tracing::debug!(file = %path.display(), "dry run; not writing");
        } else if let WriteOutcome::Written { bytes } = snapshot.write(&after).map_err(PatchError::from)? {
            tracing::info!(kind = kind.id(), file = %path.display(), fixed = batch.len(), bytes, "wrote");
        }

        Ok(Some(FileChange {
            path: path.to_path_buf(),
            kind,
            before: snapshot.text().to_string(),
            after,
        }))
    }
}

/// Convert provider offsets into byte spans of `text`.
fn translate(text: &str, batch: &[Violation], offsets: OffsetEncoding) -> Result<Vec<Violation>, PatchError> {
    batch
        .iter()
        .map(|violation| {
            let span = offsets
                .to_byte_span(text, violation.span)
                .ok_or(PatchError::MalformedSpan {
                    span: violation.span,
                    text_len: text.len(),
                    problem: SpanProblem::Untranslatable,
                })?;
            Ok(Violation {
                span,
                ..violation.clone()
            })
        })
        .collect()
}

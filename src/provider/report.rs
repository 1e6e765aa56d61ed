use super::{parse_records, select, DiagnosticRecord, DiagnosticsProvider, ProviderError};
use crate::violation::{Violation, ViolationKind};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use xxhash_rust::xxh3::xxh3_64;

/// Provider backed by JSON reports written ahead of time.
///
/// A report describes the files as they were when it was produced. The
/// provider hashes every referenced file when the report is loaded; once a
/// file changes (typically because an earlier kind was fixed in it) its
/// remaining records are stale and are skipped with a warning. Re-running the
/// analyzer and the fixer picks them up. Records for files that could not be
/// read at load time are passed through so the read failure gets reported.
#[derive(Debug, Clone)]
pub struct ReportProvider {
    root: PathBuf,
    records: Vec<DiagnosticRecord>,
    hashes: HashMap<PathBuf, Option<u64>>,
}

impl ReportProvider {
    /// Load a report file, or every `*.json` file below a directory.
    pub fn load(report: impl AsRef<Path>, root: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        let report = report.as_ref();
        let mut records = Vec::new();
        for file in report_files(report)? {
            let content = fs::read_to_string(&file).map_err(|source| ProviderError::Io {
                path: file.clone(),
                source,
            })?;
            records.extend(parse_records(&content, &file.display().to_string())?);
        }
        Ok(Self::from_records(records, root))
    }

    /// Build from already parsed records, snapshotting the referenced files now.
    pub fn from_records(records: Vec<DiagnosticRecord>, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut hashes = HashMap::new();
        for record in &records {
            let path = record.resolved_path(&root);
            hashes.entry(path).or_insert_with_key(|path| hash_file(path));
        }
        tracing::debug!(records = records.len(), files = hashes.len(), "loaded diagnostics report");
        Self { root, records, hashes }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DiagnosticsProvider for ReportProvider {
    fn violations(&mut self, kind: ViolationKind) -> Result<Vec<Violation>, ProviderError> {
        let mut current: HashMap<PathBuf, bool> = HashMap::new();
        let mut fresh = Vec::new();

        for violation in select(&self.records, kind, &self.root)? {
            let recorded = self.hashes.get(&violation.file).copied().flatten();
            let unchanged = *current
                .entry(violation.file.clone())
                .or_insert_with_key(|path| recorded.is_none() || hash_file(path) == recorded);

            if unchanged {
                fresh.push(violation);
            } else {
                tracing::warn!(
                    file = %violation.file.display(),
                    kind = kind.id(),
                    start = violation.span.start,
                    "skipping stale diagnostic; file changed since the report was produced"
                );
            }
        }

        Ok(fresh)
    }
}

fn report_files(report: &Path) -> Result<Vec<PathBuf>, ProviderError> {
    if !report.is_dir() {
        return Ok(vec![report.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(report) {
        let entry = entry?;
        if entry.file_type().is_file() && entry.path().extension().and_then(|s| s.to_str()) == Some("json") {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn hash_file(path: &Path) -> Option<u64> {
    fs::read(path).ok().map(|bytes| xxh3_64(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A.cs"), "int a;  \n//x\n").unwrap();
        fs::write(dir.path().join("B.cs"), "int b; \n").unwrap();
        dir
    }

    #[test]
    fn test_load_single_report() {
        let dir = workspace();
        let report = dir.path().join("report.json");
        fs::write(
            &report,
            r#"[
                {"id": "SA1028", "path": "A.cs", "start": 6, "end": 8},
                {"id": "SA1028", "path": "B.cs", "start": 6, "end": 7},
                {"id": "SA1005", "path": "A.cs", "start": 9, "end": 12}
            ]"#,
        )
        .unwrap();

        let mut provider = ReportProvider::load(&report, dir.path()).unwrap();
        assert_eq!(provider.len(), 3);

        let whitespace = provider.violations(ViolationKind::TrailingWhitespace).unwrap();
        assert_eq!(whitespace.len(), 2);
        let comments = provider.violations(ViolationKind::CommentMissingSpace).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].file, dir.path().join("A.cs"));
    }

    #[test]
    fn test_load_directory_of_reports() {
        let dir = workspace();
        let reports = dir.path().join("reports");
        fs::create_dir(&reports).unwrap();
        fs::write(reports.join("a.json"), r#"[{"id":"SA1028","path":"A.cs","start":6,"end":8}]"#).unwrap();
        fs::write(reports.join("b.json"), r#"[{"id":"SA1028","path":"B.cs","start":6,"end":7}]"#).unwrap();
        fs::write(reports.join("notes.txt"), "ignored").unwrap();

        let provider = ReportProvider::load(&reports, dir.path()).unwrap();
        assert_eq!(provider.len(), 2);
    }

    #[test]
    fn test_stale_files_are_skipped() {
        let dir = workspace();
        let records = vec![
            DiagnosticRecord {
                id: "SA1028".into(),
                path: "A.cs".into(),
                start: 6,
                end: Some(8),
                length: None,
            },
            DiagnosticRecord {
                id: "SA1005".into(),
                path: "A.cs".into(),
                start: 9,
                end: Some(12),
                length: None,
            },
            DiagnosticRecord {
                id: "SA1005".into(),
                path: "B.cs".into(),
                start: 0,
                end: Some(0),
                length: None,
            },
        ];
        let mut provider = ReportProvider::from_records(records, dir.path());

        // Simulate an earlier pass rewriting A.cs
        fs::write(dir.path().join("A.cs"), "int a;\n//x\n").unwrap();

        let comments = provider.violations(ViolationKind::CommentMissingSpace).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].file, dir.path().join("B.cs"));
    }

    #[test]
    fn test_missing_report_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = ReportProvider::load(dir.path().join("nope.json"), dir.path()).unwrap_err();
        assert!(matches!(err, ProviderError::Io { .. }));
    }
}

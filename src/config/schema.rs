use crate::config::version::{catalog_satisfies, VersionError};
use crate::offsets::OffsetEncoding;
use crate::rules::Newline;
use crate::violation::{ViolationKind, CATALOG_VERSION};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Contents of a `stylefix.toml`. Every section is optional.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct FixerConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub workspace: WorkspaceSection,
    #[serde(default)]
    pub rules: RulesSection,
    #[serde(default)]
    pub analyzer: Option<AnalyzerSection>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    /// Semver requirement on the kind catalog (e.g. `^1`)
    #[serde(default)]
    pub catalog: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WorkspaceSection {
    /// Workspace root, relative to the config file
    #[serde(default)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RulesSection {
    /// Kinds to fix, by id or slug. Empty means the whole catalog.
    #[serde(default)]
    pub kinds: Vec<String>,
    #[serde(default)]
    pub newline: Newline,
    #[serde(default)]
    pub offsets: OffsetEncoding,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyzerSection {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    UnknownKind(String),
    DuplicateKind(ViolationKind),
    IncompatibleCatalog { requirement: String },
    Version(VersionError),
    EmptyCommand,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::UnknownKind(kind) => write!(f, "rules.kinds: unknown kind '{kind}'"),
            ValidationIssue::DuplicateKind(kind) => write!(f, "rules.kinds: {} listed twice", kind.id()),
            ValidationIssue::IncompatibleCatalog { requirement } => write!(
                f,
                "meta.catalog: requirement '{requirement}' does not match catalog {CATALOG_VERSION}"
            ),
            ValidationIssue::Version(err) => write!(f, "meta.catalog: {err}"),
            ValidationIssue::EmptyCommand => write!(f, "analyzer.command must not be empty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationError {}

impl FixerConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        match catalog_satisfies(self.meta.catalog.as_deref()) {
            Ok(true) => {}
            Ok(false) => issues.push(ValidationIssue::IncompatibleCatalog {
                requirement: self.meta.catalog.clone().unwrap_or_default(),
            }),
            Err(err) => issues.push(ValidationIssue::Version(err)),
        }

        let mut seen = Vec::new();
        for name in &self.rules.kinds {
            match name.parse::<ViolationKind>() {
                Ok(kind) if seen.contains(&kind) => issues.push(ValidationIssue::DuplicateKind(kind)),
                Ok(kind) => seen.push(kind),
                Err(_) => issues.push(ValidationIssue::UnknownKind(name.clone())),
            }
        }

        if let Some(analyzer) = &self.analyzer {
            if analyzer.command.trim().is_empty() {
                issues.push(ValidationIssue::EmptyCommand);
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Kinds to fix, in catalog priority order regardless of listing order.
    pub fn kinds(&self) -> Vec<ViolationKind> {
        if self.rules.kinds.is_empty() {
            return ViolationKind::ALL.to_vec();
        }
        let listed: Vec<ViolationKind> = self.rules.kinds.iter().filter_map(|name| name.parse().ok()).collect();
        ViolationKind::ALL.into_iter().filter(|kind| listed.contains(kind)).collect()
    }

    /// Workspace root resolved against the directory holding the config file.
    pub fn root(&self, config_dir: &Path) -> PathBuf {
        match &self.workspace.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => config_dir.join(root),
            None => config_dir.to_path_buf(),
        }
    }
}

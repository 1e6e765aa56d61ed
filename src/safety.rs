use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Directory names holding build output; files below them are regenerated by
/// the build and must not be fixed in place.
const BUILD_OUTPUT_DIRS: [&str; 2] = ["bin", "obj"];

/// Keeps the fixer inside one workspace.
///
/// Diagnostics sometimes point at generated sources or at package caches;
/// rewriting those is at best useless. Every file the orchestrator is about to
/// touch goes through [`WorkspaceGuard::validate_path`] first.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Canonical workspace root
    workspace_root: PathBuf,
    /// Canonical directories outside the build tree that are never edited
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside workspace: {} (workspace: {})", path.display(), workspace.display())]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is in forbidden directory: {} (forbidden: {})", path.display(), forbidden.display())]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Failed to canonicalize {}: {source}", path.display())]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceGuard {
    /// Create a guard rooted at `workspace_root`.
    ///
    /// The NuGet package cache (`~/.nuget/packages`) is always forbidden, as
    /// are `bin/` and `obj/` directories anywhere below the root.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let workspace_root = canonicalize(workspace_root.as_ref())?;

        let mut forbidden_paths = Vec::new();
        if let Some(home) = home::home_dir() {
            if let Ok(packages) = home.join(".nuget/packages").canonicalize() {
                forbidden_paths.push(packages);
            }
        }

        Ok(Self {
            workspace_root,
            forbidden_paths,
        })
    }

    /// Add an extra forbidden directory.
    pub fn forbid(mut self, path: impl AsRef<Path>) -> Result<Self, SafetyError> {
        self.forbidden_paths.push(canonicalize(path.as_ref())?);
        Ok(self)
    }

    /// Check that `path` may be edited and return its canonical form.
    ///
    /// Relative paths are resolved against the workspace root.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };

        let canonical = canonicalize(&absolute)?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        let Ok(relative) = canonical.strip_prefix(&self.workspace_root) else {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical.to_path_buf(),
                workspace: self.workspace_root.clone(),
            });
        };

        let mut prefix = self.workspace_root.clone();
        for component in relative.parent().into_iter().flat_map(Path::components) {
            if let Component::Normal(name) = component {
                prefix.push(name);
                if BUILD_OUTPUT_DIRS.iter().any(|dir| name == *dir) {
                    return Err(SafetyError::ForbiddenPath {
                        path: canonical.to_path_buf(),
                        forbidden: prefix,
                    });
                }
            }
        }

        for forbidden in &self.forbidden_paths {
            if canonical.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.to_path_buf(),
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize().map_err(|source| SafetyError::Canonicalize {
        path: path.to_path_buf(),
        source,
    })
}

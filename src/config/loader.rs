use crate::config::schema::{FixerConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config file name looked up in the workspace root.
pub const CONFIG_FILE_NAME: &str = "stylefix.toml";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config from {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(f, "failed to parse config TOML ({}): {}", path.display(), source),
                None => write!(f, "failed to parse config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid config ({}): {}", path.display(), source),
                None => write!(f, "invalid config: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<FixerConfig, ConfigError> {
    let config: FixerConfig =
        toml_edit::de::from_str(input).map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<FixerConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Load `stylefix.toml` from `dir` if present; defaults otherwise.
pub fn load_or_default(dir: &Path) -> Result<FixerConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.is_file() {
        load_from_path(&path)
    } else {
        Ok(FixerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ValidationIssue;
    use crate::offsets::OffsetEncoding;
    use crate::rules::Newline;
    use crate::violation::ViolationKind;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = load_from_str("").unwrap();
        assert_eq!(config.kinds(), ViolationKind::ALL.to_vec());
        assert_eq!(config.rules.newline, Newline::Auto);
        assert_eq!(config.rules.offsets, OffsetEncoding::Utf8);
        assert!(config.analyzer.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = load_from_str(
            r#"
[meta]
catalog = "^1"

[workspace]
root = "src"

[rules]
kinds = ["trailing-whitespace", "SA1005"]
newline = "crlf"
offsets = "utf16"

[analyzer]
command = "style-analyzer"
args = ["--rule", "{id}"]
"#,
        )
        .unwrap();

        // Catalog order, not listing order
        assert_eq!(
            config.kinds(),
            vec![ViolationKind::CommentMissingSpace, ViolationKind::TrailingWhitespace]
        );
        assert_eq!(config.rules.newline, Newline::Crlf);
        assert_eq!(config.rules.offsets, OffsetEncoding::Utf16);
        assert_eq!(config.root(Path::new("/repo")), PathBuf::from("/repo/src"));
        let analyzer = config.analyzer.unwrap();
        assert_eq!(analyzer.command, "style-analyzer");
        assert_eq!(analyzer.args, vec!["--rule", "{id}"]);
    }

    #[test]
    fn test_validation_collects_all_issues() {
        let err = load_from_str(
            r#"
[meta]
catalog = "^2"

[rules]
kinds = ["SA1028", "trailing-whitespace", "SA0000"]

[analyzer]
command = "  "
"#,
        )
        .unwrap_err();

        let ConfigError::Validation { source, .. } = err else {
            panic!("expected validation error, got {err}");
        };
        assert_eq!(
            source.issues,
            vec![
                ValidationIssue::IncompatibleCatalog {
                    requirement: "^2".to_string()
                },
                ValidationIssue::DuplicateKind(ViolationKind::TrailingWhitespace),
                ValidationIssue::UnknownKind("SA0000".to_string()),
                ValidationIssue::EmptyCommand,
            ]
        );
    }

    #[test]
    fn test_bad_enum_value_is_toml_error() {
        let err = load_from_str("[rules]\nnewline = \"cr\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn test_load_from_path_attaches_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[rules]\nkinds = [\"nope\"]\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(dir.path()).unwrap();
        assert!(config.rules.kinds.is_empty());
    }
}

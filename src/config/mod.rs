pub mod loader;
pub mod schema;
pub mod version;

pub use loader::{load_from_path, load_from_str, load_or_default, ConfigError, CONFIG_FILE_NAME};
pub use schema::{
    AnalyzerSection, FixerConfig, Metadata, RulesSection, ValidationError, ValidationIssue, WorkspaceSection,
};
pub use version::{catalog_satisfies, matches_requirement, VersionError};

//! stylefix: applies analyzer-reported C# style violations as in-place text edits
//!
//! An external analyzer reports violations as byte spans. For each violation
//! kind a [`FixRule`] says how the span is consumed and what replaces it. The
//! [`Orchestrator`] asks a [`DiagnosticsProvider`] for one kind at a time,
//! patches every affected file and writes it back before moving to the next
//! kind, so offsets are always taken against the current text.
//!
//! # Architecture
//!
//! All fixes compile down to one primitive: a [`Replacement`] of a byte range.
//! Per file, a batch of replacements is applied back-to-front against a single
//! snapshot ([`patch::apply_batch`]), so no offset needs adjusting.
//!
//! # Safety
//!
//! - Atomic file writes (tempfile + fsync + rename)
//! - Files changed on disk since they were read are not overwritten
//! - Workspace boundary enforcement, build output never touched
//! - Spans must lie on UTF-8 character boundaries
//!
//! # Example
//!
//! ```
//! use stylefix::{fix_one, Newline, RuleTable, Violation, ViolationKind};
//! use std::path::Path;
//!
//! let table = RuleTable::standard(Newline::Lf);
//! let text = "int x = (a + b);   \n";
//! let violations = [Violation::new(ViolationKind::TrailingWhitespace, "A.cs", 16, 3)];
//!
//! let fixed = fix_one(&table, ViolationKind::TrailingWhitespace, Path::new("A.cs"), text, &violations).unwrap();
//! assert_eq!(fixed, "int x = (a + b);\n");
//! ```

pub mod config;
pub mod edit;
pub mod offsets;
pub mod orchestrator;
pub mod patch;
pub mod provider;
pub mod rules;
pub mod safety;
pub mod violation;

// Re-exports
pub use config::{load_from_path, load_from_str, load_or_default, ConfigError, FixerConfig};
pub use edit::{EditError, FileSnapshot, Replacement, WriteOutcome};
pub use offsets::OffsetEncoding;
pub use orchestrator::{Failure, FileChange, FixError, FixOptions, FixReport, KindReport, Orchestrator};
pub use patch::{apply_batch, apply_violations, fix_one, PatchError, SpanProblem};
pub use provider::{CannedProvider, CommandProvider, DiagnosticsProvider, ProviderError, ReportProvider};
pub use rules::{FixRule, Newline, RuleError, RuleTable, SpanConsumption, Transform};
pub use safety::{SafetyError, WorkspaceGuard};
pub use violation::{Span, Violation, ViolationKind, CATALOG_VERSION};

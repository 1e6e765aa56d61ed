use super::{parse_records, select, DiagnosticsProvider, ProviderError};
use crate::violation::{Violation, ViolationKind};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Provider that runs an external analyzer once per violation kind.
///
/// Arguments may contain the placeholders `{id}` (rule id such as `SA1028`),
/// `{kind}` (slug such as `trailing-whitespace`) and `{root}` (workspace
/// root). The analyzer runs in the workspace root and must print diagnostics
/// as JSON (a document or JSON lines) on stdout; anything else it prints is
/// ignored.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
    root: PathBuf,
}

impl CommandProvider {
    pub fn new(program: impl Into<String>, args: Vec<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            root: root.into(),
        }
    }

    /// The argument list for one kind, with placeholders substituted.
    pub fn args_for(&self, kind: ViolationKind) -> Vec<String> {
        let root = self.root.display().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{id}", kind.id())
                    .replace("{kind}", kind.slug())
                    .replace("{root}", &root)
            })
            .collect()
    }

    fn describe(&self, args: &[String]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl DiagnosticsProvider for CommandProvider {
    fn violations(&mut self, kind: ViolationKind) -> Result<Vec<Violation>, ProviderError> {
        let args = self.args_for(kind);
        let command = self.describe(&args);
        tracing::info!(%command, "running analyzer for {}", kind.id());

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| ProviderError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let records = parse_records(&stdout, &command)?;

        // Analyzers commonly exit non-zero when they find violations; only an
        // exit failure with nothing on stdout is treated as a broken run
        if !output.status.success() && records.is_empty() {
            return Err(ProviderError::AnalyzerFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        select(&records, kind, &self.root)
    }
}

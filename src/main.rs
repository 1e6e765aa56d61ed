use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;
use stylefix::config::{load_from_path, load_or_default, FixerConfig};
use stylefix::{
    CommandProvider, DiagnosticsProvider, FixOptions, FixReport, Newline, OffsetEncoding, Orchestrator,
    ReportProvider, RuleTable, ViolationKind, WorkspaceGuard, CATALOG_VERSION,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stylefix")]
#[command(about = "Apply analyzer-reported C# style fixes in place", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG applies otherwise
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fix violations in place, one kind at a time
    Fix {
        #[command(flatten)]
        source: SourceArgs,

        /// Dry run - compute fixes without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Report violation counts without writing; exits 1 if any are found
    Check {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// List the kind catalog
    Rules,
}

#[derive(Args)]
struct SourceArgs {
    /// Workspace root (defaults to the config's root, then the current directory)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Config file (defaults to stylefix.toml in the workspace)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON diagnostics report, or a directory of reports
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Only fix these kinds (id or slug); repeatable
    #[arg(short, long = "kind")]
    kinds: Vec<ViolationKind>,

    /// Offset unit of the diagnostics (utf8 or utf16)
    #[arg(long)]
    offsets: Option<OffsetEncoding>,

    /// Line terminator for inserted lines (auto, lf or crlf)
    #[arg(long)]
    newline: Option<Newline>,
}

/// Everything a run needs, after merging CLI flags over the config file.
struct Setup {
    root: PathBuf,
    config: FixerConfig,
    kinds: Vec<ViolationKind>,
    offsets: OffsetEncoding,
    newline: Newline,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Fix {
            source,
            dry_run,
            diff,
        } => cmd_fix(source, dry_run, diff),

        Commands::Check { source } => cmd_check(source),

        Commands::Rules => cmd_rules(),
    }
}

fn init_tracing(verbose: u8) -> Result<()> {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stylefix=info")),
        1 => EnvFilter::new("stylefix=debug"),
        _ => EnvFilter::new("stylefix=trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}

fn resolve(source: &SourceArgs) -> Result<Setup> {
    let (config, config_dir) = match &source.config {
        Some(path) => {
            let config = load_from_path(path)?;
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (config, dir)
        }
        None => {
            let dir = match &source.workspace {
                Some(workspace) => workspace.clone(),
                None => env::current_dir().context("failed to read current directory")?,
            };
            (load_or_default(&dir)?, dir)
        }
    };

    let root = match &source.workspace {
        Some(workspace) => workspace.clone(),
        None => config.root(&config_dir),
    };
    if !root.is_dir() {
        bail!("Workspace root {} is not a directory", root.display());
    }

    let kinds = if source.kinds.is_empty() {
        config.kinds()
    } else {
        source.kinds.clone()
    };
    let offsets = source.offsets.unwrap_or(config.rules.offsets);
    let newline = source.newline.unwrap_or(config.rules.newline);

    Ok(Setup {
        root,
        config,
        kinds,
        offsets,
        newline,
    })
}

/// `--report` wins over the configured analyzer.
fn build_provider(source: &SourceArgs, setup: &Setup) -> Result<Box<dyn DiagnosticsProvider>> {
    if let Some(report) = &source.report {
        let provider = ReportProvider::load(report, &setup.root)
            .with_context(|| format!("failed to load report {}", report.display()))?;
        tracing::info!(records = provider.len(), report = %report.display(), "loaded report");
        return Ok(Box::new(provider));
    }

    if let Some(analyzer) = &setup.config.analyzer {
        tracing::info!(command = %analyzer.command, "using configured analyzer");
        return Ok(Box::new(CommandProvider::new(
            &analyzer.command,
            analyzer.args.clone(),
            &setup.root,
        )));
    }

    bail!("No diagnostics source: pass --report or configure [analyzer] in stylefix.toml")
}

fn run(source: &SourceArgs, dry_run: bool, capture_changes: bool) -> Result<FixReport> {
    let setup = resolve(source)?;
    let provider = build_provider(source, &setup)?;
    let guard = WorkspaceGuard::new(&setup.root)?;
    let table = RuleTable::standard(setup.newline);

    println!("Workspace: {}", guard.workspace_root().display());
    println!("Catalog: {}", CATALOG_VERSION);
    println!();

    let report = Orchestrator::new(&table, provider)
        .with_guard(guard)
        .with_options(FixOptions {
            kinds: setup.kinds.clone(),
            offsets: setup.offsets,
            dry_run,
            capture_changes,
        })
        .fix_all();

    Ok(report)
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("\n{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (fixed)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn print_failures(report: &FixReport) {
    for failure in report.failures() {
        eprintln!("{} {}", "✗".red(), failure);
    }
}

fn cmd_fix(source: SourceArgs, dry_run: bool, show_diff: bool) -> Result<()> {
    let started = Instant::now();
    let report = run(&source, dry_run, show_diff)?;

    if dry_run {
        println!("{}", "[DRY RUN - no files written]".cyan());
    }

    for kind in &report.kinds {
        let marker = if !kind.failures.is_empty() {
            "✗".red()
        } else if kind.fixed > 0 {
            "✓".green()
        } else {
            "⊙".yellow()
        };
        println!(
            "{} {} ({}): {} found, {} fixed in {} file(s)",
            marker,
            kind.kind.id(),
            kind.kind.slug(),
            kind.found,
            kind.fixed,
            kind.files_changed
        );
    }

    if show_diff {
        for change in report.changes() {
            display_diff(&change.path, &change.before, &change.after);
        }
    }

    print_failures(&report);

    let failed = report.failures().count();
    println!();
    println!("{}", "Summary:".bold());
    println!("  {} fixed", format!("{}", report.fixed()).green());
    println!("  {} file(s) changed", format!("{}", report.files_changed()).cyan());
    println!("  {} failed", format!("{}", failed).red());
    println!("Finished in {:.2} seconds", started.elapsed().as_secs_f64());

    if report.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_check(source: SourceArgs) -> Result<()> {
    let started = Instant::now();
    let report = run(&source, true, false)?;

    for kind in &report.kinds {
        let marker = if kind.found == 0 { "✓".green() } else { "✗".red() };
        println!("{} {} ({}): {}", marker, kind.kind.id(), kind.kind.slug(), kind.found);
    }

    print_failures(&report);

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} violation(s)", format!("{}", report.found()).yellow());
    println!("Finished in {:.2} seconds", started.elapsed().as_secs_f64());

    if report.found() > 0 || report.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_rules() -> Result<()> {
    let table = RuleTable::standard(Newline::Auto);

    println!("{} {}", "Catalog".bold(), CATALOG_VERSION);
    for rule in table.iter() {
        let kind = rule.kind();
        println!(
            "  {:<8} {:<32} {}",
            kind.id().cyan(),
            kind.slug(),
            rule.consumption().to_string().dimmed()
        );
    }

    Ok(())
}

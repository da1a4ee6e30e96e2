//! bundle-namespace - namespace registry and lockfile tools
//!
//! Usage:
//!   bundle-namespace check                 # Validate the lockfile
//!   bundle-namespace show                  # Print the locked namespaces
//!   bundle-namespace lock --declarations ns.toml --resolved specs.json
//!   bundle-namespace which <PACKAGE>       # Namespace of a package

mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bundle_namespace_core::config::ConfigStore;
use bundle_namespace_core::declaration::DeclarationManifest;
use bundle_namespace_core::source::identity_of;
use bundle_namespace_core::spec_lookup::load_resolved_specs;
use bundle_namespace_core::NamespaceSession;

use crate::report::{ConsoleSink, tree_lines};

#[derive(Parser)]
#[command(name = "bundle-namespace")]
#[command(about = "Namespace registry and lockfile tools", long_about = None)]
struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Lockfile path, overriding configuration
    #[arg(long, global = true)]
    lockfile: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the namespace lockfile
    ///
    /// Without --declarations, the registry is seeded from the lockfile
    /// itself, so only structural and version defects are reported.
    Check {
        /// TOML file of namespace declarations to validate against
        #[arg(long)]
        declarations: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Print the locked namespaces
    Show {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Write the namespace lockfile from declarations and resolved specs
    Lock {
        /// TOML file of namespace declarations
        #[arg(long)]
        declarations: PathBuf,

        /// JSON array of resolved specifications
        #[arg(long)]
        resolved: PathBuf,
    },

    /// Print the namespace a package is declared in
    Which {
        /// Package name
        package: String,

        /// Source URL (the default source when omitted)
        #[arg(long, short)]
        source: Option<String>,

        /// TOML file of namespace declarations (the lockfile when omitted)
        #[arg(long)]
        declarations: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
    /// Only show issues (non-zero exit if problems)
    Quiet,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bundle_namespace=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let project = match &cli.project {
        Some(project) => project.clone(),
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let session = open_session(&project, cli.lockfile.as_deref())?;

    match cli.command {
        Commands::Check {
            declarations,
            format,
        } => run_check(&session, declarations.as_deref(), format),
        Commands::Show { format } => run_show(&session, format),
        Commands::Lock {
            declarations,
            resolved,
        } => run_lock(&session, &declarations, &resolved),
        Commands::Which {
            package,
            source,
            declarations,
        } => run_which(&session, &package, source, declarations.as_deref()),
    }
}

fn open_session(project: &Path, lockfile: Option<&Path>) -> Result<NamespaceSession> {
    let store = ConfigStore::for_project(project);
    let mut config = store.load()?;
    if let Some(lockfile) = lockfile {
        config.lockfile_path = lockfile.to_path_buf();
    }
    let session = NamespaceSession::new(config, project);
    tracing::debug!(
        project = %project.display(),
        lockfile = %session.lockfile_path().display(),
        strict_mode = session.config().strict_mode,
        "Opened namespace session"
    );
    Ok(session)
}

/// Register declarations from a manifest, or replay the lockfile when none
/// is given.
fn populate(session: &NamespaceSession, declarations: Option<&Path>) -> Result<()> {
    match declarations {
        Some(path) => {
            let manifest = DeclarationManifest::load(path)?;
            session.apply_manifest(&manifest);
        }
        None => {
            // A broken lockfile is left for the validator to report.
            if let Ok(parsed) = session.reader().parse() {
                parsed.replay_into(session.registry());
            }
        }
    }
    Ok(())
}

fn run_check(
    session: &NamespaceSession,
    declarations: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    populate(session, declarations)?;
    let outcome = session.validate();

    match format {
        OutputFormat::Table => {
            println!("Lockfile: {}", session.lockfile_path().display());
            if !session.reader().exists() {
                println!("No namespace lockfile found.");
            }
            outcome.report(&mut ConsoleSink::new());
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "schema_version": 1,
                "lockfile": session.lockfile_path(),
                "exists": session.reader().exists(),
                "valid": outcome.is_valid(),
                "errors": outcome.errors,
                "warnings": outcome.warnings,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Quiet => outcome.report(&mut ConsoleSink::issues_only()),
    }

    if !outcome.is_valid() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_show(session: &NamespaceSession, format: OutputFormat) -> Result<()> {
    let document = session.reader().parse()?.into_document();

    match format {
        OutputFormat::Table => {
            println!("Lockfile: {}", session.lockfile_path().display());
            println!();
            if document.is_empty() {
                println!("No namespaces locked.");
                return Ok(());
            }
            for line in tree_lines(&document) {
                println!("{}", line);
            }
            println!();
            println!("Summary: {} packages locked", document.len());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        OutputFormat::Quiet => {}
    }
    Ok(())
}

fn run_lock(session: &NamespaceSession, declarations: &Path, resolved: &Path) -> Result<()> {
    session.seed_from_lockfile();
    let manifest = DeclarationManifest::load(declarations)?;
    session.apply_manifest(&manifest);

    let conflicts = session.check_conflicts()?;
    for conflict in &conflicts {
        println!(
            "Warning: package '{}' declared in multiple namespaces: {}",
            conflict.package,
            conflict.namespaces.join(", ")
        );
    }

    let specs = load_resolved_specs(resolved)?;
    if session.registry().is_empty() {
        println!("No namespaces declared; nothing to lock.");
        return Ok(());
    }
    if !session.write_lockfile(&specs) {
        anyhow::bail!(
            "Failed to write namespace lockfile: {}",
            session.lockfile_path().display()
        );
    }
    println!(
        "Locked {} namespaced packages to {}",
        session.registry().count(),
        session.lockfile_path().display()
    );
    Ok(())
}

fn run_which(
    session: &NamespaceSession,
    package: &str,
    source: Option<String>,
    declarations: Option<&Path>,
) -> Result<()> {
    populate(session, declarations)?;
    let source = identity_of(&source);

    match session.registry().namespace_of(source.as_str(), package)? {
        Some(namespace) => {
            println!("{}", namespace);
            Ok(())
        }
        None => anyhow::bail!(
            "Package '{}' is not declared in any namespace of {}",
            package,
            source
        ),
    }
}

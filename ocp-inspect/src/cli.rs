//!
//! This module implements the CLI interface for ocp-inspect: command parsing,
//! config resolution, and printing the aggregated YAML on stdout.
//!
//! All pipeline logic (OWNERS aggregation, MachineConfig decoding) lives in
//! the [`ocp-inspect-core`] crate. This module is CLI glue only.
//!
//! ## How To Use
//! - Command-line users: run the installed `ocp-inspect` binary with `--help`.
//! - Programmatic/integration use: call [`execute`] for the rendered output,
//!   or [`run`] to also print it.
//!
//! [`ocp-inspect-core`]: ../../ocp-inspect-core/
use crate::cluster::OcSource;
use crate::load_config::resolve_config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ocp_inspect_core::config::{InspectConfig, MissingConfigPolicy, Sections};
use ocp_inspect_core::contract::DocumentSource;
use ocp_inspect_core::machine_config::extract_from_source;
use ocp_inspect_core::owners::aggregate;
use ocp_inspect_core::source::{FileSource, InputLocation};
use ocp_inspect_core::yaml::to_yaml;
use std::path::PathBuf;

/// CLI for ocp-inspect: read-only inspection of OpenShift source trees and MachineConfigs.
#[derive(Parser)]
#[clap(
    name = "ocp-inspect",
    version,
    about = "Aggregate OWNERS files and dump decoded MachineConfig contents"
)]
pub struct Cli {
    /// Optional YAML config file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log verbosity on stderr (-v info, -vv debug)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index approvers and reviewers across every OWNERS file under ROOT
    Owners {
        /// Repository checkout to walk
        root: PathBuf,
    },
    /// Decode the files and systemd units embedded in MachineConfig documents
    MachineConfig {
        /// MachineConfig YAML/JSON file, or `-` for standard input
        #[clap(required_unless_present = "resource", conflicts_with = "resource")]
        input: Option<String>,

        /// Fetch the document with `oc get <RESOURCE> -o yaml` instead
        #[clap(long)]
        resource: Option<String>,

        /// Namespace passed to `oc` (overrides config)
        #[clap(long, requires = "resource")]
        namespace: Option<String>,

        /// Sections to extract: files, units or all
        #[clap(long, value_parser = ["files", "units", "all"])]
        section: Option<String>,

        /// Treat a MachineConfig without `spec.config` as empty instead of failing
        #[clap(long)]
        lenient: bool,
    },
}

/// Runs a command and returns the YAML it would print.
pub async fn execute(command: Commands, mut config: InspectConfig) -> Result<String> {
    match command {
        Commands::Owners { root } => {
            tracing::info!(command = "owners", root = %root.display(), "Starting OWNERS aggregation");
            let index = aggregate(&root, &config.owners)
                .with_context(|| format!("OWNERS aggregation failed for {}", root.display()))?;
            Ok(to_yaml(&index)?)
        }
        Commands::MachineConfig {
            input,
            resource,
            namespace,
            section,
            lenient,
        } => {
            if let Some(section) = section.as_deref() {
                config.machine_config.sections = Sections::from(section);
            }
            if lenient {
                config.machine_config.missing_config = MissingConfigPolicy::Empty;
            }
            if namespace.is_some() {
                config.cluster.namespace = namespace;
            }

            let source: Box<dyn DocumentSource> = match (resource, input) {
                (Some(resource), _) => Box::new(OcSource::new(&config.cluster, resource)),
                (None, Some(input)) => Box::new(FileSource::new(InputLocation::from(input.as_str()))),
                (None, None) => anyhow::bail!("either an input path or --resource is required"),
            };

            tracing::info!(
                command = "machine-config",
                sections = ?config.machine_config.sections,
                missing_config = ?config.machine_config.missing_config,
                "Starting MachineConfig extraction"
            );
            let extraction = extract_from_source(source.as_ref(), &config.machine_config)
                .await
                .context("MachineConfig extraction failed")?;
            Ok(to_yaml(&extraction)?)
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let config = resolve_config(cli.config.as_deref())?;
    let result = execute(cli.command, config).await;

    match result {
        Ok(rendered) => {
            print!("{rendered}");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            Err(e)
        }
    }
}

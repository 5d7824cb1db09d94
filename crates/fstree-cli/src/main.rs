//! fstree-cli - Command-line interface for the fstree toolkit
//!
//! This crate provides the `fstree` binary:
//! - Materializing trees from descriptor files or stdin
//! - Validating and normalizing descriptors
//! - Comparing two directory trees with a configurable rank chain

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use fstree_core::descriptor::parse_mode;
use fstree_core::rank::{build_chain, parse_kinds};
use fstree_core::{diff_trees, parse_file, parse_reader, Config, Materializer, Node};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Exit code for a diff that found discrepancies
const EXIT_DIFFERENT: i32 = 1;

/// Exit code for invalid command-line arguments
const EXIT_USAGE: i32 = 3;

/// fstree - Build file trees from descriptors and compare directory trees
#[derive(Parser)]
#[command(name = "fstree")]
#[command(author, version, long_about = None)]
#[command(about = "Build file trees from descriptors and compare directory trees")]
struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Configuration file
    #[arg(short, long, global = true, env = "FSTREE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the tree a descriptor describes
    Create {
        /// Descriptor file, or `-` for stdin
        descriptor: PathBuf,

        /// Directory to create the tree in
        #[arg(short, long)]
        root: PathBuf,

        /// Octal mode for directories that have no descriptor line
        #[arg(long)]
        dir_mode: Option<String>,
    },

    /// Validate a descriptor and print it in normalized form
    Parse {
        /// Descriptor file, or `-` for stdin
        descriptor: PathBuf,
    },

    /// Compare two directory trees
    Diff {
        /// Left tree
        left: PathBuf,

        /// Right tree
        right: PathBuf,

        /// Comma-separated rank chain (name, dir, size, perm, time, content)
        #[arg(short, long)]
        ranks: Option<String>,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config {
        /// Print a commented default configuration file
        #[arg(long)]
        default: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Error: {:#}", e);

            let exit_code = map_error_to_exit_code(&e);
            process::exit(exit_code);
        }
    }
}

fn run() -> Result<i32> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            return Ok(EXIT_USAGE);
        }
    };

    setup_logging(cli.verbose, cli.quiet);

    let config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(path) = &cli.config {
        debug!("Loaded configuration from {:?}", path);
    }

    match cli.command {
        Commands::Create {
            descriptor,
            root,
            dir_mode,
        } => {
            let nodes = read_descriptor(&descriptor)?;

            let mut materializer = Materializer::with_config(&root, &config.create);
            if let Some(text) = dir_mode {
                let mode = parse_mode(&text).map_err(|e| {
                    fstree_core::Error::Config(format!("invalid --dir-mode {:?}: {}", text, e))
                })?;
                materializer = materializer.default_dir_mode(mode);
            }

            if !root.exists() {
                fs::create_dir_all(&root)
                    .with_context(|| format!("Failed to create root {:?}", root))?;
            }

            materializer.materialize(&nodes)?;
            info!("Created {} entries under {:?}", nodes.len(), root);
        }

        Commands::Parse { descriptor } => {
            for node in read_descriptor(&descriptor)? {
                println!("{}", node);
            }
        }

        Commands::Diff {
            left,
            right,
            ranks,
            json,
        } => {
            let chain = match ranks {
                Some(list) => build_chain(&parse_kinds(&list)?),
                None => config.diff.chain()?,
            };
            let names: Vec<&str> = chain.iter().map(|rank| rank.name()).collect();
            debug!("Comparing {:?} with {:?} using {:?}", left, right, names);

            let report = diff_trees(&left, &right, &chain)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report);
            }

            if !report.is_empty() {
                info!("Found {} discrepancies", report.len());
                return Ok(EXIT_DIFFERENT);
            }
        }

        Commands::Config { default } => {
            if default {
                print!("{}", Config::default_config_content());
            } else {
                let ranks: Vec<String> = config
                    .diff
                    .ranks
                    .iter()
                    .map(|kind| format!("{:?}", kind.to_string()))
                    .collect();
                println!("[create]");
                println!("default_dir_mode = \"{:o}\"", config.create.default_dir_mode);
                println!();
                println!("[diff]");
                println!("ranks = [{}]", ranks.join(", "));
            }
        }
    }

    Ok(0)
}

/// Reads a descriptor from a file, or from stdin when the path is `-`
fn read_descriptor(path: &Path) -> Result<Vec<Node>> {
    let nodes = if path == Path::new("-") {
        parse_reader(io::stdin().lock())?
    } else {
        parse_file(path)?
    };
    debug!("Parsed {} descriptor lines", nodes.len());
    Ok(nodes)
}

/// Map errors to appropriate exit codes
///
/// Exit codes:
/// - 0: Trees equivalent, or command succeeded
/// - 1: Trees differ
/// - 2: IO error or unusable diff root
/// - 3: Invalid descriptor, configuration or arguments
/// - 4: Any other failure
fn map_error_to_exit_code(err: &anyhow::Error) -> i32 {
    if let Some(core_err) = err.downcast_ref::<fstree_core::Error>() {
        match core_err {
            fstree_core::Error::Io(_) => 2,
            fstree_core::Error::Fs { .. } => 2,
            fstree_core::Error::RootAccess { .. } => 2,
            fstree_core::Error::Walk(_) => 2,
            fstree_core::Error::Parse(_) => 3,
            fstree_core::Error::InvalidPath(_) => 3,
            fstree_core::Error::EmptyRankChain => 3,
            fstree_core::Error::UnknownRank(_) => 3,
            fstree_core::Error::Config(_) => 3,
        }
    } else if err.is::<std::io::Error>() {
        2
    } else {
        4
    }
}

//! # Vault Wizard CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `machines` - Print the machine table
//! - `validate` - Build and check the machine table
//! - `replay` - Run an event script against a fresh or resumed session
//! - `progress` - Print progress for a saved snapshot

mod commands;
mod script;

use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vault_wizard_core::WizardError;

pub use commands::*;
pub use script::{ScriptStep, load_script};

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Vault Wizard - guided-tour engine for the Vault console
///
/// Hosts wizard sessions over HTTP and replays event scripts offline.
#[derive(Parser, Debug)]
#[command(name = "vault-wizard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides the config file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print every machine with its states and events
    Machines,

    /// Build the machine table and report problems
    Validate,

    /// Replay an event script
    Replay {
        /// Path to the JSON script
        #[arg(short, long)]
        script: PathBuf,

        /// Resume from a saved snapshot instead of a fresh session
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Write the final state as a snapshot
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Show progress stored in a snapshot
    Progress {
        /// Path to the snapshot
        #[arg(short, long)]
        snapshot: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), WizardError> {
    let config = Config::load(cli.config.as_deref())?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(config, host, port).await,
        Some(Commands::Machines) => cmd_machines(json_mode),
        Some(Commands::Validate) | None => cmd_validate(json_mode),
        Some(Commands::Replay {
            script,
            resume,
            save,
        }) => cmd_replay(
            json_mode,
            cli.verbose,
            &script,
            resume.as_deref(),
            save.as_deref(),
        ),
        Some(Commands::Progress { snapshot }) => cmd_progress(json_mode, &snapshot),
    }
}

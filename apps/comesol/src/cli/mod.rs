//! # COMESOL CLI Module
//!
//! This module implements the CLI interface for the cadastro service.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `validate-cpf` - Check CPF numbers offline
//! - `check` - Check the backend connection
//! - `login` - Sign in and show where the user would land
//! - `view` - Sign in and print the saved registration

mod commands;

use crate::config::{BackendKind, Config};
use clap::{Parser, Subcommand};
use comesol_core::CadastroError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// COMESOL - annual registration of solidarity economy groups
#[derive(Parser, Debug)]
#[command(name = "comesol")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file (default: ./comesol.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend adapter, overriding the config file
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<BackendKind>,

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
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate one or more CPF numbers
    ValidateCpf {
        /// CPF numbers, with or without punctuation
        #[arg(required = true)]
        cpfs: Vec<String>,
    },

    /// Check the backend connection
    Check,

    /// Sign in and show the post-login destination
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Sign in and print the saved group and members
    View {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), CadastroError> {
    let json_mode = cli.json_mode;

    // CPF checks never touch the backend, so they skip config loading.
    if let Some(Commands::ValidateCpf { cpfs }) = &cli.command {
        return cmd_validate_cpf(cpfs, json_mode);
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(kind) = cli.backend {
        config.backend.kind = kind;
    }

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config).await
        }
        Some(Commands::Login { email, password }) => {
            cmd_login(&config, &email, &password, json_mode).await
        }
        Some(Commands::View { email, password }) => {
            cmd_view(&config, &email, &password, json_mode).await
        }
        Some(Commands::Check | Commands::ValidateCpf { .. }) | None => {
            cmd_check(&config, json_mode).await
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! # COMESOL - Cadastro Server
//!
//! The main binary for the COMESOL annual registration.
//!
//! This application provides:
//! - HTTP JSON API server (axum-based) for the front end
//! - CLI interface for connection checks, CPF checks and lookups
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  apps/comesol (THE BINARY)                │
//! │                                                           │
//! │   ┌─────────────┐      ┌─────────────┐                   │
//! │   │    CLI      │      │  HTTP API   │                   │
//! │   │   (clap)    │      │   (axum)    │                   │
//! │   └──────┬──────┘      └──────┬──────┘                   │
//! │          └─────────┬──────────┘                          │
//! │                    ▼                                     │
//! │         ┌─────────────────────┐     ┌──────────────────┐ │
//! │         │ RegistrationService │────►│ Backend (trait)  │ │
//! │         └──────────┬──────────┘     │ supabase/memory  │ │
//! │                    ▼                └──────────────────┘ │
//! │            ┌───────────────┐                             │
//! │            │ comesol-core  │                             │
//! │            │  (THE RULES)  │                             │
//! │            └───────────────┘                             │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server against Supabase
//! COMESOL_SUPABASE_URL=... COMESOL_SUPABASE_ANON_KEY=... comesol server
//!
//! # Try it without a backend
//! comesol --backend memory server --port 8080
//!
//! # CLI operations
//! comesol validate-cpf 529.982.247-25
//! comesol check
//! ```

use clap::Parser;
use comesol::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // COMESOL_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("COMESOL_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "comesol=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
   ___ ___  __  __ ___ ___  ___  _
  / __/ _ \|  \/  | __/ __|/ _ \| |
 | (_| (_) | |\/| | _|\__ \ (_) | |__
  \___\___/|_|  |_|___|___/\___/|____|

  Cadastro v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}

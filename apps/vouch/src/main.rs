//! # Vouch - Content Registry Server
//!
//! The main binary for the Vouch content registry.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for registry operations
//! - TOML configuration for genesis and ledger balances
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │              apps/vouch (THE BINARY)          │
//! │                                               │
//! │   ┌─────────────┐          ┌─────────────┐    │
//! │   │    CLI      │          │  HTTP API   │    │
//! │   │   (clap)    │          │   (axum)    │    │
//! │   └──────┬──────┘          └──────┬──────┘    │
//! │          └───────────┬────────────┘           │
//! │                      ▼                        │
//! │              ┌───────────────┐                │
//! │              │  vouch-core   │                │
//! │              │  (THE LOGIC)  │                │
//! │              └───────────────┘                │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! vouch server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! vouch status
//! vouch submit --caller alice --headline "Rust 2024" --hyperlink https://blog.rust-lang.org -t technology
//! vouch appraise --caller bob 1 -1
//! vouch top
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vouch::cli;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // VOUCH_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("VOUCH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "vouch=debug,vouch_core=debug,tower_http=debug"
    } else {
        "vouch=info,vouch_core=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

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

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Vouch startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗   ██╗ ██████╗ ██╗   ██╗ ██████╗██╗  ██╗
  ██║   ██║██╔═══██╗██║   ██║██╔════╝██║  ██║
  ██║   ██║██║   ██║██║   ██║██║     ███████║
  ╚██╗ ██╔╝██║   ██║██║   ██║██║     ██╔══██║
   ╚████╔╝ ╚██████╔╝╚██████╔╝╚██████╗██║  ██║
    ╚═══╝   ╚═════╝  ╚═════╝  ╚═════╝╚═╝  ╚═╝

  Content Registry v{}

  Curated links, honest scores
"#,
        env!("CARGO_PKG_VERSION")
    );
}

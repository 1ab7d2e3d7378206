//! # Vouch CLI Module
//!
//! This module implements the CLI interface for Vouch.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show registry status
//! - `item` / `top` / `reputation` / `topics` / `events` - Queries
//! - `submit` / `appraise` / `reward` / `flag` - Participant operations
//! - `remove` / `add-topic` / `set-charge` - Administrator operations
//! - `export` / `import` - Snapshot transfer
//! - `init` - Initialize new database
//! - `hash` - Compute BLAKE3 hash of the registry snapshot

mod commands;

use crate::config::VouchConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vouch_core::{ItemId, VouchError};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Vouch - Content Registry Server
///
/// Participants submit links for a fee, appraise them, tip their authors
/// and flag them. An administrator curates topics and charges.
#[derive(Parser, Debug)]
#[command(name = "vouch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the registry database
    #[arg(short = 'D', long, global = true, default_value = "vouch.db")]
    pub database: PathBuf,

    /// Storage backend: "file" (snapshot file) or "redb" (ACID database)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Path to the TOML configuration file
    #[arg(short = 'C', long, global = true)]
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
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show registry status
    Status,

    /// Show one item
    Item {
        /// Item identifier
        id: u64,
    },

    /// List non-negative items in the top window
    Top {
        #[arg(short, long, default_value = "10")]
        limit: u64,
    },

    /// Show a participant's reputation
    Reputation {
        participant: String,
    },

    /// List the topic catalog
    Topics,

    /// Print journaled events
    Events {
        /// First sequence number to print
        #[arg(short, long, default_value = "1")]
        from: u64,

        #[arg(short, long, default_value = "100")]
        limit: usize,
    },

    /// Submit a new item
    Submit {
        /// Acting participant
        #[arg(short, long)]
        caller: String,

        #[arg(long)]
        headline: String,

        #[arg(long)]
        hyperlink: String,

        #[arg(short, long)]
        topic: String,
    },

    /// Appraise an item with +1 or -1
    Appraise {
        #[arg(short, long)]
        caller: String,

        id: u64,

        #[arg(allow_negative_numbers = true)]
        value: i64,
    },

    /// Tip the originator of an item
    Reward {
        #[arg(short, long)]
        caller: String,

        id: u64,

        amount: u64,
    },

    /// Flag an item
    Flag {
        #[arg(short, long)]
        caller: String,

        id: u64,
    },

    /// Remove an item (administrator only)
    Remove {
        #[arg(short, long)]
        caller: String,

        id: u64,
    },

    /// Append a topic to the catalog (administrator only)
    AddTopic {
        #[arg(short, long)]
        caller: String,

        label: String,
    },

    /// Change the submission charge (administrator only)
    SetCharge {
        #[arg(short, long)]
        caller: String,

        charge: u64,
    },

    /// Export the registry as a snapshot
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (snapshot, json)
        #[arg(short = 't', long, default_value = "snapshot")]
        format: String,
    },

    /// Import a snapshot into a new database
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Compute BLAKE3 hash of the registry snapshot
    Hash,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), VouchError> {
    let config = VouchConfig::load(cli.config.as_deref())?;
    let env = CommandEnv {
        database: &cli.database,
        backend: cli.backend.as_str(),
        json_mode: cli.json_mode,
        config: &config,
    };

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(&env, host, port).await,
        Some(Commands::Status) | None => cmd_status(&env),
        Some(Commands::Item { id }) => cmd_item(&env, id),
        Some(Commands::Top { limit }) => cmd_top(&env, limit),
        Some(Commands::Reputation { participant }) => cmd_reputation(&env, &participant),
        Some(Commands::Topics) => cmd_topics(&env),
        Some(Commands::Events { from, limit }) => cmd_events(&env, from, limit),
        Some(Commands::Submit {
            caller,
            headline,
            hyperlink,
            topic,
        }) => cmd_mutate(&env, &caller, |session, ctx| {
            session
                .submit(ctx, &headline, &hyperlink, &topic)
                .map(Some)
        }),
        Some(Commands::Appraise { caller, id, value }) => {
            cmd_mutate(&env, &caller, |session, ctx| {
                session.appraise(ctx, ItemId(id), value).map(|()| None)
            })
        }
        Some(Commands::Reward { caller, id, amount }) => {
            cmd_mutate(&env, &caller, |session, ctx| {
                session.reward(ctx, ItemId(id), amount).map(|()| None)
            })
        }
        Some(Commands::Flag { caller, id }) => cmd_mutate(&env, &caller, |session, ctx| {
            session.flag(ctx, ItemId(id)).map(|()| None)
        }),
        Some(Commands::Remove { caller, id }) => cmd_mutate(&env, &caller, |session, ctx| {
            session.remove_item(ctx, ItemId(id)).map(|()| None)
        }),
        Some(Commands::AddTopic { caller, label }) => {
            cmd_mutate(&env, &caller, |session, ctx| {
                session.add_topic(ctx, &label).map(|()| None)
            })
        }
        Some(Commands::SetCharge { caller, charge }) => {
            cmd_mutate(&env, &caller, |session, ctx| {
                session.set_charge(ctx, charge).map(|()| None)
            })
        }
        Some(Commands::Export { output, format }) => cmd_export(&env, &output, &format),
        Some(Commands::Import { input }) => cmd_import(&env, &input),
        Some(Commands::Init { force }) => cmd_init(&env, force),
        Some(Commands::Hash) => cmd_hash(&env),
    }
}

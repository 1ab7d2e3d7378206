//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Every command opens the registry, does its work and (for the file
//! backend) writes the snapshot back. Ledger balances come from the
//! configuration on each run.

use crate::api::{self, EventJson, ItemJson};
use crate::config::VouchConfig;
use std::path::{Path, PathBuf};
use vouch_core::{
    CallContext, ItemId, Participant, Session, VouchError,
    formats::{
        MAX_SNAPSHOT_SIZE, RegistrySnapshot, compute_blake3_hash, snapshot_checksum,
        snapshot_from_bytes, snapshot_to_bytes,
    },
};

/// Shared inputs of every command.
#[derive(Debug, Clone, Copy)]
pub struct CommandEnv<'a> {
    pub database: &'a Path,
    pub backend: &'a str,
    pub json_mode: bool,
    pub config: &'a VouchConfig,
}

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), VouchError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| VouchError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(VouchError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
///
/// Canonicalizing resolves `..` and symlinks before anything is read.
fn validate_file_path(path: &Path) -> Result<PathBuf, VouchError> {
    let canonical = path.canonicalize().map_err(|e| {
        VouchError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(VouchError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path whose parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, VouchError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        VouchError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(VouchError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| VouchError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    env: &CommandEnv<'_>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), VouchError> {
    let session = load_or_create_session(env.database, env.backend, env.config)?;

    let host = host.unwrap_or_else(|| env.config.server.host.clone());
    let port = port.unwrap_or(env.config.server.port);

    println!("Vouch Registry Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:          {}", host);
    println!("  Port:          {}", port);
    println!("  Backend:       {}", env.backend);
    println!("  Database:      {:?}", env.database);
    println!("  Administrator: {}", session.administrator());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, session).await
}

// =============================================================================
// QUERY COMMANDS
// =============================================================================

/// Show registry status.
pub fn cmd_status(env: &CommandEnv<'_>) -> Result<(), VouchError> {
    let session = load_or_create_session(env.database, env.backend, env.config)?;

    let total = session.get_total()?;
    let live = session.live_items()?;
    let charge = session.charge()?;
    let topics = session.topics()?;
    let events = session.event_count()?;
    let height = session.last_height()?;

    if env.json_mode {
        print_json(&serde_json::json!({
            "database": env.database.to_string_lossy(),
            "backend": env.backend,
            "administrator": session.administrator().as_str(),
            "total_items": total,
            "live_items": live,
            "submission_charge": charge,
            "topics": topics,
            "event_count": events,
            "last_height": height,
        }));
        return Ok(());
    }

    println!("Vouch Registry Status");
    println!("=====================");
    println!("Database:      {:?}", env.database);
    println!("Backend:       {}", env.backend);
    println!("Administrator: {}", session.administrator());
    println!();
    println!("Items:         {} submitted, {} live", total, live);
    println!("Charge:        {}", charge);
    println!("Topics:        {}", topics.join(", "));
    println!("Events:        {}", events);
    println!("Last Height:   {}", height);

    Ok(())
}

/// Show one item.
pub fn cmd_item(env: &CommandEnv<'_>, id: u64) -> Result<(), VouchError> {
    let session = load_or_create_session(env.database, env.backend, env.config)?;
    let item = session.get_item(ItemId(id))?;

    if env.json_mode {
        print_json(&serde_json::json!({
            "found": item.is_some(),
            "item": item.as_ref().map(ItemJson::from),
        }));
        return Ok(());
    }

    match item {
        Some(item) => {
            println!("Item {}", item.id);
            println!("  Headline:   {}", item.headline);
            println!("  Hyperlink:  {}", item.hyperlink);
            println!("  Topic:      {}", item.topic);
            println!("  Originator: {}", item.originator);
            println!("  Created At: {}", item.created_at);
            println!("  Score:      {}", item.score);
            println!("  Tips:       {}", item.tips);
            println!("  Flags:      {}", item.flags);
        }
        None => println!("Item {} not found", id),
    }
    Ok(())
}

/// List non-negative items in the top window.
pub fn cmd_top(env: &CommandEnv<'_>, limit: u64) -> Result<(), VouchError> {
    let session = load_or_create_session(env.database, env.backend, env.config)?;
    let items = session.get_top(limit)?;

    if env.json_mode {
        let items: Vec<ItemJson> = items.iter().map(ItemJson::from).collect();
        print_json(&serde_json::json!({ "items": items }));
        return Ok(());
    }

    if items.is_empty() {
        println!("No items");
    }
    for item in &items {
        println!(
            "{:>4}  {:>+5}  [{}] {} <{}>",
            item.id.value(),
            item.score,
            item.topic,
            item.headline,
            item.hyperlink
        );
    }
    Ok(())
}

/// Show a participant's reputation.
pub fn cmd_reputation(env: &CommandEnv<'_>, participant: &str) -> Result<(), VouchError> {
    let session = load_or_create_session(env.database, env.backend, env.config)?;
    let reputation = session.get_reputation(&Participant::new(participant))?;

    if env.json_mode {
        print_json(&serde_json::json!({
            "participant": participant,
            "reputation": reputation,
        }));
    } else {
        println!("{}: {}", participant, reputation);
    }
    Ok(())
}

/// List the topic catalog.
pub fn cmd_topics(env: &CommandEnv<'_>) -> Result<(), VouchError> {
    let session = load_or_create_session(env.database, env.backend, env.config)?;
    let topics = session.topics()?;

    if env.json_mode {
        print_json(&serde_json::json!({ "topics": topics }));
    } else {
        for (index, topic) in topics.iter().enumerate() {
            println!("{:>2}. {}", index + 1, topic);
        }
    }
    Ok(())
}

/// Print journaled events.
pub fn cmd_events(env: &CommandEnv<'_>, from: u64, limit: usize) -> Result<(), VouchError> {
    let session = load_or_create_session(env.database, env.backend, env.config)?;
    let records = session.events(from.max(1), limit)?;
    let events = records
        .iter()
        .map(EventJson::from_record)
        .collect::<Result<Vec<_>, _>>()?;

    if env.json_mode {
        print_json(&serde_json::json!({ "events": events }));
        return Ok(());
    }

    for event in &events {
        println!(
            "#{:<6} h={:<6} {:<13} {}",
            event.sequence, event.height, event.kind, event.data
        );
    }
    Ok(())
}

// =============================================================================
// MUTATION COMMANDS
// =============================================================================

/// Run one mutating operation as `caller` and persist the result.
///
/// The call height is one past the last journaled height.
pub fn cmd_mutate<F>(env: &CommandEnv<'_>, caller: &str, operation: F) -> Result<(), VouchError>
where
    F: FnOnce(&mut Session, &CallContext) -> Result<Option<ItemId>, VouchError>,
{
    let caller = caller.trim();
    if caller.is_empty() {
        return Err(VouchError::InvalidInput("caller must not be empty".to_string()));
    }

    let mut session = load_or_create_session(env.database, env.backend, env.config)?;
    let height = session
        .last_height()?
        .checked_add(1)
        .ok_or(VouchError::Overflow)?;
    let ctx = CallContext::new(Participant::new(caller), height);

    let item = operation(&mut session, &ctx)?;
    save_session(&session, env.database)?;

    if env.json_mode {
        print_json(&serde_json::json!({
            "success": true,
            "item_id": item.map(ItemId::value),
            "height": height,
        }));
    } else {
        match item {
            Some(id) => println!("Submitted item {} at height {}", id, height),
            None => println!("OK at height {}", height),
        }
    }
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Export the registry.
pub fn cmd_export(env: &CommandEnv<'_>, output: &Path, format: &str) -> Result<(), VouchError> {
    let validated_output = validate_output_path(output)?;
    let session = load_or_create_session(env.database, env.backend, env.config)?;
    let snapshot = session.snapshot()?;

    let data = match format {
        "snapshot" => {
            let data = snapshot_to_bytes(&snapshot)?;
            println!("Checksum: {}", snapshot_checksum(&data));
            data
        }
        "json" => serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| VouchError::SerializationError(e.to_string()))?,
        _ => {
            return Err(VouchError::InvalidInput(format!(
                "Unknown format: {}. Use: snapshot, json",
                format
            )));
        }
    };

    std::fs::write(&validated_output, &data)
        .map_err(|e| VouchError::IoError(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

/// Import a snapshot (binary or JSON) into a database that does not exist yet.
pub fn cmd_import(env: &CommandEnv<'_>, input: &Path) -> Result<(), VouchError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_SNAPSHOT_SIZE as u64)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| VouchError::IoError(format!("Read file: {}", e)))?;
    let snapshot = decode_snapshot(&data)?;

    if env.database.exists() {
        return Err(VouchError::Conflict(format!(
            "Database {:?} already exists; import needs a fresh path",
            env.database
        )));
    }

    let ledger = env.config.ledger()?;
    let genesis = env.config.genesis();
    let session = match env.backend {
        "redb" => Session::restore_redb(env.database, snapshot, ledger, genesis)?,
        "file" => {
            let session = Session::from_snapshot(snapshot, ledger, genesis)?;
            save_session(&session, env.database)?;
            session
        }
        other => return Err(unknown_backend(other)),
    };

    println!(
        "Imported registry: {} items, {} events",
        session.live_items()?,
        session.event_count()?
    );
    Ok(())
}

// =============================================================================
// INIT / HASH
// =============================================================================

/// Initialize new database.
pub fn cmd_init(env: &CommandEnv<'_>, force: bool) -> Result<(), VouchError> {
    if env.database.exists() {
        if !force {
            return Err(VouchError::Conflict(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(env.database)
            .map_err(|e| VouchError::IoError(format!("Remove database: {}", e)))?;
    }

    let ledger = env.config.ledger()?;
    let genesis = env.config.genesis();
    match env.backend {
        "redb" => {
            let _session = Session::with_redb(env.database, ledger, genesis)?;
            println!("Initialized new redb database at {:?}", env.database);
        }
        "file" => {
            let session = Session::new(ledger, genesis)?;
            save_session(&session, env.database)?;
            println!("Initialized new file database at {:?}", env.database);
        }
        other => return Err(unknown_backend(other)),
    }
    Ok(())
}

/// Compute BLAKE3 hash of the canonical snapshot.
pub fn cmd_hash(env: &CommandEnv<'_>) -> Result<(), VouchError> {
    let session = load_or_create_session(env.database, env.backend, env.config)?;
    let data = snapshot_to_bytes(&session.snapshot()?)?;
    let hash = compute_blake3_hash(&data);

    if env.json_mode {
        print_json(&serde_json::json!({
            "hash": hash,
            "checksum": snapshot_checksum(&data),
            "bytes": data.len(),
        }));
    } else {
        println!("BLAKE3: {}", hash);
    }
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn unknown_backend(name: &str) -> VouchError {
    VouchError::InvalidInput(format!("Unknown backend: {}. Use: redb, file", name))
}

/// Decode a snapshot in binary form, falling back to JSON.
fn decode_snapshot(data: &[u8]) -> Result<RegistrySnapshot, VouchError> {
    match snapshot_from_bytes(data) {
        Ok(snapshot) => Ok(snapshot),
        Err(binary_err) => serde_json::from_slice::<RegistrySnapshot>(data).map_err(|_| {
            VouchError::SerializationError(format!("Could not parse snapshot: {}", binary_err))
        }),
    }
}

/// Load or create a session from a database path with specified backend.
pub fn load_or_create_session(
    db_path: &Path,
    backend: &str,
    config: &VouchConfig,
) -> Result<Session, VouchError> {
    let ledger = config.ledger()?;
    let genesis = config.genesis();

    match backend {
        "redb" => Session::with_redb(db_path, ledger, genesis),
        "file" => {
            if db_path.exists() {
                validate_file_size(db_path, MAX_SNAPSHOT_SIZE as u64)?;
                let data = std::fs::read(db_path)
                    .map_err(|e| VouchError::IoError(format!("Read db: {}", e)))?;
                Session::from_snapshot(decode_snapshot(&data)?, ledger, genesis)
            } else {
                Session::new(ledger, genesis)
            }
        }
        other => Err(unknown_backend(other)),
    }
}

/// Save a session to a database path.
///
/// The redb backend commits on every operation, so only the file backend
/// writes here.
pub fn save_session(session: &Session, db_path: &Path) -> Result<(), VouchError> {
    if session.is_persistent() {
        return Ok(());
    }
    let data = snapshot_to_bytes(&session.snapshot()?)?;
    std::fs::write(db_path, &data).map_err(|e| VouchError::IoError(format!("Write db: {}", e)))
}

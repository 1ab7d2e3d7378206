//! Serialization formats. File I/O stays in the app layer.

pub mod snapshot;

pub use snapshot::{
    MAX_SNAPSHOT_SIZE, RegistrySnapshot, snapshot_checksum, snapshot_from_bytes, snapshot_to_bytes,
};

#[cfg(feature = "crypto-hash")]
pub use snapshot::compute_blake3_hash;

//! Centralized error types for the desktop pet.
//!
//! Very little in this crate is allowed to fail: corrupted saves and malformed sprite
//! descriptors degrade to defaults instead of surfacing here. What remains are the
//! conditions a host genuinely has to know about, such as a store that cannot be written.

use std::io;
use std::path::PathBuf;

/// Main error type for the desktop pet.
///
/// This is the primary error type used in public APIs that touch the outside world.
#[derive(thiserror::Error, Debug)]
pub enum PetError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sprite error: {0}")]
    Sprite(#[from] SpriteError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while reading or writing persisted records.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid store key: {0:?}")]
    InvalidKey(String),
}

/// Errors related to loading sprite sheets.
#[derive(thiserror::Error, Debug)]
pub enum SpriteError {
    #[error("Failed to read sprite file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Invalid sprite descriptor: {0}")]
    InvalidDescriptor(String),
}

/// Errors raised while extracting configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to extract configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    #[error("Could not determine a data directory")]
    NoDataDir,
}

/// Result type for desktop pet operations.
pub type PetResult<T> = Result<T, PetError>;

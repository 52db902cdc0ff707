use crate::container::ContainerError;
use crate::item::ItemError;
use crate::models::UserId;
use crate::storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the backpack plugin.
#[derive(Debug, Error)]
pub enum BackpackError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("item error: {0}")]
    Item(#[from] ItemError),

    #[error("container error: {0}")]
    Container(#[from] ContainerError),

    #[error("player {0} has no backpack")]
    NoBackpack(UserId),

    #[error("backpack of player {0} is not open")]
    NotOpen(UserId),

    #[error("cannot access config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    ConfigJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, BackpackError>;

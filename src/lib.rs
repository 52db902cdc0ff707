//! Private, persistent backpacks for players of a multiplayer server.
//!
//! Each player gets one [`controller::LootController`] holding a live
//! container. Opening the backpack loads it from the store, closing it writes
//! the contents back and empties the container again.

pub mod backpacks;
pub mod codec;
pub mod commands;
pub mod config;
pub mod container;
pub mod controller;
pub mod error;
pub mod item;
pub mod models;
pub mod network;
pub mod panel;
pub mod permissions;
pub mod registry;
pub mod storage;

pub use backpacks::{Backpacks, PendingOpen};
pub use config::Config;
pub use error::{BackpackError, Result};
pub use models::{BackpackData, ItemRecord, UserId};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable identifier of a player, independent of their connection
pub type UserId = u64;

/// Durable form of one item stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Item type identifier
    pub shortname: String,
    /// Cosmetic variant, 0 is the default skin
    #[serde(default)]
    pub skin: u64,
    /// Stack size
    pub amount: i32,
}

impl ItemRecord {
    pub fn new(shortname: impl Into<String>, skin: u64, amount: i32) -> Self {
        Self {
            shortname: shortname.into(),
            skin,
            amount,
        }
    }
}

/// Everything the plugin persists, keyed by player
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackpackData {
    #[serde(default)]
    pub players: BTreeMap<UserId, Vec<ItemRecord>>,
}

impl BackpackData {
    /// Returns the stored list for `user`, inserting an empty one when absent.
    pub fn find_items_by_id(&mut self, user: UserId) -> &mut Vec<ItemRecord> {
        self.players.entry(user).or_default()
    }

    pub fn items(&self, user: UserId) -> &[ItemRecord] {
        self.players.get(&user).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Forgets every player's backpack.
    pub fn clear(&mut self) {
        self.players.clear();
    }
}

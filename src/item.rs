use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_ITEM_UID: AtomicU64 = AtomicU64::new(1);

/// Shortnames known to the default catalog
pub const DEFAULT_ITEMS: &[&str] = &[
    "wood",
    "stones",
    "metal.fragments",
    "metal.refined",
    "sulfur",
    "charcoal",
    "cloth",
    "leather",
    "lowgradefuel",
    "scrap",
    "torch",
    "bandage",
    "syringe.medical",
    "rifle.ak",
    "rifle.bolt",
    "pistol.revolver",
    "ammo.rifle",
    "ammo.pistol",
    "hatchet",
    "pickaxe",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("unknown item: {0}")]
    UnknownItem(String),

    #[error("invalid amount {amount} for {shortname}")]
    InvalidAmount { shortname: String, amount: i32 },
}

/// A live item instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub uid: u64,
    pub shortname: String,
    pub skin: u64,
    pub amount: i32,
}

/// Produces live items from stored descriptions.
pub trait ItemFactory: Send {
    fn instantiate(&self, shortname: &str, amount: i32, skin: u64) -> Result<Item, ItemError>;
}

/// Item factory backed by a set of known shortnames.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    known: BTreeSet<String>,
}

impl ItemCatalog {
    pub fn new<I, S>(shortnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: shortnames.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_ITEMS.iter().copied())
    }

    pub fn register(&mut self, shortname: impl Into<String>) {
        self.known.insert(shortname.into());
    }

    pub fn contains(&self, shortname: &str) -> bool {
        self.known.contains(shortname)
    }
}

impl ItemFactory for ItemCatalog {
    fn instantiate(&self, shortname: &str, amount: i32, skin: u64) -> Result<Item, ItemError> {
        if !self.contains(shortname) {
            return Err(ItemError::UnknownItem(shortname.to_string()));
        }
        if amount <= 0 {
            return Err(ItemError::InvalidAmount {
                shortname: shortname.to_string(),
                amount,
            });
        }

        Ok(Item {
            uid: NEXT_ITEM_UID.fetch_add(1, Ordering::Relaxed),
            shortname: shortname.to_string(),
            skin,
            amount,
        })
    }
}

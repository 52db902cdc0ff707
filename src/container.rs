use crate::item::Item;
use crate::models::UserId;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_CONTAINER_UID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContainerError {
    #[error("container is full ({capacity} slots)")]
    Full { capacity: usize },

    #[error("container has been destroyed")]
    Destroyed,

    #[error("slot {0} is empty")]
    SlotEmpty(usize),
}

/// Live, in-memory storage a player can look into
#[derive(Debug)]
pub struct Container {
    uid: u64,
    owner: UserId,
    capacity: usize,
    items: Vec<Item>,
    destroyed: bool,
}

impl Container {
    /// Allocates an empty container with `capacity` slots.
    pub fn allocate(capacity: usize, owner: UserId) -> Self {
        Self {
            uid: NEXT_CONTAINER_UID.fetch_add(1, Ordering::Relaxed),
            owner,
            capacity,
            items: Vec::with_capacity(capacity),
            destroyed: false,
        }
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Moves an item into the next free slot and returns the slot index.
    pub fn insert(&mut self, item: Item) -> Result<usize, ContainerError> {
        if self.destroyed {
            return Err(ContainerError::Destroyed);
        }
        if self.is_full() {
            return Err(ContainerError::Full {
                capacity: self.capacity,
            });
        }
        self.items.push(item);
        Ok(self.items.len() - 1)
    }

    /// Removes the item in `slot`; later slots shift down.
    pub fn take(&mut self, slot: usize) -> Result<Item, ContainerError> {
        if slot >= self.items.len() {
            return Err(ContainerError::SlotEmpty(slot));
        }
        Ok(self.items.remove(slot))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Releases the container. Nothing can be inserted afterwards.
    pub fn kill(&mut self) {
        self.items.clear();
        self.destroyed = true;
    }
}

use crate::controller::LootController;
use crate::models::UserId;
use std::collections::HashMap;

/// The live backpacks, at most one per player
#[derive(Debug, Default)]
pub struct Registry {
    controllers: HashMap<UserId, LootController>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the player's controller, allocating one with `capacity` slots
    /// if they have none yet.
    pub fn find_or_create(&mut self, user: UserId, capacity: usize) -> &mut LootController {
        self.controllers.entry(user).or_insert_with(|| {
            tracing::debug!("Allocating backpack for {} ({} slots)", user, capacity);
            LootController::new(user, capacity)
        })
    }

    pub fn find(&self, user: UserId) -> Option<&LootController> {
        self.controllers.get(&user)
    }

    pub fn find_mut(&mut self, user: UserId) -> Option<&mut LootController> {
        self.controllers.get_mut(&user)
    }

    pub fn remove(&mut self, user: UserId) -> Option<LootController> {
        self.controllers.remove(&user)
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut LootController> + '_ {
        self.controllers.values_mut()
    }

    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.controllers.keys().copied()
    }
}

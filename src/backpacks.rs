//! The backpack plugin: host hooks, the chat command and the access check.

use crate::codec::{self, Hydration};
use crate::config::Config;
use crate::controller::LootContext;
use crate::error::{BackpackError, Result};
use crate::item::{Item, ItemFactory};
use crate::models::{BackpackData, ItemRecord, UserId};
use crate::panel::LootPanel;
use crate::permissions::{PERM_USE, Permissions};
use crate::registry::Registry;
use crate::storage::BackpackRepository;
use std::collections::HashMap;
use std::time::Duration;

/// A requested open that has not fired yet.
///
/// Only the newest ticket of a connected player is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOpen {
    pub user: UserId,
    ticket: u64,
}

pub struct Backpacks {
    config: Config,
    registry: Registry,
    data: BackpackData,
    repository: Box<dyn BackpackRepository>,
    items: Box<dyn ItemFactory>,
    panel: Box<dyn LootPanel>,
    permissions: Box<dyn Permissions>,
    pending_opens: HashMap<UserId, u64>,
    next_ticket: u64,
}

impl Backpacks {
    /// Loads the stored backpacks once and sets up an empty registry.
    pub fn new(
        config: Config,
        repository: Box<dyn BackpackRepository>,
        items: Box<dyn ItemFactory>,
        panel: Box<dyn LootPanel>,
        permissions: Box<dyn Permissions>,
    ) -> Result<Self> {
        let data = repository.load(&config.store_name)?;
        tracing::info!(
            "Loaded {} stored backpacks from store {}",
            data.players.len(),
            config.store_name
        );

        Ok(Self {
            config,
            registry: Registry::new(),
            data,
            repository,
            items,
            panel,
            permissions,
            pending_opens: HashMap::new(),
            next_ticket: 0,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn data(&self) -> &BackpackData {
        &self.data
    }

    pub fn permissions_mut(&mut self) -> &mut dyn Permissions {
        &mut *self.permissions
    }

    pub fn open_delay(&self) -> Duration {
        self.config.open_delay
    }

    fn parts(&mut self) -> (&mut Registry, LootContext<'_>) {
        (
            &mut self.registry,
            LootContext {
                data: &mut self.data,
                repository: &*self.repository,
                store_name: &self.config.store_name,
                items: &*self.items,
                panel: &mut *self.panel,
            },
        )
    }

    fn allowed(&self, user: UserId) -> bool {
        self.permissions.has_capability(user, PERM_USE)
    }

    /// Allocates backpacks for players already online when the plugin starts.
    pub fn on_server_initialized(&mut self, active_users: impl IntoIterator<Item = UserId>) {
        for user in active_users {
            self.on_player_connected(user);
        }
    }

    /// Returns whether the player got a backpack.
    pub fn on_player_connected(&mut self, user: UserId) -> bool {
        if !self.allowed(user) {
            return false;
        }
        self.registry
            .find_or_create(user, self.config.container_capacity);
        true
    }

    /// Saves and tears down the player's backpack.
    ///
    /// A backpack that cannot be saved stays registered, still holding its
    /// items, so a later close or unload can retry.
    pub fn on_player_disconnected(&mut self, user: UserId) -> Result<()> {
        if self.pending_opens.remove(&user).is_some() {
            tracing::debug!("Cancelled pending open for {}", user);
        }
        self.destroy_backpack(user)
    }

    fn destroy_backpack(&mut self, user: UserId) -> Result<()> {
        let (registry, mut ctx) = self.parts();
        let Some(controller) = registry.find_mut(user) else {
            return Ok(());
        };
        controller.destroy(&mut ctx)?;
        registry.remove(user);
        Ok(())
    }

    /// The player stopped looting `source`. Closes their backpack if that is
    /// what they were looking at.
    pub fn on_loot_end(&mut self, looter: UserId, source: UserId) -> Result<bool> {
        if looter != source {
            return Ok(false);
        }
        let (registry, mut ctx) = self.parts();
        match registry.find_mut(looter) {
            Some(controller) => controller.close(&mut ctx),
            None => Ok(false),
        }
    }

    /// Whether `viewer` may loot `target`: only their own open backpack.
    pub fn can_loot_player(&self, viewer: UserId, target: UserId) -> bool {
        viewer == target
            && self
                .registry
                .find(viewer)
                .is_some_and(|controller| controller.can_view(viewer))
    }

    /// Wipes every stored backpack when the world is reset.
    ///
    /// Open backpacks keep their live items, but forget the stored records
    /// they could not fit so those are not written back on close.
    pub fn on_new_save(&mut self) -> Result<()> {
        let wiped = self.data.players.len();
        self.data.clear();
        for controller in self.registry.iter_mut() {
            controller.forget_overflow();
        }
        self.repository.save(&self.config.store_name, &self.data)?;
        tracing::info!("New save, wiped {} stored backpacks", wiped);
        Ok(())
    }

    /// Saves and destroys every live backpack. Keeps going past failures and
    /// reports the first one.
    pub fn unload(&mut self) -> Result<()> {
        self.pending_opens.clear();

        let users: Vec<_> = self.registry.users().collect();
        let mut first_error = None;
        for user in users {
            if let Err(e) = self.destroy_backpack(user) {
                tracing::error!("Failed to save backpack of {} on unload: {}", user, e);
                first_error.get_or_insert(e);
            }
        }

        tracing::info!("Unloaded, {} backpacks left unsaved", self.registry.len());
        first_error.map_or(Ok(()), Err)
    }

    /// The `backpack` chat command. Returns the ticket to complete after the
    /// open delay, or `None` if the player may not use backpacks.
    pub fn backpack_command(&mut self, user: UserId) -> Option<PendingOpen> {
        if !self.allowed(user) {
            return None;
        }
        self.registry
            .find_or_create(user, self.config.container_capacity);

        self.next_ticket += 1;
        if self.pending_opens.insert(user, self.next_ticket).is_some() {
            tracing::debug!("Superseded pending open for {}", user);
        }

        Some(PendingOpen {
            user,
            ticket: self.next_ticket,
        })
    }

    pub fn is_open_pending(&self, user: UserId) -> bool {
        self.pending_opens.contains_key(&user)
    }

    /// Opens the backpack for a ticket from [`Backpacks::backpack_command`].
    ///
    /// Returns `None` when the ticket was cancelled or superseded.
    pub fn complete_open(&mut self, pending: PendingOpen) -> Result<Option<Hydration>> {
        if self.pending_opens.get(&pending.user) != Some(&pending.ticket) {
            tracing::debug!("Dropping stale open for {}", pending.user);
            return Ok(None);
        }
        self.pending_opens.remove(&pending.user);
        if !self.allowed(pending.user) {
            tracing::debug!("{} lost {} before the backpack opened", pending.user, PERM_USE);
            return Ok(None);
        }

        let (registry, mut ctx) = self.parts();
        match registry.find_mut(pending.user) {
            Some(controller) => controller.open(&mut ctx).map(Some),
            None => Ok(None),
        }
    }

    /// Moves a new item into the player's open backpack.
    pub fn deposit(&mut self, user: UserId, shortname: &str, amount: i32, skin: u64) -> Result<usize> {
        let controller = self
            .registry
            .find_mut(user)
            .ok_or(BackpackError::NoBackpack(user))?;
        let container = controller
            .container_mut()
            .ok_or(BackpackError::NotOpen(user))?;
        let item = self.items.instantiate(shortname, amount, skin)?;
        Ok(container.insert(item)?)
    }

    /// Takes the item in `slot` out of the player's open backpack.
    pub fn take(&mut self, user: UserId, slot: usize) -> Result<Item> {
        let controller = self
            .registry
            .find_mut(user)
            .ok_or(BackpackError::NoBackpack(user))?;
        let container = controller
            .container_mut()
            .ok_or(BackpackError::NotOpen(user))?;
        Ok(container.take(slot)?)
    }

    /// Live contents of the player's backpack, if it is open.
    pub fn contents(&self, user: UserId) -> Option<Vec<ItemRecord>> {
        self.registry
            .find(user)
            .filter(|controller| controller.is_open())
            .map(|controller| codec::snapshot(controller.container()))
    }
}

//! Per-player backpack state machine.

use crate::codec::{self, Hydration};
use crate::container::Container;
use crate::error::Result;
use crate::item::ItemFactory;
use crate::models::{BackpackData, ItemRecord, UserId};
use crate::panel::LootPanel;
use crate::storage::BackpackRepository;

/// Collaborators a controller needs to change state.
pub struct LootContext<'a> {
    pub data: &'a mut BackpackData,
    pub repository: &'a dyn BackpackRepository,
    pub store_name: &'a str,
    pub items: &'a dyn ItemFactory,
    pub panel: &'a mut dyn LootPanel,
}

/// Owns one player's live container and guards who may look into it.
///
/// The container is empty while closed. Opening fills it from the stored
/// records, closing writes it back and empties it again.
#[derive(Debug)]
pub struct LootController {
    owner: UserId,
    container: Container,
    is_open: bool,
    /// Stored records that did not fit when the backpack was opened
    overflow: Vec<ItemRecord>,
}

impl LootController {
    pub fn new(owner: UserId, capacity: usize) -> Self {
        Self {
            owner,
            container: Container::allocate(capacity, owner),
            is_open: false,
            overflow: Vec::new(),
        }
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Mutable access to the live container, only while open.
    pub fn container_mut(&mut self) -> Option<&mut Container> {
        self.is_open.then_some(&mut self.container)
    }

    pub fn overflow(&self) -> &[ItemRecord] {
        &self.overflow
    }

    /// Drops the stored records that did not fit, so the next close writes
    /// back only the live items.
    pub fn forget_overflow(&mut self) {
        self.overflow.clear();
    }

    /// Only the owner may view their own backpack, and only while it is open.
    pub fn can_view(&self, viewer: UserId) -> bool {
        viewer == self.owner && self.is_open
    }

    /// Loads the stored items into the container and shows it to the owner.
    ///
    /// Opening an already open backpack only re-attaches the view; the live
    /// items are left alone so nothing is duplicated or lost.
    pub fn open(&mut self, ctx: &mut LootContext<'_>) -> Result<Hydration> {
        if self.is_open {
            tracing::debug!("Backpack of {} already open, re-attaching", self.owner);
            ctx.panel.attach(self.owner, &self.container);
            return Ok(Hydration::default());
        }

        self.container.clear();

        let records = ctx.data.find_items_by_id(self.owner).clone();
        let hydration = codec::hydrate(&records, &mut self.container, ctx.items)?;

        if !hydration.overflow.is_empty() {
            tracing::warn!(
                "Backpack of {} holds {} stacks more than its {} slots, keeping them stored",
                self.owner,
                hydration.overflow.len(),
                self.container.capacity()
            );
        }
        self.overflow = hydration.overflow.clone();

        ctx.panel.attach(self.owner, &self.container);
        self.is_open = true;

        tracing::debug!(
            "Opened backpack of {} ({} loaded, {} skipped)",
            self.owner,
            hydration.loaded,
            hydration.skipped
        );

        Ok(hydration)
    }

    /// Writes the container back to storage and empties it.
    ///
    /// Returns `false` when the backpack was already closed. If the store
    /// cannot be written the backpack stays open with its items in place.
    pub fn close(&mut self, ctx: &mut LootContext<'_>) -> Result<bool> {
        if !self.is_open {
            return Ok(false);
        }

        let mut records = codec::snapshot(&self.container);
        records.extend(self.overflow.iter().cloned());
        let stacks = records.len();

        *ctx.data.find_items_by_id(self.owner) = records;
        ctx.repository.save(ctx.store_name, &*ctx.data)?;

        // Items are only dropped once the store has them.
        self.overflow.clear();
        self.container.clear();
        ctx.panel.detach(self.owner);
        self.is_open = false;

        tracing::debug!("Closed backpack of {} ({} stacks saved)", self.owner, stacks);

        Ok(true)
    }

    /// Closes the backpack if needed and releases the container.
    ///
    /// The caller still has to drop the controller from the registry.
    pub fn destroy(&mut self, ctx: &mut LootContext<'_>) -> Result<()> {
        self.close(ctx)?;
        self.container.kill();
        tracing::debug!("Destroyed backpack of {}", self.owner);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::BackpackError;
    use crate::item::ItemCatalog;
    use crate::storage::{InMemoryBackpackRepository, StorageError};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    pub(crate) struct RecordingPanel {
        pub attached: Vec<UserId>,
        pub detached: Vec<UserId>,
    }

    impl LootPanel for RecordingPanel {
        fn attach(&mut self, owner: UserId, _container: &Container) {
            self.attached.push(owner);
        }

        fn detach(&mut self, owner: UserId) {
            self.detached.push(owner);
        }
    }

    /// Repository whose writes can be switched off.
    #[derive(Default)]
    pub(crate) struct FlakyRepository {
        pub inner: InMemoryBackpackRepository,
        pub failing: AtomicBool,
    }

    impl BackpackRepository for FlakyRepository {
        fn load(&self, name: &str) -> crate::storage::Result<BackpackData> {
            self.inner.load(name)
        }

        fn save(&self, name: &str, data: &BackpackData) -> crate::storage::Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.inner.save(name, data)
        }
    }

    struct Harness {
        data: BackpackData,
        repository: FlakyRepository,
        items: ItemCatalog,
        panel: RecordingPanel,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                data: BackpackData::default(),
                repository: FlakyRepository::default(),
                items: ItemCatalog::with_defaults(),
                panel: RecordingPanel::default(),
            }
        }

        fn ctx(&mut self) -> LootContext<'_> {
            LootContext {
                data: &mut self.data,
                repository: &self.repository,
                store_name: "Backpacks",
                items: &self.items,
                panel: &mut self.panel,
            }
        }

        fn stored(&self) -> BackpackData {
            self.repository.load("Backpacks").unwrap()
        }
    }

    fn deposit(controller: &mut LootController, items: &ItemCatalog, name: &str, amount: i32, skin: u64) {
        let item = items.instantiate(name, amount, skin).unwrap();
        controller.container_mut().unwrap().insert(item).unwrap();
    }

    #[test]
    fn open_then_close_round_trips_items() {
        let mut h = Harness::new();
        h.data.find_items_by_id(1).extend([
            ItemRecord::new("wood", 0, 100),
            ItemRecord::new("rifle.ak", 1234, 1),
        ]);

        let mut controller = LootController::new(1, 6);
        let hydration = controller.open(&mut h.ctx()).unwrap();
        assert_eq!(hydration.loaded, 2);
        assert!(controller.is_open());
        assert_eq!(h.panel.attached, vec![1]);

        let live: Vec<_> = controller
            .container()
            .iter()
            .map(|i| (i.shortname.clone(), i.skin, i.amount))
            .collect();
        assert_eq!(
            live,
            vec![("wood".to_string(), 0, 100), ("rifle.ak".to_string(), 1234, 1)]
        );

        assert!(controller.close(&mut h.ctx()).unwrap());
        assert!(!controller.is_open());
        assert!(controller.container().is_empty());
        assert_eq!(h.panel.detached, vec![1]);
        assert_eq!(h.stored().items(1).len(), 2);
    }

    #[test]
    fn unknown_records_are_dropped_on_close() {
        let mut h = Harness::new();
        h.data.find_items_by_id(1).extend([
            ItemRecord::new("wood", 0, 100),
            ItemRecord::new("removed.item", 0, 1),
            ItemRecord::new("rifle.ak", 1234, 1),
        ]);

        let mut controller = LootController::new(1, 6);
        let hydration = controller.open(&mut h.ctx()).unwrap();
        assert_eq!(hydration.loaded, 2);
        assert_eq!(hydration.skipped, 1);

        controller.close(&mut h.ctx()).unwrap();
        assert_eq!(
            h.stored().items(1),
            &[ItemRecord::new("wood", 0, 100), ItemRecord::new("rifle.ak", 1234, 1)]
        );
    }

    #[test]
    fn forgotten_overflow_is_not_written_back() {
        let mut h = Harness::new();
        h.data.find_items_by_id(1).extend([
            ItemRecord::new("wood", 0, 100),
            ItemRecord::new("stones", 0, 200),
            ItemRecord::new("sulfur", 0, 300),
        ]);

        let mut controller = LootController::new(1, 2);
        controller.open(&mut h.ctx()).unwrap();
        controller.forget_overflow();
        assert!(controller.overflow().is_empty());

        controller.close(&mut h.ctx()).unwrap();
        assert_eq!(
            h.stored().items(1),
            &[ItemRecord::new("wood", 0, 100), ItemRecord::new("stones", 0, 200)]
        );
    }

    #[test]
    fn close_when_closed_is_a_no_op() {
        let mut h = Harness::new();
        let mut controller = LootController::new(1, 6);
        assert!(!controller.close(&mut h.ctx()).unwrap());
        assert!(h.panel.detached.is_empty());
        assert!(h.stored().players.is_empty());
    }

    #[test]
    fn close_overwrites_stored_list() {
        let mut h = Harness::new();
        h.data.find_items_by_id(1).push(ItemRecord::new("wood", 0, 100));

        let mut controller = LootController::new(1, 6);
        controller.open(&mut h.ctx()).unwrap();
        controller.container_mut().unwrap().take(0).unwrap();
        deposit(&mut controller, &h.items, "torch", 1, 0);
        controller.close(&mut h.ctx()).unwrap();

        assert_eq!(h.data.items(1), &[ItemRecord::new("torch", 0, 1)]);
    }

    #[test]
    fn reopen_does_not_duplicate_items() {
        let mut h = Harness::new();
        h.data.find_items_by_id(1).push(ItemRecord::new("wood", 0, 100));

        let mut controller = LootController::new(1, 6);
        controller.open(&mut h.ctx()).unwrap();
        let again = controller.open(&mut h.ctx()).unwrap();
        assert_eq!(again, Hydration::default());
        assert_eq!(controller.container().len(), 1);
        assert_eq!(h.panel.attached, vec![1, 1]);
    }

    #[test]
    fn destroy_flushes_open_backpack() {
        let mut h = Harness::new();
        let mut controller = LootController::new(1, 6);
        controller.open(&mut h.ctx()).unwrap();
        deposit(&mut controller, &h.items, "scrap", 50, 0);

        controller.destroy(&mut h.ctx()).unwrap();
        assert!(controller.container().is_destroyed());
        assert_eq!(h.stored().items(1), &[ItemRecord::new("scrap", 0, 50)]);
    }

    #[test]
    fn destroy_closed_backpack_writes_nothing() {
        let mut h = Harness::new();
        let mut controller = LootController::new(1, 6);
        controller.destroy(&mut h.ctx()).unwrap();
        assert!(controller.container().is_destroyed());
        assert!(h.stored().players.is_empty());
    }

    #[test]
    fn failed_write_keeps_items_live() {
        let mut h = Harness::new();
        let mut controller = LootController::new(1, 6);
        controller.open(&mut h.ctx()).unwrap();
        deposit(&mut controller, &h.items, "scrap", 50, 0);

        h.repository.failing.store(true, Ordering::SeqCst);
        assert!(matches!(
            controller.close(&mut h.ctx()),
            Err(BackpackError::Storage(_))
        ));
        assert!(controller.is_open());
        assert_eq!(controller.container().len(), 1);

        h.repository.failing.store(false, Ordering::SeqCst);
        assert!(controller.close(&mut h.ctx()).unwrap());
        assert_eq!(h.stored().items(1), &[ItemRecord::new("scrap", 0, 50)]);
    }

    #[test]
    fn overflow_is_preserved_across_flush() {
        let mut h = Harness::new();
        h.data.find_items_by_id(1).extend([
            ItemRecord::new("wood", 0, 100),
            ItemRecord::new("stones", 0, 200),
            ItemRecord::new("sulfur", 0, 300),
        ]);

        let mut controller = LootController::new(1, 2);
        let hydration = controller.open(&mut h.ctx()).unwrap();
        assert_eq!(hydration.loaded, 2);
        assert_eq!(controller.overflow(), &[ItemRecord::new("sulfur", 0, 300)]);

        controller.close(&mut h.ctx()).unwrap();
        assert_eq!(h.stored().items(1).len(), 3);
        assert!(controller.overflow().is_empty());
    }

    #[test]
    fn only_owner_sees_open_backpack() {
        let mut h = Harness::new();
        let mut controller = LootController::new(1, 6);
        assert!(!controller.can_view(1));
        assert!(!controller.can_view(2));

        controller.open(&mut h.ctx()).unwrap();
        assert!(controller.can_view(1));
        assert!(!controller.can_view(2));
        assert!(controller.container_mut().is_some());

        controller.close(&mut h.ctx()).unwrap();
        assert!(!controller.can_view(1));
        assert!(controller.container_mut().is_none());
    }
}

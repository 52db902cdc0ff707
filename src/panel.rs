use crate::container::Container;
use crate::models::UserId;

/// Shows a container to its owner as their only open loot view.
pub trait LootPanel: Send {
    fn attach(&mut self, owner: UserId, container: &Container);

    fn detach(&mut self, owner: UserId);
}

/// Panel for hosts without a client UI.
#[derive(Debug, Default)]
pub struct NoopPanel;

impl LootPanel for NoopPanel {
    fn attach(&mut self, owner: UserId, container: &Container) {
        tracing::trace!("Attach container {} for {}", container.uid(), owner);
    }

    fn detach(&mut self, owner: UserId) {
        tracing::trace!("Detach panel for {}", owner);
    }
}

//! Conversion between live container contents and stored item records.

use crate::container::{Container, ContainerError};
use crate::item::ItemFactory;
use crate::models::ItemRecord;

/// Outcome of loading stored records into a container.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Hydration {
    /// Records that became live items
    pub loaded: usize,
    /// Records the item factory could not produce
    pub skipped: usize,
    /// Records that did not fit, in their original order
    pub overflow: Vec<ItemRecord>,
}

/// Captures every live item in container order.
pub fn snapshot(container: &Container) -> Vec<ItemRecord> {
    container
        .iter()
        .map(|item| ItemRecord::new(item.shortname.clone(), item.skin, item.amount))
        .collect()
}

/// Instantiates `records` into `container`, in order.
///
/// A record whose item type can no longer be produced is dropped with a
/// warning. Once the container is full the remaining records are handed back
/// untouched in [`Hydration::overflow`].
pub fn hydrate(
    records: &[ItemRecord],
    container: &mut Container,
    factory: &dyn ItemFactory,
) -> Result<Hydration, ContainerError> {
    if container.is_destroyed() {
        return Err(ContainerError::Destroyed);
    }

    let mut hydration = Hydration::default();

    for (index, record) in records.iter().enumerate() {
        if container.is_full() {
            hydration.overflow.extend_from_slice(&records[index..]);
            break;
        }

        match factory.instantiate(&record.shortname, record.amount, record.skin) {
            Ok(item) => {
                container.insert(item)?;
                hydration.loaded += 1;
            }
            Err(e) => {
                tracing::warn!(
                    "Skipping stored {} x{} for {}: {}",
                    record.shortname,
                    record.amount,
                    container.owner(),
                    e
                );
                hydration.skipped += 1;
            }
        }
    }

    Ok(hydration)
}

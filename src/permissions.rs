use crate::models::UserId;
use std::collections::{HashMap, HashSet};

/// Permission needed for every backpack entry point
pub const PERM_USE: &str = "backpacks.use";

pub trait Permissions: Send {
    fn has_capability(&self, user: UserId, permission: &str) -> bool;

    fn grant(&mut self, user: UserId, permission: &str);

    fn revoke(&mut self, user: UserId, permission: &str);
}

/// Per-player permission grants kept in memory
#[derive(Debug, Default)]
pub struct PermissionTable {
    grants: HashMap<UserId, HashSet<String>>,
}

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Permissions for PermissionTable {
    fn has_capability(&self, user: UserId, permission: &str) -> bool {
        self.grants
            .get(&user)
            .is_some_and(|granted| granted.contains(permission))
    }

    fn grant(&mut self, user: UserId, permission: &str) {
        self.grants
            .entry(user)
            .or_default()
            .insert(permission.to_string());
    }

    fn revoke(&mut self, user: UserId, permission: &str) {
        if let Some(granted) = self.grants.get_mut(&user) {
            granted.remove(permission);
            if granted.is_empty() {
                self.grants.remove(&user);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_and_revoke() {
        let mut table = PermissionTable::new();
        assert!(!table.has_capability(1, PERM_USE));
        table.grant(1, PERM_USE);
        assert!(table.has_capability(1, PERM_USE));
        assert!(!table.has_capability(2, PERM_USE));
        table.revoke(1, PERM_USE);
        assert!(!table.has_capability(1, PERM_USE));
    }
}

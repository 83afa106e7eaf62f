//! StaticRoleDirectory - roles held in memory

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use veilaudit_core::domain::{Principal, Role};
use veilaudit_core::ports::IRoleDirectory;

/// Role assignments editable at runtime
///
/// A poisoned lock reads as "no roles", which denies every guarded call.
#[derive(Debug, Default)]
pub struct StaticRoleDirectory {
    roles: RwLock<HashMap<Principal, BTreeSet<Role>>>,
}

impl StaticRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, principal: &Principal, role: Role) {
        if let Ok(mut roles) = self.roles.write() {
            roles.entry(principal.clone()).or_default().insert(role);
        }
    }

    pub fn revoke(&self, principal: &Principal, role: Role) {
        if let Ok(mut roles) = self.roles.write() {
            if let Some(held) = roles.get_mut(principal) {
                held.remove(&role);
            }
        }
    }
}

impl IRoleDirectory for StaticRoleDirectory {
    fn roles_of(&self, principal: &Principal) -> BTreeSet<Role> {
        self.roles
            .read()
            .ok()
            .and_then(|roles| roles.get(principal).cloned())
            .unwrap_or_default()
    }
}

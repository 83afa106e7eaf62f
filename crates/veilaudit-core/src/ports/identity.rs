//! Identity / role source port
//!
//! Role administration is outside the core; the core only asks which
//! roles a caller currently holds and derives a
//! [`CapabilitySet`](crate::domain::CapabilitySet) from the answer.

use std::collections::BTreeSet;

use crate::domain::{Principal, Role};

pub trait IRoleDirectory: Send + Sync {
    /// Returns the roles held by `principal`; unknown principals hold none
    fn roles_of(&self, principal: &Principal) -> BTreeSet<Role>;
}

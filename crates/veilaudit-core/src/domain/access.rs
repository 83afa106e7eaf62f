//! Roles and capabilities
//!
//! The identity source reports which roles a principal holds; guarded
//! operations consult the derived capability set before touching state.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{AuditError, Result};
use super::newtypes::Principal;

/// Role membership as reported by the identity source
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Operator of the deployment; implies every capability
    Owner,
    /// Supervisory authority that may fail pending audits
    Regulator,
    /// Accredited auditor that may schedule and run audits
    AuthorizedAuditor,
    /// Entity that processes data and maintains a compliance profile
    DataController,
}

/// Permission checked at the top of a guarded operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Schedule, run and complete audits
    Audit,
    /// Reject audits that are pending decryption
    Regulate,
    /// Register and refresh a compliance profile
    ControlData,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::Audit => "audit",
            Capability::Regulate => "regulate",
            Capability::ControlData => "control_data",
        };
        f.write_str(s)
    }
}

/// Capabilities held by one principal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// Derives capabilities from role membership
    pub fn for_roles<'a>(roles: impl IntoIterator<Item = &'a Role>) -> Self {
        let mut caps = BTreeSet::new();
        for role in roles {
            match role {
                Role::Owner => {
                    caps.extend([Capability::Audit, Capability::Regulate, Capability::ControlData])
                }
                Role::Regulator => {
                    caps.insert(Capability::Regulate);
                }
                Role::AuthorizedAuditor => {
                    caps.insert(Capability::Audit);
                }
                Role::DataController => {
                    caps.insert(Capability::ControlData);
                }
            }
        }
        Self(caps)
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fails with `Unauthorized` unless `capability` is held
    pub fn require(&self, principal: &Principal, capability: Capability) -> Result<()> {
        if self.contains(capability) {
            Ok(())
        } else {
            Err(AuditError::Unauthorized {
                principal: principal.clone(),
                action: format!("use capability {capability}"),
            })
        }
    }
}

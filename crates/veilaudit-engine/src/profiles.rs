//! ProfileRegistry - compliance profiles keyed by controller

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use veilaudit_core::domain::{CiphertextHandle, ComplianceProfile, Principal, ProfileSubmission};
use veilaudit_core::{AuditError, Result};

#[derive(Debug, Default)]
pub struct ProfileRegistry {
    profiles: HashMap<Principal, ComplianceProfile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or refreshes the profile of `controller`
    ///
    /// `keep_score` only affects a refresh. Returns true when the profile
    /// did not exist before.
    pub fn upsert(
        &mut self,
        controller: &Principal,
        submission: &ProfileSubmission,
        obfuscated_value: CiphertextHandle,
        keep_score: bool,
        now: DateTime<Utc>,
    ) -> bool {
        match self.profiles.get_mut(controller) {
            Some(profile) => {
                profile.update(submission, obfuscated_value, keep_score, now);
                false
            }
            None => {
                self.profiles.insert(
                    controller.clone(),
                    ComplianceProfile::new(controller.clone(), submission, obfuscated_value, now),
                );
                true
            }
        }
    }

    pub fn get(&self, controller: &Principal) -> Result<&ComplianceProfile> {
        self.profiles
            .get(controller)
            .ok_or_else(|| AuditError::unknown_entity(controller))
    }

    pub fn contains(&self, controller: &Principal) -> bool {
        self.profiles.contains_key(controller)
    }

    /// Stores an adjusted compliance score for `controller`
    pub fn apply_score(
        &mut self,
        controller: &Principal,
        handle: CiphertextHandle,
        plaintext: u32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.profiles
            .get_mut(controller)
            .ok_or_else(|| AuditError::unknown_entity(controller))?
            .apply_score(handle, plaintext, now);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

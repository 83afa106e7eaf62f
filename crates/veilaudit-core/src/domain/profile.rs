//! ComplianceProfile domain entity
//!
//! One profile per data controller. Profiles are retained for regulatory
//! purposes: they are updated in place and never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{CiphertextHandle, Principal};

/// Plaintext flags describing what kind of data an entity processes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCategories {
    pub personal: bool,
    pub financial: bool,
    pub health: bool,
}

/// What a controller submits when registering or refreshing its profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSubmission {
    /// Encrypted number of data points processed
    pub data_points: CiphertextHandle,
    /// Encrypted self-assessed risk score
    pub risk_score: CiphertextHandle,
    /// Encrypted compliance score
    pub compliance_score: CiphertextHandle,
    /// Plaintext magnitude that is obfuscated and encrypted before storage
    pub derived_magnitude: u64,
    pub categories: DataCategories,
}

/// Encrypted compliance standing of a data controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceProfile {
    controller: Principal,
    data_points: CiphertextHandle,
    risk_score: CiphertextHandle,
    compliance_score: CiphertextHandle,
    obfuscated_value: CiphertextHandle,
    categories: DataCategories,
    registered_at: DateTime<Utc>,
    last_review: DateTime<Utc>,
    published_score: Option<u32>,
}

impl ComplianceProfile {
    /// Creates a profile from a first submission
    ///
    /// `obfuscated_value` is the handle of the already obfuscated and
    /// encrypted derived magnitude.
    pub fn new(
        controller: Principal,
        submission: &ProfileSubmission,
        obfuscated_value: CiphertextHandle,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            controller,
            data_points: submission.data_points,
            risk_score: submission.risk_score,
            compliance_score: submission.compliance_score,
            obfuscated_value,
            categories: submission.categories,
            registered_at: now,
            last_review: now,
            published_score: None,
        }
    }

    pub fn controller(&self) -> &Principal {
        &self.controller
    }

    pub fn data_points(&self) -> CiphertextHandle {
        self.data_points
    }

    pub fn risk_score(&self) -> CiphertextHandle {
        self.risk_score
    }

    pub fn compliance_score(&self) -> CiphertextHandle {
        self.compliance_score
    }

    pub fn obfuscated_value(&self) -> CiphertextHandle {
        self.obfuscated_value
    }

    pub fn categories(&self) -> DataCategories {
        self.categories
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    pub fn last_review(&self) -> DateTime<Utc> {
        self.last_review
    }

    /// Last compliance score revealed by a completed audit
    pub fn published_score(&self) -> Option<u32> {
        self.published_score
    }

    /// Replaces the submitted fields, keeping the registration time
    ///
    /// The compliance score is only re-seeded while no audit has published
    /// one and `keep_score` is false.
    pub fn update(
        &mut self,
        submission: &ProfileSubmission,
        obfuscated_value: CiphertextHandle,
        keep_score: bool,
        now: DateTime<Utc>,
    ) {
        self.data_points = submission.data_points;
        self.risk_score = submission.risk_score;
        if !keep_score && self.published_score.is_none() {
            self.compliance_score = submission.compliance_score;
        }
        self.obfuscated_value = obfuscated_value;
        self.categories = submission.categories;
        self.last_review = now;
    }

    /// Stores an adjusted score after an audit revealed the previous one
    pub fn apply_score(&mut self, handle: CiphertextHandle, plaintext: u32, now: DateTime<Utc>) {
        self.compliance_score = handle;
        self.published_score = Some(plaintext);
        self.last_review = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn submission(byte: u8) -> ProfileSubmission {
        ProfileSubmission {
            data_points: CiphertextHandle::from_bytes([byte; 32]),
            risk_score: CiphertextHandle::from_bytes([byte + 1; 32]),
            compliance_score: CiphertextHandle::from_bytes([byte + 2; 32]),
            derived_magnitude: 1_000,
            categories: DataCategories {
                personal: true,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_update_keeps_registration_time() {
        let t0 = Utc::now();
        let mut profile = ComplianceProfile::new(
            Principal::new("acme").unwrap(),
            &submission(10),
            CiphertextHandle::from_bytes([0; 32]),
            t0,
        );
        let t1 = t0 + Duration::days(1);
        profile.update(&submission(20), CiphertextHandle::from_bytes([1; 32]), false, t1);

        assert_eq!(profile.registered_at(), t0);
        assert_eq!(profile.last_review(), t1);
        assert_eq!(profile.data_points(), CiphertextHandle::from_bytes([20; 32]));
        assert_eq!(profile.obfuscated_value(), CiphertextHandle::from_bytes([1; 32]));
        assert!(profile.categories().personal);
        assert_eq!(profile.compliance_score(), CiphertextHandle::from_bytes([22; 32]));
    }

    #[test]
    fn test_refresh_keeps_published_score() {
        let mut profile = ComplianceProfile::new(
            Principal::new("acme").unwrap(),
            &submission(10),
            CiphertextHandle::from_bytes([0; 32]),
            Utc::now(),
        );
        let audited = CiphertextHandle::from_bytes([99; 32]);
        profile.apply_score(audited, 65, Utc::now());

        profile.update(&submission(20), CiphertextHandle::from_bytes([1; 32]), false, Utc::now());
        assert_eq!(profile.compliance_score(), audited);
        assert_eq!(profile.published_score(), Some(65));
        assert_eq!(profile.risk_score(), CiphertextHandle::from_bytes([21; 32]));
    }

    #[test]
    fn test_refresh_with_keep_score_before_any_audit() {
        let mut profile = ComplianceProfile::new(
            Principal::new("acme").unwrap(),
            &submission(10),
            CiphertextHandle::from_bytes([0; 32]),
            Utc::now(),
        );
        profile.update(&submission(20), CiphertextHandle::from_bytes([1; 32]), true, Utc::now());
        assert_eq!(profile.compliance_score(), CiphertextHandle::from_bytes([12; 32]));
        assert_eq!(profile.data_points(), CiphertextHandle::from_bytes([20; 32]));
    }

    #[test]
    fn test_apply_score_publishes_plaintext() {
        let mut profile = ComplianceProfile::new(
            Principal::new("acme").unwrap(),
            &submission(10),
            CiphertextHandle::from_bytes([0; 32]),
            Utc::now(),
        );
        assert!(profile.published_score().is_none());
        let handle = CiphertextHandle::from_bytes([99; 32]);
        profile.apply_score(handle, 75, Utc::now());
        assert_eq!(profile.compliance_score(), handle);
        assert_eq!(profile.published_score(), Some(75));
    }
}

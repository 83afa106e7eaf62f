//! RefundLedger - pending compensation per principal
//!
//! Balances are created on first credit and zeroed, never removed, on
//! withdrawal.

use std::collections::HashMap;

use tracing::debug;
use veilaudit_core::domain::Principal;
use veilaudit_core::{AuditError, Result};

#[derive(Debug, Default)]
pub struct RefundLedger {
    balances: HashMap<Principal, u64>,
}

impl RefundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` to the balance of `user`
    ///
    /// # Errors
    ///
    /// `Overflow` if the balance would exceed `u64::MAX`; the balance is
    /// left as it was.
    pub fn credit(&mut self, user: &Principal, amount: u64) -> Result<u64> {
        let current = self.balance(user);
        let updated = current
            .checked_add(amount)
            .ok_or(AuditError::Overflow("refund credit"))?;
        self.balances.insert(user.clone(), updated);
        debug!(beneficiary = %user, amount, balance = updated, "Refund credited");
        Ok(updated)
    }

    /// Reads and zeroes the balance of `user` in one step
    pub fn withdraw(&mut self, user: &Principal) -> Result<u64> {
        let amount = self
            .balances
            .get_mut(user)
            .map(std::mem::take)
            .unwrap_or(0);
        if amount == 0 {
            return Err(AuditError::NothingToWithdraw(user.clone()));
        }
        debug!(beneficiary = %user, amount, "Refund withdrawn");
        Ok(amount)
    }

    pub fn balance(&self, user: &Principal) -> u64 {
        self.balances.get(user).copied().unwrap_or(0)
    }

    /// Sum of every pending balance
    pub fn total_owed(&self) -> u128 {
        self.balances.values().map(|v| u128::from(*v)).sum()
    }
}

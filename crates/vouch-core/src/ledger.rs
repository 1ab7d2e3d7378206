//! # Value Transfer
//!
//! The seam between the registry and the native value-transfer primitive
//! of the host environment.
//!
//! The registry only ever asks two things of the host: how much a
//! participant holds, and to move an amount between two participants
//! atomically (all or nothing, balance-checked). `Balances` is the
//! in-memory implementation used by the binary and by tests.

use crate::{Participant, VouchError};
use std::collections::BTreeMap;

/// Balance-checked transfer of native value between participants.
pub trait ValueTransfer {
    /// Current balance of a participant (0 if unknown).
    fn balance(&self, who: &Participant) -> u64;

    /// Move `amount` from `from` to `to`.
    ///
    /// Must either move the full amount or leave both balances untouched.
    /// Returns `VouchError::InsufficientFunds` when `from` cannot cover it.
    fn transfer(&mut self, from: &Participant, to: &Participant, amount: u64)
    -> Result<(), VouchError>;
}

/// In-memory ledger of native balances.
///
/// Uses `BTreeMap` for deterministic iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balances {
    accounts: BTreeMap<Participant, u64>,
}

impl Balances {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger from genesis allocations.
    ///
    /// Repeated participants are summed.
    pub fn with_allocations(
        allocations: impl IntoIterator<Item = (Participant, u64)>,
    ) -> Result<Self, VouchError> {
        let mut balances = Self::new();
        for (who, amount) in allocations {
            balances.credit(&who, amount)?;
        }
        Ok(balances)
    }

    /// Add freshly minted value to a participant.
    pub fn credit(&mut self, who: &Participant, amount: u64) -> Result<(), VouchError> {
        let entry = self.accounts.entry(who.clone()).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(VouchError::Overflow)?;
        Ok(())
    }
}

impl ValueTransfer for Balances {
    fn balance(&self, who: &Participant) -> u64 {
        self.accounts.get(who).copied().unwrap_or(0)
    }

    fn transfer(
        &mut self,
        from: &Participant,
        to: &Participant,
        amount: u64,
    ) -> Result<(), VouchError> {
        let available = self.balance(from);
        if available < amount {
            return Err(VouchError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }

        // Both sides are computed before either is written.
        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or(VouchError::Overflow)?;
        self.accounts.insert(from.clone(), available - amount);
        self.accounts.insert(to.clone(), credited);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

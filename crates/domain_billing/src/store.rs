//! Bill storage port and its in-memory adapter
//!
//! The store is the single source of truth for bills. Implementations must
//! make every operation atomic with respect to the others; in particular a
//! [`BillStore::modify`] call runs its closure and commits the result without
//! any other writer interleaving.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use core_kernel::BillId;

use crate::bill::{Bill, BillStatus};

/// Errors surfaced by storage adapters
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Bill not found: {0}")]
    NotFound(String),

    /// A writer panicked while holding the lock
    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Storage port for bills
///
/// Readers always receive independent copies; mutating a returned bill has
/// no effect on the stored one until it is written back.
pub trait BillStore: Send + Sync {
    /// Inserts a bill keyed by its id, replacing any bill with the same id
    fn create(&self, bill: Bill) -> Result<(), StoreError>;

    /// Returns a copy of the bill, or `None` if the id is unknown
    fn get(&self, id: &BillId) -> Result<Option<Bill>, StoreError>;

    /// Replaces a stored bill wholesale
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the id is unknown; nothing is inserted
    fn update(&self, bill: Bill) -> Result<(), StoreError>;

    /// Returns copies of all bills, optionally filtered by status, ordered
    /// by creation time (ties broken by id)
    fn list(&self, status: Option<BillStatus>) -> Result<Vec<Bill>, StoreError>;

    /// Number of stored bills
    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Atomic read-modify-write of one bill
    ///
    /// `f` runs against a working copy while the bill is locked. The copy is
    /// committed only if `f` returns `Ok`; on `Err` the stored bill is left
    /// exactly as it was.
    /// `f` must not block or call back into the store.
    ///
    /// # Returns
    ///
    /// A copy of the committed bill
    fn modify<F, E>(&self, id: &BillId, f: F) -> Result<Bill, E>
    where
        Self: Sized,
        F: FnOnce(&mut Bill) -> Result<(), E>,
        E: From<StoreError>;
}

/// Thread-safe in-memory bill store
#[derive(Debug, Default)]
pub struct InMemoryBillStore {
    bills: RwLock<HashMap<BillId, Bill>>,
}

impl InMemoryBillStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a store with existing bills
    pub fn with_bills(bills: impl IntoIterator<Item = Bill>) -> Self {
        Self {
            bills: RwLock::new(bills.into_iter().map(|b| (b.id(), b)).collect()),
        }
    }
}

impl BillStore for InMemoryBillStore {
    fn create(&self, bill: Bill) -> Result<(), StoreError> {
        let mut bills = self.bills.write().map_err(|_| StoreError::LockPoisoned)?;
        bills.insert(bill.id(), bill);
        Ok(())
    }

    fn get(&self, id: &BillId) -> Result<Option<Bill>, StoreError> {
        let bills = self.bills.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(bills.get(id).cloned())
    }

    fn update(&self, bill: Bill) -> Result<(), StoreError> {
        let mut bills = self.bills.write().map_err(|_| StoreError::LockPoisoned)?;
        match bills.get_mut(&bill.id()) {
            Some(slot) => {
                *slot = bill;
                Ok(())
            }
            None => Err(StoreError::NotFound(bill.id().to_string())),
        }
    }

    fn list(&self, status: Option<BillStatus>) -> Result<Vec<Bill>, StoreError> {
        let bills = self.bills.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut result: Vec<Bill> = bills
            .values()
            .filter(|b| status.map_or(true, |s| b.status() == s))
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(result)
    }

    fn len(&self) -> Result<usize, StoreError> {
        let bills = self.bills.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(bills.len())
    }

    fn modify<F, E>(&self, id: &BillId, f: F) -> Result<Bill, E>
    where
        F: FnOnce(&mut Bill) -> Result<(), E>,
        E: From<StoreError>,
    {
        let mut bills = self.bills.write().map_err(|_| StoreError::LockPoisoned)?;
        let slot = bills
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let mut working = slot.clone();
        f(&mut working)?;
        *slot = working.clone();

        Ok(working)
    }
}

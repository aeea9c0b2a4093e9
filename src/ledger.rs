use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::notify::Notifier;

pub type AccountId = i64;

/// Identity-keyed holder of a non-negative credit balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub identity: String,
    pub balance: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient credit")]
    InsufficientCredit,
    #[error("account {0} not found")]
    AccountNotFound(AccountId),
    #[error("identity {0} already registered")]
    IdentityExists(String),
    #[error("credit amount must be positive, got {0}")]
    NonPositiveAmount(i64),
}

/// Per-account credit balances with atomic mutation.
///
/// Operations on the same account are serialized through the map's entry
/// guard; operations on different accounts do not share a lock. Guards are
/// released before any notification I/O.
pub struct Ledger {
    accounts: DashMap<AccountId, Account>,
    by_identity: DashMap<String, AccountId>,
    next_id: AtomicI64,
    initial_credits: i64,
    notifier: Arc<dyn Notifier>,
}

impl Ledger {
    pub fn new(initial_credits: i64, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            accounts: DashMap::new(),
            by_identity: DashMap::new(),
            next_id: AtomicI64::new(1),
            initial_credits,
            notifier,
        }
    }

    /// Register a new account for an already-verified identity, seeded with
    /// the configured initial balance.
    pub fn create_account(&self, identity: &str) -> Result<Account, LedgerError> {
        match self.by_identity.entry(identity.to_string()) {
            Entry::Occupied(_) => Err(LedgerError::IdentityExists(identity.to_string())),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let account = Account {
                    id,
                    identity: identity.to_string(),
                    balance: self.initial_credits,
                };
                self.accounts.insert(id, account.clone());
                slot.insert(id);
                info!(account = id, identity = %identity, balance = account.balance, "account created");
                Ok(account)
            }
        }
    }

    /// Spend one credit. Fails with `InsufficientCredit` when the balance is
    /// already zero, leaving it untouched. The debit that lands exactly on
    /// zero fires the exhaustion notification; rejected attempts on an
    /// already-zero balance never re-fire it.
    pub async fn debit(&self, id: AccountId) -> Result<i64, LedgerError> {
        let (new_balance, identity) = {
            let mut entry = self
                .accounts
                .get_mut(&id)
                .ok_or(LedgerError::AccountNotFound(id))?;
            if entry.balance <= 0 {
                return Err(LedgerError::InsufficientCredit);
            }
            entry.balance -= 1;
            (entry.balance, entry.identity.clone())
        };

        if new_balance == 0 {
            if let Err(e) = self.notifier.exhaustion(&identity).await {
                warn!(identity = %identity, error = %e, "exhaustion notification failed");
            }
        }

        Ok(new_balance)
    }

    /// Add `amount` credits. Commutes with any interleaving of concurrent
    /// debits and credits on the same account.
    pub fn credit(&self, id: AccountId, amount: i64) -> Result<i64, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        let mut entry = self
            .accounts
            .get_mut(&id)
            .ok_or(LedgerError::AccountNotFound(id))?;
        entry.balance += amount;
        Ok(entry.balance)
    }

    /// Snapshot of some committed balance.
    pub fn balance(&self, id: AccountId) -> Result<i64, LedgerError> {
        self.accounts
            .get(&id)
            .map(|a| a.balance)
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Resolve a sender identity to its account, if any.
    pub fn find_by_identity(&self, identity: &str) -> Option<Account> {
        let id = *self.by_identity.get(identity)?;
        self.accounts.get(&id).map(|a| a.value().clone())
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

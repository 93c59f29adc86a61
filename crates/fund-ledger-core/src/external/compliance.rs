use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::types::AccountId;

/// Identity/compliance check consulted before admitting capital.
///
/// A `false` answer is a hard rejection; the engine never retries.
pub trait ComplianceOracle {
    fn is_eligible(&self, account: &AccountId) -> bool;
}

/// Oracle backed by an explicit set of verified accounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowList {
    /// Admit every account regardless of `accounts`
    #[serde(default)]
    pub allow_all: bool,
    #[serde(default)]
    pub accounts: HashSet<AccountId>,
}

impl AllowList {
    pub fn allow_all() -> Self {
        Self {
            allow_all: true,
            accounts: HashSet::new(),
        }
    }

    pub fn from_accounts<I>(accounts: I) -> Self
    where
        I: IntoIterator<Item = AccountId>,
    {
        Self {
            allow_all: false,
            accounts: accounts.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, account: AccountId) {
        self.accounts.insert(account);
    }

    pub fn revoke(&mut self, account: &AccountId) {
        self.accounts.remove(account);
    }
}

impl ComplianceOracle for AllowList {
    fn is_eligible(&self, account: &AccountId) -> bool {
        self.allow_all || self.accounts.contains(account)
    }
}

/// Shared oracle whose answers can change while an engine holds it.
/// A poisoned lock answers `false`.
impl<O: ComplianceOracle> ComplianceOracle for Arc<Mutex<O>> {
    fn is_eligible(&self, account: &AccountId) -> bool {
        self.lock()
            .map(|oracle| oracle.is_eligible(account))
            .unwrap_or(false)
    }
}

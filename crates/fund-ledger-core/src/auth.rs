use serde::{Deserialize, Serialize};

use crate::error::FundLedgerError;
use crate::types::AccountId;
use crate::FundResult;

/// Capability the caller was granted by whatever authenticated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    Administrator,
    Partner,
}

/// Authenticated identity passed into every mutating engine call.
///
/// The engine only checks what the caller may do; establishing who the
/// caller is happens before the call reaches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub account: AccountId,
    pub role: CallerRole,
}

impl Caller {
    pub fn administrator(account: impl Into<AccountId>) -> Self {
        Self {
            account: account.into(),
            role: CallerRole::Administrator,
        }
    }

    pub fn partner(account: impl Into<AccountId>) -> Self {
        Self {
            account: account.into(),
            role: CallerRole::Partner,
        }
    }

    pub fn is_administrator(&self) -> bool {
        self.role == CallerRole::Administrator
    }

    pub fn require_administrator(&self, operation: &str) -> FundResult<()> {
        if !self.is_administrator() {
            return Err(FundLedgerError::Unauthorized {
                operation: operation.into(),
                required: "administrator".into(),
            });
        }
        Ok(())
    }

    /// The caller must be acting on its own account.
    pub fn require_self(&self, account: &AccountId, operation: &str) -> FundResult<()> {
        if &self.account != account {
            return Err(FundLedgerError::Unauthorized {
                operation: operation.into(),
                required: format!("caller {}", account),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        let admin = Caller::administrator("ops");
        let lp = Caller::partner("lp-1");

        assert!(admin.require_administrator("issue_call").is_ok());
        assert!(lp.require_administrator("issue_call").is_err());

        assert!(lp.require_self(&AccountId::from("lp-1"), "propose").is_ok());
        // Administrators cannot act on a partner's behalf for self-only operations
        assert!(admin.require_self(&AccountId::from("lp-1"), "propose").is_err());
    }
}

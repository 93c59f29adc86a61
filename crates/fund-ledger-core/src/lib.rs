pub mod auth;
pub mod capital_calls;
pub mod commitments;
pub mod config;
pub mod error;
pub mod external;
pub mod fund;
pub mod interest;
pub mod preview;
pub mod scenario;
pub mod types;
pub mod waterfall;

pub use error::{ErrorKind, FundLedgerError};
pub use types::*;

/// Standard result type for all fund ledger operations
pub type FundResult<T> = Result<T, FundLedgerError>;

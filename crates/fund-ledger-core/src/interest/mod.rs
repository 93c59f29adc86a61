//! Preferred-return ledger with annual or quarterly compounding.

pub mod calendar;
pub mod ledger;

pub use ledger::{InterestEntry, InterestLedger, OutflowSplit};

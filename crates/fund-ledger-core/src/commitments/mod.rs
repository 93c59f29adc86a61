//! Partner commitments and their approval lifecycle.

pub mod ledger;

pub use ledger::{Commitment, CommitmentLedger, CommitmentState, CommitmentTotals};

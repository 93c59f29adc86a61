//! The fund as one transactional unit: state, command handler and reports.

pub mod engine;
pub mod report;
pub mod state;

pub use engine::FundEngine;
pub use report::{FundSummary, PartnerPosition};
pub use state::FundState;

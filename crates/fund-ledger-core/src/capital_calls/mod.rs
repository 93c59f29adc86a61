//! Pro-rata capital call issuance and per-partner settlement tracking.

pub mod allocation;
pub mod book;

pub use allocation::{allocate_pro_rata, Allocation, Participant, ProRataAllocation};
pub use book::{AccountCapitalCall, CallStatus, CapitalCall, CapitalCallBook, IssuedCall};

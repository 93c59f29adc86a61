//! Collaborators the engine consults or instructs but does not own.

pub mod compliance;
pub mod units;

pub use compliance::{AllowList, ComplianceOracle};
pub use units::{units_for, InMemoryUnitLedger, UnitBalance, UnitClass, UnitInstruction, UnitLedger};

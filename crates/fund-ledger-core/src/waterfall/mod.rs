//! Distribution waterfall: capital and preferred return to LPs, GP catch-up, carry split.

pub mod distribution;

pub use distribution::{
    apply_waterfall, Distribution, DistributionOutcome, DistributionWaterfall, WaterfallAllocation,
    WaterfallBranch, WaterfallTierResult, WaterfallTotals,
};

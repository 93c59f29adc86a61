use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FundLedgerError;
use crate::types::*;
use crate::FundResult;

/// A partner taking part in a call, with the commitment its share is based on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub account: AccountId,
    pub role: PartnerRole,
    pub committed: Money,
}

/// One partner's share of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub account: AccountId,
    pub role: PartnerRole,
    pub share: Money,
}

/// Result of splitting a draw amount pro-rata across committed partners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProRataAllocation {
    /// `floor(amount * scale / total_committed)`
    pub scaled_share: Decimal,
    /// Per-partner shares, in participant order
    pub allocations: Vec<Allocation>,
    /// Sum of all shares
    pub total_allocated: Money,
    /// `amount - total_allocated`, lost to flooring
    pub rounding_loss: Money,
}

/// Split `amount` across `participants` in proportion to their commitments.
///
/// The scaled share is floored once, then each partner's share is floored
/// again, so the allocation never exceeds `amount`. Every participant must
/// receive a non-zero share; a call too small to reach everyone is rejected.
pub fn allocate_pro_rata(
    amount: Money,
    participants: &[Participant],
    total_committed: Money,
    scale: Decimal,
) -> FundResult<ProRataAllocation> {
    ensure_positive_amount("amount", amount)?;
    if total_committed <= Decimal::ZERO {
        return Err(FundLedgerError::InvalidInput {
            field: "total_committed".into(),
            reason: "No committed capital to allocate against".into(),
        });
    }
    if scale <= Decimal::ZERO {
        return Err(FundLedgerError::InvalidInput {
            field: "scale".into(),
            reason: "Scale must be positive".into(),
        });
    }

    let scaled_share = amount
        .checked_mul(scale)
        .ok_or_else(|| FundLedgerError::ScaleOverflow {
            context: "amount * scale".into(),
        })?
        .checked_div(total_committed)
        .ok_or_else(|| FundLedgerError::ScaleOverflow {
            context: "scaled amount / total committed".into(),
        })?
        .floor();
    if scaled_share.is_zero() {
        return Err(FundLedgerError::ScaleUnderflow {
            amount,
            total_committed,
        });
    }

    let mut allocations = Vec::with_capacity(participants.len());
    let mut total_allocated = Decimal::ZERO;
    for participant in participants {
        let share = scaled_share
            .checked_mul(participant.committed)
            .ok_or_else(|| FundLedgerError::ScaleOverflow {
                context: format!("share for {}", participant.account),
            })?
            / scale;
        let share = share.floor();
        if share.is_zero() {
            return Err(FundLedgerError::InvalidShare {
                account: participant.account.clone(),
            });
        }
        total_allocated += share;
        allocations.push(Allocation {
            account: participant.account.clone(),
            role: participant.role,
            share,
        });
    }

    Ok(ProRataAllocation {
        scaled_share,
        allocations,
        total_allocated,
        rounding_loss: amount - total_allocated,
    })
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{AllocationPolicy, PeriodId};

/// the split of one period's collected cash between the bank account and
/// physical cash-in-hand. may be recomputed freely until closed; the
/// closed latch makes it immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashAllocation {
    pub period_id: PeriodId,
    pub policy: AllocationPolicy,
    pub amount_to_bank: Money,
    pub amount_to_hand: Money,
    pub total_allocated: Money,
    /// uncollected/unallocated remainder, rolled into the next period
    pub carry_forward: Money,
    pub is_closed: bool,
    pub closed_at: Option<DateTime<Utc>>,
}

impl CashAllocation {
    /// invariant: bank + hand + carry-forward always equals the total
    pub fn is_balanced(&self) -> bool {
        self.amount_to_bank + self.amount_to_hand + self.carry_forward == self.total_allocated
    }

    /// latch the allocation. idempotent: closing an already-closed
    /// allocation keeps the original timestamp.
    pub fn close(&mut self, now: DateTime<Utc>) {
        if self.is_closed {
            return;
        }
        self.is_closed = true;
        self.closed_at = Some(now);
    }

    /// guard used before any mutation of an allocation
    pub fn ensure_open(&self, period_sequence: u32) -> Result<()> {
        if self.is_closed {
            return Err(LedgerError::TransactionClosed { period_sequence });
        }
        Ok(())
    }
}

/// split `total_collected` per the policy.
/// even split: 50/50 with the residual paisa assigned to bank.
/// custom split: validated so the parts never exceed the whole; the
/// remainder becomes carry-forward.
pub fn allocate(
    period_id: PeriodId,
    total_collected: Money,
    policy: &AllocationPolicy,
) -> Result<CashAllocation> {
    if total_collected.is_negative() {
        return Err(LedgerError::validation(format!(
            "cannot allocate negative collection {total_collected}"
        )));
    }

    let (to_bank, to_hand, carry_forward) = match policy {
        AllocationPolicy::EvenSplit => {
            let to_hand = total_collected.half_floor();
            (total_collected - to_hand, to_hand, Money::ZERO)
        }
        AllocationPolicy::AllToBank => (total_collected, Money::ZERO, Money::ZERO),
        AllocationPolicy::AllToHand => (Money::ZERO, total_collected, Money::ZERO),
        AllocationPolicy::CustomSplit { to_bank, to_hand } => {
            if to_bank.is_negative() || to_hand.is_negative() {
                return Err(LedgerError::validation(
                    "custom split amounts cannot be negative",
                ));
            }
            let allocated = *to_bank + *to_hand;
            if allocated > total_collected {
                return Err(LedgerError::validation(format!(
                    "custom split {allocated} exceeds collected {total_collected}"
                )));
            }
            (*to_bank, *to_hand, total_collected - allocated)
        }
    };

    Ok(CashAllocation {
        period_id,
        policy: *policy,
        amount_to_bank: to_bank,
        amount_to_hand: to_hand,
        total_allocated: total_collected,
        carry_forward,
        is_closed: false,
        closed_at: None,
    })
}

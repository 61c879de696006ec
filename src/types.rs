use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a group
pub type GroupId = Uuid;

/// unique identifier for a member
pub type MemberId = Uuid;

/// unique identifier for a period (one collection cycle)
pub type PeriodId = Uuid;

/// unique identifier for a member's per-period contribution row
pub type ContributionId = Uuid;

/// how often the group collects contributions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionFrequency {
    Weekly,
    Fortnightly,
    Monthly,
    Yearly,
}

/// status of a member's contribution within a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContributionStatus {
    /// nothing paid yet, not past due
    Pending,
    /// some but not all of the minimum due is paid
    Partial,
    /// minimum due fully covered
    Paid,
    /// underpaid and past the due date
    Overdue,
}

/// how a period's collected cash is split between bank and cash-in-hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationPolicy {
    /// 50/50, residual paisa to bank
    EvenSplit,
    AllToBank,
    AllToHand,
    /// caller-supplied split; the unallocated remainder carries forward
    CustomSplit {
        to_bank: Money,
        to_hand: Money,
    },
}

/// one payment entry against a contribution row.
/// each variant targets exactly one paid bucket; ad-hoc extra savings are
/// credited to the contribution bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payment {
    Compulsory(Money),
    LoanInterest(Money),
    LateFine(Money),
    AdHoc(Money),
}

impl Payment {
    pub fn amount(&self) -> Money {
        match self {
            Payment::Compulsory(a)
            | Payment::LoanInterest(a)
            | Payment::LateFine(a)
            | Payment::AdHoc(a) => *a,
        }
    }
}

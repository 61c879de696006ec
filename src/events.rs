use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{AllocationPolicy, ContributionId, GroupId, MemberId, PeriodId};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // period lifecycle
    PeriodOpened {
        group_id: GroupId,
        period_id: PeriodId,
        sequence_number: u32,
        meeting_date: NaiveDate,
        standing_at_start: Money,
    },
    PeriodClosed {
        group_id: GroupId,
        period_id: PeriodId,
        sequence_number: u32,
        total_collected: Money,
        interest_earned: Money,
        late_fines_collected: Money,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentRecorded {
        contribution_id: ContributionId,
        member_id: MemberId,
        amount: Money,
        to_contribution: Money,
        to_interest: Money,
        to_late_fine: Money,
        paid_date: NaiveDate,
    },
    LateFineAssessed {
        contribution_id: ContributionId,
        member_id: MemberId,
        days_late: u32,
        fine_amount: Money,
    },
    CarryForwardApplied {
        member_id: MemberId,
        from_sequence: u32,
        to_sequence: u32,
        amount: Money,
    },

    // cash allocation events
    CashAllocated {
        period_id: PeriodId,
        policy: AllocationPolicy,
        to_bank: Money,
        to_hand: Money,
        carry_forward: Money,
    },
    AllocationClosed {
        period_id: PeriodId,
        timestamp: DateTime<Utc>,
    },

    // group balance events
    GroupBalancesUpdated {
        group_id: GroupId,
        cash_in_hand: Money,
        bank_balance: Money,
        total_standing: Money,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

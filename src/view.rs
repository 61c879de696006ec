/// serialization support for ledger reporting
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::ledger::GroupLedger;
use crate::records::{MemberContribution, Period};
use crate::types::{ContributionStatus, GroupId, MemberId, PeriodId};

/// serializable snapshot of a group's ledger state
#[derive(Debug, Serialize, Deserialize)]
pub struct GroupSummaryView {
    pub id: GroupId,
    pub name: String,
    pub contribution_amount: Money,
    pub interest_rate: Rate,
    pub balances: BalancesView,
    pub current_period: Option<PeriodView>,
    pub period_count: usize,
    pub member_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalancesView {
    pub cash_in_hand: Money,
    pub bank_balance: Money,
    pub outstanding_loans: Money,
    pub total_standing: Money,
}

/// one period with its contribution rows
#[derive(Debug, Serialize, Deserialize)]
pub struct PeriodView {
    pub id: PeriodId,
    pub sequence_number: u32,
    pub meeting_date: NaiveDate,
    pub is_open: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub standing_at_start: Money,
    pub standing_at_end: Money,
    pub total_collected: Money,
    pub interest_earned: Money,
    pub late_fines_collected: Money,
    pub new_contributions: Money,
    pub contributions: Vec<ContributionView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContributionView {
    pub member_id: MemberId,
    pub member_name: Option<String>,
    pub status: ContributionStatus,
    pub minimum_due: Money,
    pub total_paid: Money,
    pub remaining_amount: Money,
    pub late_fine_amount: Money,
    pub days_late: u32,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
}

impl GroupSummaryView {
    pub fn from_ledger(ledger: &GroupLedger) -> Self {
        let outstanding = ledger.outstanding_loans();
        let current_period = ledger
            .current_period()
            .ok()
            .map(|p| PeriodView::from_period(ledger, p));

        GroupSummaryView {
            id: ledger.group.id,
            name: ledger.group.name.clone(),
            contribution_amount: ledger.group.contribution_amount,
            interest_rate: ledger.group.interest_rate,
            balances: BalancesView {
                cash_in_hand: ledger.group.cash_in_hand,
                bank_balance: ledger.group.bank_balance,
                outstanding_loans: outstanding,
                total_standing: ledger.group.total_standing(outstanding),
            },
            current_period,
            period_count: ledger.periods().len(),
            member_count: ledger.members().len(),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl PeriodView {
    pub fn from_period(ledger: &GroupLedger, period: &Period) -> Self {
        let contributions = ledger
            .contributions_for(period.id)
            .into_iter()
            .map(|row| ContributionView::from_row(ledger, row))
            .collect();

        PeriodView {
            id: period.id,
            sequence_number: period.sequence_number,
            meeting_date: period.meeting_date,
            is_open: period.is_open(),
            closed_at: period.closed_at,
            standing_at_start: period.standing_at_start,
            standing_at_end: period.standing_at_end,
            total_collected: period.total_collected,
            interest_earned: period.interest_earned,
            late_fines_collected: period.late_fines_collected,
            new_contributions: period.new_contributions,
            contributions,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl ContributionView {
    fn from_row(ledger: &GroupLedger, row: &MemberContribution) -> Self {
        let member_name = ledger
            .members()
            .iter()
            .find(|m| m.id == row.member_id)
            .map(|m| m.name.clone());

        ContributionView {
            member_id: row.member_id,
            member_name,
            status: row.status,
            minimum_due: row.minimum_due,
            total_paid: row.total_paid,
            remaining_amount: row.remaining_amount,
            late_fine_amount: row.late_fine_amount,
            days_late: row.days_late,
            due_date: row.due_date,
            paid_date: row.paid_date,
        }
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::fines::{fine_for, LateFineRule};
use crate::schedule::{days_late, CollectionSchedule};
use crate::types::{ContributionStatus, MemberId};

/// a member's computed due position for one period. produced as a pure
/// preview; persistence happens only in the closing orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDue {
    pub member_id: MemberId,
    pub compulsory_contribution_due: Money,
    pub loan_interest_due: Money,
    pub late_fine_amount: Money,
    pub minimum_due: Money,
    pub total_paid: Money,
    pub remaining_amount: Money,
    pub days_late: u32,
    pub status: ContributionStatus,
    pub due_date: NaiveDate,
}

/// flat per-period interest on the loan balance as of period start
pub fn expected_interest(loan_balance: Money, period_rate: Rate) -> Money {
    loan_balance.percentage(period_rate)
}

/// status from the reconciliation of paid against due.
/// an underpaid row past its due date is overdue, even if partially paid.
pub fn reconcile_status(minimum_due: Money, total_paid: Money, days: u32) -> ContributionStatus {
    if total_paid >= minimum_due {
        ContributionStatus::Paid
    } else if days > 0 {
        ContributionStatus::Overdue
    } else if total_paid.is_positive() {
        ContributionStatus::Partial
    } else {
        ContributionStatus::Pending
    }
}

/// inputs for one member's due computation
#[derive(Debug, Clone, Copy)]
pub struct DueInputs<'a> {
    pub member_id: MemberId,
    /// base contribution for the period (already includes any carry-forward)
    pub contribution_due: Money,
    pub loan_balance: Money,
    pub period_rate: Rate,
    pub late_fine_rule: Option<&'a LateFineRule>,
    pub schedule: &'a CollectionSchedule,
    /// the period's meeting/reference date
    pub reference_date: NaiveDate,
    pub total_paid: Money,
}

/// compute a member's due amount for the period as of `today`.
/// pure over its inputs; negative clamps (`max(0, ..)`) are steady states,
/// never errors.
pub fn compute_due(inputs: DueInputs<'_>, today: NaiveDate) -> MemberDue {
    let due_date = inputs.schedule.due_date_for(inputs.reference_date);
    let days = days_late(due_date, today);
    let interest_due = expected_interest(inputs.loan_balance, inputs.period_rate);
    let fine = fine_for(inputs.late_fine_rule, days, inputs.contribution_due);
    let minimum_due = inputs.contribution_due + interest_due + fine;
    let remaining = (minimum_due - inputs.total_paid).max(Money::ZERO);

    MemberDue {
        member_id: inputs.member_id,
        compulsory_contribution_due: inputs.contribution_due,
        loan_interest_due: interest_due,
        late_fine_amount: fine,
        minimum_due,
        total_paid: inputs.total_paid,
        remaining_amount: remaining,
        days_late: days,
        status: reconcile_status(minimum_due, inputs.total_paid, days),
        due_date,
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::dues::reconcile_status;
use crate::errors::{LedgerError, Result};
use crate::fines::LateFineRule;
use crate::schedule::CollectionSchedule;
use crate::types::{ContributionId, ContributionStatus, GroupId, MemberId, Payment, PeriodId};

/// a savings circle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    /// base contribution expected from every member per period
    pub contribution_amount: Money,
    /// flat interest rate applied per collection period
    pub interest_rate: Rate,
    pub schedule: CollectionSchedule,
    pub late_fine_rule: Option<LateFineRule>,
    pub cash_in_hand: Money,
    pub bank_balance: Money,
}

impl Group {
    /// total value held by the group: cash + bank + outstanding loans
    pub fn total_standing(&self, outstanding_loans: Money) -> Money {
        self.cash_in_hand + self.bank_balance + outstanding_loans
    }
}

/// a participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
}

impl Member {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// join between a group and a member. `current_loan_balance` is a cache
/// maintained by the loan subsystem; the ledger reads it but does not own it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub member_id: MemberId,
    pub share_amount: Money,
    pub current_loan_balance: Money,
}

impl Membership {
    pub fn new(member_id: MemberId, share_amount: Money) -> Self {
        Self {
            member_id,
            share_amount,
            current_loan_balance: Money::ZERO,
        }
    }

    pub fn with_loan(member_id: MemberId, share_amount: Money, loan_balance: Money) -> Self {
        Self {
            member_id,
            share_amount,
            current_loan_balance: loan_balance,
        }
    }
}

/// one collection cycle for a group. periods form a strict, gapless chain
/// per group; the period with the highest sequence number is the open one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Period {
    pub id: PeriodId,
    pub group_id: GroupId,
    pub sequence_number: u32,
    pub meeting_date: NaiveDate,
    pub standing_at_start: Money,
    pub standing_at_end: Money,
    pub cash_in_hand_at_end: Money,
    pub cash_in_bank_at_end: Money,
    pub total_collected: Money,
    pub interest_earned: Money,
    pub late_fines_collected: Money,
    pub new_contributions: Money,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Period {
    pub fn open(
        group_id: GroupId,
        sequence_number: u32,
        meeting_date: NaiveDate,
        standing_at_start: Money,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            sequence_number,
            meeting_date,
            standing_at_start,
            standing_at_end: Money::ZERO,
            cash_in_hand_at_end: Money::ZERO,
            cash_in_bank_at_end: Money::ZERO,
            total_collected: Money::ZERO,
            interest_earned: Money::ZERO,
            late_fines_collected: Money::ZERO,
            new_contributions: Money::ZERO,
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

/// the due/paid ledger row for one member within one period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberContribution {
    pub id: ContributionId,
    pub period_id: PeriodId,
    pub member_id: MemberId,
    pub compulsory_contribution_due: Money,
    pub loan_interest_due: Money,
    pub late_fine_amount: Money,
    pub minimum_due: Money,
    pub compulsory_contribution_paid: Money,
    pub loan_interest_paid: Money,
    pub late_fine_paid: Money,
    pub total_paid: Money,
    pub remaining_amount: Money,
    pub days_late: u32,
    pub status: ContributionStatus,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
}

impl MemberContribution {
    /// seed a fresh row when a period opens. `contribution_due` already
    /// includes any carry-forward from the previous period.
    pub fn seed(
        period_id: PeriodId,
        member_id: MemberId,
        contribution_due: Money,
        loan_interest_due: Money,
        due_date: NaiveDate,
    ) -> Self {
        let minimum_due = contribution_due + loan_interest_due;
        Self {
            id: Uuid::new_v4(),
            period_id,
            member_id,
            compulsory_contribution_due: contribution_due,
            loan_interest_due,
            late_fine_amount: Money::ZERO,
            minimum_due,
            compulsory_contribution_paid: Money::ZERO,
            loan_interest_paid: Money::ZERO,
            late_fine_paid: Money::ZERO,
            total_paid: Money::ZERO,
            remaining_amount: minimum_due,
            days_late: 0,
            status: ContributionStatus::Pending,
            due_date,
            paid_date: None,
        }
    }

    /// apply a batch of payment entries and re-reconcile status.
    /// invariant after every call:
    /// `total_paid == compulsory_paid + interest_paid + late_fine_paid` and
    /// `remaining == max(0, minimum_due - total_paid)`.
    pub fn apply_payment(&mut self, payments: &[Payment], paid_date: NaiveDate) -> Result<()> {
        for payment in payments {
            if payment.amount().is_negative() {
                return Err(LedgerError::validation(format!(
                    "negative payment amount {}",
                    payment.amount()
                )));
            }
        }

        for payment in payments {
            match payment {
                Payment::Compulsory(amount) | Payment::AdHoc(amount) => {
                    self.compulsory_contribution_paid += *amount;
                }
                Payment::LoanInterest(amount) => self.loan_interest_paid += *amount,
                Payment::LateFine(amount) => self.late_fine_paid += *amount,
            }
        }

        self.total_paid =
            self.compulsory_contribution_paid + self.loan_interest_paid + self.late_fine_paid;
        self.remaining_amount = (self.minimum_due - self.total_paid).max(Money::ZERO);
        self.paid_date = Some(paid_date);
        self.status = reconcile_status(self.minimum_due, self.total_paid, self.days_late);
        Ok(())
    }

    /// re-assess the late fine against freshly computed days-late.
    /// adjusts the minimum due and remaining balance accordingly.
    pub fn assess_late_fine(&mut self, days_late: u32, fine: Money) {
        self.days_late = days_late;
        self.late_fine_amount = fine;
        self.minimum_due =
            self.compulsory_contribution_due + self.loan_interest_due + self.late_fine_amount;
        self.remaining_amount = (self.minimum_due - self.total_paid).max(Money::ZERO);
        self.status = reconcile_status(self.minimum_due, self.total_paid, self.days_late);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seeded() -> MemberContribution {
        MemberContribution::seed(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(500),
            Money::from_major(1_200),
            date(2024, 3, 15),
        )
    }

    #[test]
    fn test_seed_initial_state() {
        let row = seeded();
        assert_eq!(row.minimum_due, Money::from_major(1_700));
        assert_eq!(row.remaining_amount, Money::from_major(1_700));
        assert_eq!(row.status, ContributionStatus::Pending);
        assert!(row.paid_date.is_none());
    }

    #[test]
    fn test_apply_payment_buckets_and_totals() {
        let mut row = seeded();
        row.apply_payment(
            &[
                Payment::Compulsory(Money::from_major(500)),
                Payment::LoanInterest(Money::from_major(700)),
            ],
            date(2024, 3, 14),
        )
        .unwrap();

        assert_eq!(row.total_paid, Money::from_major(1_200));
        assert_eq!(
            row.total_paid,
            row.compulsory_contribution_paid + row.loan_interest_paid + row.late_fine_paid
        );
        assert_eq!(row.remaining_amount, Money::from_major(500));
        assert_eq!(row.status, ContributionStatus::Partial);
        assert_eq!(row.paid_date, Some(date(2024, 3, 14)));
    }

    #[test]
    fn test_apply_payment_rejects_negative() {
        let mut row = seeded();
        let before = row.clone();
        let err = row.apply_payment(
            &[Payment::Compulsory(
                Money::from_str_exact("-10").unwrap(),
            )],
            date(2024, 3, 14),
        );
        assert!(err.is_err());
        // no partial state change on validation failure
        assert_eq!(row.total_paid, before.total_paid);
        assert_eq!(row.status, before.status);
    }

    #[test]
    fn test_ad_hoc_credits_contribution_bucket() {
        let mut row = seeded();
        row.apply_payment(&[Payment::AdHoc(Money::from_major(100))], date(2024, 3, 10))
            .unwrap();
        assert_eq!(row.compulsory_contribution_paid, Money::from_major(100));
    }

    #[test]
    fn test_assess_late_fine_raises_minimum_due() {
        let mut row = seeded();
        row.assess_late_fine(10, Money::from_major(130));
        assert_eq!(row.minimum_due, Money::from_major(1_830));
        assert_eq!(row.remaining_amount, Money::from_major(1_830));
        assert_eq!(row.status, ContributionStatus::Overdue);
    }

    #[test]
    fn test_full_payment_marks_paid() {
        let mut row = seeded();
        row.apply_payment(
            &[
                Payment::Compulsory(Money::from_major(500)),
                Payment::LoanInterest(Money::from_major(1_200)),
            ],
            date(2024, 3, 14),
        )
        .unwrap();
        assert_eq!(row.status, ContributionStatus::Paid);
        assert_eq!(row.remaining_amount, Money::ZERO);
    }
}

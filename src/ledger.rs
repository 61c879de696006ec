use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info};
use uuid::Uuid;

use crate::allocation::{allocate, CashAllocation};
use crate::config::GroupConfig;
use crate::decimal::Money;
use crate::dues::{compute_due, expected_interest, DueInputs, MemberDue};
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::fines::fine_for;
use crate::records::{Group, Member, MemberContribution, Membership, Period};
use crate::schedule::days_late;
use crate::types::{AllocationPolicy, ContributionId, MemberId, Payment, PeriodId};

/// outcome of a close-period operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodCloseOutcome {
    pub closed_period_id: PeriodId,
    /// absent when an auto-created period was updated in place
    pub new_period_id: Option<PeriodId>,
    pub auto_created: bool,
    pub total_collected: Money,
}

/// the full ledger state for one group: periods, contribution rows, cash
/// allocations, and the group's running balances.
///
/// closing operations for a group must be serialized; `&mut self` is the
/// exclusive lock scoped to the group. separate groups are separate
/// ledgers and close fully independently.
#[derive(Debug)]
pub struct GroupLedger {
    pub group: Group,
    members: Vec<Member>,
    memberships: Vec<Membership>,
    periods: Vec<Period>,
    contributions: Vec<MemberContribution>,
    allocations: Vec<CashAllocation>,
    pub events: EventStore,
}

impl GroupLedger {
    /// create a group ledger and open its first period, with one seeded
    /// contribution row per member
    pub fn new(
        config: GroupConfig,
        members: Vec<Member>,
        first_meeting_date: NaiveDate,
    ) -> Result<Self> {
        config.validate()?;

        let group = Group {
            id: Uuid::new_v4(),
            name: config.name,
            contribution_amount: config.contribution_amount,
            interest_rate: config.interest_rate,
            schedule: config.schedule,
            late_fine_rule: config.late_fine_rule,
            cash_in_hand: config.opening_cash_in_hand,
            bank_balance: config.opening_bank_balance,
        };

        let memberships = members
            .iter()
            .map(|m| Membership::new(m.id, group.contribution_amount))
            .collect();

        let mut ledger = Self {
            group,
            members,
            memberships,
            periods: Vec::new(),
            contributions: Vec::new(),
            allocations: Vec::new(),
            events: EventStore::new(),
        };

        let standing_at_start = ledger.group.total_standing(Money::ZERO);
        ledger.open_next_period(1, first_meeting_date, standing_at_start);
        Ok(ledger)
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn memberships(&self) -> &[Membership] {
        &self.memberships
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn contributions_for(&self, period_id: PeriodId) -> Vec<&MemberContribution> {
        self.contributions
            .iter()
            .filter(|c| c.period_id == period_id)
            .collect()
    }

    pub fn allocation_for(&self, period_id: PeriodId) -> Option<&CashAllocation> {
        self.allocations.iter().find(|a| a.period_id == period_id)
    }

    /// sum of outstanding loan balances from the membership cache (kept in
    /// sync by the loan subsystem)
    pub fn outstanding_loans(&self) -> Money {
        self.memberships
            .iter()
            .map(|m| m.current_loan_balance)
            .sum()
    }

    /// loan-subsystem sync hook: update a member's cached loan balance
    pub fn set_loan_balance(&mut self, member_id: MemberId, balance: Money) -> Result<()> {
        let membership = self
            .memberships
            .iter_mut()
            .find(|m| m.member_id == member_id)
            .ok_or(LedgerError::MembershipNotFound { member_id })?;
        membership.current_loan_balance = balance;
        Ok(())
    }

    /// the period with the highest sequence number for this group. never
    /// cached: always resolved from the stored chain.
    pub fn current_period(&self) -> Result<&Period> {
        self.periods
            .iter()
            .max_by_key(|p| p.sequence_number)
            .ok_or(LedgerError::NoOpenPeriod {
                group_id: self.group.id,
            })
    }

    fn live_sequence(&self) -> u32 {
        self.periods
            .iter()
            .map(|p| p.sequence_number)
            .max()
            .unwrap_or(0)
    }

    /// a period is an auto-created placeholder when its stored total is
    /// zero AND the live contribution rows show no payment. the stored
    /// total alone is only as fresh as the last write, so truth is always
    /// re-derived from the rows.
    pub fn is_auto_created(&self, period: &Period) -> bool {
        period.total_collected.is_zero()
            && self
                .contributions
                .iter()
                .filter(|c| c.period_id == period.id)
                .all(|c| c.total_paid.is_zero())
    }

    /// read-only preview of every member's due position for the open
    /// period as of now. no writes.
    pub fn current_due(&self, time: &SafeTimeProvider) -> Result<Vec<MemberDue>> {
        let period = self.current_period()?;
        if !period.is_open() {
            return Err(LedgerError::NoOpenPeriod {
                group_id: self.group.id,
            });
        }
        let today = time.now().date_naive();

        let mut dues = Vec::with_capacity(self.memberships.len());
        for membership in &self.memberships {
            let row = self
                .contributions
                .iter()
                .find(|c| c.period_id == period.id && c.member_id == membership.member_id);
            let (contribution_due, total_paid) = match row {
                Some(r) => (r.compulsory_contribution_due, r.total_paid),
                None => (self.group.contribution_amount, Money::ZERO),
            };
            dues.push(compute_due(
                DueInputs {
                    member_id: membership.member_id,
                    contribution_due,
                    loan_balance: membership.current_loan_balance,
                    period_rate: self.group.interest_rate,
                    late_fine_rule: self.group.late_fine_rule.as_ref(),
                    schedule: &self.group.schedule,
                    reference_date: period.meeting_date,
                    total_paid,
                },
                today,
            ));
        }
        Ok(dues)
    }

    /// record a payment against a single contribution row. re-assesses the
    /// late fine for the payment date, applies the tagged payment entries,
    /// and reconciles the row's status. never closes anything.
    pub fn record_payment(
        &mut self,
        contribution_id: ContributionId,
        payments: &[Payment],
        paid_date: NaiveDate,
    ) -> Result<&MemberContribution> {
        let row_idx = self
            .contributions
            .iter()
            .position(|c| c.id == contribution_id)
            .ok_or(LedgerError::ContributionNotFound {
                id: contribution_id,
            })?;

        let period = self
            .periods
            .iter()
            .find(|p| p.id == self.contributions[row_idx].period_id)
            .ok_or(LedgerError::PeriodNotFound {
                id: self.contributions[row_idx].period_id,
            })?;
        if !period.is_open() {
            return Err(LedgerError::TransactionClosed {
                period_sequence: period.sequence_number,
            });
        }

        // validate amounts before any mutation
        for payment in payments {
            if payment.amount().is_negative() {
                return Err(LedgerError::validation(format!(
                    "negative payment amount {}",
                    payment.amount()
                )));
            }
        }

        let row = &mut self.contributions[row_idx];
        let days = days_late(row.due_date, paid_date);
        let fine = fine_for(
            self.group.late_fine_rule.as_ref(),
            days,
            row.compulsory_contribution_due,
        );
        if fine != row.late_fine_amount || days != row.days_late {
            row.assess_late_fine(days, fine);
            if fine.is_positive() {
                self.events.emit(Event::LateFineAssessed {
                    contribution_id: row.id,
                    member_id: row.member_id,
                    days_late: days,
                    fine_amount: fine,
                });
            }
        }

        row.apply_payment(payments, paid_date)?;

        let (to_contribution, to_interest, to_late_fine) = payments.iter().fold(
            (Money::ZERO, Money::ZERO, Money::ZERO),
            |(c, i, f), p| match p {
                Payment::Compulsory(a) | Payment::AdHoc(a) => (c + *a, i, f),
                Payment::LoanInterest(a) => (c, i + *a, f),
                Payment::LateFine(a) => (c, i, f + *a),
            },
        );
        self.events.emit(Event::PaymentRecorded {
            contribution_id,
            member_id: self.contributions[row_idx].member_id,
            amount: to_contribution + to_interest + to_late_fine,
            to_contribution,
            to_interest,
            to_late_fine,
            paid_date,
        });

        Ok(&self.contributions[row_idx])
    }

    /// preview or adjust the cash allocation for an open period. can be
    /// called repeatedly before closing; each call replaces the previous
    /// open allocation. the total is re-derived from the live rows.
    pub fn allocate_cash(
        &mut self,
        period_id: PeriodId,
        policy: &AllocationPolicy,
    ) -> Result<CashAllocation> {
        let period = self
            .periods
            .iter()
            .find(|p| p.id == period_id)
            .ok_or(LedgerError::PeriodNotFound { id: period_id })?;
        if !period.is_open() {
            return Err(LedgerError::TransactionClosed {
                period_sequence: period.sequence_number,
            });
        }
        if let Some(existing) = self.allocation_for(period_id) {
            existing.ensure_open(period.sequence_number)?;
        }

        let total_collected = self.derived_total_paid(period_id);
        let allocation = allocate(period_id, total_collected, policy)?;

        self.events.emit(Event::CashAllocated {
            period_id,
            policy: *policy,
            to_bank: allocation.amount_to_bank,
            to_hand: allocation.amount_to_hand,
            carry_forward: allocation.carry_forward,
        });

        self.allocations.retain(|a| a.period_id != period_id);
        self.allocations.push(allocation.clone());
        Ok(allocation)
    }

    /// close a period and open the next one.
    ///
    /// re-derives totals from the live contribution rows, revalidates late
    /// fines against the group schedule, snapshots the closing period,
    /// allocates the collected cash, rolls the group balances, and seeds
    /// the next period with each member's carry-forward. an auto-created
    /// placeholder is updated in place instead (no new period row), so
    /// repeated visits before any collection never stack empty periods.
    ///
    /// all fallible checks run before the first mutation: the operation
    /// either lands completely or not at all.
    pub fn close_period(
        &mut self,
        period_id: PeriodId,
        policy: &AllocationPolicy,
        time: &SafeTimeProvider,
    ) -> Result<PeriodCloseOutcome> {
        let period_idx = self
            .periods
            .iter()
            .position(|p| p.id == period_id)
            .ok_or(LedgerError::PeriodNotFound { id: period_id })?;
        let period = &self.periods[period_idx];
        let sequence = period.sequence_number;

        let live_sequence = self.live_sequence();
        if sequence != live_sequence {
            return Err(LedgerError::SequenceConflict {
                requested: sequence,
                live_sequence,
            });
        }
        if !period.is_open() {
            return Err(LedgerError::TransactionClosed {
                period_sequence: sequence,
            });
        }

        let now = time.now();
        let today = now.date_naive();

        // revalidate late fines against the actual schedule before trusting
        // any stored figure
        let reassessments = self.reassess_fines(period_id, today);

        // derive truth from the live rows, not the stored snapshot
        let mut total_collected = Money::ZERO;
        let mut interest_collected = Money::ZERO;
        let mut fines_collected = Money::ZERO;
        for row in self.contributions.iter().filter(|c| c.period_id == period_id) {
            total_collected += row.total_paid;
            interest_collected += row.loan_interest_paid;
            fines_collected += row.late_fine_paid;
        }

        debug!(
            group = %self.group.name,
            sequence,
            %total_collected,
            %interest_collected,
            %fines_collected,
            "derived period totals"
        );

        let auto_created = self.periods[period_idx].total_collected.is_zero()
            && total_collected.is_zero();

        if auto_created {
            // placeholder with zero activity: update the row in place and
            // leave it open, never spawn a duplicate empty period
            for (idx, days, fine) in reassessments {
                self.contributions[idx].assess_late_fine(days, fine);
            }
            let outstanding = self.outstanding_loans();
            let standing = self.group.total_standing(outstanding);
            let period = &mut self.periods[period_idx];
            period.total_collected = Money::ZERO;
            period.interest_earned = Money::ZERO;
            period.late_fines_collected = Money::ZERO;
            period.new_contributions = Money::ZERO;
            period.cash_in_hand_at_end = self.group.cash_in_hand;
            period.cash_in_bank_at_end = self.group.bank_balance;
            period.standing_at_end = standing;

            info!(group = %self.group.name, sequence, "auto-created period updated in place");
            return Ok(PeriodCloseOutcome {
                closed_period_id: period_id,
                new_period_id: None,
                auto_created: true,
                total_collected: Money::ZERO,
            });
        }

        // all remaining fallible work happens before any mutation
        let mut allocation = allocate(period_id, total_collected, policy)?;

        let ending_hand = self.group.cash_in_hand + allocation.amount_to_hand;
        let ending_bank = self.group.bank_balance + allocation.amount_to_bank;
        let outstanding = self.outstanding_loans();
        let standing_at_end = ending_hand + ending_bank + outstanding;

        let next_sequence = sequence + 1;
        if self.periods.iter().any(|p| p.sequence_number == next_sequence) {
            // a retry after a partial failure must never create a second
            // next period
            return Err(LedgerError::SequenceConflict {
                requested: sequence,
                live_sequence: next_sequence,
            });
        }

        let next_meeting = self.group.schedule.next_meeting_date(self.periods[period_idx].meeting_date);
        let next_due_date = self.group.schedule.due_date_for(next_meeting);

        // carry-forward per member, with the reassessed fines applied to a
        // working view first so the rolled amount matches what will be stored
        let mut working: Vec<MemberContribution> = self
            .contributions
            .iter()
            .filter(|c| c.period_id == period_id)
            .cloned()
            .collect();
        for (idx, days, fine) in &reassessments {
            let id = self.contributions[*idx].id;
            if let Some(row) = working.iter_mut().find(|r| r.id == id) {
                row.assess_late_fine(*days, *fine);
            }
        }
        let mut carry_forwards: Vec<(MemberId, Money)> = Vec::with_capacity(working.len());
        for row in &working {
            let carry = row.remaining_amount;
            if carry.is_negative() {
                return Err(LedgerError::InconsistentCarryForward {
                    member_id: row.member_id,
                    amount: carry,
                });
            }
            carry_forwards.push((row.member_id, carry));
        }

        // commit: nothing below can fail
        for (idx, days, fine) in reassessments {
            self.contributions[idx].assess_late_fine(days, fine);
        }

        {
            let period = &mut self.periods[period_idx];
            period.total_collected = total_collected;
            period.interest_earned = interest_collected;
            period.late_fines_collected = fines_collected;
            period.new_contributions = total_collected - interest_collected - fines_collected;
            period.cash_in_hand_at_end = ending_hand;
            period.cash_in_bank_at_end = ending_bank;
            period.standing_at_end = standing_at_end;
            period.closed_at = Some(now);
        }

        allocation.close(now);
        self.events.emit(Event::CashAllocated {
            period_id,
            policy: *policy,
            to_bank: allocation.amount_to_bank,
            to_hand: allocation.amount_to_hand,
            carry_forward: allocation.carry_forward,
        });
        self.events.emit(Event::AllocationClosed {
            period_id,
            timestamp: now,
        });
        self.allocations.retain(|a| a.period_id != period_id);
        self.allocations.push(allocation);

        self.group.cash_in_hand = ending_hand;
        self.group.bank_balance = ending_bank;
        self.events.emit(Event::GroupBalancesUpdated {
            group_id: self.group.id,
            cash_in_hand: ending_hand,
            bank_balance: ending_bank,
            total_standing: standing_at_end,
        });

        self.events.emit(Event::PeriodClosed {
            group_id: self.group.id,
            period_id,
            sequence_number: sequence,
            total_collected,
            interest_earned: interest_collected,
            late_fines_collected: fines_collected,
            timestamp: now,
        });

        // open the next period, seeded for every active membership (a
        // member without a row in the closing period still gets one)
        let new_period = Period::open(self.group.id, next_sequence, next_meeting, standing_at_end);
        let new_period_id = new_period.id;
        self.events.emit(Event::PeriodOpened {
            group_id: self.group.id,
            period_id: new_period_id,
            sequence_number: next_sequence,
            meeting_date: next_meeting,
            standing_at_start: standing_at_end,
        });
        self.periods.push(new_period);

        let mut seeds = Vec::with_capacity(self.memberships.len());
        for membership in &self.memberships {
            let carry = carry_forwards
                .iter()
                .find(|(id, _)| *id == membership.member_id)
                .map(|(_, c)| *c)
                .unwrap_or(Money::ZERO);
            if carry.is_positive() {
                self.events.emit(Event::CarryForwardApplied {
                    member_id: membership.member_id,
                    from_sequence: sequence,
                    to_sequence: next_sequence,
                    amount: carry,
                });
            }
            let contribution_due = self.group.contribution_amount + carry;
            let interest_due =
                expected_interest(membership.current_loan_balance, self.group.interest_rate);
            seeds.push(MemberContribution::seed(
                new_period_id,
                membership.member_id,
                contribution_due,
                interest_due,
                next_due_date,
            ));
        }
        // batch insert, one extend rather than row-by-row pushes
        self.contributions.extend(seeds);

        info!(
            group = %self.group.name,
            closed_sequence = sequence,
            new_sequence = next_sequence,
            %total_collected,
            %standing_at_end,
            "period closed"
        );

        Ok(PeriodCloseOutcome {
            closed_period_id: period_id,
            new_period_id: Some(new_period_id),
            auto_created: false,
            total_collected,
        })
    }

    /// idempotently ensure the group has an open period. opens an
    /// auto-created placeholder only when the latest period is closed;
    /// an already-open period is returned as-is, never duplicated.
    pub fn ensure_open_period(&mut self) -> Result<PeriodId> {
        let latest = self.current_period()?;
        if latest.is_open() {
            return Ok(latest.id);
        }

        let sequence = latest.sequence_number;
        let meeting_date = latest.meeting_date;
        let standing = latest.standing_at_end;
        let latest_id = latest.id;
        let next_sequence = sequence + 1;
        if self.periods.iter().any(|p| p.sequence_number == next_sequence) {
            return Err(LedgerError::SequenceConflict {
                requested: sequence,
                live_sequence: next_sequence,
            });
        }

        let next_meeting = self.group.schedule.next_meeting_date(meeting_date);
        let next_due_date = self.group.schedule.due_date_for(next_meeting);

        let new_period = Period::open(self.group.id, next_sequence, next_meeting, standing);
        let new_period_id = new_period.id;
        self.events.emit(Event::PeriodOpened {
            group_id: self.group.id,
            period_id: new_period_id,
            sequence_number: next_sequence,
            meeting_date: next_meeting,
            standing_at_start: standing,
        });
        self.periods.push(new_period);

        let carry_rows: Vec<(MemberId, Money)> = self
            .contributions
            .iter()
            .filter(|c| c.period_id == latest_id)
            .map(|c| (c.member_id, c.remaining_amount))
            .collect();

        let mut seeds = Vec::with_capacity(self.memberships.len());
        for membership in &self.memberships {
            let carry = carry_rows
                .iter()
                .find(|(id, _)| *id == membership.member_id)
                .map(|(_, c)| *c)
                .unwrap_or(Money::ZERO);
            let contribution_due = self.group.contribution_amount + carry;
            let interest_due =
                expected_interest(membership.current_loan_balance, self.group.interest_rate);
            seeds.push(MemberContribution::seed(
                new_period_id,
                membership.member_id,
                contribution_due,
                interest_due,
                next_due_date,
            ));
        }
        self.contributions.extend(seeds);

        info!(group = %self.group.name, sequence = next_sequence, "opened placeholder period");
        Ok(new_period_id)
    }

    fn derived_total_paid(&self, period_id: PeriodId) -> Money {
        self.contributions
            .iter()
            .filter(|c| c.period_id == period_id)
            .map(|c| c.total_paid)
            .sum()
    }

    /// recompute days-late and fines for a period's rows as of the
    /// recorded payment date (or `today` for unpaid rows). returns the
    /// changes without applying them.
    fn reassess_fines(&self, period_id: PeriodId, today: NaiveDate) -> Vec<(usize, u32, Money)> {
        let mut changes = Vec::new();
        for (idx, row) in self.contributions.iter().enumerate() {
            if row.period_id != period_id {
                continue;
            }
            let as_of = row.paid_date.unwrap_or(today);
            let days = days_late(row.due_date, as_of);
            let fine = fine_for(
                self.group.late_fine_rule.as_ref(),
                days,
                row.compulsory_contribution_due,
            );
            if days != row.days_late || fine != row.late_fine_amount {
                changes.push((idx, days, fine));
            }
        }
        changes
    }

    fn open_next_period(
        &mut self,
        sequence: u32,
        meeting_date: NaiveDate,
        standing_at_start: Money,
    ) {
        let period = Period::open(self.group.id, sequence, meeting_date, standing_at_start);
        let period_id = period.id;
        let due_date = self.group.schedule.due_date_for(meeting_date);

        self.events.emit(Event::PeriodOpened {
            group_id: self.group.id,
            period_id,
            sequence_number: sequence,
            meeting_date,
            standing_at_start,
        });
        self.periods.push(period);

        let mut seeds = Vec::with_capacity(self.memberships.len());
        for membership in &self.memberships {
            let interest_due =
                expected_interest(membership.current_loan_balance, self.group.interest_rate);
            seeds.push(MemberContribution::seed(
                period_id,
                membership.member_id,
                self.group.contribution_amount,
                interest_due,
                due_date,
            ));
        }
        self.contributions.extend(seeds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::fines::{FineTier, LateFineRule};
    use crate::types::ContributionStatus;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time_at(y: i32, m: u32, d: u32) -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
        ))
    }

    fn tiered_rule() -> LateFineRule {
        LateFineRule::tiered(vec![
            FineTier {
                start_day: 1,
                end_day: 7,
                amount: dec!(10),
                is_percentage: false,
            },
            FineTier {
                start_day: 8,
                end_day: 15,
                amount: dec!(20),
                is_percentage: false,
            },
        ])
    }

    /// one-member group matching the worked example: contribution 500,
    /// 12% per period, 10,000 loan, tiered fines 10/day then 20/day
    fn sample_ledger() -> (GroupLedger, MemberId) {
        let member = Member::new("asha");
        let member_id = member.id;
        let config = GroupConfig::monthly(
            "bachat gat",
            Money::from_major(500),
            Rate::from_percentage(12),
            15,
        )
        .with_late_fine_rule(tiered_rule());
        let mut ledger = GroupLedger::new(config, vec![member], date(2024, 3, 1)).unwrap();
        ledger
            .set_loan_balance(member_id, Money::from_major(10_000))
            .unwrap();
        (ledger, member_id)
    }

    #[test]
    fn test_new_ledger_opens_first_period() {
        let (ledger, member_id) = sample_ledger();
        let period = ledger.current_period().unwrap();
        assert_eq!(period.sequence_number, 1);
        assert!(period.is_open());

        let rows = ledger.contributions_for(period.id);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].member_id, member_id);
        assert_eq!(rows[0].status, ContributionStatus::Pending);
        assert_eq!(rows[0].due_date, date(2024, 3, 15));
    }

    #[test]
    fn test_current_due_matches_worked_example() {
        let (ledger, _) = sample_ledger();
        // 10 days past the march 15 due date
        let time = time_at(2024, 3, 25);
        let dues = ledger.current_due(&time).unwrap();
        assert_eq!(dues.len(), 1);
        let due = &dues[0];
        assert_eq!(due.late_fine_amount, Money::from_major(130)); // 7x10 + 3x20
        assert_eq!(due.loan_interest_due, Money::from_major(1_200));
        assert_eq!(due.minimum_due, Money::from_major(1_830));
        assert_eq!(due.status, ContributionStatus::Overdue);
    }

    #[test]
    fn test_current_due_is_pure_preview() {
        let (ledger, _) = sample_ledger();
        let time = time_at(2024, 3, 25);
        let _ = ledger.current_due(&time).unwrap();
        // stored rows untouched by the preview
        let period = ledger.current_period().unwrap();
        let rows = ledger.contributions_for(period.id);
        assert_eq!(rows[0].late_fine_amount, Money::ZERO);
        assert_eq!(rows[0].days_late, 0);
    }

    #[test]
    fn test_record_payment_partial_overdue() {
        let (mut ledger, _) = sample_ledger();
        let period_id = ledger.current_period().unwrap().id;
        let row_id = ledger.contributions_for(period_id)[0].id;

        ledger
            .record_payment(
                row_id,
                &[Payment::Compulsory(Money::from_major(1_000))],
                date(2024, 3, 25),
            )
            .unwrap();

        let row = ledger.contributions_for(period_id)[0];
        assert_eq!(row.days_late, 10);
        assert_eq!(row.late_fine_amount, Money::from_major(130));
        assert_eq!(row.minimum_due, Money::from_major(1_830));
        assert_eq!(row.remaining_amount, Money::from_major(830));
        assert_eq!(row.status, ContributionStatus::Overdue);
    }

    #[test]
    fn test_close_period_worked_example_end_to_end() {
        let (mut ledger, member_id) = sample_ledger();
        let period_id = ledger.current_period().unwrap().id;
        let row_id = ledger.contributions_for(period_id)[0].id;

        ledger
            .record_payment(
                row_id,
                &[Payment::Compulsory(Money::from_major(1_000))],
                date(2024, 3, 25),
            )
            .unwrap();

        let time = time_at(2024, 3, 25);
        let outcome = ledger
            .close_period(period_id, &AllocationPolicy::EvenSplit, &time)
            .unwrap();
        assert!(!outcome.auto_created);
        assert_eq!(outcome.total_collected, Money::from_major(1_000));

        // even split of 1,000 collected
        let alloc = ledger.allocation_for(period_id).unwrap();
        assert_eq!(alloc.amount_to_bank, Money::from_major(500));
        assert_eq!(alloc.amount_to_hand, Money::from_major(500));
        assert!(alloc.is_closed);

        // closed snapshot
        let closed = ledger.periods().iter().find(|p| p.id == period_id).unwrap();
        assert!(!closed.is_open());
        assert_eq!(closed.total_collected, Money::from_major(1_000));
        assert_eq!(closed.cash_in_hand_at_end, Money::from_major(500));
        assert_eq!(closed.cash_in_bank_at_end, Money::from_major(500));
        // conservation: hand + bank + loans == standing at end
        assert_eq!(
            closed.standing_at_end,
            closed.cash_in_hand_at_end
                + closed.cash_in_bank_at_end
                + ledger.outstanding_loans()
        );

        // next period seeded with base + carry-forward, fresh interest
        let new_period_id = outcome.new_period_id.unwrap();
        let new_period = ledger
            .periods()
            .iter()
            .find(|p| p.id == new_period_id)
            .unwrap();
        assert_eq!(new_period.sequence_number, 2);
        assert_eq!(new_period.standing_at_start, closed.standing_at_end);

        let next_row = ledger.contributions_for(new_period_id)[0];
        assert_eq!(next_row.member_id, member_id);
        assert_eq!(
            next_row.compulsory_contribution_due,
            Money::from_major(500) + Money::from_major(830)
        );
        assert_eq!(next_row.loan_interest_due, Money::from_major(1_200));
        assert_eq!(
            next_row.minimum_due,
            Money::from_major(1_330) + Money::from_major(1_200)
        );
        assert_eq!(next_row.status, ContributionStatus::Pending);
    }

    #[test]
    fn test_group_balances_roll_forward() {
        let (mut ledger, _) = sample_ledger();
        let period_id = ledger.current_period().unwrap().id;
        let row_id = ledger.contributions_for(period_id)[0].id;
        ledger
            .record_payment(
                row_id,
                &[Payment::Compulsory(Money::from_major(1_000))],
                date(2024, 3, 25),
            )
            .unwrap();

        let time = time_at(2024, 3, 25);
        ledger
            .close_period(period_id, &AllocationPolicy::AllToBank, &time)
            .unwrap();
        assert_eq!(ledger.group.bank_balance, Money::from_major(1_000));
        assert_eq!(ledger.group.cash_in_hand, Money::ZERO);
    }

    #[test]
    fn test_auto_created_period_collapses_in_place() {
        let (mut ledger, _) = sample_ledger();
        let period_id = ledger.current_period().unwrap().id;

        let time = time_at(2024, 3, 25);
        let outcome = ledger
            .close_period(period_id, &AllocationPolicy::EvenSplit, &time)
            .unwrap();
        assert!(outcome.auto_created);
        assert!(outcome.new_period_id.is_none());

        // still exactly one period, still open, no duplicate empties
        assert_eq!(ledger.periods().len(), 1);
        assert!(ledger.current_period().unwrap().is_open());

        // closing again is still a collapse, not a duplicate
        let again = ledger
            .close_period(period_id, &AllocationPolicy::EvenSplit, &time)
            .unwrap();
        assert!(again.auto_created);
        assert_eq!(ledger.periods().len(), 1);
    }

    #[test]
    fn test_sequence_conflict_on_stale_period() {
        let (mut ledger, _) = sample_ledger();
        let first_id = ledger.current_period().unwrap().id;
        let row_id = ledger.contributions_for(first_id)[0].id;
        ledger
            .record_payment(
                row_id,
                &[Payment::Compulsory(Money::from_major(500))],
                date(2024, 3, 14),
            )
            .unwrap();

        let time = time_at(2024, 3, 25);
        ledger
            .close_period(first_id, &AllocationPolicy::EvenSplit, &time)
            .unwrap();

        // retrying the close of the superseded period reports the live
        // sequence so the caller can re-read and retry
        let err = ledger
            .close_period(first_id, &AllocationPolicy::EvenSplit, &time)
            .unwrap_err();
        match err {
            LedgerError::SequenceConflict {
                requested,
                live_sequence,
            } => {
                assert_eq!(requested, 1);
                assert_eq!(live_sequence, 2);
            }
            other => panic!("expected SequenceConflict, got {other:?}"),
        }
    }

    #[test]
    fn test_monotonic_gapless_sequence_over_many_closes() {
        let (mut ledger, _) = sample_ledger();
        let time = time_at(2024, 3, 25);

        for _ in 0..5 {
            let period_id = ledger.current_period().unwrap().id;
            let row_id = ledger.contributions_for(period_id)[0].id;
            ledger
                .record_payment(
                    row_id,
                    &[Payment::Compulsory(Money::from_major(500))],
                    date(2024, 3, 14),
                )
                .unwrap();
            ledger
                .close_period(period_id, &AllocationPolicy::EvenSplit, &time)
                .unwrap();
        }

        let mut sequences: Vec<u32> =
            ledger.periods().iter().map(|p| p.sequence_number).collect();
        sequences.sort_unstable();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_standing_chains_across_periods() {
        let (mut ledger, _) = sample_ledger();
        let time = time_at(2024, 3, 25);

        for _ in 0..3 {
            let period_id = ledger.current_period().unwrap().id;
            let row_id = ledger.contributions_for(period_id)[0].id;
            ledger
                .record_payment(
                    row_id,
                    &[Payment::Compulsory(Money::from_major(500))],
                    date(2024, 3, 14),
                )
                .unwrap();
            ledger
                .close_period(period_id, &AllocationPolicy::EvenSplit, &time)
                .unwrap();
        }

        let mut periods: Vec<&Period> = ledger.periods().iter().collect();
        periods.sort_by_key(|p| p.sequence_number);
        for pair in periods.windows(2) {
            assert_eq!(pair[1].standing_at_start, pair[0].standing_at_end);
        }
    }

    #[test]
    fn test_payment_on_closed_period_rejected() {
        let (mut ledger, _) = sample_ledger();
        let period_id = ledger.current_period().unwrap().id;
        let row_id = ledger.contributions_for(period_id)[0].id;
        ledger
            .record_payment(
                row_id,
                &[Payment::Compulsory(Money::from_major(500))],
                date(2024, 3, 14),
            )
            .unwrap();

        let time = time_at(2024, 3, 25);
        ledger
            .close_period(period_id, &AllocationPolicy::EvenSplit, &time)
            .unwrap();

        let err = ledger
            .record_payment(
                row_id,
                &[Payment::Compulsory(Money::from_major(100))],
                date(2024, 3, 26),
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::TransactionClosed { .. }));
    }

    #[test]
    fn test_allocate_cash_preview_is_repeatable() {
        let (mut ledger, _) = sample_ledger();
        let period_id = ledger.current_period().unwrap().id;
        let row_id = ledger.contributions_for(period_id)[0].id;
        ledger
            .record_payment(
                row_id,
                &[Payment::Compulsory(Money::from_major(1_000))],
                date(2024, 3, 14),
            )
            .unwrap();

        let first = ledger
            .allocate_cash(period_id, &AllocationPolicy::AllToBank)
            .unwrap();
        assert_eq!(first.amount_to_bank, Money::from_major(1_000));

        // a second preview with a different policy replaces the first
        let second = ledger
            .allocate_cash(period_id, &AllocationPolicy::EvenSplit)
            .unwrap();
        assert_eq!(second.amount_to_bank, Money::from_major(500));
        assert!(!second.is_closed);
    }

    #[test]
    fn test_allocate_cash_custom_validation() {
        let (mut ledger, _) = sample_ledger();
        let period_id = ledger.current_period().unwrap().id;
        let row_id = ledger.contributions_for(period_id)[0].id;
        ledger
            .record_payment(
                row_id,
                &[Payment::Compulsory(Money::from_major(1_000))],
                date(2024, 3, 14),
            )
            .unwrap();

        let err = ledger
            .allocate_cash(
                period_id,
                &AllocationPolicy::CustomSplit {
                    to_bank: Money::from_major(900),
                    to_hand: Money::from_major(200),
                },
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
    }

    #[test]
    fn test_custom_split_carry_forward_on_close() {
        let (mut ledger, _) = sample_ledger();
        let period_id = ledger.current_period().unwrap().id;
        let row_id = ledger.contributions_for(period_id)[0].id;
        ledger
            .record_payment(
                row_id,
                &[Payment::Compulsory(Money::from_major(1_000))],
                date(2024, 3, 14),
            )
            .unwrap();

        let time = time_at(2024, 3, 25);
        ledger
            .close_period(
                period_id,
                &AllocationPolicy::CustomSplit {
                    to_bank: Money::from_major(600),
                    to_hand: Money::from_major(300),
                },
                &time,
            )
            .unwrap();

        let alloc = ledger.allocation_for(period_id).unwrap();
        assert_eq!(alloc.carry_forward, Money::from_major(100));
        assert!(alloc.is_balanced());
        // only the allocated cash lands in the group balances
        assert_eq!(ledger.group.bank_balance, Money::from_major(600));
        assert_eq!(ledger.group.cash_in_hand, Money::from_major(300));
    }

    #[test]
    fn test_ensure_open_period_idempotent() {
        let (mut ledger, _) = sample_ledger();

        let open_id = ledger.current_period().unwrap().id;
        // already open: returned as-is, nothing new created
        assert_eq!(ledger.ensure_open_period().unwrap(), open_id);
        assert_eq!(ledger.periods().len(), 1);
    }

    #[test]
    fn test_multi_member_close_covers_all_members() {
        let anita = Member::new("anita");
        let babita = Member::new("babita");
        let anita_id = anita.id;
        let babita_id = babita.id;
        let config = GroupConfig::monthly(
            "two member gat",
            Money::from_major(500),
            Rate::from_percentage(12),
            15,
        );
        let mut ledger =
            GroupLedger::new(config, vec![anita, babita], date(2024, 3, 1)).unwrap();

        let period_id = ledger.current_period().unwrap().id;
        let anita_row = ledger
            .contributions_for(period_id)
            .iter()
            .find(|c| c.member_id == anita_id)
            .unwrap()
            .id;
        // only anita pays; babita's full due rolls forward
        ledger
            .record_payment(
                anita_row,
                &[Payment::Compulsory(Money::from_major(500))],
                date(2024, 3, 14),
            )
            .unwrap();

        let time = time_at(2024, 3, 25);
        let outcome = ledger
            .close_period(period_id, &AllocationPolicy::EvenSplit, &time)
            .unwrap();
        let new_period_id = outcome.new_period_id.unwrap();

        let rows = ledger.contributions_for(new_period_id);
        assert_eq!(rows.len(), 2);
        let anita_next = rows.iter().find(|c| c.member_id == anita_id).unwrap();
        let babita_next = rows.iter().find(|c| c.member_id == babita_id).unwrap();
        assert_eq!(anita_next.compulsory_contribution_due, Money::from_major(500));
        assert_eq!(
            babita_next.compulsory_contribution_due,
            Money::from_major(1_000)
        );
    }

    #[test]
    fn test_events_emitted_on_close() {
        let (mut ledger, _) = sample_ledger();
        let period_id = ledger.current_period().unwrap().id;
        let row_id = ledger.contributions_for(period_id)[0].id;
        ledger
            .record_payment(
                row_id,
                &[Payment::Compulsory(Money::from_major(500))],
                date(2024, 3, 14),
            )
            .unwrap();
        ledger.events.clear();

        let time = time_at(2024, 3, 25);
        ledger
            .close_period(period_id, &AllocationPolicy::EvenSplit, &time)
            .unwrap();

        let events = ledger.events.events();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::PeriodClosed { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::PeriodOpened { sequence_number: 2, .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::AllocationClosed { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::GroupBalancesUpdated { .. })));
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};

/// one tier of a progressive late-fine schedule, covering an inclusive
/// day range. `amount` is per day: a flat rupee amount, or a percentage of
/// the expected contribution when `is_percentage` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FineTier {
    pub start_day: u32,
    pub end_day: u32,
    pub amount: Decimal,
    pub is_percentage: bool,
}

impl FineTier {
    fn contains(&self, day: u32) -> bool {
        day >= self.start_day && day <= self.end_day
    }

    fn daily_fine(&self, expected_contribution: Money) -> Money {
        if self.is_percentage {
            expected_contribution.percentage(Rate::from_percentage_decimal(self.amount))
        } else {
            Money::from_decimal(self.amount)
        }
    }
}

/// kind of late-fine rule a group has configured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LateFineKind {
    /// flat amount per day late
    DailyFixed { daily_amount: Money },
    /// percentage of the expected contribution per day late
    DailyPercentage { daily_percentage: Decimal },
    /// per-day amount looked up from a tier schedule
    Tiered { tiers: Vec<FineTier> },
}

/// a group's late-fine rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateFineRule {
    pub enabled: bool,
    pub kind: LateFineKind,
}

impl LateFineRule {
    pub fn daily_fixed(daily_amount: Money) -> Self {
        Self {
            enabled: true,
            kind: LateFineKind::DailyFixed { daily_amount },
        }
    }

    pub fn daily_percentage(daily_percentage: Decimal) -> Self {
        Self {
            enabled: true,
            kind: LateFineKind::DailyPercentage { daily_percentage },
        }
    }

    pub fn tiered(tiers: Vec<FineTier>) -> Self {
        Self {
            enabled: true,
            kind: LateFineKind::Tiered { tiers },
        }
    }

    /// reject negative amounts, inverted day ranges, and overlapping tiers.
    /// gaps between tiers are allowed; uncovered days simply accrue no fine
    /// (use `coverage_gaps` to surface them to rule authors).
    pub fn validate(&self) -> Result<()> {
        match &self.kind {
            LateFineKind::DailyFixed { daily_amount } => {
                if daily_amount.is_negative() {
                    return Err(LedgerError::validation("daily fine amount cannot be negative"));
                }
            }
            LateFineKind::DailyPercentage { daily_percentage } => {
                if daily_percentage.is_sign_negative() {
                    return Err(LedgerError::validation("daily fine percentage cannot be negative"));
                }
            }
            LateFineKind::Tiered { tiers } => {
                for tier in tiers {
                    if tier.start_day == 0 || tier.end_day < tier.start_day {
                        return Err(LedgerError::validation(format!(
                            "invalid tier day range {}-{}",
                            tier.start_day, tier.end_day
                        )));
                    }
                    if tier.amount.is_sign_negative() {
                        return Err(LedgerError::validation("tier amount cannot be negative"));
                    }
                }
                let mut sorted: Vec<&FineTier> = tiers.iter().collect();
                sorted.sort_by_key(|t| t.start_day);
                for pair in sorted.windows(2) {
                    if pair[1].start_day <= pair[0].end_day {
                        return Err(LedgerError::validation(format!(
                            "overlapping tiers: {}-{} and {}-{}",
                            pair[0].start_day, pair[0].end_day, pair[1].start_day, pair[1].end_day
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// day ranges in `[1, up_to_day]` not covered by any tier.
    /// empty for non-tiered rules.
    pub fn coverage_gaps(&self, up_to_day: u32) -> Vec<(u32, u32)> {
        let LateFineKind::Tiered { tiers } = &self.kind else {
            return Vec::new();
        };
        let mut gaps = Vec::new();
        let mut gap_start: Option<u32> = None;
        for day in 1..=up_to_day {
            let covered = tiers.iter().any(|t| t.contains(day));
            match (covered, gap_start) {
                (false, None) => gap_start = Some(day),
                (true, Some(start)) => {
                    gaps.push((start, day - 1));
                    gap_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = gap_start {
            gaps.push((start, up_to_day));
        }
        gaps
    }
}

/// fine owed for a payment `days_late` days past its due date.
/// zero when there is no rule, the rule is disabled, or the payment is on
/// time. tiered rules accumulate day by day: each late day is charged at
/// the tier containing that day, never the final day's tier times the span.
pub fn fine_for(rule: Option<&LateFineRule>, days_late: u32, expected_contribution: Money) -> Money {
    let Some(rule) = rule else {
        return Money::ZERO;
    };
    if !rule.enabled || days_late == 0 {
        return Money::ZERO;
    }

    match &rule.kind {
        LateFineKind::DailyFixed { daily_amount } => *daily_amount * Decimal::from(days_late),
        LateFineKind::DailyPercentage { daily_percentage } => {
            let rate = Rate::from_percentage_decimal(*daily_percentage);
            Money::from_decimal(
                expected_contribution.as_decimal() * rate.as_decimal() * Decimal::from(days_late),
            )
        }
        LateFineKind::Tiered { tiers } => {
            let mut total = Decimal::ZERO;
            for day in 1..=days_late {
                if let Some(tier) = tiers.iter().find(|t| t.contains(day)) {
                    total += tier.daily_fine(expected_contribution).as_decimal();
                }
            }
            Money::from_decimal(total)
        }
    }
}

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::fines::LateFineRule;
use crate::schedule::CollectionSchedule;
use crate::types::CollectionFrequency;

/// group configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    pub contribution_amount: Money,
    /// flat interest rate charged per collection period on loan balances
    pub interest_rate: Rate,
    pub schedule: CollectionSchedule,
    pub late_fine_rule: Option<LateFineRule>,
    pub opening_cash_in_hand: Money,
    pub opening_bank_balance: Money,
}

impl GroupConfig {
    /// monthly collection on a fixed day of the month
    pub fn monthly(
        name: impl Into<String>,
        contribution_amount: Money,
        interest_rate: Rate,
        collection_day: u8,
    ) -> Self {
        Self {
            name: name.into(),
            contribution_amount,
            interest_rate,
            schedule: CollectionSchedule::monthly(collection_day),
            late_fine_rule: None,
            opening_cash_in_hand: Money::ZERO,
            opening_bank_balance: Money::ZERO,
        }
    }

    /// weekly collection on a fixed weekday
    pub fn weekly(
        name: impl Into<String>,
        contribution_amount: Money,
        interest_rate: Rate,
        collection_day: Weekday,
    ) -> Self {
        Self {
            name: name.into(),
            contribution_amount,
            interest_rate,
            schedule: CollectionSchedule::weekly(collection_day),
            late_fine_rule: None,
            opening_cash_in_hand: Money::ZERO,
            opening_bank_balance: Money::ZERO,
        }
    }

    pub fn with_late_fine_rule(mut self, rule: LateFineRule) -> Self {
        self.late_fine_rule = Some(rule);
        self
    }

    pub fn with_opening_balances(mut self, cash_in_hand: Money, bank_balance: Money) -> Self {
        self.opening_cash_in_hand = cash_in_hand;
        self.opening_bank_balance = bank_balance;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::validation("group name cannot be empty"));
        }
        if self.contribution_amount.is_negative() {
            return Err(LedgerError::validation("contribution amount cannot be negative"));
        }
        if self.interest_rate.is_negative() {
            return Err(LedgerError::validation("interest rate cannot be negative"));
        }
        if self.opening_cash_in_hand.is_negative() || self.opening_bank_balance.is_negative() {
            return Err(LedgerError::validation("opening balances cannot be negative"));
        }

        match self.schedule.frequency {
            CollectionFrequency::Monthly | CollectionFrequency::Yearly => {
                let day = self.schedule.day_of_month.unwrap_or(1);
                if !(1..=31).contains(&day) {
                    return Err(LedgerError::validation(format!(
                        "collection day of month {day} out of range 1-31"
                    )));
                }
            }
            CollectionFrequency::Weekly => {
                if self.schedule.day_of_week.is_none() {
                    return Err(LedgerError::validation(
                        "weekly schedule requires a collection day of week",
                    ));
                }
            }
            CollectionFrequency::Fortnightly => {
                if self.schedule.day_of_week.is_none() {
                    return Err(LedgerError::validation(
                        "fortnightly schedule requires a collection day of week",
                    ));
                }
                let week = self.schedule.week_of_month.unwrap_or(1);
                if !(1..=4).contains(&week) {
                    return Err(LedgerError::validation(format!(
                        "collection week of month {week} out of range 1-4"
                    )));
                }
            }
        }

        if let Some(rule) = &self.late_fine_rule {
            rule.validate()?;
        }

        Ok(())
    }
}

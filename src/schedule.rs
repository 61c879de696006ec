use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::types::CollectionFrequency;

/// a group's recurring collection configuration.
/// all date arithmetic is on plain calendar dates (UTC midnight), so the
/// caller's time zone can never shift a due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchedule {
    pub frequency: CollectionFrequency,
    /// for monthly/yearly collections (1-31, clamped to month end)
    pub day_of_month: Option<u8>,
    /// for weekly/fortnightly collections
    pub day_of_week: Option<Weekday>,
    /// for fortnightly collections: which occurrence of the weekday (1-4)
    pub week_of_month: Option<u8>,
}

impl CollectionSchedule {
    pub fn monthly(day_of_month: u8) -> Self {
        Self {
            frequency: CollectionFrequency::Monthly,
            day_of_month: Some(day_of_month),
            day_of_week: None,
            week_of_month: None,
        }
    }

    pub fn weekly(day_of_week: Weekday) -> Self {
        Self {
            frequency: CollectionFrequency::Weekly,
            day_of_month: None,
            day_of_week: Some(day_of_week),
            week_of_month: None,
        }
    }

    pub fn fortnightly(day_of_week: Weekday, week_of_month: u8) -> Self {
        Self {
            frequency: CollectionFrequency::Fortnightly,
            day_of_month: None,
            day_of_week: Some(day_of_week),
            week_of_month: Some(week_of_month),
        }
    }

    pub fn yearly(day_of_month: u8) -> Self {
        Self {
            frequency: CollectionFrequency::Yearly,
            day_of_month: Some(day_of_month),
            day_of_week: None,
            week_of_month: None,
        }
    }

    fn target_day_of_month(&self) -> u32 {
        u32::from(self.day_of_month.unwrap_or(1))
    }

    fn target_weekday(&self) -> Weekday {
        self.day_of_week.unwrap_or(Weekday::Mon)
    }

    /// due date for the period anchored at `reference` (usually the
    /// period's meeting date)
    pub fn due_date_for(&self, reference: NaiveDate) -> NaiveDate {
        match self.frequency {
            CollectionFrequency::Weekly => {
                // first occurrence of the target weekday on/after the reference
                let ahead = days_until_weekday(reference.weekday(), self.target_weekday());
                reference + Days::new(u64::from(ahead))
            }
            CollectionFrequency::Fortnightly => {
                nth_weekday_of_month(
                    reference.year(),
                    reference.month(),
                    self.target_weekday(),
                    self.week_of_month.unwrap_or(1),
                )
            }
            CollectionFrequency::Monthly => clamped_day_of_month(
                reference.year(),
                reference.month(),
                self.target_day_of_month(),
            ),
            CollectionFrequency::Yearly => {
                // collections fall in january
                clamped_day_of_month(reference.year(), 1, self.target_day_of_month())
            }
        }
    }

    /// the most recently elapsed due date relative to `today`.
    /// walks back one period when the naive due date has not yet occurred,
    /// so "past due" checks always compare against an elapsed date.
    pub fn current_due_date(&self, today: NaiveDate) -> NaiveDate {
        match self.frequency {
            CollectionFrequency::Weekly => {
                let behind = days_until_weekday(self.target_weekday(), today.weekday());
                today - Days::new(u64::from(behind))
            }
            CollectionFrequency::Monthly => {
                let due = clamped_day_of_month(today.year(), today.month(), self.target_day_of_month());
                if due <= today {
                    due
                } else {
                    let (year, month) = previous_month(today.year(), today.month());
                    clamped_day_of_month(year, month, self.target_day_of_month())
                }
            }
            CollectionFrequency::Yearly => {
                let due = clamped_day_of_month(today.year(), 1, self.target_day_of_month());
                if due <= today {
                    due
                } else {
                    clamped_day_of_month(today.year() - 1, 1, self.target_day_of_month())
                }
            }
            // fortnightly has no unambiguous "previous occurrence"; treating
            // today as the boundary means nothing is counted late early
            CollectionFrequency::Fortnightly => today,
        }
    }

    /// the meeting date of the period that follows one anchored at `base`
    pub fn next_meeting_date(&self, base: NaiveDate) -> NaiveDate {
        match self.frequency {
            CollectionFrequency::Weekly => base + Days::new(7),
            CollectionFrequency::Fortnightly => base + Days::new(14),
            CollectionFrequency::Monthly => base + Months::new(1),
            CollectionFrequency::Yearly => base + Months::new(12),
        }
    }
}

/// whole days late, clamped at zero
pub fn days_late(due_date: NaiveDate, payment_date: NaiveDate) -> u32 {
    let diff = (payment_date - due_date).num_days();
    if diff > 0 {
        diff as u32
    } else {
        0
    }
}

/// days forward from `from` to the next occurrence of `to` (0 if same day)
fn days_until_weekday(from: Weekday, to: Weekday) -> u32 {
    (to.num_days_from_sunday() + 7 - from.num_days_from_sunday()) % 7
}

/// nth occurrence (1-based) of a weekday within a month
fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, n: u8) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or_default());
    let offset = days_until_weekday(first.weekday(), weekday);
    first + Days::new(u64::from(offset) + u64::from(n.saturating_sub(1)) * 7)
}

/// the given day within a month, clamped to the month's last day
fn clamped_day_of_month(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| last_day_of_month(year, month))
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap_or_default()
        .pred_opt()
        .unwrap_or_default()
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};

/// how a cycle's due date is derived from its start date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DueDateRule {
    /// same day-of-month in the following month, clamped to month length
    /// (31 jan -> 28 feb)
    NextMonthSameDay,
    /// fixed number of calendar days after the start
    FixedDays(u32),
}

/// the interest rule for one billing cycle
///
/// Partitions the cycle into an on-time band and a penalty band at
/// `threshold_days` (inclusive on the on-time side) and fixes how the due
/// date is derived. Swapping the rule here changes every call site at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CyclePolicy {
    /// rate while days elapsed <= threshold_days
    pub standard_rate: Rate,
    /// rate from threshold_days + 1 onward
    pub overdue_rate: Rate,
    pub threshold_days: u32,
    pub due_date_rule: DueDateRule,
}

impl CyclePolicy {
    /// 10% through day 14, 15% after, due the same day next month
    pub fn monthly_anchor() -> Self {
        Self {
            standard_rate: Rate::from_percentage(10),
            overdue_rate: Rate::from_percentage(15),
            threshold_days: 14,
            due_date_rule: DueDateRule::NextMonthSameDay,
        }
    }

    /// strict fixed-length cycle variant
    pub fn fixed_cycle(cycle_days: u32, threshold_days: u32) -> Self {
        Self {
            standard_rate: Rate::from_percentage(10),
            overdue_rate: Rate::from_percentage(15),
            threshold_days,
            due_date_rule: DueDateRule::FixedDays(cycle_days),
        }
    }

    /// rate applicable after the given number of elapsed days
    pub fn rate_for(&self, days_elapsed: u32) -> Rate {
        if days_elapsed <= self.threshold_days {
            self.standard_rate
        } else {
            self.overdue_rate
        }
    }

    /// end of the on-time period, derived from the cycle start (never from today)
    pub fn due_date(&self, cycle_start: NaiveDate) -> NaiveDate {
        match self.due_date_rule {
            DueDateRule::NextMonthSameDay => {
                let (year, month) = if cycle_start.month() == 12 {
                    (cycle_start.year() + 1, 1)
                } else {
                    (cycle_start.year(), cycle_start.month() + 1)
                };
                let day = cycle_start.day().min(days_in_month(year, month));
                NaiveDate::from_ymd_opt(year, month, day).unwrap_or(cycle_start)
            }
            DueDateRule::FixedDays(days) => cycle_start + chrono::Duration::days(days as i64),
        }
    }

    /// interest expected at the standard rate, used for statistics
    pub fn projected_interest(&self, principal: Money) -> Money {
        principal.at_rate(self.standard_rate)
    }
}

impl Default for CyclePolicy {
    fn default() -> Self {
        Self::monthly_anchor()
    }
}

/// number of days in the given month
fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

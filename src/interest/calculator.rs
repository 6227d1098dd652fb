use chrono::NaiveDate;

use crate::decimal::Money;
use crate::interest::{CycleAssessment, CyclePolicy};

/// engine evaluating a cycle against a calendar date
///
/// Works on calendar dates only; callers holding a timestamp take its date
/// portion first so time-of-day and zone offsets can never shift a day count.
/// Every function is pure and never fails.
#[derive(Debug, Clone, Copy)]
pub struct InterestEngine {
    pub policy: CyclePolicy,
}

impl InterestEngine {
    pub fn new(policy: CyclePolicy) -> Self {
        Self { policy }
    }

    /// calendar days since the cycle started, clamped at zero
    pub fn days_elapsed(&self, cycle_start: NaiveDate, today: NaiveDate) -> u32 {
        (today - cycle_start).num_days().max(0) as u32
    }

    /// simple interest on the cycle's original principal, never compounding
    pub fn interest_on(&self, principal: Money, days_elapsed: u32) -> Money {
        principal.at_rate(self.policy.rate_for(days_elapsed))
    }

    /// principal plus accrued interest
    pub fn total_owed(&self, principal: Money, days_elapsed: u32) -> Money {
        principal + self.interest_on(principal, days_elapsed)
    }

    /// calendar days until the due date, negative once overdue
    pub fn days_until_due(&self, cycle_start: NaiveDate, today: NaiveDate) -> i64 {
        (self.policy.due_date(cycle_start) - today).num_days()
    }

    /// evaluate all derived values in a single pass
    pub fn assess(&self, principal: Money, cycle_start: NaiveDate, today: NaiveDate) -> CycleAssessment {
        let days_elapsed = self.days_elapsed(cycle_start, today);
        let current_interest_rate = self.policy.rate_for(days_elapsed);
        let current_interest = principal.at_rate(current_interest_rate);
        let due_date = self.policy.due_date(cycle_start);
        let days_until_due = (due_date - today).num_days();

        CycleAssessment {
            days_elapsed,
            current_interest_rate,
            current_interest,
            total_owed: principal + current_interest,
            due_date,
            days_until_due,
            is_overdue: days_until_due < 0,
        }
    }
}

pub mod calculator;
pub mod policy;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::Loan;

pub use calculator::InterestEngine;
pub use policy::{CyclePolicy, DueDateRule};

/// everything derived from a cycle in one evaluation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleAssessment {
    pub days_elapsed: u32,
    pub current_interest_rate: Rate,
    pub current_interest: Money,
    pub total_owed: Money,
    pub due_date: NaiveDate,
    /// negative once overdue
    pub days_until_due: i64,
    pub is_overdue: bool,
}

/// a loan enriched with the derived values for its current cycle
///
/// Recomputed on every read against the caller-supplied date; none of the
/// derived fields are ever stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanView {
    #[serde(flatten)]
    pub loan: Loan,
    pub days_elapsed: u32,
    pub current_interest_rate: Rate,
    pub current_interest: Money,
    pub total_owed: Money,
    pub due_date: NaiveDate,
    pub days_until_due: i64,
    pub is_overdue: bool,
}

impl LoanView {
    pub fn assessment(&self) -> CycleAssessment {
        CycleAssessment {
            days_elapsed: self.days_elapsed,
            current_interest_rate: self.current_interest_rate,
            current_interest: self.current_interest,
            total_owed: self.total_owed,
            due_date: self.due_date,
            days_until_due: self.days_until_due,
            is_overdue: self.is_overdue,
        }
    }
}

/// extend a loan with the derived values for the given date
pub fn enrich(loan: &Loan, policy: &CyclePolicy, today: NaiveDate) -> LoanView {
    let assessment =
        InterestEngine::new(*policy).assess(loan.principal, loan.cycle_start_date, today);

    LoanView {
        loan: loan.clone(),
        days_elapsed: assessment.days_elapsed,
        current_interest_rate: assessment.current_interest_rate,
        current_interest: assessment.current_interest,
        total_owed: assessment.total_owed,
        due_date: assessment.due_date,
        days_until_due: assessment.days_until_due,
        is_overdue: assessment.is_overdue,
    }
}

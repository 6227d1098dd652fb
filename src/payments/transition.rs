use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::interest::{CycleAssessment, CyclePolicy};
use crate::payments::validate_payment;
use crate::store::StoreOp;
use crate::types::{Cycle, CycleStatus, Loan, LoanStatus, Payment, PaymentInput, PaymentType};

/// full effect set of one payment, computed without touching storage
///
/// Holds complete post-payment record snapshots; the caller persists them
/// atomically via `store_ops` and may push the same snapshots to a replica.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentPlan {
    pub payment: Payment,
    /// loan snapshot after the payment is applied
    pub loan: Loan,
    /// the active cycle, closed, when the payment ends it
    pub closed_cycle: Option<Cycle>,
    /// the renewal cycle opened by an interest-only payment
    pub opened_cycle: Option<Cycle>,
}

impl PaymentPlan {
    pub fn completes_loan(&self) -> bool {
        self.loan.status == LoanStatus::Completed
    }

    pub fn renews_cycle(&self) -> bool {
        self.opened_cycle.is_some()
    }

    /// mutation batch to apply as one all-or-nothing unit
    pub fn store_ops(&self) -> Vec<StoreOp> {
        let mut ops = vec![
            StoreOp::PutPayment(self.payment.clone()),
            StoreOp::PutLoan(self.loan.clone()),
        ];
        if let Some(cycle) = &self.closed_cycle {
            ops.push(StoreOp::PutCycle(cycle.clone()));
        }
        if let Some(cycle) = &self.opened_cycle {
            ops.push(StoreOp::PutCycle(cycle.clone()));
        }
        ops
    }
}

/// compute the state transition for a payment against the active cycle
///
/// Re-validates the amount against fresh balances before planning anything,
/// so a stale client cannot slip an invalid payment through. Returns the
/// effect set only; no I/O happens here.
pub fn plan_payment(
    loan: &Loan,
    assessment: &CycleAssessment,
    cycle: &Cycle,
    input: &PaymentInput,
    policy: &CyclePolicy,
    now: DateTime<Utc>,
) -> Result<PaymentPlan> {
    if loan.status != LoanStatus::Active {
        return Err(LoanError::LoanNotActive { status: loan.status });
    }

    if input.loan_id != loan.id {
        return Err(LoanError::InvariantViolation {
            message: format!("payment targets loan {} but loan {} was loaded", input.loan_id, loan.id),
        });
    }

    if cycle.loan_id != loan.id || !cycle.is_active() || cycle.cycle_number != loan.current_cycle {
        return Err(LoanError::InvariantViolation {
            message: format!("cycle {} is not the active cycle of loan {}", cycle.id, loan.id),
        });
    }

    let check = validate_payment(
        input.payment_type,
        input.amount,
        loan.principal,
        assessment.current_interest,
    );
    if !check.valid {
        return Err(LoanError::InvalidPayment {
            reason: check.reason.unwrap_or_else(|| "invalid payment".to_string()),
        });
    }

    let payment_date = now.date_naive();
    let payment = Payment {
        id: Uuid::new_v4(),
        owner_id: loan.owner_id,
        loan_id: loan.id,
        cycle_id: cycle.id,
        amount: input.amount,
        payment_type: input.payment_type,
        payment_date,
        photo_url: input.photo_url.clone(),
        notes: input.notes.clone(),
        created_at: now,
    };

    let mut updated = loan.clone();
    updated.updated_at = now;

    let (closed_cycle, opened_cycle) = match input.payment_type {
        PaymentType::Complete => {
            updated.status = LoanStatus::Completed;
            (Some(close_cycle(cycle, payment_date)), None)
        }
        PaymentType::InterestOnly => {
            // the renewal anchors at the closed cycle's due date, not at the
            // payment date, so a late payment never shifts the anchor day
            let anchor = policy.due_date(loan.cycle_start_date);
            updated.current_cycle = loan.current_cycle + 1;
            updated.cycle_start_date = anchor;

            let renewal = Cycle {
                id: Uuid::new_v4(),
                owner_id: loan.owner_id,
                loan_id: loan.id,
                cycle_number: updated.current_cycle,
                start_date: anchor,
                end_date: None,
                status: CycleStatus::Active,
                created_at: now,
            };
            (Some(close_cycle(cycle, payment_date)), Some(renewal))
        }
        PaymentType::Partial => {
            let remaining = loan.principal - input.amount;
            updated.principal = remaining.max(Money::ZERO);
            if remaining <= Money::ZERO {
                updated.status = LoanStatus::Completed;
                (Some(close_cycle(cycle, payment_date)), None)
            } else {
                (None, None)
            }
        }
    };

    Ok(PaymentPlan { payment, loan: updated, closed_cycle, opened_cycle })
}

fn close_cycle(cycle: &Cycle, end_date: NaiveDate) -> Cycle {
    let mut closed = cycle.clone();
    closed.status = CycleStatus::Completed;
    closed.end_date = Some(end_date);
    closed
}

pub mod transition;

use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::PaymentType;

pub use transition::{plan_payment, PaymentPlan};

/// outcome of checking a proposed payment amount
///
/// Pure predicate result: callers use it for form feedback before submission
/// and the planner re-checks it at commit time against fresh balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCheck {
    pub valid: bool,
    pub reason: Option<String>,
}

impl PaymentCheck {
    fn ok() -> Self {
        Self { valid: true, reason: None }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self { valid: false, reason: Some(reason.into()) }
    }
}

/// check a payment amount against the rule for its declared type
///
/// Never fails; an invalid amount comes back as a flag plus a human-readable
/// reason the caller can surface verbatim.
pub fn validate_payment(
    payment_type: PaymentType,
    amount: Money,
    principal: Money,
    current_interest: Money,
) -> PaymentCheck {
    if !amount.is_positive() {
        return PaymentCheck::fail("payment amount must be greater than zero");
    }

    match payment_type {
        PaymentType::Complete => {
            let total_owed = principal + current_interest;
            if amount < total_owed {
                PaymentCheck::fail(format!(
                    "a complete payment must cover the total owed of {total_owed}"
                ))
            } else {
                PaymentCheck::ok()
            }
        }
        PaymentType::InterestOnly => {
            if (amount - current_interest).abs() > Money::CENT {
                PaymentCheck::fail(format!(
                    "an interest-only payment must equal the accrued interest of {current_interest}"
                ))
            } else {
                PaymentCheck::ok()
            }
        }
        PaymentType::Partial => {
            if amount > principal {
                PaymentCheck::fail(format!(
                    "a partial payment cannot exceed the outstanding principal of {principal}"
                ))
            } else {
                PaymentCheck::ok()
            }
        }
    }
}

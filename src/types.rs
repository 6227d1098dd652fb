use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a loan
pub type LoanId = Uuid;
/// unique identifier for a billing cycle
pub type CycleId = Uuid;
/// unique identifier for a payment
pub type PaymentId = Uuid;
/// scoping key of the lender that owns a record
pub type OwnerId = Uuid;

/// loan status
///
/// `Overdue` exists for display filtering only: overdue is derived from the
/// due date on every read and is never written to a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// outstanding principal, one active cycle
    Active,
    /// settled, terminal
    Completed,
    /// derived-only, never persisted
    Overdue,
}

/// billing cycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    Active,
    Completed,
}

/// the three kinds of payment a lender can record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// settles principal + interest and completes the loan
    Complete,
    /// pays exactly the accrued interest and renews the cycle
    InterestOnly,
    /// reduces the outstanding principal
    Partial,
}

/// a borrower's outstanding debt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub owner_id: OwnerId,
    pub client_name: String,
    /// current outstanding capital, > 0 while active
    pub principal: Money,
    pub photo_url: Option<String>,
    pub status: LoanStatus,
    /// ordinal of the active billing cycle, 1-based
    pub current_cycle: u32,
    /// anchors interest and due-date computation for the current cycle
    pub cycle_start_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }
}

/// one billing period of a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: CycleId,
    pub owner_id: OwnerId,
    pub loan_id: LoanId,
    /// 1-based, strictly increasing per loan
    pub cycle_number: u32,
    pub start_date: NaiveDate,
    /// none while the cycle is active
    pub end_date: Option<NaiveDate>,
    pub status: CycleStatus,
    pub created_at: DateTime<Utc>,
}

impl Cycle {
    pub fn is_active(&self) -> bool {
        self.status == CycleStatus::Active
    }
}

/// an immutable record of money received against a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub owner_id: OwnerId,
    pub loan_id: LoanId,
    /// the cycle that was active when the payment was taken
    pub cycle_id: CycleId,
    pub amount: Money,
    pub payment_type: PaymentType,
    pub payment_date: NaiveDate,
    pub photo_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// input for creating a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateLoanInput {
    pub client_name: String,
    pub principal: Money,
    pub photo_url: Option<String>,
    /// start of cycle 1; today when not given
    pub start_date: Option<NaiveDate>,
}

/// input for recording a payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentInput {
    pub loan_id: LoanId,
    pub amount: Money,
    pub payment_type: PaymentType,
    pub photo_url: Option<String>,
    pub notes: Option<String>,
}

use std::collections::HashMap;

use crate::errors::{LoanError, Result};
use crate::types::{Cycle, CycleId, Loan, LoanId, OwnerId, Payment, PaymentId};

/// one mutation inside an atomic batch
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    PutLoan(Loan),
    PutCycle(Cycle),
    PutPayment(Payment),
    DeleteLoan(LoanId),
    DeleteCyclesByLoan(LoanId),
    DeletePaymentsByLoan(LoanId),
}

/// persistence port for loan records
///
/// All writes go through `apply`, which commits a batch as one all-or-nothing
/// unit: a failed op must leave the store exactly as it was. Lookups return
/// owned snapshots so callers never observe a half-applied batch.
pub trait LoanStore {
    fn loan(&self, id: LoanId) -> Result<Option<Loan>>;
    /// all loans of one lender, newest first
    fn loans_by_owner(&self, owner_id: OwnerId) -> Result<Vec<Loan>>;
    fn loan_count(&self) -> Result<usize>;

    fn cycle(&self, id: CycleId) -> Result<Option<Cycle>>;
    /// cycles of a loan ordered by cycle number
    fn cycles_by_loan(&self, loan_id: LoanId) -> Result<Vec<Cycle>>;

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>>;
    /// payments of a loan in chronological order
    fn payments_by_loan(&self, loan_id: LoanId) -> Result<Vec<Payment>>;
    fn payments_by_cycle(&self, cycle_id: CycleId) -> Result<Vec<Payment>>;

    /// apply a mutation batch atomically
    fn apply(&mut self, ops: Vec<StoreOp>) -> Result<()>;

    /// the single active cycle of a loan, if any
    fn active_cycle(&self, loan_id: LoanId) -> Result<Option<Cycle>> {
        Ok(self.cycles_by_loan(loan_id)?.into_iter().find(Cycle::is_active))
    }
}

/// in-process store backed by hash maps
///
/// Batches are staged against a copy of the tables and swapped in only when
/// every op succeeds.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    loans: HashMap<LoanId, Loan>,
    cycles: HashMap<CycleId, Cycle>,
    payments: HashMap<PaymentId, Payment>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_op(
        loans: &mut HashMap<LoanId, Loan>,
        cycles: &mut HashMap<CycleId, Cycle>,
        payments: &mut HashMap<PaymentId, Payment>,
        op: StoreOp,
    ) -> Result<()> {
        match op {
            StoreOp::PutLoan(loan) => {
                loans.insert(loan.id, loan);
            }
            StoreOp::PutCycle(cycle) => {
                cycles.insert(cycle.id, cycle);
            }
            StoreOp::PutPayment(payment) => {
                payments.insert(payment.id, payment);
            }
            StoreOp::DeleteLoan(id) => {
                loans.remove(&id).ok_or(LoanError::LoanNotFound { id })?;
            }
            StoreOp::DeleteCyclesByLoan(loan_id) => {
                cycles.retain(|_, cycle| cycle.loan_id != loan_id);
            }
            StoreOp::DeletePaymentsByLoan(loan_id) => {
                payments.retain(|_, payment| payment.loan_id != loan_id);
            }
        }
        Ok(())
    }
}

impl LoanStore for MemoryStore {
    fn loan(&self, id: LoanId) -> Result<Option<Loan>> {
        Ok(self.loans.get(&id).cloned())
    }

    fn loans_by_owner(&self, owner_id: OwnerId) -> Result<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .loans
            .values()
            .filter(|loan| loan.owner_id == owner_id)
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(loans)
    }

    fn loan_count(&self) -> Result<usize> {
        Ok(self.loans.len())
    }

    fn cycle(&self, id: CycleId) -> Result<Option<Cycle>> {
        Ok(self.cycles.get(&id).cloned())
    }

    fn cycles_by_loan(&self, loan_id: LoanId) -> Result<Vec<Cycle>> {
        let mut cycles: Vec<Cycle> = self
            .cycles
            .values()
            .filter(|cycle| cycle.loan_id == loan_id)
            .cloned()
            .collect();
        cycles.sort_by_key(|cycle| cycle.cycle_number);
        Ok(cycles)
    }

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.payments.get(&id).cloned())
    }

    fn payments_by_loan(&self, loan_id: LoanId) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .payments
            .values()
            .filter(|payment| payment.loan_id == loan_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| {
            a.payment_date.cmp(&b.payment_date).then(a.created_at.cmp(&b.created_at))
        });
        Ok(payments)
    }

    fn payments_by_cycle(&self, cycle_id: CycleId) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .payments
            .values()
            .filter(|payment| payment.cycle_id == cycle_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| {
            a.payment_date.cmp(&b.payment_date).then(a.created_at.cmp(&b.created_at))
        });
        Ok(payments)
    }

    fn apply(&mut self, ops: Vec<StoreOp>) -> Result<()> {
        let mut loans = self.loans.clone();
        let mut cycles = self.cycles.clone();
        let mut payments = self.payments.clone();

        for op in ops {
            Self::apply_op(&mut loans, &mut cycles, &mut payments, op)?;
        }

        self.loans = loans;
        self.cycles = cycles;
        self.payments = payments;
        Ok(())
    }
}

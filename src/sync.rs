use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::payments::PaymentPlan;
use crate::store::{LoanStore, StoreOp};
use crate::types::{Cycle, Loan, LoanId, OwnerId, Payment};

/// whole-record snapshot exchanged with a remote replica
///
/// Field names and types match the stored records verbatim, so a remote
/// schema keyed on the same names round-trips without translation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplicaSnapshot {
    pub loans: Vec<Loan>,
    pub cycles: Vec<Cycle>,
    pub payments: Vec<Payment>,
}

impl ReplicaSnapshot {
    pub fn is_empty(&self) -> bool {
        self.loans.is_empty() && self.cycles.is_empty() && self.payments.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.loans.len() + self.cycles.len() + self.payments.len()
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// errors talking to the remote replica
///
/// Kept apart from `LoanError` on purpose: a replica failure must never
/// surface as a failure of the local operation that triggered it.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("replica unavailable: {message}")]
    Unavailable {
        message: String,
    },

    #[error("replica rejected {record}: {message}")]
    Rejected {
        record: String,
        message: String,
    },
}

/// transport to a remote copy of the book
pub trait Replica {
    fn pull(&mut self, owner_id: OwnerId) -> Result<ReplicaSnapshot, SyncError>;
    fn push_loan(&mut self, loan: &Loan) -> Result<(), SyncError>;
    fn push_cycle(&mut self, cycle: &Cycle) -> Result<(), SyncError>;
    fn push_payment(&mut self, payment: &Payment) -> Result<(), SyncError>;
    fn delete_loan(&mut self, loan_id: LoanId) -> Result<(), SyncError>;
}

/// outcome of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub success: bool,
    pub pulled_records: usize,
    pub pushed_records: usize,
    pub message: String,
}

impl SyncReport {
    fn failed(message: String) -> Self {
        Self { success: false, pulled_records: 0, pushed_records: 0, message }
    }
}

/// reconcile the local store with the remote replica
///
/// Pull the remote snapshot, merge it last-writer-wins at whole-record
/// granularity with the remote copy taking priority, then push records that
/// exist only locally. Replica failures are logged and reflected in the
/// report; they never corrupt or abort the local store.
pub fn sync_all<S: LoanStore, R: Replica>(
    store: &mut S,
    replica: &mut R,
    owner_id: OwnerId,
) -> SyncReport {
    let snapshot = match replica.pull(owner_id) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(%owner_id, error = %err, "pull from replica failed");
            return SyncReport::failed(format!("pull failed: {err}"));
        }
    };
    let pulled_records = snapshot.record_count();

    // remote copy replaces local, record by record
    let mut ops: Vec<StoreOp> = Vec::with_capacity(pulled_records);
    ops.extend(snapshot.loans.iter().cloned().map(StoreOp::PutLoan));
    ops.extend(snapshot.cycles.iter().cloned().map(StoreOp::PutCycle));
    ops.extend(snapshot.payments.iter().cloned().map(StoreOp::PutPayment));

    if let Err(err) = store.apply(ops) {
        warn!(%owner_id, error = %err, "merging replica snapshot failed");
        return SyncReport::failed(format!("merge failed: {err}"));
    }

    // push anything the replica has never seen
    let local_loans = match store.loans_by_owner(owner_id) {
        Ok(loans) => loans,
        Err(err) => {
            warn!(%owner_id, error = %err, "reading local loans failed");
            return SyncReport {
                success: false,
                pulled_records,
                pushed_records: 0,
                message: format!("local read failed: {err}"),
            };
        }
    };
    let remote_ids: HashSet<LoanId> = snapshot.loans.iter().map(|loan| loan.id).collect();

    let mut pushed_records = 0;
    let mut push_failures = 0;
    for loan in local_loans.iter().filter(|loan| !remote_ids.contains(&loan.id)) {
        match replica.push_loan(loan) {
            Ok(()) => pushed_records += 1,
            Err(err) => {
                warn!(loan_id = %loan.id, error = %err, "pushing loan failed");
                push_failures += 1;
                continue;
            }
        }

        let cycles = match store.cycles_by_loan(loan.id) {
            Ok(cycles) => cycles,
            Err(err) => {
                warn!(loan_id = %loan.id, error = %err, "reading local cycles failed");
                push_failures += 1;
                Vec::new()
            }
        };
        for cycle in &cycles {
            match replica.push_cycle(cycle) {
                Ok(()) => pushed_records += 1,
                Err(err) => {
                    warn!(cycle_id = %cycle.id, error = %err, "pushing cycle failed");
                    push_failures += 1;
                }
            }
        }

        let payments = match store.payments_by_loan(loan.id) {
            Ok(payments) => payments,
            Err(err) => {
                warn!(loan_id = %loan.id, error = %err, "reading local payments failed");
                push_failures += 1;
                Vec::new()
            }
        };
        for payment in &payments {
            match replica.push_payment(payment) {
                Ok(()) => pushed_records += 1,
                Err(err) => {
                    warn!(payment_id = %payment.id, error = %err, "pushing payment failed");
                    push_failures += 1;
                }
            }
        }
    }

    let success = push_failures == 0;
    let message = if success {
        format!("synced: {pulled_records} pulled, {pushed_records} pushed")
    } else {
        format!("synced with {push_failures} push failures")
    };
    info!(%owner_id, pulled_records, pushed_records, push_failures, "reconciliation finished");

    SyncReport { success, pulled_records, pushed_records, message }
}

/// best-effort push of one payment's effect set after a local commit
///
/// Failures are logged and swallowed; the local transaction already
/// succeeded and is not rolled back for a replica hiccup.
pub fn push_plan<R: Replica>(replica: &mut R, plan: &PaymentPlan) -> bool {
    let mut ok = true;

    if let Err(err) = replica.push_payment(&plan.payment) {
        warn!(payment_id = %plan.payment.id, error = %err, "pushing payment failed");
        ok = false;
    }
    if let Err(err) = replica.push_loan(&plan.loan) {
        warn!(loan_id = %plan.loan.id, error = %err, "pushing loan failed");
        ok = false;
    }
    for cycle in [&plan.closed_cycle, &plan.opened_cycle].into_iter().flatten() {
        if let Err(err) = replica.push_cycle(cycle) {
            warn!(cycle_id = %cycle.id, error = %err, "pushing cycle failed");
            ok = false;
        }
    }

    ok
}

/// best-effort propagation of a local loan deletion
pub fn push_delete<R: Replica>(replica: &mut R, loan_id: LoanId) -> bool {
    match replica.delete_loan(loan_id) {
        Ok(()) => true,
        Err(err) => {
            warn!(%loan_id, error = %err, "deleting loan on replica failed");
            false
        }
    }
}

pub mod decimal;
pub mod errors;
pub mod events;
pub mod interest;
pub mod ledger;
pub mod payments;
pub mod store;
pub mod sync;
pub mod types;

// re-export key types
pub use decimal::{Money, Rate};
pub use errors::{LoanError, Result};
pub use events::{Event, EventStore};
pub use interest::{
    enrich, CycleAssessment, CyclePolicy, DueDateRule, InterestEngine, LoanView,
};
pub use ledger::{
    CycleHistory, FinancialSummary, LoanBook, LoanNotification, NotificationKind, PaymentStats,
};
pub use payments::{plan_payment, validate_payment, PaymentCheck, PaymentPlan};
pub use store::{LoanStore, MemoryStore, StoreOp};
pub use sync::{push_delete, push_plan, sync_all, Replica, ReplicaSnapshot, SyncError, SyncReport};
pub use types::{
    CreateLoanInput, Cycle, CycleId, CycleStatus, Loan, LoanId, LoanStatus, OwnerId, Payment,
    PaymentId, PaymentInput, PaymentType,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{CycleId, LoanId, PaymentId, PaymentType};

/// all events that can be emitted by the loan book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    LoanCreated {
        loan_id: LoanId,
        client_name: String,
        principal: Money,
        cycle_start_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    LoanCompleted {
        loan_id: LoanId,
        timestamp: DateTime<Utc>,
    },
    LoanDeleted {
        loan_id: LoanId,
        timestamp: DateTime<Utc>,
    },
    PrincipalReduced {
        loan_id: LoanId,
        old_principal: Money,
        new_principal: Money,
        timestamp: DateTime<Utc>,
    },
    PrincipalEdited {
        loan_id: LoanId,
        old_principal: Money,
        new_principal: Money,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentReceived {
        loan_id: LoanId,
        cycle_id: CycleId,
        payment_id: PaymentId,
        amount: Money,
        payment_type: PaymentType,
        payment_date: NaiveDate,
    },

    // cycle events
    CycleClosed {
        loan_id: LoanId,
        cycle_id: CycleId,
        cycle_number: u32,
        end_date: NaiveDate,
    },
    CycleOpened {
        loan_id: LoanId,
        cycle_id: CycleId,
        cycle_number: u32,
        start_date: NaiveDate,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

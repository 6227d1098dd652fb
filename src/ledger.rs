use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::events::{Event, EventStore};
use crate::interest::{enrich, CyclePolicy, InterestEngine, LoanView};
use crate::payments::{plan_payment, PaymentPlan};
use crate::store::{LoanStore, StoreOp};
use crate::types::{
    CreateLoanInput, Cycle, CycleId, CycleStatus, Loan, LoanId, LoanStatus, OwnerId, Payment,
    PaymentInput, PaymentType,
};

/// financial summary across one lender's book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    /// capital outstanding across active loans
    pub total_capital_lent: Money,
    /// interest expected at the standard rate on active principals
    pub total_interest_projected: Money,
    /// interest already collected via interest-only payments
    pub total_interest_earned: Money,
    pub active_loans_count: usize,
    pub overdue_loans_count: usize,
    pub completed_loans_count: usize,
}

/// per-loan payment totals split by type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStats {
    pub total_payments: usize,
    pub total_amount: Money,
    pub interest_payments: usize,
    pub interest_amount: Money,
    pub partial_payments: usize,
    pub partial_amount: Money,
}

/// cycle history of a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleHistory {
    pub total_cycles: usize,
    pub completed_cycles: usize,
    pub current_cycle: Option<Cycle>,
    pub cycles: Vec<Cycle>,
}

/// notification urgency band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// due within a week
    Upcoming,
    /// due within three days
    DueSoon,
    Overdue,
}

/// a loan that needs the lender's attention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanNotification {
    pub loan: LoanView,
    pub kind: NotificationKind,
    pub message: String,
}

/// the loan book of one lender
///
/// Owns the persistence port, the interest policy, and the event stream.
/// Every read derives interest state from the injected clock; every write
/// goes to the store as a single atomic batch.
pub struct LoanBook<S: LoanStore> {
    store: S,
    policy: CyclePolicy,
    owner_id: OwnerId,
    events: EventStore,
}

impl<S: LoanStore> LoanBook<S> {
    pub fn new(store: S, policy: CyclePolicy, owner_id: OwnerId) -> Self {
        Self {
            store,
            policy,
            owner_id,
            events: EventStore::new(),
        }
    }

    pub fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    pub fn policy(&self) -> &CyclePolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// direct store access for the reconciliation pass
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// drain events emitted since the last call
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    /// create a loan with system time
    pub fn create_loan_now(&mut self, input: CreateLoanInput) -> Result<Loan> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.create_loan(input, &time)
    }

    /// create a loan and its first cycle in one batch
    pub fn create_loan(
        &mut self,
        input: CreateLoanInput,
        time_provider: &SafeTimeProvider,
    ) -> Result<Loan> {
        let client_name = input.client_name.trim().to_string();
        if client_name.is_empty() {
            return Err(LoanError::InvalidInput {
                message: "client name must not be empty".to_string(),
            });
        }
        if !input.principal.is_positive() {
            return Err(LoanError::InvalidInput {
                message: "principal must be greater than zero".to_string(),
            });
        }

        let now = time_provider.now();
        let start_date = input.start_date.unwrap_or_else(|| now.date_naive());

        let loan = Loan {
            id: Uuid::new_v4(),
            owner_id: self.owner_id,
            client_name,
            principal: input.principal,
            photo_url: input.photo_url,
            status: LoanStatus::Active,
            current_cycle: 1,
            cycle_start_date: start_date,
            created_at: now,
            updated_at: now,
        };
        let cycle = Cycle {
            id: Uuid::new_v4(),
            owner_id: self.owner_id,
            loan_id: loan.id,
            cycle_number: 1,
            start_date,
            end_date: None,
            status: CycleStatus::Active,
            created_at: now,
        };

        self.store.apply(vec![
            StoreOp::PutLoan(loan.clone()),
            StoreOp::PutCycle(cycle.clone()),
        ])?;

        self.events.emit(Event::LoanCreated {
            loan_id: loan.id,
            client_name: loan.client_name.clone(),
            principal: loan.principal,
            cycle_start_date: start_date,
            timestamp: now,
        });
        self.events.emit(Event::CycleOpened {
            loan_id: loan.id,
            cycle_id: cycle.id,
            cycle_number: 1,
            start_date,
        });

        debug!(loan_id = %loan.id, principal = %loan.principal, "loan created");
        Ok(loan)
    }

    /// a loan enriched for the current date
    pub fn loan(&self, id: LoanId, time_provider: &SafeTimeProvider) -> Result<LoanView> {
        let loan = self.store.loan(id)?.ok_or(LoanError::LoanNotFound { id })?;
        Ok(enrich(&loan, &self.policy, time_provider.now().date_naive()))
    }

    /// all loans of this lender, enriched
    pub fn loans(&self, time_provider: &SafeTimeProvider) -> Result<Vec<LoanView>> {
        let today = time_provider.now().date_naive();
        Ok(self
            .store
            .loans_by_owner(self.owner_id)?
            .iter()
            .map(|loan| enrich(loan, &self.policy, today))
            .collect())
    }

    /// loans filtered by status
    ///
    /// `Overdue` is never stored, so it filters active loans on the derived
    /// flag instead of the persisted field.
    pub fn loans_by_status(
        &self,
        status: LoanStatus,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<LoanView>> {
        let views = self.loans(time_provider)?;
        Ok(match status {
            LoanStatus::Overdue => views
                .into_iter()
                .filter(|view| view.loan.is_active() && view.is_overdue)
                .collect(),
            _ => views.into_iter().filter(|view| view.loan.status == status).collect(),
        })
    }

    pub fn active_loans(&self, time_provider: &SafeTimeProvider) -> Result<Vec<LoanView>> {
        self.loans_by_status(LoanStatus::Active, time_provider)
    }

    /// case-insensitive search by client name
    pub fn search_by_client(
        &self,
        term: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<LoanView>> {
        let term = term.trim().to_lowercase();
        let views = self.loans(time_provider)?;
        if term.is_empty() {
            return Ok(views);
        }
        Ok(views
            .into_iter()
            .filter(|view| view.loan.client_name.to_lowercase().contains(&term))
            .collect())
    }

    /// active loans due within the next seven days
    pub fn upcoming_due_loans(&self, time_provider: &SafeTimeProvider) -> Result<Vec<LoanView>> {
        Ok(self
            .active_loans(time_provider)?
            .into_iter()
            .filter(|view| view.days_until_due > 0 && view.days_until_due <= 7)
            .collect())
    }

    /// active loans past their due date
    pub fn overdue_loans(&self, time_provider: &SafeTimeProvider) -> Result<Vec<LoanView>> {
        Ok(self
            .active_loans(time_provider)?
            .into_iter()
            .filter(|view| view.is_overdue)
            .collect())
    }

    /// record a payment with system time
    pub fn record_payment_now(&mut self, input: PaymentInput) -> Result<PaymentPlan> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.record_payment(input, &time)
    }

    /// record a payment and apply its full effect set atomically
    pub fn record_payment(
        &mut self,
        input: PaymentInput,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentPlan> {
        let now = time_provider.now();

        let loan = self
            .store
            .loan(input.loan_id)?
            .ok_or(LoanError::LoanNotFound { id: input.loan_id })?;
        if !loan.is_active() {
            return Err(LoanError::LoanNotActive { status: loan.status });
        }

        let cycle = self
            .store
            .active_cycle(loan.id)?
            .ok_or(LoanError::NoActiveCycle { loan_id: loan.id })?;

        let assessment = InterestEngine::new(self.policy).assess(
            loan.principal,
            loan.cycle_start_date,
            now.date_naive(),
        );

        let plan = plan_payment(&loan, &assessment, &cycle, &input, &self.policy, now)?;
        self.store.apply(plan.store_ops())?;

        self.events.emit(Event::PaymentReceived {
            loan_id: loan.id,
            cycle_id: cycle.id,
            payment_id: plan.payment.id,
            amount: plan.payment.amount,
            payment_type: plan.payment.payment_type,
            payment_date: plan.payment.payment_date,
        });
        if let Some(closed) = &plan.closed_cycle {
            self.events.emit(Event::CycleClosed {
                loan_id: loan.id,
                cycle_id: closed.id,
                cycle_number: closed.cycle_number,
                end_date: closed.end_date.unwrap_or_else(|| now.date_naive()),
            });
        }
        if let Some(opened) = &plan.opened_cycle {
            self.events.emit(Event::CycleOpened {
                loan_id: loan.id,
                cycle_id: opened.id,
                cycle_number: opened.cycle_number,
                start_date: opened.start_date,
            });
        }
        if plan.completes_loan() {
            self.events.emit(Event::LoanCompleted { loan_id: loan.id, timestamp: now });
        } else if plan.payment.payment_type == PaymentType::Partial {
            self.events.emit(Event::PrincipalReduced {
                loan_id: loan.id,
                old_principal: loan.principal,
                new_principal: plan.loan.principal,
                timestamp: now,
            });
        }

        debug!(
            loan_id = %loan.id,
            amount = %plan.payment.amount,
            payment_type = ?plan.payment.payment_type,
            "payment recorded"
        );
        Ok(plan)
    }

    /// correct the stored capital without touching cycles or dates
    pub fn edit_principal(
        &mut self,
        id: LoanId,
        new_principal: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<Loan> {
        if !new_principal.is_positive() {
            return Err(LoanError::InvalidInput {
                message: "principal must be greater than zero".to_string(),
            });
        }

        let mut loan = self.store.loan(id)?.ok_or(LoanError::LoanNotFound { id })?;
        let old_principal = loan.principal;
        let now = time_provider.now();
        loan.principal = new_principal;
        loan.updated_at = now;

        self.store.apply(vec![StoreOp::PutLoan(loan.clone())])?;
        self.events.emit(Event::PrincipalEdited {
            loan_id: id,
            old_principal,
            new_principal,
            timestamp: now,
        });
        Ok(loan)
    }

    /// attach or replace the client photo reference
    pub fn update_photo(
        &mut self,
        id: LoanId,
        photo_url: Option<String>,
        time_provider: &SafeTimeProvider,
    ) -> Result<Loan> {
        let mut loan = self.store.loan(id)?.ok_or(LoanError::LoanNotFound { id })?;
        loan.photo_url = photo_url;
        loan.updated_at = time_provider.now();

        self.store.apply(vec![StoreOp::PutLoan(loan.clone())])?;
        Ok(loan)
    }

    /// delete a loan and everything it owns in one batch
    pub fn delete_loan(&mut self, id: LoanId, time_provider: &SafeTimeProvider) -> Result<()> {
        if self.store.loan(id)?.is_none() {
            return Err(LoanError::LoanNotFound { id });
        }

        self.store.apply(vec![
            StoreOp::DeletePaymentsByLoan(id),
            StoreOp::DeleteCyclesByLoan(id),
            StoreOp::DeleteLoan(id),
        ])?;

        self.events.emit(Event::LoanDeleted { loan_id: id, timestamp: time_provider.now() });
        Ok(())
    }

    /// payments of a loan, most recent first
    pub fn payments_for(&self, loan_id: LoanId) -> Result<Vec<Payment>> {
        let mut payments = self.store.payments_by_loan(loan_id)?;
        payments.reverse();
        Ok(payments)
    }

    /// payments taken during one cycle, chronological
    pub fn payments_for_cycle(&self, cycle_id: CycleId) -> Result<Vec<Payment>> {
        self.store.payments_by_cycle(cycle_id)
    }

    /// total amount ever received against a loan
    pub fn total_paid(&self, loan_id: LoanId) -> Result<Money> {
        Ok(self
            .store
            .payments_by_loan(loan_id)?
            .iter()
            .fold(Money::ZERO, |sum, payment| sum + payment.amount))
    }

    /// interest collected on a loan via interest-only payments
    pub fn total_interest_collected(&self, loan_id: LoanId) -> Result<Money> {
        Ok(self
            .store
            .payments_by_loan(loan_id)?
            .iter()
            .filter(|payment| payment.payment_type == PaymentType::InterestOnly)
            .fold(Money::ZERO, |sum, payment| sum + payment.amount))
    }

    /// payment totals for a loan split by type
    pub fn payment_stats(&self, loan_id: LoanId) -> Result<PaymentStats> {
        let payments = self.store.payments_by_loan(loan_id)?;
        let mut stats = PaymentStats {
            total_payments: payments.len(),
            total_amount: Money::ZERO,
            interest_payments: 0,
            interest_amount: Money::ZERO,
            partial_payments: 0,
            partial_amount: Money::ZERO,
        };

        for payment in &payments {
            stats.total_amount += payment.amount;
            match payment.payment_type {
                PaymentType::InterestOnly => {
                    stats.interest_payments += 1;
                    stats.interest_amount += payment.amount;
                }
                PaymentType::Partial => {
                    stats.partial_payments += 1;
                    stats.partial_amount += payment.amount;
                }
                PaymentType::Complete => {}
            }
        }
        Ok(stats)
    }

    /// cycle history of a loan
    pub fn cycle_history(&self, loan_id: LoanId) -> Result<CycleHistory> {
        let cycles = self.store.cycles_by_loan(loan_id)?;
        let current_cycle = cycles.iter().find(|cycle| cycle.is_active()).cloned();
        let completed_cycles = cycles.iter().filter(|cycle| !cycle.is_active()).count();

        Ok(CycleHistory {
            total_cycles: cycles.len(),
            completed_cycles,
            current_cycle,
            cycles,
        })
    }

    /// summary across the whole book
    pub fn summary(&self, time_provider: &SafeTimeProvider) -> Result<FinancialSummary> {
        let views = self.loans(time_provider)?;

        let mut summary = FinancialSummary {
            total_capital_lent: Money::ZERO,
            total_interest_projected: Money::ZERO,
            total_interest_earned: Money::ZERO,
            active_loans_count: 0,
            overdue_loans_count: 0,
            completed_loans_count: 0,
        };

        for view in &views {
            match view.loan.status {
                LoanStatus::Active => {
                    summary.active_loans_count += 1;
                    summary.total_capital_lent += view.loan.principal;
                    summary.total_interest_projected +=
                        self.policy.projected_interest(view.loan.principal);
                    if view.is_overdue {
                        summary.overdue_loans_count += 1;
                    }
                }
                LoanStatus::Completed => summary.completed_loans_count += 1,
                LoanStatus::Overdue => {}
            }
            summary.total_interest_earned += self.total_interest_collected(view.loan.id)?;
        }
        Ok(summary)
    }

    /// loans needing attention, most urgent first
    pub fn notifications(&self, time_provider: &SafeTimeProvider) -> Result<Vec<LoanNotification>> {
        let mut notifications: Vec<LoanNotification> = self
            .active_loans(time_provider)?
            .into_iter()
            .filter_map(|view| {
                let kind = match view.days_until_due {
                    days if days < 0 => NotificationKind::Overdue,
                    days if days <= 3 => NotificationKind::DueSoon,
                    days if days <= 7 => NotificationKind::Upcoming,
                    _ => return None,
                };
                let message = notification_message(&view, kind);
                Some(LoanNotification { loan: view, kind, message })
            })
            .collect();

        notifications.sort_by_key(|notification| notification.loan.days_until_due);
        Ok(notifications)
    }
}

fn notification_message(view: &LoanView, kind: NotificationKind) -> String {
    let name = &view.loan.client_name;
    match kind {
        NotificationKind::Overdue => {
            format!("{name} is {} days past due", -view.days_until_due)
        }
        NotificationKind::DueSoon if view.days_until_due == 0 => {
            format!("{name} is due today")
        }
        NotificationKind::DueSoon | NotificationKind::Upcoming => {
            format!("{name} is due in {} days", view.days_until_due)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use hourglass_rs::TimeSource;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn book() -> LoanBook<MemoryStore> {
        LoanBook::new(MemoryStore::new(), CyclePolicy::monthly_anchor(), Uuid::new_v4())
    }

    fn test_time(y: i32, m: u32, d: u32) -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
        ))
    }

    fn create(book: &mut LoanBook<MemoryStore>, name: &str, principal: i64, time: &SafeTimeProvider) -> Loan {
        book.create_loan(
            CreateLoanInput {
                client_name: name.to_string(),
                principal: Money::from_major(principal),
                photo_url: None,
                start_date: None,
            },
            time,
        )
        .unwrap()
    }

    #[test]
    fn test_create_loan_opens_first_cycle() {
        let mut book = book();
        let time = test_time(2025, 1, 13);

        let loan = create(&mut book, "Carlos", 100_000, &time);

        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.current_cycle, 1);
        assert_eq!(loan.cycle_start_date, date(2025, 1, 13));

        let cycle = book.store().active_cycle(loan.id).unwrap().unwrap();
        assert_eq!(cycle.cycle_number, 1);
        assert_eq!(cycle.start_date, date(2025, 1, 13));

        let events = book.take_events();
        assert!(matches!(events[0], Event::LoanCreated { .. }));
        assert!(matches!(events[1], Event::CycleOpened { cycle_number: 1, .. }));
    }

    #[test]
    fn test_create_loan_rejects_bad_input() {
        let mut book = book();
        let time = test_time(2025, 1, 13);

        let err = book
            .create_loan(
                CreateLoanInput {
                    client_name: "   ".to_string(),
                    principal: Money::from_major(1_000),
                    photo_url: None,
                    start_date: None,
                },
                &time,
            )
            .unwrap_err();
        assert!(matches!(err, LoanError::InvalidInput { .. }));

        let err = book
            .create_loan(
                CreateLoanInput {
                    client_name: "Ana".to_string(),
                    principal: Money::ZERO,
                    photo_url: None,
                    start_date: None,
                },
                &time,
            )
            .unwrap_err();
        assert!(matches!(err, LoanError::InvalidInput { .. }));
    }

    #[test]
    fn test_enriched_view_tracks_time() {
        let mut book = book();
        let time = test_time(2025, 1, 13);
        let loan = create(&mut book, "Carlos", 100_000, &time);
        let control = time.test_control().unwrap();

        control.advance(Duration::days(10));
        let view = book.loan(loan.id, &time).unwrap();
        assert_eq!(view.days_elapsed, 10);
        assert_eq!(view.current_interest, Money::from_major(10_000));
        assert_eq!(view.due_date, date(2025, 2, 13));
        assert!(!view.is_overdue);

        control.advance(Duration::days(25)); // day 35, past due
        let view = book.loan(loan.id, &time).unwrap();
        assert_eq!(view.current_interest, Money::from_major(15_000));
        assert!(view.is_overdue);
        // time alone never changes the persisted status
        assert_eq!(view.loan.status, LoanStatus::Active);
    }

    #[test]
    fn test_complete_payment_lifecycle() {
        let mut book = book();
        let time = test_time(2025, 1, 13);
        let loan = create(&mut book, "Carlos", 100_000, &time);
        time.test_control().unwrap().advance(Duration::days(7));

        let plan = book
            .record_payment(
                PaymentInput {
                    loan_id: loan.id,
                    amount: Money::from_major(110_000),
                    payment_type: PaymentType::Complete,
                    photo_url: None,
                    notes: None,
                },
                &time,
            )
            .unwrap();

        assert!(plan.completes_loan());
        let stored = book.store().loan(loan.id).unwrap().unwrap();
        assert_eq!(stored.status, LoanStatus::Completed);
        assert!(book.store().active_cycle(loan.id).unwrap().is_none());

        let payments = book.payments_for(loan.id).unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].payment_date, date(2025, 1, 20));

        let events = book.take_events();
        assert!(events.iter().any(|event| matches!(event, Event::LoanCompleted { .. })));
    }

    #[test]
    fn test_interest_only_renewal_preserves_anchor() {
        let mut book = book();
        let time = test_time(2025, 1, 13);
        let loan = create(&mut book, "Carlos", 100_000, &time);
        // pay 8 days after the 13 feb due date
        time.test_control().unwrap().advance(Duration::days(39));

        let view = book.loan(loan.id, &time).unwrap();
        assert!(view.is_overdue);

        let plan = book
            .record_payment(
                PaymentInput {
                    loan_id: loan.id,
                    amount: view.current_interest,
                    payment_type: PaymentType::InterestOnly,
                    photo_url: None,
                    notes: None,
                },
                &time,
            )
            .unwrap();
        assert!(plan.renews_cycle());

        let stored = book.store().loan(loan.id).unwrap().unwrap();
        assert_eq!(stored.current_cycle, 2);
        // anchored at the old due date, not the late payment date
        assert_eq!(stored.cycle_start_date, date(2025, 2, 13));

        let history = book.cycle_history(loan.id).unwrap();
        assert_eq!(history.total_cycles, 2);
        assert_eq!(history.completed_cycles, 1);
        let current = history.current_cycle.unwrap();
        assert_eq!(current.cycle_number, 2);
        assert_eq!(current.start_date, date(2025, 2, 13));
        assert_eq!(history.cycles[0].end_date, Some(date(2025, 2, 21)));
    }

    #[test]
    fn test_partial_payment_then_payoff() {
        let mut book = book();
        let time = test_time(2025, 1, 13);
        let loan = create(&mut book, "Carlos", 100_000, &time);
        time.test_control().unwrap().advance(Duration::days(5));

        book.record_payment(
            PaymentInput {
                loan_id: loan.id,
                amount: Money::from_major(40_000),
                payment_type: PaymentType::Partial,
                photo_url: None,
                notes: None,
            },
            &time,
        )
        .unwrap();

        let stored = book.store().loan(loan.id).unwrap().unwrap();
        assert_eq!(stored.principal, Money::from_major(60_000));
        assert_eq!(stored.status, LoanStatus::Active);

        // paying the remaining principal completes the loan
        book.record_payment(
            PaymentInput {
                loan_id: loan.id,
                amount: Money::from_major(60_000),
                payment_type: PaymentType::Partial,
                photo_url: None,
                notes: None,
            },
            &time,
        )
        .unwrap();

        let stored = book.store().loan(loan.id).unwrap().unwrap();
        assert_eq!(stored.status, LoanStatus::Completed);
        assert_eq!(stored.principal, Money::ZERO);
        assert!(book.store().active_cycle(loan.id).unwrap().is_none());
        assert_eq!(book.total_paid(loan.id).unwrap(), Money::from_major(100_000));
    }

    #[test]
    fn test_failed_validation_persists_nothing() {
        let mut book = book();
        let time = test_time(2025, 1, 13);
        let loan = create(&mut book, "Carlos", 100_000, &time);
        book.take_events();

        let err = book
            .record_payment(
                PaymentInput {
                    loan_id: loan.id,
                    amount: Money::from_major(5_000), // interest is 10000
                    payment_type: PaymentType::InterestOnly,
                    photo_url: None,
                    notes: None,
                },
                &time,
            )
            .unwrap_err();
        assert!(matches!(err, LoanError::InvalidPayment { .. }));

        assert!(book.payments_for(loan.id).unwrap().is_empty());
        let stored = book.store().loan(loan.id).unwrap().unwrap();
        assert_eq!(stored, loan);
        assert!(book.take_events().is_empty());
    }

    #[test]
    fn test_payment_on_completed_loan_is_rejected() {
        let mut book = book();
        let time = test_time(2025, 1, 13);
        let loan = create(&mut book, "Carlos", 100_000, &time);

        book.record_payment(
            PaymentInput {
                loan_id: loan.id,
                amount: Money::from_major(110_000),
                payment_type: PaymentType::Complete,
                photo_url: None,
                notes: None,
            },
            &time,
        )
        .unwrap();

        let err = book
            .record_payment(
                PaymentInput {
                    loan_id: loan.id,
                    amount: Money::from_major(1_000),
                    payment_type: PaymentType::Partial,
                    photo_url: None,
                    notes: None,
                },
                &time,
            )
            .unwrap_err();
        assert!(matches!(err, LoanError::LoanNotActive { .. }));
    }

    #[test]
    fn test_missing_active_cycle_is_detected() {
        let mut book = book();
        let time = test_time(2025, 1, 13);
        let loan = create(&mut book, "Carlos", 100_000, &time);

        // corrupt the store: drop the active cycle behind the book's back
        book.store_mut().apply(vec![StoreOp::DeleteCyclesByLoan(loan.id)]).unwrap();

        let err = book
            .record_payment(
                PaymentInput {
                    loan_id: loan.id,
                    amount: Money::from_major(10_000),
                    payment_type: PaymentType::InterestOnly,
                    photo_url: None,
                    notes: None,
                },
                &time,
            )
            .unwrap_err();
        assert!(matches!(err, LoanError::NoActiveCycle { .. }));
    }

    #[test]
    fn test_delete_loan_cascades() {
        let mut book = book();
        let time = test_time(2025, 1, 13);
        let loan = create(&mut book, "Carlos", 100_000, &time);

        book.record_payment(
            PaymentInput {
                loan_id: loan.id,
                amount: Money::from_major(10_000),
                payment_type: PaymentType::InterestOnly,
                photo_url: None,
                notes: None,
            },
            &time,
        )
        .unwrap();

        book.delete_loan(loan.id, &time).unwrap();

        assert!(book.store().loan(loan.id).unwrap().is_none());
        assert!(book.store().cycles_by_loan(loan.id).unwrap().is_empty());
        assert!(book.store().payments_by_loan(loan.id).unwrap().is_empty());
        assert_eq!(book.store().loan_count().unwrap(), 0);
    }

    #[test]
    fn test_edit_principal_keeps_cycles() {
        let mut book = book();
        let time = test_time(2025, 1, 13);
        let loan = create(&mut book, "Carlos", 100_000, &time);

        let updated = book
            .edit_principal(loan.id, Money::from_major(80_000), &time)
            .unwrap();
        assert_eq!(updated.principal, Money::from_major(80_000));
        assert_eq!(updated.current_cycle, 1);
        assert_eq!(updated.cycle_start_date, loan.cycle_start_date);

        let err = book.edit_principal(loan.id, Money::ZERO, &time).unwrap_err();
        assert!(matches!(err, LoanError::InvalidInput { .. }));
    }

    #[test]
    fn test_search_and_status_queries() {
        let mut book = book();
        let time = test_time(2025, 1, 13);
        create(&mut book, "Carlos Ruiz", 100_000, &time);
        create(&mut book, "Maria Lopez", 50_000, &time);

        let hits = book.search_by_client("carlos", &time).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].loan.client_name, "Carlos Ruiz");

        // empty term returns everything
        assert_eq!(book.search_by_client("  ", &time).unwrap().len(), 2);

        // both are overdue once the due date passes
        time.test_control().unwrap().advance(Duration::days(40));
        let overdue = book.loans_by_status(LoanStatus::Overdue, &time).unwrap();
        assert_eq!(overdue.len(), 2);
        // but the stored status stays active
        assert_eq!(book.active_loans(&time).unwrap().len(), 2);
    }

    #[test]
    fn test_summary_totals() {
        let mut book = book();
        let time = test_time(2025, 1, 13);
        let first = create(&mut book, "Carlos", 100_000, &time);
        create(&mut book, "Maria", 50_000, &time);

        time.test_control().unwrap().advance(Duration::days(35));

        // renew the first loan to earn some interest
        let view = book.loan(first.id, &time).unwrap();
        book.record_payment(
            PaymentInput {
                loan_id: first.id,
                amount: view.current_interest,
                payment_type: PaymentType::InterestOnly,
                photo_url: None,
                notes: None,
            },
            &time,
        )
        .unwrap();

        let summary = book.summary(&time).unwrap();
        assert_eq!(summary.active_loans_count, 2);
        assert_eq!(summary.completed_loans_count, 0);
        assert_eq!(summary.total_capital_lent, Money::from_major(150_000));
        assert_eq!(summary.total_interest_projected, Money::from_major(15_000));
        assert_eq!(summary.total_interest_earned, Money::from_major(15_000));
        // maria's loan is past due, carlos renewed
        assert_eq!(summary.overdue_loans_count, 1);
    }

    #[test]
    fn test_notification_bands() {
        let mut book = book();
        let time = test_time(2025, 1, 13);
        let loan = create(&mut book, "Carlos", 100_000, &time);
        let control = time.test_control().unwrap();

        // due 13 feb; 20 days out -> nothing
        assert!(book.notifications(&time).unwrap().is_empty());

        control.advance(Duration::days(25)); // 7 feb, 6 days before due
        let notifications = book.notifications(&time).unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::Upcoming);

        control.advance(Duration::days(4)); // 11 feb, 2 days out
        let notifications = book.notifications(&time).unwrap();
        assert_eq!(notifications[0].kind, NotificationKind::DueSoon);

        control.advance(Duration::days(2)); // due today
        let notifications = book.notifications(&time).unwrap();
        assert_eq!(notifications[0].kind, NotificationKind::DueSoon);
        assert!(notifications[0].message.contains("due today"));

        control.advance(Duration::days(3)); // 3 days past due
        let notifications = book.notifications(&time).unwrap();
        assert_eq!(notifications[0].kind, NotificationKind::Overdue);
        assert!(notifications[0].message.contains("3 days past due"));
        assert_eq!(notifications[0].loan.loan.id, loan.id);
    }

    #[test]
    fn test_payment_stats_split() {
        let mut book = book();
        let time = test_time(2025, 1, 13);
        let loan = create(&mut book, "Carlos", 100_000, &time);

        book.record_payment(
            PaymentInput {
                loan_id: loan.id,
                amount: Money::from_major(10_000),
                payment_type: PaymentType::InterestOnly,
                photo_url: None,
                notes: None,
            },
            &time,
        )
        .unwrap();
        book.record_payment(
            PaymentInput {
                loan_id: loan.id,
                amount: Money::from_major(30_000),
                payment_type: PaymentType::Partial,
                photo_url: None,
                notes: None,
            },
            &time,
        )
        .unwrap();

        let stats = book.payment_stats(loan.id).unwrap();
        assert_eq!(stats.total_payments, 2);
        assert_eq!(stats.total_amount, Money::from_major(40_000));
        assert_eq!(stats.interest_payments, 1);
        assert_eq!(stats.interest_amount, Money::from_major(10_000));
        assert_eq!(stats.partial_payments, 1);
        assert_eq!(stats.partial_amount, Money::from_major(30_000));
    }
}

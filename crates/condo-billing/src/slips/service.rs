use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::clock::Clock;
use super::domain::{
    BillingPeriod, DateRange, ExpenseItem, GenerationContext, PeriodError, Slip, SlipId,
};
use super::factory::SlipFactory;
use super::lifecycle::{LifecycleError, SlipAction, SlipEvent};
use super::policy::{GenerationPolicyError, PolicyCheckError, SlipGenerationPolicy};
use super::repository::{
    ExpenseRepository, PublishError, RecurringExpenseRepository, RepositoryError,
    ResidentUnitRepository, SlipEventPublisher, SlipRepository,
};

/// Repository handles the generation run reads from and writes to.
#[derive(Clone)]
pub struct BillingStores {
    pub expenses: Arc<dyn ExpenseRepository>,
    pub recurring_expenses: Arc<dyn RecurringExpenseRepository>,
    pub resident_units: Arc<dyn ResidentUnitRepository>,
    pub slips: Arc<dyn SlipRepository>,
}

/// Outcome of one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationSummary {
    pub expense_period: BillingPeriod,
    pub due_date: NaiveDate,
    pub slips_replaced: usize,
    pub slips_created: Vec<SlipId>,
    pub residents_skipped: usize,
    pub total_amount_cents: i64,
}

struct GenerationRun {
    replaced: usize,
    slips: Vec<Slip>,
    /// Residents the factory priced; zero when the month has no expenses.
    evaluated: usize,
}

/// Command handler for slip generation.
///
/// Runs are serialised inside the process; steps touching slip storage execute in a
/// single unit of work on the slip repository.
pub struct SlipGenerationService {
    policy: SlipGenerationPolicy,
    stores: BillingStores,
    events: Arc<dyn SlipEventPublisher>,
    clock: Arc<dyn Clock>,
    factory: SlipFactory,
    run_lock: Mutex<()>,
}

impl SlipGenerationService {
    pub fn new(
        stores: BillingStores,
        events: Arc<dyn SlipEventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let policy = SlipGenerationPolicy::new(stores.slips.clone(), clock.clone());
        Self {
            policy,
            stores,
            events,
            clock,
            factory: SlipFactory::new(),
            run_lock: Mutex::new(()),
        }
    }

    /// Generate (or regenerate) the slips for one expense month.
    pub fn generate(
        &self,
        command: &GenerationContext,
    ) -> Result<GenerationSummary, SlipServiceError> {
        let period = command.period()?;
        let _run = self
            .run_lock
            .lock()
            .map_err(|_| RepositoryError::Unavailable("generation lock poisoned".to_string()))?;

        self.policy.check(period, command.forced)?;

        let expense_range = period.date_range();
        let due_range = period.next().date_range();

        self.stores.slips.begin()?;
        let run = match self
            .replace_slips(period, &expense_range, &due_range)
            .and_then(|run| {
                self.stores.slips.commit()?;
                Ok(run)
            }) {
            Ok(run) => run,
            Err(err) => {
                if let Err(rollback_err) = self.stores.slips.rollback() {
                    warn!(%period, error = %rollback_err, "slip rollback failed");
                }
                return Err(err);
            }
        };

        for slip in &run.slips {
            self.events.publish(SlipEvent::generated(slip))?;
        }

        let summary = GenerationSummary {
            expense_period: period,
            due_date: self.factory.due_date_for(period),
            slips_replaced: run.replaced,
            slips_created: run.slips.iter().map(|slip| slip.id).collect(),
            residents_skipped: run.evaluated - run.slips.len(),
            total_amount_cents: run.slips.iter().map(|slip| slip.amount_cents).sum(),
        };

        info!(
            %period,
            due_date = %summary.due_date,
            forced = command.forced,
            replaced = summary.slips_replaced,
            created = summary.slips_created.len(),
            skipped = summary.residents_skipped,
            "slip generation completed"
        );

        Ok(summary)
    }

    fn replace_slips(
        &self,
        period: BillingPeriod,
        expense_range: &DateRange,
        due_range: &DateRange,
    ) -> Result<GenerationRun, SlipServiceError> {
        let replaced = self.stores.slips.delete_by_date_range(due_range)?;

        let mut expenses: Vec<ExpenseItem> = self
            .stores
            .expenses
            .find_active_by_date_range(expense_range)?
            .into_iter()
            .map(ExpenseItem::from)
            .collect();
        expenses.extend(
            self.stores
                .recurring_expenses
                .find_active_for_date_range(expense_range)?
                .into_iter()
                .map(ExpenseItem::from),
        );
        let residents = self.stores.resident_units.find_all_active()?;

        let slips = self.factory.create_from_expenses_and_units(
            &expenses,
            &residents,
            period,
            self.clock.now(),
        );

        for slip in &slips {
            self.stores.slips.save(slip.clone(), false)?;
        }
        if !slips.is_empty() {
            self.stores.slips.flush()?;
        }

        let evaluated = if expenses.is_empty() {
            0
        } else {
            residents.len()
        };

        Ok(GenerationRun {
            replaced,
            slips,
            evaluated,
        })
    }
}

/// Entry points moving persisted slips through their lifecycle.
pub struct SlipLifecycleService {
    slips: Arc<dyn SlipRepository>,
    events: Arc<dyn SlipEventPublisher>,
    clock: Arc<dyn Clock>,
}

impl SlipLifecycleService {
    pub fn new(
        slips: Arc<dyn SlipRepository>,
        events: Arc<dyn SlipEventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            slips,
            events,
            clock,
        }
    }

    pub fn get(&self, slip_id: &SlipId) -> Result<Slip, SlipServiceError> {
        let slip = self.slips.find(slip_id)?.ok_or(RepositoryError::NotFound)?;
        Ok(slip)
    }

    pub fn send(&self, slip_id: &SlipId) -> Result<Slip, SlipServiceError> {
        self.apply(slip_id, SlipAction::Send)
    }

    /// Paying a slip that is not submitted leaves it unchanged.
    pub fn pay(&self, slip_id: &SlipId) -> Result<Slip, SlipServiceError> {
        self.apply(slip_id, SlipAction::Pay)
    }

    pub fn expire(&self, slip_id: &SlipId) -> Result<Slip, SlipServiceError> {
        self.apply(slip_id, SlipAction::Expire)
    }

    pub fn cancel(&self, slip_id: &SlipId) -> Result<Slip, SlipServiceError> {
        self.apply(slip_id, SlipAction::Cancel)
    }

    pub fn apply(&self, slip_id: &SlipId, action: SlipAction) -> Result<Slip, SlipServiceError> {
        let mut slip = self.get(slip_id)?;
        let events = slip.apply(action, self.clock.now())?;

        if events.is_empty() {
            info!(
                %slip_id,
                action = action.name(),
                status = %slip.status,
                "action not applicable; slip left unchanged"
            );
            return Ok(slip);
        }

        let stored = self.slips.update(slip)?;
        for event in events {
            self.events.publish(event)?;
        }

        Ok(stored)
    }

    /// Marks every open slip due before today as overdue, returning how many moved.
    /// Slips changed concurrently are skipped.
    pub fn expire_overdue(&self) -> Result<usize, SlipServiceError> {
        let today = self.clock.today();
        let candidates = self.slips.find_open_due_before(today)?;
        let mut expired = 0;

        for slip in candidates {
            match self.apply(&slip.id, SlipAction::Expire) {
                Ok(_) => expired += 1,
                Err(SlipServiceError::Repository(RepositoryError::Conflict))
                | Err(SlipServiceError::Lifecycle(_)) => {
                    warn!(slip_id = %slip.id, "slip changed while expiring; skipped");
                }
                Err(err) => return Err(err),
            }
        }

        info!(%today, expired, "overdue slips expired");
        Ok(expired)
    }
}

/// Error raised by the slip services.
#[derive(Debug, thiserror::Error)]
pub enum SlipServiceError {
    #[error(transparent)]
    Period(#[from] PeriodError),
    #[error(transparent)]
    Policy(#[from] GenerationPolicyError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl From<PolicyCheckError> for SlipServiceError {
    fn from(value: PolicyCheckError) -> Self {
        match value {
            PolicyCheckError::Rejected(err) => Self::Policy(err),
            PolicyCheckError::Repository(err) => Self::Repository(err),
        }
    }
}

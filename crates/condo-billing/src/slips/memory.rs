//! In-process adapters for the slip repositories.
//!
//! They back the service binary until a database adapter exists, and double as
//! fixtures for tests.

use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;

use super::domain::{
    ensure_fraction_capacity, BillingPeriod, DateRange, Expense, RecurringExpense,
    RecurringExpenseOccurrence, ResidentUnit, ResidentUnitError, Slip, SlipId, SlipStatus,
};
use super::lifecycle::SlipEvent;
use super::repository::{
    ExpenseRepository, PublishError, RecurringExpenseRepository, RepositoryError,
    ResidentUnitRepository, SlipEventPublisher, SlipRepository,
};

fn lock<'a, T>(mutex: &'a Mutex<T>, store: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{store} lock poisoned")))
}

#[derive(Default)]
pub struct InMemoryExpenseRepository {
    expenses: Mutex<Vec<Expense>>,
}

impl InMemoryExpenseRepository {
    pub fn with_expenses(expenses: Vec<Expense>) -> Self {
        Self {
            expenses: Mutex::new(expenses),
        }
    }

    pub fn add(&self, expense: Expense) -> Result<(), RepositoryError> {
        lock(&self.expenses, "expense")?.push(expense);
        Ok(())
    }
}

impl ExpenseRepository for InMemoryExpenseRepository {
    fn find_active_by_date_range(&self, range: &DateRange) -> Result<Vec<Expense>, RepositoryError> {
        Ok(lock(&self.expenses, "expense")?
            .iter()
            .filter(|expense| expense.active && range.contains(expense.incurred_on))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryRecurringExpenseRepository {
    recurring: Mutex<Vec<RecurringExpense>>,
}

impl InMemoryRecurringExpenseRepository {
    pub fn with_recurring(recurring: Vec<RecurringExpense>) -> Self {
        Self {
            recurring: Mutex::new(recurring),
        }
    }

    pub fn add(&self, recurring: RecurringExpense) -> Result<(), RepositoryError> {
        lock(&self.recurring, "recurring expense")?.push(recurring);
        Ok(())
    }
}

impl RecurringExpenseRepository for InMemoryRecurringExpenseRepository {
    fn find_active_for_date_range(
        &self,
        range: &DateRange,
    ) -> Result<Vec<RecurringExpenseOccurrence>, RepositoryError> {
        Ok(lock(&self.recurring, "recurring expense")?
            .iter()
            .flat_map(|recurring| recurring.occurrences_within(range))
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryResidentUnitRepository {
    units: Mutex<Vec<ResidentUnit>>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Fraction(#[from] ResidentUnitError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl InMemoryResidentUnitRepository {
    /// Adds or replaces a unit after checking the ideal-fraction capacity.
    pub fn register(&self, unit: ResidentUnit) -> Result<(), RegistrationError> {
        let mut units = lock(&self.units, "resident unit")?;
        ensure_fraction_capacity(&units, &unit)?;
        match units.iter_mut().find(|existing| existing.id == unit.id) {
            Some(existing) => *existing = unit,
            None => units.push(unit),
        }
        Ok(())
    }
}

impl ResidentUnitRepository for InMemoryResidentUnitRepository {
    fn find_all_active(&self) -> Result<Vec<ResidentUnit>, RepositoryError> {
        Ok(lock(&self.units, "resident unit")?
            .iter()
            .filter(|unit| unit.active)
            .cloned()
            .collect())
    }
}

/// Changes made by an open unit of work, invisible to readers until commit.
#[derive(Default)]
struct PendingChanges {
    deleted: Vec<SlipId>,
    staged: Vec<Slip>,
}

#[derive(Default)]
struct SlipStore {
    slips: Vec<Slip>,
    unflushed: Vec<Slip>,
    transaction: Option<PendingChanges>,
}

fn upsert(slips: &mut Vec<Slip>, slip: Slip) {
    match slips.iter_mut().find(|stored| stored.id == slip.id) {
        Some(stored) => *stored = slip,
        None => slips.push(slip),
    }
}

impl SlipStore {
    fn flush(&mut self) {
        let flushed: Vec<Slip> = self.unflushed.drain(..).collect();
        let target = match self.transaction.as_mut() {
            Some(pending) => &mut pending.staged,
            None => &mut self.slips,
        };
        for slip in flushed {
            upsert(target, slip);
        }
    }
}

/// Slip store with read-committed transactions.
///
/// Deletes and flushed saves issued inside a unit of work are recorded as pending
/// changes and only reach the committed slips on `commit`; `rollback` discards them
/// without touching updates committed meanwhile.
#[derive(Default)]
pub struct InMemorySlipRepository {
    store: Mutex<SlipStore>,
}

impl InMemorySlipRepository {
    pub fn with_slips(slips: Vec<Slip>) -> Self {
        Self {
            store: Mutex::new(SlipStore {
                slips,
                ..SlipStore::default()
            }),
        }
    }

    /// Committed slips in insertion order.
    pub fn all(&self) -> Result<Vec<Slip>, RepositoryError> {
        Ok(lock(&self.store, "slip")?.slips.clone())
    }
}

impl SlipRepository for InMemorySlipRepository {
    fn exists_for_due_date_month(&self, due_period: BillingPeriod) -> Result<bool, RepositoryError> {
        let range = due_period.date_range();
        Ok(lock(&self.store, "slip")?
            .slips
            .iter()
            .any(|slip| range.contains(slip.due_date)))
    }

    fn delete_by_date_range(&self, range: &DateRange) -> Result<usize, RepositoryError> {
        let mut guard = lock(&self.store, "slip")?;
        let store = &mut *guard;

        match store.transaction.as_mut() {
            Some(pending) => {
                pending.staged.retain(|slip| !range.contains(slip.due_date));
                let doomed: Vec<SlipId> = store
                    .slips
                    .iter()
                    .filter(|slip| {
                        range.contains(slip.due_date) && !pending.deleted.contains(&slip.id)
                    })
                    .map(|slip| slip.id)
                    .collect();
                let count = doomed.len();
                pending.deleted.extend(doomed);
                Ok(count)
            }
            None => {
                let before = store.slips.len();
                store.slips.retain(|slip| !range.contains(slip.due_date));
                Ok(before - store.slips.len())
            }
        }
    }

    fn save(&self, slip: Slip, flush: bool) -> Result<(), RepositoryError> {
        let mut store = lock(&self.store, "slip")?;
        store.unflushed.push(slip);
        if flush {
            store.flush();
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), RepositoryError> {
        lock(&self.store, "slip")?.flush();
        Ok(())
    }

    fn find(&self, id: &SlipId) -> Result<Option<Slip>, RepositoryError> {
        Ok(lock(&self.store, "slip")?
            .slips
            .iter()
            .find(|slip| slip.id == *id)
            .cloned())
    }

    fn update(&self, mut slip: Slip) -> Result<Slip, RepositoryError> {
        let mut store = lock(&self.store, "slip")?;
        let stored = store
            .slips
            .iter_mut()
            .find(|stored| stored.id == slip.id)
            .ok_or(RepositoryError::NotFound)?;

        if stored.version != slip.version {
            return Err(RepositoryError::Conflict);
        }

        slip.version += 1;
        *stored = slip.clone();
        Ok(slip)
    }

    fn find_open_due_before(&self, date: NaiveDate) -> Result<Vec<Slip>, RepositoryError> {
        Ok(lock(&self.store, "slip")?
            .slips
            .iter()
            .filter(|slip| {
                matches!(slip.status, SlipStatus::Pending | SlipStatus::Submitted)
                    && slip.due_date < date
            })
            .cloned()
            .collect())
    }

    fn begin(&self) -> Result<(), RepositoryError> {
        let mut store = lock(&self.store, "slip")?;
        if store.transaction.is_some() {
            return Err(RepositoryError::Conflict);
        }
        store.transaction = Some(PendingChanges::default());
        Ok(())
    }

    fn commit(&self) -> Result<(), RepositoryError> {
        let mut store = lock(&self.store, "slip")?;
        store.flush();
        if let Some(pending) = store.transaction.take() {
            store.slips.retain(|slip| !pending.deleted.contains(&slip.id));
            for slip in pending.staged {
                upsert(&mut store.slips, slip);
            }
        }
        Ok(())
    }

    fn rollback(&self) -> Result<(), RepositoryError> {
        let mut store = lock(&self.store, "slip")?;
        store.unflushed.clear();
        store.transaction = None;
        Ok(())
    }
}

/// Publisher that keeps every event for later inspection.
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<SlipEvent>>,
}

impl RecordingEventPublisher {
    pub fn events(&self) -> Vec<SlipEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl SlipEventPublisher for RecordingEventPublisher {
    fn publish(&self, event: SlipEvent) -> Result<(), PublishError> {
        self.events
            .lock()
            .map_err(|_| PublishError::Transport("event log lock poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}

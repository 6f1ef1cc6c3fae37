use chrono::NaiveDate;

use super::domain::{
    BillingPeriod, DateRange, Expense, RecurringExpenseOccurrence, ResidentUnit, Slip, SlipId,
};
use super::lifecycle::SlipEvent;

/// Read access to one-off expenses.
pub trait ExpenseRepository: Send + Sync {
    fn find_active_by_date_range(&self, range: &DateRange) -> Result<Vec<Expense>, RepositoryError>;
}

/// Read access to recurring expenses, materialised as occurrences.
pub trait RecurringExpenseRepository: Send + Sync {
    fn find_active_for_date_range(
        &self,
        range: &DateRange,
    ) -> Result<Vec<RecurringExpenseOccurrence>, RepositoryError>;
}

pub trait ResidentUnitRepository: Send + Sync {
    fn find_all_active(&self) -> Result<Vec<ResidentUnit>, RepositoryError>;
}

/// Slip storage with an explicit unit of work.
///
/// Writes issued between `begin` and `commit` become visible together or, after
/// `rollback`, not at all. `save` with `flush = false` stages the slip until the
/// next `flush`.
pub trait SlipRepository: Send + Sync {
    fn exists_for_due_date_month(&self, due_period: BillingPeriod) -> Result<bool, RepositoryError>;
    fn delete_by_date_range(&self, range: &DateRange) -> Result<usize, RepositoryError>;
    fn save(&self, slip: Slip, flush: bool) -> Result<(), RepositoryError>;
    fn flush(&self) -> Result<(), RepositoryError>;
    fn find(&self, id: &SlipId) -> Result<Option<Slip>, RepositoryError>;
    /// Stores `slip` if the persisted version still equals `slip.version`, returning
    /// the stored copy with its version bumped.
    fn update(&self, slip: Slip) -> Result<Slip, RepositoryError>;
    /// Pending or submitted slips whose due date is strictly before `date`.
    fn find_open_due_before(&self, date: NaiveDate) -> Result<Vec<Slip>, RepositoryError>;
    fn begin(&self) -> Result<(), RepositoryError>;
    fn commit(&self) -> Result<(), RepositoryError>;
    fn rollback(&self) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record was modified concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for slip domain events (notifications, projections).
pub trait SlipEventPublisher: Send + Sync {
    fn publish(&self, event: SlipEvent) -> Result<(), PublishError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}

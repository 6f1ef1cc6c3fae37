//! Slip generation and lifecycle.
//!
//! Expenses for a month are bucketed by distribution method, split across the active
//! resident units and issued as slips due in the following month. A time-window policy
//! guards generation and regeneration; issued slips then move through an explicit
//! state machine.

mod aggregator;
mod calculator;
pub mod clock;
pub mod domain;
mod due_date;
mod factory;
pub mod import;
pub mod lifecycle;
pub mod memory;
mod policy;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use aggregator::ExpenseDistributionAggregator;
pub use calculator::PerResidentAmountCalculator;
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    ensure_fraction_capacity, BillingPeriod, DateRange, DistributionMethod, Expense, ExpenseItem,
    ExpenseTotals, ExpenseType, GenerationContext, PeriodError, RecurringExpense,
    RecurringExpenseOccurrence, ResidentUnit, ResidentUnitError, ResidentUnitId, Slip, SlipId,
    SlipStatus,
};
pub use due_date::DueDateSelector;
pub use factory::SlipFactory;
pub use lifecycle::{LifecycleError, SlipAction, SlipEvent, SlipTransition};
pub use policy::{GenerationPolicyError, GenerationWindow, PolicyCheckError, SlipGenerationPolicy};
pub use repository::{
    ExpenseRepository, PublishError, RecurringExpenseRepository, RepositoryError,
    ResidentUnitRepository, SlipEventPublisher, SlipRepository,
};
pub use router::{slip_router, SlipApi};
pub use service::{
    BillingStores, GenerationSummary, SlipGenerationService, SlipLifecycleService,
    SlipServiceError,
};

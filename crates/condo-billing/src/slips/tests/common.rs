use std::sync::Arc;

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::slips::clock::FixedClock;
use crate::slips::domain::{
    DateRange, DistributionMethod, Expense, ExpenseItem, ExpenseType, RecurringExpense,
    ResidentUnit, ResidentUnitId, Slip,
};
use crate::slips::memory::{
    InMemoryExpenseRepository, InMemoryRecurringExpenseRepository, InMemoryResidentUnitRepository,
    InMemorySlipRepository, RecordingEventPublisher,
};
use crate::slips::repository::{ExpenseRepository, RepositoryError};
use crate::slips::service::{BillingStores, SlipGenerationService, SlipLifecycleService};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    date(year, month, day)
        .and_hms_opt(hour, minute, second)
        .expect("valid time")
}

pub(super) fn expense_type(method: DistributionMethod) -> ExpenseType {
    ExpenseType {
        id: method.code().to_lowercase(),
        name: method.code().to_string(),
        distribution_method: method,
    }
}

pub(super) fn expense(id: &str, amount_cents: i64, method: DistributionMethod) -> Expense {
    Expense {
        id: id.to_string(),
        description: format!("expense {id}"),
        amount_cents,
        incurred_on: date(2024, 7, 15),
        expense_type: Some(expense_type(method)),
        active: true,
    }
}

pub(super) fn resident(id: &str, ideal_fraction: f64) -> ResidentUnit {
    ResidentUnit {
        id: ResidentUnitId(id.to_string()),
        label: format!("unit {id}"),
        ideal_fraction,
        active: true,
    }
}

/// The equal + fraction scenario used across the generation tests.
pub(super) fn july_items() -> Vec<ExpenseItem> {
    vec![
        expense("water", 10_000, DistributionMethod::Equal).into(),
        expense("facade", 50_000, DistributionMethod::Fraction).into(),
    ]
}

pub(super) fn amounts(slips: &[Slip]) -> Vec<(String, i64)> {
    slips
        .iter()
        .map(|slip| (slip.resident_unit.0.clone(), slip.amount_cents))
        .collect()
}

/// In-memory stores wired together for service tests.
pub(super) struct Fixture {
    pub(super) expenses: Arc<InMemoryExpenseRepository>,
    pub(super) recurring: Arc<InMemoryRecurringExpenseRepository>,
    pub(super) residents: Arc<InMemoryResidentUnitRepository>,
    pub(super) slips: Arc<InMemorySlipRepository>,
    pub(super) events: Arc<RecordingEventPublisher>,
}

impl Fixture {
    pub(super) fn empty() -> Self {
        Self {
            expenses: Arc::new(InMemoryExpenseRepository::default()),
            recurring: Arc::new(InMemoryRecurringExpenseRepository::default()),
            residents: Arc::new(InMemoryResidentUnitRepository::default()),
            slips: Arc::new(InMemorySlipRepository::default()),
            events: Arc::new(RecordingEventPublisher::default()),
        }
    }

    /// Two residents (7% and 10%) and one equal plus one fraction expense in July 2024.
    pub(super) fn july() -> Self {
        let fixture = Self::empty();
        fixture
            .expenses
            .add(expense("water", 10_000, DistributionMethod::Equal))
            .expect("expense added");
        fixture
            .expenses
            .add(expense("facade", 50_000, DistributionMethod::Fraction))
            .expect("expense added");
        fixture
            .residents
            .register(resident("r1", 0.07))
            .expect("unit registered");
        fixture
            .residents
            .register(resident("r2", 0.10))
            .expect("unit registered");
        fixture
    }

    pub(super) fn add_recurring(&self, recurring: RecurringExpense) {
        self.recurring.add(recurring).expect("recurring added");
    }

    pub(super) fn stores(&self) -> BillingStores {
        BillingStores {
            expenses: self.expenses.clone(),
            recurring_expenses: self.recurring.clone(),
            resident_units: self.residents.clone(),
            slips: self.slips.clone(),
        }
    }

    pub(super) fn generation(&self, now: NaiveDateTime) -> SlipGenerationService {
        SlipGenerationService::new(self.stores(), self.events.clone(), Arc::new(FixedClock(now)))
    }

    pub(super) fn lifecycle(&self, now: NaiveDateTime) -> SlipLifecycleService {
        SlipLifecycleService::new(
            self.slips.clone(),
            self.events.clone(),
            Arc::new(FixedClock(now)),
        )
    }

    pub(super) fn stored_slips(&self) -> Vec<Slip> {
        self.slips.all().expect("slips readable")
    }
}

pub(super) struct UnavailableExpenses;

impl ExpenseRepository for UnavailableExpenses {
    fn find_active_by_date_range(&self, _range: &DateRange) -> Result<Vec<Expense>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

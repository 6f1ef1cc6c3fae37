use chrono::NaiveDate;
use condo_billing::config::BillingConfig;
use condo_billing::error::AppError;
use condo_billing::ledger::{AccountBalanceProjection, InMemoryEventLog, LedgerEvent, LedgerEventKind};
use condo_billing::slips::import::{
    import_expenses_from_path, import_recurring_expenses_from_path,
    import_resident_units_from_path, ImportError,
};
use condo_billing::slips::memory::{
    InMemoryExpenseRepository, InMemoryRecurringExpenseRepository, InMemoryResidentUnitRepository,
    InMemorySlipRepository, RegistrationError,
};
use condo_billing::slips::{
    BillingStores, PublishError, SlipEvent, SlipEventPublisher, SlipRepository,
    SlipServiceError, SlipStatus,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

/// Ledger account credited with paid slips.
pub(crate) const OPERATING_ACCOUNT: &str = "operating";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) balances: Arc<AccountBalanceProjection>,
}

/// In-memory billing stores, optionally seeded from CSV exports.
#[derive(Default, Clone)]
pub(crate) struct BillingData {
    pub(crate) expenses: Arc<InMemoryExpenseRepository>,
    pub(crate) recurring: Arc<InMemoryRecurringExpenseRepository>,
    pub(crate) residents: Arc<InMemoryResidentUnitRepository>,
    pub(crate) slips: Arc<InMemorySlipRepository>,
}

impl BillingData {
    pub(crate) fn load(sources: &BillingConfig) -> Result<Self, AppError> {
        let expenses = match &sources.expenses_csv {
            Some(path) => seeded("expenses", path, import_expenses_from_path(path)?),
            None => Vec::new(),
        };
        let recurring = match &sources.recurring_expenses_csv {
            Some(path) => seeded(
                "recurring expenses",
                path,
                import_recurring_expenses_from_path(path)?,
            ),
            None => Vec::new(),
        };
        let units = match &sources.residents_csv {
            Some(path) => seeded("resident units", path, import_resident_units_from_path(path)?),
            None => Vec::new(),
        };

        let residents = InMemoryResidentUnitRepository::default();
        for unit in units {
            residents.register(unit).map_err(|err| match err {
                RegistrationError::Fraction(err) => AppError::from(ImportError::from(err)),
                RegistrationError::Repository(err) => AppError::from(SlipServiceError::from(err)),
            })?;
        }

        Ok(Self {
            expenses: Arc::new(InMemoryExpenseRepository::with_expenses(expenses)),
            recurring: Arc::new(InMemoryRecurringExpenseRepository::with_recurring(recurring)),
            residents: Arc::new(residents),
            slips: Arc::new(InMemorySlipRepository::default()),
        })
    }

    pub(crate) fn stores(&self) -> BillingStores {
        BillingStores {
            expenses: self.expenses.clone(),
            recurring_expenses: self.recurring.clone(),
            resident_units: self.residents.clone(),
            slips: self.slips.clone(),
        }
    }
}

fn seeded<T>(kind: &str, path: &Path, records: Vec<T>) -> Vec<T> {
    info!(kind, path = %path.display(), count = records.len(), "billing data imported");
    records
}

/// Logs every slip event and posts paid slips to the operating account ledger.
pub(crate) struct LedgerPostingPublisher {
    slips: Arc<dyn SlipRepository>,
    ledger: Arc<InMemoryEventLog>,
}

impl LedgerPostingPublisher {
    pub(crate) fn new(slips: Arc<dyn SlipRepository>, ledger: Arc<InMemoryEventLog>) -> Self {
        Self { slips, ledger }
    }
}

impl SlipEventPublisher for LedgerPostingPublisher {
    fn publish(&self, event: SlipEvent) -> Result<(), PublishError> {
        info!(slip_id = %event.slip_id(), ?event, "slip event");

        let SlipEvent::StatusChanged {
            slip_id,
            to: SlipStatus::Paid,
            at,
            ..
        } = event
        else {
            return Ok(());
        };

        let slip = self
            .slips
            .find(&slip_id)
            .map_err(|err| PublishError::Transport(err.to_string()))?
            .ok_or_else(|| PublishError::Transport(format!("paid slip {slip_id} not found")))?;

        self.ledger
            .append(LedgerEvent {
                kind: LedgerEventKind::SlipPaid,
                account_id: OPERATING_ACCOUNT.to_string(),
                amount_cents: slip.amount_cents,
                occurred_on: at.date(),
            })
            .map_err(|err| PublishError::Transport(err.to_string()))
    }
}

pub(crate) fn format_cents(amount_cents: i64) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let abs = amount_cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

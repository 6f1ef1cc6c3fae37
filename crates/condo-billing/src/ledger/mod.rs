//! Read side of the condominium account ledger.
//!
//! The ledger itself is an append-only event log owned elsewhere; this module only
//! queries it by event kind and date range and folds the result into balances.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::slips::domain::DateRange;
use crate::slips::repository::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEventKind {
    IncomeRecorded,
    ExpenseRecorded,
    SlipPaid,
}

impl LedgerEventKind {
    pub const fn is_credit(self) -> bool {
        matches!(self, Self::IncomeRecorded | Self::SlipPaid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub kind: LedgerEventKind,
    pub account_id: String,
    pub amount_cents: i64,
    pub occurred_on: NaiveDate,
}

/// Read-only access to the append-only ledger.
pub trait EventLog: Send + Sync {
    fn find_by_types_and_range(
        &self,
        kinds: &[LedgerEventKind],
        range: &DateRange,
    ) -> Result<Vec<LedgerEvent>, RepositoryError>;
}

/// Append-only in-process log.
#[derive(Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<LedgerEvent>>,
}

impl InMemoryEventLog {
    pub fn append(&self, event: LedgerEvent) -> Result<(), RepositoryError> {
        self.events
            .lock()
            .map_err(|_| RepositoryError::Unavailable("ledger lock poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}

impl EventLog for InMemoryEventLog {
    fn find_by_types_and_range(
        &self,
        kinds: &[LedgerEventKind],
        range: &DateRange,
    ) -> Result<Vec<LedgerEvent>, RepositoryError> {
        let events = self
            .events
            .lock()
            .map_err(|_| RepositoryError::Unavailable("ledger lock poisoned".to_string()))?;
        Ok(events
            .iter()
            .filter(|event| kinds.contains(&event.kind) && range.contains(event.occurred_on))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    pub credits_cents: i64,
    pub debits_cents: i64,
    pub balance_cents: i64,
}

pub struct AccountBalanceProjection {
    log: Arc<dyn EventLog>,
}

impl AccountBalanceProjection {
    const KINDS: [LedgerEventKind; 3] = [
        LedgerEventKind::IncomeRecorded,
        LedgerEventKind::ExpenseRecorded,
        LedgerEventKind::SlipPaid,
    ];

    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self { log }
    }

    /// Incomes and paid slips minus expenses booked to `account_id` within `range`.
    pub fn balance(
        &self,
        account_id: &str,
        range: &DateRange,
    ) -> Result<AccountBalance, RepositoryError> {
        let balance = self
            .log
            .find_by_types_and_range(&Self::KINDS, range)?
            .into_iter()
            .filter(|event| event.account_id == account_id)
            .fold(AccountBalance::default(), |mut acc, event| {
                if event.kind.is_credit() {
                    acc.credits_cents += event.amount_cents;
                } else {
                    acc.debits_cents += event.amount_cents;
                }
                acc.balance_cents = acc.credits_cents - acc.debits_cents;
                acc
            });

        debug!(
            account_id,
            start = %range.start,
            end = %range.end,
            balance_cents = balance.balance_cents,
            "account balance projected"
        );
        Ok(balance)
    }
}

use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use super::aggregator::ExpenseDistributionAggregator;
use super::calculator::PerResidentAmountCalculator;
use super::domain::{BillingPeriod, ExpenseItem, ResidentUnit, Slip};
use super::due_date::DueDateSelector;

/// Turns a month of expenses into one slip per paying resident unit.
#[derive(Debug, Default, Clone, Copy)]
pub struct SlipFactory {
    aggregator: ExpenseDistributionAggregator,
    calculator: PerResidentAmountCalculator,
    due_dates: DueDateSelector,
}

impl SlipFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Due date for slips covering `expense_period`.
    pub fn due_date_for(&self, expense_period: BillingPeriod) -> NaiveDate {
        self.due_dates.select_for(expense_period.next())
    }

    /// Slips follow the order of `resident_units`; residents whose share is not
    /// positive get no slip. `issued_at` becomes every slip's creation time.
    pub fn create_from_expenses_and_units(
        &self,
        expenses: &[ExpenseItem],
        resident_units: &[ResidentUnit],
        expense_period: BillingPeriod,
        issued_at: NaiveDateTime,
    ) -> Vec<Slip> {
        if expenses.is_empty() || resident_units.is_empty() {
            return Vec::new();
        }

        let totals = self.aggregator.aggregate(expenses);
        let due_date = self.due_date_for(expense_period);
        let paying_residents = resident_units.len();

        resident_units
            .iter()
            .filter_map(|resident| {
                let amount_cents = self.calculator.calculate(
                    resident,
                    totals.equal,
                    totals.fraction,
                    paying_residents,
                );

                if amount_cents <= 0 {
                    info!(
                        resident_unit = %resident.id,
                        amount_cents,
                        period = %expense_period,
                        "skipping slip with non-positive amount"
                    );
                    return None;
                }

                Some(Slip::issue(
                    resident.id.clone(),
                    amount_cents,
                    due_date,
                    issued_at,
                ))
            })
            .collect()
    }
}

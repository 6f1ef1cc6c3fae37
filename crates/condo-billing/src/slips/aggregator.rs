use tracing::error;

use super::domain::{DistributionMethod, ExpenseItem, ExpenseTotals};

/// Sums expenses into the equal, fraction and individual buckets.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpenseDistributionAggregator;

impl ExpenseDistributionAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Items without a resolvable expense type are logged and left out of every bucket.
    pub fn aggregate(&self, items: &[ExpenseItem]) -> ExpenseTotals {
        let mut totals = ExpenseTotals::default();

        for item in items {
            let Some(method) = item.distribution_method() else {
                error!(
                    expense = item.reference(),
                    amount_cents = item.amount_cents(),
                    "expense has no resolvable type; excluded from slip totals"
                );
                continue;
            };

            match method {
                DistributionMethod::Equal => totals.equal += item.amount_cents(),
                DistributionMethod::Fraction => totals.fraction += item.amount_cents(),
                DistributionMethod::Individual => totals.individual += item.amount_cents(),
            }
        }

        totals.grand_total = totals.equal + totals.fraction + totals.individual;
        totals
    }
}

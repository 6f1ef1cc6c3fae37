use super::common::*;
use crate::slips::domain::{BillingPeriod, DistributionMethod, ExpenseItem, SlipStatus};
use crate::slips::factory::SlipFactory;

fn july() -> BillingPeriod {
    BillingPeriod::new(2024, 7).expect("valid period")
}

#[test]
fn splits_equal_and_fraction_buckets_per_resident() {
    let residents = vec![resident("r1", 0.07), resident("r2", 0.10)];
    let issued_at = at(2024, 7, 26, 10, 0, 0);

    let slips = SlipFactory::new().create_from_expenses_and_units(
        &july_items(),
        &residents,
        july(),
        issued_at,
    );

    assert_eq!(
        amounts(&slips),
        vec![("r1".to_string(), 8_500), ("r2".to_string(), 10_000)]
    );
    for slip in &slips {
        assert_eq!(slip.due_date, date(2024, 8, 6));
        assert_eq!(slip.status, SlipStatus::Pending);
        assert_eq!(slip.created_at, issued_at);
        assert!(slip.paid_at.is_none());
    }
}

#[test]
fn residents_with_nothing_to_pay_get_no_slip() {
    let items: Vec<ExpenseItem> = vec![expense("facade", 50_000, DistributionMethod::Fraction).into()];
    let residents = vec![resident("r1", 0.07), resident("garage", 0.0), resident("r2", 0.10)];

    let slips = SlipFactory::new().create_from_expenses_and_units(
        &items,
        &residents,
        july(),
        at(2024, 7, 26, 10, 0, 0),
    );

    assert_eq!(
        amounts(&slips),
        vec![("r1".to_string(), 3_500), ("r2".to_string(), 5_000)]
    );
}

#[test]
fn empty_inputs_produce_no_slips() {
    let factory = SlipFactory::new();
    let now = at(2024, 7, 26, 10, 0, 0);

    assert!(factory
        .create_from_expenses_and_units(&[], &[resident("r1", 0.5)], july(), now)
        .is_empty());
    assert!(factory
        .create_from_expenses_and_units(&july_items(), &[], july(), now)
        .is_empty());
}

#[test]
fn individual_expenses_are_not_assigned_to_residents() {
    let items: Vec<ExpenseItem> =
        vec![expense("meter", 9_000, DistributionMethod::Individual).into()];

    let slips = SlipFactory::new().create_from_expenses_and_units(
        &items,
        &[resident("r1", 0.5), resident("r2", 0.5)],
        july(),
        at(2024, 7, 26, 10, 0, 0),
    );

    assert!(slips.is_empty());
}

#[test]
fn repeated_runs_match_on_amount_and_due_date_but_not_identity() {
    let factory = SlipFactory::new();
    let residents = vec![resident("r1", 0.07), resident("r2", 0.10)];
    let now = at(2024, 7, 26, 10, 0, 0);

    let first = factory.create_from_expenses_and_units(&july_items(), &residents, july(), now);
    let second = factory.create_from_expenses_and_units(&july_items(), &residents, july(), now);

    assert_eq!(amounts(&first), amounts(&second));
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.due_date, b.due_date);
        assert_ne!(a.id, b.id);
    }
}

#[test]
fn november_expenses_are_due_on_sixth_of_december() {
    let november = BillingPeriod::new(2024, 11).expect("valid period");
    assert_eq!(SlipFactory::new().due_date_for(november), date(2024, 12, 6));
}

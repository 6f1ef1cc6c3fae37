//! End-to-end generation runs: CSV billing data imported into the in-memory stores,
//! slips generated and regenerated through the public service under a pinned clock.

mod common {
    use std::io::Cursor;
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveDateTime};

    use condo_billing::slips::import::{
        import_expenses, import_recurring_expenses, import_resident_units,
    };
    use condo_billing::slips::memory::{
        InMemoryExpenseRepository, InMemoryRecurringExpenseRepository,
        InMemoryResidentUnitRepository, InMemorySlipRepository, RecordingEventPublisher,
    };
    use condo_billing::slips::{BillingStores, FixedClock, SlipGenerationService};

    const RESIDENTS: &str = "id,label,ideal_fraction\n\
                             A,Apt 101,0.25\n\
                             B,Apt 102,0.25\n\
                             C,Penthouse,0.5\n";

    const EXPENSES: &str = "id,description,amount_cents,incurred_on,type,distribution_method\n\
                            water,Water bill,9000,2024-07-03,Utilities,EQUAL\n\
                            roof,Roof repair,40000,2024-07-12,Works,FRACTION\n\
                            meter,Gas meter,1200,2024-07-18,Metered,INDIVIDUAL\n\
                            misc,Unclassified,500,2024-07-19,,\n\
                            june,June cleaning,7000,2024-06-28,Services,EQUAL\n";

    const RECURRING: &str = "id,description,amount_cents,day_of_month,starts_on,ends_on,type,distribution_method\n\
                             cleaning,Cleaning service,30000,31,2024-01-01,,Services,EQUAL\n";

    pub(super) fn at(month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid instant")
    }

    pub(super) struct Condominium {
        pub(super) expenses: Arc<InMemoryExpenseRepository>,
        pub(super) slips: Arc<InMemorySlipRepository>,
        pub(super) events: Arc<RecordingEventPublisher>,
        stores: BillingStores,
    }

    impl Condominium {
        pub(super) fn imported() -> Self {
            let residents = InMemoryResidentUnitRepository::default();
            for unit in import_resident_units(Cursor::new(RESIDENTS)).expect("residents import") {
                residents.register(unit).expect("unit registered");
            }
            let expenses = Arc::new(InMemoryExpenseRepository::with_expenses(
                import_expenses(Cursor::new(EXPENSES)).expect("expenses import"),
            ));
            let recurring = Arc::new(InMemoryRecurringExpenseRepository::with_recurring(
                import_recurring_expenses(Cursor::new(RECURRING)).expect("recurring import"),
            ));
            let slips = Arc::new(InMemorySlipRepository::default());

            let stores = BillingStores {
                expenses: expenses.clone(),
                recurring_expenses: recurring,
                resident_units: Arc::new(residents),
                slips: slips.clone(),
            };

            Self {
                expenses,
                slips,
                events: Arc::new(RecordingEventPublisher::default()),
                stores,
            }
        }

        pub(super) fn service_at(&self, now: NaiveDateTime) -> SlipGenerationService {
            SlipGenerationService::new(
                self.stores.clone(),
                self.events.clone(),
                Arc::new(FixedClock(now)),
            )
        }

        pub(super) fn amounts(&self) -> Vec<(String, i64)> {
            self.slips
                .all()
                .expect("slips readable")
                .into_iter()
                .map(|slip| (slip.resident_unit.0, slip.amount_cents))
                .collect()
        }
    }
}

use chrono::NaiveDate;

use condo_billing::slips::{
    DistributionMethod, Expense, ExpenseType, GenerationContext, GenerationPolicyError,
    SlipEvent, SlipServiceError, SlipStatus,
};

use common::{at, Condominium};

fn july(forced: bool) -> GenerationContext {
    GenerationContext::new(2024, 7, forced)
}

#[test]
fn imported_month_is_split_into_one_slip_per_unit() {
    let condo = Condominium::imported();

    let summary = condo
        .service_at(at(7, 26, 10, 0))
        .generate(&july(false))
        .expect("generation inside the window");

    assert_eq!(
        summary.due_date,
        NaiveDate::from_ymd_opt(2024, 8, 6).expect("valid date")
    );
    assert_eq!(summary.slips_replaced, 0);
    assert_eq!(summary.residents_skipped, 0);
    assert_eq!(summary.total_amount_cents, 79_000);
    assert_eq!(
        condo.amounts(),
        vec![
            ("A".to_string(), 23_000),
            ("B".to_string(), 23_000),
            ("C".to_string(), 33_000),
        ]
    );

    let slips = condo.slips.all().expect("slips readable");
    assert!(slips
        .iter()
        .all(|slip| slip.status == SlipStatus::Pending && slip.created_at == at(7, 26, 10, 0)));
    assert_eq!(
        condo
            .events
            .events()
            .iter()
            .filter(|event| matches!(event, SlipEvent::Generated { .. }))
            .count(),
        3
    );
}

#[test]
fn regeneration_replaces_slips_until_the_fifth_of_the_due_month() {
    let condo = Condominium::imported();
    condo
        .service_at(at(7, 26, 10, 0))
        .generate(&july(false))
        .expect("first run");
    let first_ids: Vec<_> = condo
        .slips
        .all()
        .expect("slips readable")
        .into_iter()
        .map(|slip| slip.id)
        .collect();

    condo
        .expenses
        .add(Expense {
            id: "late-invoice".to_string(),
            description: "Late electricity invoice".to_string(),
            amount_cents: 3_000,
            incurred_on: NaiveDate::from_ymd_opt(2024, 7, 20).expect("valid date"),
            expense_type: Some(ExpenseType {
                id: "utilities".to_string(),
                name: "Utilities".to_string(),
                distribution_method: DistributionMethod::Equal,
            }),
            active: true,
        })
        .expect("expense added");

    let summary = condo
        .service_at(at(8, 5, 23, 0))
        .generate(&july(false))
        .expect("recreation still open");
    assert_eq!(summary.slips_replaced, 3);
    assert_eq!(
        condo.amounts(),
        vec![
            ("A".to_string(), 24_000),
            ("B".to_string(), 24_000),
            ("C".to_string(), 34_000),
        ]
    );
    assert!(summary
        .slips_created
        .iter()
        .all(|id| !first_ids.contains(id)));

    match condo.service_at(at(8, 6, 0, 0)).generate(&july(false)) {
        Err(SlipServiceError::Policy(GenerationPolicyError::RecreationExpired { .. })) => {}
        other => panic!("expected recreation_expired, got {other:?}"),
    }
    assert_eq!(condo.slips.all().expect("slips readable").len(), 3);

    let forced = condo
        .service_at(at(9, 15, 8, 0))
        .generate(&july(true))
        .expect("forced runs ignore the window");
    assert_eq!(forced.slips_replaced, 3);
}

#[test]
fn first_run_after_the_window_needs_confirmation() {
    let condo = Condominium::imported();

    match condo.service_at(at(8, 20, 9, 0)).generate(&july(false)) {
        Err(SlipServiceError::Policy(
            GenerationPolicyError::PastMonthGenerationRequiresConfirmation { .. },
        )) => {}
        other => panic!("expected confirmation requirement, got {other:?}"),
    }
    assert!(condo.slips.all().expect("slips readable").is_empty());
    assert!(condo.events.events().is_empty());
}

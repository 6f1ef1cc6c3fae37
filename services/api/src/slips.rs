use crate::infra::{format_cents, BillingData};
use chrono::NaiveDate;
use clap::Args;
use condo_billing::config::AppConfig;
use condo_billing::error::AppError;
use condo_billing::slips::memory::RecordingEventPublisher;
use condo_billing::slips::{
    Clock, DueDateSelector, FixedClock, GenerationContext, GenerationSummary, Slip,
    SlipGenerationService, SlipServiceError, SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct GenerateArgs {
    /// Expense year
    #[arg(long)]
    pub(crate) year: i32,
    /// Expense month (1-12)
    #[arg(long)]
    pub(crate) month: u32,
    /// Skip the generation window checks
    #[arg(long)]
    pub(crate) forced: bool,
    /// Resident units CSV (defaults to BILLING_RESIDENTS_CSV)
    #[arg(long)]
    pub(crate) residents: Option<PathBuf>,
    /// Expenses CSV (defaults to BILLING_EXPENSES_CSV)
    #[arg(long)]
    pub(crate) expenses: Option<PathBuf>,
    /// Recurring expenses CSV (defaults to BILLING_RECURRING_EXPENSES_CSV)
    #[arg(long)]
    pub(crate) recurring: Option<PathBuf>,
    /// Evaluate the generation window as of this date (YYYY-MM-DD, defaults to now)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct DueDateArgs {
    /// Due year
    #[arg(long)]
    pub(crate) year: i32,
    /// Due month (1-12)
    #[arg(long)]
    pub(crate) month: u32,
}

pub(crate) fn run_generate(args: GenerateArgs) -> Result<(), AppError> {
    let mut sources = AppConfig::load()?.billing;
    if args.residents.is_some() {
        sources.residents_csv = args.residents;
    }
    if args.expenses.is_some() {
        sources.expenses_csv = args.expenses;
    }
    if args.recurring.is_some() {
        sources.recurring_expenses_csv = args.recurring;
    }

    let data = BillingData::load(&sources)?;
    let clock: Arc<dyn Clock> = match args.today {
        Some(today) => Arc::new(FixedClock::at_start_of(today)),
        None => Arc::new(SystemClock),
    };
    let service = SlipGenerationService::new(
        data.stores(),
        Arc::new(RecordingEventPublisher::default()),
        clock,
    );

    let summary = service.generate(&GenerationContext::new(args.year, args.month, args.forced))?;
    let slips = data
        .slips
        .all()
        .map_err(SlipServiceError::from)?;
    render_summary(&summary, &slips);
    Ok(())
}

pub(crate) fn run_due_date(args: DueDateArgs) -> Result<(), AppError> {
    let due_date = DueDateSelector::new()
        .select(args.year, args.month)
        .map_err(SlipServiceError::from)?;
    println!("{due_date}");
    Ok(())
}

fn render_summary(summary: &GenerationSummary, slips: &[Slip]) {
    println!(
        "Slips for {} due {}",
        summary.expense_period, summary.due_date
    );
    println!(
        "  created {} | replaced {} | skipped {} | total {}",
        summary.slips_created.len(),
        summary.slips_replaced,
        summary.residents_skipped,
        format_cents(summary.total_amount_cents)
    );

    for slip in slips
        .iter()
        .filter(|slip| summary.slips_created.contains(&slip.id))
    {
        println!(
            "  {:<12} {:>12}  {}",
            slip.resident_unit.0,
            format_cents(slip.amount_cents),
            slip.id
        );
    }
}

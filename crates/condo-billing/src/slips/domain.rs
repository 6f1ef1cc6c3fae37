use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;
use uuid::Uuid;

/// Calendar month used both for expense periods and slip due-date months.
///
/// Internally anchored on the first day of the month, which keeps every date
/// derived from it constructible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BillingPeriod(NaiveDate);

impl BillingPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodError> {
        if !(1..=9999).contains(&year) {
            return Err(PeriodError::InvalidYear(year));
        }
        if !(1..=12).contains(&month) {
            return Err(PeriodError::InvalidMonth(month));
        }

        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or(PeriodError::InvalidMonth(month))
    }

    /// The period a given date falls into.
    pub fn containing(date: NaiveDate) -> Self {
        Self(date - Duration::days(i64::from(date.day0())))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// The following month, rolling the year over after December.
    pub fn next(&self) -> Self {
        // Day 32 after the first always lands on day 1..=4 of the next month.
        let probe = self.0 + Duration::days(32);
        Self::containing(probe)
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day() - Duration::days(1)
    }

    pub fn day(&self, day: u32) -> Option<NaiveDate> {
        self.0.with_day(day)
    }

    pub fn date_range(&self) -> DateRange {
        DateRange {
            start: self.first_day(),
            end: self.last_day(),
        }
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl Serialize for BillingPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BillingPeriod", 2)?;
        state.serialize_field("year", &self.year())?;
        state.serialize_field("month", &self.month())?;
        state.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    #[error("year {0} is outside the supported range 1-9999")]
    InvalidYear(i32),
    #[error("month {0} is outside the range 1-12")]
    InvalidMonth(u32),
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// How an expense is spread across resident units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum DistributionMethod {
    Equal,
    Fraction,
    Individual,
}

impl DistributionMethod {
    /// Parses a stored method code. Unrecognised codes are treated as
    /// `Individual` rather than rejected.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "EQUAL" => Self::Equal,
            "FRACTION" => Self::Fraction,
            "INDIVIDUAL" => Self::Individual,
            other => {
                warn!(
                    code = other,
                    "unrecognised distribution method; treating as individual"
                );
                Self::Individual
            }
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::Fraction => "FRACTION",
            Self::Individual => "INDIVIDUAL",
        }
    }
}

impl From<String> for DistributionMethod {
    fn from(value: String) -> Self {
        Self::from_code(&value)
    }
}

impl Serialize for DistributionMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseType {
    pub id: String,
    pub name: String,
    pub distribution_method: DistributionMethod,
}

/// One-off expense booked against the condominium.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount_cents: i64,
    pub incurred_on: NaiveDate,
    pub expense_type: Option<ExpenseType>,
    pub active: bool,
}

/// Monthly expense template; materialises one occurrence per calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringExpense {
    pub id: String,
    pub description: String,
    pub amount_cents: i64,
    pub day_of_month: u32,
    pub starts_on: NaiveDate,
    pub ends_on: Option<NaiveDate>,
    pub expense_type: Option<ExpenseType>,
    pub active: bool,
}

impl RecurringExpense {
    /// Occurrences falling inside `range`, one per month at most. The day of month
    /// is clamped to the month's last day.
    pub fn occurrences_within(&self, range: &DateRange) -> Vec<RecurringExpenseOccurrence> {
        if !self.active || range.end < range.start {
            return Vec::new();
        }

        let mut occurrences = Vec::new();
        let mut period = BillingPeriod::containing(range.start);

        while period.first_day() <= range.end {
            let last_day = period.last_day();
            let day = self.day_of_month.clamp(1, last_day.day());
            let occurs_on = period.first_day() + Duration::days(i64::from(day - 1));

            let within_schedule = occurs_on >= self.starts_on
                && self.ends_on.map_or(true, |ends_on| occurs_on <= ends_on);
            if within_schedule && range.contains(occurs_on) {
                occurrences.push(RecurringExpenseOccurrence {
                    recurring_expense_id: self.id.clone(),
                    description: self.description.clone(),
                    amount_cents: self.amount_cents,
                    occurs_on,
                    expense_type: self.expense_type.clone(),
                });
            }

            period = period.next();
        }

        occurrences
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringExpenseOccurrence {
    pub recurring_expense_id: String,
    pub description: String,
    pub amount_cents: i64,
    pub occurs_on: NaiveDate,
    pub expense_type: Option<ExpenseType>,
}

/// Anything that can be distributed onto slips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseItem {
    OneOff(Expense),
    Recurring(RecurringExpenseOccurrence),
}

impl ExpenseItem {
    pub fn amount_cents(&self) -> i64 {
        match self {
            ExpenseItem::OneOff(expense) => expense.amount_cents,
            ExpenseItem::Recurring(occurrence) => occurrence.amount_cents,
        }
    }

    pub fn expense_type(&self) -> Option<&ExpenseType> {
        match self {
            ExpenseItem::OneOff(expense) => expense.expense_type.as_ref(),
            ExpenseItem::Recurring(occurrence) => occurrence.expense_type.as_ref(),
        }
    }

    pub fn distribution_method(&self) -> Option<DistributionMethod> {
        self.expense_type().map(|kind| kind.distribution_method)
    }

    pub fn reference(&self) -> &str {
        match self {
            ExpenseItem::OneOff(expense) => &expense.id,
            ExpenseItem::Recurring(occurrence) => &occurrence.recurring_expense_id,
        }
    }
}

impl From<Expense> for ExpenseItem {
    fn from(value: Expense) -> Self {
        Self::OneOff(value)
    }
}

impl From<RecurringExpenseOccurrence> for ExpenseItem {
    fn from(value: RecurringExpenseOccurrence) -> Self {
        Self::Recurring(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResidentUnitId(pub String);

impl fmt::Display for ResidentUnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Billable unit carrying its share of fraction-distributed costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentUnit {
    pub id: ResidentUnitId,
    pub label: String,
    pub ideal_fraction: f64,
    pub active: bool,
}

const FRACTION_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResidentUnitError {
    #[error("resident unit {unit} has ideal fraction {fraction} outside [0, 1]")]
    FractionOutOfRange { unit: ResidentUnitId, fraction: f64 },
    #[error("adding resident unit {unit} raises the active ideal fraction total to {total:.6}")]
    FractionCapacityExceeded { unit: ResidentUnitId, total: f64 },
}

/// Registration-time check that active ideal fractions never sum above 1.0.
pub fn ensure_fraction_capacity(
    existing: &[ResidentUnit],
    candidate: &ResidentUnit,
) -> Result<(), ResidentUnitError> {
    if !(0.0..=1.0).contains(&candidate.ideal_fraction) {
        return Err(ResidentUnitError::FractionOutOfRange {
            unit: candidate.id.clone(),
            fraction: candidate.ideal_fraction,
        });
    }

    if !candidate.active {
        return Ok(());
    }

    let total: f64 = existing
        .iter()
        .filter(|unit| unit.active && unit.id != candidate.id)
        .map(|unit| unit.ideal_fraction)
        .sum::<f64>()
        + candidate.ideal_fraction;

    if total > 1.0 + FRACTION_TOLERANCE {
        return Err(ResidentUnitError::FractionCapacityExceeded {
            unit: candidate.id.clone(),
            total,
        });
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlipId(pub Uuid);

impl SlipId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SlipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlipStatus {
    Pending,
    Submitted,
    Paid,
    Overdue,
    Cancelled,
}

impl SlipStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }
}

impl fmt::Display for SlipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Monthly charge statement for one resident unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slip {
    pub id: SlipId,
    pub resident_unit: ResidentUnitId,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    pub created_at: NaiveDateTime,
    pub paid_at: Option<NaiveDateTime>,
    pub status: SlipStatus,
    /// Optimistic-lock counter, bumped by the repository on every update.
    pub version: u64,
}

impl Slip {
    pub fn issue(
        resident_unit: ResidentUnitId,
        amount_cents: i64,
        due_date: NaiveDate,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: SlipId::generate(),
            resident_unit,
            amount_cents,
            due_date,
            created_at,
            paid_at: None,
            status: SlipStatus::Pending,
            version: 0,
        }
    }
}

/// Bucketed totals for one generation run, in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExpenseTotals {
    pub equal: i64,
    pub fraction: i64,
    pub individual: i64,
    pub grand_total: i64,
}

/// Command input for one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationContext {
    #[serde(rename = "year")]
    pub expense_year: i32,
    #[serde(rename = "month")]
    pub expense_month: u32,
    #[serde(default)]
    pub forced: bool,
}

impl GenerationContext {
    pub fn new(expense_year: i32, expense_month: u32, forced: bool) -> Self {
        Self {
            expense_year,
            expense_month,
            forced,
        }
    }

    pub fn period(&self) -> Result<BillingPeriod, PeriodError> {
        BillingPeriod::new(self.expense_year, self.expense_month)
    }
}

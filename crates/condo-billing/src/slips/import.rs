use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use super::domain::{
    ensure_fraction_capacity, DistributionMethod, Expense, ExpenseType, RecurringExpense,
    ResidentUnit, ResidentUnitError, ResidentUnitId,
};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read billing data: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid billing CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    ResidentUnit(#[from] ResidentUnitError),
    #[error("record {record}: amount {amount_cents} must not be negative")]
    NegativeAmount { record: String, amount_cents: i64 },
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

#[derive(Debug, Deserialize)]
struct ResidentUnitRow {
    id: String,
    label: String,
    ideal_fraction: f64,
    #[serde(default = "default_active")]
    active: bool,
}

/// Reads `id,label,ideal_fraction[,active]` rows, rejecting any unit that would
/// push the active ideal fractions above 1.0.
pub fn import_resident_units<R: Read>(reader: R) -> Result<Vec<ResidentUnit>, ImportError> {
    let mut units: Vec<ResidentUnit> = Vec::new();

    for row in csv_reader(reader).deserialize::<ResidentUnitRow>() {
        let row = row?;
        let unit = ResidentUnit {
            id: ResidentUnitId(row.id),
            label: row.label,
            ideal_fraction: row.ideal_fraction,
            active: row.active,
        };
        ensure_fraction_capacity(&units, &unit)?;
        units.push(unit);
    }

    Ok(units)
}

pub fn import_resident_units_from_path<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<ResidentUnit>, ImportError> {
    let file = std::fs::File::open(path)?;
    import_resident_units(file)
}

#[derive(Debug, Deserialize)]
struct ExpenseRow {
    id: String,
    description: String,
    amount_cents: i64,
    incurred_on: NaiveDate,
    #[serde(rename = "type", default, deserialize_with = "empty_string_as_none")]
    type_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    distribution_method: Option<String>,
    #[serde(default = "default_active")]
    active: bool,
}

/// Reads `id,description,amount_cents,incurred_on,type,distribution_method[,active]`.
/// A blank `type` leaves the expense without a resolvable type.
pub fn import_expenses<R: Read>(reader: R) -> Result<Vec<Expense>, ImportError> {
    let mut expenses = Vec::new();

    for row in csv_reader(reader).deserialize::<ExpenseRow>() {
        let row = row?;
        ensure_non_negative(&row.id, row.amount_cents)?;
        expenses.push(Expense {
            expense_type: expense_type(row.type_name, row.distribution_method),
            id: row.id,
            description: row.description,
            amount_cents: row.amount_cents,
            incurred_on: row.incurred_on,
            active: row.active,
        });
    }

    Ok(expenses)
}

pub fn import_expenses_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Expense>, ImportError> {
    let file = std::fs::File::open(path)?;
    import_expenses(file)
}

#[derive(Debug, Deserialize)]
struct RecurringExpenseRow {
    id: String,
    description: String,
    amount_cents: i64,
    day_of_month: u32,
    starts_on: NaiveDate,
    #[serde(default)]
    ends_on: Option<NaiveDate>,
    #[serde(rename = "type", default, deserialize_with = "empty_string_as_none")]
    type_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    distribution_method: Option<String>,
    #[serde(default = "default_active")]
    active: bool,
}

/// Reads `id,description,amount_cents,day_of_month,starts_on,ends_on,type,distribution_method[,active]`.
pub fn import_recurring_expenses<R: Read>(
    reader: R,
) -> Result<Vec<RecurringExpense>, ImportError> {
    let mut recurring = Vec::new();

    for row in csv_reader(reader).deserialize::<RecurringExpenseRow>() {
        let row = row?;
        ensure_non_negative(&row.id, row.amount_cents)?;
        recurring.push(RecurringExpense {
            expense_type: expense_type(row.type_name, row.distribution_method),
            id: row.id,
            description: row.description,
            amount_cents: row.amount_cents,
            day_of_month: row.day_of_month,
            starts_on: row.starts_on,
            ends_on: row.ends_on,
            active: row.active,
        });
    }

    Ok(recurring)
}

pub fn import_recurring_expenses_from_path<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<RecurringExpense>, ImportError> {
    let file = std::fs::File::open(path)?;
    import_recurring_expenses(file)
}

fn expense_type(type_name: Option<String>, method: Option<String>) -> Option<ExpenseType> {
    type_name.map(|name| ExpenseType {
        id: name.to_ascii_lowercase().replace(' ', "-"),
        distribution_method: method
            .as_deref()
            .map_or(DistributionMethod::Individual, DistributionMethod::from_code),
        name,
    })
}

fn ensure_non_negative(record: &str, amount_cents: i64) -> Result<(), ImportError> {
    if amount_cents < 0 {
        return Err(ImportError::NegativeAmount {
            record: record.to_string(),
            amount_cents,
        });
    }
    Ok(())
}

fn default_active() -> bool {
    true
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

use chrono::{Datelike, NaiveDate, Weekday};

use super::domain::{BillingPeriod, PeriodError};

const GRACE_WINDOW_START: u32 = 6;
const GRACE_WINDOW_END: u32 = 10;

/// Picks the payable date of a due month: the first business day between the
/// 6th and the 10th.
#[derive(Debug, Default, Clone, Copy)]
pub struct DueDateSelector;

impl DueDateSelector {
    pub fn new() -> Self {
        Self
    }

    pub fn select(&self, year: i32, month: u32) -> Result<NaiveDate, PeriodError> {
        BillingPeriod::new(year, month).map(|period| self.select_for(period))
    }

    pub fn select_for(&self, period: BillingPeriod) -> NaiveDate {
        if let Some(date) = first_business_day_in_window(period) {
            return date;
        }

        if let Some(friday) =
            NaiveDate::from_weekday_of_month_opt(period.year(), period.month(), Weekday::Fri, 2)
        {
            if friday.day() <= GRACE_WINDOW_END {
                return friday;
            }
        }

        // Re-scan before settling on a fixed day.
        if let Some(date) = first_business_day_in_window(period) {
            return date;
        }

        period
            .day(GRACE_WINDOW_START)
            .unwrap_or_else(|| period.first_day())
    }
}

fn first_business_day_in_window(period: BillingPeriod) -> Option<NaiveDate> {
    (GRACE_WINDOW_START..=GRACE_WINDOW_END)
        .filter_map(|day| period.day(day))
        .find(|date| is_business_day(*date))
}

fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn december_2024_is_due_on_friday_the_sixth() {
        let selector = DueDateSelector::new();
        assert_eq!(selector.select(2024, 12), Ok(date(2024, 12, 6)));
    }

    #[test]
    fn weekend_sixth_moves_to_monday() {
        let selector = DueDateSelector::new();
        // 2024-07-06 is a Saturday.
        assert_eq!(selector.select(2024, 7), Ok(date(2024, 7, 8)));
        // 2024-10-06 is a Sunday.
        assert_eq!(selector.select(2024, 10), Ok(date(2024, 10, 7)));
    }

    #[test]
    fn invalid_month_is_rejected() {
        let selector = DueDateSelector::new();
        assert_eq!(selector.select(2024, 13), Err(PeriodError::InvalidMonth(13)));
    }

    #[test]
    fn every_month_lands_on_a_weekday_between_sixth_and_tenth() {
        let selector = DueDateSelector::new();
        for year in [1999, 2023, 2024, 2025, 2100] {
            for month in 1..=12 {
                let due = selector.select(year, month).expect("valid period");
                assert_eq!((due.year(), due.month()), (year, month));
                assert!((GRACE_WINDOW_START..=GRACE_WINDOW_END).contains(&due.day()));
                assert!(is_business_day(due), "{due} falls on a weekend");
            }
        }
    }
}

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use super::clock::Clock;
use super::domain::BillingPeriod;
use super::repository::{RepositoryError, SlipRepository};

/// Day of the expense month from which first-time generation opens.
const FIRST_GENERATION_DAY: i64 = 25;
/// Last day of the due month (inclusive) on which slips may still be generated
/// or recreated without an override.
const LAST_RECREATION_DAY: i64 = 5;

/// Rejections raised by the generation time windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GenerationPolicyError {
    #[error("slips for {period} cannot be generated before {opens_on}")]
    GenerationNotAllowedYet {
        period: BillingPeriod,
        opens_on: NaiveDate,
    },
    #[error("slips due in {due_period} can no longer be recreated after {closed_after}")]
    RecreationExpired {
        due_period: BillingPeriod,
        closed_after: NaiveDate,
    },
    #[error("the generation window for {period} has passed; confirm to generate anyway")]
    PastMonthGenerationRequiresConfirmation {
        period: BillingPeriod,
        closed_after: NaiveDate,
    },
}

impl GenerationPolicyError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::GenerationNotAllowedYet { .. } => "generation_not_allowed_yet",
            Self::RecreationExpired { .. } => "recreation_expired",
            Self::PastMonthGenerationRequiresConfirmation { .. } => {
                "past_month_generation_requires_confirmation"
            }
        }
    }
}

/// The opening and closing instants for one expense period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationWindow {
    pub period: BillingPeriod,
    pub due_period: BillingPeriod,
    /// First instant at which first-time generation is accepted.
    pub opens_at: NaiveDateTime,
    /// Last whole second (day 5, 23:59:59 of the due month) at which generation
    /// and recreation are accepted; any later instant is refused.
    pub closes_at: NaiveDateTime,
}

impl GenerationWindow {
    pub fn for_period(period: BillingPeriod) -> Self {
        let due_period = period.next();
        let opens_at = (period.first_day() + Duration::days(FIRST_GENERATION_DAY - 1))
            .and_time(NaiveTime::MIN);
        let closes_at = (due_period.first_day() + Duration::days(LAST_RECREATION_DAY))
            .and_time(NaiveTime::MIN)
            - Duration::seconds(1);

        Self {
            period,
            due_period,
            opens_at,
            closes_at,
        }
    }

    fn last_open_day(&self) -> NaiveDate {
        self.closes_at.date()
    }

    /// Decides an unforced request at `now`, given whether slips already exist for
    /// the due month.
    pub fn evaluate(
        &self,
        now: NaiveDateTime,
        slips_exist: bool,
    ) -> Result<(), GenerationPolicyError> {
        if slips_exist {
            if now > self.closes_at {
                return Err(GenerationPolicyError::RecreationExpired {
                    due_period: self.due_period,
                    closed_after: self.last_open_day(),
                });
            }
            return Ok(());
        }

        if now < self.opens_at {
            return Err(GenerationPolicyError::GenerationNotAllowedYet {
                period: self.period,
                opens_on: self.opens_at.date(),
            });
        }

        if now > self.closes_at {
            return Err(GenerationPolicyError::PastMonthGenerationRequiresConfirmation {
                period: self.period,
                closed_after: self.last_open_day(),
            });
        }

        Ok(())
    }
}

/// Gatekeeper deciding whether slips may be (re)generated for an expense period.
pub struct SlipGenerationPolicy {
    slips: Arc<dyn SlipRepository>,
    clock: Arc<dyn Clock>,
}

impl SlipGenerationPolicy {
    pub fn new(slips: Arc<dyn SlipRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { slips, clock }
    }

    /// `forced` bypasses every window and skips the existence lookup.
    pub fn check(&self, period: BillingPeriod, forced: bool) -> Result<(), PolicyCheckError> {
        if forced {
            debug!(%period, "forced generation bypasses policy windows");
            return Ok(());
        }

        let window = GenerationWindow::for_period(period);
        let slips_exist = self.slips.exists_for_due_date_month(window.due_period)?;
        window.evaluate(self.clock.now(), slips_exist)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyCheckError {
    #[error(transparent)]
    Rejected(#[from] GenerationPolicyError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

use super::domain::ResidentUnit;

/// Computes one resident's share of the equal and fraction buckets, in cents.
///
/// The individual bucket is aggregated upstream but never assigned here.
#[derive(Debug, Default, Clone, Copy)]
pub struct PerResidentAmountCalculator;

impl PerResidentAmountCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate(
        &self,
        resident: &ResidentUnit,
        equal_total: i64,
        fraction_total: i64,
        paying_resident_count: usize,
    ) -> i64 {
        self.equal_share(equal_total, paying_resident_count)
            + self.fraction_share(fraction_total, resident.ideal_fraction)
    }

    /// Zero residents yields a zero share rather than a division error.
    pub fn equal_share(&self, equal_total: i64, paying_resident_count: usize) -> i64 {
        if paying_resident_count == 0 || equal_total <= 0 {
            return 0;
        }

        // f64::round rounds half away from zero.
        (equal_total as f64 / paying_resident_count as f64).round() as i64
    }

    pub fn fraction_share(&self, fraction_total: i64, ideal_fraction: f64) -> i64 {
        if ideal_fraction <= 0.0 || fraction_total <= 0 {
            return 0;
        }

        (fraction_total as f64 * ideal_fraction).round() as i64
    }
}

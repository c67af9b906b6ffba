//! Funnel counts and revenue
//!
//! Each counter is its own predicate over the set. Counts are not derived
//! from each other, so a later stage may exceed an earlier one.

use leadflow_model::{AppointmentStatus, Prospect, SalesOutcome};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Four-stage funnel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Funnel {
    /// Every prospect
    pub prospects: usize,
    /// Appointment scheduled or rescheduled
    pub appointments: usize,
    /// Appointment completed
    pub sales_meetings: usize,
    /// Closed successfully
    pub sales: usize,
}

impl Funnel {
    /// Count every stage over `prospects`
    #[must_use]
    pub fn compute(prospects: &[Prospect]) -> Self {
        let mut funnel = Self {
            prospects: prospects.len(),
            ..Self::default()
        };
        for p in prospects {
            let status = p.appointment_status();
            if matches!(
                status,
                AppointmentStatus::Scheduled | AppointmentStatus::Rescheduled
            ) {
                funnel.appointments += 1;
            }
            if status == AppointmentStatus::Completed {
                funnel.sales_meetings += 1;
            }
            if p.sales_outcome() == Some(SalesOutcome::Successful) {
                funnel.sales += 1;
            }
        }
        funnel
    }
}

/// Outcome tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    /// Successful outcomes
    pub successful: usize,
    /// Unsuccessful outcomes
    pub unsuccessful: usize,
    /// Keep-in-view outcomes
    pub kiv: usize,
    /// No outcome yet
    pub undecided: usize,
}

impl OutcomeCounts {
    /// Tally outcomes over `prospects`
    #[must_use]
    pub fn compute(prospects: &[Prospect]) -> Self {
        prospects
            .iter()
            .fold(Self::default(), |mut acc, p| {
                match p.sales_outcome() {
                    Some(SalesOutcome::Successful) => acc.successful += 1,
                    Some(SalesOutcome::Unsuccessful) => acc.unsuccessful += 1,
                    Some(SalesOutcome::Kiv) => acc.kiv += 1,
                    None => acc.undecided += 1,
                }
                acc
            })
    }

    /// `successful / (successful + unsuccessful) * 100`, or 0 with nothing decided
    #[must_use]
    pub fn conversion_rate(&self) -> f64 {
        let decided = self.successful + self.unsuccessful;
        if decided == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.successful as f64 / decided as f64 * 100.0;
        rate
    }
}

/// Conversion rate of `prospects`; KIV and undecided records are ignored
#[must_use]
pub fn conversion_rate(prospects: &[Prospect]) -> f64 {
    OutcomeCounts::compute(prospects).conversion_rate()
}

/// Revenue from successful outcomes only
#[must_use]
pub fn closed_fyc(prospects: &[Prospect]) -> Decimal {
    prospects
        .iter()
        .filter(|p| p.sales_outcome() == Some(SalesOutcome::Successful))
        .map(|p| p.products.total())
        .sum()
}

/// Value of every product line regardless of outcome
#[must_use]
pub fn proposed_fyc(prospects: &[Prospect]) -> Decimal {
    prospects.iter().map(|p| p.products.total()).sum()
}

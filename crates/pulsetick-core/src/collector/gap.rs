//! Overnight gap fold.
//!
//! The gap for a trading day is its open minus the previous trading day's
//! close. The previous close is carried through the fold; nothing here
//! touches storage.

use chrono::DateTime;
use chrono_tz::Tz;

/// One trading day with whatever open and close survived screening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceDay {
    pub timestamp: DateTime<Tz>,
    pub open: Option<f64>,
    pub close: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OvernightGap {
    pub timestamp: DateTime<Tz>,
    pub previous_close: f64,
    pub open: f64,
    pub points: f64,
    /// `None` when the previous close is exactly zero.
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GapStep {
    /// No earlier close to compare against; the day only seeds the carry.
    Seed { timestamp: DateTime<Tz> },
    Gap(OvernightGap),
    /// A previous close exists but today's open is unusable.
    MissingOpen { timestamp: DateTime<Tz> },
}

/// Compute one step per day, in input order.
///
/// A usable close replaces the carried close even when the open was
/// unusable; a day without a usable close leaves the carry untouched.
pub fn overnight_gaps(days: &[PriceDay]) -> Vec<GapStep> {
    days.iter()
        .scan(None::<f64>, |previous_close, day| {
            let step = match (*previous_close, day.open) {
                (None, _) => GapStep::Seed {
                    timestamp: day.timestamp,
                },
                (Some(previous_close), Some(open)) => {
                    GapStep::Gap(gap(day.timestamp, previous_close, open))
                }
                (Some(_), None) => GapStep::MissingOpen {
                    timestamp: day.timestamp,
                },
            };
            if let Some(close) = day.close {
                *previous_close = Some(close);
            }
            Some(step)
        })
        .collect()
}

fn gap(timestamp: DateTime<Tz>, previous_close: f64, open: f64) -> OvernightGap {
    let points = open - previous_close;
    let percent = (previous_close != 0.0).then(|| points / previous_close * 100.0);
    OvernightGap {
        timestamp,
        previous_close,
        open,
        points,
        percent,
    }
}

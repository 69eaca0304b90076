//! Window planner.
//!
//! Pending trajectory timestamps are grouped into calendar-aligned periods
//! so the local met cache only ever holds one window's worth of files.
//! Periods are anchored at Monday 00:00 UTC, independent of which
//! timestamps actually exist, so the same grid always produces the same
//! windows.

use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::info;

/// Grouping parameters (empirical constants from the original campaign,
/// kept configurable).
#[derive(Debug, Clone, Copy)]
pub struct WindowParams {
    /// Period length in days.
    pub period_days: u32,
    /// Selection buffer on each period edge, hours.
    pub edge_buffer_hours: i64,
    /// Met span buffer as a multiple of |runtime|.
    pub met_buffer_factor: i64,
    /// Trajectory run length in hours; negative means backward.
    pub runtime_hours: i64,
}

/// One batch of work: a calendar period, the pending timestamps it owns,
/// and the met-file time span that covers all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowPlan {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub selected: Vec<DateTime<Utc>>,
    /// Inclusive span of met-file valid times this window requires.
    pub met_span: (DateTime<Utc>, DateTime<Utc>),
}

/// Floor a timestamp to the Monday 00:00 UTC of its week.
fn week_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    let days_back = ts.weekday().num_days_from_monday() as i64;
    (ts - Duration::days(days_back))
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
}

/// Group pending timestamps into window plans.
///
/// `pending` must be ascending; empty periods are dropped. Selection uses
/// `[period_start - edge_buffer, period_end + edge_buffer)`, so a timestamp
/// near a boundary may appear in two adjacent plans; ledger updates make the
/// second occurrence a no-op.
pub fn plan_windows(pending: &[DateTime<Utc>], params: &WindowParams) -> Vec<WindowPlan> {
    let (Some(&first), Some(&last)) = (pending.first(), pending.last()) else {
        return Vec::new();
    };

    let period_len = Duration::days(i64::from(params.period_days));
    let edge = Duration::hours(params.edge_buffer_hours);
    let met_buffer = Duration::hours(params.met_buffer_factor * params.runtime_hours.abs());

    let mut plans = Vec::new();
    let mut period_start = week_start(first);

    while period_start <= last {
        let period_end = period_start + period_len;
        let select_from = period_start - edge;
        let select_to = period_end + edge;

        let selected: Vec<DateTime<Utc>> = pending
            .iter()
            .copied()
            .filter(|ts| *ts >= select_from && *ts < select_to)
            .collect();

        if let (Some(&lo), Some(&hi)) = (selected.first(), selected.last()) {
            plans.push(WindowPlan {
                period_start,
                period_end,
                selected,
                met_span: (lo - met_buffer, hi + met_buffer),
            });
        } else {
            info!(%period_start, %period_end, "period has no pending trajectories; skipped");
        }

        period_start = period_end;
    }

    plans
}

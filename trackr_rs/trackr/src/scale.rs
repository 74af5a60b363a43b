//! Scales mapping dates and elapsed seconds onto panel pixels, plus axis ticks.

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::short_mark;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearScale {
    pub domain: [f64; 2],
    pub range: [f64; 2],
}

impl LinearScale {
    pub fn new(range: [f64; 2]) -> Self {
        Self {
            domain: [0.0, 1.0],
            range,
        }
    }

    /// A collapsed domain maps everything onto the start of the range.
    pub fn apply(&self, value: f64) -> f64 {
        let [d0, d1] = self.domain;
        let [r0, r1] = self.range;
        let span = d1 - d0;
        let t = if span == 0.0 { 0.0 } else { (value - d0) / span };
        r0 + (r1 - r0) * t
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        linear_ticks(self.domain, count)
    }
}

/// Step size from the 1-2-5 ladder giving roughly `count` ticks over `span`.
pub fn nice_step(span: f64, count: usize) -> f64 {
    if !(span > 0.0) || count == 0 {
        return 0.0;
    }
    let raw = span / count as f64;
    let power = 10f64.powf(raw.log10().floor());
    let err = raw / power;
    let factor = if err >= 50f64.sqrt() {
        10.0
    } else if err >= 10f64.sqrt() {
        5.0
    } else if err >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    factor * power
}

pub fn linear_ticks(domain: [f64; 2], count: usize) -> Vec<f64> {
    let lo = domain[0].min(domain[1]);
    let hi = domain[0].max(domain[1]);
    if !lo.is_finite() || !hi.is_finite() {
        return Vec::new();
    }
    if lo == hi {
        return vec![lo];
    }
    let step = nice_step(hi - lo, count);
    if step <= 0.0 {
        return Vec::new();
    }
    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

/// Calendar days since 0001-01-01, the numeric form dates take inside a scale.
pub fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

pub fn date_from_day_number(day: f64) -> Option<NaiveDate> {
    if !day.is_finite() {
        return None;
    }
    NaiveDate::from_num_days_from_ce_opt(day.round() as i32)
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeScale {
    inner: LinearScale,
}

impl TimeScale {
    pub fn new(range: [f64; 2]) -> Self {
        Self {
            inner: LinearScale::new(range),
        }
    }

    pub fn set_domain(&mut self, start: NaiveDate, end: NaiveDate) {
        self.inner.domain = [day_number(start), day_number(end)];
    }

    pub fn domain_days(&self) -> [f64; 2] {
        self.inner.domain
    }

    pub fn apply(&self, date: NaiveDate) -> f64 {
        self.inner.apply(day_number(date))
    }

    pub fn as_linear(&self) -> &LinearScale {
        &self.inner
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TickInterval {
    Days(i64),
    Weeks(i64),
    Months(u32),
    Years(i32),
}

impl TickInterval {
    fn approx_days(self) -> f64 {
        match self {
            TickInterval::Days(n) => n as f64,
            TickInterval::Weeks(n) => 7.0 * n as f64,
            TickInterval::Months(n) => 30.44 * n as f64,
            TickInterval::Years(n) => 365.25 * n as f64,
        }
    }
}

const TICK_INTERVALS: [TickInterval; 13] = [
    TickInterval::Days(1),
    TickInterval::Days(2),
    TickInterval::Weeks(1),
    TickInterval::Weeks(2),
    TickInterval::Months(1),
    TickInterval::Months(3),
    TickInterval::Months(6),
    TickInterval::Years(1),
    TickInterval::Years(2),
    TickInterval::Years(5),
    TickInterval::Years(10),
    TickInterval::Years(25),
    TickInterval::Years(50),
];

fn pick_interval(span_days: f64, count: usize) -> TickInterval {
    let target = span_days / count.max(1) as f64;
    TICK_INTERVALS
        .iter()
        .copied()
        .find(|i| i.approx_days() >= target)
        .unwrap_or(TickInterval::Years(100))
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Calendar-aligned ticks between two dates: days, Sunday-aligned weeks, month
/// and year boundaries.
pub fn time_ticks(start: NaiveDate, end: NaiveDate, count: usize) -> Vec<(NaiveDate, String)> {
    let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
    let span = (hi - lo).num_days() as f64;
    if span == 0.0 {
        return vec![(lo, lo.format("%b %d").to_string())];
    }
    let interval = pick_interval(span, count);
    let mut out = Vec::new();
    match interval {
        TickInterval::Days(n) | TickInterval::Weeks(n) => {
            let step = if let TickInterval::Weeks(_) = interval { 7 * n } else { n };
            let mut day = lo;
            if let TickInterval::Weeks(_) = interval {
                let back = day.weekday().num_days_from_sunday() as i64;
                if back > 0 {
                    day = day + ChronoDuration::days(7 - back);
                }
            }
            while day <= hi {
                let label = if day.day() == 1 && day.month() == 1 {
                    day.format("%Y").to_string()
                } else {
                    day.format("%b %d").to_string()
                };
                out.push((day, label));
                day = day + ChronoDuration::days(step);
            }
        }
        TickInterval::Months(n) => {
            let mut year = lo.year();
            let mut month = lo.month();
            while let Some(day) = first_of_month(year, month) {
                if day > hi {
                    break;
                }
                if day >= lo && (month - 1) % n == 0 {
                    let label = if month == 1 {
                        day.format("%Y").to_string()
                    } else {
                        day.format("%b").to_string()
                    };
                    out.push((day, label));
                }
                month += 1;
                if month > 12 {
                    month = 1;
                    year += 1;
                }
            }
        }
        TickInterval::Years(n) => {
            let mut year = lo.year();
            while let Some(day) = first_of_month(year, 1) {
                if day > hi {
                    break;
                }
                if day >= lo && year.rem_euclid(n) == 0 {
                    out.push((day, day.format("%Y").to_string()));
                }
                year += 1;
            }
        }
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisOrientation {
    Bottom,
    Left,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Pixel offset along the axis, relative to the plot origin.
    pub position: f64,
    pub label: String,
}

/// Ticks for the bottom date axis given the (possibly mid-transition) day domain.
pub fn date_axis_ticks(domain_days: [f64; 2], range: [f64; 2], count: usize) -> Vec<Tick> {
    let (Some(start), Some(end)) = (
        date_from_day_number(domain_days[0]),
        date_from_day_number(domain_days[1]),
    ) else {
        return Vec::new();
    };
    let scale = LinearScale {
        domain: domain_days,
        range,
    };
    time_ticks(start, end, count)
        .into_iter()
        .map(|(day, label)| Tick {
            position: scale.apply(day_number(day)),
            label,
        })
        .collect()
}

/// Ticks for the left seconds axis, labelled `M:SS`.
pub fn seconds_axis_ticks(domain: [f64; 2], range: [f64; 2], count: usize) -> Vec<Tick> {
    let scale = LinearScale { domain, range };
    linear_ticks(domain, count)
        .into_iter()
        .map(|v| Tick {
            position: scale.apply(v),
            label: short_mark(v),
        })
        .collect()
}

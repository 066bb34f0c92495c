use crate::models::{DailyChartRow, DailyReading, Line, MachineComparisonRow, WeeklyReading};
use chrono::{Datelike, NaiveDate};
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

pub const TRAILING_DAYS: usize = 7;
pub const DAILY_HISTORY_ROWS: usize = 10;
pub const WEEKLY_HISTORY_ROWS: usize = 5;

const MONTHS_ES: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sept", "oct", "nov", "dic",
];

/// Short Spanish label used on the chart axis, e.g. `5 ene`.
pub fn short_label(date: NaiveDate) -> String {
    format!("{} {}", date.day(), MONTHS_ES[date.month0() as usize])
}

/// Per-day water and total-oil sums split by line, for the most recent
/// [`TRAILING_DAYS`] distinct dates, oldest first.
pub fn daily_trailing_window(readings: &[DailyReading]) -> Vec<DailyChartRow> {
    let mut buckets: BTreeMap<NaiveDate, DailyChartRow> = BTreeMap::new();

    for reading in readings {
        let row = buckets.entry(reading.date).or_insert_with(|| DailyChartRow {
            name: short_label(reading.date),
            date: reading.date,
            water_line1: 0.0,
            water_line2: 0.0,
            oil_line1: 0.0,
            oil_line2: 0.0,
        });
        match reading.line {
            Line::One => {
                row.water_line1 += reading.water_consumption;
                row.oil_line1 += reading.oil_consumption_total;
            }
            Line::Two => {
                row.water_line2 += reading.water_consumption;
                row.oil_line2 += reading.oil_consumption_total;
            }
        }
    }

    let skip = buckets.len().saturating_sub(TRAILING_DAYS);
    buckets.into_values().skip(skip).collect()
}

// Later week wins; equal weeks fall back to the later `createdAt`, then the larger id.
fn newer(a: &WeeklyReading, b: &WeeklyReading) -> Ordering {
    a.week_start_date
        .cmp(&b.week_start_date)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn latest_for_line(readings: &[WeeklyReading], line: Line) -> Option<&WeeklyReading> {
    readings
        .iter()
        .filter(|reading| reading.line == line)
        .max_by(|a, b| newer(a, b))
}

/// Compares the latest weekly reading of each line machine by machine.
/// Machines missing from one line's reading show 0 for that line.
pub fn weekly_latest_comparison(readings: &[WeeklyReading]) -> Vec<MachineComparisonRow> {
    let mut rows: BTreeMap<u32, MachineComparisonRow> = BTreeMap::new();

    for line in Line::ALL {
        let Some(latest) = latest_for_line(readings, line) else {
            continue;
        };
        for machine in &latest.readings {
            let row = rows
                .entry(machine.machine_id)
                .or_insert_with(|| MachineComparisonRow {
                    machine_id: machine.machine_id,
                    consumption_line1: 0.0,
                    consumption_line2: 0.0,
                });
            match line {
                Line::One => row.consumption_line1 = machine.consumption,
                Line::Two => row.consumption_line2 = machine.consumption,
            }
        }
    }

    rows.into_values().collect()
}

/// Newest-first daily readings of one line.
pub fn daily_history(readings: &[DailyReading], line: Line, limit: usize) -> Vec<DailyReading> {
    let mut rows: Vec<DailyReading> = readings
        .iter()
        .filter(|reading| reading.line == line)
        .cloned()
        .collect();
    rows.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    rows.truncate(limit);
    rows
}

/// Newest-first weekly readings of one line.
pub fn weekly_history(readings: &[WeeklyReading], line: Line, limit: usize) -> Vec<WeeklyReading> {
    let mut rows: Vec<WeeklyReading> = readings
        .iter()
        .filter(|reading| reading.line == line)
        .cloned()
        .collect();
    rows.sort_by(|a, b| newer(b, a));
    rows.truncate(limit);
    rows
}

/// Caches one derived value, recomputing only when the input snapshot
/// is a different allocation from the last one seen.
pub struct Memo<I, O> {
    cached: Mutex<Option<(Arc<Vec<I>>, Arc<O>)>>,
}

impl<I, O> Default for Memo<I, O> {
    fn default() -> Self {
        Self {
            cached: Mutex::new(None),
        }
    }
}

impl<I, O> Memo<I, O> {
    pub fn get(&self, input: &Arc<Vec<I>>, compute: impl FnOnce(&[I]) -> O) -> Arc<O> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((seen, output)) = cached.as_ref() {
            if Arc::ptr_eq(seen, input) {
                return Arc::clone(output);
            }
        }
        let output = Arc::new(compute(input.as_slice()));
        *cached = Some((Arc::clone(input), Arc::clone(&output)));
        output
    }
}

/// Memoized chart series for the dashboard.
#[derive(Default)]
pub struct ViewModels {
    daily: Memo<DailyReading, Vec<DailyChartRow>>,
    weekly: Memo<WeeklyReading, Vec<MachineComparisonRow>>,
}

impl ViewModels {
    pub fn daily_chart(&self, readings: &Arc<Vec<DailyReading>>) -> Arc<Vec<DailyChartRow>> {
        self.daily.get(readings, daily_trailing_window)
    }

    pub fn weekly_chart(
        &self,
        readings: &Arc<Vec<WeeklyReading>>,
    ) -> Arc<Vec<MachineComparisonRow>> {
        self.weekly.get(readings, weekly_latest_comparison)
    }
}

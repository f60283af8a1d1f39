// src/analysis/aligner.rs
// Turns raw statement tables into chronologically ordered numbers.

use crate::statements::models::{FinancialStatement, Metric};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// What to do with an empty or non-numeric cell.
///
/// Both policies are needed: the ROIC/IGR path zero-fills, while valuation
/// and the trend screens must not invent observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionMode {
    /// Empty or unparseable cells become `0.0`.
    DefaultToZero,
    /// Empty or unparseable cells are left out.
    DropAbsent,
}

/// Parses a period label or price date.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` (optionally with a UTC offset,
/// which is normalized to UTC), RFC 3339 and a bare `YYYY` (1 January).
pub fn parse_period(label: &str) -> Option<NaiveDate> {
    let s = label.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc).date_naive());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse::<i32>().ok().and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1));
    }
    None
}

/// Parses a numeric cell; `None` for blanks, text and NaN/inf.
pub fn parse_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Fiscal year -> metric -> value, ascending by year.
#[derive(Debug, Clone, Default)]
pub struct YearMap {
    years: BTreeMap<i32, BTreeMap<Metric, f64>>,
    metrics: BTreeSet<Metric>,
}

impl YearMap {
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Years carrying at least one parseable period column, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.years.keys().copied().collect()
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.years.keys().next_back().copied()
    }

    pub fn get(&self, year: i32, metric: &Metric) -> Option<f64> {
        self.years.get(&year).and_then(|m| m.get(metric)).copied()
    }

    /// Whether the source statement had a row for `metric` at all.
    pub fn has_metric(&self, metric: &Metric) -> bool {
        self.metrics.contains(metric)
    }

    /// Observed values of `metric`, ascending by year.
    pub fn series(&self, metric: &Metric) -> Vec<(i32, f64)> {
        self.years
            .iter()
            .filter_map(|(year, values)| values.get(metric).map(|v| (*year, *v)))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[(i32, Metric, f64)]) -> Self {
        let mut map = YearMap::default();
        for (year, metric, value) in rows {
            map.metrics.insert(metric.clone());
            map.years.entry(*year).or_default().insert(metric.clone(), *value);
        }
        map
    }
}

/// Parsed period columns in chronological order, as (column index, date).
/// Unparseable labels are skipped; equal dates keep file order.
fn ordered_columns(statement: &FinancialStatement) -> Vec<(usize, NaiveDate)> {
    let mut columns: Vec<(usize, NaiveDate)> = statement
        .periods
        .iter()
        .enumerate()
        .filter_map(|(idx, label)| match parse_period(label) {
            Some(date) => Some((idx, date)),
            None => {
                tracing::trace!("Skipping unparseable period label '{}'", label);
                None
            }
        })
        .collect();
    columns.sort_by_key(|(_, date)| *date);
    columns
}

/// Builds the year-keyed table for a statement.
///
/// Columns are visited oldest first, so when two columns share a fiscal year
/// the more recent one wins.
pub fn align(statement: &FinancialStatement, mode: ReductionMode) -> YearMap {
    let columns = ordered_columns(statement);
    let mut map = YearMap::default();

    for (_, date) in &columns {
        map.years.entry(date.year()).or_default();
    }

    for row in &statement.rows {
        map.metrics.insert(row.metric.clone());
        for (idx, date) in &columns {
            let raw = row.values.get(*idx).map(String::as_str).unwrap_or("");
            let value = match (parse_value(raw), mode) {
                (Some(v), _) => v,
                (None, ReductionMode::DefaultToZero) => 0.0,
                (None, ReductionMode::DropAbsent) => continue,
            };
            map.years
                .entry(date.year())
                .or_default()
                .insert(row.metric.clone(), value);
        }
    }

    map
}

/// Dated observations of one metric, ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendSeries {
    points: Vec<(NaiveDate, f64)>,
}

impl TrendSeries {
    pub fn new(mut points: Vec<(NaiveDate, f64)>) -> Self {
        points.sort_by_key(|(date, _)| *date);
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn latest(&self) -> Option<(NaiveDate, f64)> {
        self.points.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(NaiveDate, f64)> {
        self.points.iter()
    }

    /// Distinct fiscal years present, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.points.iter().map(|(d, _)| d.year()).collect();
        years.dedup();
        years
    }
}

/// Dated series of `metric` with absent cells dropped.
/// `None` when the statement has no such row.
pub fn trend(statement: &FinancialStatement, metric: &Metric) -> Option<TrendSeries> {
    let row = statement.row(metric)?;
    let points = ordered_columns(statement)
        .into_iter()
        .filter_map(|(idx, date)| {
            row.values
                .get(idx)
                .and_then(|raw| parse_value(raw))
                .map(|v| (date, v))
        })
        .collect();
    Some(TrendSeries::new(points))
}

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::{Measure, ReportFilter};
use crate::store::CanonicalSnapshot;

pub const ISO_WEEK_FORMAT: &str = "%G-W%V";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyOvertimeRow {
    pub employee_id: String,
    /// Every week column of the pivot, zero when the employee had no
    /// overtime that week.
    pub weeks: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummaryReport {
    pub overtime_weekly_summary: Vec<WeeklyOvertimeRow>,
    pub columns: Vec<String>,
}

/// Employees by ISO week, each cell counting that employee's overtime days.
pub fn overtime_weekly_summary(snap: &CanonicalSnapshot, filter: &ReportFilter) -> WeeklySummaryReport {
    let measure = Measure::of(snap);
    let rows = measure.overtime_only(filter.apply(snap));

    let mut counts: BTreeMap<&str, BTreeMap<String, u32>> = BTreeMap::new();
    let mut weeks = BTreeSet::new();
    for row in &rows {
        let (Some(emp), Some(date)) = (row.employee_id(), row.date) else {
            continue;
        };
        let week = date.format(ISO_WEEK_FORMAT).to_string();
        weeks.insert(week.clone());
        *counts.entry(emp).or_default().entry(week).or_insert(0) += 1;
    }

    let overtime_weekly_summary = counts
        .into_iter()
        .map(|(emp, seen)| WeeklyOvertimeRow {
            employee_id: emp.to_string(),
            weeks: weeks
                .iter()
                .map(|w| (w.clone(), seen.get(w).copied().unwrap_or(0)))
                .collect(),
        })
        .collect();

    let columns = std::iter::once("employee_id".to_string())
        .chain(weeks)
        .collect();
    WeeklySummaryReport {
        overtime_weekly_summary,
        columns,
    }
}

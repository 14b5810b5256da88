//! Read-only report queries over the canonical snapshot. Every function is
//! pure: snapshot and filter in, serializable response out.

pub mod attendance;
pub mod overtime;
pub mod weekly;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    process::date_parser::parse_date,
    store::{AttendanceRecord, CanonicalSnapshot},
};

pub use attendance::{all_attendance, attendance, AttendanceEntry, AttendanceReport};
pub use overtime::{
    department_overtime, department_overtime_comparison, employee_overtime_comparison,
    overtime_exceptions, overtime_month_comparison, overtime_summary, overtime_trends,
    top_overtime_employees, Granularity,
};
pub use weekly::{overtime_weekly_summary, WeeklySummaryReport};

pub const DEFAULT_TOP_N: usize = 10;

/// Optional filters, combined with AND. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    pub employee_id: Option<String>,
    pub employee_ids: Vec<String>,
    pub department: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Query-string form of the report parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub employee_id: Option<String>,
    /// Comma separated.
    pub employee_ids: Option<String>,
    pub department: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub granularity: Option<String>,
    pub top_n: Option<usize>,
    pub threshold_hours: Option<f64>,
}

fn parse_bound(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .with_context(|| format!("{name} must be YYYY-MM-DD, got `{v}`")),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ReportQuery {
    pub fn filter(&self) -> Result<ReportFilter> {
        Ok(ReportFilter {
            employee_id: non_empty(self.employee_id.clone()),
            employee_ids: self
                .employee_ids
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            department: non_empty(self.department.clone()),
            start_date: parse_bound("start_date", self.start_date.as_deref())?,
            end_date: parse_bound("end_date", self.end_date.as_deref())?,
        })
    }
}

/// One canonical record with its date and overtime already interpreted.
#[derive(Debug, Clone)]
pub(crate) struct Row<'a> {
    pub rec: &'a AttendanceRecord,
    pub date: Option<NaiveDate>,
    pub overtime: f64,
}

impl<'a> Row<'a> {
    fn new(rec: &'a AttendanceRecord) -> Self {
        Row {
            rec,
            date: rec.date.as_deref().and_then(|d| parse_date(d).as_date()),
            overtime: rec
                .total_ot
                .as_deref()
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(0.0),
        }
    }

    pub fn employee_id(&self) -> Option<&'a str> {
        self.rec.employee_id.as_deref()
    }

    pub fn department(&self) -> Option<&'a str> {
        self.rec.department.as_deref()
    }
}

impl ReportFilter {
    fn matches(&self, snap: &CanonicalSnapshot, row: &Row<'_>) -> bool {
        if let Some(id) = &self.employee_id {
            if row.employee_id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.employee_ids.is_empty()
            && !row
                .employee_id()
                .map_or(false, |id| self.employee_ids.iter().any(|e| e == id))
        {
            return false;
        }
        if let Some(dept) = &self.department {
            if snap.has_column("department")
                && !row
                    .department()
                    .map_or(false, |d| d.to_lowercase() == dept.to_lowercase())
            {
                return false;
            }
        }
        if self.start_date.is_some() || self.end_date.is_some() {
            let Some(date) = row.date else {
                return false;
            };
            if self.start_date.map_or(false, |s| date < s) || self.end_date.map_or(false, |e| date > e) {
                return false;
            }
        }
        true
    }

    /// Rows of `snap` passing every filter, in artifact order.
    pub(crate) fn apply<'a>(&self, snap: &'a CanonicalSnapshot) -> Vec<Row<'a>> {
        snap.records
            .iter()
            .map(Row::new)
            .filter(|row| self.matches(snap, row))
            .collect()
    }
}

/// How overtime is measured for a snapshot: summed hours when the artifact
/// has `total_ot`, otherwise a row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Measure {
    Hours,
    Count,
}

impl Measure {
    pub fn of(snap: &CanonicalSnapshot) -> Self {
        if snap.has_column("total_ot") {
            Measure::Hours
        } else {
            Measure::Count
        }
    }

    fn value(self, row: &Row<'_>) -> f64 {
        match self {
            Measure::Hours => row.overtime,
            Measure::Count => 1.0,
        }
    }

    /// Keep only overtime rows when overtime is measurable.
    pub fn overtime_only<'a>(self, rows: Vec<Row<'a>>) -> Vec<Row<'a>> {
        match self {
            Measure::Hours => rows.into_iter().filter(|r| r.overtime > 0.0).collect(),
            Measure::Count => rows,
        }
    }

    /// Total per group key. Rows whose key is missing are left out.
    pub fn total_by<'a, K, F>(self, rows: &[Row<'a>], key: F) -> BTreeMap<K, f64>
    where
        K: Ord,
        F: Fn(&Row<'a>) -> Option<K>,
    {
        let mut totals = BTreeMap::new();
        for row in rows {
            if let Some(k) = key(row) {
                *totals.entry(k).or_insert(0.0) += self.value(row);
            }
        }
        totals
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportInfo {
    pub name: &'static str,
    pub path: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportCatalog {
    pub reports: Vec<ReportInfo>,
}

pub fn list_reports() -> ReportCatalog {
    let reports = [
        ("Employee Attendance Report", "/reports/attendance"),
        ("All Employee Attendance Report", "/reports/attendance/all"),
        ("Employee Overtime Summary", "/reports/overtime-summary"),
        ("Department Overtime Summary", "/reports/department-overtime"),
        ("Overtime Trends Over Time", "/reports/overtime-trends"),
        ("Top Overtime Employees", "/reports/top-overtime-employees"),
        ("Overtime Exception Report", "/reports/overtime-exceptions"),
        ("Department Overtime Comparison", "/reports/overtime-department-comparison"),
        ("Employee Overtime Comparison", "/reports/overtime-employee-comparison"),
        ("Monthly Overtime Comparison", "/reports/overtime-month-comparison"),
        ("Employee Overtime Days Per Week", "/reports/overtime-weekly-summary"),
    ];
    ReportCatalog {
        reports: reports
            .into_iter()
            .map(|(name, path)| ReportInfo { name, path })
            .collect(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use std::io::Cursor;

    pub fn snapshot() -> CanonicalSnapshot {
        let csv = "employee_date_id,employee_id,date,department,day_type,exception,total_ot\n\
                   A1_2025-06-30,A1,2025-06-30,Engineering,Working Day,,2\n\
                   A1_2025-07-01,A1,2025-07-01,Engineering,Working Day,Lateness,1.5\n\
                   A1_2025-07-08,A1,2025-07-08,Engineering,Working Day,,0\n\
                   A2_2025-07-01,A2,2025-07-01,engineering,Working Day,,3\n\
                   A3_2025-07-02,A3,2025-07-02,Sales,Holiday,,4\n\
                   A4_2025-07-02,A4,2025-07-02,Engineering,Working Day,,\n\
                   A5_bad,A5,bad,Sales,Working Day,,6\n";
        CanonicalSnapshot::from_reader(Cursor::new(csv)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn query_parses_into_filter() -> Result<()> {
        let q = ReportQuery {
            employee_ids: Some("A1, A2,,".into()),
            department: Some("  ".into()),
            start_date: Some("2025-07-01".into()),
            ..Default::default()
        };
        let f = q.filter()?;
        assert_eq!(f.employee_ids, vec!["A1", "A2"]);
        assert_eq!(f.department, None);
        assert_eq!(f.start_date, Some(ymd(2025, 7, 1)));
        Ok(())
    }

    #[test]
    fn malformed_date_bound_is_rejected() {
        let q = ReportQuery {
            end_date: Some("07/01/2025".into()),
            ..Default::default()
        };
        assert!(q.filter().is_err());
    }

    #[test]
    fn filters_combine_with_and_and_inclusive_bounds() {
        let snap = fixtures::snapshot();
        let f = ReportFilter {
            department: Some("ENGINEERING".into()),
            start_date: Some(ymd(2025, 7, 1)),
            end_date: Some(ymd(2025, 7, 2)),
            ..Default::default()
        };
        let ids: Vec<_> = f
            .apply(&snap)
            .iter()
            .filter_map(|r| r.rec.employee_date_id.clone())
            .collect();
        assert_eq!(ids, vec!["A1_2025-07-01", "A2_2025-07-01", "A4_2025-07-02"]);
    }

    #[test]
    fn department_filter_is_ignored_without_the_column() {
        let snap = CanonicalSnapshot {
            columns: vec!["employee_id".into(), "date".into()],
            records: vec![AttendanceRecord {
                employee_id: Some("A1".into()),
                ..Default::default()
            }],
        };
        let f = ReportFilter {
            department: Some("Sales".into()),
            ..Default::default()
        };
        assert_eq!(f.apply(&snap).len(), 1);
    }
}

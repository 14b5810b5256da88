use serde::Serialize;
use std::fmt;

use super::{Measure, ReportFilter, Row};
use crate::store::CanonicalSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeDepartmentTotal {
    pub employee_id: String,
    pub department: String,
    pub total_overtime_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentTotal {
    pub department: String,
    pub total_overtime_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeTotal {
    pub employee_id: String,
    pub total_overtime_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotal {
    pub month: String,
    pub total_overtime_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub total_overtime_hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OvertimeException {
    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub date: String,
    pub overtime_hours: Option<f64>,
    pub exception_reason: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct OvertimeSummaryReport {
    pub overtime_summary: Vec<EmployeeDepartmentTotal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentOvertimeReport {
    pub department_overtime: Vec<DepartmentTotal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentComparisonReport {
    pub department_overtime_comparison: Vec<DepartmentTotal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeComparisonReport {
    pub employee_overtime_comparison: Vec<EmployeeTotal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthComparisonReport {
    pub monthly_overtime_comparison: Vec<MonthTotal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendsReport {
    pub overtime_trends: Vec<TrendPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopOvertimeReport {
    pub top_overtime_employees: Vec<EmployeeDepartmentTotal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExceptionsReport {
    pub overtime_exceptions: Vec<OvertimeException>,
}

/// Period width for [`overtime_trends`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Granularity {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    /// Unrecognised values fall back to daily.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("weekly") => Granularity::Weekly,
            Some("monthly") => Granularity::Monthly,
            _ => Granularity::Daily,
        }
    }

    fn format(self) -> &'static str {
        match self {
            Granularity::Daily => "%Y-%m-%d",
            Granularity::Weekly => "%G-W%V",
            Granularity::Monthly => "%Y-%m",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        };
        f.write_str(name)
    }
}

fn employee_department<'a>(row: &Row<'a>) -> Option<(&'a str, &'a str)> {
    Some((row.employee_id()?, row.department()?))
}

fn per_employee_department<'a>(rows: &[Row<'a>], measure: Measure) -> Vec<EmployeeDepartmentTotal> {
    measure
        .total_by(rows, employee_department)
        .into_iter()
        .map(|((emp, dept), total)| EmployeeDepartmentTotal {
            employee_id: emp.to_string(),
            department: dept.to_string(),
            total_overtime_hours: total,
        })
        .collect()
}

fn per_department<'a>(rows: &[Row<'a>], measure: Measure) -> Vec<DepartmentTotal> {
    measure
        .total_by(rows, |r| r.department())
        .into_iter()
        .map(|(dept, total)| DepartmentTotal {
            department: dept.to_string(),
            total_overtime_hours: total,
        })
        .collect()
}

/// Overtime per (employee, department).
pub fn overtime_summary(snap: &CanonicalSnapshot, filter: &ReportFilter) -> OvertimeSummaryReport {
    let rows = filter.apply(snap);
    OvertimeSummaryReport {
        overtime_summary: per_employee_department(&rows, Measure::of(snap)),
    }
}

/// Overtime per department.
pub fn department_overtime(snap: &CanonicalSnapshot, filter: &ReportFilter) -> DepartmentOvertimeReport {
    let rows = filter.apply(snap);
    DepartmentOvertimeReport {
        department_overtime: per_department(&rows, Measure::of(snap)),
    }
}

pub fn department_overtime_comparison(
    snap: &CanonicalSnapshot,
    filter: &ReportFilter,
) -> DepartmentComparisonReport {
    let rows = filter.apply(snap);
    DepartmentComparisonReport {
        department_overtime_comparison: per_department(&rows, Measure::of(snap)),
    }
}

pub fn employee_overtime_comparison(
    snap: &CanonicalSnapshot,
    filter: &ReportFilter,
) -> EmployeeComparisonReport {
    let rows = filter.apply(snap);
    let totals = Measure::of(snap).total_by(&rows, |r| r.employee_id());
    EmployeeComparisonReport {
        employee_overtime_comparison: totals
            .into_iter()
            .map(|(emp, total)| EmployeeTotal {
                employee_id: emp.to_string(),
                total_overtime_hours: total,
            })
            .collect(),
    }
}

/// Overtime per calendar month, overtime rows only.
pub fn overtime_month_comparison(
    snap: &CanonicalSnapshot,
    filter: &ReportFilter,
) -> MonthComparisonReport {
    let measure = Measure::of(snap);
    let rows = measure.overtime_only(filter.apply(snap));
    let totals = measure.total_by(&rows, |r| r.date.map(|d| d.format("%Y-%m").to_string()));
    MonthComparisonReport {
        monthly_overtime_comparison: totals
            .into_iter()
            .map(|(month, total)| MonthTotal {
                month,
                total_overtime_hours: total,
            })
            .collect(),
    }
}

/// Overtime per period. When the filter names a department or an employee,
/// the series is also split by it.
pub fn overtime_trends(
    snap: &CanonicalSnapshot,
    filter: &ReportFilter,
    granularity: Granularity,
) -> TrendsReport {
    let measure = Measure::of(snap);
    let rows = measure.overtime_only(filter.apply(snap));
    let by_department = filter.department.is_some();
    let by_employee = filter.employee_id.is_some();

    let totals = measure.total_by(&rows, |r| {
        let period = r.date?.format(granularity.format()).to_string();
        let dept = if by_department { Some(r.department()?) } else { None };
        let emp = if by_employee { Some(r.employee_id()?) } else { None };
        Some((period, dept, emp))
    });
    TrendsReport {
        overtime_trends: totals
            .into_iter()
            .map(|((date, dept, emp), total)| TrendPoint {
                date,
                total_overtime_hours: total,
                department: dept.map(str::to_string),
                employee_id: emp.map(str::to_string),
            })
            .collect(),
    }
}

/// The `top_n` (employee, department) pairs with the most overtime.
pub fn top_overtime_employees(
    snap: &CanonicalSnapshot,
    filter: &ReportFilter,
    top_n: usize,
) -> TopOvertimeReport {
    let measure = Measure::of(snap);
    let rows = measure.overtime_only(filter.apply(snap));
    let mut totals = per_employee_department(&rows, measure);
    // stable: ties stay in key order
    totals.sort_by(|a, b| b.total_overtime_hours.total_cmp(&a.total_overtime_hours));
    totals.truncate(top_n);
    TopOvertimeReport {
        top_overtime_employees: totals,
    }
}

/// Overtime rows, optionally only those above `threshold_hours`.
pub fn overtime_exceptions(
    snap: &CanonicalSnapshot,
    filter: &ReportFilter,
    threshold_hours: Option<f64>,
) -> ExceptionsReport {
    let measure = Measure::of(snap);
    let mut rows = measure.overtime_only(filter.apply(snap));
    if let (Some(limit), Measure::Hours) = (threshold_hours, measure) {
        rows.retain(|r| r.overtime > limit);
    }

    let overtime_exceptions = rows
        .iter()
        .map(|r| {
            let hours = (measure == Measure::Hours).then_some(r.overtime);
            let exceeded = matches!((threshold_hours, hours), (Some(limit), Some(h)) if h > limit);
            OvertimeException {
                employee_id: r.rec.employee_id.clone(),
                department: r.rec.department.clone(),
                date: match r.date {
                    Some(d) => d.format("%Y-%m-%d").to_string(),
                    None => r.rec.date.clone().unwrap_or_default(),
                },
                overtime_hours: hours,
                exception_reason: if exceeded {
                    "Exceeded daily limit"
                } else {
                    "Requires approval"
                },
            }
        })
        .collect();
    ExceptionsReport { overtime_exceptions }
}

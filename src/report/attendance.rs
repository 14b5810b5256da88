use serde::Serialize;

use super::{ReportFilter, Row};
use crate::store::CanonicalSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceEntry {
    pub employee_id: String,
    pub date: String,
    pub department: String,
    pub day_type: String,
    pub exception: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceReport {
    pub attendance: Vec<AttendanceEntry>,
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

impl AttendanceEntry {
    fn from_row(row: &Row<'_>) -> Self {
        AttendanceEntry {
            employee_id: text(&row.rec.employee_id),
            // unparseable dates render empty
            date: row.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            department: text(&row.rec.department),
            day_type: text(&row.rec.day_type),
            exception: text(&row.rec.exception),
        }
    }
}

/// Filtered attendance rows in artifact order.
pub fn attendance(snap: &CanonicalSnapshot, filter: &ReportFilter) -> AttendanceReport {
    AttendanceReport {
        attendance: filter.apply(snap).iter().map(AttendanceEntry::from_row).collect(),
    }
}

/// Every attendance row, no filters.
pub fn all_attendance(snap: &CanonicalSnapshot) -> AttendanceReport {
    attendance(snap, &ReportFilter::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures;

    #[test]
    fn all_rows_with_blank_fill() {
        let report = all_attendance(&fixtures::snapshot());
        assert_eq!(report.attendance.len(), 7);

        let bad = &report.attendance[6];
        assert_eq!(bad.employee_id, "A5");
        assert_eq!(bad.date, "");
        assert_eq!(report.attendance[1].exception, "Lateness");
        assert_eq!(report.attendance[0].exception, "");
    }

    #[test]
    fn employee_filter_narrows_rows() {
        let filter = ReportFilter {
            employee_id: Some("A1".into()),
            ..Default::default()
        };
        let report = attendance(&fixtures::snapshot(), &filter);
        let dates: Vec<_> = report.attendance.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, vec!["2025-06-30", "2025-07-01", "2025-07-08"]);
    }

    #[test]
    fn serializes_under_attendance_key() -> anyhow::Result<()> {
        let filter = ReportFilter {
            employee_ids: vec!["A3".into()],
            ..Default::default()
        };
        let json = serde_json::to_value(attendance(&fixtures::snapshot(), &filter))?;
        assert_eq!(json["attendance"][0]["department"], "Sales");
        assert_eq!(json["attendance"][0]["day_type"], "Holiday");
        Ok(())
    }
}

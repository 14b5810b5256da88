use arrow::datatypes::{DataType, Field, Schema};
use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const EMPLOYEE_ID: &str = "employee_id";
pub const DATE: &str = "date";

/// Canonical tag a raw header resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalColumn {
    EmployeeId,
    Date,
    /// Not an alias; keeps its normalized spelling.
    Other,
}

impl CanonicalColumn {
    pub fn name(self) -> Option<&'static str> {
        match self {
            CanonicalColumn::EmployeeId => Some(EMPLOYEE_ID),
            CanonicalColumn::Date => Some(DATE),
            CanonicalColumn::Other => None,
        }
    }
}

static ALIASES: Lazy<HashMap<&'static str, CanonicalColumn>> = Lazy::new(|| {
    let employee = [
        "employee_id",
        "employeeid",
        "employee",
        "id",
        "emp_code",
        "emp_id",
        "empid",
    ];
    // "date " never survives trimming but stays for parity with older exports
    let date = [
        "date",
        "date_",
        "day",
        "date_of_attendance",
        "attendance_date",
        "date ",
    ];
    employee
        .into_iter()
        .map(|a| (a, CanonicalColumn::EmployeeId))
        .chain(date.into_iter().map(|a| (a, CanonicalColumn::Date)))
        .collect()
});

/// One header cell and the name it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnName {
    pub original: String,
    pub canonical: String,
    pub tag: CanonicalColumn,
}

/// Trim, underscore spaces, collapse `__`, lower-case.
pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .replace(' ', "_")
        .replace("__", "_")
        .to_lowercase()
}

pub fn classify(normalized: &str) -> CanonicalColumn {
    ALIASES
        .get(normalized)
        .copied()
        .unwrap_or(CanonicalColumn::Other)
}

/// Map every header cell to its canonical name, preserving order.
pub fn normalize_columns(raw_header: &[String]) -> Vec<ColumnName> {
    raw_header
        .iter()
        .map(|original| {
            let norm = normalize_header(original);
            let tag = classify(&norm);
            let canonical = tag.name().map(str::to_string).unwrap_or(norm);
            ColumnName {
                original: original.clone(),
                canonical,
                tag,
            }
        })
        .collect()
}

/// All-text nullable schema for a normalized table.
pub fn utf8_schema<'a, I>(names: I) -> Schema
where
    I: IntoIterator<Item = &'a str>,
{
    Schema::new(
        names
            .into_iter()
            .map(|n| Field::new(n, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(headers: &[&str]) -> Vec<String> {
        let owned: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        normalize_columns(&owned)
            .into_iter()
            .map(|c| c.canonical)
            .collect()
    }

    #[test]
    fn resolves_known_aliases() {
        assert_eq!(
            canon(&["Emp Code", "Attendance Date", "Total OT"]),
            vec!["employee_id", "date", "total_ot"]
        );
        assert_eq!(
            canon(&["EmployeeID", " ID ", "emp_id", "EMPID", "Employee"]),
            vec!["employee_id"; 5]
        );
        assert_eq!(
            canon(&["Day", "Date ", "Date_", "Date of Attendance"]),
            vec!["date"; 4]
        );
    }

    #[test]
    fn unmapped_names_keep_order_and_spelling() {
        assert_eq!(
            canon(&["Day Type", "  Exception", "Department", "Shift  Start"]),
            vec!["day_type", "exception", "department", "shift_start"]
        );
    }

    #[test]
    fn every_alias_maps_to_a_canonical_name() {
        for (alias, tag) in ALIASES.iter() {
            assert_eq!(classify(alias), *tag);
            assert_ne!(*tag, CanonicalColumn::Other);
        }
    }
}

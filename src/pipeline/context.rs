use serde::{Deserialize, Serialize};

pub use crate::db::models::AttendanceStatus;

/// Operator-selected context for a scan: which subject attendance is being
/// taken for, and whether the scan logs the student in or out. Supplied
/// before the scanner is armed and constant while it is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanContext {
    pub subject: String,
    pub direction: AttendanceStatus,
}

impl ScanContext {
    pub fn new(subject: impl Into<String>, direction: AttendanceStatus) -> Self {
        Self {
            subject: subject.into(),
            direction,
        }
    }
}

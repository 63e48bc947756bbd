//! Typed outcomes of a scan decision.

use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::db::models::AttendanceRecord;

use super::notify::NoticeKind;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ScanOutcome {
    /// The scan passed every rule and the record is durably stored.
    Recorded(AttendanceRecord),
    /// A business rule rejected the scan; nothing was stored.
    Rejected(ScanRejection),
    /// The scan could not be completed; nothing was stored.
    Failed(ScanFailure),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ScanRejection {
    /// The student already has a login for this subject today.
    DuplicateLogin {
        student_name: String,
        subject: String,
        existing_timestamp: DateTime<Utc>,
    },
    /// Scan attempted with no subject selected.
    MissingSubject,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ScanFailure {
    Persistence(String),
}

impl fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanFailure::Persistence(message) => write!(f, "{message}"),
        }
    }
}

impl ScanOutcome {
    pub fn record(&self) -> Option<&AttendanceRecord> {
        match self {
            ScanOutcome::Recorded(record) => Some(record),
            _ => None,
        }
    }

    pub fn notice_kind(&self) -> NoticeKind {
        match self {
            ScanOutcome::Recorded(_) => NoticeKind::Success,
            ScanOutcome::Rejected(_) => NoticeKind::Rejected,
            ScanOutcome::Failed(_) => NoticeKind::Failed,
        }
    }

    /// Human-readable message for the operator, specific enough to
    /// self-correct (duplicate vs. missing subject vs. storage failure).
    pub fn operator_message(&self) -> String {
        match self {
            ScanOutcome::Recorded(record) => format!(
                "{} {} for {}.",
                record.student_name,
                record.status.verb(),
                record.subject
            ),
            ScanOutcome::Rejected(ScanRejection::DuplicateLogin {
                student_name,
                subject,
                existing_timestamp,
            }) => format!(
                "{} has already logged in for {} at {}.",
                student_name,
                subject,
                existing_timestamp
                    .with_timezone(&Local)
                    .format("%H:%M:%S")
            ),
            ScanOutcome::Rejected(ScanRejection::MissingSubject) => {
                "Please select a subject before scanning.".to_string()
            }
            ScanOutcome::Failed(failure) => {
                format!("Could not save attendance record: {failure}")
            }
        }
    }
}

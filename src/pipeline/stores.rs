//! Store seams the pipeline depends on.
//!
//! The pipeline only ever talks to these traits, so it runs identically over
//! the SQLite-backed [`Database`](crate::db::Database) and over in-memory
//! fakes in tests.

use anyhow::Result;
use async_trait::async_trait;

use crate::db::models::{AttendanceRecord, AttendanceStatus, RegisteredCode};

/// Read-only lookup of registered codes by exact payload match.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_payload(&self, payload: &str) -> Result<Option<RegisteredCode>>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_status_records(
        &self,
        student_name: &str,
        subject: &str,
        status: AttendanceStatus,
    ) -> Result<Vec<AttendanceRecord>>;

    async fn insert_record(&self, record: &AttendanceRecord) -> Result<()>;

    async fn delete_record(&self, id: &str) -> Result<()>;

    async fn clear_records(&self) -> Result<()>;
}

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_status},
    models::{AttendanceRecord, AttendanceStatus},
};
use crate::pipeline::stores::AttendanceStore;

fn row_to_record(row: &Row) -> Result<AttendanceRecord> {
    let timestamp: String = row.get("timestamp")?;
    let status: String = row.get("status")?;

    Ok(AttendanceRecord {
        id: row.get("id")?,
        student_name: row.get("student_name")?,
        subject: row.get("subject")?,
        status: parse_status(&status)?,
        is_valid: row.get("is_valid")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
    })
}

impl Database {
    pub async fn insert_record(&self, record: &AttendanceRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO attendance_records (id, student_name, subject, status, is_valid, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.student_name,
                    record.subject,
                    record.status.as_str(),
                    record.is_valid,
                    record.timestamp.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// All records for a student/subject pair with the given status, newest
    /// first. Day filtering happens in the pipeline so the query stays on the
    /// covering index.
    pub async fn find_status_records(
        &self,
        student_name: &str,
        subject: &str,
        status: AttendanceStatus,
    ) -> Result<Vec<AttendanceRecord>> {
        let student_name = student_name.to_string();
        let subject = subject.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, student_name, subject, status, is_valid, timestamp
                 FROM attendance_records
                 WHERE student_name = ?1 AND subject = ?2 AND status = ?3
                 ORDER BY timestamp DESC",
            )?;

            let mut rows = stmt.query(params![student_name, subject, status.as_str()])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }

    pub async fn list_records(&self) -> Result<Vec<AttendanceRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, student_name, subject, status, is_valid, timestamp
                 FROM attendance_records
                 ORDER BY timestamp DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }

    pub async fn delete_record(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM attendance_records WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
    }

    pub async fn clear_records(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute("DELETE FROM attendance_records", [])?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl AttendanceStore for Database {
    async fn find_status_records(
        &self,
        student_name: &str,
        subject: &str,
        status: AttendanceStatus,
    ) -> Result<Vec<AttendanceRecord>> {
        Database::find_status_records(self, student_name, subject, status).await
    }

    async fn insert_record(&self, record: &AttendanceRecord) -> Result<()> {
        Database::insert_record(self, record).await
    }

    async fn delete_record(&self, id: &str) -> Result<()> {
        Database::delete_record(self, id).await
    }

    async fn clear_records(&self) -> Result<()> {
        Database::clear_records(self).await
    }
}

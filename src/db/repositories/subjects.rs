use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{connection::Database, helpers::parse_datetime, models::Subject};

fn row_to_subject(row: &Row) -> Result<Subject> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Subject {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn list_subjects(&self) -> Result<Vec<Subject>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, created_at, updated_at FROM subjects ORDER BY name ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut subjects = Vec::new();
            while let Some(row) = rows.next()? {
                subjects.push(row_to_subject(row)?);
            }
            Ok(subjects)
        })
        .await
    }

    /// Add a subject. Names are trimmed and unique case-insensitively; the
    /// uniqueness check runs inside the DB task to avoid races.
    pub async fn add_subject(&self, name: &str) -> Result<Subject> {
        let name = name.trim().to_string();
        if name.is_empty() {
            bail!("subject name must not be empty");
        }

        self.execute(move |conn| {
            let duplicates: i64 = conn.query_row(
                "SELECT COUNT(*) FROM subjects WHERE LOWER(name) = LOWER(?1)",
                params![name],
                |row| row.get(0),
            )?;
            if duplicates > 0 {
                bail!("subject '{name}' already exists");
            }

            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO subjects (name, created_at, updated_at) VALUES (?1, ?2, ?3)",
                params![name, now, now],
            )?;
            let subject_id = conn.last_insert_rowid();

            let mut stmt = conn.prepare(
                "SELECT id, name, created_at, updated_at FROM subjects WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![subject_id])?;
            match rows.next()? {
                Some(row) => row_to_subject(row),
                None => Err(anyhow!("subject not found after insert")),
            }
        })
        .await
    }

    pub async fn rename_subject(&self, id: i64, name: &str) -> Result<Subject> {
        let name = name.trim().to_string();
        if name.is_empty() {
            bail!("subject name must not be empty");
        }

        self.execute(move |conn| {
            let duplicates: i64 = conn.query_row(
                "SELECT COUNT(*) FROM subjects WHERE LOWER(name) = LOWER(?1) AND id != ?2",
                params![name, id],
                |row| row.get(0),
            )?;
            if duplicates > 0 {
                bail!("subject '{name}' already exists");
            }

            let updated = conn.execute(
                "UPDATE subjects SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![name, Utc::now().to_rfc3339(), id],
            )?;
            if updated == 0 {
                bail!("no subject with id {id}");
            }

            let mut stmt = conn.prepare(
                "SELECT id, name, created_at, updated_at FROM subjects WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![id])?;
            match rows.next()? {
                Some(row) => row_to_subject(row),
                None => Err(anyhow!("subject not found after update")),
            }
        })
        .await
    }

    pub async fn remove_subject(&self, id: i64) -> Result<()> {
        self.execute(move |conn| {
            conn.execute("DELETE FROM subjects WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
    }
}

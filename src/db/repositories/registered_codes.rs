use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime},
    models::RegisteredCode,
};
use crate::pipeline::stores::IdentityStore;

fn row_to_code(row: &Row) -> Result<RegisteredCode> {
    let created_at: String = row.get("created_at")?;
    let updated_at: Option<String> = row.get("updated_at")?;

    Ok(RegisteredCode {
        id: row.get("id")?,
        name: row.get("name")?,
        data: row.get("data")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_optional_datetime(updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_code(&self, code: &RegisteredCode) -> Result<()> {
        let code = code.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO registered_codes (id, name, data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    code.id,
                    code.name,
                    code.data,
                    code.created_at.to_rfc3339(),
                    code.updated_at.as_ref().map(|dt| dt.to_rfc3339()),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Exact-match lookup of a scanned payload.
    pub async fn find_code_by_payload(&self, data: &str) -> Result<Option<RegisteredCode>> {
        let data = data.to_string();
        self.execute(move |conn| {
            conn.query_row(
                "SELECT id, name, data, created_at, updated_at
                 FROM registered_codes
                 WHERE data = ?1",
                params![data],
                |row| Ok(row_to_code(row)),
            )
            .optional()?
            .transpose()
        })
        .await
    }

    pub async fn list_codes(&self) -> Result<Vec<RegisteredCode>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, data, created_at, updated_at
                 FROM registered_codes
                 ORDER BY created_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut codes = Vec::new();
            while let Some(row) = rows.next()? {
                codes.push(row_to_code(row)?);
            }
            Ok(codes)
        })
        .await
    }

    pub async fn rename_code(&self, id: &str, name: &str) -> Result<()> {
        let id = id.to_string();
        let name = name.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE registered_codes SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![name, Utc::now().to_rfc3339(), id],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn delete_code(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM registered_codes WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl IdentityStore for Database {
    async fn find_by_payload(&self, payload: &str) -> Result<Option<RegisteredCode>> {
        self.find_code_by_payload(payload).await
    }
}

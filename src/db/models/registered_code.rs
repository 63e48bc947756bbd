//! Registered code data model.
//!
//! Maps an opaque QR payload to a student display name. Codes are issued by
//! the generator flow and looked up by exact payload match during scanning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredCode {
    pub id: String,
    pub name: String,
    /// Opaque payload value encoded in the QR image.
    pub data: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RegisteredCode {
    /// Mint a new code for a student: fresh id and a fresh random payload.
    pub fn issue(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            data: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: None,
        }
    }
}

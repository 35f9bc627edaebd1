//! Practitioner settings repository.
//!
//! The service runs single-practice: one settings row holds the API
//! credential, the summarization system prompt, and an optional model
//! override. A default row is created on first startup.

use chrono::Utc;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ProntuError};
use super::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Practitioner {
    pub id: i64,
    pub name: String,
    pub api_key: String,
    pub system_prompt: String,
    pub model: Option<String>,
}

impl Practitioner {
    fn from_row(row: &Row<'_>) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            api_key: row.get("api_key")?,
            system_prompt: row.get("system_prompt")?,
            model: row.get("model")?,
        })
    }
}

/// Fields accepted when updating the settings. Absent fields keep their
/// stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PractitionerInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// New model override; an empty string clears it back to the default
    #[serde(default)]
    pub model: Option<String>,
}

/// Returns the settings row, creating it with the default system prompt on
/// first use.
pub fn ensure_default(db: &Database, default_system_prompt: &str) -> Result<Practitioner> {
    let now = Utc::now().to_rfc3339();

    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO practitioners (id, name, api_key, system_prompt, model, created_at, updated_at)
             SELECT 1, '', '', ?1, NULL, ?2, ?2
             WHERE NOT EXISTS (SELECT 1 FROM practitioners WHERE id = 1)",
            params![default_system_prompt, now],
        )?;

        conn.query_row(
            "SELECT * FROM practitioners WHERE id = 1",
            [],
            Practitioner::from_row,
        )
        .map_err(Into::into)
    })
}

/// Fetches the settings row.
pub fn get(db: &Database, id: i64) -> Result<Practitioner> {
    db.with_conn(|conn| {
        conn.query_row(
            "SELECT * FROM practitioners WHERE id = ?1",
            params![id],
            Practitioner::from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                ProntuError::NotFound(format!("practitioner {}", id))
            }
            other => other.into(),
        })
    })
}

/// Applies the given settings changes.
pub fn update(db: &Database, id: i64, input: &PractitionerInput) -> Result<Practitioner> {
    let current = get(db, id)?;
    let now = Utc::now().to_rfc3339();

    let name = input.name.clone().unwrap_or(current.name);
    let api_key = input.api_key.clone().unwrap_or(current.api_key);
    let system_prompt = input.system_prompt.clone().unwrap_or(current.system_prompt);
    let model = match &input.model {
        Some(value) if value.trim().is_empty() => None,
        Some(value) => Some(value.clone()),
        None => current.model,
    };

    db.with_conn(|conn| {
        conn.execute(
            "UPDATE practitioners SET name = ?2, api_key = ?3, system_prompt = ?4,
             model = ?5, updated_at = ?6 WHERE id = ?1",
            params![id, name, api_key, system_prompt, model, now],
        )?;
        Ok(())
    })?;

    get(db, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_default_is_idempotent() {
        let db = Database::open_in_memory().unwrap();

        let first = ensure_default(&db, "prompt padrão").unwrap();
        assert_eq!(first.system_prompt, "prompt padrão");
        assert_eq!(first.api_key, "");

        // An edited prompt survives a later ensure call.
        update(
            &db,
            first.id,
            &PractitionerInput {
                system_prompt: Some("editado".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let again = ensure_default(&db, "prompt padrão").unwrap();
        assert_eq!(again.system_prompt, "editado");
    }

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let db = Database::open_in_memory().unwrap();
        let practitioner = ensure_default(&db, "prompt").unwrap();

        let updated = update(
            &db,
            practitioner.id,
            &PractitionerInput {
                api_key: Some("chave-nova".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(updated.api_key, "chave-nova");
        assert_eq!(updated.system_prompt, "prompt");
        assert_eq!(updated.model, None);

        let with_model = update(
            &db,
            practitioner.id,
            &PractitionerInput {
                model: Some("gemini-2.0-flash".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(with_model.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(with_model.api_key, "chave-nova");

        let cleared = update(
            &db,
            practitioner.id,
            &PractitionerInput {
                model: Some("".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(cleared.model, None);
    }
}

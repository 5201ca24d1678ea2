use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::resource::ResourceKind;

/// One changed key. `old_value` is null for creations and for keys the
/// previous version did not have.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub key: String,
    pub old_value: Value,
    pub new_value: Value,
}

/// Who made an edit: an authenticated user id, or failing that the client
/// address. Never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Editor {
    User { id: String },
    Address { ip: String },
}

impl Editor {
    pub fn attribute(user_id: Option<String>, ip: Option<String>) -> Self {
        match user_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => Editor::User { id },
            None => Editor::Address {
                ip: ip.unwrap_or_else(|| "unknown".to_string()),
            },
        }
    }

    fn columns(&self) -> (Option<&str>, Option<&str>) {
        match self {
            Editor::User { id } => (Some(id.as_str()), None),
            Editor::Address { ip } => (None, Some(ip.as_str())),
        }
    }

    pub fn editor_id(&self) -> Option<&str> {
        self.columns().0
    }

    pub fn editor_ip(&self) -> Option<&str> {
        self.columns().1
    }
}

/// Immutable audit entry for one create or update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: Uuid,
    pub resource: ResourceKind,
    pub resource_id: Uuid,
    pub time: DateTime<Utc>,
    pub editor: Editor,
    pub fields: Vec<FieldChange>,
}

#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub id: Uuid,
    pub resource: String,
    pub resource_id: Uuid,
    pub time: DateTime<Utc>,
    pub editor_id: Option<String>,
    pub editor_ip: Option<String>,
    pub fields: Json<Vec<FieldChange>>,
}

impl TryFrom<HistoryRow> for HistoryRecord {
    type Error = String;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(HistoryRecord {
            id: row.id,
            resource: row.resource.parse()?,
            resource_id: row.resource_id,
            time: row.time,
            editor: Editor::attribute(row.editor_id, row.editor_ip),
            fields: row.fields.0,
        })
    }
}

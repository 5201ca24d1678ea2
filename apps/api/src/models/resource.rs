use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use uuid::Uuid;

/// Every document type that carries edit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Club,
    Event,
    Volunteering,
    Reservation,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Club => "club",
            ResourceKind::Event => "event",
            ResourceKind::Volunteering => "volunteering",
            ResourceKind::Reservation => "reservation",
        }
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "club" => Ok(ResourceKind::Club),
            "event" => Ok(ResourceKind::Event),
            "volunteering" => Ok(ResourceKind::Volunteering),
            "reservation" => Ok(ResourceKind::Reservation),
            other => Err(format!("unknown resource kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResourceRow {
    pub id: Uuid,
    pub kind: String,
    pub data: Value,
    pub history: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceRow {
    /// Stored document body as a map (empty if the column is not an object).
    pub fn data_map(&self) -> Map<String, Value> {
        match &self.data {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        }
    }

    /// API representation: the document body plus identity and timestamps.
    pub fn to_document(&self) -> Value {
        let mut doc = self.data_map();
        doc.insert("id".to_string(), Value::String(self.id.to_string()));
        doc.insert(
            "history".to_string(),
            Value::Array(
                self.history
                    .iter()
                    .map(|h| Value::String(h.to_string()))
                    .collect(),
            ),
        );
        doc.insert("createdAt".to_string(), Value::String(self.created_at.to_rfc3339()));
        doc.insert("updatedAt".to_string(), Value::String(self.updated_at.to_rfc3339()));
        Value::Object(doc)
    }
}

//! Field-level diffs for the edit history.
//!
//! Creations list every user-visible key with a null old value. Updates are
//! driven by the incoming payload only: keys the payload does not mention are
//! never reported, even if the stored document differs.

use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::history::{Editor, FieldChange, HistoryRecord};
use crate::models::resource::ResourceKind;

/// Keys with this prefix are internal bookkeeping, never user content.
pub const RESERVED_PREFIX: char = '_';
const IDENTITY_KEYS: [&str; 2] = ["id", "history"];

pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX) || IDENTITY_KEYS.contains(&key)
}

pub fn record_creation(
    resource: ResourceKind,
    resource_id: Uuid,
    new_data: &Map<String, Value>,
    editor: Editor,
) -> HistoryRecord {
    let fields = new_data
        .iter()
        .filter(|(key, _)| !is_reserved_key(key))
        .map(|(key, value)| FieldChange {
            key: key.clone(),
            old_value: Value::Null,
            new_value: value.clone(),
        })
        .collect();
    new_record(resource, resource_id, editor, fields)
}

/// A key missing from `previous_data` compares as null.
pub fn record_update(
    resource: ResourceKind,
    resource_id: Uuid,
    previous_data: &Map<String, Value>,
    incoming_data: &Map<String, Value>,
    editor: Editor,
) -> HistoryRecord {
    let fields = incoming_data
        .iter()
        .filter(|(key, _)| !is_reserved_key(key))
        .filter_map(|(key, new_value)| {
            let old_value = previous_data.get(key).cloned().unwrap_or(Value::Null);
            (old_value != *new_value).then(|| FieldChange {
                key: key.clone(),
                old_value,
                new_value: new_value.clone(),
            })
        })
        .collect();
    new_record(resource, resource_id, editor, fields)
}

fn new_record(
    resource: ResourceKind,
    resource_id: Uuid,
    editor: Editor,
    fields: Vec<FieldChange>,
) -> HistoryRecord {
    HistoryRecord {
        id: Uuid::new_v4(),
        resource,
        resource_id,
        time: Utc::now(),
        editor,
        fields,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn editor() -> Editor {
        Editor::Address {
            ip: "127.0.0.1".to_string(),
        }
    }

    #[test]
    fn test_creation_skips_identity_keys() {
        let record = record_creation(
            ResourceKind::Club,
            Uuid::new_v4(),
            &map(json!({ "id": "x", "history": ["y"], "name": "Foo" })),
            editor(),
        );
        assert_eq!(
            record.fields,
            vec![FieldChange {
                key: "name".to_string(),
                old_value: Value::Null,
                new_value: json!("Foo"),
            }]
        );
    }

    #[test]
    fn test_creation_skips_reserved_prefix() {
        let record = record_creation(
            ResourceKind::Event,
            Uuid::new_v4(),
            &map(json!({ "_calendarEventId": "abc", "__v": 0, "name": "Gala", "signup": false })),
            editor(),
        );
        let keys: Vec<_> = record.fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["name", "signup"]);
    }

    #[test]
    fn test_update_reports_changed_and_new_keys_only() {
        let record = record_update(
            ResourceKind::Club,
            Uuid::new_v4(),
            &map(json!({ "a": 1, "b": 2 })),
            &map(json!({ "a": 1, "b": 3, "c": 4 })),
            editor(),
        );
        assert_eq!(
            record.fields,
            vec![
                FieldChange {
                    key: "b".to_string(),
                    old_value: json!(2),
                    new_value: json!(3),
                },
                FieldChange {
                    key: "c".to_string(),
                    old_value: Value::Null,
                    new_value: json!(4),
                },
            ]
        );
    }

    #[test]
    fn test_update_ignores_keys_missing_from_payload() {
        let record = record_update(
            ResourceKind::Reservation,
            Uuid::new_v4(),
            &map(json!({ "room": "A", "notes": "old" })),
            &map(json!({ "room": "B" })),
            editor(),
        );
        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.fields[0].key, "room");
    }

    #[test]
    fn test_update_ignores_reserved_keys() {
        let record = record_update(
            ResourceKind::Event,
            Uuid::new_v4(),
            &map(json!({ "history": [], "_calendarEventId": null })),
            &map(json!({ "history": ["h1"], "_calendarEventId": "evt", "id": "z" })),
            editor(),
        );
        assert!(record.fields.is_empty());
    }

    #[test]
    fn test_update_compares_nested_values_structurally() {
        let record = record_update(
            ResourceKind::Club,
            Uuid::new_v4(),
            &map(json!({ "officers": ["ann", "bo"], "meta": { "room": 1 } })),
            &map(json!({ "officers": ["ann", "bo"], "meta": { "room": 2 } })),
            editor(),
        );
        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.fields[0].key, "meta");
    }

    #[test]
    fn test_record_carries_identity_and_editor() {
        let id = Uuid::new_v4();
        let editor = Editor::User {
            id: "user-7".to_string(),
        };
        let record = record_update(
            ResourceKind::Volunteering,
            id,
            &Map::new(),
            &Map::new(),
            editor.clone(),
        );
        assert_eq!(record.resource, ResourceKind::Volunteering);
        assert_eq!(record.resource_id, id);
        assert_eq!(record.editor, editor);
        assert_ne!(record.id, id);
    }
}

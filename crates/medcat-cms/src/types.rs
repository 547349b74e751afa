//! CMS REST response shapes.
//!
//! Collection endpoints answer `{ "data": [...], "meta": { "pagination": ... } }`
//! and single-record endpoints `{ "data": { ... } }`. Records either nest
//! their fields under `attributes` or carry them at the top level next to
//! `id`; [`Entry::field`] reads both.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One record as returned by the CMS.
#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    pub id: i64,
    #[serde(default)]
    pub attributes: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Entry {
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.attributes
            .as_ref()
            .and_then(|attrs| attrs.get(key))
            .or_else(|| self.fields.get(key))
    }

    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Deserialize)]
pub struct ListEnvelope {
    #[serde(default)]
    pub data: Vec<Entry>,
    #[serde(default)]
    pub meta: Meta,
}

#[derive(Debug, Deserialize)]
pub struct SingleEnvelope {
    pub data: Entry,
}

#[derive(Debug, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_attributes_are_read() {
        let entry: Entry = serde_json::from_value(serde_json::json!({
            "id": 59,
            "attributes": { "name": "IV Cannula" }
        }))
        .unwrap();
        assert_eq!(entry.text("name"), Some("IV Cannula"));
    }

    #[test]
    fn flat_fields_are_read() {
        let entry: Entry = serde_json::from_value(serde_json::json!({
            "id": 7,
            "documentId": "abc",
            "name": "Gloves"
        }))
        .unwrap();
        assert_eq!(entry.id, 7);
        assert_eq!(entry.text("name"), Some("Gloves"));
        assert_eq!(entry.text("missing"), None);
    }

    #[test]
    fn list_without_meta_has_no_pagination() {
        let list: ListEnvelope = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(list.meta.pagination.is_none());
    }
}

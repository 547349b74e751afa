//! Lookup tables for category and division foreign keys.
//!
//! [`MappingTable`] is the live id → name table fetched from the CMS (and
//! cached as a flat JSON object). [`LookupDefaults`] is the checked-in fallback
//! asset, `config/lookups.yaml`, loaded at runtime rather than compiled in.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Flat `"<id>" -> "<display name>"` table, one per lookup type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingTable {
    entries: BTreeMap<String, String>,
}

impl MappingTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: i64, name: impl Into<String>) {
        self.entries.insert(id.to_string(), name.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn name_for(&self, id: i64) -> Option<&str> {
        self.entries.get(&id.to_string()).map(String::as_str)
    }

    /// Entries with a numeric id, ordered by id.
    #[must_use]
    pub fn entries(&self) -> Vec<(i64, &str)> {
        let mut out: Vec<(i64, &str)> = self
            .entries
            .iter()
            .filter_map(|(k, v)| k.trim().parse::<i64>().ok().map(|id| (id, v.as_str())))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    /// Exact match on the display name (trimmed, case-insensitive), or on the
    /// id itself when `label` is numeric and present in the table.
    #[must_use]
    pub fn find(&self, label: &str) -> Option<(i64, &str)> {
        let wanted = label.trim();
        if wanted.is_empty() {
            return None;
        }
        if let Ok(id) = wanted.parse::<i64>() {
            if let Some(hit) = self.entries().into_iter().find(|(candidate, _)| *candidate == id) {
                return Some(hit);
            }
        }
        self.find_name(wanted)
    }

    /// Exact match on the display name only (trimmed, case-insensitive). A
    /// numeric label is never taken as an id here.
    #[must_use]
    pub fn find_name(&self, label: &str) -> Option<(i64, &str)> {
        let wanted = label.trim();
        if wanted.is_empty() {
            return None;
        }
        self.entries()
            .into_iter()
            .find(|(_, name)| name.trim().eq_ignore_ascii_case(wanted))
    }
}

impl FromIterator<(i64, String)> for MappingTable {
    fn from_iter<I: IntoIterator<Item = (i64, String)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (id, name) in iter {
            table.insert(id, name);
        }
        table
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedId {
    pub id: i64,
    pub name: String,
}

/// Fallback lookup data known at development time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupDefaults {
    #[serde(default)]
    pub divisions: Vec<NamedId>,
    #[serde(default)]
    pub categories: Vec<NamedId>,
    /// Workbook category label → CMS category name, for labels that never
    /// match by name.
    #[serde(default)]
    pub category_aliases: BTreeMap<String, String>,
}

impl LookupDefaults {
    /// Parse and validate a YAML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the YAML is malformed or fails validation.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let defaults: Self = serde_yaml::from_str(content)?;
        defaults.validate()?;
        Ok(defaults)
    }

    #[must_use]
    pub fn find_category(&self, label: &str) -> Option<&NamedId> {
        find_named(&self.categories, label)
    }

    #[must_use]
    pub fn find_division(&self, label: &str) -> Option<&NamedId> {
        find_named(&self.divisions, label)
    }

    /// Manual alias target for a workbook category label, case-insensitive.
    #[must_use]
    pub fn category_alias(&self, label: &str) -> Option<&str> {
        let wanted = label.trim();
        self.category_aliases
            .iter()
            .find(|(from, _)| from.trim().eq_ignore_ascii_case(wanted))
            .map(|(_, to)| to.as_str())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_table("division", &self.divisions)?;
        validate_table("category", &self.categories)?;
        for (from, to) in &self.category_aliases {
            if from.trim().is_empty() || to.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "category alias entries must be non-empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn find_named<'a>(table: &'a [NamedId], label: &str) -> Option<&'a NamedId> {
    let wanted = label.trim();
    if wanted.is_empty() {
        return None;
    }
    table
        .iter()
        .find(|entry| entry.name.trim().eq_ignore_ascii_case(wanted))
}

fn validate_table(kind: &str, table: &[NamedId]) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    for entry in table {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{kind} name must be non-empty (id {})",
                entry.id
            )));
        }
        if entry.id <= 0 {
            return Err(ConfigError::Validation(format!(
                "{kind} '{}' has invalid id {}; must be positive",
                entry.name, entry.id
            )));
        }
        if !seen_names.insert(entry.name.trim().to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate {kind} name: '{}'",
                entry.name
            )));
        }
    }
    Ok(())
}

/// Load and validate the lookup defaults from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_lookup_defaults(path: &Path) -> Result<LookupDefaults, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LookupsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    LookupDefaults::from_yaml_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r"
divisions:
  - { id: 48, name: INJECTION }
  - { id: 58, name: ANESTHESIA / RESPIRATORY }
categories:
  - { id: 59, name: SYRINGES }
category_aliases:
  IV CANNULAS: IV CANNULA
";

    #[test]
    fn parses_defaults_yaml() {
        let defaults = LookupDefaults::from_yaml_str(YAML).unwrap();
        assert_eq!(defaults.divisions.len(), 2);
        assert_eq!(defaults.find_category("syringes").map(|c| c.id), Some(59));
        assert_eq!(
            defaults.find_division(" anesthesia / respiratory ").map(|d| d.id),
            Some(58)
        );
        assert_eq!(defaults.category_alias("iv cannulas"), Some("IV CANNULA"));
    }

    #[test]
    fn rejects_duplicate_names() {
        let yaml = "categories:\n  - { id: 1, name: Gauze }\n  - { id: 2, name: GAUZE }\n";
        let result = LookupDefaults::from_yaml_str(yaml);
        assert!(matches!(result, Err(ConfigError::Validation(ref m)) if m.contains("duplicate")));
    }

    #[test]
    fn rejects_non_positive_ids() {
        let yaml = "divisions:\n  - { id: 0, name: Urology }\n";
        assert!(matches!(
            LookupDefaults::from_yaml_str(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn checked_in_asset_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/lookups.yaml");
        let defaults = load_lookup_defaults(&path).expect("config/lookups.yaml should load");
        assert_eq!(defaults.find_division("INJECTION").map(|d| d.id), Some(48));
        assert_eq!(defaults.find_category("URINE BAGS").map(|c| c.id), Some(92));
        assert!(!defaults.category_aliases.is_empty());
    }

    #[test]
    fn mapping_table_finds_by_name_or_id() {
        let table: MappingTable = vec![(12, "Syringes".to_string()), (3, "Gauze".to_string())]
            .into_iter()
            .collect();
        assert_eq!(table.find("SYRINGES"), Some((12, "Syringes")));
        assert_eq!(table.find("3"), Some((3, "Gauze")));
        assert_eq!(table.find("Needles"), None);
        assert_eq!(table.find("  "), None);
        assert_eq!(table.entries()[0].0, 3, "entries are ordered by numeric id");
    }

    #[test]
    fn find_name_ignores_numeric_ids() {
        let table: MappingTable = vec![(59, "IV Cannula".to_string()), (7, "42".to_string())]
            .into_iter()
            .collect();
        assert_eq!(table.find_name("59"), None);
        assert_eq!(table.find("59"), Some((59, "IV Cannula")));
        assert_eq!(table.find_name(" iv cannula "), Some((59, "IV Cannula")));
        assert_eq!(table.find_name("42"), Some((7, "42")));
    }

    #[test]
    fn mapping_table_serializes_as_flat_object() {
        let mut table = MappingTable::new();
        table.insert(7, "Urology");
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json, serde_json::json!({ "7": "Urology" }));
        let back: MappingTable = serde_json::from_value(json).unwrap();
        assert_eq!(back.name_for(7), Some("Urology"));
    }
}

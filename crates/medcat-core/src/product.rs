//! Canonical catalog records.
//!
//! A catalog file is a JSON array of [`CatalogEntry`] values, each wrapping a
//! [`Product`] in a `{ "data": ... }` envelope so the same document can be
//! posted to the CMS unchanged.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder stored in free-text fields whose value is not yet known.
pub const UNKNOWN_TEXT: &str = "???";

/// Default `additional_notes` for packaging nobody has filled in.
pub const UNSPECIFIED_NOTES: &str = "Not specified";

/// Returns `true` for text that carries no information: blank or the
/// [`UNKNOWN_TEXT`] sentinel.
#[must_use]
pub fn is_unknown_text(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed == UNKNOWN_TEXT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub data: Product,
}

impl From<Product> for CatalogEntry {
    fn from(data: Product) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    pub reference_string: String,
    /// Resolved CMS id. `None` means the lookup is still pending.
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub divisions: Vec<i64>,
    #[serde(default)]
    pub division_names: Vec<String>,
    #[serde(default)]
    pub standard: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub table_in_md: String,
    #[serde(
        rename = "PackagingInformation",
        alias = "packagingInformation",
        default
    )]
    pub packaging_information: PackagingInformation,
    #[serde(default)]
    pub images: Vec<i64>,
    #[serde(default)]
    pub variations: Vec<Variation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl Product {
    /// Builds a parent-only record: no variations, no resolved lookups, and
    /// every enrichable field at its "not yet known" default.
    #[must_use]
    pub fn parent(name: &str, reference: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            reference_string: reference.trim().to_string(),
            category: None,
            category_name: None,
            divisions: Vec::new(),
            division_names: Vec::new(),
            standard: UNKNOWN_TEXT.to_string(),
            description: String::new(),
            table_in_md: String::new(),
            packaging_information: PackagingInformation::default(),
            images: Vec::new(),
            variations: Vec::new(),
            slug: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingInformation {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub packing_per_inner_box: i64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub inner_boxes_per_carton: i64,
    #[serde(
        rename = "loading_capacity_20GP",
        default,
        deserialize_with = "null_as_zero"
    )]
    pub loading_capacity_20gp: i64,
    #[serde(
        rename = "loading_capacity_40HC",
        default,
        deserialize_with = "null_as_zero"
    )]
    pub loading_capacity_40hc: i64,
    #[serde(default = "default_notes")]
    pub additional_notes: String,
}

impl Default for PackagingInformation {
    fn default() -> Self {
        Self {
            packing_per_inner_box: 0,
            inner_boxes_per_carton: 0,
            loading_capacity_20gp: 0,
            loading_capacity_40hc: 0,
            additional_notes: default_notes(),
        }
    }
}

impl PackagingInformation {
    /// `true` when every count is zero and the notes are blank or the
    /// "Not specified" sentinel. A partially filled record is specified.
    #[must_use]
    pub fn is_unspecified(&self) -> bool {
        let notes = self.additional_notes.trim();
        self.packing_per_inner_box == 0
            && self.inner_boxes_per_carton == 0
            && self.loading_capacity_20gp == 0
            && self.loading_capacity_40hc == 0
            && (notes.is_empty() || notes == UNSPECIFIED_NOTES)
    }
}

fn default_notes() -> String {
    UNSPECIFIED_NOTES.to_string()
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// One size/packaging option of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variation {
    pub size: String,
    #[serde(default)]
    pub picture: bool,
    #[serde(default)]
    pub ce: bool,
    #[serde(default)]
    pub ce_mdr: bool,
    #[serde(default)]
    pub fda: bool,
    #[serde(default)]
    pub iso: Vec<String>,
    #[serde(default)]
    pub pcs_inner: Option<i64>,
    #[serde(default)]
    pub pcs_outer: Option<i64>,
    #[serde(default)]
    pub loading_capacity: LoadingCapacity,
    #[serde(default)]
    pub carton_size: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingCapacity {
    #[serde(rename = "20GP", default)]
    pub gp20: Option<i64>,
    #[serde(rename = "40HC", default)]
    pub hc40: Option<i64>,
}

/// Data-quality findings for a catalog file. Never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogIssues {
    /// Zero-based positions of entries with a blank `referenceString`.
    pub blank_references: Vec<usize>,
    /// References that occur more than once, each listed once.
    pub duplicate_references: Vec<String>,
}

impl CatalogIssues {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.blank_references.is_empty() && self.duplicate_references.is_empty()
    }
}

/// Checks the catalog-wide invariants on `referenceString`.
#[must_use]
pub fn validate_catalog(entries: &[CatalogEntry]) -> CatalogIssues {
    let mut issues = CatalogIssues::default();
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();

    for (idx, entry) in entries.iter().enumerate() {
        let reference = entry.data.reference_string.trim();
        if reference.is_empty() {
            issues.blank_references.push(idx);
            continue;
        }
        if !seen.insert(reference) && reported.insert(reference) {
            issues.duplicate_references.push(reference.to_string());
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        let mut product = Product::parent("Disposable Syringe", "4.1.1");
        product.category = Some(59);
        product.category_name = Some("SYRINGES".to_string());
        product.divisions = vec![48];
        product.division_names = vec!["INJECTION".to_string()];
        product.variations.push(Variation {
            size: "5 ml".to_string(),
            picture: true,
            ce: true,
            ce_mdr: false,
            fda: true,
            iso: vec!["ISO 7886-1".to_string()],
            pcs_inner: Some(100),
            pcs_outer: None,
            loading_capacity: LoadingCapacity {
                gp20: Some(1200),
                hc40: None,
            },
            carton_size: "60x40x40".to_string(),
        });
        product
    }

    #[test]
    fn catalog_entry_round_trips_exactly() {
        let entries = vec![CatalogEntry::from(sample_product())];
        let json = serde_json::to_string(&entries).unwrap();
        let back: Vec<CatalogEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entries);
    }

    #[test]
    fn packaging_uses_cms_key_names() {
        let json = serde_json::to_value(sample_product()).unwrap();
        let packaging = &json["PackagingInformation"];
        assert_eq!(packaging["loading_capacity_20GP"], 0);
        assert_eq!(packaging["additional_notes"], "Not specified");
        assert_eq!(json["referenceString"], "4.1.1");
        assert_eq!(json["variations"][0]["loading_capacity"]["20GP"], 1200);
        assert!(json["variations"][0]["loading_capacity"]["40HC"].is_null());
        assert!(json.get("slug").is_none(), "unassigned slug is omitted");
    }

    #[test]
    fn camel_case_packaging_key_is_accepted() {
        let json = serde_json::json!({
            "name": "Gauze",
            "referenceString": "7.1",
            "packagingInformation": { "packing_per_inner_box": 10, "loading_capacity_20GP": null }
        });
        let product: Product = serde_json::from_value(json).unwrap();
        assert_eq!(product.packaging_information.packing_per_inner_box, 10);
        assert_eq!(product.packaging_information.loading_capacity_20gp, 0);
        assert_eq!(product.packaging_information.additional_notes, UNSPECIFIED_NOTES);
        assert!(product.category.is_none());
    }

    #[test]
    fn default_packaging_is_unspecified() {
        assert!(PackagingInformation::default().is_unspecified());
    }

    #[test]
    fn partially_filled_packaging_is_specified() {
        let packaging = PackagingInformation {
            inner_boxes_per_carton: 12,
            ..PackagingInformation::default()
        };
        assert!(!packaging.is_unspecified());

        let notes_only = PackagingInformation {
            additional_notes: "Sterile, single use".to_string(),
            ..PackagingInformation::default()
        };
        assert!(!notes_only.is_unspecified());
    }

    #[test]
    fn unknown_text_covers_blank_and_sentinel() {
        assert!(is_unknown_text(""));
        assert!(is_unknown_text("  ???  "));
        assert!(!is_unknown_text("ISO 13485"));
    }

    #[test]
    fn validate_catalog_reports_blank_and_duplicate_references() {
        let entries = vec![
            CatalogEntry::from(Product::parent("A", "1.1")),
            CatalogEntry::from(Product::parent("B", " ")),
            CatalogEntry::from(Product::parent("C", "1.1")),
            CatalogEntry::from(Product::parent("D", "1.1")),
        ];
        let issues = validate_catalog(&entries);
        assert_eq!(issues.blank_references, vec![1]);
        assert_eq!(issues.duplicate_references, vec!["1.1".to_string()]);
        assert!(!issues.is_clean());
    }
}

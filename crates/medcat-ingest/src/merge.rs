//! Product merger: slide-extracted fields fill gaps in catalog records.
//!
//! The catalog value always wins when it is present. Packaging merges as a
//! whole object: a partially filled record on the catalog side blocks the
//! slide value entirely.

use std::collections::HashMap;

use medcat_core::{is_unknown_text, CatalogEntry, Product};
use serde::Serialize;

use crate::slides::{SlideContent, SlidePayload, SlideRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MergeField {
    #[serde(rename = "standard")]
    Standard,
    #[serde(rename = "description")]
    Description,
    #[serde(rename = "tableInMd")]
    TableInMd,
    #[serde(rename = "PackagingInformation")]
    PackagingInformation,
    #[serde(rename = "images")]
    Images,
}

impl MergeField {
    pub const ALL: [MergeField; 5] = [
        MergeField::Standard,
        MergeField::Description,
        MergeField::TableInMd,
        MergeField::PackagingInformation,
        MergeField::Images,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MergeField::Standard => "standard",
            MergeField::Description => "description",
            MergeField::TableInMd => "tableInMd",
            MergeField::PackagingInformation => "PackagingInformation",
            MergeField::Images => "images",
        }
    }

    fn is_empty_in(self, product: &Product) -> bool {
        match self {
            MergeField::Standard => is_unknown_text(&product.standard),
            MergeField::Description => is_unknown_text(&product.description),
            MergeField::TableInMd => is_unknown_text(&product.table_in_md),
            MergeField::PackagingInformation => product.packaging_information.is_unspecified(),
            MergeField::Images => product.images.is_empty(),
        }
    }
}

impl std::fmt::Display for MergeField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn fill_text(target: &mut String, incoming: Option<&String>) -> bool {
    match incoming {
        Some(value) if !is_unknown_text(value) => {
            *target = value.trim().to_string();
            true
        }
        _ => false,
    }
}

/// Copy each mergeable slide field into `existing` where `existing` is empty
/// and the slide value is not. Returns the fields that were filled.
pub fn merge_slide(existing: &mut Product, slide: &SlidePayload) -> Vec<MergeField> {
    let mut filled = Vec::new();

    for field in MergeField::ALL {
        if !field.is_empty_in(existing) {
            continue;
        }
        let applied = match field {
            MergeField::Standard => fill_text(&mut existing.standard, slide.standard.as_ref()),
            MergeField::Description => {
                fill_text(&mut existing.description, slide.description.as_ref())
            }
            MergeField::TableInMd => fill_text(&mut existing.table_in_md, slide.table_in_md.as_ref()),
            MergeField::PackagingInformation => match &slide.packaging_information {
                Some(p) if !p.is_unspecified() => {
                    existing.packaging_information = p.clone();
                    true
                }
                _ => false,
            },
            MergeField::Images => {
                if slide.images.is_empty() {
                    false
                } else {
                    existing.images.clone_from(&slide.images);
                    true
                }
            }
        };
        if applied {
            filled.push(field);
        }
    }

    filled
}

/// Mergeable fields that are still empty.
#[must_use]
pub fn missing_fields(product: &Product) -> Vec<MergeField> {
    MergeField::ALL
        .into_iter()
        .filter(|f| f.is_empty_in(product))
        .collect()
}

/// Inclusive slide-number window; open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlideRange {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

impl SlideRange {
    #[must_use]
    pub fn contains(&self, slide: u32) -> bool {
        self.start.is_none_or(|s| slide >= s) && self.end.is_none_or(|e| slide <= e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteProduct {
    #[serde(rename = "referenceString")]
    pub reference_string: String,
    pub missing: Vec<MergeField>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// References that gained at least one field.
    pub updated: Vec<String>,
    /// Slide references with no catalog product, or `slide_<n>` when the
    /// slide yielded no reference at all.
    pub unmatched_slides: Vec<String>,
    pub incomplete_products: Vec<IncompleteProduct>,
}

/// Merge every in-range slide into the catalog and report what is left.
///
/// `content` supplies slide tables by slide number for records whose own
/// `tableInMd` is blank.
pub fn merge_catalog(
    entries: &mut [CatalogEntry],
    slides: &[SlideRecord],
    content: &[SlideContent],
    range: SlideRange,
) -> MergeReport {
    let mut report = MergeReport::default();

    let mut by_reference: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, entry) in entries.iter().enumerate() {
        by_reference
            .entry(entry.data.reference_string.trim().to_string())
            .or_default()
            .push(idx);
    }
    for (reference, indices) in &by_reference {
        if indices.len() > 1 {
            tracing::warn!(
                reference = %reference,
                entries = indices.len(),
                "duplicate reference in catalog; slides merge into every copy"
            );
        }
    }
    let content_by_slide: HashMap<u32, &SlideContent> =
        content.iter().map(|c| (c.slide_number, c)).collect();

    for record in slides.iter().filter(|r| range.contains(r.slide_number)) {
        let payload = record.payload(content_by_slide.get(&record.slide_number).copied());
        let Some(reference) = payload.reference() else {
            report
                .unmatched_slides
                .push(format!("slide_{}", record.slide_number));
            continue;
        };
        let Some(indices) = by_reference.get(reference) else {
            tracing::warn!(slide = record.slide_number, reference, "slide matches no product");
            report.unmatched_slides.push(reference.to_string());
            continue;
        };

        let mut changed = false;
        for &idx in indices {
            let filled = merge_slide(&mut entries[idx].data, &payload);
            if !filled.is_empty() {
                tracing::debug!(
                    slide = record.slide_number,
                    reference,
                    fields = ?filled,
                    "merged slide fields"
                );
                changed = true;
            }
        }
        if changed && !report.updated.iter().any(|r| r == reference) {
            report.updated.push(reference.to_string());
        }
    }

    report.incomplete_products = entries
        .iter()
        .filter_map(|e| {
            let missing = missing_fields(&e.data);
            (!missing.is_empty()).then(|| IncompleteProduct {
                reference_string: e.data.reference_string.clone(),
                missing,
            })
        })
        .collect();

    report
}

#[cfg(test)]
#[path = "merge_test.rs"]
mod tests;

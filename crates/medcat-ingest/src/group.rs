//! Row grouping: variation rows under one parent product per reference.
//!
//! Workbooks use merged cells for the product-level columns, so after reading
//! only the first row of a product carries its reference, name and category.
//! [`forward_fill`] restores those values, then [`group_rows`] turns every row
//! with a size into a [`Variation`] of its reference's product.

use std::collections::{HashMap, HashSet};

use medcat_core::{LoadingCapacity, Product, Variation};

use crate::headers::{CanonicalField, ColumnMap};
use crate::parse::{clean_text, parse_bool, parse_int, parse_list};

/// Product-level columns that inherit the nearest non-blank value above.
const CARRIED_FIELDS: &[CanonicalField] = &[
    CanonicalField::Reference,
    CanonicalField::ProductName,
    CanonicalField::CategoryName,
];

/// One data row with canonical headers applied. Blank cells are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetRow {
    /// One-based spreadsheet row number, for reports.
    pub row_number: usize,
    values: HashMap<CanonicalField, String>,
    /// One slot per division column, in column order.
    divisions: Vec<Option<String>>,
}

impl SheetRow {
    #[must_use]
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            ..Self::default()
        }
    }

    /// Builder used by fixtures: set a single-valued field.
    #[must_use]
    pub fn with(mut self, field: CanonicalField, value: &str) -> Self {
        self.set(field, Some(value));
        self
    }

    /// Builder used by fixtures: append a division column value.
    #[must_use]
    pub fn with_division(mut self, value: Option<&str>) -> Self {
        self.divisions.push(non_blank(value));
        self
    }

    /// Project a raw row through a column map.
    #[must_use]
    pub fn from_cells(row_number: usize, cells: &[Option<String>], columns: &ColumnMap) -> Self {
        let cell = |idx: usize| cells.get(idx).and_then(Option::as_deref);
        let mut row = Self::new(row_number);
        for field in ALL_SINGLE_FIELDS {
            if let Some(idx) = columns.get(*field) {
                row.set(*field, cell(idx));
            }
        }
        row.divisions = columns
            .division_columns()
            .iter()
            .map(|idx| non_blank(cell(*idx)))
            .collect();
        row
    }

    #[must_use]
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    fn set(&mut self, field: CanonicalField, value: Option<&str>) {
        match non_blank(value) {
            Some(v) => {
                self.values.insert(field, v);
            }
            None => {
                self.values.remove(&field);
            }
        }
    }

    /// Non-blank division labels, first occurrence only.
    #[must_use]
    pub fn division_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.divisions
            .iter()
            .flatten()
            .filter(|d| seen.insert(d.to_lowercase()))
            .cloned()
            .collect()
    }
}

const ALL_SINGLE_FIELDS: &[CanonicalField] = &[
    CanonicalField::Reference,
    CanonicalField::CategoryName,
    CanonicalField::ProductName,
    CanonicalField::Size,
    CanonicalField::Picture,
    CanonicalField::Ce,
    CanonicalField::CeMdr,
    CanonicalField::Fda,
    CanonicalField::Iso,
    CanonicalField::PcsInner,
    CanonicalField::PcsOuter,
    CanonicalField::Loading20gp,
    CanonicalField::Loading40hc,
    CanonicalField::CartonSize,
];

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Fill blank carried cells from the nearest preceding non-blank value.
///
/// Each carried column and each division column is filled independently.
pub fn forward_fill(rows: &mut [SheetRow]) {
    let mut last: HashMap<CanonicalField, String> = HashMap::new();
    let mut last_divisions: Vec<Option<String>> = Vec::new();

    for row in rows.iter_mut() {
        for field in CARRIED_FIELDS {
            match row.values.get(field) {
                Some(value) => {
                    last.insert(*field, value.clone());
                }
                None => {
                    if let Some(previous) = last.get(field) {
                        row.values.insert(*field, previous.clone());
                    }
                }
            }
        }

        if last_divisions.len() < row.divisions.len() {
            last_divisions.resize(row.divisions.len(), None);
        }
        for (slot, previous) in row.divisions.iter_mut().zip(last_divisions.iter_mut()) {
            match slot {
                Some(value) => *previous = Some(value.clone()),
                None => slot.clone_from(previous),
            }
        }
    }
}

/// Build a [`Variation`] from one row's variation-level cells.
#[must_use]
pub fn build_variation(row: &SheetRow) -> Variation {
    Variation {
        size: clean_text(row.get(CanonicalField::Size)),
        picture: parse_bool(row.get(CanonicalField::Picture)),
        ce: parse_bool(row.get(CanonicalField::Ce)),
        ce_mdr: parse_bool(row.get(CanonicalField::CeMdr)),
        fda: parse_bool(row.get(CanonicalField::Fda)),
        iso: parse_list(row.get(CanonicalField::Iso)),
        pcs_inner: parse_int(row.get(CanonicalField::PcsInner)),
        pcs_outer: parse_int(row.get(CanonicalField::PcsOuter)),
        loading_capacity: LoadingCapacity {
            gp20: parse_int(row.get(CanonicalField::Loading20gp)),
            hc40: parse_int(row.get(CanonicalField::Loading40hc)),
        },
        carton_size: clean_text(row.get(CanonicalField::CartonSize)),
    }
}

/// All rows sharing one reference string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductGroup {
    pub reference: String,
    pub name: String,
    pub category_name: Option<String>,
    pub division_names: Vec<String>,
    pub variations: Vec<Variation>,
    /// Spreadsheet row that seeded the group.
    pub first_row: usize,
}

impl ProductGroup {
    fn seed(reference: &str, row: &SheetRow) -> Self {
        Self {
            reference: reference.to_string(),
            name: clean_text(row.get(CanonicalField::ProductName)),
            category_name: non_blank(row.get(CanonicalField::CategoryName)),
            division_names: row.division_names(),
            variations: Vec::new(),
            first_row: row.row_number,
        }
    }

    /// Canonical record with lookups still pending.
    #[must_use]
    pub fn into_product(self) -> Product {
        let mut product = Product::parent(&self.name, &self.reference);
        product.category_name = self.category_name;
        product.division_names = self.division_names;
        product.variations = self.variations;
        product
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupOutcome {
    pub groups: Vec<ProductGroup>,
    /// Rows without a size after forward-fill (headers, separators).
    pub dropped_rows: Vec<usize>,
    /// Rows with a size but no reference, even after forward-fill.
    pub rows_without_reference: Vec<usize>,
    /// References seen only on dropped rows; no product was produced.
    pub references_without_variations: Vec<String>,
}

/// Group forward-filled rows into products, in first-seen reference order.
#[must_use]
pub fn group_rows(rows: &[SheetRow]) -> GroupOutcome {
    let mut outcome = GroupOutcome::default();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut orphaned: Vec<String> = Vec::new();

    for row in rows {
        let reference = row.get(CanonicalField::Reference);

        if row.get(CanonicalField::Size).is_none() {
            outcome.dropped_rows.push(row.row_number);
            if let Some(r) = reference {
                if !orphaned.iter().any(|o| o == r) {
                    orphaned.push(r.to_string());
                }
            }
            continue;
        }

        let Some(reference) = reference else {
            tracing::warn!(row = row.row_number, "skipping row with a size but no reference");
            outcome.rows_without_reference.push(row.row_number);
            continue;
        };

        let slot = *index.entry(reference.to_string()).or_insert_with(|| {
            outcome.groups.push(ProductGroup::seed(reference, row));
            outcome.groups.len() - 1
        });
        outcome.groups[slot].variations.push(build_variation(row));
    }

    outcome.references_without_variations = orphaned
        .into_iter()
        .filter(|r| !index.contains_key(r))
        .collect();

    if !outcome.references_without_variations.is_empty() {
        tracing::warn!(
            count = outcome.references_without_variations.len(),
            "references with no variation rows produced no product"
        );
    }

    outcome
}

/// One parent-only group per reference, regardless of size, in first-seen
/// order.
#[must_use]
pub fn parent_groups(rows: &[SheetRow]) -> Vec<ProductGroup> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| {
            let reference = row.get(CanonicalField::Reference)?;
            seen.insert(reference.to_string())
                .then(|| ProductGroup::seed(reference, row))
        })
        .collect()
}

#[cfg(test)]
#[path = "group_test.rs"]
mod tests;

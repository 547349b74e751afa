use super::*;
use crate::headers::{dedupe_headers, resolve_columns, HeaderAliases, DEFAULT_PREFERRED};

fn row(n: usize) -> SheetRow {
    SheetRow::new(n)
}

// -----------------------------------------------------------------------
// forward_fill + group_rows
// -----------------------------------------------------------------------

#[test]
fn forward_fill_then_group_yields_two_products() {
    let mut rows = vec![
        row(2).with(CanonicalField::Reference, "1.1").with(CanonicalField::Size, "S"),
        row(3).with(CanonicalField::Size, "M"),
        row(4).with(CanonicalField::Reference, "1.2").with(CanonicalField::Size, "L"),
    ];
    forward_fill(&mut rows);
    let outcome = group_rows(&rows);

    assert_eq!(outcome.groups.len(), 2);
    assert_eq!(outcome.groups[0].reference, "1.1");
    let sizes: Vec<&str> = outcome.groups[0]
        .variations
        .iter()
        .map(|v| v.size.as_str())
        .collect();
    assert_eq!(sizes, vec!["S", "M"]);
    assert_eq!(outcome.groups[1].reference, "1.2");
    assert_eq!(outcome.groups[1].variations.len(), 1);
    assert_eq!(outcome.groups[1].variations[0].size, "L");
}

#[test]
fn first_row_seeds_name_and_category() {
    let mut rows = vec![
        row(2)
            .with(CanonicalField::Reference, "4.1.1")
            .with(CanonicalField::ProductName, "Syringe")
            .with(CanonicalField::CategoryName, "SYRINGES")
            .with(CanonicalField::Size, "2 ml"),
        row(3)
            .with(CanonicalField::ProductName, "Renamed later")
            .with(CanonicalField::Size, "5 ml"),
    ];
    forward_fill(&mut rows);
    let outcome = group_rows(&rows);

    let group = &outcome.groups[0];
    assert_eq!(group.name, "Syringe");
    assert_eq!(group.category_name.as_deref(), Some("SYRINGES"));
    assert_eq!(group.variations.len(), 2);
    assert_eq!(group.first_row, 2);
}

#[test]
fn rows_without_size_are_dropped_and_orphan_references_reported() {
    let mut rows = vec![
        row(2).with(CanonicalField::Reference, "9.0").with(CanonicalField::ProductName, "Section"),
        row(3).with(CanonicalField::Reference, "9.1").with(CanonicalField::Size, "One size"),
        row(4),
    ];
    forward_fill(&mut rows);
    let outcome = group_rows(&rows);

    assert_eq!(outcome.groups.len(), 1);
    assert_eq!(outcome.dropped_rows, vec![2, 4]);
    assert_eq!(outcome.references_without_variations, vec!["9.0".to_string()]);
}

#[test]
fn size_without_reference_is_counted_not_grouped() {
    let rows = vec![row(2).with(CanonicalField::Size, "XL")];
    let outcome = group_rows(&rows);
    assert!(outcome.groups.is_empty());
    assert_eq!(outcome.rows_without_reference, vec![2]);
}

#[test]
fn interleaved_references_keep_first_seen_order() {
    let rows = vec![
        row(2).with(CanonicalField::Reference, "2.1").with(CanonicalField::Size, "A"),
        row(3).with(CanonicalField::Reference, "1.1").with(CanonicalField::Size, "B"),
        row(4).with(CanonicalField::Reference, "2.1").with(CanonicalField::Size, "C"),
    ];
    let outcome = group_rows(&rows);
    let refs: Vec<&str> = outcome.groups.iter().map(|g| g.reference.as_str()).collect();
    assert_eq!(refs, vec!["2.1", "1.1"]);
    assert_eq!(outcome.groups[0].variations.len(), 2);
}

#[test]
fn division_columns_fill_independently() {
    let mut rows = vec![
        row(2)
            .with(CanonicalField::Reference, "3.1")
            .with(CanonicalField::Size, "S")
            .with_division(Some("INFUSION"))
            .with_division(Some("INJECTION")),
        row(3)
            .with(CanonicalField::Reference, "3.2")
            .with(CanonicalField::Size, "S")
            .with_division(None)
            .with_division(Some("UROLOGY")),
    ];
    forward_fill(&mut rows);
    assert_eq!(rows[1].division_names(), vec!["INFUSION", "UROLOGY"]);
}

#[test]
fn division_names_are_deduplicated() {
    let r = row(2)
        .with_division(Some("Infusion"))
        .with_division(Some("INFUSION"))
        .with_division(None);
    assert_eq!(r.division_names(), vec!["Infusion"]);
}

// -----------------------------------------------------------------------
// build_variation / from_cells
// -----------------------------------------------------------------------

#[test]
fn build_variation_parses_every_column() {
    let r = row(5)
        .with(CanonicalField::Size, " 21G ")
        .with(CanonicalField::Picture, "yes")
        .with(CanonicalField::Ce, "YES")
        .with(CanonicalField::CeMdr, "n/a")
        .with(CanonicalField::Fda, "no")
        .with(CanonicalField::Iso, "ISO 7864/ISO 9626")
        .with(CanonicalField::PcsInner, "100")
        .with(CanonicalField::PcsOuter, "5,000")
        .with(CanonicalField::Loading20gp, "250 cartons")
        .with(CanonicalField::CartonSize, "50x30x40 cm");
    let v = build_variation(&r);
    assert_eq!(v.size, "21G");
    assert!(v.picture && v.ce);
    assert!(!v.ce_mdr && !v.fda);
    assert_eq!(v.iso, vec!["ISO 7864", "ISO 9626"]);
    assert_eq!(v.pcs_inner, Some(100));
    assert_eq!(v.pcs_outer, Some(5000));
    assert_eq!(v.loading_capacity.gp20, Some(250));
    assert_eq!(v.loading_capacity.hc40, None);
    assert_eq!(v.carton_size, "50x30x40 cm");
}

#[test]
fn from_cells_projects_through_column_map() {
    let raw: Vec<String> = ["ID", "Product", "Size", "Division", "ID"]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    let aliases = HeaderAliases::builtin().unwrap();
    let columns = resolve_columns(&dedupe_headers(&raw), &aliases, DEFAULT_PREFERRED);
    let cells = vec![
        Some("old".to_string()),
        Some("Gauze swab".to_string()),
        Some("  ".to_string()),
        Some("WOUND MANAGEMENT".to_string()),
        Some("7.1".to_string()),
    ];
    let r = SheetRow::from_cells(10, &cells, &columns);
    assert_eq!(r.get(CanonicalField::Reference), Some("7.1"));
    assert_eq!(r.get(CanonicalField::ProductName), Some("Gauze swab"));
    assert_eq!(r.get(CanonicalField::Size), None, "blank cells are absent");
    assert_eq!(r.division_names(), vec!["WOUND MANAGEMENT"]);
}

#[test]
fn parent_groups_include_references_without_sizes() {
    let rows = vec![
        row(2).with(CanonicalField::Reference, "1.1").with(CanonicalField::ProductName, "A"),
        row(3).with(CanonicalField::Reference, "1.1").with(CanonicalField::Size, "S"),
        row(4).with(CanonicalField::Reference, "1.2").with(CanonicalField::ProductName, "B"),
    ];
    let parents = parent_groups(&rows);
    assert_eq!(parents.len(), 2);
    assert!(parents.iter().all(|p| p.variations.is_empty()));
    let product = parents[1].clone().into_product();
    assert_eq!(product.reference_string, "1.2");
    assert_eq!(product.name, "B");
    assert!(product.category.is_none());
}

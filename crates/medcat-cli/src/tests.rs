use std::collections::HashMap;

use medcat_core::{
    AppConfig, CatalogEntry, Environment, LookupDefaults, MappingTable, Product, Variation,
};
use medcat_ingest::{
    LookupKind, LookupResolver, MatchReason, PolicyDecision, ProductGroup, UnresolvedLookup,
    UnresolvedPolicy,
};

use super::*;
use crate::catalog::{attach_variations, missing_products, OnUnresolved};
use crate::categories::{apply_curated, category_labels, find_problems, fix_problems};
use crate::upload::{select_items, suffixed_slug};

fn entry(name: &str, reference: &str, category: Option<&str>) -> CatalogEntry {
    let mut product = Product::parent(name, reference);
    product.category_name = category.map(str::to_string);
    CatalogEntry::from(product)
}

fn variation(size: &str) -> Variation {
    Variation {
        size: size.to_string(),
        picture: false,
        ce: true,
        ce_mdr: false,
        fda: false,
        iso: Vec::new(),
        pcs_inner: None,
        pcs_outer: None,
        loading_capacity: medcat_core::LoadingCapacity::default(),
        carton_size: String::new(),
    }
}

fn group(reference: &str, name: &str, sizes: &[&str]) -> ProductGroup {
    ProductGroup {
        reference: reference.to_string(),
        name: name.to_string(),
        category_name: Some("IV Cannula".to_string()),
        division_names: Vec::new(),
        variations: sizes.iter().map(|s| variation(s)).collect(),
        first_row: 2,
    }
}

fn live_categories() -> MappingTable {
    [
        (59, "IV Cannula".to_string()),
        (60, "Infusion Sets".to_string()),
        (61, "Urinary Catheters".to_string()),
    ]
    .into_iter()
    .collect()
}

fn resolver() -> LookupResolver {
    let mut defaults = LookupDefaults::default();
    defaults
        .category_aliases
        .insert("URINE BAGS".to_string(), "Urinary Catheters".to_string());
    LookupResolver::new(live_categories(), MappingTable::new(), defaults)
}

fn config(dir: &std::path::Path) -> AppConfig {
    AppConfig {
        env: Environment::Test,
        log_level: "info".to_string(),
        cms_url: "http://localhost:1337".to_string(),
        cms_token: None,
        cms_collection: "medical-products".to_string(),
        lookups_path: dir.join("lookups.yaml"),
        artifacts_dir: dir.join("artifacts"),
        request_timeout_secs: 5,
        max_retries: 0,
        retry_backoff_ms: 0,
        inter_request_delay_ms: 0,
        batch_size: 5,
        auto_confirm: false,
        page_size: 100,
    }
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["medcat"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_import_with_defaults() {
    let cli = Cli::try_parse_from(["medcat", "import", "products.xlsx"]).unwrap();
    let Some(Commands::Import {
        source,
        output,
        parents_only,
        lookups,
        report,
        dry_run,
    }) = cli.command
    else {
        panic!("expected import");
    };
    assert_eq!(source.workbook, PathBuf::from("products.xlsx"));
    assert_eq!(source.header_row, 1);
    assert!(source.sheet.is_none());
    assert_eq!(output, PathBuf::from("products.json"));
    assert!(!parents_only && !dry_run);
    assert!(report.is_none());
    assert_eq!(lookups.on_unresolved, OnUnresolved::Keep);
    assert_eq!(lookups.categories_map, PathBuf::from("categories_map.json"));
}

#[test]
fn parses_import_sheet_and_header_row() {
    let cli = Cli::try_parse_from([
        "medcat",
        "import",
        "book.xlsx",
        "--sheet",
        "Catalogue",
        "--header-row",
        "3",
        "--on-unresolved",
        "skip",
        "--parents-only",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Import {
            ref source,
            parents_only: true,
            ref lookups,
            ..
        }) if source.header_row == 3
            && source.sheet.as_deref() == Some("Catalogue")
            && lookups.on_unresolved == OnUnresolved::Skip
    ));
}

#[test]
fn parses_merge_slides_range() {
    let cli = Cli::try_parse_from([
        "medcat",
        "merge-slides",
        "slides.json",
        "--start",
        "10",
        "--end",
        "20",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::MergeSlides {
            start: Some(10),
            end: Some(20),
            content: None,
            ..
        })
    ));
}

#[test]
fn parses_mappings_fetch_defaults() {
    let cli = Cli::try_parse_from(["medcat", "mappings", "fetch"]).unwrap();
    let Some(Commands::Mappings {
        command:
            MappingsCommands::Fetch {
                categories_collection,
                divisions_collection,
                ..
            },
    }) = cli.command
    else {
        panic!("expected mappings fetch");
    };
    assert_eq!(categories_collection, "categories");
    assert_eq!(divisions_collection, "divisions");
}

#[test]
fn parses_categories_problems() {
    let cli = Cli::try_parse_from(["medcat", "categories", "problems"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Categories {
            command: CategoriesCommands::Problems { .. }
        })
    ));
}

#[test]
fn parses_upload_flags() {
    let cli = Cli::try_parse_from([
        "medcat",
        "upload",
        "--batch-size",
        "10",
        "--yes",
        "--start",
        "40",
        "--progress",
        "progress.json",
        "--resume",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Upload {
            batch_size: Some(10),
            yes: true,
            start: 40,
            limit: None,
            resume: true,
            ..
        })
    ));
}

#[test]
fn resume_requires_progress_file() {
    assert!(Cli::try_parse_from(["medcat", "upload", "--resume"]).is_err());
}

#[test]
fn delete_needs_exactly_one_target() {
    assert!(Cli::try_parse_from(["medcat", "delete"]).is_err());
    assert!(Cli::try_parse_from(["medcat", "delete", "--id", "3", "--reference", "2.1"]).is_err());
    assert!(matches!(
        Cli::try_parse_from(["medcat", "delete", "--reference", "2.1"])
            .unwrap()
            .command,
        Some(Commands::Delete { id: None, .. })
    ));
}

#[test]
fn parses_ping() {
    let cli = Cli::try_parse_from(["medcat", "ping"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Ping)));
}

// ---------------------------------------------------------------------------
// Lookup policy
// ---------------------------------------------------------------------------

fn lookup_args(extra: &[&str]) -> catalog::LookupArgs {
    let mut args = vec!["medcat", "resolve-ids"];
    args.extend_from_slice(extra);
    match Cli::try_parse_from(args).unwrap().command {
        Some(Commands::ResolveIds { lookups, .. }) => lookups,
        other => panic!("expected resolve-ids, got {other:?}"),
    }
}

#[test]
fn default_policy_requires_an_id() {
    assert!(lookup_args(&["--on-unresolved", "default"]).policy().is_err());
}

#[test]
fn default_policy_substitutes_per_kind() {
    let policy = lookup_args(&["--on-unresolved", "default", "--default-division", "53"])
        .policy()
        .unwrap();
    let division = UnresolvedLookup {
        reference: "2.1",
        kind: LookupKind::Division,
        label: "UROLOGY",
    };
    let category = UnresolvedLookup {
        kind: LookupKind::Category,
        ..division
    };
    assert_eq!(policy.decide(&division), PolicyDecision::UseDefault(53));
    assert_eq!(policy.decide(&category), PolicyDecision::KeepNull);
}

#[test]
fn resolver_tolerates_missing_cache_and_lookups_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut args = lookup_args(&[]);
    args.categories_map = dir.path().join("categories_map.json");
    args.divisions_map = dir.path().join("divisions_map.json");

    let resolver = args.resolver(&config(dir.path())).unwrap();
    assert_eq!(resolver.resolve_category("IV Cannula").id(), None);
}

// ---------------------------------------------------------------------------
// Catalog transforms
// ---------------------------------------------------------------------------

#[test]
fn attach_variations_replaces_and_limits() {
    let mut entries = vec![entry("Cannula", "2.1", None), entry("Gauze", "4.1", None)];
    let groups = vec![
        group("2.1", "Cannula", &["G18", "G20", "G22"]),
        group("9.9", "Other", &["S"]),
    ];

    let updated = attach_variations(&mut entries, groups, None, Some(2));

    assert_eq!(updated, 1);
    let sizes: Vec<_> = entries[0].data.variations.iter().map(|v| v.size.as_str()).collect();
    assert_eq!(sizes, ["G18", "G20"]);
    assert!(entries[1].data.variations.is_empty());
}

#[test]
fn attach_variations_only_ref_leaves_others_alone() {
    let mut entries = vec![entry("Cannula", "2.1", None), entry("Gauze", "4.1", None)];
    let groups = vec![group("2.1", "Cannula", &["G18"]), group("4.1", "Gauze", &["5x5"])];

    assert_eq!(attach_variations(&mut entries, groups, Some("4.1"), None), 1);
    assert!(entries[0].data.variations.is_empty());
    assert_eq!(entries[1].data.variations.len(), 1);
}

#[test]
fn missing_products_are_sorted_and_exclude_known_references() {
    let entries = vec![entry("Cannula", "2.1", None)];
    let groups = vec![
        group("7.2", "Mask", &["M"]),
        group("2.1", "Cannula", &["G18"]),
        group("3.4", "Tube", &["S", "L"]),
    ];

    let missing = missing_products(&entries, groups);

    let references: Vec<_> = missing.iter().map(|p| p.reference_string.as_str()).collect();
    assert_eq!(references, ["3.4", "7.2"]);
    assert_eq!(missing[0].variations.len(), 2);
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[test]
fn category_labels_count_and_suggest() {
    let entries = vec![
        entry("A", "1", Some("iv cannula")),
        entry("B", "2", Some("iv cannula")),
        entry("C", "3", Some("URINE BAGS")),
        entry("D", "4", Some("Infusion")),
        entry("E", "5", None),
    ];

    let labels = category_labels(&entries, &resolver());

    assert_eq!(labels.len(), 3);
    assert_eq!(labels[0].label, "Infusion");
    assert_eq!(
        labels[0].suggestion.as_ref().map(|s| s.reason),
        Some(MatchReason::Substring)
    );
    assert_eq!(labels[2].label, "iv cannula");
    assert_eq!(labels[2].products, 2);
}

#[test]
fn apply_curated_skips_guesses() {
    let mut entries = vec![
        entry("A", "1", Some("iv cannula")),
        entry("C", "3", Some("URINE BAGS")),
        entry("D", "4", Some("Infusion")),
    ];
    let labels = category_labels(&entries, &resolver());

    let changed = apply_curated(&mut entries, &labels);

    assert_eq!(changed, 2);
    assert_eq!(entries[0].data.category_name.as_deref(), Some("IV Cannula"));
    assert_eq!(entries[0].data.category, Some(59));
    assert_eq!(entries[1].data.category_name.as_deref(), Some("Urinary Catheters"));
    assert_eq!(entries[1].data.category, Some(61));
    assert_eq!(entries[2].data.category_name.as_deref(), Some("Infusion"));
    assert_eq!(entries[2].data.category, None);
}

#[test]
fn problems_cover_missing_and_unknown_categories() {
    let entries = vec![
        entry("A", "1.1", Some("IV Cannula")),
        entry("B", "1.2", None),
        entry("C", "1.3", Some("Bandages")),
    ];

    let problems = find_problems(&entries, &live_categories());

    assert_eq!(problems.len(), 2);
    assert_eq!(problems[0].reference, "1.2");
    assert_eq!(problems[0].issue, "Missing category name");
    assert_eq!(problems[1].issue, "Category not in production: \"Bandages\"");
}

#[test]
fn numeric_category_label_is_a_problem() {
    let mut entries = vec![entry("A", "1.1", Some("59")), entry("B", "1.2", Some("IV Cannula"))];

    let problems = find_problems(&entries, &live_categories());
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].reference, "1.1");
    assert_eq!(problems[0].issue, "Category not in production: \"59\"");

    let workbook: HashMap<String, String> = [("1.1".to_string(), "60".to_string())]
        .into_iter()
        .collect();
    let changed = fix_problems(&mut entries, &live_categories(), &workbook);
    assert_eq!(changed, 1);
    assert_eq!(entries[0].data.category_name.as_deref(), Some("60"));
    assert_eq!(entries[0].data.category, None);
}

#[test]
fn fix_problems_uses_workbook_category() {
    let mut entries = vec![
        entry("A", "1.1", Some("IV Cannula")),
        entry("B", "1.2", None),
        entry("C", "1.3", Some("Bandages")),
    ];
    let workbook: HashMap<String, String> = [
        ("1.1".to_string(), "Infusion Sets".to_string()),
        ("1.2".to_string(), "Urinary Catheters".to_string()),
        ("1.3".to_string(), "Wound Care".to_string()),
    ]
    .into_iter()
    .collect();

    let changed = fix_problems(&mut entries, &live_categories(), &workbook);

    assert_eq!(changed, 2);
    assert_eq!(entries[0].data.category_name.as_deref(), Some("IV Cannula"));
    assert_eq!(entries[1].data.category_name.as_deref(), Some("Urinary Catheters"));
    assert_eq!(entries[1].data.category, Some(61));
    assert_eq!(entries[2].data.category_name.as_deref(), Some("Wound Care"));
    assert_eq!(entries[2].data.category, None);
}

// ---------------------------------------------------------------------------
// Upload helpers
// ---------------------------------------------------------------------------

#[test]
fn select_items_windows_and_skips_done() {
    let products: Vec<Product> = (0..6)
        .map(|i| Product::parent(&format!("P{i}"), &format!("1.{i}")))
        .collect();

    let items = select_items(products, 1, Some(4), |index| index == 2);

    let indexes: Vec<_> = items.iter().map(|(i, _)| *i).collect();
    assert_eq!(indexes, [1, 3, 4]);
    assert_eq!(items[0].1.name, "P1");
}

#[test]
fn start_past_end_selects_nothing() {
    let products = vec![Product::parent("P", "1")];
    assert!(select_items(products, 5, None, |_| false).is_empty());
}

#[test]
fn suffixed_slug_prefers_existing_slug() {
    let mut product = Product::parent("Suction Tube", "8.1");
    assert_eq!(
        suffixed_slug(&product, "20240315_120000"),
        "suction-tube-20240315_120000"
    );
    product.slug = Some("suction-tube-2".to_string());
    assert_eq!(
        suffixed_slug(&product, "20240315_120000"),
        "suction-tube-2-20240315_120000"
    );
}

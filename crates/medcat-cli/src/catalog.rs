//! Catalog-building command handlers: workbook import, variation refresh,
//! missing-product backfill, slug assignment and id re-resolution.
//!
//! Every handler works on a local catalog file through
//! [`CatalogRepository`], so each save leaves a timestamped backup behind.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, ValueEnum};
use medcat_core::{
    assign_slugs, load_lookup_defaults, validate_catalog, AppConfig, CatalogEntry, CatalogIssues,
    LookupDefaults, Product,
};
use medcat_ingest::{
    apply_lookups, group_rows, keep_unresolved_as_null, load_rows, parent_groups, skip_unresolved,
    ColumnMap, HeaderAliases, HeaderMatch, LookupKind, LookupReport, LookupResolver,
    PolicyDecision, ProductGroup, SheetRow, UnresolvedLookup, UnresolvedPolicy, DEFAULT_PREFERRED,
};
use medcat_store::{read_mapping_or_empty, write_json_report, CatalogRepository};
use serde::Serialize;

/// Which workbook sheet to read and where its header sits.
#[derive(Debug, Args)]
pub struct WorkbookArgs {
    /// Product workbook (.xlsx)
    pub workbook: PathBuf,
    /// Sheet name (defaults to the first sheet)
    #[arg(long)]
    pub sheet: Option<String>,
    /// 1-based row holding the column headers
    #[arg(long, default_value_t = 1)]
    pub header_row: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnUnresolved {
    /// Leave products with an unresolved lookup out
    Skip,
    /// Keep them with a null id
    Keep,
    /// Substitute --default-category / --default-division
    Default,
}

/// Lookup tables and the unresolved-lookup policy.
#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Cached category table written by `mappings fetch`
    #[arg(long, default_value = "categories_map.json")]
    pub categories_map: PathBuf,
    /// Cached division table written by `mappings fetch`
    #[arg(long, default_value = "divisions_map.json")]
    pub divisions_map: PathBuf,
    /// What to do with a category or division that resolves to nothing
    #[arg(long, value_enum, default_value_t = OnUnresolved::Keep)]
    pub on_unresolved: OnUnresolved,
    /// Category id used with `--on-unresolved default`
    #[arg(long)]
    pub default_category: Option<i64>,
    /// Division id used with `--on-unresolved default`
    #[arg(long)]
    pub default_division: Option<i64>,
}

/// Substitutes fixed ids; a kind without one is kept as null.
#[derive(Debug, Clone, Copy)]
struct DefaultIds {
    category: Option<i64>,
    division: Option<i64>,
}

impl UnresolvedPolicy for DefaultIds {
    fn decide(&self, lookup: &UnresolvedLookup<'_>) -> PolicyDecision {
        let id = match lookup.kind {
            LookupKind::Category => self.category,
            LookupKind::Division => self.division,
        };
        id.map_or(PolicyDecision::KeepNull, PolicyDecision::UseDefault)
    }
}

impl LookupArgs {
    pub(crate) fn policy(&self) -> anyhow::Result<Box<dyn UnresolvedPolicy>> {
        let policy: Box<dyn UnresolvedPolicy> = match self.on_unresolved {
            OnUnresolved::Skip => Box::new(skip_unresolved),
            OnUnresolved::Keep => Box::new(keep_unresolved_as_null),
            OnUnresolved::Default => {
                if self.default_category.is_none() && self.default_division.is_none() {
                    anyhow::bail!(
                        "--on-unresolved default needs --default-category or --default-division"
                    );
                }
                Box::new(DefaultIds {
                    category: self.default_category,
                    division: self.default_division,
                })
            }
        };
        Ok(policy)
    }

    /// Resolver over the cached live tables plus the configured fallback
    /// defaults.
    pub(crate) fn resolver(&self, config: &AppConfig) -> anyhow::Result<LookupResolver> {
        let categories = read_mapping_or_empty(&self.categories_map)?;
        let divisions = read_mapping_or_empty(&self.divisions_map)?;
        Ok(LookupResolver::new(categories, divisions, lookup_defaults(config)?))
    }
}

/// Fallback lookup defaults from `MEDCAT_LOOKUPS_PATH`. A missing file means
/// no fallbacks; a malformed one is an error.
pub(crate) fn lookup_defaults(config: &AppConfig) -> anyhow::Result<LookupDefaults> {
    if !config.lookups_path.exists() {
        tracing::warn!(
            path = %config.lookups_path.display(),
            "lookups file not found, continuing without fallback ids"
        );
        return Ok(LookupDefaults::default());
    }
    load_lookup_defaults(&config.lookups_path)
        .with_context(|| format!("loading {}", config.lookups_path.display()))
}

pub(crate) fn read_workbook(args: &WorkbookArgs) -> anyhow::Result<(ColumnMap, Vec<SheetRow>)> {
    let aliases = HeaderAliases::builtin()?;
    load_rows(
        &args.workbook,
        args.sheet.as_deref(),
        args.header_row,
        &aliases,
        DEFAULT_PREFERRED,
    )
    .with_context(|| format!("reading workbook {}", args.workbook.display()))
}

/// Diagnostics written by `import --report`.
#[derive(Debug, Serialize)]
struct ImportReport<'a> {
    workbook: &'a Path,
    columns: &'a [HeaderMatch],
    dropped_rows: Vec<usize>,
    rows_without_reference: Vec<usize>,
    references_without_variations: Vec<String>,
    lookups: &'a LookupReport,
    validation: &'a CatalogIssues,
}

/// Build the catalog from the workbook and write it to `output`.
///
/// # Errors
///
/// Returns an error if the workbook, lookup tables or lookups file cannot be
/// read, or if the catalog or report cannot be written. Unresolved lookups
/// and duplicate references are reported, not fatal.
pub(crate) fn run_import(
    config: &AppConfig,
    source: &WorkbookArgs,
    output: &Path,
    parents_only: bool,
    lookups: &LookupArgs,
    report_path: Option<&Path>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let policy = lookups.policy()?;
    let resolver = lookups.resolver(config)?;
    let (columns, rows) = read_workbook(source)?;

    let mut outcome = if parents_only {
        medcat_ingest::GroupOutcome {
            groups: parent_groups(&rows),
            ..Default::default()
        }
    } else {
        group_rows(&rows)
    };
    let products: Vec<Product> = std::mem::take(&mut outcome.groups)
        .into_iter()
        .map(ProductGroup::into_product)
        .collect();

    let (products, lookup_report) = apply_lookups(products, &resolver, policy.as_ref());
    let entries: Vec<CatalogEntry> = products.into_iter().map(CatalogEntry::from).collect();

    let issues = validate_catalog(&entries);
    for reference in &issues.duplicate_references {
        tracing::warn!(reference = %reference, "duplicate reference in catalog");
    }

    if let Some(path) = report_path {
        let report = ImportReport {
            workbook: &source.workbook,
            columns: columns.diagnostics(),
            dropped_rows: outcome.dropped_rows,
            rows_without_reference: outcome.rows_without_reference,
            references_without_variations: outcome.references_without_variations,
            lookups: &lookup_report,
            validation: &issues,
        };
        write_json_report(path, &report)?;
    }

    let variations: usize = entries.iter().map(|e| e.data.variations.len()).sum();
    println!(
        "{} products, {variations} variations from {} rows",
        entries.len(),
        rows.len()
    );
    print_lookup_summary(&lookup_report);

    if dry_run {
        println!("dry-run: catalog not written to {}", output.display());
        return Ok(());
    }

    CatalogRepository::new(output).save(&entries)?;
    println!("wrote {}", output.display());
    Ok(())
}

/// Replace the variations of catalog products with the ones grouped from the
/// workbook. Returns how many products were updated.
pub(crate) fn attach_variations(
    entries: &mut [CatalogEntry],
    groups: Vec<ProductGroup>,
    only_ref: Option<&str>,
    limit: Option<usize>,
) -> usize {
    let mut by_reference: HashMap<String, ProductGroup> =
        groups.into_iter().map(|g| (g.reference.clone(), g)).collect();
    let mut updated = 0;

    for entry in entries.iter_mut() {
        let reference = entry.data.reference_string.trim();
        if only_ref.is_some_and(|r| r.trim() != reference) {
            continue;
        }
        let Some(group) = by_reference.remove(reference) else {
            tracing::debug!(reference, "no workbook rows for catalog product");
            continue;
        };
        let mut variations = group.variations;
        if let Some(limit) = limit {
            variations.truncate(limit);
        }
        entry.data.variations = variations;
        updated += 1;
    }

    updated
}

/// # Errors
///
/// Returns an error if the workbook or catalog cannot be read or the catalog
/// cannot be saved.
pub(crate) fn run_variations(
    source: &WorkbookArgs,
    catalog: &Path,
    only_ref: Option<&str>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let (_, rows) = read_workbook(source)?;
    let groups = group_rows(&rows).groups;

    let repo = CatalogRepository::new(catalog);
    let updated = repo.apply("variations", |entries| {
        attach_variations(entries, groups, only_ref, limit)
    })?;

    if updated == 0 {
        if let Some(reference) = only_ref {
            anyhow::bail!("reference {reference} not found in both catalog and workbook");
        }
    }
    println!("updated variations on {updated} products");
    Ok(())
}

/// Workbook products whose reference is absent from the catalog, sorted by
/// reference.
pub(crate) fn missing_products(entries: &[CatalogEntry], groups: Vec<ProductGroup>) -> Vec<Product> {
    let known: HashSet<&str> = entries
        .iter()
        .map(|e| e.data.reference_string.trim())
        .collect();
    let mut missing: Vec<Product> = groups
        .into_iter()
        .filter(|g| !known.contains(g.reference.as_str()))
        .map(ProductGroup::into_product)
        .collect();
    missing.sort_by(|a, b| a.reference_string.cmp(&b.reference_string));
    missing
}

/// # Errors
///
/// Returns an error if any input cannot be read or the catalog cannot be
/// saved.
pub(crate) fn run_missing(
    config: &AppConfig,
    source: &WorkbookArgs,
    catalog: &Path,
    lookups: &LookupArgs,
) -> anyhow::Result<()> {
    let policy = lookups.policy()?;
    let resolver = lookups.resolver(config)?;
    let (_, rows) = read_workbook(source)?;

    let repo = CatalogRepository::new(catalog);
    let mut entries = repo.load()?;
    let missing = missing_products(&entries, group_rows(&rows).groups);
    if missing.is_empty() {
        println!("catalog already has every workbook reference");
        return Ok(());
    }

    let (products, report) = apply_lookups(missing, &resolver, policy.as_ref());
    for product in &products {
        println!("  + {}  {}", product.reference_string, product.name);
    }
    let added = products.len();
    entries.extend(products.into_iter().map(CatalogEntry::from));
    repo.save(&entries)?;

    println!("added {added} products");
    print_lookup_summary(&report);
    Ok(())
}

/// # Errors
///
/// Returns an error if the catalog cannot be read or saved.
pub(crate) fn run_slugs(catalog: &Path, limit: Option<usize>) -> anyhow::Result<()> {
    let repo = CatalogRepository::new(catalog);
    let updated = repo.apply("slugs", |entries| assign_slugs(entries, limit))?;
    println!("assigned slugs to {updated} products");
    Ok(())
}

/// Re-run lookup resolution over an existing catalog, rewriting `category`
/// and `divisions` from the stored names.
///
/// # Errors
///
/// Returns an error for the `skip` policy, which would silently delete
/// catalog products, and for any read or save failure.
pub(crate) fn run_resolve_ids(
    config: &AppConfig,
    catalog: &Path,
    lookups: &LookupArgs,
) -> anyhow::Result<()> {
    if lookups.on_unresolved == OnUnresolved::Skip {
        anyhow::bail!("--on-unresolved skip would drop catalog products; use keep or default");
    }
    let policy = lookups.policy()?;
    let resolver = lookups.resolver(config)?;

    let repo = CatalogRepository::new(catalog);
    let entries = repo.load()?;
    let products = entries.into_iter().map(|e| e.data).collect();
    let (products, report) = apply_lookups(products, &resolver, policy.as_ref());
    let entries: Vec<CatalogEntry> = products.into_iter().map(CatalogEntry::from).collect();
    repo.save(&entries)?;

    print_lookup_summary(&report);
    Ok(())
}

pub(crate) fn print_lookup_summary(report: &LookupReport) {
    println!(
        "lookups: {} categories, {} divisions resolved ({} from fallback defaults, {} defaulted)",
        report.resolved_categories,
        report.resolved_divisions,
        report.fallback_hits,
        report.defaulted
    );
    if !report.missing.is_empty() {
        println!("unresolved lookups: {}", report.missing.len());
        for missing in &report.missing {
            let kind = match missing.kind {
                LookupKind::Category => "category",
                LookupKind::Division => "division",
            };
            println!("  {:<12}{kind:<10}{:?}", missing.reference, missing.label);
        }
    }
    if !report.skipped_references.is_empty() {
        println!("skipped products: {}", report.skipped_references.join(", "));
    }
}

//! Lookup-table and category maintenance handlers.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use clap::Subcommand;
use medcat_core::{AppConfig, CatalogEntry, MappingTable};
use medcat_ingest::{parent_groups, LookupResolver, Suggestion};
use medcat_store::{read_mapping_or_empty, write_json_report, write_mapping, CatalogRepository};
use serde::Serialize;

use crate::catalog::{lookup_defaults, read_workbook, WorkbookArgs};

#[derive(Debug, Subcommand)]
pub enum MappingsCommands {
    /// Download the category and division tables from the CMS
    Fetch {
        /// CMS collection holding categories
        #[arg(long, default_value = "categories")]
        categories_collection: String,
        /// CMS collection holding divisions
        #[arg(long, default_value = "divisions")]
        divisions_collection: String,
        #[arg(long, default_value = "categories_map.json")]
        categories_map: PathBuf,
        #[arg(long, default_value = "divisions_map.json")]
        divisions_map: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum CategoriesCommands {
    /// Compare catalog category names with the live table and suggest matches
    Sync {
        #[arg(long, default_value = "products.json")]
        catalog: PathBuf,
        #[arg(long, default_value = "categories_map.json")]
        categories_map: PathBuf,
        /// Rewrite names that have an exact or manual-alias match
        #[arg(long)]
        apply: bool,
        /// Write the label report here
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// List products whose category is missing or not in the live table
    Problems {
        #[arg(long, default_value = "products.json")]
        catalog: PathBuf,
        #[arg(long, default_value = "categories_map.json")]
        categories_map: PathBuf,
        #[arg(long, default_value = "problematic_references.json")]
        output: PathBuf,
    },
    /// Replace problematic category names with the workbook's category
    Fix {
        #[command(flatten)]
        source: WorkbookArgs,
        #[arg(long, default_value = "products.json")]
        catalog: PathBuf,
        #[arg(long, default_value = "categories_map.json")]
        categories_map: PathBuf,
    },
}

/// Fetch both lookup tables and cache them as flat JSON objects.
///
/// # Errors
///
/// Returns an error if the token is missing, either collection cannot be
/// listed, or a map file cannot be written.
pub(crate) async fn run_mappings_fetch(
    config: &AppConfig,
    categories_collection: &str,
    divisions_collection: &str,
    categories_map: &Path,
    divisions_map: &Path,
) -> anyhow::Result<()> {
    let client = crate::upload::cms_client(config)?;

    for (collection, path) in [
        (categories_collection, categories_map),
        (divisions_collection, divisions_map),
    ] {
        let table = client.fetch_mapping(collection, config.page_size).await?;
        if table.is_empty() {
            tracing::warn!(collection, "CMS returned an empty lookup table");
        }
        write_mapping(path, &table)?;
        println!("{collection}: {} entries -> {}", table.len(), path.display());
    }
    Ok(())
}

/// One distinct catalog category label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct CategoryLabel {
    pub label: String,
    pub products: usize,
    pub suggestion: Option<Suggestion>,
}

/// Distinct non-blank `categoryName` values, alphabetically, with product
/// counts and the closest live category.
pub(crate) fn category_labels(
    entries: &[CatalogEntry],
    resolver: &LookupResolver,
) -> Vec<CategoryLabel> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in entries {
        if let Some(label) = entry.data.category_name.as_deref().map(str::trim) {
            if !label.is_empty() {
                *counts.entry(label).or_default() += 1;
            }
        }
    }
    counts
        .into_iter()
        .map(|(label, products)| CategoryLabel {
            label: label.to_string(),
            products,
            suggestion: resolver.suggest_category(label),
        })
        .collect()
}

/// Rewrite `categoryName` and `category` for labels with a curated match.
/// Substring and keyword guesses are never applied. Returns the number of
/// products changed.
pub(crate) fn apply_curated(entries: &mut [CatalogEntry], labels: &[CategoryLabel]) -> usize {
    let curated: HashMap<&str, &Suggestion> = labels
        .iter()
        .filter_map(|l| {
            l.suggestion
                .as_ref()
                .filter(|s| s.reason.is_curated())
                .map(|s| (l.label.as_str(), s))
        })
        .collect();

    let mut changed = 0;
    for entry in entries.iter_mut() {
        let Some(label) = entry.data.category_name.as_deref().map(str::trim) else {
            continue;
        };
        let Some(suggestion) = curated.get(label) else {
            continue;
        };
        if entry.data.category_name.as_deref() == Some(suggestion.name.as_str())
            && entry.data.category == Some(suggestion.id)
        {
            continue;
        }
        entry.data.category_name = Some(suggestion.name.clone());
        entry.data.category = Some(suggestion.id);
        changed += 1;
    }
    changed
}

/// # Errors
///
/// Returns an error if an input cannot be read or an output cannot be
/// written.
pub(crate) fn run_categories_sync(
    config: &AppConfig,
    catalog: &Path,
    categories_map: &Path,
    apply: bool,
    report: Option<&Path>,
) -> anyhow::Result<()> {
    let table = read_mapping_or_empty(categories_map)?;
    if table.is_empty() {
        anyhow::bail!(
            "{} has no categories; run `mappings fetch` first",
            categories_map.display()
        );
    }
    let resolver = LookupResolver::new(table, MappingTable::new(), lookup_defaults(config)?);

    let repo = CatalogRepository::new(catalog);
    let mut entries = repo.load()?;
    let labels = category_labels(&entries, &resolver);

    println!("{:<40}{:>9}  SUGGESTION", "CATEGORY NAME", "PRODUCTS");
    for label in &labels {
        let suggestion = label.suggestion.as_ref().map_or_else(
            || "-".to_string(),
            |s| format!("{} ({}, {:?})", s.name, s.id, s.reason),
        );
        println!("{:<40}{:>9}  {suggestion}", label.label, label.products);
    }

    if let Some(path) = report {
        write_json_report(path, &labels)?;
    }

    if apply {
        let changed = apply_curated(&mut entries, &labels);
        if changed > 0 {
            repo.save(&entries)?;
        }
        println!("updated {changed} products");
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ProblemProduct {
    pub reference: String,
    pub name: String,
    pub category_name: Option<String>,
    pub issue: String,
}

#[derive(Debug, Serialize)]
struct ProblemReport<'a> {
    problematic_products: &'a [ProblemProduct],
    reference_list: Vec<&'a str>,
    total_count: usize,
}

/// Products whose category name is blank or absent from the live table.
pub(crate) fn find_problems(entries: &[CatalogEntry], table: &MappingTable) -> Vec<ProblemProduct> {
    entries
        .iter()
        .filter_map(|e| {
            let label = e
                .data
                .category_name
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty());
            let issue = match label {
                None => "Missing category name".to_string(),
                Some(l) if table.find_name(l).is_none() => format!("Category not in production: \"{l}\""),
                Some(_) => return None,
            };
            Some(ProblemProduct {
                reference: e.data.reference_string.clone(),
                name: e.data.name.clone(),
                category_name: e.data.category_name.clone(),
                issue,
            })
        })
        .collect()
}

/// # Errors
///
/// Returns an error if an input cannot be read or the report cannot be
/// written.
pub(crate) fn run_categories_problems(
    catalog: &Path,
    categories_map: &Path,
    output: &Path,
) -> anyhow::Result<()> {
    let table = read_mapping_or_empty(categories_map)?;
    let entries = CatalogRepository::new(catalog).load()?;
    let problems = find_problems(&entries, &table);

    for problem in &problems {
        println!("{:<12}{:<40}{}", problem.reference, problem.name, problem.issue);
    }
    write_json_report(
        output,
        &ProblemReport {
            problematic_products: &problems,
            reference_list: problems.iter().map(|p| p.reference.as_str()).collect(),
            total_count: problems.len(),
        },
    )?;
    println!("{} problematic products (see {})", problems.len(), output.display());
    Ok(())
}

/// Replace each problematic product's category with the one its reference
/// carries in the workbook. The id is set when the new name is in the live
/// table. Returns the number of products changed.
pub(crate) fn fix_problems(
    entries: &mut [CatalogEntry],
    table: &MappingTable,
    workbook_categories: &HashMap<String, String>,
) -> usize {
    let problems: Vec<String> = find_problems(entries, table)
        .into_iter()
        .map(|p| p.reference)
        .collect();

    let mut changed = 0;
    for entry in entries.iter_mut() {
        let reference = entry.data.reference_string.trim();
        if !problems.iter().any(|p| p.trim() == reference) {
            continue;
        }
        let Some(category) = workbook_categories.get(reference) else {
            tracing::warn!(reference, "skipping product absent from the workbook");
            continue;
        };
        if entry.data.category_name.as_deref() == Some(category.as_str()) {
            continue;
        }
        entry.data.category = table.find_name(category).map(|(id, _)| id);
        entry.data.category_name = Some(category.clone());
        changed += 1;
    }
    changed
}

/// # Errors
///
/// Returns an error if an input cannot be read or the catalog cannot be
/// saved.
pub(crate) fn run_categories_fix(
    source: &WorkbookArgs,
    catalog: &Path,
    categories_map: &Path,
) -> anyhow::Result<()> {
    let table = read_mapping_or_empty(categories_map)?;
    let (_, rows) = read_workbook(source)?;
    let workbook_categories: HashMap<String, String> = parent_groups(&rows)
        .into_iter()
        .filter_map(|g| g.category_name.map(|c| (g.reference, c)))
        .collect();

    let repo = CatalogRepository::new(catalog);
    let changed = repo.apply("category-fix", |entries| {
        fix_problems(entries, &table, &workbook_categories)
    })?;
    println!("fixed categories on {changed} products");
    Ok(())
}

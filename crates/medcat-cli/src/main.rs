use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod catalog;
mod categories;
mod slides;
mod upload;

use catalog::{LookupArgs, WorkbookArgs};
use categories::{CategoriesCommands, MappingsCommands};

#[derive(Debug, Parser)]
#[command(name = "medcat")]
#[command(about = "Medical products catalog builder and CMS uploader")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build the product catalog from the workbook
    Import {
        #[command(flatten)]
        source: WorkbookArgs,
        /// Catalog file to write
        #[arg(long, default_value = "products.json")]
        output: PathBuf,
        /// One record per reference, without variations
        #[arg(long)]
        parents_only: bool,
        #[command(flatten)]
        lookups: LookupArgs,
        /// Write header, grouping, lookup and validation diagnostics here
        #[arg(long)]
        report: Option<PathBuf>,
        /// Print the summary without writing the catalog
        #[arg(long)]
        dry_run: bool,
    },
    /// Attach workbook variations to an existing catalog
    Variations {
        #[command(flatten)]
        source: WorkbookArgs,
        #[arg(long, default_value = "products.json")]
        catalog: PathBuf,
        /// Only update this reference
        #[arg(long)]
        only_ref: Option<String>,
        /// Keep at most this many variations per product
        #[arg(long)]
        limit_variations: Option<usize>,
    },
    /// Append workbook products that are absent from the catalog
    Missing {
        #[command(flatten)]
        source: WorkbookArgs,
        #[arg(long, default_value = "products.json")]
        catalog: PathBuf,
        #[command(flatten)]
        lookups: LookupArgs,
    },
    /// Fill empty catalog fields from slide extraction output
    MergeSlides {
        /// Slide extraction export (JSON array of slide records)
        slides: PathBuf,
        /// Slide content export, used for tables missing from the records
        #[arg(long)]
        content: Option<PathBuf>,
        #[arg(long, default_value = "products.json")]
        catalog: PathBuf,
        /// First slide number to merge (inclusive)
        #[arg(long)]
        start: Option<u32>,
        /// Last slide number to merge (inclusive)
        #[arg(long)]
        end: Option<u32>,
        /// Issues report path
        #[arg(long, default_value = "merge_issues.json")]
        issues: PathBuf,
    },
    /// Assign unique URL slugs from product names
    Slugs {
        #[arg(long, default_value = "products.json")]
        catalog: PathBuf,
        /// Only the first N products
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Cached CMS lookup tables
    Mappings {
        #[command(subcommand)]
        command: MappingsCommands,
    },
    /// Category name maintenance
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Re-resolve category and division ids from their names
    ResolveIds {
        #[arg(long, default_value = "products.json")]
        catalog: PathBuf,
        #[command(flatten)]
        lookups: LookupArgs,
    },
    /// Create every catalog product in the CMS, in batches
    Upload {
        #[arg(long, default_value = "products.json")]
        catalog: PathBuf,
        /// Products per batch (overrides MEDCAT_BATCH_SIZE)
        #[arg(long)]
        batch_size: Option<usize>,
        /// Do not ask for confirmation between batches
        #[arg(long)]
        yes: bool,
        /// Zero-based catalog position to start from
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Upload at most this many products
        #[arg(long)]
        limit: Option<usize>,
        /// Progress log recording every attempt
        #[arg(long)]
        progress: Option<PathBuf>,
        /// Skip products the progress log already marks as uploaded
        #[arg(long, requires = "progress")]
        resume: bool,
    },
    /// Re-upload products from a failure artifact
    RetryFailed {
        /// Failure artifact (defaults to the newest in the artifacts directory)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Append a timestamp to every slug to avoid uniqueness conflicts
        #[arg(long)]
        suffix_slugs: bool,
        #[arg(long)]
        yes: bool,
    },
    /// Delete one CMS record
    Delete {
        /// CMS record id
        #[arg(long, conflicts_with = "reference", required_unless_present = "reference")]
        id: Option<i64>,
        /// Reference string of the record
        #[arg(long)]
        reference: Option<String>,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Check CMS connectivity and token
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = medcat_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(env = %config.env, "configuration loaded");

    let Some(command) = cli.command else {
        println!("medcat: no command given; run `medcat --help`");
        return Ok(());
    };

    match command {
        Commands::Import {
            source,
            output,
            parents_only,
            lookups,
            report,
            dry_run,
        } => catalog::run_import(
            &config,
            &source,
            &output,
            parents_only,
            &lookups,
            report.as_deref(),
            dry_run,
        ),
        Commands::Variations {
            source,
            catalog,
            only_ref,
            limit_variations,
        } => catalog::run_variations(&source, &catalog, only_ref.as_deref(), limit_variations),
        Commands::Missing {
            source,
            catalog,
            lookups,
        } => catalog::run_missing(&config, &source, &catalog, &lookups),
        Commands::MergeSlides {
            slides,
            content,
            catalog,
            start,
            end,
            issues,
        } => slides::run_merge_slides(&slides, content.as_deref(), &catalog, start, end, &issues),
        Commands::Slugs { catalog, limit } => catalog::run_slugs(&catalog, limit),
        Commands::Mappings { command } => match command {
            MappingsCommands::Fetch {
                categories_collection,
                divisions_collection,
                categories_map,
                divisions_map,
            } => {
                categories::run_mappings_fetch(
                    &config,
                    &categories_collection,
                    &divisions_collection,
                    &categories_map,
                    &divisions_map,
                )
                .await
            }
        },
        Commands::Categories { command } => match command {
            CategoriesCommands::Sync {
                catalog,
                categories_map,
                apply,
                report,
            } => categories::run_categories_sync(
                &config,
                &catalog,
                &categories_map,
                apply,
                report.as_deref(),
            ),
            CategoriesCommands::Problems {
                catalog,
                categories_map,
                output,
            } => categories::run_categories_problems(&catalog, &categories_map, &output),
            CategoriesCommands::Fix {
                source,
                catalog,
                categories_map,
            } => categories::run_categories_fix(&source, &catalog, &categories_map),
        },
        Commands::ResolveIds { catalog, lookups } => {
            catalog::run_resolve_ids(&config, &catalog, &lookups)
        }
        Commands::Upload {
            catalog,
            batch_size,
            yes,
            start,
            limit,
            progress,
            resume,
        } => {
            let options = upload::UploadArgs {
                batch_size,
                yes,
                start,
                limit,
                progress,
                resume,
            };
            upload::run_upload(&config, &catalog, &options).await
        }
        Commands::RetryFailed {
            file,
            suffix_slugs,
            yes,
        } => upload::run_retry_failed(&config, file.as_deref(), suffix_slugs, yes).await,
        Commands::Delete { id, reference, yes } => {
            upload::run_delete(&config, id, reference.as_deref(), yes).await
        }
        Commands::Ping => upload::run_ping(&config).await,
    }
}

#[cfg(test)]
mod tests;

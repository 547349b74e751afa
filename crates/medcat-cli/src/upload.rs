//! CMS-facing command handlers: batch upload, failure retry, delete and ping.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use dialoguer::Confirm;
use medcat_cms::{BatchCheckpoint, BatchOptions, BatchUploader, CmsClient, ItemOutcome};
use medcat_core::{slugify, validate_catalog, AppConfig, Product, UploadSession};
use medcat_store::{
    latest_failed_artifact, load_failed_products, write_upload_artifacts, CatalogRepository,
    ProgressAction, ProgressEntry, ProgressTracker,
};

/// Options for `upload`, grouped to keep the handler signature short.
#[derive(Debug)]
pub(crate) struct UploadArgs {
    pub batch_size: Option<usize>,
    pub yes: bool,
    pub start: usize,
    pub limit: Option<usize>,
    pub progress: Option<PathBuf>,
    pub resume: bool,
}

/// # Errors
///
/// Returns an error if `CMS_TOKEN` is not set or the client cannot be built.
pub(crate) fn cms_client(config: &AppConfig) -> anyhow::Result<CmsClient> {
    let token = config
        .cms_token
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("CMS_TOKEN is not set; cannot reach the CMS"))?;

    CmsClient::new(
        &config.cms_url,
        token,
        &config.cms_collection,
        config.request_timeout_secs,
        config.max_retries,
        config.retry_backoff_ms,
    )
    .map_err(|e| anyhow::anyhow!("failed to build CMS client: {e}"))
}

fn batch_options(
    config: &AppConfig,
    batch_size: Option<usize>,
    yes: bool,
) -> anyhow::Result<BatchOptions> {
    let batch_size = batch_size.unwrap_or(config.batch_size);
    if batch_size == 0 {
        anyhow::bail!("--batch-size must be at least 1");
    }
    Ok(BatchOptions {
        batch_size,
        auto_confirm: yes || config.auto_confirm,
        inter_request_delay: Duration::from_millis(config.inter_request_delay_ms),
    })
}

fn confirm_next_batch(checkpoint: &BatchCheckpoint) -> bool {
    println!(
        "batch {}/{} done: {} uploaded, {} failed, {} remaining",
        checkpoint.batch_number,
        checkpoint.total_batches,
        checkpoint.uploaded,
        checkpoint.failed,
        checkpoint.remaining
    );
    Confirm::new()
        .with_prompt("Continue with the next batch?")
        .default(true)
        .interact()
        .unwrap_or(false)
}

/// Catalog positions `[start, start + limit)` paired with their products.
/// With a tracker and `resume`, positions already uploaded are left out.
pub(crate) fn select_items(
    products: Vec<Product>,
    start: usize,
    limit: Option<usize>,
    done: impl Fn(usize) -> bool,
) -> Vec<(usize, Product)> {
    products
        .into_iter()
        .enumerate()
        .skip(start)
        .take(limit.unwrap_or(usize::MAX))
        .filter(|(index, _)| !done(*index))
        .collect()
}

/// Run the batch uploader until it finishes, the operator declines a
/// checkpoint, or Ctrl-C arrives. Every attempt is recorded in `tracker`.
async fn upload_items(
    client: &CmsClient,
    items: &[(usize, Product)],
    options: BatchOptions,
    mut tracker: Option<&mut ProgressTracker>,
) -> UploadSession {
    let mut uploader = BatchUploader::new(client, options);
    let mut confirm = confirm_next_batch;
    let mut on_item = |index: usize, outcome: ItemOutcome<'_>| {
        let entry = match outcome {
            ItemOutcome::Uploaded(u) => {
                println!("  ok    {:<12}{} -> {}", u.reference, u.product_name, u.product_id);
                ProgressEntry::new(index, ProgressAction::Upload)
                    .with_product(&u.product_name, Some(u.product_id))
            }
            ItemOutcome::Failed(f) => {
                println!("  fail  {:<12}{}: {}", f.reference, f.product_name, f.error);
                ProgressEntry::new(index, ProgressAction::Upload)
                    .with_product(&f.product_name, None)
                    .with_error(f.error.clone())
            }
        };
        if let Some(tracker) = tracker.as_deref_mut() {
            if let Err(e) = tracker.record(entry) {
                tracing::warn!(error = %e, index, "failed to record progress");
            }
        }
    };

    let completed = tokio::select! {
        completed = uploader.run(items, &mut confirm, &mut on_item) => completed,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, keeping results so far");
            false
        }
    };
    uploader.finish(!completed)
}

fn print_session(session: &UploadSession, artifacts_dir: &Path) -> anyhow::Result<()> {
    let paths = write_upload_artifacts(artifacts_dir, session)?;
    println!(
        "uploaded {}, failed {}{}",
        session.uploaded.len(),
        session.failed.len(),
        if session.stopped_early { " (stopped early)" } else { "" }
    );
    if let Some(path) = paths.uploaded {
        println!("  successes: {}", path.display());
    }
    if let Some(path) = paths.failed {
        println!("  failures:  {}  (retry with `medcat retry-failed`)", path.display());
    }
    Ok(())
}

/// Create catalog products in the CMS in confirmed batches.
///
/// Per-product failures are collected into the failure artifact; they do not
/// stop the run.
///
/// # Errors
///
/// Returns an error if the token is missing, the catalog cannot be read, or
/// the artifacts cannot be written.
pub(crate) async fn run_upload(
    config: &AppConfig,
    catalog: &Path,
    args: &UploadArgs,
) -> anyhow::Result<()> {
    let client = cms_client(config)?;
    let options = batch_options(config, args.batch_size, args.yes)?;

    let entries = CatalogRepository::new(catalog).load()?;
    let issues = validate_catalog(&entries);
    if !issues.is_clean() {
        tracing::warn!(
            blank = issues.blank_references.len(),
            duplicates = ?issues.duplicate_references,
            "catalog has reference problems; the CMS may reject some products"
        );
    }

    let mut tracker = args.progress.as_ref().map(ProgressTracker::open);
    let items = {
        let done = |index| args.resume && tracker.as_ref().is_some_and(|t| t.is_done(index));
        select_items(
            entries.into_iter().map(|e| e.data).collect(),
            args.start,
            args.limit,
            done,
        )
    };
    if items.is_empty() {
        println!("nothing to upload");
        return Ok(());
    }
    println!(
        "uploading {} products to {} in batches of {}",
        items.len(),
        client.collection(),
        options.batch_size
    );

    let session = upload_items(&client, &items, options, tracker.as_mut()).await;
    if let Some(tracker) = &tracker {
        if let Err(e) = tracker.flush() {
            tracing::warn!(error = %e, path = %tracker.path().display(), "failed to save progress");
        }
    }
    print_session(&session, &config.artifacts_dir)
}

/// `<slug or slugified name>-<YYYYmmdd_HHMMSS>`.
pub(crate) fn suffixed_slug(product: &Product, stamp: &str) -> String {
    let base = product
        .slug
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map_or_else(|| slugify(&product.name), str::to_string);
    format!("{base}-{stamp}")
}

/// Re-post every product of a failure artifact.
///
/// # Errors
///
/// Returns an error if no artifact is found or readable, the token is
/// missing, or the new artifacts cannot be written.
pub(crate) async fn run_retry_failed(
    config: &AppConfig,
    file: Option<&Path>,
    suffix_slugs: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let path = match file {
        Some(path) => path.to_path_buf(),
        None => latest_failed_artifact(&config.artifacts_dir)?.ok_or_else(|| {
            anyhow::anyhow!(
                "no failed_products_*.json in {}; pass --file",
                config.artifacts_dir.display()
            )
        })?,
    };
    let failed = load_failed_products(&path)?;
    if failed.is_empty() {
        println!("{} lists no failed products", path.display());
        return Ok(());
    }

    let client = cms_client(config)?;
    let options = batch_options(config, None, yes)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let items: Vec<(usize, Product)> = failed
        .into_iter()
        .enumerate()
        .map(|(index, f)| {
            let mut product = f.product_data;
            if suffix_slugs {
                product.slug = Some(suffixed_slug(&product, &stamp));
            }
            (index, product)
        })
        .collect();

    println!("retrying {} products from {}", items.len(), path.display());
    let session = upload_items(&client, &items, options, None).await;
    print_session(&session, &config.artifacts_dir)
}

/// # Errors
///
/// Returns an error if the token is missing, the reference matches no
/// record, or the CMS rejects the delete.
pub(crate) async fn run_delete(
    config: &AppConfig,
    id: Option<i64>,
    reference: Option<&str>,
    yes: bool,
) -> anyhow::Result<()> {
    let client = cms_client(config)?;
    let id = match (id, reference) {
        (Some(id), _) => id,
        (None, Some(reference)) => client
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| anyhow::anyhow!("no CMS record with reference {reference}"))?
            .id,
        (None, None) => anyhow::bail!("pass --id or --reference"),
    };

    if !yes
        && !Confirm::new()
            .with_prompt(format!("Delete record {id} from {}?", client.collection()))
            .default(false)
            .interact()?
    {
        println!("aborted");
        return Ok(());
    }

    client.delete(id).await?;
    println!("deleted record {id}");
    Ok(())
}

/// # Errors
///
/// Returns an error if the CMS is unreachable or rejects the token.
pub(crate) async fn run_ping(config: &AppConfig) -> anyhow::Result<()> {
    let client = cms_client(config)?;
    client.ping().await?;
    println!("CMS at {} is reachable", config.cms_url);
    Ok(())
}

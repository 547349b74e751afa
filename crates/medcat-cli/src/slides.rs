//! `merge-slides`: fill empty catalog fields from slide extraction output.

use std::path::Path;

use anyhow::Context;
use medcat_ingest::{load_slide_content, load_slide_records, merge_catalog, SlideRange};
use medcat_store::{write_json_report, CatalogRepository};

/// Merge slide records into the catalog and write the issues report.
///
/// The catalog is only saved when at least one product gained a field; the
/// issues report is always written.
///
/// # Errors
///
/// Returns an error if an input file cannot be read or parsed, if
/// `start > end`, or if the catalog or report cannot be written.
pub(crate) fn run_merge_slides(
    slides: &Path,
    content: Option<&Path>,
    catalog: &Path,
    start: Option<u32>,
    end: Option<u32>,
    issues: &Path,
) -> anyhow::Result<()> {
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            anyhow::bail!("--start {s} is after --end {e}");
        }
    }

    let records = load_slide_records(slides)
        .with_context(|| format!("reading slide records {}", slides.display()))?;
    let content = match content {
        Some(path) => load_slide_content(path)
            .with_context(|| format!("reading slide content {}", path.display()))?,
        None => Vec::new(),
    };

    let repo = CatalogRepository::new(catalog);
    let mut entries = repo.load()?;
    let report = merge_catalog(&mut entries, &records, &content, SlideRange { start, end });

    if report.updated.is_empty() {
        println!("no catalog fields changed");
    } else {
        repo.save(&entries)?;
        println!("updated {} products", report.updated.len());
    }
    write_json_report(issues, &report)?;

    println!(
        "{} slides unmatched, {} products incomplete (see {})",
        report.unmatched_slides.len(),
        report.incomplete_products.len(),
        issues.display()
    );
    Ok(())
}

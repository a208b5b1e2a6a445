use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfsearch_core::page::build_page_records;
use pdfsearch_core::{PageContent, PageRecord, Role, Strategy};
use pdfsearch_index::{BuildInfo, IndexBuilder};

use crate::prelude::{println, *};

#[derive(Debug, clap::Args)]
pub struct Options {
    /// Path to the PDF file
    path: std::path::PathBuf,

    /// Span classification strategy: `fixed` (absolute point sizes) or `relative` (to the dominant size)
    #[arg(long, env = "PDFSEARCH_STRATEGY", default_value = "fixed")]
    strategy: Strategy,
}

/// Classify page by page so progress can be reported. Relative
/// classification needs document-wide statistics, so it runs in one pass.
fn classify_pages(pages: &[PageContent], strategy: Strategy) -> Vec<PageRecord> {
    let progress = ProgressBar::new(pages.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} pages {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    progress.set_message(format!("({strategy})"));

    let records = match strategy {
        Strategy::Relative => {
            let records = build_page_records(pages, &strategy);
            progress.inc(pages.len() as u64);
            records
        }
        Strategy::Fixed => pages
            .iter()
            .flat_map(|page| {
                let record = build_page_records(std::slice::from_ref(page), &strategy);
                progress.inc(1);
                record
            })
            .collect(),
    };

    progress.finish_and_clear();
    records
}

pub fn run(options: Options, global: crate::Global) -> Result<()> {
    let document = crate::document::load(&options.path)?;
    let records = classify_pages(&document.pages, options.strategy);

    let info = BuildInfo {
        source_path: document.path.display().to_string(),
        source_sha256: document.sha256.clone(),
        strategy: options.strategy,
        built_at: chrono::Utc::now(),
    };

    let handle = IndexBuilder::new(&global.index_dir)
        .build(&records, &info)
        .wrap_err_with(|| format!("failed to build index in {}", global.index_dir.display()))?;

    let with_headings = records
        .iter()
        .filter(|r| r.roles_present.iter().any(Role::is_heading))
        .count();

    println!(
        "{} {} pages from {}",
        "Indexed".green().bold(),
        records.len(),
        document.path.display()
    );
    println!(
        "  {} spans, {} pages with headings, strategy {}",
        document.span_count(),
        with_headings,
        options.strategy
    );
    println!("  index: {}", handle.path().display().to_string().bright_black());

    handle.close()?;
    Ok(())
}

use std::path::{Path, PathBuf};

use colored::Colorize;

use pdfsearch_core::report::{self, NO_RESULTS};
use pdfsearch_core::search::group_by_page;
use pdfsearch_core::{Mode, PageGroup};
use pdfsearch_index::{IndexError, IndexHandle};

use crate::prelude::{println, *};

#[derive(Debug, clap::Args)]
pub struct Options {
    /// Search mode: general, headings, topics or weighted
    mode: String,

    /// Search query; words, "quoted phrases", AND/OR/NOT, (groups) and prefix*
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,

    /// Document to link results to (defaults to the indexed source)
    #[arg(long, env = "PDFSEARCH_DOCUMENT")]
    document: Option<PathBuf>,

    /// Output the page groups as JSON
    #[arg(long)]
    json: bool,
}

/// Open the index with a hint when it has not been built yet.
pub fn open_index(dir: &Path) -> Result<IndexHandle> {
    IndexHandle::open(dir).map_err(|e| match e {
        IndexError::NotFound(_) => eyre!("{e}. Run `pdfsearch index <PDF>` first."),
        other => other.into(),
    })
}

/// `file://` locator for result links.
pub fn locator(handle: &IndexHandle, document: Option<&Path>) -> Result<String> {
    let path = match document {
        Some(path) => crate::document::absolute(path),
        None => PathBuf::from(handle.metadata()?.source_path),
    };
    Ok(report::file_locator(&path.display().to_string()))
}

pub fn print_report(groups: &[PageGroup], locator: &str) {
    if groups.is_empty() {
        println!("{}", NO_RESULTS.yellow());
        return;
    }

    println!(
        "\n{}",
        format!("Found {} relevant results:", report::hit_count(groups)).bold()
    );
    for group in groups {
        println!("\n{}", report::page_heading(group).cyan().bold());
        println!(
            "Link: {}",
            report::deep_link(locator, group.page_number).bright_blue()
        );
    }
}

pub fn run_query(handle: &IndexHandle, query: &str, mode: Mode) -> Result<Vec<PageGroup>> {
    let hits = handle.search(query, mode)?;
    Ok(group_by_page(hits))
}

pub fn run(options: Options, global: crate::Global) -> Result<()> {
    // Validate the mode before touching the index.
    let mode: Mode = options.mode.parse()?;
    let query = options.query.join(" ");

    let handle = open_index(&global.index_dir)?;
    let groups = run_query(&handle, &query, mode)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
    } else {
        let locator = locator(&handle, options.document.as_deref())?;
        print_report(&groups, &locator);
    }

    handle.close()?;
    Ok(())
}

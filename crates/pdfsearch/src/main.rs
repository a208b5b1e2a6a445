use crate::prelude::*;
use clap::Parser;

mod analyze;
mod document;
mod error;
mod index;
mod info;
mod prelude;
mod repl;
mod search;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Index a PDF by text role (title, headings, body, bold, ...) and search it with structure-aware ranking"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Directory holding the search index
    #[clap(
        long,
        env = "PDFSEARCH_INDEX_DIR",
        global = true,
        default_value = "indexdir"
    )]
    index_dir: std::path::PathBuf,

    /// Whether to display additional information.
    #[clap(long, env = "PDFSEARCH_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Extract, classify and index a PDF document
    Index(crate::index::Options),

    /// Search the index once and print a page-grouped report
    Search(crate::search::Options),

    /// Interactive search prompt
    Repl(crate::repl::Options),

    /// Show how a PDF's text classifies into roles
    Analyze(crate::analyze::Options),

    /// Show what the current index was built from
    Info(crate::info::Options),
}

fn init_logging(verbose: bool) {
    // RUST_LOG, when set, overrides the default filter.
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let app = App::parse();
    init_logging(app.global.verbose);

    match app.command {
        SubCommands::Index(options) => crate::index::run(options, app.global),
        SubCommands::Search(options) => crate::search::run(options, app.global),
        SubCommands::Repl(options) => crate::repl::run(options, app.global),
        SubCommands::Analyze(options) => crate::analyze::run(options, app.global),
        SubCommands::Info(options) => crate::info::run(options, app.global),
    }
}

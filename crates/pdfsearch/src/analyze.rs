use colored::Colorize;
use serde::Serialize;

use pdfsearch_core::analysis::{self, Analysis};
use pdfsearch_core::classify::classify;
use pdfsearch_core::Strategy;

use crate::prelude::{println, *};

#[derive(Debug, clap::Args)]
pub struct Options {
    /// Path to the PDF file
    path: std::path::PathBuf,

    /// Span classification strategy
    #[arg(long, default_value = "relative")]
    strategy: Strategy,

    /// Also print the recommendation prompt built from the analysis
    #[arg(long)]
    prompt: bool,

    /// Output the analysis as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct AnalysisOutput<'a> {
    document: String,
    strategy: Strategy,
    #[serde(flatten)]
    analysis: &'a Analysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<String>,
}

fn print_table(analysis: &Analysis) {
    let mut table = new_table();
    table.add_row(prettytable::row![
        "Role".bold().cyan(),
        "Spans".bold().cyan(),
        "Samples".bold().cyan()
    ]);

    for (role, count) in &analysis.counts {
        let samples = analysis
            .samples
            .get(role)
            .map(|texts| {
                texts
                    .iter()
                    .map(|t| format!("\"{t}\""))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();
        table.add_row(prettytable::row![
            role.as_str().green(),
            count.to_string().bright_white(),
            samples.bright_black()
        ]);
    }

    table.printstd();
}

pub fn run(options: Options, _global: crate::Global) -> Result<()> {
    let document = crate::document::load(&options.path)?;
    let classified = classify(&document.spans(), options.strategy);
    let analysis = analysis::analyze(&classified);

    if options.json {
        let output = AnalysisOutput {
            document: document.path.display().to_string(),
            strategy: options.strategy,
            analysis: &analysis,
            prompt: options.prompt.then(|| analysis::advisory_prompt(&analysis)),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} {} ({} pages, {} spans, strategy {})",
        "Analysis of".bold(),
        document.path.display(),
        document.pages.len(),
        analysis.total_spans,
        options.strategy
    );

    if analysis.counts.is_empty() {
        println!("{}", "No text found.".yellow());
    } else {
        print_table(&analysis);
    }

    if options.prompt {
        println!("\n{}\n", "== Recommendation prompt ==".bold().cyan());
        println!("{}", analysis::advisory_prompt(&analysis));
    }

    Ok(())
}

use std::collections::BTreeMap;

use colored::Colorize;
use serde::Serialize;

use pdfsearch_core::Role;
use pdfsearch_index::IndexMeta;

use crate::prelude::{println, *};

#[derive(Debug, clap::Args)]
pub struct Options {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    index: String,
    #[serde(flatten)]
    meta: IndexMeta,
    /// Pages on which each role occurs.
    role_pages: BTreeMap<Role, usize>,
}

pub fn run(options: Options, global: crate::Global) -> Result<()> {
    let handle = crate::search::open_index(&global.index_dir)?;
    let meta = handle.metadata()?;

    let mut role_pages: BTreeMap<Role, usize> = BTreeMap::new();
    for record in handle.records()? {
        for role in record.roles_present {
            *role_pages.entry(role).or_insert(0) += 1;
        }
    }

    let output = InfoOutput {
        index: handle.path().display().to_string(),
        meta,
        role_pages,
    };
    handle.close()?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let mut table = new_table();
    let rows = [
        ("Index", output.index.clone()),
        ("Document", output.meta.source_path.clone()),
        ("SHA-256", output.meta.source_sha256.clone()),
        ("Strategy", output.meta.strategy.to_string()),
        ("Pages", output.meta.page_count.to_string()),
        ("Built", output.meta.built_at.clone()),
        ("Schema", output.meta.schema_version.to_string()),
    ];
    for (label, value) in rows {
        table.add_row(prettytable::row![label.bold().cyan(), value]);
    }
    table.printstd();

    if !output.role_pages.is_empty() {
        println!("\n{}", "Pages per role".bold());
        let mut roles = new_table();
        for (role, pages) in &output.role_pages {
            roles.add_row(prettytable::row![role.as_str().green(), pages]);
        }
        roles.printstd();
    }

    Ok(())
}

// Script generator - timestamped data-migration templates

use crate::script::humanize;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// `Backfill User-Slugs` becomes `backfill_user_slugs`
pub fn snake_case(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

pub fn script_file_name(name: &str, at: DateTime<Local>) -> String {
    format!("{}_{}.sql", at.format("%Y%m%d%H%M%S"), snake_case(name))
}

fn template(name: &str, at: DateTime<Local>) -> String {
    format!(
        "-- {title}\n\
         -- Created at {created}\n\
         --\n\
         -- Statements are separated by semicolons and run in one transaction.\n\
         -- Nothing is committed until you answer \"yes\" at the prompt.\n\
         --\n\
         -- Run with: migrator run <this file>\n\n",
        title = humanize(&snake_case(name)),
        created = at.format("%Y-%m-%d %H:%M:%S %z"),
    )
}

/// Write a new script template into `dir`, creating the directory
///
/// Refuses to overwrite an existing file.
pub fn generate_script(dir: &Path, name: &str, at: DateTime<Local>) -> Result<PathBuf> {
    if snake_case(name).is_empty() {
        bail!("Migration name {:?} has no usable characters", name);
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create script directory {}", dir.display()))?;

    let path = dir.join(script_file_name(name, at));
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(template(name, at).as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(path)
}

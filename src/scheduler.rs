//! Bulk loader: append URL lists to the task store at a given priority

use crate::db::{robotasks, DbPool};
use crate::error::Result;
use std::path::Path;
use tracing::{info, warn};

/// Extension a file must carry to be loaded as a URL list
pub const LIST_EXTENSION: &str = ".list";

/// Only `*.list` files are treated as URL lists
pub fn is_url_list(path: &Path) -> bool {
    path.to_str()
        .map(|p| p.ends_with(LIST_EXTENSION))
        .unwrap_or(false)
}

/// Read one URL per line, trimmed, skipping blank lines
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_url_list(&content))
}

fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load every `.list` file in `paths` at `priority`, one transaction per file.
///
/// Returns the total number of rows inserted.
pub async fn schedule_lists<P: AsRef<Path>>(pool: &DbPool, priority: i64, paths: &[P]) -> Result<u64> {
    let mut total = 0;

    for path in paths {
        let path = path.as_ref();
        if !is_url_list(path) {
            warn!("Skipping {}: not a {} file", path.display(), LIST_EXTENSION);
            continue;
        }

        info!("Adding {} at priority {}", path.display(), priority);
        let urls = read_url_list(path)?;
        let inserted = robotasks::insert_tasks(pool, &urls, priority).await?;
        info!("Added {} tasks from {}", inserted, path.display());
        total += inserted;
    }

    let pending = robotasks::count_tasks(pool).await?;
    info!("Done: {} tasks added, {} pending in store", total, pending);
    Ok(total)
}

//! Root path resolution for the log tree.

use crate::error::{AppError, AppResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve the directory the `logs/` tree lives under.
///
/// A path ending in a `bin` directory (any case) is replaced by its parent,
/// so running from a build output folder still logs next to the project.
pub fn resolve_root(base: &Path) -> AppResult<PathBuf> {
    let is_bin = base
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.eq_ignore_ascii_case("bin"));

    if !is_bin {
        return Ok(base.to_path_buf());
    }

    match base.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            debug!(from = %base.display(), to = %parent.display(), "Skipping bin directory");
            Ok(parent.to_path_buf())
        }
        _ => Err(AppError::Config(format!(
            "cannot resolve root above '{}'",
            base.display()
        ))),
    }
}

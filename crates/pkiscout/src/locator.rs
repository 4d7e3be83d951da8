//! First-match search across several roots.
//!
//! One walker per root races the others. The first hit is offered on a
//! one-slot channel with `try_send`, so losing walkers never block on a
//! result nobody will read; the winner cancels the rest.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;

use pkiscout_core::{Location, Result, ScanError};

use crate::cancel::Cancellation;
use crate::walker::{PathWalker, WalkOptions};

/// True when `path` ends with `target`: a file-name suffix, or trailing
/// path components when `target` contains a separator.
fn matches(path: &Path, target: &str) -> bool {
    if target.contains(std::path::MAIN_SEPARATOR) {
        return path.ends_with(target);
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.ends_with(target))
}

/// Find the first file under `roots` whose name ends with `target`.
///
/// Roots that do not exist are skipped. When several files match, whichever
/// walker gets there first wins.
///
/// # Errors
///
/// `ScanError::NotFound` if nothing matches, `ScanError::Cancelled` if
/// `cancel` is raised before a match.
pub async fn locate(
    cancel: &Cancellation,
    target: &str,
    roots: &[PathBuf],
    options: &WalkOptions,
) -> Result<Location> {
    let not_found = || ScanError::NotFound {
        target: target.to_string(),
    };
    if target.is_empty() {
        return Err(not_found());
    }

    let search = cancel.child();
    let (found_tx, mut found_rx) = mpsc::channel::<PathBuf>(1);
    let mut walkers = JoinSet::new();

    for root in roots {
        if std::fs::symlink_metadata(root).is_err() {
            debug!(root = %root.display(), "root not found, skipping");
            continue;
        }

        let walker = PathWalker::new(options.clone());
        let root = vec![root.clone()];
        let target = target.to_string();
        let search = search.clone();
        let found_tx = found_tx.clone();
        walkers.spawn_blocking(move || {
            let hit = walker
                .walk(&root, &search)
                .find(|path| matches(path, &target));
            if let Some(path) = hit {
                // A full slot means another walker already won.
                let _ = found_tx.try_send(path);
            }
        });
    }
    drop(found_tx);

    let found = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            search.cancel();
            walkers.detach_all();
            return Err(ScanError::Cancelled);
        }
        found = found_rx.recv() => found,
    };

    search.cancel();
    walkers.detach_all();

    match found {
        Some(path) => {
            debug!(path = %path.display(), target, "located");
            Ok(Location::new(path))
        }
        None => Err(not_found()),
    }
}

//! Path walking: enumerate candidate files under one or more roots.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::cancel::Cancellation;

/// Names starting with this character are hidden.
pub const HIDDEN_MARKER: char = '.';

/// Options controlling a walk.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Descend into subdirectories
    pub recursive: bool,
    /// Resolve symbolic links
    pub follow_links: bool,
    /// Only emit files with one of these extensions (lowercase, no dot)
    pub extensions: Option<BTreeSet<String>>,
    /// Log per-entry failures at warn level instead of debug
    pub verbose: bool,
}

impl WalkOptions {
    /// Set recursion
    #[must_use]
    pub const fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set symlink resolution
    #[must_use]
    pub const fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Restrict to the given extensions. Leading dots and case are ignored.
    #[must_use]
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self.extensions = (!set.is_empty()).then_some(set);
        self
    }

    /// Set verbosity
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        let Some(allowed) = &self.extensions else {
            return true;
        };
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| allowed.contains(&e.to_ascii_lowercase()))
    }
}

/// Lazily enumerates files under a set of roots.
#[derive(Debug, Clone, Default)]
pub struct PathWalker {
    options: WalkOptions,
}

impl PathWalker {
    /// Create a walker.
    #[must_use]
    pub const fn new(options: WalkOptions) -> Self {
        Self { options }
    }

    /// The options this walker was built with
    #[must_use]
    pub const fn options(&self) -> &WalkOptions {
        &self.options
    }

    /// Walk `roots`, yielding absolute file paths in no particular order.
    ///
    /// Missing roots, unreadable entries and dead links are logged and
    /// skipped. A file reachable twice (overlapping roots, links) is only
    /// yielded once. Iteration stops as soon as `cancel` is raised.
    pub fn walk<'a>(
        &'a self,
        roots: &'a [PathBuf],
        cancel: &'a Cancellation,
    ) -> impl Iterator<Item = PathBuf> + 'a {
        let mut emitted: HashSet<PathBuf> = HashSet::new();

        roots
            .iter()
            .filter_map(move |root| self.absolute_root(root))
            .flat_map(move |root| self.walk_root(root, cancel))
            .filter(move |path| emitted.insert(dedup_key(path)))
            .take_while(move |_| !cancel.is_cancelled())
    }

    fn absolute_root(&self, root: &Path) -> Option<PathBuf> {
        let absolute = match std::path::absolute(root) {
            Ok(p) => p,
            Err(e) => {
                self.report(root, &e.to_string(), "cannot resolve root path");
                return None;
            }
        };
        if std::fs::symlink_metadata(&absolute).is_err() {
            debug!(path = %absolute.display(), "root not found, skipping");
            return None;
        }
        Some(absolute)
    }

    fn walk_root<'a>(
        &'a self,
        root: PathBuf,
        cancel: &'a Cancellation,
    ) -> impl Iterator<Item = PathBuf> + 'a {
        let max_depth = if self.options.recursive { usize::MAX } else { 1 };

        WalkDir::new(root)
            .follow_links(self.options.follow_links)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
            .take_while(move |_| !cancel.is_cancelled())
            .filter_map(move |entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    let path = e.path().map_or_else(String::new, |p| p.display().to_string());
                    self.report(Path::new(&path), &e.to_string(), "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(DirEntry::into_path)
            .filter(move |path| self.options.accepts(path))
    }

    fn report(&self, path: &Path, error: &str, message: &str) {
        if self.options.verbose {
            warn!(path = %path.display(), error, "{message}");
        } else {
            debug!(path = %path.display(), error, "{message}");
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with(HIDDEN_MARKER))
}

fn dedup_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, b"x").unwrap();
        path
    }

    fn collect(options: WalkOptions, roots: &[PathBuf]) -> BTreeSet<PathBuf> {
        let walker = PathWalker::new(options);
        let cancel = Cancellation::new();
        walker.walk(roots, &cancel).collect()
    }

    #[test]
    fn non_recursive_lists_direct_children() {
        let tmp = TempDir::new().unwrap();
        let top = touch(tmp.path(), "a.pem");
        touch(tmp.path(), "sub/b.pem");

        let found = collect(WalkOptions::default(), &[tmp.path().to_path_buf()]);
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![top]);
    }

    #[test]
    fn recursive_descends() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.pem");
        touch(tmp.path(), "sub/deeper/b.pem");

        let found = collect(
            WalkOptions::default().recursive(true),
            &[tmp.path().to_path_buf()],
        );
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn hidden_entries_and_subtrees_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let visible = touch(tmp.path(), "visible.pem");
        touch(tmp.path(), ".hidden.pem");
        touch(tmp.path(), ".git/objects/key.pem");

        let found = collect(
            WalkOptions::default().recursive(true),
            &[tmp.path().to_path_buf()],
        );
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![visible]);
    }

    #[test]
    fn hidden_root_is_walked() {
        let tmp = TempDir::new().unwrap();
        let inside = touch(tmp.path(), ".secrets/key.pem");

        let found = collect(
            WalkOptions::default().recursive(true),
            &[tmp.path().join(".secrets")],
        );
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![inside]);
    }

    #[test]
    fn file_root_is_emitted() {
        let tmp = TempDir::new().unwrap();
        let file = touch(tmp.path(), ".hidden-root.pem");

        let found = collect(WalkOptions::default(), &[file.clone()]);
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![file]);
    }

    #[test]
    fn extension_filter_is_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        let upper = touch(tmp.path(), "A.PEM");
        touch(tmp.path(), "notes.txt");

        let found = collect(
            WalkOptions::default().extensions([".pem"]),
            &[tmp.path().to_path_buf()],
        );
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![upper]);
    }

    #[test]
    fn overlapping_roots_emit_once() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.pem");
        touch(tmp.path(), "sub/b.pem");

        let walker = PathWalker::new(WalkOptions::default().recursive(true));
        let cancel = Cancellation::new();
        let roots = vec![
            tmp.path().to_path_buf(),
            tmp.path().join("sub"),
            tmp.path().to_path_buf(),
        ];
        let found: Vec<_> = walker.walk(&roots, &cancel).collect();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn missing_roots_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let file = touch(tmp.path(), "a.pem");

        let found = collect(
            WalkOptions::default(),
            &[tmp.path().join("does-not-exist"), tmp.path().to_path_buf()],
        );
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![file]);
    }

    #[cfg(unix)]
    #[test]
    fn links_only_followed_when_enabled_and_dead_links_dropped() {
        let tmp = TempDir::new().unwrap();
        let target = touch(tmp.path(), "real/key.pem");
        let links = tmp.path().join("links");
        fs::create_dir_all(&links).unwrap();
        std::os::unix::fs::symlink(&target, links.join("key.pem")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("gone.pem"), links.join("dead.pem")).unwrap();

        let plain = collect(WalkOptions::default(), &[links.clone()]);
        assert!(plain.is_empty());

        let followed = collect(WalkOptions::default().follow_links(true), &[links.clone()]);
        assert_eq!(
            followed.into_iter().collect::<Vec<_>>(),
            vec![links.join("key.pem")]
        );
    }

    #[test]
    fn cancelled_walk_emits_nothing() {
        let tmp = TempDir::new().unwrap();
        for i in 0..10 {
            touch(tmp.path(), &format!("k{i}.pem"));
        }

        let walker = PathWalker::new(WalkOptions::default());
        let cancel = Cancellation::new();
        let roots = vec![tmp.path().to_path_buf()];
        let mut iter = walker.walk(&roots, &cancel);
        assert!(iter.next().is_some());
        cancel.cancel();
        assert!(iter.next().is_none());
    }
}

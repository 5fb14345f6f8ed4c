use crate::workdir::Workdir;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::{collections::HashSet, path::Path};
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Error, Debug)]
pub enum FinderError {
    #[error("invalid ignore patterns: {}", .0.join(", "))]
    InvalidPatterns(Vec<String>),
    #[error("failed to build ignore set")]
    BuildIgnoreSet(#[from] globset::Error),
}

/// Locates VASP working directories in a tree by the presence of input
/// files. Hidden directories are never entered; additional subtrees can be
/// cut with glob patterns against directory base names.
#[derive(Debug)]
pub struct WorkdirFinder {
    ignore: GlobSet,
}

impl Default for WorkdirFinder {
    fn default() -> Self {
        Self {
            ignore: GlobSet::empty(),
        }
    }
}

impl WorkdirFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a finder with ignore patterns, e.g. `["*backup*", "temp_*"]`.
    /// Matching directories are pruned before descent, their subtrees are
    /// never visited. All bad patterns are reported before giving up.
    pub fn with_ignore_patterns<I, S>(patterns: I) -> Result<Self, FinderError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut bad = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => {
                    error!("failed to compile ignore pattern '{pattern}': {e}");
                    bad.push(pattern.to_owned());
                }
            }
        }
        if !bad.is_empty() {
            return Err(FinderError::InvalidPatterns(bad));
        }
        Ok(Self {
            ignore: builder.build()?,
        })
    }

    /// Walk `root` and all subdirectories pre-order, symlinks followed, and
    /// return every directory (`root` included) that is a valid working
    /// directory, deduplicated by resolved path, in traversal order.
    ///
    /// Discovery is best-effort: unreadable entries are skipped with a
    /// warning instead of aborting the scan.
    pub fn find(&self, root: &Path) -> Vec<Workdir> {
        let root = match root.canonicalize() {
            Ok(root) => root,
            Err(e) => {
                warn!("cannot resolve scan root '{}': {e}", root.display());
                return Vec::new();
            }
        };

        let ignore = self.ignore.clone();
        let mut walker = WalkBuilder::new(&root);
        walker
            .standard_filters(false)
            .hidden(true)
            .follow_links(true)
            .filter_entry(move |entry| !ignore.is_match(entry.file_name().to_string_lossy().as_ref()));

        let mut seen = HashSet::new();
        let mut workdirs = Vec::new();
        for entry in walker.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipped unreadable entry during discovery: {e}");
                    continue;
                }
            };
            if !entry.file_type().map_or(false, |ft| ft.is_dir()) {
                continue;
            }
            let workdir = match Workdir::new(entry.path()) {
                Ok(workdir) => workdir,
                Err(e) => {
                    warn!("skipped '{}': {e}", entry.path().display());
                    continue;
                }
            };
            if workdir.is_valid() && seen.insert(workdir.path().to_path_buf()) {
                workdirs.push(workdir);
            }
        }
        debug!(
            root = %root.display(),
            count = workdirs.len(),
            "discovery finished"
        );
        workdirs
    }

    /// Keep only the members of an explicit directory list that are valid
    /// working directories, deduplicated, without recursing.
    pub fn filter<I, P>(dirs: I) -> Vec<Workdir>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut seen = HashSet::new();
        let mut workdirs = Vec::new();
        for dir in dirs {
            if let Ok(workdir) = Workdir::new(dir.as_ref()) {
                if workdir.is_valid() && seen.insert(workdir.path().to_path_buf()) {
                    workdirs.push(workdir);
                }
            }
        }
        workdirs
    }
}

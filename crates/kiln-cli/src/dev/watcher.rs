//! File watching for the dev server.
//!
//! A [`WatchFilter`] decides which notify events become [`FileChange`]s;
//! [`FileWatcher`] runs the notify watcher and forwards accepted changes
//! through a bounded channel.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use glob::{MatchOptions, Pattern};
use kiln_config::WatchOptions;
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use walkdir::WalkDir;

use crate::error::{CliError, Result};

const CHANNEL_CAPACITY: usize = 100;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Created(p) | FileChange::Modified(p) | FileChange::Removed(p) => p,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            FileChange::Created(_) => "added",
            FileChange::Modified(_) => "changed",
            FileChange::Removed(_) => "removed",
        }
    }
}

/// Which paths under a root are watched, and how.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    root: PathBuf,
    patterns: Vec<Pattern>,
    options: WatchOptions,
}

impl WatchFilter {
    /// `patterns` are globs relative to `root`.
    pub fn new(root: &Path, patterns: &[String], options: WatchOptions) -> Result<Self> {
        let root = std::fs::canonicalize(root).map_err(|_| CliError::FileNotFound(root.into()))?;
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p.trim_start_matches("./")).map_err(|e| {
                    CliError::InvalidArgument(format!("Invalid watch pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            root,
            patterns,
            options,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` (absolute, under the root) matches a pattern.
    pub fn matches(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_path_with(relative, MATCH_OPTIONS))
    }

    /// Turn the path at `index` of a notify event into a change, if it is
    /// one this filter reports.
    pub fn classify(&self, kind: &EventKind, index: usize, path: &Path) -> Option<FileChange> {
        let change = match kind {
            EventKind::Create(_) => FileChange::Created(path.to_path_buf()),
            EventKind::Remove(_) => FileChange::Removed(path.to_path_buf()),
            EventKind::Modify(ModifyKind::Metadata(_)) => return None,
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                FileChange::Removed(path.to_path_buf())
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                FileChange::Created(path.to_path_buf())
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if index == 0 => {
                FileChange::Removed(path.to_path_buf())
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                FileChange::Created(path.to_path_buf())
            }
            EventKind::Modify(_) => FileChange::Modified(path.to_path_buf()),
            _ => return None,
        };

        if !self.matches(path) {
            return None;
        }
        if !self.options.follow_symlinks && is_symlink(path) {
            return None;
        }
        if self.options.always_stat {
            return self.stat(change);
        }
        Some(change)
    }

    /// Check an added or changed path against the filesystem. Directories
    /// are dropped and vanished files are reported as removed.
    fn stat(&self, change: FileChange) -> Option<FileChange> {
        match change {
            FileChange::Removed(_) => Some(change),
            FileChange::Created(ref path) | FileChange::Modified(ref path) => {
                match std::fs::metadata(path) {
                    Ok(meta) if meta.is_dir() => None,
                    Ok(_) => Some(change),
                    Err(_) => Some(FileChange::Removed(path.clone())),
                }
            }
        }
    }

    /// Files matching the patterns right now, reported as additions.
    pub fn initial_scan(&self) -> Vec<FileChange> {
        WalkDir::new(&self.root)
            .follow_links(self.options.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| self.matches(entry.path()))
            .map(|entry| FileChange::Created(entry.into_path()))
            .collect()
    }
}

fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}

/// Drops repeat events for the same path inside a time window.
///
/// Entries older than the window are forgotten on every call, so the map only
/// holds paths seen recently.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last_seen: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_seen: HashMap::new(),
        }
    }

    pub fn admit(&mut self, path: &Path, now: Instant) -> bool {
        let window = self.window;
        self.last_seen
            .retain(|_, last| now.saturating_duration_since(*last) < window);
        if self.last_seen.contains_key(path) {
            return false;
        }
        self.last_seen.insert(path.to_path_buf(), now);
        true
    }

    /// Paths currently inside the window.
    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}

/// notify settings for `options`. Symlinked directories are only followed
/// when asked for.
fn watcher_config(options: &WatchOptions) -> notify::Config {
    notify::Config::default().with_follow_symlinks(options.follow_symlinks)
}

/// Hand `change` to the dev loop. Returns `false` once the receiver is gone.
fn forward(tx: &mpsc::Sender<FileChange>, change: FileChange) -> bool {
    match tx.blocking_send(change) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(path = %e.0.path().display(), "watch channel closed, change dropped");
            false
        }
    }
}

/// A running notify watcher. Dropping it stops the watch.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Watch `filter.root()` recursively.
    ///
    /// Unless the filter's options set `ignore_initial: false`, files that
    /// already exist produce no events.
    pub fn new(filter: WatchFilter, debounce: Duration) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let root = filter.root().to_path_buf();

        if !filter.options.ignore_initial {
            for change in filter.initial_scan() {
                if tx.try_send(change).is_err() {
                    tracing::warn!("initial scan overflowed the watch channel");
                    break;
                }
            }
        }

        let config = watcher_config(&filter.options);
        let mut debouncer = Debouncer::new(debounce);
        let handler = move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "watch error");
                    return;
                }
            };

            for (index, path) in event.paths.iter().enumerate() {
                let Some(change) = filter.classify(&event.kind, index, path) else {
                    continue;
                };
                if !debouncer.admit(change.path(), Instant::now()) {
                    continue;
                }
                if !forward(&tx, change) {
                    break;
                }
            }
        };
        let mut watcher = RecommendedWatcher::new(handler, config)?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        tracing::debug!(root = %root.display(), "watching");

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

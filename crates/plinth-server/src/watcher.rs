//! File watching for the rebuild loop.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// Source trees the dev pipeline rebuilds from.
#[derive(Debug, Clone)]
pub struct WatchRoots {
    /// Top-level stylesheet directory.
    pub css_dir: PathBuf,

    /// Script source directory.
    pub js_dir: PathBuf,

    /// Hugo content/source directory.
    pub site_dir: PathBuf,
}

/// A change classified by which pipeline has to re-run.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// A stylesheet under the css root changed.
    Stylesheet(PathBuf),

    /// A script under the js root changed.
    Script(PathBuf),

    /// Anything under the site root changed.
    Content(PathBuf),
}

/// File watcher for detecting changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch the given roots recursively.
    ///
    /// Returns the watcher and a channel of classified events. Roots that
    /// do not exist are skipped.
    pub fn new(
        roots: &WatchRoots,
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        // Canonicalized roots so classification matches notify's absolute
        // event paths.
        let mut canonical = CanonicalRoots::default();
        for (dir, slot) in [
            (&roots.css_dir, &mut canonical.css),
            (&roots.js_dir, &mut canonical.js),
            (&roots.site_dir, &mut canonical.site),
        ] {
            if dir.exists() {
                let path = dir.canonicalize().unwrap_or_else(|_| dir.clone());
                watcher
                    .watch(&path, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
                *slot = Some(path);
            }
        }

        // Forward events with debounce on a plain thread; notify's callback
        // runs outside the tokio runtime. The debounce is tracked per event
        // class, so a stylesheet save never swallows a script save landing
        // in the same burst (editor save-all, formatters).
        std::thread::spawn(move || {
            let debounce_duration = Duration::from_millis(100);
            let mut last_sent: [Option<std::time::Instant>; 3] = [None; 3];

            while let Ok(event) = sync_rx.recv() {
                if !is_change(&event.kind) {
                    continue;
                }

                for path in event.paths {
                    if let Some(classified) = canonical.classify(&path) {
                        let now = std::time::Instant::now();
                        let slot = &mut last_sent[class_index(&classified)];
                        if slot.is_some_and(|t| now.duration_since(t) < debounce_duration) {
                            continue;
                        }
                        *slot = Some(now);
                        let _ = async_tx.blocking_send(classified);
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

#[derive(Debug, Default)]
struct CanonicalRoots {
    css: Option<PathBuf>,
    js: Option<PathBuf>,
    site: Option<PathBuf>,
}

impl CanonicalRoots {
    fn classify(&self, path: &Path) -> Option<WatchEvent> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        if self.css.as_deref().is_some_and(|root| path.starts_with(root)) {
            if ext == "css" {
                return Some(WatchEvent::Stylesheet(path.to_path_buf()));
            }
            return None;
        }

        if self.js.as_deref().is_some_and(|root| path.starts_with(root)) {
            if ext == "js" || ext == "mjs" {
                return Some(WatchEvent::Script(path.to_path_buf()));
            }
            return None;
        }

        if self.site.as_deref().is_some_and(|root| path.starts_with(root)) {
            return Some(WatchEvent::Content(path.to_path_buf()));
        }

        None
    }
}

fn class_index(event: &WatchEvent) -> usize {
    match event {
        WatchEvent::Stylesheet(_) => 0,
        WatchEvent::Script(_) => 1,
        WatchEvent::Content(_) => 2,
    }
}

fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

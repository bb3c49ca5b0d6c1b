//! Cache invalidation driven by filesystem notifications.
//!
//! Files are watched through their parent directory so that many templates in
//! one directory share a single OS registration. Events only carry paths, so a
//! reverse index (directory → registered file names) maps each event back to
//! the template it concerns.
//!
//! One worker thread per [`FileWatcher`] drains events. It is started by the
//! first [`FileWatcher::watch`] call, blocks on a channel fed by `notify`, and
//! is stopped by [`FileWatcher::stop_all`] or on drop.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::cache::TemplateCache;
use crate::error::{Error, Result};

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationKind {
    /// Content changed; the template recompiles on next access
    Modified,
    /// File deleted or renamed away; the watch was dropped too
    Removed,
}

/// A cache entry evicted because its source file changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub path: PathBuf,
    pub kind: InvalidationKind,
}

enum WatchMessage {
    Event(notify::Result<Event>),
    Stop,
}

#[derive(Default)]
struct Registrations {
    files: HashMap<PathBuf, PathBuf>,
    directories: HashMap<PathBuf, HashSet<OsString>>,
}

impl Registrations {
    fn lookup(&self, event_path: &Path) -> Option<PathBuf> {
        let dir = event_path.parent()?;
        let name = event_path.file_name()?;
        self.directories
            .get(dir)
            .filter(|names| names.contains(name))
            .map(|_| dir.join(name))
    }
}

// Lock order: FileWatcher::worker, then os_watcher, then registrations.
struct Shared {
    cache: Arc<TemplateCache>,
    os_watcher: Mutex<Option<RecommendedWatcher>>,
    registrations: Mutex<Registrations>,
    subscribers: Mutex<Vec<Sender<Invalidation>>>,
}

impl Shared {
    fn handle_event(&self, event: &Event) {
        let removed = match event.kind {
            EventKind::Remove(_) => true,
            EventKind::Create(_) | EventKind::Modify(_) => false,
            _ => return,
        };

        for path in &event.paths {
            let Some(file) = self.registrations.lock().lookup(path) else {
                continue;
            };
            let kind = if removed || !file.exists() {
                InvalidationKind::Removed
            } else {
                InvalidationKind::Modified
            };
            log::debug!("{:?} {}", kind, file.display());

            self.cache.remove(&file);
            if kind == InvalidationKind::Removed {
                self.deregister(&file);
            }
            self.notify(Invalidation { path: file, kind });
        }
    }

    fn deregister(&self, file: &Path) -> bool {
        let mut os_watcher = self.os_watcher.lock();
        let mut registrations = self.registrations.lock();

        let Some(dir) = registrations.files.remove(file) else {
            return false;
        };
        let now_empty = match (registrations.directories.get_mut(&dir), file.file_name()) {
            (Some(names), Some(name)) => {
                names.remove(name);
                names.is_empty()
            }
            (Some(names), None) => names.is_empty(),
            (None, _) => false,
        };
        if now_empty {
            registrations.directories.remove(&dir);
            if let Some(watcher) = os_watcher.as_mut() {
                if let Err(e) = watcher.unwatch(&dir) {
                    log::warn!("failed to unwatch {}: {}", dir.display(), e);
                }
            }
        }
        true
    }

    fn notify(&self, invalidation: Invalidation) {
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(invalidation.clone()).is_ok());
    }
}

struct Worker {
    handle: JoinHandle<()>,
    control: Sender<WatchMessage>,
}

/// Evicts [`TemplateCache`] entries when their source files change.
pub struct FileWatcher {
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
    shutdown_timeout: Duration,
}

impl FileWatcher {
    pub fn new(cache: Arc<TemplateCache>) -> Self {
        Self::with_shutdown_timeout(cache, DEFAULT_SHUTDOWN_TIMEOUT)
    }

    pub fn with_shutdown_timeout(cache: Arc<TemplateCache>, shutdown_timeout: Duration) -> Self {
        FileWatcher {
            shared: Arc::new(Shared {
                cache,
                os_watcher: Mutex::new(None),
                registrations: Mutex::new(Registrations::default()),
                subscribers: Mutex::new(Vec::new()),
            }),
            worker: Mutex::new(None),
            shutdown_timeout,
        }
    }

    /// Start watching `path`. Watching a path twice is a no-op.
    pub fn watch(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let file = path.canonicalize().map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let (Some(dir), Some(name)) = (file.parent(), file.file_name()) else {
            return Err(Error::NotFound(file));
        };
        let (dir, name) = (dir.to_path_buf(), name.to_os_string());

        let mut worker = self.worker.lock();
        if worker.is_none() {
            *worker = Some(self.start_worker()?);
        }

        let mut os_watcher = self.shared.os_watcher.lock();
        let mut registrations = self.shared.registrations.lock();
        if registrations.files.contains_key(&file) {
            return Ok(());
        }

        if !registrations.directories.contains_key(&dir) {
            if let Some(watcher) = os_watcher.as_mut() {
                watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            }
            log::debug!("watching directory {}", dir.display());
        }
        registrations
            .directories
            .entry(dir.clone())
            .or_default()
            .insert(name);
        registrations.files.insert(file, dir);
        Ok(())
    }

    fn start_worker(&self) -> Result<Worker> {
        let (control, events) = mpsc::channel();
        let event_sender = control.clone();
        let os_watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = event_sender.send(WatchMessage::Event(res));
        })?;
        *self.shared.os_watcher.lock() = Some(os_watcher);

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("customui-watch".to_string())
            .spawn(move || run_loop(shared, events))
            .map_err(notify::Error::io)?;

        log::debug!("file watch worker started");
        Ok(Worker { handle, control })
    }

    /// Stop watching one file. Returns whether it was registered.
    pub fn stop_watching(&self, path: &Path) -> bool {
        self.shared.deregister(&TemplateCache::key_for(path))
    }

    /// Drop every registration and stop the worker. Cached templates are kept.
    pub fn stop_all(&self) {
        let worker = self.worker.lock().take();

        let released = {
            let mut os_watcher = self.shared.os_watcher.lock();
            let mut registrations = self.shared.registrations.lock();
            registrations.files.clear();
            registrations.directories.clear();
            os_watcher.take()
        };
        drop(released);

        let Some(worker) = worker else {
            return;
        };
        let _ = worker.control.send(WatchMessage::Stop);

        let deadline = Instant::now() + self.shutdown_timeout;
        while !worker.handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if worker.handle.is_finished() {
            let _ = worker.handle.join();
            log::debug!("file watch worker stopped");
        } else {
            log::warn!(
                "file watch worker did not stop within {:?}, detaching it",
                self.shutdown_timeout
            );
        }
    }

    /// Receive an [`Invalidation`] for every evicted entry from now on.
    pub fn subscribe(&self) -> Receiver<Invalidation> {
        let (sender, receiver) = mpsc::channel();
        self.shared.subscribers.lock().push(sender);
        receiver
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.shared
            .registrations
            .lock()
            .files
            .contains_key(&TemplateCache::key_for(path))
    }

    pub fn watched_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.shared.registrations.lock().files.keys().cloned().collect();
        files.sort();
        files
    }

    pub fn watched_directory_count(&self) -> usize {
        self.shared.registrations.lock().directories.len()
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop_all();
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("files", &self.watched_files())
            .field("running", &self.is_running())
            .finish()
    }
}

fn run_loop(shared: Arc<Shared>, events: Receiver<WatchMessage>) {
    loop {
        match events.recv() {
            Ok(WatchMessage::Stop) => break,
            Ok(WatchMessage::Event(Ok(event))) => shared.handle_event(&event),
            Ok(WatchMessage::Event(Err(e))) => log::warn!("file watch error: {}", e),
            Err(_) => {
                log::warn!("file watch event channel closed");
                break;
            }
        }
    }
}

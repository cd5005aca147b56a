//! Hot reload for the control mapping file. The watcher parses and resolves
//! on notify's thread; the bridge picks the result up at the start of its
//! next cycle with [`MappingWatcher::take_update`].

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use notify::{Event, RecursiveMode, Watcher};

use super::config;
use super::mapping::MappingTable;
use crate::core::prelude::*;

pub struct MappingWatcher {
    #[allow(dead_code)]
    watcher: notify::RecommendedWatcher,
    path: PathBuf,
    pending: Arc<Mutex<Option<MappingTable>>>,

    /// Lets the per-cycle check skip locking the mutex above
    has_changes: Arc<AtomicBool>,
}

impl std::fmt::Debug for MappingWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MappingWatcher({})", self.path.display())
    }
}

impl MappingWatcher {
    pub fn new(path: &Path) -> Result<Self, ConfigError> {
        let path = path.to_path_buf();
        let pending = Arc::new(Mutex::new(None));
        let has_changes = Arc::new(AtomicBool::new(false));
        let initial_hash = fs::read_to_string(&path)
            .ok()
            .map(|content| content_hash(&content));

        let watcher = setup_watcher(
            path.clone(),
            pending.clone(),
            has_changes.clone(),
            initial_hash,
        )?;

        Ok(Self {
            watcher,
            path,
            pending,
            has_changes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_changes(&self) -> bool {
        self.has_changes.load(Ordering::Acquire)
    }

    pub fn take_update(&self) -> Option<MappingTable> {
        if !self.has_changes.swap(false, Ordering::AcqRel) {
            return None;
        }
        match self.pending.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => {
                error!("Mapping watcher state was poisoned");
                None
            }
        }
    }
}

fn setup_watcher(
    path: PathBuf,
    pending: Arc<Mutex<Option<MappingTable>>>,
    has_changes: Arc<AtomicBool>,
    initial_hash: Option<u64>,
) -> Result<notify::RecommendedWatcher, ConfigError> {
    let watch_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut last_loaded_hash = initial_hash;

    info!(
        "watching control mapping '{}' via directory '{}'",
        path.display(),
        watch_dir.display()
    );

    let mut watcher = notify::recommended_watcher(
        move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    warn!(
                        "control mapping watcher failed for '{}': {}",
                        path.display(),
                        err
                    );
                    return;
                }
            };

            if !mapping_file_changed(&event, &path) {
                return;
            }

            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(err) => {
                    trace!(
                        "mapping change event before readable file '{}': {}",
                        path.display(),
                        err
                    );
                    return;
                }
            };

            let new_hash = content_hash(&content);
            if last_loaded_hash == Some(new_hash) {
                debug!("control mapping unchanged: {}", path.display());
                return;
            }
            last_loaded_hash = Some(new_hash);

            let file = match config::parse_for_path(&path, &content) {
                Ok(file) => file,
                Err(e) => {
                    warn!(
                        "failed to parse updated control mapping '{}': {}",
                        path.display(),
                        e
                    );
                    return;
                }
            };

            let (table, _) = MappingTable::resolve(&file);
            match pending.lock() {
                Ok(mut guard) => {
                    *guard = Some(table);
                    has_changes.store(true, Ordering::Release);
                    info!("control mapping changed: {}", path.display());
                }
                Err(_) => error!("Mapping watcher state was poisoned"),
            }
        },
    )
    .map_err(|e| ConfigError::Watch(e.to_string()))?;

    watcher
        .watch(&watch_dir, RecursiveMode::NonRecursive)
        .map_err(|e| ConfigError::Watch(e.to_string()))?;

    Ok(watcher)
}

fn mapping_file_changed(event: &Event, target: &Path) -> bool {
    if !matches!(
        event.kind,
        notify::EventKind::Create(_) | notify::EventKind::Modify(_)
    ) {
        return false;
    }

    if event.paths.is_empty() {
        return true;
    }

    event
        .paths
        .iter()
        .any(|path| path_matches_target(path, target))
}

fn path_matches_target(path: &Path, target: &Path) -> bool {
    if path == target || path.file_name() == target.file_name() {
        return true;
    }

    match (path.canonicalize().ok(), target.canonicalize().ok()) {
        (Some(path_canon), Some(target_canon)) => path_canon == target_canon,
        _ => false,
    }
}

fn content_hash(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

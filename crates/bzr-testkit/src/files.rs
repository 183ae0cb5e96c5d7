use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use bzr_purchase::files::missing_ids;
use bzr_purchase::{FileLookupError, FileResolver};
use bzr_schemas::FileMeta;
use uuid::Uuid;

/// Fake file service. Unknown ids are missing; `set_unavailable` makes every
/// call fail the way a dead network would.
#[derive(Default)]
pub struct MemoryFileResolver {
    files: Mutex<BTreeMap<Uuid, FileMeta>>,
    unavailable: AtomicBool,
    resolve_calls: AtomicUsize,
}

impl MemoryFileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new file with deterministic URIs and return its id.
    pub fn add_file(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.register(FileMeta {
            id,
            file_uri: format!("https://files.test/{id}.png"),
            file_thumbnail_uri: format!("https://files.test/{id}_thumb.png"),
        });
        id
    }

    pub fn register(&self, meta: FileMeta) {
        self.files
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(meta.id, meta);
    }

    pub fn set_unavailable(&self, on: bool) {
        self.unavailable.store(on, Ordering::SeqCst);
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), FileLookupError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(FileLookupError::Unavailable(anyhow!(
                "file service connection refused"
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FileResolver for MemoryFileResolver {
    async fn resolve(&self, file_id: Uuid) -> Result<FileMeta, FileLookupError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.files
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&file_id)
            .cloned()
            .ok_or_else(|| FileLookupError::Missing(vec![file_id.to_string()]))
    }

    async fn validate_exist(&self, file_ids: &[Uuid]) -> Result<(), FileLookupError> {
        self.check_available()?;
        let found: Vec<FileMeta> = {
            let files = self.files.lock().unwrap_or_else(|p| p.into_inner());
            file_ids
                .iter()
                .filter_map(|id| files.get(id).cloned())
                .collect()
        };
        let missing = missing_ids(file_ids, &found);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FileLookupError::Missing(missing))
        }
    }
}

//! In-memory storage client for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use gdshare_common::{Error, Result};

use crate::client::{FileQuery, NewFile, RemoteFile, StorageClient};

/// A call received by [`MemoryStorage`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    List(FileQuery),
    Get(String),
    Create(String),
    Delete(String),
}

#[derive(Default)]
struct State {
    // Insertion order doubles as listing order.
    files: Vec<RemoteFile>,
    contents: HashMap<String, Vec<u8>>,
    failing_deletes: HashSet<String>,
    fail_creates: bool,
    calls: Vec<StorageCall>,
}

/// In-memory storage client.
///
/// Records every call and lets tests make individual operations fail.
/// All data is stored in memory and lost on drop.
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
}

impl MemoryStorage {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed a file without recording a call.
    pub fn insert(&self, file: RemoteFile) {
        self.state().files.push(file);
    }

    /// Make deletes of `id` fail.
    pub fn fail_delete(&self, id: impl Into<String>) {
        self.state().failing_deletes.insert(id.into());
    }

    /// Make every create fail.
    pub fn fail_creates(&self) {
        self.state().fail_creates = true;
    }

    /// Snapshot of stored files.
    pub fn files(&self) -> Vec<RemoteFile> {
        self.state().files.clone()
    }

    /// Uploaded bytes for a file created through this client.
    pub fn content(&self, id: &str) -> Option<Vec<u8>> {
        self.state().contents.get(id).cloned()
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<StorageCall> {
        self.state().calls.clone()
    }

    /// Ids passed to `delete`, including failed attempts.
    pub fn deleted_ids(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                StorageCall::Delete(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn list(&self, query: &FileQuery) -> Result<Vec<RemoteFile>> {
        let mut state = self.state();
        state.calls.push(StorageCall::List(query.clone()));

        Ok(state
            .files
            .iter()
            .filter(|file| query.filter.matches(file))
            .take(query.page_size as usize)
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<RemoteFile> {
        let mut state = self.state();
        state.calls.push(StorageCall::Get(id.to_string()));

        state
            .files
            .iter()
            .find(|file| file.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("File not found: {}", id)))
    }

    async fn create(&self, file: NewFile) -> Result<RemoteFile> {
        let mut state = self.state();
        state.calls.push(StorageCall::Create(file.name.clone()));

        if state.fail_creates {
            return Err(Error::Network("Upload rejected".to_string()));
        }

        let id = Uuid::new_v4().simple().to_string();
        let remote = RemoteFile {
            id: id.clone(),
            name: file.name,
            mime_type: file.mime_type,
            size_bytes: Some(file.content.len() as u64),
            created_at: Utc::now(),
            parent_id: file.parents.first().map(|p| p.to_string()),
            web_view_link: Some(format!(
                "https://drive.example/file/d/{}/view?usp=drivesdk",
                id
            )),
            description: Some(file.description),
        };

        state.contents.insert(id, file.content);
        state.files.push(remote.clone());

        Ok(remote)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.state();
        state.calls.push(StorageCall::Delete(id.to_string()));

        if state.failing_deletes.contains(id) {
            return Err(Error::PermissionDenied(format!("Cannot delete {}", id)));
        }

        let before = state.files.len();
        state.files.retain(|file| file.id != id);
        if state.files.len() == before {
            return Err(Error::NotFound(format!("File not found: {}", id)));
        }

        state.contents.remove(id);
        Ok(())
    }
}

//! Storage client trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gdshare_common::{FolderId, Result};

/// MIME type the service uses to mark folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Largest page the service returns for a single list request.
const MAX_PAGE_SIZE: u32 = 1000;

/// Metadata for a file held by the storage service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Identifier assigned by the service.
    pub id: String,
    /// File name.
    pub name: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes (None for folders and native documents).
    pub size_bytes: Option<u64>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// First parent folder, if any.
    pub parent_id: Option<String>,
    /// Shareable view link.
    pub web_view_link: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
}

impl RemoteFile {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// Content and metadata for a file to create.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub description: String,
    pub mime_type: String,
    pub parents: Vec<FolderId>,
    pub content: Vec<u8>,
}

/// Which files a list request selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFilter {
    /// Every file the account can see.
    All,
    /// Direct children of one folder.
    InFolder(FolderId),
    /// Folders only.
    FoldersOnly,
}

impl QueryFilter {
    /// Check whether a file satisfies this filter.
    pub fn matches(&self, file: &RemoteFile) -> bool {
        match self {
            Self::All => true,
            Self::InFolder(folder) => file.parent_id.as_deref() == Some(folder.as_str()),
            Self::FoldersOnly => file.is_folder(),
        }
    }
}

/// A single-page list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileQuery {
    pub filter: QueryFilter,
    pub page_size: u32,
}

impl FileQuery {
    /// Files anywhere in the account.
    pub fn all(page_size: u32) -> Self {
        Self::new(QueryFilter::All, page_size)
    }

    /// Direct children of `folder`.
    pub fn in_folder(folder: &FolderId, page_size: u32) -> Self {
        Self::new(QueryFilter::InFolder(folder.clone()), page_size)
    }

    /// Every folder, in a single maximal page.
    pub fn folders() -> Self {
        Self::new(QueryFilter::FoldersOnly, MAX_PAGE_SIZE)
    }

    /// Build a query, clamping the page size to what the service accepts.
    pub fn new(filter: QueryFilter, page_size: u32) -> Self {
        Self {
            filter,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

/// Remote object store the folder manager talks to.
///
/// Every call completes (or fails) before it returns; nothing is
/// retried. Implementations are handed out already authenticated.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// List one page of files matching `query`.
    ///
    /// # Errors
    /// - Network/authentication errors
    async fn list(&self, query: &FileQuery) -> Result<Vec<RemoteFile>>;

    /// Get metadata for a single file.
    ///
    /// # Errors
    /// - File not found
    async fn get(&self, id: &str) -> Result<RemoteFile>;

    /// Upload a new file.
    ///
    /// # Postconditions
    /// - The file exists under every folder in `file.parents`
    /// - Returns its metadata, including the shareable link
    async fn create(&self, file: NewFile) -> Result<RemoteFile>;

    /// Delete a file permanently.
    ///
    /// # Errors
    /// - File not found
    /// - Permission denied
    async fn delete(&self, id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(mime_type: &str, parent: Option<&str>) -> RemoteFile {
        RemoteFile {
            id: "id".to_string(),
            name: "name".to_string(),
            mime_type: mime_type.to_string(),
            size_bytes: None,
            created_at: Utc::now(),
            parent_id: parent.map(str::to_string),
            web_view_link: None,
            description: None,
        }
    }

    #[test]
    fn test_page_size_clamped() {
        assert_eq!(FileQuery::all(0).page_size, 1);
        assert_eq!(FileQuery::all(5000).page_size, 1000);
        assert_eq!(FileQuery::all(10).page_size, 10);
    }

    #[test]
    fn test_filter_matches() {
        let folder = FolderId::new("f1").unwrap();
        let in_folder = file("text/plain", Some("f1"));
        let elsewhere = file("text/plain", Some("f2"));
        let dir = file(FOLDER_MIME_TYPE, None);

        assert!(QueryFilter::InFolder(folder.clone()).matches(&in_folder));
        assert!(!QueryFilter::InFolder(folder).matches(&elsewhere));
        assert!(QueryFilter::FoldersOnly.matches(&dir));
        assert!(!QueryFilter::FoldersOnly.matches(&in_folder));
        assert!(QueryFilter::All.matches(&elsewhere));
    }

    #[test]
    fn test_remote_file_serialization() {
        let original = file("text/plain", Some("f1"));
        let json = serde_json::to_string(&original).unwrap();
        let deserialized: RemoteFile = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, original);
    }
}

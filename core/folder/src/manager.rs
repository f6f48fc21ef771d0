//! Folder file manager: list, upload and age-based purge.

use chrono::{NaiveDate, Utc};
use std::fmt::{self, Write as _};
use std::path::Path;
use std::sync::Arc;

use gdshare_common::{Error, FolderId, Result, RetentionPolicy};
use gdshare_storage::{FileQuery, NewFile, RemoteFile, StorageClient};

use crate::mime::mime_type_for;

/// Folder name reported when no folder matches the configured id.
pub const NO_FOLDER_FOUND: &str = "NONE FOUND";

/// Page size for folder-scoped listings; later pages are not fetched.
const FOLDER_PAGE_SIZE: u32 = 1000;

/// Result of an upload attempt.
#[derive(Debug)]
pub enum UploadOutcome {
    /// The file was stored; `link` is the view link without its query string.
    Uploaded { link: String },
    /// The local path does not name a regular file. Nothing was sent.
    MissingFile,
    /// Reading or sending the file failed.
    Failed(Error),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Uploaded { .. })
    }
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uploaded { link } => write!(f, "{}", link),
            Self::MissingFile => write!(f, "ERROR: The file does not exist."),
            Self::Failed(e) => write!(f, "ERROR: Unable to upload file.\n{}", e),
        }
    }
}

/// Outcome of a purge run.
#[derive(Debug, Default)]
pub struct PurgeReport {
    /// Ids removed.
    pub deleted: Vec<String>,
    /// Ids younger than the limit.
    pub kept: Vec<String>,
    /// Ids that were due but could not be deleted.
    pub failed: Vec<String>,
    text: String,
}

impl PurgeReport {
    /// The human-readable report.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for PurgeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Drop the query string from a link.
fn strip_query(link: &str) -> &str {
    link.split_once('?').map_or(link, |(base, _)| base)
}

/// `name mimeType id createdAt`, as used by folder listings and purge reports.
fn folder_entry_line(file: &RemoteFile) -> String {
    format!(
        "{} {} {} {}",
        file.name,
        file.mime_type,
        file.id,
        file.created_at.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Manages the files of a single remote folder.
///
/// Holds an already-authenticated storage client; every call is a
/// single-shot sequence of awaited requests.
pub struct FolderFileManager {
    client: Arc<dyn StorageClient>,
    folder_id: FolderId,
}

impl FolderFileManager {
    /// Create a manager scoped to `folder_id`.
    pub fn new(client: Arc<dyn StorageClient>, folder_id: FolderId) -> Self {
        Self { client, folder_id }
    }

    pub fn folder_id(&self) -> &FolderId {
        &self.folder_id
    }

    /// Report up to `page_size` files from anywhere in the drive.
    ///
    /// # Errors
    /// - Listing failed
    pub async fn list_files(&self, page_size: u32) -> Result<String> {
        let files = if page_size == 0 {
            Vec::new()
        } else {
            self.client.list(&FileQuery::all(page_size)).await?
        };

        let mut report = String::from("List of files stored on the drive:\n");
        if files.is_empty() {
            report.push_str("No files found.\n");
            return Ok(report);
        }

        for file in &files {
            let size = file
                .size_bytes
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                report,
                "Name: {}\tID: {}\tSize (bytes): {}\tUploaded: {}",
                file.name,
                file.id,
                size,
                file.created_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        Ok(report)
    }

    /// Report every folder with its id.
    pub async fn list_folders(&self) -> Result<String> {
        let folders = self.folders().await?;

        let mut report = String::from("Found following folders:\n");
        for folder in &folders {
            let _ = writeln!(report, "{}\t[ FolderID: {} ]", folder.name, folder.id);
        }

        Ok(report)
    }

    /// Name of the folder with `id`, or [`NO_FOLDER_FOUND`].
    ///
    /// Scans the folder list on every call.
    pub async fn folder_name(&self, id: &FolderId) -> Result<String> {
        let folders = self.folders().await?;

        Ok(folders
            .into_iter()
            .find(|folder| folder.id == id.as_str())
            .map(|folder| folder.name)
            .unwrap_or_else(|| NO_FOLDER_FOUND.to_string()))
    }

    async fn folders(&self) -> Result<Vec<RemoteFile>> {
        let entries = self.client.list(&FileQuery::folders()).await?;
        Ok(entries.into_iter().filter(RemoteFile::is_folder).collect())
    }

    /// Report the files directly inside the configured folder.
    pub async fn list_folder_contents(&self) -> Result<String> {
        let files = self.folder_files().await?;
        let name = self.folder_name(&self.folder_id).await?;

        let mut report = format!("Found files in folder: {}\n", name);
        for file in &files {
            report.push_str(&folder_entry_line(file));
            report.push('\n');
        }

        Ok(report)
    }

    async fn folder_files(&self) -> Result<Vec<RemoteFile>> {
        self.client
            .list(&FileQuery::in_folder(&self.folder_id, FOLDER_PAGE_SIZE))
            .await
    }

    /// Report one file's name.
    pub async fn get_file(&self, id: &str) -> Result<String> {
        let file = self.client.get(id).await?;
        Ok(format!("File {}: {}", id, file.name))
    }

    /// Upload a local file into the configured folder.
    ///
    /// The whole file is read into memory. Failures are reported through
    /// the outcome rather than returned as errors.
    pub async fn upload_file(&self, path: &Path, description: &str) -> UploadOutcome {
        let is_file = tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        let Some(name) = path.file_name().filter(|_| is_file) else {
            tracing::warn!("Upload skipped, no such file: {}", path.display());
            return UploadOutcome::MissingFile;
        };

        let new_file = NewFile {
            name: name.to_string_lossy().into_owned(),
            description: description.to_string(),
            mime_type: mime_type_for(path),
            parents: vec![self.folder_id.clone()],
            content: Vec::new(),
        };

        match self.send(new_file, path).await {
            Ok(link) => {
                tracing::info!("{} uploaded successfully", path.display());
                UploadOutcome::Uploaded { link }
            }
            Err(e) => {
                tracing::error!("Upload of {} failed: {}", path.display(), e);
                UploadOutcome::Failed(e)
            }
        }
    }

    async fn send(&self, mut new_file: NewFile, path: &Path) -> Result<String> {
        new_file.content = tokio::fs::read(path).await?;

        let created = self.client.create(new_file).await?;
        let link = created.web_view_link.ok_or_else(|| {
            Error::Network(format!("Upload of {} returned no view link", created.id))
        })?;

        Ok(strip_query(&link).to_string())
    }

    /// Delete every file in the folder at least `policy.max_days()` days old.
    ///
    /// Ages are whole UTC calendar days, so a user far east or west of UTC
    /// may see a file age by one day at a different local hour than midnight.
    ///
    /// # Errors
    /// - Listing the folder failed; per-file delete failures are only reported
    pub async fn purge_expired_files(&self, policy: RetentionPolicy) -> Result<PurgeReport> {
        self.purge_expired_files_as_of(policy, Utc::now().date_naive())
            .await
    }

    /// Purge as if today were `today`.
    pub async fn purge_expired_files_as_of(
        &self,
        policy: RetentionPolicy,
        today: NaiveDate,
    ) -> Result<PurgeReport> {
        let files = self.folder_files().await?;
        let mut report = PurgeReport::default();

        for file in &files {
            let days_old = RetentionPolicy::days_old(file.created_at, today);
            report.text.push_str(&folder_entry_line(file));
            report.text.push('\n');

            if policy.is_expired(days_old) {
                let _ = writeln!(
                    report.text,
                    "File: {} is {} days old and WILL be deleted",
                    file.name, days_old
                );
                match self.delete_file(&file.id).await {
                    Ok(()) => report.deleted.push(file.id.clone()),
                    Err(e) => {
                        let _ = writeln!(report.text, "ERROR: {}", e);
                        report.failed.push(file.id.clone());
                    }
                }
            } else {
                let _ = writeln!(
                    report.text,
                    "File: {} is {} days old and WILL NOT be deleted",
                    file.name, days_old
                );
                report.kept.push(file.id.clone());
            }
            report.text.push('\n');
        }

        tracing::info!(
            "Purge finished: {} deleted, {} kept, {} failed",
            report.deleted.len(),
            report.kept.len(),
            report.failed.len()
        );

        Ok(report)
    }

    /// Delete one file. No retry.
    pub async fn delete_file(&self, id: &str) -> Result<()> {
        match self.client.delete(id).await {
            Ok(()) => {
                tracing::info!("{} deleted successfully", id);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to delete {}: {}", id, e);
                Err(e)
            }
        }
    }
}

//! Google Drive API client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use gdshare_common::{Error, Result};

use super::auth::TokenManager;
use crate::client::{FileQuery, NewFile, QueryFilter, RemoteFile, StorageClient, FOLDER_MIME_TYPE};

/// Google Drive API base URL.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Google Drive upload API base URL.
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Fields requested for every file.
const FILE_FIELDS: &str = "id,name,mimeType,size,createdTime,parents,webViewLink,description";

/// Multipart boundary for uploads.
const BOUNDARY: &str = "gdshare_upload_boundary";

/// Google Drive file metadata from API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID.
    pub id: String,
    /// File name.
    pub name: String,
    /// MIME type.
    pub mime_type: String,
    /// File size in bytes, sent as a string (only for binary files).
    #[serde(default)]
    pub size: Option<String>,
    /// Created time.
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    /// Parent folder IDs.
    #[serde(default)]
    pub parents: Vec<String>,
    /// Shareable view link.
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl DriveFile {
    /// Get size as u64.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_ref().and_then(|s| s.parse().ok())
    }
}

impl TryFrom<DriveFile> for RemoteFile {
    type Error = Error;

    fn try_from(file: DriveFile) -> Result<Self> {
        let size_bytes = file.size_bytes();
        let created_at = file.created_time.ok_or_else(|| {
            Error::Serialization(format!("File {} has no createdTime", file.id))
        })?;

        Ok(RemoteFile {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            size_bytes,
            created_at,
            parent_id: file.parents.into_iter().next(),
            web_view_link: file.web_view_link,
            description: file.description,
        })
    }
}

/// Response from listing files.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Translate a filter into the Drive search syntax.
fn search_query(filter: &QueryFilter) -> String {
    match filter {
        QueryFilter::All => "trashed = false".to_string(),
        QueryFilter::InFolder(folder) => {
            format!("'{}' in parents and trashed = false", folder)
        }
        QueryFilter::FoldersOnly => {
            format!("mimeType = '{}' and trashed = false", FOLDER_MIME_TYPE)
        }
    }
}

/// Build a `multipart/related` body: JSON metadata, then the content.
fn multipart_body(metadata_json: &str, mime_type: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + metadata_json.len() + 256);

    // Metadata part
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata_json.as_bytes());
    body.extend_from_slice(b"\r\n");

    // Data part
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n");

    // End boundary
    body.extend_from_slice(format!("--{}--", BOUNDARY).as_bytes());
    body
}

/// Google Drive API client.
pub struct DriveClient {
    http: Client,
    token_manager: Arc<TokenManager>,
}

impl DriveClient {
    /// Create a new Drive client.
    ///
    /// # Errors
    /// - HTTP client construction failed
    pub fn new(token_manager: Arc<TokenManager>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("gdshare/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            token_manager,
        })
    }

    /// Get authorization header.
    async fn auth_header(&self) -> Result<String> {
        let token = self.token_manager.get_access_token().await?;
        Ok(format!("Bearer {}", token))
    }

    /// Handle API response with error checking.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::Network(format!("Failed to parse response: {}", e)))
        } else {
            Err(Self::status_error(status, response).await)
        }
    }

    async fn status_error(status: StatusCode, response: reqwest::Response) -> Error {
        match status {
            StatusCode::NOT_FOUND => Error::NotFound("Resource not found".to_string()),
            StatusCode::UNAUTHORIZED => {
                Error::Authentication("Invalid or expired token".to_string())
            }
            StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                Error::PermissionDenied(format!("Access denied: {}", body))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Error::Network(format!("API error: {} - {}", status, body))
            }
        }
    }
}

#[async_trait]
impl StorageClient for DriveClient {
    async fn list(&self, query: &FileQuery) -> Result<Vec<RemoteFile>> {
        let url = format!("{}/files", DRIVE_API_BASE);
        let auth = self.auth_header().await?;
        let q = search_query(&query.filter);
        let fields = format!("files({})", FILE_FIELDS);
        let page_size = query.page_size.to_string();

        tracing::debug!("Listing files: q={} pageSize={}", q, page_size);

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[
                ("q", q.as_str()),
                ("fields", fields.as_str()),
                ("pageSize", page_size.as_str()),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to list files: {}", e)))?;

        let list_response: FileListResponse = self.handle_response(response).await?;
        list_response
            .files
            .into_iter()
            .map(RemoteFile::try_from)
            .collect()
    }

    async fn get(&self, id: &str) -> Result<RemoteFile> {
        let url = format!("{}/files/{}", DRIVE_API_BASE, id);
        let auth = self.auth_header().await?;

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("fields", FILE_FIELDS), ("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to get file: {}", e)))?;

        let file: DriveFile = self.handle_response(response).await?;
        file.try_into()
    }

    async fn create(&self, file: NewFile) -> Result<RemoteFile> {
        let url = format!("{}/files", DRIVE_UPLOAD_BASE);
        let auth = self.auth_header().await?;

        let parents: Vec<&str> = file.parents.iter().map(|p| p.as_str()).collect();
        let metadata = serde_json::json!({
            "name": file.name,
            "description": file.description,
            "mimeType": file.mime_type,
            "parents": parents,
        });

        let metadata_json = serde_json::to_string(&metadata)
            .map_err(|e| Error::Serialization(format!("Failed to serialize metadata: {}", e)))?;
        let body = multipart_body(&metadata_json, &file.mime_type, &file.content);

        tracing::debug!("Uploading {} ({} bytes)", file.name, file.content.len());

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", BOUNDARY),
            )
            .query(&[
                ("uploadType", "multipart"),
                ("supportsAllDrives", "true"),
                ("fields", FILE_FIELDS),
            ])
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to upload file: {}", e)))?;

        let created: DriveFile = self.handle_response(response).await?;
        created.try_into()
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = format!("{}/files/{}", DRIVE_API_BASE, id);
        let auth = self.auth_header().await?;

        let response = self
            .http
            .delete(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to delete file: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::status_error(status, response).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdshare_common::FolderId;

    fn drive_file(size: Option<&str>, created: bool) -> DriveFile {
        DriveFile {
            id: "abc123".to_string(),
            name: "report.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: size.map(str::to_string),
            created_time: created.then(Utc::now),
            parents: vec!["folder".to_string(), "second".to_string()],
            web_view_link: Some("https://drive.google.com/file/d/abc123/view?usp=drivesdk".to_string()),
            description: None,
        }
    }

    #[test]
    fn test_drive_file_size_bytes() {
        assert_eq!(drive_file(Some("12345"), true).size_bytes(), Some(12345));
        assert_eq!(drive_file(None, true).size_bytes(), None);
        assert_eq!(drive_file(Some("junk"), true).size_bytes(), None);
    }

    #[test]
    fn test_drive_file_deserializes_api_payload() {
        let json = r#"{
            "id": "1x",
            "name": "notes.txt",
            "mimeType": "text/plain",
            "size": "42",
            "createdTime": "2024-02-01T10:15:00.000Z",
            "parents": ["f1"],
            "webViewLink": "https://drive.google.com/file/d/1x/view?usp=drivesdk"
        }"#;

        let file: DriveFile = serde_json::from_str(json).unwrap();
        let remote = RemoteFile::try_from(file).unwrap();

        assert_eq!(remote.size_bytes, Some(42));
        assert_eq!(remote.parent_id.as_deref(), Some("f1"));
        assert_eq!(remote.created_at.to_rfc3339(), "2024-02-01T10:15:00+00:00");
        assert!(remote.description.is_none());
    }

    #[test]
    fn test_remote_file_conversion() {
        let remote = RemoteFile::try_from(drive_file(Some("7"), true)).unwrap();
        assert_eq!(remote.parent_id.as_deref(), Some("folder"));
        assert_eq!(remote.size_bytes, Some(7));

        assert!(matches!(
            RemoteFile::try_from(drive_file(None, false)),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_search_query() {
        let folder = FolderId::new("F1").unwrap();
        assert_eq!(
            search_query(&QueryFilter::InFolder(folder)),
            "'F1' in parents and trashed = false"
        );
        assert_eq!(search_query(&QueryFilter::All), "trashed = false");
        assert!(search_query(&QueryFilter::FoldersOnly).contains(FOLDER_MIME_TYPE));
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_body(r#"{"name":"a.txt"}"#, "text/plain", b"hello");
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with(&format!("--{}\r\n", BOUNDARY)));
        assert!(text.contains("Content-Type: application/json; charset=UTF-8\r\n\r\n{\"name\":\"a.txt\"}\r\n"));
        assert!(text.contains("Content-Type: text/plain\r\n\r\nhello\r\n"));
        assert!(text.ends_with(&format!("--{}--", BOUNDARY)));
    }

    fn response(status: u16, body: &'static str) -> (StatusCode, reqwest::Response) {
        let response = http::Response::builder()
            .status(status)
            .body(body)
            .unwrap();
        let response = reqwest::Response::from(response);
        (response.status(), response)
    }

    #[tokio::test]
    async fn test_status_error_mapping() {
        let (status, resp) = response(401, "");
        assert!(matches!(
            DriveClient::status_error(status, resp).await,
            Error::Authentication(_)
        ));

        let (status, resp) = response(404, "");
        assert!(matches!(
            DriveClient::status_error(status, resp).await,
            Error::NotFound(_)
        ));

        let (status, resp) = response(403, "insufficientPermissions");
        match DriveClient::status_error(status, resp).await {
            Error::PermissionDenied(msg) => assert!(msg.contains("insufficientPermissions")),
            other => panic!("unexpected error: {}", other),
        }

        let (status, resp) = response(500, "backendError");
        match DriveClient::status_error(status, resp).await {
            Error::Network(msg) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("backendError"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}

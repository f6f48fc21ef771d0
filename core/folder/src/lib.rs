//! Folder-scoped file lifecycle management.
//!
//! This crate lists, uploads and purges files inside one remote folder.
//! It talks to the storage service only through
//! [`gdshare_storage::StorageClient`], so any backend (or a test double)
//! can be injected.

pub mod config;
pub mod manager;
pub mod mime;

pub use config::ShareConfig;
pub use manager::{FolderFileManager, PurgeReport, UploadOutcome, NO_FOLDER_FOUND};
pub use mime::mime_type_for;

//! Storage client abstraction for gdshare.
//!
//! This module provides a trait-based interface over the remote object
//! store that holds the shared folder, a Google Drive implementation, and
//! an in-memory double for tests.
//!
//! # Design Principles
//! - The folder manager only sees the four operations of [`StorageClient`]
//! - Authentication is finished before a client is handed out
//! - Unified error semantics: Consistent error types across backends

pub mod client;
pub mod gdrive;
pub mod memory;

pub use client::{FileQuery, NewFile, QueryFilter, RemoteFile, StorageClient, FOLDER_MIME_TYPE};
pub use memory::{MemoryStorage, StorageCall};

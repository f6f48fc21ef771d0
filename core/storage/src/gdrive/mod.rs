//! Google Drive storage client for gdshare.
//!
//! This module provides:
//! - OAuth2 authentication with automatic token refresh
//! - Client-secret and token file handling, with an interactive first login
//! - A Drive v3 implementation of the StorageClient trait

pub mod auth;
pub mod client;
pub mod credentials;

pub use auth::{AuthConfig, AuthManager, TokenManager, Tokens};
pub use client::{DriveClient, DriveFile};
pub use credentials::{load_client_secrets, CredentialProvider, TokenStore};

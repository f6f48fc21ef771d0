//! Common utilities and types shared across gdshare modules.
//!
//! This module provides the error taxonomy and the small value types
//! (folder identifiers, retention limits) that the storage and folder
//! crates agree on.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{FolderId, RetentionPolicy};

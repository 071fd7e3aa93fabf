//! pdf-library - an offline PDF document manager backend
//!
//! This crate provides per-user subjects (folders), PDF metadata and content with:
//! - redb embedded database for users, subjects, file metadata and blobs (ACID, MVCC)
//! - Live queries: subscriptions re-fetch their scope after every write to a collection
//! - Swappable blob backends (embedded collection, plain directory)
//! - REST API with multipart upload and Server-Sent Events for live views

pub mod api;
pub mod config;
pub mod library;
pub mod notify;
pub mod object_store;
pub mod storage;
pub mod subscription;
#[cfg(test)]
pub mod testutil;

use config::Config;
use library::Library;
use tokio_util::sync::CancellationToken;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub library: Library,
    /// Cancelled when the server starts shutting down
    pub shutdown: CancellationToken,
}

//! Shared test helpers for pdf-library unit tests.

use std::num::NonZeroU32;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{Config, NodeConfig, StorageConfig};
use crate::library::Library;
use crate::object_store::EmbeddedStore;
use crate::storage::{Store, StoreOptions};
use crate::AppState;

/// Hashing cost low enough to keep signup/login tests fast.
pub fn fast_options() -> StoreOptions {
    StoreOptions {
        password_iterations: NonZeroU32::new(1_000).expect("non-zero"),
    }
}

/// Create a test AppState with a temporary store and embedded blob backend.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig::default(),
        test_mode: true,
        max_upload_size: 1024 * 1024, // 1MB for tests
        password_iterations: 1_000,
    };

    let store = Store::open_with(&data_dir, fast_options()).expect("Failed to open test store");
    let blobs = Arc::new(EmbeddedStore::new(store.clone()));

    Arc::new(AppState {
        config,
        library: Library::new(store, blobs),
        shutdown: CancellationToken::new(),
    })
}

use std::num::NonZeroU32;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use pdf_library::object_store::{BlobStore, DirectoryStore, EmbeddedStore, ObjectStoreError};
use pdf_library::storage::{Store, StoreOptions};

fn embedded_store() -> (tempfile::TempDir, EmbeddedStore) {
    let dir = tempfile::tempdir().unwrap();
    let options = StoreOptions {
        password_iterations: NonZeroU32::new(1_000).unwrap(),
    };
    let store = Store::open_with(dir.path().join("data"), options).unwrap();
    (dir, EmbeddedStore::new(store))
}

fn directory_store() -> (tempfile::TempDir, DirectoryStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = DirectoryStore::new(dir.path().join("blobs")).unwrap();
    (dir, store)
}

/// Every backend must behave the same through the trait.
async fn exercise_backend(store: &dyn BlobStore) {
    assert!(!store.exists("u1/doc.pdf").await.unwrap());

    let data = Bytes::from_static(b"%PDF-1.7 body");
    let stored = store.upload("u1/doc.pdf", data.clone(), None).await.unwrap();
    assert_eq!(stored.path, "u1/doc.pdf");
    assert_eq!(stored.size, data.len() as u64);
    assert!(!stored.url.is_empty());

    assert!(store.exists("u1/doc.pdf").await.unwrap());
    assert_eq!(store.get("u1/doc.pdf").await.unwrap(), data);

    store
        .upload("u1/doc.pdf", Bytes::from_static(b"second"), None)
        .await
        .unwrap();
    assert_eq!(
        store.get("u1/doc.pdf").await.unwrap(),
        Bytes::from_static(b"second")
    );

    store.delete("u1/doc.pdf").await.unwrap();
    assert!(!store.exists("u1/doc.pdf").await.unwrap());

    // Deleting again is fine
    store.delete("u1/doc.pdf").await.unwrap();

    let missing = store.get("u1/doc.pdf").await;
    assert!(matches!(missing, Err(ObjectStoreError::NotFound(_))));
}

#[tokio::test]
async fn test_embedded_store_behaviour() {
    let (_dir, store) = embedded_store();
    exercise_backend(&store).await;
}

#[tokio::test]
async fn test_directory_store_behaviour() {
    let (_dir, store) = directory_store();
    exercise_backend(&store).await;
}

#[tokio::test]
async fn test_embedded_store_url() {
    let (_dir, store) = embedded_store();
    let stored = store
        .upload("u1/a.pdf", Bytes::from_static(b"%PDF"), None)
        .await
        .unwrap();
    assert_eq!(stored.url, "local://u1/a.pdf");
}

#[tokio::test]
async fn test_directory_store_writes_plain_files() {
    let (dir, store) = directory_store();
    let stored = store
        .upload("u1/nested/a.pdf", Bytes::from_static(b"%PDF"), None)
        .await
        .unwrap();

    let on_disk = std::fs::read(dir.path().join("blobs/u1/nested/a.pdf")).unwrap();
    assert_eq!(on_disk, b"%PDF");
    assert!(stored.url.starts_with("file://"));
}

#[tokio::test]
async fn test_upload_reports_progress() {
    let (_dir, store) = directory_store();
    let seen = Arc::new(Mutex::new(Vec::<u8>::new()));
    let record = Arc::clone(&seen);
    let progress = move |percent: u8| record.lock().push(percent);

    let data = Bytes::from(vec![7u8; 200 * 1024]);
    store
        .upload("u1/big.pdf", data, Some(&progress))
        .await
        .unwrap();

    let seen = seen.lock();
    assert_eq!(seen.first(), Some(&0));
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert!(seen.len() > 2);
}

#[tokio::test]
async fn test_empty_upload_reports_completion() {
    let (_dir, store) = embedded_store();
    let seen = Arc::new(Mutex::new(Vec::<u8>::new()));
    let record = Arc::clone(&seen);
    let progress = move |percent: u8| record.lock().push(percent);

    let stored = store
        .upload("u1/empty.pdf", Bytes::new(), Some(&progress))
        .await
        .unwrap();
    assert_eq!(stored.size, 0);
    assert_eq!(*seen.lock(), vec![0, 100]);
}

#[tokio::test]
async fn test_rejects_escaping_paths() {
    let (_dir, directory) = directory_store();
    let (_dir2, embedded) = embedded_store();

    for path in ["", "/etc/passwd", "../outside.pdf", "u1/../../x.pdf", "u1//a.pdf", "a\\b.pdf"] {
        let result = directory.upload(path, Bytes::from_static(b"x"), None).await;
        assert!(
            matches!(result, Err(ObjectStoreError::InvalidPath(_))),
            "directory store accepted {path:?}"
        );
        let result = embedded.upload(path, Bytes::from_static(b"x"), None).await;
        assert!(
            matches!(result, Err(ObjectStoreError::InvalidPath(_))),
            "embedded store accepted {path:?}"
        );
    }
}

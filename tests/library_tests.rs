use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use pdf_library::library::{resolve_mime_type, Library, LibraryError, Upload};
use pdf_library::object_store::{BlobStore, DirectoryStore, EmbeddedStore};
use pdf_library::storage::{Store, StoreError, StoreOptions};

fn test_library() -> (tempfile::TempDir, Library) {
    let dir = tempfile::tempdir().unwrap();
    let options = StoreOptions {
        password_iterations: NonZeroU32::new(1_000).unwrap(),
    };
    let store = Store::open_with(dir.path().join("data"), options).unwrap();
    let blobs = Arc::new(EmbeddedStore::new(store.clone()));
    (dir, Library::new(store, blobs))
}

fn pdf(name: &str) -> Upload {
    Upload {
        name: name.to_string(),
        content_type: Some("application/pdf".to_string()),
        content: Bytes::from(format!("%PDF-1.7 {name}")),
    }
}

#[tokio::test]
async fn test_upload_pdf_stores_metadata_and_content() {
    let (_dir, library) = test_library();
    let subject = library.store().create_subject("u1", "Math", None).unwrap();

    let file = library
        .upload_pdf("u1", &subject.id, pdf("notes.pdf"), None)
        .await
        .unwrap();

    assert_eq!(file.name, "notes.pdf");
    assert_eq!(file.mime_type, "application/pdf");
    assert_eq!(file.size, "%PDF-1.7 notes.pdf".len() as u64);
    assert!(!file.is_starred);
    assert!(file.storage_path.starts_with("u1/"));
    assert!(file.storage_path.ends_with(".pdf"));
    assert_eq!(file.url, format!("local://{}", file.storage_path));

    let (found, content) = library.read_content("u1", &file.id).await.unwrap();
    assert_eq!(found.id, file.id);
    assert_eq!(content, Bytes::from("%PDF-1.7 notes.pdf"));
}

#[tokio::test]
async fn test_upload_rejects_non_pdf() {
    let (_dir, library) = test_library();
    let upload = Upload {
        name: "photo.png".to_string(),
        content_type: Some("image/png".to_string()),
        content: Bytes::from_static(b"\x89PNG"),
    };

    let result = library.upload_pdf("u1", "s1", upload, None).await;
    assert!(matches!(result, Err(LibraryError::UnsupportedType(ref t)) if t == "image/png"));
    assert!(library.store().list_files("u1").unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_guesses_type_from_name() {
    let (_dir, library) = test_library();
    let upload = Upload {
        name: "scan.pdf".to_string(),
        content_type: Some("application/octet-stream".to_string()),
        content: Bytes::from_static(b"%PDF"),
    };

    let file = library.upload_pdf("u1", "s1", upload, None).await.unwrap();
    assert_eq!(file.mime_type, "application/pdf");
}

#[test]
fn test_resolve_mime_type() {
    assert_eq!(resolve_mime_type("a.pdf", None), "application/pdf");
    assert_eq!(resolve_mime_type("a.pdf", Some("  ")), "application/pdf");
    assert_eq!(resolve_mime_type("a.bin", Some("Application/PDF")), "application/pdf");
    assert_eq!(resolve_mime_type("noext", None), "application/octet-stream");
}

#[tokio::test]
async fn test_delete_file_removes_blob() {
    let (_dir, library) = test_library();
    let file = library.upload_pdf("u1", "s1", pdf("a.pdf"), None).await.unwrap();

    library.delete_file("u1", &file.id).await.unwrap();

    assert!(library.store().get_file(&file.id).unwrap().is_none());
    assert!(!library.blobs().exists(&file.storage_path).await.unwrap());
}

#[tokio::test]
async fn test_delete_file_tolerates_missing_blob() {
    let (_dir, library) = test_library();
    let file = library.upload_pdf("u1", "s1", pdf("a.pdf"), None).await.unwrap();
    library.blobs().delete(&file.storage_path).await.unwrap();

    library.delete_file("u1", &file.id).await.unwrap();
    assert!(library.store().get_file(&file.id).unwrap().is_none());
}

#[tokio::test]
async fn test_other_users_cannot_touch_files() {
    let (_dir, library) = test_library();
    let file = library.upload_pdf("u1", "s1", pdf("a.pdf"), None).await.unwrap();

    let read = library.read_content("u2", &file.id).await;
    assert!(matches!(read, Err(LibraryError::Store(StoreError::NotFound { .. }))));

    let delete = library.delete_file("u2", &file.id).await;
    assert!(matches!(delete, Err(LibraryError::Store(StoreError::NotFound { .. }))));
    assert!(library.store().get_file(&file.id).unwrap().is_some());
}

#[tokio::test]
async fn test_delete_subject_cascades() {
    let (_dir, library) = test_library();
    let store = library.store();
    let math = store.create_subject("u1", "Math", None).unwrap();
    let art = store.create_subject("u1", "Art", None).unwrap();

    let doomed = library.upload_pdf("u1", &math.id, pdf("a.pdf"), None).await.unwrap();
    let kept = library.upload_pdf("u1", &art.id, pdf("b.pdf"), None).await.unwrap();

    library.delete_subject("u1", &math.id).await.unwrap();

    assert!(store.get_subject(&math.id).unwrap().is_none());
    assert!(store.get_file(&doomed.id).unwrap().is_none());
    assert!(!library.blobs().exists(&doomed.storage_path).await.unwrap());
    assert!(store.get_file(&kept.id).unwrap().is_some());
    assert!(library.blobs().exists(&kept.storage_path).await.unwrap());
}

#[tokio::test]
async fn test_delete_subject_checks_owner() {
    let (_dir, library) = test_library();
    let math = library.store().create_subject("u1", "Math", None).unwrap();

    let result = library.delete_subject("u2", &math.id).await;
    assert!(matches!(result, Err(LibraryError::Store(StoreError::NotFound { .. }))));
    assert!(library.store().get_subject(&math.id).unwrap().is_some());
}

#[tokio::test]
async fn test_search_recent_favorites_stats() {
    let (_dir, library) = test_library();
    library.store().create_subject("u1", "Math", None).unwrap();

    let mut files = Vec::new();
    for name in ["Algebra Notes.pdf", "geometry.pdf", "algebra-homework.pdf"] {
        files.push(library.upload_pdf("u1", "s1", pdf(name), None).await.unwrap());
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    library.upload_pdf("u2", "s9", pdf("algebra.pdf"), None).await.unwrap();
    library.store().toggle_star(&files[1].id).unwrap();

    let found: Vec<String> = library
        .search("u1", "ALGEBRA")
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(found, vec!["algebra-homework.pdf", "Algebra Notes.pdf"]);
    assert!(library.search("u1", "   ").unwrap().is_empty());

    let recent = library.recent("u1", 2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, files[2].id);
    assert_eq!(recent[1].id, files[1].id);

    let favorites = library.favorites("u1").unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].name, "geometry.pdf");

    let stats = library.stats("u1").unwrap();
    assert_eq!(stats.subjects, 1);
    assert_eq!(stats.files, 3);
    assert_eq!(stats.starred_files, 1);
    assert_eq!(stats.total_bytes, files.iter().map(|f| f.size).sum::<u64>());
}

#[tokio::test]
async fn test_library_over_directory_backend() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open_with(
        dir.path().join("data"),
        StoreOptions {
            password_iterations: NonZeroU32::new(1_000).unwrap(),
        },
    )
    .unwrap();
    let blobs = Arc::new(DirectoryStore::new(dir.path().join("blobs")).unwrap());
    let library = Library::new(store, blobs);

    let file = library.upload_pdf("u1", "s1", pdf("a.pdf"), None).await.unwrap();
    assert!(file.url.starts_with("file://"));
    assert!(dir.path().join("blobs").join(&file.storage_path).exists());

    let (_, content) = library.read_content("u1", &file.id).await.unwrap();
    assert_eq!(content, Bytes::from("%PDF-1.7 a.pdf"));
}

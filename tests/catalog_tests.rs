use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use files_manager::access::AccessGate;
use files_manager::auth::Requestor;
use files_manager::catalog::{FileCatalog, NewFile, PAGE_SIZE};
use files_manager::object_store::{LocalStore, ObjectStore};
use files_manager::queue::{Delivery, DurableQueue, JobQueue, QueueError};
use files_manager::storage::models::{FileType, Job, UserRecord};
use files_manager::storage::{Database, DatabaseError};
use files_manager::Error;

struct Harness {
    _dir: tempfile::TempDir,
    db: Database,
    queue: Arc<DurableQueue>,
    catalog: FileCatalog,
    access: AccessGate,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    let files_dir = dir.path().join("files");
    let store: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(&files_dir).unwrap());
    let queue = Arc::new(DurableQueue::new(db.clone(), Duration::from_secs(60), 3));
    let catalog = FileCatalog::new(db.clone(), Arc::clone(&store), queue.clone(), &files_dir);
    let access = AccessGate::new(db.clone(), store);
    Harness {
        _dir: dir,
        db,
        queue,
        catalog,
        access,
    }
}

fn user(id: &str) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        password_hash: String::new(),
    }
}

fn new_file(name: &str, file_type: &str, data: Option<&'static str>) -> NewFile {
    NewFile {
        name: Some(name.to_string()),
        file_type: Some(file_type.to_string()),
        parent_id: None,
        is_public: false,
        data: data.map(|s| Bytes::from_static(s.as_bytes())),
    }
}

/// A queue whose backing store is down.
struct UnavailableQueue;

#[async_trait]
impl JobQueue for UnavailableQueue {
    async fn enqueue(&self, _job: Job) -> Result<(), QueueError> {
        Err(QueueError::Storage(DatabaseError::Io(std::io::Error::other(
            "queue down",
        ))))
    }

    async fn dequeue(&self) -> Result<Delivery, QueueError> {
        std::future::pending().await
    }

    async fn complete(
        &self,
        _delivery: &Delivery,
        _outcome: &files_manager::Result<()>,
    ) -> Result<(), QueueError> {
        Ok(())
    }
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_image_enqueues_thumbnail_job() {
    let h = harness();
    let u1 = user("u1");

    let file = h
        .catalog
        .upload(&u1, new_file("photo.png", "image", Some("pixels")))
        .await
        .unwrap();
    assert_eq!(file.file_type, FileType::Image);
    assert_eq!(file.user_id, "u1");

    let delivery = h.queue.try_dequeue().unwrap().expect("job should be queued");
    assert_eq!(delivery.job, Job::new(file.id.clone(), "u1"));

    let local_path = file.local_path.expect("image should have a blob");
    assert_eq!(std::fs::read(local_path).unwrap(), b"pixels");
}

#[tokio::test]
async fn test_upload_plain_file_and_folder_enqueue_nothing() {
    let h = harness();
    let u1 = user("u1");

    let file = h
        .catalog
        .upload(&u1, new_file("notes.txt", "file", Some("hello")))
        .await
        .unwrap();
    assert!(file.local_path.is_some());

    let folder = h
        .catalog
        .upload(&u1, new_file("docs", "folder", None))
        .await
        .unwrap();
    assert!(folder.local_path.is_none());

    assert_eq!(h.db.job_count().unwrap(), 0);
}

#[tokio::test]
async fn test_upload_validation() {
    let h = harness();
    let u1 = user("u1");

    let cases = [
        (
            NewFile {
                name: None,
                ..new_file("x", "file", Some("data"))
            },
            "Missing name",
        ),
        (new_file("x", "video", Some("data")), "Missing type"),
        (new_file("x", "file", None), "Missing data"),
        (
            NewFile {
                parent_id: Some("nope".to_string()),
                ..new_file("x", "file", Some("data"))
            },
            "Parent not found",
        ),
    ];

    for (request, expected) in cases {
        match h.catalog.upload(&u1, request).await {
            Err(Error::InvalidRequest(message)) => assert_eq!(message, expected),
            other => panic!("expected {expected:?}, got {other:?}"),
        }
    }
    assert_eq!(h.db.counts().unwrap().1, 0);
}

#[tokio::test]
async fn test_upload_into_parent() {
    let h = harness();
    let u1 = user("u1");

    let folder = h
        .catalog
        .upload(&u1, new_file("docs", "folder", None))
        .await
        .unwrap();
    let plain = h
        .catalog
        .upload(&u1, new_file("a.txt", "file", Some("a")))
        .await
        .unwrap();

    let child = h
        .catalog
        .upload(
            &u1,
            NewFile {
                parent_id: Some(folder.id.clone()),
                ..new_file("b.txt", "file", Some("b"))
            },
        )
        .await
        .unwrap();
    assert_eq!(child.parent_id.as_deref(), Some(folder.id.as_str()));

    let under_file = h
        .catalog
        .upload(
            &u1,
            NewFile {
                parent_id: Some(plain.id.clone()),
                ..new_file("c.txt", "file", Some("c"))
            },
        )
        .await;
    assert!(matches!(under_file, Err(Error::InvalidRequest(m)) if m == "Parent is not a folder"));

    // Someone else's folder is invisible
    let foreign = h
        .catalog
        .upload(
            &user("u2"),
            NewFile {
                parent_id: Some(folder.id.clone()),
                ..new_file("d.txt", "file", Some("d"))
            },
        )
        .await;
    assert!(matches!(foreign, Err(Error::InvalidRequest(m)) if m == "Parent not found"));

    let listed = h.catalog.list(&u1, Some(folder.id.as_str()), 0).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, child.id);
}

#[tokio::test]
async fn test_enqueue_failure_keeps_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    let files_dir = dir.path().join("files");
    let store: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(&files_dir).unwrap());
    let catalog = FileCatalog::new(db.clone(), store, Arc::new(UnavailableQueue), &files_dir);

    let file = catalog
        .upload(&user("u1"), new_file("photo.png", "image", Some("pixels")))
        .await
        .expect("upload succeeds without a queue");

    assert_eq!(db.get_file(&file.id).unwrap(), Some(file.clone()));
    assert!(matches!(
        catalog.enqueue_thumbnail_job(&file).await,
        Err(Error::TransientStore(_))
    ));
}

// ============================================================================
// Visibility
// ============================================================================

#[tokio::test]
async fn test_publish_unpublish_round_trip() {
    let h = harness();
    let u1 = user("u1");
    let file = h
        .catalog
        .upload(&u1, new_file("photo.png", "image", Some("pixels")))
        .await
        .unwrap();

    let published = h.catalog.publish(&u1, &file.id).unwrap();
    assert!(published.is_public);
    assert!(h.catalog.show(&u1, &file.id).unwrap().is_public);

    let unpublished = h.catalog.unpublish(&u1, &file.id).unwrap();
    assert!(!unpublished.is_public);
    assert!(!h.catalog.show(&u1, &file.id).unwrap().is_public);
}

#[tokio::test]
async fn test_non_owner_visibility_change_is_not_found() {
    let h = harness();
    let (u1, u2) = (user("u1"), user("u2"));
    let file = h
        .catalog
        .upload(&u1, new_file("photo.png", "image", Some("pixels")))
        .await
        .unwrap();

    h.catalog.publish(&u1, &file.id).unwrap();

    assert!(matches!(h.catalog.publish(&u2, &file.id), Err(Error::NotFound)));
    assert!(matches!(h.catalog.unpublish(&u2, &file.id), Err(Error::NotFound)));
    assert!(h.db.get_file(&file.id).unwrap().unwrap().is_public);

    // Same outcome as a file that does not exist at all
    assert!(matches!(h.catalog.publish(&u2, "missing"), Err(Error::NotFound)));
    assert!(matches!(h.catalog.show(&u2, &file.id), Err(Error::NotFound)));
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_list_pages() {
    let h = harness();
    let u1 = user("u1");

    let mut ids = Vec::new();
    for i in 0..PAGE_SIZE + 5 {
        let file = h
            .catalog
            .upload(&u1, new_file(&format!("{i}.txt"), "file", Some("x")))
            .await
            .unwrap();
        ids.push(file.id);
    }
    h.catalog
        .upload(&user("u2"), new_file("other.txt", "file", Some("x")))
        .await
        .unwrap();

    let first: Vec<String> = h
        .catalog
        .list(&u1, None, 0)
        .unwrap()
        .into_iter()
        .map(|f| f.id)
        .collect();
    let second: Vec<String> = h
        .catalog
        .list(&u1, Some("0"), 1)
        .unwrap()
        .into_iter()
        .map(|f| f.id)
        .collect();

    assert_eq!(first, ids[..PAGE_SIZE]);
    assert_eq!(second, ids[PAGE_SIZE..]);
    assert!(h.catalog.list(&u1, None, 2).unwrap().is_empty());
}

// ============================================================================
// Access
// ============================================================================

#[tokio::test]
async fn test_open_private_image() {
    let h = harness();
    let (u1, u2) = (user("u1"), user("u2"));
    let file = h
        .catalog
        .upload(&u1, new_file("photo.png", "image", Some("pixels")))
        .await
        .unwrap();

    let content = h
        .access
        .open(&Requestor::User(u1.clone()), &file.id, None)
        .await
        .unwrap();
    assert_eq!(content.data, Bytes::from_static(b"pixels"));
    assert_eq!(content.mime_type, "image/png");

    assert!(matches!(
        h.access.open(&Requestor::User(u2), &file.id, None).await,
        Err(Error::NotFound)
    ));
    assert!(matches!(
        h.access.open(&Requestor::Anonymous, &file.id, None).await,
        Err(Error::NotFound)
    ));
    assert!(matches!(
        h.access.open(&Requestor::Anonymous, "missing", None).await,
        Err(Error::NotFound)
    ));
}

#[tokio::test]
async fn test_open_public_file_and_missing_variant() {
    let h = harness();
    let u1 = user("u1");
    let file = h
        .catalog
        .upload(&u1, new_file("photo.png", "image", Some("pixels")))
        .await
        .unwrap();
    h.catalog.publish(&u1, &file.id).unwrap();

    let content = h
        .access
        .open(&Requestor::Anonymous, &file.id, None)
        .await
        .unwrap();
    assert_eq!(content.data, Bytes::from_static(b"pixels"));

    // Variants only exist once the pipeline has run
    assert!(matches!(
        h.access.open(&Requestor::Anonymous, &file.id, Some(100)).await,
        Err(Error::NotFound)
    ));
}

#[tokio::test]
async fn test_open_folder() {
    let h = harness();
    let (u1, u2) = (user("u1"), user("u2"));
    let folder = h
        .catalog
        .upload(&u1, new_file("docs", "folder", None))
        .await
        .unwrap();

    assert!(matches!(
        h.access.open(&Requestor::User(u1.clone()), &folder.id, None).await,
        Err(Error::InvalidRequest(m)) if m == "A folder doesn't have content"
    ));
    // Denial wins over the folder check
    assert!(matches!(
        h.access.open(&Requestor::User(u2), &folder.id, None).await,
        Err(Error::NotFound)
    ));

    h.catalog.publish(&u1, &folder.id).unwrap();
    assert!(matches!(
        h.access.open(&Requestor::Anonymous, &folder.id, None).await,
        Err(Error::InvalidRequest(_))
    ));
}

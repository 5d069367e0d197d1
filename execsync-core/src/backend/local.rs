//! Document database kept in memory, optionally persisted to disk.
//!
//! With a data directory, each collection lives in one JSON file at
//! `<root>/<path segments>.json`. Live queries on a file-backed store poll
//! that file so writes from another process show up as changes. Writers take
//! an exclusive lock on `<collection>.lock` for the whole read-modify-write,
//! so stores in different processes never overwrite each other.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fs2::FileExt;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use super::{
    ChangeKind, CollectionPath, Document, DocumentChange, DocumentStore, Fields, Snapshot,
    SnapshotReceiver,
};
use crate::constants::DEFAULT_POLL_INTERVAL;
use crate::error::{ExecSyncError, ExecSyncResult};

const EVENT_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct LocalDocumentStore {
    inner: Arc<Inner>,
}

struct Inner {
    root: Option<PathBuf>,
    poll_interval: Duration,
    collections: Mutex<HashMap<CollectionPath, Collection>>,
    // Writers within this process. Other processes are kept out by the file lock.
    write_lock: tokio::sync::Mutex<()>,
}

struct Collection {
    documents: Vec<Document>,
    events: broadcast::Sender<Snapshot>,
}

impl Collection {
    fn new(documents: Vec<Document>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Collection { documents, events }
    }
}

impl LocalDocumentStore {
    /// A store that forgets everything when dropped.
    pub fn in_memory() -> Self {
        Self::build(None, DEFAULT_POLL_INTERVAL)
    }

    /// A store persisted under `root`.
    pub fn file_backed(root: PathBuf, poll_interval: Duration) -> Self {
        Self::build(Some(root), poll_interval)
    }

    fn build(root: Option<PathBuf>, poll_interval: Duration) -> Self {
        LocalDocumentStore {
            inner: Arc::new(Inner {
                root,
                poll_interval,
                collections: Mutex::new(HashMap::new()),
                write_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Where a collection is persisted, if this store is file backed.
    pub fn collection_file(&self, path: &CollectionPath) -> Option<PathBuf> {
        let root = self.inner.root.as_ref()?;
        let segments = path.segments();
        let mut file = root.clone();
        for segment in &segments[..segments.len() - 1] {
            file.push(segment);
        }
        file.push(format!("{}.json", segments[segments.len() - 1]));
        Some(file)
    }

    /// Bring the cached collection in line with disk and broadcast any
    /// difference. Returns the current documents.
    async fn refresh(&self, path: &CollectionPath) -> ExecSyncResult<Vec<Document>> {
        let on_disk = match self.collection_file(path) {
            Some(file) => Some(read_documents(&file).await?),
            None => None,
        };

        let mut collections = self.lock_collections()?;
        let collection = collections
            .entry(path.clone())
            .or_insert_with(|| Collection::new(Vec::new()));

        if let Some(documents) = on_disk {
            let changes = diff_documents(&collection.documents, &documents);
            if !changes.is_empty() {
                tracing::debug!(
                    collection = %path,
                    changes = changes.len(),
                    "collection changed on disk"
                );
                collection.documents = documents;
                // No receivers is fine: nobody is listening yet.
                let _ = collection.events.send(Snapshot {
                    documents: collection.documents.clone(),
                    changes,
                });
            }
        }

        Ok(collection.documents.clone())
    }

    /// Persist `documents` and publish them with `changes`.
    async fn commit(
        &self,
        path: &CollectionPath,
        documents: Vec<Document>,
        changes: Vec<DocumentChange>,
    ) -> ExecSyncResult<()> {
        if let Some(file) = self.collection_file(path) {
            write_documents(&file, &documents).await?;
        }

        let mut collections = self.lock_collections()?;
        let collection = collections
            .entry(path.clone())
            .or_insert_with(|| Collection::new(Vec::new()));
        collection.documents = documents;
        let _ = collection.events.send(Snapshot {
            documents: collection.documents.clone(),
            changes,
        });
        Ok(())
    }

    /// Exclusive lock on the collection file, held until the guard drops.
    /// In-memory stores have nothing to lock.
    async fn lock_file(&self, path: &CollectionPath) -> ExecSyncResult<Option<FileLock>> {
        match self.collection_file(path) {
            Some(file) => FileLock::acquire(file.with_extension("lock")).await.map(Some),
            None => Ok(None),
        }
    }

    fn lock_collections(
        &self,
    ) -> ExecSyncResult<std::sync::MutexGuard<'_, HashMap<CollectionPath, Collection>>> {
        self.inner
            .collections
            .lock()
            .map_err(|_| ExecSyncError::Persistence("collection state poisoned".into()))
    }

    /// Documents and a change listener taken under one lock, so no change
    /// can fall between the two.
    fn listen(
        &self,
        path: &CollectionPath,
    ) -> ExecSyncResult<(Vec<Document>, broadcast::Receiver<Snapshot>)> {
        let collections = self.lock_collections()?;
        collections
            .get(path)
            .map(|c| (c.documents.clone(), c.events.subscribe()))
            .ok_or_else(|| ExecSyncError::Persistence(format!("collection {} not loaded", path)))
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn add_document(&self, path: &CollectionPath, fields: Fields) -> ExecSyncResult<String> {
        let _guard = self.inner.write_lock.lock().await;
        let _file_lock = self.lock_file(path).await?;

        let mut documents = self.refresh(path).await?;
        let document = Document {
            id: Uuid::new_v4().simple().to_string(),
            fields,
        };
        let id = document.id.clone();
        documents.push(document.clone());

        self.commit(path, documents, vec![DocumentChange::added(document)])
            .await?;
        tracing::debug!(collection = %path, id = %id, "document added");
        Ok(id)
    }

    async fn delete_document(&self, path: &CollectionPath, id: &str) -> ExecSyncResult<()> {
        let _guard = self.inner.write_lock.lock().await;
        let _file_lock = self.lock_file(path).await?;

        let mut documents = self.refresh(path).await?;
        let Some(index) = documents.iter().position(|d| d.id == id) else {
            // Deleting a missing document succeeds, as hosted stores do.
            return Ok(());
        };
        let removed = documents.remove(index);

        self.commit(
            path,
            documents,
            vec![DocumentChange {
                kind: ChangeKind::Removed,
                document: removed,
            }],
        )
        .await?;
        tracing::debug!(collection = %path, id = %id, "document deleted");
        Ok(())
    }

    async fn subscribe_to_collection(
        &self,
        path: &CollectionPath,
    ) -> ExecSyncResult<SnapshotReceiver> {
        self.refresh(path).await?;
        let (documents, mut events) = self.listen(path)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let initial = Snapshot {
            changes: documents.iter().cloned().map(DocumentChange::added).collect(),
            documents,
        };
        let _ = tx.send(Ok(initial));

        let store = self.clone();
        let path = path.clone();
        let polling = store.inner.root.is_some();
        let mut ticker = tokio::time::interval(store.inner.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tokio::spawn(async move {
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    event = events.recv() => match event {
                        Ok(snapshot) => {
                            if tx.send(Ok(snapshot)).is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(collection = %path, skipped, "live query lagged, resyncing");
                            let documents = match store.refresh(&path).await {
                                Ok(documents) => documents,
                                Err(e) => {
                                    let _ = tx.send(Err(e));
                                    break;
                                }
                            };
                            let resync = Snapshot { documents, changes: Vec::new() };
                            if tx.send(Ok(resync)).is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = ticker.tick(), if polling => {
                        if let Err(e) = store.refresh(&path).await {
                            tracing::error!(collection = %path, error = %e, "live query failed");
                            let _ = tx.send(Err(e));
                            break;
                        }
                    }
                }
            }
            tracing::debug!(collection = %path, "live query closed");
        });

        Ok(rx)
    }
}

/// Advisory lock file shared by every store using the same data directory.
struct FileLock {
    _file: File,
}

impl FileLock {
    async fn acquire(lock_path: PathBuf) -> ExecSyncResult<Self> {
        let shown = lock_path.display().to_string();
        tokio::task::spawn_blocking(move || -> std::io::Result<FileLock> {
            if let Some(parent) = lock_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .read(true)
                .write(true)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(FileLock { _file: file })
        })
        .await
        .map_err(|e| ExecSyncError::Persistence(format!("lock task for {shown} failed: {e}")))?
        .map_err(|e| ExecSyncError::Persistence(format!("failed to lock {shown}: {e}")))
    }
}

/// Changes that turn `old` into `new`, keyed by document id.
fn diff_documents(old: &[Document], new: &[Document]) -> Vec<DocumentChange> {
    let previous: HashMap<&str, &Document> = old.iter().map(|d| (d.id.as_str(), d)).collect();
    let current: HashMap<&str, &Document> = new.iter().map(|d| (d.id.as_str(), d)).collect();

    let mut changes: Vec<DocumentChange> = new
        .iter()
        .filter_map(|doc| match previous.get(doc.id.as_str()) {
            None => Some(DocumentChange::added(doc.clone())),
            Some(before) if before.fields != doc.fields => Some(DocumentChange {
                kind: ChangeKind::Modified,
                document: doc.clone(),
            }),
            Some(_) => None,
        })
        .collect();

    changes.extend(
        old.iter()
            .filter(|doc| !current.contains_key(doc.id.as_str()))
            .map(|doc| DocumentChange {
                kind: ChangeKind::Removed,
                document: doc.clone(),
            }),
    );

    changes
}

async fn read_documents(file: &Path) -> ExecSyncResult<Vec<Document>> {
    let bytes = match tokio::fs::read(file).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(ExecSyncError::Persistence(format!(
                "failed to read {}: {e}",
                file.display()
            )));
        }
    };

    serde_json::from_slice(&bytes).map_err(|e| {
        ExecSyncError::Persistence(format!("failed to parse {}: {e}", file.display()))
    })
}

async fn write_documents(file: &Path, documents: &[Document]) -> ExecSyncResult<()> {
    if let Some(parent) = file.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            ExecSyncError::Persistence(format!("failed to create {}: {e}", parent.display()))
        })?;
    }

    let content = serde_json::to_vec_pretty(documents)
        .map_err(|e| ExecSyncError::Serialization(e.to_string()))?;

    // Write then rename so pollers never read a half-written file.
    let staging = file.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
    tokio::fs::write(&staging, content).await.map_err(|e| {
        ExecSyncError::Persistence(format!("failed to write {}: {e}", staging.display()))
    })?;
    tokio::fs::rename(&staging, file).await.map_err(|e| {
        ExecSyncError::Persistence(format!("failed to replace {}: {e}", file.display()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    fn fields(title: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert("title".into(), json!(title));
        fields
    }

    fn path() -> CollectionPath {
        CollectionPath::appointments("test-app").unwrap()
    }

    async fn next(rx: &mut SnapshotReceiver) -> Snapshot {
        timeout(WAIT, rx.recv())
            .await
            .expect("timeout")
            .expect("feed closed")
            .expect("feed error")
    }

    #[tokio::test]
    async fn initial_snapshot_reports_existing_documents_as_added() {
        let store = LocalDocumentStore::in_memory();
        store.add_document(&path(), fields("Board meeting")).await.unwrap();

        let mut rx = store.subscribe_to_collection(&path()).await.unwrap();
        let snapshot = next(&mut rx).await;

        assert_eq!(snapshot.documents.len(), 1);
        assert_eq!(snapshot.changes.len(), 1);
        assert_eq!(snapshot.changes[0].kind, ChangeKind::Added);
    }

    #[tokio::test]
    async fn add_and_delete_are_delivered_as_changes() {
        let store = LocalDocumentStore::in_memory();
        let mut rx = store.subscribe_to_collection(&path()).await.unwrap();
        assert!(next(&mut rx).await.documents.is_empty());

        let id = store.add_document(&path(), fields("Lunch")).await.unwrap();
        let added = next(&mut rx).await;
        assert_eq!(added.documents.len(), 1);
        assert_eq!(added.changes[0].kind, ChangeKind::Added);
        assert_eq!(added.changes[0].document.id, id);

        store.delete_document(&path(), &id).await.unwrap();
        let removed = next(&mut rx).await;
        assert!(removed.documents.is_empty());
        assert_eq!(removed.changes[0].kind, ChangeKind::Removed);
    }

    #[tokio::test]
    async fn deleting_unknown_document_is_a_no_op() {
        let store = LocalDocumentStore::in_memory();
        store.delete_document(&path(), "missing").await.unwrap();
    }

    #[tokio::test]
    async fn file_backed_store_persists_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::file_backed(dir.path().to_path_buf(), DEFAULT_POLL_INTERVAL);
        store.add_document(&path(), fields("Review")).await.unwrap();

        let file = store.collection_file(&path()).unwrap();
        assert!(file.ends_with("artifacts/test-app/public/data/appointments.json"));
        assert!(file.exists());

        let reopened = LocalDocumentStore::file_backed(dir.path().to_path_buf(), DEFAULT_POLL_INTERVAL);
        let mut rx = reopened.subscribe_to_collection(&path()).await.unwrap();
        let snapshot = next(&mut rx).await;
        assert_eq!(snapshot.documents.len(), 1);
        assert_eq!(snapshot.documents[0].fields["title"], json!("Review"));
    }

    #[tokio::test]
    async fn live_query_sees_writes_from_another_store() {
        let dir = tempfile::tempdir().unwrap();
        let poll = Duration::from_millis(20);
        let watcher = LocalDocumentStore::file_backed(dir.path().to_path_buf(), poll);
        let writer = LocalDocumentStore::file_backed(dir.path().to_path_buf(), poll);

        let mut rx = watcher.subscribe_to_collection(&path()).await.unwrap();
        assert!(next(&mut rx).await.documents.is_empty());

        writer.add_document(&path(), fields("Site visit")).await.unwrap();
        let snapshot = next(&mut rx).await;
        assert_eq!(snapshot.changes.len(), 1);
        assert_eq!(snapshot.changes[0].kind, ChangeKind::Added);
    }

    #[tokio::test]
    async fn corrupt_file_ends_live_query_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let poll = Duration::from_millis(20);
        let store = LocalDocumentStore::file_backed(dir.path().to_path_buf(), poll);

        let mut rx = store.subscribe_to_collection(&path()).await.unwrap();
        next(&mut rx).await;

        let file = store.collection_file(&path()).unwrap();
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, "not json").unwrap();

        let item = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert!(matches!(item, Err(ExecSyncError::Persistence(_))));
        assert!(timeout(WAIT, rx.recv()).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_on_one_directory_keep_every_document() {
        let dir = tempfile::tempdir().unwrap();
        let first = LocalDocumentStore::file_backed(dir.path().to_path_buf(), DEFAULT_POLL_INTERVAL);
        let second = LocalDocumentStore::file_backed(dir.path().to_path_buf(), DEFAULT_POLL_INTERVAL);

        let mut writes = Vec::new();
        for i in 0..20 {
            for store in [first.clone(), second.clone()] {
                writes.push(tokio::spawn(async move {
                    store.add_document(&path(), fields(&format!("Meeting {i}"))).await
                }));
            }
        }

        let mut ids = Vec::new();
        for write in writes {
            ids.push(write.await.unwrap().unwrap());
        }

        let file = first.collection_file(&path()).unwrap();
        let on_disk = read_documents(&file).await.unwrap();
        assert_eq!(on_disk.len(), 40);
        for id in &ids {
            assert!(on_disk.iter().any(|d| &d.id == id), "document {id} missing on disk");
        }

        let leftovers: Vec<_> = std::fs::read_dir(file.parent().unwrap())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn delete_from_one_store_keeps_the_others_writes() {
        let dir = tempfile::tempdir().unwrap();
        let first = LocalDocumentStore::file_backed(dir.path().to_path_buf(), DEFAULT_POLL_INTERVAL);
        let second = LocalDocumentStore::file_backed(dir.path().to_path_buf(), DEFAULT_POLL_INTERVAL);

        let doomed = first.add_document(&path(), fields("Cancelled")).await.unwrap();
        let kept = second.add_document(&path(), fields("Kept")).await.unwrap();
        first.delete_document(&path(), &doomed).await.unwrap();

        let on_disk = read_documents(&first.collection_file(&path()).unwrap()).await.unwrap();
        let ids: Vec<&str> = on_disk.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, [kept.as_str()]);
    }

    #[test]
    fn diff_classifies_changes() {
        let a = Document { id: "a".into(), fields: fields("A") };
        let b = Document { id: "b".into(), fields: fields("B") };
        let b2 = Document { id: "b".into(), fields: fields("B2") };
        let c = Document { id: "c".into(), fields: fields("C") };

        let changes = diff_documents(&[a.clone(), b], &[b2, c]);
        let kinds: Vec<_> = changes.iter().map(|c| (c.kind, c.document.id.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (ChangeKind::Modified, "b"),
                (ChangeKind::Added, "c"),
                (ChangeKind::Removed, "a"),
            ]
        );
        assert!(diff_documents(&[a.clone()], &[a]).is_empty());
    }
}

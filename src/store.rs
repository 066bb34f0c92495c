use crate::errors::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::{fs, sync::watch, task::JoinHandle};
use tracing::{debug, error, info};
use uuid::Uuid;

/// A stored record: store-assigned `id` and `createdAt`, then the caller's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::to_value(self).and_then(serde_json::from_value)
    }
}

pub type Snapshot = Arc<Vec<Document>>;
pub type SnapshotCallback = Box<dyn Fn(Result<Snapshot, StoreError>) + Send + Sync + 'static>;

/// Stops snapshot delivery for one subscription.
pub struct CancelHandle {
    active: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl CancelHandle {
    fn new(active: Arc<AtomicBool>, task: JoinHandle<()>) -> Self {
        Self {
            active,
            task: Some(task),
        }
    }

    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Delivers the full snapshot of `collection` now and after every change.
    fn subscribe(&self, collection: &str, on_update: SnapshotCallback) -> CancelHandle;

    /// Appends a new document. The store assigns `id` and `createdAt`.
    async fn append(&self, collection: &str, fields: Map<String, Value>)
    -> Result<Document, StoreError>;
}

/// Serialises a record into the field map expected by [`DocumentStore::append`].
pub fn to_fields<T: Serialize>(collection: &str, record: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject(collection.to_string())),
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    collections: BTreeMap<String, Vec<Document>>,
}

/// In-process document store, optionally mirrored to a JSON file.
pub struct LocalStore {
    path: Option<PathBuf>,
    collections: Mutex<BTreeMap<String, Arc<watch::Sender<Snapshot>>>>,
    write_lock: tokio::sync::Mutex<()>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            collections: Mutex::new(BTreeMap::new()),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Opens the store file at `path`, creating its directory if needed.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Persist {
                    path: path.to_path_buf(),
                    source,
                })?;
        }

        let file = load_file(path).await;
        let collections = file
            .collections
            .into_iter()
            .map(|(name, docs)| {
                let (tx, _rx) = watch::channel(Arc::new(docs));
                (name, Arc::new(tx))
            })
            .collect();

        Ok(Self {
            path: Some(path.to_path_buf()),
            collections: Mutex::new(collections),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    fn channel(&self, collection: &str) -> Arc<watch::Sender<Snapshot>> {
        let mut collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        collections
            .entry(collection.to_string())
            .or_insert_with(|| {
                let (tx, _rx) = watch::channel(Arc::new(Vec::new()));
                Arc::new(tx)
            })
            .clone()
    }

    fn current_file(&self) -> StoreFile {
        let collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        StoreFile {
            collections: collections
                .iter()
                .map(|(name, tx)| (name.clone(), tx.borrow().to_vec()))
                .collect(),
        }
    }

    async fn persist(&self, file: &StoreFile) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let payload = serde_json::to_vec_pretty(file)?;
        fs::write(path, payload)
            .await
            .map_err(|source| StoreError::Persist {
                path: path.clone(),
                source,
            })
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    fn subscribe(&self, collection: &str, on_update: SnapshotCallback) -> CancelHandle {
        let mut rx = self.channel(collection).subscribe();
        let active = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&active);
        let collection = collection.to_string();

        let task = tokio::spawn(async move {
            let initial = rx.borrow_and_update().clone();
            if flag.load(Ordering::SeqCst) {
                on_update(Ok(initial));
            }
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow_and_update().clone();
                if !flag.load(Ordering::SeqCst) {
                    return;
                }
                on_update(Ok(snapshot));
            }
            if flag.load(Ordering::SeqCst) {
                on_update(Err(StoreError::Closed(collection)));
            }
        });

        CancelHandle::new(active, task)
    }

    async fn append(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        let _guard = self.write_lock.lock().await;
        let tx = self.channel(collection);

        let document = Document {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            fields,
        };

        let mut docs = tx.borrow().to_vec();
        docs.push(document.clone());

        let mut file = self.current_file();
        file.collections.insert(collection.to_string(), docs.clone());
        self.persist(&file).await?;

        tx.send_replace(Arc::new(docs));
        debug!(collection, id = %document.id, "document appended");
        Ok(document)
    }
}

async fn load_file(path: &Path) -> StoreFile {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(file) => {
                info!("loaded store file {}", path.display());
                file
            }
            Err(err) => {
                error!("failed to parse store file: {err}");
                StoreFile::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
        Err(err) => {
            error!("failed to read store file: {err}");
            StoreFile::default()
        }
    }
}

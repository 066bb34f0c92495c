use crate::identity::Session;
use crate::store::{CancelHandle, Document, DocumentStore, SnapshotCallback};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info};

/// Locally held, continuously refreshed copy of one store collection.
///
/// The snapshot is replaced wholesale on every update, so readers always
/// see a complete collection. Delivery only runs while a session exists.
pub struct LiveCollection<T> {
    collection: String,
    snapshot: Arc<watch::Sender<Arc<Vec<T>>>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl<T> LiveCollection<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    pub fn bind(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        sessions: watch::Receiver<Option<Session>>,
    ) -> Self {
        let collection = collection.into();
        let (tx, _rx) = watch::channel(Arc::new(Vec::new()));
        let snapshot = Arc::new(tx);

        let supervisor = tokio::spawn(supervise(
            store,
            collection.clone(),
            sessions,
            Arc::clone(&snapshot),
        ));

        Self {
            collection,
            snapshot,
            supervisor: Mutex::new(Some(supervisor)),
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<T>> {
        self.snapshot.borrow().clone()
    }

    pub fn changes(&self) -> watch::Receiver<Arc<Vec<T>>> {
        self.snapshot.subscribe()
    }

    /// Stops the supervisor, dropping any live subscription with it.
    pub fn shutdown(&self) {
        let task = self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
            info!(collection = %self.collection, "live collection stopped");
        }
    }
}

impl<T> Drop for LiveCollection<T> {
    fn drop(&mut self) {
        let task = self
            .supervisor
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

async fn supervise<T>(
    store: Arc<dyn DocumentStore>,
    collection: String,
    mut sessions: watch::Receiver<Option<Session>>,
    snapshot: Arc<watch::Sender<Arc<Vec<T>>>>,
) where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let mut active: Option<CancelHandle> = None;
    loop {
        let ready = sessions.borrow_and_update().is_some();
        match (ready, active.is_some()) {
            (true, false) => {
                let listener = snapshot_listener(collection.clone(), Arc::clone(&snapshot));
                active = Some(store.subscribe(&collection, listener));
                info!(%collection, "subscribed");
            }
            (false, true) => {
                if let Some(handle) = active.take() {
                    handle.cancel();
                }
                info!(%collection, "session lost, unsubscribed");
            }
            _ => {}
        }

        if sessions.changed().await.is_err() {
            break;
        }
    }

    if let Some(handle) = active.take() {
        handle.cancel();
    }
}

fn snapshot_listener<T>(
    collection: String,
    snapshot: Arc<watch::Sender<Arc<Vec<T>>>>,
) -> SnapshotCallback
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    Box::new(move |update| match update {
        Ok(docs) => {
            let records = decode_valid::<T>(&collection, &docs);
            debug!(%collection, records = records.len(), "snapshot replaced");
            snapshot.send_replace(Arc::new(records));
        }
        Err(err) => {
            error!(%collection, "subscription error, keeping previous snapshot: {err}");
        }
    })
}

// Documents that do not match `T` are skipped; the rest still publish.
fn decode_valid<T: DeserializeOwned>(collection: &str, docs: &[Document]) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match doc.decode() {
            Ok(record) => Some(record),
            Err(err) => {
                error!(%collection, id = %doc.id, "skipping undecodable document: {err}");
                None
            }
        })
        .collect()
}

//! Local occurrence record store.
//!
//! All records live in one payload under a namespaced key (`<namespace>:ocorrencias`).
//! The store offers list, find-by-id, and upsert-by-id, plus change notification through
//! [`RecordStore::subscribe`]. Listing screens use the notification to refresh.
//!
//! ## Write semantics
//!
//! An upsert reads the current payload, replaces the record with the same id (or appends
//! it), and writes the whole payload back with a single backend write. Upserts within a
//! process are serialized; across processes the last write wins.
//!
//! A payload that cannot be decoded is never overwritten: the upsert fails and the
//! caller keeps its in-memory draft.

mod backend;
mod codec;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};

use crate::config::CoreConfig;
use crate::occurrence::OccurrenceRecord;
use crate::OccurrenceResult;
use ocorrencia_uuid::OccurrenceId;
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// What an upsert did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreChange {
    Created,
    Updated,
}

/// Notification delivered to subscribers after a successful upsert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreEvent {
    pub id: OccurrenceId,
    pub change: StoreChange,
}

type Listener = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Handle returned by [`RecordStore::subscribe`].
///
/// The listener stays registered while the handle is alive; dropping it (or calling
/// [`Subscription::unsubscribe`]) removes the listener.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Consumes the handle; removal happens on drop.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}

/// Namespaced record store over a [`StorageBackend`].
pub struct RecordStore<B> {
    backend: B,
    key: String,
    write_lock: Mutex<()>,
    listeners: Arc<Mutex<Listeners>>,
}

impl RecordStore<FileBackend> {
    /// Opens the file-backed store described by `cfg`.
    ///
    /// Nothing is touched on disk until the first upsert.
    pub fn open(cfg: &CoreConfig) -> Self {
        Self::with_config(FileBackend::new(cfg.data_dir()), cfg)
    }
}

impl<B: StorageBackend> RecordStore<B> {
    pub fn new(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            write_lock: Mutex::new(()),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    pub fn with_config(backend: B, cfg: &CoreConfig) -> Self {
        Self::new(backend, cfg.records_key())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// All stored records, in storage order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the payload cannot be read or decoded.
    pub fn list(&self) -> OccurrenceResult<Vec<OccurrenceRecord>> {
        self.load()
    }

    /// All stored records, most recently saved first.
    pub fn list_newest_first(&self) -> OccurrenceResult<Vec<OccurrenceRecord>> {
        let mut records = self.load()?;
        records.sort_by(|a, b| b.data.cmp(&a.data));
        Ok(records)
    }

    pub fn find_by_id(&self, id: &OccurrenceId) -> OccurrenceResult<Option<OccurrenceRecord>> {
        Ok(self.load()?.into_iter().find(|r| r.id() == id))
    }

    /// Replaces the record with the same id, or appends it.
    ///
    /// Keys outside the record schema that the stored record carried are kept unless the
    /// new record sets them itself. Subscribers are notified after the write succeeded.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the current payload cannot be read or decoded, or if
    /// the new payload cannot be written. Nothing is written in either case.
    pub fn upsert(&self, record: OccurrenceRecord) -> OccurrenceResult<StoreChange> {
        let event = {
            let _guard = self
                .write_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            let mut records = self.load()?;
            let id = record.id().clone();

            let change = match records.iter().position(|r| r.id() == &id) {
                Some(index) => {
                    let previous = std::mem::replace(&mut records[index], record);
                    for (key, value) in previous.extra {
                        records[index].extra.entry(key).or_insert(value);
                    }
                    StoreChange::Updated
                }
                None => {
                    records.push(record);
                    StoreChange::Created
                }
            };

            let payload = codec::encode(&records)?;
            self.backend.write(&self.key, &payload)?;

            tracing::info!(
                id = %id,
                change = ?change,
                total = records.len(),
                "occurrence saved locally"
            );

            StoreEvent { id, change }
        };

        self.notify(&event);
        Ok(event.change)
    }

    /// Registers `callback` to run after every successful upsert.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, Arc::new(callback)));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    fn load(&self) -> OccurrenceResult<Vec<OccurrenceRecord>> {
        let Some(text) = self.backend.read(&self.key)? else {
            return Ok(Vec::new());
        };
        codec::decode(&text).map_err(|e| {
            tracing::warn!(key = %self.key, error = %e, "stored occurrence payload is unreadable");
            e
        })
    }

    fn notify(&self, event: &StoreEvent) {
        // Snapshot so listeners may subscribe or unsubscribe while being called.
        let snapshot: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener(event);
        }
    }
}

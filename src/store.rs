//! Core store type, scope guard, handle, and builder.

use crate::error::{Error, Result};
use crate::flush::{AsyncFlushWorker, FlushPolicy};
use crate::persist::{atomic_write, read_document, write_truncate};
use crate::serializer::{JsonSerializer, Serializer};
use crate::Document;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Weak};

/// Persistent JSON document store.
///
/// Holds a JSON object in memory and mirrors it to a single file. Use
/// [`open`](Self::open) for a quick start, [`open_with_default`](Self::open_with_default)
/// to seed a fresh file, or [`builder`](Self::builder) for full control.
///
/// # Consistency
///
/// There is one scope lock per store. [`flush`](Self::flush),
/// [`reload`](Self::reload), [`overwrite`](Self::overwrite) and scopes opened
/// with [`lock`](Self::lock) or [`scoped`](Self::scoped) all take it, so they
/// are totally ordered against each other.
///
/// Plain key operations (`get`, `set`, `delete`, `iter`, `len`, ...) do
/// **not** take the scope lock. They see and change the live document, even
/// while another thread is inside a scope. If a read-modify-write has to be
/// atomic, do it inside a scope.
///
/// The scope lock is re-entrant for the thread holding it: calling `flush`
/// from inside your own scope is fine.
pub struct JsonStore {
    doc: RwLock<Document>,
    scope: ReentrantMutex<()>,
    path: PathBuf,
    serializer: JsonSerializer,
    atomic: bool,
    policy: FlushPolicy,
    trigger: Option<mpsc::SyncSender<()>>,
}

impl JsonStore {
    /// Open the store at `path`, creating it as `{}` if the file is missing.
    pub fn open(path: impl AsRef<Path>) -> Result<JsonStoreHandle> {
        Self::builder(path).build()
    }

    /// Open the store at `path`. When the file is missing, or `force_reset`
    /// is set, `default` becomes the document and is written out right away.
    pub fn open_with_default(
        path: impl AsRef<Path>,
        default: Document,
        force_reset: bool,
    ) -> Result<JsonStoreHandle> {
        Self::builder(path)
            .default_document(default)
            .force_reset(force_reset)
            .build()
    }

    /// Start configuring a new store. Call [`.build()`](JsonStoreBuilder::build)
    /// when ready.
    pub fn builder(path: impl AsRef<Path>) -> JsonStoreBuilder {
        JsonStoreBuilder::new(path)
    }

    // ---- reads ----

    /// Clone of the value stored under `key`.
    pub fn get(&self, key: &str) -> Result<Value> {
        self.doc
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::KeyNotFound(key.to_owned()))
    }

    /// Deserialize the value under `key` into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.get(key)?;
        serde_json::from_value(value).map_err(|e| Error::Format(format!("value at {key:?}: {e}")))
    }

    /// `true` if the key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.doc.read().contains_key(key)
    }

    /// Number of top-level keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.doc.read().len()
    }

    /// `true` when the document has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all key-value pairs, in document key order.
    #[must_use]
    pub fn iter(&self) -> Vec<(String, Value)> {
        self.doc
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Snapshot of all keys.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.doc.read().keys().cloned().collect()
    }

    /// Snapshot of all values.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.doc.read().values().cloned().collect()
    }

    /// Clone of the whole document.
    #[must_use]
    pub fn snapshot(&self) -> Document {
        self.doc.read().clone()
    }

    /// Path to the backing JSON file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush policy this store was built with.
    #[must_use]
    pub fn policy(&self) -> &FlushPolicy {
        &self.policy
    }

    // ---- writes ----

    /// Insert or replace `key`, returning the previous value.
    ///
    /// Under [`FlushPolicy::Manual`] this only touches memory.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<Option<Value>> {
        let prev = self.doc.write().insert(key.into(), value.into());
        self.notify_mutation()?;
        Ok(prev)
    }

    /// Serialize `value` and store it under `key`.
    pub fn set_serialized<T: Serialize + ?Sized>(
        &self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<Option<Value>> {
        let value = serde_json::to_value(value).map_err(|e| Error::Serialize(e.to_string()))?;
        self.set(key, value)
    }

    /// Remove `key` and return its value.
    pub fn delete(&self, key: &str) -> Result<Value> {
        let removed = self
            .doc
            .write()
            .remove(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_owned()))?;
        self.notify_mutation()?;
        Ok(removed)
    }

    // ---- persistence ----

    /// Write the whole document to disk, replacing the file.
    pub fn flush(&self) -> Result<()> {
        let _scope = self.scope.lock();
        self.write_out()
    }

    /// Replace the in-memory document with the file's contents. On error the
    /// current document is left as it was.
    pub fn reload(&self) -> Result<()> {
        let _scope = self.scope.lock();
        let fresh = read_document(&self.path, &self.serializer)?;
        log::debug!("reloaded {} keys from {}", fresh.len(), self.path.display());
        *self.doc.write() = fresh;
        Ok(())
    }

    /// Replace the whole document and write it out immediately.
    pub fn overwrite(&self, doc: Document) -> Result<()> {
        let _scope = self.scope.lock();
        *self.doc.write() = doc;
        self.write_out()
    }

    // ---- scopes ----

    /// Enter a scope: block until no other thread holds the scope lock, then
    /// return a guard with exclusive scoped access.
    ///
    /// The document is flushed when the guard goes away, whether through
    /// [`ScopeGuard::finish`], a normal drop, an early `?` return, or a
    /// panic. A half-done mutation gets written too.
    pub fn lock(&self) -> ScopeGuard<'_> {
        let lock = self.scope.lock();
        log::trace!("entered scope on {}", self.path.display());
        ScopeGuard {
            store: self,
            _lock: lock,
            finished: false,
        }
    }

    /// Run `f` inside a scope and flush afterwards, even if `f` fails.
    ///
    /// Returns `f`'s error when it has one (a flush error is then only
    /// logged), otherwise the flush result.
    pub fn scoped<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ScopeGuard<'_>) -> Result<T>,
    {
        let guard = self.lock();
        let outcome = f(&guard);
        let flushed = guard.finish();
        match outcome {
            Ok(value) => flushed.map(|()| value),
            Err(err) => {
                if let Err(flush_err) = flushed {
                    log::error!(
                        "flush after failed scope on {} also failed: {flush_err}",
                        self.path.display()
                    );
                }
                Err(err)
            }
        }
    }

    // ---- internal ----

    /// Serialize and write. Caller holds the scope lock.
    fn write_out(&self) -> Result<()> {
        let bytes = {
            let doc = self.doc.read();
            self.serializer.serialize(&doc)?
        };
        if self.atomic {
            atomic_write(&self.path, &bytes)?;
        } else {
            write_truncate(&self.path, &bytes)?;
        }
        log::debug!("flushed {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }

    fn notify_mutation(&self) -> Result<()> {
        match &self.policy {
            FlushPolicy::Immediate => self.flush()?,
            FlushPolicy::Async(_) => {
                if let Some(t) = &self.trigger {
                    let _ = t.try_send(());
                }
            }
            FlushPolicy::Manual => {}
        }
        Ok(())
    }
}

impl std::fmt::Debug for JsonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStore")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .field("atomic", &self.atomic)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for JsonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let doc = self.doc.read();
        match serde_json::to_string(&*doc) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(std::fmt::Error),
        }
    }
}

// ---------------------------------------------------------------------------
// Scope guard
// ---------------------------------------------------------------------------

/// Exclusive scoped access to a [`JsonStore`].
///
/// Obtained from [`JsonStore::lock`]. Dropping it flushes the document and
/// then releases the lock; use [`finish`](Self::finish) to see the flush
/// result. The guard is tied to the thread that took it.
///
/// Don't call back into the store from inside [`update`](Self::update) or
/// [`with_document`](Self::with_document) closures; the document cell is
/// write-locked while they run.
#[must_use = "dropping the guard immediately flushes and releases the lock"]
pub struct ScopeGuard<'a> {
    store: &'a JsonStore,
    _lock: ReentrantMutexGuard<'a, ()>,
    finished: bool,
}

impl ScopeGuard<'_> {
    /// Clone of the value under `key`.
    pub fn get(&self, key: &str) -> Result<Value> {
        self.store.get(key)
    }

    /// `true` if the key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }

    /// Number of top-level keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// `true` when the document has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Insert or replace `key`. Persisted when the scope ends.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.store.doc.write().insert(key.into(), value.into())
    }

    /// Remove `key` and return its value.
    pub fn delete(&self, key: &str) -> Result<Value> {
        self.store
            .doc
            .write()
            .remove(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_owned()))
    }

    /// Mutate the value at `key` in place.
    pub fn update<R, F>(&self, key: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut Value) -> R,
    {
        let mut doc = self.store.doc.write();
        let value = doc
            .get_mut(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_owned()))?;
        Ok(f(value))
    }

    /// Run `f` with mutable access to the whole document.
    pub fn with_document<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut Document) -> R,
    {
        let mut doc = self.store.doc.write();
        f(&mut *doc)
    }

    /// Swap in a whole new document. Persisted when the scope ends.
    pub fn replace(&self, doc: Document) -> Document {
        std::mem::replace(&mut *self.store.doc.write(), doc)
    }

    /// End the scope: flush, then release the lock.
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        let res = self.store.write_out();
        log::trace!("left scope on {}", self.store.path.display());
        res
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if std::thread::panicking() {
            log::warn!(
                "scope on {} unwinding, flushing anyway",
                self.store.path.display()
            );
        }
        if let Err(e) = self.store.write_out() {
            log::error!("flush on scope exit failed for {}: {e}", self.store.path.display());
        }
    }
}

impl std::fmt::Debug for ScopeGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("path", &self.store.path)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and opens a [`JsonStore`].
///
/// ```rust,no_run
/// use json_store::JsonStore;
/// use serde_json::json;
///
/// let default = json!({"list": []}).as_object().cloned().unwrap();
/// let db = JsonStore::builder("db.json")
///     .default_document(default)
///     .force_reset(true)
///     .pretty(true)
///     .build()
///     .unwrap();
/// ```
pub struct JsonStoreBuilder {
    path: PathBuf,
    default: Document,
    force_reset: bool,
    policy: FlushPolicy,
    pretty: bool,
    atomic: bool,
}

impl JsonStoreBuilder {
    fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            default: Document::new(),
            force_reset: false,
            policy: FlushPolicy::Manual,
            pretty: false,
            atomic: false,
        }
    }

    /// Document to start from when the file is missing or on reset
    /// (default: `{}`). Each store owns its own copy.
    pub fn default_document(mut self, doc: Document) -> Self {
        self.default = doc;
        self
    }

    /// Ignore any existing file and start from the default document
    /// (default: false).
    pub fn force_reset(mut self, yes: bool) -> Self {
        self.force_reset = yes;
        self
    }

    /// Set the flush policy (default: [`FlushPolicy::Manual`]).
    pub fn policy(mut self, policy: FlushPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Write human-readable JSON with indentation (default: compact).
    pub fn pretty(mut self, yes: bool) -> Self {
        self.pretty = yes;
        self
    }

    /// Write to a temp file and rename it over the target instead of
    /// truncating in place (default: false).
    pub fn atomic_writes(mut self, yes: bool) -> Self {
        self.atomic = yes;
        self
    }

    /// Load (or create) the store and return a handle.
    pub fn build(self) -> Result<JsonStoreHandle> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::Config("store path is empty".into()));
        }

        let serializer = if self.pretty {
            JsonSerializer::pretty()
        } else {
            JsonSerializer::new()
        };

        let fresh = self.force_reset || !self.path.try_exists()?;
        let doc = if fresh {
            self.default
        } else {
            read_document(&self.path, &serializer)?
        };

        let (trigger, rx) = match &self.policy {
            FlushPolicy::Async(_) => {
                let (tx, rx) = mpsc::sync_channel(0);
                (Some(tx), Some(rx))
            }
            _ => (None, None),
        };

        let store = JsonStore {
            doc: RwLock::new(doc),
            scope: ReentrantMutex::new(()),
            path: self.path,
            serializer,
            atomic: self.atomic,
            policy: self.policy,
            trigger,
        };

        if fresh {
            store.flush()?;
            log::info!(
                "initialised {} with {} keys{}",
                store.path.display(),
                store.len(),
                if self.force_reset { " (reset)" } else { "" }
            );
        } else {
            log::debug!("loaded {} keys from {}", store.len(), store.path.display());
        }

        let inner = Arc::new(store);
        let worker = match (&inner.policy, rx) {
            (FlushPolicy::Async(interval), Some(rx)) => {
                Some(AsyncFlushWorker::spawn(*interval, background_flush(&inner), rx)?)
            }
            _ => None,
        };

        Ok(JsonStoreHandle { inner, worker })
    }
}

fn background_flush(store: &Arc<JsonStore>) -> impl Fn() + Send + 'static {
    let weak: Weak<JsonStore> = Arc::downgrade(store);
    move || {
        if let Some(store) = weak.upgrade() {
            if let Err(e) = store.flush() {
                log::warn!("background flush of {} failed: {e}", store.path.display());
            }
        }
    }
}

impl std::fmt::Debug for JsonStoreBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStoreBuilder")
            .field("path", &self.path)
            .field("force_reset", &self.force_reset)
            .field("policy", &self.policy)
            .field("pretty", &self.pretty)
            .field("atomic", &self.atomic)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owns the store and (for async policy) the background flush thread.
///
/// Derefs to [`JsonStore`] so you can call store methods directly on it.
/// Share it across threads by reference (`std::thread::scope`) or by wrapping
/// the handle in an `Arc`. Dropping it joins the background thread if one is
/// running.
pub struct JsonStoreHandle {
    inner: Arc<JsonStore>,
    #[allow(dead_code)]
    worker: Option<AsyncFlushWorker>,
}

impl std::ops::Deref for JsonStoreHandle {
    type Target = JsonStore;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::fmt::Debug for JsonStoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&*self.inner, f)
    }
}

impl std::fmt::Display for JsonStoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&*self.inner, f)
    }
}

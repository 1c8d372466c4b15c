//! Persistent JSON document store with a scope lock.
//!
//! The whole document lives in memory as a JSON object and is mirrored to one
//! file. Plain key operations work on memory; [`flush`](JsonStore::flush),
//! [`overwrite`](JsonStore::overwrite) and the end of a scope write the file.
//!
//! ```rust,no_run
//! use json_store::{into_document, JsonStore};
//! use serde_json::json;
//!
//! let db = JsonStore::open_with_default("db.json", into_document(json!({"list": []})).unwrap(), true).unwrap();
//! {
//!     let scope = db.lock();
//!     scope.update("list", |list| list.as_array_mut().map(|l| l.push(json!(42)))).unwrap();
//! } // flushed here
//! db.set("dict", json!({"answer": 42})).unwrap();
//! db.flush().unwrap();
//! ```
//!
//! **Single-process only.** If multiple processes open the same file they will
//! clobber each other. Use advisory file locking or a real database for
//! multi-process access.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod flush;
pub mod persist;
pub mod serializer;
pub mod store;

pub use error::{Error, Result};
pub use flush::FlushPolicy;
pub use store::{JsonStore, JsonStoreBuilder, JsonStoreHandle, ScopeGuard};

/// The in-memory document: a JSON object keyed by string.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Turn a JSON value into a [`Document`]. Anything but an object is a
/// [`Error::Format`].
pub fn into_document(value: serde_json::Value) -> Result<Document> {
    match value {
        serde_json::Value::Object(doc) => Ok(doc),
        other => Err(Error::Format(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

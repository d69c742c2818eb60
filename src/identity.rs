//! Stable anonymous client identity.
//!
//! The identity is an opaque token that is generated once, written to a
//! durable key-value store, and reused for as long as that store survives.
//! Resolution never fails: if the store cannot be read or written, an
//! in-memory token is used for the rest of the process instead.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{from_reader, to_writer_pretty};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::observability::{IDENTITY_CREATED, IDENTITY_FALLBACKS};

/// The key under which the identity token is stored.
pub const IDENTITY_KEY: &str = "user_id";

//////////////////////////////////////////// KeyValueStore ////////////////////////////////////////////

/// Durable string-to-string storage.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

////////////////////////////////////////////// FileStore //////////////////////////////////////////////

/// A key-value store kept as a single JSON object on disk.
///
/// A missing file reads as an empty store.  Writes go to a sibling temporary
/// file that is then renamed over the original; the temporary file is removed
/// if the write fails.  Failures surface as [`Error::Storage`] naming the key.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a store backed by the file at `path`.  Nothing is touched on disk
    /// until the first read or write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(Error::io("failed to open identity file", err)),
        };
        let reader = BufReader::new(file);
        from_reader(reader).map_err(|err| {
            Error::serialization("failed to parse identity file", Some(Box::new(err)))
        })
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|err| Error::io("failed to create identity directory", err))?;
        }
        let tmp = self.temp_path();
        let result = Self::write_to(&tmp, entries).and_then(|()| {
            fs::rename(&tmp, &self.path)
                .map_err(|err| Error::io("failed to move identity file into place", err))
        });
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    fn write_to(tmp: &Path, entries: &BTreeMap<String, String>) -> Result<()> {
        let file =
            File::create(tmp).map_err(|err| Error::io("failed to create identity file", err))?;
        let mut writer = BufWriter::new(file);
        to_writer_pretty(&mut writer, entries).map_err(|err| {
            Error::serialization("failed to serialize identity file", Some(Box::new(err)))
        })?;
        writer
            .flush()
            .map_err(|err| Error::io("failed to flush identity file", err))
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self
            .load()
            .map_err(|err| Error::storage(format!("read failed: {err}"), Some(key.to_string())))?;
        Ok(entries.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .load()
            .map_err(|err| Error::storage(format!("read failed: {err}"), Some(key.to_string())))?;
        entries.insert(key.to_string(), value.to_string());
        self.store(&entries)
            .map_err(|err| Error::storage(format!("write failed: {err}"), Some(key.to_string())))
    }
}

///////////////////////////////////////////// MemoryStore /////////////////////////////////////////////

/// A key-value store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every entry, as if the storage had been wiped externally.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

//////////////////////////////////////////// IdentityStore ////////////////////////////////////////////

/// Resolves the client identity token against a [`KeyValueStore`].
///
/// Every call consults storage, so a wipe of the underlying store is noticed
/// and answered with a fresh, persisted token.  Resolution holds a lock from
/// read through write, so concurrent calls cannot persist two different
/// tokens.  Once storage has failed, the in-memory fallback token is kept and
/// returned for the life of this store.
pub struct IdentityStore<S: KeyValueStore> {
    storage: S,
    fallback: Mutex<Option<String>>,
}

impl<S: KeyValueStore> IdentityStore<S> {
    /// Creates an identity store over `storage`.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            fallback: Mutex::new(None),
        }
    }

    /// The underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the stored identity, creating and persisting one if needed.
    ///
    /// Storage failures are logged and answered with an identifier that lives
    /// only in memory; this never fails.
    pub fn get_or_create_id(&self) -> String {
        let mut fallback = self
            .fallback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(id) = fallback.as_ref() {
            return id.clone();
        }
        match self.load_or_create() {
            Ok(id) => id,
            Err(err) => {
                IDENTITY_FALLBACKS.click();
                tracing::warn!(error = %err, "identity storage unavailable; using in-memory identity");
                let id = generate_id();
                *fallback = Some(id.clone());
                id
            }
        }
    }

    fn load_or_create(&self) -> Result<String> {
        if let Some(id) = self.storage.get(IDENTITY_KEY)?
            && !id.trim().is_empty()
        {
            tracing::debug!("reusing stored client identity");
            return Ok(id);
        }
        let id = generate_id();
        self.storage.set(IDENTITY_KEY, &id)?;
        IDENTITY_CREATED.click();
        tracing::debug!("created new client identity");
        Ok(id)
    }
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// The default location of the identity file: `<data dir>/parlor/identity.json`.
///
/// Falls back to the current directory when the platform has no data directory.
pub fn default_identity_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parlor")
        .join("identity.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A store whose every operation fails.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            Err(Error::storage("storage offline", Some(key.to_string())))
        }

        fn set(&self, key: &str, _: &str) -> Result<()> {
            Err(Error::storage("storage offline", Some(key.to_string())))
        }
    }

    /// A store that reads fine but refuses writes.
    #[derive(Default)]
    struct ReadOnlyStore {
        writes: AtomicUsize,
    }

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, key: &str, _: &str) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(Error::storage("quota exceeded", Some(key.to_string())))
        }
    }

    #[test]
    fn creates_and_persists() {
        let store = IdentityStore::new(MemoryStore::new());
        let id = store.get_or_create_id();
        assert!(!id.is_empty());
        assert_eq!(
            store.storage().get(IDENTITY_KEY).unwrap(),
            Some(id.clone())
        );
    }

    #[test]
    fn stable_across_calls() {
        let store = IdentityStore::new(MemoryStore::new());
        let first = store.get_or_create_id();
        let second = store.get_or_create_id();
        assert_eq!(first, second);
    }

    #[test]
    fn reuses_existing_value() {
        let storage = MemoryStore::new();
        storage.set(IDENTITY_KEY, "existing-token").unwrap();
        let store = IdentityStore::new(storage);
        assert_eq!(store.get_or_create_id(), "existing-token");
    }

    #[test]
    fn blank_stored_value_is_replaced() {
        let storage = MemoryStore::new();
        storage.set(IDENTITY_KEY, "  ").unwrap();
        let store = IdentityStore::new(storage);
        let id = store.get_or_create_id();
        assert!(!id.trim().is_empty());
        assert_eq!(store.storage().get(IDENTITY_KEY).unwrap(), Some(id));
    }

    #[test]
    fn wipe_produces_new_token() {
        let storage = Arc::new(MemoryStore::new());
        let before = IdentityStore::new(Arc::clone(&storage)).get_or_create_id();
        // A second store over the same storage models a later session.
        let again = IdentityStore::new(Arc::clone(&storage)).get_or_create_id();
        assert_eq!(before, again);

        storage.clear();
        let after = IdentityStore::new(Arc::clone(&storage)).get_or_create_id();
        assert_ne!(before, after);
    }

    #[test]
    fn wipe_under_a_live_store_is_repaired() {
        let store = IdentityStore::new(MemoryStore::new());
        let before = store.get_or_create_id();
        store.storage().clear();
        let after = store.get_or_create_id();
        assert_ne!(before, after);
        assert_eq!(
            store.storage().get(IDENTITY_KEY).unwrap(),
            Some(after.clone())
        );
        assert_eq!(store.get_or_create_id(), after);
    }

    #[test]
    fn broken_storage_falls_back_in_memory() {
        let store = IdentityStore::new(BrokenStore);
        let first = store.get_or_create_id();
        let second = store.get_or_create_id();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn failed_write_is_not_retried() {
        let store = IdentityStore::new(ReadOnlyStore::default());
        let first = store.get_or_create_id();
        let second = store.get_or_create_id();
        assert_eq!(first, second);
        assert_eq!(store.storage().writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_first_calls_agree() {
        let storage = Arc::new(MemoryStore::new());
        let store = Arc::new(IdentityStore::new(Arc::clone(&storage)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.get_or_create_id())
            })
            .collect();
        let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(storage.get(IDENTITY_KEY).unwrap(), Some(ids[0].clone()));
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("identity.json");
        let store = FileStore::new(&path);
        assert_eq!(store.get(IDENTITY_KEY).unwrap(), None);

        store.set(IDENTITY_KEY, "token-1").unwrap();
        store.set("other", "value").unwrap();
        assert!(path.exists());

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get(IDENTITY_KEY).unwrap(),
            Some("token-1".to_string())
        );
        assert_eq!(reopened.get("other").unwrap(), Some("value".to_string()));
    }

    #[test]
    fn identity_survives_restart_with_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        let first = IdentityStore::new(FileStore::new(&path)).get_or_create_id();
        let second = IdentityStore::new(FileStore::new(&path)).get_or_create_id();
        assert_eq!(first, second);

        fs::remove_file(&path).unwrap();
        let third = IdentityStore::new(FileStore::new(&path)).get_or_create_id();
        assert_ne!(first, third);
    }

    #[test]
    fn corrupt_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        fs::write(&path, "not json at all").unwrap();
        let store = IdentityStore::new(FileStore::new(&path));
        let id = store.get_or_create_id();
        assert!(!id.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "not json at all");
    }

    #[test]
    fn failed_rename_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        // A directory in the file's place makes the final rename fail.
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "x").unwrap();
        let store = FileStore::new(&path);
        assert!(store.store(&BTreeMap::new()).is_err());
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn file_store_errors_name_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        fs::write(&path, "not json at all").unwrap();
        let store = FileStore::new(&path);

        let err = store.get(IDENTITY_KEY).unwrap_err();
        assert!(matches!(&err, Error::Storage { key: Some(key), .. } if key == IDENTITY_KEY));
        assert!(err.to_string().contains("failed to parse identity file"));

        let err = store.set("other", "value").unwrap_err();
        assert!(matches!(&err, Error::Storage { key: Some(key), .. } if key == "other"));
    }
}

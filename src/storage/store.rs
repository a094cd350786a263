// AssignmentStore - Persistence for the locker record
//
// Three backends behind one trait:
// - JSON file (default, human readable)
// - sled (embedded, crash-safe)
// - in-memory (tests, demos)

use super::LockerAssignment;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{error, info};

/// Key for the record inside sled
mod keys {
    pub const ASSIGNMENT: &[u8] = b"locker:assignment";
}

/// Errors from storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Flush failed: {0}")]
    FlushFailed(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Durable home of the [`LockerAssignment`].
///
/// Backends implement the fallible `read`/`write`; callers normally use the
/// best-effort `load`/`save`, which never fail.
pub trait AssignmentStore: Send {
    /// Read the stored record; `Ok(None)` when nothing was ever saved
    fn read(&self) -> Result<Option<LockerAssignment>, StoreError>;

    /// Replace the stored record
    fn write(&self, record: &LockerAssignment) -> Result<(), StoreError>;

    /// Load the record, treating any failure as "no prior state"
    fn load(&self) -> LockerAssignment {
        match self.read() {
            Ok(Some(record)) => {
                info!(code = ?record.code, door = ?record.door, available = ?record.available, "loaded stored assignment");
                record
            }
            Ok(None) => {
                info!("no stored assignment");
                LockerAssignment::default()
            }
            Err(e) => {
                info!(error = %e, "stored assignment unreadable, starting empty");
                LockerAssignment::default()
            }
        }
    }

    /// Persist the record; failures are logged, never propagated
    fn save(&self, record: &LockerAssignment) {
        match self.write(record) {
            Ok(()) => info!("assignment persisted"),
            Err(e) => error!(error = %e, "persist failed"),
        }
    }
}

// ============================================================================
// JSON FILE STORE
// ============================================================================

/// Stores the record as a small JSON document
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AssignmentStore for JsonFileStore {
    fn read(&self) -> Result<Option<LockerAssignment>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StoreError::DeserializationFailed(e.to_string()))
    }

    fn write(&self, record: &LockerAssignment) -> Result<(), StoreError> {
        let json = serde_json::to_vec(record)
            .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Write beside the target, then rename over it
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

// ============================================================================
// SLED STORE
// ============================================================================

/// Stores the record under a single sled key
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        Ok(())
    }
}

impl AssignmentStore for SledStore {
    fn read(&self) -> Result<Option<LockerAssignment>, StoreError> {
        match self.db.get(keys::ASSIGNMENT)? {
            Some(bytes) => LockerAssignment::from_bytes(&bytes)
                .map(Some)
                .map_err(|e| StoreError::DeserializationFailed(e.to_string())),
            None => Ok(None),
        }
    }

    fn write(&self, record: &LockerAssignment) -> Result<(), StoreError> {
        let bytes = record
            .to_bytes()
            .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;
        self.db.insert(keys::ASSIGNMENT, bytes)?;
        self.flush()
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    record: Option<LockerAssignment>,
    saves: usize,
    fail_writes: bool,
}

/// In-memory store; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a record already stored
    pub fn with_record(record: LockerAssignment) -> Self {
        let store = Self::default();
        store.lock().record = Some(record);
        store
    }

    /// Make every write fail
    pub fn with_failing_writes(self) -> Self {
        self.lock().fail_writes = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Currently stored record
    pub fn record(&self) -> Option<LockerAssignment> {
        self.lock().record.clone()
    }

    /// Number of successful writes
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }
}

impl AssignmentStore for MemoryStore {
    fn read(&self) -> Result<Option<LockerAssignment>, StoreError> {
        Ok(self.lock().record.clone())
    }

    fn write(&self, record: &LockerAssignment) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only store",
            )));
        }
        state.record = Some(record.clone());
        state.saves += 1;
        Ok(())
    }
}

/// Boxed stores are stores too, so the backend can be picked at runtime
impl AssignmentStore for Box<dyn AssignmentStore> {
    fn read(&self) -> Result<Option<LockerAssignment>, StoreError> {
        (**self).read()
    }

    fn write(&self, record: &LockerAssignment) -> Result<(), StoreError> {
        (**self).write(record)
    }
}

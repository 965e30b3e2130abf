// used for the local reference-data mirror
use rusqlite::{Connection, ErrorCode, OpenFlags};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{FieldrefError, Result};
use crate::interface::CancelToken;

/// How often (in SQLite virtual machine instructions) a running query checks
/// for cancellation and deadlines.
const PROGRESS_OPS: i32 = 64;
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

static MEMORY_STORES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    /// A named in-memory database shared by every connection of the store.
    InMemory(String),
    File(PathBuf),
}

// ------------- Store -------------
/// Owned handle to the local store. Cloning is cheap and every clone opens
/// connections to the same database, one per logical operation.
#[derive(Clone, Debug)]
pub struct Store {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    mode: PersistenceMode,
    // keeps a shared in-memory database alive between operations
    anchor: Option<Mutex<Connection>>,
}

impl Store {
    /// Opens a store over an existing database file. The file is not touched
    /// until a connection is acquired.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                mode: PersistenceMode::File(path.into()),
                anchor: None,
            }),
        }
    }
    /// Creates a fresh, uniquely named in-memory store.
    pub fn in_memory() -> Result<Self> {
        let name = format!(
            "fieldref-{}-{}",
            std::process::id(),
            MEMORY_STORES.fetch_add(1, Ordering::Relaxed)
        );
        let anchor = Self::open_memory(&name)?;
        Ok(Self {
            inner: Arc::new(StoreInner {
                mode: PersistenceMode::InMemory(name),
                anchor: Some(Mutex::new(anchor)),
            }),
        })
    }
    pub fn mode(&self) -> &PersistenceMode {
        &self.inner.mode
    }

    fn memory_uri(name: &str) -> String {
        format!("file:{}?mode=memory&cache=shared", name)
    }
    fn open_memory(name: &str) -> Result<Connection> {
        Connection::open_with_flags(
            Self::memory_uri(name),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| FieldrefError::StoreUnavailable(e.to_string()))
    }
    fn connect(&self, create: bool) -> Result<Connection> {
        let connection = match &self.inner.mode {
            PersistenceMode::InMemory(name) => Self::open_memory(name)?,
            PersistenceMode::File(path) => {
                let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
                if create {
                    flags |= OpenFlags::SQLITE_OPEN_CREATE;
                }
                Connection::open_with_flags(path, flags).map_err(|e| {
                    warn!(path = %path.display(), error = %e, "could not open store");
                    FieldrefError::StoreUnavailable(format!("{}: {}", path.display(), e))
                })?
            }
        };
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| FieldrefError::StoreUnavailable(e.to_string()))?;
        Ok(connection)
    }

    /// Acquires a read-only connection for the duration of one logical
    /// operation. Dropping the connection releases it.
    pub fn acquire(&self) -> Result<Connection> {
        let connection = self.connect(false)?;
        connection
            .pragma_update(None, "query_only", true)
            .map_err(|e| FieldrefError::StoreUnavailable(e.to_string()))?;
        debug!(mode = ?self.inner.mode, "connection acquired");
        Ok(connection)
    }
    /// Acquires a read-only connection whose queries are interrupted once the
    /// guard's token is cancelled or its deadline passes.
    pub fn acquire_guarded(&self, guard: &QueryGuard) -> Result<Connection> {
        guard.check()?;
        let connection = self.acquire()?;
        let cancel = guard.cancel.clone();
        let deadline = guard.deadline;
        connection.progress_handler(
            PROGRESS_OPS,
            Some(move || {
                cancel.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d)
            }),
        );
        Ok(connection)
    }
    /// Acquires a writable connection, creating the database file if needed.
    /// Used when the mirror is populated, never by the query paths.
    pub fn acquire_writer(&self) -> Result<Connection> {
        self.connect(true)
    }

    pub fn create_schema(&self) -> Result<()> {
        // The "STRICT" keyword is left out so the mirror stays readable by
        // older external tools.
        self.acquire_writer()?.execute_batch(
            "
            create table if not exists ofc_code_list (
                id integer not null primary key,
                survey_id integer null,
                survey_work_id integer null,
                code_list_id integer not null,
                parent_id integer null references ofc_code_list(id),
                code text not null,
                qualifiable integer not null default 0,
                since_version_id integer null,
                deprecated_version_id integer null,
                sort_order integer not null default 0,
                label1 text null,
                label2 text null,
                label3 text null,
                description1 text null,
                description2 text null,
                description3 text null
            );
            create index if not exists ofc_code_list_published_level
                on ofc_code_list (survey_id, code_list_id, parent_id, sort_order);
            create index if not exists ofc_code_list_work_level
                on ofc_code_list (survey_work_id, code_list_id, parent_id, sort_order);
            create table if not exists ofc_taxonomy (
                id integer not null primary key,
                survey_id integer not null,
                name text not null,
                constraint unique_taxonomy_name unique (survey_id, name)
            );
            create table if not exists ofc_taxon (
                id integer not null primary key,
                taxonomy_id integer not null references ofc_taxonomy(id),
                code text not null,
                scientific_name text not null,
                taxon_rank text null,
                parent_id integer null references ofc_taxon(id)
            );
            create index if not exists ofc_taxon_code
                on ofc_taxon (taxonomy_id, code collate nocase);
            create index if not exists ofc_taxon_scientific_name
                on ofc_taxon (taxonomy_id, scientific_name collate nocase);
            create table if not exists ofc_taxon_vernacular_name (
                id integer not null primary key,
                taxon_id integer not null references ofc_taxon(id),
                vernacular_name text not null,
                language_code text null,
                language_variety text null
            );
            create index if not exists ofc_taxon_vernacular_name_value
                on ofc_taxon_vernacular_name (vernacular_name collate nocase);
            create index if not exists ofc_taxon_vernacular_name_taxon
                on ofc_taxon_vernacular_name (taxon_id);
            ",
        )?;
        Ok(())
    }
}

// ------------- QueryGuard -------------
/// Bounds one query by a cancellation token and an optional deadline.
#[derive(Debug, Clone)]
pub struct QueryGuard {
    cancel: CancelToken,
    started: Instant,
    deadline: Option<Instant>,
}
impl QueryGuard {
    pub fn new(cancel: CancelToken, timeout: Option<Duration>) -> Self {
        let started = Instant::now();
        Self {
            cancel,
            started,
            deadline: timeout.map(|t| started + t),
        }
    }
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(FieldrefError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(FieldrefError::QueryTimeout {
                elapsed_ms: self.started.elapsed().as_millis(),
            }),
            _ => Ok(()),
        }
    }
    /// Translates an interrupted query into the reason it was interrupted.
    pub fn interpret(&self, error: rusqlite::Error) -> FieldrefError {
        if let rusqlite::Error::SqliteFailure(e, _) = &error {
            if e.code == ErrorCode::OperationInterrupted {
                if let Err(reason) = self.check() {
                    return reason;
                }
            }
        }
        error.into()
    }
}

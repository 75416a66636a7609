// contract-desk-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Desk Store
// Description: Durable DeskStore backed by SQLite WAL.
// Purpose: Persist desk records with integrity-checked JSON payloads.
// Dependencies: contract-desk-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`DeskStore`] using `SQLite`. Each table
//! keeps the indexed columns needed for lookups and filters, plus the full
//! record as JSON with its SHA-256 digest. Loads verify the digest and fail
//! closed on corruption.
//!
//! Every trait call runs in one transaction, so a contract write (status
//! check, snapshots, record, audit entry) commits or rolls back as a unit.
//! Database contents are treated as untrusted input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use contract_desk_core::AuditEntry;
use contract_desk_core::AuditEntryDraft;
use contract_desk_core::AuditFilter;
use contract_desk_core::ContractDraft;
use contract_desk_core::ContractFilter;
use contract_desk_core::ContractId;
use contract_desk_core::ContractRecord;
use contract_desk_core::ContractVersion;
use contract_desk_core::ContractWrite;
use contract_desk_core::DeskStore;
use contract_desk_core::Page;
use contract_desk_core::StoreError;
use contract_desk_core::TemplateDraft;
use contract_desk_core::TemplateFilter;
use contract_desk_core::TemplateId;
use contract_desk_core::TemplateRecord;
use contract_desk_core::Timestamp;
use contract_desk_core::TokenFingerprint;
use contract_desk_core::UserDraft;
use contract_desk_core::UserId;
use contract_desk_core::UserRecord;
use contract_desk_core::VersionDraft;
use contract_desk_core::sha256_hex;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Params;
use rusqlite::Row;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum serialized record size accepted by the store.
pub const MAX_RECORD_BYTES: usize = 4 * 1024 * 1024;
/// Summary recorded on the first snapshot of every contract.
const INITIAL_VERSION_SUMMARY: &str = "Initial version";

/// Schema applied to a fresh database.
const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS desk_sequences (
        name TEXT PRIMARY KEY,
        last_id INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        email TEXT NOT NULL COLLATE NOCASE UNIQUE,
        token_fingerprint TEXT NOT NULL UNIQUE,
        record_json BLOB NOT NULL,
        record_hash TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS templates (
        id INTEGER PRIMARY KEY,
        category TEXT,
        is_active INTEGER NOT NULL,
        record_json BLOB NOT NULL,
        record_hash TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS contracts (
        id INTEGER PRIMARY KEY,
        contract_number TEXT NOT NULL UNIQUE,
        owner_id INTEGER NOT NULL,
        status TEXT NOT NULL,
        record_json BLOB NOT NULL,
        record_hash TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_contracts_owner_id ON contracts (owner_id);
    CREATE TABLE IF NOT EXISTS contract_versions (
        contract_id INTEGER NOT NULL,
        version_number INTEGER NOT NULL,
        record_json BLOB NOT NULL,
        record_hash TEXT NOT NULL,
        PRIMARY KEY (contract_id, version_number),
        FOREIGN KEY (contract_id) REFERENCES contracts(id) ON DELETE CASCADE
    );
    CREATE TABLE IF NOT EXISTS audit_log (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL,
        action TEXT NOT NULL,
        resource_kind TEXT NOT NULL,
        resource_id INTEGER,
        record_json BLOB NOT NULL,
        record_hash TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_audit_log_resource
        ON audit_log (resource_kind, resource_id);
    CREATE INDEX IF NOT EXISTS idx_audit_log_user_id ON audit_log (user_id);
";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` desk store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Returns a configuration for `path` with default pragmas.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Addressed row does not exist.
    #[error("sqlite store row not found: {0}")]
    NotFound(String),
    /// Uniqueness or compare-and-set conflict.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
    /// Record payload exceeded the size limit.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, _) = &error
            && failure.code == ErrorCode::ConstraintViolation
        {
            return Self::Conflict(error.to_string());
        }
        Self::Db(error.to_string())
    }
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "record exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed desk store with WAL support.
#[derive(Clone)]
pub struct SqliteDeskStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteDeskStore {
    /// Opens an `SQLite`-backed desk store, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized, or carries an unsupported schema version.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Runs `operation` inside one transaction, committing on success.
    fn transact<T>(
        &self,
        operation: impl FnOnce(&Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| StoreError::Store("sqlite connection mutex poisoned".to_string()))?;
        let tx = guard.transaction().map_err(SqliteStoreError::from)?;
        let value = operation(&tx)?;
        tx.commit().map_err(SqliteStoreError::from)?;
        drop(guard);
        Ok(value)
    }
}

impl DeskStore for SqliteDeskStore {
    fn create_user(
        &self,
        draft: UserDraft,
        mut audit: AuditEntryDraft,
    ) -> Result<UserRecord, StoreError> {
        self.transact(|conn| {
            let now = Timestamp::now();
            let record = UserRecord {
                id: UserId::new(next_id(conn, "users")?),
                email: draft.email,
                full_name: draft.full_name,
                role: draft.role,
                is_active: draft.is_active,
                token_fingerprint: draft.token_fingerprint,
                created_at: now,
                updated_at: now,
            };
            let (bytes, hash) = encode(&record)?;
            conn.execute(
                "INSERT INTO users (id, email, token_fingerprint, record_json, record_hash) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id.get(),
                    record.email,
                    record.token_fingerprint.as_str(),
                    bytes,
                    hash
                ],
            )?;
            audit.resource_id = Some(record.id.get());
            insert_audit(conn, audit, now)?;
            Ok(record)
        })
    }

    fn user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        self.transact(|conn| {
            let record: Option<UserRecord> = query_one(
                conn,
                "SELECT record_json, record_hash FROM users WHERE id = ?1",
                params![id.get()],
            )?;
            if record.as_ref().is_some_and(|record| record.id != id) {
                return Err(SqliteStoreError::Invalid(format!("user {id} payload id mismatch")));
            }
            Ok(record)
        })
    }

    fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.transact(|conn| {
            query_one(
                conn,
                "SELECT record_json, record_hash FROM users WHERE email = ?1",
                params![email],
            )
        })
    }

    fn user_by_token(
        &self,
        fingerprint: &TokenFingerprint,
    ) -> Result<Option<UserRecord>, StoreError> {
        self.transact(|conn| {
            query_one(
                conn,
                "SELECT record_json, record_hash FROM users WHERE token_fingerprint = ?1",
                params![fingerprint.as_str()],
            )
        })
    }

    fn save_user(&self, record: &UserRecord, audit: AuditEntryDraft) -> Result<(), StoreError> {
        self.transact(|conn| {
            let (bytes, hash) = encode(record)?;
            let updated = conn.execute(
                "UPDATE users SET email = ?2, token_fingerprint = ?3, record_json = ?4, \
                 record_hash = ?5 WHERE id = ?1",
                params![
                    record.id.get(),
                    record.email,
                    record.token_fingerprint.as_str(),
                    bytes,
                    hash
                ],
            )?;
            if updated == 0 {
                return Err(SqliteStoreError::NotFound(format!("user {}", record.id)));
            }
            insert_audit(conn, audit, Timestamp::now())?;
            Ok(())
        })
    }

    fn delete_user(&self, id: UserId, audit: AuditEntryDraft) -> Result<bool, StoreError> {
        self.transact(|conn| {
            if count(conn, "SELECT COUNT(*) FROM users WHERE id = ?1", params![id.get()])? == 0 {
                return Ok(false);
            }
            let owned =
                count(conn, "SELECT COUNT(*) FROM contracts WHERE owner_id = ?1", params![id.get()])?;
            if owned > 0 {
                return Err(SqliteStoreError::Conflict(format!("user {id} still owns contracts")));
            }
            conn.execute("DELETE FROM users WHERE id = ?1", params![id.get()])?;
            insert_audit(conn, audit, Timestamp::now())?;
            Ok(true)
        })
    }

    fn list_users(&self, page: Page) -> Result<Vec<UserRecord>, StoreError> {
        let (limit, offset) = page_bounds(page);
        self.transact(|conn| {
            query_many(
                conn,
                "SELECT record_json, record_hash FROM users ORDER BY id LIMIT ?1 OFFSET ?2",
                params![limit, offset],
            )
        })
    }

    fn count_users(&self) -> Result<u64, StoreError> {
        self.transact(|conn| count(conn, "SELECT COUNT(*) FROM users", params![]))
    }

    fn create_template(
        &self,
        draft: TemplateDraft,
        mut audit: AuditEntryDraft,
    ) -> Result<TemplateRecord, StoreError> {
        self.transact(|conn| {
            let now = Timestamp::now();
            let record = TemplateRecord {
                id: TemplateId::new(next_id(conn, "templates")?),
                name: draft.name,
                description: draft.description,
                content: draft.content,
                category: draft.category,
                is_active: draft.is_active,
                created_by: draft.created_by,
                created_at: now,
                updated_at: now,
            };
            let (bytes, hash) = encode(&record)?;
            conn.execute(
                "INSERT INTO templates (id, category, is_active, record_json, record_hash) VALUES \
                 (?1, ?2, ?3, ?4, ?5)",
                params![record.id.get(), record.category, record.is_active, bytes, hash],
            )?;
            audit.resource_id = Some(record.id.get());
            insert_audit(conn, audit, now)?;
            Ok(record)
        })
    }

    fn template(&self, id: TemplateId) -> Result<Option<TemplateRecord>, StoreError> {
        self.transact(|conn| {
            query_one(
                conn,
                "SELECT record_json, record_hash FROM templates WHERE id = ?1",
                params![id.get()],
            )
        })
    }

    fn save_template(
        &self,
        record: &TemplateRecord,
        audit: AuditEntryDraft,
    ) -> Result<(), StoreError> {
        self.transact(|conn| {
            let (bytes, hash) = encode(record)?;
            let updated = conn.execute(
                "UPDATE templates SET category = ?2, is_active = ?3, record_json = ?4, \
                 record_hash = ?5 WHERE id = ?1",
                params![record.id.get(), record.category, record.is_active, bytes, hash],
            )?;
            if updated == 0 {
                return Err(SqliteStoreError::NotFound(format!("template {}", record.id)));
            }
            insert_audit(conn, audit, Timestamp::now())?;
            Ok(())
        })
    }

    fn delete_template(&self, id: TemplateId, audit: AuditEntryDraft) -> Result<bool, StoreError> {
        self.transact(|conn| {
            let deleted = conn.execute("DELETE FROM templates WHERE id = ?1", params![id.get()])?;
            if deleted == 0 {
                return Ok(false);
            }
            insert_audit(conn, audit, Timestamp::now())?;
            Ok(true)
        })
    }

    fn list_templates(
        &self,
        filter: &TemplateFilter,
        page: Page,
    ) -> Result<Vec<TemplateRecord>, StoreError> {
        let (limit, offset) = page_bounds(page);
        self.transact(|conn| {
            query_many(
                conn,
                "SELECT record_json, record_hash FROM templates WHERE (?1 IS NULL OR category = \
                 ?1) AND (?2 IS NULL OR is_active = ?2) ORDER BY id LIMIT ?3 OFFSET ?4",
                params![filter.category, filter.is_active, limit, offset],
            )
        })
    }

    fn create_contract(
        &self,
        draft: ContractDraft,
        mut audit: AuditEntryDraft,
    ) -> Result<ContractRecord, StoreError> {
        self.transact(|conn| {
            let now = Timestamp::now();
            let record = ContractRecord {
                id: ContractId::new(next_id(conn, "contracts")?),
                contract_number: draft.contract_number,
                status: draft.status,
                owner_id: draft.owner_id,
                fields: draft.fields,
                revision: 1,
                created_at: now,
                updated_at: now,
            };
            let (bytes, hash) = encode(&record)?;
            conn.execute(
                "INSERT INTO contracts (id, contract_number, owner_id, status, record_json, \
                 record_hash) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id.get(),
                    record.contract_number,
                    record.owner_id.get(),
                    record.status.as_str(),
                    bytes,
                    hash
                ],
            )
            .map_err(|err| match SqliteStoreError::from(err) {
                SqliteStoreError::Conflict(_) => SqliteStoreError::Conflict(format!(
                    "contract number already in use: {}",
                    record.contract_number
                )),
                other => other,
            })?;
            let snapshot = VersionDraft::of(&record, record.owner_id, INITIAL_VERSION_SUMMARY);
            insert_version(conn, record.id, 1, snapshot, now)?;
            audit.resource_id = Some(record.id.get());
            insert_audit(conn, audit, now)?;
            Ok(record)
        })
    }

    fn contract(&self, id: ContractId) -> Result<Option<ContractRecord>, StoreError> {
        self.transact(|conn| load_contract(conn, id))
    }

    fn list_contracts(
        &self,
        filter: &ContractFilter,
        page: Page,
    ) -> Result<Vec<ContractRecord>, StoreError> {
        let (limit, offset) = page_bounds(page);
        let owner = filter.owner_id.map(UserId::get);
        let status = filter.status.map(|status| status.as_str());
        self.transact(|conn| {
            query_many(
                conn,
                "SELECT record_json, record_hash FROM contracts WHERE (?1 IS NULL OR owner_id = \
                 ?1) AND (?2 IS NULL OR status = ?2) ORDER BY id LIMIT ?3 OFFSET ?4",
                params![owner, status, limit, offset],
            )
        })
    }

    fn apply_contract_write(&self, write: ContractWrite) -> Result<ContractRecord, StoreError> {
        self.transact(|conn| {
            let mut record = write.record;
            let id = record.id;
            let Some(stored) = load_contract(conn, id)? else {
                return Err(SqliteStoreError::NotFound(format!("contract {id}")));
            };
            if stored.revision != write.expected_revision {
                return Err(SqliteStoreError::Conflict(format!(
                    "contract {id} changed concurrently: revision is {}, expected {}",
                    stored.revision, write.expected_revision
                )));
            }
            record.revision = stored
                .revision
                .checked_add(1)
                .ok_or_else(|| SqliteStoreError::Invalid("revision overflow".to_string()))?;
            let now = Timestamp::now();
            let mut number = latest_version(conn, id)?;
            for snapshot in write.snapshots {
                number = number
                    .checked_add(1)
                    .ok_or_else(|| SqliteStoreError::Invalid("version number overflow".to_string()))?;
                insert_version(conn, id, number, snapshot, now)?;
            }
            let (bytes, hash) = encode(&record)?;
            conn.execute(
                "UPDATE contracts SET contract_number = ?2, owner_id = ?3, status = ?4, \
                 record_json = ?5, record_hash = ?6 WHERE id = ?1",
                params![
                    id.get(),
                    record.contract_number,
                    record.owner_id.get(),
                    record.status.as_str(),
                    bytes,
                    hash
                ],
            )?;
            insert_audit(conn, write.audit, now)?;
            Ok(record)
        })
    }

    fn delete_contract(&self, id: ContractId, audit: AuditEntryDraft) -> Result<bool, StoreError> {
        self.transact(|conn| {
            let deleted = conn.execute("DELETE FROM contracts WHERE id = ?1", params![id.get()])?;
            if deleted == 0 {
                return Ok(false);
            }
            conn.execute("DELETE FROM contract_versions WHERE contract_id = ?1", params![id.get()])?;
            insert_audit(conn, audit, Timestamp::now())?;
            Ok(true)
        })
    }

    fn list_versions(
        &self,
        id: ContractId,
        page: Page,
    ) -> Result<Vec<ContractVersion>, StoreError> {
        let (limit, offset) = page_bounds(page);
        self.transact(|conn| {
            query_many(
                conn,
                "SELECT record_json, record_hash FROM contract_versions WHERE contract_id = ?1 \
                 ORDER BY version_number DESC LIMIT ?2 OFFSET ?3",
                params![id.get(), limit, offset],
            )
        })
    }

    fn version(&self, id: ContractId, number: u32) -> Result<Option<ContractVersion>, StoreError> {
        self.transact(|conn| {
            query_one(
                conn,
                "SELECT record_json, record_hash FROM contract_versions WHERE contract_id = ?1 \
                 AND version_number = ?2",
                params![id.get(), i64::from(number)],
            )
        })
    }

    fn append_audit(&self, draft: AuditEntryDraft) -> Result<AuditEntry, StoreError> {
        self.transact(|conn| insert_audit(conn, draft, Timestamp::now()))
    }

    fn list_audit(&self, filter: &AuditFilter, page: Page) -> Result<Vec<AuditEntry>, StoreError> {
        let (limit, offset) = page_bounds(page);
        let user = filter.user_id.map(UserId::get);
        let kind = filter.resource_kind.map(|kind| kind.as_str());
        self.transact(|conn| {
            query_many(
                conn,
                "SELECT record_json, record_hash FROM audit_log WHERE (?1 IS NULL OR user_id = \
                 ?1) AND (?2 IS NULL OR action = ?2) AND (?3 IS NULL OR resource_kind = ?3) AND \
                 (?4 IS NULL OR resource_id = ?4) ORDER BY id DESC LIMIT ?5 OFFSET ?6",
                params![user, filter.action, kind, filter.resource_id, limit, offset],
            )
        })
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.transact(|conn| {
            conn.query_row("SELECT 1", params![], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }
}

// ============================================================================
// SECTION: Row Helpers
// ============================================================================

/// Serialized record payload and its digest.
type StoredRow = (Vec<u8>, String);

/// Reads the `(record_json, record_hash)` pair from a row.
fn read_row(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok((row.get(0)?, row.get(1)?))
}

/// Serializes a record and computes its digest.
fn encode<T: Serialize>(value: &T) -> Result<StoredRow, SqliteStoreError> {
    let bytes =
        serde_json::to_vec(value).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if bytes.len() > MAX_RECORD_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_RECORD_BYTES,
            actual_bytes: bytes.len(),
        });
    }
    let hash = sha256_hex(&bytes);
    Ok((bytes, hash))
}

/// Verifies a stored digest and deserializes the payload.
fn decode<T: DeserializeOwned>(bytes: &[u8], hash: &str) -> Result<T, SqliteStoreError> {
    if bytes.len() > MAX_RECORD_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_RECORD_BYTES,
            actual_bytes: bytes.len(),
        });
    }
    if sha256_hex(bytes) != hash {
        return Err(SqliteStoreError::Corrupt("record hash mismatch".to_string()));
    }
    serde_json::from_slice(bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

/// Loads at most one record.
fn query_one<T: DeserializeOwned, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Option<T>, SqliteStoreError> {
    let row = conn.query_row(sql, params, read_row).optional()?;
    row.map(|(bytes, hash)| decode(&bytes, &hash)).transpose()
}

/// Loads every record a query returns, in query order.
fn query_many<T: DeserializeOwned, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<T>, SqliteStoreError> {
    let mut statement = conn.prepare(sql)?;
    let rows = statement.query_map(params, read_row)?;
    let mut records = Vec::new();
    for row in rows {
        let (bytes, hash) = row?;
        records.push(decode(&bytes, &hash)?);
    }
    Ok(records)
}

/// Runs a `COUNT(*)` query.
fn count<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<u64, SqliteStoreError> {
    let value: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    u64::try_from(value).map_err(|_| SqliteStoreError::Corrupt("negative row count".to_string()))
}

/// Converts a page window into `LIMIT`/`OFFSET` parameters.
fn page_bounds(page: Page) -> (i64, i64) {
    (
        i64::try_from(page.limit).unwrap_or(i64::MAX),
        i64::try_from(page.skip).unwrap_or(i64::MAX),
    )
}

/// Allocates the next identifier for `name`. Identifiers are never reused.
fn next_id(conn: &Connection, name: &str) -> Result<i64, SqliteStoreError> {
    let id = conn.query_row(
        "INSERT INTO desk_sequences (name, last_id) VALUES (?1, 1) ON CONFLICT(name) DO UPDATE \
         SET last_id = last_id + 1 RETURNING last_id",
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Loads a contract and checks the payload matches its key.
fn load_contract(
    conn: &Connection,
    id: ContractId,
) -> Result<Option<ContractRecord>, SqliteStoreError> {
    let record: Option<ContractRecord> = query_one(
        conn,
        "SELECT record_json, record_hash FROM contracts WHERE id = ?1",
        params![id.get()],
    )?;
    if record.as_ref().is_some_and(|record| record.id != id) {
        return Err(SqliteStoreError::Invalid(format!("contract {id} payload id mismatch")));
    }
    Ok(record)
}

/// Returns the latest version number of a contract (0 when none).
fn latest_version(conn: &Connection, id: ContractId) -> Result<u32, SqliteStoreError> {
    let latest: Option<i64> = conn.query_row(
        "SELECT MAX(version_number) FROM contract_versions WHERE contract_id = ?1",
        params![id.get()],
        |row| row.get(0),
    )?;
    latest.map_or(Ok(0), |value| {
        u32::try_from(value).map_err(|_| {
            SqliteStoreError::Corrupt(format!("invalid version number for contract {id}"))
        })
    })
}

/// Inserts a numbered snapshot.
fn insert_version(
    conn: &Connection,
    id: ContractId,
    number: u32,
    draft: VersionDraft,
    now: Timestamp,
) -> Result<(), SqliteStoreError> {
    let version = ContractVersion {
        contract_id: id,
        version_number: number,
        status: draft.status,
        fields: draft.fields,
        changed_by: draft.changed_by,
        change_summary: draft.change_summary,
        changes: draft.changes,
        created_at: now,
    };
    let (bytes, hash) = encode(&version)?;
    conn.execute(
        "INSERT INTO contract_versions (contract_id, version_number, record_json, record_hash) \
         VALUES (?1, ?2, ?3, ?4)",
        params![id.get(), i64::from(number), bytes, hash],
    )?;
    Ok(())
}

/// Appends an audit entry.
fn insert_audit(
    conn: &Connection,
    draft: AuditEntryDraft,
    now: Timestamp,
) -> Result<AuditEntry, SqliteStoreError> {
    let entry = draft.into_entry(next_id(conn, "audit_log")?, now);
    let (bytes, hash) = encode(&entry)?;
    conn.execute(
        "INSERT INTO audit_log (id, user_id, action, resource_kind, resource_id, record_json, \
         record_hash) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.id,
            entry.user_id.get(),
            entry.action,
            entry.resource_kind.as_str(),
            entry.resource_id,
            bytes,
            hash
        ],
    )?;
    Ok(entry)
}

// ============================================================================
// SECTION: Connection Setup
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(SqliteStoreError::Invalid(
            "store path contains an overlong component".to_string(),
        ));
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with the configured pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(connection)
}

/// Initializes the schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            tx.execute_batch(SCHEMA_SQL)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit()?;
    Ok(())
}

// contract-desk-config/src/config.rs
// ============================================================================
// Module: Contract Desk Configuration
// Description: Configuration loading and validation for Contract Desk.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: contract-desk-core, contract-desk-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults, so an empty file yields a loopback server over
//! the in-memory store. Invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use contract_desk_core::Page;
use contract_desk_core::runtime::service::DEFAULT_MAX_PAGE_LIMIT;
use contract_desk_store_sqlite::SqliteStoreConfig;
use contract_desk_store_sqlite::SqliteStoreMode;
use contract_desk_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "contract-desk.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CONTRACT_DESK_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default bind address.
pub(crate) const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Maximum accepted request body size in bytes.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Minimum bootstrap token length.
pub(crate) const MIN_BOOTSTRAP_TOKEN_LENGTH: usize = 16;
/// Maximum bootstrap token length.
pub(crate) const MAX_BOOTSTRAP_TOKEN_LENGTH: usize = 256;
/// Upper bound for the configurable page limit.
pub(crate) const MAX_PAGE_LIMIT_CEILING: u64 = 10_000;
/// Default `SQLite` busy timeout (ms).
const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Contract Desk configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeskConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Paging limits for list endpoints.
    #[serde(default)]
    pub paging: PagingConfig,
}

impl DeskConfig {
    /// Loads configuration from disk using the default resolution rules:
    /// explicit path, then `CONTRACT_DESK_CONFIG`, then `contract-desk.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Parses and validates configuration from raw file bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.store.validate()?;
        self.paging.validate()?;
        let addr = self.server.bind_addr()?;
        let has_token =
            self.server.bootstrap_admin.as_ref().is_some_and(|admin| admin.token.is_some());
        if !addr.ip().is_loopback() && !has_token && self.store.store_type == StoreType::Memory {
            return Err(ConfigError::Invalid(
                "non-loopback bind over the memory store requires server.bootstrap_admin.token"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
    /// Optional admin account created on first start.
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdminConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            audit: ServerAuditConfig::default(),
            bootstrap_admin: None,
        }
    }
}

impl ServerConfig {
    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid bind address: {}", self.bind)))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_body_bytes must be at most {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        self.audit.validate()?;
        if let Some(admin) = &self.bootstrap_admin {
            admin.validate()?;
        }
        Ok(())
    }
}

/// Audit logging configuration for server requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("server.audit.path", path)?;
        }
        Ok(())
    }
}

/// Admin account created when the store has no users.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootstrapAdminConfig {
    /// Admin login email.
    pub email: String,
    /// Admin display name.
    #[serde(default = "default_admin_name")]
    pub full_name: String,
    /// Fixed API token; generated and printed once when unset.
    #[serde(default)]
    pub token: Option<String>,
}

impl std::fmt::Debug for BootstrapAdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdminConfig")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl BootstrapAdminConfig {
    /// Validates bootstrap admin settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ConfigError::Invalid(
                "server.bootstrap_admin.email must be an email address".to_string(),
            ));
        }
        if self.full_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "server.bootstrap_admin.full_name must be non-empty".to_string(),
            ));
        }
        if let Some(token) = &self.token {
            if token.len() < MIN_BOOTSTRAP_TOKEN_LENGTH {
                return Err(ConfigError::Invalid(format!(
                    "server.bootstrap_admin.token must be at least {MIN_BOOTSTRAP_TOKEN_LENGTH} \
                     characters"
                )));
            }
            if token.len() > MAX_BOOTSTRAP_TOKEN_LENGTH {
                return Err(ConfigError::Invalid(
                    "server.bootstrap_admin.token too long".to_string(),
                ));
            }
            if token.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
                return Err(ConfigError::Invalid(
                    "server.bootstrap_admin.token must not contain whitespace".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Desk store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Returns the `SQLite` store settings when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (StoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_string("store.path", &path.to_string_lossy())?;
                if self.busy_timeout_ms == 0 {
                    return Err(ConfigError::Invalid(
                        "store.busy_timeout_ms must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Desk store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory store (data lost on restart).
    #[default]
    Memory,
    /// Use the `SQLite`-backed durable store.
    Sqlite,
}

// ============================================================================
// SECTION: Paging
// ============================================================================

/// Paging limits for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PagingConfig {
    /// Limit applied when a request omits `limit`.
    #[serde(default = "default_page_limit")]
    pub default_limit: u64,
    /// Largest `limit` a request may ask for.
    #[serde(default = "default_max_page_limit")]
    pub max_limit: u64,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: default_max_page_limit(),
        }
    }
}

impl PagingConfig {
    /// Validates paging limits.
    fn validate(self) -> Result<(), ConfigError> {
        if self.max_limit == 0 || self.max_limit > MAX_PAGE_LIMIT_CEILING {
            return Err(ConfigError::Invalid(format!(
                "paging.max_limit must be between 1 and {MAX_PAGE_LIMIT_CEILING}"
            )));
        }
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(ConfigError::Invalid(
                "paging.default_limit must be between 1 and paging.max_limit".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(ConfigError::Invalid("config path component too long".to_string()));
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default maximum request body size in bytes.
pub(crate) const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Audit logging is on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}

/// Default bootstrap admin display name.
fn default_admin_name() -> String {
    "Administrator".to_string()
}

/// Default `SQLite` busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_STORE_BUSY_TIMEOUT_MS
}

/// Default page size.
const fn default_page_limit() -> u64 {
    Page::DEFAULT_LIMIT
}

/// Default page size ceiling.
const fn default_max_page_limit() -> u64 {
    DEFAULT_MAX_PAGE_LIMIT
}

// ============================================================================
// SECTION: Tests
// ============================================================================

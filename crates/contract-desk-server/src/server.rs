// contract-desk-server/src/server.rs
// ============================================================================
// Module: Desk Server
// Description: Server construction, bootstrap, and HTTP serving.
// Purpose: Turn a validated config into a running REST server.
// Dependencies: contract-desk-core, contract-desk-config, contract-desk-store-sqlite, axum, tokio
// ============================================================================

//! ## Overview
//! [`DeskServer::from_config`] validates the config, opens the store, creates
//! the bootstrap admin, and refuses to start an exposed server that nobody
//! could log into. [`DeskServer::serve`] binds the listener and runs axum.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use contract_desk_config::DeskConfig;
use contract_desk_config::PagingConfig;
use contract_desk_config::ServerAuditConfig;
use contract_desk_config::ServerConfig;
use contract_desk_config::StoreConfig;
use contract_desk_config::StoreType;
use contract_desk_core::ContractService;
use contract_desk_core::DeskStore;
use contract_desk_core::InMemoryDeskStore;
use contract_desk_core::Page;
use contract_desk_core::SharedDeskStore;
use contract_desk_store_sqlite::SqliteDeskStore;
use thiserror::Error;

use crate::audit::DeskAuditSink;
use crate::audit::DeskFileAuditSink;
use crate::audit::DeskNoopAuditSink;
use crate::audit::DeskStderrAuditSink;
use crate::audit::SecurityAuditEvent;
use crate::routes::build_router;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization failure.
    #[error("init error: {0}")]
    Init(String),
    /// Transport failure.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Server State
// ============================================================================

/// Shared state handed to every handler.
pub(crate) struct ServerState {
    /// Access-checked desk operations.
    pub(crate) service: ContractService<SharedDeskStore>,
    /// Request audit sink.
    pub(crate) audit: Arc<dyn DeskAuditSink>,
    /// Paging defaults for list endpoints.
    pub(crate) paging: PagingConfig,
}

impl ServerState {
    /// Builds a page from optional query parameters.
    pub(crate) fn page(&self, skip: Option<u64>, limit: Option<u64>) -> Page {
        Page::new(skip.unwrap_or(0), limit.unwrap_or(self.paging.default_limit))
            .clamped(self.paging.max_limit)
    }
}

// ============================================================================
// SECTION: Desk Server
// ============================================================================

/// Contract desk REST server.
pub struct DeskServer {
    /// Validated configuration.
    config: DeskConfig,
    /// Shared handler state.
    state: Arc<ServerState>,
}

impl DeskServer {
    /// Builds a server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the config is invalid, the store cannot be
    /// opened, or an exposed server would have no users.
    pub fn from_config(config: DeskConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let addr = config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let audit = build_audit_sink(&config.server.audit)?;
        let store = build_desk_store(&config.store)?;
        let service = ContractService::new(store).with_max_page_limit(config.paging.max_limit);
        bootstrap_admin(&service, &config.server, audit.as_ref())?;
        ensure_users(&service, addr, audit.as_ref())?;
        emit_exposure_warning(addr, audit.as_ref());
        let state = Arc::new(ServerState {
            service,
            audit,
            paging: config.paging,
        });
        Ok(Self {
            config,
            state,
        })
    }

    /// Returns the HTTP router for this server.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state), self.config.server.max_body_bytes)
    }

    /// Serves requests on the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr =
            self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}

// ============================================================================
// SECTION: Construction Helpers
// ============================================================================

/// Builds the desk store from configuration.
fn build_desk_store(config: &StoreConfig) -> Result<SharedDeskStore, ServerError> {
    let store = match config.store_type {
        StoreType::Memory => SharedDeskStore::from_store(InMemoryDeskStore::new()),
        StoreType::Sqlite => {
            let sqlite_config = config.sqlite().ok_or_else(|| {
                ServerError::Config("sqlite store requires path".to_string())
            })?;
            let store = SqliteDeskStore::new(&sqlite_config)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            SharedDeskStore::from_store(store)
        }
    };
    store.readiness().map_err(|err| ServerError::Init(err.to_string()))?;
    Ok(store)
}

/// Builds the request audit sink from configuration.
fn build_audit_sink(config: &ServerAuditConfig) -> Result<Arc<dyn DeskAuditSink>, ServerError> {
    if !config.enabled {
        return Ok(Arc::new(DeskNoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = DeskFileAuditSink::new(Path::new(path))
                .map_err(|err| ServerError::Init(format!("audit log open failed: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(DeskStderrAuditSink)),
    }
}

/// Creates the configured bootstrap admin if it does not exist yet.
///
/// A generated token is written to stderr once; it is never logged as an
/// audit event.
fn bootstrap_admin(
    service: &ContractService<SharedDeskStore>,
    server: &ServerConfig,
    audit: &dyn DeskAuditSink,
) -> Result<(), ServerError> {
    let Some(admin) = &server.bootstrap_admin else {
        return Ok(());
    };
    let issued = service
        .bootstrap_admin(&admin.email, &admin.full_name, admin.token.as_deref())
        .map_err(|err| ServerError::Init(format!("bootstrap admin failed: {err}")))?;
    if let Some(issued) = issued {
        audit.record_security(&SecurityAuditEvent::new(
            "bootstrap_admin_created",
            Some(format!("created admin account {}", issued.user.email)),
        ));
        if admin.token.is_none() {
            let _ = writeln!(
                std::io::stderr(),
                "contract-desk: bootstrap admin {} api token: {}",
                issued.user.email,
                issued.api_token
            );
        }
    }
    Ok(())
}

/// Fails closed when an exposed server has no accounts.
fn ensure_users(
    service: &ContractService<SharedDeskStore>,
    addr: SocketAddr,
    audit: &dyn DeskAuditSink,
) -> Result<(), ServerError> {
    let users = service.store().count_users().map_err(|err| ServerError::Init(err.to_string()))?;
    if users > 0 {
        return Ok(());
    }
    if !addr.ip().is_loopback() {
        return Err(ServerError::Init(
            "no users exist; configure server.bootstrap_admin before exposing the server"
                .to_string(),
        ));
    }
    audit.record_security(&SecurityAuditEvent::new(
        "no_users",
        Some("no users exist; every API request will be rejected".to_string()),
    ));
    Ok(())
}

/// Warns when the server listens beyond loopback over plain HTTP.
fn emit_exposure_warning(addr: SocketAddr, audit: &dyn DeskAuditSink) {
    if addr.ip().is_loopback() {
        return;
    }
    let message = format!(
        "contract-desk: WARNING: serving plain HTTP on {addr}; bearer tokens travel unencrypted \
         unless a TLS proxy fronts the server"
    );
    let _ = writeln!(std::io::stderr(), "{message}");
    audit.record_security(&SecurityAuditEvent::new("non_loopback_bind", Some(message)));
}

// ============================================================================
// SECTION: Blocking Helpers
// ============================================================================

/// Runs a synchronous store-backed call, shifting to a blocking context when
/// the runtime allows it.
pub(crate) fn run_blocking<T>(call: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(call)
        }
        _ => call(),
    }
}

// contract-desk-server/src/audit.rs
// ============================================================================
// Module: Server Audit Logging
// Description: Structured audit events for HTTP request handling.
// Purpose: Emit JSON-lines request, denial, and security events.
// Dependencies: contract-desk-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Request logging is separate from the desk's own audit trail: the store
//! records what changed, these events record who called what and how it went.
//! Sinks receive fully built events and write one JSON object per line.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use contract_desk_core::AccessReason;
use contract_desk_core::Actor;
use contract_desk_core::Role;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct HttpRequestEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// HTTP method.
    pub method: String,
    /// Request path without the query string.
    pub path: String,
    /// Response status code.
    pub status: u16,
    /// Authenticated user identifier, if any.
    pub actor_id: Option<i64>,
    /// Authenticated user role, if any.
    pub role: Option<Role>,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// Handling time in milliseconds.
    pub duration_ms: u128,
}

/// Inputs required to construct a request audit event.
pub struct HttpRequestEventParams {
    /// HTTP method.
    pub method: String,
    /// Request path without the query string.
    pub path: String,
    /// Response status code.
    pub status: u16,
    /// Authenticated actor, if any.
    pub actor: Option<Actor>,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// Handling time in milliseconds.
    pub duration_ms: u128,
}

impl HttpRequestEvent {
    /// Creates a new request event with a consistent timestamp.
    #[must_use]
    pub fn new(params: HttpRequestEventParams) -> Self {
        Self {
            event: "http_request",
            timestamp_ms: now_ms(),
            method: params.method,
            path: params.path,
            status: params.status,
            actor_id: params.actor.map(|actor| actor.id.get()),
            role: params.actor.map(|actor| actor.role),
            peer_ip: params.peer_ip,
            duration_ms: params.duration_ms,
        }
    }
}

/// Access policy denial event payload.
#[derive(Debug, Clone, Serialize)]
pub struct AccessDeniedEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Denied user identifier.
    pub actor_id: i64,
    /// Denied user role.
    pub role: Role,
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Policy reason label.
    pub reason: AccessReason,
}

impl AccessDeniedEvent {
    /// Creates a denial event for `actor`.
    #[must_use]
    pub fn new(actor: Actor, method: String, path: String, reason: AccessReason) -> Self {
        Self {
            event: "access_denied",
            timestamp_ms: now_ms(),
            actor_id: actor.id.get(),
            role: actor.role,
            method,
            path,
            reason,
        }
    }
}

/// Security posture event payload.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Security event kind.
    pub kind: String,
    /// Optional message.
    pub message: Option<String>,
}

impl SecurityAuditEvent {
    /// Creates a security event.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: Option<String>) -> Self {
        Self {
            event: "security_audit",
            timestamp_ms: now_ms(),
            kind: kind.into(),
            message,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for server events.
pub trait DeskAuditSink: Send + Sync {
    /// Record a request event.
    fn record(&self, event: &HttpRequestEvent);

    /// Record an access denial.
    fn record_access_denied(&self, _event: &AccessDeniedEvent) {}

    /// Record a security posture event.
    fn record_security(&self, _event: &SecurityAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct DeskStderrAuditSink;

impl DeskAuditSink for DeskStderrAuditSink {
    fn record(&self, event: &HttpRequestEvent) {
        write_line(&mut io::stderr(), event);
    }

    fn record_access_denied(&self, event: &AccessDeniedEvent) {
        write_line(&mut io::stderr(), event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        write_line(&mut io::stderr(), event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct DeskFileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl DeskFileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event.
    fn append(&self, event: &impl Serialize) {
        if let Ok(mut file) = self.file.lock() {
            write_line(&mut *file, event);
            let _ = file.flush();
        }
    }
}

impl DeskAuditSink for DeskFileAuditSink {
    fn record(&self, event: &HttpRequestEvent) {
        self.append(event);
    }

    fn record_access_denied(&self, event: &AccessDeniedEvent) {
        self.append(event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct DeskNoopAuditSink;

impl DeskAuditSink for DeskNoopAuditSink {
    fn record(&self, _event: &HttpRequestEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

/// Writes `event` as a single JSON line; serialization failures are dropped.
fn write_line(writer: &mut impl Write, event: &impl Serialize) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(writer, "{payload}");
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::use_debug, reason = "Test-only assertions.")]

    use contract_desk_core::UserId;
    use serde_json::Value;

    use super::*;

    #[test]
    fn request_event_carries_actor() {
        let event = HttpRequestEvent::new(HttpRequestEventParams {
            method: "GET".to_string(),
            path: "/api/v1/contracts".to_string(),
            status: 200,
            actor: Some(Actor::new(UserId::new(7), Role::Finance)),
            peer_ip: None,
            duration_ms: 3,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "http_request");
        assert_eq!(value["actor_id"], 7);
        assert_eq!(value["role"], "finance");
    }

    #[test]
    fn file_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let sink = DeskFileAuditSink::new(&path).unwrap();
        sink.record_security(&SecurityAuditEvent::new("startup", None));
        sink.record_access_denied(&AccessDeniedEvent::new(
            Actor::new(UserId::new(2), Role::Legal),
            "DELETE".to_string(),
            "/api/v1/users/1".to_string(),
            AccessReason::DefaultDeny,
        ));
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> =
            contents.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "security_audit");
        assert_eq!(lines[1]["reason"], "default_deny");
    }
}

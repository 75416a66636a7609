// contract-desk-server/src/routes.rs
// ============================================================================
// Module: API Routes
// Description: axum router and handlers for the `/api/v1` surface.
// Purpose: Translate HTTP requests into contract service calls.
// Dependencies: contract-desk-core, axum, serde, serde_json
// ============================================================================

//! ## Overview
//! Routes, all under `/api/v1` and all requiring a bearer token:
//!
//! | Path | Methods |
//! | --- | --- |
//! | `/users`, `/users/{id}` | list, create, get, update, delete |
//! | `/users/me`, `/users/me/capabilities` | caller profile and capability list |
//! | `/users/{id}/token` | rotate API token |
//! | `/templates`, `/templates/{id}` | list, create, get, update, delete |
//! | `/contracts`, `/contracts/{id}` | list, create, get, update, delete |
//! | `/contracts/{id}/status` | lifecycle transition |
//! | `/contracts/{id}/transitions` | statuses reachable by the caller |
//! | `/contracts/{id}/versions/...` | list, get, compare, restore |
//! | `/audit/logs`, `/audit/logs/user/{id}`, `/audit/logs/contract/{id}` | audit trail |
//!
//! `/` and `/health` are unauthenticated. Request bodies are decoded by hand
//! so malformed JSON gets the same error envelope as every other failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Extension;
use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::DefaultBodyLimit;
use axum::extract::OriginalUri;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::Request;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::USER_AGENT;
use axum::middleware;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use contract_desk_core::Actor;
use contract_desk_core::AuditEntry;
use contract_desk_core::AuditFilter;
use contract_desk_core::Capability;
use contract_desk_core::ContractFilter;
use contract_desk_core::ContractId;
use contract_desk_core::ContractPatch;
use contract_desk_core::ContractRecord;
use contract_desk_core::ContractStatus;
use contract_desk_core::ContractVersion;
use contract_desk_core::DeskStore;
use contract_desk_core::IssuedUser;
use contract_desk_core::NewContract;
use contract_desk_core::NewTemplate;
use contract_desk_core::NewUser;
use contract_desk_core::RequestContext;
use contract_desk_core::ResourceKind;
use contract_desk_core::Role;
use contract_desk_core::TemplateFilter;
use contract_desk_core::TemplateId;
use contract_desk_core::TemplatePatch;
use contract_desk_core::TemplateRecord;
use contract_desk_core::Timestamp;
use contract_desk_core::UserId;
use contract_desk_core::UserPatch;
use contract_desk_core::UserRecord;
use contract_desk_core::VersionComparison;
use contract_desk_core::capabilities;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::json;

use crate::audit::AccessDeniedEvent;
use crate::audit::HttpRequestEvent;
use crate::audit::HttpRequestEventParams;
use crate::auth::authenticate;
use crate::error::ApiError;
use crate::error::DeniedAccess;
use crate::server::ServerState;
use crate::server::run_blocking;

// ============================================================================
// SECTION: Router
// ============================================================================

/// Shared handler state.
type AppState = State<Arc<ServerState>>;

/// Builds the application router.
pub(crate) fn build_router(state: Arc<ServerState>, max_body_bytes: usize) -> Router {
    let api = Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/me", get(current_user))
        .route("/users/me/capabilities", get(current_capabilities))
        .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/users/{id}/token", post(rotate_token))
        .route("/templates", get(list_templates).post(create_template))
        .route("/templates/{id}", get(get_template).put(update_template).delete(delete_template))
        .route("/contracts", get(list_contracts).post(create_contract))
        .route("/contracts/{id}", get(get_contract).put(update_contract).delete(delete_contract))
        .route("/contracts/{id}/status", post(change_status))
        .route("/contracts/{id}/transitions", get(contract_transitions))
        .route("/contracts/{id}/versions", get(list_versions))
        .route("/contracts/{id}/versions/{number}", get(get_version))
        .route("/contracts/{id}/versions/{number}/compare/{other}", get(compare_versions))
        .route("/contracts/{id}/versions/{number}/restore", post(restore_version))
        .route("/audit/logs", get(list_audit))
        .route("/audit/logs/user/{id}", get(user_audit))
        .route("/audit/logs/contract/{id}", get(contract_audit))
        .route_layer(middleware::from_fn_with_state(Arc::clone(&state), authenticate_request));
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Authenticates an API request and records its audit events.
async fn authenticate_request(
    State(state): AppState,
    mut request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map_or_else(|| request.uri().path().to_string(), |OriginalUri(uri)| uri.path().to_string());
    let peer_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(peer)| peer.ip().to_string());
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let user_agent = request.headers().get(USER_AGENT).and_then(|value| value.to_str().ok());
    let context = RequestContext::new(peer_ip.as_deref(), user_agent);
    let (actor, response) =
        match run_blocking(|| authenticate(&state.service, auth_header.as_deref())) {
            Ok(actor) => {
                request.extensions_mut().insert(actor);
                request.extensions_mut().insert(context);
                (Some(actor), next.run(request).await)
            }
            Err(err) => (None, ApiError::from(err).into_response()),
        };
    if let Some(actor) = actor
        && let Some(DeniedAccess(reason)) = response.extensions().get::<DeniedAccess>().copied()
    {
        state.audit.record_access_denied(&AccessDeniedEvent::new(
            actor,
            method.clone(),
            path.clone(),
            reason,
        ));
    }
    state.audit.record(&HttpRequestEvent::new(HttpRequestEventParams {
        method,
        path,
        status: response.status().as_u16(),
        actor,
        peer_ip,
        duration_ms: started.elapsed().as_millis(),
    }));
    response
}

// ============================================================================
// SECTION: Views
// ============================================================================

/// User representation without the token fingerprint.
#[derive(Debug, Serialize)]
struct UserView {
    /// User identifier.
    id: UserId,
    /// Login email.
    email: String,
    /// Display name.
    full_name: String,
    /// Assigned role.
    role: Role,
    /// Whether the account may authenticate.
    is_active: bool,
    /// Creation time.
    created_at: Timestamp,
    /// Last update time.
    updated_at: Timestamp,
}

impl From<UserRecord> for UserView {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// User with a newly issued token; the only response that carries one.
#[derive(Debug, Serialize)]
struct IssuedUserView {
    /// User profile.
    #[serde(flatten)]
    user: UserView,
    /// Plaintext API token.
    api_token: String,
}

impl From<IssuedUser> for IssuedUserView {
    fn from(issued: IssuedUser) -> Self {
        Self {
            user: issued.user.into(),
            api_token: issued.api_token,
        }
    }
}

/// Capability list for the caller.
#[derive(Debug, Serialize)]
struct CapabilitiesView {
    /// Caller identifier.
    user_id: UserId,
    /// Caller role.
    role: Role,
    /// Permitted actions per resource kind.
    capabilities: Vec<Capability>,
}

/// Statuses the caller may move a contract to.
#[derive(Debug, Serialize)]
struct TransitionsView {
    /// Contract identifier.
    contract_id: ContractId,
    /// Current status.
    status: ContractStatus,
    /// Reachable statuses.
    allowed: Vec<ContractStatus>,
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Paging parameters.
#[derive(Debug, Deserialize)]
struct PageQuery {
    /// Entries to skip.
    skip: Option<u64>,
    /// Maximum entries to return.
    limit: Option<u64>,
}

/// Template listing parameters.
#[derive(Debug, Deserialize)]
struct TemplateQuery {
    /// Entries to skip.
    skip: Option<u64>,
    /// Maximum entries to return.
    limit: Option<u64>,
    /// Category filter.
    category: Option<String>,
    /// Active flag filter.
    is_active: Option<bool>,
}

/// Contract listing parameters.
#[derive(Debug, Deserialize)]
struct ContractQuery {
    /// Entries to skip.
    skip: Option<u64>,
    /// Maximum entries to return.
    limit: Option<u64>,
    /// Status filter.
    status: Option<ContractStatus>,
    /// Owner filter (admins only; ignored for everyone else).
    owner_id: Option<i64>,
}

/// Audit listing parameters.
#[derive(Debug, Deserialize)]
struct AuditQuery {
    /// Entries to skip.
    skip: Option<u64>,
    /// Maximum entries to return.
    limit: Option<u64>,
    /// Acting user filter.
    user_id: Option<i64>,
    /// Action label filter.
    action: Option<String>,
    /// Resource kind filter.
    resource_type: Option<ResourceKind>,
    /// Resource identifier filter.
    resource_id: Option<i64>,
}

/// Status change request body.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StatusChangeRequest {
    /// Requested status.
    status: ContractStatus,
}

/// Decodes a JSON request body.
fn decode_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|err| ApiError::BadRequest(format!("invalid json body: {err}")))
}

// ============================================================================
// SECTION: Service Handlers
// ============================================================================

/// Service banner.
async fn root() -> Json<Value> {
    Json(json!({
        "name": "contract-desk",
        "version": env!("CARGO_PKG_VERSION"),
        "api": "/api/v1",
    }))
}

/// Store readiness probe.
async fn health(State(state): AppState) -> Response {
    match run_blocking(|| state.service.store().readiness()) {
        Ok(()) => Json(json!({"status": "healthy"})).into_response(),
        Err(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "unavailable"}))).into_response()
        }
    }
}

// ============================================================================
// SECTION: User Handlers
// ============================================================================

/// Returns the caller's own profile.
async fn current_user(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
) -> Result<Json<UserView>, ApiError> {
    let user = run_blocking(|| state.service.get_user(&actor, actor.id))?;
    Ok(Json(user.into()))
}

/// Returns the caller's capability list.
async fn current_capabilities(Extension(actor): Extension<Actor>) -> Json<CapabilitiesView> {
    Json(CapabilitiesView {
        user_id: actor.id,
        role: actor.role,
        capabilities: capabilities(&actor),
    })
}

/// Lists users (admin only).
async fn list_users(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let page = state.page(query.skip, query.limit);
    let users = run_blocking(|| state.service.list_users(&actor, page))?;
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

/// Creates a user and returns its token once.
async fn create_user(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Extension(context): Extension<RequestContext>,
    body: Bytes,
) -> Result<(StatusCode, Json<IssuedUserView>), ApiError> {
    let input: NewUser = decode_body(&body)?;
    let service = state.service.with_context(context);
    let issued = run_blocking(|| service.create_user(&actor, input))?;
    Ok((StatusCode::CREATED, Json(issued.into())))
}

/// Loads one user.
async fn get_user(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<Json<UserView>, ApiError> {
    let user = run_blocking(|| state.service.get_user(&actor, UserId::new(id)))?;
    Ok(Json(user.into()))
}

/// Applies a user patch.
async fn update_user(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<UserView>, ApiError> {
    let patch: UserPatch = decode_body(&body)?;
    let service = state.service.with_context(context);
    let user = run_blocking(|| service.update_user(&actor, UserId::new(id), patch))?;
    Ok(Json(user.into()))
}

/// Deletes a user.
async fn delete_user(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let service = state.service.with_context(context);
    run_blocking(|| service.delete_user(&actor, UserId::new(id)))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Issues a replacement API token.
async fn rotate_token(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<Json<IssuedUserView>, ApiError> {
    let service = state.service.with_context(context);
    let issued = run_blocking(|| service.rotate_token(&actor, UserId::new(id)))?;
    Ok(Json(issued.into()))
}

// ============================================================================
// SECTION: Template Handlers
// ============================================================================

/// Lists templates.
async fn list_templates(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Query(query): Query<TemplateQuery>,
) -> Result<Json<Vec<TemplateRecord>>, ApiError> {
    let page = state.page(query.skip, query.limit);
    let filter = TemplateFilter {
        category: query.category,
        is_active: query.is_active,
    };
    Ok(Json(run_blocking(|| state.service.list_templates(&actor, &filter, page))?))
}

/// Creates a template.
async fn create_template(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Extension(context): Extension<RequestContext>,
    body: Bytes,
) -> Result<(StatusCode, Json<TemplateRecord>), ApiError> {
    let input: NewTemplate = decode_body(&body)?;
    let service = state.service.with_context(context);
    let template = run_blocking(|| service.create_template(&actor, input))?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// Loads one template.
async fn get_template(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<Json<TemplateRecord>, ApiError> {
    Ok(Json(run_blocking(|| state.service.get_template(&actor, TemplateId::new(id)))?))
}

/// Applies a template patch.
async fn update_template(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<TemplateRecord>, ApiError> {
    let patch: TemplatePatch = decode_body(&body)?;
    let service = state.service.with_context(context);
    Ok(Json(run_blocking(|| service.update_template(&actor, TemplateId::new(id), patch))?))
}

/// Deletes a template.
async fn delete_template(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let service = state.service.with_context(context);
    run_blocking(|| service.delete_template(&actor, TemplateId::new(id)))?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// SECTION: Contract Handlers
// ============================================================================

/// Lists contracts visible to the caller.
async fn list_contracts(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ContractQuery>,
) -> Result<Json<Vec<ContractRecord>>, ApiError> {
    let page = state.page(query.skip, query.limit);
    let filter = ContractFilter {
        owner_id: query.owner_id.map(UserId::new),
        status: query.status,
    };
    Ok(Json(run_blocking(|| state.service.list_contracts(&actor, filter, page))?))
}

/// Creates a draft contract owned by the caller.
async fn create_contract(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Extension(context): Extension<RequestContext>,
    body: Bytes,
) -> Result<(StatusCode, Json<ContractRecord>), ApiError> {
    let input: NewContract = decode_body(&body)?;
    let service = state.service.with_context(context);
    let contract = run_blocking(|| service.create_contract(&actor, input))?;
    Ok((StatusCode::CREATED, Json(contract)))
}

/// Loads one contract.
async fn get_contract(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<Json<ContractRecord>, ApiError> {
    Ok(Json(run_blocking(|| state.service.get_contract(&actor, ContractId::new(id)))?))
}

/// Applies a contract patch.
async fn update_contract(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<ContractRecord>, ApiError> {
    let patch: ContractPatch = decode_body(&body)?;
    let service = state.service.with_context(context);
    Ok(Json(run_blocking(|| service.update_contract(&actor, ContractId::new(id), patch))?))
}

/// Deletes a contract and its versions.
async fn delete_contract(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let service = state.service.with_context(context);
    run_blocking(|| service.delete_contract(&actor, ContractId::new(id)))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Moves a contract through the lifecycle.
async fn change_status(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<ContractRecord>, ApiError> {
    let request: StatusChangeRequest = decode_body(&body)?;
    let service = state.service.with_context(context);
    let contract = run_blocking(|| {
        service.change_status(&actor, ContractId::new(id), request.status)
    })?;
    Ok(Json(contract))
}

/// Lists statuses the caller may move the contract to.
async fn contract_transitions(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<Json<TransitionsView>, ApiError> {
    let id = ContractId::new(id);
    let transitions = run_blocking(|| state.service.transitions(&actor, id))?;
    Ok(Json(TransitionsView {
        contract_id: id,
        status: transitions.contract.status,
        allowed: transitions.allowed,
    }))
}

// ============================================================================
// SECTION: Version Handlers
// ============================================================================

/// Lists contract versions, newest first.
async fn list_versions(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<ContractVersion>>, ApiError> {
    let page = state.page(query.skip, query.limit);
    Ok(Json(run_blocking(|| state.service.list_versions(&actor, ContractId::new(id), page))?))
}

/// Loads one contract version.
async fn get_version(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Path((id, number)): Path<(i64, u32)>,
) -> Result<Json<ContractVersion>, ApiError> {
    Ok(Json(run_blocking(|| state.service.get_version(&actor, ContractId::new(id), number))?))
}

/// Diffs two contract versions.
async fn compare_versions(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Path((id, number, other)): Path<(i64, u32, u32)>,
) -> Result<Json<VersionComparison>, ApiError> {
    let comparison = run_blocking(|| {
        state.service.compare_versions(&actor, ContractId::new(id), number, other)
    })?;
    Ok(Json(comparison))
}

/// Restores a version's content onto the contract.
async fn restore_version(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Extension(context): Extension<RequestContext>,
    Path((id, number)): Path<(i64, u32)>,
) -> Result<Json<ContractRecord>, ApiError> {
    let service = state.service.with_context(context);
    Ok(Json(run_blocking(|| service.restore_version(&actor, ContractId::new(id), number))?))
}

// ============================================================================
// SECTION: Audit Handlers
// ============================================================================

/// Lists audit entries (admin only).
async fn list_audit(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let page = state.page(query.skip, query.limit);
    let filter = AuditFilter {
        user_id: query.user_id.map(UserId::new),
        action: query.action,
        resource_kind: query.resource_type,
        resource_id: query.resource_id,
    };
    Ok(Json(run_blocking(|| state.service.list_audit(&actor, &filter, page))?))
}

/// Lists audit entries recorded for one user.
async fn user_audit(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let page = state.page(query.skip, query.limit);
    Ok(Json(run_blocking(|| state.service.user_audit(&actor, UserId::new(id), page))?))
}

/// Lists audit entries for one contract.
async fn contract_audit(
    State(state): AppState,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let page = state.page(query.skip, query.limit);
    Ok(Json(run_blocking(|| state.service.contract_audit(&actor, ContractId::new(id), page))?))
}

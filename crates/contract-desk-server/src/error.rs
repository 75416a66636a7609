// contract-desk-server/src/error.rs
// ============================================================================
// Module: API Errors
// Description: HTTP mapping for authentication and service failures.
// Purpose: Render every failure as `{error: {code, message}}` with a status.
// Dependencies: contract-desk-core, axum, serde
// ============================================================================

//! ## Overview
//! Status mapping: permission denials are 403, lifecycle rejections and bad
//! input are 400, missing records 404, store conflicts 409. Denials also
//! attach a [`DeniedAccess`] extension so the request layer can log them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use contract_desk_core::AccessReason;
use contract_desk_core::ServiceError;
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Error returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Service rejected the request.
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// Request body or parameters could not be decoded.
    #[error("bad request: {0}")]
    BadRequest(String),
}

/// Response extension marking a policy denial.
#[derive(Debug, Clone, Copy)]
pub struct DeniedAccess(pub AccessReason);

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// Error payload.
    error: ErrorDetail,
}

/// Error payload.
#[derive(Debug, Serialize)]
struct ErrorDetail {
    /// Stable error label.
    code: &'static str,
    /// Human-readable message.
    message: String,
    /// Policy reason for permission denials.
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<AccessReason>,
}

impl ApiError {
    /// Returns the HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Auth(AuthError::Unauthenticated(_)) => StatusCode::UNAUTHORIZED,
            Self::Auth(AuthError::Lookup(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Service(error) => match error {
                ServiceError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                ServiceError::Transition(_) | ServiceError::Invalid(_) => StatusCode::BAD_REQUEST,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Conflict(_) => StatusCode::CONFLICT,
                ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns the stable error label.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Auth(AuthError::Unauthenticated(_)) => "unauthenticated",
            Self::Auth(AuthError::Lookup(_)) => "internal_error",
            Self::Service(error) => error.code(),
            Self::BadRequest(_) => "bad_request",
        }
    }

    /// Returns the policy reason when this is a permission denial.
    const fn denial(&self) -> Option<AccessReason> {
        match self {
            Self::Service(ServiceError::PermissionDenied(decision)) => Some(decision.reason),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let reason = self.denial();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
                reason,
            },
        };
        let mut response = (self.status(), Json(body)).into_response();
        if let Some(reason) = reason {
            response.extensions_mut().insert(DeniedAccess(reason));
        }
        response
    }
}

//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Error bodies are JSON: `{"error": "<kind>", "message": "<text>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cartwright_core::{CartError, CartOperation};
use serde::Serialize;
use thiserror::Error;

use crate::cart::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// A cart operation was rejected.
    #[error("Cart error: {source}")]
    Cart {
        source: CartError,
        operation: CartOperation,
    },

    /// Cart storage could not be read.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl AppError {
    /// Wrap a cart error raised by `operation`.
    #[must_use]
    pub const fn cart(source: CartError, operation: CartOperation) -> Self {
        Self::Cart { source, operation }
    }

    /// Whether this error indicates a server-side fault worth reporting.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Cart { source, .. } => matches!(
                source,
                CartError::LookupFailure(_) | CartError::Persistence(_)
            ),
            Self::Storage(_) | Self::Session(_) => true,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Cart { source, .. } => match source {
                CartError::NotFound(_) => StatusCode::NOT_FOUND,
                CartError::StockExceeded { .. } => StatusCode::CONFLICT,
                CartError::InvalidAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CartError::LookupFailure(_) => StatusCode::BAD_GATEWAY,
                CartError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body for this error.
    ///
    /// Cart errors carry the same message the shopper is notified with;
    /// internal details are never exposed.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        match self {
            Self::Cart { source, operation } => ErrorBody {
                error: source.kind(),
                message: source.notification(*operation).to_string(),
            },
            Self::Storage(_) => ErrorBody {
                error: "storage_unavailable",
                message: "Cart storage is unavailable".to_string(),
            },
            Self::Session(_) => ErrorBody {
                error: "internal",
                message: "Internal server error".to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), Json(self.body())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

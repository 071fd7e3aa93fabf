use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::library::LibraryError;
use crate::object_store::ObjectStoreError;
use crate::storage::{Collection, StoreError};

// ============================================================================
// Envelopes
// ============================================================================

/// `status` field of every response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JSendStatus {
    Success,
    Fail,
    Error,
}

/// `{"status": "success" | "fail", "data": ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct JSend<T> {
    pub status: JSendStatus,
    pub data: T,
}

/// One page of a longer listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    pub total: u64,
}

pub type JSendPaginated<T> = JSend<Page<T>>;

impl<T: Serialize> JSend<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            status: JSendStatus::Success,
            data,
        })
    }
}

impl<T: Serialize> JSend<Page<T>> {
    pub fn page(items: Vec<T>, pagination: Pagination) -> Json<Self> {
        JSend::success(Page { items, pagination })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FailData {
    pub message: String,
}

/// Server-side failures carry the message at the top level: `{"status": "error", "message": ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: JSendStatus,
    pub message: String,
}

// ============================================================================
// Handler errors
// ============================================================================

/// `Fail` renders as a JSend fail (client's fault, 4xx), `Error` as a JSend error (5xx).
#[derive(Debug)]
pub enum ApiError {
    Fail(StatusCode, String),
    Error(StatusCode, String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Fail(code, message) => {
                let body = JSend {
                    status: JSendStatus::Fail,
                    data: FailData { message },
                };
                (code, Json(body)).into_response()
            }
            ApiError::Error(code, message) => {
                let body = ErrorBody {
                    status: JSendStatus::Error,
                    message,
                };
                (code, Json(body)).into_response()
            }
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::BAD_REQUEST, message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::UNAUTHORIZED, message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::NOT_FOUND, message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::CONFLICT, message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::PAYLOAD_TOO_LARGE, message.into())
    }

    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::UNSUPPORTED_MEDIA_TYPE, message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        ApiError::Error(StatusCode::SERVICE_UNAVAILABLE, message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Error(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { collection, .. } => {
                ApiError::not_found(format!("{} not found", singular(collection)))
            }
            StoreError::EmailAlreadyExists
            | StoreError::DuplicateKey { .. }
            | StoreError::UniqueConstraintViolation { .. } => ApiError::conflict(e.to_string()),
            StoreError::InvalidCredentials => ApiError::unauthorized(e.to_string()),
            StoreError::StoreUnavailable(_) => ApiError::unavailable(e.to_string()),
            _ => {
                tracing::error!(error = %e, "Store operation failed");
                ApiError::internal(e.to_string())
            }
        }
    }
}

impl From<LibraryError> for ApiError {
    fn from(e: LibraryError) -> Self {
        match e {
            LibraryError::Store(e) => e.into(),
            LibraryError::Blob(ObjectStoreError::NotFound(_)) => {
                ApiError::not_found("File content not found")
            }
            LibraryError::Blob(ObjectStoreError::Store(e)) => e.into(),
            LibraryError::UnsupportedType(_) => ApiError::unsupported_media_type(e.to_string()),
            LibraryError::Blob(e) => {
                tracing::error!(error = %e, "Blob storage failed");
                ApiError::internal(e.to_string())
            }
        }
    }
}

fn singular(collection: Collection) -> &'static str {
    match collection {
        Collection::Users => "User",
        Collection::Subjects => "Subject",
        Collection::Files => "File",
        Collection::Blobs => "File content",
    }
}

// ============================================================================
// Custom extractors (reject with JSend-formatted ApiError)
// ============================================================================

/// Drop-in replacement for `axum::Json` that rejects with JSend errors.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = match rejection {
                    JsonRejection::JsonDataError(err) => {
                        format!("Invalid request body: {}", err.body_text())
                    }
                    JsonRejection::JsonSyntaxError(_) => "Malformed JSON in request body".into(),
                    JsonRejection::MissingJsonContentType(_) => {
                        "Missing Content-Type: application/json header".into()
                    }
                    _ => "Failed to read request body".into(),
                };
                Err(ApiError::bad_request(message))
            }
        }
    }
}

/// Drop-in replacement for `axum::extract::Query` that rejects with JSend errors.
pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, ApiError> {
        let query = parts.uri.query().unwrap_or_default();
        serde_qs::from_str(query)
            .map(AppQuery)
            .map_err(|e| ApiError::bad_request(friendly_query_error(&e.to_string())))
    }
}

/// Translate serde/serde_qs error messages into human-friendly descriptions.
fn friendly_query_error(raw: &str) -> String {
    let cleaned = raw
        .replace("u32", "non-negative integer")
        .replace("u64", "non-negative integer")
        .replace("i32", "integer")
        .replace("i64", "integer");

    format!("Invalid query parameter: {cleaned}")
}

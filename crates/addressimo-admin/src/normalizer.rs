//! Request wrapper that folds every transport outcome into a [`NormalizedResult`].
//!
//! Callers never see an `Err`: network failures, error statuses and logical
//! failures (`success` falsy) all come back as `is_error: true` with the best
//! message available.

use std::sync::Arc;

use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::target::ApiTargetResolver;
use crate::transport::{HttpTransport, Method, ReqwestTransport, TransportError, TransportResponse};

pub const API_ROOT: &str = "/api";
pub const OBJECT_DELETED_MESSAGE: &str = "object deleted";

const PATH_BASE: &str = "http://localhost/api";
const SUCCESS_STATUSES: [u16; 3] = [200, 201, 202];
const NO_CONTENT_STATUS: u16 = 204;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestPathError {
    #[error("request path must not be empty")]
    EmptyPath,
    #[error("request path must start with /api: {0}")]
    OutsideApiRoot(String),
    #[error("id object id cannot be used in a request path: {0:?}")]
    InvalidId(String),
}

/// Path of one id object under [`API_ROOT`], followed by `suffix` segments.
///
/// The id is percent-encoded as a single segment, so `/`, `?` and `#` inside
/// it never reach the backend as path structure.
pub fn resource_path(id: &str, suffix: &[&str]) -> Result<String, RequestPathError> {
    let invalid = || RequestPathError::InvalidId(id.to_string());
    if matches!(id.trim(), "" | "." | "..") {
        return Err(invalid());
    }
    let mut url = Url::parse(PATH_BASE).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|()| invalid())?
        .push(id)
        .extend(suffix);
    Ok(url.path().to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl NormalizedResult {
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self {
            is_error: false,
            message: None,
            data: Some(data),
        }
    }

    #[must_use]
    pub fn deleted() -> Self {
        Self {
            is_error: false,
            message: Some(OBJECT_DELETED_MESSAGE.to_string()),
            data: None,
        }
    }

    #[must_use]
    pub fn failure(message: Option<String>) -> Self {
        Self {
            is_error: true,
            message,
            data: None,
        }
    }

    /// A string field of the success payload, e.g. `message` or `id`.
    #[must_use]
    pub fn data_str(&self, field: &str) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|data| data.get(field))
            .and_then(value_as_string)
    }
}

/// Maps a raw transport outcome to a [`NormalizedResult`].
#[must_use]
pub fn normalize_outcome(
    outcome: Result<TransportResponse, TransportError>,
    generic_error_message: &str,
) -> NormalizedResult {
    match outcome {
        Ok(response) => {
            if response.status == NO_CONTENT_STATUS {
                return NormalizedResult::deleted();
            }
            let body = decode_body(&response.body);
            if SUCCESS_STATUSES.contains(&response.status)
                && body.get("success").is_some_and(is_truthy)
            {
                NormalizedResult::success(body)
            } else {
                NormalizedResult::failure(body.get("message").and_then(value_as_string))
            }
        }
        Err(error) => {
            let body = error.body().map(decode_body).unwrap_or(Value::Null);
            NormalizedResult::failure(Some(
                failure_message(&body).unwrap_or_else(|| generic_error_message.to_string()),
            ))
        }
    }
}

fn failure_message(body: &Value) -> Option<String> {
    let first_failure = body
        .get("failures")
        .and_then(Value::as_array)
        .and_then(|failures| failures.first())
        .and_then(|failure| failure.get("message"))
        .and_then(Value::as_str);
    first_failure
        .or_else(|| body.get("message").and_then(Value::as_str))
        .map(str::to_string)
}

fn decode_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap_or(Value::Null)
}

pub(crate) fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(value) => *value,
        Value::Number(value) => value.as_f64().is_some_and(|number| number != 0.0),
        Value::String(value) => !value.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Shared handle to the transport and target resolver. Cheap to clone.
#[derive(Clone)]
pub struct GenericApiService {
    transport: Arc<dyn HttpTransport>,
    resolver: Arc<dyn ApiTargetResolver>,
}

impl std::fmt::Debug for GenericApiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericApiService")
            .field("target", &self.resolver.resolve())
            .finish_non_exhaustive()
    }
}

impl GenericApiService {
    pub fn new(transport: Arc<dyn HttpTransport>, resolver: Arc<dyn ApiTargetResolver>) -> Self {
        Self {
            transport,
            resolver,
        }
    }

    pub fn with_reqwest(resolver: impl ApiTargetResolver + 'static) -> Self {
        Self::new(Arc::new(ReqwestTransport::new()), Arc::new(resolver))
    }

    pub fn create_request(
        &self,
        path: impl Into<String>,
        method: Method,
        generic_error_message: impl Into<String>,
    ) -> Result<ApiRequest, RequestPathError> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(RequestPathError::EmptyPath);
        }
        let in_root = path
            .strip_prefix(API_ROOT)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'));
        if !in_root {
            return Err(RequestPathError::OutsideApiRoot(path));
        }

        Ok(ApiRequest {
            service: self.clone(),
            path,
            method,
            generic_error_message: generic_error_message.into(),
        })
    }
}

/// A reusable, parameterized request. Each [`ApiRequest::call`] issues one
/// HTTP request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    service: GenericApiService,
    path: String,
    method: Method,
    generic_error_message: String,
}

impl ApiRequest {
    pub async fn call(&self, body: Option<&Value>) -> NormalizedResult {
        let url = self.service.resolver.resolve().url(&self.path);
        tracing::debug!(method = %self.method, url = %url, "admin api request");

        let outcome = self.service.transport.send(self.method, &url, body).await;
        let status = match &outcome {
            Ok(response) => Some(response.status),
            Err(TransportError::Status { status, .. }) => Some(*status),
            Err(TransportError::Network { .. }) => None,
        };
        if let Err(TransportError::Network { message }) = &outcome {
            tracing::warn!(method = %self.method, url = %url, error = %message, "admin api unreachable");
        }

        let result = normalize_outcome(outcome, &self.generic_error_message);
        if result.is_error {
            tracing::warn!(
                method = %self.method,
                url = %url,
                status = ?status,
                error_message = result.message.as_deref().unwrap_or_default(),
                "admin api request failed"
            );
        } else {
            tracing::debug!(method = %self.method, url = %url, status = ?status, "admin api request succeeded");
        }
        result
    }
}

//! View controllers. Each owns its view state and publishes every change
//! through a `tokio::sync::watch` channel; the rendering layer subscribes and
//! never writes back except through the command methods.
//!
//! Commands take `&mut self`, so a controller never has two commands in
//! flight. Dropping the controller (or a pending command future) is how a
//! view is torn down; nothing mutates state after that.

pub mod detail;
pub mod list;

pub use detail::{DetailController, DetailViewState};
pub use list::{ListController, ListViewState};

use serde_json::Value;

use crate::normalizer::{GenericApiService, NormalizedResult, RequestPathError};
use crate::transport::Method;

async fn run_request(
    api: &GenericApiService,
    path: Result<String, RequestPathError>,
    method: Method,
    generic_error_message: &str,
    body: Option<&Value>,
) -> NormalizedResult {
    match path.and_then(|path| api.create_request(path, method, generic_error_message)) {
        Ok(request) => request.call(body).await,
        Err(error) => {
            tracing::warn!(%error, "admin api request rejected");
            NormalizedResult::failure(Some(error.to_string()))
        }
    }
}

/// Message to show after a successful write: the backend's own `message`
/// when it sent a body, otherwise the normalizer's (e.g. "object deleted").
fn success_message(result: &NormalizedResult) -> Option<String> {
    result
        .data_str("message")
        .or_else(|| result.message.clone())
}

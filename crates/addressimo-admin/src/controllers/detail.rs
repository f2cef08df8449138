use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use super::{run_request, success_message};
use crate::normalizer::{API_ROOT, GenericApiService, NormalizedResult, resource_path};
use crate::record::ResourceRecord;
use crate::transport::Method;

pub const LOAD_ERROR_MESSAGE: &str = "Unable to get id object";
pub const SAVE_ERROR_MESSAGE: &str = "Unable to save id object";
pub const CREATE_ERROR_MESSAGE: &str = "Unable to create id object";
pub const DELETE_PRIVATE_KEY_ERROR_MESSAGE: &str = "Unable to delete private key.";
pub const DELETE_ERROR_MESSAGE: &str = "Unable to delete id object.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetailViewState {
    pub data: ResourceRecord,
    pub message: Option<String>,
    pub error_message: Option<String>,
}

/// Single id object view: load, upsert, delete, and delete of its private key.
///
/// Only `message` is reset at the start of a write; `error_message` is
/// overwritten by the next failure and cleared only by a successful load.
#[derive(Debug)]
pub struct DetailController {
    api: GenericApiService,
    state: watch::Sender<DetailViewState>,
}

impl DetailController {
    pub fn new(api: GenericApiService) -> Self {
        let (state, _) = watch::channel(DetailViewState::default());
        Self { api, state }
    }

    /// Builds the controller and runs [`DetailController::initialize`].
    pub async fn open(api: GenericApiService, id: Option<&str>) -> Self {
        let mut controller = Self::new(api);
        controller.initialize(id).await;
        controller
    }

    /// Loads `id` when the page was opened with one; otherwise the view stays
    /// empty, ready to create a new object.
    pub async fn initialize(&mut self, id: Option<&str>) {
        if let Some(id) = id.map(str::trim).filter(|id| !id.is_empty()) {
            self.load_by_id(id).await;
        }
    }

    #[must_use]
    pub fn state(&self) -> DetailViewState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DetailViewState> {
        self.state.subscribe()
    }

    pub fn set_data(&mut self, data: ResourceRecord) {
        self.state.send_modify(|state| state.data = data);
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.state.send_modify(|state| state.data.set(key, value));
    }

    pub async fn load_by_id(&mut self, id: &str) {
        let result = run_request(
            &self.api,
            resource_path(id, &[]),
            Method::Get,
            LOAD_ERROR_MESSAGE,
            None,
        )
        .await;

        if result.is_error {
            self.state
                .send_modify(|state| state.error_message = result.message);
            return;
        }

        match nested_record(&result) {
            Some(data) => self.state.send_modify(|state| {
                state.data = data;
                state.error_message = None;
            }),
            None => {
                tracing::warn!(id, "id object response carried no data object");
                self.state.send_modify(|state| {
                    state.error_message = Some(LOAD_ERROR_MESSAGE.to_string());
                });
            }
        }
    }

    /// Updates the object when it already has an id, creates it otherwise,
    /// then reloads it under the id the backend returned.
    pub async fn save(&mut self) {
        self.clear_message();

        let data = self.state.borrow().data.clone();
        let (path, method, generic_error_message) = match data.id() {
            Some(id) => (resource_path(&id, &[]), Method::Put, SAVE_ERROR_MESSAGE),
            None => (Ok(API_ROOT.to_string()), Method::Post, CREATE_ERROR_MESSAGE),
        };
        let body = data.to_value();
        let result = run_request(&self.api, path, method, generic_error_message, Some(&body)).await;

        if result.is_error {
            self.state
                .send_modify(|state| state.error_message = result.message);
            return;
        }

        let message = success_message(&result);
        self.state.send_modify(|state| state.message = message);

        match result.data_str("id") {
            Some(id) => {
                tracing::info!(%id, method = %method, "id object saved");
                self.load_by_id(&id).await;
            }
            None => tracing::warn!(method = %method, "save response carried no id; skipping reload"),
        }
    }

    pub async fn delete_private_key(&mut self) {
        self.clear_message();
        let Some(id) = self.current_id() else {
            self.missing_id(DELETE_PRIVATE_KEY_ERROR_MESSAGE);
            return;
        };

        let result = run_request(
            &self.api,
            resource_path(&id, &["privkey"]),
            Method::Delete,
            DELETE_PRIVATE_KEY_ERROR_MESSAGE,
            None,
        )
        .await;
        if !result.is_error {
            tracing::info!(%id, "private key deleted");
        }
        self.apply_write(result);
    }

    pub async fn delete_resource(&mut self) {
        self.clear_message();
        let Some(id) = self.current_id() else {
            self.missing_id(DELETE_ERROR_MESSAGE);
            return;
        };

        let result = run_request(
            &self.api,
            resource_path(&id, &[]),
            Method::Delete,
            DELETE_ERROR_MESSAGE,
            None,
        )
        .await;
        if !result.is_error {
            tracing::info!(%id, "id object deleted");
        }
        self.apply_write(result);
    }

    fn current_id(&self) -> Option<String> {
        self.state.borrow().data.id()
    }

    fn clear_message(&mut self) {
        self.state.send_modify(|state| state.message = None);
    }

    fn missing_id(&mut self, generic_error_message: &str) {
        tracing::warn!("id object has no id yet");
        self.state.send_modify(|state| {
            state.error_message = Some(generic_error_message.to_string());
        });
    }

    fn apply_write(&mut self, result: NormalizedResult) {
        if result.is_error {
            self.state
                .send_modify(|state| state.error_message = result.message);
        } else {
            let message = success_message(&result);
            self.state.send_modify(|state| state.message = message);
        }
    }
}

fn nested_record(result: &NormalizedResult) -> Option<ResourceRecord> {
    result
        .data
        .as_ref()
        .and_then(|data| data.get("data"))
        .cloned()
        .and_then(|data| ResourceRecord::try_from(data).ok())
}

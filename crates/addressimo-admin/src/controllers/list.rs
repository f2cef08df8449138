use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use super::run_request;
use crate::normalizer::{API_ROOT, GenericApiService, value_as_string};
use crate::transport::Method;

pub const LIST_ERROR_MESSAGE: &str = "Unable to get id objects";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListViewState {
    pub keys: Option<Vec<String>>,
    pub error_message: Option<String>,
}

/// Id list view. Loads once when opened; there is no refresh.
#[derive(Debug)]
pub struct ListController {
    state: watch::Sender<ListViewState>,
}

impl ListController {
    pub async fn open(api: GenericApiService) -> Self {
        let (state, _) = watch::channel(ListViewState::default());
        let controller = Self { state };
        controller.load(&api).await;
        controller
    }

    #[must_use]
    pub fn state(&self) -> ListViewState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ListViewState> {
        self.state.subscribe()
    }

    async fn load(&self, api: &GenericApiService) {
        let result = run_request(
            api,
            Ok(API_ROOT.to_string()),
            Method::Get,
            LIST_ERROR_MESSAGE,
            None,
        )
        .await;

        if result.is_error {
            self.state
                .send_modify(|state| state.error_message = result.message);
            return;
        }

        let keys = result
            .data
            .as_ref()
            .and_then(|data| data.get("keys"))
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(value_as_string).collect::<Vec<_>>());
        match keys {
            Some(keys) => {
                tracing::debug!(count = keys.len(), "id objects listed");
                self.state.send_modify(|state| state.keys = Some(keys));
            }
            None => {
                tracing::warn!("id object list response carried no keys");
                self.state.send_modify(|state| {
                    state.error_message = Some(LIST_ERROR_MESSAGE.to_string());
                });
            }
        }
    }
}

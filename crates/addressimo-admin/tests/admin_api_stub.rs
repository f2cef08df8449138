use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use addressimo_admin::{
    ApiTarget, DetailController, GenericApiService, ListController, LocationTargetResolver,
    Method, PageLocation, ResourceRecord, TargetPolicy,
};
use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

const ID_OBJECT_FIELDS: [&str; 5] = ["id", "memo", "wallet_address", "private_key", "bip70_enabled"];

#[derive(Clone, Default)]
struct BackendState {
    objects: Arc<Mutex<HashMap<String, Map<String, Value>>>>,
    next_id: Arc<AtomicU64>,
    calls: Arc<Mutex<Vec<String>>>,
}

struct BackendStub {
    port: u16,
    state: BackendState,
    shutdown: Option<oneshot::Sender<()>>,
}

impl BackendStub {
    fn api(&self) -> GenericApiService {
        GenericApiService::with_reqwest(ApiTarget {
            protocol: "http".to_string(),
            host: "127.0.0.1".to_string(),
            port: self.port,
        })
    }

    async fn calls(&self) -> Vec<String> {
        self.state.calls.lock().await.clone()
    }

    async fn seed(&self, id: &str, fields: Value) {
        let Value::Object(mut fields) = fields else {
            return;
        };
        fields.insert("id".to_string(), json!(id));
        self.state.objects.lock().await.insert(id.to_string(), fields);
    }
}

impl Drop for BackendStub {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn spawn_backend_stub() -> Result<BackendStub> {
    let state = BackendState::default();
    let app = Router::new()
        .route("/api", get(list_objects).post(create_object))
        .route(
            "/api/:id",
            get(fetch_object).put(update_object).delete(delete_object),
        )
        .route("/api/:id/privkey", delete(delete_private_key))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        let _ = server.await;
    });

    Ok(BackendStub {
        port: addr.port(),
        state,
        shutdown: Some(shutdown_tx),
    })
}

fn reply(status: StatusCode, success: bool, message: &str, extra: Value) -> Response {
    let mut body = json!({"success": success, "message": message});
    if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), extra) {
        body.extend(extra);
    }
    (status, Json(body)).into_response()
}

fn not_found() -> Response {
    reply(StatusCode::NOT_FOUND, false, "Object not found for this ID.", json!({}))
}

async fn record_call(state: &BackendState, call: String) {
    state.calls.lock().await.push(call);
}

async fn list_objects(State(state): State<BackendState>) -> Response {
    record_call(&state, "GET /api".to_string()).await;
    let mut keys = state.objects.lock().await.keys().cloned().collect::<Vec<_>>();
    keys.sort();
    reply(StatusCode::OK, true, "", json!({"keys": keys}))
}

async fn fetch_object(State(state): State<BackendState>, Path(id): Path<String>) -> Response {
    record_call(&state, format!("GET /api/{id}")).await;
    let Some(mut object) = state.objects.lock().await.get(&id).cloned() else {
        return not_found();
    };
    object.insert("private_key".to_string(), json!(""));
    reply(StatusCode::OK, true, "", json!({"data": object}))
}

async fn create_object(
    State(state): State<BackendState>,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    record_call(&state, "POST /api".to_string()).await;
    let id = format!("obj-{}", state.next_id.fetch_add(1, Ordering::SeqCst) + 1);
    let mut object = Map::new();
    object.insert("id".to_string(), json!(id));
    store(&state, object, body).await
}

async fn update_object(
    State(state): State<BackendState>,
    Path(id): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    record_call(&state, format!("PUT /api/{id}")).await;
    let Some(object) = state.objects.lock().await.get(&id).cloned() else {
        return not_found();
    };
    store(&state, object, body).await
}

async fn store(
    state: &BackendState,
    mut object: Map<String, Value>,
    body: Map<String, Value>,
) -> Response {
    if body.keys().any(|key| !ID_OBJECT_FIELDS.contains(&key.as_str())) {
        return reply(StatusCode::BAD_REQUEST, false, "Unknown key submitted", json!({}));
    }
    for (key, value) in body {
        if key == "id" {
            continue;
        }
        if key == "private_key" && value.as_str().is_none_or(str::is_empty) {
            continue;
        }
        object.insert(key, value);
    }
    let id = object
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    state.objects.lock().await.insert(id.clone(), object);
    reply(StatusCode::OK, true, "Update succeeded", json!({"id": id}))
}

async fn delete_object(State(state): State<BackendState>, Path(id): Path<String>) -> Response {
    record_call(&state, format!("DELETE /api/{id}")).await;
    if state.objects.lock().await.remove(&id).is_none() {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn delete_private_key(
    State(state): State<BackendState>,
    Path(id): Path<String>,
) -> Response {
    record_call(&state, format!("DELETE /api/{id}/privkey")).await;
    let mut objects = state.objects.lock().await;
    let Some(object) = objects.get_mut(&id) else {
        return not_found();
    };
    object.insert("private_key".to_string(), Value::Null);
    StatusCode::NO_CONTENT.into_response()
}

#[tokio::test]
async fn list_view_loads_keys_from_backend() -> Result<()> {
    let stub = spawn_backend_stub().await?;
    stub.seed("b", json!({"memo": "second"})).await;
    stub.seed("a", json!({"memo": "first"})).await;

    let controller = ListController::open(stub.api()).await;

    let state = controller.state();
    assert_eq!(state.error_message, None);
    assert_eq!(state.keys, Some(vec!["a".to_string(), "b".to_string()]));
    assert_eq!(stub.calls().await, vec!["GET /api".to_string()]);
    Ok(())
}

#[tokio::test]
async fn detail_view_round_trip_create_update_delete() -> Result<()> {
    let stub = spawn_backend_stub().await?;
    let mut controller = DetailController::open(stub.api(), None).await;
    assert!(controller.state().data.is_empty());

    controller.set_field("memo", json!("created from admin"));
    controller.save().await;

    let state = controller.state();
    assert_eq!(state.error_message, None);
    assert_eq!(state.message.as_deref(), Some("Update succeeded"));
    assert_eq!(state.data.id().as_deref(), Some("obj-1"));
    assert_eq!(state.data.get("memo"), Some(&json!("created from admin")));

    controller.set_field("wallet_address", json!("1BoatSLRHtKNngkdXEeobR76b53LETtpyT"));
    controller.save().await;
    assert_eq!(
        controller.state().data.get("wallet_address"),
        Some(&json!("1BoatSLRHtKNngkdXEeobR76b53LETtpyT"))
    );

    controller.delete_resource().await;
    let state = controller.state();
    assert_eq!(state.message.as_deref(), Some("object deleted"));
    assert_eq!(state.error_message, None);

    assert_eq!(
        stub.calls().await,
        vec![
            "POST /api".to_string(),
            "GET /api/obj-1".to_string(),
            "PUT /api/obj-1".to_string(),
            "GET /api/obj-1".to_string(),
            "DELETE /api/obj-1".to_string(),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn detail_view_reports_backend_errors() -> Result<()> {
    let stub = spawn_backend_stub().await?;
    stub.seed("abc", json!({"memo": "kept"})).await;

    let mut controller = DetailController::open(stub.api(), Some("abc")).await;
    assert_eq!(controller.state().data.get("private_key"), Some(&json!("")));

    controller.set_field("not_a_field", json!(true));
    controller.save().await;
    let state = controller.state();
    assert_eq!(state.message, None);
    assert_eq!(state.error_message.as_deref(), Some("Unknown key submitted"));

    let mut missing = DetailController::open(stub.api(), Some("missing")).await;
    assert_eq!(
        missing.state().error_message.as_deref(),
        Some("Object not found for this ID.")
    );
    let record = ResourceRecord::try_from(json!({"id": "missing"}))
        .map_err(|value| anyhow::anyhow!("not an object: {value}"))?;
    missing.set_data(record);
    missing.delete_private_key().await;
    assert_eq!(
        missing.state().error_message.as_deref(),
        Some("Object not found for this ID.")
    );
    Ok(())
}

#[tokio::test]
async fn private_key_delete_reports_deletion() -> Result<()> {
    let stub = spawn_backend_stub().await?;
    stub.seed("abc", json!({"private_key": "secret"})).await;

    let mut controller = DetailController::open(stub.api(), Some("abc")).await;
    controller.delete_private_key().await;

    assert_eq!(controller.state().message.as_deref(), Some("object deleted"));
    let stored = stub.state.objects.lock().await.get("abc").cloned();
    assert_eq!(stored.and_then(|object| object.get("private_key").cloned()), Some(Value::Null));
    Ok(())
}

#[tokio::test]
async fn loopback_pages_reach_the_dev_port() -> Result<()> {
    let stub = spawn_backend_stub().await?;
    let location = PageLocation::parse("http://127.0.0.1:1/edit?id=abc")?;
    let policy = TargetPolicy {
        loopback_host: "127.0.0.1".to_string(),
        dev_port: stub.port,
    };
    stub.seed("abc", json!({"memo": "via dev port"})).await;

    let id = location.query_param("id").map(str::to_string);
    let api = GenericApiService::with_reqwest(LocationTargetResolver::new(location, policy));
    let controller = DetailController::open(api, id.as_deref()).await;

    assert_eq!(controller.state().data.get("memo"), Some(&json!("via dev port")));
    Ok(())
}

#[tokio::test]
async fn unreachable_backend_resolves_to_generic_message() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);

    let api = GenericApiService::with_reqwest(ApiTarget {
        protocol: "http".to_string(),
        host: "127.0.0.1".to_string(),
        port,
    });
    let request = api.create_request("/api", Method::Get, "Unable to get id objects")?;
    let result = request.call(None).await;

    assert!(result.is_error);
    assert_eq!(result.message.as_deref(), Some("Unable to get id objects"));
    Ok(())
}

#[tokio::test]
async fn ids_with_slashes_address_a_single_object() -> Result<()> {
    let stub = spawn_backend_stub().await?;
    stub.seed("abc", json!({"private_key": "secret"})).await;
    stub.seed("abc/privkey", json!({"memo": "odd id"})).await;

    let mut controller = DetailController::open(stub.api(), Some("abc/privkey")).await;
    assert_eq!(controller.state().data.get("memo"), Some(&json!("odd id")));

    controller.delete_resource().await;

    assert_eq!(controller.state().message.as_deref(), Some("object deleted"));
    let objects = stub.state.objects.lock().await;
    assert!(!objects.contains_key("abc/privkey"));
    assert_eq!(
        objects.get("abc").and_then(|object| object.get("private_key")),
        Some(&json!("secret"))
    );
    Ok(())
}

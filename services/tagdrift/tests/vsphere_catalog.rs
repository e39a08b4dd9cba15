use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tagdrift::catalog::{Credentials, VsphereCatalog};
use tagdrift::config::VsphereConfig;
use tagdrift_core::{CatalogError, ObjectRef, TagCatalog};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

// base64("admin:secret")
const BASIC_AUTH: &str = "Basic YWRtaW46c2VjcmV0";
const ZONE_CATEGORY: &str = "urn:vmomi:InventoryServiceCategory:zone:GLOBAL";
const OTHER_CATEGORY: &str = "urn:vmomi:InventoryServiceCategory:env:GLOBAL";

#[derive(Default)]
struct MockState {
    logins: usize,
    valid_token: Option<String>,
    association_requests: Vec<Value>,
    fail_associations: bool,
}

#[derive(Clone, Default)]
struct MockVcenter {
    state: Arc<Mutex<MockState>>,
}

impl MockVcenter {
    async fn authorized(&self, headers: &HeaderMap) -> bool {
        let state = self.state.lock().await;
        let presented = headers
            .get("vmware-api-session-id")
            .and_then(|value| value.to_str().ok());
        presented.is_some() && presented == state.valid_token.as_deref()
    }
}

#[derive(Deserialize)]
struct ActionQuery {
    action: String,
}

async fn create_session(State(mock): State<MockVcenter>, headers: HeaderMap) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok());
    if auth != Some(BASIC_AUTH) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let mut state = mock.state.lock().await;
    state.logins += 1;
    let token = format!("session-{}", state.logins);
    state.valid_token = Some(token.clone());
    (StatusCode::CREATED, Json(token)).into_response()
}

async fn list_categories(State(mock): State<MockVcenter>, headers: HeaderMap) -> Response {
    if !mock.authorized(&headers).await {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!([OTHER_CATEGORY, ZONE_CATEGORY])).into_response()
}

async fn get_category(
    State(mock): State<MockVcenter>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !mock.authorized(&headers).await {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let name = match id.as_str() {
        ZONE_CATEGORY => "k8s-zone",
        OTHER_CATEGORY => "environment",
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(json!({ "id": id, "name": name, "cardinality": "SINGLE" })).into_response()
}

async fn list_tags(
    State(mock): State<MockVcenter>,
    Query(query): Query<ActionQuery>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !mock.authorized(&headers).await {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if query.action != "list-tags-for-category" {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let tags = match body["category_id"].as_str() {
        Some(ZONE_CATEGORY) => json!(["tag-a", "tag-b"]),
        Some(OTHER_CATEGORY) => json!(["tag-prod"]),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(tags).into_response()
}

async fn get_tag(
    State(mock): State<MockVcenter>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !mock.authorized(&headers).await {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let (name, category) = match id.as_str() {
        "tag-a" => ("zone-a", ZONE_CATEGORY),
        "tag-b" => ("zone-b", ZONE_CATEGORY),
        "tag-prod" => ("prod", OTHER_CATEGORY),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(json!({ "id": id, "name": name, "category_id": category, "description": "" }))
        .into_response()
}

async fn list_attached(
    State(mock): State<MockVcenter>,
    Query(query): Query<ActionQuery>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !mock.authorized(&headers).await {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if query.action != "list-attached-tags" {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let mut state = mock.state.lock().await;
    if state.fail_associations {
        return (StatusCode::SERVICE_UNAVAILABLE, "tagging service down").into_response();
    }
    state.association_requests.push(body.clone());
    let tags = match body["object_id"]["id"].as_str() {
        Some("vm-42") => json!(["tag-prod", "tag-b", "tag-a"]),
        _ => json!([]),
    };
    Json(tags).into_response()
}

async fn spawn_vcenter() -> (SocketAddr, MockVcenter, tokio::task::JoinHandle<()>) {
    let mock = MockVcenter::default();
    let app = Router::new()
        .route("/api/session", post(create_session))
        .route("/api/cis/tagging/category", get(list_categories))
        .route("/api/cis/tagging/category/:id", get(get_category))
        .route("/api/cis/tagging/tag", post(list_tags))
        .route("/api/cis/tagging/tag/:id", get(get_tag))
        .route("/api/cis/tagging/tag-association", post(list_attached))
        .with_state(mock.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let server = axum::serve(listener, app.into_make_service());
    let handle = tokio::spawn(async move {
        let _ = server.await;
    });
    (addr, mock, handle)
}

fn catalog(addr: SocketAddr, password: &str) -> VsphereCatalog {
    let config = VsphereConfig {
        url: format!("http://{addr}"),
        insecure: false,
        secret_path: PathBuf::from("/unused"),
        timeout: Duration::from_secs(2),
    };
    let credentials = Credentials {
        username: "admin".to_string(),
        password: password.to_string(),
    };
    VsphereCatalog::new(&config, credentials).expect("catalog")
}

#[tokio::test]
async fn resolves_category_by_name_and_lists_tags_in_order() {
    let (addr, mock, _handle) = spawn_vcenter().await;
    let catalog = catalog(addr, "secret");

    let tags = catalog.tags_for_category("k8s-zone").await.expect("tags");
    let names: Vec<_> = tags.iter().map(|tag| tag.name.as_str()).collect();
    assert_eq!(names, ["zone-a", "zone-b"]);
    assert!(tags.iter().all(|tag| tag.category_id == ZONE_CATEGORY));

    catalog.tags_for_category("k8s-zone").await.expect("tags again");
    assert_eq!(mock.state.lock().await.logins, 1);
}

#[tokio::test]
async fn resolves_category_by_id() {
    let (addr, _mock, _handle) = spawn_vcenter().await;
    let catalog = catalog(addr, "secret");

    let tags = catalog.tags_for_category(OTHER_CATEGORY).await.expect("tags");
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "prod");
}

#[tokio::test]
async fn unknown_category_is_not_found() {
    let (addr, _mock, _handle) = spawn_vcenter().await;
    let catalog = catalog(addr, "secret");

    let err = catalog
        .tags_for_category("rack")
        .await
        .expect_err("no such category");
    assert!(matches!(err, CatalogError::CategoryNotFound(ref name) if name == "rack"));
}

#[tokio::test]
async fn attached_tags_keep_association_order() {
    let (addr, mock, _handle) = spawn_vcenter().await;
    let catalog = catalog(addr, "secret");

    let attached = catalog
        .attached_tags(&ObjectRef::vm("vm-42"))
        .await
        .expect("attached");
    assert_eq!(attached, ["tag-prod", "tag-b", "tag-a"]);

    let untagged = catalog
        .attached_tags(&ObjectRef::host("host-20"))
        .await
        .expect("attached");
    assert!(untagged.is_empty());

    let state = mock.state.lock().await;
    assert_eq!(
        state.association_requests[0],
        json!({ "object_id": { "type": "VirtualMachine", "id": "vm-42" } })
    );
    assert_eq!(
        state.association_requests[1],
        json!({ "object_id": { "type": "HostSystem", "id": "host-20" } })
    );
}

#[tokio::test]
async fn expired_session_logs_in_again_once() {
    let (addr, mock, _handle) = spawn_vcenter().await;
    let catalog = catalog(addr, "secret");

    catalog
        .attached_tags(&ObjectRef::vm("vm-42"))
        .await
        .expect("first lookup");
    mock.state.lock().await.valid_token = Some("rotated-elsewhere".to_string());

    let attached = catalog
        .attached_tags(&ObjectRef::vm("vm-42"))
        .await
        .expect("lookup after expiry");
    assert_eq!(attached.len(), 3);
    assert_eq!(mock.state.lock().await.logins, 2);
}

#[tokio::test]
async fn bad_credentials_are_unavailable() {
    let (addr, mock, _handle) = spawn_vcenter().await;
    let catalog = catalog(addr, "wrong");

    let err = catalog
        .attached_tags(&ObjectRef::vm("vm-42"))
        .await
        .expect_err("login rejected");
    assert!(matches!(err, CatalogError::Unavailable(_)));
    assert_eq!(mock.state.lock().await.logins, 0);
}

#[tokio::test]
async fn server_errors_are_unavailable() {
    let (addr, mock, _handle) = spawn_vcenter().await;
    mock.state.lock().await.fail_associations = true;
    let catalog = catalog(addr, "secret");

    let err = catalog
        .attached_tags(&ObjectRef::vm("vm-42"))
        .await
        .expect_err("tagging down");
    assert!(matches!(err, CatalogError::Unavailable(_)));
    assert!(err.to_string().contains("503"));
}

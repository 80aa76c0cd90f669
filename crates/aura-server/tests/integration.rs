use async_trait::async_trait;
use aura_core::config::Config;
use aura_core::error::AuraError;
use aura_core::generation::{
    CodeProject, CodeRequest, DesignCode, DesignRequest, GenerationBackend, MockGenerationBackend,
};
use aura_core::paths;
use aura_core::store::{init_project, Snapshot};
use aura_core::types::WorkItemKind;
use aura_core::work_item::{BusinessBrief, Portfolio, WorkItem};
use aura_server::backend::HttpGenerationBackend;
use aura_server::state::AppState;
use axum::http::StatusCode;
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn item(kind: WorkItemKind, id: &str, brief: &str) -> WorkItem {
    WorkItem::new(kind, id, format!("{kind} {id}")).with_brief(brief)
}

/// P1 "Core" → B1 → I1, I2; F1 has no initiative key; E1 hangs off F1.
fn fixture() -> Snapshot {
    let mut brief = BusinessBrief::new("B1", "Checkout revamp");
    brief.portfolio_id = Some("P1".into());
    Snapshot {
        portfolios: vec![Portfolio::new("P1", "Core")],
        business_briefs: vec![brief],
        initiatives: vec![
            item(WorkItemKind::Initiative, "I1", "B1").with_portfolio("P1"),
            item(WorkItemKind::Initiative, "I2", "B1").with_portfolio("P1"),
        ],
        features: vec![item(WorkItemKind::Feature, "F1", "B1")],
        epics: vec![item(WorkItemKind::Epic, "E1", "B1").with_parent("F1")],
        stories: vec![],
    }
}

fn init(dir: &TempDir) {
    init_project(dir.path()).unwrap();
    fixture().save(dir.path()).unwrap();
}

fn state_with(dir: &TempDir, backend: Arc<dyn GenerationBackend>) -> AppState {
    AppState::with_backend(dir.path().to_path_buf(), Config::default(), backend)
}

fn app(dir: &TempDir) -> (AppState, axum::Router) {
    let state = state_with(dir, Arc::new(MockGenerationBackend));
    let router = aura_server::router_with_state(state.clone());
    (state, router)
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Send a POST request with a JSON body via `oneshot` and return (status, parsed JSON body).
async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// POST without a body.
async fn post_empty(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// GET returning (status, raw body text).
async fn get_text(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn ids(json: &serde_json::Value) -> Vec<String> {
    json.as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_returns_collection_in_source_order() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    let (status, json) = get(router.clone(), "/api/initiatives/list").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(ids(&json["data"]), vec!["I1", "I2"]);

    let (_, json) = get(router.clone(), "/api/stories/list").await;
    assert!(json["data"].as_array().unwrap().is_empty());

    let (_, json) = get(router.clone(), "/api/portfolios").await;
    assert_eq!(json["data"][0]["name"], "Core");

    let (_, json) = get(router, "/api/business-briefs").await;
    assert_eq!(json["data"][0]["id"], "B1");
}

#[tokio::test]
async fn unknown_kind_is_bad_request() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    let (status, json) = get(router, "/api/sagas/list").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn add_item_persists_and_moves_in_tree() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    let (status, json) = post_json(
        router.clone(),
        "/api/work-items/features",
        serde_json::json!({
            "id": "F2",
            "title": "Saved cards",
            "initiativeId": "I2",
            "businessBriefId": "B1",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["type"], "feature");

    let on_disk = Snapshot::load(dir.path()).unwrap();
    assert_eq!(on_disk.features.len(), 2);

    let (_, json) = get(router.clone(), "/api/hierarchy").await;
    let inits = &json["data"]["portfolios"][0]["briefs"][0]["initiatives"];
    assert_eq!(inits[0]["children"][0]["item"]["id"], "F1");
    assert_eq!(inits[1]["children"][0]["item"]["id"], "F2");

    let (status, _) = post_json(
        router,
        "/api/work-items/feature",
        serde_json::json!({ "id": "F2", "title": "dup" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn add_item_without_id_gets_generated_one() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    let (status, json) = post_json(
        router,
        "/api/work-items/story",
        serde_json::json!({ "id": "", "title": "Loose story" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(json["data"]["id"].as_str().unwrap().starts_with("story-"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_are_all_kept() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    let mut tasks = Vec::new();
    for n in 0..40 {
        let router = router.clone();
        tasks.push(tokio::spawn(async move {
            post_json(
                router,
                "/api/work-items/stories",
                serde_json::json!({ "id": format!("S{n}"), "title": format!("Story {n}") }),
            )
            .await
            .0
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::CREATED);
    }

    let (_, json) = get(router.clone(), "/api/stories/list").await;
    assert_eq!(ids(&json["data"]).len(), 40);
    assert_eq!(Snapshot::load(dir.path()).unwrap().stories.len(), 40);

    // Past the watcher's poll interval, memory still holds every story.
    tokio::time::sleep(Duration::from_millis(1_200)).await;
    let (_, json) = get(router, "/api/stories/list").await;
    assert_eq!(ids(&json["data"]).len(), 40);
}

#[tokio::test]
async fn failed_persist_is_500_and_leaves_memory_unchanged() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    let stories = paths::collection_path(dir.path(), WorkItemKind::Story);
    std::fs::remove_file(&stories).unwrap();
    std::fs::create_dir(&stories).unwrap();

    let (status, json) = post_json(
        router.clone(),
        "/api/work-items/initiatives",
        serde_json::json!({ "id": "I9", "title": "Lost" }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);

    let (_, json) = get(router, "/api/initiatives/list").await;
    assert_eq!(ids(&json["data"]), vec!["I1", "I2"]);
    let raw = std::fs::read_to_string(paths::collection_path(
        dir.path(),
        WorkItemKind::Initiative,
    ))
    .unwrap();
    assert!(!raw.contains("I9"));
}

#[tokio::test]
async fn disk_matches_memory_after_writes() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    for (kind, body) in [
        ("feature", serde_json::json!({ "id": "F2", "title": "Wallet", "initiativeId": "I2" })),
        ("epic", serde_json::json!({ "id": "E2", "title": "Tokens", "featureId": "F2" })),
        ("story", serde_json::json!({ "id": "S1", "title": "Add card", "epicId": "E2" })),
    ] {
        let (status, _) = post_json(router.clone(), &format!("/api/work-items/{kind}"), body).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = post_json(
        router.clone(),
        "/api/reverse-engineer/save",
        serde_json::json!({ "stories": [{ "id": "S2", "title": "Remove card", "epicId": "E2" }] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let on_disk = Snapshot::load(dir.path()).unwrap();
    for &kind in WorkItemKind::all() {
        let (_, json) = get(router.clone(), &format!("/api/{kind}/list")).await;
        let disk: Vec<String> = on_disk.items(kind).iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids(&json["data"]), disk, "{kind}");
    }
}

// ---------------------------------------------------------------------------
// Hierarchy and state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hierarchy_uses_brief_fallback_and_auto_expands() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    let (status, json) = get(router, "/api/hierarchy").await;
    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["portfolios"][0]["key"], "P1");
    let i1 = &data["portfolios"][0]["briefs"][0]["initiatives"][0];
    assert_eq!(i1["item"]["id"], "I1");
    assert_eq!(i1["children"][0]["item"]["id"], "F1");
    assert_eq!(i1["children"][0]["children"][0]["item"]["id"], "E1");

    let expanded: Vec<&str> = data["expanded"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(expanded.contains(&"portfolio-P1"));
    assert!(expanded.contains(&"portfolio-unassigned"));
    assert!(expanded.contains(&"brief-unassigned"));
}

#[tokio::test]
async fn hierarchy_rows_resolve_colours_and_badges() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    let (status, json) = get(router.clone(), "/api/hierarchy/rows?expandAll=true").await;
    assert_eq!(status, StatusCode::OK);
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows[0]["key"], "portfolio-P1");
    assert_eq!(rows[0]["kind"], "portfolio");
    assert_eq!(rows[0]["color"], "#8B4513");
    assert_eq!(rows[1]["kind"], "brief");
    assert_eq!(rows[1]["color"], "#CD853F");

    let epic = rows.iter().find(|r| r["key"] == "E1").unwrap();
    assert_eq!(epic["kind"], "epic");
    assert_eq!(epic["depth"], 4);
    assert_eq!(epic["color"], "#8B5CF6");
    assert!(epic["priorityClass"].as_str().unwrap().starts_with("bg-"));
    assert!(epic["statusClass"].as_str().unwrap().starts_with("bg-"));
    assert!(rows[0].get("priorityClass").is_none());

    // Default view opens the portfolio only; its named brief stays closed.
    let (_, json) = get(router, "/api/hierarchy/rows").await;
    let keys: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["portfolio-P1", "brief-B1"]);
}

#[tokio::test]
async fn state_reports_counts_and_loader() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    let (status, json) = get(router, "/api/state").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["counts"]["initiatives"], 2);
    assert_eq!(json["data"]["total"], 4);
    assert_eq!(json["data"]["loader"]["state"], "loaded");
    assert_eq!(json["data"]["provider"], "Mock");
}

// ---------------------------------------------------------------------------
// Reload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reload_replaces_collections_without_duplicates() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (state, router) = app(&dir);

    let replacement = Snapshot {
        initiatives: vec![
            item(WorkItemKind::Initiative, "N1", "B1"),
            item(WorkItemKind::Initiative, "N2", "B1"),
        ],
        features: vec![
            item(WorkItemKind::Feature, "NF1", "B1"),
            item(WorkItemKind::Feature, "NF2", "B1"),
            item(WorkItemKind::Feature, "NF3", "B1"),
        ],
        epics: vec![item(WorkItemKind::Epic, "NE1", "B1")],
        ..fixture()
    };
    replacement.save(dir.path()).unwrap();

    let (status, json) = post_empty(router.clone(), "/api/work-items/reload").await;
    assert_eq!(status, StatusCode::OK);
    let counts = &json["data"]["counts"];
    assert_eq!(counts["initiatives"], 2);
    assert_eq!(counts["features"], 3);
    assert_eq!(counts["epics"], 1);
    assert_eq!(counts["stories"], 0);
    assert!(state.read_store().find("I1").is_none());

    let (status, _) = post_empty(router, "/api/work-items/reload").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.read_store().counts().features, 3);
}

#[tokio::test]
async fn reload_while_loading_is_conflict() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (state, router) = app(&dir);

    assert!(state.loader.begin(true).unwrap());
    let (status, json) = post_empty(router, "/api/work-items/reload").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("in progress"));
}

#[tokio::test]
async fn reverse_engineer_save_is_all_or_nothing() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (state, router) = app(&dir);

    let (status, _) = post_json(
        router.clone(),
        "/api/reverse-engineer/save",
        serde_json::json!({
            "initiatives": [{ "id": "R1", "title": "New" }],
            "features": [{ "id": "F1", "title": "Clashes with existing" }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(state.read_store().find("R1").is_none());

    let (status, json) = post_json(
        router,
        "/api/reverse-engineer/save",
        serde_json::json!({
            "businessBrief": { "id": "B9", "title": "Extracted" },
            "initiatives": [{ "id": "R1", "title": "New", "businessBriefId": "B9" }],
            "stories": [{ "id": "RS1", "title": "Story" }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["saved"], 3);
    assert_eq!(Snapshot::load(dir.path()).unwrap().initiatives.len(), 3);
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

#[tokio::test]
async fn preview_returns_sandboxed_html() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/api/preview")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(&serde_json::json!({
                "html": "<button>Go</button>",
                "css": ".b{}",
                "javascript": ""
            }))
            .unwrap(),
        ))
        .unwrap();
    let response = router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert!(headers["content-type"].to_str().unwrap().starts_with("text/html"));
    assert_eq!(headers["content-security-policy"], "sandbox allow-scripts");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<button>Go</button>"));
    assert!(!html.contains("<script>"));

    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/api/preview?embed=iframe")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(r#"{"html":"<p>x</p>"}"#))
        .unwrap();
    let response = router.oneshot(req).await.unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.starts_with("<iframe"));
    assert!(html.contains(r#"sandbox="allow-scripts""#));
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_with_mock_backend() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (state, router) = app(&dir);

    let (status, json) = post_json(
        router,
        "/api/generate-design-code",
        serde_json::json!({ "workItemId": "F1", "prompt": "Dark theme" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["provider"], "Mock");
    assert_eq!(json["data"]["usedFallback"], false);
    assert!(json["data"]["code"]["html"].as_str().unwrap().contains("feature F1"));
    assert!(state.generations.is_empty());
}

#[tokio::test]
async fn generate_unknown_item_is_404() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    let (status, _) = post_json(
        router,
        "/api/generate-design-code",
        serde_json::json!({ "workItemId": "nope" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn generate_same_item_twice_is_conflict() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (state, router) = app(&dir);

    let _held = state.generations.try_begin("I1".to_string()).unwrap();
    let (status, _) = post_json(
        router.clone(),
        "/api/generate-design-code",
        serde_json::json!({ "workItemId": "I1" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post_json(
        router,
        "/api/generate-design-code",
        serde_json::json!({ "workItemId": "I2" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn generate_rejects_non_image_attachment() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    let (status, _) = post_json(
        router,
        "/api/generate-design-code",
        serde_json::json!({ "workItemId": "I1", "imageData": "aGVsbG8=", "imageType": "text/plain" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn remote_failure_falls_back_to_template() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/generate")
        .with_status(503)
        .with_body("upstream down")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    init(&dir);
    let backend =
        HttpGenerationBackend::new(format!("{}/generate", server.url()), Duration::from_secs(5))
            .unwrap();
    let router = aura_server::router_with_state(state_with(&dir, Arc::new(backend)));

    let (status, json) = post_json(
        router,
        "/api/generate-design-code",
        serde_json::json!({ "workItemId": "E1" }),
    )
    .await;
    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["usedFallback"], true);
    assert_eq!(json["data"]["provider"], "Template");
    assert!(!json["data"]["code"]["html"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn remote_success_is_passed_through() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/generate")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"success":true,"data":{"code":{"html":"<h1>Remote</h1>","css":"h1{}","javascript":""},"framework":"vue"}}"#,
        )
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    init(&dir);
    let backend =
        HttpGenerationBackend::new(format!("{}/generate", server.url()), Duration::from_secs(5))
            .unwrap();
    let router = aura_server::router_with_state(state_with(&dir, Arc::new(backend)));

    let (status, json) = post_json(
        router,
        "/api/generate-design-code",
        serde_json::json!({ "workItemId": "I1" }),
    )
    .await;
    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["usedFallback"], false);
    assert_eq!(json["data"]["provider"], "Http");
    assert_eq!(json["data"]["framework"], "vue");
    assert_eq!(json["data"]["code"]["html"], "<h1>Remote</h1>");
}

/// Holds generation for F1 until a permit is added; everything else answers
/// straight from the mock.
struct GatedBackend {
    gate: Arc<tokio::sync::Semaphore>,
}

#[async_trait]
impl GenerationBackend for GatedBackend {
    fn name(&self) -> &str {
        "Gated"
    }

    async fn generate_design(&self, request: &DesignRequest) -> aura_core::Result<DesignCode> {
        if request.work_item_id == "F1" {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| AuraError::Generation(e.to_string()))?;
        }
        MockGenerationBackend.generate_design(request).await
    }

    async fn generate_code(&self, request: &CodeRequest) -> aura_core::Result<CodeProject> {
        MockGenerationBackend.generate_code(request).await
    }
}

#[tokio::test]
async fn request_for_other_item_does_not_supersede() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let gate = Arc::new(tokio::sync::Semaphore::new(0));
    let state = state_with(&dir, Arc::new(GatedBackend { gate: gate.clone() }));
    let router = aura_server::router_with_state(state.clone());

    let slow = tokio::spawn(post_json(
        router.clone(),
        "/api/generate-design-code",
        serde_json::json!({ "workItemId": "F1" }),
    ));
    while !state.generations.is_active(&"F1".to_string()) {
        tokio::task::yield_now().await;
    }

    let (status, json) = post_json(
        router,
        "/api/generate-design-code",
        serde_json::json!({ "workItemId": "I1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["superseded"], false);

    gate.add_permits(1);
    let (status, json) = slow.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["superseded"], false);
    assert_eq!(json["data"]["provider"], "Gated");
}

#[tokio::test]
async fn generate_code_with_mock_backend() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    let (status, json) = post_json(
        router.clone(),
        "/api/generate-code",
        serde_json::json!({ "workItemId": "F1", "codeType": "backend", "language": "auto" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["provider"], "Mock");
    assert_eq!(json["data"]["usedFallback"], false);
    assert_eq!(json["data"]["fileName"], "F1-generated-code.md");
    assert_eq!(json["data"]["project"]["codeType"], "backend");
    assert_eq!(json["data"]["project"]["files"][0]["filename"], "server.ts");

    let (status, _) = post_json(
        router,
        "/api/generate-code",
        serde_json::json!({ "workItemId": "F1", "codeType": "mobile" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn remote_code_failure_falls_back_to_template_project() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/code")
        .with_status(500)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    init(&dir);
    let backend =
        HttpGenerationBackend::new(format!("{}/generate", server.url()), Duration::from_secs(5))
            .unwrap()
            .with_code_endpoint(format!("{}/code", server.url()));
    let router = aura_server::router_with_state(state_with(&dir, Arc::new(backend)));

    let (status, json) = post_json(
        router,
        "/api/generate-code",
        serde_json::json!({ "workItemId": "E1", "language": "html-single" }),
    )
    .await;
    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["usedFallback"], true);
    assert_eq!(json["data"]["provider"], "Template");
    assert_eq!(json["data"]["project"]["files"][0]["filename"], "index.html");
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn workflow_runs_select_generate_save_and_reopen() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    let (status, json) = post_json(
        router.clone(),
        "/api/workflow/select",
        serde_json::json!({ "workItemId": "F1", "prompt": "Dark theme" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["stage"], "config");
    assert_eq!(json["data"]["prompt"], "Dark theme");

    let (_, json) = post_json(
        router.clone(),
        "/api/generate-design-code",
        serde_json::json!({ "workItemId": "F1" }),
    )
    .await;
    assert_eq!(json["data"]["stage"], "generated");

    let (_, json) = get(router.clone(), "/api/workflow").await;
    assert_eq!(json["data"]["selected"], "F1");
    assert!(json["data"]["generated"]["html"]
        .as_str()
        .unwrap()
        .contains("feature F1"));

    let (status, html) = get_text(router.clone(), "/api/workflow/preview").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("feature F1"));

    let (status, text) = get_text(router.clone(), "/api/workflow/download").await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.starts_with("// Generated Design Component"));

    let (status, json) = post_empty(router.clone(), "/api/workflow/save").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["savedId"], "F1");
    assert_eq!(json["data"]["workflow"]["stage"], "table");
    assert_eq!(json["data"]["workflow"]["savedDesigns"][0], "F1");

    let (status, json) = get(router, "/api/workflow/saved/F1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["stage"], "generated");
    assert_eq!(json["data"]["selected"], "F1");
}

#[tokio::test]
async fn generation_for_other_item_leaves_workflow_alone() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    post_json(
        router.clone(),
        "/api/workflow/select",
        serde_json::json!({ "workItemId": "F1" }),
    )
    .await;
    let (_, json) = post_json(
        router.clone(),
        "/api/generate-design-code",
        serde_json::json!({ "workItemId": "I1" }),
    )
    .await;
    assert_eq!(json["data"]["stage"], "config");

    let (_, json) = get(router, "/api/workflow").await;
    assert_eq!(json["data"]["selected"], "F1");
    assert!(json["data"]["generated"].is_null());
}

#[tokio::test]
async fn workflow_rejects_invalid_transitions() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    let (status, _) = post_json(
        router.clone(),
        "/api/workflow/select",
        serde_json::json!({ "workItemId": "nope" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post_empty(router.clone(), "/api/workflow/save").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = get(router.clone(), "/api/workflow/saved/F1").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = get(router.clone(), "/api/workflow/preview").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Generated stage: selecting again needs a trip back to the table.
    post_json(
        router.clone(),
        "/api/workflow/select",
        serde_json::json!({ "workItemId": "F1" }),
    )
    .await;
    post_json(
        router.clone(),
        "/api/generate-design-code",
        serde_json::json!({ "workItemId": "F1" }),
    )
    .await;
    let (status, _) = post_json(
        router.clone(),
        "/api/workflow/select",
        serde_json::json!({ "workItemId": "E1" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (_, json) = get(router.clone(), "/api/workflow").await;
    assert_eq!(json["data"]["selected"], "F1");

    let (_, json) = post_empty(router.clone(), "/api/workflow/back").await;
    assert_eq!(json["data"]["stage"], "table");
    assert!(json["data"]["selected"].is_null());
    let (status, _) = post_json(
        router,
        "/api/workflow/select",
        serde_json::json!({ "workItemId": "E1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Hand-off
// ---------------------------------------------------------------------------

#[tokio::test]
async fn handoff_is_taken_once() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    let (_, router) = app(&dir);

    let (status, _) = post_json(
        router.clone(),
        "/api/handoff",
        serde_json::json!({ "workItemId": "F1", "autoAdvance": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = post_empty(router.clone(), "/api/handoff/take").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["workItem"]["id"], "F1");
    assert_eq!(json["data"]["stage"], "config");
    assert!(json["data"]["prompt"]
        .as_str()
        .unwrap()
        .starts_with("Create a modern, responsive UI component for \"feature F1\""));

    let (_, json) = get(router.clone(), "/api/workflow").await;
    assert_eq!(json["data"]["selected"], "F1");
    assert_eq!(json["data"]["stage"], "config");

    let (_, json) = post_empty(router, "/api/handoff/take").await;
    assert!(json["data"].is_null());
}

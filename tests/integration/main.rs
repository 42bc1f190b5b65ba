//! Integration tests for Syllabus
//!
//! These drive the full stack: scraper import, SQLite persistence, the
//! REST router and the CLI binary.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use syllabus_core::{GraphStore, KnowledgeBase, MemoryStore};
use syllabus_server::{ServerConfig, SyllabusServer};
use syllabus_sqlite::{ScraperDb, SqliteStore};
use tempfile::TempDir;
use tower::ServiceExt;

fn write_scraper_db(path: &Path) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        "
        CREATE TABLE courses (id INTEGER PRIMARY KEY, name TEXT NOT NULL, color TEXT NOT NULL);
        CREATE TABLE topics (
            id INTEGER PRIMARY KEY,
            url_slug TEXT UNIQUE NOT NULL,
            display_name TEXT NOT NULL,
            course_id INTEGER NOT NULL,
            content_html TEXT,
            content_text TEXT
        );
        CREATE TABLE edges (id INTEGER PRIMARY KEY, parent_slug TEXT NOT NULL, child_slug TEXT NOT NULL);

        INSERT INTO courses (id, name, color) VALUES (1, 'Arithmetic', '#ff0000');
        INSERT INTO topics (url_slug, display_name, course_id, content_html, content_text) VALUES
            ('counting', 'Counting', 1, '<p>1 2 3</p>', '1 2 3'),
            ('addition', 'Addition', 1, NULL, NULL);
        INSERT INTO edges (parent_slug, child_slug) VALUES ('counting', 'addition');
        ",
    )
    .unwrap();
}

struct Api {
    router: axum::Router,
}

impl Api {
    fn new(store: Arc<dyn GraphStore>, seed: Option<&ScraperDb>) -> Self {
        let kb = KnowledgeBase::new(store);
        kb.bootstrap(seed.map(|s| s as &dyn syllabus_core::SeedSource)).unwrap();
        let server = SyllabusServer::new(kb, ServerConfig::default());
        Api { router: server.router() }
    }

    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn new_graph(&self, name: &str) -> String {
        let (status, body) = self.call("POST", "/api/v1/graphs", Some(json!({ "name": name }))).await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

async fn course_numbering(api: &Api) {
    let id = api.new_graph("G").await;
    let courses = format!("/api/v1/graphs/{id}/courses");
    let (_, first) = api.call("POST", &courses, Some(json!({ "name": "Math", "color": "#111111" }))).await;
    let (_, second) = api.call("POST", &courses, Some(json!({ "name": "Science", "color": "#222222" }))).await;
    assert_eq!(first["data"]["courseId"], 1);
    assert_eq!(second["data"]["courseId"], 2);
}

async fn edge_round_trip(api: &Api) {
    let id = api.new_graph("Edges").await;
    let base = format!("/api/v1/graphs/{id}");
    api.call("POST", &format!("{base}/courses"), Some(json!({ "name": "Math", "color": "#111111" }))).await;
    for slug in ["a", "b"] {
        api.call(
            "POST",
            &format!("{base}/topics"),
            Some(json!({ "urlSlug": slug, "displayName": slug.to_uppercase(), "courseId": 1 })),
        )
        .await;
    }

    api.call("POST", &format!("{base}/edges"), Some(json!({ "parentSlug": "a", "childSlug": "b" }))).await;
    let (_, body) = api.call("GET", &format!("{base}/topics/b"), None).await;
    assert_eq!(body["data"]["parentSlugs"], json!(["a"]));

    let (status, _) = api.call("DELETE", &format!("{base}/edges/a/b"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = api.call("GET", &format!("{base}/topics/b"), None).await;
    assert_eq!(body["data"]["parentSlugs"], json!([]));

    // Re-link and remove both sides in one batch.
    api.call("POST", &format!("{base}/edges"), Some(json!({ "parentSlug": "a", "childSlug": "b" }))).await;
    let (status, body) = api
        .call(
            "POST",
            &format!("{base}/batch"),
            Some(json!({
                "edges": { "delete": [{ "parentSlug": "a", "childSlug": "b" }] },
                "topics": { "delete": ["a"] }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["edgesDeleted"], 1);
    assert_eq!(body["data"]["topicsDeleted"], 1);
    let (status, body) = api.call("GET", &format!("{base}/topics/a"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "TOPIC_NOT_FOUND");
}

async fn duplicate_slugs(api: &Api) {
    let first = api.new_graph("First").await;
    let second = api.new_graph("Second").await;
    for id in [&first, &second] {
        api.call(
            "POST",
            &format!("/api/v1/graphs/{id}/courses"),
            Some(json!({ "name": "Math", "color": "#111111" })),
        )
        .await;
    }
    let topic = json!({ "urlSlug": "limits", "displayName": "Limits", "courseId": 1 });

    let (status, _) = api.call("POST", &format!("/api/v1/graphs/{first}/topics"), Some(topic.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = api.call("POST", &format!("/api/v1/graphs/{first}/topics"), Some(topic.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_ENTRY");
    let (status, _) = api.call("POST", &format!("/api/v1/graphs/{second}/topics"), Some(topic)).await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn scenarios(api: &Api) {
    course_numbering(api).await;
    edge_round_trip(api).await;
    duplicate_slugs(api).await;
}

#[tokio::test]
async fn test_scenarios_on_memory_store() {
    let api = Api::new(Arc::new(MemoryStore::new()), None);
    scenarios(&api).await;
}

#[tokio::test]
async fn test_scenarios_on_sqlite_store() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(dir.path().join("knowledge_graphs.db")).unwrap();
    let api = Api::new(Arc::new(store), None);
    scenarios(&api).await;
}

#[tokio::test]
async fn test_imported_default_graph_is_copyable() {
    let dir = TempDir::new().unwrap();
    let scraper_path = dir.path().join("graph.db");
    write_scraper_db(&scraper_path);
    let scraper = ScraperDb::new(&scraper_path);
    let store = SqliteStore::open(dir.path().join("knowledge_graphs.db")).unwrap();
    let api = Api::new(Arc::new(store), Some(&scraper));

    let (_, body) = api.call("GET", "/api/v1/graphs", None).await;
    let default = body["data"][0].clone();
    assert_eq!(default["isDefault"], true);
    assert_eq!(default["isReadonly"], true);
    let default_id = default["id"].as_str().unwrap().to_string();

    let (status, body) = api
        .call(
            "POST",
            &format!("/api/v1/graphs/{default_id}/topics"),
            Some(json!({ "urlSlug": "x", "displayName": "X", "courseId": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "READONLY_GRAPH");

    let (status, body) = api
        .call(
            "POST",
            "/api/v1/graphs",
            Some(json!({ "name": "Mine", "copyFromGraphId": default_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["isReadonly"], false);
    let copy_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, source_stats) = api.call("GET", &format!("/api/v1/graphs/{default_id}/stats"), None).await;
    let (_, copy_stats) = api.call("GET", &format!("/api/v1/graphs/{copy_id}/stats"), None).await;
    assert_eq!(source_stats["data"], copy_stats["data"]);

    // The copy is independent of its source.
    let (status, _) = api.call("DELETE", &format!("/api/v1/graphs/{copy_id}/topics/counting"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = api.call("GET", &format!("/api/v1/graphs/{copy_id}/topics/addition"), None).await;
    assert_eq!(body["data"]["parentSlugs"], json!([]));
    let (_, body) = api.call("GET", &format!("/api/v1/graphs/{default_id}/topics/addition"), None).await;
    assert_eq!(body["data"]["parentSlugs"], json!(["counting"]));

    let (status, body) = api.call("DELETE", &format!("/api/v1/graphs/{default_id}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CANNOT_DELETE_DEFAULT");
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_syllabus"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Multi-tenant knowledge graph service"));
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("export"));
}

#[test]
fn test_cli_export_imports_scraper_db() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    write_scraper_db(&data_dir.join("graph.db"));

    let config_path = dir.path().join("syllabus.toml");
    std::fs::write(
        &config_path,
        format!("data_dir = {:?}\n", data_dir.to_string_lossy()),
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_syllabus"))
        .current_dir(dir.path())
        .env_remove("DB_TYPE")
        .env_remove("DATA_DIR")
        .env_remove("KG_DB_FILE")
        .env_remove("SCRAPER_DB_FILE")
        .env_remove("HOST")
        .env_remove("PORT")
        .arg("--config")
        .arg(&config_path)
        .args(["export", "default"])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let data: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(data["graph"]["name"], "Default Graph");
    assert_eq!(data["topics"].as_array().unwrap().len(), 2);
    assert_eq!(data["edges"].as_array().unwrap().len(), 1);
    assert!(data_dir.join("knowledge_graphs.db").exists());
}

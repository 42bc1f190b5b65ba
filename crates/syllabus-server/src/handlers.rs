//! REST API handlers
//!
//! Storage calls are synchronous, so each handler hands its work to the
//! blocking pool and wraps the outcome in the `{success, data}` envelope.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Serialize;
use syllabus_core::*;

use crate::error::{ApiError, ApiResult};
use crate::ServerState;

type Body<T> = Result<Json<T>, JsonRejection>;
type Params<T> = Result<Path<T>, PathRejection>;

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { success: true, data })
}

fn created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, ok(data))
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: bool,
}

const DELETED: Deleted = Deleted { deleted: true };

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: String,
}

/// Run `f` on the blocking pool against the shared knowledge base.
async fn blocking<T, F>(state: &Arc<ServerState>, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&KnowledgeBase) -> KgResult<T> + Send + 'static,
{
    let kb = state.kb.clone();
    tokio::task::spawn_blocking(move || f(&kb))
        .await
        .map_err(|e| ApiError::Internal(format!("worker failed: {e}")))?
        .map_err(ApiError::from)
}

// ── Health ──────────────────────────────────────────────────

pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    ok(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.kb.store().kind().to_string(),
    })
}

// ── Graphs ──────────────────────────────────────────────────

pub async fn list_graphs(State(state): State<Arc<ServerState>>) -> ApiResult<impl IntoResponse> {
    let graphs = blocking(&state, |kb| kb.list_graphs()).await?;
    Ok(ok(graphs))
}

pub async fn create_graph(
    State(state): State<Arc<ServerState>>,
    body: Body<NewGraph>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    let graph = blocking(&state, move |kb| kb.create_graph(&request)).await?;
    Ok(created(graph))
}

pub async fn get_graph(
    State(state): State<Arc<ServerState>>,
    Path(graph_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let graph = blocking(&state, move |kb| kb.get_graph(&graph_id)).await?;
    Ok(ok(graph))
}

pub async fn update_graph(
    State(state): State<Arc<ServerState>>,
    Path(graph_id): Path<String>,
    body: Body<GraphPatch>,
) -> ApiResult<impl IntoResponse> {
    let Json(patch) = body?;
    let graph = blocking(&state, move |kb| kb.update_graph(&graph_id, &patch)).await?;
    Ok(ok(graph))
}

pub async fn delete_graph(
    State(state): State<Arc<ServerState>>,
    Path(graph_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    blocking(&state, move |kb| kb.delete_graph(&graph_id)).await?;
    Ok(ok(DELETED))
}

pub async fn graph_data(
    State(state): State<Arc<ServerState>>,
    Path(graph_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let data = blocking(&state, move |kb| kb.full_graph_data(&graph_id)).await?;
    Ok(ok(data))
}

pub async fn graph_stats(
    State(state): State<Arc<ServerState>>,
    Path(graph_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let stats = blocking(&state, move |kb| kb.graph_stats(&graph_id)).await?;
    Ok(ok(stats))
}

pub async fn apply_batch(
    State(state): State<Arc<ServerState>>,
    Path(graph_id): Path<String>,
    body: Body<BatchOperations>,
) -> ApiResult<impl IntoResponse> {
    let Json(ops) = body?;
    let result = blocking(&state, move |kb| kb.apply_batch(&graph_id, &ops)).await?;
    Ok(ok(result))
}

// ── Courses ─────────────────────────────────────────────────

pub async fn list_courses(
    State(state): State<Arc<ServerState>>,
    Path(graph_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let courses = blocking(&state, move |kb| kb.list_courses(&graph_id)).await?;
    Ok(ok(courses))
}

pub async fn create_course(
    State(state): State<Arc<ServerState>>,
    Path(graph_id): Path<String>,
    body: Body<NewCourse>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    let course = blocking(&state, move |kb| kb.create_course(&graph_id, &request)).await?;
    Ok(created(course))
}

pub async fn get_course(
    State(state): State<Arc<ServerState>>,
    path: Params<(String, i64)>,
) -> ApiResult<impl IntoResponse> {
    let Path((graph_id, course_id)) = path?;
    let course = blocking(&state, move |kb| kb.get_course(&graph_id, course_id)).await?;
    Ok(ok(course))
}

pub async fn update_course(
    State(state): State<Arc<ServerState>>,
    path: Params<(String, i64)>,
    body: Body<CoursePatch>,
) -> ApiResult<impl IntoResponse> {
    let Path((graph_id, course_id)) = path?;
    let Json(patch) = body?;
    let course = blocking(&state, move |kb| kb.update_course(&graph_id, course_id, &patch)).await?;
    Ok(ok(course))
}

pub async fn delete_course(
    State(state): State<Arc<ServerState>>,
    path: Params<(String, i64)>,
) -> ApiResult<impl IntoResponse> {
    let Path((graph_id, course_id)) = path?;
    blocking(&state, move |kb| kb.delete_course(&graph_id, course_id)).await?;
    Ok(ok(DELETED))
}

// ── Topics ──────────────────────────────────────────────────

pub async fn list_topics(
    State(state): State<Arc<ServerState>>,
    Path(graph_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let topics = blocking(&state, move |kb| kb.list_topics(&graph_id)).await?;
    Ok(ok(topics))
}

pub async fn create_topic(
    State(state): State<Arc<ServerState>>,
    Path(graph_id): Path<String>,
    body: Body<NewTopic>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    let topic = blocking(&state, move |kb| kb.create_topic(&graph_id, &request)).await?;
    Ok(created(topic))
}

pub async fn get_topic(
    State(state): State<Arc<ServerState>>,
    Path((graph_id, url_slug)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let topic = blocking(&state, move |kb| kb.get_topic(&graph_id, &url_slug)).await?;
    Ok(ok(topic))
}

pub async fn update_topic(
    State(state): State<Arc<ServerState>>,
    Path((graph_id, url_slug)): Path<(String, String)>,
    body: Body<TopicPatch>,
) -> ApiResult<impl IntoResponse> {
    let Json(patch) = body?;
    let topic = blocking(&state, move |kb| kb.update_topic(&graph_id, &url_slug, &patch)).await?;
    Ok(ok(topic))
}

pub async fn delete_topic(
    State(state): State<Arc<ServerState>>,
    Path((graph_id, url_slug)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    blocking(&state, move |kb| kb.delete_topic(&graph_id, &url_slug)).await?;
    Ok(ok(DELETED))
}

pub async fn topic_prerequisites(
    State(state): State<Arc<ServerState>>,
    Path((graph_id, url_slug)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let topics = blocking(&state, move |kb| kb.topic_prerequisites(&graph_id, &url_slug)).await?;
    Ok(ok(topics))
}

pub async fn topic_dependents(
    State(state): State<Arc<ServerState>>,
    Path((graph_id, url_slug)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let topics = blocking(&state, move |kb| kb.topic_dependents(&graph_id, &url_slug)).await?;
    Ok(ok(topics))
}

// ── Edges ───────────────────────────────────────────────────

pub async fn list_edges(
    State(state): State<Arc<ServerState>>,
    Path(graph_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let edges = blocking(&state, move |kb| kb.list_edges(&graph_id)).await?;
    Ok(ok(edges))
}

pub async fn create_edge(
    State(state): State<Arc<ServerState>>,
    Path(graph_id): Path<String>,
    body: Body<NewEdge>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    let edge = blocking(&state, move |kb| kb.create_edge(&graph_id, &request)).await?;
    Ok(created(edge))
}

pub async fn delete_edge(
    State(state): State<Arc<ServerState>>,
    Path((graph_id, parent_slug, child_slug)): Path<(String, String, String)>,
) -> ApiResult<impl IntoResponse> {
    blocking(&state, move |kb| kb.delete_edge(&graph_id, &parent_slug, &child_slug)).await?;
    Ok(ok(DELETED))
}

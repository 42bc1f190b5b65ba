//! Axum router setup for the Syllabus API

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::*;
use crate::ServerState;

/// Create the axum router with all routes
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Graphs
        .route("/api/v1/graphs", get(list_graphs).post(create_graph))
        .route(
            "/api/v1/graphs/:graph_id",
            get(get_graph).patch(update_graph).delete(delete_graph),
        )
        .route("/api/v1/graphs/:graph_id/data", get(graph_data))
        .route("/api/v1/graphs/:graph_id/stats", get(graph_stats))
        .route("/api/v1/graphs/:graph_id/batch", post(apply_batch))
        // Courses
        .route(
            "/api/v1/graphs/:graph_id/courses",
            get(list_courses).post(create_course),
        )
        .route(
            "/api/v1/graphs/:graph_id/courses/:course_id",
            get(get_course).patch(update_course).delete(delete_course),
        )
        // Topics
        .route(
            "/api/v1/graphs/:graph_id/topics",
            get(list_topics).post(create_topic),
        )
        .route(
            "/api/v1/graphs/:graph_id/topics/:url_slug",
            get(get_topic).patch(update_topic).delete(delete_topic),
        )
        .route(
            "/api/v1/graphs/:graph_id/topics/:url_slug/prerequisites",
            get(topic_prerequisites),
        )
        .route(
            "/api/v1/graphs/:graph_id/topics/:url_slug/dependents",
            get(topic_dependents),
        )
        // Edges
        .route(
            "/api/v1/graphs/:graph_id/edges",
            get(list_edges).post(create_edge),
        )
        .route(
            "/api/v1/graphs/:graph_id/edges/:parent_slug/:child_slug",
            delete(delete_edge),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

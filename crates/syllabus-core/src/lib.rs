//! Syllabus Core: knowledge graph model, storage trait, and consistency rules

pub mod model;
pub mod error;
pub mod consistency;
pub mod graph;
pub mod seed;
pub mod store;
pub mod memory;
pub mod service;
pub mod registry;
pub mod engine;
pub mod query;
pub mod batch;
pub mod config;

#[cfg(test)]
pub mod tests;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use model::{
    Course, CoursePatch, CourseView, Edge, EdgeView, GraphData, GraphPatch, GraphStats,
    KnowledgeGraph, NewCourse, NewEdge, NewGraph, NewTopic, Timestamp, Topic, TopicPatch, TopicView,
};
pub use error::{KgError, KgResult};
pub use graph::TopicGraph;
pub use seed::{SeedCourse, SeedData, SeedEdge, SeedSource, SeedTopic};
pub use store::GraphStore;
pub use memory::MemoryStore;
pub use service::KnowledgeBase;
pub use registry::DEFAULT_GRAPH_NAME;
pub use batch::{
    BatchAction, BatchCategory, BatchFailure, BatchOperations, BatchResult, CourseOperations,
    CourseUpdate, EdgeOperations, TopicOperations, TopicUpdate,
};
pub use crate::config::{Config, ConfigError, DbType};

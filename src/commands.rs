//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use syllabus_core::{Config, DbType, GraphStore, KnowledgeBase, KnowledgeGraph, MemoryStore};
use syllabus_server::{ServerConfig, SyllabusServer};
use syllabus_sqlite::{ScraperDb, SqliteStore};

/// Open the configured store and make sure the default graph exists.
pub fn open_knowledge_base(config: &Config) -> anyhow::Result<(KnowledgeBase, KnowledgeGraph)> {
    let store: Arc<dyn GraphStore> = match config.db_type {
        DbType::Sqlite => {
            let path = config.kg_db_path();
            tracing::info!("Opening knowledge graph database at {}", path.display());
            let store = SqliteStore::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            Arc::new(store)
        }
        DbType::Memory => {
            tracing::info!("Using in-memory store, data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let kb = KnowledgeBase::new(store);
    let scraper = ScraperDb::locate(config.scraper_db_path());
    if scraper.is_none() {
        tracing::debug!(
            "No scraper database at {}",
            config.scraper_db_path().display()
        );
    }
    let default = kb.bootstrap(scraper.as_ref().map(|s| s as &dyn syllabus_core::SeedSource))?;
    Ok((kb, default))
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    // Bootstrap may import a large scraper database.
    let boot_config = config.clone();
    let (kb, default) = tokio::task::spawn_blocking(move || open_knowledge_base(&boot_config))
        .await
        .context("bootstrap task failed")??;
    tracing::info!("Default graph: {} ({})", default.name, default.id);

    let server = SyllabusServer::new(
        kb,
        ServerConfig {
            host: config.host,
            port: config.port,
        },
    );
    server.start().await
}

pub fn init(config: &Config) -> anyhow::Result<()> {
    let (kb, default) = open_knowledge_base(config)?;
    let stats = kb.graph_stats(&default.id)?;
    tracing::info!(
        "Default graph {} ready: {} courses, {} topics, {} edges",
        default.id,
        stats.courses,
        stats.topics,
        stats.edges
    );
    Ok(())
}

pub fn export(config: &Config, graph: &str, out: Option<&Path>) -> anyhow::Result<()> {
    let (kb, _) = open_knowledge_base(config)?;
    let graph = kb.resolve_graph(graph)?;
    let data = kb.full_graph_data(&graph.id)?;
    let json = serde_json::to_string_pretty(&data)?;

    match out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("Exported graph {} to {}", graph.id, path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub fn stats(config: &Config, graph: &str) -> anyhow::Result<()> {
    let (kb, _) = open_knowledge_base(config)?;
    let graph = kb.resolve_graph(graph)?;
    let stats = kb.graph_stats(&graph.id)?;
    println!("{} ({})", graph.name, graph.id);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

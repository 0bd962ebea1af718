use std::sync::Arc;

use anyhow::Result;
use records::{
    Documents, DocumentStore, database::RedisStore, memory::MemoryStore,
};
use tracing::info;

use super::{
    config::{Config, MEMORY_STORE},
    runner::CodeRunner,
    search::SearchIndex,
};

pub struct State {
    pub config: Config,
    pub docs: Documents,
    pub search: SearchIndex,
    pub runner: CodeRunner,
}

impl State {
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let store: Arc<dyn DocumentStore> = if config.redis_url == MEMORY_STORE {
            info!("Using in-memory document store");
            Arc::new(MemoryStore::default())
        } else {
            Arc::new(RedisStore::connect(&config.redis_url).await?)
        };

        let docs = Documents::new(store);
        let search = SearchIndex::new(
            config.meili_url.as_deref(),
            config.meili_key.as_deref(),
            docs.clone(),
        )
        .await?;

        Ok(Self::with_parts(config, docs, search))
    }

    pub fn with_parts(config: Config, docs: Documents, search: SearchIndex) -> Arc<Self> {
        let runner = CodeRunner::new(config.exec_timeout, config.exec_max_output_bytes);

        Arc::new(Self {
            config,
            docs,
            search,
            runner,
        })
    }

    /// Memory-backed state without a search engine.
    pub fn for_tests() -> Arc<Self> {
        let docs = Documents::new(Arc::new(MemoryStore::default()));
        let search = SearchIndex::local(docs.clone());

        Self::with_parts(Config::for_tests(), docs, search)
    }
}

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::AppConfig;
use crate::embedding::create_provider;
use crate::llm::{ChatModel, ChatModelClient, OpenAiCompatBackend};
use crate::rag::{ChunkerConfig, Ingestor, RagOptions, Retriever};
use crate::tools::ToolRegistry;
use crate::vectorstore::{ChromaStore, VectorStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub chat: Arc<dyn ChatModel>,
    pub retriever: Arc<Retriever>,
    pub ingestor: Arc<Ingestor>,
    pub store: Arc<dyn VectorStore>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn initialize(config: AppConfig) -> anyhow::Result<Arc<Self>> {
        let embedder = create_provider(&config)?;
        let store: Arc<dyn VectorStore> =
            Arc::new(ChromaStore::new(&config.chroma_host, config.chroma_port));

        let backend = Arc::new(OpenAiCompatBackend::new(
            config.chat_base_url.clone(),
            config.chat_model.clone(),
            config.chat_api_key.clone(),
        ));
        let tools = Arc::new(ToolRegistry::builtin());
        let chat: Arc<dyn ChatModel> = Arc::new(ChatModelClient::new(
            backend,
            tools,
            config.system_prompt.clone(),
        ));

        let retriever = Arc::new(Retriever::new(embedder.clone(), store.clone()));
        let ingestor = Arc::new(Ingestor::new(
            embedder,
            store.clone(),
            ChunkerConfig {
                chunk_size: config.chunk_size,
                chunk_overlap: config.chunk_overlap,
                max_chunks: config.max_chunks,
            },
        ));

        Ok(Arc::new(AppState {
            config: Arc::new(config),
            chat,
            retriever,
            ingestor,
            store,
            started_at: Utc::now(),
        }))
    }

    pub fn rag_options(&self) -> RagOptions {
        RagOptions {
            enabled: self.config.rag_enabled,
            threshold: self.config.rag_threshold,
            top_k: self.config.rag_top_k,
            collection: self.config.collection.clone(),
        }
    }
}

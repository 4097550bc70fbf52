//! Environment-backed application configuration.
//!
//! Every recognized option has a default so the server starts with zero
//! configuration against local Ollama and Chroma instances.

use std::env;
use std::path::PathBuf;

/// Fallback system instruction when `SYSTEM_PROMPT` is not set.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "你是一个乐于助人的AI助手。请用简洁、准确的语言回答用户的问题。\
     当提供了参考文档时，请优先基于文档内容回答。";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub log_dir: PathBuf,

    pub chat_base_url: String,
    pub chat_model: String,
    pub chat_api_key: Option<String>,
    pub system_prompt: String,

    pub embedding_provider: String,
    pub embedding_model: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_base_url: Option<String>,

    pub chroma_host: String,
    pub chroma_port: u16,
    pub collection: String,

    pub rag_enabled: bool,
    pub rag_top_k: usize,
    pub rag_threshold: usize,

    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_chunks: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 8080),
            allowed_origins: env_list("ALLOWED_ORIGINS"),
            log_dir: PathBuf::from(env_string("LOG_DIR", "logs")),

            chat_base_url: env_string("CHAT_BASE_URL", "http://localhost:11434/v1"),
            chat_model: env_string("CHAT_MODEL", "deepseek-chat"),
            chat_api_key: env_optional("CHAT_API_KEY"),
            system_prompt: env_string("SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),

            embedding_provider: env_string("EMBEDDING_TYPE", "ollama"),
            embedding_model: env_optional("EMBEDDING_MODEL"),
            embedding_api_key: env_optional("EMBEDDING_API_KEY"),
            embedding_base_url: env_optional("EMBEDDING_BASE_URL"),

            chroma_host: env_string("CHROMA_HOST", "localhost"),
            chroma_port: env_parse("CHROMA_PORT", 8000),
            collection: env_string("CHROMA_COLLECTION", "documents"),

            rag_enabled: env_flag("ENABLE_RAG", true),
            rag_top_k: env_parse::<usize>("RAG_TOP_K", 4).clamp(1, 50),
            rag_threshold: env_parse("RAG_THRESHOLD", 0),

            chunk_size: env_parse::<usize>("CHUNK_SIZE", 500).clamp(50, 8000),
            chunk_overlap: env_parse::<usize>("CHUNK_OVERLAP", 50).clamp(0, 2000),
            max_chunks: env_parse::<usize>("MAX_CHUNKS", 200).clamp(1, 10_000),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(val) if !val.trim().is_empty() => val.trim().to_string(),
        _ => default.to_string(),
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(val) => matches!(
            val.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

fn env_list(key: &str) -> Vec<String> {
    env::var(key)
        .map(|val| {
            val.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

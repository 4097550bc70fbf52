pub mod augment;
pub mod chunker;
pub mod ingest;
pub mod prompt;
pub mod retriever;

pub use augment::{should_use_rag, RagChatModel, RagOptions};
pub use chunker::ChunkerConfig;
pub use ingest::Ingestor;
pub use prompt::build_prompt;
pub use retriever::{RetrievedDocument, Retriever};

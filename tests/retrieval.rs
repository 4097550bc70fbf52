mod common;

use std::sync::Arc;

use serde_json::json;

use common::{
    content_delta, CountingEmbedder, FailingEmbedder, InMemoryStore, MockEmbedder, ScriptedBackend,
};
use ragchat_backend::embedding::EmbeddingProvider;
use ragchat_backend::llm::{ChatMessage, ChatModel, ChatModelClient};
use ragchat_backend::rag::{build_prompt, ChunkerConfig, Ingestor, RagChatModel, RagOptions, Retriever};
use ragchat_backend::tools::ToolRegistry;
use ragchat_backend::vectorstore::VectorStore;

const COLLECTION: &str = "documents";

async fn seed_paris(store: &InMemoryStore) {
    let embedder = MockEmbedder;
    let text = "Paris is the capital of France.";
    let embedding = embedder.embed(text).await.unwrap();
    store
        .add_batch(
            COLLECTION,
            vec![("doc-1".to_string(), embedding, text.to_string(), None)],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn search_returns_the_stored_record() {
    let store = Arc::new(InMemoryStore::new());
    seed_paris(&store).await;
    let retriever = Retriever::new(Arc::new(MockEmbedder), store);

    let docs = retriever
        .search("What is the capital of France?", 1, COLLECTION)
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].content, "Paris is the capital of France.");
    assert!(docs[0].metadata.is_empty());

    let prompt = build_prompt("What is the capital of France?", &docs);
    let passage = prompt.find("[文档 1]\nParis is the capital of France.").unwrap();
    let question = prompt.rfind("What is the capital of France?").unwrap();
    assert!(passage < question);
}

#[tokio::test]
async fn retrieval_failure_degrades_to_the_original_message() {
    let backend = Arc::new(
        ScriptedBackend::with_completion(json!({"role": "assistant", "content": ""}))
            .streaming(vec![content_delta("Paris.")]),
    );
    let inner = Arc::new(ChatModelClient::new(
        backend.clone(),
        Arc::new(ToolRegistry::builtin()),
        "system".to_string(),
    ));
    let retriever = Arc::new(Retriever::new(
        Arc::new(FailingEmbedder),
        Arc::new(InMemoryStore::new()),
    ));
    let model = RagChatModel::new(
        inner,
        retriever,
        RagOptions {
            enabled: true,
            threshold: 0,
            top_k: 1,
            collection: COLLECTION.to_string(),
        },
    );

    let mut rx = model
        .sse_response(&[ChatMessage::user("What is the capital of France?")])
        .await;
    let mut frames = Vec::new();
    while let Some(bytes) = rx.recv().await {
        frames.push(String::from_utf8(bytes.to_vec()).unwrap());
    }

    // Completed despite the retrieval failure, with the raw message.
    assert_eq!(frames.last().unwrap(), "data: [DONE]\n\n");
    let calls = backend.complete_calls.lock().unwrap();
    assert_eq!(calls[0][1]["content"], "What is the capital of France?");
}

#[tokio::test]
async fn qualifying_turn_is_rewritten_and_earlier_turns_kept() {
    let store = Arc::new(InMemoryStore::new());
    seed_paris(&store).await;

    let backend = Arc::new(
        ScriptedBackend::with_completion(json!({"role": "assistant", "content": ""}))
            .streaming(vec![content_delta("Paris.")]),
    );
    let inner = Arc::new(ChatModelClient::new(
        backend.clone(),
        Arc::new(ToolRegistry::builtin()),
        "system".to_string(),
    ));
    let retriever = Arc::new(Retriever::new(Arc::new(MockEmbedder), store));
    let model = RagChatModel::new(
        inner,
        retriever,
        RagOptions {
            enabled: true,
            threshold: 0,
            top_k: 1,
            collection: COLLECTION.to_string(),
        },
    );

    let history = [
        ChatMessage::user("Hello"),
        ChatMessage::assistant("Hi, how can I help?"),
        ChatMessage::user("What is the capital of France?"),
    ];
    let mut rx = model.sse_response(&history).await;
    while rx.recv().await.is_some() {}

    let calls = backend.complete_calls.lock().unwrap();
    let messages = &calls[0];
    // Earlier turns untouched.
    assert_eq!(messages[1]["content"], "Hello");
    assert_eq!(messages[2]["content"], "Hi, how can I help?");
    // Last turn rewritten with retrieved context, query last.
    let rewritten = messages[3]["content"].as_str().unwrap();
    assert!(rewritten.contains("[文档 1]\nParis is the capital of France."));
    assert!(rewritten.ends_with("What is the capital of France?"));
}

#[tokio::test]
async fn assistant_final_turn_is_never_augmented() {
    let store = Arc::new(InMemoryStore::new());
    seed_paris(&store).await;

    let backend = Arc::new(
        ScriptedBackend::with_completion(json!({"role": "assistant", "content": ""}))
            .streaming(vec![content_delta("ok")]),
    );
    let inner = Arc::new(ChatModelClient::new(
        backend.clone(),
        Arc::new(ToolRegistry::builtin()),
        "system".to_string(),
    ));
    let embedder = Arc::new(CountingEmbedder::default());
    let retriever = Arc::new(Retriever::new(embedder.clone(), store));
    let model = RagChatModel::new(
        inner,
        retriever,
        RagOptions {
            enabled: true,
            threshold: 0,
            top_k: 1,
            collection: COLLECTION.to_string(),
        },
    );

    let history = [
        ChatMessage::user("What is the capital of France?"),
        ChatMessage::assistant("Paris is the capital of France."),
    ];
    let mut rx = model.sse_response(&history).await;
    while rx.recv().await.is_some() {}

    // No retrieval happened and the history went through untouched.
    assert_eq!(embedder.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    let calls = backend.complete_calls.lock().unwrap();
    let messages = &calls[0];
    assert_eq!(messages[1]["content"], "What is the capital of France?");
    assert_eq!(messages[2]["content"], "Paris is the capital of France.");
    assert!(!messages[2]["content"].as_str().unwrap().contains("[文档"));
}

#[tokio::test]
async fn empty_retrieval_bypasses_the_template() {
    let backend = Arc::new(
        ScriptedBackend::with_completion(json!({"role": "assistant", "content": ""}))
            .streaming(vec![content_delta("ok")]),
    );
    let inner = Arc::new(ChatModelClient::new(
        backend.clone(),
        Arc::new(ToolRegistry::builtin()),
        "system".to_string(),
    ));
    // Store has nothing for the query to match.
    let retriever = Arc::new(Retriever::new(
        Arc::new(MockEmbedder),
        Arc::new(InMemoryStore::new()),
    ));
    let model = RagChatModel::new(
        inner,
        retriever,
        RagOptions {
            enabled: true,
            threshold: 0,
            top_k: 3,
            collection: COLLECTION.to_string(),
        },
    );

    let mut rx = model.sse_response(&[ChatMessage::user("anything at all")]).await;
    while rx.recv().await.is_some() {}

    let calls = backend.complete_calls.lock().unwrap();
    assert_eq!(calls[0][1]["content"], "anything at all");
}

#[tokio::test]
async fn short_text_ingests_as_a_single_uuid_record() {
    let store = Arc::new(InMemoryStore::new());
    let ingestor = Ingestor::new(
        Arc::new(MockEmbedder),
        store.clone(),
        ChunkerConfig::default(),
    );

    let ids = ingestor
        .ingest(
            "Paris is the capital of France.",
            Some(json!({"source": "atlas.txt"})),
            COLLECTION,
        )
        .await
        .unwrap();

    assert_eq!(ids.len(), 1);
    assert_eq!(ids[0].len(), 36); // uuid v4 text form

    let records = store.list(COLLECTION).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].document, "Paris is the capital of France.");
    let metadata = records[0].metadata.as_ref().unwrap();
    assert_eq!(metadata["source"], "atlas.txt");
    assert_eq!(metadata["chunk_index"], 0);

    assert_eq!(store.count(COLLECTION).await.unwrap(), 1);
    store.delete(COLLECTION, &ids[0]).await.unwrap();
    assert_eq!(store.count(COLLECTION).await.unwrap(), 0);
}

#[tokio::test]
async fn ingesting_empty_text_stores_nothing() {
    let store = Arc::new(InMemoryStore::new());
    let ingestor = Ingestor::new(
        Arc::new(MockEmbedder),
        store.clone(),
        ChunkerConfig::default(),
    );

    let ids = ingestor.ingest("   ", None, COLLECTION).await.unwrap();
    assert!(ids.is_empty());
    assert_eq!(store.count(COLLECTION).await.unwrap(), 0);
}

//! Prompt assembly for retrieved context.
//!
//! Pure and order-preserving: documents keep their retrieval rank, the
//! original query is literally last. Callers bypass the template entirely
//! when no documents were retrieved.

use super::retriever::RetrievedDocument;

const CITATION_INSTRUCTION: &str = "请根据以下检索到的文档回答问题，回答时请标注所引用的文档编号。";

/// Interpolate retrieved documents and the query into the chat prompt.
pub fn build_prompt(query: &str, docs: &[RetrievedDocument]) -> String {
    let mut prompt = String::from(CITATION_INSTRUCTION);
    prompt.push_str("\n\n");

    for (i, doc) in docs.iter().enumerate() {
        prompt.push_str(&format!("[文档 {}]\n{}\n\n", i + 1, doc.content));
    }

    prompt.push_str("问题：");
    prompt.push_str(query);
    prompt
}

//! Prompt composition for the answer backend.
//!
//! The template is fixed: retrieved chunks are joined into a `<context>`
//! block and the user's question follows it. There is no conversation
//! history; every question is answered from the retrieved context alone.

use crate::models::SearchHit;

const TEMPLATE: &str = "\
Use the provided data to answer the question in less than 250 words.
If the answer is not found, ask the user to clarify.

<context>
{context}
</context>

Question: {question}

Assistant:";

/// Compose the generation prompt from retrieved chunks and the question.
/// Chunks appear in retrieval order, separated by blank lines.
pub fn compose(hits: &[SearchHit], question: &str) -> String {
    let context = hits
        .iter()
        .map(|hit| hit.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    TEMPLATE
        .replace("{context}", &context)
        .replace("{question}", question)
}

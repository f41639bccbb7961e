//! Prompt templates for RAG generation

use crate::providers::vector_store::VectorMatch;

/// Prompt builder for document questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build context from retrieved passages
    pub fn build_context(matches: &[VectorMatch]) -> String {
        let mut context = String::new();

        for (i, m) in matches.iter().enumerate() {
            context.push_str(&format!("[{}]\n{}\n\n---\n\n", i + 1, m.text.trim()));
        }

        context
    }

    /// System instruction shared by every provider
    pub fn system_instruction() -> &'static str {
        "You are an assistant answering questions about a single uploaded document. \
         Answer using the document passages supplied with each question and the \
         conversation so far. If the passages do not contain the answer, say that the \
         document does not cover it instead of guessing."
    }

    /// Build the user prompt for one question
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        let context = if context.trim().is_empty() {
            "(no relevant passages were found in the document)"
        } else {
            context
        };

        format!(
            r#"Answer the question using ONLY the document passages below.

RULES:
1. Use information that is stated in the passages; do not add outside knowledge
2. If the passages do not answer the question, reply: "The document does not cover this."
3. Follow-up questions may refer to earlier turns of the conversation
4. Keep the answer concise and well structured

DOCUMENT PASSAGES:
{context}

QUESTION: {question}

Answer:"#,
            context = context,
            question = question
        )
    }
}

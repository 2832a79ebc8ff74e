//! Retrieval-augmented question answering over indexed knowledge.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::error::{ExtractError, Result};
use crate::output::{LlmClient, LlmRequest};
use crate::storage::{KnowledgeIndexer, SearchHit};

const SYSTEM_PROMPT: &str = "You answer questions about a code repository. \
Use only the provided context. If the context does not contain the answer, say so.";

/// An indexed file that contributed context to an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerSource {
    pub id: String,
    pub repository: String,
    pub path: String,
    pub score: f32,
}

/// Generated answer with the files it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<AnswerSource>,
}

/// Render retrieved chunks and the question into a single prompt.
pub fn build_prompt(question: &str, hits: &[SearchHit]) -> String {
    let mut prompt = String::from("Context:\n");
    for hit in hits {
        prompt.push_str(&format!(
            "\n--- {} ({}) ---\n{}\n",
            hit.metadata.item.path, hit.metadata.item.repository, hit.text
        ));
    }
    prompt.push_str(&format!("\nQuestion: {}\nAnswer:", question));
    prompt
}

/// Answers questions from the top matching chunks.
pub struct QuestionAnswerer {
    indexer: Arc<KnowledgeIndexer>,
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl QuestionAnswerer {
    pub fn new(indexer: Arc<KnowledgeIndexer>, llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            indexer,
            llm,
            model: model.into(),
        }
    }

    /// Retrieve `top_k` chunks for `question` and ask the model.
    pub async fn ask(&self, question: &str, top_k: usize) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ExtractError::InvalidArgument("question must not be empty".to_string()));
        }

        let hits = self.indexer.search(question, top_k).await?;
        let request = LlmRequest {
            model: self.model.clone(),
            prompt: build_prompt(question, &hits),
            system: Some(SYSTEM_PROMPT.to_string()),
        };
        let answer = self.llm.complete(&request).await?;

        let mut seen = HashSet::new();
        let sources: Vec<AnswerSource> = hits
            .iter()
            .filter(|hit| seen.insert(hit.metadata.original_id.clone()))
            .map(|hit| AnswerSource {
                id: hit.metadata.original_id.clone(),
                repository: hit.metadata.item.repository.clone(),
                path: hit.metadata.item.path.clone(),
                score: hit.score,
            })
            .collect();

        info!(provider = self.llm.name(), context_chunks = hits.len(), sources = sources.len(), "Answered question");
        Ok(Answer {
            question: question.to_string(),
            answer: answer.trim().to_string(),
            sources,
        })
    }
}

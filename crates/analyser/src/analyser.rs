use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::extract::extract_structured;
use crate::llm::{ChatCompletion, LlmError};

const SYSTEM_PROMPT: &str = "You are a helpful assistant";

/// The analyser kernel: composes the prompt, calls the LLM, and pulls the
/// structured block out of the reply.
pub struct ArticleAnalyser {
    llm: Arc<dyn ChatCompletion>,
    base_prompt: String,
}

impl ArticleAnalyser {
    /// Load the prompt file once. A missing file is fatal at startup.
    pub fn from_prompt_file(
        llm: Arc<dyn ChatCompletion>,
        path: impl AsRef<Path>,
    ) -> std::io::Result<Self> {
        let base_prompt = std::fs::read_to_string(path)?;
        Ok(Self::new(llm, base_prompt))
    }

    pub fn new(llm: Arc<dyn ChatCompletion>, base_prompt: String) -> Self {
        Self { llm, base_prompt }
    }

    /// Compose the prompt for one article.
    fn prompt_for(&self, title: &str, content: &str) -> String {
        format!(
            "{}\n\n---\n\nTitle: {}\n\nContent:\n{}",
            self.base_prompt, title, content
        )
    }

    /// Analyse one article: returns the structured block (if the reply
    /// carried a well-formed one) and the trimmed raw text.
    pub async fn analyse(
        &self,
        title: &str,
        content: &str,
    ) -> Result<(Option<Value>, String), LlmError> {
        let prompt = self.prompt_for(title, content);
        let response = self.llm.complete(SYSTEM_PROMPT, &prompt).await?;

        let structured = extract_structured(&response);
        info!(
            structured = structured.is_some(),
            response_len = response.len(),
            "llm response received"
        );

        Ok((structured, response.trim().to_string()))
    }
}

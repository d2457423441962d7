//! Completion step run after context assembly
//!
//! [`CompletionChain`] is the seam for the downstream language-model call.
//! [`OllamaCompletion`] implements it over Ollama's `POST /api/generate`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::cancel::CallContext;
use crate::errors::{Result, RetrievalError};

/// Named string inputs and outputs of a chain
pub type ChainValues = HashMap<String, String>;

/// Output key used when a chain does not override it
pub const DEFAULT_OUTPUT_KEY: &str = "text";

/// Downstream language-model step
#[async_trait]
pub trait CompletionChain: Send + Sync {
    async fn run(&self, ctx: &CallContext, inputs: ChainValues) -> Result<ChainValues>;

    /// Key of the answer field in the outputs
    fn output_key(&self) -> &str {
        DEFAULT_OUTPUT_KEY
    }
}

/// Substitute `{name}` placeholders with input values in a single left to
/// right pass. Substituted values are never scanned again, and placeholders
/// with no matching input are kept verbatim.
pub fn render_prompt(template: &str, inputs: &ChainValues) -> String {
    let mut prompt = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        prompt.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after
            .find('}')
            .and_then(|close| inputs.get(&after[..close]).map(|v| (close, v)));
        match value {
            Some((close, value)) => {
                prompt.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                prompt.push('{');
                rest = after;
            }
        }
    }
    prompt.push_str(rest);
    prompt
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Single-shot Ollama completion over a prompt template
#[derive(Debug, Clone)]
pub struct OllamaCompletion {
    client: Client,
    base_url: String,
    model: String,
    template: String,
}

impl OllamaCompletion {
    pub fn new(client: Client, base_url: &str, model: &str, template: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            template: template.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionChain for OllamaCompletion {
    async fn run(&self, ctx: &CallContext, inputs: ChainValues) -> Result<ChainValues> {
        let url = format!("{}/api/generate", self.base_url);
        let request = OllamaGenerateRequest {
            model: &self.model,
            prompt: render_prompt(&self.template, &inputs),
            stream: false,
        };

        let body: OllamaGenerateResponse = ctx
            .run(async {
                let response = self.client.post(&url).json(&request).send().await?;
                if !response.status().is_success() {
                    let status = response.status();
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    return Err(RetrievalError::Backend(format!(
                        "Ollama HTTP {}: {}",
                        status, error_text
                    )));
                }
                Ok(response.json().await?)
            })
            .await?;

        let mut outputs = inputs;
        outputs.insert(self.output_key().to_string(), body.response);
        Ok(outputs)
    }
}

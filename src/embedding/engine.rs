// Embedding clients: query text in, vector out
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cancel::CallContext;
use crate::errors::{Result, RetrievalError};
use crate::knowledge::EmbedderDecl;

/// Text embedding capability handed to vector index clients
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single query string
    async fn embed_query(&self, ctx: &CallContext, text: &str) -> Result<Vec<f32>>;

    /// Model identifier, for diagnostics
    fn model(&self) -> &str;
}

/// Build an embedder for a declaration
pub fn embedder_from_decl(decl: &EmbedderDecl, client: Client) -> Result<Arc<dyn Embedder>> {
    match decl.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(
            client,
            &decl.endpoint.url,
            &decl.model,
        ))),
        "openai" => {
            let api_key = match &decl.api_key_env {
                Some(var) => Some(std::env::var(var).map_err(|_| {
                    RetrievalError::Configuration(format!(
                        "embedder {}: environment variable {} is not set",
                        decl.name, var
                    ))
                })?),
                None => None,
            };
            Ok(Arc::new(OpenAiEmbedder::new(
                client,
                &decl.endpoint.url,
                &decl.model,
                api_key,
            )))
        }
        other => Err(RetrievalError::UnsupportedEmbedder(other.to_string())),
    }
}

async fn error_body(response: reqwest::Response) -> RetrievalError {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    RetrievalError::Backend(format!("HTTP {}: {}", status, text))
}

#[derive(Debug, Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embeddings from an Ollama server (`POST /api/embed`)
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed_query(&self, ctx: &CallContext, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embed", self.base_url);
        let request = OllamaEmbedRequest {
            model: &self.model,
            input: text,
        };

        let body: OllamaEmbedResponse = ctx
            .run(async {
                let response = self.client.post(&url).json(&request).send().await?;
                if !response.status().is_success() {
                    return Err(error_body(response).await);
                }
                Ok(response.json().await?)
            })
            .await?;

        body.embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Backend("Ollama returned no embedding".to_string()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct OpenAiEmbedRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

/// Embeddings from an OpenAI-compatible endpoint (`POST {base}/embeddings`)
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiEmbedder {
    pub fn new(client: Client, base_url: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_query(&self, ctx: &CallContext, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url);
        let request = OpenAiEmbedRequest {
            model: &self.model,
            input: [text],
        };

        let body: OpenAiEmbedResponse = ctx
            .run(async {
                let mut builder = self.client.post(&url).json(&request);
                if let Some(key) = &self.api_key {
                    builder = builder.bearer_auth(key);
                }
                let response = builder.send().await?;
                if !response.status().is_success() {
                    return Err(error_body(response).await);
                }
                Ok(response.json().await?)
            })
            .await?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RetrievalError::Backend("embedding response had no data".to_string()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::knowledge::Endpoint;

    fn decl(provider: &str) -> EmbedderDecl {
        EmbedderDecl {
            namespace: "arcadia".to_string(),
            name: "bge".to_string(),
            provider: provider.to_string(),
            endpoint: Endpoint {
                url: "http://127.0.0.1:11434/".to_string(),
            },
            model: "bge-m3".to_string(),
            api_key_env: None,
        }
    }

    #[test]
    fn test_ollama_from_decl() {
        let embedder = embedder_from_decl(&decl("ollama"), Client::new()).unwrap();
        assert_eq!(embedder.model(), "bge-m3");
    }

    #[test]
    fn test_unknown_provider() {
        let err = embedder_from_decl(&decl("zhipuai"), Client::new()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UnsupportedBackend);
        assert!(err.to_string().contains("zhipuai"));
    }

    #[test]
    fn test_missing_api_key_env() {
        let mut d = decl("openai");
        d.api_key_env = Some("KB_RETRIEVER_TEST_UNSET_KEY".to_string());
        let err = embedder_from_decl(&d, Client::new()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let embedder = OllamaEmbedder::new(Client::new(), "http://127.0.0.1:11434/", "bge-m3");
        assert_eq!(embedder.base_url, "http://127.0.0.1:11434");
    }

    #[test]
    fn test_openai_request_shape() {
        let request = OpenAiEmbedRequest {
            model: "text-embedding-3-small",
            input: ["hello"],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["input"][0], "hello");
    }

    #[tokio::test]
    #[ignore] // Requires Ollama running
    async fn test_ollama_embed_integration() {
        let embedder = OllamaEmbedder::new(Client::new(), "http://127.0.0.1:11434", "nomic-embed-text");
        let vector = embedder
            .embed_query(&CallContext::new(), "hello world")
            .await
            .unwrap();
        assert!(!vector.is_empty());
    }
}

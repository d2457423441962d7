//! Chroma REST client bound to one collection
//!
//! Scores are reported as `1 - distance`; with a threshold set, hits scoring
//! below it are dropped. Thresholds outside `[0, 1]` are rejected.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};

use crate::cancel::CallContext;
use crate::errors::{Result, RetrievalError};
use crate::vector_db::backend::{ChromaParams, SimilaritySearch};
use crate::vector_db::hit::SearchHit;

#[derive(Debug, Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    metadata: JsonValue,
    get_or_create: bool,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query_embeddings: [&'a [f32]; 1],
    n_results: usize,
    include: [&'static str; 3],
}

/// Body of `POST /api/v1/collections/{id}/query`; one row per query embedding
#[derive(Debug, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    pub metadatas: Option<Vec<Vec<Option<Map<String, JsonValue>>>>>,
    #[serde(default)]
    pub distances: Option<Vec<Vec<f32>>>,
}

/// Chroma collection addressed by knowledge-base namespace
#[derive(Debug, Clone)]
pub struct ChromaIndex {
    client: Client,
    base_url: String,
    collection: String,
    collection_id: String,
}

impl ChromaIndex {
    /// Look up or create the collection for `namespace`
    pub async fn connect(
        ctx: &CallContext,
        client: Client,
        params: &ChromaParams,
        namespace: &str,
    ) -> Result<Self> {
        let base_url = params.url.trim_end_matches('/').to_string();
        let url = format!("{}/api/v1/collections", base_url);
        let request = CreateCollectionRequest {
            name: namespace,
            metadata: json!({ "hnsw:space": params.distance_function.as_str() }),
            get_or_create: true,
        };

        let collection: CollectionResponse = ctx
            .run(async {
                let response = client.post(&url).json(&request).send().await?;
                if !response.status().is_success() {
                    let status = response.status();
                    let text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    return Err(RetrievalError::Backend(format!(
                        "chroma: HTTP {}: {}",
                        status, text
                    )));
                }
                Ok(response.json().await?)
            })
            .await?;

        Ok(Self {
            client,
            base_url,
            collection: namespace.to_string(),
            collection_id: collection.id,
        })
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }
}

/// Flatten a query response into hits, applying the score threshold
pub fn hits_from_query(response: QueryResponse, score_threshold: Option<f32>) -> Result<Vec<SearchHit>> {
    let documents = response.documents.unwrap_or_default();
    let metadatas = response.metadatas.unwrap_or_default();
    let distances = response.distances.unwrap_or_default();

    if documents.len() != distances.len() || (!metadatas.is_empty() && metadatas.len() != documents.len()) {
        return Err(RetrievalError::Backend(
            "chroma: query result lengths do not match".to_string(),
        ));
    }

    let mut hits = Vec::new();
    for (row, docs) in documents.into_iter().enumerate() {
        let row_distances = &distances[row];
        if row_distances.len() != docs.len() {
            return Err(RetrievalError::Backend(
                "chroma: query result lengths do not match".to_string(),
            ));
        }
        let row_metadatas = metadatas.get(row);

        for (i, doc) in docs.into_iter().enumerate() {
            let score = 1.0 - row_distances[i];
            if score_threshold.is_some_and(|t| score < t) {
                continue;
            }
            let metadata = row_metadatas
                .and_then(|m| m.get(i).cloned().flatten())
                .unwrap_or_default();
            hits.push(SearchHit::from_json_metadata(
                doc.unwrap_or_default(),
                score,
                metadata,
            ));
        }
    }
    Ok(hits)
}

#[async_trait]
impl SimilaritySearch for ChromaIndex {
    async fn similarity_search(
        &self,
        ctx: &CallContext,
        vector: &[f32],
        k: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<SearchHit>> {
        if let Some(t) = score_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(RetrievalError::Configuration(format!(
                    "score threshold {} must be between 0 and 1",
                    t
                )));
            }
        }

        let url = format!(
            "{}/api/v1/collections/{}/query",
            self.base_url, self.collection_id
        );
        let request = QueryRequest {
            query_embeddings: [vector],
            n_results: k,
            include: ["documents", "metadatas", "distances"],
        };

        let response: QueryResponse = ctx
            .run(async {
                let response = self.client.post(&url).json(&request).send().await?;
                if !response.status().is_success() {
                    let status = response.status();
                    let text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    return Err(RetrievalError::Backend(format!(
                        "chroma: HTTP {}: {}",
                        status, text
                    )));
                }
                Ok(response.json().await?)
            })
            .await?;

        hits_from_query(response, score_threshold)
    }

    fn namespace(&self) -> &str {
        &self.collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> QueryResponse {
        serde_json::from_value(json!({
            "ids": [["1", "2", "3"]],
            "documents": [["q: leave policy", "q: overtime", null]],
            "metadatas": [[
                {"a": "Ask HR", "fileName": "dataset/qa.csv", "lineNumber": 7},
                null,
                {"a": "n/a"}
            ]],
            "distances": [[0.1, 0.4, 0.9]]
        }))
        .unwrap()
    }

    #[test]
    fn test_hits_keep_backend_order() {
        let hits = hits_from_query(response(), None).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].content, "q: leave policy");
        assert!((hits[0].score - 0.9).abs() < 1e-6);
        assert_eq!(hits[0].raw_attribute("a"), b"\"Ask HR\"");
        assert_eq!(hits[0].raw_attribute("lineNumber"), b"7");
        assert!(hits[1].attributes.is_empty());
        assert_eq!(hits[2].content, "");
    }

    #[test]
    fn test_threshold_filters_low_scores() {
        let hits = hits_from_query(response(), Some(0.5)).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].content, "q: overtime");
    }

    #[test]
    fn test_mismatched_lengths() {
        let bad: QueryResponse = serde_json::from_value(json!({
            "documents": [["a", "b"]],
            "distances": [[0.1]]
        }))
        .unwrap();
        assert!(hits_from_query(bad, None).is_err());
    }

    #[test]
    fn test_empty_response() {
        let hits = hits_from_query(QueryResponse::default(), Some(0.2)).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_query_request_shape() {
        let vector = [0.1f32, 0.2];
        let request = QueryRequest {
            query_embeddings: [&vector[..]],
            n_results: 4,
            include: ["documents", "metadatas", "distances"],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["n_results"], 4);
        assert_eq!(json["query_embeddings"][0].as_array().unwrap().len(), 2);
    }
}

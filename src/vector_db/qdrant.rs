// Qdrant similarity search bound to one collection
use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        value::Kind, with_payload_selector::SelectorOptions, SearchPoints, Value as QdrantValue,
        WithPayloadSelector,
    },
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cancel::CallContext;
use crate::errors::{Result, RetrievalError};
use crate::vector_db::backend::{QdrantParams, SimilaritySearch};
use crate::vector_db::hit::SearchHit;

/// Qdrant collection addressed by knowledge-base namespace
pub struct QdrantIndex {
    client: Arc<QdrantClient>,
    collection: String,
    content_key: String,
}

impl QdrantIndex {
    /// Connect and verify that the collection for `namespace` exists
    pub async fn connect(ctx: &CallContext, params: &QdrantParams, namespace: &str) -> Result<Self> {
        let client = QdrantClient::from_url(&params.url)
            .build()
            .map_err(|e| RetrievalError::Backend(format!("qdrant: failed to create client: {}", e)))?;

        let collections = ctx
            .run(async {
                client
                    .list_collections()
                    .await
                    .map_err(|e| RetrievalError::Backend(format!("qdrant: {}", e)))
            })
            .await?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == namespace);
        if !exists {
            return Err(RetrievalError::NotFound {
                kind: "qdrant collection",
                namespace: params.url.clone(),
                name: namespace.to_string(),
            });
        }

        Ok(Self {
            client: Arc::new(client),
            collection: namespace.to_string(),
            content_key: params.content_key.clone(),
        })
    }
}

/// Split a point payload into document text and hit attributes
pub fn hit_from_payload(
    payload: HashMap<String, QdrantValue>,
    score: f32,
    content_key: &str,
) -> SearchHit {
    let content = payload
        .get(content_key)
        .and_then(qdrant_value_to_string)
        .unwrap_or_default();

    let metadata = payload
        .iter()
        .filter(|(key, _)| key.as_str() != content_key)
        .filter_map(|(key, value)| qdrant_to_json_value(value).map(|v| (key.clone(), v)));

    SearchHit::from_json_metadata(content, score, metadata)
}

#[async_trait]
impl SimilaritySearch for QdrantIndex {
    async fn similarity_search(
        &self,
        ctx: &CallContext,
        vector: &[f32],
        k: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<SearchHit>> {
        let request = SearchPoints {
            collection_name: self.collection.clone(),
            vector: vector.to_vec(),
            limit: k as u64,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(SelectorOptions::Enable(true)),
            }),
            score_threshold,
            ..Default::default()
        };

        let search_result = ctx
            .run(async {
                self.client
                    .search_points(&request)
                    .await
                    .map_err(|e| RetrievalError::Backend(format!("qdrant: failed to search points: {}", e)))
            })
            .await?;

        Ok(search_result
            .result
            .into_iter()
            .map(|point| hit_from_payload(point.payload, point.score, &self.content_key))
            .collect())
    }

    fn namespace(&self) -> &str {
        &self.collection
    }
}

fn qdrant_to_json_value(value: &QdrantValue) -> Option<JsonValue> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(JsonValue::String(s.clone())),
        Kind::IntegerValue(i) => Some(JsonValue::Number((*i).into())),
        Kind::DoubleValue(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number),
        Kind::BoolValue(b) => Some(JsonValue::Bool(*b)),
        Kind::NullValue(_) => Some(JsonValue::Null),
        Kind::ListValue(list) => Some(JsonValue::Array(
            list.values.iter().filter_map(qdrant_to_json_value).collect(),
        )),
        Kind::StructValue(st) => Some(JsonValue::Object(
            st.fields
                .iter()
                .filter_map(|(k, v)| qdrant_to_json_value(v).map(|v| (k.clone(), v)))
                .collect(),
        )),
    })
}

fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    })
}

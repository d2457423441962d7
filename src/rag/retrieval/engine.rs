// Knowledge-base retriever: search with resolved, immutable parameters
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::cancel::CallContext;
use crate::errors::Result;
use crate::knowledge::TypedObjectReference;
use crate::rag::node::{NodeArgs, NodeValue, PipelineNode, RETRIEVER_ARG_KEY};
use crate::vector_db::{SearchHit, VectorStoreClient};

/// Resolved retrieval configuration of one knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseBinding {
    /// `namespace/name` of the knowledge base
    pub knowledge_base: String,
    pub embedder: TypedObjectReference,
    pub vector_store: TypedObjectReference,
    /// Collection addressed in the vector index
    pub index_namespace: String,
    /// Number of hits requested per search
    pub num_documents: usize,
    pub score_threshold: f32,
}

/// Searches one knowledge base
#[derive(Debug, Clone)]
pub struct Retriever {
    binding: Arc<KnowledgeBaseBinding>,
    client: VectorStoreClient,
    doc_null_return: String,
}

impl Retriever {
    pub fn new(
        binding: KnowledgeBaseBinding,
        client: VectorStoreClient,
        doc_null_return: impl Into<String>,
    ) -> Self {
        Self {
            binding: Arc::new(binding),
            client,
            doc_null_return: doc_null_return.into(),
        }
    }

    /// Ranked hits for `query`, in backend order
    pub async fn search(&self, ctx: &CallContext, query: &str) -> Result<Vec<SearchHit>> {
        let hits = ctx
            .run(self.client.search(
                ctx,
                query,
                self.binding.num_documents,
                Some(self.binding.score_threshold),
            ))
            .await?;
        debug!(
            knowledge_base = %self.binding.knowledge_base,
            hits = hits.len(),
            "knowledge base search finished"
        );
        Ok(hits)
    }

    pub fn binding(&self) -> &KnowledgeBaseBinding {
        &self.binding
    }

    /// Answer substituted when no related document is found
    pub fn doc_null_return(&self) -> &str {
        &self.doc_null_return
    }
}

#[async_trait]
impl PipelineNode for Retriever {
    async fn run(&self, _ctx: &CallContext, mut args: NodeArgs) -> Result<NodeArgs> {
        args.insert(
            RETRIEVER_ARG_KEY.to_string(),
            NodeValue::Retriever(self.clone()),
        );
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::vector_db::SimilaritySearch;
    use std::sync::Mutex;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed_query(&self, _ctx: &CallContext, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32])
        }

        fn model(&self) -> &str {
            "fixed"
        }
    }

    #[derive(Default)]
    struct RecordingIndex {
        calls: Mutex<Vec<(Vec<f32>, usize, Option<f32>)>>,
    }

    #[async_trait]
    impl SimilaritySearch for RecordingIndex {
        async fn similarity_search(
            &self,
            _ctx: &CallContext,
            vector: &[f32],
            k: usize,
            score_threshold: Option<f32>,
        ) -> Result<Vec<SearchHit>> {
            self.calls
                .lock()
                .unwrap()
                .push((vector.to_vec(), k, score_threshold));
            Ok(vec![SearchHit::new("b", 0.2), SearchHit::new("a", 0.9)])
        }

        fn namespace(&self) -> &str {
            "arcadia_hr-docs"
        }
    }

    fn binding() -> KnowledgeBaseBinding {
        KnowledgeBaseBinding {
            knowledge_base: "arcadia/hr-docs".to_string(),
            embedder: TypedObjectReference::new("Embedder", "bge"),
            vector_store: TypedObjectReference::new("VectorStore", "chroma"),
            index_namespace: "arcadia_hr-docs".to_string(),
            num_documents: 4,
            score_threshold: 0.3,
        }
    }

    fn retriever(index: Arc<RecordingIndex>) -> Retriever {
        let client = VectorStoreClient::new(Arc::new(FixedEmbedder), index);
        Retriever::new(binding(), client, "no docs")
    }

    #[tokio::test]
    async fn test_search_passes_stored_parameters() {
        let index = Arc::new(RecordingIndex::default());
        let r = retriever(index.clone());

        let hits = r.search(&CallContext::new(), "hello").await.unwrap();

        // backend order is kept, even when not sorted by score
        assert_eq!(hits[0].content, "b");
        assert_eq!(hits[1].content, "a");

        let calls = index.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (vec![5.0], 4, Some(0.3)));
    }

    #[tokio::test]
    async fn test_run_injects_retriever_only() {
        let r = retriever(Arc::new(RecordingIndex::default()));
        let mut args = NodeArgs::new();
        args.insert("question".to_string(), NodeValue::Text("hi".to_string()));

        let out = r.run(&CallContext::new(), args).await.unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out["question"].as_text(), Some("hi"));
        let injected = out[RETRIEVER_ARG_KEY].as_retriever().unwrap();
        assert_eq!(injected.doc_null_return(), "no docs");
        assert_eq!(injected.binding(), r.binding());
    }

    #[tokio::test]
    async fn test_search_cancelled() {
        let index = Arc::new(RecordingIndex::default());
        let r = retriever(index.clone());
        let ctx = CallContext::new();
        ctx.cancel();

        let res = r.search(&ctx, "hello").await;
        assert!(matches!(res, Err(crate::errors::RetrievalError::Cancelled)));
        assert!(index.calls.lock().unwrap().is_empty());
    }
}

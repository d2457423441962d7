// Integration seam with a larger node-graph pipeline
use async_trait::async_trait;
use std::collections::HashMap;

use crate::cancel::CallContext;
use crate::errors::Result;
use crate::rag::retrieval::Retriever;

/// Key under which a retriever node publishes itself
pub const RETRIEVER_ARG_KEY: &str = "retriever";

/// Value carried in a node argument bag
#[derive(Debug, Clone)]
pub enum NodeValue {
    Text(String),
    Json(serde_json::Value),
    Retriever(Retriever),
}

impl NodeValue {
    pub fn as_retriever(&self) -> Option<&Retriever> {
        match self {
            NodeValue::Retriever(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            NodeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Argument bag passed between pipeline nodes
pub type NodeArgs = HashMap<String, NodeValue>;

/// A node in an application pipeline
#[async_trait]
pub trait PipelineNode: Send + Sync {
    async fn run(&self, ctx: &CallContext, args: NodeArgs) -> Result<NodeArgs>;
}

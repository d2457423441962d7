// End-to-end grounded answering: search -> join -> complete -> fallback
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cancel::CallContext;
use crate::completion::{ChainValues, CompletionChain};
use crate::errors::{Result, ResultExt, RetrievalError};
use crate::rag::chain::GroundedAnswerChain;
use crate::rag::context::{ContextAssembler, Reference};
use crate::rag::retrieval::Retriever;

/// Input variable carrying the user question
pub const QUESTION_KEY: &str = "question";

/// Answer returned to the caller with its citations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundedAnswer {
    pub answer: String,
    pub references: Vec<Reference>,
    /// True when no grounding text was found and the fallback was returned
    pub doc_null_applied: bool,
}

/// Retriever plus grounded answer chain
pub struct AnswerPipeline {
    retriever: Retriever,
    chain: GroundedAnswerChain,
}

impl AnswerPipeline {
    pub fn new(
        retriever: Retriever,
        base: Arc<dyn CompletionChain>,
        separator: impl Into<String>,
    ) -> Self {
        let chain = GroundedAnswerChain::new(
            base,
            ContextAssembler::new(separator),
            retriever.doc_null_return(),
        );
        Self { retriever, chain }
    }

    /// Replace the chain, e.g. to change its document variable
    pub fn with_chain(mut self, chain: GroundedAnswerChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub async fn answer(&self, ctx: &CallContext, question: &str) -> Result<GroundedAnswer> {
        let kb = &self.retriever.binding().knowledge_base;
        let hits = self
            .retriever
            .search(ctx, question)
            .await
            .with_context(|| format!("knowledge base {}: search", kb))?;

        let inputs = ChainValues::from([(QUESTION_KEY.to_string(), question.to_string())]);
        let outcome = self
            .chain
            .call(ctx, inputs, &hits)
            .await
            .with_context(|| format!("knowledge base {}: answer chain", kb))?;

        let answer = outcome
            .outputs
            .get(self.chain.output_key())
            .cloned()
            .ok_or_else(|| {
                RetrievalError::Backend(format!(
                    "completion output missing key {}",
                    self.chain.output_key()
                ))
            })?;

        Ok(GroundedAnswer {
            answer,
            references: outcome.references,
            doc_null_applied: outcome.doc_null_applied,
        })
    }
}

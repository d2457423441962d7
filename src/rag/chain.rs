// Grounded answer chain: assemble context, run the completion step, then
// apply the empty-result fallback.
use std::sync::Arc;
use tracing::warn;

use crate::cancel::CallContext;
use crate::completion::{ChainValues, CompletionChain};
use crate::errors::Result;
use crate::rag::context::{ContextAssembler, Reference};
use crate::vector_db::SearchHit;

/// Input variable receiving the joined documents
pub const DEFAULT_DOCUMENT_VARIABLE: &str = "context";

/// Result of one chain call
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome {
    pub outputs: ChainValues,
    pub references: Vec<Reference>,
    /// Whether the output was replaced by the fallback string
    pub doc_null_applied: bool,
}

/// Overwrite `output_key` with `doc_null_return` when the context was empty.
/// Returns whether the overwrite happened.
pub fn apply_fallback(
    outputs: &mut ChainValues,
    output_key: &str,
    is_empty: bool,
    doc_null_return: &str,
) -> bool {
    if !is_empty {
        return false;
    }
    warn!(
        raw_output = outputs.get(output_key).map(String::as_str).unwrap_or_default(),
        fallback = doc_null_return,
        "no related document found, replacing chain output"
    );
    outputs.insert(output_key.to_string(), doc_null_return.to_string());
    true
}

/// A base completion chain composed with a context assembler
pub struct GroundedAnswerChain {
    base: Arc<dyn CompletionChain>,
    assembler: ContextAssembler,
    document_variable: String,
    doc_null_return: String,
}

impl GroundedAnswerChain {
    pub fn new(
        base: Arc<dyn CompletionChain>,
        assembler: ContextAssembler,
        doc_null_return: impl Into<String>,
    ) -> Self {
        Self {
            base,
            assembler,
            document_variable: DEFAULT_DOCUMENT_VARIABLE.to_string(),
            doc_null_return: doc_null_return.into(),
        }
    }

    pub fn with_document_variable(mut self, name: impl Into<String>) -> Self {
        self.document_variable = name.into();
        self
    }

    pub fn output_key(&self) -> &str {
        self.base.output_key()
    }

    /// Join `hits` into the document variable and run the base chain. The
    /// base chain runs even for empty context; only its answer is replaced.
    pub async fn call(
        &self,
        ctx: &CallContext,
        inputs: ChainValues,
        hits: &[SearchHit],
    ) -> Result<ChainOutcome> {
        ctx.check()?;
        let assembled = self.assembler.join(hits);

        let mut values = inputs;
        values.insert(self.document_variable.clone(), assembled.text);

        let mut outputs = self.base.run(ctx, values).await?;
        let doc_null_applied = apply_fallback(
            &mut outputs,
            self.base.output_key(),
            assembled.is_empty,
            &self.doc_null_return,
        );

        Ok(ChainOutcome {
            outputs,
            references: assembled.references,
            doc_null_applied,
        })
    }
}

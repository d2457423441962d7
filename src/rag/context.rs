// Context assembly: ranked hits into one prompt-ready text plus citations
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::vector_db::SearchHit;

/// One citation, positionally matching the hit that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// Question row (the hit's raw content)
    pub question: String,
    /// Answer row
    pub answer: String,
    /// Vector search score
    pub score: f32,
    /// Source file path
    pub file_path: String,
    /// Line number in the source file, 0 when unknown
    pub line_number: i64,
}

/// Joined context for a single retrieval
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    pub text: String,
    /// Always one entry per input hit, in input order
    pub references: Vec<Reference>,
    /// True iff `text` is empty; says nothing about `references`
    pub is_empty: bool,
}

/// Joins hits with a caller-supplied separator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextAssembler {
    separator: String,
}

impl ContextAssembler {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Join hits into text and references. Never fails: malformed
    /// attributes degrade to empty strings and zero.
    pub fn join(&self, hits: &[SearchHit]) -> AssembledContext {
        let mut text = String::new();
        let mut references = Vec::with_capacity(hits.len());
        let last = hits.len().saturating_sub(1);

        for (i, hit) in hits.iter().enumerate() {
            debug!(
                index = i,
                score = hit.score,
                content = %hit.content,
                "related doc"
            );
            for (key, raw) in &hit.attributes {
                debug!(index = i, key = %key, value = %String::from_utf8_lossy(raw), "related doc metadata");
            }

            let attrs = hit.decode_attributes();

            text.push_str(&hit.content);
            if let Some(answer) = &attrs.answer {
                text.push_str("\na: ");
                text.push_str(answer);
            }
            if i != last {
                text.push_str(&self.separator);
            }

            references.push(Reference {
                question: hit.content.clone(),
                answer: attrs.answer.unwrap_or_default(),
                score: hit.score,
                file_path: attrs.file_path.unwrap_or_default(),
                line_number: attrs.line_number.unwrap_or(0),
            });
        }

        debug!(text = %text, "joined related text");
        let is_empty = text.is_empty();
        AssembledContext {
            text,
            references,
            is_empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_db::hit::{ANSWER_KEY, FILE_NAME_KEY, LINE_NUMBER_KEY};

    const SEP: &str = "\n---\n";

    #[test]
    fn test_join_empty() {
        let ctx = ContextAssembler::new(SEP).join(&[]);
        assert_eq!(ctx.text, "");
        assert!(ctx.references.is_empty());
        assert!(ctx.is_empty);
    }

    #[test]
    fn test_join_qa_pairs() {
        let hits = vec![
            SearchHit::new("Q1", 0.9).with_attribute(ANSWER_KEY, "\"A1\""),
            SearchHit::new("Q2", 0.8),
        ];
        let ctx = ContextAssembler::new(SEP).join(&hits);

        assert_eq!(ctx.text, "Q1\na: A1\n---\nQ2");
        assert!(!ctx.is_empty);
        assert_eq!(ctx.references.len(), 2);
        assert_eq!(ctx.references[0].answer, "A1");
        assert_eq!(ctx.references[1].answer, "");
    }

    #[test]
    fn test_no_trailing_separator() {
        let hits = vec![SearchHit::new("only", 0.5)];
        let ctx = ContextAssembler::new(SEP).join(&hits);
        assert_eq!(ctx.text, "only");
    }

    #[test]
    fn test_reference_fields() {
        let hits = vec![SearchHit::new("q: minimum unit of absence?", 0.34)
            .with_attribute(ANSWER_KEY, "\"0.5 days\"")
            .with_attribute(FILE_NAME_KEY, "\"dataset/playground/v1/qa.csv\"")
            .with_attribute(LINE_NUMBER_KEY, "7")];
        let ctx = ContextAssembler::new(SEP).join(&hits);

        assert_eq!(
            ctx.references[0],
            Reference {
                question: "q: minimum unit of absence?".to_string(),
                answer: "0.5 days".to_string(),
                score: 0.34,
                file_path: "dataset/playground/v1/qa.csv".to_string(),
                line_number: 7,
            }
        );
    }

    #[test]
    fn test_bad_line_number_is_zero() {
        let hits = vec![SearchHit::new("q", 0.1).with_attribute(LINE_NUMBER_KEY, "abc")];
        let ctx = ContextAssembler::new(SEP).join(&hits);
        assert_eq!(ctx.references[0].line_number, 0);
    }

    #[test]
    fn test_empty_hits_still_yield_references() {
        let hits = vec![SearchHit::new("", 0.2), SearchHit::new("", 0.1)];
        let ctx = ContextAssembler::new("").join(&hits);

        assert_eq!(ctx.references.len(), 2);
        assert!(ctx.is_empty);
        assert_eq!(ctx.references[0].question, "");
        assert_eq!(ctx.references[0].file_path, "");
    }

    #[test]
    fn test_separator_alone_is_not_empty() {
        // two empty hits with a non-empty separator still produce text
        let hits = vec![SearchHit::new("", 0.2), SearchHit::new("", 0.1)];
        let ctx = ContextAssembler::new(SEP).join(&hits);
        assert_eq!(ctx.text, SEP);
        assert!(!ctx.is_empty);
    }

    #[test]
    fn test_answer_only_hit() {
        let hits = vec![SearchHit::new("", 0.2).with_attribute(ANSWER_KEY, "\"A\"")];
        let ctx = ContextAssembler::new(SEP).join(&hits);
        assert_eq!(ctx.text, "\na: A");
        assert!(!ctx.is_empty);
    }

    #[test]
    fn test_equal_scores_keep_input_order() {
        let hits = vec![
            SearchHit::new("first", 0.5),
            SearchHit::new("second", 0.5),
            SearchHit::new("first", 0.5),
        ];
        let ctx = ContextAssembler::new(" | ").join(&hits);
        let questions: Vec<_> = ctx.references.iter().map(|r| r.question.as_str()).collect();
        assert_eq!(questions, vec!["first", "second", "first"]);
        assert_eq!(ctx.text, "first | second | first");
    }

    #[test]
    fn test_reference_json_names() {
        let reference = Reference {
            question: "q".to_string(),
            answer: "a".to_string(),
            score: 0.5,
            file_path: "f.csv".to_string(),
            line_number: 3,
        };
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["file_path"], "f.csv");
        assert_eq!(json["line_number"], 3);
    }

    #[quickcheck_macros::quickcheck]
    fn prop_one_reference_per_hit(hits: Vec<(String, Vec<u8>, f32)>, separator: String) -> bool {
        let hits: Vec<SearchHit> = hits
            .into_iter()
            .map(|(content, answer, score)| {
                SearchHit::new(content, score).with_attribute(ANSWER_KEY, answer)
            })
            .collect();

        let ctx = ContextAssembler::new(separator.clone()).join(&hits);

        let nothing_to_join = hits
            .iter()
            .all(|h| h.content.is_empty() && h.raw_attribute(ANSWER_KEY).is_empty())
            && (hits.len() <= 1 || separator.is_empty());

        ctx.references.len() == hits.len()
            && ctx.is_empty == ctx.text.is_empty()
            && ctx.is_empty == nothing_to_join
            && hits
                .iter()
                .zip(&ctx.references)
                .all(|(h, r)| r.question == h.content)
    }
}

//! Human-readable output for the `search` and `ask` subcommands

use colored::Colorize;

use crate::rag::GroundedAnswer;
use crate::vector_db::SearchHit;

fn location(file_path: &str, line_number: i64) -> String {
    match (file_path.is_empty(), line_number) {
        (true, _) => String::new(),
        (false, 0) => file_path.to_string(),
        (false, n) => format!("{}:{}", file_path, n),
    }
}

/// Ranked hits, one block per hit
pub fn render_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("{}\n", "No documents found".yellow());
    }

    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        let attrs = hit.decode_attributes();
        out.push_str(&format!(
            "{} {}\n",
            format!("[{}]", i + 1).cyan().bold(),
            format!("score {:.3}", hit.score).dimmed()
        ));
        out.push_str(&format!("  {}\n", hit.content));
        if let Some(answer) = &attrs.answer {
            out.push_str(&format!("  {} {}\n", "a:".green(), answer));
        }
        let loc = location(
            attrs.file_path.as_deref().unwrap_or_default(),
            attrs.line_number.unwrap_or(0),
        );
        if !loc.is_empty() {
            out.push_str(&format!("  {}\n", loc.dimmed()));
        }
    }
    out
}

/// Answer followed by its references
pub fn render_answer(answer: &GroundedAnswer) -> String {
    let mut out = format!("{}\n", answer.answer.bold());
    if answer.doc_null_applied {
        out.push_str(&format!("{}\n", "(no related document found)".yellow()));
    }
    if answer.references.is_empty() {
        return out;
    }

    out.push_str(&format!("\n{}\n", "References:".cyan().bold()));
    for (i, reference) in answer.references.iter().enumerate() {
        let loc = location(&reference.file_path, reference.line_number);
        out.push_str(&format!(
            "  {}. {} {}",
            i + 1,
            reference.question,
            format!("({:.3})", reference.score).dimmed()
        ));
        if !loc.is_empty() {
            out.push_str(&format!(" {}", loc.dimmed()));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::Reference;
    use crate::vector_db::hit::{ANSWER_KEY, FILE_NAME_KEY, LINE_NUMBER_KEY};

    #[test]
    fn test_location() {
        assert_eq!(location("", 7), "");
        assert_eq!(location("faq.csv", 0), "faq.csv");
        assert_eq!(location("faq.csv", 7), "faq.csv:7");
    }

    #[test]
    fn test_render_hits() {
        let hits = vec![SearchHit::new("How many days of leave?", 0.91)
            .with_attribute(ANSWER_KEY, "\"Twenty\"")
            .with_attribute(FILE_NAME_KEY, "\"hr/faq.csv\"")
            .with_attribute(LINE_NUMBER_KEY, "12")];

        let out = render_hits(&hits);
        assert!(out.contains("How many days of leave?"));
        assert!(out.contains("Twenty"));
        assert!(out.contains("hr/faq.csv:12"));
        assert!(out.contains("score 0.910"));
    }

    #[test]
    fn test_render_no_hits() {
        assert!(render_hits(&[]).contains("No documents found"));
    }

    #[test]
    fn test_render_answer_with_fallback() {
        let answer = GroundedAnswer {
            answer: "I don't know.".to_string(),
            references: vec![Reference {
                question: "".to_string(),
                answer: "".to_string(),
                score: 0.2,
                file_path: "".to_string(),
                line_number: 0,
            }],
            doc_null_applied: true,
        };

        let out = render_answer(&answer);
        assert!(out.contains("I don't know."));
        assert!(out.contains("no related document found"));
        assert!(out.contains("References:"));
    }
}

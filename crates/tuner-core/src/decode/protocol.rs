//! The two-section rewrite reply:
//!
//! ```text
//! EVALUATION:
//! { "passRate": 70, "improvements": [...], "issues": [...] }
//! OPTIMIZED_PROMPT:
//! <free text>
//! ```
//!
//! The evaluation object is parsed strictly; no repair is attempted.

use super::{Decoded, Rejection};
use crate::types::StepEvaluation;

pub const EVALUATION_MARKER: &str = "EVALUATION:";
pub const PROMPT_MARKER: &str = "OPTIMIZED_PROMPT:";

/// A decoded rewrite reply.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteReply {
    pub evaluation: StepEvaluation,
    pub prompt: String,
}

/// Decode a rewrite reply.
///
/// - `Parsed`: both markers present and the evaluation object is valid.
/// - `Repaired`: both markers present but no `{...}` block between them;
///   the prompt section is kept with a zeroed evaluation.
/// - `Rejected`: markers missing, or the evaluation object is malformed.
pub fn decode_rewrite(reply: &str) -> Decoded<RewriteReply> {
    let (Some(eval_at), Some(prompt_at)) = (reply.find(EVALUATION_MARKER), reply.find(PROMPT_MARKER))
    else {
        return Decoded::Rejected(Rejection::Missing(format!(
            "{} / {} markers",
            EVALUATION_MARKER, PROMPT_MARKER
        )));
    };

    // Markers in reverse order bound the section from the other side
    let eval_start = eval_at + EVALUATION_MARKER.len();
    let section = reply[eval_start.min(prompt_at)..eval_start.max(prompt_at)].trim();
    let prompt = reply[prompt_at + PROMPT_MARKER.len()..].trim().to_string();

    let Some(block) = object_block(section) else {
        return Decoded::Repaired(RewriteReply {
            evaluation: StepEvaluation::default(),
            prompt,
        });
    };

    match serde_json::from_str::<StepEvaluation>(block) {
        Ok(evaluation) => Decoded::Parsed(RewriteReply { evaluation, prompt }),
        Err(e) => Decoded::Rejected(Rejection::Malformed(e.to_string())),
    }
}

/// First `{` through last `}`.
fn object_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "EVALUATION:\n\
        {\n  \"passRate\": 95,\n  \"improvements\": [\"Asks for quantity\"],\n  \"issues\": []\n}\n\
        OPTIMIZED_PROMPT:\n  Ask for any missing order details, then confirm.  \n";

    #[test]
    fn test_decode_well_formed() {
        let decoded = decode_rewrite(WELL_FORMED);
        assert!(matches!(decoded, Decoded::Parsed(_)));

        let reply = decoded.ok().unwrap();
        assert_eq!(reply.evaluation.pass_rate, 95.0);
        assert_eq!(reply.evaluation.improvements, vec!["Asks for quantity"]);
        assert!(reply.evaluation.issues.is_empty());
        assert_eq!(reply.prompt, "Ask for any missing order details, then confirm.");
    }

    #[test]
    fn test_decode_with_preamble() {
        let reply = format!("Here is my analysis.\n\n{}", WELL_FORMED);
        let decoded = decode_rewrite(&reply).ok().unwrap();
        assert_eq!(decoded.evaluation.pass_rate, 95.0);
    }

    #[test]
    fn test_missing_markers() {
        let decoded = decode_rewrite("Just use this prompt instead.");
        assert!(matches!(decoded, Decoded::Rejected(Rejection::Missing(_))));

        let decoded = decode_rewrite("EVALUATION: {\"passRate\": 10}");
        assert!(decoded.is_rejected());
    }

    #[test]
    fn test_malformed_evaluation() {
        let decoded = decode_rewrite("EVALUATION:\n{passRate: high}\nOPTIMIZED_PROMPT:\nNew prompt");
        assert!(matches!(decoded, Decoded::Rejected(Rejection::Malformed(_))));
    }

    #[test]
    fn test_missing_evaluation_block() {
        let decoded = decode_rewrite("EVALUATION:\nlooks fine\nOPTIMIZED_PROMPT:\nNew prompt");
        assert!(decoded.is_repaired());

        let reply = decoded.ok().unwrap();
        assert_eq!(reply.evaluation, StepEvaluation::default());
        assert_eq!(reply.prompt, "New prompt");
    }

    #[test]
    fn test_partial_evaluation_fields_default() {
        let decoded = decode_rewrite("EVALUATION:\n{\"passRate\": 40}\nOPTIMIZED_PROMPT:\nP");
        let reply = decoded.ok().unwrap();
        assert_eq!(reply.evaluation.pass_rate, 40.0);
        assert!(reply.evaluation.improvements.is_empty());
    }

    #[test]
    fn test_decode_markers_in_reverse_order() {
        let decoded = decode_rewrite("OPTIMIZED_PROMPT:\n{\"passRate\": 70}\nEVALUATION:");
        assert!(matches!(decoded, Decoded::Parsed(_)));

        let reply = decoded.ok().unwrap();
        assert_eq!(reply.evaluation.pass_rate, 70.0);
        assert_eq!(reply.prompt, "{\"passRate\": 70}\nEVALUATION:");
    }
}

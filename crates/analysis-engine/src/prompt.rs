//! Prompt construction for the inference engine
//!
//! The system prompts pin the model to the Loi 96 assessment task and to
//! the exact JSON shapes the parser accepts. User content is embedded
//! only inside the prompt-guard data markers, followed by the
//! anti-injection trailer.

use prompt_guard::INJECTION_TRAILER;

/// Output token ceilings per request kind.
pub const DOCUMENT_MAX_OUTPUT_TOKENS: u32 = 4096;
pub const SIGNAGE_MAX_OUTPUT_TOKENS: u32 = 1024;

/// System prompt for document compliance analysis.
pub const DOCUMENT_SYSTEM_PROMPT: &str = "\
You are a compliance analyst specialized in Quebec's Loi 96 (Bill 96), the \
amendment to the Charter of the French Language governing commercial use of \
French in Quebec. You evaluate business documents for conformity: French must \
be markedly predominant, French terminology must be used for business, tax, \
and legal terms, contract clauses and legal mentions must be available in \
French, and French text must appear before or above other languages.

Analyze the document provided by the user and respond with a single JSON \
object and nothing else. The object must have exactly these fields:
- \"isCompliant\": boolean
- \"complianceScore\": number from 0 to 100
- \"detectedLanguage\": one of \"french\", \"english\", \"bilingual\", \"other\"
- \"frenchPercentage\": number from 0 to 100, the share of French content
- \"issues\": array of objects with \"type\" (one of \"language-predominance\", \
\"missing-french-term\", \"english-only\", \"french-not-first\", \
\"tax-terminology\", \"business-terminology\", \"contract-clause\", \
\"legal-mention\", \"button-label\", \"other\"), \"severity\" (\"HIGH\", \
\"MEDIUM\" or \"LOW\"), \"description\", and optional \"location\" and \
\"originalText\"
- \"suggestions\": array of objects with \"issueIndex\" (index into issues), \
\"originalText\", \"suggestedText\", \"explanation\"
- \"correctedText\": optional string with a fully corrected French version

Do not wrap the JSON in markdown fences or add commentary.";

/// System prompt for physical-signage analysis. Signage follows the
/// stricter predominance rule: French must occupy at least twice the
/// visual area of any other language in the same visual field.
pub const SIGNAGE_SYSTEM_PROMPT: &str = "\
You are a compliance analyst specialized in Quebec's Loi 96 rules for public \
signage and commercial advertising. For signage, French must be markedly \
predominant: French text must occupy at least twice the visual area of text \
in any other language within the same visual field, and French must be \
permanently visible and legible.

The user will describe a sign. Evaluate the described signage and respond \
with a single JSON object and nothing else, with exactly these fields:
- \"score\": integer from 0 to 100
- \"problems\": array of strings describing rule violations
- \"suggestions\": array of strings with concrete fixes
- \"correctedDescription\": string describing a compliant version of the sign

Do not wrap the JSON in markdown fences or add commentary.";

/// Build the per-request user message for a document analysis.
pub fn build_document_message(document_name: &str, wrapped_content: &str) -> String {
    format!(
        "Document name: {document_name}\n\n\
         Document content to analyze:\n{wrapped_content}\n\n\
         {INJECTION_TRAILER}"
    )
}

/// Build the per-request user message for a signage analysis.
pub fn build_signage_message(wrapped_description: &str) -> String {
    format!(
        "Signage description to analyze:\n{wrapped_description}\n\n\
         {INJECTION_TRAILER}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompt_guard::{wrap, CONTENT_BEGIN, CONTENT_END};

    #[test]
    fn test_document_message_contains_markers_and_trailer() {
        let message = build_document_message("Contrat", &wrap("le contenu"));
        assert!(message.contains(CONTENT_BEGIN));
        assert!(message.contains(CONTENT_END));
        assert!(message.contains("le contenu"));
        assert!(message.ends_with(INJECTION_TRAILER));
    }

    #[test]
    fn test_system_prompts_pin_the_wire_contract() {
        assert!(DOCUMENT_SYSTEM_PROMPT.contains("\"isCompliant\""));
        assert!(DOCUMENT_SYSTEM_PROMPT.contains("\"french\""));
        assert!(DOCUMENT_SYSTEM_PROMPT.contains("\"HIGH\""));
        assert!(SIGNAGE_SYSTEM_PROMPT.contains("\"correctedDescription\""));
    }
}

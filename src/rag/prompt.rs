use super::types::QueryResult;

pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const PREAMBLE: &str = "You are a helpful AI assistant. Answer questions using ONLY the information in the context below.

IMPORTANT INSTRUCTIONS:
- Read the entire context carefully
- If the answer exists in the context, provide it clearly
- If you're not sure or the context doesn't contain the answer, say \"I don't have that information\"
- Be concise and direct";

/// Retrieved documents in rank order, separated so the model can tell
/// where one excerpt ends.
pub fn build_context(results: &[QueryResult]) -> String {
    results
        .iter()
        .map(|result| result.document.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

pub fn build_prompt(query: &str, results: &[QueryResult]) -> String {
    format!(
        "{PREAMBLE}\n\nCONTEXT:\n{}\n\nQUESTION: {}\n\nANSWER:",
        build_context(results),
        query
    )
}

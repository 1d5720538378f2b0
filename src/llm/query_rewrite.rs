/// Build the prompt asking the LLM to turn the latest user turn into a
/// standalone search query for the listing index.
pub fn build_rewrite_prompt(transcript: &str, current_message: &str) -> String {
    format!(
        "Rewrite the final user message into a clean, standalone search query \
         for retrieving property listings from a vector database. Resolve references \
         to earlier turns (locations, property types, bedrooms, budget).\n\n\
         Conversation so far:\n{transcript}\n\n\
         Final user message: {current_message}\n\n\
         Write ONLY the rewritten query, nothing else:"
    )
}

/// Extract the query from a rewrite completion. Models often wrap the answer
/// in quotes, code fences or a "Query:" label; those are stripped. Returns
/// `None` when nothing usable is left.
pub fn clean_rewritten_query(content: &str) -> Option<String> {
    let line = content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("```"))?;

    let mut query = line;
    for label in ["rewritten query:", "search query:", "query:"] {
        if query.len() >= label.len()
            && query.is_char_boundary(label.len())
            && query[..label.len()].eq_ignore_ascii_case(label)
        {
            query = query[label.len()..].trim_start();
            break;
        }
    }

    let query = query
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim();

    if query.is_empty() {
        tracing::warn!("Query rewrite produced no usable text. Raw: {content}");
        None
    } else {
        Some(query.to_string())
    }
}

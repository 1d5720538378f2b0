use std::fmt::Write;

/// Chat-template control tokens that must never reach a prompt verbatim.
const CONTROL_TOKENS: &[&str] = &[
    "<|im_start|>",
    "<|im_end|>",
    "<|endoftext|>",
    "<|system|>",
    "<|user|>",
    "<|assistant|>",
    "[INST]",
    "[/INST]",
    "<<SYS>>",
    "<</SYS>>",
];

/// Strip chat-template control tokens from user- or document-supplied text.
pub fn sanitize_for_prompt(text: &str) -> String {
    let mut out = text.to_string();
    for token in CONTROL_TOKENS {
        if out.contains(token) {
            out = out.replace(token, "");
        }
    }
    out
}

/// Truncate to at most `max_len` bytes without splitting a character.
pub fn truncate_to_char_boundary(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

fn build_system_prompt() -> &'static str {
    "You are an intelligent property assistant for a real-estate listing platform.\n\
     Use the retrieved listings to answer the user accurately, with reasoning and a \
     conversational tone.\n\
     If context is provided:\n\
     - Cite listing details (location, price, area, beds, baths) in simple language\n\
     - Give comparisons, nearby areas and estimation logic\n\
     If context is unavailable:\n\
     - Use general real-estate knowledge\n\
     - Stay helpful without inventing specific listings or prices"
}

/// Render the gated context block. `None` means retrieval was not confident
/// enough and the model must fall back to general knowledge.
pub fn build_context_block(documents: Option<&[String]>) -> String {
    let mut ctx = String::from("CONTEXT:\n");
    match documents {
        Some(docs) if !docs.is_empty() => {
            for (i, doc) in docs.iter().enumerate() {
                let _ = write!(ctx, "--- Listing {} ---\n{}\n\n", i + 1, sanitize_for_prompt(doc));
            }
        }
        _ => {
            ctx.push_str(
                "(Retrieved listing context is unavailable for this question. \
                 Answer from general real-estate knowledge.)\n\n",
            );
        }
    }
    ctx
}

/// Final answer prompt: behaviour rules, gated context, transcript, current message.
pub fn build_answer_prompt(
    transcript: &str,
    documents: Option<&[String]>,
    current_message: &str,
) -> String {
    format!(
        "{}\n\n{}CONVERSATION:\n{transcript}\n\nUSER:\n{current_message}\n\nASSISTANT:\n",
        build_system_prompt(),
        build_context_block(documents),
    )
}

//! Query/passage text normalization.
//!
//! The corpus itself ships pre-normalized; this is only applied to incoming
//! queries before rerank prompts and lexical matching.

/// Lowercase, strip everything but letters/digits/whitespace, collapse runs
/// of whitespace. Arabic letters are kept as-is (they have no simple
/// lowercase mapping and the downstream models expect them untouched).
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_space = true;
    for c in lowered.chars() {
        if c.is_alphanumeric() {
            out.push(c);
            last_was_space = false;
        } else if c.is_whitespace() && !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

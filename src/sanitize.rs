//! Structural cleanup of raw model completions.
//!
//! Chat models routinely wrap a translation in quotes or lead with a
//! conversational preamble despite being told not to. Sanitization strips
//! that packaging and nothing else; it never rewrites the translation
//! itself.

/// Known preamble phrases, longest first so the most specific match wins.
const PREAMBLES: &[&str] = &[
    "here is the english translation:",
    "here is the translation:",
    "english translation:",
    "translated text:",
    "the translation is:",
    "translation:",
    "english:",
];

/// Matching quote pairs that may wrap the full completion.
const QUOTE_PAIRS: &[(char, char)] = &[('"', '"'), ('“', '”')];

/// Clean a raw model completion into the final user-visible translation.
///
/// Trims, unwraps full-length wrapping quote pairs, then removes the first
/// matching preamble phrase (case-insensitive, remainder casing preserved).
/// Quote unwrapping runs to a fixed point on both sides of the preamble
/// strip so that nested or mixed quoting cannot survive one pass and shrink
/// on the next; the whole function is idempotent.
pub fn sanitize(raw: &str) -> String {
    let mut text = raw.trim();

    text = strip_quote_layers(text);
    text = strip_preamble(text).trim();
    text = strip_quote_layers(text);

    text.to_string()
}

fn strip_quote_layers(mut text: &str) -> &str {
    loop {
        let stripped = strip_wrapping_quotes(text).trim();
        if stripped.len() == text.len() {
            return text;
        }
        text = stripped;
    }
}

fn strip_wrapping_quotes(text: &str) -> &str {
    for &(open, close) in QUOTE_PAIRS {
        if text.len() >= open.len_utf8() + close.len_utf8()
            && text.starts_with(open)
            && text.ends_with(close)
        {
            return &text[open.len_utf8()..text.len() - close.len_utf8()];
        }
    }
    text
}

fn strip_preamble(text: &str) -> &str {
    for prefix in PREAMBLES {
        if let Some(head) = text.get(..prefix.len()) {
            if head.eq_ignore_ascii_case(prefix) {
                return &text[prefix.len()..];
            }
        }
    }
    text
}

//! Heuristic language gate deciding whether a translation call is worthwhile.
//!
//! A pure, dependency-free classifier over a defined Unicode range table so
//! it can be tested exhaustively without any network access. The goal is to
//! avoid spending a paid model call on noise, numeric strings, or clearly
//! non-Vietnamese input, while still accepting unaccented Vietnamese (common
//! when users type without diacritics).

/// Minimum letters (ASCII or accented) for input to count as text at all.
const MIN_LETTERS: usize = 2;

/// Minimum plain ASCII letters for unaccented input to pass the gate.
const MIN_PLAIN_LETTERS: usize = 4;

/// Extra Vietnamese letters outside the precomposed accented vowel ranges.
const VIETNAMESE_BASE_LETTERS: &str = "ăâêôơưđĂÂÊÔƠƯĐ";

/// Whether a character falls in the Vietnamese accented letter set:
/// the precomposed ranges à–ỵ / À–Ỵ plus the bare modified letters.
pub fn is_vietnamese_letter(c: char) -> bool {
    ('à'..='ỵ').contains(&c)
        || ('À'..='Ỵ').contains(&c)
        || VIETNAMESE_BASE_LETTERS.contains(c)
}

fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || is_vietnamese_letter(c)
}

/// Count of characters that survive stripping everything except Latin
/// letters (including the Vietnamese diacritic ranges).
pub fn letter_count(text: &str) -> usize {
    text.chars().filter(|&c| is_letter(c)).count()
}

/// Decide whether `text` is a plausible translation candidate.
///
/// Ordered checks, first match wins:
/// 1. trimmed-empty input is rejected;
/// 2. fewer than two letters after stripping is treated as noise
///    (emoji-only or punctuation-only input);
/// 3. any Vietnamese diacritic is the strongest positive signal;
/// 4. otherwise require at least four plain letters and no more digits
///    than letters, which keeps unaccented Vietnamese in play.
pub fn classify(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }

    if letter_count(text) < MIN_LETTERS {
        return false;
    }

    if text.chars().any(is_vietnamese_letter) {
        return true;
    }

    let plain_letters = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
    let digits = text.chars().filter(|c| c.is_ascii_digit()).count();

    plain_letters >= MIN_PLAIN_LETTERS && digits <= plain_letters
}

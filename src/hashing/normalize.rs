//! Comment text normalization (the input to [`super::digest_text`]).

/// Normalizes comment text before hashing.
///
/// Lowercases, folds Turkish letters to ASCII, replaces anything that is not a word
/// character with a space, and collapses whitespace. The function is idempotent:
/// `normalize_text(&normalize_text(t)) == normalize_text(t)`.
pub fn normalize_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    // `İ` lowercases to `i` + U+0307 (combining dot above).
    let lowered = trimmed.to_lowercase().replace("i\u{307}", "i");

    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;

    for ch in lowered.chars().map(fold_char) {
        if is_word_char(ch) {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }

    out
}

#[inline]
fn fold_char(ch: char) -> char {
    match ch {
        'ç' => 'c',
        'ğ' => 'g',
        'ı' => 'i',
        'ö' => 'o',
        'ş' => 's',
        'ü' => 'u',
        other => other,
    }
}

#[inline]
fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

//! URL slugs derived from titles.

use deunicode::deunicode_char;

/// Symbols that read as a word rather than being dropped.
fn symbol_word(ch: char) -> Option<&'static str> {
    let word = match ch {
        '&' => "and",
        '|' => "or",
        '<' => "less",
        '>' => "greater",
        '$' => "dollar",
        '%' => "percent",
        '¢' => "cent",
        '£' => "pound",
        '€' => "euro",
        '¥' => "yen",
        '♥' => "love",
        '∞' => "infinity",
        _ => return None,
    };
    Some(word)
}

/// Derive a slug. Letters are transliterated to ASCII (`é` → `e`, `ß` →
/// `ss`) and a few symbols become words (`&` → `and`). ASCII letters and
/// digits are kept lowercased, runs of whitespace and `-` collapse into
/// one `-`, everything else (including `_`) is dropped. The result never
/// starts or ends with `-`, and may be empty.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for ch in title.chars() {
        let mut buf = [0u8; 4];
        let piece: &str = match symbol_word(ch) {
            Some(word) => word,
            None if ch.is_ascii() => ch.encode_utf8(&mut buf),
            None => deunicode_char(ch).unwrap_or(""),
        };

        for c in piece.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_separator && !slug.is_empty() {
                    slug.push('-');
                }
                pending_separator = false;
                slug.push(c.to_ascii_lowercase());
            } else if c.is_whitespace() || c == '-' {
                pending_separator = true;
            }
        }
    }

    slug
}

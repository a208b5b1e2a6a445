use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

const LIGATURES: [(char, &str); 7] = [
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

/// NFC, expanded ligatures, no replacement or NUL characters.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.nfc() {
        match ch {
            '\u{FFFD}' | '\0' => {}
            _ => match LIGATURES.iter().find(|(lig, _)| *lig == ch) {
                Some((_, expanded)) => out.push_str(expanded),
                None => out.push(ch),
            },
        }
    }
    out
}

/// Clean a single span's text. Inner whitespace runs collapse to one space.
pub fn clean_span_text(text: &str) -> String {
    normalize(text).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean reconstructed page text, keeping its line structure.
///
/// Words hyphenated across a line break are rejoined.
pub fn clean_page_text(text: &str) -> String {
    static RE_HYPHEN: OnceLock<Regex> = OnceLock::new();
    static RE_SPACES: OnceLock<Regex> = OnceLock::new();

    let re_hyphen =
        RE_HYPHEN.get_or_init(|| Regex::new(r"(\p{Alphabetic})-[ \t]*\n[ \t]*(\p{Lowercase})").unwrap());
    let re_spaces = RE_SPACES.get_or_init(|| Regex::new(r"[ \t]+").unwrap());

    let text = normalize(text);
    let text = re_hyphen.replace_all(&text, "$1$2");
    let text = re_spaces.replace_all(&text, " ");

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_passthrough() {
        assert_eq!(clean_span_text("Hello world."), "Hello world.");
    }

    #[test]
    fn test_span_ligatures() {
        assert_eq!(clean_span_text("\u{FB01}nd a\u{FB04}e"), "find affle");
    }

    #[test]
    fn test_span_whitespace_collapsed_and_trimmed() {
        assert_eq!(clean_span_text("  a \t  b\n c "), "a b c");
    }

    #[test]
    fn test_span_nfc() {
        assert_eq!(clean_span_text("cafe\u{0301}"), "caf\u{00E9}");
    }

    #[test]
    fn test_replacement_and_nul_removed() {
        assert_eq!(clean_span_text("Hel\u{FFFD}lo\0"), "Hello");
    }

    #[test]
    fn test_page_hyphenation_rejoined() {
        assert_eq!(clean_page_text("infor-\nmation here"), "information here");
    }

    #[test]
    fn test_page_hyphen_kept_before_capital_or_digit() {
        assert_eq!(clean_page_text("Jean-\nPaul"), "Jean-\nPaul");
        assert_eq!(clean_page_text("123-\n456"), "123-\n456");
    }

    #[test]
    fn test_page_blank_lines_dropped() {
        assert_eq!(clean_page_text("a   b\n\n  \nc"), "a b\nc");
    }

    #[test]
    fn test_empty() {
        assert_eq!(clean_span_text(""), "");
        assert_eq!(clean_page_text(""), "");
    }
}

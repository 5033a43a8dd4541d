use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Canonical form used to de-duplicate the question pool:
/// trimmed, inner whitespace collapsed, lower-cased.
pub fn normalize_text(input: &str) -> String {
    WHITESPACE.replace_all(input.trim(), " ").to_lowercase()
}

/// Folds Turkish letters to ASCII. The PDF built-in fonts only cover
/// WinAnsi, so every string is passed through this before rendering.
pub fn fold_turkish(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'ğ' => 'g',
            'Ğ' => 'G',
            'ü' => 'u',
            'Ü' => 'U',
            'ş' => 's',
            'Ş' => 'S',
            'ı' => 'i',
            'İ' => 'I',
            'ö' => 'o',
            'Ö' => 'O',
            'ç' => 'c',
            'Ç' => 'C',
            c if c.is_ascii() => c,
            _ => '?',
        })
        .collect()
}

/// Truncates to `max` characters, appending "..." when something was cut.
pub fn truncate_chars(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        return input.to_string();
    }
    let mut out: String = input.chars().take(max).collect();
    out.push_str("...");
    out
}

/// File name for a download: folded to ASCII, whitespace replaced by `_`.
pub fn file_stem(input: &str) -> String {
    WHITESPACE
        .replace_all(fold_turkish(input.trim()).as_str(), "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

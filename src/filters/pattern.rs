//! Translation of the URL pattern language into regular expressions, and extraction of the
//! literal "shortcut" substrings used to pre-filter candidate rules.
//!
//! Pattern syntax:
//! * `*` matches any sequence of characters,
//! * `^` matches a separator character (anything but a letter, a digit, or one of `.%`) or the
//!   end of the URL,
//! * a leading `||` anchors the pattern at the start of the host or any of its subdomains,
//! * a leading `|` anchors the pattern at the start of the URL, a trailing `|` at its end.

use once_cell::sync::Lazy;
use regex::Regex;

const MASK_START_URL: &str = "||";
const MASK_PIPE: char = '|';
const MASK_SEPARATOR: char = '^';
const MASK_ANY_SYMBOL: char = '*';

pub(crate) const REGEX_ANY_SYMBOL: &str = ".*";
const REGEX_SEPARATOR: &str = "([^ a-zA-Z0-9.%]|$)";
const REGEX_START_URL: &str = "^(http|https|ws|wss)://([a-z0-9_.-]+\\.)?";
const REGEX_START_STRING: &str = "^";
const REGEX_END_STRING: &str = "$";

/// Placeholder substituted for the parts of a regex that cannot contribute to a shortcut.
const SHORTCUT_PLACEHOLDER: &str = "...";

#[inline]
fn is_regex_special(c: char) -> bool {
    matches!(
        c,
        '.' | '+' | '?' | '$' | '{' | '}' | '(' | ')' | '[' | ']' | '\\'
    )
}

#[inline]
fn is_shortcut_delimiter(c: char) -> bool {
    matches!(c, '*' | '^' | '|')
}

#[inline]
fn is_regex_shortcut_delimiter(c: char) -> bool {
    matches!(
        c,
        '\\' | '^' | '$' | '*' | '+' | '?' | '.' | '(' | ')' | '|' | '[' | ']' | '{' | '}'
    )
}

fn escape_regex(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 8);
    for c in pattern.chars() {
        if is_regex_special(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escapes every `|` in `text[start..]` except the very last character, which may be a right
/// anchor.
fn escape_inner_pipes(text: &str, start: usize) -> String {
    if text.len() <= start {
        return text.to_string();
    }
    let last_char_start = text
        .char_indices()
        .last()
        .map(|(i, _)| i)
        .unwrap_or(0)
        .max(start);
    let mut out = String::with_capacity(text.len() + 4);
    out.push_str(&text[..start]);
    out.push_str(&text[start..last_char_start].replace(MASK_PIPE, "\\|"));
    out.push_str(&text[last_char_start..]);
    out
}

/// Converts a URL pattern into the source of an equivalent regular expression.
pub fn create_regex_text(pattern: &str) -> String {
    let escaped = escape_regex(pattern);

    let escaped = if escaped.starts_with(MASK_START_URL) {
        escape_inner_pipes(&escaped, MASK_START_URL.len())
    } else if escaped.starts_with(MASK_PIPE) {
        escape_inner_pipes(&escaped, 1)
    } else {
        escape_inner_pipes(&escaped, 0)
    };

    let mut regex = escaped
        .replace(MASK_ANY_SYMBOL, REGEX_ANY_SYMBOL)
        .replace(MASK_SEPARATOR, REGEX_SEPARATOR);

    if let Some(rest) = regex.strip_prefix(MASK_START_URL) {
        regex = format!("{}{}", REGEX_START_URL, rest);
    } else if let Some(rest) = regex.strip_prefix(MASK_PIPE) {
        regex = format!("{}{}", REGEX_START_STRING, rest);
    }

    if regex.ends_with(MASK_PIPE) {
        regex.pop();
        regex.push_str(REGEX_END_STRING);
    }

    regex
}

/// The longest fragment of `pattern` free of `*`, `^` and `|`, lower-cased. Any URL matched by
/// the pattern contains this fragment (case-insensitively).
pub fn find_shortcut(pattern: &str) -> Option<String> {
    let mut longest = "";
    for part in pattern.split(is_shortcut_delimiter) {
        if part.len() > longest.len() {
            longest = part;
        }
    }
    if longest.is_empty() {
        None
    } else {
        Some(longest.to_lowercase())
    }
}

/// Heuristically extracts a literal substring from a `/regex/` rule. Returns `None` for regexes
/// using `?` (optional parts and lookarounds make any literal unreliable).
pub fn extract_regex_shortcut(rule_text: &str) -> Option<String> {
    static REGEX_RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(.*)/(\$.*)?").unwrap());
    static PARENTHESES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\\]\(.*[^\\]\)").unwrap());
    static BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\\]\[.*[^\\]\]").unwrap());
    static BRACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\\]\{.*[^\\]\}").unwrap());
    static ESCAPED_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\\]\\[a-zA-Z]").unwrap());

    let captures = REGEX_RULE.captures(rule_text)?;
    let re_text = captures.get(1)?.as_str();

    if re_text.contains('?') {
        return None;
    }

    let re_text = format!("{}{}", SHORTCUT_PLACEHOLDER, re_text);
    let re_text = PARENTHESES.replace(&re_text, SHORTCUT_PLACEHOLDER);
    let re_text = BRACKETS.replace(&re_text, SHORTCUT_PLACEHOLDER);
    let re_text = BRACES.replace(&re_text, SHORTCUT_PLACEHOLDER);
    let re_text = ESCAPED_CLASS.replace(&re_text, SHORTCUT_PLACEHOLDER);

    // on ties the last fragment wins
    let mut token = "";
    for part in re_text.rsplit(is_regex_shortcut_delimiter) {
        if part.len() > token.len() {
            token = part;
        }
    }

    if token.is_empty() {
        None
    } else {
        Some(token.to_lowercase())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filters/pattern.rs"]
mod unit_tests;

//! Element hiding (`##.banner`) and CSS injection (`#$#body { overflow: auto; }`) rules,
//! including their extended CSS (`#?#`) and exception (`#@#`) variants.

use memchr::{memchr, memchr3};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use std::fmt;

use crate::domain::DomainError;
use crate::filters::rule::{DomainRestrictions, FilterRule};

#[derive(Debug, Error, PartialEq, Clone)]
pub enum CssFilterError {
    #[error("rule text does not contain a css rule marker")]
    MissingMarker,
    #[error("empty css selector")]
    EmptySelector,
    #[error("unknown pseudo class: {0}")]
    UnknownPseudoClass(String),
    #[error("empty :style pseudo class")]
    EmptyStyle,
    #[error("wrong :style pseudo class syntax")]
    InvalidStyle,
    #[error("invalid css injection rule, no style presented")]
    MissingStyleBlock,
    #[error("punycode error")]
    PunycodeError,
}

impl From<DomainError> for CssFilterError {
    fn from(_: DomainError) -> Self {
        CssFilterError::PunycodeError
    }
}

const RULE_MARKER_FIRST_CHAR: u8 = b'#';

/// Sorted so that longer markers sharing a prefix are tried first.
pub(crate) const RULE_MARKERS: [&str; 8] = [
    "#@$?#", "#$?#", "#@$#", "#$#", "#@?#", "#?#", "#@#", "##",
];

const STYLE_PSEUDO_CLASS: &str = ":style";

const SUPPORTED_PSEUDO_CLASSES: &[&str] = &[
    ":active",
    ":checked",
    ":contains",
    ":disabled",
    ":empty",
    ":enabled",
    ":first-child",
    ":first-of-type",
    ":focus",
    ":has",
    ":has-text",
    ":hover",
    ":if",
    ":if-not",
    ":in-range",
    ":invalid",
    ":lang",
    ":last-child",
    ":last-of-type",
    ":link",
    ":matches-css",
    ":matches-css-before",
    ":matches-css-after",
    ":not",
    ":nth-child",
    ":nth-last-child",
    ":nth-last-of-type",
    ":nth-of-type",
    ":only-child",
    ":only-of-type",
    ":optional",
    ":out-of-range",
    ":properties",
    ":read-only",
    ":read-write",
    ":required",
    ":root",
    ":target",
    ":valid",
    ":visited",
    ":-abp-has",
    ":-abp-contains",
    ":-abp-properties",
];

const EXTENDED_CSS_MARKERS: &[&str] = &[
    "[-ext-has=",
    "[-ext-contains=",
    "[-ext-has-text=",
    "[-ext-matches-css=",
    "[-ext-matches-css-before=",
    "[-ext-matches-css-after=",
    ":has(",
    ":has-text(",
    ":contains(",
    ":matches-css(",
    ":matches-css-before(",
    ":matches-css-after(",
    ":-abp-has(",
    ":-abp-contains(",
    ":if(",
    ":if-not(",
    ":properties(",
    ":-abp-properties(",
];

/// Characters ending a pseudo-class name.
const PSEUDO_CLASS_NAME_END: [u8; 12] = [
    b' ', b'\t', b'>', b'(', b'[', b'.', b'#', b':', b'+', b'~', b'"', b'\'',
];

/// Returns the marker found at the first occurrence of `first_char` in `rule_text`, and its
/// position. Only that first occurrence is inspected.
pub(crate) fn find_rule_marker<'a>(
    rule_text: &str,
    markers: &[&'a str],
    first_char: u8,
) -> Option<(usize, &'a str)> {
    let start_index = memchr(first_char, rule_text.as_bytes())?;
    let rest = &rule_text[start_index..];
    markers
        .iter()
        .find(|marker| rest.starts_with(*marker))
        .map(|marker| (start_index, *marker))
}

fn find_byte_from(bytes: &[u8], needle: u8, from: usize) -> Option<usize> {
    if from > bytes.len() {
        return None;
    }
    memchr(needle, &bytes[from..]).map(|i| i + from)
}

struct PseudoClass<'a> {
    name: &'a str,
    name_start: usize,
}

/// Finds the first pseudo-class of `selector` which is not part of an attribute selector, e.g.
/// `:first-child` in `a[href="http://x"]:first-child`.
fn parse_pseudo_class(selector: &str) -> Option<PseudoClass<'_>> {
    let bytes = selector.as_bytes();
    let mut begin_index = 0;
    let mut name_start;

    loop {
        name_start = find_byte_from(bytes, b':', begin_index)?;
        if name_start > 0 && bytes[name_start - 1] == b'\\' {
            // escaped colon
            return None;
        }

        let mut inside_attribute = false;
        let mut square_bracket = find_byte_from(bytes, b'[', begin_index);
        while let Some(bracket_start) = square_bracket {
            if name_start < bracket_start {
                break;
            }
            // unterminated attribute selector, e.g. a[src="http:
            let bracket_end = find_byte_from(bytes, b']', bracket_start + 1)?;
            begin_index = bracket_end + 1;
            if name_start < bracket_end {
                inside_attribute = true;
                break;
            }
            square_bracket = find_byte_from(bytes, b'[', begin_index);
        }

        if !inside_attribute {
            break;
        }
    }

    let name_end = bytes[name_start + 1..]
        .iter()
        .position(|b| PSEUDO_CLASS_NAME_END.contains(b))
        .map(|i| i + name_start + 1)
        .unwrap_or(bytes.len());

    let name = &selector[name_start..name_end];
    if name.len() <= 1 {
        // either an empty name or a pseudo element like ::after
        return None;
    }

    Some(PseudoClass { name, name_start })
}

/// Converts `selector:style(declarations)` into `selector { declarations }`.
fn convert_style_pseudo_class(pseudo_class: &PseudoClass, css_content: &str) -> Result<String, CssFilterError> {
    let selector = &css_content[..pseudo_class.name_start];
    let style_start = pseudo_class.name_start + pseudo_class.name.len() + 1;
    let style_end = css_content
        .char_indices()
        .last()
        .map(|(i, _)| i)
        .unwrap_or(0);

    if style_end <= style_start {
        return Err(CssFilterError::EmptyStyle);
    }

    let style = &css_content[style_start..style_end];
    if selector.is_empty() || style.is_empty() {
        return Err(CssFilterError::InvalidStyle);
    }

    Ok(format!("{} {{ {} }}", selector, style))
}

fn is_extended_css(css_content: &str) -> bool {
    // cheap pre-check, every marker contains one of these
    if memchr3(b'[', b':', b'(', css_content.as_bytes()).is_none() {
        return false;
    }
    EXTENDED_CSS_MARKERS
        .iter()
        .any(|marker| css_content.contains(marker))
}

/// A parsed CSS rule.
#[derive(Debug, Clone)]
pub struct CssFilterRule {
    rule_text: String,
    filter_id: u32,
    domains: DomainRestrictions,
    css_selector: String,
    inject: bool,
    extended_css: bool,
    whitelist: bool,
}

impl CssFilterRule {
    pub fn parse(rule_text: &str, filter_id: u32) -> Result<CssFilterRule, CssFilterError> {
        static INJECT_STYLE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{.+\}").unwrap());

        let (marker_index, marker) = find_rule_marker(rule_text, &RULE_MARKERS, RULE_MARKER_FIRST_CHAR)
            .ok_or(CssFilterError::MissingMarker)?;

        let whitelist = marker.contains('@');
        let mut inject = marker.contains('$');
        let mut extended_css = marker.contains('?');

        let domains = if marker_index > 0 {
            DomainRestrictions::load_domains(&rule_text[..marker_index])?
        } else {
            DomainRestrictions::default()
        };

        let mut css_content = rule_text[marker_index + marker.len()..].to_string();
        if css_content.trim().is_empty() {
            return Err(CssFilterError::EmptySelector);
        }

        if !inject {
            let converted = match parse_pseudo_class(&css_content) {
                Some(pseudo_class) if pseudo_class.name == STYLE_PSEUDO_CLASS => {
                    Some(convert_style_pseudo_class(&pseudo_class, &css_content)?)
                }
                Some(pseudo_class) if !SUPPORTED_PSEUDO_CLASSES.contains(&pseudo_class.name) => {
                    return Err(CssFilterError::UnknownPseudoClass(css_content.clone()));
                }
                _ => None,
            };
            if let Some(converted) = converted {
                inject = true;
                css_content = converted;
            }
        }

        if inject && !INJECT_STYLE_BLOCK.is_match(&css_content) {
            return Err(CssFilterError::MissingStyleBlock);
        }

        if is_extended_css(&css_content) {
            extended_css = true;
        }

        Ok(CssFilterRule {
            rule_text: rule_text.to_string(),
            filter_id,
            domains,
            css_selector: css_content,
            inject,
            extended_css,
            whitelist,
        })
    }

    /// The selector of an element hiding rule, or the complete `selector { style }` block of an
    /// injection rule.
    pub fn css_selector(&self) -> &str {
        &self.css_selector
    }

    pub fn is_inject(&self) -> bool {
        self.inject
    }

    pub fn is_extended_css(&self) -> bool {
        self.extended_css
    }

    pub fn is_whitelist(&self) -> bool {
        self.whitelist
    }

    /// Copy of this rule with extra domain restrictions applied by exception rules.
    pub(crate) fn with_domains(&self, domains: DomainRestrictions) -> CssFilterRule {
        CssFilterRule {
            domains,
            ..self.clone()
        }
    }
}

impl FilterRule for CssFilterRule {
    fn rule_text(&self) -> &str {
        &self.rule_text
    }

    fn filter_id(&self) -> u32 {
        self.filter_id
    }

    fn domains(&self) -> &DomainRestrictions {
        &self.domains
    }
}

impl fmt::Display for CssFilterRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.rule_text)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filters/css.rs"]
mod unit_tests;

//! Parsing of filter list lines into rules of the right family.

use itertools::{Either, Itertools};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filters::css::{self, CssFilterError, CssFilterRule};
use crate::filters::rule::Rule;
use crate::filters::script::{self, ScriptFilterError, ScriptFilterRule, ScriptSource};
use crate::filters::url::{UrlFilterError, UrlFilterRule};

/// Syntaxes recognized but not handled by this engine: HTML filtering (`$$`, `$@$`) and
/// scriptlets.
const UNSUPPORTED_MARKERS: [&str; 3] = ["$$", "$@$", "#%#//scriptlet"];

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RuleType {
    Empty,
    Comment,
    NotSupported,
    Url,
    Css,
    Script,
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum RuleParseError {
    #[error("empty line")]
    Empty,
    #[error("comment")]
    Comment,
    #[error("unsupported rule syntax")]
    NotSupported,
    #[error("invalid url rule: {0}")]
    Url(#[from] UrlFilterError),
    #[error("invalid css rule: {0}")]
    Css(#[from] CssFilterError),
    #[error("invalid script rule: {0}")]
    Script(#[from] ScriptFilterError),
}

/// A filter list: the lines of its rules and the identifier every parsed rule is tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterList {
    pub id: u32,
    pub rules: Vec<String>,
    /// Origin attached to the script rules of the list.
    #[serde(default)]
    pub script_source: ScriptSource,
}

impl FilterList {
    pub fn new(id: u32, rules: Vec<String>) -> FilterList {
        FilterList {
            id,
            rules,
            script_source: ScriptSource::default(),
        }
    }
}

/// Given a single line, checks which rule family it belongs to. This is a cheap pre-check made
/// before calling the parser of that family.
pub fn detect_rule_type(line: &str) -> RuleType {
    let line = line.trim();
    if line.is_empty() {
        return RuleType::Empty;
    }

    if line.starts_with('!')
        || line.starts_with("[Adblock")
        || (line.starts_with('#') && line[1..].starts_with(char::is_whitespace))
    {
        return RuleType::Comment;
    }

    if UNSUPPORTED_MARKERS.iter().any(|marker| line.contains(marker)) {
        return RuleType::NotSupported;
    }

    // whitelist url rules may still carry a `#` in their pattern
    if line.starts_with("@@") {
        return RuleType::Url;
    }

    if css::find_rule_marker(line, &script::RULE_MARKERS, b'#').is_some() {
        return RuleType::Script;
    }
    if css::find_rule_marker(line, &css::RULE_MARKERS, b'#').is_some() {
        return RuleType::Css;
    }

    RuleType::Url
}

/// Parses one line. Script rules get `script_source` as their origin.
pub fn parse_rule(line: &str, filter_id: u32, script_source: ScriptSource) -> Result<Rule, RuleParseError> {
    let line = line.trim();
    match detect_rule_type(line) {
        RuleType::Empty => Err(RuleParseError::Empty),
        RuleType::Comment => Err(RuleParseError::Comment),
        RuleType::NotSupported => Err(RuleParseError::NotSupported),
        RuleType::Url => Ok(UrlFilterRule::parse(line, filter_id)?.into()),
        RuleType::Css => Ok(CssFilterRule::parse(line, filter_id)?.into()),
        RuleType::Script => Ok(ScriptFilterRule::parse(line, filter_id, script_source)?.into()),
    }
}

/// Parses every line of a list, dropping comments, empty lines and malformed rules. Malformed
/// rules are logged.
pub fn parse_rules<S: AsRef<str>>(lines: &[S], filter_id: u32, script_source: ScriptSource) -> Vec<Rule> {
    let (rules, errors): (Vec<_>, Vec<_>) = lines
        .iter()
        .map(|line| (line.as_ref(), parse_rule(line.as_ref(), filter_id, script_source)))
        .filter(|(_, result)| {
            !matches!(result, Err(RuleParseError::Empty) | Err(RuleParseError::Comment))
        })
        .partition_map(|(line, result)| match result {
            Ok(rule) => Either::Left(rule),
            Err(e) => Either::Right((line, e)),
        });

    for (line, e) in errors {
        warn!("Dropping rule {} from filter {}: {}", line, filter_id, e);
    }

    rules
}

/// Rules of every list, in list order.
pub fn parse_filter_lists(lists: &[FilterList]) -> Vec<Rule> {
    lists
        .iter()
        .flat_map(|list| parse_rules(&list.rules, list.id, list.script_source))
        .collect()
}

#[cfg(test)]
#[path = "../tests/unit/lists.rs"]
mod unit_tests;

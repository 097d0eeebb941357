//! Script injection rules: `example.com#%#window.adsbygoogle = []` and their `#@%#` exceptions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;

use crate::domain::DomainError;
use crate::filters::css::find_rule_marker;
use crate::filters::rule::{DomainRestrictions, FilterRule};

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ScriptFilterError {
    #[error("rule text does not contain a script rule marker")]
    MissingMarker,
    #[error("script rule has an empty body")]
    EmptyScript,
    #[error("punycode error")]
    PunycodeError,
}

impl From<DomainError> for ScriptFilterError {
    fn from(_: DomainError) -> Self {
        ScriptFilterError::PunycodeError
    }
}

const RULE_MARKER_FIRST_CHAR: u8 = b'#';

pub(crate) const MASK_SCRIPT_RULE: &str = "#%#";
pub(crate) const MASK_SCRIPT_EXCEPTION_RULE: &str = "#@%#";

pub(crate) const RULE_MARKERS: [&str; 2] = [MASK_SCRIPT_EXCEPTION_RULE, MASK_SCRIPT_RULE];

/// Where the list carrying a script rule came from. The injection side uses it to decide
/// whether the script is trusted; matching ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptSource {
    Local,
    Remote,
}

impl Default for ScriptSource {
    fn default() -> Self {
        ScriptSource::Local
    }
}

#[derive(Debug, Clone)]
pub struct ScriptFilterRule {
    rule_text: String,
    filter_id: u32,
    domains: DomainRestrictions,
    script: String,
    whitelist: bool,
    script_source: ScriptSource,
}

impl ScriptFilterRule {
    pub fn parse(
        rule_text: &str,
        filter_id: u32,
        script_source: ScriptSource,
    ) -> Result<ScriptFilterRule, ScriptFilterError> {
        let (marker_index, marker) = find_rule_marker(rule_text, &RULE_MARKERS, RULE_MARKER_FIRST_CHAR)
            .ok_or(ScriptFilterError::MissingMarker)?;

        let domains = if marker_index > 0 {
            DomainRestrictions::load_domains(&rule_text[..marker_index])?
        } else {
            DomainRestrictions::default()
        };

        let script = &rule_text[marker_index + marker.len()..];
        if script.trim().is_empty() {
            return Err(ScriptFilterError::EmptyScript);
        }

        Ok(ScriptFilterRule {
            rule_text: rule_text.to_string(),
            filter_id,
            domains,
            script: script.to_string(),
            whitelist: marker == MASK_SCRIPT_EXCEPTION_RULE,
            script_source,
        })
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn is_whitelist(&self) -> bool {
        self.whitelist
    }

    pub fn script_source(&self) -> ScriptSource {
        self.script_source
    }

    pub(crate) fn with_domains(&self, domains: DomainRestrictions) -> ScriptFilterRule {
        ScriptFilterRule {
            domains,
            ..self.clone()
        }
    }
}

impl FilterRule for ScriptFilterRule {
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

impl fmt::Display for ScriptFilterRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.rule_text)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filters/script.rs"]
mod unit_tests;

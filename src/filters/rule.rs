//! Data shared by every rule family: source text, owning filter list and the domains a rule is
//! restricted to.

use std::fmt;
use std::sync::Arc;

use crate::domain::{self, DomainError};
use crate::filters::css::CssFilterRule;
use crate::filters::script::ScriptFilterRule;
use crate::filters::url::UrlFilterRule;

/// Identifier of the list rules entered by the user themselves.
pub const USER_FILTER_ID: u32 = 0;

/// A set of punycode domain names. Most rules carry zero or one domain per set, so the common
/// cases avoid a heap-allocated list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Domains {
    Empty,
    Single(String),
    Multiple(Vec<String>),
}

impl Default for Domains {
    fn default() -> Self {
        Domains::Empty
    }
}

impl Domains {
    pub fn from_vec(mut domains: Vec<String>) -> Self {
        match domains.len() {
            0 => Domains::Empty,
            1 => Domains::Single(domains.remove(0)),
            _ => Domains::Multiple(domains),
        }
    }

    pub fn as_slice(&self) -> &[String] {
        match self {
            Domains::Empty => &[],
            Domains::Single(domain) => std::slice::from_ref(domain),
            Domains::Multiple(domains) => domains.as_slice(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.as_slice().iter()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Domains::Empty)
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Whether `domain` is one of these domains or a subdomain of one of them.
    pub fn matches(&self, domain: &str) -> bool {
        match self {
            Domains::Empty => false,
            Domains::Single(d) => domain::is_domain_or_sub_domain(domain, d),
            Domains::Multiple(ds) => domain::is_domain_or_sub_domain_of_any(domain, ds),
        }
    }
}

/// Permitted (`example.com`) and restricted (`~example.com`) domains of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomainRestrictions {
    pub permitted: Domains,
    pub restricted: Domains,
}

impl DomainRestrictions {
    /// Parses a `|`- or `,`-separated domain list, e.g. `example.com|~sub.example.com`.
    pub fn load_domains(domains: &str) -> Result<Self, DomainError> {
        let mut permitted = vec![];
        let mut restricted = vec![];

        for part in domains.split(|c| c == ',' || c == '|') {
            let (negated, name) = match part.strip_prefix('~') {
                Some(name) => (true, name),
                None => (false, part),
            };
            let name = domain::to_punycode(name.trim())?;
            let name = domain::get_cropped_domain_name(&name);
            if name.is_empty() {
                continue;
            }
            if negated {
                restricted.push(name.to_string());
            } else {
                permitted.push(name.to_string());
            }
        }

        Ok(DomainRestrictions {
            permitted: Domains::from_vec(permitted),
            restricted: Domains::from_vec(restricted),
        })
    }

    pub fn has_permitted_domains(&self) -> bool {
        !self.permitted.is_empty()
    }

    pub fn has_restricted_domains(&self) -> bool {
        !self.restricted.is_empty()
    }

    /// Whether a rule with these restrictions may apply on `domain`. Nothing applies on an empty
    /// domain.
    pub fn is_permitted(&self, domain: &str) -> bool {
        if domain.is_empty() {
            return false;
        }
        if self.restricted.matches(domain) {
            return false;
        }
        if self.has_permitted_domains() {
            return self.permitted.matches(domain);
        }
        true
    }

    /// Returns a copy with `domains` merged into the restricted set. If the rule is bound to
    /// permitted domains, only the domains where it is permitted are merged. Duplicates are
    /// dropped.
    pub fn with_restricted_domains<S: AsRef<str>>(&self, domains: &[S]) -> DomainRestrictions {
        let mut restricted: Vec<String> = self.restricted.as_slice().to_vec();
        for domain in domains {
            let domain = domain.as_ref();
            if self.has_permitted_domains() && !self.is_permitted(domain) {
                continue;
            }
            if !restricted.iter().any(|d| d == domain) {
                restricted.push(domain.to_string());
            }
        }
        DomainRestrictions {
            permitted: self.permitted.clone(),
            restricted: Domains::from_vec(restricted),
        }
    }
}

/// Capabilities common to URL, CSS and script rules.
pub trait FilterRule {
    fn rule_text(&self) -> &str;

    fn filter_id(&self) -> u32;

    fn domains(&self) -> &DomainRestrictions;

    fn is_permitted(&self, domain: &str) -> bool {
        self.domains().is_permitted(domain)
    }

    /// A rule is generic when it is not bound to any permitted domain.
    fn is_generic(&self) -> bool {
        !self.domains().has_permitted_domains()
    }

    fn is_domain_sensitive(&self) -> bool {
        let domains = self.domains();
        domains.has_permitted_domains() || domains.has_restricted_domains()
    }

    /// Text used to persist the rule; parsing it again yields an equivalent rule.
    fn as_text_for_storage(&self) -> &str {
        self.rule_text()
    }
}

/// Any successfully parsed rule.
#[derive(Debug, Clone)]
pub enum Rule {
    Url(Arc<UrlFilterRule>),
    Css(Arc<CssFilterRule>),
    Script(Arc<ScriptFilterRule>),
}

impl Rule {
    pub fn as_filter_rule(&self) -> &dyn FilterRule {
        match self {
            Rule::Url(rule) => rule.as_ref(),
            Rule::Css(rule) => rule.as_ref(),
            Rule::Script(rule) => rule.as_ref(),
        }
    }

    pub fn rule_text(&self) -> &str {
        self.as_filter_rule().rule_text()
    }

    pub fn filter_id(&self) -> u32 {
        self.as_filter_rule().filter_id()
    }

    pub fn as_text_for_storage(&self) -> &str {
        self.as_filter_rule().as_text_for_storage()
    }

    pub fn is_whitelist(&self) -> bool {
        match self {
            Rule::Url(rule) => rule.is_whitelist(),
            Rule::Css(rule) => rule.is_whitelist(),
            Rule::Script(rule) => rule.is_whitelist(),
        }
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Rule) -> bool {
        self.filter_id() == other.filter_id() && self.rule_text() == other.rule_text()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.rule_text())
    }
}

impl From<UrlFilterRule> for Rule {
    fn from(rule: UrlFilterRule) -> Self {
        Rule::Url(Arc::new(rule))
    }
}

impl From<CssFilterRule> for Rule {
    fn from(rule: CssFilterRule) -> Self {
        Rule::Css(Arc::new(rule))
    }
}

impl From<ScriptFilterRule> for Rule {
    fn from(rule: ScriptFilterRule) -> Self {
        Rule::Script(Arc::new(rule))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filters/rule.rs"]
mod unit_tests;

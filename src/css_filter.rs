//! Builds the stylesheets injected into a document from element hiding and CSS injection rules.

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::sync::Arc;

use crate::filters::css::CssFilterRule;
use crate::filters::rule::{FilterRule, USER_FILTER_ID};
use crate::utils::escape_rule_text;

pub const DEFAULT_CSS_SELECTORS_PER_BLOCK: usize = 50;

const ELEMHIDE_CSS_STYLE: &str = " { display: none!important; }\r\n";
const ELEMHIDE_HIT_START: &str = " { display: none!important; content: 'adguard";
const INJECT_HIT_START: &str = " content: 'adguard";
// encoded `;`
const HIT_SEPARATOR: &str = "%3B";
const HIT_END: &str = "' !important;}\r\n";
const INJECT_RULES_SEPARATOR: &str = "\r\n";

bitflags::bitflags! {
    /// Selects which CSS [`CssFilter::build_css`] retrieves.
    #[derive(Serialize, Deserialize)]
    pub struct CssFilterOptions: u32 {
        const RETRIEVE_TRADITIONAL_CSS = 1 << 0;
        const RETRIEVE_EXTCSS = 1 << 1;
        /// The document is covered by a `$generichide` exception: generic rules don't apply.
        const GENERIC_HIDE_APPLIED = 1 << 2;
        /// Only CSS injection rules are retrieved.
        const CSS_INJECTION_ONLY = 1 << 3;
    }
}

impl Default for CssFilterOptions {
    fn default() -> Self {
        CssFilterOptions::RETRIEVE_TRADITIONAL_CSS | CssFilterOptions::RETRIEVE_EXTCSS
    }
}

/// Stylesheets for a document: `css` is understood by the browser, `extended_css` needs the
/// extended CSS engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CssStylesheets {
    pub css: Vec<String>,
    pub extended_css: Vec<String>,
}

/// Rules sorted into buckets after exception rules have been applied.
#[derive(Default)]
struct Buckets {
    common: Vec<Arc<CssFilterRule>>,
    domain_sensitive: Vec<Arc<CssFilterRule>>,
    extended: Vec<Arc<CssFilterRule>>,
    common_css: OnceCell<Vec<String>>,
    common_css_hits: OnceCell<Vec<String>>,
}

impl Buckets {
    fn build(rules: &[Arc<CssFilterRule>], exception_rules: &[Arc<CssFilterRule>]) -> Buckets {
        let mut exceptions_by_selector: HashMap<&str, Vec<&str>> = HashMap::new();
        for exception in exception_rules {
            exceptions_by_selector
                .entry(exception.css_selector())
                .or_insert_with(Vec::new)
                .extend(exception.domains().permitted.iter().map(String::as_str));
        }

        let mut buckets = Buckets::default();
        let mut became_domain_sensitive = vec![];

        for rule in rules {
            let was_domain_sensitive = rule.is_domain_sensitive();
            let rule = match exceptions_by_selector.get(rule.css_selector()) {
                Some(domains) => {
                    let restrictions = rule.domains().with_restricted_domains(domains.as_slice());
                    if &restrictions == rule.domains() {
                        Arc::clone(rule)
                    } else {
                        Arc::new(rule.with_domains(restrictions))
                    }
                }
                None => Arc::clone(rule),
            };

            if rule.is_extended_css() {
                buckets.extended.push(rule);
            } else if was_domain_sensitive {
                buckets.domain_sensitive.push(rule);
            } else if rule.is_domain_sensitive() {
                became_domain_sensitive.push(rule);
            } else {
                buckets.common.push(rule);
            }
        }

        buckets.domain_sensitive.extend(became_domain_sensitive);
        buckets
    }
}

/// Element hiding and CSS injection rules.
///
/// Exception rules (`example.com#@#.banner`) are applied by restricting every rule with the
/// same selector on the exception's domains. The restricted copies live in derived buckets,
/// which are recomputed after any mutation, so removing an exception simply restores the rules
/// as they were parsed.
pub struct CssFilter {
    rules: Vec<Arc<CssFilterRule>>,
    exception_rules: Vec<Arc<CssFilterRule>>,
    selectors_per_block: usize,
    buckets: OnceCell<Buckets>,
}

impl Default for CssFilter {
    fn default() -> Self {
        CssFilter::new(DEFAULT_CSS_SELECTORS_PER_BLOCK)
    }
}

impl Clone for CssFilter {
    fn clone(&self) -> Self {
        CssFilter {
            rules: self.rules.clone(),
            exception_rules: self.exception_rules.clone(),
            selectors_per_block: self.selectors_per_block,
            buckets: OnceCell::new(),
        }
    }
}

impl CssFilter {
    /// `selectors_per_block` bounds how many element hiding selectors share one declaration.
    pub fn new(selectors_per_block: usize) -> CssFilter {
        CssFilter {
            rules: vec![],
            exception_rules: vec![],
            selectors_per_block: selectors_per_block.max(1),
            buckets: OnceCell::new(),
        }
    }

    pub fn add_rule(&mut self, rule: Arc<CssFilterRule>) {
        if rule.is_whitelist() {
            self.exception_rules.push(rule);
        } else {
            self.rules.push(rule);
        }
        self.buckets = OnceCell::new();
    }

    pub fn add_rules<I>(&mut self, rules: I)
    where
        I: IntoIterator<Item = Arc<CssFilterRule>>,
    {
        for rule in rules {
            if rule.is_whitelist() {
                self.exception_rules.push(rule);
            } else {
                self.rules.push(rule);
            }
        }
        self.buckets = OnceCell::new();
    }

    /// Removes every rule with the same text as `rule`.
    pub fn remove_rule(&mut self, rule: &CssFilterRule) {
        let rule_text = rule.rule_text();
        self.rules.retain(|r| r.rule_text() != rule_text);
        self.exception_rules.retain(|r| r.rule_text() != rule_text);
        self.buckets = OnceCell::new();
    }

    pub fn clear_rules(&mut self) {
        self.rules.clear();
        self.exception_rules.clear();
        self.buckets = OnceCell::new();
    }

    /// Rules as they were added, exception rules last.
    pub fn rules(&self) -> Vec<Arc<CssFilterRule>> {
        self.rules
            .iter()
            .chain(self.exception_rules.iter())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len() + self.exception_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn buckets(&self) -> &Buckets {
        self.buckets
            .get_or_init(|| Buckets::build(&self.rules, &self.exception_rules))
    }

    /// Stylesheets to inject into documents on `domain`.
    pub fn build_css(&self, domain: &str, options: CssFilterOptions) -> CssStylesheets {
        let buckets = self.buckets();
        let rules = self.filter_rules(buckets, domain, options);
        let (extended, css): (Vec<_>, Vec<_>) = rules.into_iter().partition(|r| r.is_extended_css());

        let mut stylesheets = CssStylesheets {
            css: self.build_css_by_rules(css),
            extended_css: self.build_css_by_rules(extended),
        };

        if !options.contains(CssFilterOptions::GENERIC_HIDE_APPLIED)
            && options.contains(CssFilterOptions::RETRIEVE_TRADITIONAL_CSS)
        {
            let mut css = if options.contains(CssFilterOptions::CSS_INJECTION_ONLY) {
                self.build_css_by_rules(buckets.common.iter().filter(|r| r.is_inject()))
            } else {
                buckets
                    .common_css
                    .get_or_init(|| self.build_css_by_rules(buckets.common.iter()))
                    .clone()
            };
            css.append(&mut stylesheets.css);
            stylesheets.css = css;
        }

        stylesheets
    }

    /// Same as [`CssFilter::build_css`], with one declaration per rule carrying the filter id
    /// and the rule text in its `content` property, so that a hit can be traced back to the
    /// rule.
    pub fn build_css_hits(&self, domain: &str, options: CssFilterOptions) -> CssStylesheets {
        let buckets = self.buckets();
        let rules = self.filter_rules(buckets, domain, options);
        let (extended, css): (Vec<_>, Vec<_>) = rules.into_iter().partition(|r| r.is_extended_css());

        let mut stylesheets = CssStylesheets {
            css: build_css_hits_by_rules(css),
            extended_css: build_css_hits_by_rules(extended),
        };

        if !options.contains(CssFilterOptions::GENERIC_HIDE_APPLIED)
            && options.contains(CssFilterOptions::RETRIEVE_TRADITIONAL_CSS)
        {
            let mut css = buckets
                .common_css_hits
                .get_or_init(|| build_css_hits_by_rules(buckets.common.iter()))
                .clone();
            css.append(&mut stylesheets.css);
            stylesheets.css = css;
        }

        stylesheets
    }

    /// Domain-sensitive and extended CSS rules applying on `domain`.
    fn filter_rules<'a>(
        &self,
        buckets: &'a Buckets,
        domain: &str,
        options: CssFilterOptions,
    ) -> Vec<&'a Arc<CssFilterRule>> {
        let mut rules = vec![];
        if domain.is_empty() {
            return rules;
        }

        let generic_hide = options.contains(CssFilterOptions::GENERIC_HIDE_APPLIED);
        let injection_only = options.contains(CssFilterOptions::CSS_INJECTION_ONLY);

        if options.contains(CssFilterOptions::RETRIEVE_TRADITIONAL_CSS) {
            rules.extend(buckets.domain_sensitive.iter().filter(|rule| {
                rule.is_permitted(domain)
                    && !(generic_hide && rule.is_generic())
                    && !(injection_only && !rule.is_inject())
            }));
        }

        if options.contains(CssFilterOptions::RETRIEVE_EXTCSS) {
            rules.extend(buckets.extended.iter().filter(|rule| {
                rule.is_permitted(domain) && !(generic_hide && rule.is_generic())
            }));
        }

        rules
    }

    /// Joins element hiding selectors into `a, b, c { display: none!important; }` blocks and
    /// appends injection rules as they are. Extended CSS selectors always end their block, an
    /// invalid one must not invalidate its neighbours.
    fn build_css_by_rules<'a, I>(&self, rules: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a Arc<CssFilterRule>>,
    {
        let mut elemhide = String::new();
        let mut inject: Vec<&str> = vec![];
        let mut selectors_count = 0;

        for rule in rules {
            if rule.is_inject() {
                inject.push(rule.css_selector());
                continue;
            }
            elemhide.push_str(rule.css_selector());
            selectors_count += 1;
            if selectors_count % self.selectors_per_block == 0 || rule.is_extended_css() {
                elemhide.push_str(ELEMHIDE_CSS_STYLE);
            } else {
                elemhide.push_str(", ");
            }
        }

        // the last selector always closes its block
        if let Some(open) = elemhide.strip_suffix(", ") {
            elemhide = format!("{}{}", open, ELEMHIDE_CSS_STYLE);
        }

        let mut styles = vec![];
        if !elemhide.is_empty() {
            styles.push(elemhide);
        }
        if !inject.is_empty() {
            styles.push(inject.join(INJECT_RULES_SEPARATOR));
        }
        styles
    }
}

fn build_css_hits_by_rules<'a, I>(rules: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Arc<CssFilterRule>>,
{
    rules
        .into_iter()
        .map(|rule| {
            if rule.is_inject() {
                add_marker_to_inject_rule(rule)
            } else {
                add_marker_to_elemhide_rule(rule)
            }
        })
        .collect()
}

/// `.banner` -> `.banner { display: none!important; content: 'adguard1%3B%23%23.banner' !important;}`
fn add_marker_to_elemhide_rule(rule: &CssFilterRule) -> String {
    if rule.filter_id() == USER_FILTER_ID {
        return format!("{}{}", rule.css_selector(), ELEMHIDE_CSS_STYLE);
    }
    format!(
        "{}{}{}{}{}{}",
        rule.css_selector(),
        ELEMHIDE_HIT_START,
        rule.filter_id(),
        HIT_SEPARATOR,
        escape_rule_text(rule.rule_text()),
        HIT_END
    )
}

/// `body { color: red }` -> `body { color: red; content: 'adguard1%3B...' !important;}`.
/// Rules declaring `content` themselves are left untouched.
fn add_marker_to_inject_rule(rule: &CssFilterRule) -> String {
    static CONTENT_ATTRIBUTE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"(?i)[{;"(]\s*content\s*:"#).unwrap());

    let css = rule.css_selector();
    if rule.filter_id() == USER_FILTER_ID || CONTENT_ATTRIBUTE.is_match(css) {
        return css.to_string();
    }

    let without_close_brace = css
        .char_indices()
        .last()
        .map(|(i, _)| &css[..i])
        .unwrap_or(css)
        .trim();
    let separator = if without_close_brace.ends_with(';') { "" } else { ";" };

    format!(
        "{}{}{}{}{}{}{}",
        without_close_brace,
        separator,
        INJECT_HIT_START,
        rule.filter_id(),
        HIT_SEPARATOR,
        escape_rule_text(rule.rule_text()),
        HIT_END
    )
}

#[cfg(test)]
#[path = "../tests/unit/css_filter.rs"]
mod unit_tests;

//! Indices answering "which URL rule matches this request" without scanning every rule.
//!
//! Rules go to the first index that accepts them: the shortcut index, then the domain index,
//! then a linear fallback list. A lookup checks the candidates of each index in the same order
//! and stops at the first match.

mod domains;
mod shortcuts;

pub use domains::DomainsLookupTable;
pub use shortcuts::ShortcutsLookupTable;

use std::sync::Arc;

use crate::filters::rule::FilterRule;
use crate::filters::url::{ContentType, UrlFilterRule};
use crate::lookup::shortcuts::same_rule;
use crate::request::Request;

#[inline]
fn is_filtered(
    rule: &UrlFilterRule,
    request: &Request,
    mask: ContentType,
    generic_rules_allowed: bool,
) -> bool {
    rule.is_permitted(request.source_host().unwrap_or_default())
        && (generic_rules_allowed || !rule.is_generic())
        && rule.matches_request(request, mask)
}

/// First rule of `rules` matching the request. For documents, rules carrying a document-level
/// exception bit are tried before the others.
fn find_rule(
    rules: &[Arc<UrlFilterRule>],
    request: &Request,
    mask: ContentType,
    generic_rules_allowed: bool,
) -> Option<Arc<UrlFilterRule>> {
    if mask == ContentType::DOCUMENT {
        let document_level = rules.iter().find(|rule| {
            rule.is_document_level()
                && is_filtered(
                    rule,
                    request,
                    ContentType::DOCUMENT_LEVEL_EXCEPTIONS,
                    generic_rules_allowed,
                )
        });
        if let Some(rule) = document_level {
            return Some(Arc::clone(rule));
        }
    }

    rules
        .iter()
        .find(|rule| is_filtered(rule, request, mask, generic_rules_allowed))
        .cloned()
}

#[derive(Default, Clone)]
pub struct UrlFilterRuleLookupTable {
    shortcuts: ShortcutsLookupTable,
    domains: DomainsLookupTable,
    rules_without_shortcuts: Vec<Arc<UrlFilterRule>>,
}

impl UrlFilterRuleLookupTable {
    pub fn add_rule(&mut self, rule: Arc<UrlFilterRule>) {
        if !self.shortcuts.add_rule(&rule) && !self.domains.add_rule(&rule) {
            self.rules_without_shortcuts.push(rule);
        }
    }

    pub fn remove_rule(&mut self, rule: &UrlFilterRule) {
        self.shortcuts.remove_rule(rule);
        self.domains.remove_rule(rule);
        self.rules_without_shortcuts.retain(|r| !same_rule(r, rule));
    }

    pub fn clear_rules(&mut self) {
        self.shortcuts.clear_rules();
        self.domains.clear_rules();
        self.rules_without_shortcuts.clear();
    }

    pub fn rules(&self) -> Vec<Arc<UrlFilterRule>> {
        let mut rules = self.rules_without_shortcuts.clone();
        rules.extend(self.shortcuts.rules().cloned());
        rules.extend(self.domains.rules());
        rules
    }

    pub fn find_rule(
        &self,
        request: &Request,
        mask: ContentType,
        generic_rules_allowed: bool,
    ) -> Option<Arc<UrlFilterRule>> {
        if request.url.is_empty() {
            return None;
        }

        let candidates = self.shortcuts.lookup_rules(&request.url_lower_cased);
        if let Some(rule) = find_rule(&candidates, request, mask, generic_rules_allowed) {
            return Some(rule);
        }

        if let Some(host) = request.source_host() {
            let candidates = self.domains.lookup_rules(host);
            if let Some(rule) = find_rule(&candidates, request, mask, generic_rules_allowed) {
                return Some(rule);
            }
        }

        find_rule(&self.rules_without_shortcuts, request, mask, generic_rules_allowed)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/lookup/url_lookup.rs"]
mod unit_tests;

//! Matches requests against one kind of URL rules (blocking or whitelist), giving `$important`
//! rules precedence.

use std::sync::Arc;

use crate::filters::url::{ContentType, UrlFilterRule};
use crate::lookup::UrlFilterRuleLookupTable;
use crate::request::Request;

#[derive(Default, Clone)]
pub struct UrlFilter {
    basic_rules: UrlFilterRuleLookupTable,
    important_rules: UrlFilterRuleLookupTable,
}

impl UrlFilter {
    pub fn new<I>(rules: I) -> UrlFilter
    where
        I: IntoIterator<Item = Arc<UrlFilterRule>>,
    {
        let mut filter = UrlFilter::default();
        for rule in rules {
            filter.add_rule(rule);
        }
        filter
    }

    pub fn add_rule(&mut self, rule: Arc<UrlFilterRule>) {
        if rule.is_important() {
            self.important_rules.add_rule(rule);
        } else {
            self.basic_rules.add_rule(rule);
        }
    }

    pub fn remove_rule(&mut self, rule: &UrlFilterRule) {
        if rule.is_important() {
            self.important_rules.remove_rule(rule);
        } else {
            self.basic_rules.remove_rule(rule);
        }
    }

    pub fn clear_rules(&mut self) {
        self.basic_rules.clear_rules();
        self.important_rules.clear_rules();
    }

    pub fn rules(&self) -> Vec<Arc<UrlFilterRule>> {
        let mut rules = self.basic_rules.rules();
        rules.extend(self.important_rules.rules());
        rules
    }

    /// The rule matching `request`, important rules first.
    pub fn is_filtered(
        &self,
        request: &Request,
        generic_rules_allowed: bool,
    ) -> Option<Arc<UrlFilterRule>> {
        let mask = ContentType::from(request.request_type);
        self.important_rules
            .find_rule(request, mask, generic_rules_allowed)
            .or_else(|| {
                self.basic_rules
                    .find_rule(request, mask, generic_rules_allowed)
            })
    }
}

#[cfg(test)]
#[path = "../tests/unit/url_filter.rs"]
mod unit_tests;

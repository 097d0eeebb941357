//! Index of URL rules by the domains they are permitted on, e.g. `$domain=example.com`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::is_wildcard_domain;
use crate::filters::rule::FilterRule;
use crate::filters::url::UrlFilterRule;
use crate::lookup::shortcuts::same_rule;
use crate::utils::{fast_hash, Hash};

/// Permitted domains of the rule. Empty when any of them is a wildcard-TLD entry
/// (`example.*`), since those can't be keyed and the rule has to stay reachable from every host.
fn indexable_domains(rule: &UrlFilterRule) -> &[String] {
    let permitted = rule.domains().permitted.as_slice();
    if permitted.iter().any(|domain| is_wildcard_domain(domain)) {
        &[]
    } else {
        permitted
    }
}

#[derive(Default, Clone)]
pub struct DomainsLookupTable {
    lookup_table: HashMap<Hash, Vec<Arc<UrlFilterRule>>>,
}

impl DomainsLookupTable {
    /// Indexes `rule` under each of its permitted domains. Returns `false` if the rule can't be
    /// indexed here.
    pub fn add_rule(&mut self, rule: &Arc<UrlFilterRule>) -> bool {
        let mut added = false;
        for domain in indexable_domains(rule) {
            self.lookup_table
                .entry(fast_hash(domain))
                .or_insert_with(Vec::new)
                .push(Arc::clone(rule));
            added = true;
        }
        added
    }

    pub fn remove_rule(&mut self, rule: &UrlFilterRule) -> bool {
        let mut removed = false;
        for domain in indexable_domains(rule) {
            let hash = fast_hash(domain);
            if let Some(bucket) = self.lookup_table.get_mut(&hash) {
                let before = bucket.len();
                bucket.retain(|r| !same_rule(r, rule));
                removed |= bucket.len() != before;
                if bucket.is_empty() {
                    self.lookup_table.remove(&hash);
                }
            }
        }
        removed
    }

    pub fn clear_rules(&mut self) {
        self.lookup_table.clear();
    }

    /// Rules keyed under `host` or any of its parent domains, each returned once.
    pub fn lookup_rules(&self, host: &str) -> Vec<Arc<UrlFilterRule>> {
        let mut result = vec![];
        if host.is_empty() || self.lookup_table.is_empty() {
            return result;
        }

        let mut seen = HashSet::new();
        let mut probe = |suffix: &str| {
            if let Some(bucket) = self.lookup_table.get(&fast_hash(suffix)) {
                for rule in bucket {
                    if seen.insert(Arc::as_ptr(rule)) {
                        result.push(Arc::clone(rule));
                    }
                }
            }
        };

        // walk from the top-level label inward: com, example.com, www.example.com
        let mut boundaries: Vec<usize> = host.match_indices('.').map(|(i, _)| i + 1).collect();
        boundaries.reverse();
        for start in boundaries {
            probe(&host[start..]);
        }
        probe(host);

        result
    }

    /// Every indexed rule, once.
    pub fn rules(&self) -> Vec<Arc<UrlFilterRule>> {
        let mut seen = HashSet::new();
        self.lookup_table
            .values()
            .flatten()
            .filter(|rule| seen.insert(Arc::as_ptr(*rule)))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup_table.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/lookup/domains.rs"]
mod unit_tests;

//! Index of URL rules by a fixed-length window of their shortcut.

use std::collections::HashMap;
use std::sync::Arc;

use crate::filters::rule::FilterRule;
use crate::filters::url::UrlFilterRule;
use crate::utils::{fast_hash_bytes, Hash};

pub(crate) const SHORTCUT_LENGTH: usize = 5;

/// Windows of the rule's shortcut usable as keys, or `None` if the shortcut is too short.
fn rule_shortcuts(rule: &UrlFilterRule) -> Option<std::slice::Windows<'_, u8>> {
    match rule.shortcut() {
        Some(shortcut) if shortcut.len() >= SHORTCUT_LENGTH => {
            Some(shortcut.as_bytes().windows(SHORTCUT_LENGTH))
        }
        _ => None,
    }
}

/// Shortcuts that are only a scheme prefix would put the rule in a bucket hit by almost every
/// URL. Such rules are better served by the domain index or the fallback list.
fn is_any_url_shortcut(rule: &UrlFilterRule) -> bool {
    let shortcut = match rule.shortcut() {
        Some(shortcut) if shortcut.len() >= SHORTCUT_LENGTH => shortcut,
        _ => return true,
    };

    // scheme length + 1
    (shortcut.len() < 6 && shortcut.starts_with("ws:"))
        || (shortcut.len() < 7 && shortcut.starts_with("|ws:"))
        || (shortcut.len() < 9 && shortcut.starts_with("http"))
        || (shortcut.len() < 10 && shortcut.starts_with("|http"))
}

#[derive(Default, Clone)]
pub struct ShortcutsLookupTable {
    lookup_table: HashMap<Hash, Vec<Arc<UrlFilterRule>>>,
    histogram: HashMap<Hash, u32>,
}

impl ShortcutsLookupTable {
    /// Indexes `rule` under the least used window of its shortcut. Returns `false` if the rule
    /// has no usable shortcut.
    pub fn add_rule(&mut self, rule: &Arc<UrlFilterRule>) -> bool {
        if is_any_url_shortcut(rule) {
            return false;
        }
        let shortcuts = match rule_shortcuts(rule) {
            Some(shortcuts) => shortcuts,
            None => return false,
        };

        let mut best_hash = None;
        let mut min_count = u32::MAX;
        for shortcut in shortcuts {
            let hash = fast_hash_bytes(shortcut);
            let count = self.histogram.get(&hash).copied().unwrap_or(0);
            if best_hash.is_none() || count < min_count {
                min_count = count;
                best_hash = Some(hash);
            }
        }

        let hash = match best_hash {
            Some(hash) => hash,
            None => return false,
        };
        *self.histogram.entry(hash).or_insert(0) += 1;
        self.lookup_table
            .entry(hash)
            .or_insert_with(Vec::new)
            .push(Arc::clone(rule));
        true
    }

    /// Removes every indexed rule with the same text and filter as `rule`.
    pub fn remove_rule(&mut self, rule: &UrlFilterRule) -> bool {
        let shortcuts = match rule_shortcuts(rule) {
            Some(shortcuts) => shortcuts,
            None => return false,
        };

        let mut removed = false;
        for shortcut in shortcuts {
            let hash = fast_hash_bytes(shortcut);
            if let Some(bucket) = self.lookup_table.get_mut(&hash) {
                let before = bucket.len();
                bucket.retain(|r| !same_rule(r, rule));
                let removed_here = before - bucket.len();
                if removed_here > 0 {
                    removed = true;
                    if let Some(count) = self.histogram.get_mut(&hash) {
                        *count = count.saturating_sub(removed_here as u32);
                    }
                }
                if bucket.is_empty() {
                    self.lookup_table.remove(&hash);
                }
            }
        }
        removed
    }

    pub fn clear_rules(&mut self) {
        self.lookup_table.clear();
        self.histogram.clear();
    }

    /// Rules whose shortcut occurs in `url_lower_cased`. A rule may be returned more than once
    /// when the URL contains its key window several times.
    pub fn lookup_rules(&self, url_lower_cased: &str) -> Vec<Arc<UrlFilterRule>> {
        let mut result = vec![];
        if self.lookup_table.is_empty() {
            return result;
        }
        for window in url_lower_cased.as_bytes().windows(SHORTCUT_LENGTH) {
            if let Some(bucket) = self.lookup_table.get(&fast_hash_bytes(window)) {
                result.extend(
                    bucket
                        .iter()
                        .filter(|rule| {
                            rule.shortcut()
                                .map(|shortcut| url_lower_cased.contains(shortcut))
                                .unwrap_or(false)
                        })
                        .cloned(),
                );
            }
        }
        result
    }

    pub fn rules(&self) -> impl Iterator<Item = &Arc<UrlFilterRule>> {
        self.lookup_table.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.lookup_table.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup_table.is_empty()
    }
}

pub(crate) fn same_rule(a: &UrlFilterRule, b: &UrlFilterRule) -> bool {
    a.filter_id() == b.filter_id() && a.rule_text() == b.rule_text()
}

#[cfg(test)]
#[path = "../../tests/unit/lookup/shortcuts.rs"]
mod unit_tests;

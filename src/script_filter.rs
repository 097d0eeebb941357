//! Collects the scripts to run in a document from script injection rules.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::sync::Arc;

use crate::filters::rule::FilterRule;
use crate::filters::script::{ScriptFilterRule, ScriptSource};

/// A script to run in a document, tagged with where its rule came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEntry {
    pub script_source: ScriptSource,
    pub script: String,
}

/// Script injection rules. Like [`crate::css_filter::CssFilter`], exception rules restrict the
/// rules with the same script body on their domains, and the restricted copies are recomputed
/// after every mutation.
#[derive(Default)]
pub struct ScriptFilter {
    rules: Vec<Arc<ScriptFilterRule>>,
    exception_rules: Vec<Arc<ScriptFilterRule>>,
    effective_rules: OnceCell<Vec<Arc<ScriptFilterRule>>>,
}

impl Clone for ScriptFilter {
    fn clone(&self) -> Self {
        ScriptFilter {
            rules: self.rules.clone(),
            exception_rules: self.exception_rules.clone(),
            effective_rules: OnceCell::new(),
        }
    }
}

impl ScriptFilter {
    pub fn add_rule(&mut self, rule: Arc<ScriptFilterRule>) {
        if rule.is_whitelist() {
            self.exception_rules.push(rule);
        } else {
            self.rules.push(rule);
        }
        self.effective_rules = OnceCell::new();
    }

    /// Removes every rule with the same text as `rule`.
    pub fn remove_rule(&mut self, rule: &ScriptFilterRule) {
        let rule_text = rule.rule_text();
        self.rules.retain(|r| r.rule_text() != rule_text);
        self.exception_rules.retain(|r| r.rule_text() != rule_text);
        self.effective_rules = OnceCell::new();
    }

    pub fn clear_rules(&mut self) {
        self.rules.clear();
        self.exception_rules.clear();
        self.effective_rules = OnceCell::new();
    }

    /// Rules as they were added, exception rules last.
    pub fn rules(&self) -> Vec<Arc<ScriptFilterRule>> {
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

    fn effective_rules(&self) -> &[Arc<ScriptFilterRule>] {
        self.effective_rules.get_or_init(|| {
            let mut exceptions_by_script: HashMap<&str, Vec<&str>> = HashMap::new();
            for exception in &self.exception_rules {
                exceptions_by_script
                    .entry(exception.script())
                    .or_insert_with(Vec::new)
                    .extend(exception.domains().permitted.iter().map(String::as_str));
            }

            self.rules
                .iter()
                .map(|rule| match exceptions_by_script.get(rule.script()) {
                    Some(domains) => {
                        let restrictions = rule.domains().with_restricted_domains(domains.as_slice());
                        if &restrictions == rule.domains() {
                            Arc::clone(rule)
                        } else {
                            Arc::new(rule.with_domains(restrictions))
                        }
                    }
                    None => Arc::clone(rule),
                })
                .collect()
        })
    }

    /// Scripts to run in documents on `domain`, in rule order.
    pub fn build_script(&self, domain: &str) -> Vec<ScriptEntry> {
        self.effective_rules()
            .iter()
            .filter(|rule| rule.is_permitted(domain))
            .map(|rule| ScriptEntry {
                script_source: rule.script_source(),
                script: rule.script().to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../tests/unit/script_filter.rs"]
mod unit_tests;

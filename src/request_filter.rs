//! The entry point answering filtering queries: combines URL blocking and whitelist rules, CSS
//! rules and script rules, and memoizes URL decisions.

use log::debug;
use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::css_filter::{CssFilter, CssFilterOptions, CssStylesheets, DEFAULT_CSS_SELECTORS_PER_BLOCK};
use crate::domain;
use crate::filters::rule::{FilterRule, Rule};
use crate::filters::script::ScriptSource;
use crate::filters::url::UrlFilterRule;
use crate::request::{Request, RequestType};
use crate::script_filter::{ScriptEntry, ScriptFilter};
use crate::url_filter::UrlFilter;

pub const DEFAULT_REQUEST_CACHE_CAPACITY: usize = 1000;

const SCRIPTS_PROLOGUE: &str = "( function () { try {";
const SCRIPTS_EPILOGUE: &str =
    "} catch (ex) { console.error('Error executing AG js: ' + ex); } })();";
const SCRIPTS_SEPARATOR: &str = "\r\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestFilterOptions {
    /// Number of distinct URLs remembered before the decision cache is flushed.
    pub request_cache_capacity: usize,
    pub css_selectors_per_block: usize,
    /// Build stylesheets whose declarations identify the rule that hid an element.
    pub collect_hits: bool,
    /// Run scripts from rules of remotely loaded lists.
    pub allow_remote_scripts: bool,
}

impl Default for RequestFilterOptions {
    fn default() -> Self {
        RequestFilterOptions {
            request_cache_capacity: DEFAULT_REQUEST_CACHE_CAPACITY,
            css_selectors_per_block: DEFAULT_CSS_SELECTORS_PER_BLOCK,
            collect_hits: false,
            allow_remote_scripts: true,
        }
    }
}

struct CacheItem {
    rule: Option<Arc<UrlFilterRule>>,
    document_host: Option<String>,
}

/// Decisions keyed by request URL, then request type. An entry is only trusted for the
/// document host it was computed for. The whole cache is dropped once it holds more than its
/// capacity of URLs.
pub struct RequestCache {
    cache: HashMap<String, HashMap<RequestType, CacheItem>>,
    capacity: usize,
}

impl RequestCache {
    pub fn new(capacity: usize) -> RequestCache {
        RequestCache {
            cache: HashMap::new(),
            capacity,
        }
    }

    /// `Some(None)` is a cached "no rule" decision.
    pub fn search(
        &self,
        request_url: &str,
        document_host: Option<&str>,
        request_type: RequestType,
    ) -> Option<Option<Arc<UrlFilterRule>>> {
        let item = self.cache.get(request_url)?.get(&request_type)?;
        if item.document_host.as_deref() != document_host {
            return None;
        }
        Some(item.rule.clone())
    }

    pub fn save(
        &mut self,
        request_url: &str,
        rule: Option<Arc<UrlFilterRule>>,
        document_host: Option<&str>,
        request_type: RequestType,
    ) {
        if self.cache.len() > self.capacity {
            self.clear();
        }
        self.cache
            .entry(request_url.to_string())
            .or_insert_with(HashMap::new)
            .insert(
                request_type,
                CacheItem {
                    rule,
                    document_host: document_host.map(str::to_string),
                },
            );
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Number of cached URLs.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

pub struct RequestFilter {
    url_white_filter: UrlFilter,
    url_blocking_filter: UrlFilter,
    /// `$badfilter` rules by the text of the rule they disable.
    bad_filter_rules: HashMap<String, Arc<UrlFilterRule>>,
    css_filter: CssFilter,
    script_filter: ScriptFilter,
    rules_count: usize,
    options: RequestFilterOptions,
    url_blocking_cache: Mutex<RequestCache>,
    url_exceptions_cache: Mutex<RequestCache>,
}

impl Default for RequestFilter {
    fn default() -> Self {
        RequestFilter::new(RequestFilterOptions::default())
    }
}

/// Caches start out empty on the copy.
impl Clone for RequestFilter {
    fn clone(&self) -> Self {
        RequestFilter {
            url_white_filter: self.url_white_filter.clone(),
            url_blocking_filter: self.url_blocking_filter.clone(),
            bad_filter_rules: self.bad_filter_rules.clone(),
            css_filter: self.css_filter.clone(),
            script_filter: self.script_filter.clone(),
            rules_count: self.rules_count,
            options: self.options.clone(),
            url_blocking_cache: Mutex::new(RequestCache::new(self.options.request_cache_capacity)),
            url_exceptions_cache: Mutex::new(RequestCache::new(self.options.request_cache_capacity)),
        }
    }
}

impl RequestFilter {
    pub fn new(options: RequestFilterOptions) -> RequestFilter {
        RequestFilter {
            url_white_filter: UrlFilter::default(),
            url_blocking_filter: UrlFilter::default(),
            bad_filter_rules: HashMap::new(),
            css_filter: CssFilter::new(options.css_selectors_per_block),
            script_filter: ScriptFilter::default(),
            rules_count: 0,
            url_blocking_cache: Mutex::new(RequestCache::new(options.request_cache_capacity)),
            url_exceptions_cache: Mutex::new(RequestCache::new(options.request_cache_capacity)),
            options,
        }
    }

    pub fn options(&self) -> &RequestFilterOptions {
        &self.options
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.insert_rule(rule);
        self.clear_request_caches();
    }

    pub fn add_rules<I>(&mut self, rules: I)
    where
        I: IntoIterator<Item = Rule>,
    {
        for rule in rules {
            self.insert_rule(rule);
        }
        self.clear_request_caches();
    }

    fn insert_rule(&mut self, rule: Rule) {
        match rule {
            Rule::Url(rule) => {
                if let Some(bad_filter) = rule.bad_filter() {
                    self.bad_filter_rules.insert(bad_filter.to_string(), rule);
                } else if rule.is_whitelist() {
                    self.url_white_filter.add_rule(rule);
                } else {
                    self.url_blocking_filter.add_rule(rule);
                }
            }
            Rule::Css(rule) => self.css_filter.add_rule(rule),
            Rule::Script(rule) => self.script_filter.add_rule(rule),
        }
        self.rules_count += 1;
    }

    pub fn remove_rule(&mut self, rule: &Rule) {
        match rule {
            Rule::Url(rule) => {
                if let Some(bad_filter) = rule.bad_filter() {
                    self.bad_filter_rules.remove(bad_filter);
                } else if rule.is_whitelist() {
                    self.url_white_filter.remove_rule(rule);
                } else {
                    self.url_blocking_filter.remove_rule(rule);
                }
            }
            Rule::Css(rule) => self.css_filter.remove_rule(rule),
            Rule::Script(rule) => self.script_filter.remove_rule(rule),
        }
        self.rules_count = self.rules_count.saturating_sub(1);
        self.clear_request_caches();
    }

    pub fn clear_rules(&mut self) {
        self.url_white_filter.clear_rules();
        self.url_blocking_filter.clear_rules();
        self.bad_filter_rules.clear();
        self.css_filter.clear_rules();
        self.script_filter.clear_rules();
        self.rules_count = 0;
        self.clear_request_caches();
    }

    /// Every rule, `$badfilter` rules included.
    pub fn rules(&self) -> Vec<Rule> {
        let mut rules: Vec<Rule> = vec![];
        rules.extend(self.url_white_filter.rules().into_iter().map(Rule::Url));
        rules.extend(self.url_blocking_filter.rules().into_iter().map(Rule::Url));
        rules.extend(self.css_filter.rules().into_iter().map(Rule::Css));
        rules.extend(self.script_filter.rules().into_iter().map(Rule::Script));
        rules.extend(self.bad_filter_rules.values().cloned().map(Rule::Url));
        rules
    }

    pub fn rules_count(&self) -> usize {
        self.rules_count
    }

    fn clear_request_caches(&mut self) {
        // replacing the caches also recovers from a poisoned lock
        self.url_blocking_cache = Mutex::new(RequestCache::new(self.options.request_cache_capacity));
        self.url_exceptions_cache = Mutex::new(RequestCache::new(self.options.request_cache_capacity));
    }

    /// Stylesheets for the document at `url`.
    pub fn get_selectors_for_url(&self, url: &str, options: CssFilterOptions) -> CssStylesheets {
        let domain = domain::get_host(url).unwrap_or_default();
        if self.options.collect_hits && !options.contains(CssFilterOptions::CSS_INJECTION_ONLY) {
            self.css_filter.build_css_hits(&domain, options)
        } else {
            self.css_filter.build_css(&domain, options)
        }
    }

    pub fn get_scripts_for_url(&self, url: &str) -> Vec<ScriptEntry> {
        let domain = domain::get_host(url).unwrap_or_default();
        self.script_filter.build_script(&domain)
    }

    /// The scripts for the document at `url` as one snippet, each script guarded so that a
    /// failing one does not prevent the others from running.
    pub fn get_scripts_string_for_url(&self, url: &str) -> String {
        let scripts = self.get_scripts_for_url(url);

        let mut lines: Vec<&str> = Vec::with_capacity(scripts.len() + 2);
        lines.push(SCRIPTS_PROLOGUE);
        lines.extend(
            scripts
                .iter()
                .filter(|entry| {
                    self.options.allow_remote_scripts || entry.script_source == ScriptSource::Local
                })
                .map(|entry| entry.script.as_str()),
        );
        lines.push(SCRIPTS_EPILOGUE);
        lines.join(SCRIPTS_SEPARATOR)
    }

    fn check_bad_filter_exceptions(&self, rule: Option<Arc<UrlFilterRule>>) -> Option<Arc<UrlFilterRule>> {
        rule.filter(|rule| !self.bad_filter_rules.contains_key(rule.rule_text()))
    }

    fn check_white_list(&self, request: &Request) -> Option<Arc<UrlFilterRule>> {
        let rule = self.url_white_filter.is_filtered(request, true);
        self.check_bad_filter_exceptions(rule)
    }

    /// The whitelist rule matching the request, if any. Used to decide whether a whole
    /// document is exempt from filtering.
    pub fn find_white_list_rule(
        &self,
        request_url: &str,
        referrer: &str,
        request_type: RequestType,
    ) -> Option<Arc<UrlFilterRule>> {
        let request = Request::new(request_url, referrer, request_type);
        let document_host = request.source_host();

        if let Ok(cache) = self.url_exceptions_cache.lock() {
            if let Some(rule) = cache.search(request_url, document_host, request_type) {
                return rule;
            }
        }

        let rule = self.check_white_list(&request);

        if let Ok(mut cache) = self.url_exceptions_cache.lock() {
            cache.save(request_url, rule.clone(), document_host, request_type);
        }
        rule
    }

    /// The rule deciding the fate of a request: a whitelist rule lets it through, a blocking
    /// rule blocks it, `None` means no rule applies.
    ///
    /// `document_whitelist_rule` is the whitelist rule covering the document issuing the
    /// request, see [`RequestFilter::find_white_list_rule`].
    pub fn find_rule_for_request(
        &self,
        request_url: &str,
        document_url: &str,
        request_type: RequestType,
        document_whitelist_rule: Option<&Arc<UrlFilterRule>>,
    ) -> Option<Arc<UrlFilterRule>> {
        let request = Request::new(request_url, document_url, request_type);
        let document_host = request.source_host();
        // decisions under a document-level exception depend on that rule as well
        let use_cache = document_whitelist_rule.is_none();

        if use_cache {
            if let Ok(cache) = self.url_blocking_cache.lock() {
                if let Some(rule) = cache.search(request_url, document_host, request_type) {
                    return rule;
                }
            }
        }

        let rule = self.find_rule_for_prepared_request(&request, document_whitelist_rule);
        let rule = self.check_bad_filter_exceptions(rule);

        if use_cache {
            if let Ok(mut cache) = self.url_blocking_cache.lock() {
                cache.save(request_url, rule.clone(), document_host, request_type);
            }
        }
        rule
    }

    fn find_rule_for_prepared_request(
        &self,
        request: &Request,
        document_whitelist_rule: Option<&Arc<UrlFilterRule>>,
    ) -> Option<Arc<UrlFilterRule>> {
        debug!(
            "Filtering http request for url: {}, document: {:?}, requestType: {}",
            request.url,
            request.source_host(),
            request.request_type
        );

        let url_white_list_rule = self.check_white_list(request);

        let generic_rules_allowed = document_whitelist_rule.map_or(true, |r| !r.is_generic_block());
        let url_rules_allowed = document_whitelist_rule.map_or(true, |r| !r.is_url_block());

        let blocking_rule = self
            .url_blocking_filter
            .is_filtered(request, generic_rules_allowed);

        if let Some(white_list_rule) = url_white_list_rule {
            let blocking_is_important = blocking_rule.as_ref().map_or(false, |r| r.is_important());
            if white_list_rule.is_important() || !blocking_is_important {
                debug!(
                    "White list rule found {} for url: {} document: {:?}, requestType: {}",
                    white_list_rule,
                    request.url,
                    request.source_host(),
                    request.request_type
                );
                return Some(white_list_rule);
            }
        }

        if let Some(document_rule) = document_whitelist_rule {
            if !generic_rules_allowed || !url_rules_allowed {
                debug!(
                    "White list rule {} found for document: {:?}",
                    document_rule,
                    request.source_host()
                );
            }
            if !url_rules_allowed {
                return Some(Arc::clone(document_rule));
            }
        }

        if let Some(rule) = &blocking_rule {
            debug!(
                "Black list rule {} found for url: {}, document: {:?}, requestType: {}",
                rule,
                request.url,
                request.source_host(),
                request.request_type
            );
        }

        blocking_rule
    }
}

#[cfg(test)]
#[path = "../tests/unit/request_filter.rs"]
mod unit_tests;

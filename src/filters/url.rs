//! URL blocking and whitelist rules, e.g. `||ads.example.com^$script,third-party` or
//! `@@||example.com^$document`.

use memchr::memchr;
use once_cell::sync::OnceCell;
use regex::bytes::{Regex as BytesRegex, RegexBuilder as BytesRegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::borrow::Cow;
use std::fmt;

use crate::domain;
use crate::filters::pattern::{self, REGEX_ANY_SYMBOL};
use crate::filters::rule::{DomainRestrictions, FilterRule};
use crate::request::{Request, RequestType};
use crate::utils::has_unicode;

pub(crate) const MASK_WHITE_LIST: &str = "@@";
const MASK_REGEX_RULE: char = '/';
const MASK_ANY_SYMBOL: &str = "*";
const OPTIONS_DELIMITER: u8 = b'$';
const ESCAPE_CHARACTER: u8 = b'\\';
const REPLACE_OPTION: &str = "replace";

/// Options accepted for compatibility but without any effect.
const IGNORED_OPTIONS: [&str; 7] = [
    "BACKGROUND",
    "~BACKGROUND",
    "EXTENSION",
    "~EXTENSION",
    "COLLAPSE",
    "~COLLAPSE",
    "~DOCUMENT",
];

#[derive(Debug, Error, PartialEq, Clone)]
pub enum UrlFilterError {
    #[error("unknown option: {0}")]
    UnknownOption(String),
    #[error("unsupported option: {0}")]
    UnsupportedOption(String),
    #[error("{0} cannot be applied to this type of rule")]
    OptionNotAllowed(String),
    #[error("regex parsing error")]
    RegexParsingError(regex::Error),
    #[error("too wide basic rule")]
    TooWideRule,
    #[error("punycode error")]
    PunycodeError,
}

impl From<domain::DomainError> for UrlFilterError {
    fn from(_: domain::DomainError) -> Self {
        UrlFilterError::PunycodeError
    }
}

bitflags::bitflags! {
    /// Request content types a rule applies to. The low bits are actual request types, the high
    /// bits are only carried by document-level exception rules.
    pub struct ContentType: u32 {
        const OTHER = 1; // 1 << 0;
        const SCRIPT = 1 << 1;
        const IMAGE = 1 << 2;
        const STYLESHEET = 1 << 3;
        const OBJECT = 1 << 4;
        const SUBDOCUMENT = 1 << 5;
        const XMLHTTPREQUEST = 1 << 6;
        const OBJECT_SUBREQUEST = 1 << 7;
        const MEDIA = 1 << 8;
        const FONT = 1 << 9;
        const WEBSOCKET = 1 << 10;

        const ELEMHIDE = 1 << 20;
        const URLBLOCK = 1 << 21;
        const JSINJECT = 1 << 22;
        const POPUP = 1 << 23;
        const GENERICHIDE = 1 << 24;
        const GENERICBLOCK = 1 << 25;
        const IMPORTANT = 1 << 26;

        const DOCUMENT = Self::ELEMHIDE.bits |
            Self::URLBLOCK.bits |
            Self::JSINJECT.bits;

        const DOCUMENT_LEVEL_EXCEPTIONS = Self::DOCUMENT.bits |
            Self::GENERICHIDE.bits |
            Self::GENERICBLOCK.bits;

        // Default for rules without content type options
        const ALL = Self::OTHER.bits |
            Self::SCRIPT.bits |
            Self::IMAGE.bits |
            Self::STYLESHEET.bits |
            Self::OBJECT.bits |
            Self::SUBDOCUMENT.bits |
            Self::XMLHTTPREQUEST.bits |
            Self::OBJECT_SUBREQUEST.bits |
            Self::MEDIA.bits |
            Self::FONT.bits |
            Self::WEBSOCKET.bits;
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:b}", &self)
    }
}

impl From<RequestType> for ContentType {
    fn from(request_type: RequestType) -> ContentType {
        match request_type {
            RequestType::Document => ContentType::DOCUMENT,
            RequestType::Subdocument => ContentType::SUBDOCUMENT,
            RequestType::Script => ContentType::SCRIPT,
            RequestType::Stylesheet => ContentType::STYLESHEET,
            RequestType::Object => ContentType::OBJECT,
            RequestType::Image => ContentType::IMAGE,
            RequestType::Xmlhttprequest => ContentType::XMLHTTPREQUEST,
            RequestType::ObjectSubrequest => ContentType::OBJECT_SUBREQUEST,
            RequestType::Media => ContentType::MEDIA,
            RequestType::Font => ContentType::FONT,
            RequestType::Websocket => ContentType::WEBSOCKET,
            RequestType::Other => ContentType::OTHER,
            RequestType::Popup => ContentType::POPUP,
        }
    }
}

impl ContentType {
    /// Maps an upper-cased content type option (`SCRIPT`, `OBJECT_SUBREQUEST`, ...) to its bit.
    fn from_option_name(name: &str) -> Option<ContentType> {
        Some(match name {
            "OTHER" => ContentType::OTHER,
            "SCRIPT" => ContentType::SCRIPT,
            "IMAGE" => ContentType::IMAGE,
            "STYLESHEET" => ContentType::STYLESHEET,
            "OBJECT" => ContentType::OBJECT,
            "SUBDOCUMENT" => ContentType::SUBDOCUMENT,
            "XMLHTTPREQUEST" => ContentType::XMLHTTPREQUEST,
            "OBJECT_SUBREQUEST" => ContentType::OBJECT_SUBREQUEST,
            "MEDIA" => ContentType::MEDIA,
            "FONT" => ContentType::FONT,
            "WEBSOCKET" => ContentType::WEBSOCKET,
            _ => return None,
        })
    }
}

/// `$third-party` / `$~third-party` constraint of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThirdParty {
    Any,
    ThirdPartyOnly,
    FirstPartyOnly,
}

#[derive(Debug, Clone)]
pub enum CompiledRegex {
    Compiled(BytesRegex),
    MatchAll,
    RegexParsingError(regex::Error),
}

impl CompiledRegex {
    pub fn is_match(&self, url: &str) -> bool {
        match &self {
            CompiledRegex::MatchAll => true,
            // no match if regex didn't even compile
            CompiledRegex::RegexParsingError(_e) => false,
            CompiledRegex::Compiled(r) => r.is_match(url.as_bytes()),
        }
    }
}

impl fmt::Display for CompiledRegex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            CompiledRegex::MatchAll => write!(f, "{}", REGEX_ANY_SYMBOL),
            CompiledRegex::RegexParsingError(_e) => write!(f, "ERROR"),
            CompiledRegex::Compiled(r) => write!(f, "{}", r.as_str()),
        }
    }
}

fn compile_regex(source: &str, match_case: bool) -> CompiledRegex {
    if source.is_empty() || source == MASK_ANY_SYMBOL || source == REGEX_ANY_SYMBOL {
        return CompiledRegex::MatchAll;
    }
    match BytesRegexBuilder::new(source)
        .case_insensitive(!match_case)
        .unicode(false)
        .build()
    {
        Ok(compiled) => CompiledRegex::Compiled(compiled),
        Err(e) => CompiledRegex::RegexParsingError(e),
    }
}

/// Where the regex of a rule comes from: an explicit `/regex/` (compiled while parsing) or a
/// pattern translated and compiled on first use.
#[derive(Debug, Clone)]
enum RuleSource {
    Regex,
    Pattern(String),
}

/// A parsed URL rule.
#[derive(Debug, Clone)]
pub struct UrlFilterRule {
    rule_text: String,
    filter_id: u32,
    domains: DomainRestrictions,
    whitelist: bool,
    important: bool,
    third_party: ThirdParty,
    match_case: bool,
    empty_response: bool,
    permitted_content_type: ContentType,
    restricted_content_type: ContentType,
    shortcut: Option<String>,
    bad_filter: Option<String>,
    source: RuleSource,
    regex: OnceCell<CompiledRegex>,
}

/// Pattern and options of a URL rule, split at the first unescaped `$` from the end.
struct RuleParts<'a> {
    whitelist: bool,
    url_rule_text: Cow<'a, str>,
    options: Option<Cow<'a, str>>,
}

fn is_regex_text(text: &str) -> bool {
    text.starts_with(MASK_REGEX_RULE) && text.ends_with(MASK_REGEX_RULE)
}

fn split_rule_text(rule_text: &str) -> Result<RuleParts<'_>, UrlFilterError> {
    let mut start_index = 0;
    let mut url_rule_text = rule_text;
    let mut whitelist = false;

    if let Some(stripped) = rule_text.strip_prefix(MASK_WHITE_LIST) {
        start_index = MASK_WHITE_LIST.len();
        url_rule_text = stripped;
        whitelist = true;
    }

    // regex rules may contain `$`, options are only looked for in replace rules
    let parse_options = !(is_regex_text(url_rule_text)
        && !url_rule_text.contains(&format!("{}=", REPLACE_OPTION)));

    let mut options = None;
    if parse_options && rule_text.len() >= 2 {
        let bytes = rule_text.as_bytes();
        let mut found_escaped = false;
        // a trailing `$` is not an options delimiter
        for i in (start_index..=bytes.len() - 2).rev() {
            if bytes[i] != OPTIONS_DELIMITER {
                continue;
            }
            if i > 0 && bytes[i - 1] == ESCAPE_CHARACTER {
                found_escaped = true;
                continue;
            }
            url_rule_text = &rule_text[start_index..i];
            let raw_options = &rule_text[i + 1..];
            options = Some(if found_escaped {
                Cow::Owned(raw_options.replacen("\\$", "$", 1))
            } else {
                Cow::Borrowed(raw_options)
            });
            break;
        }
    }

    Ok(RuleParts {
        whitelist,
        url_rule_text: ascii_domain_rule(url_rule_text)?,
        options,
    })
}

/// Finds the domain a URL pattern is anchored to, e.g. `пример.рф` in `||пример.рф/ads`.
fn parse_rule_domain(url_rule_text: &str) -> &str {
    const STARTS_WITH: [&str; 6] = ["http://www.", "https://www.", "http://", "https://", "||", "//"];

    let start_index = STARTS_WITH
        .iter()
        .find(|prefix| url_rule_text.starts_with(*prefix))
        .map(|prefix| prefix.len())
        .unwrap_or(0);

    let rest = &url_rule_text[start_index..];
    let end_index = memchr(b'/', rest.as_bytes())
        .or_else(|| memchr(b'^', rest.as_bytes()))
        .unwrap_or(rest.len());
    &rest[..end_index]
}

/// Converts the domain part of a non-ASCII pattern to punycode.
fn ascii_domain_rule(url_rule_text: &str) -> Result<Cow<'_, str>, UrlFilterError> {
    if !has_unicode(url_rule_text) {
        return Ok(Cow::Borrowed(url_rule_text));
    }
    let rule_domain = parse_rule_domain(url_rule_text);
    if rule_domain.is_empty() {
        return Err(UrlFilterError::PunycodeError);
    }
    let ascii = domain::to_punycode(rule_domain)?;
    Ok(Cow::Owned(url_rule_text.replace(rule_domain, &ascii)))
}

/// Splits `options` on `delimiter`, honouring `\`-escaped delimiters and dropping empty parts.
fn split_options(options: &str, delimiter: char) -> Vec<String> {
    let mut parts = vec![];
    let mut current = String::new();
    let mut previous: Option<char> = None;
    for (i, c) in options.char_indices() {
        if c == delimiter {
            if i == 0 {
                // ignored
            } else if previous == Some(ESCAPE_CHARACTER as char) {
                current.pop();
                current.push(c);
            } else if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
        previous = Some(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

impl UrlFilterRule {
    pub fn parse(rule_text: &str, filter_id: u32) -> Result<UrlFilterRule, UrlFilterError> {
        let parts = split_rule_text(rule_text)?;

        let mut rule = UrlFilterRule {
            rule_text: rule_text.to_string(),
            filter_id,
            domains: DomainRestrictions::default(),
            whitelist: parts.whitelist,
            important: false,
            third_party: ThirdParty::Any,
            match_case: false,
            empty_response: false,
            permitted_content_type: ContentType::ALL,
            restricted_content_type: ContentType::empty(),
            shortcut: None,
            bad_filter: None,
            source: RuleSource::Regex,
            regex: OnceCell::new(),
        };

        if let Some(options) = parts.options.as_deref() {
            rule.load_options(options)?;
        }

        let url_rule_text = parts.url_rule_text.as_ref();
        let is_regex_rule = is_regex_text(url_rule_text)
            || url_rule_text.is_empty()
            || url_rule_text == MASK_ANY_SYMBOL;

        if is_regex_rule {
            let source = if url_rule_text.len() >= 2 && is_regex_text(url_rule_text) {
                url_rule_text[1..url_rule_text.len() - 1]
                    .replace("\\/", "/")
                    .replace("\\:", ":")
            } else {
                String::new()
            };

            let compiled = compile_regex(&source, rule.match_case);
            match compiled {
                CompiledRegex::RegexParsingError(e) => {
                    return Err(UrlFilterError::RegexParsingError(e))
                }
                CompiledRegex::MatchAll if !rule.domains.has_permitted_domains() => {
                    return Err(UrlFilterError::TooWideRule)
                }
                _ => (),
            }
            let _ = rule.regex.set(compiled);
            rule.shortcut = pattern::extract_regex_shortcut(url_rule_text);
        } else {
            rule.shortcut = pattern::find_shortcut(url_rule_text);
            rule.source = RuleSource::Pattern(url_rule_text.to_string());
        }

        Ok(rule)
    }

    fn load_options(&mut self, options: &str) -> Result<(), UrlFilterError> {
        for option in split_options(options, ',') {
            let (name, value) = match option.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (option.as_str(), None),
            };

            match name {
                "domain" => {
                    if let Some(value) = value {
                        self.domains = DomainRestrictions::load_domains(value)?;
                    }
                }
                "third-party" => self.third_party = ThirdParty::ThirdPartyOnly,
                "~third-party" => self.third_party = ThirdParty::FirstPartyOnly,
                "match-case" => self.match_case = true,
                "important" => self.important = true,
                "~important" => self.important = false,
                "elemhide" => self.append_whitelist_only(name, ContentType::ELEMHIDE)?,
                "generichide" => self.append_whitelist_only(name, ContentType::GENERICHIDE)?,
                "jsinject" => self.append_whitelist_only(name, ContentType::JSINJECT)?,
                "genericblock" => self.append_whitelist_only(name, ContentType::GENERICBLOCK)?,
                "urlblock" => self.append_permitted_content_type(ContentType::URLBLOCK),
                "document" => self.append_permitted_content_type(ContentType::DOCUMENT),
                "popup" => self.append_permitted_content_type(ContentType::POPUP),
                "empty" => {
                    if self.whitelist {
                        return Err(UrlFilterError::OptionNotAllowed(name.to_string()));
                    }
                    self.empty_response = true;
                }
                "csp" | REPLACE_OPTION => {
                    return Err(UrlFilterError::UnsupportedOption(name.to_string()))
                }
                "badfilter" => {
                    self.bad_filter = Some(
                        self.rule_text
                            .replacen("$badfilter,", "$", 1)
                            .replacen(",badfilter", "", 1)
                            .replacen("$badfilter", "", 1),
                    );
                }
                _ => {
                    let upper = name.to_uppercase().replace("OBJECT-SUBREQUEST", "OBJECT_SUBREQUEST");
                    if let Some(content_type) = ContentType::from_option_name(&upper) {
                        self.append_permitted_content_type(content_type);
                    } else if let Some(content_type) = upper
                        .strip_prefix('~')
                        .and_then(ContentType::from_option_name)
                    {
                        self.restricted_content_type |= content_type;
                    } else if IGNORED_OPTIONS.contains(&upper.as_str()) {
                        // no-op
                    } else {
                        return Err(UrlFilterError::UnknownOption(name.to_string()));
                    }
                }
            }
        }
        Ok(())
    }

    fn append_whitelist_only(&mut self, name: &str, content_type: ContentType) -> Result<(), UrlFilterError> {
        if !self.whitelist {
            return Err(UrlFilterError::OptionNotAllowed(name.to_string()));
        }
        self.append_permitted_content_type(content_type);
        Ok(())
    }

    fn append_permitted_content_type(&mut self, content_type: ContentType) {
        if self.permitted_content_type == ContentType::ALL {
            self.permitted_content_type = content_type;
        } else {
            self.permitted_content_type |= content_type;
        }
    }

    fn compiled_regex(&self) -> &CompiledRegex {
        self.regex.get_or_init(|| match &self.source {
            RuleSource::Pattern(url_rule_text) => {
                let compiled = compile_regex(&pattern::create_regex_text(url_rule_text), self.match_case);
                if let CompiledRegex::RegexParsingError(e) = &compiled {
                    log::error!("Error creating regex for rule {}: {}", self.rule_text, e);
                }
                compiled
            }
            // explicit regexes are compiled while parsing
            RuleSource::Regex => CompiledRegex::MatchAll,
        })
    }

    pub fn is_whitelist(&self) -> bool {
        self.whitelist
    }

    pub fn is_important(&self) -> bool {
        self.important
    }

    pub fn third_party(&self) -> ThirdParty {
        self.third_party
    }

    pub fn is_match_case(&self) -> bool {
        self.match_case
    }

    pub fn is_empty_response(&self) -> bool {
        self.empty_response
    }

    pub fn is_regex_rule(&self) -> bool {
        matches!(self.source, RuleSource::Regex)
    }

    pub fn shortcut(&self) -> Option<&str> {
        self.shortcut.as_deref()
    }

    pub fn permitted_content_type(&self) -> ContentType {
        self.permitted_content_type
    }

    pub fn restricted_content_type(&self) -> ContentType {
        self.restricted_content_type
    }

    /// Text of the rule disabled by this `$badfilter` rule.
    pub fn bad_filter(&self) -> Option<&str> {
        self.bad_filter.as_deref()
    }

    pub fn is_bad_filter(&self) -> bool {
        self.bad_filter.is_some()
    }

    pub fn is_document_whitelist(&self) -> bool {
        self.permitted_content_type.contains(ContentType::DOCUMENT)
    }

    pub fn is_elemhide(&self) -> bool {
        self.permitted_content_type.contains(ContentType::ELEMHIDE)
    }

    pub fn is_jsinject(&self) -> bool {
        self.permitted_content_type.contains(ContentType::JSINJECT)
    }

    pub fn is_url_block(&self) -> bool {
        self.permitted_content_type.contains(ContentType::URLBLOCK)
    }

    pub fn is_generic_hide(&self) -> bool {
        self.permitted_content_type.contains(ContentType::GENERICHIDE)
    }

    pub fn is_generic_block(&self) -> bool {
        self.permitted_content_type.contains(ContentType::GENERICBLOCK)
    }

    pub fn is_block_popups(&self) -> bool {
        self.permitted_content_type.contains(ContentType::POPUP)
    }

    /// Whether the rule carries any of the document-level exception bits.
    pub fn is_document_level(&self) -> bool {
        self.permitted_content_type
            .intersects(ContentType::DOCUMENT_LEVEL_EXCEPTIONS)
    }

    pub fn check_content_type_mask(&self, mask: ContentType) -> bool {
        if self.permitted_content_type == ContentType::ALL && self.restricted_content_type.is_empty() {
            return true;
        }

        let matches_permitted = self.permitted_content_type == ContentType::ALL
            || self.permitted_content_type.intersects(mask);
        let not_matches_restricted = self.restricted_content_type.is_empty()
            || !self.restricted_content_type.contains(mask);

        matches_permitted && not_matches_restricted
    }

    /// Checks `url` against the rule, ignoring its domain restrictions.
    pub fn is_filtered(&self, url: &str, third_party: bool, request_type: RequestType) -> bool {
        self.matches(url, &url.to_lowercase(), third_party, request_type.into())
    }

    /// Same as [`UrlFilterRule::is_filtered`] for a prepared request, checking `mask` instead
    /// of the request's own content type.
    pub(crate) fn matches_request(&self, request: &Request, mask: ContentType) -> bool {
        self.matches(&request.url, &request.url_lower_cased, request.is_third_party, mask)
    }

    fn matches(&self, url: &str, url_lower_cased: &str, third_party: bool, mask: ContentType) -> bool {
        match self.third_party {
            ThirdParty::ThirdPartyOnly if !third_party => return false,
            ThirdParty::FirstPartyOnly if third_party => return false,
            _ => (),
        }

        if let Some(shortcut) = &self.shortcut {
            if !url_lower_cased.contains(shortcut.as_str()) {
                return false;
            }
        }

        if !self.check_content_type_mask(mask) {
            return false;
        }

        self.compiled_regex().is_match(url)
    }
}

impl FilterRule for UrlFilterRule {
    fn rule_text(&self) -> &str {
        &self.rule_text
    }

    fn filter_id(&self) -> u32 {
        self.filter_id
    }

    fn domains(&self) -> &DomainRestrictions {
        &self.domains
    }

    fn is_permitted(&self, domain: &str) -> bool {
        if domain.is_empty() && !self.domains.has_permitted_domains() {
            // whitelist rules must also fire for requests without a referrer
            if self.whitelist || self.third_party == ThirdParty::Any {
                return true;
            }
        }
        self.domains.is_permitted(domain)
    }
}

impl fmt::Display for UrlFilterRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.rule_text)
    }
}

/// A matched URL rule, reported to hit-counting collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterHit {
    pub filter_id: u32,
    pub rule_text: String,
    pub request_url: String,
}

impl FilterHit {
    pub fn new(rule: &UrlFilterRule, request_url: &str) -> FilterHit {
        FilterHit {
            filter_id: rule.filter_id,
            rule_text: rule.rule_text.clone(),
            request_url: request_url.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filters/url.rs"]
mod unit_tests;

//! Host extraction and domain comparison helpers shared by every rule family.
//!
//! Domains are compared in their punycode form. Registrable ("second-level") domains are
//! computed against the public suffix list, so that `a.example.co.uk` and `b.example.co.uk` are
//! considered first-party to each other while `example.co.uk` and `other.co.uk` are not.

use std::borrow::Cow;

use memchr::{memchr, memmem};
use thiserror::Error;

use crate::utils::has_unicode;

/// Suffix used in rule domain lists to match a domain under any public suffix, e.g. `example.*`.
const TLD_WILDCARD: &str = ".*";

#[derive(Debug, Error, PartialEq, Clone)]
pub enum DomainError {
    #[error("punycode conversion failed")]
    PunycodeError,
}

/// Converts an internationalized domain name to its ASCII form. ASCII input is returned as-is.
pub fn to_punycode(domain: &str) -> Result<Cow<'_, str>, DomainError> {
    if !has_unicode(domain) {
        return Ok(Cow::Borrowed(domain));
    }
    idna::domain_to_ascii(domain)
        .map(Cow::Owned)
        .map_err(|_| DomainError::PunycodeError)
}

/// Extracts the host part of `url`, without port, lower-cased and punycode-encoded.
///
/// Non-hierarchical URLs (`stun:host`) are supported by treating the character right before the
/// first `:` as the start of the authority.
pub fn get_host(url: &str) -> Option<Cow<'_, str>> {
    if url.is_empty() {
        return None;
    }
    let bytes = url.as_bytes();

    let host_start = match memmem::find(bytes, b"//") {
        Some(index) => index + 2,
        None => {
            let colon = memchr(b':', bytes)?;
            // the authority starts right after the scheme separator
            colon + 1
        }
    };
    if host_start > url.len() {
        return None;
    }

    let rest = &url[host_start..];
    let host_end = rest
        .find(|c| c == '/' || c == '?')
        .unwrap_or(rest.len());
    let mut host = &rest[..host_end];

    if let Some(port_index) = memchr(b':', host.as_bytes()) {
        host = &host[..port_index];
    }

    let host = if has_unicode(host) {
        match to_punycode(host) {
            Ok(ascii) => Cow::Owned(ascii.into_owned()),
            Err(_) => return None,
        }
    } else if host.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(host.to_ascii_lowercase())
    } else {
        Cow::Borrowed(host)
    };

    Some(host)
}

/// Strips the `www.` prefix, if any.
pub fn get_cropped_domain_name(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Registrable domain of `host` (eTLD+1). Hosts that are themselves a public suffix, or that
/// the list does not know about, are returned unchanged.
pub fn get_second_level_domain(host: &str) -> &str {
    let host = host.trim_end_matches('.');
    psl::domain_str(host).unwrap_or(host)
}

/// A request is third-party when its registrable domain differs from the referrer's.
pub fn is_third_party_request(request_url: &str, referrer: &str) -> bool {
    let request_host = get_host(request_url);
    let referrer_host = get_host(referrer);
    match (request_host, referrer_host) {
        (None, None) => false,
        (Some(request_host), Some(referrer_host)) => {
            get_second_level_domain(&request_host) != get_second_level_domain(&referrer_host)
        }
        _ => true,
    }
}

/// Returns `true` if `domain_to_check` is `domain` or one of its subdomains.
///
/// A `domain` of the form `name.*` matches `name` under any public suffix (and subdomains of
/// such hosts).
pub fn is_domain_or_sub_domain(domain_to_check: &str, domain: &str) -> bool {
    if is_wildcard_domain(domain) {
        return match_as_wildcard(domain, domain_to_check);
    }
    is_suffix_domain(domain_to_check, domain)
}

pub fn is_domain_or_sub_domain_of_any<S: AsRef<str>>(domain_to_check: &str, domains: &[S]) -> bool {
    domains
        .iter()
        .any(|domain| is_domain_or_sub_domain(domain_to_check, domain.as_ref()))
}

pub fn is_wildcard_domain(domain: &str) -> bool {
    domain.ends_with(TLD_WILDCARD)
}

#[inline]
fn is_suffix_domain(domain_to_check: &str, domain: &str) -> bool {
    if domain_to_check == domain {
        return true;
    }
    domain_to_check.len() > domain.len()
        && domain_to_check.ends_with(domain)
        && domain_to_check.as_bytes()[domain_to_check.len() - domain.len() - 1] == b'.'
}

/// `google.com` -> `google.*`, `www.youtube.co.uk` -> `www.youtube.*`
fn tld_wildcard(domain: &str) -> Option<String> {
    let suffix = psl::suffix_str(domain)?;
    if suffix.len() >= domain.len() {
        return None;
    }
    let name = &domain[..domain.len() - suffix.len() - 1];
    Some(format!("{}{}", name, TLD_WILDCARD))
}

fn match_as_wildcard(wildcard: &str, domain_to_check: &str) -> bool {
    match tld_wildcard(domain_to_check) {
        Some(wildcarded) => is_suffix_domain(&wildcarded, wildcard),
        None => false,
    }
}

#[cfg(test)]
#[path = "../tests/unit/domain.rs"]
mod unit_tests;

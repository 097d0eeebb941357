//! Common utilities used by the rule indices and the list loaders.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use seahash::hash;

pub type Hash = u64;

#[inline]
pub fn fast_hash(input: &str) -> Hash {
    hash(input.as_bytes()) as Hash
}

#[inline]
pub fn fast_hash_bytes(input: &[u8]) -> Hash {
    hash(input) as Hash
}

pub fn has_unicode(pattern: &str) -> bool {
    !pattern.is_ascii()
}

/// Characters `encodeURIComponent` leaves alone. `'` is not among them, so the result is safe
/// inside a single-quoted CSS string.
const RULE_TEXT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'(')
    .remove(b')');

/// Percent-encodes `input` the way `encodeURIComponent` does.
pub fn escape_rule_text(input: &str) -> String {
    utf8_percent_encode(input, RULE_TEXT_ENCODE_SET).to_string()
}

#[cfg(test)]
#[path = "../tests/unit/utils.rs"]
mod unit_tests;

//! A content-filtering rule engine for AdGuard-style filter lists.
//!
//! Rule lines are parsed by [`lists`] into URL, CSS and script rules, loaded into a
//! [`request_filter::RequestFilter`] and served by an [`engine::Engine`]. The request filter
//! answers which rule decides a network request, which stylesheets to inject into a document
//! and which scripts to run on it.

pub mod css_filter;
pub mod domain;
pub mod engine;
pub mod filters;
pub mod lists;
pub mod lookup;
pub mod request;
pub mod request_filter;
pub mod script_filter;
pub mod url_filter;
#[doc(hidden)]
pub mod utils;

pub use engine::{Engine, EngineError, EngineOptions};
pub use filters::rule::{FilterRule, Rule};
pub use lists::{parse_filter_lists, parse_rule, parse_rules, FilterList};
pub use request::RequestType;
pub use request_filter::{RequestFilter, RequestFilterOptions};

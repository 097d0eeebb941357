#![no_main]
#![allow(unused_must_use)] // workaround for "error: unused `Result` that must be used"

use adfilter::filters::script::ScriptSource;
use adfilter::lists::parse_rule;
use adfilter::request::RequestType;
use adfilter::request_filter::RequestFilter;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        if let Ok(rule) = parse_rule(line, 1, ScriptSource::Local) {
            let mut filter = RequestFilter::default();
            filter.add_rule(rule);
            filter.find_rule_for_request("https://example.com/ad.js", "https://site.com/", RequestType::Script, None);
            filter.get_selectors_for_url("https://example.com/", Default::default());
            filter.get_scripts_string_for_url("https://example.com/");
        }
    }
});

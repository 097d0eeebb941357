#![no_main]
#![allow(unused_must_use)] // workaround for "error: unused `Result` that must be used"

use libfuzzer_sys::fuzz_target;
use adfilter::request::{Request, RequestType};

fuzz_target!(|data: &[u8]| {
    if let Ok(url) = std::str::from_utf8(data) {
        Request::new(&format!("https://{}", url), "https://example.com", RequestType::Other);
        Request::new(url, "https://example.com", RequestType::Script);
        Request::new(url, "", RequestType::Document);
        Request::new(url, url, RequestType::Subdocument);
        url.parse::<RequestType>();
    }
});

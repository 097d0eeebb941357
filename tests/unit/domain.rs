#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn domain_or_sub_domain() {
        assert!(is_domain_or_sub_domain("example.com", "example.com"));
        assert!(is_domain_or_sub_domain("a.b.example.com", "example.com"));
        assert!(is_domain_or_sub_domain("www.example.com", "example.com"));
        assert!(!is_domain_or_sub_domain("notexample.com", "example.com"));
        assert!(!is_domain_or_sub_domain("badexample.com", "example.com"));
        assert!(!is_domain_or_sub_domain("example.com", "a.example.com"));
        assert!(!is_domain_or_sub_domain("example.org", "example.com"));

        assert!(is_domain_or_sub_domain_of_any("a.test.com", &["example.com", "test.com"]));
        assert!(!is_domain_or_sub_domain_of_any("a.test.com", &["example.com"]));
        let empty: [&str; 0] = [];
        assert!(!is_domain_or_sub_domain_of_any("a.test.com", &empty));
    }

    #[test]
    fn wildcard_tld_domains() {
        assert!(is_wildcard_domain("google.*"));
        assert!(!is_wildcard_domain("google.com"));

        assert!(is_domain_or_sub_domain("google.com", "google.*"));
        assert!(is_domain_or_sub_domain("google.co.uk", "google.*"));
        assert!(is_domain_or_sub_domain("www.google.de", "google.*"));
        assert!(!is_domain_or_sub_domain("notgoogle.com", "google.*"));
        assert!(!is_domain_or_sub_domain("google.example.com", "google.*"));
    }

    #[test]
    fn get_host_works() {
        assert_eq!(get_host("https://example.com/path").as_deref(), Some("example.com"));
        assert_eq!(get_host("https://example.com").as_deref(), Some("example.com"));
        assert_eq!(get_host("http://example.com:8080/path").as_deref(), Some("example.com"));
        assert_eq!(get_host("http://example.com?query=1/2").as_deref(), Some("example.com"));
        assert_eq!(get_host("//cdn.example.com/a.js").as_deref(), Some("cdn.example.com"));
        assert_eq!(get_host("stun:stun.example.org:3478").as_deref(), Some("stun.example.org"));
        assert_eq!(get_host("HTTPS://WWW.Example.COM/").as_deref(), Some("www.example.com"));
        assert_eq!(get_host("https://пример.рф/").as_deref(), Some("xn--e1afmkfd.xn--p1ai"));
        assert_eq!(get_host("").as_deref(), None);
        assert_eq!(get_host("no-scheme-here").as_deref(), None);
    }

    #[test]
    fn cropped_domain_name() {
        assert_eq!(get_cropped_domain_name("www.example.com"), "example.com");
        assert_eq!(get_cropped_domain_name("example.com"), "example.com");
        assert_eq!(get_cropped_domain_name("wwwexample.com"), "wwwexample.com");
    }

    #[test]
    fn second_level_domain() {
        assert_eq!(get_second_level_domain("example.com"), "example.com");
        assert_eq!(get_second_level_domain("a.b.example.com"), "example.com");
        assert_eq!(get_second_level_domain("www.bbc.co.uk"), "bbc.co.uk");
        assert_eq!(get_second_level_domain("co.uk"), "co.uk");
    }

    #[test]
    fn third_party_detection() {
        assert!(!is_third_party_request("https://cdn.example.com/a.js", "https://www.example.com/"));
        assert!(is_third_party_request("https://ads.tracker.net/a.js", "https://www.example.com/"));
        assert!(!is_third_party_request("https://a.bbc.co.uk/x", "https://b.bbc.co.uk/y"));
        assert!(is_third_party_request("https://bbc.co.uk/x", "https://itv.co.uk/y"));
        assert!(is_third_party_request("https://example.com/x", ""));
        assert!(!is_third_party_request("", ""));
    }

    #[test]
    fn punycode() {
        assert_eq!(to_punycode("example.com"), Ok(std::borrow::Cow::Borrowed("example.com")));
        assert_eq!(to_punycode("пример.рф").unwrap(), "xn--e1afmkfd.xn--p1ai");
        assert_eq!(to_punycode("München.de").unwrap(), "xn--mnchen-3ya.de");
    }
}

#[cfg(test)]
mod tests {
    use super::super::*;

    fn rule(text: &str, filter_id: u32) -> Arc<CssFilterRule> {
        Arc::new(CssFilterRule::parse(text, filter_id).unwrap())
    }

    fn filter(rules: &[&str]) -> CssFilter {
        let mut filter = CssFilter::default();
        filter.add_rules(rules.iter().map(|r| rule(r, 1)));
        filter
    }

    fn generic_hide() -> CssFilterOptions {
        CssFilterOptions::default() | CssFilterOptions::GENERIC_HIDE_APPLIED
    }

    #[test]
    fn element_hiding_stylesheet() {
        let filter = filter(&["##.banner"]);
        let stylesheets = filter.build_css("example.com", CssFilterOptions::default());
        assert_eq!(stylesheets.css, vec![".banner { display: none!important; }\r\n".to_string()]);
        assert!(stylesheets.extended_css.is_empty());
    }

    #[test]
    fn selectors_are_grouped_in_blocks() {
        let mut filter = CssFilter::new(2);
        filter.add_rules(["##.a", "##.b", "##.c"].iter().map(|r| rule(r, 1)));
        let css = filter.build_css("example.com", CssFilterOptions::default()).css;
        assert_eq!(
            css,
            vec![".a, .b { display: none!important; }\r\n.c { display: none!important; }\r\n".to_string()]
        );
    }

    #[test]
    fn blank_lines_do_not_break_selector_blocks() {
        let lines = ["##.a", "##", "##.b"];
        let mut filter = CssFilter::default();
        for rule in crate::lists::parse_rules(&lines, 1, Default::default()) {
            if let crate::filters::rule::Rule::Css(rule) = rule {
                filter.add_rule(rule);
            }
        }
        let css = filter.build_css("example.com", CssFilterOptions::default()).css;
        assert_eq!(css, vec![".a, .b { display: none!important; }\r\n".to_string()]);
    }

    #[test]
    fn injection_rules_are_separate() {
        let filter = filter(&[
            "##.banner",
            "#$#body { overflow: auto; }",
            "#$#html { color: red; }",
        ]);
        let css = filter.build_css("example.com", CssFilterOptions::default()).css;
        assert_eq!(css.len(), 2);
        assert_eq!(css[1], "body { overflow: auto; }\r\nhtml { color: red; }");
    }

    #[test]
    fn exception_rules() {
        let mut filter = filter(&["##.sponsored"]);
        let exception = rule("adguard.com#@#.sponsored", 1);

        let css = filter.build_css("adguard.com", CssFilterOptions::default()).css;
        let common_css = filter.build_css("", CssFilterOptions::default()).css;
        assert_eq!(css[0], common_css[0]);

        filter.add_rule(Arc::clone(&exception));
        let css = filter.build_css("adguard.com", CssFilterOptions::default()).css;
        let common_css = filter.build_css("", CssFilterOptions::default()).css;
        assert!(css.is_empty());
        assert!(common_css.is_empty());
        assert!(!filter.build_css("another.domain", CssFilterOptions::default()).css.is_empty());

        filter.remove_rule(&exception);
        let css = filter.build_css("adguard.com", CssFilterOptions::default()).css;
        let common_css = filter.build_css("", CssFilterOptions::default()).css;
        assert!(!css.is_empty());
        assert_eq!(css[0], common_css[0]);
        assert!(filter.rules().iter().all(|r| !r.domains().has_restricted_domains()));
    }

    #[test]
    fn generic_hide_exception_rules() {
        let mut filter = filter(&["##.generic-one"]);

        let css = filter.build_css("adguard.com", CssFilterOptions::default()).css;
        let common_css = filter.build_css("", CssFilterOptions::default()).css;
        assert_eq!(css[0], common_css[0]);

        filter.add_rule(rule("~google.com,~yahoo.com###generic", 1));
        let css = filter.build_css("adguard.com", CssFilterOptions::default()).css;
        let common_css = filter.build_css("", CssFilterOptions::default()).css;
        assert_eq!(css.len(), 2);
        assert_eq!(common_css.len(), 1);
        assert_eq!(css[0], common_css[0]);

        filter.add_rule(rule("adguard.com##.non-generic", 1));
        let css = filter.build_css("adguard.com", CssFilterOptions::default()).css;
        assert_eq!(css.len(), 2);
        assert_eq!(filter.build_css("another.domain", CssFilterOptions::default()).css.len(), 2);

        let exception = rule("adguard.com#@#.generic-one", 1);
        filter.add_rule(Arc::clone(&exception));
        let css = filter.build_css("adguard.com", CssFilterOptions::default()).css;
        assert_eq!(css.len(), 1);

        let css = filter.build_css("adguard.com", generic_hide()).css;
        assert_eq!(css.len(), 1);
        assert!(!css[0].contains("#generic"));
        assert!(css[0].contains(".non-generic"));
        // the restricted rule left the common stylesheet
        assert!(filter.build_css("", CssFilterOptions::default()).css.is_empty());
        let css = filter.build_css("another.domain", CssFilterOptions::default()).css;
        assert_eq!(css.len(), 1);
        assert!(css[0].contains(".generic-one"));

        filter.remove_rule(&exception);
        assert_eq!(filter.build_css("adguard.com", generic_hide()).css.len(), 1);
        assert_eq!(filter.build_css("", CssFilterOptions::default()).css.len(), 1);
        assert_eq!(filter.build_css("another.domain", CssFilterOptions::default()).css.len(), 2);

        filter.add_rule(rule("adguard.com#$#body { background-color: #111!important; }", 1));
        assert_eq!(filter.build_css("adguard.com", generic_hide()).css.len(), 2);
        assert_eq!(filter.build_css("", CssFilterOptions::default()).css.len(), 1);
        assert_eq!(filter.build_css("another.domain", CssFilterOptions::default()).css.len(), 2);
    }

    #[test]
    fn exception_on_domain_restricted_rule() {
        let filter = filter(&["example.com,example.org##.ad", "sub.example.com#@#.ad", "other.com#@#.ad"]);
        assert!(filter.build_css("sub.example.com", CssFilterOptions::default()).css.is_empty());
        assert_eq!(filter.build_css("www.example.com", CssFilterOptions::default()).css.len(), 1);
        assert_eq!(filter.build_css("example.org", CssFilterOptions::default()).css.len(), 1);
        assert!(filter.build_css("other.com", CssFilterOptions::default()).css.is_empty());
    }

    #[test]
    fn generic_exception_has_no_effect() {
        let filter = filter(&["##.ad", "#@#.ad"]);
        assert_eq!(filter.build_css("example.com", CssFilterOptions::default()).css.len(), 1);
    }

    #[test]
    fn extended_css_build() {
        let filter = filter(&[
            "adguard.com##.sponsored",
            "##.banner",
            "adguard.com##.sponsored[-ext-contains=test]",
        ]);

        let stylesheets = filter.build_css("adguard.com", CssFilterOptions::default());
        assert_eq!(filter.build_css("", CssFilterOptions::default()).css.len(), 1);
        assert_eq!(stylesheets.css.len(), 2);
        assert_eq!(stylesheets.extended_css.len(), 1);
        assert_eq!(
            stylesheets.extended_css[0],
            ".sponsored[-ext-contains=test] { display: none!important; }\r\n"
        );

        let stylesheets = filter.build_css("adguard.com", generic_hide());
        assert_eq!(stylesheets.css.len(), 1);
        assert_eq!(stylesheets.extended_css.len(), 1);

        let stylesheets = filter.build_css("adguard.com", CssFilterOptions::RETRIEVE_EXTCSS);
        assert!(stylesheets.css.is_empty());
        assert_eq!(stylesheets.extended_css.len(), 1);
    }

    #[test]
    fn injection_only() {
        let mut filter = filter(&[
            "adguard.com##.sponsored",
            "##.banner",
            "adguard.com##.sponsored[-ext-contains=test]",
        ]);
        let inject = rule("adguard.com##body:style(background:inherit;)", 1);
        assert!(inject.is_inject());
        assert!(!inject.is_extended_css());
        filter.add_rule(inject);

        let options = CssFilterOptions::default() | CssFilterOptions::CSS_INJECTION_ONLY;
        let stylesheets = filter.build_css("adguard.com", options);
        assert_eq!(stylesheets.css, vec!["body { background:inherit; }".to_string()]);
        assert_eq!(stylesheets.extended_css.len(), 1);
        assert_eq!(filter.build_css("", CssFilterOptions::default()).css.len(), 1);

        let exception = rule("adguard.com#@$#.sponsored { display: none!important;}", 1);
        assert!(exception.is_inject());
        assert!(exception.is_whitelist());
        filter.add_rule(exception);
        let stylesheets = filter.build_css("adguard.com", options);
        assert_eq!(stylesheets.css.len(), 1);
        assert_eq!(stylesheets.extended_css.len(), 1);
    }

    #[test]
    fn css_hits() {
        let mut filter = CssFilter::default();
        filter.add_rule(rule("adguard.com##.sponsored", 1));
        filter.add_rule(rule("##.banner", 2));
        filter.add_rule(rule("adguard.com##.sponsored[-ext-contains=test]", 1));

        let banner = ".banner { display: none!important; content: 'adguard2%3B%23%23.banner' !important;}\r\n";
        let sponsored =
            ".sponsored { display: none!important; content: 'adguard1%3Badguard.com%23%23.sponsored' !important;}\r\n";
        let extended = ".sponsored[-ext-contains=test] { display: none!important; content: 'adguard1%3Badguard.com%23%23.sponsored%5B-ext-contains%3Dtest%5D' !important;}\r\n";

        let stylesheets = filter.build_css_hits("adguard.com", CssFilterOptions::default());
        assert_eq!(stylesheets.css, vec![banner.to_string(), sponsored.to_string()]);
        assert_eq!(stylesheets.extended_css, vec![extended.to_string()]);
        assert_eq!(
            filter.build_css_hits("", CssFilterOptions::default()).css,
            vec![banner.to_string()]
        );

        let stylesheets = filter.build_css_hits("adguard.com", generic_hide());
        assert_eq!(stylesheets.css, vec![sponsored.to_string()]);
        assert_eq!(stylesheets.extended_css, vec![extended.to_string()]);
    }

    #[test]
    fn css_hits_injection_rules() {
        let mut filter = CssFilter::default();
        filter.add_rule(rule("example.com#$#body { color: red }", 3));
        filter.add_rule(rule("example.com#$#html { content: 'x'; }", 3));
        filter.add_rule(rule("example.com##.user", USER_FILTER_ID));

        let css = filter.build_css_hits("example.com", CssFilterOptions::default()).css;
        assert_eq!(
            css,
            vec![
                "body { color: red; content: 'adguard3%3Bexample.com%23%24%23body%20%7B%20color%3A%20red%20%7D' !important;}\r\n"
                    .to_string(),
                "html { content: 'x'; }".to_string(),
                ".user { display: none!important; }\r\n".to_string(),
            ]
        );
    }

    #[test]
    fn options_serialization() {
        assert_eq!(
            CssFilterOptions::default(),
            CssFilterOptions::RETRIEVE_TRADITIONAL_CSS | CssFilterOptions::RETRIEVE_EXTCSS
        );
        let stylesheets = CssStylesheets {
            css: vec!["a".to_string()],
            extended_css: vec![],
        };
        let json = serde_json::to_string(&stylesheets).unwrap();
        assert_eq!(serde_json::from_str::<CssStylesheets>(&json).unwrap(), stylesheets);
    }
}

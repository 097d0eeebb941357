#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn detects_rule_types() {
        assert_eq!(detect_rule_type(""), RuleType::Empty);
        assert_eq!(detect_rule_type("   "), RuleType::Empty);
        assert_eq!(detect_rule_type("! Title: list"), RuleType::Comment);
        assert_eq!(detect_rule_type("[Adblock Plus 2.0]"), RuleType::Comment);
        assert_eq!(detect_rule_type("# hosts style comment"), RuleType::Comment);

        assert_eq!(detect_rule_type("||example.com^"), RuleType::Url);
        assert_eq!(detect_rule_type("@@||example.com^$document"), RuleType::Url);
        assert_eq!(detect_rule_type("/banner\\d+/"), RuleType::Url);
        assert_eq!(detect_rule_type("||example.com/page#anchor"), RuleType::Url);

        assert_eq!(detect_rule_type("##.banner"), RuleType::Css);
        assert_eq!(detect_rule_type("example.com#@#.banner"), RuleType::Css);
        assert_eq!(detect_rule_type("example.com#$#body { overflow: auto; }"), RuleType::Css);
        assert_eq!(detect_rule_type("example.com#?#div:has(> .ad)"), RuleType::Css);

        assert_eq!(detect_rule_type("example.com#%#window.a = 1;"), RuleType::Script);
        assert_eq!(detect_rule_type("example.com#@%#window.a = 1;"), RuleType::Script);

        assert_eq!(detect_rule_type("example.com$$script[data-ad]"), RuleType::NotSupported);
        assert_eq!(detect_rule_type("example.com$@$script[data-ad]"), RuleType::NotSupported);
        assert_eq!(
            detect_rule_type("example.com#%#//scriptlet('abort-on-property-read', 'ads')"),
            RuleType::NotSupported
        );
    }

    #[test]
    fn parses_each_family() {
        let rule = parse_rule("  ||example.com^$script  ", 3, ScriptSource::Local).unwrap();
        assert!(matches!(rule, Rule::Url(_)));
        assert_eq!(rule.rule_text(), "||example.com^$script");
        assert_eq!(rule.filter_id(), 3);

        let rule = parse_rule("example.com##.banner", 3, ScriptSource::Local).unwrap();
        assert!(matches!(rule, Rule::Css(_)));

        let rule = parse_rule("example.com#%#window.a = 1;", 3, ScriptSource::Remote).unwrap();
        match rule {
            Rule::Script(rule) => assert_eq!(rule.script_source(), ScriptSource::Remote),
            _ => panic!("expected a script rule"),
        }
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(parse_rule("", 1, ScriptSource::Local), Err(RuleParseError::Empty)));
        assert!(matches!(
            parse_rule("! comment", 1, ScriptSource::Local),
            Err(RuleParseError::Comment)
        ));
        assert!(matches!(
            parse_rule("example.com$$div", 1, ScriptSource::Local),
            Err(RuleParseError::NotSupported)
        ));
        assert!(matches!(
            parse_rule("||example.com^$unknown-option", 1, ScriptSource::Local),
            Err(RuleParseError::Url(UrlFilterError::UnknownOption(_)))
        ));
        assert!(matches!(
            parse_rule("example.com##", 1, ScriptSource::Local),
            Err(RuleParseError::Css(CssFilterError::EmptySelector))
        ));
        assert!(matches!(
            parse_rule("example.com##div:unknown-class", 1, ScriptSource::Local),
            Err(RuleParseError::Css(CssFilterError::UnknownPseudoClass(_)))
        ));
        assert!(matches!(
            parse_rule("example.com#%#   ", 1, ScriptSource::Local),
            Err(RuleParseError::Script(ScriptFilterError::EmptyScript))
        ));
    }

    #[test]
    fn parse_rules_drops_invalid_lines() {
        let lines = [
            "! Title: test list",
            "",
            "||ads.example.com^",
            "||example.com^$unknown-option",
            "##.banner",
            "##",
            "example.com#%#window.a = 1;",
            "example.com$$div",
        ];
        let rules = parse_rules(&lines, 2, ScriptSource::Local);
        let texts: Vec<_> = rules.iter().map(|r| r.rule_text()).collect();
        assert_eq!(texts, vec!["||ads.example.com^", "##.banner", "example.com#%#window.a = 1;"]);
        assert!(rules.iter().all(|r| r.filter_id() == 2));
    }

    #[test]
    fn filter_lists() {
        let lists: Vec<FilterList> = serde_json::from_str(
            r#"[
                {"id": 0, "rules": ["@@||example.com^"]},
                {"id": 2, "rules": ["||ads.net^", "ads.net#%#window.a = 1;"], "script_source": "remote"}
            ]"#,
        )
        .unwrap();
        assert_eq!(lists[0], FilterList::new(0, vec!["@@||example.com^".to_string()]));
        assert_eq!(lists[1].script_source, ScriptSource::Remote);

        let rules = parse_filter_lists(&lists);
        assert_eq!(rules.len(), 3);
        assert!(rules[0].is_whitelist());
        assert_eq!(rules[1].filter_id(), 2);
        match &rules[2] {
            Rule::Script(rule) => assert_eq!(rule.script_source(), ScriptSource::Remote),
            _ => panic!("expected a script rule"),
        }
    }
}

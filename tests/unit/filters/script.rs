#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn script_rule() {
        let rule = ScriptFilterRule::parse(
            "example.org,~sub.example.org#%#window.__gaq = undefined;",
            3,
            ScriptSource::Remote,
        )
        .unwrap();
        assert_eq!(rule.script(), "window.__gaq = undefined;");
        assert!(!rule.is_whitelist());
        assert_eq!(rule.script_source(), ScriptSource::Remote);
        assert_eq!(rule.filter_id(), 3);
        assert!(rule.is_permitted("www.example.org"));
        assert!(!rule.is_permitted("sub.example.org"));
        assert!(!rule.is_permitted("example.com"));
        assert!(!rule.is_generic());
    }

    #[test]
    fn exception_rule() {
        let rule = ScriptFilterRule::parse("example.org#@%#window.__gaq = undefined;", 1, ScriptSource::Local).unwrap();
        assert!(rule.is_whitelist());
        assert_eq!(rule.script(), "window.__gaq = undefined;");
    }

    #[test]
    fn generic_script_rule() {
        let rule = ScriptFilterRule::parse("#%#console.log('#%#')", 1, ScriptSource::Local).unwrap();
        assert!(rule.is_generic());
        assert_eq!(rule.script(), "console.log('#%#')");
        assert!(rule.is_permitted("any.com"));
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            ScriptFilterRule::parse("example.org##.banner", 1, ScriptSource::Local).err(),
            Some(ScriptFilterError::MissingMarker)
        );
        assert_eq!(
            ScriptFilterRule::parse("example.org#%#", 1, ScriptSource::Local).err(),
            Some(ScriptFilterError::EmptyScript)
        );
        assert_eq!(
            ScriptFilterRule::parse("example.org#@%#  ", 1, ScriptSource::Local).err(),
            Some(ScriptFilterError::EmptyScript)
        );
    }

    #[test]
    fn script_source_serde() {
        assert_eq!(ScriptSource::default(), ScriptSource::Local);
        assert_eq!(serde_json::to_string(&ScriptSource::Remote).unwrap(), "\"remote\"");
    }
}

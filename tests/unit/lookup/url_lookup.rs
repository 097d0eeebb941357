#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::request::RequestType;

    fn rule(text: &str) -> Arc<UrlFilterRule> {
        Arc::new(UrlFilterRule::parse(text, 1).unwrap())
    }

    fn table(rules: &[&str]) -> UrlFilterRuleLookupTable {
        let mut table = UrlFilterRuleLookupTable::default();
        for r in rules {
            table.add_rule(rule(r));
        }
        table
    }

    fn find(table: &UrlFilterRuleLookupTable, url: &str, document: &str, request_type: RequestType) -> Option<String> {
        let request = Request::new(url, document, request_type);
        table
            .find_rule(&request, request_type.into(), true)
            .map(|r| r.rule_text().to_string())
    }

    #[test]
    fn every_index_is_searched() {
        let table = table(&[
            "||ads.example.com^",
            "$script,domain=news.com",
            "/ad.",
        ]);
        assert_eq!(table.rules().len(), 3);

        assert_eq!(
            find(&table, "https://ads.example.com/a.js", "https://site.com/", RequestType::Script),
            Some("||ads.example.com^".to_string())
        );
        assert_eq!(
            find(&table, "https://cdn.com/lib.js", "https://www.news.com/", RequestType::Script),
            Some("$script,domain=news.com".to_string())
        );
        assert_eq!(
            find(&table, "https://cdn.com/lib.js", "https://www.news.com/", RequestType::Image),
            None
        );
        assert_eq!(
            find(&table, "https://cdn.com/ad.png", "https://site.com/", RequestType::Image),
            Some("/ad.".to_string())
        );
        assert_eq!(find(&table, "", "https://site.com/", RequestType::Image), None);
    }

    #[test]
    fn wildcard_domain_rules_stay_reachable() {
        let table = table(&["$script,domain=example.*|foo.com"]);
        for document in ["https://foo.com/", "https://example.org/", "https://www.example.co.uk/"] {
            assert_eq!(
                find(&table, "https://cdn.net/ad.js", document, RequestType::Script),
                Some("$script,domain=example.*|foo.com".to_string()),
                "{}",
                document
            );
        }
        assert_eq!(find(&table, "https://cdn.net/ad.js", "https://bar.com/", RequestType::Script), None);
    }

    #[test]
    fn document_level_rules_come_first() {
        let table = table(&["@@||example.com^", "@@||example.com^$document"]);
        assert_eq!(
            find(&table, "https://example.com/", "", RequestType::Document),
            Some("@@||example.com^$document".to_string())
        );
        assert_eq!(
            find(&table, "https://example.com/a.js", "https://example.com/", RequestType::Script),
            Some("@@||example.com^".to_string())
        );
    }

    #[test]
    fn generic_rules_can_be_disabled() {
        let table = table(&["||ads.example.com^", "||ads.example.com^$domain=site.com"]);
        let request = Request::new("https://ads.example.com/a.js", "https://site.com/", RequestType::Script);
        let found = table.find_rule(&request, ContentType::SCRIPT, false).unwrap();
        assert_eq!(found.rule_text(), "||ads.example.com^$domain=site.com");

        let request = Request::new("https://ads.example.com/a.js", "https://other.com/", RequestType::Script);
        assert!(table.find_rule(&request, ContentType::SCRIPT, false).is_none());
        assert!(table.find_rule(&request, ContentType::SCRIPT, true).is_some());
    }

    #[test]
    fn remove_and_clear() {
        let mut table = table(&["||ads.example.com^", "$script,domain=news.com", "/ad."]);
        table.remove_rule(&UrlFilterRule::parse("$script,domain=news.com", 1).unwrap());
        table.remove_rule(&UrlFilterRule::parse("/ad.", 1).unwrap());
        assert_eq!(table.rules().len(), 1);
        assert_eq!(
            find(&table, "https://cdn.com/lib.js", "https://www.news.com/", RequestType::Script),
            None
        );
        table.clear_rules();
        assert!(table.rules().is_empty());
    }
}

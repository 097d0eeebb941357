#[cfg(test)]
mod tests {
    use super::super::*;

    fn rule(text: &str) -> Arc<UrlFilterRule> {
        Arc::new(UrlFilterRule::parse(text, 1).unwrap())
    }

    #[test]
    fn only_rules_with_permitted_domains_are_indexed() {
        let mut table = DomainsLookupTable::default();
        assert!(!table.add_rule(&rule("ads$script,domain=~example.org")));
        assert!(!table.add_rule(&rule("$script,domain=example.*")));
        assert!(!table.add_rule(&rule("$script,domain=example.*|foo.com")));
        assert!(table.add_rule(&rule("$script,domain=example.org|example.com")));
        assert_eq!(table.rules().len(), 1);
    }

    #[test]
    fn lookup_walks_parent_domains() {
        let mut table = DomainsLookupTable::default();
        table.add_rule(&rule("$script,domain=example.org"));
        table.add_rule(&rule("$image,domain=sub.example.org|example.org"));
        table.add_rule(&rule("$image,domain=other.org"));

        let found = table.lookup_rules("www.sub.example.org");
        assert_eq!(found.len(), 2);

        let found = table.lookup_rules("example.org");
        assert_eq!(found.len(), 2);

        assert!(table.lookup_rules("notexample.org").is_empty());
        assert!(table.lookup_rules("").is_empty());
    }

    #[test]
    fn remove_rule_from_every_key() {
        let mut table = DomainsLookupTable::default();
        let r = rule("$image,domain=a.com|b.com");
        table.add_rule(&r);
        assert!(table.remove_rule(&r));
        assert!(table.is_empty());
        assert!(table.lookup_rules("b.com").is_empty());
    }
}

/// Repeated `WITH key=value` option clauses
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Characters allowed in an option value.
pub(crate) const OPT_VALUE: &str = r#"[\w/\.\*,;:'"-]+"#;

/// Leading separator before each `WITH`: whitespace, or a comma with
/// whitespace on at least one side.
pub(crate) const OPT_SEPARATOR: &str = r"(?:\s+|\s*,\s+|\s+,\s*)";

fn leading_option() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(r"(?i)^{}WITH\s+([\w\-]+)\s*=\s*({})", OPT_SEPARATOR, OPT_VALUE);
        Regex::new(&pattern).expect("option pattern is valid")
    })
}

/// Values given for one option key, in the order they appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptValues(Vec<String>);

impl OptValues {
    /// First value, or "" when there is none.
    pub fn first(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or("")
    }

    /// First value read as a flag. `strong` counts as true so that
    /// `CONSISTENTREAD=strong` reads naturally.
    pub fn first_bool(&self) -> bool {
        matches!(
            self.first().trim().to_lowercase().as_str(),
            "true" | "1" | "t" | "yes" | "on" | "strong"
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Option mapping keyed by upper-cased option name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    values: HashMap<String, OptValues>,
}

impl Options {
    /// Consumes leading ` WITH key=value` fragments until one fails to match.
    ///
    /// Never fails; anything after the last matching fragment is ignored.
    pub fn parse(text: &str) -> Self {
        let re = leading_option();
        let mut options = Options::default();
        let mut rest = text;

        while let Some(caps) = re.captures(rest) {
            let key = caps[1].trim().to_uppercase();
            let value = caps[2].trim();
            let value = value.strip_suffix(',').unwrap_or(value).to_string();
            options.values.entry(key).or_default().0.push(value);
            rest = &rest[caps[0].len()..];
        }

        options
    }

    /// Looks a key up case-insensitively.
    pub fn get(&self, key: &str) -> Option<&OptValues> {
        self.values.get(&key.to_uppercase())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// First value of `key`, if the key was given.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).map(OptValues::first)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_multiple_options() {
        let opts = Options::parse(" WITH pk=id:string, WITH sk=ts:number WITH rcu=3");
        assert_eq!(opts.first("PK"), Some("id:string"));
        assert_eq!(opts.first("SK"), Some("ts:number"));
        assert_eq!(opts.first("RCU"), Some("3"));
        assert_eq!(opts.len(), 3);
    }

    #[test]
    fn test_separators() {
        for text in [" WITH a=1 , WITH b=2", " WITH a=1 ,WITH b=2", " WITH a=1, WITH b=2"] {
            let opts = Options::parse(text);
            assert_eq!(opts.first("a"), Some("1"), "{}", text);
            assert_eq!(opts.first("b"), Some("2"), "{}", text);
        }
    }

    #[test]
    fn test_repeated_keys_keep_order() {
        let opts = Options::parse(" WITH LSI=i1:a:S WITH lsi=i2:b:N:* WITH Lsi=i3:c:B:x,y");
        let lsi: Vec<&str> = opts.get("lsi").unwrap().iter().collect();
        assert_eq!(lsi, vec!["i1:a:S", "i2:b:N:*", "i3:c:B:x,y"]);
    }

    #[test]
    fn test_stops_at_first_non_matching_fragment() {
        let opts = Options::parse(" WITH a=1 garbage WITH b=2");
        assert_eq!(opts.first("a"), Some("1"));
        assert!(!opts.contains("b"));
    }

    #[test]
    fn test_requires_leading_separator() {
        assert!(Options::parse("WITH a=1").is_empty());
        assert!(Options::parse("").is_empty());
    }

    #[test]
    fn test_first_bool() {
        let opts = Options::parse(" WITH consistentread=strong WITH other=false");
        assert!(opts.get("CONSISTENTREAD").unwrap().first_bool());
        assert!(!opts.get("OTHER").unwrap().first_bool());
        assert_eq!(OptValues::default().first(), "");
    }

    proptest! {
        #[test]
        fn prop_key_case_does_not_matter(key in "[a-zA-Z][a-zA-Z_]{0,10}", value in "[a-z0-9]{1,8}") {
            let lower = Options::parse(&format!(" WITH {}={}", key.to_lowercase(), value));
            let upper = Options::parse(&format!(" WITH {}={}", key.to_uppercase(), value));
            prop_assert_eq!(lower, upper);
        }
    }
}

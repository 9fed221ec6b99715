use crate::patterns::{PatternRegistry, DEFAULT_REGISTRY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// MailScanner header names seen so far, stored lowercase.
///
/// Only ever grows. Deserializing normalizes case and drops duplicates, so
/// a hand-edited list cannot introduce two spellings of one header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct LearnedHeaderSet {
    names: BTreeSet<String>,
}

impl LearnedHeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&normalize(name))
    }

    /// Returns false when the name was already known.
    pub fn insert(&mut self, name: &str) -> bool {
        let name = normalize(name);
        if name.is_empty() {
            return false;
        }
        self.names.insert(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }
}

impl From<Vec<String>> for LearnedHeaderSet {
    fn from(names: Vec<String>) -> Self {
        let mut set = Self::new();
        for name in &names {
            set.insert(name);
        }
        set
    }
}

impl From<LearnedHeaderSet> for Vec<String> {
    fn from(set: LearnedHeaderSet) -> Self {
        set.names.into_iter().collect()
    }
}

impl<'a> FromIterator<&'a str> for LearnedHeaderSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = Self::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Name of the MailScanner header in this blob if it is not in `learned` yet.
///
/// Recording the name is the caller's job; until it does, the same blob keeps
/// reporting the same name.
pub fn observe(header_blob: &str, learned: &LearnedHeaderSet) -> Option<String> {
    observe_with(&DEFAULT_REGISTRY, header_blob, learned)
}

pub fn observe_with(
    registry: &PatternRegistry,
    header_blob: &str,
    learned: &LearnedHeaderSet,
) -> Option<String> {
    let family = registry.dynamic_family();
    if !family.is_match(header_blob) {
        return None;
    }

    let name = normalize(family.header_name(header_blob)?);
    if learned.contains(&name) {
        log::debug!("MailScanner header {} already known", name);
        return None;
    }

    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_header_reported_once() {
        let blob = "Subject: x\r\nX-Custom-MailScanner-SpamCheck: yes\r\n";
        let mut learned = LearnedHeaderSet::new();

        let first = observe(blob, &learned);
        assert_eq!(first.as_deref(), Some("x-custom-mailscanner-spamcheck"));
        assert!(learned.insert(&first.unwrap()));

        assert_eq!(observe(blob, &learned), None);
        assert_eq!(learned.len(), 1);
    }

    #[test]
    fn test_case_insensitive_membership() {
        let learned: LearnedHeaderSet = ["X-CUSTOM-MAILSCANNER-SPAMCHECK"].into_iter().collect();
        assert!(learned.contains("x-custom-mailscanner-spamcheck"));
        assert_eq!(
            observe("x-custom-mailscanner-spamcheck: not spam", &learned),
            None
        );
        assert_eq!(
            observe("X-Custom-MailScanner-SpamCheck: not spam", &learned),
            None
        );
    }

    #[test]
    fn test_other_family_ignored() {
        let mut learned = LearnedHeaderSet::new();
        let blob = "X-Spam-Score: 7.2\r\nX-Spam-Status: Yes, score=7.2";
        assert_eq!(observe(blob, &learned), None);

        learned.insert("x-spam-score");
        assert_eq!(observe(blob, &learned), None);
    }

    #[test]
    fn test_plain_mailscanner_header() {
        let learned = LearnedHeaderSet::new();
        let blob = "X-MailScanner-SpamCheck: not spam, SpamAssassin (score=0.1, required 5)";
        assert_eq!(
            observe(blob, &learned).as_deref(),
            Some("x-mailscanner-spamcheck")
        );
    }

    #[test]
    fn test_distinct_variants_learned_separately() {
        let mut learned = LearnedHeaderSet::new();
        for blob in [
            "X-Acme-MailScanner-SpamCheck: not spam",
            "X-Example-Org-MailScanner-SpamCheck: spam",
            "X-Acme-MailScanner-SpamCheck: spam",
        ] {
            if let Some(name) = observe(blob, &learned) {
                learned.insert(&name);
            }
        }
        assert_eq!(
            learned.to_vec(),
            vec![
                "x-acme-mailscanner-spamcheck".to_string(),
                "x-example-org-mailscanner-spamcheck".to_string(),
            ]
        );
    }

    #[test]
    fn test_set_never_duplicates() {
        let mut learned = LearnedHeaderSet::new();
        assert!(learned.insert("X-A-MailScanner-SpamCheck"));
        assert!(!learned.insert("x-a-mailscanner-spamcheck"));
        assert!(!learned.insert("  X-A-MAILSCANNER-SPAMCHECK "));
        assert!(!learned.insert(""));
        assert_eq!(learned.len(), 1);
    }

    #[test]
    fn test_deserialize_normalizes() {
        let learned: LearnedHeaderSet = serde_json::from_str(
            r#"["X-B-MailScanner-SpamCheck", "x-b-mailscanner-spamcheck", "x-a-mailscanner-spamcheck"]"#,
        )
        .unwrap();
        assert_eq!(
            learned.iter().collect::<Vec<_>>(),
            vec!["x-a-mailscanner-spamcheck", "x-b-mailscanner-spamcheck"]
        );
        assert_eq!(
            serde_json::to_string(&learned).unwrap(),
            r#"["x-a-mailscanner-spamcheck","x-b-mailscanner-spamcheck"]"#
        );
    }
}

use crate::patterns::{PatternRegistry, DEFAULT_REGISTRY};
use serde::Serialize;
use std::fmt;

/// A spam score found in a message header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    /// Token as it appeared in the header, whitespace removed.
    pub raw: String,
    pub value: f64,
    /// Registry id of the convention that produced it.
    pub source: &'static str,
}

impl Score {
    /// Parses a captured token. Anything that is not a finite number yields `None`.
    pub fn parse(source: &'static str, token: &str) -> Option<Self> {
        let raw: String = token.chars().filter(|c| !c.is_whitespace()).collect();
        let value = raw.parse::<f64>().ok().filter(|v| v.is_finite())?;
        Some(Self { raw, value, source })
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Header section of a raw message: everything before the first blank line.
pub fn header_section(raw_message: &str) -> &str {
    let crlf = raw_message.find("\r\n\r\n");
    let lf = raw_message.find("\n\n");
    let end = match (crlf, lf) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => raw_message.len(),
    };
    &raw_message[..end]
}

/// Score from the built-in conventions.
pub fn extract_score(header_blob: &str) -> Option<Score> {
    extract_score_with(&DEFAULT_REGISTRY, header_blob)
}

/// The first convention in registry order that matches decides the outcome,
/// even when its token turns out not to be a number.
pub fn extract_score_with(registry: &PatternRegistry, header_blob: &str) -> Option<Score> {
    for pattern in registry.iter() {
        let Some(token) = pattern.capture_score(header_blob) else {
            continue;
        };

        return match Score::parse(pattern.id, token) {
            Some(score) => {
                log::debug!("Score {} found via {}", score.raw, pattern.id);
                Some(score)
            }
            None => {
                log::debug!("Unparseable score token {:?} from {}", token, pattern.id);
                None
            }
        };
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(blob: &str) -> Option<f64> {
        extract_score(blob).map(|s| s.value)
    }

    #[test]
    fn test_each_convention() {
        let cases = [
            (
                "X-Acme-MailScanner-SpamCheck: spam, SpamAssassin (score=12.5, required 5)",
                12.5,
                "mailscanner_spamcheck",
            ),
            (
                "X-MailScanner-SpamCheck: nicht spam, SpamAssassin (Wertung=-1.2, benoetigt 5)",
                -1.2,
                "mailscanner_spamcheck",
            ),
            ("X-hMailServer-Reason-Score: 3", 3.0, "hmailserver_reason_score"),
            (
                "X-Spamd-Result: default: False [4.60 / 15.00];\r\n\tBAYES_HAM(-3.00)[99.99%]",
                4.6,
                "spamd_result",
            ),
            ("X-Spam-Score: 7.2", 7.2, "spam_score"),
            (
                "X-Spam-Status: Yes, score=8.1 required=5.0 tests=HTML_MESSAGE",
                8.1,
                "spam_status",
            ),
            ("X-Spam-Status: No, hits=-0.4 required=5.0", -0.4, "spam_status"),
            (
                "X-Spam-Report: Content analysis details:   (6.3 points, 5.0 required)",
                6.3,
                "spam_report",
            ),
            ("X-Rspamd-Score: -2.35", -2.35, "rspamd_score"),
            ("X-VR-SPAMSCORE: 150", 150.0, "vr_spamscore"),
        ];

        for (blob, expected, source) in cases {
            let score = extract_score(blob).unwrap_or_else(|| panic!("no score for {blob}"));
            assert_eq!(score.value, expected, "{blob}");
            assert_eq!(score.source, source, "{blob}");
        }
    }

    #[test]
    fn test_case_insensitive_header_names() {
        let variants = [
            "X-Spam-Score: 7.2",
            "x-spam-score: 7.2",
            "X-SPAM-SCORE: 7.2",
            "x-SpAm-ScOrE: 7.2",
        ];
        for blob in variants {
            assert_eq!(value(blob), Some(7.2), "{blob}");
        }
    }

    #[test]
    fn test_whitespace_in_token() {
        assert_eq!(value("X-Spam-Score:\t  7.2  "), Some(7.2));
        assert_eq!(value("X-Spam-Score: - 3.5"), Some(-3.5));
        assert_eq!(value("X-Spam-Score:7.2"), Some(7.2));
        assert_eq!(value("X-Rspamd-Score: 1.5E1"), Some(15.0));
    }

    #[test]
    fn test_no_score() {
        assert_eq!(extract_score(""), None);
        assert_eq!(
            extract_score("From: a@example.com\r\nSubject: hello\r\nX-Mailer: test"),
            None
        );
        assert_eq!(extract_score("X-Spam-Score: high"), None);
    }

    #[test]
    fn test_unparseable_token_is_none() {
        assert_eq!(extract_score("X-Spam-Score: 1.2.3"), None);
        assert_eq!(extract_score("X-Spam-Score: ."), None);
    }

    #[test]
    fn test_first_match_wins() {
        let blob = "X-Spam-Status: Yes, score=9.9 required=5.0\r\nX-Spam-Score: 1.1\r\nX-Rspamd-Score: 4.4";
        let score = extract_score(blob).unwrap();
        assert_eq!(score.source, "spam_score");
        assert_eq!(score.value, 1.1);

        let blob = "X-Rspamd-Score: 4.4\r\nX-Example-MailScanner-SpamCheck: not spam (score=0.3, required 5)";
        assert_eq!(extract_score(blob).unwrap().source, "mailscanner_spamcheck");
    }

    #[test]
    fn test_raw_token_preserved() {
        let score = extract_score("X-Spam-Score: 07.20").unwrap();
        assert_eq!(score.raw, "07.20");
        assert_eq!(score.to_string(), "07.20");
        assert_eq!(score.value, 7.2);
    }

    #[test]
    fn test_header_section() {
        let raw = "Subject: a\r\nX-Spam-Score: 1\r\n\r\nX-Spam-Score: 9\r\n";
        assert_eq!(header_section(raw), "Subject: a\r\nX-Spam-Score: 1");
        assert_eq!(header_section("A: b\n\nbody"), "A: b");
        assert_eq!(header_section("A: b"), "A: b");
        assert_eq!(value(header_section(raw)), Some(1.0));
    }

    #[test]
    fn test_body_is_not_scanned_after_split() {
        let raw = "From: a@b.c\r\n\r\nX-Spam-Score: 9\r\n";
        assert_eq!(extract_score(header_section(raw)), None);
    }
}

use lazy_static::lazy_static;
use regex::Regex;

/// Numeric score token. Whitespace after the sign is tolerated and stripped
/// before parsing.
const NUMBER: &str = r"[-+]?[ \t]*[\d.]+(?:e[-+]?\d+)?";

/// Anything up to the end of a header value, including folded continuation lines.
const FOLDED: &str = r"(?:[^\n]|\n[ \t])*?";

/// Identifier of the MailScanner convention, whose header name carries a
/// per-site prefix (`X-<Org>-MailScanner-SpamCheck`).
pub const MAILSCANNER_SPAMCHECK: &str = "mailscanner_spamcheck";

lazy_static! {
    /// Built-in scanner conventions in match priority order.
    pub static ref DEFAULT_REGISTRY: PatternRegistry =
        PatternRegistry::builtin().expect("built-in score patterns must compile");
}

/// One scanner convention: the header name family plus the rule that pulls the
/// score token out of that header.
#[derive(Debug, Clone)]
pub struct ScorePattern {
    pub id: &'static str,
    family: Regex,
    score: Regex,
}

impl ScorePattern {
    /// `name` is a regex fragment for the header name, `value` a fragment for
    /// what follows the colon with the score token in capture group 1.
    pub fn new(id: &'static str, name: &str, value: &str) -> Result<Self, regex::Error> {
        let family = Regex::new(&format!(r"(?im)^({name})[ \t]*:"))?;
        let score = Regex::new(&format!(r"(?im)^(?:{name})[ \t]*:{value}"))?;
        Ok(Self { id, family, score })
    }

    /// True when the blob carries a header of this family, score or not.
    pub fn is_match(&self, header_blob: &str) -> bool {
        self.family.is_match(header_blob)
    }

    /// Name of the first header of this family, as written in the message.
    /// When several are present the earliest one is returned, not the last.
    pub fn header_name<'a>(&self, header_blob: &'a str) -> Option<&'a str> {
        self.family
            .captures(header_blob)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Raw score token of the first matching header.
    pub fn capture_score<'a>(&self, header_blob: &'a str) -> Option<&'a str> {
        self.score
            .captures(header_blob)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|token| !token.trim().is_empty())
    }
}

/// Ordered set of scanner conventions. Earlier entries win when a message
/// carries several score headers.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    patterns: Vec<ScorePattern>,
    dynamic: usize,
}

impl PatternRegistry {
    pub fn builtin() -> Result<Self, regex::Error> {
        let mailscanner_keys =
            "score|punteggio|puntuació|sgor/score|skore|wertung|bedømmelse|puntaje|pont|escore|resultat";

        let patterns = vec![
            ScorePattern::new(
                MAILSCANNER_SPAMCHECK,
                r"x-[^:\s]*?mailscanner-spamcheck",
                &format!(r"{FOLDED}\b(?:{mailscanner_keys})[ \t]*=[ \t]*({NUMBER})"),
            )?,
            ScorePattern::new(
                "hmailserver_reason_score",
                r"x-hmailserver-reason-score",
                &format!(r"[ \t]*({NUMBER})"),
            )?,
            ScorePattern::new(
                "spamd_result",
                r"x-spamd-result",
                &format!(r"{FOLDED}\[[ \t]*({NUMBER})[ \t]*/"),
            )?,
            ScorePattern::new(
                "spam_score",
                r"x-spam-score",
                &format!(r"[ \t]*({NUMBER})"),
            )?,
            ScorePattern::new(
                "spam_status",
                r"x-spam-status",
                &format!(r"{FOLDED}\b(?:score|hits)[ \t]*=[ \t]*({NUMBER})"),
            )?,
            ScorePattern::new(
                "spam_report",
                r"x-spam-report",
                &format!(r"{FOLDED}\([ \t]*({NUMBER})[ \t]+points\b"),
            )?,
            ScorePattern::new(
                "rspamd_score",
                r"x-rspamd-score",
                &format!(r"[ \t]*({NUMBER})"),
            )?,
            ScorePattern::new(
                "vr_spamscore",
                r"x-vr-spamscore",
                &format!(r"[ \t]*({NUMBER})"),
            )?,
        ];

        Ok(Self {
            patterns,
            dynamic: 0,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScorePattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ScorePattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    /// Family membership test, independent of whether a score is present.
    pub fn is_member(&self, id: &str, header_blob: &str) -> bool {
        self.get(id).is_some_and(|p| p.is_match(header_blob))
    }

    /// The convention whose header names are learned at runtime.
    pub fn dynamic_family(&self) -> &ScorePattern {
        &self.patterns[self.dynamic]
    }
}

//! The in-buffer command palette: a static catalog of `/tokens`, prefix
//! filtering for suggestions, and macro expansion at submit time.

use std::sync::LazyLock;

use chrono::{DateTime, Days, Local};
use regex::Regex;

/// First character of every command token
pub const COMMAND_PREFIX: char = '/';

/// What a command token turns into when the prompt is submitted
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Expansion {
    /// Current local time rendered with a `strftime` pattern
    Clock(&'static str),
    /// Tomorrow's date rendered with a `strftime` pattern
    Tomorrow(&'static str),
    /// A fixed phrase
    Phrase(&'static str),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Suggestion {
    pub token: &'static str,
    pub label: &'static str,
    pub expansion: Expansion,
}

pub static CATALOG: &[Suggestion] = &[
    Suggestion {
        token: "/date",
        label: "Today's date",
        expansion: Expansion::Clock("%Y-%m-%d"),
    },
    Suggestion {
        token: "/datetime",
        label: "Current date and time",
        expansion: Expansion::Clock("%Y-%m-%d %H:%M"),
    },
    Suggestion {
        token: "/time",
        label: "Current time",
        expansion: Expansion::Clock("%H:%M"),
    },
    Suggestion {
        token: "/tomorrow",
        label: "Tomorrow's date",
        expansion: Expansion::Tomorrow("%Y-%m-%d"),
    },
    Suggestion {
        token: "/weekday",
        label: "Name of today",
        expansion: Expansion::Clock("%A"),
    },
    Suggestion {
        token: "/short",
        label: "Keep the answer brief",
        expansion: Expansion::Phrase("Keep it to one or two sentences."),
    },
    Suggestion {
        token: "/formal",
        label: "Formal tone",
        expansion: Expansion::Phrase("Use a formal, professional tone."),
    },
    Suggestion {
        token: "/friendly",
        label: "Friendly tone",
        expansion: Expansion::Phrase("Use a warm, friendly tone."),
    },
    Suggestion {
        token: "/bullets",
        label: "Answer as a bulleted list",
        expansion: Expansion::Phrase("Format the answer as a bulleted list."),
    },
    Suggestion {
        token: "/fix",
        label: "Fix spelling and grammar",
        expansion: Expansion::Phrase("Fix the spelling and grammar of the provided context."),
    },
];

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").expect("valid regex"));

/// Source of "now" for date/time macros
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

impl Suggestion {
    pub fn expand(&self, now: &DateTime<Local>) -> String {
        match self.expansion {
            Expansion::Clock(pattern) => now.format(pattern).to_string(),
            Expansion::Tomorrow(pattern) => now
                .checked_add_days(Days::new(1))
                .unwrap_or(*now)
                .format(pattern)
                .to_string(),
            Expansion::Phrase(phrase) => phrase.to_string(),
        }
    }
}

/// The catalog entry a whole token names, ignoring case
pub fn lookup(token: &str) -> Option<&'static Suggestion> {
    CATALOG
        .iter()
        .find(|suggestion| suggestion.token.eq_ignore_ascii_case(token))
}

/// The trailing whitespace-delimited word (empty if the text ends in whitespace)
pub fn last_token(text: &str) -> &str {
    match text.rfind(char::is_whitespace) {
        Some(index) => {
            let ws_len = text[index..].chars().next().map_or(1, char::len_utf8);
            &text[index + ws_len..]
        }
        None => text,
    }
}

/// Catalog entries whose token starts with `prefix`, ignoring case.
///
/// Anything not starting with [`COMMAND_PREFIX`] matches nothing.
pub fn matching(prefix: &str) -> Vec<&'static Suggestion> {
    if !prefix.starts_with(COMMAND_PREFIX) {
        return Vec::new();
    }
    let prefix = prefix.to_lowercase();
    CATALOG
        .iter()
        .filter(|suggestion| suggestion.token.starts_with(&prefix))
        .collect()
}

/// Replace every whole-word command token with its expansion
pub fn expand_macros(text: &str, now: &DateTime<Local>) -> String {
    WORD.replace_all(text, |caps: &regex::Captures| {
        let word = &caps[0];
        lookup(word).map_or_else(|| word.to_string(), |suggestion| suggestion.expand(now))
    })
    .into_owned()
}

/// A run of buffer text, flagged when it is a complete command token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub is_command: bool,
}

/// Split text into plain runs and recognised command tokens, losslessly
pub fn segments(text: &str) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::new();
    let mut push = |text: &str, is_command: bool| {
        if text.is_empty() {
            return;
        }
        match out.last_mut() {
            Some(last) if !last.is_command && !is_command => last.text.push_str(text),
            _ => out.push(Segment {
                text: text.to_string(),
                is_command,
            }),
        }
    };

    let mut cursor = 0;
    for word in WORD.find_iter(text) {
        push(&text[cursor..word.start()], false);
        push(word.as_str(), lookup(word.as_str()).is_some());
        cursor = word.end();
    }
    push(&text[cursor..], false);
    out
}

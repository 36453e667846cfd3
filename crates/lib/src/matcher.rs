//! Pattern matching shared by the pipeline (against text) and the NLU middleware (against the
//! detected action). Patterns are anchored to the whole string and case-insensitive.

use regex::{Regex, RegexBuilder};

use crate::message::IncomingMessage;

/// Compile `pattern` as a full-string, case-insensitive match.
pub fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&format!("^(?:{})$", pattern))
        .case_insensitive(true)
        .build()
}

/// True when `pattern` matches all of `haystack`. An invalid pattern is a non-match.
pub fn full_match(pattern: &str, haystack: &str) -> bool {
    match anchored(pattern) {
        Ok(re) => re.is_match(haystack),
        Err(e) => {
            log::warn!("matcher: invalid pattern {:?}: {}", pattern, e);
            false
        }
    }
}

/// Matches handler patterns against the `apiAction` extra instead of message text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionMatcher {
    enabled: bool,
}

impl ActionMatcher {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Disabled: always true. Enabled: full match against the detected action ("" if none was written).
    pub fn matches(&self, pattern: &str, message: &IncomingMessage) -> bool {
        if !self.enabled {
            return true;
        }
        let action = message.api_action();
        if action.is_empty() && message.extra(crate::message::API_ACTION).is_none() {
            log::debug!("matcher: no apiAction extra on message; was the received hook installed?");
        }
        full_match(pattern, action)
    }
}

//! Host support detection.
//!
//! There is no reliable feature test for input events that describe an edit
//! before it happens, so support is inferred from the user agent and can be
//! overridden by configuration.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::EditError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Safari,
    Chrome,
    Other,
}

/// Classify a user-agent string. Chrome also advertises Safari, so anything
/// without "safari" is `Other`, and "chrome" decides between the two.
pub fn detect_browser(user_agent: &str) -> Browser {
    static SAFARI: OnceLock<Regex> = OnceLock::new();
    static CHROME: OnceLock<Regex> = OnceLock::new();
    let safari = SAFARI.get_or_init(|| Regex::new(r"(?i)safari").expect("Invalid safari regex"));
    let chrome = CHROME.get_or_init(|| Regex::new(r"(?i)chrome").expect("Invalid chrome regex"));

    if !safari.is_match(user_agent) {
        Browser::Other
    } else if chrome.is_match(user_agent) {
        Browser::Chrome
    } else {
        Browser::Safari
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostSupport {
    browser: Browser,
    forced: Option<bool>,
}

impl HostSupport {
    pub fn from_user_agent(user_agent: &str) -> Self {
        Self {
            browser: detect_browser(user_agent),
            forced: None,
        }
    }

    /// For hosts that are known to deliver edit intents (tests, embedders)
    pub fn assume_supported() -> Self {
        Self {
            browser: Browser::Other,
            forced: Some(true),
        }
    }

    /// Override detection; `None` keeps the detected answer
    pub fn with_override(mut self, forced: Option<bool>) -> Self {
        self.forced = forced;
        self
    }

    pub fn browser(&self) -> Browser {
        self.browser
    }

    pub fn input_events(&self) -> bool {
        self.forced.unwrap_or(self.browser != Browser::Other)
    }

    pub fn check(&self) -> Result<(), EditError> {
        if self.input_events() {
            Ok(())
        } else {
            Err(EditError::UnsupportedHost)
        }
    }
}

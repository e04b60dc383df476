//! User-agent classification
//!
//! Coarse device class and browser family, enough for demographic tallies.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static TABLET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)ipad|tablet|playbook|silk/").unwrap());

static MOBILE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)mobile|android|iphone|ipod").unwrap());

/// Device class derived from a user-agent string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
        }
    }

    /// Tablets are checked first; Android without "Mobile" is a tablet
    pub fn from_user_agent(user_agent: &str) -> Self {
        let lower = user_agent.to_ascii_lowercase();
        let android_tablet = lower.contains("android") && !lower.contains("mobile");
        if android_tablet || TABLET_REGEX.is_match(user_agent) {
            Self::Tablet
        } else if MOBILE_REGEX.is_match(user_agent) {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Browser family; order matters since Edge and Chrome both claim "Chrome"
/// and Chrome claims "Safari"
pub fn browser_family(user_agent: &str) -> &'static str {
    if user_agent.contains("Edg") {
        "Edge"
    } else if user_agent.contains("Chrome") || user_agent.contains("CriOS") {
        "Chrome"
    } else if user_agent.contains("Firefox") || user_agent.contains("FxiOS") {
        "Firefox"
    } else if user_agent.contains("Safari") {
        "Safari"
    } else {
        "unknown"
    }
}

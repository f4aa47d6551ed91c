//! Chat platforms and send modes
//!
//! A platform is one of the conversational AI endpoints the engine drives
//! through a browser tab.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A chat platform that can be assigned work or reviews
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    ChatGpt,
    Claude,
    Gemini,
}

impl Platform {
    /// Get all supported platforms
    pub fn all() -> &'static [Platform] {
        &[Platform::ChatGpt, Platform::Claude, Platform::Gemini]
    }

    /// Get the short name for this platform
    pub fn name(&self) -> &'static str {
        match self {
            Platform::ChatGpt => "chatgpt",
            Platform::Claude => "claude",
            Platform::Gemini => "gemini",
        }
    }

    /// Detect the platform served at a tab URL
    pub fn from_url(url: &str) -> Option<Platform> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;

        let matches = |domain: &str| host == domain || host.ends_with(&format!(".{}", domain));

        if matches("chat.openai.com") || matches("chatgpt.com") {
            Some(Platform::ChatGpt)
        } else if matches("claude.ai") {
            Some(Platform::Claude)
        } else if matches("gemini.google.com") {
            Some(Platform::Gemini)
        } else {
            None
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chatgpt" | "openai" => Ok(Platform::ChatGpt),
            "claude" => Ok(Platform::Claude),
            "gemini" => Ok(Platform::Gemini),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}

/// Whether outbound prompts are submitted automatically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendMode {
    /// Prompt is placed in the composer; the user submits it
    #[default]
    Manual,
    /// Prompt is placed in the composer and submitted
    Auto,
}

impl SendMode {
    pub fn auto_submits(&self) -> bool {
        matches!(self, SendMode::Auto)
    }
}

impl fmt::Display for SendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendMode::Manual => write!(f, "manual"),
            SendMode::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for SendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(SendMode::Manual),
            "auto" => Ok(SendMode::Auto),
            _ => Err(format!("Unknown send mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_names_roundtrip_through_from_str() {
        for platform in Platform::all() {
            assert_eq!(platform.name().parse::<Platform>().unwrap(), *platform);
        }
        assert!("bard".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_serde_names() {
        assert_eq!(serde_json::to_string(&Platform::ChatGpt).unwrap(), "\"chatgpt\"");
        assert_eq!(serde_json::to_string(&Platform::Claude).unwrap(), "\"claude\"");
        let parsed: Platform = serde_json::from_str("\"gemini\"").unwrap();
        assert_eq!(parsed, Platform::Gemini);
    }

    #[test]
    fn test_platform_from_url() {
        assert_eq!(Platform::from_url("https://chatgpt.com/c/123"), Some(Platform::ChatGpt));
        assert_eq!(Platform::from_url("https://chat.openai.com/"), Some(Platform::ChatGpt));
        assert_eq!(Platform::from_url("https://claude.ai/new"), Some(Platform::Claude));
        assert_eq!(Platform::from_url("https://gemini.google.com/app"), Some(Platform::Gemini));
        assert_eq!(Platform::from_url("https://google.com/"), None);
        assert_eq!(Platform::from_url("https://notclaude.ai/"), None);
        assert_eq!(Platform::from_url("not a url"), None);
    }

    #[test]
    fn test_send_mode_parse() {
        assert_eq!("auto".parse::<SendMode>().unwrap(), SendMode::Auto);
        assert_eq!("Manual".parse::<SendMode>().unwrap(), SendMode::Manual);
        assert!(SendMode::Auto.auto_submits());
        assert!(!SendMode::default().auto_submits());
    }
}

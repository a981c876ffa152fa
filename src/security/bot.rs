//! Crawler detection.
//!
//! Crawlers always get the rendered frontend so that package pages are
//! indexable. A match only ever moves a request *towards* the frontend, so a
//! spoofed user agent cannot widen access to raw storage.

use crate::config::BotConfig;
use crate::http::request::RequestContext;

/// User-agent signature matcher.
#[derive(Debug, Clone)]
pub struct BotClassifier {
    /// Lowercased signatures.
    signatures: Vec<String>,
}

impl BotClassifier {
    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(config.signatures.iter().map(String::as_str))
    }

    pub fn new<'a>(signatures: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            signatures: signatures
                .into_iter()
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Check `User-Agent` and `From` against the known signatures.
    pub fn is_bot(&self, ctx: &RequestContext) -> bool {
        [ctx.user_agent.as_deref(), ctx.from.as_deref()]
            .into_iter()
            .flatten()
            .any(|value| self.matches(value))
    }

    fn matches(&self, value: &str) -> bool {
        let value = value.to_ascii_lowercase();
        self.signatures.iter().any(|sig| value.contains(sig.as_str()))
    }
}

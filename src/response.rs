//! The response contract a [`crate::goal::Goal`] scores.
//!
//! The crawl loop that actually performs fetches lives outside this crate
//! (see the crate-level docs); callers adapt whatever their fetcher returns
//! into a [`Response`] before handing it to a goal.

use url::Url;

/// Whether a response carries text worth scoring. Upstream responses are
/// duck-typed ("has `.text` or it doesn't"); modeled here as an explicit
/// tagged variant rather than a capability trait, since there are exactly
/// two shapes and no caller needs to add a third.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseContent {
    Text(String),
    NonText,
}

impl ResponseContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseContent::Text(text) => Some(text),
            ResponseContent::NonText => None,
        }
    }
}

/// A fetched page, as seen by the goal and link-intake modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: Url,
    pub domain: Option<String>,
    pub content: ResponseContent,
}

impl Response {
    pub fn new(url: Url, content: ResponseContent) -> Self {
        Self {
            url,
            domain: None,
            content,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }

    /// The domain this response is attributed to: the pre-set `domain`
    /// field if present, otherwise the URL's host.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref().or_else(|| self.url.host_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn non_text_response_has_no_text() {
        let r = Response::new(Url::from_str("https://example.com").unwrap(), ResponseContent::NonText);
        assert_eq!(r.text(), None);
    }

    #[test]
    fn text_response_exposes_its_body() {
        let r = Response::new(
            Url::from_str("https://example.com").unwrap(),
            ResponseContent::Text("hello".to_string()),
        );
        assert_eq!(r.text(), Some("hello"));
    }

    #[test]
    fn domain_falls_back_to_url_host_when_unset() {
        let r = Response::new(Url::from_str("https://sub.example.com/a").unwrap(), ResponseContent::NonText);
        assert_eq!(r.domain(), Some("sub.example.com"));
    }

    #[test]
    fn domain_prefers_explicit_value_over_url_host() {
        let r = Response::new(Url::from_str("https://sub.example.com/a").unwrap(), ResponseContent::NonText)
            .with_domain("example.com");
        assert_eq!(r.domain(), Some("example.com"));
    }
}

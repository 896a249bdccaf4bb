//! Turns raw `href` text pulled off a page into deduplicated, canonical
//! [`Url`]s ready to be wrapped in [`crate::request::Request`]s and pushed
//! into the scheduler.
//!
//! HTML parsing and DOM traversal are someone else's problem — this module
//! starts from already-extracted `href` strings. What it does own: salvaging
//! `javascript:` pseudo-links, dropping `mailto:` and uninteresting file
//! extensions, resolving against the source page, and canonicalizing +
//! deduplicating the result.

use crate::config::LinkIntakeConfig;
use anyhow::Context;
use lru::LruCache;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use tracing::trace;
use url::Url;

/// File extensions not worth fetching: media, archives, and document
/// formats a focused crawler following links has no use for.
const IGNORED_EXTENSIONS: &[&str] = &[
    "mng", "pct", "bmp", "gif", "jpg", "jpeg", "png", "pst", "psp", "tif", "tiff", "ai", "drw",
    "dxf", "eps", "ps", "svg", "cdr", "ico", "3gp", "asf", "asx", "avi", "mov", "mp4", "mpg",
    "qt", "rm", "swf", "wmv", "m4a", "mp3", "ogg", "wav", "aac", "pdf", "doc", "docx", "xls",
    "xlsx", "ppt", "pptx", "zip", "rar", "gz", "tar", "7z", "7zip", "xz", "bz2", "apk", "exe",
    "css",
];

static JS_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^(?:javascript:)?location\.href\s*=\s*['"]([^'"]+)['"]"#)
        .expect("static regex is valid")
});

/// Salvages the real URL out of a `[javascript:]location.href='X'`
/// pseudo-link. Any other `javascript:` URL (e.g. a bare function call) is
/// not a location assignment and yields `None`.
pub fn extract_js_link(href: &str) -> Option<String> {
    JS_LINK_RE
        .captures(href.trim())
        .map(|caps| caps[1].to_string())
}

fn has_ignored_extension(url: &Url) -> bool {
    let path = url.path();
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    !ext.is_empty() && ext != path && IGNORED_EXTENSIONS.contains(&ext.as_str())
}

/// Canonicalizes and deduplicates links extracted from pages.
pub struct LinkIntake {
    config: LinkIntakeConfig,
    canonical_cache: LruCache<String, String>,
    seen_global: HashSet<String>,
}

impl LinkIntake {
    pub fn new(config: LinkIntakeConfig) -> Self {
        let capacity = NonZeroUsize::new(config.canonicalization_cache_capacity.max(1)).unwrap();
        Self {
            config,
            canonical_cache: LruCache::new(capacity),
            seen_global: HashSet::new(),
        }
    }

    /// Canonical form of `url`: lowercased scheme/host, default ports
    /// stripped, fragment dropped, query parameters sorted. Memoized since
    /// the same URL is often linked from many pages.
    pub fn canonicalize(&mut self, url: &Url) -> Url {
        let key = url.as_str().to_string();
        if let Some(cached) = self.canonical_cache.get(&key) {
            return Url::parse(cached).expect("cached value was a valid URL when inserted");
        }

        let mut canonical = url.clone();
        canonical.set_fragment(None);

        let mut pairs: Vec<(String, String)> = canonical
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        pairs.sort();
        if pairs.is_empty() {
            canonical.set_query(None);
        } else {
            let query = pairs
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&");
            canonical.set_query(Some(&query));
        }

        let result = canonical.to_string();
        self.canonical_cache.put(key, result.clone());
        Url::parse(&result).expect("just-built canonical string is a valid URL")
    }

    /// Canonicalizes a standalone URL string with no source page to resolve
    /// against — for seed URLs coming in from configuration rather than
    /// page extraction. Unlike [`Self::intake`], parse failures here are a
    /// caller-facing error rather than a silently dropped link, since a bad
    /// seed URL usually means a typo in configuration worth surfacing.
    pub fn canonicalize_str(&mut self, raw: &str) -> anyhow::Result<Url> {
        let parsed = Url::parse(raw.trim()).with_context(|| format!("invalid seed URL: {raw:?}"))?;
        Ok(self.canonicalize(&parsed))
    }

    /// Resolves, filters, canonicalizes, and deduplicates `hrefs` found on
    /// `source`. Returns accepted links in first-occurrence order.
    pub fn intake<I, S>(&mut self, source: &Url, hrefs: I) -> Vec<Url>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut accepted = Vec::new();
        let mut page_local_seen = HashSet::new();

        for raw in hrefs {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }

            let resolved = if raw.starts_with("javascript:") {
                match extract_js_link(raw) {
                    Some(salvaged) => salvaged,
                    None => continue,
                }
            } else if raw.starts_with("mailto:") {
                continue;
            } else {
                raw.to_string()
            };

            let Ok(absolute) = source.join(&resolved) else {
                trace!(source = %source, href = %resolved, "failed to resolve link");
                continue;
            };

            if !matches!(absolute.scheme(), "http" | "https") {
                continue;
            }

            if has_ignored_extension(&absolute) {
                continue;
            }

            if self.config.same_domain_only && absolute.host_str() != source.host_str() {
                continue;
            }

            let canonical = self.canonicalize(&absolute);
            let key = canonical.as_str().to_string();

            let is_new = if self.config.dedup_per_page_only {
                page_local_seen.insert(key)
            } else {
                self.seen_global.insert(key)
            };
            if !is_new {
                continue;
            }

            accepted.push(canonical);
        }

        accepted
    }
}

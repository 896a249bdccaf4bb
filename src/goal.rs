//! Pluggable reward/completion policies consulted by whatever drives the
//! crawl loop around this scheduler.
//!
//! A [`Goal`] turns an observed [`Response`] into a reward signal for the
//! learner that adjusts request priorities, and answers whether a given
//! domain has satisfied the goal and can be abandoned. Two concrete goals
//! are provided; both lean on caller-supplied scoring closures so this
//! crate never has to depend on a classifier or text-extraction stack.

use crate::config::{FormFindingGoalConfig, RelevancyGoalConfig};
use crate::response::{Response, ResponseContent};
use lru::LruCache;
use std::collections::HashMap;
use tracing::trace;

/// A pluggable reward/completion policy.
pub trait Goal {
    /// The reward to attribute to whichever request produced `response`.
    fn get_reward(&mut self, response: &Response) -> f64;

    /// Records bookkeeping for `response` (page counts, best-score tables)
    /// independent of the reward computation. Called once per response,
    /// after [`Self::get_reward`].
    fn response_observed(&mut self, response: &Response);

    /// Whether this goal considers `domain` exhausted and safe to stop
    /// crawling (e.g. via [`crate::scheduler::BalancedScheduler::close_queue`]).
    fn is_achieved_for(&self, domain: &str) -> bool;

    /// A short human-readable dump of internal state, for logging.
    fn debug_print(&self) -> String;
}

/// Tracks, per key, the best score seen so far, and reports how much a new
/// score improves on it. Used to turn a noisy per-page classifier score
/// into a monotonic reward signal: once a domain's best score plateaus,
/// further pages of similar quality stop paying out.
#[derive(Debug, Default, Clone)]
pub struct MaxScores {
    best: HashMap<String, f64>,
}

impl MaxScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `score` for `key`. Returns the improvement over the
    /// previous best (`score - previous_best`) if `score` is a new best,
    /// otherwise `0.0`. A key seen for the first time has an implicit
    /// previous best of `0.0`.
    pub fn update(&mut self, key: &str, score: f64) -> f64 {
        let previous = *self.best.get(key).unwrap_or(&0.0);
        if score > previous {
            self.best.insert(key.to_string(), score);
            score - previous
        } else {
            0.0
        }
    }

    /// The best score recorded for `key`, or `0.0` if none has been.
    pub fn get(&self, key: &str) -> f64 {
        *self.best.get(key).unwrap_or(&0.0)
    }

    /// Sum of the best score recorded per key.
    pub fn sum(&self) -> f64 {
        self.best.values().sum()
    }

    /// Average of the best score recorded per key, or `0.0` if no key has
    /// been recorded yet.
    pub fn avg(&self) -> f64 {
        if self.best.is_empty() {
            0.0
        } else {
            self.sum() / self.best.len() as f64
        }
    }

    pub fn len(&self) -> usize {
        self.best.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_empty()
    }
}

/// Rewards pages that score above a relevancy threshold under a
/// caller-supplied classifier, and calls a domain done once it has
/// yielded enough relevant pages.
pub struct RelevancyGoal {
    config: RelevancyGoalConfig,
    score_fn: Box<dyn FnMut(&str) -> f64>,
    request_count_per_domain: HashMap<String, usize>,
    relevant_pages_per_domain: HashMap<String, usize>,
}

impl RelevancyGoal {
    pub fn new(config: RelevancyGoalConfig, score_fn: Box<dyn FnMut(&str) -> f64>) -> Self {
        Self {
            config,
            score_fn,
            request_count_per_domain: HashMap::new(),
            relevant_pages_per_domain: HashMap::new(),
        }
    }

    fn max_requests_reached(&self, domain: &str) -> bool {
        match self.config.max_requests_per_domain {
            Some(limit) => self.request_count_per_domain.get(domain).copied().unwrap_or(0) >= limit,
            None => false,
        }
    }

    fn max_relevant_pages_reached(&self, domain: &str) -> bool {
        match self.config.max_relevant_pages_per_domain {
            Some(limit) => self.relevant_pages_per_domain.get(domain).copied().unwrap_or(0) >= limit,
            None => false,
        }
    }
}

impl Goal for RelevancyGoal {
    fn get_reward(&mut self, response: &Response) -> f64 {
        match response.text() {
            Some(text) => (self.score_fn)(text),
            None => 0.0,
        }
    }

    fn response_observed(&mut self, response: &Response) {
        let Some(domain) = response.domain().map(str::to_string) else {
            return;
        };
        *self.request_count_per_domain.entry(domain.clone()).or_insert(0) += 1;

        let score = match response.text() {
            Some(text) => (self.score_fn)(text),
            None => return,
        };
        if score >= self.config.relevancy_threshold {
            *self.relevant_pages_per_domain.entry(domain.clone()).or_insert(0) += 1;
            trace!(domain = %domain, score, "relevant page observed");
        }
    }

    fn is_achieved_for(&self, domain: &str) -> bool {
        self.max_requests_reached(domain) || self.max_relevant_pages_reached(domain)
    }

    fn debug_print(&self) -> String {
        let mut domains: Vec<(&String, &usize)> = self.relevant_pages_per_domain.iter().collect();
        domains.sort_by_key(|(domain, _)| domain.as_str());
        domains
            .into_iter()
            .map(|(domain, count)| format!("{domain}: {count} relevant"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Rewards progress toward finding a specific kind of form (login, search,
/// registration, ...) by scoring each page against every known form type
/// and paying out on improvement of the per-domain best score for the
/// target type. Scores are memoized per URL since re-scoring an
/// already-seen page is wasted work and the classifier may not be cheap.
pub struct FormFindingGoal {
    config: FormFindingGoalConfig,
    classify_fn: Box<dyn FnMut(&str) -> HashMap<String, f64>>,
    score_cache: LruCache<String, HashMap<String, f64>>,
    max_scores: MaxScores,
}

impl FormFindingGoal {
    pub fn new(
        config: FormFindingGoalConfig,
        classify_fn: Box<dyn FnMut(&str) -> HashMap<String, f64>>,
    ) -> Self {
        let capacity = std::num::NonZeroUsize::new(config.score_cache_capacity.max(1)).unwrap();
        Self {
            config,
            classify_fn,
            score_cache: LruCache::new(capacity),
            max_scores: MaxScores::new(),
        }
    }

    fn scores_for(&mut self, url: &str, text: &str) -> HashMap<String, f64> {
        if let Some(cached) = self.score_cache.get(url) {
            return cached.clone();
        }
        let scores = (self.classify_fn)(text);
        self.score_cache.put(url.to_string(), scores.clone());
        scores
    }

    fn target_score(&mut self, response: &Response) -> Option<f64> {
        let text = response.text()?;
        let scores = self.scores_for(response.url.as_str(), text);
        scores.get(&self.config.target_form_type).copied()
    }
}

impl Goal for FormFindingGoal {
    fn get_reward(&mut self, response: &Response) -> f64 {
        self.target_score(response).unwrap_or(0.0)
    }

    fn response_observed(&mut self, response: &Response) {
        let Some(domain) = response.domain().map(str::to_string) else {
            return;
        };
        let score = self.target_score(response).unwrap_or(0.0);
        self.max_scores.update(&domain, score);
    }

    fn is_achieved_for(&self, domain: &str) -> bool {
        self.max_scores.get(domain) >= self.config.found_threshold
    }

    fn debug_print(&self) -> String {
        format!(
            "form_finding(target={}, cache_len={})",
            self.config.target_form_type,
            self.score_cache.len()
        )
    }
}

//! Serializable configuration for every tunable knob in this crate.
//!
//! Constructed directly, or deserialized from whatever config format the
//! embedding application already uses (JSON via `serde_json`, or any other
//! `serde` format it prefers).

use serde::{Deserialize, Serialize};

/// Tuning knobs for [`crate::scheduler::BalancedScheduler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Probability of picking a domain uniformly at random instead of via
    /// softmax weighting on each pop.
    pub eps: f64,
    /// Softmax temperature (score-space) used when weighting domains by
    /// their top priority.
    pub balancing_temperature: f64,
    /// Tie-break order for equal-priority requests within a domain: `true`
    /// for FIFO, `false` for LIFO.
    pub fifo: bool,
    /// Attempt budget for [`crate::domain_queue::DomainQueue::pop_random`].
    pub pop_random_attempts: usize,
    /// Overrides the adaptive batch-size heuristic when set. Leave `None`
    /// to let [`crate::scheduler::BalancedScheduler`] compute it from the
    /// current domain count, per §4.2's `min(1000, max(1, |queues| /
    /// 1000))` rule.
    pub batch_size: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            eps: 0.1,
            balancing_temperature: 1.0,
            fifo: true,
            pop_random_attempts: crate::domain_queue::DomainQueue::DEFAULT_POP_RANDOM_ATTEMPTS,
            batch_size: None,
        }
    }
}

/// Tuning knobs for the link intake helper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkIntakeConfig {
    /// Capacity of the URL-canonicalization LRU cache.
    pub canonicalization_cache_capacity: usize,
    /// If true, dedup only against links seen on the current page; if
    /// false, dedup against every link ever seen by this intake helper.
    pub dedup_per_page_only: bool,
    /// If true, drop any link whose host differs from the source page's.
    pub same_domain_only: bool,
}

impl Default for LinkIntakeConfig {
    fn default() -> Self {
        Self {
            canonicalization_cache_capacity: 100_000,
            dedup_per_page_only: false,
            same_domain_only: false,
        }
    }
}

/// Tuning knobs for [`crate::goal::RelevancyGoal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevancyGoalConfig {
    /// Minimum classifier score for a page to count as relevant.
    pub relevancy_threshold: f64,
    /// Stop considering a domain once this many requests have been made to
    /// it, regardless of relevancy. `None` means no such limit. Useful for
    /// "hub" domains that link out to relevant content but never carry any
    /// themselves.
    pub max_requests_per_domain: Option<usize>,
    /// Stop considering a domain once it has yielded this many relevant
    /// pages. `None` means the goal is never satisfied by page count alone.
    pub max_relevant_pages_per_domain: Option<usize>,
}

impl Default for RelevancyGoalConfig {
    fn default() -> Self {
        Self {
            relevancy_threshold: 0.1,
            max_requests_per_domain: None,
            max_relevant_pages_per_domain: None,
        }
    }
}

/// Tuning knobs for [`crate::goal::FormFindingGoal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormFindingGoalConfig {
    /// The form type this goal is hunting for (e.g. `"login"`, `"search"`).
    pub target_form_type: String,
    /// Per-domain best score at which the goal considers the form found.
    pub found_threshold: f64,
    /// Capacity of the per-URL classifier-score memoization cache.
    pub score_cache_capacity: usize,
}

impl Default for FormFindingGoalConfig {
    fn default() -> Self {
        Self {
            target_form_type: "login".to_string(),
            found_threshold: 0.7,
            score_cache_capacity: 100_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_config_round_trips_through_json() {
        let config = SchedulerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: SchedulerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn link_intake_config_defaults_match_documented_capacity() {
        assert_eq!(LinkIntakeConfig::default().canonicalization_cache_capacity, 100_000);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: RelevancyGoalConfig = serde_json::from_str("{\"relevancy_threshold\": 0.9}").unwrap();
        assert_eq!(config.relevancy_threshold, 0.9);
        assert_eq!(config.max_relevant_pages_per_domain, None);
    }
}

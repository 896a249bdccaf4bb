//! The request envelope routed through the scheduler.

use std::collections::HashMap;
use url::Url;

/// Metadata key under which the target domain for scheduling purposes is
/// stored. Required on every request pushed into the [`crate::scheduler::BalancedScheduler`].
pub const META_SCHEDULER_SLOT: &str = "scheduler_slot";

/// Metadata key for an informational domain hint (may differ in casing or
/// source from `scheduler_slot`; not used for routing).
pub const META_DOMAIN: &str = "domain";

/// Metadata key the scheduler writes on pop to record whether the request
/// was produced by the epsilon-greedy random policy.
pub const META_FROM_RANDOM_POLICY: &str = "from_random_policy";

/// A request to fetch a URL, carrying a mutable priority and metadata.
///
/// `priority` is a signed integer in the scaled space defined by
/// [`crate::priority::P_MULT`]; higher pops sooner. `metadata` must contain
/// [`META_SCHEDULER_SLOT`] before the request is pushed into a scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: Url,
    pub priority: i64,
    pub metadata: HashMap<String, String>,
}

impl Request {
    pub fn new(url: Url, priority: i64) -> Self {
        Self {
            url,
            priority,
            metadata: HashMap::new(),
        }
    }

    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.metadata.insert(META_SCHEDULER_SLOT.to_string(), slot.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.metadata.insert(META_DOMAIN.to_string(), domain.into());
        self
    }

    /// The domain this request is scheduled under, if set.
    pub fn scheduler_slot(&self) -> Option<&str> {
        self.metadata.get(META_SCHEDULER_SLOT).map(String::as_str)
    }

    /// Whether this request was returned by the epsilon-greedy random
    /// branch. Unset (`None`) until the scheduler pops it.
    pub fn from_random_policy(&self) -> Option<bool> {
        self.metadata
            .get(META_FROM_RANDOM_POLICY)
            .map(|v| v == "true")
    }

    pub(crate) fn mark_random_policy(&mut self, random_policy: bool) {
        self.metadata.insert(
            META_FROM_RANDOM_POLICY.to_string(),
            random_policy.to_string(),
        );
    }
}

//! Adaptive, domain-balancing scheduler for a focused web crawler.
//!
//! This crate owns the frontier's scheduling core: a mutable per-domain
//! priority queue ([`domain_queue::DomainQueue`]), a domain-balancing
//! meta-queue that samples across domains with epsilon-greedy + softmax
//! weighting ([`scheduler::BalancedScheduler`]), a pluggable reward/stop
//! policy ([`goal::Goal`] and friends), and a link intake helper that turns
//! raw `href`s into canonical, deduplicated requests
//! ([`link_intake::LinkIntake`]).
//!
//! What it deliberately does *not* own: HTML parsing, the fetch loop,
//! on-disk persistence, distributed coordination, or any particular ML
//! stack — those are the embedding crawler's job. This crate is
//! single-threaded and holds no internal locks; see the module docs on
//! [`scheduler::BalancedScheduler`] for what that means for callers who
//! want to share one across threads.

pub mod config;
pub mod domain_queue;
pub mod error;
pub mod goal;
pub mod link_intake;
pub mod priority;
pub mod request;
pub mod response;
pub mod scheduler;

pub use config::{FormFindingGoalConfig, LinkIntakeConfig, RelevancyGoalConfig, SchedulerConfig};
pub use domain_queue::{DomainQueue, EntryHandle};
pub use error::{SchedulerError, SchedulerResult};
pub use goal::{FormFindingGoal, Goal, MaxScores, RelevancyGoal};
pub use link_intake::LinkIntake;
pub use request::Request;
pub use response::{Response, ResponseContent};
pub use scheduler::BalancedScheduler;

//! Domain-balancing meta-queue sitting on top of per-domain [`DomainQueue`]s.
//!
//! Requests are pushed into whichever domain queue matches their
//! `scheduler_slot` metadata; pops pick a domain with epsilon-greedy +
//! softmax-weighted sampling (so busy domains don't starve quiet ones) and
//! then take that domain's highest-priority request. Results are buffered
//! in LIFO batches to amortize the cost of sampling a domain on every pop.

use crate::config::SchedulerConfig;
use crate::domain_queue::DomainQueue;
use crate::error::{SchedulerError, SchedulerResult};
use crate::priority::softmax_priorities;
use crate::request::Request;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Upper bound the adaptive batch-size heuristic will never exceed,
/// regardless of how many domains are currently registered.
const MAX_BATCH_SIZE: usize = 1000;

/// Domain-balancing scheduler. Not thread-safe by design — see the crate's
/// concurrency model; wrap in your own synchronization if you need to share
/// one across threads.
pub struct BalancedScheduler {
    queues: HashMap<String, DomainQueue>,
    closed_slots: HashSet<String>,
    eps: f64,
    balancing_temperature: f64,
    fifo: bool,
    pop_random_attempts: usize,
    batch_size_override: Option<usize>,
    buffer: Vec<Request>,
}

impl BalancedScheduler {
    /// `eps` is the probability of picking a domain uniformly at random
    /// instead of via softmax weighting (0.0 disables random exploration
    /// entirely; 1.0 makes every pick random). `balancing_temperature` must
    /// be positive and controls how sharply softmax favors the
    /// highest-priority domain.
    pub fn new(eps: f64, balancing_temperature: f64, fifo: bool) -> Self {
        Self::from_config(&SchedulerConfig {
            eps,
            balancing_temperature,
            fifo,
            ..SchedulerConfig::default()
        })
    }

    /// Builds a scheduler from a [`SchedulerConfig`], including an optional
    /// `batch_size` override and a non-default `pop_random_attempts`.
    pub fn from_config(config: &SchedulerConfig) -> Self {
        assert!(
            (0.0..=1.0).contains(&config.eps),
            "eps must be in [0, 1], got {}",
            config.eps
        );
        assert!(
            config.balancing_temperature > 0.0,
            "balancing_temperature must be positive, got {}",
            config.balancing_temperature
        );
        Self {
            queues: HashMap::new(),
            closed_slots: HashSet::new(),
            eps: config.eps,
            balancing_temperature: config.balancing_temperature,
            fifo: config.fifo,
            pop_random_attempts: config.pop_random_attempts,
            batch_size_override: config.batch_size,
            buffer: Vec::new(),
        }
    }

    /// Routes `request` into the domain queue named by its
    /// `scheduler_slot` metadata, creating that queue on first use.
    ///
    /// # Panics
    /// Panics if the request has no `scheduler_slot` metadata set — this is
    /// a contract violation, not a recoverable error.
    pub fn push(&mut self, request: Request) -> SchedulerResult<()> {
        let slot = request
            .scheduler_slot()
            .expect("request must carry scheduler_slot metadata before being pushed")
            .to_string();

        if self.closed_slots.contains(&slot) {
            return Err(SchedulerError::queue_closed(slot));
        }

        let fifo = self.fifo;
        self.queues
            .entry(slot.clone())
            .or_insert_with(|| DomainQueue::new(fifo))
            .push(request);
        trace!(slot = %slot, "pushed request");
        Ok(())
    }

    /// Pops the next request across all domains, refilling the internal
    /// LIFO buffer in batches when it runs dry.
    pub fn pop(&mut self) -> Option<Request> {
        if self.buffer.is_empty() {
            let n = self.batch_size();
            let filled = self.pop_many(n);
            debug!(requested = n, filled, "refilled scheduler buffer");
        }
        self.buffer.pop()
    }

    /// The batch size used to refill the buffer: the configured override if
    /// one was set, otherwise the adaptive heuristic, which scales with the
    /// number of registered domains so a handful of domains don't pay for a
    /// 1000-request batch, but is capped so a huge domain count can't make a
    /// single refill unreasonably large.
    pub fn batch_size(&self) -> usize {
        if let Some(override_size) = self.batch_size_override {
            assert!(override_size > 0, "batch_size override must be positive");
            return override_size;
        }
        let n = self.queues.len().max(1);
        (n / 1000).max(1).min(MAX_BATCH_SIZE)
    }

    /// Draws up to `n` requests via repeated domain sampling, pushing each
    /// into the output buffer. Returns how many were actually produced,
    /// which can be less than `n` if a sampled slot drained between the
    /// weight snapshot and the pop.
    ///
    /// The weight vector (and therefore the softmax distribution) is built
    /// once per call from every registered domain, not just the ones that
    /// currently have pending requests — an exhausted-but-not-closed domain
    /// still occupies a slot in the distribution, just with `EMPTY` weight,
    /// so it is vanishingly unlikely (not impossible) to be drawn.
    fn pop_many(&mut self, n: usize) -> usize {
        let all_slots: Vec<String> = self.queues.keys().cloned().collect();
        if all_slots.is_empty() {
            return 0;
        }

        let priorities: Vec<i64> = all_slots.iter().map(|s| self.queues[s].max_priority()).collect();
        let weights = softmax_priorities(&priorities, self.balancing_temperature);

        let mut rng = rand::thread_rng();
        let mut produced = 0;
        for _ in 0..n {
            let sampled = Self::sample_index(&weights, &mut rng);
            let random_policy = rng.gen::<f64>() < self.eps;
            let slot = if random_policy {
                let idx = rng.gen_range(0..all_slots.len());
                &all_slots[idx]
            } else {
                &all_slots[sampled]
            };

            let queue = self
                .queues
                .get_mut(slot)
                .expect("sampled slot must exist in queues map");
            let popped = if random_policy {
                queue.pop_random(self.pop_random_attempts)
            } else {
                queue.pop()
            };

            match popped {
                Some(mut request) => {
                    request.mark_random_policy(random_policy);
                    self.buffer.push(request);
                    produced += 1;
                }
                None => trace!(slot = %slot, "sampled slot drained between snapshot and pop"),
            }
        }
        produced
    }

    /// Draws a single index from a discrete distribution `weights` (assumed
    /// to sum to ~1.0). Falls back to the last index to absorb float
    /// rounding error at the top of the cumulative sum.
    fn sample_index(weights: &[f64], rng: &mut impl Rng) -> usize {
        let draw: f64 = rng.gen();
        let mut cumulative = 0.0;
        for (i, w) in weights.iter().enumerate() {
            cumulative += w;
            if draw <= cumulative {
                return i;
            }
        }
        weights.len() - 1
    }

    /// Slots with at least one entry (tombstones included) in their queue.
    /// Closed slots have already been removed from `queues`, so this never
    /// includes them.
    pub fn get_active_slots(&self) -> Vec<String> {
        self.queues
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(slot, _)| slot.clone())
            .collect()
    }

    /// Read-only access to a single domain's queue, if it has been created.
    pub fn get_queue(&self, slot: &str) -> Option<&DomainQueue> {
        self.queues.get(slot)
    }

    /// Permanently closes a slot: future `push` calls for it fail with
    /// [`SchedulerError::QueueClosed`], and its backlog (if any) is
    /// discarded immediately. Requests already sitting in the output
    /// buffer are unaffected. Returns the number of requests dropped with
    /// the queue — 0 if the slot had no queue (never pushed to, or already
    /// closed).
    pub fn close_queue(&mut self, slot: &str) -> usize {
        self.closed_slots.insert(slot.to_string());
        let dropped = self.queues.remove(slot).map(|q| q.len()).unwrap_or(0);
        debug!(slot = %slot, dropped, "closed queue");
        dropped
    }

    /// Total pending requests across every domain, plus whatever is
    /// currently sitting in the output buffer.
    pub fn len(&self) -> usize {
        self.buffer.len() + self.queues.values().map(DomainQueue::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A CSV dump of every live request across the scheduler: `priority,
    /// slot, url` with a header row, buffer rows tagged with the literal
    /// slot `<BUFFER>`. Intended for ad-hoc debugging, not a
    /// machine-readable interface with format stability guarantees.
    pub fn debug_dump(&self) -> String {
        let mut out = String::from("priority,slot,url\n");
        for request in &self.buffer {
            out.push_str(&format!("{},<BUFFER>,{}\n", request.priority, request.url));
        }

        let mut slots: Vec<&String> = self.queues.keys().collect();
        slots.sort();
        for slot in slots {
            for request in self.queues[slot].iter_requests() {
                out.push_str(&format!("{},{},{}\n", request.priority, slot, request.url));
            }
        }
        out
    }
}

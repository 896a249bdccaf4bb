//! In-memory mutable priority queue for a single domain's pending requests.
//!
//! Backed by a binary min-heap over `(neg_priority, seq)`, so the largest
//! priority pops first with ties broken by sequence number. Entries are
//! shared `Rc<RefCell<_>>` cells rather than an index-arena: the queue is
//! single-threaded by design (see the scheduler's concurrency model), so
//! `Rc<RefCell<EntryData>>` gives callers a live, mutable handle into the
//! heap without unsafe code or a separate liveness bitset.

use crate::priority::{EMPTY, REMOVED_DELTA};
use crate::request::Request;
use rand::Rng;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug)]
enum Slot {
    Live(Request),
    Tombstone,
}

#[derive(Debug)]
struct EntryData {
    neg_priority: i64,
    seq: i64,
    slot: Slot,
}

/// A handle into a live (or since-tombstoned) entry, returned by
/// [`DomainQueue::push`]. Cloning an `EntryHandle` is cheap (it's a
/// reference-counted pointer); holding one across pops is safe as long as
/// the holder does not touch it once it is known to be tombstoned.
#[derive(Debug, Clone)]
pub struct EntryHandle(Rc<RefCell<EntryData>>);

/// Per-domain priority queue of outbound requests.
#[derive(Debug, Default)]
pub struct DomainQueue {
    heap: Vec<Rc<RefCell<EntryData>>>,
    counter: i64,
    step: i64,
}

impl DomainQueue {
    /// A fresh, empty queue. `fifo = true` (the default) breaks ties between
    /// equal priorities in insertion order; `fifo = false` gives LIFO
    /// tie-breaking instead.
    pub fn new(fifo: bool) -> Self {
        Self {
            heap: Vec::new(),
            counter: 0,
            step: if fifo { 1 } else { -1 },
        }
    }

    /// Pushes a request, assigning it the next sequence number.
    pub fn push(&mut self, request: Request) -> EntryHandle {
        let seq = self.counter;
        self.counter += self.step;
        let entry = Rc::new(RefCell::new(EntryData {
            neg_priority: -request.priority,
            seq,
            slot: Slot::Live(request),
        }));
        self.heap.push(entry.clone());
        let last = self.heap.len() - 1;
        self.sift_up(last);
        EntryHandle(entry)
    }

    /// Removes and returns the highest-priority live request, skipping any
    /// tombstones encountered at the root. Returns `None` once the heap has
    /// drained of live entries.
    pub fn pop(&mut self) -> Option<Request> {
        loop {
            let entry = self.pop_root_physical()?;
            let mut data = entry.borrow_mut();
            match std::mem::replace(&mut data.slot, Slot::Tombstone) {
                Slot::Live(request) => return Some(request),
                Slot::Tombstone => continue,
            }
        }
    }

    /// Strips tombstones from the root, then — if anything remains — makes
    /// up to `n_attempts` uniform random draws over all entries, returning
    /// the first live one it hits (tombstoning it on the way out). Returns
    /// `None` if the queue is empty, or if every attempt hit a tombstone;
    /// the latter is a statistical miss, not a queue bug, since the root is
    /// known live by construction at that point.
    pub fn pop_random(&mut self, n_attempts: usize) -> Option<Request> {
        self.pop_empty();
        if self.heap.is_empty() {
            return None;
        }

        let mut rng = rand::thread_rng();
        for _ in 0..n_attempts {
            let idx = rng.gen_range(0..self.heap.len());
            let entry = self.heap[idx].clone();
            let is_live = matches!(entry.borrow().slot, Slot::Live(_));
            if is_live {
                return Some(self.tombstone(&entry));
            }
        }
        None
    }

    /// Default attempt budget used by [`Self::pop_random`] when the caller
    /// has no reason to override it.
    pub const DEFAULT_POP_RANDOM_ATTEMPTS: usize = 10;

    /// Sets `entry`'s priority. If the entry is live, the change is also
    /// written back onto the request itself. Does not re-heapify; batch
    /// your calls and invoke [`Self::heapify`] once when done.
    pub fn change_priority(&mut self, handle: &EntryHandle, new_priority: i64) {
        let mut data = handle.0.borrow_mut();
        data.neg_priority = -new_priority;
        if let Slot::Live(request) = &mut data.slot {
            request.priority = new_priority;
        }
    }

    /// Recomputes priorities for every live request in one batch: collects
    /// them in [`Self::iter_requests`] order, calls `compute`, applies the
    /// returned priorities in the same order, then heapifies.
    ///
    /// Panics if `compute` returns a different number of priorities than it
    /// was given requests.
    pub fn update_all_priorities<F>(&mut self, compute: F)
    where
        F: FnOnce(&[Request]) -> Vec<i64>,
    {
        let live_entries: Vec<Rc<RefCell<EntryData>>> = self
            .heap
            .iter()
            .filter(|e| matches!(e.borrow().slot, Slot::Live(_)))
            .cloned()
            .collect();

        let requests: Vec<Request> = live_entries
            .iter()
            .map(|e| match &e.borrow().slot {
                Slot::Live(r) => r.clone(),
                Slot::Tombstone => unreachable!("filtered to live entries above"),
            })
            .collect();

        let new_priorities = compute(&requests);
        assert_eq!(
            new_priorities.len(),
            requests.len(),
            "compute_priority_func must return one priority per request"
        );

        for (entry, priority) in live_entries.iter().zip(new_priorities) {
            let mut data = entry.borrow_mut();
            data.neg_priority = -priority;
            if let Slot::Live(request) = &mut data.slot {
                request.priority = priority;
            }
        }

        self.heapify();
    }

    /// Tombstones `handle`'s entry and returns the evicted request. The
    /// entry's effective priority is raised above the current root so it
    /// floats to the top and is reclaimed at the next heapify/pop_empty.
    ///
    /// Calling this twice on the same handle is a contract violation (the
    /// second call has no request left to return) and panics.
    pub fn remove_entry(&mut self, handle: &EntryHandle) -> Request {
        self.tombstone(&handle.0)
    }

    fn tombstone(&self, entry: &Rc<RefCell<EntryData>>) -> Request {
        let max_prio = self.raw_top_priority_or_zero();
        let mut data = entry.borrow_mut();
        let request = match std::mem::replace(&mut data.slot, Slot::Tombstone) {
            Slot::Live(request) => request,
            Slot::Tombstone => panic!("remove_entry called on an already-removed entry"),
        };
        data.neg_priority = -(max_prio + REMOVED_DELTA);
        request
    }

    /// Re-establishes the heap property over all entries in O(n), then
    /// strips any tombstones that surfaced at the root.
    pub fn heapify(&mut self) {
        let n = self.heap.len();
        if n > 1 {
            for i in (0..n / 2).rev() {
                self.sift_down(i);
            }
        }
        self.pop_empty();
    }

    /// Yields every live request. The first item is guaranteed to be the
    /// current max-priority live request (assuming the queue was heapified
    /// since its last mutation); the rest are in arbitrary heap order.
    pub fn iter_requests(&self) -> impl Iterator<Item = std::cell::Ref<'_, Request>> + '_ {
        self.heap.iter().filter_map(|entry| {
            let borrowed = entry.borrow();
            if matches!(borrowed.slot, Slot::Tombstone) {
                None
            } else {
                Some(std::cell::Ref::map(borrowed, |e| match &e.slot {
                    Slot::Live(r) => r,
                    Slot::Tombstone => unreachable!("checked above"),
                }))
            }
        })
    }

    /// The priority of the current top entry, live or not, or [`EMPTY`] if
    /// the queue holds nothing at all.
    pub fn max_priority(&self) -> i64 {
        match self.heap.first() {
            None => EMPTY,
            Some(e) => -e.borrow().neg_priority,
        }
    }

    /// Total entry count, tombstones included.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn raw_top_priority_or_zero(&self) -> i64 {
        match self.heap.first() {
            None => 0,
            Some(e) => -e.borrow().neg_priority,
        }
    }

    fn pop_empty(&mut self) {
        while let Some(top) = self.heap.first() {
            if matches!(top.borrow().slot, Slot::Tombstone) {
                self.pop_root_physical();
            } else {
                break;
            }
        }
    }

    fn pop_root_physical(&mut self) -> Option<Rc<RefCell<EntryData>>> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let root = self.heap.pop();
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        root
    }

    fn heap_key(&self, i: usize) -> (i64, i64) {
        let e = self.heap[i].borrow();
        (e.neg_priority, e.seq)
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.heap_key(i) < self.heap_key(parent) {
                self.heap.swap(i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.heap.len();
        loop {
            let l = 2 * i + 1;
            let r = 2 * i + 2;
            let mut smallest = i;
            if l < n && self.heap_key(l) < self.heap_key(smallest) {
                smallest = l;
            }
            if r < n && self.heap_key(r) < self.heap_key(smallest) {
                smallest = r;
            }
            if smallest == i {
                break;
            }
            self.heap.swap(i, smallest);
            i = smallest;
        }
    }
}

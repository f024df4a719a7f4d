use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Identity of one run. Every deadline carries the token of the run that
/// scheduled it so a callback can never leak into a later run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RunToken(pub u64);

impl RunToken {
    pub fn next(self) -> Self {
        RunToken(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Scheduled<E> {
    pub id: TimerId,
    pub due: u64,
    pub token: RunToken,
    pub payload: E,
}

struct Entry<E>(Scheduled<E>);

impl<E> PartialEq for Entry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.0.due == other.0.due && self.0.id == other.0.id
    }
}

impl<E> Eq for Entry<E> {}

impl<E> PartialOrd for Entry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the max-heap pops the earliest deadline; ties pop in
// scheduling order.
impl<E> Ord for Entry<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.0.due, other.0.id.0).cmp(&(self.0.due, self.0.id.0))
    }
}

/// Deadline queue. Nothing fires on its own: the owner pops due entries
/// from a single tick.
pub struct Scheduler<E> {
    heap: BinaryHeap<Entry<E>>,
    next_id: u64,
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_id: 0,
        }
    }

    pub fn schedule(&mut self, due: u64, token: RunToken, payload: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.heap.push(Entry(Scheduled {
            id,
            due,
            token,
            payload,
        }));
        id
    }

    /// Returns whether a pending deadline was removed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.heap.len();
        self.heap.retain(|entry| entry.0.id != id);
        self.heap.len() != before
    }

    /// Drops every pending deadline of a run. Returns how many were removed.
    pub fn cancel_run(&mut self, token: RunToken) -> usize {
        let before = self.heap.len();
        self.heap.retain(|entry| entry.0.token != token);
        before - self.heap.len()
    }

    /// Pops the earliest deadline if it is due at or before `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<Scheduled<E>> {
        if self.heap.peek()?.0.due <= now {
            self.heap.pop().map(|entry| entry.0)
        } else {
            None
        }
    }

    pub fn next_due(&self) -> Option<u64> {
        self.heap.peek().map(|entry| entry.0.due)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

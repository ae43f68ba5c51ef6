//! Delayed-event queue.
//!
//! Each timed entity (a core, the memory system) owns one `EventQueue` holding its
//! in-flight operations as plain data records. The queue keeps its own cycle
//! counter; `schedule(event, delay)` makes the event due at `cycle + delay`.
//!
//! There is no cancellation. An owner that wants to drop an event checks a
//! liveness condition when the event is popped and ignores it if stale.

use std::collections::{BTreeMap, VecDeque};

/// Events bucketed by due cycle, FIFO within a cycle.
#[derive(Debug, Clone)]
pub struct EventQueue<E> {
    cycle: u64,
    buckets: BTreeMap<u64, VecDeque<E>>,
    len: usize,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventQueue<E> {
    /// Creates an empty queue at cycle 0.
    pub const fn new() -> Self {
        Self {
            cycle: 0,
            buckets: BTreeMap::new(),
            len: 0,
        }
    }

    /// Current cycle of this queue.
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Number of scheduled events not yet popped.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing is scheduled.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Schedules `event` to fire `delay` cycles from now.
    ///
    /// A zero delay makes the event due in the current cycle; if the owner is
    /// draining the current cycle it will see the event in the same drain.
    pub fn schedule(&mut self, event: E, delay: u64) {
        let due = self.cycle + delay;
        self.buckets.entry(due).or_default().push_back(event);
        self.len += 1;
    }

    /// Removes and returns the oldest event due at or before the current cycle.
    pub fn pop_due(&mut self) -> Option<E> {
        let mut bucket = self.buckets.first_entry()?;
        if *bucket.key() > self.cycle {
            return None;
        }
        let event = bucket.get_mut().pop_front();
        if bucket.get().is_empty() {
            let _ = bucket.remove();
        }
        if event.is_some() {
            self.len -= 1;
        }
        event
    }

    /// Moves the queue to the next cycle without running anything.
    pub const fn advance(&mut self) {
        self.cycle += 1;
    }

    /// Runs every event due this cycle, then advances to the next cycle.
    ///
    /// The handler may schedule further events; zero-delay ones run in the same call.
    pub fn advance_one_cycle(&mut self, mut handler: impl FnMut(E, &mut Self)) {
        while let Some(event) = self.pop_due() {
            handler(event, self);
        }
        self.advance();
    }

    /// Iterates scheduled events with their due cycle, earliest first.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &E)> + '_ {
        self.buckets
            .iter()
            .flat_map(|(&due, events)| events.iter().map(move |e| (due, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_fire_at_due_cycle() {
        let mut q = EventQueue::new();
        q.schedule("late", 3);
        q.schedule("now", 0);
        q.schedule("soon", 1);

        let mut fired = Vec::new();
        for _ in 0..4 {
            let cycle = q.cycle();
            q.advance_one_cycle(|e, _| fired.push((cycle, e)));
        }
        assert_eq!(fired, vec![(0, "now"), (1, "soon"), (3, "late")]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_same_cycle_keeps_insertion_order() {
        let mut q = EventQueue::new();
        for i in 0..5 {
            q.schedule(i, 2);
        }
        q.advance();
        q.advance();
        let drained: Vec<_> = std::iter::from_fn(|| q.pop_due()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_zero_delay_from_handler_runs_same_cycle() {
        let mut q = EventQueue::new();
        q.schedule(1u32, 0);
        let mut seen = Vec::new();
        q.advance_one_cycle(|e, q| {
            seen.push(e);
            if e < 3 {
                q.schedule(e + 1, 0);
            }
        });
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(q.cycle(), 1);
    }

    #[test]
    fn test_pop_due_ignores_future_events() {
        let mut q = EventQueue::new();
        q.schedule('a', 5);
        assert_eq!(q.pop_due(), None);
        assert_eq!(q.len(), 1);
        assert_eq!(q.iter().next(), Some((5, &'a')));
    }
}

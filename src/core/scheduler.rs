//! Deferred delivery queue for delayed roots.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::node::NodeKey;
use crate::root::RootKey;

/// A transmission waiting for its delivery tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingPulse {
    pub due: u64,
    pub root: RootKey,
    pub target: NodeKey,
    pub value: f64,
}

/// Ordered by `(due, insertion sequence)`, so pulses due on the same tick are
/// delivered in the order they were sent.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: BTreeMap<(u64, u64), PendingPulse>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, pulse: PendingPulse) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.insert((pulse.due, seq), pulse);
    }

    /// Remove and return every pulse with `due <= tick`, in delivery order.
    pub fn drain_due(&mut self, tick: u64) -> Vec<PendingPulse> {
        let later = match tick.checked_add(1) {
            Some(next) => self.queue.split_off(&(next, 0)),
            None => BTreeMap::new(),
        };
        let due = std::mem::replace(&mut self.queue, later);
        due.into_values().collect()
    }

    /// Earliest due tick still queued.
    pub fn next_due(&self) -> Option<u64> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingPulse> + '_ {
        self.queue.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse(due: u64, value: f64) -> PendingPulse {
        PendingPulse {
            due,
            root: RootKey(0),
            target: NodeKey(0),
            value,
        }
    }

    #[test]
    fn drains_only_due_pulses_in_order() {
        let mut s = Scheduler::new();
        s.schedule(pulse(3, 1.0));
        s.schedule(pulse(1, 2.0));
        s.schedule(pulse(3, 3.0));
        s.schedule(pulse(5, 4.0));
        assert_eq!(s.next_due(), Some(1));

        assert!(s.drain_due(0).is_empty());
        let values: Vec<f64> = s.drain_due(3).iter().map(|p| p.value).collect();
        assert_eq!(values, vec![2.0, 1.0, 3.0]);
        assert_eq!(s.len(), 1);
        assert_eq!(s.next_due(), Some(5));
    }

    #[test]
    fn max_tick_drains_everything() {
        let mut s = Scheduler::new();
        s.schedule(pulse(u64::MAX, 1.0));
        s.schedule(pulse(10, 1.0));
        assert_eq!(s.drain_due(u64::MAX).len(), 2);
        assert!(s.is_empty());
    }
}

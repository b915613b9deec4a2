//! Event scheduler: a min-heap over fire times with lazy cancellation.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, BTreeMap};

use crate::domain::Domain;
use crate::ids::{EventID, SerialGen};

/// Fire-time key with a total order (times are never NaN, but the heap needs
/// `Ord` regardless).
#[derive(Debug, Clone, Copy, PartialEq)]
struct Time(f64);

impl Eq for Time {}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Priority queue of domains keyed by absolute fire time, ties broken by
/// ascending event id. `remove` leaves a tombstone in the heap; stale nodes
/// are discarded when they surface.
#[derive(Debug, Default)]
pub struct Scheduler {
    heap: BinaryHeap<Reverse<(Time, EventID)>>,
    events: BTreeMap<EventID, (f64, Domain)>,
    idgen: SerialGen,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn add(&mut self, domain: Domain, t: f64) -> EventID {
        let eid = self.idgen.event_id();
        self.events.insert(eid, (t, domain));
        self.heap.push(Reverse((Time(t), eid)));
        eid
    }

    /// Cancel an event. Repeated removal of the same id yields `None`; ids
    /// are never reissued.
    pub fn remove(&mut self, eid: EventID) -> Option<Domain> {
        self.events.remove(&eid).map(|(_, d)| d)
    }

    pub fn contains(&self, eid: EventID) -> bool {
        self.events.contains_key(&eid)
    }

    pub fn get(&self, eid: EventID) -> Option<&Domain> {
        self.events.get(&eid).map(|(_, d)| d)
    }

    pub fn get_mut(&mut self, eid: EventID) -> Option<&mut Domain> {
        self.events.get_mut(&eid).map(|(_, d)| d)
    }

    pub fn time_of(&self, eid: EventID) -> Option<f64> {
        self.events.get(&eid).map(|(t, _)| *t)
    }

    /// Earliest live fire time, discarding tombstones on the way.
    pub fn peek_time(&mut self) -> Option<f64> {
        while let Some(Reverse((t, eid))) = self.heap.peek().copied() {
            match self.events.get(&eid) {
                Some((live_t, _)) if *live_t == t.0 => return Some(t.0),
                _ => {
                    self.heap.pop();
                }
            }
        }
        None
    }

    /// Pop the earliest live event.
    pub fn pop_next(&mut self) -> Option<(EventID, Domain, f64)> {
        while let Some(Reverse((t, eid))) = self.heap.pop() {
            if let Some((live_t, _)) = self.events.get(&eid) {
                if *live_t == t.0 {
                    let (_, domain) = self.events.remove(&eid).expect("checked above");
                    return Some((eid, domain, t.0));
                }
            }
        }
        None
    }

    /// Live events in id order, for the integrity checker.
    pub fn iter(&self) -> impl Iterator<Item = (EventID, f64, &Domain)> {
        self.events.iter().map(|(eid, (t, d))| (*eid, *t, d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Birth;
    use crate::model::{ReactionRule, Species};

    fn dummy_domain() -> Domain {
        Domain::Birth(Birth {
            rule: ReactionRule::birth(Species::new("A"), 1.0),
        })
    }

    #[test]
    fn test_pop_in_time_order() {
        let mut s = Scheduler::new();
        let e2 = s.add(dummy_domain(), 2.0);
        let e0 = s.add(dummy_domain(), 0.5);
        let e1 = s.add(dummy_domain(), 1.0);

        let order: Vec<EventID> = std::iter::from_fn(|| s.pop_next().map(|(e, _, _)| e)).collect();
        assert_eq!(order, vec![e0, e1, e2]);
    }

    #[test]
    fn test_ties_break_by_event_id() {
        let mut s = Scheduler::new();
        let a = s.add(dummy_domain(), 1.0);
        let b = s.add(dummy_domain(), 1.0);
        assert!(a < b);
        assert_eq!(s.pop_next().unwrap().0, a);
        assert_eq!(s.pop_next().unwrap().0, b);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut s = Scheduler::new();
        let e = s.add(dummy_domain(), 1.0);
        assert!(s.remove(e).is_some());
        assert!(s.remove(e).is_none());
        assert!(s.pop_next().is_none());
    }

    #[test]
    fn test_removed_event_never_fires() {
        let mut s = Scheduler::new();
        let first = s.add(dummy_domain(), 1.0);
        let second = s.add(dummy_domain(), 2.0);
        s.remove(first);
        assert_eq!(s.peek_time(), Some(2.0));
        assert_eq!(s.pop_next().unwrap().0, second);
    }

    #[test]
    fn test_ids_not_reused_after_removal() {
        let mut s = Scheduler::new();
        let a = s.add(dummy_domain(), 1.0);
        s.remove(a);
        let b = s.add(dummy_domain(), 1.0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_infinite_times_sort_last() {
        let mut s = Scheduler::new();
        let never = s.add(dummy_domain(), f64::INFINITY);
        let soon = s.add(dummy_domain(), 0.1);
        assert_eq!(s.pop_next().unwrap().0, soon);
        assert_eq!(s.pop_next().unwrap().0, never);
    }
}

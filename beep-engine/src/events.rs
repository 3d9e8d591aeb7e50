//! Tracks which scheduled event ids can still fire, and any client thread
//! blocked waiting on one of them.

use std::collections::{HashMap, HashSet};

use crossbeam_channel::Sender;

struct PendingWait {
    responder: Sender<bool>,
}

/// The set of event ids that have been scheduled but not yet fired or ruled
/// out, plus at most one pending wait per id.
#[derive(Default)]
pub struct EventRegistry {
    possible: HashSet<u32>,
    pending: HashMap<u32, PendingWait>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_possible(&mut self, event_id: u32) {
        self.possible.insert(event_id);
    }

    pub fn is_possible(&self, event_id: u32) -> bool {
        self.possible.contains(&event_id)
    }

    /// Records a wait for `event_id`. If one was already pending for the
    /// same id, it is immediately resolved to `false` — a caller never
    /// blocks forever behind a wait that got silently superseded.
    pub fn register_wait(&mut self, event_id: u32, responder: Sender<bool>) {
        if let Some(previous) = self.pending.insert(event_id, PendingWait { responder }) {
            let _ = previous.responder.send(false);
        }
    }

    /// The scheduled event has fired: it can never be waited on again, and
    /// any caller currently blocked on it is released with `true`.
    pub fn fire(&mut self, event_id: u32) {
        self.possible.remove(&event_id);
        if let Some(wait) = self.pending.remove(&event_id) {
            let _ = wait.responder.send(true);
        }
    }

    /// Releases every outstanding wait with `false`. Called when the engine
    /// stops so no caller is left blocked forever.
    pub fn fail_all(&mut self) {
        for (_, wait) in self.pending.drain() {
            let _ = wait.responder.send(false);
        }
        self.possible.clear();
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.possible.is_empty() && self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn fire_resolves_pending_wait_true() {
        let mut reg = EventRegistry::new();
        reg.mark_possible(1);
        let (tx, rx) = bounded(1);
        reg.register_wait(1, tx);
        reg.fire(1);
        assert_eq!(rx.try_recv(), Ok(true));
        assert!(!reg.is_possible(1));
    }

    #[test]
    fn fire_with_no_pending_wait_still_clears_possible_set() {
        let mut reg = EventRegistry::new();
        reg.mark_possible(7);
        reg.fire(7);
        assert!(!reg.is_possible(7));
    }

    #[test]
    fn second_wait_for_same_id_resolves_first_to_false() {
        let mut reg = EventRegistry::new();
        reg.mark_possible(9);
        let (tx1, rx1) = bounded(1);
        let (tx2, rx2) = bounded(1);
        reg.register_wait(9, tx1);
        reg.register_wait(9, tx2);
        assert_eq!(rx1.try_recv(), Ok(false));
        reg.fire(9);
        assert_eq!(rx2.try_recv(), Ok(true));
    }

    #[test]
    fn fail_all_resolves_outstanding_waits_false() {
        let mut reg = EventRegistry::new();
        reg.mark_possible(1);
        reg.mark_possible(2);
        let (tx1, rx1) = bounded(1);
        let (tx2, rx2) = bounded(1);
        reg.register_wait(1, tx1);
        reg.register_wait(2, tx2);
        reg.fail_all();
        assert_eq!(rx1.try_recv(), Ok(false));
        assert_eq!(rx2.try_recv(), Ok(false));
        assert!(reg.is_empty());
    }
}

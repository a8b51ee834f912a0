//! Leader bookkeeping.

use buggyrace_core::race::BuggyId;

/// Remembers the announced leader and whether the race has a finisher.
///
/// On an exact tie the current leader keeps the lead; among challengers the
/// first in iteration order wins, which is the lowest id for a `BTreeMap`.
#[derive(Debug, Default, Clone)]
pub struct LeaderTracker {
    announced: Option<BuggyId>,
    finished: bool,
}

impl LeaderTracker {
    pub fn leader(&self) -> Option<&BuggyId> {
        self.announced.as_ref()
    }

    /// Once a finish has been seen, the leader is frozen.
    pub fn record_finish(&mut self) {
        self.finished = true;
    }

    pub fn has_finisher(&self) -> bool {
        self.finished
    }

    /// Picks the leader from `(id, unwrapped distance)` pairs. Returns the new
    /// leader only when it differs from the previously announced one.
    pub fn evaluate<'a, I>(&mut self, standings: I) -> Option<BuggyId>
    where
        I: IntoIterator<Item = (&'a BuggyId, f64)>,
    {
        if self.finished {
            return None;
        }

        let standings: Vec<(&BuggyId, f64)> = standings.into_iter().collect();
        let mut best = self
            .announced
            .as_ref()
            .and_then(|leader| standings.iter().find(|(id, _)| *id == leader).copied());
        for &(id, distance) in &standings {
            match best {
                Some((_, best_distance)) if distance <= best_distance => {}
                _ => best = Some((id, distance)),
            }
        }

        let (candidate, _) = best?;
        if self.announced.as_ref() == Some(candidate) {
            return None;
        }
        self.announced = Some(candidate.clone());
        self.announced.clone()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (BuggyId, BuggyId, BuggyId) {
        ("ada".into(), "bob".into(), "cyd".into())
    }

    #[test]
    fn announces_only_on_change() {
        let (ada, bob, _) = ids();
        let mut tracker = LeaderTracker::default();
        assert_eq!(tracker.evaluate([(&ada, 10.0), (&bob, 5.0)]), Some(ada.clone()));
        assert_eq!(tracker.evaluate([(&ada, 20.0), (&bob, 10.0)]), None);
        assert_eq!(tracker.evaluate([(&ada, 20.0), (&bob, 25.0)]), Some(bob.clone()));
        assert_eq!(tracker.leader(), Some(&bob));
    }

    #[test]
    fn incumbent_keeps_lead_on_tie() {
        let (ada, bob, _) = ids();
        let mut tracker = LeaderTracker::default();
        tracker.evaluate([(&ada, 5.0), (&bob, 9.0)]);
        assert_eq!(tracker.evaluate([(&ada, 12.0), (&bob, 12.0)]), None);
        assert_eq!(tracker.leader(), Some(&bob));
    }

    #[test]
    fn first_in_order_wins_fresh_tie() {
        let (ada, bob, cyd) = ids();
        let mut tracker = LeaderTracker::default();
        assert_eq!(
            tracker.evaluate([(&ada, 3.0), (&bob, 8.0), (&cyd, 8.0)]),
            Some(bob)
        );
    }

    #[test]
    fn finish_freezes_leader() {
        let (ada, bob, _) = ids();
        let mut tracker = LeaderTracker::default();
        tracker.evaluate([(&ada, 10.0), (&bob, 5.0)]);
        tracker.record_finish();
        assert_eq!(tracker.evaluate([(&ada, 10.0), (&bob, 50.0)]), None);
        assert_eq!(tracker.leader(), Some(&ada));
    }

    #[test]
    fn reset_forgets_everything() {
        let (ada, _, _) = ids();
        let mut tracker = LeaderTracker::default();
        tracker.evaluate([(&ada, 1.0)]);
        tracker.record_finish();
        tracker.reset();
        assert!(tracker.leader().is_none());
        assert!(!tracker.has_finisher());
        assert_eq!(tracker.evaluate([(&ada, 1.0)]), Some(ada));
    }
}

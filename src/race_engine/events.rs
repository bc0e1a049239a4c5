//! Events - What the simulation reports to presentation
//!
//! The race never holds on to presentation callbacks. Each tick it is handed
//! an observer and pushes owned copies of whatever changed.

use serde::{Deserialize, Serialize};

use crate::race_engine::race::{FinalResults, LiveRanking, RaceResult};
use crate::race_engine::skills::Notification;

/// A single change reported by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RaceEvent {
    RankingChanged(LiveRanking),
    NotificationChanged(Notification),
    RacerFinished(RaceResult),
    RaceFinished(FinalResults),
}

/// Receiver for simulation output. Every method defaults to doing nothing.
pub trait RaceObserver {
    fn ranking_changed(&mut self, _ranking: &LiveRanking) {}
    fn notification_changed(&mut self, _notification: &Notification) {}
    fn racer_finished(&mut self, _result: &RaceResult) {}
    fn race_finished(&mut self, _results: &FinalResults) {}
}

/// Discards everything.
impl RaceObserver for () {}

/// Collects events in order.
impl RaceObserver for Vec<RaceEvent> {
    fn ranking_changed(&mut self, ranking: &LiveRanking) {
        self.push(RaceEvent::RankingChanged(ranking.clone()));
    }

    fn notification_changed(&mut self, notification: &Notification) {
        self.push(RaceEvent::NotificationChanged(notification.clone()));
    }

    fn racer_finished(&mut self, result: &RaceResult) {
        self.push(RaceEvent::RacerFinished(result.clone()));
    }

    fn race_finished(&mut self, results: &FinalResults) {
        self.push(RaceEvent::RaceFinished(results.clone()));
    }
}

/// Forwards events to another thread. A dropped receiver is not an error for
/// the simulation; the race keeps running headless.
impl RaceObserver for flume::Sender<RaceEvent> {
    fn ranking_changed(&mut self, ranking: &LiveRanking) {
        forward(self, RaceEvent::RankingChanged(ranking.clone()));
    }

    fn notification_changed(&mut self, notification: &Notification) {
        forward(self, RaceEvent::NotificationChanged(notification.clone()));
    }

    fn racer_finished(&mut self, result: &RaceResult) {
        forward(self, RaceEvent::RacerFinished(result.clone()));
    }

    fn race_finished(&mut self, results: &FinalResults) {
        forward(self, RaceEvent::RaceFinished(results.clone()));
    }
}

fn forward(tx: &flume::Sender<RaceEvent>, event: RaceEvent) {
    if tx.send(event).is_err() {
        log::trace!("event receiver dropped");
    }
}

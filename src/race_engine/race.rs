//! Race - Race state, per-tick update and standings
//!
//! `Race::tick` advances the race by exactly one frame: skill events, then
//! movement, then ranking, then the finish check.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::RaceError;
use crate::race_engine::config::RaceConfig;
use crate::race_engine::events::RaceObserver;
use crate::race_engine::racer::{Racer, RacerSnapshot, RacerState, RgbColor};
use crate::race_engine::rng::RandomSource;
use crate::race_engine::skills::{EffectKind, Notification, SkillEngine};

/// Placeholder shown in empty ranking and result slots
pub const EMPTY_SLOT: &str = "---";

/// Race status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceStatus {
    Racing,
    Finished,
}

/// One finisher's result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub racer_id: u32,
    pub racer_name: String,
    pub finish_time: f32,
    /// 1-based finishing place
    pub position: u32,
}

/// Top three names by current position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveRanking {
    pub rank1: String,
    pub rank2: String,
    pub rank3: String,
}

impl Default for LiveRanking {
    fn default() -> Self {
        Self {
            rank1: EMPTY_SLOT.to_string(),
            rank2: EMPTY_SLOT.to_string(),
            rank3: EMPTY_SLOT.to_string(),
        }
    }
}

impl LiveRanking {
    fn from_order(racers: &[RacerState], order: &[usize]) -> Self {
        let name = |slot: usize| {
            order
                .get(slot)
                .map(|&i| racers[i].name.clone())
                .unwrap_or_else(|| EMPTY_SLOT.to_string())
        };
        Self {
            rank1: name(0),
            rank2: name(1),
            rank3: name(2),
        }
    }
}

/// Winners and the full finish order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResults {
    /// Exactly `winner_count` names, padded with the placeholder
    pub winners: Vec<String>,
    /// Every finisher by finish time
    pub standings: Vec<RaceResult>,
}

impl FinalResults {
    /// Name in a 1-based place, or the placeholder.
    pub fn winner(&self, place: usize) -> &str {
        place
            .checked_sub(1)
            .and_then(|i| self.winners.get(i))
            .map(String::as_str)
            .unwrap_or(EMPTY_SLOT)
    }

    fn from_racers(racers: &[RacerState], winner_count: usize) -> Self {
        let mut finishers: Vec<&RacerState> = racers.iter().filter(|r| r.is_finished()).collect();
        finishers.sort_by(|a, b| {
            let (a, b) = (a.finish_time.unwrap_or(f32::MAX), b.finish_time.unwrap_or(f32::MAX));
            a.total_cmp(&b)
        });

        let standings: Vec<RaceResult> = finishers
            .iter()
            .enumerate()
            .map(|(i, r)| RaceResult {
                racer_id: r.id,
                racer_name: r.name.clone(),
                finish_time: r.finish_time.unwrap_or_default(),
                position: (i + 1) as u32,
            })
            .collect();

        let winners = (0..winner_count)
            .map(|i| {
                standings
                    .get(i)
                    .map(|r| r.racer_name.clone())
                    .unwrap_or_else(|| EMPTY_SLOT.to_string())
            })
            .collect();

        Self { winners, standings }
    }
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    /// Skill effect triggered this tick
    pub triggered: Option<EffectKind>,
    /// Racers that crossed the line this tick
    pub new_finishers: usize,
    /// True only on the tick the last racer finished
    pub race_finished: bool,
}

/// Complete race state
#[derive(Debug, Clone)]
pub struct Race {
    config: RaceConfig,
    status: RaceStatus,
    /// Racers in id order
    racers: Vec<RacerState>,
    skills: SkillEngine,
    /// Elapsed race time at the latest tick
    elapsed_time: f32,
    finish_order: Vec<RaceResult>,
    live_ranking: LiveRanking,
    final_results: Option<FinalResults>,
}

impl Race {
    /// Create a race with one racer per name, ids assigned in order. Names are
    /// validated by the caller.
    pub fn new(config: RaceConfig, names: Vec<String>, rng: &mut dyn RandomSource) -> Self {
        let count = names.len();
        let spacing = if count > 1 {
            config.track_width / count as f32
        } else {
            0.0
        };

        let racers = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let lane = if count > 1 {
                    -config.track_width / 2.0 + spacing * (i as f32 + 0.5)
                } else {
                    0.0
                };
                let color = RgbColor::from_hsl(rng.next_unit(), 0.7, 0.6);
                let bob_offset = rng.next_unit() * std::f32::consts::TAU;
                RacerState::new(i as u32, name, 0.0).with_appearance(lane, color, bob_offset)
            })
            .collect();

        Self {
            skills: SkillEngine::new(config.skills.clone()),
            config,
            status: RaceStatus::Racing,
            racers,
            elapsed_time: 0.0,
            finish_order: Vec::new(),
            live_ranking: LiveRanking::default(),
            final_results: None,
        }
    }

    /// Advance the race by one frame.
    ///
    /// Skill effects run first so movement starts from any repositioned
    /// racer. The finish check sees this tick's movement, so the race ends on
    /// the tick the last racer crosses the line. Ticks after the finish do
    /// nothing.
    pub fn tick(
        &mut self,
        delta: f32,
        elapsed: f32,
        rng: &mut dyn RandomSource,
        observer: &mut dyn RaceObserver,
    ) -> Result<TickReport, RaceError> {
        if self.status == RaceStatus::Finished {
            return Ok(TickReport::default());
        }
        if !delta.is_finite() || delta < 0.0 {
            return Err(RaceError::InvalidTimeStep { delta });
        }
        if !elapsed.is_finite() {
            return Err(RaceError::InvalidElapsed { elapsed });
        }

        self.elapsed_time = elapsed;
        let mut report = TickReport {
            triggered: self.skills.process(
                elapsed,
                &mut self.racers,
                self.config.distance,
                false,
                rng,
                observer,
            ),
            ..TickReport::default()
        };

        let freezer = self.skills.freezer_id();
        for racer in self.racers.iter_mut().filter(|r| !r.is_finished()) {
            let can_move = freezer.map_or(true, |id| id == racer.id);
            if Racer::update(racer, &self.config, can_move, delta, elapsed, rng) {
                let result = RaceResult {
                    racer_id: racer.id,
                    racer_name: racer.name.clone(),
                    finish_time: elapsed,
                    position: (self.finish_order.len() + 1) as u32,
                };
                log::debug!("{} finished at {:.2}s", racer.name, elapsed);
                observer.racer_finished(&result);
                self.finish_order.push(result);
                report.new_finishers += 1;
            }
        }

        let order = self.ranking_order();
        self.live_ranking = LiveRanking::from_order(&self.racers, &order);
        observer.ranking_changed(&self.live_ranking);

        if self.finisher_count() == self.racers.len() {
            self.finish(observer);
            report.race_finished = true;
        }

        Ok(report)
    }

    fn finish(&mut self, observer: &mut dyn RaceObserver) {
        if self.status == RaceStatus::Finished {
            return;
        }
        self.status = RaceStatus::Finished;
        self.skills.clear_all(observer);
        for racer in &mut self.racers {
            racer.is_boosting = false;
        }

        let results = FinalResults::from_racers(&self.racers, self.config.winner_count);
        log::info!(
            "Race finished after {:.2}s, winners: {}",
            self.elapsed_time,
            results.winners.join(", ")
        );
        observer.race_finished(&results);
        self.final_results = Some(results);
    }

    /// Racer indices from first to last place.
    ///
    /// Further along ranks higher; at equal position a finished racer beats
    /// an unfinished one and the earlier finish time wins.
    pub fn ranking_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.racers.len()).collect();
        order.sort_by(|&a, &b| compare_standing(&self.racers[a], &self.racers[b]));
        order
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn status(&self) -> RaceStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status == RaceStatus::Finished
    }

    pub fn racers(&self) -> &[RacerState] {
        &self.racers
    }

    pub fn skills(&self) -> &SkillEngine {
        &self.skills
    }

    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }

    pub fn finisher_count(&self) -> usize {
        self.racers.iter().filter(|r| r.is_finished()).count()
    }

    pub fn finish_order(&self) -> &[RaceResult] {
        &self.finish_order
    }

    pub fn live_ranking(&self) -> &LiveRanking {
        &self.live_ranking
    }

    pub fn final_results(&self) -> Option<&FinalResults> {
        self.final_results.as_ref()
    }

    /// Get racer by ID
    pub fn get_racer(&self, id: u32) -> Option<&RacerState> {
        self.racers.iter().find(|r| r.id == id)
    }

    /// Owned snapshot for presentation
    pub fn get_snapshot(&self) -> RaceSnapshot {
        let order = self.ranking_order();
        let mut racers: Vec<RacerSnapshot> = self.racers.iter().map(RacerSnapshot::from).collect();
        for (place, &i) in order.iter().enumerate() {
            racers[i].rank = place + 1;
            if self.status == RaceStatus::Racing {
                racers[i].label_color = RgbColor::podium(place + 1);
            }
        }

        RaceSnapshot {
            status: self.status,
            elapsed_time: self.elapsed_time,
            finisher_count: self.finisher_count() as u32,
            racers,
            live_ranking: self.live_ranking.clone(),
            notifications: self.skills.active_notifications(),
            recording: false,
        }
    }
}

fn compare_standing(a: &RacerState, b: &RacerState) -> Ordering {
    b.position
        .total_cmp(&a.position)
        .then_with(|| match (a.finish_time, b.finish_time) {
            (Some(ta), Some(tb)) => ta.total_cmp(&tb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Compact race snapshot for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub status: RaceStatus,
    pub elapsed_time: f32,
    pub finisher_count: u32,
    /// Racers in id order
    pub racers: Vec<RacerSnapshot>,
    pub live_ranking: LiveRanking,
    /// Banners currently showing
    pub notifications: Vec<Notification>,
    pub recording: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race_engine::events::RaceEvent;
    use crate::race_engine::rng::ScriptedRandom;

    const FRAME: f32 = 1.0 / 60.0;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn quiet_race(list: &[&str]) -> Race {
        let mut rng = ScriptedRandom::new([]);
        Race::new(RaceConfig::default().without_skills(), names(list), &mut rng)
    }

    fn racer(id: u32, position: f32, finish_time: Option<f32>) -> RacerState {
        let mut r = RacerState::new(id, format!("R{}", id), position);
        r.finish_time = finish_time;
        r
    }

    #[test]
    fn racers_get_sequential_ids_and_lanes() {
        let race = quiet_race(&["A", "B", "C", "D"]);
        let ids: Vec<u32> = race.racers().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(race.racers()[0].lane, -15.0);
        assert_eq!(race.racers()[3].lane, 15.0);
        assert!(race.racers().iter().all(|r| r.position == 0.0 && !r.is_finished()));
    }

    #[test]
    fn ties_prefer_earlier_finish() {
        let a = racer(0, 200.0, Some(12.0));
        let b = racer(1, 200.0, Some(11.0));
        assert_eq!(compare_standing(&a, &b), Ordering::Greater);

        let finished = racer(0, 50.0, Some(3.0));
        let running = racer(1, 50.0, None);
        assert_eq!(compare_standing(&finished, &running), Ordering::Less);
        assert_eq!(compare_standing(&running, &finished), Ordering::Greater);

        let ahead = racer(0, 60.0, None);
        assert_eq!(compare_standing(&ahead, &running), Ordering::Less);
    }

    #[test]
    fn live_ranking_pads_short_fields() {
        let mut race = quiet_race(&["A", "B"]);
        let mut rng = ScriptedRandom::new([]);
        race.tick(FRAME, FRAME, &mut rng, &mut ()).unwrap();
        let ranking = race.live_ranking();
        assert_ne!(ranking.rank1, EMPTY_SLOT);
        assert_ne!(ranking.rank2, EMPTY_SLOT);
        assert_eq!(ranking.rank3, EMPTY_SLOT);
    }

    #[test]
    fn tick_emits_ranking_every_frame() {
        let mut race = quiet_race(&["A", "B", "C"]);
        let mut rng = ScriptedRandom::new([]);
        let mut events: Vec<RaceEvent> = Vec::new();
        race.tick(FRAME, FRAME, &mut rng, &mut events).unwrap();
        race.tick(FRAME, 2.0 * FRAME, &mut rng, &mut events).unwrap();
        let rankings = events
            .iter()
            .filter(|e| matches!(e, RaceEvent::RankingChanged(_)))
            .count();
        assert_eq!(rankings, 2);
    }

    #[test]
    fn frozen_racers_hold_position() {
        let mut race = quiet_race(&["A", "B", "C"]);
        race.skills = SkillEngine::new(crate::race_engine::skills::SkillConfig::default());
        // freeze roll, freezer = racer 2, duration 2.0
        let mut rng = ScriptedRandom::new([0.001, 0.9, 0.0]);
        race.tick(FRAME, FRAME, &mut rng, &mut ()).unwrap();
        assert_eq!(race.skills().freezer_id(), Some(2));
        assert_eq!(race.racers()[0].position, 0.0);
        assert_eq!(race.racers()[1].position, 0.0);
        assert!(race.racers()[2].position > 0.0);

        for i in 2..60 {
            race.tick(FRAME, i as f32 * FRAME, &mut rng, &mut ()).unwrap();
        }
        assert_eq!(race.racers()[0].position, 0.0);
        assert_eq!(race.racers()[1].position, 0.0);
    }

    #[test]
    fn invalid_delta_is_rejected_without_changes() {
        let mut race = quiet_race(&["A", "B"]);
        let mut rng = ScriptedRandom::new([]);
        let err = race.tick(f32::NAN, 0.0, &mut rng, &mut ()).unwrap_err();
        assert!(matches!(err, RaceError::InvalidTimeStep { .. }));
        let err = race.tick(-1.0, 0.0, &mut rng, &mut ()).unwrap_err();
        assert!(matches!(err, RaceError::InvalidTimeStep { .. }));
        let err = race.tick(0.1, f32::INFINITY, &mut rng, &mut ()).unwrap_err();
        assert!(matches!(err, RaceError::InvalidElapsed { elapsed } if elapsed.is_infinite()));
        assert!(race.racers().iter().all(|r| r.position == 0.0));
    }

    #[test]
    fn finishes_on_the_tick_the_last_racer_crosses() {
        let mut race = quiet_race(&["A", "B"]);
        let mut rng = ScriptedRandom::new([]);
        let mut events: Vec<RaceEvent> = Vec::new();
        let mut ticks = 0;
        let mut finished_reports = 0;
        while !race.is_finished() && ticks < 10_000 {
            ticks += 1;
            let report = race
                .tick(FRAME, ticks as f32 * FRAME, &mut rng, &mut events)
                .unwrap();
            if report.race_finished {
                finished_reports += 1;
                assert_eq!(report.new_finishers, 2);
            }
        }
        assert!(race.is_finished());
        assert_eq!(finished_reports, 1);
        assert!(race.racers().iter().all(|r| r.position == race.config().distance));

        // stale ticks do nothing
        let before = race.racers()[0].finish_time;
        let report = race.tick(FRAME, 999.0, &mut rng, &mut events).unwrap();
        assert_eq!(report, TickReport::default());
        assert_eq!(race.racers()[0].finish_time, before);

        let results = race.final_results().unwrap();
        assert_eq!(results.winners, vec!["A".to_string(), "B".to_string(), EMPTY_SLOT.to_string()]);
        assert_eq!(results.winner(1), "A");
        assert_eq!(results.winner(3), EMPTY_SLOT);
        assert_eq!(results.standings.len(), 2);
        assert_eq!(
            events.iter().filter(|e| matches!(e, RaceEvent::RaceFinished(_))).count(),
            1
        );
    }

    #[test]
    fn final_results_sort_by_finish_time() {
        let racers = vec![
            racer(0, 200.0, Some(9.0)),
            racer(1, 200.0, Some(7.5)),
            racer(2, 200.0, Some(8.0)),
            racer(3, 200.0, Some(10.0)),
        ];
        let results = FinalResults::from_racers(&racers, 3);
        assert_eq!(results.winners, vec!["R1", "R2", "R0"]);
        assert_eq!(results.standings[3].racer_name, "R3");
        assert_eq!(results.standings[3].position, 4);
    }

    #[test]
    fn snapshot_is_a_copy_with_podium_labels() {
        let mut race = quiet_race(&["A", "B", "C", "D"]);
        race.racers[2].position = 10.0;
        let mut snapshot = race.get_snapshot();
        assert_eq!(snapshot.racers[2].rank, 1);
        assert_eq!(snapshot.racers[2].label_color, RgbColor::GOLD);

        snapshot.racers[2].position = 150.0;
        assert_eq!(race.racers()[2].position, 10.0);
    }
}

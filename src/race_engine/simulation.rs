//! Simulation - Race lifecycle controller
//!
//! `RaceSession` owns the clock, the random source and the observer, and
//! moves between setup, running and finished. Refused transitions are
//! reported as warnings and never touch race state.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::RaceError;
use crate::race_engine::clock::{MonotonicTime, RaceClock, TimeSource};
use crate::race_engine::config::RaceConfig;
use crate::race_engine::events::RaceObserver;
use crate::race_engine::names::generate_names;
use crate::race_engine::race::{FinalResults, LiveRanking, Race, RaceSnapshot};
use crate::race_engine::rng::{RandomSource, RngSource};

/// Lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    Setup,
    Running,
    Finished,
}

/// Session statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub tick_rate: f32,
    pub avg_tick_time_ms: f32,
    pub racer_count: u32,
    pub ticks: u64,
    pub phase: RacePhase,
    pub paused: bool,
}

/// Race lifecycle controller
pub struct RaceSession {
    config: RaceConfig,
    phase: RacePhase,
    /// Active race (if any)
    race: Option<Race>,
    clock: RaceClock,
    rng: Box<dyn RandomSource + Send>,
    observer: Box<dyn RaceObserver + Send>,
    /// Target tick rate (ticks per second)
    tick_rate: f32,
    /// Recent tick costs for averaging
    tick_times: Vec<f32>,
    ticks: u64,
    paused: bool,
    recording: bool,
}

impl RaceSession {
    /// Session on wall-clock time with live randomness and no observer.
    pub fn new(config: RaceConfig) -> Self {
        Self {
            config,
            phase: RacePhase::Setup,
            race: None,
            clock: RaceClock::new(Box::new(MonotonicTime::new())),
            rng: Box::new(RngSource::from_entropy()),
            observer: Box::new(()),
            tick_rate: 60.0,
            tick_times: Vec::with_capacity(60),
            ticks: 0,
            paused: false,
            recording: false,
        }
    }

    pub fn with_time_source(mut self, source: Box<dyn TimeSource>) -> Self {
        self.clock = RaceClock::new(source);
        self
    }

    pub fn with_random(mut self, rng: Box<dyn RandomSource + Send>) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn RaceObserver + Send>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_tick_rate(mut self, tick_rate: f32) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Validate participants and start a race.
    ///
    /// A non-empty name list decides the field and needs at least 2 names;
    /// otherwise `count` names are generated and `count` must be at least 2.
    /// Blank names are ignored.
    pub fn start_race(&mut self, count: usize, names: &[String]) -> Result<(), RaceError> {
        match self.phase {
            RacePhase::Running => {
                log::warn!("Cannot start: a race is already running");
                return Err(RaceError::AlreadyRunning);
            }
            RacePhase::Finished => {
                log::warn!("Cannot start: reset the finished race first");
                return Err(RaceError::AwaitingReset);
            }
            RacePhase::Setup => {}
        }
        self.config.validate()?;

        let names: Vec<String> = names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        let names = if !names.is_empty() {
            if names.len() < 2 {
                return Err(RaceError::NotEnoughNames { given: names.len() });
            }
            names
        } else {
            if count < 2 {
                return Err(RaceError::NotEnoughParticipants { given: count });
            }
            generate_names(count, self.rng.as_mut())
        };

        if self.config.winner_count > names.len() {
            log::warn!(
                "Winner count {} exceeds {} participants",
                self.config.winner_count,
                names.len()
            );
        }

        let racer_count = names.len();
        self.race = Some(Race::new(self.config.clone(), names, self.rng.as_mut()));
        self.observer.ranking_changed(&LiveRanking::default());
        self.tick_times.clear();
        self.ticks = 0;
        self.paused = false;
        self.clock.reset();
        self.clock.start();
        self.phase = RacePhase::Running;
        log::info!("Race started with {} racers", racer_count);
        Ok(())
    }

    /// Perform a single simulation tick.
    ///
    /// Outside a running race (or while paused) this does no work and only
    /// returns the current snapshot, so a stale scheduled tick is harmless.
    pub fn tick(&mut self) -> Result<Option<RaceSnapshot>, RaceError> {
        if self.phase != RacePhase::Running || self.paused {
            return Ok(self.get_snapshot());
        }

        let delta = self.clock.get_delta();
        let elapsed = self.clock.get_elapsed_time();

        // Track tick timing
        let tick_start = Instant::now();

        if let Some(race) = &mut self.race {
            let result = race.tick(delta, elapsed, self.rng.as_mut(), self.observer.as_mut());
            let report = match result {
                Ok(report) => report,
                Err(err) => {
                    self.halt(&err);
                    return Err(err);
                }
            };
            self.ticks += 1;

            if report.race_finished {
                self.clock.stop();
                self.phase = RacePhase::Finished;
                log::info!("Race finished after {} ticks", self.ticks);
            }
        }

        // Record tick time
        let tick_time = tick_start.elapsed().as_secs_f32() * 1000.0;
        self.tick_times.push(tick_time);
        if self.tick_times.len() > 60 {
            self.tick_times.remove(0);
        }

        Ok(self.get_snapshot())
    }

    /// Stop a race whose tick failed. The session moves to `Finished` without
    /// results, so `reset` can recover it.
    fn halt(&mut self, err: &RaceError) {
        log::error!("Tick failed, halting race: {}", err);
        self.clock.stop();
        self.paused = false;
        self.phase = RacePhase::Finished;
    }

    /// Discard the finished race and return to setup. A no-op in setup;
    /// refused while a race is running.
    pub fn reset(&mut self) -> Result<(), RaceError> {
        match self.phase {
            RacePhase::Running => {
                log::warn!("Cannot reset while the race is running");
                Err(RaceError::ResetWhileRunning)
            }
            RacePhase::Setup => Ok(()),
            RacePhase::Finished => {
                self.race = None;
                self.clock.reset();
                self.phase = RacePhase::Setup;
                self.paused = false;
                self.tick_times.clear();
                self.ticks = 0;
                self.observer.ranking_changed(&LiveRanking::default());
                log::info!("Race reset");
                Ok(())
            }
        }
    }

    /// Pause the running race. Effect timers pause with the clock.
    pub fn pause(&mut self) {
        if self.phase == RacePhase::Running && !self.paused {
            self.clock.stop();
            self.paused = true;
            log::info!("Race paused");
        }
    }

    /// Resume a paused race.
    pub fn resume(&mut self) {
        if self.phase == RacePhase::Running && self.paused {
            self.clock.start();
            self.paused = false;
            log::info!("Race resumed");
        }
    }

    /// Current race snapshot
    pub fn get_snapshot(&self) -> Option<RaceSnapshot> {
        self.race.as_ref().map(|race| {
            let mut snapshot = race.get_snapshot();
            snapshot.recording = self.recording;
            snapshot
        })
    }

    /// Final results once the race has finished
    pub fn get_results(&self) -> Option<FinalResults> {
        self.race.as_ref().and_then(|race| race.final_results().cloned())
    }

    pub fn get_stats(&self) -> SessionStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32
        };

        SessionStats {
            tick_rate: self.tick_rate,
            avg_tick_time_ms: avg_tick_time,
            racer_count: self.race.as_ref().map(|r| r.racers().len() as u32).unwrap_or(0),
            ticks: self.ticks,
            phase: self.phase,
            paused: self.paused,
        }
    }

    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == RacePhase::Running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn race(&self) -> Option<&Race> {
        self.race.as_ref()
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn tick_rate(&self) -> f32 {
        self.tick_rate
    }

    /// Screen recording is tracked for the UI only; it never affects the race.
    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }
}

impl std::fmt::Debug for RaceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaceSession")
            .field("phase", &self.phase)
            .field("clock", &self.clock)
            .field("ticks", &self.ticks)
            .field("paused", &self.paused)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::race_engine::clock::ManualTime;
    use crate::race_engine::rng::ScriptedRandom;

    fn session() -> (ManualTime, RaceSession) {
        let time = ManualTime::new();
        let session = RaceSession::new(RaceConfig::default().without_skills())
            .with_time_source(Box::new(time.clone()))
            .with_random(Box::new(ScriptedRandom::new([])));
        (time, session)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rejects_single_participant_without_state_change() {
        let (_, mut session) = session();
        let err = session.start_race(1, &[]).unwrap_err();
        assert!(matches!(err, RaceError::NotEnoughParticipants { given: 1 }));
        assert_eq!(session.phase(), RacePhase::Setup);
        assert!(session.race().is_none());
    }

    #[test]
    fn rejects_single_name_even_with_large_count() {
        let (_, mut session) = session();
        let err = session.start_race(10, &names(&["Solo", "  "])).unwrap_err();
        assert!(matches!(err, RaceError::NotEnoughNames { given: 1 }));
        assert!(session.race().is_none());
    }

    #[test]
    fn invalid_config_is_rejected_before_start() {
        let mut config = RaceConfig::default();
        config.min_speed = 0.0;
        let mut session = RaceSession::new(config).with_random(Box::new(ScriptedRandom::new([])));

        let err = session.start_race(2, &[]).unwrap_err();
        assert!(matches!(
            err,
            RaceError::Config(ConfigError::NotAbove { field: "min_speed", .. })
        ));
        assert!(!err.is_warning());
        assert_eq!(session.phase(), RacePhase::Setup);
        assert!(session.race().is_none());
    }

    #[test]
    fn stalled_speeds_never_start_a_race() {
        let mut config = RaceConfig::default().without_skills();
        config.base_speed = 0.0;
        config.min_speed = 0.0;
        config.speed_variation = 0.0;
        let mut session = RaceSession::new(config);
        assert!(matches!(session.start_race(2, &[]), Err(RaceError::Config(_))));
        assert!(!session.is_running());
    }

    #[test]
    fn failed_tick_leaves_session_recoverable() {
        let (time, mut session) = session();
        session.start_race(2, &[]).unwrap();
        time.advance_secs(1.0 / 60.0);
        session.tick().unwrap();

        session.halt(&RaceError::InvalidTimeStep { delta: f32::NAN });
        assert_eq!(session.phase(), RacePhase::Finished);
        assert!(!session.is_running());
        assert!(session.get_results().is_none());

        session.reset().unwrap();
        assert_eq!(session.phase(), RacePhase::Setup);
        session.start_race(2, &[]).unwrap();
        assert!(session.is_running());
    }

    #[test]
    fn names_override_count() {
        let (_, mut session) = session();
        session.start_race(20, &names(&["A", " B "])).unwrap();
        let race = session.race().unwrap();
        assert_eq!(race.racers().len(), 2);
        assert_eq!(race.racers()[1].name, "B");
    }

    #[test]
    fn empty_names_generate_count_racers() {
        let (_, mut session) = session();
        session.start_race(5, &[]).unwrap();
        assert_eq!(session.get_stats().racer_count, 5);
    }

    #[test]
    fn start_twice_is_refused() {
        let (_, mut session) = session();
        session.start_race(2, &[]).unwrap();
        let err = session.start_race(3, &[]).unwrap_err();
        assert!(err.is_warning());
        assert_eq!(session.race().unwrap().racers().len(), 2);
    }

    #[test]
    fn reset_refused_while_running() {
        let (_, mut session) = session();
        session.start_race(2, &[]).unwrap();
        assert!(matches!(session.reset(), Err(RaceError::ResetWhileRunning)));
        assert!(session.is_running());
    }

    #[test]
    fn reset_in_setup_is_idempotent() {
        let (_, mut session) = session();
        session.reset().unwrap();
        session.reset().unwrap();
        assert_eq!(session.phase(), RacePhase::Setup);
        assert!(session.get_snapshot().is_none());
        assert_eq!(session.get_stats().ticks, 0);
    }

    #[test]
    fn tick_uses_clock_delta() {
        let (time, mut session) = session();
        session.start_race(2, &[]).unwrap();
        time.advance_secs(1.0 / 60.0);
        let snapshot = session.tick().unwrap().unwrap();
        assert!(snapshot.racers.iter().all(|r| r.position > 0.13 && r.position < 0.15));
        assert_eq!(session.get_stats().ticks, 1);
    }

    #[test]
    fn paused_session_does_not_advance() {
        let (time, mut session) = session();
        session.start_race(2, &[]).unwrap();
        session.pause();
        time.advance_secs(1.0);
        let snapshot = session.tick().unwrap().unwrap();
        assert!(snapshot.racers.iter().all(|r| r.position == 0.0));
        assert_eq!(snapshot.elapsed_time, 0.0);

        session.resume();
        time.advance_secs(1.0 / 60.0);
        let snapshot = session.tick().unwrap().unwrap();
        assert!(snapshot.racers.iter().all(|r| r.position > 0.0));
        assert!(snapshot.elapsed_time < 0.1);
    }

    #[test]
    fn full_lifecycle_returns_to_setup() {
        let (time, mut session) = session();
        session.start_race(0, &names(&["A", "B"])).unwrap();
        let mut guard = 0;
        while session.is_running() && guard < 10_000 {
            time.advance_secs(1.0 / 60.0);
            session.tick().unwrap();
            guard += 1;
        }
        assert_eq!(session.phase(), RacePhase::Finished);
        let results = session.get_results().unwrap();
        assert_eq!(results.winner(1), "A");

        assert!(matches!(session.start_race(2, &[]), Err(RaceError::AwaitingReset)));
        session.reset().unwrap();
        assert_eq!(session.phase(), RacePhase::Setup);
        assert!(session.get_results().is_none());
        session.start_race(3, &[]).unwrap();
        assert!(session.is_running());
    }

    #[test]
    fn recording_is_informational() {
        let (_, mut session) = session();
        session.start_race(2, &[]).unwrap();
        session.set_recording(true);
        assert!(session.get_snapshot().unwrap().recording);
        assert!(session.is_running());
    }
}

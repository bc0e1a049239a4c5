//! Skills - Random skill events
//!
//! Every tick the engine first expires finished effects, then (when no
//! notification is showing) rolls once for a new effect. Each effect kind owns
//! one slot, so at most one instance of a kind can be active.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::race_engine::events::RaceObserver;
use crate::race_engine::racer::RacerState;
use crate::race_engine::rng::{pick_index, shuffle, uniform, uniform_count, RandomSource};

/// The four skill effects, in the order their probability bands are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    TimeFreeze,
    KnockBack,
    FirstToLast,
    SpeedBoost,
}

impl EffectKind {
    pub const ALL: [EffectKind; 4] = [
        EffectKind::TimeFreeze,
        EffectKind::KnockBack,
        EffectKind::FirstToLast,
        EffectKind::SpeedBoost,
    ];

    fn index(self) -> usize {
        match self {
            EffectKind::TimeFreeze => 0,
            EffectKind::KnockBack => 1,
            EffectKind::FirstToLast => 2,
            EffectKind::SpeedBoost => 3,
        }
    }
}

/// Inclusive float range used for random durations and distances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    fn sample(&self, rng: &mut dyn RandomSource) -> f32 {
        uniform(rng, self.min, self.max)
    }

    fn check(&self, field: &'static str) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvertedRange {
                field,
                min: self.min,
                max: self.max,
            });
        }
        if self.min < 0.0 {
            return Err(ConfigError::NotAbove {
                field,
                min: 0.0,
                value: self.min,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeFreezeConfig {
    /// Per-tick trigger probability
    pub chance: f32,
    /// Freeze length in seconds; the banner shows for the same time
    pub duration: Span,
}

impl Default for TimeFreezeConfig {
    fn default() -> Self {
        Self {
            chance: 0.005,
            duration: Span::new(2.0, 3.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnockBackConfig {
    pub chance: f32,
    pub min_targets: usize,
    pub max_targets: usize,
    /// Distance each target is pushed back
    pub distance: Span,
    pub notification_secs: f32,
}

impl Default for KnockBackConfig {
    fn default() -> Self {
        Self {
            chance: 0.05,
            min_targets: 1,
            max_targets: 3,
            distance: Span::new(2.0, 3.0),
            notification_secs: 2.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirstToLastConfig {
    pub chance: f32,
    /// How far behind the last racer the leader is placed
    pub offset: f32,
    pub notification_secs: f32,
}

impl Default for FirstToLastConfig {
    fn default() -> Self {
        Self {
            chance: 0.001,
            offset: 1.0,
            notification_secs: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedBoostConfig {
    pub chance: f32,
    /// Mechanical boost length, independent of the banner
    pub duration: Span,
    pub factor: f32,
    pub notification_secs: f32,
}

impl Default for SpeedBoostConfig {
    fn default() -> Self {
        Self {
            chance: 0.025,
            duration: Span::new(1.5, 3.0),
            factor: 1.6,
            notification_secs: 2.0,
        }
    }
}

/// Tuning for all skill effects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillConfig {
    pub time_freeze: TimeFreezeConfig,
    pub knock_back: KnockBackConfig,
    pub first_to_last: FirstToLastConfig,
    pub speed_boost: SpeedBoostConfig,
}

impl SkillConfig {
    /// Same tuning with every trigger probability set to zero.
    pub fn disabled() -> Self {
        let mut config = Self::default();
        config.time_freeze.chance = 0.0;
        config.knock_back.chance = 0.0;
        config.first_to_last.chance = 0.0;
        config.speed_boost.chance = 0.0;
        config
    }

    pub fn chance(&self, kind: EffectKind) -> f32 {
        match kind {
            EffectKind::TimeFreeze => self.time_freeze.chance,
            EffectKind::KnockBack => self.knock_back.chance,
            EffectKind::FirstToLast => self.first_to_last.chance,
            EffectKind::SpeedBoost => self.speed_boost.chance,
        }
    }

    /// Map a roll in `[0, 1)` to the effect whose band contains it.
    pub fn band_for(&self, roll: f32) -> Option<EffectKind> {
        let mut threshold = 0.0;
        for kind in EffectKind::ALL {
            threshold += self.chance(kind);
            if roll < threshold {
                return Some(kind);
            }
        }
        None
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut total = 0.0;
        for (field, kind) in [
            ("time_freeze.chance", EffectKind::TimeFreeze),
            ("knock_back.chance", EffectKind::KnockBack),
            ("first_to_last.chance", EffectKind::FirstToLast),
            ("speed_boost.chance", EffectKind::SpeedBoost),
        ] {
            let chance = self.chance(kind);
            if !(0.0..=1.0).contains(&chance) {
                return Err(ConfigError::OutOfRange {
                    field,
                    min: 0.0,
                    max: 1.0,
                    value: chance,
                });
            }
            total += chance;
        }
        if total > 1.0 {
            return Err(ConfigError::ChanceOverflow { total });
        }

        self.time_freeze.duration.check("time_freeze.duration")?;
        self.knock_back.distance.check("knock_back.distance")?;
        self.speed_boost.duration.check("speed_boost.duration")?;
        if self.knock_back.min_targets == 0 {
            return Err(ConfigError::NotAbove {
                field: "knock_back.min_targets",
                min: 0.0,
                value: 0.0,
            });
        }
        if self.knock_back.min_targets > self.knock_back.max_targets {
            return Err(ConfigError::InvertedRange {
                field: "knock_back.targets",
                min: self.knock_back.min_targets as f32,
                max: self.knock_back.max_targets as f32,
            });
        }
        if self.speed_boost.factor <= 1.0 {
            return Err(ConfigError::NotAbove {
                field: "speed_boost.factor",
                min: 1.0,
                value: self.speed_boost.factor,
            });
        }
        if self.first_to_last.offset < 0.0 {
            return Err(ConfigError::NotAbove {
                field: "first_to_last.offset",
                min: 0.0,
                value: self.first_to_last.offset,
            });
        }
        Ok(())
    }
}

/// Banner state for one effect kind, handed to presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: EffectKind,
    pub active: bool,
    pub message: String,
}

/// One effect kind's timer. Active exactly when `start_time` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectSlot {
    pub actor_id: Option<u32>,
    pub start_time: Option<f32>,
    pub duration: f32,
}

impl EffectSlot {
    pub fn is_active(&self) -> bool {
        self.start_time.is_some()
    }

    fn has_expired(&self, elapsed: f32) -> bool {
        match self.start_time {
            Some(start) => elapsed - start >= self.duration,
            None => false,
        }
    }

    fn activate(&mut self, actor_id: u32, now: f32, duration: f32) {
        self.actor_id = Some(actor_id);
        self.start_time = Some(now);
        self.duration = duration;
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Mechanical half of the speed boost; expires on its own clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoostSlot {
    pub booster_id: Option<u32>,
    pub end_time: Option<f32>,
}

/// Skill event engine state for one race.
#[derive(Debug, Clone)]
pub struct SkillEngine {
    config: SkillConfig,
    slots: [EffectSlot; 4],
    messages: [String; 4],
    boost: BoostSlot,
}

impl SkillEngine {
    pub fn new(config: SkillConfig) -> Self {
        Self {
            config,
            slots: [EffectSlot::default(); 4],
            messages: Default::default(),
            boost: BoostSlot::default(),
        }
    }

    pub fn config(&self) -> &SkillConfig {
        &self.config
    }

    pub fn slot(&self, kind: EffectKind) -> &EffectSlot {
        &self.slots[kind.index()]
    }

    pub fn boost(&self) -> &BoostSlot {
        &self.boost
    }

    /// Racer exempt from the active time freeze, if one is active.
    pub fn freezer_id(&self) -> Option<u32> {
        self.slot(EffectKind::TimeFreeze).actor_id
    }

    pub fn booster_id(&self) -> Option<u32> {
        self.boost.booster_id
    }

    /// True while any banner is showing.
    pub fn any_notification_active(&self) -> bool {
        self.slots.iter().any(EffectSlot::is_active)
    }

    pub fn notification(&self, kind: EffectKind) -> Notification {
        Notification {
            kind,
            active: self.slot(kind).is_active(),
            message: self.messages[kind.index()].clone(),
        }
    }

    /// Currently showing banners.
    pub fn active_notifications(&self) -> Vec<Notification> {
        EffectKind::ALL
            .into_iter()
            .filter(|kind| self.slot(*kind).is_active())
            .map(|kind| self.notification(kind))
            .collect()
    }

    /// Run one tick of skill processing. Returns the effect that triggered, if any.
    pub fn process(
        &mut self,
        elapsed: f32,
        racers: &mut [RacerState],
        race_distance: f32,
        race_finished: bool,
        rng: &mut dyn RandomSource,
        observer: &mut dyn RaceObserver,
    ) -> Option<EffectKind> {
        if racers.is_empty() {
            return None;
        }

        self.expire(elapsed, observer);

        let triggered = if self.any_notification_active() || race_finished {
            None
        } else {
            self.roll(elapsed, racers, race_distance, rng, observer)
        };

        for racer in racers.iter_mut() {
            racer.is_boosting = self.boost.booster_id == Some(racer.id);
        }

        triggered
    }

    /// Deactivate everything, e.g. when the race ends.
    pub fn clear_all(&mut self, observer: &mut dyn RaceObserver) {
        for kind in EffectKind::ALL {
            if self.slot(kind).is_active() {
                self.deactivate(kind, observer);
            }
        }
        self.boost = BoostSlot::default();
    }

    fn expire(&mut self, elapsed: f32, observer: &mut dyn RaceObserver) {
        for kind in EffectKind::ALL {
            if self.slot(kind).has_expired(elapsed) {
                log::trace!("{:?} expired at {:.2}s", kind, elapsed);
                self.deactivate(kind, observer);
            }
        }

        if let Some(end) = self.boost.end_time {
            if elapsed >= end {
                log::trace!("speed boost wore off at {:.2}s", elapsed);
                self.boost = BoostSlot::default();
            }
        }
    }

    fn deactivate(&mut self, kind: EffectKind, observer: &mut dyn RaceObserver) {
        self.slots[kind.index()].clear();
        self.messages[kind.index()].clear();
        observer.notification_changed(&self.notification(kind));
    }

    fn activate(
        &mut self,
        kind: EffectKind,
        actor_id: u32,
        now: f32,
        duration: f32,
        message: String,
        observer: &mut dyn RaceObserver,
    ) {
        log::debug!("{}", message);
        self.slots[kind.index()].activate(actor_id, now, duration);
        self.messages[kind.index()] = message;
        observer.notification_changed(&self.notification(kind));
    }

    fn roll(
        &mut self,
        now: f32,
        racers: &mut [RacerState],
        race_distance: f32,
        rng: &mut dyn RandomSource,
        observer: &mut dyn RaceObserver,
    ) -> Option<EffectKind> {
        let racing: Vec<usize> = racers
            .iter()
            .enumerate()
            .filter(|(_, r)| r.position < race_distance)
            .map(|(i, _)| i)
            .collect();
        if racing.is_empty() {
            return None;
        }

        let kind = self.config.band_for(rng.next_unit())?;
        let fired = match kind {
            EffectKind::TimeFreeze => self.time_freeze(now, racers, &racing, rng, observer),
            EffectKind::KnockBack => self.knock_back(now, racers, &racing, rng, observer),
            EffectKind::FirstToLast => self.first_to_last(now, racers, &racing, observer),
            EffectKind::SpeedBoost => self.speed_boost(now, racers, &racing, rng, observer),
        };
        fired.then_some(kind)
    }

    fn time_freeze(
        &mut self,
        now: f32,
        racers: &[RacerState],
        racing: &[usize],
        rng: &mut dyn RandomSource,
        observer: &mut dyn RaceObserver,
    ) -> bool {
        if racing.len() < 2 {
            return false;
        }
        let freezer = &racers[racing[pick_index(rng, racing.len())]];
        let duration = self.config.time_freeze.duration.sample(rng);
        let message = format!("{} stops time for {:.1}s!", freezer.name, duration);
        self.activate(EffectKind::TimeFreeze, freezer.id, now, duration, message, observer);
        true
    }

    fn knock_back(
        &mut self,
        now: f32,
        racers: &mut [RacerState],
        racing: &[usize],
        rng: &mut dyn RandomSource,
        observer: &mut dyn RaceObserver,
    ) -> bool {
        if racing.len() < 2 {
            return false;
        }
        let actor = racing[pick_index(rng, racing.len())];
        let sorted = sort_by_position(racers, racing);
        let actor_rank = sorted.iter().position(|&i| i == actor).unwrap_or(0);

        let mut candidates = sorted[..actor_rank].to_vec();
        if candidates.is_empty() {
            return false;
        }

        let cfg = &self.config.knock_back;
        let wanted = uniform_count(rng, cfg.min_targets, cfg.max_targets);
        let count = wanted.min(candidates.len());
        shuffle(rng, &mut candidates);
        for &target in &candidates[..count] {
            let distance = cfg.distance.sample(rng);
            let racer = &mut racers[target];
            racer.position = (racer.position - distance).max(0.0);
        }

        let actor = &racers[actor];
        let message = format!(
            "{} knocks back {} racer{}!",
            actor.name,
            count,
            if count == 1 { "" } else { "s" }
        );
        let (actor_id, secs) = (actor.id, cfg.notification_secs);
        self.activate(EffectKind::KnockBack, actor_id, now, secs, message, observer);
        true
    }

    fn first_to_last(
        &mut self,
        now: f32,
        racers: &mut [RacerState],
        racing: &[usize],
        observer: &mut dyn RaceObserver,
    ) -> bool {
        if racing.len() < 2 {
            return false;
        }
        let sorted = sort_by_position(racers, racing);
        let (leader, last) = match (sorted.first(), sorted.last()) {
            (Some(&leader), Some(&last)) => (leader, last),
            _ => return false,
        };

        let new_position = (racers[last].position - self.config.first_to_last.offset).max(0.0);
        let victim = &mut racers[leader];
        log::debug!(
            "{} moved from {:.1} to {:.1}",
            victim.name,
            victim.position,
            new_position
        );
        victim.position = new_position;

        let message = format!("Twist of fate! {} drops to last...", victim.name);
        let (victim_id, secs) = (victim.id, self.config.first_to_last.notification_secs);
        self.activate(EffectKind::FirstToLast, victim_id, now, secs, message, observer);
        true
    }

    fn speed_boost(
        &mut self,
        now: f32,
        racers: &[RacerState],
        racing: &[usize],
        rng: &mut dyn RandomSource,
        observer: &mut dyn RaceObserver,
    ) -> bool {
        if self.boost.booster_id.is_some() {
            return false;
        }
        let booster = &racers[racing[pick_index(rng, racing.len())]];
        let duration = self.config.speed_boost.duration.sample(rng);
        self.boost = BoostSlot {
            booster_id: Some(booster.id),
            end_time: Some(now + duration),
        };

        let message = format!("{} gets a temporary speed boost!", booster.name);
        let secs = self.config.speed_boost.notification_secs;
        self.activate(EffectKind::SpeedBoost, booster.id, now, secs, message, observer);
        true
    }
}

/// Indices of `subset` ordered by position, leader first. Ties keep id order.
fn sort_by_position(racers: &[RacerState], subset: &[usize]) -> Vec<usize> {
    let mut sorted = subset.to_vec();
    sorted.sort_by(|&a, &b| racers[b].position.total_cmp(&racers[a].position));
    sorted
}

//! Racer - Individual racer state and movement
//!
//! Each racer has a position along the track, a per-tick speed and a finish
//! time. The race updates every unfinished racer once per tick.

use serde::{Deserialize, Serialize};

use crate::race_engine::config::RaceConfig;
use crate::race_engine::rng::{uniform, RandomSource};

/// 8-bit RGB colour for presentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const GOLD: RgbColor = RgbColor { r: 0xFF, g: 0xD7, b: 0x00 };
    pub const SILVER: RgbColor = RgbColor { r: 0xC0, g: 0xC0, b: 0xC0 };
    pub const BRONZE: RgbColor = RgbColor { r: 0xCD, g: 0x7F, b: 0x32 };
    pub const WHITE: RgbColor = RgbColor { r: 0xFF, g: 0xFF, b: 0xFF };

    /// Name label colour for a 1-based live rank.
    pub fn podium(rank: usize) -> Self {
        match rank {
            1 => Self::GOLD,
            2 => Self::SILVER,
            3 => Self::BRONZE,
            _ => Self::WHITE,
        }
    }

    /// Convert HSL (all components in `[0, 1]`) to RGB.
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let hue_to_rgb = |p: f32, q: f32, t: f32| {
            let t = t.rem_euclid(1.0);
            if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            }
        };

        let (r, g, b) = if saturation <= 0.0 {
            (lightness, lightness, lightness)
        } else {
            let q = if lightness < 0.5 {
                lightness * (1.0 + saturation)
            } else {
                lightness + saturation - lightness * saturation
            };
            let p = 2.0 * lightness - q;
            (
                hue_to_rgb(p, q, hue + 1.0 / 3.0),
                hue_to_rgb(p, q, hue),
                hue_to_rgb(p, q, hue - 1.0 / 3.0),
            )
        };

        let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self {
            r: to_byte(r),
            g: to_byte(g),
            b: to_byte(b),
        }
    }
}

/// Complete state for a single racer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RacerState {
    /// Unique racer ID, equal to its index in creation order
    pub id: u32,
    pub name: String,
    /// Distance along the track, within `[0, race distance]`
    pub position: f32,
    /// Speed rolled for the latest tick (units per frame at 60fps)
    pub speed: f32,
    /// Elapsed race time when the racer crossed the line
    pub finish_time: Option<f32>,
    /// True while this racer holds the speed boost
    pub is_boosting: bool,
    /// Burst/slowdown multiplier rolled for the latest tick
    pub burst_factor: f32,
    /// Lateral lane offset from the track centre
    pub lane: f32,
    pub color: RgbColor,
    /// Phase offset for the bobbing animation
    pub bob_offset: f32,
    /// Vertical bob for the latest tick
    pub bob_height: f32,
}

impl RacerState {
    /// Create a racer at the start position with no finish time.
    pub fn new(id: u32, name: String, start_position: f32) -> Self {
        Self {
            id,
            name,
            position: start_position,
            speed: 0.0,
            finish_time: None,
            is_boosting: false,
            burst_factor: 1.0,
            lane: 0.0,
            color: RgbColor::WHITE,
            bob_offset: 0.0,
            bob_height: 0.0,
        }
    }

    /// Assign lane, body colour and bob phase for display.
    pub fn with_appearance(mut self, lane: f32, color: RgbColor, bob_offset: f32) -> Self {
        self.lane = lane;
        self.color = color;
        self.bob_offset = bob_offset;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.finish_time.is_some()
    }
}

/// Racer simulation logic
pub struct Racer;

impl Racer {
    const BOB_AMOUNT: f32 = 0.15;
    const BOB_SPEED_FACTOR: f32 = 15.0;

    /// Update a single unfinished racer for one tick. Returns true on the tick
    /// the racer crosses the line.
    ///
    /// A racer that may not move keeps its position and rolls nothing.
    pub fn update(
        state: &mut RacerState,
        config: &RaceConfig,
        can_move: bool,
        delta: f32,
        elapsed: f32,
        rng: &mut dyn RandomSource,
    ) -> bool {
        if state.is_finished() {
            return false;
        }
        if !can_move {
            state.speed = 0.0;
            state.burst_factor = 1.0;
            return false;
        }

        let half_variation = config.speed_variation / 2.0;
        let mut target_speed = config.base_speed + uniform(rng, -half_variation, half_variation);
        if state.is_boosting {
            target_speed *= config.skills.speed_boost.factor;
        }

        state.burst_factor = if rng.next_unit() < config.burst_chance {
            config.burst_factor
        } else if rng.next_unit() < config.slowdown_chance {
            config.slowdown_factor
        } else {
            1.0
        };
        state.speed = target_speed.max(config.min_speed) * state.burst_factor;

        // speed is tuned per frame at a fixed rate; scale to real time
        state.position += state.speed * config.frame_normalization * delta;

        if state.position >= config.distance {
            state.position = config.distance;
            state.bob_height = 0.0;
            state.finish_time = Some(elapsed);
            return true;
        }

        let bob_rate = Self::BOB_SPEED_FACTOR * (0.8 + state.speed * 0.5);
        state.bob_height = (elapsed * bob_rate + state.bob_offset).sin() * Self::BOB_AMOUNT;
        false
    }
}

/// Compact racer state for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RacerSnapshot {
    pub id: u32,
    pub name: String,
    pub position: f32,
    pub speed: f32,
    pub finished: bool,
    pub finish_time: Option<f32>,
    pub is_boosting: bool,
    /// 1-based live rank
    pub rank: usize,
    pub label_color: RgbColor,
    pub color: RgbColor,
    pub lane: f32,
    pub bob_height: f32,
}

impl From<&RacerState> for RacerSnapshot {
    fn from(state: &RacerState) -> Self {
        Self {
            id: state.id,
            name: state.name.clone(),
            position: state.position,
            speed: state.speed,
            finished: state.is_finished(),
            finish_time: state.finish_time,
            is_boosting: state.is_boosting,
            rank: 0,
            label_color: RgbColor::WHITE,
            color: state.color,
            lane: state.lane,
            bob_height: state.bob_height,
        }
    }
}

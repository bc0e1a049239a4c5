//! Race configuration and loading from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::race_engine::skills::SkillConfig;

/// Race configuration. Speeds are in track units per frame at
/// `frame_normalization` frames per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Finish line distance
    pub distance: f32,
    pub base_speed: f32,
    /// Width of the uniform speed jitter around `base_speed`
    pub speed_variation: f32,
    /// Floor applied to the target speed before burst/slowdown
    pub min_speed: f32,
    pub frame_normalization: f32,
    pub burst_chance: f32,
    pub burst_factor: f32,
    pub slowdown_chance: f32,
    pub slowdown_factor: f32,
    /// Number of winners in the final results
    pub winner_count: usize,
    /// Width racers are spread across when lanes are assigned
    pub track_width: f32,
    pub skills: SkillConfig,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            distance: 200.0,
            base_speed: 0.14,
            speed_variation: 0.1,
            min_speed: 0.02,
            frame_normalization: 60.0,
            burst_chance: 0.015,
            burst_factor: 1.8,
            slowdown_chance: 0.01,
            slowdown_factor: 0.5,
            winner_count: 3,
            track_width: 40.0,
            skills: SkillConfig::default(),
        }
    }
}

impl RaceConfig {
    /// Read and validate a JSON config. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: RaceConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Same configuration with every skill effect switched off.
    pub fn without_skills(mut self) -> Self {
        self.skills = SkillConfig::disabled();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("distance", self.distance),
            ("base_speed", self.base_speed),
            ("min_speed", self.min_speed),
            ("frame_normalization", self.frame_normalization),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NotAbove {
                    field,
                    min: 0.0,
                    value,
                });
            }
        }
        if self.speed_variation < 0.0 {
            return Err(ConfigError::NotAbove {
                field: "speed_variation",
                min: 0.0,
                value: self.speed_variation,
            });
        }
        for (field, value) in [
            ("burst_chance", self.burst_chance),
            ("slowdown_chance", self.slowdown_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    field,
                    min: 0.0,
                    max: 1.0,
                    value,
                });
            }
        }
        if self.burst_factor <= 1.0 {
            return Err(ConfigError::NotAbove {
                field: "burst_factor",
                min: 1.0,
                value: self.burst_factor,
            });
        }
        if !(self.slowdown_factor > 0.0 && self.slowdown_factor <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "slowdown_factor",
                min: 0.0,
                max: 1.0,
                value: self.slowdown_factor,
            });
        }
        if self.winner_count == 0 {
            return Err(ConfigError::NoWinners);
        }
        self.skills.validate()
    }
}

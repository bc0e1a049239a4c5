//! Race Engine Module
//!
//! Race simulation with random skill events. Headless: presentation consumes
//! snapshots and observer events, and never mutates racer state.

pub mod clock;
pub mod config;
pub mod events;
pub mod names;
pub mod race;
pub mod racer;
pub mod rng;
pub mod scheduler;
pub mod simulation;
pub mod skills;

pub use clock::{ManualTime, MonotonicTime, RaceClock, TimeSource};
pub use config::RaceConfig;
pub use events::{RaceEvent, RaceObserver};
pub use race::{FinalResults, LiveRanking, Race, RaceResult, RaceSnapshot, RaceStatus, TickReport};
pub use racer::{Racer, RacerSnapshot, RacerState};
pub use rng::{RandomSource, RngSource, ScriptedRandom};
pub use scheduler::{FrameLoop, LoopSummary, Pacing};
pub use simulation::{RacePhase, RaceSession, SessionStats};
pub use skills::{EffectKind, Notification, SkillConfig, SkillEngine};

//! Frame loop driving a `RaceSession`
//!
//! Each tick runs to completion before the next is scheduled, and the loop
//! stops as soon as the session leaves the running phase.

use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::error::RaceError;
use crate::race_engine::clock::ManualTime;
use crate::race_engine::race::RaceSnapshot;
use crate::race_engine::simulation::RaceSession;

/// How frames are paced
#[derive(Debug, Clone)]
pub enum Pacing {
    /// Sleep to hold `fps` frames per second of wall-clock time. The session
    /// should be on wall-clock time.
    RealTime { fps: f32 },
    /// Advance `time` by `step` seconds before every tick, without sleeping.
    /// The session clock must read the same `ManualTime`.
    FixedStep { step: f32, time: ManualTime },
}

/// Outcome of a loop run
#[derive(Debug, Clone)]
pub struct LoopSummary {
    pub ticks: u64,
    /// True when the race reached its finish inside this run
    pub finished: bool,
    pub last_snapshot: Option<RaceSnapshot>,
}

#[derive(Debug, Clone)]
pub struct FrameLoop {
    pacing: Pacing,
    max_ticks: Option<u64>,
}

impl FrameLoop {
    pub fn new(pacing: Pacing) -> Self {
        Self {
            pacing,
            max_ticks: None,
        }
    }

    /// Stop after this many ticks even if the race is still running.
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    pub fn run(&self, session: &mut RaceSession) -> Result<LoopSummary, RaceError> {
        self.run_with(session, |_| {})
    }

    /// Run until the race finishes, handing every frame's snapshot to
    /// `on_frame`. A tick error stops the loop and is returned.
    pub fn run_with<F>(
        &self,
        session: &mut RaceSession,
        mut on_frame: F,
    ) -> Result<LoopSummary, RaceError>
    where
        F: FnMut(&RaceSnapshot),
    {
        let mut summary = LoopSummary {
            ticks: 0,
            finished: false,
            last_snapshot: None,
        };

        while session.is_running() {
            if self.max_ticks.map_or(false, |max| summary.ticks >= max) {
                log::debug!("Frame loop stopped at tick limit {}", summary.ticks);
                break;
            }
            let frame_start = Instant::now();

            if let Pacing::FixedStep { step, time } = &self.pacing {
                time.advance_secs(*step);
            }

            let snapshot = session.tick()?;
            summary.ticks += 1;
            if let Some(snapshot) = &snapshot {
                on_frame(snapshot);
            }
            summary.last_snapshot = snapshot;

            if let Pacing::RealTime { fps } = &self.pacing {
                let frame = Duration::from_secs_f32(1.0 / fps.max(1.0));
                match frame.checked_sub(frame_start.elapsed()) {
                    Some(remaining) => sleep(remaining),
                    None => log::warn!("Could not keep up with {} fps", fps),
                }
            }
        }

        summary.finished = session.race().map_or(false, |race| race.is_finished());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race_engine::config::RaceConfig;
    use crate::race_engine::rng::ScriptedRandom;
    use crate::race_engine::simulation::RacePhase;

    fn stepped_session() -> (ManualTime, RaceSession) {
        let time = ManualTime::new();
        let session = RaceSession::new(RaceConfig::default().without_skills())
            .with_time_source(Box::new(time.clone()))
            .with_random(Box::new(ScriptedRandom::new([])));
        (time, session)
    }

    #[test]
    fn fixed_step_runs_to_finish() {
        let (time, mut session) = stepped_session();
        session.start_race(2, &[]).unwrap();
        let frame_loop = FrameLoop::new(Pacing::FixedStep { step: 1.0 / 60.0, time });
        let mut frames = 0;
        let summary = frame_loop.run_with(&mut session, |_| frames += 1).unwrap();

        assert!(summary.finished);
        assert_eq!(frames, summary.ticks);
        assert_eq!(session.phase(), RacePhase::Finished);
        // 200 units at 0.14 per frame
        assert!((1420..1440).contains(&summary.ticks));
    }

    #[test]
    fn tick_limit_stops_early() {
        let (time, mut session) = stepped_session();
        session.start_race(2, &[]).unwrap();
        let frame_loop =
            FrameLoop::new(Pacing::FixedStep { step: 1.0 / 60.0, time }).with_max_ticks(10);
        let summary = frame_loop.run(&mut session).unwrap();
        assert_eq!(summary.ticks, 10);
        assert!(!summary.finished);
        assert!(session.is_running());
    }

    #[test]
    fn idle_session_runs_no_frames() {
        let (time, mut session) = stepped_session();
        let frame_loop = FrameLoop::new(Pacing::FixedStep { step: 1.0 / 60.0, time });
        let summary = frame_loop.run(&mut session).unwrap();
        assert_eq!(summary.ticks, 0);
        assert!(summary.last_snapshot.is_none());
    }
}

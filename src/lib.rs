//! Random Racer - race simulation backend
//!
//! Provides the race engine and a command-line front end that runs one race
//! and prints the live ranking, skill banners and winners.

pub mod error;
pub mod opts;
pub mod race_engine;

use std::thread;

use anyhow::Context;
use clap::Parser;

use error::RaceError;
use opts::RaceOpts;
use race_engine::race::EMPTY_SLOT;
use race_engine::{
    FrameLoop, LiveRanking, LoopSummary, ManualTime, Pacing, RaceConfig, RaceEvent, RaceSession,
};

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Print simulation events until the race finishes or the simulation stops.
fn present(rx: &flume::Receiver<RaceEvent>) {
    let mut last_ranking = LiveRanking::default();
    for event in rx.iter() {
        match event {
            RaceEvent::RankingChanged(ranking) => {
                if ranking != last_ranking && ranking.rank1 != EMPTY_SLOT {
                    println!(
                        "RANKING: 1. {}  2. {}  3. {}",
                        ranking.rank1, ranking.rank2, ranking.rank3
                    );
                }
                last_ranking = ranking;
            }
            RaceEvent::NotificationChanged(notification) => {
                if notification.active {
                    println!("EVENT: {}", notification.message);
                }
            }
            RaceEvent::RacerFinished(result) => {
                println!(
                    "FINISH: #{} {} at {:.2}s",
                    result.position, result.racer_name, result.finish_time
                );
            }
            RaceEvent::RaceFinished(results) => {
                println!("RESULT: Winners");
                for (place, name) in results.winners.iter().enumerate() {
                    println!("{:3}. {}", place + 1, name);
                }
                break;
            }
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    let opts = RaceOpts::parse();
    init_logging(opts.debug);

    let config = match &opts.config_path {
        Some(path) => {
            log::info!("Reading race configuration from {:?}", path);
            RaceConfig::from_json_file(path)
                .with_context(|| format!("Invalid race configuration {:?}", path))?
        }
        None => RaceConfig::default(),
    };
    let names = opts.participant_names()?;

    let (tx, rx) = flume::unbounded();
    let mut session = RaceSession::new(config)
        .with_observer(Box::new(tx))
        .with_tick_rate(opts.fps);

    let pacing = if opts.headless {
        let time = ManualTime::new();
        session = session.with_time_source(Box::new(time.clone()));
        Pacing::FixedStep {
            step: 1.0 / opts.fps.max(1.0),
            time,
        }
    } else {
        Pacing::RealTime { fps: opts.fps }
    };

    session
        .start_race(opts.count, &names)
        .context("Could not start the race")?;

    let simulation = thread::spawn(move || -> Result<(RaceSession, LoopSummary), RaceError> {
        let summary = FrameLoop::new(pacing).run(&mut session)?;
        Ok((session, summary))
    });

    present(&rx);

    let (session, summary) = simulation
        .join()
        .map_err(|_| anyhow::anyhow!("Simulation thread panicked"))?
        .context("Simulation stopped")?;

    let stats = session.get_stats();
    log::info!(
        "Simulated {} ticks for {} racers, avg tick {:.3}ms",
        summary.ticks,
        stats.racer_count,
        stats.avg_tick_time_ms
    );
    Ok(())
}

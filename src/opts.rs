use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "random-racer",
    about = "Random racer draw: named racers race to the line while skill events shake up the field"
)]
pub struct RaceOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug logging (RUST_LOG overrides)
    #[clap(short, long)]
    pub debug: bool,

    /// Run as fast as possible on a fixed time step instead of in real time
    #[clap(long)]
    pub headless: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Number of participants, used when no names are given
    #[clap(short, long, default_value = "20")]
    pub count: usize,

    /// Participant name (repeat for each racer)
    #[clap(short, long = "name")]
    pub names: Vec<String>,

    /// File with one participant name per line
    #[clap(short = 'f', long)]
    pub names_file: Option<PathBuf>,

    /// JSON race configuration; missing fields take their defaults
    #[clap(short = 'p', long = "config")]
    pub config_path: Option<PathBuf>,

    /// Frames per second, also the fixed step rate in headless mode
    #[clap(long, default_value = "60")]
    pub fps: f32,
}

impl RaceOpts {
    /// Names from `--name` followed by those in `--names-file`, trimmed, blank
    /// lines dropped.
    pub fn participant_names(&self) -> anyhow::Result<Vec<String>> {
        let mut names: Vec<String> = self.names.clone();
        if let Some(path) = &self.names_file {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Could not read names file {:?}", path))?;
            names.extend(raw.lines().map(str::to_string));
        }
        Ok(names
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect())
    }
}

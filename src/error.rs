//! Error types shared by the race engine and the command-line front end.

use thiserror::Error;

/// Errors raised by the race lifecycle and the simulation tick.
///
/// Validation failures and refused transitions never mutate race state. Use
/// [`RaceError::is_warning`] to tell a refused transition (safe to ignore)
/// apart from a real failure.
#[derive(Debug, Error)]
pub enum RaceError {
    #[error("need at least 2 names (got {given})")]
    NotEnoughNames { given: usize },
    #[error("need at least 2 participants (got {given})")]
    NotEnoughParticipants { given: usize },
    #[error("a race is already running")]
    AlreadyRunning,
    #[error("the last race has finished; reset before starting a new one")]
    AwaitingReset,
    #[error("cannot reset while a race is running")]
    ResetWhileRunning,
    #[error("invalid time step {delta}: the clock produced an unusable delta")]
    InvalidTimeStep { delta: f32 },
    #[error("invalid elapsed time {elapsed}: the clock produced an unusable reading")]
    InvalidElapsed { elapsed: f32 },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RaceError {
    /// True for refused state transitions, which callers treat as no-ops.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            RaceError::AlreadyRunning | RaceError::AwaitingReset | RaceError::ResetWhileRunning
        )
    }

    /// True for participant input rejections.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RaceError::NotEnoughNames { .. } | RaceError::NotEnoughParticipants { .. }
        )
    }
}

/// Errors raised when a race configuration cannot be loaded or is inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} must be greater than {min:.2} (got {value:.3})")]
    NotAbove {
        field: &'static str,
        min: f32,
        value: f32,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.3})")]
    OutOfRange {
        field: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },
    #[error("{field} range invalid (min {min} > max {max})")]
    InvertedRange {
        field: &'static str,
        min: f32,
        max: f32,
    },
    #[error("skill chances sum to {total:.3}, which exceeds 1")]
    ChanceOverflow { total: f32 },
    #[error("winner count must be at least 1")]
    NoWinners,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_refusals_are_warnings() {
        assert!(RaceError::AlreadyRunning.is_warning());
        assert!(RaceError::AwaitingReset.is_warning());
        assert!(RaceError::ResetWhileRunning.is_warning());
        assert!(!RaceError::NotEnoughNames { given: 1 }.is_warning());
        assert!(!RaceError::InvalidTimeStep { delta: f32::NAN }.is_warning());
        assert!(!RaceError::InvalidElapsed { elapsed: f32::INFINITY }.is_warning());
    }

    #[test]
    fn validation_messages_name_the_minimum() {
        let err = RaceError::NotEnoughParticipants { given: 1 };
        assert!(err.is_validation());
        assert!(err.to_string().contains("need at least 2"));
        let err = RaceError::NotEnoughNames { given: 1 };
        assert!(err.to_string().contains("need at least 2 names"));
    }
}

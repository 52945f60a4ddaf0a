//! Administrative request and response bodies

use crate::error::OrchestratorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest `numPlayers` a single request may ask for
pub const MAX_NUM_PLAYERS: u64 = 100_000;

/// Form body of `/admin/start` and `/run`, exactly as posted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunForm {
    pub num_players: Option<String>,
    pub duration: Option<String>,
    pub ramp_duration: Option<String>,
}

impl RunForm {
    pub fn new(num_players: u64, duration: Duration, ramp_duration: Duration) -> Self {
        Self {
            num_players: Some(num_players.to_string()),
            duration: Some(duration.as_millis().to_string()),
            ramp_duration: Some(ramp_duration.as_millis().to_string()),
        }
    }
}

/// A validated run request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRequest {
    pub num_players: u64,
    pub duration: Duration,
    pub ramp_duration: Duration,
}

impl TryFrom<&RunForm> for RunRequest {
    type Error = OrchestratorError;

    fn try_from(form: &RunForm) -> Result<Self, Self::Error> {
        let num_players = integer_field(form.num_players.as_deref(), "numPlayers")?;
        if num_players > MAX_NUM_PLAYERS {
            return Err(OrchestratorError::Validation("Invalid numPlayers".to_string()));
        }
        Ok(Self {
            num_players,
            duration: Duration::from_millis(integer_field(form.duration.as_deref(), "duration")?),
            ramp_duration: Duration::from_millis(integer_field(
                form.ramp_duration.as_deref(),
                "rampDuration",
            )?),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResponse {
    pub success: bool,
}

impl RunResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }

    pub fn failed() -> Self {
        Self { success: false }
    }
}

fn integer_field(value: Option<&str>, field: &str) -> Result<u64, OrchestratorError> {
    let value = value.ok_or_else(|| OrchestratorError::Validation(format!("Missing {}", field)))?;
    leading_integer(value)
        .ok_or_else(|| OrchestratorError::Validation(format!("Invalid {}", field)))
}

/// Integer prefix of `text`, ignoring surrounding whitespace and any trailing garbage
///
/// `"120ms"` reads as 120. Negative values are rejected.
fn leading_integer(text: &str) -> Option<u64> {
    let text = text.trim();
    let digits = text.strip_prefix('+').unwrap_or(text);
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}

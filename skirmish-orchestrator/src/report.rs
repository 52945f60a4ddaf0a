//! End-of-run reporting

use serde::{Deserialize, Serialize};
use skirmish_player::Player;
use std::sync::Arc;
use tracing::info;

/// Loop counters summed over a roster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTestReport {
    pub loops_ended_successfully: u64,
    pub loops_started: u64,
}

pub fn load_test_report(players: &[Arc<Player>]) -> LoadTestReport {
    players
        .iter()
        .fold(LoadTestReport::default(), |total, player| LoadTestReport {
            loops_ended_successfully: total.loops_ended_successfully
                + player.loops_ended_successfully(),
            loops_started: total.loops_started + player.loops_started(),
        })
}

/// Log one `PlayerReport` line per player and the aggregate `LoadTestReport`
pub(crate) fn log_reports(players: &[Arc<Player>]) -> LoadTestReport {
    for player in players {
        let report = player.report();
        info!(
            is_host = report.is_host,
            loops_started = report.loops_started,
            loops_ended_successfully = report.loops_ended_successfully,
            player_name = %report.player_name,
            "PlayerReport"
        );
    }
    let total = load_test_report(players);
    info!(
        loops_started = total.loops_started,
        loops_ended_successfully = total.loops_ended_successfully,
        "LoadTestReport"
    );
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_roster_reports_zero() {
        assert_eq!(load_test_report(&[]), LoadTestReport::default());
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = LoadTestReport {
            loops_ended_successfully: 3,
            loops_started: 5,
        };
        assert_eq!(
            serde_json::to_value(report).unwrap(),
            serde_json::json!({ "loopsEndedSuccessfully": 3, "loopsStarted": 5 })
        );
    }
}

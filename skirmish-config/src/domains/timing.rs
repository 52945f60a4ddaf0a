//! Think-time delays and scheduler offsets
//!
//! Every delay a virtual player waits between two protocol steps is named
//! here, so a run can be reshaped without touching the state machine. All
//! values are integer milliseconds on the wire.

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

macro_rules! timing_config {
    ($( $(#[$doc:meta])* $field:ident = $default:expr; )*) => {
        /// Named delays between player steps
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct TimingConfig {
            $(
                $(#[$doc])*
                #[serde(with = "crate::domains::utils::serde_duration_ms")]
                pub $field: Duration,
            )*
        }

        impl Default for TimingConfig {
            fn default() -> Self {
                Self {
                    $( $field: Duration::from_millis($default), )*
                }
            }
        }

        impl TimingConfig {
            /// Every delay set to zero, for tests and dry runs
            ///
            /// The socket wait bound keeps its default so a silent relay still
            /// fails the step eventually.
            pub fn immediate() -> Self {
                Self {
                    $( $field: Duration::ZERO, )*
                }
                .with_socket_wait_timeout(Self::default().socket_wait_timeout)
            }
        }
    };
}

timing_config! {
    /// Successful loop end to the next loop start
    loop_end_to_loop_start = 5_000;
    /// Joining the global chat room to sending the first message
    join_all_chat_to_send_message = 1_000;
    /// Sending a chat message to listing the users in the room
    send_message_to_get_users = 1_000;
    /// Listing chat users to listing lobbies (also the follower poll interval)
    get_users_to_list_games = 2_000;
    /// Listing lobbies to hosting one
    list_games_to_host_game = 2_000;
    /// Switching to the lobby chat room to greeting it
    switch_chatroom_to_send_message = 2_000;
    /// Greeting the lobby room to changing the map
    send_message_to_change_map = 2_000;
    /// Changing the map to waiting for a full lobby
    change_map_to_lock_teams = 2_000;
    /// Full lobby to locking teams
    players_arrive_to_commander_select = 10_000;
    /// Lobby inventory fetch to the first commander pick
    lock_teams_to_choose_commander = 2_000;
    /// First commander pick to the second one
    choose_commander_to_switch_commander = 2_000;
    /// Second commander pick to locking it
    choose_commander_to_lock_commander = 2_000;
    /// Locking the commander to waiting for the match
    lock_commander_to_wait_for_game = 2_000;
    /// Match endpoint broadcast to connecting to the match server
    in_game_to_connect_to_match_server = 2_000;
    /// Added to the reported match duration before end-game stats
    game_end_to_end_game_stats = 15_000;
    /// Warm-up before the ramp-up starts, also subtracted from the ramp-down start
    ramp_warmup = 1_000;
    /// Delay between an early stop and its ramp-down
    stop_settle = 1_000;
    /// Upper bound on any single awaited relay frame
    socket_wait_timeout = 300_000;
}

impl TimingConfig {
    pub fn with_socket_wait_timeout(mut self, timeout: Duration) -> Self {
        self.socket_wait_timeout = timeout;
        self
    }
}

impl Validatable for TimingConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(
            self.socket_wait_timeout.as_millis(),
            "socket_wait_timeout",
            self.domain_name(),
        )
    }

    fn domain_name(&self) -> &'static str {
        "timing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_defaults() {
        let timing = TimingConfig::default();
        assert_eq!(timing.loop_end_to_loop_start, Duration::from_secs(5));
        assert_eq!(timing.players_arrive_to_commander_select, Duration::from_secs(10));
        assert_eq!(timing.game_end_to_end_game_stats, Duration::from_secs(15));
        assert_eq!(timing.ramp_warmup, Duration::from_secs(1));
        assert!(timing.validate().is_ok());
    }

    #[test]
    fn test_immediate_keeps_socket_bound() {
        let timing = TimingConfig::immediate();
        assert_eq!(timing.get_users_to_list_games, Duration::ZERO);
        assert_eq!(timing.ramp_warmup, Duration::ZERO);
        assert_eq!(timing.socket_wait_timeout, Duration::from_secs(300));
        assert!(timing.validate().is_ok());
    }

    #[test]
    fn test_timing_yaml_is_milliseconds() {
        let timing: TimingConfig =
            serde_yaml::from_str("join_all_chat_to_send_message: 250\nstop_settle: 0\n")
                .unwrap();
        assert_eq!(timing.join_all_chat_to_send_message, Duration::from_millis(250));
        assert_eq!(timing.stop_settle, Duration::ZERO);
        assert_eq!(timing.send_message_to_get_users, Duration::from_secs(1));
    }
}

//! Player and lobby data model

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use skirmish_timers::TimerHandle;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Whether a player hosts lobbies or joins them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Follower,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Host => write!(f, "host"),
            Role::Follower => write!(f, "follower"),
        }
    }
}

#[derive(Default)]
struct LoopControl {
    timer: Option<TimerHandle>,
    teardown: Option<CancellationToken>,
}

/// One simulated client
///
/// Identity is fixed at construction. Counters are atomics because the
/// loop task, the ramp scheduler and report generation all read them.
/// `should_exit` is only ever set, never cleared.
pub struct Player {
    pub name: String,
    pub unique_name: String,
    pub password: String,
    pub email: String,
    pub role: Role,

    account_created: AtomicBool,
    should_exit: AtomicBool,
    games_played: AtomicI64,
    loops_started: AtomicU64,
    loops_ended_successfully: AtomicU64,
    control: Mutex<LoopControl>,
}

impl Player {
    pub fn new(
        name: impl Into<String>,
        unique_name: impl Into<String>,
        password: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            name: name.into(),
            unique_name: unique_name.into(),
            password: password.into(),
            email: email.into(),
            role,
            account_created: AtomicBool::new(false),
            should_exit: AtomicBool::new(false),
            games_played: AtomicI64::new(0),
            loops_started: AtomicU64::new(0),
            loops_ended_successfully: AtomicU64::new(0),
            control: Mutex::new(LoopControl::default()),
        }
    }

    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }

    pub fn account_created(&self) -> bool {
        self.account_created.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_account_created(&self) {
        self.account_created.store(true, Ordering::SeqCst);
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit.load(Ordering::SeqCst)
    }

    pub fn games_played(&self) -> i64 {
        self.games_played.load(Ordering::SeqCst)
    }

    pub(crate) fn set_games_played(&self, games_played: i64) {
        self.games_played.store(games_played, Ordering::SeqCst);
    }

    pub fn loops_started(&self) -> u64 {
        self.loops_started.load(Ordering::SeqCst)
    }

    pub(crate) fn record_loop_start(&self) {
        self.loops_started.fetch_add(1, Ordering::SeqCst);
    }

    pub fn loops_ended_successfully(&self) -> u64 {
        self.loops_ended_successfully.load(Ordering::SeqCst)
    }

    pub(crate) fn record_loop_success(&self) {
        self.loops_ended_successfully.fetch_add(1, Ordering::SeqCst);
    }

    /// Store the timer for the next loop iteration unless the player is exiting
    ///
    /// The exit check and the store happen under one lock, so a concurrent
    /// [`Player::request_exit`] either sees the timer and cancels it or the
    /// timer is never created.
    pub(crate) fn arm_loop_timer(&self, schedule: impl FnOnce() -> TimerHandle) -> bool {
        let mut control = self.control.lock();
        if self.should_exit() {
            return false;
        }
        control.timer = Some(schedule());
        true
    }

    pub(crate) fn clear_loop_timer(&self) {
        self.control.lock().timer = None;
    }

    /// Register the teardown token of the session now owned by the loop
    pub(crate) fn attach_session(&self, teardown: CancellationToken) {
        let mut control = self.control.lock();
        if self.should_exit() {
            teardown.cancel();
        }
        control.teardown = Some(teardown);
    }

    pub(crate) fn detach_session(&self) {
        self.control.lock().teardown = None;
    }

    /// Set `should_exit`, cancel a pending loop timer and tear down the live session
    ///
    /// Returns true when a pending timer was cancelled.
    pub(crate) fn request_exit(&self) -> bool {
        let mut control = self.control.lock();
        self.should_exit.store(true, Ordering::SeqCst);
        if let Some(teardown) = control.teardown.take() {
            teardown.cancel();
        }
        match control.timer.take() {
            Some(timer) => {
                timer.cancel();
                true
            }
            None => false,
        }
    }

    pub fn report(&self) -> PlayerReport {
        PlayerReport {
            is_host: self.is_host(),
            loops_started: self.loops_started(),
            loops_ended_successfully: self.loops_ended_successfully(),
            player_name: self.name.clone(),
        }
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("account_created", &self.account_created())
            .field("should_exit", &self.should_exit())
            .field("loops_started", &self.loops_started())
            .field("loops_ended_successfully", &self.loops_ended_successfully())
            .finish()
    }
}

/// End-of-run line for one player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerReport {
    pub is_host: bool,
    pub loops_started: u64,
    pub loops_ended_successfully: u64,
    pub player_name: String,
}

/// The lobby a player is attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// Absent until the join succeeds
    pub connection_key: Option<String>,
    #[serde(rename = "gameGUID")]
    pub game_guid: String,
    pub game_name: String,
    /// Lobby relay host
    pub host: String,
    /// Lobby control endpoint, with trailing slash
    pub http_endpoint: String,
    /// Lobby relay port, as the backend spells it
    pub port: String,
}

impl Game {
    pub fn from_listing(listing: &LobbyListing) -> Self {
        Self {
            connection_key: None,
            game_guid: listing.game_guid.clone(),
            game_name: listing.game_name.clone(),
            host: listing.host.clone(),
            http_endpoint: listing.http_endpoint.clone(),
            port: listing.port.clone(),
        }
    }
}

/// Match-server endpoint broadcast when the match starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub server_host_name: String,
    pub public_port: String,
}

/// One entry of the lobby list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyListing {
    #[serde(rename = "gameGUID")]
    pub game_guid: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub map_name: String,
    #[serde(default)]
    pub game_type: String,
    pub num_of_players: u32,
    #[serde(default)]
    pub max_players: u32,
    #[serde(default)]
    pub host_name: String,
    pub host: String,
    pub port: String,
    pub http_endpoint: String,
}

/// One entry of `body.players` in a lobby broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyMember {
    pub player_name: String,
    pub team_number: i64,
    #[serde(default)]
    pub commander_selected: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

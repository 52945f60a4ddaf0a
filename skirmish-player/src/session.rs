//! Per-iteration network state

use crate::model::{ConnectionInfo, Game};
use crate::phase::Phase;
use skirmish_relay::{FrameWaiter, RelayConnection};
use std::collections::{HashMap, HashSet};
use tokio_util::sync::CancellationToken;

/// Lobby broadcasts a player subscribes to ahead of the step that consumes them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Awaiting {
    /// Host: six players on non-spectator teams
    LobbyFull,
    /// Follower: first roster broadcast that lists this player
    Roster,
    /// Follower: lobby moved to commander select
    CommanderSelect,
    /// Match server endpoint after the commander lock
    MatchStart,
}

/// Ephemeral state owned by one player for one loop iteration
///
/// The session token is only set after login or account creation. A game
/// and the lobby socket exist only while attached to a lobby. Every socket
/// the session opens hangs off `teardown`, so cancelling it fails all
/// pending frame waits at once.
pub struct Session {
    pub status: Phase,
    pub session_token: Option<String>,
    pub game: Option<Game>,
    pub chat: Option<RelayConnection>,
    pub lobby: Option<RelayConnection>,
    pub connection: Option<ConnectionInfo>,
    pub(crate) awaiting: HashMap<Awaiting, FrameWaiter>,
    /// Lobbies left during this iteration, skipped by the lobby search
    pub excluded_lobbies: HashSet<String>,
    teardown: CancellationToken,
}

impl Session {
    pub fn teardown_token(&self) -> &CancellationToken {
        &self.teardown
    }

    pub fn is_torn_down(&self) -> bool {
        self.teardown.is_cancelled()
    }

    pub(crate) fn token(&self) -> &str {
        self.session_token.as_deref().unwrap_or_default()
    }

    /// Drop the lobby attachment, keeping the chat socket
    pub(crate) async fn leave_lobby(&mut self) -> Option<String> {
        self.awaiting.clear();
        self.connection = None;
        if let Some(lobby) = self.lobby.take() {
            lobby.close().await;
        }
        self.game.take().map(|game| game.game_guid)
    }

    /// Close every socket and fail every pending wait
    pub async fn close(mut self) {
        self.awaiting.clear();
        if let Some(lobby) = self.lobby.take() {
            lobby.close().await;
        }
        if let Some(chat) = self.chat.take() {
            chat.close().await;
        }
        self.teardown.cancel();
    }
}

/// Builds fresh sessions with no token, no game and no live sockets
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionFactory;

impl SessionFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_session(&self) -> Session {
        Session {
            status: Phase::Initialized,
            session_token: None,
            game: None,
            chat: None,
            lobby: None,
            connection: None,
            awaiting: HashMap::new(),
            excluded_lobbies: HashSet::new(),
            teardown: CancellationToken::new(),
        }
    }
}

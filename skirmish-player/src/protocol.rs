//! Chat and lobby relay frames
//!
//! Builders for the frames a player writes and predicates for the frames it
//! waits on. Predicates are plain closures so they can be handed straight to
//! [`skirmish_relay::RelayConnection::expect`].

use crate::error::PlayerError;
use crate::model::{ConnectionInfo, Game, LobbyListing, LobbyMember};
use serde_json::{json, Value};
use std::collections::HashSet;

pub const ALL_CHAT_ROOM: &str = "allChat";
pub const LOBBY_CAPACITY: usize = 6;
pub const SPECTATOR_TEAM: i64 = 3;

const SEND_MESSAGE_COMMAND: &str = "SendMessage";
const GET_USERS_COMMAND: &str = "GetUsers";
const SWITCH_ROOM_COMMAND: &str = "SwitchRoom";
const CHAT_MESSAGE: &str = "I was here.";
const UPDATE_GAME_INFO: &str = "updateGameInfo";
const COMMANDER_SELECT_STATUS: &str = "CommanderSelect";
const IN_GAME_STATUS: &str = "InGame";

type Predicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// First frame on a chat socket
pub fn chat_join(room: &str, player_name: &str) -> Value {
    json!({ "room": room, "name": player_name })
}

pub fn chat_send_message() -> Value {
    json!({ "commandType": SEND_MESSAGE_COMMAND, "message": CHAT_MESSAGE })
}

/// Matches the relay echoing this player's own chat message
pub fn is_own_message(player_name: &str) -> Predicate {
    let expected = format!("{}: {}", player_name, CHAT_MESSAGE);
    Box::new(move |frame| {
        frame["commandType"] == SEND_MESSAGE_COMMAND && frame["message"] == expected.as_str()
    })
}

pub fn chat_get_users(room: &str) -> Value {
    json!({ "commandType": GET_USERS_COMMAND, "room": room })
}

pub fn is_user_list(frame: &Value) -> bool {
    frame["commandType"] == GET_USERS_COMMAND
}

pub fn chat_switch_room(room: &str) -> Value {
    json!({ "commandType": SWITCH_ROOM_COMMAND, "room": room })
}

/// Handshake written to a lobby relay, without a line terminator
pub fn lobby_handshake(game: &Game, player_name: &str) -> Value {
    json!({
        "gameGUID": game.game_guid,
        "playerName": player_name,
        "connectionKey": game.connection_key,
    })
}

pub fn is_update_game_info(frame: &Value) -> bool {
    frame["command"] == UPDATE_GAME_INFO
}

/// Players listed in a lobby broadcast, if the frame carries a roster
pub fn lobby_members(frame: &Value) -> Option<Vec<LobbyMember>> {
    if !is_update_game_info(frame) {
        return None;
    }
    let players = frame.get("body")?.get("players")?;
    serde_json::from_value(players.clone()).ok()
}

/// Exactly six players and nobody on the spectator team
pub fn is_lobby_full(members: &[LobbyMember]) -> bool {
    members.len() == LOBBY_CAPACITY
        && members
            .iter()
            .all(|member| member.team_number != SPECTATOR_TEAM)
}

pub fn is_full_lobby_broadcast(frame: &Value) -> bool {
    lobby_members(frame)
        .map(|members| is_lobby_full(&members))
        .unwrap_or(false)
}

/// Matches the first roster broadcast that lists `player_name`
pub fn is_roster_with(player_name: &str) -> Predicate {
    let player_name = player_name.to_string();
    Box::new(move |frame| {
        lobby_members(frame)
            .map(|members| members.iter().any(|m| m.player_name == player_name))
            .unwrap_or(false)
    })
}

/// Whether `player_name` sits on the spectator team in a roster broadcast
pub fn is_spectator(frame: &Value, player_name: &str) -> bool {
    lobby_members(frame)
        .and_then(|members| members.into_iter().find(|m| m.player_name == player_name))
        .map(|member| member.team_number == SPECTATOR_TEAM)
        .unwrap_or(false)
}

pub fn is_commander_select(frame: &Value) -> bool {
    is_update_game_info(frame) && frame["body"]["status"] == COMMANDER_SELECT_STATUS
}

pub fn is_match_started(frame: &Value) -> bool {
    is_update_game_info(frame) && frame["body"]["status"] == IN_GAME_STATUS
}

/// Match-server endpoint from an in-game broadcast
pub fn match_endpoint(frame: &Value) -> Result<ConnectionInfo, PlayerError> {
    let endpoint = frame["body"]
        .get("endpoint")
        .ok_or_else(|| PlayerError::Protocol("endpoint doesn't exist".to_string()))?;
    let field = |name: &str| {
        endpoint[name]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PlayerError::Protocol(format!("{} doesn't exist", name)))
    };
    Ok(ConnectionInfo {
        server_host_name: field("serverHostName")?,
        public_port: field("publicPort")?,
    })
}

/// Result of scanning the lobby list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyChoice {
    Found(LobbyListing),
    NoneAvailable,
}

/// First lobby with a free seat that has not been left this iteration
///
/// When every open lobby is excluded the exclusions are cleared so the next
/// poll can retry them.
pub fn choose_lobby(listings: &[LobbyListing], excluded: &mut HashSet<String>) -> LobbyChoice {
    let open = || {
        listings
            .iter()
            .filter(|listing| (listing.num_of_players as usize) < LOBBY_CAPACITY)
    };
    if let Some(listing) = open().find(|listing| !excluded.contains(&listing.game_guid)) {
        return LobbyChoice::Found(listing.clone());
    }
    if open().next().is_some() {
        excluded.clear();
    }
    LobbyChoice::NoneAvailable
}

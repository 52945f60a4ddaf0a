//! Backend calls a player makes
//!
//! [`GameBackend`] is the seam between the lifecycle and the services it
//! exercises. [`HttpGameBackend`] is the real implementation: one form POST
//! per call through the shared [`HttpClient`], with each response checked
//! for the fields the next step depends on.

use crate::error::PlayerError;
use crate::model::{ConnectionInfo, Game, LobbyListing, Player};
use async_trait::async_trait;
use serde_json::{json, Value};
use skirmish_config::BackendConfig;
use skirmish_http::{HttpClient, HttpResponse};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const BIRTH_DATE: &str = "12-04-1991";
const MAP_NAME: &str = "SacredArena";
const GAME_TYPE: &str = "TheMaestrosGame.TMRoundBasedGameInfo";
const STARTING_COMMANDER: &str = "RoboMeister";

/// Join refusals that only mean "try another lobby"
const TOLERATED_JOIN_ERRORS: [&str; 3] = [
    "Lobby is full",
    "No such game exists",
    "Lobby state is not a joinable state",
];

/// Identity returned by account creation and login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSession {
    pub email: String,
    pub player_name: String,
    pub session_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined { connection_key: String },
    Rejected(String),
}

/// Commands posted to a lobby's own control endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyCommand {
    ChangeMap(String),
    LockTeams,
    ChooseCommander(String),
    LockCommander,
}

impl LobbyCommand {
    pub fn name(&self) -> &'static str {
        match self {
            LobbyCommand::ChangeMap(_) => "changeMap",
            LobbyCommand::LockTeams => "lockTeams",
            LobbyCommand::ChooseCommander(_) => "chooseCommander",
            LobbyCommand::LockCommander => "lockCommander",
        }
    }

    fn parameters(&self) -> Value {
        match self {
            LobbyCommand::ChangeMap(value) | LobbyCommand::ChooseCommander(value) => {
                Value::String(value.clone())
            }
            LobbyCommand::LockTeams | LobbyCommand::LockCommander => Value::Null,
        }
    }
}

/// Every backend operation of the player lifecycle
#[async_trait]
pub trait GameBackend: Send + Sync {
    async fn motd(&self, player: &Player) -> Result<(), PlayerError>;

    async fn create_player(&self, player: &Player) -> Result<AccountSession, PlayerError>;

    /// Mark the new account verified and seed its stats and inventory
    async fn verify_email(&self, player: &Player) -> Result<(), PlayerError>;

    async fn login(&self, player: &Player) -> Result<AccountSession, PlayerError>;

    /// Returns the backend's success flag
    async fn delete_player(&self, player: &Player) -> Result<bool, PlayerError>;

    /// Returns the player's games played
    async fn player_stats(&self, player: &Player, session_token: &str)
        -> Result<i64, PlayerError>;

    async fn player_inventory(&self, player: &Player) -> Result<(), PlayerError>;

    async fn list_games(
        &self,
        player: &Player,
        session_token: &str,
    ) -> Result<Vec<LobbyListing>, PlayerError>;

    async fn host_game(&self, player: &Player, session_token: &str) -> Result<Game, PlayerError>;

    async fn join_game(
        &self,
        player: &Player,
        session_token: &str,
        game_guid: &str,
    ) -> Result<JoinOutcome, PlayerError>;

    async fn update_lobby_info(
        &self,
        player: &Player,
        session_token: &str,
        game: &Game,
        command: LobbyCommand,
    ) -> Result<(), PlayerError>;

    /// Returns the match length reported by the match server
    async fn connect_to_match(
        &self,
        player: &Player,
        connection: &ConnectionInfo,
    ) -> Result<Duration, PlayerError>;

    async fn end_game_stats(&self, player: &Player, session_token: &str)
        -> Result<(), PlayerError>;
}

/// [`GameBackend`] over form-encoded HTTP
#[derive(Clone)]
pub struct HttpGameBackend {
    http: Arc<dyn HttpClient>,
    backend: BackendConfig,
}

impl HttpGameBackend {
    pub fn new(http: Arc<dyn HttpClient>, backend: BackendConfig) -> Self {
        Self { http, backend }
    }

    fn lobbies_url(&self, path: &str) -> String {
        format!("{}/{}", self.backend.lobbies_uri.trim_end_matches('/'), path)
    }

    fn accounts_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.backend.player_accounts_uri.trim_end_matches('/'),
            path
        )
    }

    fn stats_url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}",
            self.backend.player_stats_uri.trim_end_matches('/'),
            path
        )
    }

    async fn send(
        &self,
        player: &Player,
        url: &str,
        body: Option<Value>,
    ) -> Result<HttpResponse, PlayerError> {
        let response = self.http.post_form(url, body.as_ref()).await?;
        debug!(
            player_name = %player.name,
            url = %url,
            response_body = %response.body,
            "ResponseBody"
        );
        if response.body == Value::String(String::new()) {
            return Err(PlayerError::invalid(url, "empty body"));
        }
        Ok(response)
    }

    /// POST and fail on a transport error, an `error` field or a non-2xx status
    async fn call(
        &self,
        player: &Player,
        url: &str,
        body: Option<Value>,
    ) -> Result<Value, PlayerError> {
        let response = self.send(player, url, body).await?;
        if let Some(message) = body_error(&response.body) {
            return Err(backend_error(url, message));
        }
        if !response.is_success() {
            return Err(backend_error(url, format!("status {}", response.status)));
        }
        Ok(response.body)
    }

    /// Stats endpoints take the whole request as a JSON string in `playerStats`
    async fn call_stats(
        &self,
        player: &Player,
        url: &str,
        body: Value,
    ) -> Result<Value, PlayerError> {
        let wrapped = json!({ "playerStats": body.to_string() });
        self.call(player, url, Some(wrapped)).await
    }
}

fn body_error(body: &Value) -> Option<String> {
    match body.get("error") {
        None | Some(Value::Null) => None,
        Some(Value::String(message)) => Some(message.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn backend_error(url: &str, message: impl Into<String>) -> PlayerError {
    PlayerError::Backend {
        url: url.to_string(),
        message: message.into(),
    }
}

fn require_str(body: &Value, field: &str, url: &str) -> Result<String, PlayerError> {
    body[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| PlayerError::invalid(url, format!("missing {}", field)))
}

fn account_session(body: &Value, url: &str) -> Result<AccountSession, PlayerError> {
    Ok(AccountSession {
        email: require_str(body, "email", url)?,
        player_name: require_str(body, "playerName", url)?,
        session_token: require_str(body, "sessionToken", url)?,
    })
}

#[async_trait]
impl GameBackend for HttpGameBackend {
    async fn motd(&self, player: &Player) -> Result<(), PlayerError> {
        let url = self.lobbies_url("platformMOTD");
        self.call(player, &url, None).await?;
        Ok(())
    }

    async fn create_player(&self, player: &Player) -> Result<AccountSession, PlayerError> {
        let url = self.accounts_url("createPlayer2");
        let body = json!({
            "birthDate": BIRTH_DATE,
            "email": player.email,
            "playerName": player.name,
            "password": player.password,
        });
        let response = self.call(player, &url, Some(body)).await?;
        account_session(&response, &url)
    }

    async fn verify_email(&self, player: &Player) -> Result<(), PlayerError> {
        let url = self.accounts_url("setPlayerAccountInfo");
        let inventory = json!([STARTING_COMMANDER]).to_string();
        let body = json!({
            "playerUniqueName": player.unique_name,
            "verified": true,
            "currentXP": 0,
            "currentLevel": 1,
            "wins": 0,
            "losses": 0,
            "playerInventory": inventory,
        });
        let response = self.call(player, &url, Some(body)).await?;

        // The accounts service answers with JSON encoded inside a JSON string
        let decoded = match response {
            Value::String(text) => serde_json::from_str(&text)
                .map_err(|e| PlayerError::invalid(&url, format!("undecodable body: {}", e)))?,
            other => other,
        };
        if decoded["verified"] != Value::Bool(true) {
            return Err(PlayerError::invalid(&url, "missing verified"));
        }
        Ok(())
    }

    async fn login(&self, player: &Player) -> Result<AccountSession, PlayerError> {
        let url = self.accounts_url("login3");
        let body = json!({ "email": player.email, "password": player.password });
        let response = self.call(player, &url, Some(body)).await?;
        account_session(&response, &url)
    }

    async fn delete_player(&self, player: &Player) -> Result<bool, PlayerError> {
        let url = self.accounts_url("deletePlayer2");
        let body = json!({ "playerName": player.name, "password": player.password });
        let response = self.call(player, &url, Some(body)).await?;
        response["success"]
            .as_bool()
            .ok_or_else(|| PlayerError::invalid(&url, "missing success"))
    }

    async fn player_stats(
        &self,
        player: &Player,
        session_token: &str,
    ) -> Result<i64, PlayerError> {
        let url = self.stats_url("getPlayerStats");
        let body = json!({ "sessionToken": session_token, "playerNames": [player.name] });
        let response = self.call_stats(player, &url, body).await?;
        response["playerStatsList"][0]["gamesPlayed"]
            .as_i64()
            .ok_or_else(|| PlayerError::invalid(&url, "missing playerStatsList[0].gamesPlayed"))
    }

    async fn player_inventory(&self, player: &Player) -> Result<(), PlayerError> {
        let url = self.stats_url("getPlayerInventory");
        let body = json!({ "playerName": player.name });
        let response = self.call_stats(player, &url, body).await?;
        if response.get("inventoryIds").map_or(true, Value::is_null) {
            return Err(PlayerError::invalid(&url, "missing inventoryIds"));
        }
        Ok(())
    }

    async fn list_games(
        &self,
        player: &Player,
        session_token: &str,
    ) -> Result<Vec<LobbyListing>, PlayerError> {
        let url = self.lobbies_url("listGames");
        let body = json!({ "playerName": player.name, "sessionToken": session_token });
        let response = self.call(player, &url, Some(body)).await?;
        if !response.is_array() {
            return Err(PlayerError::invalid(&url, "response is not an array"));
        }
        serde_json::from_value(response)
            .map_err(|e| PlayerError::invalid(&url, format!("bad lobby listing: {}", e)))
    }

    async fn host_game(&self, player: &Player, session_token: &str) -> Result<Game, PlayerError> {
        let url = self.lobbies_url("hostGame");
        let body = json!({
            "playerName": player.name,
            "sessionToken": session_token,
            "gameName": format!("GameName {}", player.name),
            "mapName": MAP_NAME,
            "gameType": GAME_TYPE,
        });
        let response = self.call(player, &url, Some(body)).await?;
        Ok(Game {
            connection_key: Some(require_str(&response, "connectionKey", &url)?),
            game_guid: require_str(&response, "gameGUID", &url)?,
            game_name: require_str(&response, "gameName", &url)?,
            host: require_str(&response, "host", &url)?,
            http_endpoint: require_str(&response, "httpEndpoint", &url)?,
            port: require_str(&response, "port", &url)?,
        })
    }

    async fn join_game(
        &self,
        player: &Player,
        session_token: &str,
        game_guid: &str,
    ) -> Result<JoinOutcome, PlayerError> {
        let url = self.lobbies_url("joinGame");
        let body = json!({
            "playerName": player.name,
            "sessionToken": session_token,
            "gameGUID": game_guid,
        });
        let response = self.send(player, &url, Some(body)).await?;

        if let Some(message) = body_error(&response.body) {
            if TOLERATED_JOIN_ERRORS.contains(&message.as_str()) {
                return Ok(JoinOutcome::Rejected(message));
            }
            return Err(backend_error(&url, message));
        }
        if !response.is_success() {
            return Err(backend_error(&url, format!("status {}", response.status)));
        }
        match response.body["connectionKey"].as_str() {
            Some(key) if !key.is_empty() => Ok(JoinOutcome::Joined {
                connection_key: key.to_string(),
            }),
            _ => Ok(JoinOutcome::Rejected("no connectionKey".to_string())),
        }
    }

    async fn update_lobby_info(
        &self,
        player: &Player,
        session_token: &str,
        game: &Game,
        command: LobbyCommand,
    ) -> Result<(), PlayerError> {
        let url = format!("{}v1/updateLobbyInfo/{}", game.http_endpoint, command.name());
        let mut body = json!({
            "playerName": player.name,
            "sessionToken": session_token,
            "gameGUID": game.game_guid,
        });
        body["lobbyCommandParameters"] = command.parameters();
        self.call(player, &url, Some(body)).await?;
        Ok(())
    }

    async fn connect_to_match(
        &self,
        player: &Player,
        connection: &ConnectionInfo,
    ) -> Result<Duration, PlayerError> {
        let url = format!(
            "http://{}:{}/connectPlayer",
            connection.server_host_name, connection.public_port
        );
        let body = json!({ "playerName": player.name, "allyId": 0 });
        let response = self.call(player, &url, Some(body)).await?;
        let millis = response["gameDurationMs"]
            .as_f64()
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .ok_or_else(|| PlayerError::invalid(&url, "gameDuration not returned"))?;
        Ok(Duration::from_millis(millis as u64))
    }

    async fn end_game_stats(
        &self,
        player: &Player,
        session_token: &str,
    ) -> Result<(), PlayerError> {
        let url = self.stats_url("getEndGamePlayerStats");
        let body = json!({
            "callingPlayerName": player.name,
            "playerNames": [player.name],
            "sessionToken": session_token,
            "newGamesPlayed": player.games_played() + 1,
        });
        let response = self.call_stats(player, &url, body).await?;
        if response
            .get("endGamePlayerStats")
            .map_or(true, Value::is_null)
        {
            return Err(PlayerError::invalid(&url, "missing endGamePlayerStats"));
        }
        Ok(())
    }
}

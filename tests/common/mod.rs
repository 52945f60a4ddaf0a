//! In-process stand-ins for the game backend, the chat relay and the lobby relay

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use skirmish_config::TimingConfig;
use skirmish_player::{
    AccountSession, ConnectionInfo, Game, GameBackend, JoinOutcome, LobbyCommand, LobbyListing,
    Player, PlayerError, Role,
};
use skirmish_relay::JsonFrameCodec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};
use tokio_util::codec::FramedRead;

pub const GAME_GUID: &str = "guid-1";
pub const MATCH_HOST: &str = "127.0.0.1";
pub const MATCH_PORT: &str = "7777";

pub fn host() -> Arc<Player> {
    Arc::new(Player::new(
        "Player0",
        "PLAYER0",
        "letmein0",
        "email0@example.com",
        Role::Host,
    ))
}

pub fn follower() -> Arc<Player> {
    Arc::new(Player::new(
        "Player1",
        "PLAYER1",
        "letmein1",
        "email1@example.com",
        Role::Follower,
    ))
}

/// No think time, a 5 s pause between loops and a generous socket wait
pub fn timing() -> TimingConfig {
    TimingConfig {
        loop_end_to_loop_start: Duration::from_secs(5),
        ..TimingConfig::immediate()
    }
    .with_socket_wait_timeout(Duration::from_secs(5))
}

/// `updateGameInfo` broadcast with a roster
pub fn game_info(status: &str, players: &[(&str, i64)]) -> Value {
    let players: Vec<Value> = players
        .iter()
        .map(|(name, team)| {
            json!({
                "playerName": name,
                "teamNumber": team,
                "commanderSelected": null,
                "isBot": false
            })
        })
        .collect();
    json!({
        "command": "updateGameInfo",
        "body": { "status": status, "players": players }
    })
}

/// Broadcast sent once every commander is locked
pub fn match_started() -> Value {
    json!({
        "command": "updateGameInfo",
        "body": {
            "status": "InGame",
            "endpoint": { "serverHostName": MATCH_HOST, "publicPort": MATCH_PORT }
        }
    })
}

async fn write_frame(writer: &mut OwnedWriteHalf, frame: &Value) -> std::io::Result<()> {
    let mut bytes = frame.to_string().into_bytes();
    bytes.push(b'\n');
    writer.write_all(&bytes).await
}

/// Chat relay that echoes messages and answers user-list requests
pub struct ChatRelay {
    port: u16,
    frames: Arc<Mutex<Vec<Value>>>,
}

impl ChatRelay {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let frames: Arc<Mutex<Vec<Value>>> = Arc::default();

        let log = frames.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_chat(stream, log.clone()));
            }
        });

        Self { port, frames }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Every frame received, across all connections
    pub fn frames(&self) -> Vec<Value> {
        self.frames.lock().clone()
    }

    /// `commandType` of every frame, `join` for the room-join frame
    pub fn commands(&self) -> Vec<String> {
        self.frames()
            .iter()
            .map(|frame| {
                frame["commandType"]
                    .as_str()
                    .unwrap_or("join")
                    .to_string()
            })
            .collect()
    }
}

async fn serve_chat(stream: TcpStream, log: Arc<Mutex<Vec<Value>>>) {
    let (read, mut write) = stream.into_split();
    let mut frames = FramedRead::new(read, JsonFrameCodec::new());
    let mut name = String::new();

    while let Some(Ok(frame)) = frames.next().await {
        log.lock().push(frame.clone());
        let reply = match frame["commandType"].as_str() {
            Some("SendMessage") => Some(json!({
                "commandType": "SendMessage",
                "message": format!("{}: {}", name, frame["message"].as_str().unwrap_or_default()),
            })),
            Some("GetUsers") => Some(json!({
                "commandType": "GetUsers",
                "room": frame["room"],
                "users": [name],
            })),
            Some(_) => None,
            None => {
                if let Some(joined) = frame["name"].as_str() {
                    name = joined.to_string();
                }
                None
            }
        };
        if let Some(reply) = reply {
            if write_frame(&mut write, &reply).await.is_err() {
                break;
            }
        }
    }
}

/// Frames pushed to a lobby connection right after its handshake
pub type LobbyScript = Arc<dyn Fn(usize, &str) -> Vec<Value> + Send + Sync>;

/// Lobby relay that answers each handshake from a script
///
/// The script gets the connection index (in accept order) and the player
/// name from the handshake.
pub struct LobbyRelay {
    port: u16,
    handshakes: Arc<Mutex<Vec<Value>>>,
    peers: Arc<Mutex<Vec<mpsc::UnboundedSender<Value>>>>,
}

impl LobbyRelay {
    pub async fn start(script: LobbyScript) -> Arc<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let relay = Arc::new(Self {
            port,
            handshakes: Arc::default(),
            peers: Arc::default(),
        });

        let handshakes = relay.handshakes.clone();
        let peers = relay.peers.clone();
        tokio::spawn(async move {
            let accepted = AtomicUsize::new(0);
            while let Ok((stream, _)) = listener.accept().await {
                let index = accepted.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve_lobby(
                    stream,
                    index,
                    script.clone(),
                    handshakes.clone(),
                    peers.clone(),
                ));
            }
        });

        relay
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn handshakes(&self) -> Vec<Value> {
        self.handshakes.lock().clone()
    }

    /// Send `frame` to every open connection
    pub fn broadcast(&self, frame: Value) {
        self.peers.lock().retain(|peer| peer.send(frame.clone()).is_ok());
    }
}

async fn serve_lobby(
    stream: TcpStream,
    index: usize,
    script: LobbyScript,
    handshakes: Arc<Mutex<Vec<Value>>>,
    peers: Arc<Mutex<Vec<mpsc::UnboundedSender<Value>>>>,
) {
    let (read, mut write) = stream.into_split();
    let mut frames = FramedRead::new(read, JsonFrameCodec::new());
    let Some(Ok(handshake)) = frames.next().await else {
        return;
    };
    let name = handshake["playerName"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    handshakes.lock().push(handshake);

    let (tx, mut rx) = mpsc::unbounded_channel();
    for frame in script(index, &name) {
        let _ = tx.send(frame);
    }
    peers.lock().push(tx);

    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(frame) => {
                    if write_frame(&mut write, &frame).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            inbound = frames.next() => {
                if !matches!(inbound, Some(Ok(_))) {
                    break;
                }
            }
        }
    }
}

/// Backend that always succeeds and drives the lobby relay like the real
/// lobby service would
pub struct ScriptedBackend {
    lobby: Arc<LobbyRelay>,
    match_duration: Duration,
    calls: Mutex<Vec<&'static str>>,
    commands: Mutex<Vec<&'static str>>,
    pub map_changed: Notify,
}

impl ScriptedBackend {
    pub fn new(lobby: Arc<LobbyRelay>) -> Self {
        Self {
            lobby,
            match_duration: Duration::from_millis(20),
            calls: Mutex::default(),
            commands: Mutex::default(),
            map_changed: Notify::new(),
        }
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    /// Lobby commands in the order they were issued
    pub fn commands(&self) -> Vec<&'static str> {
        self.commands.lock().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().push(call);
    }

    fn listing(&self) -> LobbyListing {
        LobbyListing {
            game_guid: GAME_GUID.to_string(),
            game_name: "GameName Player0".to_string(),
            map_name: "SacredArena".to_string(),
            game_type: "Classic".to_string(),
            num_of_players: 1,
            max_players: 6,
            host_name: "Player0".to_string(),
            host: "127.0.0.1".to_string(),
            port: self.lobby.port().to_string(),
            http_endpoint: "http://127.0.0.1:1/".to_string(),
        }
    }
}

fn account(player: &Player) -> AccountSession {
    AccountSession {
        email: player.email.clone(),
        player_name: player.name.clone(),
        session_token: format!("token-{}", player.name),
    }
}

#[async_trait]
impl GameBackend for ScriptedBackend {
    async fn motd(&self, _player: &Player) -> Result<(), PlayerError> {
        self.record("motd");
        Ok(())
    }

    async fn create_player(&self, player: &Player) -> Result<AccountSession, PlayerError> {
        self.record("create_player");
        Ok(account(player))
    }

    async fn verify_email(&self, _player: &Player) -> Result<(), PlayerError> {
        self.record("verify_email");
        Ok(())
    }

    async fn login(&self, player: &Player) -> Result<AccountSession, PlayerError> {
        self.record("login");
        Ok(account(player))
    }

    async fn delete_player(&self, _player: &Player) -> Result<bool, PlayerError> {
        self.record("delete_player");
        Ok(true)
    }

    async fn player_stats(&self, _player: &Player, _token: &str) -> Result<i64, PlayerError> {
        self.record("player_stats");
        Ok(3)
    }

    async fn player_inventory(&self, _player: &Player) -> Result<(), PlayerError> {
        self.record("player_inventory");
        Ok(())
    }

    async fn list_games(
        &self,
        _player: &Player,
        _token: &str,
    ) -> Result<Vec<LobbyListing>, PlayerError> {
        self.record("list_games");
        Ok(vec![self.listing()])
    }

    async fn host_game(&self, _player: &Player, _token: &str) -> Result<Game, PlayerError> {
        self.record("host_game");
        let mut game = Game::from_listing(&self.listing());
        game.connection_key = Some("key-host".to_string());
        Ok(game)
    }

    async fn join_game(
        &self,
        player: &Player,
        _token: &str,
        _guid: &str,
    ) -> Result<JoinOutcome, PlayerError> {
        self.record("join_game");
        Ok(JoinOutcome::Joined {
            connection_key: format!("key-{}", player.name),
        })
    }

    async fn update_lobby_info(
        &self,
        _player: &Player,
        _token: &str,
        _game: &Game,
        command: LobbyCommand,
    ) -> Result<(), PlayerError> {
        self.record("update_lobby_info");
        self.commands.lock().push(command.name());
        match command {
            LobbyCommand::ChangeMap(_) => self.map_changed.notify_one(),
            LobbyCommand::LockCommander => self.lobby.broadcast(match_started()),
            _ => {}
        }
        Ok(())
    }

    async fn connect_to_match(
        &self,
        _player: &Player,
        connection: &ConnectionInfo,
    ) -> Result<Duration, PlayerError> {
        self.record("connect_to_match");
        assert_eq!(connection.server_host_name, MATCH_HOST);
        assert_eq!(connection.public_port, MATCH_PORT);
        Ok(self.match_duration)
    }

    async fn end_game_stats(&self, _player: &Player, _token: &str) -> Result<(), PlayerError> {
        self.record("end_game_stats");
        Ok(())
    }
}

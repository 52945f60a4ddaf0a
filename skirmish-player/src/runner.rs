//! Drives players through their loops
//!
//! Each loop iteration runs inside the timer task that started it. The
//! runner owns no per-player state: everything a loop needs lives in the
//! [`Player`] (identity, counters, exit flag) or in the [`Session`] created
//! for that iteration.

use crate::backend::{GameBackend, JoinOutcome, LobbyCommand};
use crate::driver::PlayerDriver;
use crate::error::PlayerError;
use crate::model::{Game, Player, Role};
use crate::phase::{transition, Outcome, Phase, Step, StepContext, Transition};
use crate::protocol::{self, LobbyChoice, ALL_CHAT_ROOM};
use crate::session::{Awaiting, Session, SessionFactory};
use async_trait::async_trait;
use skirmish_config::{BackendConfig, TimingConfig};
use skirmish_relay::{FrameWaiter, RelayConnection, RelayError};
use skirmish_timers::Timers;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const MAP_CHANGE: &str = "Crater";
const FIRST_COMMANDER: &str = "HiveLord";
const SECOND_COMMANDER: &str = "RoboMeister";

/// Address of the chat relay every player joins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEndpoint {
    pub host: String,
    pub port: u16,
}

impl ChatEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn from_config(backend: &BackendConfig) -> Self {
        Self::new(backend.chat_host.clone(), backend.chat_port)
    }
}

struct RunnerInner {
    backend: Arc<dyn GameBackend>,
    sessions: SessionFactory,
    timers: Arc<dyn Timers>,
    timing: TimingConfig,
    chat: ChatEndpoint,
}

/// Starts, loops and stops virtual players
#[derive(Clone)]
pub struct PlayerRunner {
    inner: Arc<RunnerInner>,
}

impl PlayerRunner {
    pub fn new(
        backend: Arc<dyn GameBackend>,
        timers: Arc<dyn Timers>,
        timing: TimingConfig,
        chat: ChatEndpoint,
    ) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                backend,
                sessions: SessionFactory::new(),
                timers,
                timing,
                chat,
            }),
        }
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.inner.timing
    }

    /// Schedule the first loop iteration immediately
    pub fn start_player(&self, player: Arc<Player>) {
        info!(player_name = %player.name, role = %player.role, "Starting");
        if !self.schedule_loop(&player, Duration::ZERO) {
            debug!(player_name = %player.name, "Player is exiting, not started");
        }
    }

    /// Stop looping and delete the account
    ///
    /// A pending loop timer is cancelled and a running iteration is torn
    /// down at its next suspension point. Deletion failures are logged and
    /// never retried.
    pub async fn stop_player(&self, player: Arc<Player>) {
        let had_timer = player.request_exit();
        info!(
            player_name = %player.name,
            to = %Phase::Deleting,
            "ChangeStatus"
        );
        if had_timer {
            info!(player_name = %player.name, "StoppedFromTimer");
        }

        match self.inner.backend.delete_player(&player).await {
            Ok(true) => info!(player_name = %player.name, "PlayerDeleteSuccess"),
            Ok(false) => error!(player_name = %player.name, "PlayerDeleteError-noSuccess"),
            Err(e) => error!(player_name = %player.name, error = %e, "PlayerDeleteError"),
        }
    }

    fn schedule_loop(&self, player: &Arc<Player>, delay: Duration) -> bool {
        let runner = self.clone();
        let looping = player.clone();
        player.arm_loop_timer(|| {
            self.inner.timers.schedule(
                delay,
                Box::pin(async move {
                    runner.run_loop(looping).await;
                }),
            )
        })
    }

    /// One full iteration, followed by a reschedule unless the player is exiting
    pub async fn run_loop(&self, player: Arc<Player>) {
        player.clear_loop_timer();
        let mut session = self.inner.sessions.generate_session();
        player.attach_session(session.teardown_token().clone());

        let result = match self.drive(&player, &mut session).await {
            Ok(()) => check_exit(&player),
            Err(e) => Err(e),
        };
        let retry_after = self.inner.timing.loop_end_to_loop_start;

        match result {
            Ok(()) => {
                player.record_loop_success();
                info!(
                    player_name = %player.name,
                    status = %session.status,
                    "LoopEndedSuccessfully"
                );
                change_status(&player, &mut session, Phase::Initialized);
                self.cleanup(&player, session).await;
                self.schedule_loop(&player, retry_after);
            }
            Err(e) if e.is_cancellation() || player.should_exit() => {
                info!(
                    player_name = %player.name,
                    status = %session.status,
                    "PlayerStopped"
                );
                self.cleanup(&player, session).await;
            }
            Err(e) => {
                error!(
                    player_name = %player.name,
                    status = %session.status,
                    error = %e,
                    "PlayerLoopError"
                );
                self.cleanup(&player, session).await;
                self.schedule_loop(&player, retry_after);
            }
        }
    }

    async fn drive(&self, player: &Player, session: &mut Session) -> Result<(), PlayerError> {
        let mut step = Step::FIRST;
        loop {
            check_exit(player)?;
            change_status(player, session, step.phase());

            let outcome = self.perform(player, session, step).await?;
            let ctx = StepContext {
                role: player.role,
                account_created: player.account_created(),
            };
            match transition(&ctx, step, &outcome) {
                Transition::Next { step: next, think } => {
                    self.think(session, think.duration(&self.inner.timing))
                        .await?;
                    step = next;
                }
                Transition::Complete => return Ok(()),
                Transition::Unexpected => {
                    return Err(PlayerError::UnexpectedOutcome {
                        phase: step.phase(),
                        outcome: format!("{:?}", outcome),
                    })
                }
            }
        }
    }

    /// Simulated client pause, cut short when the session is torn down
    ///
    /// Measured on the tokio clock rather than [`Timers`]: the iteration is
    /// itself a timer task, and a virtual clock that awaits its tasks inline
    /// would never fire a timer scheduled from inside one.
    async fn think(&self, session: &Session, delay: Duration) -> Result<(), PlayerError> {
        if delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = session.teardown_token().cancelled() => Err(PlayerError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    async fn perform(
        &self,
        player: &Player,
        session: &mut Session,
        step: Step,
    ) -> Result<Outcome, PlayerError> {
        let backend = &self.inner.backend;
        let wait = self.inner.timing.socket_wait_timeout;

        match step {
            Step::OpeningMotd => {
                player.record_loop_start();
                backend.motd(player).await?;
            }
            Step::CreateAccount => {
                let account = backend.create_player(player).await?;
                session.session_token = Some(account.session_token);
                player.mark_account_created();
                info!(player_name = %player.name, status = %session.status, "AccountCreated");
                backend.verify_email(player).await?;
            }
            Step::Login => {
                let account = backend.login(player).await?;
                session.session_token = Some(account.session_token);
                info!(player_name = %player.name, status = %session.status, "LoggedIn");
            }
            Step::AccountMotd | Step::LobbyMotd | Step::CommanderMotd => {
                backend.motd(player).await?;
            }
            Step::InitialStats | Step::LobbyPlayersStats => {
                let games_played = backend.player_stats(player, session.token()).await?;
                player.set_games_played(games_played);
            }
            Step::InitialInventory | Step::LobbyInventory => {
                backend.player_inventory(player).await?;
            }
            Step::JoinAllChat => {
                let chat = &self.inner.chat;
                let mut socket =
                    RelayConnection::connect(&chat.host, chat.port, session.teardown_token())
                        .await?;
                socket.listen();
                socket
                    .send_line(&protocol::chat_join(ALL_CHAT_ROOM, &player.name))
                    .await?;
                session.chat = Some(socket);
            }
            Step::SendInitialMessage | Step::SendGameRoomMessage => {
                let chat = chat_socket(session)?;
                let echo = chat.expect(protocol::is_own_message(&player.name));
                chat.send_line(&protocol::chat_send_message()).await?;
                echo.recv_timeout(wait).await?;
            }
            Step::GetUsersInChat => {
                let chat = chat_socket(session)?;
                let users = chat.expect(protocol::is_user_list);
                chat.send_line(&protocol::chat_get_users(ALL_CHAT_ROOM))
                    .await?;
                users.recv_timeout(wait).await?;
            }
            Step::ListGames => {
                let listings = backend.list_games(player, session.token()).await?;
                debug!(player_name = %player.name, lobbies = listings.len(), "ListedGames");
            }
            Step::HostGame => {
                let game = backend.host_game(player, session.token()).await?;
                session.game = Some(game);
                info!(player_name = %player.name, status = %session.status, "HostedLobby");
            }
            Step::FindLobby => {
                let listings = backend.list_games(player, session.token()).await?;
                let choice = protocol::choose_lobby(&listings, &mut session.excluded_lobbies);
                return Ok(match choice {
                    LobbyChoice::Found(listing) => {
                        session.game = Some(Game::from_listing(&listing));
                        Outcome::LobbyFound
                    }
                    LobbyChoice::NoneAvailable => Outcome::NoLobbyAvailable,
                });
            }
            Step::JoinLobby => {
                let guid = current_game(session)?.game_guid.clone();
                let joined = backend.join_game(player, session.token(), &guid).await?;
                return Ok(match joined {
                    JoinOutcome::Joined { connection_key } => {
                        if let Some(game) = session.game.as_mut() {
                            game.connection_key = Some(connection_key);
                        }
                        Outcome::Joined
                    }
                    JoinOutcome::Rejected(reason) => {
                        debug!(
                            player_name = %player.name,
                            game_guid = %guid,
                            reason = %reason,
                            "JoinRejected"
                        );
                        session.game = None;
                        Outcome::JoinRejected
                    }
                });
            }
            Step::OpenLobbySocket => return self.open_lobby_socket(player, session).await,
            Step::SwitchToGameChat => {
                let guid = current_game(session)?.game_guid.clone();
                chat_socket(session)?
                    .send_line(&protocol::chat_switch_room(&guid))
                    .await?;
            }
            Step::CheckSpectator => {
                let roster = take_waiter(session, Awaiting::Roster)?
                    .recv_timeout(wait)
                    .await?;
                if protocol::is_spectator(&roster, &player.name) {
                    info!(player_name = %player.name, "AssignedSpectator");
                    return Ok(Outcome::Spectator);
                }
            }
            Step::LeaveLobby => {
                chat_socket(session)?
                    .send_line(&protocol::chat_switch_room(ALL_CHAT_ROOM))
                    .await?;
                if let Some(guid) = session.leave_lobby().await {
                    session.excluded_lobbies.insert(guid);
                }
            }
            Step::ChangeMap => {
                self.update_lobby(player, session, LobbyCommand::ChangeMap(MAP_CHANGE.into()))
                    .await?;
            }
            Step::WaitForPlayers => {
                take_waiter(session, Awaiting::LobbyFull)?
                    .recv_timeout(wait)
                    .await?;
            }
            Step::LockTeams => {
                self.update_lobby(player, session, LobbyCommand::LockTeams)
                    .await?;
            }
            Step::WaitForCommanderSelect => {
                take_waiter(session, Awaiting::CommanderSelect)?
                    .recv_timeout(wait)
                    .await?;
            }
            Step::ChooseCommander => {
                let pick = LobbyCommand::ChooseCommander(FIRST_COMMANDER.into());
                self.update_lobby(player, session, pick).await?;
            }
            Step::SwitchCommander => {
                let pick = LobbyCommand::ChooseCommander(SECOND_COMMANDER.into());
                self.update_lobby(player, session, pick).await?;
            }
            Step::LockCommander => {
                let started = lobby_socket(session)?.expect(protocol::is_match_started);
                session.awaiting.insert(Awaiting::MatchStart, started);
                self.update_lobby(player, session, LobbyCommand::LockCommander)
                    .await?;
                info!(player_name = %player.name, status = %session.status, "LockedCommander");
            }
            Step::WaitForGameStart => {
                let frame = take_waiter(session, Awaiting::MatchStart)?
                    .recv_timeout(wait)
                    .await?;
                session.connection = Some(protocol::match_endpoint(&frame)?);
            }
            Step::ConnectToMatch => {
                let connection = session
                    .connection
                    .clone()
                    .ok_or_else(|| PlayerError::Protocol("no match endpoint".to_string()))?;
                let duration = backend.connect_to_match(player, &connection).await?;
                info!(player_name = %player.name, status = %session.status, "ConnectedToGame");
                info!(
                    player_name = %player.name,
                    game_duration_ms = duration.as_millis() as u64,
                    "WaitingForGameEnd"
                );
                return Ok(Outcome::MatchJoined { duration });
            }
            Step::EndGameStats => {
                backend.end_game_stats(player, session.token()).await?;
            }
        }
        Ok(Outcome::Done)
    }

    /// Connect to the lobby relay and wait for the handshake acknowledgement
    ///
    /// Role waiters are registered before the reader starts, so a roster
    /// broadcast sent together with the acknowledgement is not missed.
    async fn open_lobby_socket(
        &self,
        player: &Player,
        session: &mut Session,
    ) -> Result<Outcome, PlayerError> {
        let game = current_game(session)?.clone();
        let port: u16 = game
            .port
            .parse()
            .map_err(|_| PlayerError::Protocol(format!("invalid lobby port {:?}", game.port)))?;

        let mut lobby =
            RelayConnection::connect(&game.host, port, session.teardown_token()).await?;
        let acknowledged = lobby.expect(protocol::is_update_game_info);
        match player.role {
            Role::Host => {
                let full = lobby.expect(protocol::is_full_lobby_broadcast);
                session.awaiting.insert(Awaiting::LobbyFull, full);
            }
            Role::Follower => {
                let roster = lobby.expect(protocol::is_roster_with(&player.name));
                let select = lobby.expect(protocol::is_commander_select);
                session.awaiting.insert(Awaiting::Roster, roster);
                session.awaiting.insert(Awaiting::CommanderSelect, select);
            }
        }
        lobby.listen();
        lobby
            .send_raw(&protocol::lobby_handshake(&game, &player.name))
            .await?;
        session.lobby = Some(lobby);

        match acknowledged
            .recv_timeout(self.inner.timing.socket_wait_timeout)
            .await
        {
            Ok(_) => {
                info!(player_name = %player.name, game_guid = %game.game_guid, "JoinedLobby");
                Ok(Outcome::Done)
            }
            Err(RelayError::Closed | RelayError::Io(_)) if !session.is_torn_down() => {
                warn!(player_name = %player.name, game_guid = %game.game_guid, "LobbySocketDropped");
                Ok(Outcome::LobbySocketDropped)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_lobby(
        &self,
        player: &Player,
        session: &Session,
        command: LobbyCommand,
    ) -> Result<(), PlayerError> {
        let game = current_game(session)?;
        self.inner
            .backend
            .update_lobby_info(player, session.token(), game, command)
            .await
    }

    async fn cleanup(&self, player: &Player, session: Session) {
        info!(player_name = %player.name, status = %session.status, "PlayerCleanup");
        player.detach_session();
        session.close().await;
    }
}

#[async_trait]
impl PlayerDriver for PlayerRunner {
    async fn start(&self, player: Arc<Player>) {
        self.start_player(player);
    }

    async fn stop(&self, player: Arc<Player>) {
        self.stop_player(player).await;
    }
}

fn check_exit(player: &Player) -> Result<(), PlayerError> {
    if player.should_exit() {
        return Err(PlayerError::Cancelled);
    }
    Ok(())
}

fn change_status(player: &Player, session: &mut Session, to: Phase) {
    info!(
        player_name = %player.name,
        from = %session.status,
        to = %to,
        "ChangeStatus"
    );
    session.status = to;
}

fn current_game(session: &Session) -> Result<&Game, PlayerError> {
    session
        .game
        .as_ref()
        .ok_or_else(|| PlayerError::Protocol("not attached to a lobby".to_string()))
}

fn chat_socket(session: &mut Session) -> Result<&mut RelayConnection, PlayerError> {
    session
        .chat
        .as_mut()
        .ok_or_else(|| PlayerError::Protocol("chat socket not open".to_string()))
}

fn lobby_socket(session: &Session) -> Result<&RelayConnection, PlayerError> {
    session
        .lobby
        .as_ref()
        .ok_or_else(|| PlayerError::Protocol("lobby socket not open".to_string()))
}

fn take_waiter(session: &mut Session, awaiting: Awaiting) -> Result<FrameWaiter, PlayerError> {
    session
        .awaiting
        .remove(&awaiting)
        .ok_or_else(|| PlayerError::Protocol(format!("not waiting for {:?}", awaiting)))
}

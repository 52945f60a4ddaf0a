//! Player lifecycle as an explicit state machine
//!
//! A loop iteration is a walk over [`Step`]s. Each step performs its network
//! work and reports an [`Outcome`]; [`transition`] maps the pair to the next
//! step and the think time to wait before it. Keeping the table pure means
//! the exit check, the think-time delays and the retry branches live in one
//! place instead of being repeated at every step.

use serde::{Deserialize, Serialize};
use skirmish_config::TimingConfig;
use std::fmt;
use std::time::Duration;

use crate::model::Role;

/// Status tag reported for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Initialized,
    Motd,
    CreatingAccount,
    LoggingIn,
    Deleting,
    GettingInitialPlayerStats,
    GettingInitialPlayerInventory,
    JoiningAllChat,
    SendingInitialMessage,
    GettingUsersInChat,
    ListingGames,
    JoiningGame,
    HostingGame,
    MakingLobbySocket,
    GettingLobbyPlayersStats,
    SwitchingToGameChatRoom,
    SendingGameRoomMessage,
    ChangingMap,
    LockingTeams,
    GettingLobbyPlayerInventory,
    ChoosingCommander,
    LockingCommander,
    WaitingForGameStarted,
    InGame,
    GettingEndgameStats,
    WaitingForPlayers,
    WaitingForCommanderSelect,
    LeavingGameLobby,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Initialized => "initialized",
            Phase::Motd => "motd",
            Phase::CreatingAccount => "creatingAccount",
            Phase::LoggingIn => "loggingIn",
            Phase::Deleting => "deleting",
            Phase::GettingInitialPlayerStats => "gettingInitialPlayerStats",
            Phase::GettingInitialPlayerInventory => "gettingInitialPlayerInventory",
            Phase::JoiningAllChat => "joiningAllChat",
            Phase::SendingInitialMessage => "sendingInitialMessage",
            Phase::GettingUsersInChat => "gettingUsersInChat",
            Phase::ListingGames => "listingGames",
            Phase::JoiningGame => "joiningGame",
            Phase::HostingGame => "hostingGame",
            Phase::MakingLobbySocket => "makingLobbySocket",
            Phase::GettingLobbyPlayersStats => "gettingLobbyPlayersStats",
            Phase::SwitchingToGameChatRoom => "switchingToGameChatRoom",
            Phase::SendingGameRoomMessage => "sendingGameRoomMessage",
            Phase::ChangingMap => "changingMap",
            Phase::LockingTeams => "lockingTeams",
            Phase::GettingLobbyPlayerInventory => "gettingLobbyPlayerInventory",
            Phase::ChoosingCommander => "choosingCommander",
            Phase::LockingCommander => "lockingCommander",
            Phase::WaitingForGameStarted => "waitingForGameStarted",
            Phase::InGame => "inGame",
            Phase::GettingEndgameStats => "gettingEndgameStats",
            Phase::WaitingForPlayers => "waitingForPlayers",
            Phase::WaitingForCommanderSelect => "waitingForCommanderSelect",
            Phase::LeavingGameLobby => "leavingGameLobby",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of network work in a loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    OpeningMotd,
    CreateAccount,
    Login,
    AccountMotd,
    InitialStats,
    InitialInventory,
    JoinAllChat,
    SendInitialMessage,
    GetUsersInChat,
    ListGames,
    HostGame,
    FindLobby,
    JoinLobby,
    OpenLobbySocket,
    LobbyMotd,
    LobbyPlayersStats,
    SwitchToGameChat,
    SendGameRoomMessage,
    CheckSpectator,
    LeaveLobby,
    ChangeMap,
    WaitForPlayers,
    LockTeams,
    WaitForCommanderSelect,
    CommanderMotd,
    LobbyInventory,
    ChooseCommander,
    SwitchCommander,
    LockCommander,
    WaitForGameStart,
    ConnectToMatch,
    EndGameStats,
}

impl Step {
    /// First step of every iteration
    pub const FIRST: Step = Step::OpeningMotd;

    /// Status shown while the step runs
    pub fn phase(&self) -> Phase {
        match self {
            Step::OpeningMotd | Step::AccountMotd | Step::LobbyMotd | Step::CommanderMotd => {
                Phase::Motd
            }
            Step::CreateAccount => Phase::CreatingAccount,
            Step::Login => Phase::LoggingIn,
            Step::InitialStats => Phase::GettingInitialPlayerStats,
            Step::InitialInventory => Phase::GettingInitialPlayerInventory,
            Step::JoinAllChat => Phase::JoiningAllChat,
            Step::SendInitialMessage => Phase::SendingInitialMessage,
            Step::GetUsersInChat => Phase::GettingUsersInChat,
            Step::ListGames | Step::FindLobby => Phase::ListingGames,
            Step::HostGame => Phase::HostingGame,
            Step::JoinLobby => Phase::JoiningGame,
            Step::OpenLobbySocket => Phase::MakingLobbySocket,
            Step::LobbyPlayersStats => Phase::GettingLobbyPlayersStats,
            Step::SwitchToGameChat => Phase::SwitchingToGameChatRoom,
            Step::SendGameRoomMessage => Phase::SendingGameRoomMessage,
            Step::CheckSpectator | Step::WaitForCommanderSelect => {
                Phase::WaitingForCommanderSelect
            }
            Step::LeaveLobby => Phase::LeavingGameLobby,
            Step::ChangeMap => Phase::ChangingMap,
            Step::WaitForPlayers => Phase::WaitingForPlayers,
            Step::LockTeams => Phase::LockingTeams,
            Step::LobbyInventory => Phase::GettingLobbyPlayerInventory,
            Step::ChooseCommander | Step::SwitchCommander => Phase::ChoosingCommander,
            Step::LockCommander => Phase::LockingCommander,
            Step::WaitForGameStart => Phase::WaitingForGameStarted,
            Step::ConnectToMatch => Phase::InGame,
            Step::EndGameStats => Phase::GettingEndgameStats,
        }
    }
}

/// What a step reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    LobbyFound,
    NoLobbyAvailable,
    Joined,
    /// Join refused with one of the tolerated backend reasons
    JoinRejected,
    /// Lobby relay closed before the handshake was acknowledged
    LobbySocketDropped,
    /// Assigned to the spectator team
    Spectator,
    /// Match server accepted the player; the match runs for `duration`
    MatchJoined { duration: Duration },
}

/// Named pause between two steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkTime {
    None,
    JoinAllChatToSendMessage,
    SendMessageToGetUsers,
    GetUsersToListGames,
    ListGamesToHostGame,
    SwitchChatroomToSendMessage,
    SendMessageToChangeMap,
    ChangeMapToLockTeams,
    PlayersArriveToCommanderSelect,
    LockTeamsToChooseCommander,
    ChooseCommanderToSwitchCommander,
    ChooseCommanderToLockCommander,
    LockCommanderToWaitForGame,
    InGameToConnectToMatchServer,
    /// Server-reported match length plus the post-match settle delay
    MatchLength(Duration),
}

impl ThinkTime {
    pub fn duration(&self, timing: &TimingConfig) -> Duration {
        match self {
            ThinkTime::None => Duration::ZERO,
            ThinkTime::JoinAllChatToSendMessage => timing.join_all_chat_to_send_message,
            ThinkTime::SendMessageToGetUsers => timing.send_message_to_get_users,
            ThinkTime::GetUsersToListGames => timing.get_users_to_list_games,
            ThinkTime::ListGamesToHostGame => timing.list_games_to_host_game,
            ThinkTime::SwitchChatroomToSendMessage => timing.switch_chatroom_to_send_message,
            ThinkTime::SendMessageToChangeMap => timing.send_message_to_change_map,
            ThinkTime::ChangeMapToLockTeams => timing.change_map_to_lock_teams,
            ThinkTime::PlayersArriveToCommanderSelect => timing.players_arrive_to_commander_select,
            ThinkTime::LockTeamsToChooseCommander => timing.lock_teams_to_choose_commander,
            ThinkTime::ChooseCommanderToSwitchCommander => {
                timing.choose_commander_to_switch_commander
            }
            ThinkTime::ChooseCommanderToLockCommander => timing.choose_commander_to_lock_commander,
            ThinkTime::LockCommanderToWaitForGame => timing.lock_commander_to_wait_for_game,
            ThinkTime::InGameToConnectToMatchServer => timing.in_game_to_connect_to_match_server,
            ThinkTime::MatchLength(match_length) => {
                match_length.saturating_add(timing.game_end_to_end_game_stats)
            }
        }
    }
}

/// Facts about the player that select a branch
#[derive(Debug, Clone, Copy)]
pub struct StepContext {
    pub role: Role,
    pub account_created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Next { step: Step, think: ThinkTime },
    /// The iteration finished successfully
    Complete,
    /// The step reported an outcome it cannot produce for this player
    Unexpected,
}

fn next(step: Step) -> Transition {
    Transition::Next {
        step,
        think: ThinkTime::None,
    }
}

fn next_after(step: Step, think: ThinkTime) -> Transition {
    Transition::Next { step, think }
}

/// Pure transition table of the player lifecycle
pub fn transition(ctx: &StepContext, step: Step, outcome: &Outcome) -> Transition {
    use Outcome as O;
    use Step as S;

    let host = ctx.role == Role::Host;
    match (step, outcome) {
        (S::OpeningMotd, O::Done) if ctx.account_created => next(S::Login),
        (S::OpeningMotd, O::Done) => next(S::CreateAccount),
        (S::CreateAccount | S::Login, O::Done) => next(S::AccountMotd),
        (S::AccountMotd, O::Done) => next(S::InitialStats),
        (S::InitialStats, O::Done) => next(S::InitialInventory),
        (S::InitialInventory, O::Done) => next(S::JoinAllChat),
        (S::JoinAllChat, O::Done) => {
            next_after(S::SendInitialMessage, ThinkTime::JoinAllChatToSendMessage)
        }
        (S::SendInitialMessage, O::Done) => {
            next_after(S::GetUsersInChat, ThinkTime::SendMessageToGetUsers)
        }
        (S::GetUsersInChat, O::Done) if host => {
            next_after(S::ListGames, ThinkTime::GetUsersToListGames)
        }
        (S::GetUsersInChat, O::Done) => next_after(S::FindLobby, ThinkTime::GetUsersToListGames),

        (S::ListGames, O::Done) if host => next_after(S::HostGame, ThinkTime::ListGamesToHostGame),
        (S::HostGame, O::Done) if host => next(S::OpenLobbySocket),

        (S::FindLobby, O::LobbyFound) if !host => next(S::JoinLobby),
        (S::FindLobby, O::NoLobbyAvailable) if !host => {
            next_after(S::FindLobby, ThinkTime::GetUsersToListGames)
        }
        (S::JoinLobby, O::Joined) if !host => next(S::OpenLobbySocket),
        (S::JoinLobby, O::JoinRejected) if !host => {
            next_after(S::FindLobby, ThinkTime::GetUsersToListGames)
        }

        (S::OpenLobbySocket, O::Done) => next(S::LobbyMotd),
        (S::OpenLobbySocket, O::LobbySocketDropped) if !host => next(S::LeaveLobby),
        (S::LobbyMotd, O::Done) => next(S::LobbyPlayersStats),
        (S::LobbyPlayersStats, O::Done) => next(S::SwitchToGameChat),
        (S::SwitchToGameChat, O::Done) => {
            next_after(S::SendGameRoomMessage, ThinkTime::SwitchChatroomToSendMessage)
        }
        (S::SendGameRoomMessage, O::Done) if host => {
            next_after(S::ChangeMap, ThinkTime::SendMessageToChangeMap)
        }
        (S::SendGameRoomMessage, O::Done) => next(S::CheckSpectator),

        (S::CheckSpectator, O::Spectator) if !host => next(S::LeaveLobby),
        (S::CheckSpectator, O::Done) if !host => next(S::WaitForCommanderSelect),
        (S::LeaveLobby, O::Done) if !host => {
            next_after(S::FindLobby, ThinkTime::GetUsersToListGames)
        }

        (S::ChangeMap, O::Done) if host => {
            next_after(S::WaitForPlayers, ThinkTime::ChangeMapToLockTeams)
        }
        (S::WaitForPlayers, O::Done) if host => {
            next_after(S::LockTeams, ThinkTime::PlayersArriveToCommanderSelect)
        }
        (S::LockTeams, O::Done) if host => next(S::CommanderMotd),
        (S::WaitForCommanderSelect, O::Done) if !host => next(S::CommanderMotd),

        (S::CommanderMotd, O::Done) => next(S::LobbyInventory),
        (S::LobbyInventory, O::Done) => {
            next_after(S::ChooseCommander, ThinkTime::LockTeamsToChooseCommander)
        }
        (S::ChooseCommander, O::Done) => {
            next_after(S::SwitchCommander, ThinkTime::ChooseCommanderToSwitchCommander)
        }
        (S::SwitchCommander, O::Done) => {
            next_after(S::LockCommander, ThinkTime::ChooseCommanderToLockCommander)
        }
        (S::LockCommander, O::Done) => {
            next_after(S::WaitForGameStart, ThinkTime::LockCommanderToWaitForGame)
        }
        (S::WaitForGameStart, O::Done) => {
            next_after(S::ConnectToMatch, ThinkTime::InGameToConnectToMatchServer)
        }
        (S::ConnectToMatch, O::MatchJoined { duration }) => {
            next_after(S::EndGameStats, ThinkTime::MatchLength(*duration))
        }
        (S::EndGameStats, O::Done) => Transition::Complete,

        _ => Transition::Unexpected,
    }
}

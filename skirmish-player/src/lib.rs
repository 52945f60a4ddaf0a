//! Virtual players for skirmish
//!
//! A [`Player`] is one scripted game client. [`PlayerRunner`] drives it
//! through an endless loop of account bring-up, chat, lobby, commander
//! select, match and end-game stats, one [`Step`] at a time, until it is
//! stopped. Step ordering lives in the pure [`transition`] function; the
//! network side effects live in the runner and the [`GameBackend`].

pub mod backend;
pub mod driver;
pub mod error;
pub mod model;
pub mod phase;
pub mod protocol;
pub mod runner;
pub mod session;

pub use backend::{AccountSession, GameBackend, HttpGameBackend, JoinOutcome, LobbyCommand};
pub use driver::PlayerDriver;
pub use error::PlayerError;
pub use model::{ConnectionInfo, Game, LobbyListing, LobbyMember, Player, PlayerReport, Role};
pub use phase::{transition, Outcome, Phase, Step, StepContext, ThinkTime, Transition};
pub use runner::{ChatEndpoint, PlayerRunner};
pub use session::{Session, SessionFactory};

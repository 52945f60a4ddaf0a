use crate::model::Player;
use async_trait::async_trait;
use std::sync::Arc;

/// Starts and stops players on behalf of a ramp scheduler
#[async_trait]
pub trait PlayerDriver: Send + Sync {
    /// Begin the player's loop; returns once the first iteration is scheduled
    async fn start(&self, player: Arc<Player>);

    /// Ask the player to exit and delete its account
    async fn stop(&self, player: Arc<Player>);
}

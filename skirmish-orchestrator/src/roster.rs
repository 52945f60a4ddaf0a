//! Player roster generation

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skirmish_player::{Player, Role};
use std::sync::Arc;

/// Every sixth generated player, by index, hosts a lobby
pub const HOST_EVERY: usize = 6;

const MAX_PLAYER_NUMBER: u64 = 1_000_000_000;

/// Builds rosters of fresh players with random numeric identities
pub struct RosterGenerator {
    rng: Mutex<StdRng>,
}

impl RosterGenerator {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_rng(&mut rand::rng())),
        }
    }

    /// Deterministic identities, for tests and reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn generate(&self, count: usize) -> Vec<Arc<Player>> {
        let mut rng = self.rng.lock();
        (0..count)
            .map(|index| {
                let number = rng.random_range(0..=MAX_PLAYER_NUMBER);
                let name = format!("Player{}", number);
                let role = if index % HOST_EVERY == 0 {
                    Role::Host
                } else {
                    Role::Follower
                };
                Arc::new(Player::new(
                    name.clone(),
                    name.to_uppercase(),
                    format!("letmein{}", number),
                    format!("email{}@example.com", number),
                    role,
                ))
            })
            .collect()
    }
}

impl Default for RosterGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_sixth_player_hosts() {
        let roster = RosterGenerator::seeded(1).generate(13);
        let hosts: Vec<usize> = roster
            .iter()
            .enumerate()
            .filter(|(_, player)| player.is_host())
            .map(|(index, _)| index)
            .collect();
        assert_eq!(hosts, vec![0, 6, 12]);
    }

    #[test]
    fn test_identity_is_derived_from_one_number() {
        let roster = RosterGenerator::seeded(2).generate(1);
        let player = &roster[0];
        let number = player.name.trim_start_matches("Player");
        assert!(number.parse::<u64>().is_ok());
        assert_eq!(player.unique_name, format!("PLAYER{}", number));
        assert_eq!(player.password, format!("letmein{}", number));
        assert_eq!(player.email, format!("email{}@example.com", number));
        assert!(!player.account_created());
    }

    #[test]
    fn test_seeded_generators_agree() {
        let first = RosterGenerator::seeded(9).generate(4);
        let second = RosterGenerator::seeded(9).generate(4);
        let names = |roster: &[Arc<Player>]| roster.iter().map(|p| p.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&first), names(&second));
    }
}

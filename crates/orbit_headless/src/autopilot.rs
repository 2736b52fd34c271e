//! Scripted player for headless playtesting.
//!
//! The autopilot plays the player's side with the same targeting
//! [`Policy`] the bots use, and fires any unlocked ability as soon as
//! it is off cooldown. It only ever issues ordinary [`PlayerCommand`]s,
//! so its games can be recorded and replayed like any other.

use orbit_core::abilities::AbilityType;
use orbit_core::bot::{BotOrder, Policy};
use orbit_core::difficulty::Difficulty;
use orbit_core::game::{Game, PlayerCommand};
use orbit_core::ids::OperatorId;

/// Steps between two decisions (one second at the default rate).
pub const DEFAULT_DECISION_INTERVAL: u64 = 60;

/// Policy-driven player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Autopilot {
    policy: Policy,
    interval_steps: u64,
}

impl Autopilot {
    /// Autopilot playing with the policy of `difficulty`.
    #[must_use]
    pub const fn new(difficulty: Difficulty) -> Self {
        Self {
            policy: Policy::for_difficulty(difficulty),
            interval_steps: DEFAULT_DECISION_INTERVAL,
        }
    }

    /// Decide every `steps` steps instead.
    #[must_use]
    pub const fn with_interval(mut self, steps: u64) -> Self {
        self.interval_steps = if steps == 0 { 1 } else { steps };
        self
    }

    /// Commands to issue before engine step `step`.
    #[must_use]
    pub fn commands(&self, game: &Game, step: u64) -> Vec<PlayerCommand> {
        if step % self.interval_steps != 0 || game.is_paused() || game.is_game_over() {
            return Vec::new();
        }

        let mut commands: Vec<PlayerCommand> = self
            .policy
            .plan(game.world(), OperatorId::PLAYER)
            .into_iter()
            .filter_map(|order| match order {
                BotOrder::Target { from, to } => Some(PlayerCommand::ToggleTarget { from, to }),
                BotOrder::Ability(_) => None,
            })
            .collect();

        if let Some(ability) = ready_ability(game) {
            commands.push(PlayerCommand::ActivateAbility { ability });
        }
        commands
    }
}

/// First unlocked ability that is off cooldown.
fn ready_ability(game: &Game) -> Option<AbilityType> {
    game.profile()
        .player()
        .unlocked_abilities()
        .into_iter()
        .find(|&ability| game.cooldown_remaining(ability) == 0)
}

//! Discrete events emitted by a tick.

use serde::{Deserialize, Serialize};

use crate::abilities::AbilityType;
use crate::difficulty::Difficulty;
use crate::ids::{OperatorId, PlanetId, ShipId};
use crate::planet::PlanetType;
use crate::time::Millis;

/// Something that happened during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// A session started.
    GameStarted {
        /// Selected difficulty.
        difficulty: Difficulty,
    },
    /// A planet changed hands.
    PlanetCaptured {
        /// The planet.
        planet: PlanetId,
        /// New owner.
        by: OperatorId,
        /// Old owner, `None` if it was neutral.
        previous: Option<OperatorId>,
        /// Planet type, for exclusion challenges.
        planet_type: PlanetType,
    },
    /// An ability was activated.
    AbilityUsed {
        /// Caster.
        operator: OperatorId,
        /// Ability.
        ability: AbilityType,
    },
    /// A ship was destroyed in flight.
    ShipDestroyed {
        /// The ship.
        ship: ShipId,
        /// Its owner.
        owner: OperatorId,
    },
    /// The player owns every non-neutral planet.
    GameWon {
        /// Game time since start, pauses excluded.
        elapsed_ms: Millis,
        /// Difficulty of the session.
        difficulty: Difficulty,
    },
    /// The player has no planets and no ships.
    GameLost {
        /// Game time since start.
        elapsed_ms: Millis,
    },
}

/// Events from one tick, in emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickEvents {
    /// The events.
    pub events: Vec<GameEvent>,
}

impl TickEvents {
    /// Record an event.
    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Captures made by `operator` this tick.
    #[must_use]
    pub fn captures_by(&self, operator: OperatorId) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, GameEvent::PlanetCaptured { by, .. } if *by == operator))
            .count()
    }

    /// Whether the session ended this tick.
    #[must_use]
    pub fn game_over(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, GameEvent::GameWon { .. } | GameEvent::GameLost { .. }))
    }
}

//! Operators: the human player and the bots.
//!
//! A planet's or ship's `owner` field is the single source of truth for
//! ownership. The lists kept here are a cache rebuilt by
//! [`World::sync_operator_caches`](crate::world::World::sync_operator_caches).

use serde::{Deserialize, Serialize};

use crate::ids::{OperatorId, PlanetId, ShipId};

/// Who is behind an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    /// The single human player.
    Player,
    /// An AI opponent.
    Bot,
}

/// An owner of planets and ships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    /// Identifier.
    pub id: OperatorId,
    /// Player or bot.
    pub kind: OperatorKind,
    /// Display name.
    pub name: String,
    /// Owned planets (cache).
    pub planets: Vec<PlanetId>,
    /// Owned ships in flight (cache).
    pub ships: Vec<ShipId>,
}

impl Operator {
    /// The human player.
    #[must_use]
    pub fn player() -> Self {
        Self {
            id: OperatorId::PLAYER,
            kind: OperatorKind::Player,
            name: "Player".to_string(),
            planets: Vec::new(),
            ships: Vec::new(),
        }
    }

    /// Bot number `index`, starting at 1.
    #[must_use]
    pub fn bot(index: u32) -> Self {
        Self {
            id: OperatorId(index),
            kind: OperatorKind::Bot,
            name: format!("BOT_{index}"),
            planets: Vec::new(),
            ships: Vec::new(),
        }
    }

    /// Whether this is the human player.
    #[must_use]
    pub const fn is_player(&self) -> bool {
        matches!(self.kind, OperatorKind::Player)
    }

    /// Whether this operator has been wiped out.
    #[must_use]
    pub fn is_eliminated(&self) -> bool {
        self.planets.is_empty() && self.ships.is_empty()
    }
}

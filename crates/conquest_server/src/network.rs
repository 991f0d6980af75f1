//! Wire events sent from the session to connected players.
//!
//! Everything is JSON: snapshots after every tick and every successful
//! action, join/leave notices, missile events, and failures addressed to the
//! player whose action failed.

use conquest_core::ballistics::{ImpactReport, Interception};
use conquest_core::combat::AttackOutcome;
use conquest_core::prelude::*;
use serde::{Deserialize, Serialize};

/// An event pushed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full world state.
    GameState(WorldSnapshot),
    /// A player entered the world.
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        /// The new player.
        player_id: PlayerId,
        /// Display name.
        name: String,
        /// Whether a bot drives it.
        is_bot: bool,
    },
    /// A player left the world.
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        /// The departed player.
        player_id: PlayerId,
    },
    /// A nuke left its silo.
    #[serde(rename_all = "camelCase")]
    MissileLaunched {
        /// The missile as launched.
        missile: Missile,
        /// Flight time until impact.
        travel_time_ms: u64,
    },
    /// A SAM site stopped a missile.
    MissileIntercepted(Interception),
    /// A missile detonated.
    NukeImpact(ImpactReport),
    /// An attack was resolved.
    AttackResolved(AttackOutcome),
    /// A player lost their last tile.
    #[serde(rename_all = "camelCase")]
    PlayerEliminated {
        /// Eliminated player.
        player_id: PlayerId,
    },
    /// One player remains.
    #[serde(rename_all = "camelCase")]
    GameWon {
        /// The winner.
        player_id: PlayerId,
    },
    /// The recipient's action was refused.
    ActionFailed {
        /// Human readable reason.
        reason: String,
    },
}

impl ServerEvent {
    /// Encode as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| GameError::Serialization(format!("Failed to encode event: {e}")))
    }
}

impl From<GameEvent> for ServerEvent {
    fn from(event: GameEvent) -> Self {
        match event {
            GameEvent::MissileLaunched {
                missile,
                travel_time_ms,
            } => Self::MissileLaunched {
                missile,
                travel_time_ms,
            },
            GameEvent::MissileIntercepted(hit) => Self::MissileIntercepted(hit),
            GameEvent::NukeImpact(report) => Self::NukeImpact(report),
            GameEvent::AttackResolved(outcome) => Self::AttackResolved(outcome),
            GameEvent::PlayerEliminated { player } => Self::PlayerEliminated { player_id: player },
            GameEvent::GameWon { player } => Self::GameWon { player_id: player },
        }
    }
}

/// Who an event is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every connected player.
    All,
    /// One player only.
    Player(PlayerId),
}

/// An event plus its audience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Audience.
    pub recipient: Recipient,
    /// Payload.
    pub event: ServerEvent,
}

impl Envelope {
    /// An event for everyone.
    #[must_use]
    pub const fn broadcast(event: ServerEvent) -> Self {
        Self {
            recipient: Recipient::All,
            event,
        }
    }

    /// An event for one player.
    #[must_use]
    pub const fn to(player: PlayerId, event: ServerEvent) -> Self {
        Self {
            recipient: Recipient::Player(player),
            event,
        }
    }

    /// Whether `player` should receive this event.
    #[must_use]
    pub fn is_for(&self, player: PlayerId) -> bool {
        match self.recipient {
            Recipient::All => true,
            Recipient::Player(p) => p == player,
        }
    }
}

/// Reply to a submitted action: success flag plus optional reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReply {
    /// Whether the action was applied.
    pub success: bool,
    /// Why it was not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ActionReply {
    /// A successful reply.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            reason: None,
        }
    }

    /// A failed reply with the public reason for `error`.
    #[must_use]
    pub fn failed(error: &ActionError) -> Self {
        Self {
            success: false,
            reason: Some(error.public_reason()),
        }
    }
}

impl<T> From<&std::result::Result<T, ActionError>> for ActionReply {
    fn from(result: &std::result::Result<T, ActionError>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(err) => Self::failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = ServerEvent::PlayerLeft {
            player_id: PlayerId(3),
        };
        assert_eq!(
            event.to_json().unwrap(),
            r#"{"type":"player_left","data":{"playerId":3}}"#
        );

        let failed = ServerEvent::ActionFailed {
            reason: "nope".to_string(),
        };
        assert_eq!(
            failed.to_json().unwrap(),
            r#"{"type":"action_failed","data":{"reason":"nope"}}"#
        );
    }

    #[test]
    fn test_game_events_map_across() {
        let event: ServerEvent = GameEvent::GameWon {
            player: PlayerId(2),
        }
        .into();
        assert_eq!(
            event,
            ServerEvent::GameWon {
                player_id: PlayerId(2)
            }
        );
    }

    #[test]
    fn test_envelope_audience() {
        let private = Envelope::to(
            PlayerId(1),
            ServerEvent::ActionFailed {
                reason: String::new(),
            },
        );
        assert!(private.is_for(PlayerId(1)));
        assert!(!private.is_for(PlayerId(2)));
        let public = Envelope::broadcast(ServerEvent::PlayerLeft {
            player_id: PlayerId(1),
        });
        assert!(public.is_for(PlayerId(2)));
    }

    #[test]
    fn test_reply_hides_internal_faults() {
        let internal: std::result::Result<(), ActionError> =
            Err(ActionError::Internal("index out of bounds".to_string()));
        let reply = ActionReply::from(&internal);
        assert!(!reply.success);
        assert_eq!(reply.reason.as_deref(), Some("Server error"));

        let ok: std::result::Result<(), ActionError> = Ok(());
        assert_eq!(
            serde_json::to_string(&ActionReply::from(&ok)).unwrap(),
            r#"{"success":true}"#
        );
    }
}

//! Addressed mailbox for inter-entity messages.
//!
//! Entities never call each other directly. They post a [`Message`] to a
//! recipient ID and the recipient drains its mailbox at the start of its own
//! update. A message sent to an entity that has already been updated this
//! tick is picked up on its next tick.
//!
//! Delivery order for a single recipient is FIFO by send time.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use crate::entity::EntityId;

/// Contents of a crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrateKind {
    /// Extra missiles
    Missile,
    /// Hit points
    Health,
    /// A temporary shield
    Shield,
}

impl fmt::Display for CrateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missile => "Missile",
            Self::Health => "Health",
            Self::Shield => "Shield",
        })
    }
}

/// Message type together with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MessageBody {
    /// Begin acting
    Start,
    /// Halt and go inactive
    Stop,
    /// Break off and evade
    Evade,
    /// Struck by a missile launched by `attacker`
    Hit {
        /// Boat that launched the missile
        attacker: EntityId,
    },
    /// Struck by a sea mine
    MineHit,
    /// A teammate under attack asks for support against `enemy`
    Help {
        /// Boat the teammate was attacked by
        enemy: EntityId,
    },
    /// Go and reload
    Reload,
    /// Picked up a crate
    CrateCollected {
        /// What the crate contained
        kind: CrateKind,
    },
    /// Move to a point and stop within `range`
    TargetPoint {
        /// Destination in world space
        point: Vec3,
        /// Arrival radius
        range: f32,
    },
    /// Destroy yourself
    Die,
    /// Sent by a shield to its owner when it expires
    ShieldDestroyed,
}

impl MessageBody {
    /// The tag for this body.
    #[must_use]
    pub const fn tag(&self) -> MessageTag {
        match self {
            Self::Start => MessageTag::Start,
            Self::Stop => MessageTag::Stop,
            Self::Evade => MessageTag::Evade,
            Self::Hit { .. } => MessageTag::Hit,
            Self::MineHit => MessageTag::MineHit,
            Self::Help { .. } => MessageTag::Help,
            Self::Reload => MessageTag::Reload,
            Self::CrateCollected { .. } => MessageTag::CrateCollected,
            Self::TargetPoint { .. } => MessageTag::TargetPoint,
            Self::Die => MessageTag::Die,
            Self::ShieldDestroyed => MessageTag::ShieldDestroyed,
        }
    }
}

/// Payload-free message type, for logging and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum MessageTag {
    Start,
    Stop,
    Evade,
    Hit,
    MineHit,
    Help,
    Reload,
    CrateCollected,
    TargetPoint,
    Die,
    ShieldDestroyed,
}

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A message waiting in a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sender
    pub from: EntityId,
    /// Type and payload
    pub body: MessageBody,
}

/// Per-recipient message queues.
///
/// Recipients are not validated; mail for an ID that never drains simply
/// waits until [`MessageBus::discard`] is called for it.
#[derive(Debug, Clone, Default)]
pub struct MessageBus {
    mailboxes: BTreeMap<EntityId, VecDeque<Message>>,
}

impl MessageBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Post `body` from `from` to `to`.
    pub fn deliver(&mut self, from: EntityId, to: EntityId, body: MessageBody) {
        self.mailboxes
            .entry(to)
            .or_default()
            .push_back(Message { from, body });
    }

    /// Pop the oldest pending message for `to`.
    pub fn receive_one(&mut self, to: EntityId) -> Option<Message> {
        let queue = self.mailboxes.get_mut(&to)?;
        let message = queue.pop_front();
        if queue.is_empty() {
            self.mailboxes.remove(&to);
        }
        message
    }

    /// Drop all pending mail for `to`, returning how many messages were dropped.
    pub fn discard(&mut self, to: EntityId) -> usize {
        self.mailboxes.remove(&to).map_or(0, |queue| queue.len())
    }

    /// Number of messages waiting for `to`.
    #[must_use]
    pub fn pending(&self, to: EntityId) -> usize {
        self.mailboxes.get(&to).map_or(0, VecDeque::len)
    }

    /// Number of messages waiting across all recipients.
    #[must_use]
    pub fn total_pending(&self) -> usize {
        self.mailboxes.values().map(VecDeque::len).sum()
    }

    /// Returns `true` if no mail is waiting anywhere.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mailboxes.is_empty()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.mailboxes.clear();
    }
}

//! Event bus for presentation and logging consumers.
//!
//! The simulation publishes [`GameEvent`]s as things happen; the host drains
//! them once per frame. Publishing never blocks: when the channel is full
//! the event is dropped.

use crossbeam_channel::{bounded, Receiver, Sender};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use runefall_common::EntityId;

use crate::ability::AbilityKind;
use crate::ground_patrol::PatrolState;
use crate::invincibility::InvincibilitySource;
use crate::projectile::{DestroyReason, ProjectileKind};

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Actor health changed
    HealthChanged {
        /// Actor ID
        actor: EntityId,
        /// New current health
        current: f32,
        /// Maximum health
        max: f32,
    },
    /// Actor health reached zero
    Died {
        /// Actor ID
        actor: EntityId,
    },
    /// Damage was applied to an actor
    ActorHit {
        /// Actor that was hit
        target: EntityId,
        /// Attacker or projectile owner
        source: EntityId,
        /// Damage dealt
        amount: f32,
    },
    /// Invincibility window started
    InvincibilityStarted {
        /// Actor ID
        actor: EntityId,
        /// What granted it
        source: InvincibilitySource,
    },
    /// Invincibility window ended
    InvincibilityEnded {
        /// Actor ID
        actor: EntityId,
    },
    /// Shield raised
    ShieldRaised {
        /// Actor ID
        actor: EntityId,
    },
    /// Shield absorbed a hit and broke
    ShieldBroken {
        /// Actor ID
        actor: EntityId,
    },
    /// Shield faded out
    ShieldExpired {
        /// Actor ID
        actor: EntityId,
    },
    /// Player learned an ability
    AbilityLearned {
        /// Ability
        ability: AbilityKind,
    },
    /// Player used an ability
    AbilityCast {
        /// Ability
        ability: AbilityKind,
    },
    /// Projectile created
    ProjectileSpawned {
        /// Projectile ID
        projectile: EntityId,
        /// Projectile kind
        kind: ProjectileKind,
        /// Owning actor
        owner: EntityId,
        /// Spawn position
        position: Vec2,
    },
    /// Projectile removed
    ProjectileDestroyed {
        /// Projectile ID
        projectile: EntityId,
        /// Why it was removed
        reason: DestroyReason,
    },
    /// Ground patrol enemy changed state
    PatrolStateChanged {
        /// Actor ID
        actor: EntityId,
        /// Previous state
        from: PatrolState,
        /// New state
        to: PatrolState,
    },
    /// Homing enemy started charging
    ChargeStarted {
        /// Actor ID
        actor: EntityId,
    },
    /// Homing enemy finished charging and is homing
    ChargeReleased {
        /// Actor ID
        actor: EntityId,
    },
    /// Boss attack cycle (re)started
    BossCycleStarted {
        /// Actor ID
        actor: EntityId,
    },
    /// Visual cue at a teleport endpoint
    TeleportCue {
        /// Actor ID
        actor: EntityId,
        /// Cue position
        position: Vec2,
    },
    /// Boss vanished and relocated
    BossHidden {
        /// Actor ID
        actor: EntityId,
        /// New position
        position: Vec2,
    },
    /// Boss reappeared
    BossRevealed {
        /// Actor ID
        actor: EntityId,
        /// Position
        position: Vec2,
    },
    /// Boss contact-damage immunity ended
    GraceEnded {
        /// Actor ID
        actor: EntityId,
    },
    /// Boss began casting
    CastStarted {
        /// Actor ID
        actor: EntityId,
    },
    /// Player pushed off an enemy it landed on
    PlayerLanded {
        /// Player ID
        player: EntityId,
        /// Enemy landed on
        enemy: EntityId,
    },
    /// Actor removed from the encounter
    ActorDespawned {
        /// Actor ID
        actor: EntityId,
    },
}

impl GameEvent {
    /// Short name of the event variant, for log lines.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::HealthChanged { .. } => "health_changed",
            Self::Died { .. } => "died",
            Self::ActorHit { .. } => "actor_hit",
            Self::InvincibilityStarted { .. } => "invincibility_started",
            Self::InvincibilityEnded { .. } => "invincibility_ended",
            Self::ShieldRaised { .. } => "shield_raised",
            Self::ShieldBroken { .. } => "shield_broken",
            Self::ShieldExpired { .. } => "shield_expired",
            Self::AbilityLearned { .. } => "ability_learned",
            Self::AbilityCast { .. } => "ability_cast",
            Self::ProjectileSpawned { .. } => "projectile_spawned",
            Self::ProjectileDestroyed { .. } => "projectile_destroyed",
            Self::PatrolStateChanged { .. } => "patrol_state_changed",
            Self::ChargeStarted { .. } => "charge_started",
            Self::ChargeReleased { .. } => "charge_released",
            Self::BossCycleStarted { .. } => "boss_cycle_started",
            Self::TeleportCue { .. } => "teleport_cue",
            Self::BossHidden { .. } => "boss_hidden",
            Self::BossRevealed { .. } => "boss_revealed",
            Self::GraceEnded { .. } => "grace_ended",
            Self::CastStarted { .. } => "cast_started",
            Self::PlayerLanded { .. } => "player_landed",
            Self::ActorDespawned { .. } => "actor_despawned",
        }
    }
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<GameEvent>,
    /// Receiver for collecting events
    receiver: Receiver<GameEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            capacity: capacity.max(1),
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: GameEvent) {
        // Non-blocking send - if full, event is dropped
        if self.sender.try_send(event).is_err() {
            tracing::trace!("event bus full, dropping event");
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

//! Player connection registry and broadcast fan-out
//!
//! This module tracks every registered connection together with its
//! display name and outbound tunnel. All mutation happens under the
//! session lock held by the caller; the broadcaster therefore iterates a
//! set that cannot change underneath it, and reports failed deliveries
//! for the caller to unregister once iteration is done.

use std::{collections::HashMap, fmt::Display};

use thiserror::Error;
use uuid::Uuid;

use crate::{session::Tunnel, wire::ServerEvent};

/// A unique identifier for one player connection
///
/// Ids are minted by the runtime when a connection completes its join
/// handshake and stay stable until the connection is unregistered.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random connection id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    /// Creates a new random connection id (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    /// Formats the id as a UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered player: display name plus outbound tunnel
#[derive(Debug)]
pub struct Player<T> {
    name: String,
    tunnel: T,
}

impl<T> Player<T> {
    /// Returns the player's display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Splits the player into its display name and tunnel
    pub fn into_parts(self) -> (String, T) {
        (self.name, self.tunnel)
    }
}

/// Errors that can occur when registering a connection
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The session has reached the maximum number of players
    #[error("maximum number of players reached")]
    MaximumPlayers,
    /// The connection is already registered
    #[error("connection already registered")]
    AlreadyRegistered,
}

/// Tracks every registered connection in one session
#[derive(Debug, Default)]
pub struct Registry<T> {
    mapping: HashMap<Id, Player<T>>,
}

impl<T: Tunnel> Registry<T> {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self {
            mapping: HashMap::new(),
        }
    }

    /// Registers a connection under the given display name
    ///
    /// Registering the same connection twice is a precondition violation;
    /// the first registration wins. A rejected tunnel is closed before the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MaximumPlayers`] when the session is full and
    /// [`Error::AlreadyRegistered`] on a duplicate id.
    pub fn register(&mut self, id: Id, name: String, tunnel: T) -> Result<(), Error> {
        if self.mapping.len() >= crate::constants::session::MAX_PLAYER_COUNT {
            tunnel.close();
            return Err(Error::MaximumPlayers);
        }
        if self.mapping.contains_key(&id) {
            tunnel.close();
            return Err(Error::AlreadyRegistered);
        }
        self.mapping.insert(id, Player { name, tunnel });
        Ok(())
    }

    /// Removes a connection, returning its player record if it was
    /// registered
    pub fn unregister(&mut self, id: Id) -> Option<Player<T>> {
        self.mapping.remove(&id)
    }

    /// Returns the display name registered for a connection
    pub fn name(&self, id: Id) -> Option<&str> {
        self.mapping.get(&id).map(Player::name)
    }

    /// Checks whether a connection is registered
    pub fn contains(&self, id: Id) -> bool {
        self.mapping.contains_key(&id)
    }

    /// Iterates over the display names of all registered players
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.mapping.values().map(Player::name)
    }

    /// Returns the number of registered players
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Checks whether no players are registered
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Delivers an event to every registered connection
    ///
    /// The event is encoded once; each delivery failure is collected and
    /// returned so the caller can unregister those connections after the
    /// fan-out. The registry itself is not mutated here, which keeps the
    /// iteration safe.
    pub fn broadcast(&self, event: &ServerEvent) -> Vec<Id> {
        let line = event.to_line();
        let mut failed = Vec::new();
        for (id, player) in &self.mapping {
            if player.tunnel.send(&line).is_err() {
                log::warn!("delivery to {id} ({}) failed", player.name());
                failed.push(*id);
            }
        }
        failed
    }
}

//! Connection boundary between the session core and its transport
//!
//! This module defines the trait for delivering protocol lines from the
//! game engine to a connected player. The tunnel abstraction keeps the
//! core independent of the actual transport; the runtime module provides
//! the production implementation backed by a socket writer task.

use thiserror::Error;

/// Error returned when a tunnel's peer is no longer reachable
///
/// The broadcaster treats this as a disconnection: the affected player is
/// unregistered and the broadcast continues for everyone else.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("connection closed")]
pub struct Closed;

/// Trait for delivering encoded protocol lines to one player
///
/// Lines are encoded once per broadcast by the registry; implementations
/// only move bytes. Sending must not block the caller, since the session
/// lock is held while messages are handed off.
pub trait Tunnel {
    /// Delivers one already-encoded protocol line (without the trailing
    /// newline)
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] if the peer can no longer receive.
    fn send(&self, line: &str) -> Result<(), Closed>;

    /// Closes the tunnel, releasing the underlying connection
    fn close(self);
}

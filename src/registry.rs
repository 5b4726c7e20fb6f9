// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Client identity tracking and the per-client time-bounded grants that
//! hang off it: blanking-pause holds and one-shot activity callbacks.
//!
//! The transport collaborator delivers disconnect notifications; the
//! engine routes them here (and to the other trackers) synchronously,
//! before any later request naming the same client is admitted, so a
//! cleaned-up client cannot be resurrected by an in-flight request.

use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Instant;

/// Identity of a connected caller, derived from its bus connection name.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialOrd, PartialEq)]
pub struct ClientId {
    name: String,
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name.fmt(f)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        ClientId { name: s.into() }
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        ClientId { name: s }
    }
}

/// Set of currently connected clients known to hold at least one grant.
#[derive(Default)]
pub struct ClientRegistry {
    clients: BTreeSet<ClientId>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client. Idempotent: registering an already-known client
    /// is a no-op and yields the same handle.
    pub fn register(&mut self, client: &ClientId) -> ClientId {
        if self.clients.insert(client.clone()) {
            debug!("registered client {client}");
        }
        client.clone()
    }

    pub fn contains(&self, client: &ClientId) -> bool {
        self.clients.contains(client)
    }

    /// Removes a client. Returns true only on the first removal, which is
    /// what makes the disconnect cascade fire exactly once per loss.
    pub fn remove(&mut self, client: &ClientId) -> bool {
        let removed = self.clients.remove(client);
        if removed {
            debug!("removed client {client}");
        }
        removed
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.clients.len()
    }
}

/// Per-client display blanking-pause holds, aggregated into a single
/// "pause active" state. Holds expire on the keepalive renewal model so a
/// client that stops renewing cannot pin the display on forever.
pub struct BlankingPauseHolds {
    deadlines: BTreeMap<ClientId, Instant>,
}

impl BlankingPauseHolds {
    pub fn new() -> Self {
        Self { deadlines: BTreeMap::new() }
    }

    /// Creates or renews the caller's hold, resetting its deadline.
    pub fn start(&mut self, client: &ClientId, deadline: Instant) {
        self.deadlines.insert(client.clone(), deadline);
    }

    /// Cancels the caller's hold. Idempotent.
    pub fn cancel(&mut self, client: &ClientId) -> bool {
        self.deadlines.remove(client).is_some()
    }

    /// Drops holds whose deadline has passed. Returns how many were dropped.
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        let before = self.deadlines.len();
        self.deadlines.retain(|client, deadline| {
            let live = *deadline > now;
            if !live {
                debug!("blanking pause hold of {client} expired");
            }
            live
        });
        before - self.deadlines.len()
    }

    pub fn release_client(&mut self, client: &ClientId) -> bool {
        self.deadlines.remove(client).is_some()
    }

    pub fn any_active(&self) -> bool {
        !self.deadlines.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }
}

/// One-shot activity notification callback: a method to invoke on the
/// registering client's behalf at the next user activity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityCallback {
    pub service: String,
    pub path: String,
    pub interface: String,
    pub method: String,
}

/// Pending activity callbacks, bounded system-wide. A callback is removed
/// when it fires, when its owner removes it, or when its owner disconnects;
/// there is no dangling Fired state to clean up later.
pub struct ActivityCallbacks {
    pending: Vec<(ClientId, ActivityCallback)>,
    limit: usize,
}

impl ActivityCallbacks {
    pub fn new(limit: usize) -> Self {
        Self { pending: Vec::new(), limit }
    }

    /// Registers a callback for `client`. Fails when the system-wide bound
    /// is reached. Re-registering replaces the client's previous callback
    /// rather than queueing a second one.
    pub fn add(&mut self, client: &ClientId, callback: ActivityCallback) -> bool {
        if let Some(slot) =
            self.pending.iter_mut().find(|(owner, _)| owner == client)
        {
            slot.1 = callback;
            return true;
        }
        if self.pending.len() >= self.limit {
            return false;
        }
        self.pending.push((client.clone(), callback));
        true
    }

    /// Removes any callback belonging to `client`. Idempotent.
    pub fn remove(&mut self, client: &ClientId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(owner, _)| owner != client);
        before != self.pending.len()
    }

    /// Takes all pending callbacks for delivery. One-shot: the entries are
    /// gone once taken.
    pub fn fire_all(&mut self) -> Vec<(ClientId, ActivityCallback)> {
        std::mem::take(&mut self.pending)
    }

    pub fn release_client(&mut self, client: &ClientId) -> bool {
        self.remove(client)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

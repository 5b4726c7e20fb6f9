// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! CPU keepalive lease tracking.
//!
//! A client doing non-interactive background processing obtains the
//! keepalive period, starts a lease, renews it within the period, and
//! stops it when done. Late suspend stays blocked while any lease is
//! unexpired. Leases are keyed by (client, context); the context string
//! lets one process hold multiple overlapping leases, and defaults to ""
//! for legacy single-lease clients. A missed renewal deadline is treated
//! as a stop on the next evaluation.
//!
//! The privileged wakeup call transfers a short-lived wake assertion from
//! the system suspend coordinator into the same aggregate gate without
//! creating a context-tied lease.

use crate::registry::ClientId;
use log::{debug, info};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub struct KeepaliveTracker {
    period: Duration,
    wakeup_period: Duration,
    leases: BTreeMap<(ClientId, String), Instant>,
    wakeup_deadline: Option<Instant>,
}

impl KeepaliveTracker {
    pub fn new(period: Duration, wakeup_period: Duration) -> Self {
        Self { period, wakeup_period, leases: BTreeMap::new(), wakeup_deadline: None }
    }

    /// The maximum renewal interval handed out to clients.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Adjusts the renewal period. Affects leases started or renewed from
    /// now on; existing deadlines stand.
    pub fn set_period(&mut self, period: Duration) {
        self.period = period;
    }

    pub fn set_wakeup_period(&mut self, period: Duration) {
        self.wakeup_period = period;
    }

    /// Creates or renews the (client, context) lease, resetting its
    /// deadline to `now` + period. Renewing never duplicates a lease.
    pub fn start(&mut self, client: &ClientId, context: &str, now: Instant) {
        let deadline = now + self.period;
        let key = (client.clone(), context.to_string());
        if self.leases.insert(key, deadline).is_none() {
            info!("cpu keepalive started: client={client} context='{context}'");
        } else {
            debug!("cpu keepalive renewed: client={client} context='{context}'");
        }
    }

    /// Removes the (client, context) lease. Stopping an absent lease is a
    /// no-op, not an error.
    pub fn stop(&mut self, client: &ClientId, context: &str) -> bool {
        let removed =
            self.leases.remove(&(client.clone(), context.to_string())).is_some();
        if removed {
            info!("cpu keepalive stopped: client={client} context='{context}'");
        }
        removed
    }

    /// Records the short-lived wake assertion from the suspend
    /// coordinator. Not tied to any client context.
    pub fn wakeup(&mut self, now: Instant) {
        self.wakeup_deadline = Some(now + self.wakeup_period);
        debug!("wakeup assertion held for {:?}", self.wakeup_period);
    }

    /// Drops every lease owned by `client`. Returns how many were dropped.
    pub fn release_client(&mut self, client: &ClientId) -> usize {
        let before = self.leases.len();
        self.leases.retain(|(owner, _), _| owner != client);
        let dropped = before - self.leases.len();
        if dropped > 0 {
            info!("dropped {dropped} keepalive lease(s) of lost client {client}");
        }
        dropped
    }

    /// Treats leases with passed deadlines as stopped. Returns how many
    /// were evicted.
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        let before = self.leases.len();
        self.leases.retain(|(client, context), deadline| {
            let live = *deadline > now;
            if !live {
                info!("cpu keepalive expired: client={client} context='{context}'");
            }
            live
        });
        if self.wakeup_deadline.is_some_and(|deadline| deadline <= now) {
            self.wakeup_deadline = None;
        }
        before - self.leases.len()
    }

    /// True iff at least one lease or the wakeup assertion is unexpired.
    /// This is the single gate the suspend-policy collaborator consults
    /// before entering late suspend.
    pub fn any_active(&self, now: Instant) -> bool {
        self.wakeup_deadline.is_some_and(|deadline| deadline > now)
            || self.leases.values().any(|deadline| *deadline > now)
    }

    /// The earliest deadline still pending, for arming a single timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.leases.values().copied().chain(self.wakeup_deadline).min()
    }
}

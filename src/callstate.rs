// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Call state arbitration.
//!
//! Changes can only be made to or from the "none" state; all other
//! transitions are vetoed to avoid races between services. The requester
//! of a transition away from none becomes the owner, and only the owner
//! may move the state again. The (active, emergency) tuple is the
//! exception and is always accepted. If the owner disconnects while the
//! state is not none, the state reverts to (none, normal) so a crashed
//! caller cannot leave the device busy forever.

use crate::modes::{CallState, CallType};
use crate::registry::ClientId;
use log::{info, warn};

/// Outcome of a call-state change request. A veto is a boolean-false
/// reply, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallStateDecision {
    Accepted { changed: bool },
    Vetoed,
}

impl CallStateDecision {
    pub fn accepted(&self) -> bool {
        matches!(self, CallStateDecision::Accepted { .. })
    }
}

pub struct CallStateGuard {
    state: CallState,
    call_type: CallType,
    owner: Option<ClientId>,
}

impl CallStateGuard {
    pub fn new() -> Self {
        Self { state: CallState::None, call_type: CallType::Normal, owner: None }
    }

    pub fn current(&self) -> (CallState, CallType) {
        (self.state, self.call_type)
    }

    #[cfg(test)]
    pub fn owner(&self) -> Option<&ClientId> {
        self.owner.as_ref()
    }

    /// Applies the transition rule for a request from `client`.
    pub fn request(
        &mut self,
        client: &ClientId,
        state: CallState,
        call_type: CallType,
    ) -> CallStateDecision {
        let emergency = state == CallState::Active && call_type == CallType::Emergency;
        let allowed = emergency
            || self.state == CallState::None
            || self.owner.as_ref() == Some(client);
        if !allowed {
            warn!(
                "call state change to ({state}, {call_type}) by {client} vetoed; \
                 current owner is {:?}",
                self.owner
            );
            return CallStateDecision::Vetoed;
        }

        let changed = (self.state, self.call_type) != (state, call_type);
        self.state = state;
        self.call_type = call_type;
        self.owner = if state == CallState::None { None } else { Some(client.clone()) };
        if changed {
            info!("call state changed to ({state}, {call_type}) by {client}");
        }
        CallStateDecision::Accepted { changed }
    }

    /// Reverts to (none, normal) if the lost client owns the current
    /// state. Returns true when a revert happened and a change signal is
    /// due.
    pub fn client_lost(&mut self, client: &ClientId) -> bool {
        if self.owner.as_ref() != Some(client) {
            return false;
        }
        info!(
            "call state owner {client} lost; reverting from ({}, {}) to (none, normal)",
            self.state, self.call_type
        );
        self.state = CallState::None;
        self.call_type = CallType::Normal;
        self.owner = None;
        true
    }
}

impl Default for CallStateGuard {
    fn default() -> Self {
        Self::new()
    }
}

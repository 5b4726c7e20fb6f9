// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Capability checks for credentialed operations.
//!
//! Checks run before any arbitration logic so the guards can be exercised
//! without a credential subsystem. The transport collaborator supplies the
//! actual credential source; the service only asks whether a given client
//! holds a named capability.

use crate::registry::ClientId;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Capabilities guarding the credentialed request surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Radio state changes and powerkey event triggering.
    DeviceModeControl,
    /// Call state changes.
    CallStateControl,
    /// Touchscreen/keypad lock mode changes.
    TkLockControl,
    /// Color profile changes.
    ColorProfileControl,
    /// LED pattern activation and the dev/test enable switch.
    LedControl,
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Capability::DeviceModeControl => "mce::DeviceModeControl",
            Capability::CallStateControl => "mce::CallStateControl",
            Capability::TkLockControl => "mce::TKLockControl",
            Capability::ColorProfileControl => "mce::ColorProfileControl",
            Capability::LedControl => "mce::LEDControl",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source of capability grants for connected clients.
pub trait CredentialChecker {
    fn holds(&self, client: &ClientId, capability: Capability) -> bool;
}

/// Grants every capability to every client. Used when the platform does
/// not enforce credentials.
pub struct AllowAll;

impl CredentialChecker for AllowAll {
    fn holds(&self, _client: &ClientId, _capability: Capability) -> bool {
        true
    }
}

/// Fixed per-client grant table.
#[derive(Default)]
pub struct StaticGrants {
    grants: HashMap<ClientId, HashSet<Capability>>,
}

impl StaticGrants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, client: ClientId, capability: Capability) {
        self.grants.entry(client).or_default().insert(capability);
    }
}

impl CredentialChecker for StaticGrants {
    fn holds(&self, client: &ClientId, capability: Capability) -> bool {
        self.grants.get(client).is_some_and(|caps| caps.contains(&capability))
    }
}

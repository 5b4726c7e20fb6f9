// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Mode Control Entity arbitration core.
//!
//! This crate owns the canonical device mode state (display, lock, radio,
//! call, CABC, color profile, PSM, LED patterns) behind the MCE bus
//! protocol, arbitrates conflicting client requests, tracks time-bounded
//! client holds, and emits ordered change notifications. The bus
//! transport, hardware control, and credential sources are external
//! collaborators reached through the [`service::Command`] channel, the
//! [`engine::StateChange`] stream, and the
//! [`credentials::CredentialChecker`] trait.

pub mod callstate;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod keepalive;
pub mod led;
pub mod modes;
pub mod names;
pub mod registry;
pub mod service;

pub use engine::{Engine, StateChange};
pub use error::RequestError;
pub use service::{Command, ModeControlService, Reply, Request};

// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Request dispatch and the serve loop.
//!
//! The transport collaborator translates bus method calls into
//! [`Command`] values and feeds them through a channel; the loop owns the
//! [`Engine`], so every mutation happens on one task. Deadline-driven
//! work (lease expiry, blanking-pause expiry, linger decay) re-enters the
//! same loop through a single armed timer. State-change events flow out
//! on the signal channel for the notification emitter to broadcast.

use crate::config::ConfigValue;
use crate::credentials::{Capability, CredentialChecker};
use crate::engine::{Engine, StateChange};
use crate::error::RequestError;
use crate::modes::{CabcMode, CallState, CallType, DisplayState, LockMode, PowerKeyEvent};
use crate::names;
use crate::registry::{ActivityCallback, ClientId};
use log::{debug, error, warn};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

/// A method call from the request interface, already unmarshalled by the
/// transport. String-typed mode arguments are validated here so the
/// transport stays dumb.
#[derive(Clone, Debug)]
pub enum Request {
    GetRadioStates,
    RadioStatesChange { states: u32, mask: u32 },
    GetCallState,
    CallStateChange { state: String, call_type: String },
    GetTklockMode,
    TklockModeChange { mode: String },
    GetDisplayStatus,
    DisplayStateOn,
    DisplayStateDim,
    DisplayStateOff,
    DisplayStateLpm,
    DisplayBlankingPause,
    DisplayCancelBlankingPause,
    GetDisplayBlankingPause,
    GetDisplayBlankingInhibit,
    GetCabcMode,
    CabcModeChange { mode: String },
    GetPsmState,
    GetKeyBacklightState,
    AddActivityCallback { callback: ActivityCallback },
    RemoveActivityCallback,
    GetInactivityStatus,
    GetColorProfile,
    GetColorProfileIds,
    ColorProfileChange { id: String },
    GetVersion,
    TriggerPowerkeyEvent { kind: u32 },
    /// The wire call carries a context string, but the period is a global
    /// tunable and does not vary per context.
    CpuKeepalivePeriod { context: String },
    CpuKeepaliveStart { context: String, want_reply: bool },
    CpuKeepaliveStop { context: String, want_reply: bool },
    CpuKeepaliveWakeup { want_reply: bool },
    GetConfig { key: String },
    SetConfig { key: String, value: ConfigValue },
    ResetConfig { keyish: String },
    LedPatternActivate { pattern: String },
    LedPatternDeactivate { pattern: String },
    LedEnable,
    LedDisable,
}

impl Request {
    /// The wire method name this request arrived under.
    pub fn method_name(&self) -> &'static str {
        match self {
            Request::GetRadioStates => names::RADIO_STATES_GET,
            Request::RadioStatesChange { .. } => names::RADIO_STATES_CHANGE_REQ,
            Request::GetCallState => names::CALL_STATE_GET,
            Request::CallStateChange { .. } => names::CALL_STATE_CHANGE_REQ,
            Request::GetTklockMode => names::TKLOCK_MODE_GET,
            Request::TklockModeChange { .. } => names::TKLOCK_MODE_CHANGE_REQ,
            Request::GetDisplayStatus => names::DISPLAY_STATUS_GET,
            Request::DisplayStateOn => names::DISPLAY_ON_REQ,
            Request::DisplayStateDim => names::DISPLAY_DIM_REQ,
            Request::DisplayStateOff => names::DISPLAY_OFF_REQ,
            Request::DisplayStateLpm => names::DISPLAY_LPM_REQ,
            Request::DisplayBlankingPause => names::PREVENT_BLANK_REQ,
            Request::DisplayCancelBlankingPause => names::CANCEL_PREVENT_BLANK_REQ,
            Request::GetDisplayBlankingPause => names::PREVENT_BLANK_GET,
            Request::GetDisplayBlankingInhibit => names::BLANKING_INHIBIT_GET,
            Request::GetCabcMode => names::CABC_MODE_GET,
            Request::CabcModeChange { .. } => names::CABC_MODE_REQ,
            Request::GetPsmState => names::PSM_STATE_GET,
            Request::GetKeyBacklightState => names::KEY_BACKLIGHT_STATE_GET,
            Request::AddActivityCallback { .. } => names::ADD_ACTIVITY_CALLBACK_REQ,
            Request::RemoveActivityCallback => names::REMOVE_ACTIVITY_CALLBACK_REQ,
            Request::GetInactivityStatus => names::INACTIVITY_STATUS_GET,
            Request::GetColorProfile => names::COLOR_PROFILE_GET,
            Request::GetColorProfileIds => names::COLOR_PROFILE_IDS_GET,
            Request::ColorProfileChange { .. } => names::COLOR_PROFILE_CHANGE_REQ,
            Request::GetVersion => names::VERSION_GET,
            Request::TriggerPowerkeyEvent { .. } => names::TRIGGER_POWERKEY_EVENT_REQ,
            Request::CpuKeepalivePeriod { .. } => names::CPU_KEEPALIVE_PERIOD_REQ,
            Request::CpuKeepaliveStart { .. } => names::CPU_KEEPALIVE_START_REQ,
            Request::CpuKeepaliveStop { .. } => names::CPU_KEEPALIVE_STOP_REQ,
            Request::CpuKeepaliveWakeup { .. } => names::CPU_KEEPALIVE_WAKEUP_REQ,
            Request::GetConfig { .. } => names::CONFIG_GET,
            Request::SetConfig { .. } => names::CONFIG_SET,
            Request::ResetConfig { .. } => names::CONFIG_RESET,
            Request::LedPatternActivate { .. } => names::ACTIVATE_LED_PATTERN,
            Request::LedPatternDeactivate { .. } => names::DEACTIVATE_LED_PATTERN,
            Request::LedEnable => names::ENABLE_LED,
            Request::LedDisable => names::DISABLE_LED,
        }
    }

    /// The capability guarding this request, if it is credentialed.
    fn required_capability(&self) -> Option<Capability> {
        match self {
            Request::RadioStatesChange { .. } | Request::TriggerPowerkeyEvent { .. } => {
                Some(Capability::DeviceModeControl)
            }
            Request::CallStateChange { .. } => Some(Capability::CallStateControl),
            Request::TklockModeChange { .. } => Some(Capability::TkLockControl),
            Request::ColorProfileChange { .. } => Some(Capability::ColorProfileControl),
            Request::LedPatternActivate { .. }
            | Request::LedPatternDeactivate { .. }
            | Request::LedEnable
            | Request::LedDisable => Some(Capability::LedControl),
            _ => None,
        }
    }
}

/// Typed reply payloads mirroring the protocol's wire types.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    None,
    Bool(bool),
    Int32(i32),
    UInt32(u32),
    String(String),
    StringPair(String, String),
    StringList(Vec<String>),
    Value(ConfigValue),
}

/// Inputs to the serve loop. Requests come from the transport; the other
/// variants are collaborator boundary notifications.
pub enum Command {
    Request {
        client: ClientId,
        request: Request,
        reply: oneshot::Sender<Result<Reply, RequestError>>,
    },
    /// The transport observed the client's connection drop.
    ClientLost(ClientId),
    /// The activity collaborator reports an inactivity edge.
    InactivityChanged(bool),
    /// The power-policy collaborator reports a PSM edge.
    PsmChanged(bool),
    /// The backlight collaborator reports the key backlight state.
    KeyBacklightChanged(bool),
}

pub struct ModeControlService {
    engine: Engine,
    checker: Box<dyn CredentialChecker>,
    /// Sole caller allowed to issue the privileged wakeup transfer.
    suspend_coordinator: Option<ClientId>,
    signals: mpsc::UnboundedSender<StateChange>,
}

impl ModeControlService {
    pub fn new(
        engine: Engine,
        checker: Box<dyn CredentialChecker>,
    ) -> (Self, mpsc::UnboundedReceiver<StateChange>) {
        let (signals, signal_rx) = mpsc::unbounded_channel();
        (Self { engine, checker, suspend_coordinator: None, signals }, signal_rx)
    }

    /// Names the trusted suspend coordinator permitted to call
    /// req_cpu_keepalive_wakeup.
    pub fn set_suspend_coordinator(&mut self, client: ClientId) {
        self.suspend_coordinator = Some(client);
    }

    /// Serves commands until the transport closes its end. One timer is
    /// armed against the engine's earliest deadline; expiry work re-enters
    /// the loop here rather than running on another task.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            let deadline = self.engine.next_deadline();
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    self.handle_command(command, now());
                }
                _ = sleep_until_std(deadline), if deadline.is_some() => {
                    self.engine.advance(now());
                }
            }
            self.flush_events();
        }
        debug!("command channel closed; serve loop exiting");
    }

    fn handle_command(&mut self, command: Command, now: Instant) {
        match command {
            Command::Request { client, request, reply } => {
                let method = request.method_name();
                let result = self.dispatch(&client, request, now);
                if let Err(err) = &result {
                    warn!("{method} from {client} failed: {err}");
                }
                // The caller may have gone away; nothing to do then.
                let _ = reply.send(result);
            }
            Command::ClientLost(client) => self.engine.client_lost(&client, now),
            Command::InactivityChanged(inactive) => self.engine.set_inactivity(inactive),
            Command::PsmChanged(active) => self.engine.set_psm(active),
            Command::KeyBacklightChanged(on) => self.engine.set_key_backlight(on),
        }
    }

    /// Routes one request: capability pre-check, then the arbitration
    /// logic. Vetoes and optional-reply suppression are not errors.
    pub fn dispatch(
        &mut self,
        client: &ClientId,
        request: Request,
        now: Instant,
    ) -> Result<Reply, RequestError> {
        if let Some(capability) = request.required_capability() {
            if !self.checker.holds(client, capability) {
                return Err(RequestError::AccessDenied(capability.name()));
            }
        }

        match request {
            Request::GetRadioStates => Ok(Reply::UInt32(self.engine.state().radios.bits())),
            Request::RadioStatesChange { states, mask } => {
                self.engine.apply_radio_states(states, mask)?;
                Ok(Reply::None)
            }
            Request::GetCallState => {
                let (state, call_type) = self.engine.call_state();
                Ok(Reply::StringPair(state.to_string(), call_type.to_string()))
            }
            Request::CallStateChange { state, call_type } => {
                let state: CallState = state.parse()?;
                let call_type: CallType = call_type.parse()?;
                let accepted = self.engine.call_state_request(client, state, call_type, now);
                Ok(Reply::Bool(accepted))
            }
            Request::GetTklockMode => Ok(Reply::String(self.engine.state().lock.to_string())),
            Request::TklockModeChange { mode } => {
                let mode: LockMode = mode.parse()?;
                self.engine.set_lock_mode(mode);
                Ok(Reply::None)
            }
            Request::GetDisplayStatus => {
                Ok(Reply::String(self.engine.state().display.to_string()))
            }
            Request::DisplayStateOn => {
                self.engine.set_display(DisplayState::On, None);
                Ok(Reply::None)
            }
            Request::DisplayStateDim => {
                self.engine.set_display(DisplayState::Dimmed, None);
                Ok(Reply::None)
            }
            Request::DisplayStateOff => {
                self.engine.set_display(DisplayState::Off, None);
                Ok(Reply::None)
            }
            Request::DisplayStateLpm => {
                self.engine.set_display(DisplayState::LowPower, None);
                Ok(Reply::None)
            }
            Request::DisplayBlankingPause => {
                self.engine.blanking_pause_start(client, now);
                Ok(Reply::None)
            }
            Request::DisplayCancelBlankingPause => {
                self.engine.blanking_pause_cancel(client);
                Ok(Reply::None)
            }
            Request::GetDisplayBlankingPause => {
                Ok(Reply::String(pause_state_string(self.engine.blanking_pause_active())))
            }
            Request::GetDisplayBlankingInhibit => {
                Ok(Reply::String(inhibit_state_string(self.engine.blanking_inhibited())))
            }
            Request::GetCabcMode => Ok(Reply::String(self.engine.state().cabc.to_string())),
            Request::CabcModeChange { mode } => {
                let mode: CabcMode = mode.parse()?;
                let applied = self.engine.set_cabc_mode(mode);
                Ok(Reply::String(applied.to_string()))
            }
            Request::GetPsmState => Ok(Reply::Bool(self.engine.state().psm_active)),
            Request::GetKeyBacklightState => {
                Ok(Reply::Bool(self.engine.state().key_backlight))
            }
            Request::AddActivityCallback { callback } => {
                match self.engine.add_activity_callback(client, callback) {
                    Ok(()) => Ok(Reply::Bool(true)),
                    // The protocol reports the bound as a false reply.
                    Err(RequestError::ResourceExhausted(_)) => Ok(Reply::Bool(false)),
                    Err(err) => Err(err),
                }
            }
            Request::RemoveActivityCallback => {
                Ok(Reply::Bool(self.engine.remove_activity_callback(client)))
            }
            Request::GetInactivityStatus => Ok(Reply::Bool(self.engine.state().inactive)),
            Request::GetColorProfile => {
                Ok(Reply::String(self.engine.state().color_profile.clone()))
            }
            Request::GetColorProfileIds => {
                Ok(Reply::StringList(self.engine.color_profile_ids().to_vec()))
            }
            Request::ColorProfileChange { id } => {
                self.engine.set_color_profile(&id)?;
                Ok(Reply::String(id))
            }
            Request::GetVersion => Ok(Reply::String(env!("CARGO_PKG_VERSION").to_string())),
            Request::TriggerPowerkeyEvent { kind } => {
                let event = PowerKeyEvent::try_from(kind)?;
                self.engine.trigger_powerkey(event);
                Ok(Reply::None)
            }
            Request::CpuKeepalivePeriod { context: _ } => {
                Ok(Reply::Int32(self.engine.keepalive_period().as_secs() as i32))
            }
            Request::CpuKeepaliveStart { context, want_reply } => {
                self.engine.keepalive_start(client, &context, now);
                Ok(optional_ack(want_reply))
            }
            Request::CpuKeepaliveStop { context, want_reply } => {
                self.engine.keepalive_stop(client, &context, now);
                Ok(optional_ack(want_reply))
            }
            Request::CpuKeepaliveWakeup { want_reply } => {
                if self.suspend_coordinator.as_ref() != Some(client) {
                    return Err(RequestError::AccessDenied("suspend coordinator only"));
                }
                self.engine.keepalive_wakeup(now);
                Ok(optional_ack(want_reply))
            }
            Request::GetConfig { key } => Ok(Reply::Value(self.engine.config_get(&key)?)),
            Request::SetConfig { key, value } => {
                self.engine.config_set(&key, value)?;
                Ok(Reply::Bool(true))
            }
            Request::ResetConfig { keyish } => {
                Ok(Reply::Int32(self.engine.config_reset(&keyish)))
            }
            Request::LedPatternActivate { pattern } => {
                self.engine.led_activate(&pattern);
                Ok(Reply::None)
            }
            Request::LedPatternDeactivate { pattern } => {
                self.engine.led_deactivate(&pattern);
                Ok(Reply::None)
            }
            Request::LedEnable => {
                self.engine.led_set_enabled(true);
                Ok(Reply::None)
            }
            Request::LedDisable => {
                self.engine.led_set_enabled(false);
                Ok(Reply::None)
            }
        }
    }

    fn flush_events(&mut self) {
        for event in self.engine.take_events() {
            if self.signals.send(event).is_err() {
                error!("notification emitter gone; dropping state-change events");
                return;
            }
        }
    }

}

fn optional_ack(want_reply: bool) -> Reply {
    if want_reply {
        Reply::Bool(true)
    } else {
        Reply::None
    }
}

fn pause_state_string(active: bool) -> String {
    if active { names::PREVENT_BLANK_ACTIVE_STRING } else { names::PREVENT_BLANK_INACTIVE_STRING }
        .to_string()
}

fn inhibit_state_string(active: bool) -> String {
    if active { names::INHIBIT_BLANK_ACTIVE_STRING } else { names::INHIBIT_BLANK_INACTIVE_STRING }
        .to_string()
}

fn now() -> Instant {
    // tokio's clock so that paused-time tests drive expiry deterministically.
    tokio::time::Instant::now().into_std()
}

async fn sleep_until_std(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await
        }
        None => std::future::pending().await,
    }
}

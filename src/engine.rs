// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The mode state machine and its surrounding arbitration engine.
//!
//! [`Engine`] is the single owner of [`DeviceModeState`] and of every
//! per-client tracker. All mutations flow through it on one task, so the
//! read-validate-write sequences of the guards never interleave. Each
//! accepted change appends a [`StateChange`] to an outbound queue that the
//! notification emitter drains and broadcasts.

use crate::callstate::{CallStateDecision, CallStateGuard};
use crate::config::{ConfigStore, ConfigValue};
use crate::error::RequestError;
use crate::keepalive::KeepaliveTracker;
use crate::led::LedPatternStack;
use crate::modes::{
    BlankingPolicy, CabcMode, CallState, CallType, DisplayState, LockMode, PowerKeyEvent,
    RadioStates,
};
use crate::names;
use crate::registry::{ActivityCallback, ActivityCallbacks, BlankingPauseHolds, ClientId, ClientRegistry};
use log::{info, warn};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// An observable consequence of an accepted state transition. Entries
/// with a wire signal name are broadcast; the rest are directed
/// deliveries or collaborator notifications.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    TklockMode(LockMode),
    DisplayStatus(DisplayState),
    BlankingPause(bool),
    BlankingInhibit(bool),
    PsmState(bool),
    SystemInactivity(bool),
    ColorProfile(String),
    RadioStates(RadioStates),
    CallState(CallState, CallType),
    ConfigChange(String, ConfigValue),
    LedPatternActivated(String),
    LedPatternDeactivated(String),
    /// Edge of the aggregate keepalive gate consumed by the suspend-policy
    /// collaborator. Not a broadcast signal.
    SuspendBlocked(bool),
    /// A one-shot activity callback to deliver as a method call.
    ActivityCallbackFired { client: ClientId, callback: ActivityCallback },
    /// Long powerkey press forwarded to the shutdown collaborator.
    ShutdownRequest,
}

impl StateChange {
    /// The broadcast signal name, for events that are wire signals.
    pub fn signal_name(&self) -> Option<&'static str> {
        match self {
            StateChange::TklockMode(_) => Some(names::TKLOCK_MODE_SIG),
            StateChange::DisplayStatus(_) => Some(names::DISPLAY_SIG),
            StateChange::BlankingPause(_) => Some(names::PREVENT_BLANK_SIG),
            StateChange::BlankingInhibit(_) => Some(names::BLANKING_INHIBIT_SIG),
            StateChange::PsmState(_) => Some(names::PSM_STATE_SIG),
            StateChange::SystemInactivity(_) => Some(names::INACTIVITY_SIG),
            StateChange::ColorProfile(_) => Some(names::COLOR_PROFILE_SIG),
            StateChange::RadioStates(_) => Some(names::RADIO_STATES_SIG),
            StateChange::CallState(_, _) => Some(names::CALL_STATE_SIG),
            StateChange::ConfigChange(_, _) => Some(names::CONFIG_CHANGE_SIG),
            StateChange::LedPatternActivated(_) => Some(names::LED_PATTERN_ACTIVATED_SIG),
            StateChange::LedPatternDeactivated(_) => Some(names::LED_PATTERN_DEACTIVATED_SIG),
            StateChange::SuspendBlocked(_)
            | StateChange::ActivityCallbackFired { .. }
            | StateChange::ShutdownRequest => None,
        }
    }
}

/// Canonical device mode state. One instance per process, owned by the
/// engine and mutated nowhere else.
#[derive(Clone, Debug)]
pub struct DeviceModeState {
    pub display: DisplayState,
    pub lock: LockMode,
    pub radios: RadioStates,
    pub cabc: CabcMode,
    pub color_profile: String,
    pub psm_active: bool,
    pub key_backlight: bool,
    pub inactive: bool,
    pub blanking_policy: BlankingPolicy,
}

impl DeviceModeState {
    fn new(color_profile: String) -> Self {
        Self {
            display: DisplayState::On,
            lock: LockMode::Unlocked,
            radios: RadioStates::MASTER
                | RadioStates::CELLULAR
                | RadioStates::WLAN
                | RadioStates::BLUETOOTH,
            cabc: CabcMode::Ui,
            color_profile,
            psm_active: false,
            key_backlight: false,
            inactive: false,
            blanking_policy: BlankingPolicy::Default,
        }
    }
}

pub struct Engine {
    state: DeviceModeState,
    available_profiles: Vec<String>,
    registry: ClientRegistry,
    keepalive: KeepaliveTracker,
    callstate: CallStateGuard,
    led: LedPatternStack,
    config: ConfigStore,
    blanking_pause: BlankingPauseHolds,
    callbacks: ActivityCallbacks,
    blanking_pause_period: Duration,
    linger_period: Duration,
    linger_until: Option<Instant>,
    // Last reported values of the derived booleans, for edge detection.
    reported_pause: bool,
    reported_inhibit: bool,
    reported_suspend_block: bool,
    events: VecDeque<StateChange>,
}

fn config_secs(config: &ConfigStore, key: &str, fallback: u64) -> Duration {
    match config.get(key) {
        Ok(ConfigValue::Int(secs)) if secs >= 0 => Duration::from_secs(secs as u64),
        _ => Duration::from_secs(fallback),
    }
}

fn config_bool(config: &ConfigStore, key: &str, fallback: bool) -> bool {
    match config.get(key) {
        Ok(ConfigValue::Bool(value)) => value,
        _ => fallback,
    }
}

impl Engine {
    pub fn new(config: ConfigStore, available_profiles: Vec<String>) -> Self {
        let keepalive_period = config_secs(&config, "/system/cpu-keepalive/period", 60);
        let wakeup_period = config_secs(&config, "/system/cpu-keepalive/wakeup-period", 5);
        let blanking_pause_period =
            config_secs(&config, "/display/blanking-pause/period", 60);
        let linger_period = config_secs(&config, "/display/blanking-policy/linger", 5);
        let callback_limit = match config.get("/system/activity-callback/limit") {
            Ok(ConfigValue::Int(limit)) if limit > 0 => limit as usize,
            _ => 16,
        };
        let led_enabled = config_bool(&config, "/led/enabled", true);

        let available_profiles = if available_profiles.is_empty() {
            vec!["default".to_string()]
        } else {
            available_profiles
        };
        let current_profile = available_profiles[0].clone();

        Self {
            state: DeviceModeState::new(current_profile),
            available_profiles,
            registry: ClientRegistry::new(),
            keepalive: KeepaliveTracker::new(keepalive_period, wakeup_period),
            callstate: CallStateGuard::new(),
            led: LedPatternStack::new(led_enabled),
            config,
            blanking_pause: BlankingPauseHolds::new(),
            callbacks: ActivityCallbacks::new(callback_limit),
            blanking_pause_period,
            linger_period,
            linger_until: None,
            reported_pause: false,
            reported_inhibit: false,
            reported_suspend_block: false,
            events: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &DeviceModeState {
        &self.state
    }

    /// Drains the outbound state-change queue, in emission order.
    pub fn take_events(&mut self) -> Vec<StateChange> {
        self.events.drain(..).collect()
    }

    fn emit(&mut self, event: StateChange) {
        self.events.push_back(event);
    }

    // Display.

    /// Applies a display state change with an optional blanking-policy
    /// reason tag. A change is signaled only when the wire-visible state
    /// string changes; off and low-power report identically.
    pub fn set_display(&mut self, target: DisplayState, reason: Option<BlankingPolicy>) {
        let visible_change = self.state.display.as_wire_str() != target.as_wire_str();
        if self.state.display != target {
            info!("display: {} -> {}", self.state.display, target);
        }
        self.state.display = target;
        if visible_change {
            self.emit(StateChange::DisplayStatus(target));
        }
        if let Some(reason) = reason {
            self.set_blanking_policy(reason);
        }
    }

    fn set_blanking_policy(&mut self, reason: BlankingPolicy) {
        if self.state.blanking_policy != reason {
            info!("blanking policy: {} -> {}", self.state.blanking_policy, reason);
            self.state.blanking_policy = reason;
        }
        if reason != BlankingPolicy::Linger {
            self.linger_until = None;
        }
        self.refresh_derived();
    }

    pub fn blanking_pause_active(&self) -> bool {
        self.blanking_pause.any_active()
    }

    pub fn blanking_inhibited(&self) -> bool {
        self.blanking_pause.any_active()
            || self.state.blanking_policy != BlankingPolicy::Default
    }

    /// Starts or renews the caller's blanking-pause hold.
    pub fn blanking_pause_start(&mut self, client: &ClientId, now: Instant) {
        self.registry.register(client);
        self.blanking_pause.start(client, now + self.blanking_pause_period);
        self.refresh_derived();
    }

    /// Cancels the caller's blanking-pause hold. Idempotent.
    pub fn blanking_pause_cancel(&mut self, client: &ClientId) {
        self.blanking_pause.cancel(client);
        self.refresh_derived();
    }

    // Lock.

    pub fn set_lock_mode(&mut self, mode: LockMode) {
        if self.state.lock != mode {
            info!("tklock: {} -> {}", self.state.lock, mode);
            self.state.lock = mode;
            self.emit(StateChange::TklockMode(mode));
        }
    }

    // Radios.

    /// Mask-limited radio state apply: only bits selected by `mask` are
    /// altered. Unknown bits in either word are rejected.
    pub fn apply_radio_states(&mut self, new: u32, mask: u32) -> Result<RadioStates, RequestError> {
        let new = RadioStates::from_bits(new)
            .ok_or_else(|| RequestError::InvalidArgument(format!("radio states {new:#x}")))?;
        let mask = RadioStates::from_bits(mask)
            .ok_or_else(|| RequestError::InvalidArgument(format!("radio mask {mask:#x}")))?;
        let applied = self.state.radios.apply_masked(new, mask);
        if applied != self.state.radios {
            info!("radio states: {:?} -> {applied:?}", self.state.radios);
            self.state.radios = applied;
            self.emit(StateChange::RadioStates(applied));
        }
        Ok(applied)
    }

    // CABC. The protocol has no CABC signal; the updated mode is only
    // echoed back to the requester.

    pub fn set_cabc_mode(&mut self, mode: CabcMode) -> CabcMode {
        if self.state.cabc != mode {
            info!("cabc: {} -> {}", self.state.cabc, mode);
            self.state.cabc = mode;
        }
        self.state.cabc
    }

    // Color profile.

    pub fn color_profile_ids(&self) -> &[String] {
        &self.available_profiles
    }

    pub fn set_color_profile(&mut self, id: &str) -> Result<(), RequestError> {
        if !self.available_profiles.iter().any(|known| known == id) {
            return Err(RequestError::InvalidArgument(format!("color profile '{id}'")));
        }
        if self.state.color_profile != id {
            info!("color profile: {} -> {id}", self.state.color_profile);
            self.state.color_profile = id.to_string();
            self.emit(StateChange::ColorProfile(id.to_string()));
        }
        Ok(())
    }

    // PSM and key backlight, set by the power-policy collaborator.

    pub fn set_psm(&mut self, active: bool) {
        if self.state.psm_active != active {
            info!("psm: {active}");
            self.state.psm_active = active;
            self.emit(StateChange::PsmState(active));
        }
    }

    pub fn set_key_backlight(&mut self, on: bool) {
        self.state.key_backlight = on;
    }

    // Inactivity, set by the activity collaborator.

    /// Updates the system inactivity state. Flipping to active fires all
    /// pending one-shot activity callbacks exactly once.
    pub fn set_inactivity(&mut self, inactive: bool) {
        if self.state.inactive != inactive {
            self.state.inactive = inactive;
            self.emit(StateChange::SystemInactivity(inactive));
        }
        if !inactive {
            for (client, callback) in self.callbacks.fire_all() {
                self.emit(StateChange::ActivityCallbackFired { client, callback });
            }
        }
    }

    /// Registers a one-shot activity callback for `client`.
    pub fn add_activity_callback(
        &mut self,
        client: &ClientId,
        callback: ActivityCallback,
    ) -> Result<(), RequestError> {
        self.registry.register(client);
        if !self.callbacks.add(client, callback) {
            warn!("activity callback registration from {client} refused: bound reached");
            return Err(RequestError::ResourceExhausted("activity callback bound reached"));
        }
        Ok(())
    }

    /// Removes any activity callback belonging to `client`. Idempotent.
    pub fn remove_activity_callback(&mut self, client: &ClientId) -> bool {
        self.callbacks.remove(client)
    }

    // CPU keepalive.

    pub fn keepalive_period(&self) -> Duration {
        self.keepalive.period()
    }

    pub fn keepalive_start(&mut self, client: &ClientId, context: &str, now: Instant) {
        self.registry.register(client);
        self.keepalive.start(client, context, now);
        self.refresh_suspend_gate(now);
    }

    pub fn keepalive_stop(&mut self, client: &ClientId, context: &str, now: Instant) {
        self.keepalive.stop(client, context);
        self.refresh_suspend_gate(now);
    }

    pub fn keepalive_wakeup(&mut self, now: Instant) {
        self.keepalive.wakeup(now);
        self.refresh_suspend_gate(now);
    }

    pub fn suspend_blocked(&self, now: Instant) -> bool {
        self.keepalive.any_active(now)
    }

    // Call state.

    pub fn call_state(&self) -> (CallState, CallType) {
        self.callstate.current()
    }

    /// Runs a call-state change request through the guard. Returns true
    /// when accepted. An accepted change updates the blanking policy:
    /// entering a call pins the `call` reason, leaving it starts the
    /// linger grace period.
    pub fn call_state_request(
        &mut self,
        client: &ClientId,
        state: CallState,
        call_type: CallType,
        now: Instant,
    ) -> bool {
        match self.callstate.request(client, state, call_type) {
            CallStateDecision::Vetoed => false,
            CallStateDecision::Accepted { changed } => {
                if state != CallState::None {
                    self.registry.register(client);
                }
                if changed {
                    self.emit(StateChange::CallState(state, call_type));
                    self.apply_call_policy(state, now);
                }
                true
            }
        }
    }

    fn apply_call_policy(&mut self, state: CallState, now: Instant) {
        match state {
            CallState::Ringing | CallState::Active => {
                self.set_blanking_policy(BlankingPolicy::Call);
            }
            CallState::None if self.state.blanking_policy == BlankingPolicy::Call => {
                self.linger_until = Some(now + self.linger_period);
                self.set_blanking_policy(BlankingPolicy::Linger);
            }
            _ => {}
        }
    }

    // LED.

    pub fn led_activate(&mut self, pattern: &str) {
        if self.led.activate(pattern) {
            self.emit(StateChange::LedPatternActivated(pattern.to_string()));
        }
    }

    pub fn led_deactivate(&mut self, pattern: &str) {
        if self.led.deactivate(pattern) {
            self.emit(StateChange::LedPatternDeactivated(pattern.to_string()));
        }
    }

    pub fn led_set_enabled(&mut self, enabled: bool) {
        self.led.set_enabled(enabled);
    }

    pub fn led_visible_patterns(&self) -> Vec<&str> {
        self.led.visible()
    }

    // Config.

    pub fn config_get(&self, key: &str) -> Result<ConfigValue, RequestError> {
        self.config.get(key)
    }

    pub fn config_set(&mut self, key: &str, value: ConfigValue) -> Result<(), RequestError> {
        let result = self.config.set(key, value.clone());
        // The in-memory value applies even when persistence failed, so the
        // change signal and tunable reactions happen before reporting.
        let changed = match &result {
            Ok(changed) => *changed,
            Err(RequestError::PersistenceFailure(_)) => true,
            Err(_) => false,
        };
        if changed {
            self.emit(StateChange::ConfigChange(key.to_string(), value));
            self.react_to_config(key);
        }
        result.map(|_| ())
    }

    pub fn config_reset(&mut self, keyish: &str) -> i32 {
        let Some(changed) = self.config.reset(keyish) else { return -1 };
        let count = changed.len() as i32;
        for (key, value) in changed {
            self.emit(StateChange::ConfigChange(key.clone(), value));
            self.react_to_config(&key);
        }
        count
    }

    /// Re-derives cached tunables after a config key changed.
    fn react_to_config(&mut self, key: &str) {
        match key {
            "/system/cpu-keepalive/period" => {
                let period = config_secs(&self.config, key, 60);
                self.keepalive.set_period(period);
            }
            "/system/cpu-keepalive/wakeup-period" => {
                let period = config_secs(&self.config, key, 5);
                self.keepalive.set_wakeup_period(period);
            }
            "/display/blanking-pause/period" => {
                self.blanking_pause_period = config_secs(&self.config, key, 60);
            }
            "/display/blanking-policy/linger" => {
                self.linger_period = config_secs(&self.config, key, 5);
            }
            "/led/enabled" => {
                let enabled = config_bool(&self.config, key, true);
                self.led.set_enabled(enabled);
            }
            _ => {}
        }
    }

    // Powerkey.

    /// Maps a triggered powerkey event onto the default policy: short
    /// press toggles the display, long press requests shutdown, double
    /// press is a no-op unless the config toggle enables it.
    pub fn trigger_powerkey(&mut self, event: PowerKeyEvent) {
        match event {
            PowerKeyEvent::ShortPress => self.toggle_display(),
            PowerKeyEvent::LongPress => {
                info!("long powerkey press; forwarding shutdown request");
                self.emit(StateChange::ShutdownRequest);
            }
            PowerKeyEvent::DoublePress => {
                if config_bool(&self.config, "/powerkey/double-press-toggle", false) {
                    self.toggle_display();
                }
            }
        }
    }

    fn toggle_display(&mut self) {
        let target = match self.state.display {
            DisplayState::On | DisplayState::Dimmed => DisplayState::Off,
            DisplayState::Off | DisplayState::LowPower => DisplayState::On,
        };
        self.set_display(target, None);
    }

    // Client lifecycle.

    /// Handles a disconnect notification from the transport. The cascade
    /// runs synchronously and exactly once per client, so no later request
    /// naming this client can observe stale grants.
    pub fn client_lost(&mut self, client: &ClientId, now: Instant) {
        if !self.registry.remove(client) {
            return;
        }
        self.keepalive.release_client(client);
        self.blanking_pause.release_client(client);
        self.callbacks.release_client(client);
        if self.callstate.client_lost(client) {
            self.emit(StateChange::CallState(CallState::None, CallType::Normal));
            self.apply_call_policy(CallState::None, now);
        }
        self.refresh_suspend_gate(now);
        self.refresh_derived();
    }

    // Deadlines.

    /// Collects expired leases and holds, and decays the linger policy.
    /// Called by the service loop when a deadline fires.
    pub fn advance(&mut self, now: Instant) {
        self.keepalive.evict_expired(now);
        self.blanking_pause.evict_expired(now);
        if self.linger_until.is_some_and(|until| until <= now) {
            self.linger_until = None;
            self.set_blanking_policy(BlankingPolicy::Default);
        }
        self.refresh_suspend_gate(now);
        self.refresh_derived();
    }

    /// Earliest pending deadline across all time-bounded state, for the
    /// service loop to arm a single timer against.
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.keepalive.next_deadline(), self.blanking_pause.next_deadline(), self.linger_until]
            .into_iter()
            .flatten()
            .min()
    }

    // Derived boolean edges.

    fn refresh_suspend_gate(&mut self, now: Instant) {
        let blocked = self.keepalive.any_active(now);
        if blocked != self.reported_suspend_block {
            self.reported_suspend_block = blocked;
            info!("suspend gate: blocked={blocked}");
            self.emit(StateChange::SuspendBlocked(blocked));
        }
    }

    fn refresh_derived(&mut self) {
        let pause = self.blanking_pause.any_active();
        if pause != self.reported_pause {
            self.reported_pause = pause;
            self.emit(StateChange::BlankingPause(pause));
        }
        let inhibit = self.blanking_inhibited();
        if inhibit != self.reported_inhibit {
            self.reported_inhibit = inhibit;
            self.emit(StateChange::BlankingInhibit(inhibit));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builtin_defaults;
    use assert_matches::assert_matches;

    fn engine() -> Engine {
        Engine::new(
            ConfigStore::new(builtin_defaults(), None),
            vec!["color-default".to_string(), "color-vivid".to_string()],
        )
    }

    fn signals(engine: &mut Engine) -> Vec<StateChange> {
        engine.take_events()
    }

    #[test]
    fn display_change_signals_only_on_visible_edges() {
        let mut engine = engine();
        engine.set_display(DisplayState::Off, None);
        assert_eq!(signals(&mut engine), vec![StateChange::DisplayStatus(DisplayState::Off)]);

        // Off -> low power is not wire-visible.
        engine.set_display(DisplayState::LowPower, None);
        assert!(signals(&mut engine).is_empty());

        engine.set_display(DisplayState::On, None);
        assert_eq!(signals(&mut engine), vec![StateChange::DisplayStatus(DisplayState::On)]);
    }

    #[test]
    fn repeated_sets_do_not_resignal() {
        let mut engine = engine();
        engine.set_lock_mode(LockMode::Locked);
        engine.set_lock_mode(LockMode::Locked);
        assert_eq!(signals(&mut engine), vec![StateChange::TklockMode(LockMode::Locked)]);

        engine.set_psm(true);
        engine.set_psm(true);
        assert_eq!(signals(&mut engine), vec![StateChange::PsmState(true)]);
    }

    #[test]
    fn radio_apply_is_mask_limited() {
        let mut engine = engine();
        // Start from a known baseline.
        engine
            .apply_radio_states(
                (RadioStates::WLAN | RadioStates::BLUETOOTH).bits(),
                RadioStates::all().bits(),
            )
            .unwrap();
        signals(&mut engine);

        let applied = engine
            .apply_radio_states(
                RadioStates::CELLULAR.bits(),
                (RadioStates::CELLULAR | RadioStates::WLAN).bits(),
            )
            .unwrap();
        assert_eq!(applied, RadioStates::CELLULAR | RadioStates::BLUETOOTH);
        assert_eq!(signals(&mut engine), vec![StateChange::RadioStates(applied)]);
    }

    #[test]
    fn unknown_radio_bits_are_rejected() {
        let mut engine = engine();
        assert_matches!(
            engine.apply_radio_states(1 << 10, 1 << 10),
            Err(RequestError::InvalidArgument(_))
        );
        // State unchanged, nothing signaled.
        assert!(signals(&mut engine).is_empty());
    }

    #[test]
    fn color_profile_is_validated_against_the_catalog() {
        let mut engine = engine();
        engine.set_color_profile("color-vivid").unwrap();
        assert_eq!(
            signals(&mut engine),
            vec![StateChange::ColorProfile("color-vivid".to_string())]
        );

        assert_matches!(
            engine.set_color_profile("sepia"),
            Err(RequestError::InvalidArgument(_))
        );
        assert_eq!(engine.state().color_profile, "color-vivid");
    }

    #[test]
    fn call_owner_loss_reverts_with_exactly_one_call_signal() {
        let now = Instant::now();
        let mut engine = engine();
        assert!(engine.call_state_request(
            &":1.7".into(),
            CallState::Active,
            CallType::Normal,
            now
        ));
        signals(&mut engine);

        engine.client_lost(&":1.7".into(), now);
        let call_signals: Vec<_> = signals(&mut engine)
            .into_iter()
            .filter(|event| matches!(event, StateChange::CallState(_, _)))
            .collect();
        assert_eq!(
            call_signals,
            vec![StateChange::CallState(CallState::None, CallType::Normal)]
        );
        assert_eq!(engine.call_state(), (CallState::None, CallType::Normal));
    }

    #[test]
    fn call_lifecycle_drives_blanking_policy_through_linger() {
        let now = Instant::now();
        let mut engine = engine();
        engine.call_state_request(&":1.7".into(), CallState::Ringing, CallType::Normal, now);
        assert_eq!(engine.state().blanking_policy, BlankingPolicy::Call);
        assert!(engine.blanking_inhibited());

        engine.call_state_request(&":1.7".into(), CallState::None, CallType::Normal, now);
        assert_eq!(engine.state().blanking_policy, BlankingPolicy::Linger);
        assert!(engine.blanking_inhibited());

        // Linger decays back to default after the configured grace.
        let grace = now + Duration::from_secs(5);
        engine.advance(grace);
        assert_eq!(engine.state().blanking_policy, BlankingPolicy::Default);
        assert!(!engine.blanking_inhibited());
    }

    #[test]
    fn blanking_pause_edges_signal_pause_and_inhibit() {
        let now = Instant::now();
        let mut engine = engine();
        engine.blanking_pause_start(&":1.3".into(), now);
        assert_eq!(
            signals(&mut engine),
            vec![StateChange::BlankingPause(true), StateChange::BlankingInhibit(true)]
        );

        // A second holder changes nothing.
        engine.blanking_pause_start(&":1.4".into(), now);
        assert!(signals(&mut engine).is_empty());

        engine.blanking_pause_cancel(&":1.3".into());
        assert!(signals(&mut engine).is_empty());
        engine.blanking_pause_cancel(&":1.4".into());
        assert_eq!(
            signals(&mut engine),
            vec![StateChange::BlankingPause(false), StateChange::BlankingInhibit(false)]
        );
    }

    #[test]
    fn blanking_pause_hold_expires_without_renewal() {
        let now = Instant::now();
        let mut engine = engine();
        engine.blanking_pause_start(&":1.3".into(), now);
        signals(&mut engine);

        engine.advance(now + Duration::from_secs(60));
        assert_eq!(
            signals(&mut engine),
            vec![StateChange::BlankingPause(false), StateChange::BlankingInhibit(false)]
        );
    }

    #[test]
    fn keepalive_gate_edges_are_reported_once() {
        let now = Instant::now();
        let mut engine = engine();
        engine.keepalive_start(&":1.5".into(), "", now);
        engine.keepalive_start(&":1.5".into(), "extra", now);
        assert_eq!(signals(&mut engine), vec![StateChange::SuspendBlocked(true)]);

        engine.keepalive_stop(&":1.5".into(), "", now);
        assert!(signals(&mut engine).is_empty());
        engine.keepalive_stop(&":1.5".into(), "extra", now);
        assert_eq!(signals(&mut engine), vec![StateChange::SuspendBlocked(false)]);
    }

    #[test]
    fn keepalive_expiry_unblocks_suspend() {
        let now = Instant::now();
        let mut engine = engine();
        engine.keepalive_start(&":1.5".into(), "sync", now);
        signals(&mut engine);

        let deadline = engine.next_deadline().unwrap();
        engine.advance(deadline);
        assert_eq!(signals(&mut engine), vec![StateChange::SuspendBlocked(false)]);
    }

    #[test]
    fn client_loss_cascades_over_every_grant() {
        let now = Instant::now();
        let mut engine = engine();
        let client: ClientId = ":1.9".into();
        engine.keepalive_start(&client, "", now);
        engine.blanking_pause_start(&client, now);
        engine
            .add_activity_callback(
                &client,
                ActivityCallback {
                    service: "com.example".into(),
                    path: "/com/example".into(),
                    interface: "com.example".into(),
                    method: "Activity".into(),
                },
            )
            .unwrap();
        engine.call_state_request(&client, CallState::Active, CallType::Normal, now);
        signals(&mut engine);

        engine.client_lost(&client, now);
        let events = signals(&mut engine);
        assert!(events.contains(&StateChange::CallState(CallState::None, CallType::Normal)));
        assert!(events.contains(&StateChange::SuspendBlocked(false)));
        assert!(events.contains(&StateChange::BlankingPause(false)));
        assert!(!engine.suspend_blocked(now));

        // Firing activity afterwards delivers nothing for the lost client.
        engine.set_inactivity(false);
        assert!(signals(&mut engine)
            .iter()
            .all(|event| !matches!(event, StateChange::ActivityCallbackFired { .. })));
    }

    #[test]
    fn activity_flip_fires_callbacks_once() {
        let mut engine = engine();
        engine
            .add_activity_callback(
                &":1.2".into(),
                ActivityCallback {
                    service: "com.example".into(),
                    path: "/com/example".into(),
                    interface: "com.example".into(),
                    method: "Activity".into(),
                },
            )
            .unwrap();
        engine.set_inactivity(true);
        signals(&mut engine);

        engine.set_inactivity(false);
        let events = signals(&mut engine);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StateChange::SystemInactivity(false));
        assert_matches!(
            &events[1],
            StateChange::ActivityCallbackFired { client, .. } if *client == ":1.2".into()
        );

        // One-shot: a second activity edge fires nothing.
        engine.set_inactivity(true);
        engine.set_inactivity(false);
        assert!(signals(&mut engine)
            .iter()
            .all(|event| !matches!(event, StateChange::ActivityCallbackFired { .. })));
    }

    #[test]
    fn led_events_follow_count_edges() {
        let mut engine = engine();
        engine.led_activate("PatternCommunication");
        engine.led_activate("PatternCommunication");
        engine.led_deactivate("PatternCommunication");
        assert_eq!(
            signals(&mut engine),
            vec![StateChange::LedPatternActivated("PatternCommunication".to_string())]
        );

        engine.led_deactivate("PatternCommunication");
        assert_eq!(
            signals(&mut engine),
            vec![StateChange::LedPatternDeactivated("PatternCommunication".to_string())]
        );
    }

    #[test]
    fn config_set_signals_and_retunes() {
        let now = Instant::now();
        let mut engine = engine();
        engine
            .config_set("/system/cpu-keepalive/period", ConfigValue::Int(120))
            .unwrap();
        assert_eq!(
            signals(&mut engine),
            vec![StateChange::ConfigChange(
                "/system/cpu-keepalive/period".to_string(),
                ConfigValue::Int(120)
            )]
        );
        assert_eq!(engine.keepalive_period(), Duration::from_secs(120));

        engine.keepalive_start(&":1.1".into(), "", now);
        assert_eq!(
            engine.next_deadline(),
            Some(now + Duration::from_secs(120))
        );
    }

    #[test]
    fn config_reset_counts_only_modified_matches() {
        let mut engine = engine();
        engine.config_set("/display/timeout", ConfigValue::Int(5)).unwrap();
        signals(&mut engine);

        assert_eq!(engine.config_reset("/display/"), 1);
        assert_eq!(
            signals(&mut engine),
            vec![StateChange::ConfigChange(
                "/display/timeout".to_string(),
                ConfigValue::Int(10)
            )]
        );
        assert_eq!(engine.config_reset("/display/"), 0);
    }

    #[test]
    fn led_enable_toggle_tracks_config() {
        let mut engine = engine();
        engine.led_activate("PatternBatteryCharging");
        assert_eq!(engine.led_visible_patterns(), vec!["PatternBatteryCharging"]);

        engine.config_set("/led/enabled", ConfigValue::Bool(false)).unwrap();
        assert!(engine.led_visible_patterns().is_empty());

        engine.config_set("/led/enabled", ConfigValue::Bool(true)).unwrap();
        assert_eq!(engine.led_visible_patterns(), vec!["PatternBatteryCharging"]);
    }

    #[test]
    fn powerkey_short_press_toggles_display() {
        let mut engine = engine();
        engine.trigger_powerkey(PowerKeyEvent::ShortPress);
        assert_eq!(engine.state().display, DisplayState::Off);
        engine.trigger_powerkey(PowerKeyEvent::ShortPress);
        assert_eq!(engine.state().display, DisplayState::On);
    }

    #[test]
    fn powerkey_long_press_requests_shutdown() {
        let mut engine = engine();
        engine.trigger_powerkey(PowerKeyEvent::LongPress);
        assert_eq!(signals(&mut engine), vec![StateChange::ShutdownRequest]);
    }

    #[test]
    fn powerkey_double_press_honors_the_toggle() {
        let mut engine = engine();
        engine.trigger_powerkey(PowerKeyEvent::DoublePress);
        assert_eq!(engine.state().display, DisplayState::On);

        engine
            .config_set("/powerkey/double-press-toggle", ConfigValue::Bool(true))
            .unwrap();
        engine.trigger_powerkey(PowerKeyEvent::DoublePress);
        assert_eq!(engine.state().display, DisplayState::Off);
    }
}

// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Wire vocabulary of the Mode Control Entity.
//!
//! Every constant in this module is part of the stable wire contract:
//! changing any string here is a breaking protocol change. The transport
//! collaborator maps bus method calls onto [`crate::service::Request`]
//! values keyed by these method names and broadcasts
//! [`crate::engine::StateChange`] events under the signal names.

/// Bus name the daemon claims.
pub const MCE_SERVICE: &str = "com.nokia.mce";

/// Interface carrying method calls.
pub const MCE_REQUEST_IF: &str = "com.nokia.mce.request";
/// Interface carrying broadcast signals.
pub const MCE_SIGNAL_IF: &str = "com.nokia.mce.signal";
/// Object path for method calls.
pub const MCE_REQUEST_PATH: &str = "/com/nokia/mce/request";
/// Object path for broadcast signals.
pub const MCE_SIGNAL_PATH: &str = "/com/nokia/mce/signal";

// Query methods.
pub const RADIO_STATES_GET: &str = "get_radio_states";
pub const CALL_STATE_GET: &str = "get_call_state";
pub const TKLOCK_MODE_GET: &str = "get_tklock_mode";
pub const DISPLAY_STATUS_GET: &str = "get_display_status";
pub const CABC_MODE_GET: &str = "get_cabc_mode";
pub const PSM_STATE_GET: &str = "get_psm_state";
pub const KEY_BACKLIGHT_STATE_GET: &str = "get_key_backlight_state";
pub const INACTIVITY_STATUS_GET: &str = "get_inactivity_status";
pub const COLOR_PROFILE_GET: &str = "get_color_profile";
pub const COLOR_PROFILE_IDS_GET: &str = "get_color_profile_ids";
pub const VERSION_GET: &str = "get_version";
pub const PREVENT_BLANK_GET: &str = "get_display_blanking_pause";
pub const BLANKING_INHIBIT_GET: &str = "get_display_blanking_inhibit";
pub const CONFIG_GET: &str = "get_config";

// Command methods.
pub const RADIO_STATES_CHANGE_REQ: &str = "req_radio_states_change";
pub const CALL_STATE_CHANGE_REQ: &str = "req_call_state_change";
pub const DISPLAY_ON_REQ: &str = "req_display_state_on";
pub const DISPLAY_DIM_REQ: &str = "req_display_state_dim";
pub const DISPLAY_OFF_REQ: &str = "req_display_state_off";
pub const DISPLAY_LPM_REQ: &str = "req_display_state_lpm";
pub const PREVENT_BLANK_REQ: &str = "req_display_blanking_pause";
pub const CANCEL_PREVENT_BLANK_REQ: &str = "req_display_cancel_blanking_pause";
pub const CABC_MODE_REQ: &str = "req_cabc_mode";
pub const TKLOCK_MODE_CHANGE_REQ: &str = "req_tklock_mode_change";
pub const TRIGGER_POWERKEY_EVENT_REQ: &str = "req_trigger_powerkey_event";
pub const COLOR_PROFILE_CHANGE_REQ: &str = "req_color_profile_change";
pub const ADD_ACTIVITY_CALLBACK_REQ: &str = "add_activity_callback";
pub const REMOVE_ACTIVITY_CALLBACK_REQ: &str = "remove_activity_callback";

// CPU keepalive methods.
pub const CPU_KEEPALIVE_PERIOD_REQ: &str = "req_cpu_keepalive_period";
pub const CPU_KEEPALIVE_START_REQ: &str = "req_cpu_keepalive_start";
pub const CPU_KEEPALIVE_STOP_REQ: &str = "req_cpu_keepalive_stop";
pub const CPU_KEEPALIVE_WAKEUP_REQ: &str = "req_cpu_keepalive_wakeup";

// Config methods.
pub const CONFIG_SET: &str = "set_config";
pub const CONFIG_RESET: &str = "reset_config";

// LED methods. Enable/disable do not affect the pattern stack and are
// meant for testing and development only.
pub const ACTIVATE_LED_PATTERN: &str = "req_led_pattern_activate";
pub const DEACTIVATE_LED_PATTERN: &str = "req_led_pattern_deactivate";
pub const ENABLE_LED: &str = "req_led_enable";
pub const DISABLE_LED: &str = "req_led_disable";

// Broadcast signals.
pub const TKLOCK_MODE_SIG: &str = "tklock_mode_ind";
pub const DISPLAY_SIG: &str = "display_status_ind";
pub const PREVENT_BLANK_SIG: &str = "display_blanking_pause_ind";
pub const BLANKING_INHIBIT_SIG: &str = "display_blanking_inhibit_ind";
pub const PSM_STATE_SIG: &str = "psm_state_ind";
pub const INACTIVITY_SIG: &str = "system_inactivity_ind";
pub const COLOR_PROFILE_SIG: &str = "color_profile_ind";
pub const RADIO_STATES_SIG: &str = "radio_states_ind";
pub const CALL_STATE_SIG: &str = "sig_call_state_ind";
pub const CONFIG_CHANGE_SIG: &str = "config_change_ind";
pub const LED_PATTERN_ACTIVATED_SIG: &str = "led_pattern_activated_ind";
pub const LED_PATTERN_DEACTIVATED_SIG: &str = "led_pattern_deactivated_ind";

// Call states.
pub const CALL_STATE_NONE: &str = "none";
pub const CALL_STATE_RINGING: &str = "ringing";
pub const CALL_STATE_ACTIVE: &str = "active";
pub const CALL_STATE_SERVICE: &str = "service";

// Call types.
pub const NORMAL_CALL: &str = "normal";
pub const EMERGENCY_CALL: &str = "emergency";

// Touchscreen/keypad lock modes.
pub const TK_LOCKED: &str = "locked";
pub const TK_SILENT_LOCKED: &str = "silent-locked";
pub const TK_LOCKED_DIM: &str = "locked-dim";
pub const TK_LOCKED_DELAY: &str = "locked-delay";
pub const TK_SILENT_LOCKED_DIM: &str = "silent-locked-dim";
pub const TK_UNLOCKED: &str = "unlocked";
pub const TK_SILENT_UNLOCKED: &str = "silent-unlocked";

// Display states. Low power mode is an off sub-state and signals as "off".
pub const DISPLAY_ON_STRING: &str = "on";
pub const DISPLAY_DIM_STRING: &str = "dimmed";
pub const DISPLAY_OFF_STRING: &str = "off";

// Blanking pause and blanking inhibit states.
pub const PREVENT_BLANK_ACTIVE_STRING: &str = "active";
pub const PREVENT_BLANK_INACTIVE_STRING: &str = "inactive";
pub const INHIBIT_BLANK_ACTIVE_STRING: &str = "active";
pub const INHIBIT_BLANK_INACTIVE_STRING: &str = "inactive";

// Blanking policy reasons.
pub const BLANKING_POLICY_DEFAULT_STRING: &str = "default";
pub const BLANKING_POLICY_NOTIFICATION_STRING: &str = "notification";
pub const BLANKING_POLICY_ALARM_STRING: &str = "alarm";
pub const BLANKING_POLICY_CALL_STRING: &str = "call";
pub const BLANKING_POLICY_LINGER_STRING: &str = "linger";

// CABC modes.
pub const CABC_MODE_OFF: &str = "off";
pub const CABC_MODE_UI: &str = "ui";
pub const CABC_MODE_STILL_IMAGE: &str = "still-image";
pub const CABC_MODE_MOVING_IMAGE: &str = "moving-image";

// Powerkey event kinds carried by req_trigger_powerkey_event.
pub const POWERKEY_EVENT_SHORT_PRESS: u32 = 0;
pub const POWERKEY_EVENT_LONG_PRESS: u32 = 1;
pub const POWERKEY_EVENT_DOUBLE_PRESS: u32 = 2;

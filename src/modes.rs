// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Typed views of the mode strings and radio bits defined in
//! [`crate::names`]. Parsing an unknown wire string yields
//! [`RequestError::InvalidArgument`] so request validation happens at the
//! edge, before any state is touched.

use crate::error::RequestError;
use crate::names;
use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Radio state bitmask. A radio-state change request carries a new
    /// bitmask plus a mask selecting which bits to apply.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct RadioStates: u32 {
        /// Master switch; radios enabled when set.
        const MASTER = 1 << 0;
        const CELLULAR = 1 << 1;
        const WLAN = 1 << 2;
        const BLUETOOTH = 1 << 3;
        const NFC = 1 << 4;
        const FMTX = 1 << 5;
    }
}

impl RadioStates {
    /// Applies `new` to `self`, altering only the bits selected by `mask`.
    /// Bits outside the mask retain their prior value.
    pub fn apply_masked(self, new: RadioStates, mask: RadioStates) -> RadioStates {
        (self & !mask) | (new & mask)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallState {
    None,
    Ringing,
    Active,
    Service,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CallState::None => names::CALL_STATE_NONE,
            CallState::Ringing => names::CALL_STATE_RINGING,
            CallState::Active => names::CALL_STATE_ACTIVE,
            CallState::Service => names::CALL_STATE_SERVICE,
        })
    }
}

impl FromStr for CallState {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            names::CALL_STATE_NONE => Ok(CallState::None),
            names::CALL_STATE_RINGING => Ok(CallState::Ringing),
            names::CALL_STATE_ACTIVE => Ok(CallState::Active),
            names::CALL_STATE_SERVICE => Ok(CallState::Service),
            other => Err(RequestError::InvalidArgument(format!("call state '{other}'"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallType {
    Normal,
    Emergency,
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CallType::Normal => names::NORMAL_CALL,
            CallType::Emergency => names::EMERGENCY_CALL,
        })
    }
}

impl FromStr for CallType {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            names::NORMAL_CALL => Ok(CallType::Normal),
            names::EMERGENCY_CALL => Ok(CallType::Emergency),
            other => Err(RequestError::InvalidArgument(format!("call type '{other}'"))),
        }
    }
}

/// Touchscreen/keypad lock modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockMode {
    Locked,
    SilentLocked,
    LockedDim,
    LockedDelay,
    SilentLockedDim,
    Unlocked,
    SilentUnlocked,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LockMode::Locked => names::TK_LOCKED,
            LockMode::SilentLocked => names::TK_SILENT_LOCKED,
            LockMode::LockedDim => names::TK_LOCKED_DIM,
            LockMode::LockedDelay => names::TK_LOCKED_DELAY,
            LockMode::SilentLockedDim => names::TK_SILENT_LOCKED_DIM,
            LockMode::Unlocked => names::TK_UNLOCKED,
            LockMode::SilentUnlocked => names::TK_SILENT_UNLOCKED,
        })
    }
}

impl FromStr for LockMode {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            names::TK_LOCKED => Ok(LockMode::Locked),
            names::TK_SILENT_LOCKED => Ok(LockMode::SilentLocked),
            names::TK_LOCKED_DIM => Ok(LockMode::LockedDim),
            names::TK_LOCKED_DELAY => Ok(LockMode::LockedDelay),
            names::TK_SILENT_LOCKED_DIM => Ok(LockMode::SilentLockedDim),
            names::TK_UNLOCKED => Ok(LockMode::Unlocked),
            names::TK_SILENT_UNLOCKED => Ok(LockMode::SilentUnlocked),
            other => Err(RequestError::InvalidArgument(format!("tklock mode '{other}'"))),
        }
    }
}

/// Display states. `LowPower` is an off sub-state: it is tracked
/// internally but reported and signaled as "off".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayState {
    On,
    Dimmed,
    Off,
    LowPower,
}

impl DisplayState {
    /// The wire string reported for this state.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            DisplayState::On => names::DISPLAY_ON_STRING,
            DisplayState::Dimmed => names::DISPLAY_DIM_STRING,
            DisplayState::Off | DisplayState::LowPower => names::DISPLAY_OFF_STRING,
        }
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CabcMode {
    Off,
    Ui,
    StillImage,
    MovingImage,
}

impl fmt::Display for CabcMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CabcMode::Off => names::CABC_MODE_OFF,
            CabcMode::Ui => names::CABC_MODE_UI,
            CabcMode::StillImage => names::CABC_MODE_STILL_IMAGE,
            CabcMode::MovingImage => names::CABC_MODE_MOVING_IMAGE,
        })
    }
}

impl FromStr for CabcMode {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            names::CABC_MODE_OFF => Ok(CabcMode::Off),
            names::CABC_MODE_UI => Ok(CabcMode::Ui),
            names::CABC_MODE_STILL_IMAGE => Ok(CabcMode::StillImage),
            names::CABC_MODE_MOVING_IMAGE => Ok(CabcMode::MovingImage),
            other => Err(RequestError::InvalidArgument(format!("CABC mode '{other}'"))),
        }
    }
}

/// Reason tag carried alongside a display-state change. The derivation of
/// the reason from call/notification/alarm state is a policy concern; the
/// state machine only records and reports it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlankingPolicy {
    Default,
    Notification,
    Alarm,
    Call,
    Linger,
}

impl fmt::Display for BlankingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlankingPolicy::Default => names::BLANKING_POLICY_DEFAULT_STRING,
            BlankingPolicy::Notification => names::BLANKING_POLICY_NOTIFICATION_STRING,
            BlankingPolicy::Alarm => names::BLANKING_POLICY_ALARM_STRING,
            BlankingPolicy::Call => names::BLANKING_POLICY_CALL_STRING,
            BlankingPolicy::Linger => names::BLANKING_POLICY_LINGER_STRING,
        })
    }
}

/// Powerkey press kinds accepted by req_trigger_powerkey_event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerKeyEvent {
    ShortPress,
    LongPress,
    DoublePress,
}

impl TryFrom<u32> for PowerKeyEvent {
    type Error = RequestError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            names::POWERKEY_EVENT_SHORT_PRESS => Ok(PowerKeyEvent::ShortPress),
            names::POWERKEY_EVENT_LONG_PRESS => Ok(PowerKeyEvent::LongPress),
            names::POWERKEY_EVENT_DOUBLE_PRESS => Ok(PowerKeyEvent::DoublePress),
            other => Err(RequestError::InvalidArgument(format!("powerkey event {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use test_case::test_case;

    #[test_case("none", CallState::None)]
    #[test_case("ringing", CallState::Ringing)]
    #[test_case("active", CallState::Active)]
    #[test_case("service", CallState::Service)]
    fn call_state_round_trips(s: &str, state: CallState) {
        assert_eq!(s.parse::<CallState>().unwrap(), state);
        assert_eq!(state.to_string(), s);
    }

    #[test]
    fn unknown_strings_are_invalid_argument() {
        assert_matches!("busy".parse::<CallState>(), Err(RequestError::InvalidArgument(_)));
        assert_matches!("urgent".parse::<CallType>(), Err(RequestError::InvalidArgument(_)));
        assert_matches!("half-locked".parse::<LockMode>(), Err(RequestError::InvalidArgument(_)));
        assert_matches!("auto".parse::<CabcMode>(), Err(RequestError::InvalidArgument(_)));
        assert_matches!(PowerKeyEvent::try_from(3), Err(RequestError::InvalidArgument(_)));
    }

    #[test]
    fn low_power_reports_as_off() {
        assert_eq!(DisplayState::LowPower.to_string(), "off");
        assert_eq!(DisplayState::Off.to_string(), "off");
        assert_eq!(DisplayState::Dimmed.to_string(), "dimmed");
    }

    #[test]
    fn masked_apply_only_touches_selected_bits() {
        // WLAN selected by the mask but absent from the new value, so it
        // clears; BLUETOOTH is outside the mask and survives.
        let current = RadioStates::WLAN | RadioStates::BLUETOOTH;
        let new = RadioStates::CELLULAR;
        let mask = RadioStates::CELLULAR | RadioStates::WLAN;
        assert_eq!(
            current.apply_masked(new, mask),
            RadioStates::CELLULAR | RadioStates::BLUETOOTH
        );
    }

    #[test]
    fn masked_apply_with_empty_mask_is_identity() {
        let current = RadioStates::MASTER | RadioStates::NFC;
        assert_eq!(current.apply_masked(RadioStates::all(), RadioStates::empty()), current);
    }
}

// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! LED pattern stack.
//!
//! Activation requests are reference counted per pattern name, and only
//! the 0↔1 edges are observable events. Pattern names are not validated
//! here; look-up against the pattern catalog belongs to the LED driver
//! collaborator, so unknown names are carried along and simply never
//! become visible. The global enable flag gates what is asserted to the
//! driver without touching the stack contents, so re-enabling restores
//! the prior visible patterns without any activate calls being replayed.

use log::debug;
use std::collections::BTreeMap;

pub struct LedPatternStack {
    counts: BTreeMap<String, u32>,
    enabled: bool,
}

impl LedPatternStack {
    pub fn new(enabled: bool) -> Self {
        Self { counts: BTreeMap::new(), enabled }
    }

    /// Increments the pattern's activation count. Returns true on the
    /// 0→1 transition, when an activated event is due.
    pub fn activate(&mut self, pattern: &str) -> bool {
        let count = self.counts.entry(pattern.to_string()).or_insert(0);
        *count += 1;
        debug!("led pattern '{pattern}' activation count {count}");
        *count == 1
    }

    /// Decrements the pattern's activation count. Returns true on the
    /// 1→0 transition, when a deactivated event is due. Deactivating an
    /// absent pattern is a no-op.
    pub fn deactivate(&mut self, pattern: &str) -> bool {
        match self.counts.get_mut(pattern) {
            Some(count) if *count == 1 => {
                self.counts.remove(pattern);
                debug!("led pattern '{pattern}' deactivated");
                true
            }
            Some(count) => {
                *count -= 1;
                debug!("led pattern '{pattern}' activation count {count}");
                false
            }
            None => false,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_active(&self, pattern: &str) -> bool {
        self.counts.contains_key(pattern)
    }

    /// The patterns to assert to the LED driver. Empty while disabled,
    /// regardless of stack contents.
    pub fn visible(&self) -> Vec<&str> {
        if !self.enabled {
            return Vec::new();
        }
        self.counts.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_fire_only_on_count_edges() {
        let mut stack = LedPatternStack::new(true);
        assert!(stack.activate("PatternBatteryCharging"));
        assert!(!stack.activate("PatternBatteryCharging"));

        assert!(!stack.deactivate("PatternBatteryCharging"));
        assert!(stack.is_active("PatternBatteryCharging"));
        assert!(stack.deactivate("PatternBatteryCharging"));
        assert!(!stack.is_active("PatternBatteryCharging"));
    }

    #[test]
    fn deactivating_an_absent_pattern_is_a_no_op() {
        let mut stack = LedPatternStack::new(true);
        assert!(!stack.deactivate("PatternCommunication"));
        assert!(!stack.deactivate("PatternCommunication"));
    }

    #[test]
    fn disable_hides_but_preserves_the_stack() {
        let mut stack = LedPatternStack::new(true);
        stack.activate("PatternBatteryFull");
        stack.activate("PatternCommunication");
        assert_eq!(stack.visible().len(), 2);

        stack.set_enabled(false);
        assert!(stack.visible().is_empty());
        assert!(stack.is_active("PatternBatteryFull"));

        stack.set_enabled(true);
        assert_eq!(stack.visible(), vec!["PatternBatteryFull", "PatternCommunication"]);
    }

    #[test]
    fn counts_survive_a_disable_cycle() {
        let mut stack = LedPatternStack::new(true);
        stack.activate("PatternCommunication");
        stack.activate("PatternCommunication");

        stack.set_enabled(false);
        stack.set_enabled(true);

        assert!(!stack.deactivate("PatternCommunication"));
        assert!(stack.deactivate("PatternCommunication"));
    }
}

// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Runtime configuration store.
//!
//! Dotted-path keys map to typed values backed by compiled-in defaults.
//! Writes take effect in memory immediately; persistence to the JSON
//! override file is best-effort and its failure never rolls the memory
//! state back. Bulk reset matches keys by substring and is evaluated over
//! a consistent snapshot: it either applies fully or reports the backing
//! store as unavailable, never a partial count.

use crate::error::RequestError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// Compiled-in tunables with their default values.
pub fn builtin_defaults() -> Vec<(&'static str, ConfigValue)> {
    vec![
        ("/system/cpu-keepalive/period", ConfigValue::Int(60)),
        ("/system/cpu-keepalive/wakeup-period", ConfigValue::Int(5)),
        ("/system/activity-callback/limit", ConfigValue::Int(16)),
        ("/display/timeout", ConfigValue::Int(10)),
        ("/display/blanking-pause/period", ConfigValue::Int(60)),
        ("/display/blanking-policy/linger", ConfigValue::Int(5)),
        ("/powerkey/double-press-toggle", ConfigValue::Bool(false)),
        ("/led/enabled", ConfigValue::Bool(true)),
    ]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    String(String),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(v) => v.fmt(f),
            ConfigValue::Int(v) => v.fmt(f),
            ConfigValue::String(v) => v.fmt(f),
        }
    }
}

#[derive(Clone, Debug)]
struct ConfigEntry {
    value: ConfigValue,
    /// Compiled-in default. Entries created at runtime have none; reset
    /// removes them instead of restoring a value.
    default: Option<ConfigValue>,
}

pub struct ConfigStore {
    entries: BTreeMap<String, ConfigEntry>,
    persist_path: Option<PathBuf>,
}

impl ConfigStore {
    pub fn new<'a>(
        defaults: impl IntoIterator<Item = (&'a str, ConfigValue)>,
        persist_path: Option<PathBuf>,
    ) -> Self {
        let entries = defaults
            .into_iter()
            .map(|(key, value)| {
                (key.to_string(), ConfigEntry { value: value.clone(), default: Some(value) })
            })
            .collect();
        Self { entries, persist_path }
    }

    /// Applies previously persisted overrides from the persist path, if
    /// any. Unreadable or malformed files are logged and ignored; the
    /// compiled-in defaults stay in effect.
    pub fn load_overrides(&mut self) {
        let Some(path) = self.persist_path.clone() else { return };
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                info!("no config overrides at {}: {err}", path.display());
                return;
            }
        };
        let overrides: BTreeMap<String, ConfigValue> = match serde_json::from_str(&contents) {
            Ok(overrides) => overrides,
            Err(err) => {
                warn!("ignoring malformed config overrides at {}: {err}", path.display());
                return;
            }
        };
        for (key, value) in overrides {
            match self.entries.get_mut(&key) {
                Some(entry) => entry.value = value,
                None => {
                    self.entries.insert(key, ConfigEntry { value, default: None });
                }
            }
        }
    }

    /// Returns the value for `key`, falling back to the compiled-in
    /// default when no entry exists.
    pub fn get(&self, key: &str) -> Result<ConfigValue, RequestError> {
        self.entries
            .get(key)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| RequestError::NotFound(key.to_string()))
    }

    /// Creates or overwrites `key`. The in-memory value always takes
    /// effect; a persistence failure is reported but never rolled back.
    /// Returns whether the stored value actually changed.
    pub fn set(&mut self, key: &str, value: ConfigValue) -> Result<bool, RequestError> {
        validate_key(key)?;
        let changed = match self.entries.get_mut(key) {
            Some(entry) if entry.value == value => false,
            Some(entry) => {
                entry.value = value;
                true
            }
            None => {
                self.entries.insert(key.to_string(), ConfigEntry { value, default: None });
                true
            }
        };
        if changed {
            self.persist().map_err(RequestError::PersistenceFailure)?;
        }
        Ok(changed)
    }

    /// Restores defaults for every entry whose key contains `keyish` as a
    /// substring. Returns the (key, restored value) pairs that changed,
    /// or None when the backing store is unavailable and the reset cannot
    /// be applied at all.
    pub fn reset(&mut self, keyish: &str) -> Option<Vec<(String, ConfigValue)>> {
        if !self.backend_available() {
            warn!("config reset('{keyish}') refused: backing store unavailable");
            return None;
        }

        // Decide the full change set over a snapshot before mutating.
        let to_restore: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, entry)| {
                key.contains(keyish) && entry.default.as_ref() != Some(&entry.value)
            })
            .map(|(key, _)| key.clone())
            .collect();

        let mut changed = Vec::with_capacity(to_restore.len());
        for key in to_restore {
            let Some(entry) = self.entries.get_mut(&key) else { continue };
            match entry.default.clone() {
                Some(default) => {
                    entry.value = default.clone();
                    changed.push((key, default));
                }
                None => {
                    // Runtime-created entry with no compiled-in default.
                    if let Some(removed) = self.entries.remove(&key) {
                        changed.push((key, removed.value));
                    }
                }
            }
        }
        if !changed.is_empty() {
            if let Err(err) = self.persist() {
                warn!("config reset applied in memory but not persisted: {err}");
            }
        }
        Some(changed)
    }

    /// Whether the persistence backend can accept writes. Memory-only
    /// stores are always available.
    fn backend_available(&self) -> bool {
        match &self.persist_path {
            None => true,
            Some(path) => path.parent().is_none_or(|dir| dir.exists()),
        }
    }

    /// Serializes every entry that differs from its default.
    fn persist(&self) -> Result<(), String> {
        let Some(path) = &self.persist_path else { return Ok(()) };
        let overrides: BTreeMap<&str, &ConfigValue> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.default.as_ref() != Some(&entry.value))
            .map(|(key, entry)| (key.as_str(), &entry.value))
            .collect();
        let contents = serde_json::to_string_pretty(&overrides)
            .map_err(|err| format!("serialize config overrides: {err}"))?;
        fs::write(path, contents)
            .map_err(|err| format!("write {}: {err}", path.display()))
    }
}

fn validate_key(key: &str) -> Result<(), RequestError> {
    if key.is_empty() || !key.starts_with('/') || key.ends_with('/') {
        return Err(RequestError::InvalidArgument(format!("config key '{key}'")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn store() -> ConfigStore {
        ConfigStore::new(
            [
                ("/display/timeout", ConfigValue::Int(10)),
                ("/radio/wlan", ConfigValue::Bool(true)),
            ],
            None,
        )
    }

    #[test]
    fn get_returns_defaults_until_overwritten() {
        let mut store = store();
        assert_eq!(store.get("/display/timeout").unwrap(), ConfigValue::Int(10));

        assert!(store.set("/display/timeout", ConfigValue::Int(5)).unwrap());
        assert_eq!(store.get("/display/timeout").unwrap(), ConfigValue::Int(5));

        // Overwriting with the same value is not a change.
        assert!(!store.set("/display/timeout", ConfigValue::Int(5)).unwrap());
    }

    #[test]
    fn get_of_unknown_key_is_not_found() {
        assert_matches!(store().get("/no/such/key"), Err(RequestError::NotFound(_)));
    }

    #[test]
    fn malformed_keys_are_rejected() {
        let mut store = store();
        assert_matches!(
            store.set("display/timeout", ConfigValue::Int(1)),
            Err(RequestError::InvalidArgument(_))
        );
        assert_matches!(
            store.set("", ConfigValue::Int(1)),
            Err(RequestError::InvalidArgument(_))
        );
        assert_matches!(
            store.set("/display/", ConfigValue::Int(1)),
            Err(RequestError::InvalidArgument(_))
        );
    }

    #[test]
    fn reset_restores_only_matching_modified_entries() {
        let mut store = store();
        store.set("/display/timeout", ConfigValue::Int(5)).unwrap();

        let changed = store.reset("/display/").unwrap();
        assert_eq!(changed, vec![("/display/timeout".to_string(), ConfigValue::Int(10))]);
        assert_eq!(store.get("/display/timeout").unwrap(), ConfigValue::Int(10));
        // Untouched entries do not count.
        assert_eq!(store.get("/radio/wlan").unwrap(), ConfigValue::Bool(true));
    }

    #[test]
    fn reset_with_root_substring_covers_everything() {
        let mut store = store();
        store.set("/display/timeout", ConfigValue::Int(3)).unwrap();
        store.set("/radio/wlan", ConfigValue::Bool(false)).unwrap();

        let changed = store.reset("/").unwrap();
        assert_eq!(changed.len(), 2);
    }

    #[test]
    fn reset_removes_runtime_created_entries() {
        let mut store = store();
        store.set("/custom/key", ConfigValue::String("x".into())).unwrap();

        let changed = store.reset("/custom/").unwrap();
        assert_eq!(changed.len(), 1);
        assert_matches!(store.get("/custom/key"), Err(RequestError::NotFound(_)));
    }

    #[test]
    fn reset_on_unmodified_store_changes_nothing() {
        let mut store = store();
        assert!(store.reset("/").unwrap().is_empty());
    }

    #[test]
    fn persistence_round_trips_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");

        let mut store =
            ConfigStore::new(builtin_defaults(), Some(path.clone()));
        store.set("/display/timeout", ConfigValue::Int(30)).unwrap();

        let mut reloaded = ConfigStore::new(builtin_defaults(), Some(path));
        reloaded.load_overrides();
        assert_eq!(reloaded.get("/display/timeout").unwrap(), ConfigValue::Int(30));
        // Defaults that were never overridden stay intact.
        assert_eq!(reloaded.get("/led/enabled").unwrap(), ConfigValue::Bool(true));
    }

    #[test]
    fn persistence_failure_keeps_the_memory_value() {
        let dir = tempfile::tempdir().unwrap();
        // A path that is a directory cannot be written as a file.
        let mut store =
            ConfigStore::new(builtin_defaults(), Some(dir.path().to_path_buf()));

        let result = store.set("/display/timeout", ConfigValue::Int(42));
        assert_matches!(result, Err(RequestError::PersistenceFailure(_)));
        assert_eq!(store.get("/display/timeout").unwrap(), ConfigValue::Int(42));
    }

    #[test]
    fn reset_reports_unavailable_backend_as_none() {
        let mut store = ConfigStore::new(
            builtin_defaults(),
            Some(PathBuf::from("/nonexistent-dir-for-test/overrides.json")),
        );
        assert!(store.reset("/").is_none());
    }
}

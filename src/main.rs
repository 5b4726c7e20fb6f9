// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use anyhow::{Context, Result};
use log::{info, warn};
use mode_control::config::{builtin_defaults, ConfigStore};
use mode_control::credentials::AllowAll;
use mode_control::engine::Engine;
use mode_control::service::{Command, ModeControlService};
use std::path::PathBuf;
use tokio::sync::mpsc;

const DEFAULT_CONFIG_PATH: &str = "/var/lib/mode-control/overrides.json";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("starting mode-control {}", env!("CARGO_PKG_VERSION"));

    let config_path =
        std::env::args().nth(1).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating config directory {}", dir.display()))?;
    }
    let mut config = ConfigStore::new(builtin_defaults(), Some(config_path));
    config.load_overrides();

    let engine = Engine::new(config, vec!["default".to_string()]);
    let (service, mut signals) = ModeControlService::new(engine, Box::new(AllowAll));

    // The transport collaborator plugs in here: it feeds commands through
    // `command_tx` and broadcasts the signal stream on the bus. Until one
    // is attached, signals are only logged.
    let (command_tx, command_rx) = mpsc::unbounded_channel::<Command>();
    let _command_tx = command_tx;

    let local = tokio::task::LocalSet::new();
    local.spawn_local(async move {
        while let Some(event) = signals.recv().await {
            match event.signal_name() {
                Some(signal) => info!("signal {signal}: {event:?}"),
                None => info!("notification: {event:?}"),
            }
        }
    });
    local.spawn_local(async move {
        service.run(command_rx).await;
        warn!("serve loop stopped");
    });
    local.await;
    Ok(())
}

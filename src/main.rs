// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! AWS IoT media device state publisher.
//!
//! Loads the YAML configuration, connects to the broker with the configured
//! client certificate and publishes camera/microphone state changes until a
//! sensor fails or Ctrl+C is pressed.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use awsiot_media_device::{Config, MqttPublisherBuilder, ProcSensors, StateMonitor};

/// AWS IoT Media Device State Publisher.
#[derive(Debug, Parser)]
#[command(name = "awsiot_media_device", version)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yaml", env = "AWSIOT_MEDIA_DEVICE_CONFIG")]
    config: PathBuf,

    /// Overrides `poll_interval_ms` from the configuration file.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_ms: Option<u64>,
}

impl Cli {
    /// Loads the configuration file and applies command-line overrides.
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(&self.config)
            .with_context(|| format!("invalid configuration '{}'", self.config.display()))?;

        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    tracing::info!(
        endpoint = %config.endpoint,
        port = config.port,
        topic = %config.topic,
        "Starting media device publisher"
    );

    let publisher = MqttPublisherBuilder::from_config(&config)
        .context("failed to load TLS identity")?
        .build()
        .await
        .with_context(|| {
            format!(
                "failed to connect to {}:{}",
                config.endpoint, config.port
            )
        })?;

    let mut monitor = StateMonitor::new(
        ProcSensors::new(),
        publisher,
        config.topic.clone(),
        config.qos,
        config.event_mapping(),
        config.poll_interval,
    )?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C, running until killed");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    let result = monitor.run_until(shutdown).await;

    if let Err(e) = monitor.transport().disconnect().await {
        tracing::warn!(error = %e, "Failed to disconnect cleanly");
    }

    result.context("sensor read failed")
}

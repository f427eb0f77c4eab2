// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Media device state publisher for AWS IoT.
//!
//! This crate watches whether the local camera or microphone is in use and
//! publishes the combined on/off state to an MQTT broker over mutually
//! authenticated TLS. A message is only sent when the state changes, plus
//! once at startup so the broker always learns the current state.
//!
//! # Components
//!
//! - [`sensor`]: camera and microphone in-use queries
//! - [`protocol`]: the publish transport and its MQTT implementation
//! - [`monitor`]: the polling loop that detects transitions
//! - [`config`]: YAML configuration
//!
//! # Quick Start
//!
//! ```no_run
//! use awsiot_media_device::{Config, MqttPublisherBuilder, ProcSensors, StateMonitor};
//!
//! #[tokio::main]
//! async fn main() -> awsiot_media_device::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let publisher = MqttPublisherBuilder::from_config(&config)?.build().await?;
//!
//!     let mut monitor = StateMonitor::new(
//!         ProcSensors::new(),
//!         publisher,
//!         config.topic.clone(),
//!         config.qos,
//!         config.event_mapping(),
//!         config.poll_interval,
//!     )?;
//!
//!     monitor.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod monitor;
pub mod protocol;
pub mod sensor;
pub mod types;

pub use config::{Config, EventConfig};
pub use error::{ConfigError, Error, ProtocolError, Result, SensorError};
pub use monitor::{EventMapping, StateMonitor, TickOutcome};
pub use protocol::{PublishEnvelope, Transport};
#[cfg(feature = "mqtt")]
pub use protocol::{MqttPublisher, MqttPublisherBuilder, TlsIdentity};
pub use sensor::{ProcSensors, SensorSource};
pub use types::{DeviceState, QosLevel};

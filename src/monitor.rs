// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Change detection and publish loop.
//!
//! [`StateMonitor`] polls a [`SensorSource`] at a fixed interval, derives the
//! combined [`DeviceState`], and publishes through a [`Transport`] whenever
//! the derived state differs from the last state the broker confirmed.
//!
//! The last published state only changes after a successful publish, so a
//! failed publish is retried on the next tick. The first tick always
//! publishes because nothing has been confirmed yet.
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use awsiot_media_device::monitor::{EventMapping, StateMonitor};
//! use awsiot_media_device::protocol::MqttPublisher;
//! use awsiot_media_device::sensor::ProcSensors;
//! use awsiot_media_device::types::QosLevel;
//!
//! # async fn example() -> awsiot_media_device::Result<()> {
//! let publisher = MqttPublisher::builder().host("localhost").port(1883).build().await?;
//!
//! let mut monitor = StateMonitor::new(
//!     ProcSensors::new(),
//!     publisher,
//!     "device/media/state",
//!     QosLevel::AT_LEAST_ONCE,
//!     EventMapping::new("media_on", "media_off"),
//!     Duration::from_secs(1),
//! )?;
//!
//! monitor.run().await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use crate::error::{ConfigError, SensorError};
use crate::protocol::{PublishEnvelope, Transport};
use crate::sensor::SensorSource;
use crate::types::{DeviceState, QosLevel};

/// Payload published for each device state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMapping {
    on: String,
    off: String,
}

impl EventMapping {
    /// Creates a mapping from the on and off payloads.
    #[must_use]
    pub fn new(on: impl Into<String>, off: impl Into<String>) -> Self {
        Self {
            on: on.into(),
            off: off.into(),
        }
    }

    /// Returns the payload for `state`.
    #[must_use]
    pub fn payload_for(&self, state: DeviceState) -> &str {
        match state {
            DeviceState::On => &self.on,
            DeviceState::Off => &self.off,
        }
    }
}

/// Result of a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The derived state matches the last published state.
    Unchanged(DeviceState),
    /// The state was published and confirmed.
    Published(DeviceState),
    /// Publishing the state failed; it will be retried next tick.
    PublishFailed(DeviceState),
}

/// Polls the sensors and publishes state transitions.
#[derive(Debug)]
pub struct StateMonitor<S, T> {
    sensors: S,
    transport: T,
    topic: String,
    qos: QosLevel,
    mapping: EventMapping,
    interval: Duration,
    last_published: Option<DeviceState>,
}

impl<S, T> StateMonitor<S, T>
where
    S: SensorSource,
    T: Transport,
{
    /// Creates a monitor that has not published anything yet.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `interval` is zero.
    pub fn new(
        sensors: S,
        transport: T,
        topic: impl Into<String>,
        qos: QosLevel,
        mapping: EventMapping,
        interval: Duration,
    ) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval",
                message: "must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            sensors,
            transport,
            topic: topic.into(),
            qos,
            mapping,
            interval,
            last_published: None,
        })
    }

    /// Returns the state the broker last confirmed, if any.
    #[must_use]
    pub fn last_published(&self) -> Option<DeviceState> {
        self.last_published
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the sensor source.
    #[must_use]
    pub fn sensors(&self) -> &S {
        &self.sensors
    }

    /// Polls the sensors once and publishes if the state changed.
    ///
    /// # Errors
    ///
    /// Returns `SensorError` if either sensor query fails. Nothing is
    /// published in that case.
    pub async fn tick(&mut self) -> Result<TickOutcome, SensorError> {
        let camera = self.sensors.is_camera_active()?;
        let microphone = self.sensors.is_microphone_active()?;
        let desired = DeviceState::from_sensors(camera, microphone);

        if self.last_published == Some(desired) {
            return Ok(TickOutcome::Unchanged(desired));
        }

        let envelope = PublishEnvelope::new(
            self.topic.as_str(),
            self.qos,
            self.mapping.payload_for(desired),
        );

        match self.transport.publish(&envelope).await {
            Ok(()) => {
                tracing::info!(
                    topic = %self.topic,
                    state = %desired,
                    camera,
                    microphone,
                    payload = %envelope.payload(),
                    "Published state change"
                );
                self.last_published = Some(desired);
                Ok(TickOutcome::Published(desired))
            }
            Err(e) => {
                tracing::error!(
                    topic = %self.topic,
                    state = %desired,
                    error = %e,
                    "Failed to publish state change, retrying next poll"
                );
                Ok(TickOutcome::PublishFailed(desired))
            }
        }
    }

    /// Polls forever.
    ///
    /// # Errors
    ///
    /// Returns the first `SensorError`; this is the only way the loop ends.
    pub async fn run(&mut self) -> Result<(), SensorError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Polls until `shutdown` completes or a sensor fails.
    ///
    /// `shutdown` is only observed between ticks, so an in-flight publish
    /// always finishes first.
    ///
    /// # Errors
    ///
    /// Returns the first `SensorError`.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), SensorError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        tracing::info!(
            topic = %self.topic,
            qos = %self.qos,
            interval = ?self.interval,
            "Starting state monitor"
        );

        loop {
            self.tick().await?;

            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("State monitor stopped");
                    return Ok(());
                }
                () = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

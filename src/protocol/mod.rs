// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Publish transport for state notifications.
//!
//! The monitor only needs one operation from the network: publish a message
//! and learn whether it was delivered. [`Transport`] captures that, and
//! [`MqttPublisher`] implements it over a TLS-authenticated MQTT connection.

#[cfg(feature = "mqtt")]
mod mqtt;
#[cfg(feature = "mqtt")]
mod tls;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttPublisher, MqttPublisherBuilder};
#[cfg(feature = "mqtt")]
pub use tls::TlsIdentity;

use crate::error::ProtocolError;
use crate::types::QosLevel;

/// A single message to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishEnvelope {
    topic: String,
    qos: QosLevel,
    retain: bool,
    payload: String,
}

impl PublishEnvelope {
    /// Creates a non-retained message.
    #[must_use]
    pub fn new(topic: impl Into<String>, qos: QosLevel, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            qos,
            retain: false,
            payload: payload.into(),
        }
    }

    /// Returns the destination topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the QoS level.
    #[must_use]
    pub fn qos(&self) -> QosLevel {
        self.qos
    }

    /// Returns whether the broker should retain the message.
    #[must_use]
    pub fn retain(&self) -> bool {
        self.retain
    }

    /// Returns the message body.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// A connected channel able to publish messages.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Publishes a message and waits until delivery is confirmed.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the message could not be sent or its
    /// delivery was not confirmed.
    async fn publish(&self, envelope: &PublishEnvelope) -> Result<(), ProtocolError>;
}

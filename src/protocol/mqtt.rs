// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT publisher for state notifications.
//!
//! # Examples
//!
//! ```no_run
//! use awsiot_media_device::protocol::{MqttPublisher, PublishEnvelope, TlsIdentity, Transport};
//! use awsiot_media_device::types::QosLevel;
//!
//! # async fn example() -> awsiot_media_device::Result<()> {
//! let identity = TlsIdentity::from_files("AmazonRootCA1.pem", "cert.pem.crt", "private.pem.key")?;
//!
//! let publisher = MqttPublisher::builder()
//!     .host("example-ats.iot.ap-northeast-1.amazonaws.com")
//!     .port(8883)
//!     .tls(identity)
//!     .build()
//!     .await?;
//!
//! let envelope = PublishEnvelope::new("device/media/state", QosLevel::AT_LEAST_ONCE, "media_on");
//! publisher.publish(&envelope).await?;
//!
//! publisher.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::config::Config;
use crate::error::{ConfigError, ProtocolError};
use crate::protocol::tls::TlsIdentity;
use crate::protocol::{PublishEnvelope, Transport};

/// Global counter for generating unique client IDs.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Pause before polling the event loop again after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Delivery progress reported by the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    /// PUBLISH written to the socket.
    Written(u16),
    /// PUBACK received (QoS 1).
    Acked(u16),
    /// PUBCOMP received (QoS 2).
    Completed(u16),
}

/// Configuration for an MQTT publisher.
#[derive(Debug, Clone)]
struct MqttPublisherConfig {
    host: String,
    port: u16,
    client_id: Option<String>,
    tls: Option<TlsIdentity>,
    alpn: Vec<String>,
    keep_alive: Duration,
    connection_timeout: Duration,
    publish_timeout: Duration,
}

impl Default for MqttPublisherConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 8883,
            client_id: None,
            tls: None,
            alpn: Vec::new(),
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            publish_timeout: Duration::from_secs(10),
        }
    }
}

/// A connected MQTT client that publishes and waits for delivery.
///
/// Publishes are serialized: each call holds the delivery channel until the
/// broker confirms the message or the publish timeout elapses. While the
/// connection is down, `publish` fails immediately with
/// [`ProtocolError::ConnectionFailed`]. Requests still queued when the
/// connection drops are discarded, never replayed after reconnecting.
pub struct MqttPublisher {
    client: AsyncClient,
    host: String,
    port: u16,
    publish_timeout: Duration,
    connected: Arc<AtomicBool>,
    delivery_rx: Mutex<mpsc::UnboundedReceiver<Delivery>>,
}

impl MqttPublisher {
    /// Creates a new builder for configuring the connection.
    #[must_use]
    pub fn builder() -> MqttPublisherBuilder {
        MqttPublisherBuilder::default()
    }

    /// Returns whether the broker connection is currently up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Returns the broker host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the broker port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Disconnects from the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(host = %self.host, port = %self.port, "Disconnecting from MQTT broker");

        self.client
            .disconnect()
            .await
            .map_err(ProtocolError::Mqtt)?;

        self.connected.store(false, Ordering::Release);
        Ok(())
    }

    /// Waits until the event loop confirms delivery at the given QoS.
    async fn await_delivery(
        rx: &mut mpsc::UnboundedReceiver<Delivery>,
        qos: QoS,
    ) -> Result<(), ProtocolError> {
        let mut pkid = None;

        while let Some(delivery) = rx.recv().await {
            match (qos, delivery) {
                (QoS::AtMostOnce, Delivery::Written(_)) => return Ok(()),
                (_, Delivery::Written(id)) => pkid = Some(id),
                (QoS::AtLeastOnce, Delivery::Acked(id))
                | (QoS::ExactlyOnce, Delivery::Completed(id))
                    if pkid == Some(id) =>
                {
                    return Ok(());
                }
                _ => {}
            }
        }

        Err(ProtocolError::ChannelClosed(
            "MQTT event loop stopped".to_string(),
        ))
    }
}

impl Transport for MqttPublisher {
    async fn publish(&self, envelope: &PublishEnvelope) -> Result<(), ProtocolError> {
        let qos = QoS::from(envelope.qos());
        let mut rx = self.delivery_rx.lock().await;

        // Confirmations left over from a publish that timed out.
        while rx.try_recv().is_ok() {}

        // Nothing is queued while the connection is down, so a failed publish
        // is never delivered by a later reconnect.
        if !self.is_connected() {
            return Err(ProtocolError::ConnectionFailed(format!(
                "not connected to {}:{}",
                self.host, self.port
            )));
        }

        tracing::debug!(
            topic = %envelope.topic(),
            qos = %envelope.qos(),
            payload = %envelope.payload(),
            "Publishing MQTT message"
        );

        self.client
            .try_publish(
                envelope.topic(),
                qos,
                envelope.retain(),
                envelope.payload().as_bytes().to_vec(),
            )
            .map_err(ProtocolError::Mqtt)?;

        // Safe: timeout in practical use will never exceed u64::MAX milliseconds
        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = self.publish_timeout.as_millis() as u64;

        tokio::time::timeout(self.publish_timeout, Self::await_delivery(&mut rx, qos))
            .await
            .map_err(|_| ProtocolError::Timeout(timeout_ms))?
    }
}

impl std::fmt::Debug for MqttPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttPublisher")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Builder for creating an MQTT publisher.
///
/// Without [`tls`](Self::tls) the connection is plain TCP, which is only
/// useful against a local broker.
#[derive(Debug, Default)]
pub struct MqttPublisherBuilder {
    config: MqttPublisherConfig,
}

impl MqttPublisherBuilder {
    /// Prepares a builder from an agent configuration, loading its
    /// certificate files.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a certificate or key file is unusable.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let identity =
            TlsIdentity::from_files(&config.root_ca, &config.certificate, &config.private_key)?;

        let mut builder = Self::default()
            .host(&config.endpoint)
            .port(config.port)
            .tls(identity)
            .alpn(config.alpn.clone())
            .keep_alive(config.keep_alive)
            .connection_timeout(config.connection_timeout)
            .publish_timeout(config.publish_timeout);

        if let Some(client_id) = &config.client_id {
            builder = builder.client_id(client_id);
        }

        Ok(builder)
    }

    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 8883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the MQTT client identifier.
    #[must_use]
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.config.client_id = Some(id.into());
        self
    }

    /// Enables TLS with client certificate authentication.
    #[must_use]
    pub fn tls(mut self, identity: TlsIdentity) -> Self {
        self.config.tls = Some(identity);
        self
    }

    /// Sets the ALPN protocols offered during the TLS handshake.
    #[must_use]
    pub fn alpn(mut self, protocols: Vec<String>) -> Self {
        self.config.alpn = protocols;
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Sets how long a publish waits for confirmation (default: 10 seconds).
    #[must_use]
    pub fn publish_timeout(mut self, duration: Duration) -> Self {
        self.config.publish_timeout = duration;
        self
    }

    /// Builds and connects the publisher.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Host is not set
    /// - Connection fails
    /// - Connection times out
    pub async fn build(self) -> Result<MqttPublisher, ProtocolError> {
        let config = self.config;
        if config.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let client_id = config.client_id.clone().unwrap_or_else(|| {
            let counter = CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
            format!("awsiot_media_device_{}_{}", std::process::id(), counter)
        });

        let mut mqtt_options = MqttOptions::new(&client_id, &config.host, config.port);
        mqtt_options.set_keep_alive(config.keep_alive);
        mqtt_options.set_clean_session(true);

        let secure = config.tls.is_some();
        if let Some(identity) = config.tls {
            mqtt_options.set_transport(identity.into_transport(&config.alpn));
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);

        let connected = Arc::new(AtomicBool::new(false));
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        let (connack_tx, connack_rx) = oneshot::channel();

        let connected_clone = Arc::clone(&connected);
        tokio::spawn(async move {
            handle_publisher_events(event_loop, connected_clone, delivery_tx, connack_tx).await;
        });

        let timeout = config.connection_timeout;
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!(
                    host = %config.host,
                    port = %config.port,
                    client_id = %client_id,
                    tls = secure,
                    "Connected to MQTT broker"
                );
            }
            Ok(Ok(Err(reason))) => return Err(ProtocolError::ConnectionFailed(reason)),
            Ok(Err(_)) => {
                return Err(ProtocolError::ConnectionFailed(
                    "MQTT event loop terminated unexpectedly".to_string(),
                ));
            }
            Err(_) => {
                return Err(ProtocolError::ConnectionFailed(format!(
                    "MQTT connection timeout after {}s",
                    timeout.as_secs()
                )));
            }
        }

        Ok(MqttPublisher {
            client,
            host: config.host,
            port: config.port,
            publish_timeout: config.publish_timeout,
            connected,
            delivery_rx: Mutex::new(delivery_rx),
        })
    }
}

/// Drives the rumqttc event loop for the lifetime of the publisher.
///
/// Errors before the first CONNACK are reported through `connack_tx` and end
/// the task. Later errors are logged and the loop is polled again, which makes
/// rumqttc reconnect with an empty request queue.
async fn handle_publisher_events(
    mut event_loop: EventLoop,
    connected: Arc<AtomicBool>,
    delivery_tx: mpsc::UnboundedSender<Delivery>,
    connack_tx: oneshot::Sender<Result<(), String>>,
) {
    use rumqttc::{Event, Outgoing, Packet};

    let mut connack_tx = Some(connack_tx);

    loop {
        let delivery = match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT broker connected");
                connected.store(true, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(Ok(()));
                }
                None
            }
            Ok(Event::Outgoing(Outgoing::Publish(pkid))) => Some(Delivery::Written(pkid)),
            Ok(Event::Incoming(Packet::PubAck(ack))) => Some(Delivery::Acked(ack.pkid)),
            Ok(Event::Incoming(Packet::PubComp(comp))) => Some(Delivery::Completed(comp.pkid)),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::debug!("MQTT disconnect sent");
                connected.store(false, Ordering::Release);
                break;
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker disconnected");
                connected.store(false, Ordering::Release);
                None
            }
            Ok(_) => None,
            Err(e) => {
                connected.store(false, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(Err(e.to_string()));
                    break;
                }
                if delivery_tx.is_closed() {
                    break;
                }
                tracing::error!(error = %e, "MQTT event loop error, reconnecting");
                tokio::time::sleep(RECONNECT_DELAY).await;
                discard_pending(&mut event_loop);
                None
            }
        };

        if let Some(delivery) = delivery {
            // The publisher may already be dropped.
            let _ = delivery_tx.send(delivery);
        }
    }
}

/// Drops every request the event loop would resend on the next connection.
///
/// Their publishes were already reported as failed to the caller.
fn discard_pending(event_loop: &mut EventLoop) {
    event_loop.clean();
    let dropped = event_loop.pending.len();
    event_loop.pending.clear();

    if dropped > 0 {
        tracing::debug!(dropped, "Discarded queued MQTT requests");
    }
}

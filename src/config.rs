// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Agent configuration loaded from a YAML file.
//!
//! # File format
//!
//! ```yaml
//! QoS: 1
//! topic: device/media/state
//! endpoint: example-ats.iot.ap-northeast-1.amazonaws.com
//! port: 8883
//! root_ca: AmazonRootCA1.pem
//! private_key: private.pem.key
//! certificate: certificate.pem.crt
//! event:
//!   on: media_on
//!   off: media_off
//! ```
//!
//! Optional keys: `client_id`, `poll_interval_ms` (default 1000),
//! `keep_alive_secs` (30), `connection_timeout_secs` (10),
//! `publish_timeout_secs` (10) and `alpn` (`[x-amzn-mqtt-ca]`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::monitor::EventMapping;
use crate::types::QosLevel;

/// ALPN protocol AWS IoT expects for MQTT with client certificates on port 443.
pub const AWS_IOT_ALPN: &str = "x-amzn-mqtt-ca";

const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_KEEP_ALIVE_SECS: u64 = 30;
const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PUBLISH_TIMEOUT_SECS: u64 = 10;

/// Payload names published for each device state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventConfig {
    /// Payload published when the camera or microphone comes into use.
    #[serde(default)]
    pub on: String,
    /// Payload published when both are released.
    #[serde(default)]
    pub off: String,
}

/// Validated agent configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// QoS used for every state publish.
    pub qos: QosLevel,
    /// Topic every state change is published to.
    pub topic: String,
    /// Broker host name.
    pub endpoint: String,
    /// Broker port.
    pub port: u16,
    /// PEM file holding the CA that signed the broker certificate.
    pub root_ca: PathBuf,
    /// PEM file holding the client private key.
    pub private_key: PathBuf,
    /// PEM file holding the client certificate.
    pub certificate: PathBuf,
    /// Payloads for the on and off states.
    pub event: EventConfig,
    /// MQTT client identifier; generated when absent.
    pub client_id: Option<String>,
    /// Delay between two sensor polls.
    pub poll_interval: Duration,
    /// MQTT keep-alive interval.
    pub keep_alive: Duration,
    /// How long to wait for the broker to accept the connection.
    pub connection_timeout: Duration,
    /// How long to wait for a publish to be confirmed.
    pub publish_timeout: Duration,
    /// ALPN protocols offered during the TLS handshake.
    pub alpn: Vec<String>,
}

/// On-disk shape, before validation.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(rename = "QoS", alias = "qos", default)]
    qos: Option<QosLevel>,
    #[serde(default)]
    topic: String,
    #[serde(default)]
    endpoint: String,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    root_ca: PathBuf,
    #[serde(default)]
    private_key: PathBuf,
    #[serde(default)]
    certificate: PathBuf,
    #[serde(default)]
    event: EventConfig,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,
    #[serde(default = "default_keep_alive_secs")]
    keep_alive_secs: u64,
    #[serde(default = "default_connection_timeout_secs")]
    connection_timeout_secs: u64,
    #[serde(default = "default_publish_timeout_secs")]
    publish_timeout_secs: u64,
    #[serde(default = "default_alpn")]
    alpn: Vec<String>,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_keep_alive_secs() -> u64 {
    DEFAULT_KEEP_ALIVE_SECS
}

fn default_connection_timeout_secs() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT_SECS
}

fn default_publish_timeout_secs() -> u64 {
    DEFAULT_PUBLISH_TIMEOUT_SECS
}

fn default_alpn() -> Vec<String> {
    vec![AWS_IOT_ALPN.to_string()]
}

impl Config {
    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, is not valid YAML,
    /// or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_yaml(&contents)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parses and validates configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the YAML is malformed or a field is invalid.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(yaml)?;
        Self::try_from(raw)
    }

    /// Returns the state-to-payload mapping.
    #[must_use]
    pub fn event_mapping(&self) -> EventMapping {
        EventMapping::new(self.event.on.clone(), self.event.off.clone())
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let qos = raw.qos.ok_or(ConfigError::MissingField("QoS"))?;
        require_text("topic", &raw.topic)?;
        require_text("endpoint", &raw.endpoint)?;
        let port = raw.port.ok_or(ConfigError::MissingField("port"))?;
        if port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port",
                message: "must be greater than 0".to_string(),
            });
        }
        require_path("root_ca", &raw.root_ca)?;
        require_path("private_key", &raw.private_key)?;
        require_path("certificate", &raw.certificate)?;
        require_text("event.on", &raw.event.on)?;
        require_text("event.off", &raw.event.off)?;

        if let Some(client_id) = &raw.client_id {
            require_text("client_id", client_id)?;
        }

        Ok(Self {
            qos,
            topic: raw.topic,
            endpoint: raw.endpoint,
            port,
            root_ca: raw.root_ca,
            private_key: raw.private_key,
            certificate: raw.certificate,
            event: raw.event,
            client_id: raw.client_id,
            poll_interval: Duration::from_millis(positive(
                "poll_interval_ms",
                raw.poll_interval_ms,
            )?),
            keep_alive: Duration::from_secs(positive("keep_alive_secs", raw.keep_alive_secs)?),
            connection_timeout: Duration::from_secs(positive(
                "connection_timeout_secs",
                raw.connection_timeout_secs,
            )?),
            publish_timeout: Duration::from_secs(positive(
                "publish_timeout_secs",
                raw.publish_timeout_secs,
            )?),
            alpn: raw.alpn,
        })
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField(field));
    }
    Ok(())
}

fn require_path(field: &'static str, value: &Path) -> Result<(), ConfigError> {
    if value.as_os_str().is_empty() {
        return Err(ConfigError::MissingField(field));
    }
    Ok(())
}

fn positive(field: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field,
            message: "must be greater than 0".to_string(),
        });
    }
    Ok(value)
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the media device agent.
//!
//! Failures fall into three groups: configuration (fatal at startup), sensor
//! reads (fatal to the polling loop), and protocol communication
//! (recoverable, retried on the next poll).

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A sensor query failed.
    #[error("sensor error: {0}")]
    Sensor(#[from] SensorError),

    /// Error occurred during protocol communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Errors raised while loading and validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for the expected schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A required field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field holds a value outside its allowed range.
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// The offending field.
        field: &'static str,
        /// Description of the constraint that was violated.
        message: String,
    },

    /// A certificate or key file does not contain a PEM block.
    #[error("{} does not contain PEM data", .0.display())]
    InvalidPem(PathBuf),
}

/// Errors raised by a sensor source.
#[derive(Debug, Error)]
pub enum SensorError {
    /// The platform interface backing the sensor could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The path being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The sensor is not available on this platform.
    #[error("sensor unavailable: {0}")]
    Unavailable(String),
}

/// Errors related to MQTT communication.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The MQTT client rejected the request.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Delivery was not confirmed in time.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Invalid broker address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_display() {
        let err = ConfigError::MissingField("topic");
        assert_eq!(err.to_string(), "missing required field: topic");
    }

    #[test]
    fn invalid_value_display() {
        let err = ConfigError::InvalidValue {
            field: "QoS",
            message: "must be 0, 1 or 2, got 3".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for QoS: must be 0, 1 or 2, got 3"
        );
    }

    #[test]
    fn sensor_io_display_includes_path() {
        let err = SensorError::Io {
            path: PathBuf::from("/proc"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "failed to read /proc: denied");
    }

    #[test]
    fn error_from_sensor_error() {
        let err: Error = SensorError::Unavailable("camera".to_string()).into();
        assert!(matches!(err, Error::Sensor(SensorError::Unavailable(_))));
    }

    #[test]
    fn protocol_timeout_display() {
        let err = ProtocolError::Timeout(10_000);
        assert_eq!(err.to_string(), "request timed out after 10000 ms");
    }
}

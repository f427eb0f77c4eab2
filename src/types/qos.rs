// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT quality-of-service level.

use std::fmt;

use serde::Deserialize;

use crate::error::ConfigError;

/// A validated MQTT QoS level (0, 1 or 2).
///
/// # Examples
///
/// ```
/// use awsiot_media_device::types::QosLevel;
///
/// let qos = QosLevel::new(1).unwrap();
/// assert_eq!(qos.value(), 1);
///
/// assert!(QosLevel::new(3).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "u8")]
pub struct QosLevel(u8);

impl QosLevel {
    /// Highest QoS level defined by MQTT.
    pub const MAX: u8 = 2;

    /// Fire and forget.
    pub const AT_MOST_ONCE: Self = Self(0);
    /// Acknowledged delivery.
    pub const AT_LEAST_ONCE: Self = Self(1);
    /// Assured single delivery.
    pub const EXACTLY_ONCE: Self = Self(2);

    /// Creates a QoS level.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `level` is greater than 2.
    pub fn new(level: u8) -> Result<Self, ConfigError> {
        if level > Self::MAX {
            return Err(ConfigError::InvalidValue {
                field: "QoS",
                message: format!("must be 0, 1 or 2, got {level}"),
            });
        }
        Ok(Self(level))
    }

    /// Returns the numeric level.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for QosLevel {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for QosLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "mqtt")]
impl From<QosLevel> for rumqttc::QoS {
    fn from(value: QosLevel) -> Self {
        match value.0 {
            0 => rumqttc::QoS::AtMostOnce,
            1 => rumqttc::QoS::AtLeastOnce,
            _ => rumqttc::QoS::ExactlyOnce,
        }
    }
}

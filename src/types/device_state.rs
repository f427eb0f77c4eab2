// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Derived on/off state of the device's media hardware.

use std::fmt;

/// Combined in-use state of the camera and microphone.
///
/// The device is [`On`](DeviceState::On) while either sensor reports use.
///
/// # Examples
///
/// ```
/// use awsiot_media_device::types::DeviceState;
///
/// assert_eq!(DeviceState::from_sensors(false, true), DeviceState::On);
/// assert_eq!(DeviceState::from_sensors(false, false), DeviceState::Off);
/// assert_eq!(DeviceState::On.as_str(), "ON");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceState {
    /// Neither camera nor microphone is in use.
    Off,
    /// The camera, the microphone, or both are in use.
    On,
}

impl DeviceState {
    /// Derives the state from the two sensor readings.
    #[must_use]
    pub const fn from_sensors(camera_active: bool, microphone_active: bool) -> Self {
        if camera_active || microphone_active {
            Self::On
        } else {
            Self::Off
        }
    }

    /// Returns the display string for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_sensors_is_logical_or() {
        assert_eq!(DeviceState::from_sensors(false, false), DeviceState::Off);
        assert_eq!(DeviceState::from_sensors(true, false), DeviceState::On);
        assert_eq!(DeviceState::from_sensors(false, true), DeviceState::On);
        assert_eq!(DeviceState::from_sensors(true, true), DeviceState::On);
    }

    #[test]
    fn display() {
        assert_eq!(DeviceState::On.to_string(), "ON");
        assert_eq!(DeviceState::Off.to_string(), "OFF");
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by the monitor, the configuration and the transport.
//!
//! - [`DeviceState`] - On/Off state derived from the camera and microphone
//! - [`QosLevel`] - MQTT QoS (0-2), validated at construction

mod device_state;
mod qos;

pub use device_state::DeviceState;
pub use qos::QosLevel;

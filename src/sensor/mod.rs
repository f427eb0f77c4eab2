// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Camera and microphone in-use sensors.
//!
//! A [`SensorSource`] answers two point-in-time questions. The monitor polls
//! it; implementations never push notifications.
//!
//! - [`ProcSensors`]: Linux implementation backed by `/proc`

mod proc;

pub use proc::ProcSensors;

use crate::error::SensorError;

/// Point-in-time queries for media hardware usage.
pub trait SensorSource {
    /// Returns whether any process is currently capturing from a camera.
    ///
    /// # Errors
    ///
    /// Returns `SensorError` if the platform interface cannot be queried.
    fn is_camera_active(&self) -> Result<bool, SensorError>;

    /// Returns whether any process is currently capturing from a microphone.
    ///
    /// # Errors
    ///
    /// Returns `SensorError` if the platform interface cannot be queried.
    fn is_microphone_active(&self) -> Result<bool, SensorError>;
}

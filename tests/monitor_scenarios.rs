// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Behavioral tests for the state monitor using scripted sensors and a
//! recording transport.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

use awsiot_media_device::{
    DeviceState, EventMapping, ProtocolError, PublishEnvelope, QosLevel, SensorError,
    SensorSource, StateMonitor, TickOutcome, Transport,
};

const TOPIC: &str = "device/media/state";
const ON: &str = "media_on";
const OFF: &str = "media_off";

/// One poll worth of sensor behavior.
#[derive(Debug, Clone, Copy)]
enum Step {
    Read { camera: bool, microphone: bool },
    CameraFails,
    MicrophoneFails,
}

fn read(camera: bool, microphone: bool) -> Step {
    Step::Read { camera, microphone }
}

/// Replays `Step`s, one per poll, then fails once the script runs out.
#[derive(Default)]
struct ScriptedSensors {
    steps: RefCell<VecDeque<Step>>,
    current: Cell<Option<Step>>,
    polls: Cell<usize>,
}

impl ScriptedSensors {
    fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: RefCell::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }
}

impl SensorSource for ScriptedSensors {
    fn is_camera_active(&self) -> Result<bool, SensorError> {
        self.polls.set(self.polls.get() + 1);
        let step = self
            .steps
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| SensorError::Unavailable("script exhausted".to_string()))?;
        self.current.set(Some(step));

        match step {
            Step::Read { camera, .. } => Ok(camera),
            Step::CameraFails => Err(SensorError::Unavailable("camera".to_string())),
            Step::MicrophoneFails => Ok(false),
        }
    }

    fn is_microphone_active(&self) -> Result<bool, SensorError> {
        match self.current.get() {
            Some(Step::Read { microphone, .. }) => Ok(microphone),
            Some(Step::MicrophoneFails) => Err(SensorError::Unavailable("microphone".to_string())),
            _ => Err(SensorError::Unavailable("camera not polled".to_string())),
        }
    }
}

/// Records every publish; fails the attempts whose index is listed.
#[derive(Default)]
struct RecordingTransport {
    sent: RefCell<Vec<PublishEnvelope>>,
    failing_attempts: Vec<usize>,
}

impl RecordingTransport {
    fn failing_on(attempts: &[usize]) -> Self {
        Self {
            failing_attempts: attempts.to_vec(),
            ..Self::default()
        }
    }

    fn payloads(&self) -> Vec<String> {
        self.sent
            .borrow()
            .iter()
            .map(|e| e.payload().to_string())
            .collect()
    }
}

impl Transport for RecordingTransport {
    async fn publish(&self, envelope: &PublishEnvelope) -> Result<(), ProtocolError> {
        let attempt = self.sent.borrow().len();
        self.sent.borrow_mut().push(envelope.clone());

        if self.failing_attempts.contains(&attempt) {
            return Err(ProtocolError::ConnectionFailed("broker unreachable".to_string()));
        }
        Ok(())
    }
}

fn monitor(
    steps: impl IntoIterator<Item = Step>,
    transport: RecordingTransport,
) -> StateMonitor<ScriptedSensors, RecordingTransport> {
    StateMonitor::new(
        ScriptedSensors::new(steps),
        transport,
        TOPIC,
        QosLevel::AT_LEAST_ONCE,
        EventMapping::new(ON, OFF),
        Duration::from_secs(1),
    )
    .unwrap()
}

// ============================================================================
// Single ticks
// ============================================================================

mod ticks {
    use super::*;

    #[tokio::test]
    async fn startup_with_idle_hardware_publishes_off() {
        let mut monitor = monitor([read(false, false)], RecordingTransport::default());

        let outcome = monitor.tick().await.unwrap();

        assert_eq!(outcome, TickOutcome::Published(DeviceState::Off));
        assert_eq!(monitor.last_published(), Some(DeviceState::Off));
        assert_eq!(monitor.transport().payloads(), vec![OFF]);
    }

    #[tokio::test]
    async fn first_tick_publishes_for_every_reading() {
        for (camera, microphone) in [(false, false), (true, false), (false, true), (true, true)] {
            let mut monitor = monitor([read(camera, microphone)], RecordingTransport::default());
            monitor.tick().await.unwrap();
            assert_eq!(monitor.transport().sent.borrow().len(), 1);
        }
    }

    #[tokio::test]
    async fn camera_turning_on_publishes_on() {
        let mut monitor = monitor(
            [read(false, false), read(true, false)],
            RecordingTransport::default(),
        );

        monitor.tick().await.unwrap();
        let outcome = monitor.tick().await.unwrap();

        assert_eq!(outcome, TickOutcome::Published(DeviceState::On));
        assert_eq!(monitor.last_published(), Some(DeviceState::On));
        assert_eq!(monitor.transport().payloads(), vec![OFF, ON]);
    }

    #[tokio::test]
    async fn unchanged_state_does_not_publish() {
        let mut monitor = monitor(
            [read(false, false), read(true, false), read(true, false)],
            RecordingTransport::default(),
        );

        monitor.tick().await.unwrap();
        monitor.tick().await.unwrap();
        let outcome = monitor.tick().await.unwrap();

        assert_eq!(outcome, TickOutcome::Unchanged(DeviceState::On));
        assert_eq!(monitor.transport().sent.borrow().len(), 2);
    }

    #[tokio::test]
    async fn switching_sensor_keeps_state_on() {
        let mut monitor = monitor(
            [read(true, false), read(true, true), read(false, true)],
            RecordingTransport::default(),
        );

        for _ in 0..3 {
            monitor.tick().await.unwrap();
        }

        assert_eq!(monitor.transport().payloads(), vec![ON]);
    }

    #[tokio::test]
    async fn failed_publish_is_retried_next_tick() {
        let mut monitor = monitor(
            [read(false, false), read(true, false), read(true, false)],
            RecordingTransport::failing_on(&[1]),
        );

        monitor.tick().await.unwrap();
        let failed = monitor.tick().await.unwrap();
        assert_eq!(failed, TickOutcome::PublishFailed(DeviceState::On));
        assert_eq!(monitor.last_published(), Some(DeviceState::Off));

        let retried = monitor.tick().await.unwrap();
        assert_eq!(retried, TickOutcome::Published(DeviceState::On));
        assert_eq!(monitor.last_published(), Some(DeviceState::On));
        assert_eq!(monitor.transport().payloads(), vec![OFF, ON, ON]);
    }

    #[tokio::test]
    async fn failed_first_publish_leaves_state_unset() {
        let mut monitor = monitor(
            [read(false, false), read(false, false)],
            RecordingTransport::failing_on(&[0]),
        );

        monitor.tick().await.unwrap();
        assert_eq!(monitor.last_published(), None);

        monitor.tick().await.unwrap();
        assert_eq!(monitor.last_published(), Some(DeviceState::Off));
        assert_eq!(monitor.transport().payloads(), vec![OFF, OFF]);
    }

    #[tokio::test]
    async fn reverting_after_failure_publishes_nothing() {
        let mut monitor = monitor(
            [read(false, false), read(true, false), read(false, false)],
            RecordingTransport::failing_on(&[1]),
        );

        for _ in 0..3 {
            monitor.tick().await.unwrap();
        }

        assert_eq!(monitor.last_published(), Some(DeviceState::Off));
        assert_eq!(monitor.transport().payloads(), vec![OFF, ON]);
    }

    #[tokio::test]
    async fn envelope_uses_configured_topic_and_qos() {
        let mut monitor = monitor([read(true, true)], RecordingTransport::default());
        monitor.tick().await.unwrap();

        let sent = monitor.transport().sent.borrow();
        assert_eq!(sent[0].topic(), TOPIC);
        assert_eq!(sent[0].qos(), QosLevel::AT_LEAST_ONCE);
        assert!(!sent[0].retain());
        assert_eq!(sent[0].payload(), ON);
    }

    #[tokio::test]
    async fn camera_error_skips_publish() {
        let mut monitor = monitor([Step::CameraFails], RecordingTransport::default());

        let err = monitor.tick().await.unwrap_err();

        assert!(matches!(err, SensorError::Unavailable(ref s) if s == "camera"));
        assert!(monitor.transport().sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn microphone_error_skips_publish() {
        let mut monitor = monitor(
            [read(false, false), Step::MicrophoneFails],
            RecordingTransport::default(),
        );

        monitor.tick().await.unwrap();
        let err = monitor.tick().await.unwrap_err();

        assert!(matches!(err, SensorError::Unavailable(ref s) if s == "microphone"));
        assert_eq!(monitor.transport().sent.borrow().len(), 1);
    }
}

// ============================================================================
// Polling loop
// ============================================================================

mod polling_loop {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_sensor_error() {
        let mut monitor = monitor(
            [
                read(false, false),
                read(true, false),
                read(true, false),
                read(false, false),
                Step::CameraFails,
                read(true, true),
            ],
            RecordingTransport::default(),
        );

        let err = monitor.run().await.unwrap_err();

        assert!(matches!(err, SensorError::Unavailable(ref s) if s == "camera"));
        assert_eq!(monitor.sensors().polls.get(), 5);
        assert_eq!(monitor.transport().payloads(), vec![OFF, ON, OFF]);
        assert_eq!(monitor.last_published(), Some(DeviceState::Off));
    }

    #[tokio::test(start_paused = true)]
    async fn run_waits_one_interval_between_polls() {
        let mut monitor = monitor(
            [read(false, false), read(false, false), read(false, false)],
            RecordingTransport::default(),
        );

        let start = tokio::time::Instant::now();
        monitor.run().await.unwrap_err();

        // Three successful polls, then the exhausted script fails on the fourth.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
        assert_eq!(monitor.sensors().polls.get(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn run_retries_failed_publish_until_it_succeeds() {
        let mut monitor = monitor(
            [read(true, false); 5],
            RecordingTransport::failing_on(&[0, 1, 2]),
        );

        monitor.run().await.unwrap_err();

        assert_eq!(monitor.transport().payloads(), vec![ON, ON, ON, ON]);
        assert_eq!(monitor.last_published(), Some(DeviceState::On));
    }

    #[tokio::test(start_paused = true)]
    async fn run_until_returns_on_shutdown() {
        let mut monitor = monitor([read(false, true); 10], RecordingTransport::default());

        monitor
            .run_until(tokio::time::sleep(Duration::from_millis(2500)))
            .await
            .unwrap();

        assert_eq!(monitor.sensors().polls.get(), 3);
        assert_eq!(monitor.transport().payloads(), vec![ON]);
    }
}

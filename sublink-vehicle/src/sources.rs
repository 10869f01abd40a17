//! Data sources and sinks behind the link servers
//!
//! The camera, sensor board, and thruster driver live outside this crate.
//! Servers reach them through these traits; the simulated implementations
//! stand in when no hardware is attached.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use sublink_protocol::{TelemetryRecord, Thruster, ThrusterVector};

/// Produces encoded video frames
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame, or `None` when the camera is gone
    async fn next_frame(&mut self) -> Option<Bytes>;
}

/// Produces telemetry samples
#[async_trait]
pub trait TelemetrySource: Send {
    async fn sample(&mut self) -> TelemetryRecord;
}

/// Receives thruster vectors from the pilot link
pub trait ThrusterSink: Send {
    fn apply(&mut self, thrust: ThrusterVector);
}

/// Shared handles the supervisor keeps across server restarts
#[derive(Clone)]
pub struct Sources {
    pub frames: Arc<Mutex<dyn FrameSource>>,
    pub telemetry: Arc<Mutex<dyn TelemetrySource>>,
    pub thrusters: Arc<Mutex<dyn ThrusterSink>>,
}

impl Sources {
    pub fn new<F, T, S>(frames: F, telemetry: T, thrusters: S) -> Self
    where
        F: FrameSource + 'static,
        T: TelemetrySource + 'static,
        S: ThrusterSink + 'static,
    {
        Self {
            frames: Arc::new(Mutex::new(frames)),
            telemetry: Arc::new(Mutex::new(telemetry)),
            thrusters: Arc::new(Mutex::new(thrusters)),
        }
    }

    /// Synthetic camera, simulated sensors, and logged thrusters
    pub fn simulated(width: u16, height: u16) -> Self {
        Self::new(
            SyntheticFrames::new(width, height),
            SimulatedTelemetry::new(),
            LoggingThrusters::new(),
        )
    }
}

/// Grayscale PGM frames with a moving gradient
#[derive(Debug)]
pub struct SyntheticFrames {
    width: u16,
    height: u16,
    sequence: u64,
}

impl SyntheticFrames {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            sequence: 0,
        }
    }

    pub fn render(&mut self) -> Bytes {
        let header = format!("P5\n{} {}\n255\n", self.width, self.height);
        let pixels = self.width as usize * self.height as usize;
        let mut frame = BytesMut::with_capacity(header.len() + pixels);
        frame.put_slice(header.as_bytes());

        let shift = self.sequence as usize;
        for y in 0..self.height as usize {
            for x in 0..self.width as usize {
                frame.put_u8(((x + y + shift) % 256) as u8);
            }
        }

        self.sequence += 1;
        frame.freeze()
    }
}

#[async_trait]
impl FrameSource for SyntheticFrames {
    async fn next_frame(&mut self) -> Option<Bytes> {
        Some(self.render())
    }
}

/// Plausible noisy sensor readings
#[derive(Debug)]
pub struct SimulatedTelemetry {
    rng: fastrand::Rng,
    yaw: f64,
    voltage: f64,
}

impl SimulatedTelemetry {
    pub fn new() -> Self {
        Self::with_rng(fastrand::Rng::new())
    }

    /// Deterministic readings for tests
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(fastrand::Rng::with_seed(seed))
    }

    fn with_rng(rng: fastrand::Rng) -> Self {
        Self {
            rng,
            yaw: 0.0,
            voltage: 16.8,
        }
    }

    fn noise(&mut self, scale: f64) -> f64 {
        (self.rng.f64() - 0.5) * 2.0 * scale
    }

    pub fn next_record(&mut self) -> TelemetryRecord {
        self.yaw = (self.yaw + self.noise(2.0)).rem_euclid(360.0);
        self.voltage = (self.voltage - self.rng.f64() * 0.001).max(13.0);

        TelemetryRecord {
            accel_x: self.noise(0.2),
            accel_y: self.noise(0.2),
            accel_z: 9.81 + self.noise(0.05),
            mag_x: 22.0 + self.noise(1.0),
            mag_y: -4.0 + self.noise(1.0),
            mag_z: 41.0 + self.noise(1.0),
            pressure: 1013.25 + self.rng.f64() * 50.0,
            gyro_x: self.noise(0.5),
            gyro_y: self.noise(0.5),
            gyro_z: self.noise(0.5),
            voltmeter: self.voltage,
            battery_current: 4.0 + self.rng.f64() * 2.0,
            roll: self.noise(3.0),
            pitch: self.noise(3.0),
            yaw: self.yaw,
            auto_button: 0.0,
            kill_button: 0.0,
        }
    }
}

impl Default for SimulatedTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySource for SimulatedTelemetry {
    async fn sample(&mut self) -> TelemetryRecord {
        self.next_record()
    }
}

/// Logs every vector in place of a thruster driver
#[derive(Debug, Default)]
pub struct LoggingThrusters {
    last: ThrusterVector,
    applied: u64,
}

impl LoggingThrusters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> ThrusterVector {
        self.last
    }

    pub fn applied(&self) -> u64 {
        self.applied
    }
}

impl ThrusterSink for LoggingThrusters {
    fn apply(&mut self, thrust: ThrusterVector) {
        self.applied += 1;
        if thrust.is_neutral() != self.last.is_neutral() {
            info!(neutral = thrust.is_neutral(), "thrusters {:?}", thrust.values());
        } else {
            debug!(
                port_y = thrust.get(Thruster::PortY),
                starboard_y = thrust.get(Thruster::StarboardY),
                "thrusters {:?}",
                thrust.values()
            );
        }
        self.last = thrust;
    }
}

/// Forwards every vector to a channel
#[derive(Debug)]
pub struct ChannelThrusters(pub mpsc::UnboundedSender<ThrusterVector>);

impl ThrusterSink for ChannelThrusters {
    fn apply(&mut self, thrust: ThrusterVector) {
        self.0.send(thrust).ok();
    }
}

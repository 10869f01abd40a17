use serde::{Deserialize, Serialize};

use crate::codec::CodecError;

/// Number of `f64` values in a telemetry record
pub const FIELD_COUNT: usize = 17;

/// Encoded size of a telemetry record in bytes
pub const RECORD_SIZE: usize = FIELD_COUNT * 8;

/// One sensor snapshot from the vehicle
///
/// Encoded on the wire as 17 little-endian `f64` values in field order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
    pub mag_x: f64,
    pub mag_y: f64,
    pub mag_z: f64,
    pub pressure: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
    pub voltmeter: f64,
    pub battery_current: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub auto_button: f64,
    pub kill_button: f64,
}

impl TelemetryRecord {
    /// Build a record from values in field order
    pub fn from_array(v: [f64; FIELD_COUNT]) -> Self {
        Self {
            accel_x: v[0],
            accel_y: v[1],
            accel_z: v[2],
            mag_x: v[3],
            mag_y: v[4],
            mag_z: v[5],
            pressure: v[6],
            gyro_x: v[7],
            gyro_y: v[8],
            gyro_z: v[9],
            voltmeter: v[10],
            battery_current: v[11],
            roll: v[12],
            pitch: v[13],
            yaw: v[14],
            auto_button: v[15],
            kill_button: v[16],
        }
    }

    /// Values in field order
    pub fn to_array(&self) -> [f64; FIELD_COUNT] {
        [
            self.accel_x,
            self.accel_y,
            self.accel_z,
            self.mag_x,
            self.mag_y,
            self.mag_z,
            self.pressure,
            self.gyro_x,
            self.gyro_y,
            self.gyro_z,
            self.voltmeter,
            self.battery_current,
            self.roll,
            self.pitch,
            self.yaw,
            self.auto_button,
            self.kill_button,
        ]
    }

    /// Decode the first [`RECORD_SIZE`] bytes; trailing bytes are ignored
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < RECORD_SIZE {
            return Err(CodecError::RecordTooShort {
                expected: RECORD_SIZE,
                actual: bytes.len(),
            });
        }

        let mut values = [0f64; FIELD_COUNT];
        for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            *value = f64::from_le_bytes(raw);
        }
        Ok(Self::from_array(values))
    }

    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        for (chunk, value) in out.chunks_exact_mut(8).zip(self.to_array()) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        out
    }

    /// Whether the vehicle's kill switch reads as pressed
    pub fn kill_pressed(&self) -> bool {
        self.kill_button > 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TelemetryRecord {
        let mut v = [0f64; FIELD_COUNT];
        for (i, x) in v.iter_mut().enumerate() {
            *x = i as f64 * 1.5 - 3.0;
        }
        TelemetryRecord::from_array(v)
    }

    #[test]
    fn test_record_size() {
        assert_eq!(RECORD_SIZE, 136);
        assert_eq!(sample().to_bytes().len(), RECORD_SIZE);
    }

    #[test]
    fn test_field_order_on_wire() {
        let record = sample();
        let bytes = record.to_bytes();
        // pressure is the seventh field
        let pressure = f64::from_le_bytes(bytes[48..56].try_into().unwrap());
        assert_eq!(pressure, record.pressure);
        let kill = f64::from_le_bytes(bytes[128..136].try_into().unwrap());
        assert_eq!(kill, record.kill_button);
    }

    #[test]
    fn test_from_bytes_roundtrip() {
        let record = sample();
        assert_eq!(TelemetryRecord::from_bytes(&record.to_bytes()).unwrap(), record);
    }

    #[test]
    fn test_from_bytes_too_short() {
        let err = TelemetryRecord::from_bytes(&[0u8; 100]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::RecordTooShort {
                expected: 136,
                actual: 100
            }
        ));
    }

    #[test]
    fn test_from_bytes_ignores_trailing() {
        let record = sample();
        let mut bytes = record.to_bytes().to_vec();
        bytes.extend_from_slice(&[0xff; 12]);
        assert_eq!(TelemetryRecord::from_bytes(&bytes).unwrap(), record);
    }

    #[test]
    fn test_kill_pressed() {
        let mut record = TelemetryRecord::default();
        assert!(!record.kill_pressed());
        record.kill_button = 1.0;
        assert!(record.kill_pressed());
    }
}

use serde::{Deserialize, Serialize};

use crate::codec::CodecError;

/// Number of thrusters on the vehicle
pub const THRUSTER_COUNT: usize = 6;

/// Largest magnitude a thruster channel may carry
pub const THRUST_LIMIT: i8 = 100;

/// Thruster positions, in wire channel order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Thruster {
    PortForwardZ,
    StarboardForwardZ,
    StarboardY,
    StarboardAftZ,
    PortAftZ,
    PortY,
}

impl Thruster {
    pub const ALL: [Thruster; THRUSTER_COUNT] = [
        Thruster::PortForwardZ,
        Thruster::StarboardForwardZ,
        Thruster::StarboardY,
        Thruster::StarboardAftZ,
        Thruster::PortAftZ,
        Thruster::PortY,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Six signed thruster commands, each within `[-100, 100]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThrusterVector([i8; THRUSTER_COUNT]);

impl ThrusterVector {
    /// All thrusters stopped
    pub const NEUTRAL: ThrusterVector = ThrusterVector([0; THRUSTER_COUNT]);

    /// Build a vector, rejecting any channel beyond the limit
    pub fn new(values: [i8; THRUSTER_COUNT]) -> Result<Self, CodecError> {
        for (channel, &value) in values.iter().enumerate() {
            if !(-THRUST_LIMIT..=THRUST_LIMIT).contains(&value) {
                return Err(CodecError::ThrustOutOfRange { channel, value });
            }
        }
        Ok(Self(values))
    }

    /// Build a vector, clamping every channel into range
    pub fn clamped(values: [i32; THRUSTER_COUNT]) -> Self {
        let limit = i32::from(THRUST_LIMIT);
        // Clamped into [-100, 100], so the narrowing cast is lossless
        Self(values.map(|v| v.clamp(-limit, limit) as i8))
    }

    pub fn get(&self, thruster: Thruster) -> i8 {
        self.0[thruster.index()]
    }

    pub fn values(&self) -> [i8; THRUSTER_COUNT] {
        self.0
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }

    /// Two's-complement wire bytes
    pub fn to_bytes(&self) -> [u8; THRUSTER_COUNT] {
        self.0.map(|v| v as u8)
    }

    pub fn from_bytes(bytes: [u8; THRUSTER_COUNT]) -> Result<Self, CodecError> {
        Self::new(bytes.map(|b| b as i8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_default() {
        assert_eq!(ThrusterVector::default(), ThrusterVector::NEUTRAL);
        assert!(ThrusterVector::default().is_neutral());
    }

    #[test]
    fn test_new_accepts_limits() {
        let v = ThrusterVector::new([100, -100, 0, 50, -50, 1]).unwrap();
        assert_eq!(v.get(Thruster::PortForwardZ), 100);
        assert_eq!(v.get(Thruster::StarboardForwardZ), -100);
        assert_eq!(v.get(Thruster::PortY), 1);
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        let err = ThrusterVector::new([0, 0, 101, 0, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::ThrustOutOfRange {
                channel: 2,
                value: 101
            }
        ));
        assert!(ThrusterVector::new([0, 0, 0, 0, 0, -128]).is_err());
    }

    #[test]
    fn test_clamped() {
        let v = ThrusterVector::clamped([500, -500, 20, -20, 100, -101]);
        assert_eq!(v.values(), [100, -100, 20, -20, 100, -100]);
    }

    #[test]
    fn test_wire_bytes_are_twos_complement() {
        let v = ThrusterVector::new([-1, 1, -100, 100, 0, -50]).unwrap();
        assert_eq!(v.to_bytes(), [0xff, 0x01, 0x9c, 0x64, 0x00, 0xce]);
        assert_eq!(ThrusterVector::from_bytes(v.to_bytes()).unwrap(), v);
    }

    #[test]
    fn test_from_bytes_rejects_out_of_range() {
        // 0x7f is 127
        assert!(ThrusterVector::from_bytes([0x7f, 0, 0, 0, 0, 0]).is_err());
    }
}

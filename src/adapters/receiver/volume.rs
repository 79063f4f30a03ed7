//! Native volume scale.
//!
//! Firmware variants report `Lvl/Val` against a full scale of either 50 or
//! 100. The host always sees a fraction in `[0, 1]`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum VolumeScale {
    #[default]
    Fifty,
    Hundred,
}

impl VolumeScale {
    pub fn full_scale(&self) -> u32 {
        match self {
            Self::Fifty => 50,
            Self::Hundred => 100,
        }
    }

    /// Native level reported by the device to a host fraction.
    pub fn to_fraction(&self, native: i64) -> f64 {
        (native as f64 / self.full_scale() as f64).clamp(0.0, 1.0)
    }

    /// Host fraction to the native level sent to the device. Truncates.
    pub fn to_native(&self, fraction: f64) -> i64 {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        (fraction * self.full_scale() as f64).trunc() as i64
    }
}

impl TryFrom<u32> for VolumeScale {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            50 => Ok(Self::Fifty),
            100 => Ok(Self::Hundred),
            other => Err(format!("volume scale must be 50 or 100, got {}", other)),
        }
    }
}

impl From<VolumeScale> for u32 {
    fn from(scale: VolumeScale) -> Self {
        scale.full_scale()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_volume_round_trip() {
        for scale in [VolumeScale::Fifty, VolumeScale::Hundred] {
            let native = scale.to_native(0.5);
            assert_eq!(native, scale.full_scale() as i64 / 2);
            assert_eq!(scale.to_fraction(native), 0.5);
        }
    }

    #[test]
    fn test_to_native_truncates() {
        assert_eq!(VolumeScale::Fifty.to_native(0.999), 49);
        assert_eq!(VolumeScale::Hundred.to_native(0.255), 25);
        assert_eq!(VolumeScale::Fifty.to_native(1.0), 50);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(VolumeScale::Fifty.to_native(1.7), 50);
        assert_eq!(VolumeScale::Fifty.to_native(-0.2), 0);
        assert_eq!(VolumeScale::Fifty.to_native(f64::NAN), 0);
        assert_eq!(VolumeScale::Fifty.to_fraction(60), 1.0);
        assert_eq!(VolumeScale::Hundred.to_fraction(-5), 0.0);
    }

    #[test]
    fn test_deserialize_from_integer() {
        let scale: VolumeScale = serde_json::from_str("100").unwrap();
        assert_eq!(scale, VolumeScale::Hundred);
        assert!(serde_json::from_str::<VolumeScale>("75").is_err());
        assert_eq!(serde_json::to_string(&VolumeScale::Fifty).unwrap(), "50");
    }
}

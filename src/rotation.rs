use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;
use std::fmt;

/// Clockwise rotation that can be expressed exactly by a track matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RotationAngle {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl RotationAngle {
    pub const ALL: [RotationAngle; 4] = [
        RotationAngle::Deg0,
        RotationAngle::Deg90,
        RotationAngle::Deg180,
        RotationAngle::Deg270,
    ];

    pub fn from_degrees(degrees: i32) -> Result<Self> {
        match degrees {
            0 => Ok(RotationAngle::Deg0),
            90 => Ok(RotationAngle::Deg90),
            180 => Ok(RotationAngle::Deg180),
            270 => Ok(RotationAngle::Deg270),
            other => Err(Error::UnsupportedAngle(other)),
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            RotationAngle::Deg0 => 0,
            RotationAngle::Deg90 => 90,
            RotationAngle::Deg180 => 180,
            RotationAngle::Deg270 => 270,
        }
    }

    /// Canonical `(a, b, c, d)` coefficients.
    pub fn coefficients(self) -> (f64, f64, f64, f64) {
        match self {
            RotationAngle::Deg0 => (1.0, 0.0, 0.0, 1.0),
            RotationAngle::Deg90 => (0.0, 1.0, -1.0, 0.0),
            RotationAngle::Deg180 => (-1.0, 0.0, 0.0, -1.0),
            RotationAngle::Deg270 => (0.0, -1.0, 1.0, 0.0),
        }
    }

    /// Whether the displayed width and height trade places.
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, RotationAngle::Deg90 | RotationAngle::Deg270)
    }

    /// Full matrix for this angle: canonical `a, b, c, d`, zero `u, v, x, y`
    /// and unit `w`.
    pub fn matrix(self) -> Matrix {
        let (a, b, c, d) = self.coefficients();
        Matrix([
            to_fixed_16_16(a),
            to_fixed_16_16(b),
            to_fixed_2_30(0.0),
            to_fixed_16_16(c),
            to_fixed_16_16(d),
            to_fixed_2_30(0.0),
            to_fixed_16_16(0.0),
            to_fixed_16_16(0.0),
            to_fixed_2_30(1.0),
        ])
    }

    /// Recognize a canonical rotation from the `a, b, c, d` slots, ignoring
    /// translation.
    pub fn from_matrix(m: &Matrix) -> Option<Self> {
        Self::ALL.into_iter().find(|angle| {
            let canon = angle.matrix();
            [0, 1, 3, 4].iter().all(|&i| canon.0[i] == m.0[i])
        })
    }
}

impl fmt::Display for RotationAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// 16.16 fixed point, truncated toward zero.
pub fn to_fixed_16_16(v: f64) -> i32 {
    (v * 65536.0) as i32
}

/// 2.30 fixed point, used by the `u`, `v` and `w` matrix slots.
pub fn to_fixed_2_30(v: f64) -> i32 {
    (v * 1_073_741_824.0) as i32
}

pub fn from_fixed_16_16(v: i32) -> f64 {
    v as f64 / 65536.0
}

/// Size in bytes of a serialized matrix.
pub const MATRIX_LEN: usize = 36;

/// Track transform `[a, b, u, c, d, v, x, y, w]`, raw fixed-point values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Matrix(pub [i32; 9]);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix([0x00010000, 0, 0, 0, 0x00010000, 0, 0, 0, 0x40000000]);

    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        let mut m = [0i32; 9];
        BigEndian::read_i32_into(&bytes[..MATRIX_LEN], &mut m);
        Matrix(m)
    }

    pub fn to_be_bytes(&self) -> [u8; MATRIX_LEN] {
        let mut out = [0u8; MATRIX_LEN];
        BigEndian::write_i32_into(&self.0, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_point_truncates() {
        assert_eq!(to_fixed_16_16(1.0), 0x00010000);
        assert_eq!(to_fixed_16_16(-1.0), -65536);
        assert_eq!(to_fixed_16_16(-1.0) as u32, 0xFFFF0000);
        assert_eq!(to_fixed_16_16(0.5), 0x8000);
        assert_eq!(to_fixed_16_16(1.0 / 3.0), 21845);
        assert_eq!(to_fixed_2_30(1.0), 0x40000000);
    }

    #[test]
    fn zero_degrees_is_identity() {
        assert_eq!(RotationAngle::Deg0.matrix(), Matrix::IDENTITY);
    }

    #[test]
    fn rejects_non_canonical_angles() {
        for deg in [45, -90, 360, 91] {
            assert!(matches!(
                RotationAngle::from_degrees(deg),
                Err(Error::UnsupportedAngle(d)) if d == deg
            ));
        }
    }

    #[test]
    fn detects_angle_from_matrix() {
        for angle in RotationAngle::ALL {
            assert_eq!(RotationAngle::from_matrix(&angle.matrix()), Some(angle));
        }
        let skew = Matrix([0x00010000, 0x00010000, 0, 0, 0x00010000, 0, 0, 0, 0x40000000]);
        assert_eq!(RotationAngle::from_matrix(&skew), None);
    }
}

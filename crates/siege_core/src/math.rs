//! Fixed-point math utilities for the arena simulation.
//!
//! All simulation math uses fixed-point arithmetic so tests can assert
//! exact positions and separations without epsilon juggling, and so a
//! battle replayed with the same inputs lands on the same values on
//! every platform.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fx = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fx_serde {
    use super::Fx;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fx, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fx, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fx::from_bits(bits))
    }
}

/// Serde support for `Option<Fx>`.
pub mod option_fx_serde {
    use super::Fx;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize an optional fixed-point number.
    pub fn serialize<S>(value: &Option<Fx>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => v.to_bits().serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fx>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<i64>::deserialize(deserializer)?;
        Ok(opt.map(Fx::from_bits))
    }
}

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fx {
    /// X coordinate.
    #[serde(with = "fx_serde")]
    pub x: Fx,
    /// Y coordinate.
    #[serde(with = "fx_serde")]
    pub y: Fx,
}

impl Vec2Fx {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fx, y: Fx) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fx::ZERO,
        y: Fx::ZERO,
    };

    /// Squared length of the vector.
    #[must_use]
    pub fn length_squared(self) -> Fx {
        self.x * self.x + self.y * self.y
    }

    /// Length of the vector.
    #[must_use]
    pub fn length(self) -> Fx {
        fx_sqrt(self.length_squared())
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fx {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Calculate distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> Fx {
        fx_sqrt(self.distance_squared(other))
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fx {
        self.x * other.x + self.y * other.y
    }

    /// Scale the vector by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fx) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fx) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Normalize vector using fixed-point math.
    ///
    /// Axis-aligned vectors normalize exactly; the general case goes
    /// through the binary-search sqrt and carries its precision.
    /// Returns the zero vector when the input has zero length.
    #[must_use]
    pub fn normalize(self) -> Self {
        if self.x == Fx::ZERO && self.y == Fx::ZERO {
            return Self::ZERO;
        }
        let one = Fx::from_num(1);
        if self.y == Fx::ZERO {
            return Self::new(if self.x > Fx::ZERO { one } else { -one }, Fx::ZERO);
        }
        if self.x == Fx::ZERO {
            return Self::new(Fx::ZERO, if self.y > Fx::ZERO { one } else { -one });
        }

        let len = fx_sqrt(self.dot(self));
        if len == Fx::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// Rotate the vector by an angle given as a precomputed (cos, sin) pair.
    ///
    /// Steering only ever rotates by a handful of fixed headings, so the
    /// trigonometry is evaluated once at the call site and passed in.
    #[must_use]
    pub fn rotated(self, cos: Fx, sin: Fx) -> Self {
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    /// Check whether the vector is shorter than the given length.
    ///
    /// Compares squared lengths, so no sqrt is taken.
    #[must_use]
    pub fn is_shorter_than(self, len: Fx) -> bool {
        self.length_squared() < len * len
    }
}

impl std::ops::Add for Vec2Fx {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fx {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Neg for Vec2Fx {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

/// Computes the square root of a fixed-point number using binary search.
///
/// This is deterministic and avoids overflow issues.
#[must_use]
pub fn fx_sqrt(value: Fx) -> Fx {
    if value <= Fx::ZERO {
        return Fx::ZERO;
    }

    let mut low = Fx::ZERO;
    let mut high = if value > Fx::from_num(1) {
        value
    } else {
        Fx::from_num(1)
    };

    // 32 iterations gives us good precision for I32F32
    for _ in 0..32 {
        let mid = (low + high) / Fx::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

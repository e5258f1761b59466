//! Fixed-point math utilities for deterministic simulation.
//!
//! All simulation math uses fixed-point arithmetic so that two machines
//! running the same orders reach bit-identical states. This includes the
//! trigonometry used for facing, homing projectiles and formations, which
//! is implemented here with polynomial series instead of `f32::sin` and
//! friends.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for fixed-point numbers written as plain decimals.
///
/// Used by hand-edited RON files (unit templates, tuning, scenarios) so that
/// `range: 4.5` reads naturally. The decimal is converted once at load time;
/// the simulation itself never touches floats.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_num::<f64>())
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(raw)
            .ok_or_else(|| de::Error::custom(format!("value {raw} out of fixed-point range")))
    }
}

/// Serde support for points written as `(x, y)` decimal tuples.
pub mod vec2_decimal {
    use super::{Fixed, Vec2Fixed};
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a vector as an `(x, y)` decimal tuple.
    pub fn serialize<S>(value: &Vec2Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (value.x.to_num::<f64>(), value.y.to_num::<f64>()).serialize(serializer)
    }

    /// Deserialize a vector from an `(x, y)` decimal tuple.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec2Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (x, y) = <(f64, f64)>::deserialize(deserializer)?;
        match (Fixed::checked_from_num(x), Fixed::checked_from_num(y)) {
            (Some(x), Some(y)) => Ok(Vec2Fixed::new(x, y)),
            _ => Err(de::Error::custom(format!(
                "point ({x}, {y}) out of fixed-point range"
            ))),
        }
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Create a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Unit vector pointing along `angle` (radians, counter-clockwise from +X).
    #[must_use]
    pub fn from_angle(angle: Fixed) -> Self {
        Self::new(cos(angle), sin(angle))
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    ///
    /// Saturates at [`Fixed::MAX`] for points more than ~46,000 units apart.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x.saturating_sub(other.x);
        let dy = self.y.saturating_sub(other.y);
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        Self::new(self.x.saturating_sub(other.x), self.y.saturating_sub(other.y)).length()
    }

    /// Length of the vector.
    #[must_use]
    pub fn length(self) -> Fixed {
        // Long vectors are measured at reduced scale so the square stays representable.
        let largest = self.x.abs().max(self.y.abs());
        if largest > LARGE_COMPONENT {
            let unit = Self::new(self.x / largest, self.y / largest);
            return largest.saturating_mul(fixed_sqrt(unit.dot(unit)));
        }
        fixed_sqrt(self.dot(self))
    }

    /// Dot product of two vectors, saturating on overflow.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x
            .saturating_mul(other.x)
            .saturating_add(self.y.saturating_mul(other.y))
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// The vector rotated 90 degrees counter-clockwise.
    #[must_use]
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Heading of the vector in radians, in (-π, π]. Zero vector yields 0.
    #[must_use]
    pub fn angle(self) -> Fixed {
        atan2(self.y, self.x)
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let largest = self.x.abs().max(self.y.abs());
        if largest > LARGE_COMPONENT {
            return Self::new(self.x / largest, self.y / largest).normalize();
        }

        let len_sq = self.dot(self);

        if len_sq == Fixed::ZERO {
            return Self::ZERO;
        }

        let len = fixed_sqrt(len_sq);
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// Move toward `target` by at most `max_step` without overshooting.
    #[must_use]
    pub fn step_toward(self, target: Self, max_step: Fixed) -> Self {
        let remaining = self.distance(target);
        if remaining <= max_step || remaining == Fixed::ZERO {
            return target;
        }
        self + (target - self).normalize().scale(max_step)
    }
}

/// Components above this are rescaled before squaring.
const LARGE_COMPONENT: Fixed = Fixed::from_bits(16_384_i64 << 32);

/// Full turn in radians, derived from [`Fixed::PI`] so that `-π + TAU == π` exactly.
pub const TAU: Fixed = Fixed::from_bits(Fixed::PI.to_bits() * 2);

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    // Keep `high * high > value` from the start so exact roots are reachable.
    let mut low = Fixed::ZERO;
    let mut high = value.max(Fixed::ONE).saturating_add(Fixed::ONE);

    // 64 halvings cover the full 64-bit representation.
    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Wrap an angle into (-π, π].
#[must_use]
pub fn wrap_angle(angle: Fixed) -> Fixed {
    let mut a = angle % TAU;
    if a > Fixed::PI {
        a -= TAU;
    } else if a <= -Fixed::PI {
        a += TAU;
    }
    a
}

/// Signed smallest difference `to - from`, wrapped into (-π, π].
#[must_use]
pub fn angle_difference(from: Fixed, to: Fixed) -> Fixed {
    wrap_angle(to - from)
}

/// Turn `current` toward `desired` by at most `max_step` radians.
///
/// The result is always wrapped into (-π, π].
#[must_use]
pub fn rotate_toward(current: Fixed, desired: Fixed, max_step: Fixed) -> Fixed {
    let diff = angle_difference(current, desired);
    if diff.abs() <= max_step {
        return wrap_angle(desired);
    }
    if diff > Fixed::ZERO {
        wrap_angle(current + max_step)
    } else {
        wrap_angle(current - max_step)
    }
}

/// Sine via a 9th-order Taylor series after reducing into [-π/2, π/2].
#[must_use]
pub fn sin(angle: Fixed) -> Fixed {
    let mut x = wrap_angle(angle);
    if x > Fixed::FRAC_PI_2 {
        x = Fixed::PI - x;
    } else if x < -Fixed::FRAC_PI_2 {
        x = -Fixed::PI - x;
    }

    let x2 = x * x;
    let x3 = x2 * x;
    let x5 = x3 * x2;
    let x7 = x5 * x2;
    let x9 = x7 * x2;

    x - x3 / Fixed::from_num(6) + x5 / Fixed::from_num(120) - x7 / Fixed::from_num(5040)
        + x9 / Fixed::from_num(362_880)
}

/// Cosine, defined through [`sin`].
#[must_use]
pub fn cos(angle: Fixed) -> Fixed {
    sin(angle + Fixed::FRAC_PI_2)
}

/// Arctangent of `t` for |t| <= tan(π/12), odd series to the 9th power.
fn atan_small(t: Fixed) -> Fixed {
    let t2 = t * t;
    let t3 = t2 * t;
    let t5 = t3 * t2;
    let t7 = t5 * t2;
    let t9 = t7 * t2;
    t - t3 / Fixed::from_num(3) + t5 / Fixed::from_num(5) - t7 / Fixed::from_num(7)
        + t9 / Fixed::from_num(9)
}

/// Four-quadrant arctangent, result in (-π, π].
#[must_use]
pub fn atan2(y: Fixed, x: Fixed) -> Fixed {
    if x == Fixed::ZERO && y == Fixed::ZERO {
        return Fixed::ZERO;
    }

    let ax = x.abs();
    let ay = y.abs();
    let (num, den) = if ay > ax { (ax, ay) } else { (ay, ax) };
    let ratio = num / den;

    // tan(π/12) = 2 - √3
    let tan_pi_12 = Fixed::from_num(2) - Fixed::SQRT_3;
    let mut angle = if ratio > tan_pi_12 {
        let shifted = (ratio * Fixed::SQRT_3 - Fixed::ONE) / (ratio + Fixed::SQRT_3);
        Fixed::FRAC_PI_6 + atan_small(shifted)
    } else {
        atan_small(ratio)
    };

    if ay > ax {
        angle = Fixed::FRAC_PI_2 - angle;
    }
    if x < Fixed::ZERO {
        angle = Fixed::PI - angle;
    }
    if y < Fixed::ZERO {
        angle = -angle;
    }
    angle
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Neg for Vec2Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

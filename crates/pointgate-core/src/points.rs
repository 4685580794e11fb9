//! ============================================================================
//! Points - Half-step balance arithmetic
//! ============================================================================
//! The ledger balance moves in 0.5-point steps and can never go negative.
//! `Points` stores the balance as an integer count of half-points, so both
//! invariants hold by construction and no float rounding leaks into storage.
//! ============================================================================

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Non-negative point balance in half-point units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Points(u32);

impl Points {
    pub const ZERO: Points = Points(0);

    /// Build from whole points (e.g. `from_whole(5)` is 5.0 points).
    pub const fn from_whole(points: u32) -> Self {
        Points(points.saturating_mul(2))
    }

    /// Build from half-point units (e.g. `from_halves(1)` is 0.5 points).
    pub const fn from_halves(halves: u32) -> Self {
        Points(halves)
    }

    /// Convert an arbitrary number to the nearest non-negative half step.
    pub fn from_f64_lossy(value: f64) -> Self {
        if !value.is_finite() {
            return Points::ZERO;
        }
        let halves = (value * 2.0).round().clamp(0.0, u32::MAX as f64);
        Points(halves as u32)
    }

    pub const fn halves(self) -> u32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 2.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Add, clamping at the representable maximum.
    pub fn saturating_add(self, rhs: Points) -> Points {
        Points(self.0.saturating_add(rhs.0))
    }

    /// Subtract, clamping at zero.
    pub fn saturating_sub(self, rhs: Points) -> Points {
        Points(self.0.saturating_sub(rhs.0))
    }

    /// Multiply by a day count, clamping at the representable maximum.
    pub fn saturating_mul(self, factor: u32) -> Points {
        Points(self.0.saturating_mul(factor))
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 2 == 0 {
            write!(f, "{}", self.0 / 2)
        } else {
            write!(f, "{:.1}", self.as_f64())
        }
    }
}

// Persisted and wire representation is the fractional number itself
// (e.g. 19.5), matching what callers display.
impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Points {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(Points::from_f64_lossy(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_step_construction() {
        assert_eq!(Points::from_whole(5).as_f64(), 5.0);
        assert_eq!(Points::from_halves(1).as_f64(), 0.5);
        assert_eq!(Points::from_halves(41).as_f64(), 20.5);
    }

    #[test]
    fn test_from_f64_rounds_to_nearest_half() {
        assert_eq!(Points::from_f64_lossy(1.3), Points::from_halves(3)); // 1.5
        assert_eq!(Points::from_f64_lossy(1.2), Points::from_halves(2)); // 1.0
        assert_eq!(Points::from_f64_lossy(0.25), Points::from_halves(1)); // 0.5
        assert_eq!(Points::from_f64_lossy(20.0), Points::from_whole(20));
    }

    #[test]
    fn test_from_f64_clamps_negative_and_non_finite() {
        assert_eq!(Points::from_f64_lossy(-3.0), Points::ZERO);
        assert_eq!(Points::from_f64_lossy(f64::NAN), Points::ZERO);
        assert_eq!(Points::from_f64_lossy(f64::INFINITY), Points::ZERO);
    }

    #[test]
    fn test_saturating_sub_floors_at_zero() {
        let balance = Points::from_whole(3);
        assert_eq!(balance.saturating_sub(Points::from_whole(5)), Points::ZERO);
        assert_eq!(
            balance.saturating_sub(Points::from_halves(1)),
            Points::from_halves(5)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Points::from_whole(20).to_string(), "20");
        assert_eq!(Points::from_halves(41).to_string(), "20.5");
        assert_eq!(Points::ZERO.to_string(), "0");
    }

    #[test]
    fn test_serde_roundtrip() {
        let p = Points::from_halves(39); // 19.5
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "19.5");
        let back: Points = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}

//! Planar geometry helpers
//!
//! The world is two-dimensional. Angles are radians, wrapped to `[-PI, PI]`
//! whenever they are compared or corrected.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::{Add, Sub};

/// A 2D vector / point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    /// The zero vector
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    /// Create a new vector
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Straight-line distance to another point
    pub fn distance_to(&self, other: Vec2) -> f64 {
        (other - *self).length()
    }

    /// Unit vector in the same direction, or zero if this is the zero vector
    pub fn normalized(&self) -> Vec2 {
        let len = self.length();
        if len == 0.0 {
            Vec2::ZERO
        } else {
            Vec2::new(self.x / len, self.y / len)
        }
    }

    /// Scale by a factor
    pub fn scaled(&self, factor: f64) -> Vec2 {
        Vec2::new(self.x * factor, self.y * factor)
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// The visible-area bound supplied with every driving event
///
/// Used to restrict expensive updates to what the player can see and to
/// classify divergence corrections as visible or invisible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaBounds {
    /// Center of the visible area
    pub center: Vec2,
    /// Radius of the visible area
    pub radius: f64,
}

impl AreaBounds {
    /// Create a new area bound
    pub fn new(center: Vec2, radius: f64) -> Self {
        Self { center, radius }
    }

    /// An area large enough to contain any plausible world
    pub fn everything() -> Self {
        Self::new(Vec2::ZERO, f64::MAX)
    }

    /// Check whether a point lies inside the area
    pub fn contains(&self, point: Vec2) -> bool {
        self.center.distance_to(point) <= self.radius
    }
}

/// Wrap an angle into `[-PI, PI]`
pub fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Signed shortest angular distance from `from` to `to`, in `[-PI, PI]`
pub fn angular_distance(from: f64, to: f64) -> f64 {
    wrap_angle(to - from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_distance() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(3.0, 4.0);
        assert_eq!(a.distance_to(b), 5.0);
    }

    #[test]
    fn test_vec2_normalized() {
        let v = Vec2::new(0.0, 10.0).normalized();
        assert!((v.y - 1.0).abs() < 1e-12);
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
    }

    #[test]
    fn test_area_contains() {
        let area = AreaBounds::new(Vec2::new(0.0, 0.0), 100.0);
        assert!(area.contains(Vec2::new(50.0, 50.0)));
        assert!(!area.contains(Vec2::new(100.0, 100.0)));
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap_angle(-3.0 * PI) + PI).abs() < 1e-12);
        assert_eq!(wrap_angle(0.5), 0.5);
    }

    #[test]
    fn test_angular_distance_crosses_wrap() {
        // From just below PI to just above -PI is a small positive step
        let d = angular_distance(PI - 0.1, -PI + 0.1);
        assert!((d - 0.2).abs() < 1e-12);
    }
}

//! # Geometry
//!
//! Integer positions for graph points and fixed-point positions for
//! projections onto segments.

use crate::fixed::Fixed;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Integer 2D position of a graph point.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct IVec2 {
    pub x: i32,
    pub y: i32,
}

impl IVec2 {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance, saturating at `i64::MAX`.
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> i64 {
        let dx = other.x as i128 - self.x as i128;
        let dy = other.y as i128 - self.y as i128;
        saturate(dx * dx + dy * dy)
    }

    #[must_use]
    pub const fn length_squared(self) -> i64 {
        let x = self.x as i128;
        let y = self.y as i128;
        saturate(x * x + y * y)
    }

    #[must_use]
    pub const fn dot(self, other: Self) -> i64 {
        let value = self.x as i128 * other.x as i128 + self.y as i128 * other.y as i128;
        if value < i64::MIN as i128 {
            i64::MIN
        } else {
            saturate(value)
        }
    }
}

const fn saturate(value: i128) -> i64 {
    if value > i64::MAX as i128 {
        i64::MAX
    } else {
        value as i64
    }
}

impl Add for IVec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x.saturating_add(rhs.x), self.y.saturating_add(rhs.y))
    }
}

impl Sub for IVec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

/// Fixed-point 2D position.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct FVec2 {
    pub x: Fixed,
    pub y: Fixed,
}

impl FVec2 {
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    #[must_use]
    pub fn length_squared(self) -> Fixed {
        self.dot(self)
    }

    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        (other - self).length_squared()
    }
}

impl From<IVec2> for FVec2 {
    fn from(v: IVec2) -> Self {
        Self::new(Fixed::from(v.x), Fixed::from(v.y))
    }
}

impl Add for FVec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for FVec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<Fixed> for FVec2 {
    type Output = Self;

    fn mul(self, rhs: Fixed) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Closest position to `point` on the segment `a`-`b`.
///
/// The projection parameter is clamped to the segment endpoints; a degenerate
/// segment collapses to `a`. The direction and dot product are widened to
/// `i128`, so endpoints anywhere in the `i32` range can't overflow.
#[must_use]
pub fn closest_point_to_segment(point: FVec2, a: IVec2, b: IVec2) -> FVec2 {
    let start = FVec2::from(a);
    let dx = i128::from(b.x) - i128::from(a.x);
    let dy = i128::from(b.y) - i128::from(a.y);
    let l2 = dx * dx + dy * dy;
    if l2 == 0 {
        return start;
    }

    let (sx, sy) = (i128::from(start.x.raw()), i128::from(start.y.raw()));
    let px = i128::from(point.x.raw()) - sx;
    let py = i128::from(point.y.raw()) - sy;
    // Raw 48.16 projection parameter.
    let d = (dx * px + dy * py) / l2;

    if d <= 0 {
        start
    } else if d >= i128::from(Fixed::ONE.raw()) {
        FVec2::from(b)
    } else {
        FVec2::new(
            Fixed::from_raw(saturate(sx + dx * d)),
            Fixed::from_raw(saturate(sy + dy * d)),
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

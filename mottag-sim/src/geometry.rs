//! Planar geometry: points, antennas and the motion boundary

use std::ops::{Add, Mul, Sub};

use mottag_common::Error;
use serde::{Deserialize, Serialize};

/// 2D point or vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point2 {
    /// Creates a new point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Origin
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Vector magnitude
    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Linear interpolation: `self` at `t = 0`, `other` at `t = 1`
    pub fn lerp(&self, other: &Point2, t: f64) -> Point2 {
        Point2::new(
            self.x * (1.0 - t) + other.x * t,
            self.y * (1.0 - t) + other.y * t,
        )
    }

    /// Arithmetic mean of a set of points; `None` when empty
    pub fn centroid<'a, I>(points: I) -> Option<Point2>
    where
        I: IntoIterator<Item = &'a Point2>,
    {
        let (sum, n) = points
            .into_iter()
            .fold((Point2::zero(), 0usize), |(acc, n), p| (acc + *p, n + 1));
        (n > 0).then(|| sum * (1.0 / n as f64))
    }

    /// True if both coordinates are finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point2 {
    type Output = Point2;

    fn add(self, rhs: Point2) -> Point2 {
        Point2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2 {
    type Output = Point2;

    fn sub(self, rhs: Point2) -> Point2 {
        Point2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point2 {
    type Output = Point2;

    fn mul(self, rhs: f64) -> Point2 {
        Point2::new(self.x * rhs, self.y * rhs)
    }
}

impl From<[f64; 2]> for Point2 {
    fn from([x, y]: [f64; 2]) -> Self {
        Point2::new(x, y)
    }
}

/// Fixed receiver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Antenna {
    /// 0-based index in configuration order
    pub id: usize,
    /// Location
    pub position: Point2,
}

impl Antenna {
    /// Creates a new antenna
    pub fn new(id: usize, position: Point2) -> Self {
        Self { id, position }
    }
}

/// Axis-aligned rectangle the target moves in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum x
    pub xmin: f64,
    /// Maximum x
    pub xmax: f64,
    /// Minimum y
    pub ymin: f64,
    /// Maximum y
    pub ymax: f64,
}

impl Bounds {
    /// Bounding rectangle of the antenna positions, with no margin.
    pub fn from_antennas(antennas: &[Antenna]) -> Result<Self, Error> {
        let first = antennas
            .first()
            .ok_or_else(|| Error::Config("cannot derive bounds from zero antennas".into()))?;
        let init = Bounds {
            xmin: first.position.x,
            xmax: first.position.x,
            ymin: first.position.y,
            ymax: first.position.y,
        };
        Ok(antennas.iter().skip(1).fold(init, |b, a| Bounds {
            xmin: b.xmin.min(a.position.x),
            xmax: b.xmax.max(a.position.x),
            ymin: b.ymin.min(a.position.y),
            ymax: b.ymax.max(a.position.y),
        }))
    }

    /// Width along x
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Height along y
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Center of the rectangle
    pub fn center(&self) -> Point2 {
        Point2::new((self.xmin + self.xmax) / 2.0, (self.ymin + self.ymax) / 2.0)
    }

    /// True if the rectangle collapses to a line or a point
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0.0 || self.height() == 0.0
    }

    /// Inclusive containment test
    pub fn contains(&self, p: Point2) -> bool {
        p.x >= self.xmin && p.x <= self.xmax && p.y >= self.ymin && p.y <= self.ymax
    }

    /// Reflects a position that left the rectangle back inside.
    ///
    /// Each axis is handled independently: the overshoot is mirrored about
    /// the crossed wall and the velocity on that axis is forced to point back
    /// inward. A final clamp covers overshoots larger than the rectangle
    /// itself, including the degenerate `min == max` case.
    pub fn reflect(&self, position: Point2, velocity: Point2) -> (Point2, Point2) {
        let (x, vx) = reflect_axis(position.x, velocity.x, self.xmin, self.xmax);
        let (y, vy) = reflect_axis(position.y, velocity.y, self.ymin, self.ymax);
        (Point2::new(x, y), Point2::new(vx, vy))
    }
}

fn reflect_axis(mut coord: f64, mut vel: f64, min: f64, max: f64) -> (f64, f64) {
    if coord < min {
        coord = min + (min - coord);
        vel = vel.abs();
    } else if coord > max {
        coord = max - (coord - max);
        vel = -vel.abs();
    }
    (coord.clamp(min, max), vel)
}

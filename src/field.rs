use serde::{Deserialize, Serialize};

/// Integer position on the field
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(self, other: Point) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

/// Field dimensions. Valid positions satisfy `0 <= x < width`, `0 <= y < height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0
            && p.y >= 0
            && i64::from(p.x) < i64::from(self.width)
            && i64::from(p.y) < i64::from(self.height)
    }

    pub fn out_of_bounds(&self, p: Point) -> bool {
        !self.contains(p)
    }
}

/// Square goal region of side `2 * radius + 1`, inclusive on every edge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub center: Point,
    pub radius: u32,
}

impl Goal {
    pub fn new(center_x: i32, center_y: i32, radius: u32) -> Self {
        Self {
            center: Point::new(center_x, center_y),
            radius,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        let r = i64::from(self.radius);
        (i64::from(p.x) - i64::from(self.center.x)).abs() <= r
            && (i64::from(p.y) - i64::from(self.center.y)).abs() <= r
    }

    /// Whether every cell of the goal square lies inside `bounds`
    pub fn fits_within(&self, bounds: &Bounds) -> bool {
        let r = i64::from(self.radius);
        let (cx, cy) = (i64::from(self.center.x), i64::from(self.center.y));
        cx - r >= 0
            && cy - r >= 0
            && cx + r < i64::from(bounds.width)
            && cy + r < i64::from(bounds.height)
    }

    pub fn distance_from(&self, p: Point) -> f64 {
        p.distance(self.center)
    }
}

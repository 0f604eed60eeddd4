//! Board-space geometry: quadrant classification and clamping.
//!
//! All values are in board units with the origin at the board's top-left corner.

use crate::model::Quadrant;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }

    pub fn offset_from(self, origin: Point) -> Point {
        Point::new(self.x - origin.x, self.y - origin.y)
    }
}

/// Measured size of the board container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    /// Returns `None` when the container has no usable layout (zero, negative or
    /// non-finite size), e.g. before the board is drawn.
    pub fn measured(width: f32, height: f32) -> Option<Bounds> {
        let usable = |v: f32| v.is_finite() && v > 0.0;
        if usable(width) && usable(height) {
            Some(Bounds { width, height })
        } else {
            None
        }
    }

    pub fn mid_x(&self) -> f32 {
        self.width / 2.0
    }

    pub fn mid_y(&self) -> f32 {
        self.height / 2.0
    }
}

/// Size of an item's rendered box, assumed for clamping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub width: f32,
    pub height: f32,
}

impl Default for Footprint {
    fn default() -> Self {
        Footprint {
            width: 100.0,
            height: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Region {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Clamps a top-left corner so the whole footprint stays inside the region.
    /// A footprint larger than the region pins the item to the region's origin.
    pub fn clamp_item(&self, candidate: Point, footprint: Footprint) -> Point {
        let max_x = (self.right() - footprint.width).max(self.x);
        let max_y = (self.bottom() - footprint.height).max(self.y);
        Point::new(
            clamp_axis(candidate.x, self.x, max_x),
            clamp_axis(candidate.y, self.y, max_y),
        )
    }
}

// f32::clamp passes NaN through; positions must stay finite.
fn clamp_axis(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        min
    } else {
        value.max(min).min(max)
    }
}

/// Maps a board point to its quadrant. Points on the vertical midline belong to the
/// right half, points on the horizontal midline to the bottom half.
pub fn classify(point: Point, bounds: Bounds) -> Quadrant {
    let left = point.x < bounds.mid_x();
    let top = point.y < bounds.mid_y();
    match (left, top) {
        (true, true) => Quadrant::A,
        (false, true) => Quadrant::B,
        (false, false) => Quadrant::C,
        (true, false) => Quadrant::D,
    }
}

pub fn sub_rect(quadrant: Quadrant, bounds: Bounds) -> Region {
    let (mid_x, mid_y) = (bounds.mid_x(), bounds.mid_y());
    let (x, width) = match quadrant {
        Quadrant::A | Quadrant::D => (0.0, mid_x),
        Quadrant::B | Quadrant::C => (mid_x, bounds.width - mid_x),
    };
    let (y, height) = match quadrant {
        Quadrant::A | Quadrant::B => (0.0, mid_y),
        Quadrant::C | Quadrant::D => (mid_y, bounds.height - mid_y),
    };
    Region {
        x,
        y,
        width,
        height,
    }
}

//! Axis-aligned rectangle geometry.
//!
//! Everything in snapdock is expressed in integer desktop pixels.  A
//! [`Rect`] is half-open: `right()` and `bottom()` are the first pixel
//! *outside* the rectangle, so two rectangles touch with zero gap when
//! `a.right() == b.left()`.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A rectangle on the virtual desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Coordinate of the given edge.
    pub fn edge(&self, side: Side) -> i32 {
        match side {
            Side::Left => self.left(),
            Side::Right => self.right(),
            Side::Top => self.top(),
            Side::Bottom => self.bottom(),
        }
    }

    /// `(lo, hi)` extent along `axis`.
    pub fn span(&self, axis: Axis) -> (i32, i32) {
        match axis {
            Axis::Horizontal => (self.left(), self.right()),
            Axis::Vertical => (self.top(), self.bottom()),
        }
    }

    /// Length along `axis`.
    pub fn len(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    /// Return a copy whose extent along `axis` is `[lo, hi)`.
    pub fn with_span(&self, axis: Axis, lo: i32, hi: i32) -> Rect {
        match axis {
            Axis::Horizontal => Rect::new(lo, self.y, hi - lo, self.height),
            Axis::Vertical => Rect::new(self.x, lo, self.width, hi - lo),
        }
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Same size, origin moved to `(x, y)`.
    pub fn at(&self, x: i32, y: i32) -> Rect {
        Rect::new(x, y, self.width, self.height)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Length of the overlap of the two rectangles projected on `axis`.
    /// Negative when the projections are disjoint.
    pub fn overlap(&self, other: &Rect, axis: Axis) -> i32 {
        let (a_lo, a_hi) = self.span(axis);
        let (b_lo, b_hi) = other.span(axis);
        a_hi.min(b_hi) - a_lo.max(b_lo)
    }

    /// Whether the two rectangles share a region of positive area.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.overlap(other, Axis::Horizontal) > 0 && self.overlap(other, Axis::Vertical) > 0
    }

    /// Whether `other` lies entirely within `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.right() <= self.right()
            && other.top() >= self.top()
            && other.bottom() <= self.bottom()
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.left() && p.x < self.right() && p.y >= self.top() && p.y < self.bottom()
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }

    /// Signed distance from `self`'s `side` edge to the facing edge of
    /// `other`.  Zero means touching, negative means the two overlap across
    /// that edge.
    pub fn gap_to(&self, other: &Rect, side: Side) -> i32 {
        match side {
            Side::Left => self.left() - other.right(),
            Side::Right => other.left() - self.right(),
            Side::Top => self.top() - other.bottom(),
            Side::Bottom => other.top() - self.bottom(),
        }
    }

    /// Whether `other` touches `self` on `side` with zero gap and a
    /// positive overlap on the perpendicular axis.
    pub fn is_adjacent(&self, other: &Rect, side: Side) -> bool {
        self.gap_to(other, side) == 0 && self.overlap(other, side.axis().perpendicular()) > 0
    }

    /// The side of `self` on which `other` is adjacent, if any.
    pub fn adjacency(&self, other: &Rect) -> Option<Side> {
        Side::ALL.into_iter().find(|&side| self.is_adjacent(other, side))
    }
}

/// A pointer position on the virtual desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Bounding rectangle of a non-empty set of rectangles.
pub fn bounding_rect<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
    rects.into_iter().copied().reduce(|acc, r| acc.union(&r))
}

/// The two axes of the desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn perpendicular(self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }

    /// The `(near, far)` sides whose edges move along this axis.
    pub fn sides(self) -> (Side, Side) {
        match self {
            Axis::Horizontal => (Side::Left, Side::Right),
            Axis::Vertical => (Side::Top, Side::Bottom),
        }
    }
}

/// One of the four cardinal sides of a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Left, Side::Right, Side::Top, Side::Bottom];

    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
        }
    }

    /// The axis along which this side's edge moves.
    pub fn axis(self) -> Axis {
        match self {
            Side::Left | Side::Right => Axis::Horizontal,
            Side::Top | Side::Bottom => Axis::Vertical,
        }
    }

    /// Whether this is the high-coordinate side of its axis.
    pub fn is_far(self) -> bool {
        matches!(self, Side::Right | Side::Bottom)
    }

    /// Unit step `(dx, dy)` pointing out of the rectangle through this side.
    pub fn outward(self) -> (i32, i32) {
        match self {
            Side::Left => (-1, 0),
            Side::Right => (1, 0),
            Side::Top => (0, -1),
            Side::Bottom => (0, 1),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
            Side::Top => write!(f, "top"),
            Side::Bottom => write!(f, "bottom"),
        }
    }
}

/// Parse a side name (case-insensitive; accepts "up"/"down" as aliases).
fn parse_side(s: &str) -> Option<Side> {
    match s.trim().to_lowercase().as_str() {
        "left" => Some(Side::Left),
        "right" => Some(Side::Right),
        "top" | "up" => Some(Side::Top),
        "bottom" | "down" => Some(Side::Bottom),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Side {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_side(&s).ok_or_else(|| DeError::custom(format!("invalid side: {:?}", s)))
    }
}

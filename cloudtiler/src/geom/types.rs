//! Bounding box type definitions.

use std::fmt;
use thiserror::Error;

/// Errors produced when constructing geometry primitives.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeomError {
    /// Box edges are inverted or not finite
    #[error("degenerate bounding box: min=({min_x}, {min_y}) max=({max_x}, {max_y})")]
    DegenerateBBox {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },
}

/// An axis-aligned bounding box in catalog coordinates.
///
/// Used for per-file extents, the total catalog extent, tile core regions
/// and buffered read regions. Edges are inclusive on the min side and
/// treated as exclusive on the max side when assigning grid cells, so
/// adjacent tiles never both own a shared edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    /// West edge
    pub min_x: f64,
    /// South edge
    pub min_y: f64,
    /// East edge
    pub max_x: f64,
    /// North edge
    pub max_y: f64,
}

impl BBox {
    /// Create a bounding box, validating that edges are finite and ordered.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, GeomError> {
        let finite = min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite();
        if !finite || min_x > max_x || min_y > max_y {
            return Err(GeomError::DegenerateBBox {
                min_x,
                min_y,
                max_x,
                max_y,
            });
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Width of the box (east-west span).
    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the box (north-south span).
    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Area of the box in squared catalog units.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Center point of the box.
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Expand the box by `margin` on all four sides.
    ///
    /// A zero margin returns the box unchanged. The result may extend past
    /// any enclosing extent; callers that need clipping apply
    /// [`BBox::clipped_to`] afterwards.
    #[must_use]
    pub fn buffered(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }

    /// Shrink the box by `margin` on all four sides, collapsing to the
    /// center line when the margin exceeds half the span.
    #[must_use]
    pub fn shrunk(&self, margin: f64) -> Self {
        let (cx, cy) = self.center();
        Self {
            min_x: (self.min_x + margin).min(cx),
            min_y: (self.min_y + margin).min(cy),
            max_x: (self.max_x - margin).max(cx),
            max_y: (self.max_y - margin).max(cy),
        }
    }

    /// Clamp the box to `other`, returning the intersection.
    ///
    /// Returns `None` when the boxes do not intersect.
    pub fn clipped_to(&self, other: &BBox) -> Option<Self> {
        let min_x = self.min_x.max(other.min_x);
        let min_y = self.min_y.max(other.min_y);
        let max_x = self.max_x.min(other.max_x);
        let max_y = self.max_y.min(other.max_y);
        if min_x > max_x || min_y > max_y {
            return None;
        }
        Some(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Whether the two boxes share any area (touching edges count).
    #[inline]
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Whether a point lies inside the box (edges inclusive).
    #[inline]
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Smallest box enclosing both inputs.
    #[must_use]
    pub fn union(&self, other: &BBox) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

impl fmt::Display for BBox {
    /// Format as `[min_x, max_x] x [min_y, max_y]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] x [{}, {}]",
            self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}

use std::fmt;

/// A point in surface-local coordinates
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    /// horizontal coordinate
    pub x: i32,
    /// vertical coordinate
    pub y: i32,
}

impl From<(i32, i32)> for Point {
    #[inline]
    fn from((x, y): (i32, i32)) -> Self {
        Point { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A size, as requested by a client
///
/// Zero in a dimension means "unconstrained" for size limits, and "let the client
/// decide" for configures. Negative values are stored as received.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    /// width
    pub w: i32,
    /// height
    pub h: i32,
}

impl From<(i32, i32)> for Size {
    #[inline]
    fn from((w, h): (i32, i32)) -> Self {
        Size { w, h }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// A rectangle defined by its top-left corner and dimensions
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rectangle {
    /// Location of the top-left corner of the rectangle
    pub loc: Point,
    /// Size of the rectangle, as (width, height)
    pub size: Size,
}

impl Rectangle {
    /// Create a new [`Rectangle`] from the coordinates of its top-left corner and its dimensions
    #[inline]
    pub fn from_loc_and_size(loc: impl Into<Point>, size: impl Into<Size>) -> Self {
        Rectangle {
            loc: loc.into(),
            size: size.into(),
        }
    }

    /// Whether this rectangle covers no area
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size.w <= 0 || self.size.h <= 0
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.size, self.loc)
    }
}

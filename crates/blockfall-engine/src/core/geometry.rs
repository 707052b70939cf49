use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle of cells in field coordinates.
///
/// `x`/`y` may be negative: a piece above the visible field still has an area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CellRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl CellRect {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Smallest rectangle covering both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::new(x, y, right - x, bottom - y)
    }

    /// Grows the rectangle by `n` cells on every side.
    #[must_use]
    pub const fn inflate(&self, n: i32) -> Self {
        Self::new(self.x - n, self.y - n, self.width + 2 * n, self.height + 2 * n)
    }

    /// Part of the rectangle inside `bounds`, or `None` if they do not overlap.
    #[must_use]
    pub fn intersection(&self, bounds: &Self) -> Option<Self> {
        let x = self.x.max(bounds.x);
        let y = self.y.max(bounds.y);
        let right = self.right().min(bounds.right());
        let bottom = self.bottom().min(bounds.bottom());
        let rect = Self::new(x, y, right - x, bottom - y);
        (!rect.is_empty()).then_some(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_covers_both() {
        let a = CellRect::new(0, 0, 2, 2);
        let b = CellRect::new(3, -1, 1, 4);
        let u = a.union(&b);
        assert_eq!(u, CellRect::new(0, -1, 4, 4));
        assert_eq!(u, b.union(&a));
    }

    #[test]
    fn test_union_with_empty() {
        let a = CellRect::new(1, 1, 2, 3);
        assert_eq!(a.union(&CellRect::default()), a);
        assert_eq!(CellRect::default().union(&a), a);
    }

    #[test]
    fn test_inflate() {
        let r = CellRect::new(2, 2, 1, 1).inflate(1);
        assert_eq!(r, CellRect::new(1, 1, 3, 3));
        assert_eq!((r.right(), r.bottom()), (4, 4));
    }

    #[test]
    fn test_intersection() {
        let bounds = CellRect::new(0, 0, 10, 20);
        let above = CellRect::new(3, -2, 3, 3);
        assert_eq!(above.intersection(&bounds), Some(CellRect::new(3, 0, 3, 1)));
        assert_eq!(CellRect::new(3, -5, 3, 3).intersection(&bounds), None);
    }
}

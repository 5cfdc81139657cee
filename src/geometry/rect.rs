use super::PixelPoint;

/// Integer pixel rectangle, half-open: `[min_x, max_x) x [min_y, max_y)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

impl PixelRect {
    /// Rectangle spanning two corners given in any order
    pub fn new(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }

    /// Rectangle spanning two sub-pixel corners, each rounded to the
    /// nearest pixel
    pub fn from_corners(a: PixelPoint, b: PixelPoint) -> Self {
        Self::new(
            a.x.round() as i64,
            a.y.round() as i64,
            b.x.round() as i64,
            b.y.round() as i64,
        )
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i64, height as i64)
    }

    pub fn width(&self) -> i64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> i64 {
        self.max_y - self.min_y
    }

    pub fn is_empty(&self) -> bool {
        self.min_x >= self.max_x || self.min_y >= self.max_y
    }

    /// Both rectangles are non-empty and share at least one pixel
    pub fn overlaps(&self, other: &PixelRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }

    pub fn intersect(&self, other: &PixelRect) -> Option<PixelRect> {
        if !self.overlaps(other) {
            return None;
        }
        Some(PixelRect {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_canonical() {
        let r = PixelRect::from_corners(PixelPoint::new(10.6, 20.4), PixelPoint::new(-3.5, 2.5));
        assert_eq!(r, PixelRect::new(-4, 3, 11, 20));
        assert_eq!(r.width(), 15);
        assert_eq!(r.height(), 17);
    }

    #[test]
    fn test_intersect() {
        let image = PixelRect::from_size(100, 50);
        let tile = PixelRect::new(80, -10, 120, 30);
        assert_eq!(image.intersect(&tile), Some(PixelRect::new(80, 0, 100, 30)));

        let outside = PixelRect::new(100, 0, 150, 50);
        assert!(!image.overlaps(&outside));
        assert_eq!(image.intersect(&outside), None);

        let empty = PixelRect::new(10, 10, 10, 40);
        assert!(empty.is_empty());
        assert!(!image.overlaps(&empty));
    }
}

use serde::{Deserialize, Serialize};

/// A position in world coordinates (projected plane, metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub easting: f64,
    pub northing: f64,
}

impl Point {
    pub fn new(easting: f64, northing: f64) -> Self {
        Self { easting, northing }
    }
}

/// Axis-aligned bounding box over world coordinates. Used both as the
/// viewport query key and as the range filter for spatial queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min_easting: f64,
    pub min_northing: f64,
    pub max_easting: f64,
    pub max_northing: f64,
}

impl Rect {
    /// Builds a rect from two opposite corners, normalizing a flipped pair.
    pub fn new(min_easting: f64, min_northing: f64, max_easting: f64, max_northing: f64) -> Self {
        Self {
            min_easting: min_easting.min(max_easting),
            min_northing: min_northing.min(max_northing),
            max_easting: min_easting.max(max_easting),
            max_northing: min_northing.max(max_northing),
        }
    }

    pub fn width(&self) -> f64 {
        self.max_easting - self.min_easting
    }

    pub fn height(&self) -> f64 {
        self.max_northing - self.min_northing
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_easting + self.max_easting) / 2.0,
            (self.min_northing + self.max_northing) / 2.0,
        )
    }

    /// Closed-interval containment test. Points on the boundary count as
    /// inside, so adjacent query rects sharing an edge both see edge points.
    pub fn contains(&self, point: Point) -> bool {
        point.easting >= self.min_easting
            && point.easting <= self.max_easting
            && point.northing >= self.min_northing
            && point.northing <= self.max_northing
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min_easting <= other.max_easting
            && self.max_easting >= other.min_easting
            && self.min_northing <= other.max_northing
            && self.max_northing >= other.min_northing
    }

    /// Smallest rect covering `self` and `point`.
    pub fn union_point(&self, point: Point) -> Rect {
        Rect {
            min_easting: self.min_easting.min(point.easting),
            min_northing: self.min_northing.min(point.northing),
            max_easting: self.max_easting.max(point.easting),
            max_northing: self.max_northing.max(point.northing),
        }
    }

    pub fn translated(&self, d_easting: f64, d_northing: f64) -> Rect {
        Rect {
            min_easting: self.min_easting + d_easting,
            min_northing: self.min_northing + d_northing,
            max_easting: self.max_easting + d_easting,
            max_northing: self.max_northing + d_northing,
        }
    }

    /// Scales the extent about the center, keeping the center fixed.
    pub fn scaled_about_center(&self, factor: f64) -> Rect {
        let center = self.center();
        let half_width = self.width() / 2.0 * factor;
        let half_height = self.height() / 2.0 * factor;
        Rect::new(
            center.easting - half_width,
            center.northing - half_height,
            center.easting + half_width,
            center.northing + half_height,
        )
    }

    /// Largest absolute corner displacement between two rects. This is the
    /// quantity the frame gate compares against the viewport tolerance.
    pub fn max_axis_delta(&self, other: &Rect) -> f64 {
        let deltas = [
            (self.min_easting - other.min_easting).abs(),
            (self.min_northing - other.min_northing).abs(),
            (self.max_easting - other.max_easting).abs(),
            (self.max_northing - other.max_northing).abs(),
        ];
        deltas.iter().fold(0.0_f64, |acc, d| acc.max(*d))
    }
}

/// Square rect of half-extent `half_extent` around `center`.
pub fn rect_around(center: Point, half_extent: f64) -> Rect {
    Rect::new(
        center.easting - half_extent,
        center.northing - half_extent,
        center.easting + half_extent,
        center.northing + half_extent,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_new_normalizes_flipped_corners() {
        let rect = Rect::new(10.0, 20.0, -10.0, -20.0);
        assert_eq!(rect.min_easting, -10.0);
        assert_eq!(rect.min_northing, -20.0);
        assert_eq!(rect.max_easting, 10.0);
        assert_eq!(rect.max_northing, 20.0);
    }

    #[test]
    fn contains_includes_boundary_points() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert!(rect.contains(Point::new(0.0, 0.0)));
        assert!(rect.contains(Point::new(100.0, 50.0)));
        assert!(rect.contains(Point::new(50.0, 25.0)));
        assert!(!rect.contains(Point::new(100.1, 25.0)));
        assert!(!rect.contains(Point::new(50.0, -0.1)));
    }

    #[test]
    fn intersects_detects_overlap_and_touch() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.intersects(&Rect::new(5.0, 5.0, 15.0, 15.0)));
        assert!(rect.intersects(&Rect::new(10.0, 0.0, 20.0, 10.0)));
        assert!(!rect.intersects(&Rect::new(10.5, 0.0, 20.0, 10.0)));
    }

    #[test]
    fn scaled_about_center_keeps_center() {
        let rect = Rect::new(0.0, 0.0, 10.0, 20.0);
        let scaled = rect.scaled_about_center(0.5);
        assert_eq!(scaled.center(), rect.center());
        assert!((scaled.width() - 5.0).abs() < 1e-9);
        assert!((scaled.height() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn max_axis_delta_reports_largest_corner_move() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let moved = rect.translated(3.0, -1.0);
        assert!((rect.max_axis_delta(&moved) - 3.0).abs() < 1e-9);
        assert_eq!(rect.max_axis_delta(&rect), 0.0);
    }
}

use std::sync::Mutex;

use crate::geometry::Rect;

/// Smallest extent a zoom-in may shrink the viewport to, in world units.
pub const ZOOM_MIN_EXTENT: f64 = 1.0;

/// Shared pan/zoom state. Mutated from the interaction path, read from the
/// render/query path; `current_bounds` hands out a consistent `Copy` value,
/// so readers never observe a torn rect.
#[derive(Debug)]
pub struct ViewportTracker {
    bounds: Mutex<Rect>,
}

impl ViewportTracker {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds: Mutex::new(bounds),
        }
    }

    pub fn current_bounds(&self) -> Rect {
        match self.bounds.lock() {
            Ok(bounds) => *bounds,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn set_bounds(&self, bounds: Rect) {
        match self.bounds.lock() {
            Ok(mut guard) => *guard = bounds,
            Err(poisoned) => *poisoned.into_inner() = bounds,
        }
    }

    /// Shifts the viewport by a world-coordinate delta.
    pub fn pan(&self, d_easting: f64, d_northing: f64) {
        let next = self.current_bounds().translated(d_easting, d_northing);
        self.set_bounds(next);
    }

    /// Scales the viewport extent about its center. Factors below 1 zoom in;
    /// the extent is clamped so repeated zoom-in cannot collapse the rect.
    pub fn zoom(&self, factor: f64) {
        let current = self.current_bounds();
        let scaled = current.scaled_about_center(factor.max(f64::MIN_POSITIVE));
        if scaled.width() < ZOOM_MIN_EXTENT || scaled.height() < ZOOM_MIN_EXTENT {
            return;
        }
        self.set_bounds(scaled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn pan_shifts_bounds() {
        let tracker = ViewportTracker::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        tracker.pan(10.0, -5.0);
        let bounds = tracker.current_bounds();
        assert_eq!(bounds.min_easting, 10.0);
        assert_eq!(bounds.min_northing, -5.0);
        assert_eq!(bounds.max_easting, 110.0);
    }

    #[test]
    fn zoom_clamps_at_minimum_extent() {
        let tracker = ViewportTracker::new(Rect::new(0.0, 0.0, 4.0, 4.0));
        tracker.zoom(0.5);
        assert_eq!(tracker.current_bounds().width(), 2.0);
        // Another halving would shrink below the minimum extent.
        tracker.zoom(0.25);
        assert_eq!(tracker.current_bounds().width(), 2.0);
    }

    #[test]
    fn concurrent_reads_see_whole_rects() {
        let tracker = Arc::new(ViewportTracker::new(Rect::new(0.0, 0.0, 100.0, 100.0)));
        let writer_tracker = tracker.clone();
        let writer = thread::spawn(move || {
            for step in 0..200 {
                // Width stays 100 in every written rect.
                let offset = step as f64;
                writer_tracker.set_bounds(Rect::new(offset, offset, offset + 100.0, offset + 100.0));
            }
        });
        for _ in 0..200 {
            let bounds = tracker.current_bounds();
            assert_eq!(bounds.width(), 100.0);
            assert_eq!(bounds.height(), 100.0);
        }
        writer.join().expect("writer thread");
    }
}

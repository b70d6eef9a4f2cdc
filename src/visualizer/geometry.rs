// SPDX-License-Identifier: MIT OR Apache-2.0

//! Polar-to-pixel geometry for the radar chart.
//!
//! Angles are radians measured clockwise from 12 o'clock, matching how
//! the chart lays out its spokes. Pixel coordinates have `y` growing
//! downwards.

use std::f64::consts::TAU;

/// Circular plot region inside the bitmap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    /// Pixel center of the polar axes.
    pub center: (f64, f64),
    /// Pixel radius of `r = 1.0`.
    pub radius: f64,
}

impl PlotArea {
    /// Exact pixel position of `(angle, r)`.
    #[must_use]
    pub fn polar_point(&self, angle: f64, r: f64) -> (f64, f64) {
        let (cx, cy) = self.center;
        let d = r * self.radius;
        (cx + d * angle.sin(), cy - d * angle.cos())
    }

    /// Pixel position of `(angle, r)`, rounded to the bitmap grid.
    ///
    /// ```
    /// use bias_radar::visualizer::PlotArea;
    ///
    /// let area = PlotArea { center: (100.0, 100.0), radius: 50.0 };
    /// assert_eq!(area.polar_to_pixel(0.0, 1.0), (100, 50));
    /// ```
    #[must_use]
    pub fn polar_to_pixel(&self, angle: f64, r: f64) -> (i32, i32) {
        to_pixel(self.polar_point(angle, r))
    }

    /// Closed pixel polyline approximating the circle of radius `r`.
    #[must_use]
    pub fn circle(&self, r: f64, segments: usize) -> Vec<(i32, i32)> {
        let segments = segments.max(3);
        (0..=segments)
            .map(|i| self.polar_to_pixel(TAU * index_fraction(i, segments), r))
            .collect()
    }
}

/// Spoke angles for `n` equally spaced categories, starting at 12 o'clock.
///
/// ```
/// let angles = bias_radar::visualizer::spoke_angles(4);
/// assert_eq!(angles.len(), 4);
/// assert!((angles[1] - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
/// ```
#[must_use]
pub fn spoke_angles(n: usize) -> Vec<f64> {
    (0..n).map(|i| TAU * index_fraction(i, n)).collect()
}

/// `i / n` as a float.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn index_fraction(i: usize, n: usize) -> f64 {
    i as f64 / n as f64
}

/// Round a float position to the pixel grid.
#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn to_pixel((x, y): (f64, f64)) -> (i32, i32) {
    (x.round() as i32, y.round() as i32)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;

    const AREA: PlotArea = PlotArea {
        center: (500.0, 500.0),
        radius: 400.0,
    };

    #[test]
    fn spokes_run_clockwise_from_twelve() {
        let angles = spoke_angles(6);
        assert_eq!(angles.len(), 6);
        assert!(angles[0].abs() < 1e-12);
        assert!((angles[3] - PI).abs() < 1e-12);

        // 12 o'clock, then 3 o'clock for a quarter turn, 6 o'clock for half.
        assert_eq!(AREA.polar_to_pixel(0.0, 1.0), (500, 100));
        assert_eq!(AREA.polar_to_pixel(PI / 2.0, 1.0), (900, 500));
        assert_eq!(AREA.polar_to_pixel(PI, 0.5), (500, 700));
    }

    #[test]
    fn zero_radius_is_center() {
        assert_eq!(AREA.polar_to_pixel(1.234, 0.0), (500, 500));
        assert!(spoke_angles(0).is_empty());
    }

    #[test]
    fn circle_is_closed() {
        let pts = AREA.circle(0.5, 12);
        assert_eq!(pts.len(), 13);
        assert_eq!(pts[0], pts[12]);
        assert_eq!(pts[0], (500, 300));
        assert_eq!(pts[3], (700, 500));
    }

    #[test]
    fn circle_points_sit_on_radius() {
        for (x, y) in AREA.circle(1.0, 360) {
            let d = f64::from(x - 500).hypot(f64::from(y - 500));
            assert!((d - 400.0).abs() <= 1.0, "({x}, {y}) is {d} from center");
        }
    }

    #[test]
    fn too_few_segments_still_closes_a_triangle() {
        let pts = AREA.circle(1.0, 1);
        assert_eq!(pts.len(), 4);
        assert_eq!(pts.first(), pts.last());
    }
}

use serde::{Deserialize, Serialize};

/// A planar point in map coordinates (longitude as `x`, latitude as `y`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Build a quadratic Bézier curve from `p0` to `p2`, sampled at `num_points`
/// evenly spaced parameters in `[0, 1]`.
///
/// The control point sits on the perpendicular bisector of the baseline,
/// offset by `curvature * |p2 - p0|`. Coincident endpoints produce the
/// straight two-point segment `[p0, p2]`.
pub fn create_arc(p0: Point, p2: Point, curvature: f64, num_points: usize) -> Vec<Point> {
    let (dx, dy) = (p2.x - p0.x, p2.y - p0.y);
    let length = (-dy).hypot(dx);
    if length == 0.0 {
        return vec![p0, p2];
    }

    let (perp_x, perp_y) = (-dy / length, dx / length);
    let offset = dx.hypot(dy) * curvature;
    let control = Point::new(
        (p0.x + p2.x) / 2.0 + perp_x * offset,
        (p0.y + p2.y) / 2.0 + perp_y * offset,
    );

    linspace(num_points)
        .map(|t| {
            let u = 1.0 - t;
            Point::new(
                u * u * p0.x + 2.0 * u * t * control.x + t * t * p2.x,
                u * u * p0.y + 2.0 * u * t * control.y + t * t * p2.y,
            )
        })
        .collect()
}

/// Total polyline length.
pub fn path_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

fn linspace(num_points: usize) -> impl Iterator<Item = f64> {
    let last = num_points.saturating_sub(1);
    (0..num_points).map(move |i| {
        if last == 0 {
            0.0
        } else {
            i as f64 / last as f64
        }
    })
}

//! 2-D point positions and ordered point sets.
//!
//! Points are star centroid positions in pixel units, produced by an external
//! star-detection step. Point sets are expected to arrive pre-sorted by
//! brightness so that truncation to the working subset keeps the brightest stars.

/// A 2-D point position in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Position along columns (image x-axis).
    pub x: f64,
    /// Position along rows (image y-axis).
    pub y: f64,
}

impl Point {
    /// Create a point from its coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Squared Euclidean distance between two points.
///
/// Squared distances preserve relative ordering while avoiding the square root,
/// so they are used for all neighbor ordering and tolerance tests.
#[inline]
pub(crate) fn dist2(p: Point, q: Point) -> f64 {
    let dx = p.x - q.x;
    let dy = p.y - q.y;
    dx * dx + dy * dy
}

/// An ordered sequence of 2-D points.
///
/// The engine never mutates a point set; the working subset is a borrowed prefix
/// of at most `max_points` entries.
#[derive(Debug, Clone, Default)]
pub struct PointSet {
    points: Vec<Point>,
}

impl PointSet {
    /// Create a point set from a vector of points.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Create a point set from `(x, y)` coordinate pairs.
    pub fn from_xy(coords: &[(f64, f64)]) -> Self {
        Self {
            points: coords.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        }
    }

    /// Number of points in the full set.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All points in input order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The working subset: the first `max_points` points in input order.
    ///
    /// Callers pre-sort by brightness, so truncation keeps the brightest stars.
    pub fn working(&self, max_points: usize) -> &[Point] {
        let n = self.points.len().min(max_points);
        &self.points[..n]
    }
}

/// Fill `out` with the indices of all points except those in `exclude`, sorted
/// ascending by squared distance to `center`, ties broken by original index.
///
/// The center need not be a member of the set (the standard strategy centers on
/// a pair midpoint). The ordering is rebuilt whenever the center changes; the
/// buffers are reused across seeds but never mutated in place while a growth
/// pass is reading them.
pub(crate) fn neighbor_order(
    points: &[Point],
    center: Point,
    exclude: &[usize],
    out: &mut Vec<usize>,
    scratch: &mut Vec<(f64, usize)>,
) {
    scratch.clear();
    for (i, &p) in points.iter().enumerate() {
        if exclude.contains(&i) {
            continue;
        }
        scratch.push((dist2(p, center), i));
    }
    scratch.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });
    out.clear();
    out.extend(scratch.iter().map(|&(_, i)| i));
}

//! The small weighted linear solve producing the 4 similarity parameters.
//!
//! Correspondence pairs are accumulated into moment sums over zoom-scaled
//! reference coordinates; the resulting 4×4 symmetric normal-equations system
//! is solved by Cholesky decomposition. The zoom prior preconditions the system
//! so that the fitted linear part has near-unit norm, which both keeps the
//! factorization well-scaled and gives the post-fit sanity check its meaning.
//!
//! The solve runs in f64 throughout; this is the numerically delicate step of
//! the whole engine.

use nalgebra::{Matrix4, Vector4};

use crate::point::Point;
use crate::transform::SimilarityTransform;

use super::MatchError;

/// Allowed deviation of the preconditioned `a² + b²` from 1. A solution
/// outside this band is a degenerate near-singular fit, not a real transform.
const SCALE_SANITY_TOL: f64 = 0.2;

/// Accumulated moment sums for one least-squares fit.
///
/// Model per pair, with `X = zoom·x`, `Y = zoom·y` the scaled reference
/// coordinates and `m` the mirror sign:
///
/// ```text
/// x' = x0 + a·X + m·b·Y
/// y' = y0 − b·X + m·a·Y
/// ```
#[derive(Debug, Clone)]
pub(crate) struct MomentAccumulator {
    zoom: f64,
    mirror: f64,
    n: f64,
    sx: f64,
    sy: f64,
    s2: f64,
    rhs: [f64; 4],
}

impl MomentAccumulator {
    /// Start a fit with the given scale prior and mirror sign.
    pub(crate) fn new(zoom: f64, mirror: f64) -> Self {
        Self {
            zoom,
            mirror,
            n: 0.0,
            sx: 0.0,
            sy: 0.0,
            s2: 0.0,
            rhs: [0.0; 4],
        }
    }

    /// Accumulate one reference/input correspondence pair.
    pub(crate) fn add(&mut self, reference: Point, input: Point) {
        let m = self.mirror;
        let x = self.zoom * reference.x;
        let y = self.zoom * reference.y;
        self.n += 1.0;
        self.sx += x;
        self.sy += y;
        self.s2 += x * x + y * y;
        self.rhs[0] += x * input.x + m * y * input.y;
        self.rhs[1] += m * y * input.x - x * input.y;
        self.rhs[2] += input.x;
        self.rhs[3] += input.y;
    }

    /// Solve the normal equations for the similarity parameters.
    ///
    /// Builds the symmetric 4×4 system in the unknowns `(a, b, x0, y0)` and
    /// factorizes it by Cholesky decomposition; a non-positive pivot (the
    /// factorization failing) means the system is singular — too few or
    /// degenerate correspondences. A solution whose preconditioned `a² + b²`
    /// strays more than 0.2 from 1 is rejected the same way: the zoom prior
    /// said what the scale should be, and a wildly different answer is a
    /// degenerate fit slipping through, not a discovery.
    pub(crate) fn solve(&self) -> Result<SimilarityTransform, MatchError> {
        let m = self.mirror;
        #[rustfmt::skip]
        let normal = Matrix4::new(
            self.s2,      0.0,          self.sx,     m * self.sy,
            0.0,          self.s2,      m * self.sy, -self.sx,
            self.sx,      m * self.sy,  self.n,      0.0,
            m * self.sy,  -self.sx,     0.0,         self.n,
        );
        let rhs = Vector4::new(self.rhs[0], self.rhs[1], self.rhs[2], self.rhs[3]);

        let chol = normal.cholesky().ok_or(MatchError::SingularSystem)?;
        let sol = chol.solve(&rhs);

        let (a, b, x0, y0) = (sol[0], sol[1], sol[2], sol[3]);
        let norm = a * a + b * b;
        if !norm.is_finite() || (norm - 1.0).abs() > SCALE_SANITY_TOL {
            return Err(MatchError::SingularSystem);
        }

        Ok(SimilarityTransform {
            a: self.zoom * a,
            b: self.zoom * b,
            mirror: m,
            x0,
            y0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fit_through(truth: SimilarityTransform, refs: &[Point], zoom: f64) -> MomentAccumulator {
        let mut acc = MomentAccumulator::new(zoom, truth.mirror);
        for &r in refs {
            acc.add(r, truth.apply(r));
        }
        acc
    }

    #[test]
    fn recovers_exact_transform_from_three_points() {
        let truth = SimilarityTransform::from_parts(2.0, 0.0, false, 5.0, -3.0);
        let refs = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ];
        let fitted = fit_through(truth, &refs, 2.0).solve().unwrap();
        assert_relative_eq!(fitted.a, 2.0, epsilon = 1e-9);
        assert_relative_eq!(fitted.b, 0.0, epsilon = 1e-9);
        assert_relative_eq!(fitted.x0, 5.0, epsilon = 1e-9);
        assert_relative_eq!(fitted.y0, -3.0, epsilon = 1e-9);
    }

    #[test]
    fn recovers_rotated_mirrored_transform() {
        let truth = SimilarityTransform::from_parts(1.5, 0.7, true, -4.0, 8.0);
        let refs = [
            Point::new(1.0, 2.0),
            Point::new(-3.0, 5.0),
            Point::new(7.0, -1.0),
            Point::new(2.0, 9.0),
        ];
        let fitted = fit_through(truth, &refs, 1.5).solve().unwrap();
        assert_relative_eq!(fitted.a, truth.a, epsilon = 1e-9);
        assert_relative_eq!(fitted.b, truth.b, epsilon = 1e-9);
        assert_relative_eq!(fitted.x0, truth.x0, epsilon = 1e-9);
        assert_relative_eq!(fitted.y0, truth.y0, epsilon = 1e-9);
        assert!(fitted.is_mirrored());
    }

    #[test]
    fn single_pair_is_singular() {
        let mut acc = MomentAccumulator::new(1.0, 1.0);
        acc.add(Point::new(1.0, 2.0), Point::new(3.0, 4.0));
        assert_eq!(acc.solve(), Err(MatchError::SingularSystem));
    }

    #[test]
    fn coincident_points_are_singular() {
        let mut acc = MomentAccumulator::new(1.0, 1.0);
        for _ in 0..4 {
            acc.add(Point::new(1.0, 1.0), Point::new(2.0, 2.0));
        }
        assert_eq!(acc.solve(), Err(MatchError::SingularSystem));
    }

    #[test]
    fn wrong_zoom_prior_fails_sanity_check() {
        // Data has unit scale but the prior claims 10x; the preconditioned
        // linear part comes out near 0.1 and must be rejected.
        let truth = SimilarityTransform::identity();
        let refs = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ];
        assert_eq!(
            fit_through(truth, &refs, 10.0).solve(),
            Err(MatchError::SingularSystem)
        );
    }
}

use nalgebra::{Matrix2x4, Matrix4, Vector4};
use serde::Deserialize;

use super::Xy;
use crate::error::{Error, Result};

/// Family of 4-parameter transformations supported by the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    /// Independent per-axis scale and translation:
    /// `X = Sx*x + Tx`, `Y = Sy*y + Ty`, parameters `[Sx, Sy, Tx, Ty]`
    #[default]
    Affine,
    /// Uniform scale, rotation and translation:
    /// `X = a*x - b*y + Tx`, `Y = b*x + a*y + Ty`, parameters `[a, b, Tx, Ty]`
    /// with `a = k*cos(theta)`, `b = k*sin(theta)`
    Conformal,
}

/// A solved (or explicitly constructed) 2-D transformation.
///
/// ```text
///     System 1                        System 2
///
///     ^                               ^
///     |    B---------C                |     b---------------c
///     |    |         |       =>       |     |               |
///     |    A---------D                |     a---------------d
///     +-------------->                +------------------------>
/// ```
///
/// `Transformation::from_points(kind, [a, c], [A, C])` projects `B` to `b`.
/// The opposite direction is solved independently with the point sets
/// swapped; it is not a matrix inverse of this one.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    kind: TransformKind,
    params: Vector4<f64>,
}

impl Transformation {
    pub fn affine_no_rotation(sx: f64, sy: f64, tx: f64, ty: f64) -> Self {
        Self {
            kind: TransformKind::Affine,
            params: Vector4::new(sx, sy, tx, ty),
        }
    }

    /// Conformal transformation from scale `k`, rotation `theta` (radians)
    /// and translation.
    pub fn conformal(k: f64, theta: f64, tx: f64, ty: f64) -> Self {
        Self {
            kind: TransformKind::Conformal,
            params: Vector4::new(k * theta.cos(), k * theta.sin(), tx, ty),
        }
    }

    /// Solve the transformation mapping `local` points onto `standard` points.
    ///
    /// Builds the 4x4 system `X * t = e` from the two pairs and solves for
    /// `t`. Fails with [`Error::SingularSystem`] when `X` is not invertible,
    /// e.g. for coincident local points.
    pub fn from_points(kind: TransformKind, standard: [Xy; 2], local: [Xy; 2]) -> Result<Self> {
        let first = design_rows(kind, local[0]);
        let second = design_rows(kind, local[1]);
        let x = Matrix4::from_fn(|r, c| {
            if r < 2 {
                first[(r, c)]
            } else {
                second[(r - 2, c)]
            }
        });
        let e = Vector4::new(standard[0].x, standard[0].y, standard[1].x, standard[1].y);

        let params = x.lu().solve(&e).ok_or_else(|| {
            Error::SingularSystem(format!(
                "{:?} coefficient matrix is not invertible for local points {:?}, {:?}",
                kind, local[0], local[1]
            ))
        })?;
        if params.iter().any(|v| !v.is_finite()) {
            return Err(Error::SingularSystem(format!(
                "{:?} solution is not finite: {:?}",
                kind,
                params.as_slice()
            )));
        }

        Ok(Self { kind, params })
    }

    /// Raw parameter vector (`[Sx, Sy, Tx, Ty]` or `[a, b, Tx, Ty]`)
    pub fn params(&self) -> [f64; 4] {
        [self.params[0], self.params[1], self.params[2], self.params[3]]
    }

    /// Project a single point
    pub fn project(&self, p: Xy) -> Xy {
        let v = design_rows(self.kind, p) * self.params;
        Xy::new(v[0], v[1])
    }

    /// Project a slice of points; element `i` equals `project(points[i])`
    pub fn project_batch(&self, points: &[Xy]) -> Vec<Xy> {
        points.iter().map(|&p| self.project(p)).collect()
    }
}

/// The two rows a point contributes to the design matrix
fn design_rows(kind: TransformKind, p: Xy) -> Matrix2x4<f64> {
    match kind {
        TransformKind::Affine => Matrix2x4::new(
            p.x, 0.0, 1.0, 0.0, //
            0.0, p.y, 0.0, 1.0,
        ),
        TransformKind::Conformal => Matrix2x4::new(
            p.x, -p.y, 1.0, 0.0, //
            p.y, p.x, 0.0, 1.0,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::deg_to_rad;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const TOL: f64 = 1e-7;

    //     Coordinates 1                       Coordinates 2
    //
    //    5+    B---------C                 70 +     b---------------c
    //     |    |         |         =>         |     |               |
    //    1+    A---------D                 50 +     a---------------d
    //     +----+---------+----->              +-----+---------------+----->
    //          1         5                          20             120
    fn affine_cases() -> Vec<(Xy, Xy)> {
        vec![
            (Xy::new(1.0, 1.0), Xy::new(20.0, 50.0)),
            (Xy::new(5.0, 5.0), Xy::new(120.0, 70.0)),
            (Xy::new(0.0, 0.0), Xy::new(-5.0, 45.0)),
            (Xy::new(3.0, 3.0), Xy::new(70.0, 60.0)),
        ]
    }

    fn check_both_directions(from_one: &Transformation, from_two: &Transformation) {
        for (one, two) in affine_cases() {
            let result = from_one.project(one);
            assert!(result.is_close_to(&two, TOL), "{:?} -> {:?}, got {:?}", one, two, result);
            let result = from_two.project(two);
            assert!(result.is_close_to(&one, TOL), "{:?} -> {:?}, got {:?}", two, one, result);
        }
    }

    #[test]
    fn test_affine_via_constructor() {
        let from_one = Transformation::affine_no_rotation(100.0 / 4.0, 20.0 / 4.0, -5.0, 45.0);
        let from_two = Transformation::affine_no_rotation(
            4.0 / 100.0,
            4.0 / 20.0,
            -20.0 * 4.0 / 100.0 + 1.0,
            -50.0 * 4.0 / 20.0 + 1.0,
        );
        check_both_directions(&from_one, &from_two);
    }

    #[test]
    fn test_affine_via_two_points() {
        let one = [Xy::new(1.0, 1.0), Xy::new(5.0, 5.0)];
        let two = [Xy::new(20.0, 50.0), Xy::new(120.0, 70.0)];
        let from_two = Transformation::from_points(TransformKind::Affine, one, two).unwrap();
        let from_one = Transformation::from_points(TransformKind::Affine, two, one).unwrap();
        check_both_directions(&from_one, &from_two);

        let [sx, sy, tx, ty] = from_one.params();
        assert_abs_diff_eq!(sx, 25.0, epsilon = TOL);
        assert_abs_diff_eq!(sy, 5.0, epsilon = TOL);
        assert_abs_diff_eq!(tx, -5.0, epsilon = TOL);
        assert_abs_diff_eq!(ty, 45.0, epsilon = TOL);
    }

    #[test]
    fn test_inverse_consistency() {
        let geo = [Xy::new(26.12, 40.47), Xy::new(26.66, 39.90)];
        let pixel = [Xy::new(0.0, 0.0), Xy::new(4000.0, 3000.0)];
        for kind in [TransformKind::Affine, TransformKind::Conformal] {
            let to_geo = Transformation::from_points(kind, geo, pixel).unwrap();
            let to_pixel = Transformation::from_points(kind, pixel, geo).unwrap();
            for p in [Xy::new(10.0, 20.0), Xy::new(2500.5, 1234.0), Xy::new(-300.0, 3500.0)] {
                let back = to_pixel.project(to_geo.project(p));
                assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-6);
                assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_singular_points_rejected() {
        let standard = [Xy::new(20.0, 50.0), Xy::new(120.0, 70.0)];
        let same = [Xy::new(3.0, 4.0), Xy::new(3.0, 4.0)];
        for kind in [TransformKind::Affine, TransformKind::Conformal] {
            let result = Transformation::from_points(kind, standard, same);
            assert!(matches!(result, Err(Error::SingularSystem(_))));
        }

        // One axis is indeterminate when both local points share a column
        let shared_x = [Xy::new(3.0, 4.0), Xy::new(3.0, 9.0)];
        let result = Transformation::from_points(TransformKind::Affine, standard, shared_x);
        assert!(matches!(result, Err(Error::SingularSystem(_))));
    }

    #[test]
    fn test_conformal_with_params() {
        let sut = Transformation::conformal(1.25, deg_to_rad(-30.0), 164618.06, 1383016.332);
        let result = sut.project(Xy::new(100000.0, 200000.0));
        assert_relative_eq!(result.x, 397871.235, max_relative = 1e-8);
        assert_relative_eq!(result.y, 1537022.683, max_relative = 1e-8);

        // Textbook rotation + scale + translation
        let (k, theta) = (1.25_f64, deg_to_rad(-30.0));
        let (x, y) = (100000.0_f64, 200000.0_f64);
        let ex = k * (x * theta.cos() - y * theta.sin()) + 164618.06;
        let ey = k * (x * theta.sin() + y * theta.cos()) + 1383016.332;
        assert_relative_eq!(result.x, ex, max_relative = 1e-12);
        assert_relative_eq!(result.y, ey, max_relative = 1e-12);
    }

    #[test]
    fn test_conformal_batch() {
        let sut = Transformation::conformal(1.25, deg_to_rad(-30.0), 164618.06, 1383016.332);
        let inputs = [
            Xy::new(100000.0, 200000.0),
            Xy::new(104000.0, 204000.0),
            Xy::new(104000.0, 200000.0),
            Xy::new(100000.0, 204000.0),
        ];
        let expected = [
            Xy::new(397871.235, 1537022.683),
            Xy::new(404701.362, 1538852.81),
            Xy::new(402201.362, 1534522.683),
            Xy::new(400371.235, 1541352.81),
        ];
        let results = sut.project_batch(&inputs);
        assert_eq!(results.len(), 4);
        for (result, expect) in results.iter().zip(expected.iter()) {
            assert_relative_eq!(result.x, expect.x, max_relative = 1e-8);
            assert_relative_eq!(result.y, expect.y, max_relative = 1e-8);
        }
    }

    #[test]
    fn test_batch_equals_sequential() {
        let sut = Transformation::conformal(0.75, 0.3, -12.5, 99.0);
        let affine = Transformation::affine_no_rotation(1.5, -0.25, 7.0, 3.0);
        let inputs: Vec<Xy> = (0..50)
            .map(|i| Xy::new(i as f64 * 17.3 - 400.0, (i * i) as f64 * 0.37))
            .collect();
        for t in [&sut, &affine] {
            let batch = t.project_batch(&inputs);
            for (p, b) in inputs.iter().zip(batch.iter()) {
                assert_eq!(t.project(*p), *b);
            }
        }
        assert!(sut.project_batch(&[]).is_empty());
    }

    #[test]
    fn test_conformal_from_points() {
        let standard = [Xy::new(397871.235, 1537022.683), Xy::new(404701.362, 1538852.81)];
        let local = [Xy::new(100000.0, 200000.0), Xy::new(104000.0, 204000.0)];
        let sut = Transformation::from_points(TransformKind::Conformal, standard, local).unwrap();
        for (l, s) in local.iter().zip(standard.iter()) {
            let result = sut.project(*l);
            assert_relative_eq!(result.x, s.x, max_relative = 1e-8);
            assert_relative_eq!(result.y, s.y, max_relative = 1e-8);
        }
    }

    #[test]
    fn test_conformal_geo_to_image() {
        // (easting, northing) = (lng, lat) for geo, (col, row) for image
        let site = [Xy::new(137.136111, -4.072222), Xy::new(137.141667, -4.080556)];
        let image = [
            Xy::new(2377.5147705078125, 8564.53042602539),
            Xy::new(7126.945892333984, 1430.6239624023438),
        ];
        let from_map = Transformation::from_points(TransformKind::Conformal, site, image).unwrap();
        let from_image = Transformation::from_points(TransformKind::Conformal, image, site).unwrap();

        let pt = from_image.project(Xy::new(137.136111, -4.072222));
        assert_relative_eq!(pt.y, 8564.53042602539, max_relative = 1e-8);
        assert_relative_eq!(pt.x, 2377.5147705078125, max_relative = 1e-5);

        let pt = from_map.project(Xy::new(0.0, 0.0));
        assert_relative_eq!(pt.y, -4.082232757389885, max_relative = 1e-5);
        assert_relative_eq!(pt.x, 137.1333390597705, max_relative = 1e-5);
    }
}

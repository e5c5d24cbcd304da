//! Quadric error metrics
//!
//! Per-vertex error quadrics built from face planes, boundary constraint
//! planes and texture-coordinate gradients, together with the face measures
//! used to penalise or reject a collapse (radius-ratio quality and normal
//! deviation).

use decicrate_core::{Error, Point3d, Result, TexCoord, Vector3d};
use nalgebra::{Matrix3, Matrix4, Vector4};
use std::ops::{Add, AddAssign};

/// Scale applied on top of `boundary_weight` for boundary constraint planes
pub const BOUNDARY_SCALE: f64 = 100.0;

/// Faces whose neighbours all lie within this angle count as planar
pub const PLANAR_ANGLE_DEG: f64 = 1.0;

/// Weight of a planar face's quadric when planar simplification is on
pub const PLANAR_WEIGHT: f64 = 0.1;

/// Lower bound on quality when computing the quality penalty
pub const MIN_QUALITY: f64 = 1e-3;

/// Relative area below which a triangle counts as degenerate
const AREA_EPSILON: f64 = 1e-12;

/// Relative determinant below which the 3x3 system is treated as singular
const DET_EPSILON: f64 = 1e-10;

/// Symmetric 4x4 error quadric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadric(Matrix4<f64>);

impl Default for Quadric {
    fn default() -> Self {
        Self::zero()
    }
}

impl Quadric {
    pub fn zero() -> Self {
        Quadric(Matrix4::zeros())
    }

    /// Outer product `p pᵗ` of a homogeneous vector.
    ///
    /// For a plane `(a, b, c, d)` with unit normal this measures squared
    /// distance to the plane.
    pub fn from_plane(plane: &Vector4<f64>) -> Self {
        Quadric(plane * plane.transpose())
    }

    #[must_use]
    pub fn scaled(&self, weight: f64) -> Self {
        Quadric(self.0 * weight)
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|x| x.is_finite())
    }

    /// Error `vᵗ Q v` at a point, clamped at zero against round-off.
    pub fn evaluate(&self, p: &Point3d) -> f64 {
        let v = Vector4::new(p.x, p.y, p.z, 1.0);
        (v.transpose() * self.0 * v)[0].max(0.0)
    }

    /// Point minimising the error, or `None` when the system is singular.
    pub fn optimal_point(&self) -> Option<Point3d> {
        let a: Matrix3<f64> = self.0.fixed_view::<3, 3>(0, 0).into_owned();
        let b = self.0.fixed_view::<3, 1>(0, 3);

        let scale = a.norm();
        if scale == 0.0 || !scale.is_finite() {
            return None;
        }
        if a.determinant().abs() <= DET_EPSILON * scale * scale * scale {
            return None;
        }

        let inv = a.try_inverse()?;
        let p = -inv * b;
        if p.iter().all(|x| x.is_finite()) {
            Some(Point3d::new(p[0], p[1], p[2]))
        } else {
            None
        }
    }
}

impl Add for Quadric {
    type Output = Quadric;

    fn add(self, rhs: Quadric) -> Quadric {
        Quadric(self.0 + rhs.0)
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, rhs: Quadric) {
        self.0 += rhs.0;
    }
}

/// Twice-area normal of a triangle, or `None` when it is degenerate.
fn area_normal(p0: &Point3d, p1: &Point3d, p2: &Point3d) -> Option<Vector3d> {
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    let n = e1.cross(&e2);
    let longest = e1.norm_squared().max(e2.norm_squared()).max((p2 - p1).norm_squared());
    let len = n.norm();
    if !len.is_finite() || longest == 0.0 || len <= AREA_EPSILON * longest {
        None
    } else {
        Some(n)
    }
}

/// Unit normal of a triangle, or `None` when it is degenerate.
pub fn triangle_normal(p0: &Point3d, p1: &Point3d, p2: &Point3d) -> Option<Vector3d> {
    area_normal(p0, p1, p2).map(|n| n.normalize())
}

pub fn is_degenerate(p0: &Point3d, p1: &Point3d, p2: &Point3d) -> bool {
    area_normal(p0, p1, p2).is_none()
}

/// Homogeneous plane `(n, -n·p0)` through a triangle.
pub fn face_plane(p0: &Point3d, p1: &Point3d, p2: &Point3d) -> Option<Vector4<f64>> {
    let n = triangle_normal(p0, p1, p2)?;
    Some(Vector4::new(n.x, n.y, n.z, -n.dot(&p0.coords)))
}

/// Constraint quadric for a boundary edge: the plane containing the edge and
/// perpendicular to the face it borders.
pub fn boundary_quadric(
    a: &Point3d,
    b: &Point3d,
    face_normal: &Vector3d,
    weight: f64,
) -> Option<Quadric> {
    let m = (b - a).cross(face_normal);
    let len = m.norm();
    if !len.is_finite() || len <= f64::EPSILON {
        return None;
    }
    let m = m / len;
    let plane = Vector4::new(m.x, m.y, m.z, -m.dot(&a.coords));
    Some(Quadric::from_plane(&plane).scaled(weight))
}

/// Texture quadrics for the three corners of a face.
///
/// Each texture channel is a linear function over the triangle; its 3D
/// gradient `g` gives, for corner `i`, the term `a aᵗ` with
/// `a = [g, -g·p_i]`, the squared change of the interpolated channel when
/// the corner moves while its own coordinate stays fixed. Returns `Ok(None)`
/// for degenerate faces and `Err(DegenerateQuadric)` on non-finite input.
pub fn texture_quadrics(
    corners: &[Point3d; 3],
    uvs: &[TexCoord; 3],
    weight: f64,
) -> Result<Option<[Quadric; 3]>> {
    if uvs.iter().flatten().any(|x| !x.is_finite()) {
        return Err(Error::DegenerateQuadric(
            "non-finite texture coordinate".to_string(),
        ));
    }

    let [p0, p1, p2] = corners;
    let Some(n) = area_normal(p0, p1, p2) else {
        return Ok(None);
    };
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    let n2 = n.norm_squared();
    // Dual basis: g·e1 = ds1, g·e2 = ds2, g·n = 0
    let b1 = e2.cross(&n) / n2;
    let b2 = n.cross(&e1) / n2;

    let mut out = [Quadric::zero(); 3];
    for channel in 0..2 {
        let s0 = uvs[0][channel] as f64;
        let ds1 = uvs[1][channel] as f64 - s0;
        let ds2 = uvs[2][channel] as f64 - s0;
        let g = b1 * ds1 + b2 * ds2;
        if !g.iter().all(|x| x.is_finite()) {
            return Err(Error::DegenerateQuadric(
                "non-finite texture gradient".to_string(),
            ));
        }
        for (q, p) in out.iter_mut().zip(corners.iter()) {
            let a = Vector4::new(g.x, g.y, g.z, -g.dot(&p.coords));
            *q += Quadric::from_plane(&a).scaled(weight);
        }
    }
    Ok(Some(out))
}

/// Normalised radius ratio `2r / R`: 1 for an equilateral triangle, 0 for a
/// degenerate one.
pub fn triangle_quality(p0: &Point3d, p1: &Point3d, p2: &Point3d) -> f64 {
    let a = (p1 - p0).norm();
    let b = (p2 - p1).norm();
    let c = (p0 - p2).norm();
    let area = (p1 - p0).cross(&(p2 - p0)).norm() * 0.5;
    let s = (a + b + c) * 0.5;
    let denom = s * a * b * c;
    if !(denom > 0.0) || !denom.is_finite() {
        return 0.0;
    }
    (8.0 * area * area / denom).clamp(0.0, 1.0)
}

/// Angle in degrees between two unit normals.
pub fn normal_deviation_deg(n0: &Vector3d, n1: &Vector3d) -> f64 {
    n0.dot(n1).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Cost multiplier for a candidate whose worst resulting face has quality `q`.
pub fn quality_penalty(q: f64, threshold: f64) -> f64 {
    if q >= threshold {
        1.0
    } else {
        threshold / q.max(MIN_QUALITY)
    }
}

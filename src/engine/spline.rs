// Centripetal Catmull-Rom curve through a polyline, with arc-length
// reparameterisation and parallel-transport frames for sweeping tubes.
//
// Parameter conventions:
//   t ∈ [0, 1]  : raw curve parameter, uniform per control segment
//   u ∈ [0, 1]  : normalised arc length

use glam::{Quat, Vec3};

/// Samples used to build the arc-length lookup table.
const ARC_LENGTH_DIVISIONS: usize = 200;
/// Segments shorter than this (in centripetal knot units) are treated as unit length.
const KNOT_EPSILON: f32 = 1e-4;
/// Parameter offset for the finite-difference tangent.
const TANGENT_DELTA: f32 = 1e-4;

// ============================================================================
// CUBIC SEGMENT
// ============================================================================

/// Cubic Hermite polynomial c0 + c1·t + c2·t² + c3·t³, evaluated per axis.
struct CubicPoly {
    c0: Vec3,
    c1: Vec3,
    c2: Vec3,
    c3: Vec3,
}

impl CubicPoly {
    /// Hermite basis from endpoints x0, x1 and tangents t0, t1.
    fn hermite(x0: Vec3, x1: Vec3, t0: Vec3, t1: Vec3) -> Self {
        Self {
            c0: x0,
            c1: t0,
            c2: -3.0 * x0 + 3.0 * x1 - 2.0 * t0 - t1,
            c3: 2.0 * x0 - 2.0 * x1 + t0 + t1,
        }
    }

    /// Non-uniform Catmull-Rom between p1 and p2 with knot intervals dt0..dt2.
    fn nonuniform_catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, dt0: f32, dt1: f32, dt2: f32) -> Self {
        let t1 = (p1 - p0) / dt0 - (p2 - p0) / (dt0 + dt1) + (p2 - p1) / dt1;
        let t2 = (p2 - p1) / dt1 - (p3 - p1) / (dt1 + dt2) + (p3 - p2) / dt2;
        // Rescale tangents into the [0, 1] parameter range of the middle segment.
        Self::hermite(p1, p2, t1 * dt1, t2 * dt1)
    }

    fn eval(&self, t: f32) -> Vec3 {
        let t2 = t * t;
        let t3 = t2 * t;
        self.c0 + self.c1 * t + self.c2 * t2 + self.c3 * t3
    }
}

// ============================================================================
// CURVE
// ============================================================================

/// Open centripetal Catmull-Rom spline passing through every control point.
pub struct CatmullRomCurve {
    points: Vec<Vec3>,
    /// Cumulative chord length at `ARC_LENGTH_DIVISIONS + 1` evenly spaced `t`.
    arc_lengths: Vec<f32>,
}

/// Tangent, normal and binormal at evenly spaced arc-length samples.
pub struct FrenetFrames {
    pub tangents: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub binormals: Vec<Vec3>,
}

impl CatmullRomCurve {
    /// Build a curve through `points`. Needs at least two points.
    pub fn new(points: Vec<Vec3>) -> Self {
        debug_assert!(points.len() >= 2, "Catmull-Rom curve needs at least 2 points");
        let mut curve = Self { points, arc_lengths: Vec::new() };
        curve.arc_lengths = curve.compute_arc_lengths();
        curve
    }

    /// Point at raw parameter `t`.
    pub fn point(&self, t: f32) -> Vec3 {
        let l = self.points.len();
        let p = (l - 1) as f32 * t;
        let mut seg = p.floor() as usize;
        let mut weight = p - seg as f32;

        if seg >= l - 1 {
            seg = l - 2;
            weight = 1.0;
        }

        // Open ends: reflect the neighbour to invent a phantom control point.
        let p0 = if seg > 0 {
            self.points[seg - 1]
        } else {
            2.0 * self.points[0] - self.points[1]
        };
        let p1 = self.points[seg];
        let p2 = self.points[seg + 1];
        let p3 = if seg + 2 < l {
            self.points[seg + 2]
        } else {
            2.0 * self.points[l - 1] - self.points[l - 2]
        };

        // Centripetal knots: sqrt of chord length, i.e. (squared distance)^0.25.
        let mut dt0 = p0.distance_squared(p1).powf(0.25);
        let mut dt1 = p1.distance_squared(p2).powf(0.25);
        let mut dt2 = p2.distance_squared(p3).powf(0.25);

        if dt1 < KNOT_EPSILON { dt1 = 1.0; }
        if dt0 < KNOT_EPSILON { dt0 = dt1; }
        if dt2 < KNOT_EPSILON { dt2 = dt1; }

        CubicPoly::nonuniform_catmull_rom(p0, p1, p2, p3, dt0, dt1, dt2).eval(weight)
    }

    /// Point at normalised arc length `u`.
    pub fn point_at(&self, u: f32) -> Vec3 {
        self.point(self.u_to_t(u))
    }

    /// Unit tangent at raw parameter `t` (central difference).
    pub fn tangent(&self, t: f32) -> Vec3 {
        let t1 = (t - TANGENT_DELTA).max(0.0);
        let t2 = (t + TANGENT_DELTA).min(1.0);
        (self.point(t2) - self.point(t1)).normalize_or_zero()
    }

    /// Unit tangent at normalised arc length `u`.
    pub fn tangent_at(&self, u: f32) -> Vec3 {
        self.tangent(self.u_to_t(u))
    }

    /// Approximate total length of the curve.
    pub fn length(&self) -> f32 {
        self.arc_lengths.last().copied().unwrap_or(0.0)
    }

    fn compute_arc_lengths(&self) -> Vec<f32> {
        let mut lengths = Vec::with_capacity(ARC_LENGTH_DIVISIONS + 1);
        let mut last = self.point(0.0);
        let mut sum = 0.0;
        lengths.push(0.0);

        for d in 1..=ARC_LENGTH_DIVISIONS {
            let current = self.point(d as f32 / ARC_LENGTH_DIVISIONS as f32);
            sum += current.distance(last);
            lengths.push(sum);
            last = current;
        }

        lengths
    }

    /// Map normalised arc length to raw parameter via the lookup table.
    fn u_to_t(&self, u: f32) -> f32 {
        let lengths = &self.arc_lengths;
        let n = lengths.len();
        let target = u * lengths[n - 1];

        // Binary search for the largest i with lengths[i] <= target.
        let mut lo = 0usize;
        let mut hi = n - 1;
        while lo < hi {
            let mid = (lo + hi).div_ceil(2);
            if lengths[mid] <= target {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        let i = lo;

        if i >= n - 1 || lengths[i] == target {
            return i as f32 / (n - 1) as f32;
        }

        let before = lengths[i];
        let segment = lengths[i + 1] - before;
        let fraction = if segment > 0.0 { (target - before) / segment } else { 0.0 };
        (i as f32 + fraction) / (n - 1) as f32
    }

    /// Frames at `segments + 1` evenly spaced arc-length samples.
    ///
    /// The first normal is perpendicular to the tangent along its smallest
    /// axis; each following normal is the previous one rotated by the minimal
    /// rotation between consecutive tangents (parallel transport), so the
    /// frame never twists about the curve.
    pub fn frenet_frames(&self, segments: usize) -> FrenetFrames {
        let tangents: Vec<Vec3> = (0..=segments)
            .map(|i| self.tangent_at(i as f32 / segments as f32))
            .collect();

        let mut normals = Vec::with_capacity(segments + 1);
        let mut binormals = Vec::with_capacity(segments + 1);

        let t0 = tangents[0];
        let abs = t0.abs();
        let mut min = f32::MAX;
        let mut axis = Vec3::Z;
        if abs.x <= min { min = abs.x; axis = Vec3::X; }
        if abs.y <= min { min = abs.y; axis = Vec3::Y; }
        if abs.z <= min { axis = Vec3::Z; }

        let side = t0.cross(axis).normalize_or_zero();
        normals.push(t0.cross(side));
        binormals.push(t0.cross(normals[0]));

        for i in 1..=segments {
            let mut normal = normals[i - 1];
            let rotation_axis = tangents[i - 1].cross(tangents[i]);
            if rotation_axis.length() > f32::EPSILON {
                let theta = tangents[i - 1].dot(tangents[i]).clamp(-1.0, 1.0).acos();
                normal = Quat::from_axis_angle(rotation_axis.normalize(), theta) * normal;
            }
            binormals.push(tangents[i].cross(normal));
            normals.push(normal);
        }

        FrenetFrames { tangents, normals, binormals }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn wavy_points() -> Vec<Vec3> {
        (0..12)
            .map(|i| {
                let x = i as f32 * 0.3;
                Vec3::new(x, x.sin(), (x * 0.7).cos() * 0.5)
            })
            .collect()
    }

    #[test]
    fn test_curve_interpolates_control_points() {
        let points = wavy_points();
        let curve = CatmullRomCurve::new(points.clone());
        let last = (points.len() - 1) as f32;
        for (i, p) in points.iter().enumerate() {
            let q = curve.point(i as f32 / last);
            assert_relative_eq!(q.x, p.x, epsilon = 1e-5);
            assert_relative_eq!(q.y, p.y, epsilon = 1e-5);
            assert_relative_eq!(q.z, p.z, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_straight_line_stays_straight() {
        let curve = CatmullRomCurve::new(vec![
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
        ]);
        for i in 0..=20 {
            let p = curve.point(i as f32 / 20.0);
            assert_relative_eq!(p.y, 0.0, epsilon = 1e-6);
            assert_relative_eq!(p.z, 0.0, epsilon = 1e-6);
        }
        assert_relative_eq!(curve.length(), 4.0, epsilon = 1e-3);
    }

    #[test]
    fn test_arc_length_parameter_is_uniform() {
        let curve = CatmullRomCurve::new(vec![
            Vec3::ZERO,
            Vec3::new(0.1, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
        ]);
        // Halfway along the length lands near x = 1.5 even though the
        // control points are unevenly spaced.
        let mid = curve.point_at(0.5);
        assert_relative_eq!(mid.x, 1.5, epsilon = 0.02);
        assert_relative_eq!(curve.point_at(0.0).x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(curve.point_at(1.0).x, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_frames_are_orthonormal() {
        let curve = CatmullRomCurve::new(wavy_points());
        let frames = curve.frenet_frames(64);
        assert_eq!(frames.tangents.len(), 65);
        for i in 0..=64 {
            let (t, n, b) = (frames.tangents[i], frames.normals[i], frames.binormals[i]);
            assert_relative_eq!(t.length(), 1.0, epsilon = 1e-3);
            assert_relative_eq!(n.length(), 1.0, epsilon = 1e-3);
            assert_relative_eq!(b.length(), 1.0, epsilon = 1e-3);
            assert!(t.dot(n).abs() < 1e-2);
            assert!(t.dot(b).abs() < 1e-2);
            assert!(n.dot(b).abs() < 1e-2);
        }
    }
}

// Curl-noise vector field and the filament paths traced through it.
//
// The field is the curl of a scalar simplex-noise potential, sampled with
// central differences. Curl fields are divergence-free, so the traced paths
// swirl without collapsing onto a point.

use glam::Vec3;
use noise_functions::{Noise, OpenSimplex2s};
use rand::Rng;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Finite-difference half-width used for the partial derivatives.
const CURL_EPSILON: f32 = 1e-4;
/// Spatial frequency applied to a path point before the field is sampled.
pub const CURL_SCALE: f32 = 0.1;
/// Distance advanced along the field per integration step.
pub const CURL_STEP: f32 = 0.001;
/// Integration steps after the seed; a path holds `CURL_PATH_STEPS + 1` points.
pub const CURL_PATH_STEPS: usize = 300;

// ============================================================================
// CURL FIELD
// ============================================================================

pub struct CurlField {
    seed: i32,
}

impl CurlField {
    /// Field over a simplex potential seeded from `rng`.
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self { seed: rng.gen_range(i32::MIN..=i32::MAX) }
    }

    /// Scalar potential, roughly in [-1, 1].
    pub fn potential(&self, x: f32, y: f32, z: f32) -> f32 {
        OpenSimplex2s.add_seed(self.seed).sample3([x, y, z])
    }

    /// Curl of the noise potential at `p`.
    ///
    ///   x = dN/dy - dN/dz
    ///   y = dN/dz - dN/dx
    ///   z = dN/dx - dN/dy
    pub fn curl(&self, p: Vec3) -> Vec3 {
        let (x, y, z) = (p.x, p.y, p.z);
        let e = CURL_EPSILON;
        let n = |x, y, z| self.potential(x, y, z);

        let d_dx = (n(x + e, y, z) - n(x - e, y, z)) / (2.0 * e);
        let d_dy = (n(x, y + e, z) - n(x, y - e, z)) / (2.0 * e);
        let d_dz = (n(x, y, z + e) - n(x, y, z - e)) / (2.0 * e);

        Vec3::new(d_dy - d_dz, d_dz - d_dx, d_dx - d_dy)
    }
}

// ============================================================================
// PATH GENERATION
// ============================================================================

/// Trace a filament from `seed` by forward-Euler integration of the field.
///
/// Returns `CURL_PATH_STEPS + 1` points; the first is `seed` itself. The point
/// is advanced unclamped and never renormalised.
pub fn generate_curl_path(field: &CurlField, seed: Vec3) -> Vec<Vec3> {
    let mut points = Vec::with_capacity(CURL_PATH_STEPS + 1);
    points.push(seed);

    let mut current = seed;
    for _ in 0..CURL_PATH_STEPS {
        let v = field.curl(current * CURL_SCALE);
        current += v * CURL_STEP;
        points.push(current);
    }

    points
}

/// Uniform random seed point inside the unit cube centred on the origin.
pub fn random_seed<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    Vec3::new(
        rng.gen_range(-0.5..0.5),
        rng.gen_range(-0.5..0.5),
        rng.gen_range(-0.5..0.5),
    )
}

// Scene construction: two independent ECS worlds composited in order.
//
//   backdrop   : the ray-target plane, drawn first
//   foreground : light indicator + curl tubes, drawn over the backdrop
//                after a depth clear

use bevy_ecs::prelude::*;
use glam::{Vec2, Vec3};
use log::info;
use rand::Rng;
use super::components::{Geometry, LightIndicator, Material, RayTarget, Transform, Tube};
use super::curl::{generate_curl_path, random_seed, CurlField};
use super::mesh::{plane_geometry, sphere_geometry, tube_geometry, GpuVertex, RenderMesh};
use super::spline::CatmullRomCurve;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Side length of the square backdrop plane.
pub const PLANE_SIZE: f32 = 10.0;
pub const LIGHT_RADIUS: f32 = 0.02;
pub const LIGHT_SEGMENTS: u32 = 20;
/// Light indicator colour as sRGB hex.
pub const LIGHT_COLOR: u32 = 0xa8e6cf;
pub const TUBE_COUNT: u32 = 100;
pub const TUBE_SEGMENTS: u32 = 300;
pub const TUBE_RADIUS: f32 = 0.005;
pub const TUBE_RADIAL_SEGMENTS: u32 = 8;

// ============================================================================
// SCENE
// ============================================================================

/// One independently drawn scene graph.
pub struct Scene {
    pub world: World,
}

impl Scene {
    pub fn new() -> Self {
        Self { world: World::new() }
    }

    /// Number of entities carrying component `T`.
    pub fn count<T: Component>(&self) -> usize {
        self.world.iter_entities().filter(|e| e.contains::<T>()).count()
    }

    /// Every drawable entity with its model matrix.
    pub fn renderables(&self) -> impl Iterator<Item = Renderable<'_>> + '_ {
        self.world.iter_entities().filter_map(|e| {
            Some(Renderable {
                entity: e.id(),
                geometry: e.get::<Geometry>()?,
                material: *e.get::<Material>()?,
                model: e.get::<Transform>().map(Transform::matrix).unwrap_or_default(),
            })
        })
    }
}

pub struct Renderable<'w> {
    pub entity: Entity,
    pub geometry: &'w Geometry,
    pub material: Material,
    pub model: glam::Mat4,
}

/// Both scenes plus handles to the entities the frame loop touches.
pub struct Scenes {
    pub backdrop: Scene,
    pub foreground: Scene,
    pub ray_target: Entity,
    pub light: Entity,
}

impl Scenes {
    /// Build the plane, the light indicator and `TUBE_COUNT` curl tubes.
    pub fn build<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut backdrop = Scene::new();
        let mut foreground = Scene::new();

        let field = CurlField::new(rng);
        let filament_length = create_curls(&mut foreground, &field, rng);
        let (ray_target, light) = create_plane(&mut backdrop, &mut foreground);

        info!(
            "scene built: {} tubes ({:.3} units of filament), {} backdrop entities",
            foreground.count::<Tube>(),
            filament_length,
            backdrop.world.entities().len(),
        );

        Self { backdrop, foreground, ray_target, light }
    }

    /// Geometry and model matrix of the ray-target plane.
    pub fn ray_target_mesh(&self) -> Option<(&RenderMesh<GpuVertex>, glam::Mat4)> {
        let world = &self.backdrop.world;
        let model = world.get::<Transform>(self.ray_target).map(Transform::matrix).unwrap_or_default();
        match world.get::<Geometry>(self.ray_target)? {
            Geometry::Surface(mesh) => Some((mesh, model)),
            Geometry::Tube(_) => None,
        }
    }

    /// Move the light indicator in its plane (z is left unchanged).
    pub fn set_light_xy(&mut self, xy: Vec2) -> Vec3 {
        match self.foreground.world.get_mut::<Transform>(self.light) {
            Some(mut transform) => {
                transform.position.x = xy.x;
                transform.position.y = xy.y;
                transform.position
            }
            None => xy.extend(0.0),
        }
    }
}

fn create_plane(backdrop: &mut Scene, foreground: &mut Scene) -> (Entity, Entity) {
    let ray_target = backdrop
        .world
        .spawn((
            Transform::default(),
            Geometry::Surface(plane_geometry(Vec2::splat(PLANE_SIZE), 1, 1)),
            Material::Plane,
            RayTarget,
        ))
        .id();

    let light = foreground
        .world
        .spawn((
            Transform::default(),
            Geometry::Surface(sphere_geometry(LIGHT_RADIUS, LIGHT_SEGMENTS, LIGHT_SEGMENTS)),
            Material::Basic { color: srgb_hex_to_linear(LIGHT_COLOR) },
            LightIndicator,
        ))
        .id();

    (ray_target, light)
}

/// Spawn the tubes; returns their summed curve length.
fn create_curls<R: Rng + ?Sized>(foreground: &mut Scene, field: &CurlField, rng: &mut R) -> f32 {
    let mut total_length = 0.0;
    for _ in 0..TUBE_COUNT {
        let path = generate_curl_path(field, random_seed(rng));
        let curve = CatmullRomCurve::new(path);
        total_length += curve.length();
        let mesh = tube_geometry(&curve, TUBE_SEGMENTS, TUBE_RADIUS, TUBE_RADIAL_SEGMENTS);
        foreground.world.spawn((
            Transform::default(),
            Geometry::Tube(mesh),
            Material::Tubes,
            Tube,
        ));
    }
    total_length
}

/// 0xRRGGBB sRGB → linear RGBA, so the colour reads correctly on an sRGB surface.
pub fn srgb_hex_to_linear(hex: u32) -> [f32; 4] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
    };
    [channel(16), channel(8), channel(0), 1.0]
}

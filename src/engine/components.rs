// Core ECS components for scene objects
// Every renderable entity carries Transform + Geometry + Material.

use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};
use super::mesh::{GpuVertex, RenderMesh, TubeVertex};

/// Position of an entity in 3D space
#[derive(Component, Debug, Clone, Copy)]
pub struct Transform {
    pub position: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
    }
}

/// Vertex data owned by an entity, uploaded once by the renderer.
#[derive(Component, Debug, Clone)]
pub enum Geometry {
    Surface(RenderMesh<GpuVertex>),
    Tube(RenderMesh<TubeVertex>),
}

impl Geometry {
    pub fn index_count(&self) -> usize {
        match self {
            Geometry::Surface(mesh) => mesh.index_count(),
            Geometry::Tube(mesh) => mesh.index_count(),
        }
    }
}

/// Which shader program draws the entity.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Backdrop plane lit by the follower.
    Plane,
    /// Curl tubes lit by the follower.
    Tubes,
    /// Unlit solid colour (linear RGBA).
    Basic { color: [f32; 4] },
}

/// Invisible-to-input mesh that pointer rays are cast against.
#[derive(Component, Debug, Clone, Copy)]
pub struct RayTarget;

/// Small sphere that marks the follower position.
#[derive(Component, Debug, Clone, Copy)]
pub struct LightIndicator;

/// One curl-noise filament.
#[derive(Component, Debug, Clone, Copy)]
pub struct Tube;

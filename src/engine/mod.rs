// Scene, simulation and rendering for the curl filament experience.
//
// Geometry and simulation modules (curl, spline, mesh, raycast, follower,
// frame_loop) are GPU-free. `gpu` and `debug_overlay` are the only
// modules that touch wgpu.

pub mod camera;
pub mod components;
pub mod curl;
pub mod debug_overlay;
pub mod experience;
pub mod follower;
pub mod frame_loop;
pub mod gpu;
pub mod input;
pub mod mesh;
pub mod pointer;
pub mod raycast;
pub mod renderer;
pub mod scene;
pub mod spline;

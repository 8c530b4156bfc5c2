// Elastic follower: a lagged, smoothed copy of a 2D target.
//
// Per frame, in this order:
//   velocity += (target - position) * ATTRACTION
//   velocity *= DECAY
//   position += velocity
//
// The step is per frame, not per second: the motion speeds up with the
// display refresh rate. The position only ever moves by the damped velocity,
// so a target jump of any size is absorbed over several frames.

use glam::Vec2;

/// Fraction of the remaining gap added to the velocity each frame.
pub const ATTRACTION: f32 = 0.15;
/// Fraction of the velocity kept each frame.
pub const DECAY: f32 = 0.8;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElasticFollower {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl ElasticFollower {
    pub fn new(position: Vec2) -> Self {
        Self { position, velocity: Vec2::ZERO }
    }

    /// Advance one frame toward `target`.
    pub fn step(&mut self, target: Vec2) {
        let pull = (target - self.position) * ATTRACTION;
        self.velocity += pull;
        self.velocity *= DECAY;
        self.position += self.velocity;
    }
}

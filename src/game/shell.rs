use glam::Vec3;

/// A launched shell. The initial velocity is assigned once here; flight
/// integration belongs to the host physics, not this crate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shell {
    pub position: Vec3,
    pub velocity: Vec3,
}

impl Shell {
    pub fn launch(position: Vec3, forward: Vec3, force: f32) -> Self {
        Self {
            position,
            velocity: force * forward,
        }
    }
}

use glam::{Quat, Vec3};

/// Accumulated turret angle with a hard limit on either side.
///
/// The angle is integrated from the turn axis each physics tick. Once the
/// accumulated angle passes the limit it is pinned there and the tick's
/// rotation delta is dropped entirely rather than saturated.
#[derive(Clone, Copy, Debug)]
pub struct Turret {
    angle: f32,
    turn_speed: f32,
    angle_limit: f32,
}

impl Turret {
    pub fn new(turn_speed: f32, angle_limit: f32) -> Self {
        Self {
            angle: 0.0,
            turn_speed,
            angle_limit,
        }
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Returns the rotation delta in degrees to apply this tick, or `None`
    /// when the accumulated angle hit the limit.
    pub fn integrate(&mut self, axis: f32, dt: f32) -> Option<f32> {
        let turn = axis * self.turn_speed * dt;
        self.angle += turn;
        if self.angle.abs() > self.angle_limit {
            self.angle = if self.angle > 0.0 {
                self.angle_limit
            } else {
                -self.angle_limit
            };
            None
        } else {
            Some(turn)
        }
    }
}

/// The turret's visual transform paired with the aim-slider anchor.
///
/// The turret turns around +Y; the anchor turns around -Z to cancel the
/// UI coordinate convention so the slider keeps pointing with the barrel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TurretRig {
    pub rotation: Quat,
    pub anchor_rotation: Quat,
}

impl Default for TurretRig {
    fn default() -> Self {
        Self {
            rotation: Quat::IDENTITY,
            anchor_rotation: Quat::IDENTITY,
        }
    }
}

impl TurretRig {
    pub fn apply_turn(&mut self, degrees: f32) {
        let radians = degrees.to_radians();
        self.rotation *= Quat::from_rotation_y(radians);
        self.anchor_rotation *= Quat::from_rotation_z(-radians);
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.02;

    #[test]
    fn angle_magnitude_never_exceeds_limit() {
        let mut turret = Turret::new(120.0, 60.0);
        let axes = [1.0, 1.0, -0.5, 1.0, 1.0, 1.0, -1.0, 0.25];
        for _ in 0..500 {
            for axis in axes {
                turret.integrate(axis, DT);
                assert!(turret.angle().abs() <= 60.0);
            }
        }
    }

    #[test]
    fn pinned_turret_drops_input() {
        let mut turret = Turret::new(120.0, 60.0);
        // Drive hard into the limit.
        while turret.integrate(1.0, DT).is_some() {}
        assert_eq!(turret.angle(), 60.0);
        assert!(turret.integrate(1.0, DT).is_none());
        assert_eq!(turret.angle(), 60.0);
        // Turning back is applied again.
        assert!(turret.integrate(-1.0, DT).is_some());
        assert!(turret.angle() < 60.0);
    }

    #[test]
    fn rig_forward_follows_applied_turns() {
        let mut rig = TurretRig::default();
        rig.apply_turn(90.0);
        let forward = rig.forward();
        assert!((forward - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn anchor_counter_rotates() {
        let mut rig = TurretRig::default();
        rig.apply_turn(30.0);
        let expected = Quat::from_rotation_z((-30.0_f32).to_radians());
        assert!(rig.anchor_rotation.angle_between(expected) < 1e-5);
    }
}

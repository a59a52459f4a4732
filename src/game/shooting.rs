use super::input::{FireButton, InputFrame, fire_axis};
use super::shell::Shell;
use super::turret::{Turret, TurretRig};
use glam::Vec3;

/// Tuning for one tank's shooting rig. Forces are in launch-force units,
/// times in seconds, turret speed in degrees per second.
#[derive(Clone, Copy, Debug)]
pub struct ShootingConfig {
    pub min_launch_force: f32,
    pub max_launch_force: f32,
    pub max_charge_time: f32,
    pub turret_turn_speed: f32,
    pub turret_angle_limit: f32,
}

impl Default for ShootingConfig {
    fn default() -> Self {
        Self {
            min_launch_force: 15.0,
            max_launch_force: 30.0,
            max_charge_time: 0.75,
            turret_turn_speed: 120.0,
            turret_angle_limit: 60.0,
        }
    }
}

/// Cue for the shooting audio source: the clip swaps between charging
/// and firing, playback itself is the host's concern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCue {
    Charging,
    Fire,
}

/// What gets replicated to the other peers when a tank fires.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FireEvent {
    pub position: Vec3,
    pub launch_force: f32,
}

/// Everything one `update` tick produced.
#[derive(Debug, Default)]
pub struct TickEvents {
    pub shell: Option<Shell>,
    pub fire: Option<FireEvent>,
    pub audio: Option<AudioCue>,
}

/// Charge-and-fire control for a single tank.
///
/// Holding the fire button charges the launch force from the minimum
/// toward the maximum; releasing fires with whatever was accumulated, and
/// holding to the cap fires at max force without a release. Each press
/// starts a fresh cycle; a cycle fires at most once.
#[derive(Debug)]
pub struct ShootingController {
    config: ShootingConfig,
    fire_axis: String,
    charge_speed: f32,
    current_launch_force: f32,
    fired: bool,
    aim_slider: f32,
    fire_button: FireButton,
    turret: Turret,
    rig: TurretRig,
    position: Vec3,
    fire_offset: Vec3,
    turn_input: f32,
}

impl ShootingController {
    pub fn new(player_number: u8, config: ShootingConfig, position: Vec3) -> Self {
        let charge_speed =
            (config.max_launch_force - config.min_launch_force) / config.max_charge_time;
        let mut controller = Self {
            config,
            fire_axis: fire_axis(player_number),
            charge_speed,
            current_launch_force: config.min_launch_force,
            fired: false,
            aim_slider: config.min_launch_force,
            fire_button: FireButton::default(),
            turret: Turret::new(config.turret_turn_speed, config.turret_angle_limit),
            rig: TurretRig::default(),
            position,
            // Muzzle sits ahead of and above the hull pivot.
            fire_offset: Vec3::new(0.0, 1.7, 1.35),
            turn_input: 0.0,
        };
        controller.on_enable();
        controller
    }

    /// Reset performed whenever the tank is (re-)enabled: launch force and
    /// slider back to minimum, turn input cleared. The turret keeps its
    /// current rotation, exactly like the re-acquired scene object would.
    pub fn on_enable(&mut self) {
        self.current_launch_force = self.config.min_launch_force;
        self.aim_slider = self.config.min_launch_force;
        self.turn_input = 0.0;
    }

    /// Runs one input tick of the charge/fire cycle.
    ///
    /// Branch order matters: the max-charge check runs before edge
    /// handling so a capped charge fires even if the press and release
    /// land on awkward frames.
    pub fn update(&mut self, frame: &InputFrame, dt: f32) -> TickEvents {
        let mut events = TickEvents::default();
        // The slider rests at the minimum unless a charge is in progress.
        self.aim_slider = self.config.min_launch_force;
        let button = self.fire_button.sample(frame.fire_held);

        if self.current_launch_force >= self.config.max_launch_force && !self.fired {
            self.current_launch_force = self.config.max_launch_force;
            self.fire(&mut events);
        } else if button.just_pressed {
            self.fired = false;
            self.current_launch_force = self.config.min_launch_force;
            events.audio = Some(AudioCue::Charging);
        } else if button.held && !self.fired {
            self.current_launch_force = (self.current_launch_force + self.charge_speed * dt)
                .min(self.config.max_launch_force);
            self.aim_slider = self.current_launch_force;
        } else if button.just_released && !self.fired {
            self.fire(&mut events);
        }

        self.turn_input = frame.turret_axis;
        events
    }

    /// Physics-rate tick: integrate the turret angle and, when not pinned
    /// at the limit, rotate the rig by the resulting delta.
    pub fn fixed_update(&mut self, dt: f32) {
        if let Some(turn) = self.turret.integrate(self.turn_input, dt) {
            self.rig.apply_turn(turn);
        }
    }

    fn fire(&mut self, events: &mut TickEvents) {
        self.fired = true;

        let position = self.fire_point();
        let shell = Shell::launch(position, self.rig.forward(), self.current_launch_force);
        events.shell = Some(shell);
        events.fire = Some(FireEvent {
            position,
            launch_force: self.current_launch_force,
        });
        events.audio = Some(AudioCue::Fire);

        // Guards against a missed release event leaving a stale charge.
        self.current_launch_force = self.config.min_launch_force;
    }

    /// Handles a fire notification from this tank's owning peer. The shell
    /// spawns at the received position but along this copy's own forward
    /// direction; duplicates are not detected.
    pub fn apply_remote_fire(&mut self, position: Vec3, launch_force: f32) -> Shell {
        self.fired = true;
        let shell = Shell::launch(position, self.rig.forward(), launch_force);
        self.current_launch_force = self.config.min_launch_force;
        shell
    }

    pub fn fire_point(&self) -> Vec3 {
        self.position + self.rig.rotation * self.fire_offset
    }

    pub fn fire_axis(&self) -> &str {
        &self.fire_axis
    }

    pub fn launch_force(&self) -> f32 {
        self.current_launch_force
    }

    pub fn aim_slider(&self) -> f32 {
        self.aim_slider
    }

    pub fn turret_angle(&self) -> f32 {
        self.turret.angle()
    }

    pub fn rig(&self) -> &TurretRig {
        &self.rig
    }

    pub fn config(&self) -> &ShootingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const DT: f32 = 0.02;

    fn controller() -> ShootingController {
        ShootingController::new(1, ShootingConfig::default(), Vec3::ZERO)
    }

    fn frame(fire_held: bool) -> InputFrame {
        InputFrame {
            fire_held,
            turret_axis: 0.0,
        }
    }

    #[test]
    fn full_charge_fires_exactly_once_at_max() {
        let mut tank = controller();
        let max = tank.config().max_launch_force;
        let mut fires = Vec::new();

        // Hold well past the charge time without ever releasing.
        for _ in 0..100 {
            let events = tank.update(&frame(true), DT);
            if let Some(fire) = events.fire {
                fires.push(fire);
            }
        }

        assert_eq!(fires.len(), 1);
        assert_eq!(fires[0].launch_force, max);
    }

    #[test]
    fn early_release_fires_with_accumulated_force() {
        let mut tank = controller();
        let config = *tank.config();
        let charge_speed =
            (config.max_launch_force - config.min_launch_force) / config.max_charge_time;

        tank.update(&frame(true), DT);
        let held_ticks = 10;
        for _ in 0..held_ticks {
            tank.update(&frame(true), DT);
        }
        let events = tank.update(&frame(false), DT);

        let fire = events.fire.expect("release should fire");
        let expected = config.min_launch_force + charge_speed * DT * held_ticks as f32;
        assert!((fire.launch_force - expected).abs() < 1e-3);
        assert!(fire.launch_force < config.max_launch_force);

        // The same cycle never fires twice.
        for _ in 0..20 {
            assert!(tank.update(&frame(false), DT).fire.is_none());
        }
    }

    #[test]
    fn capped_charge_does_not_fire_again_after_release() {
        let mut tank = controller();
        let mut fires = 0;
        for _ in 0..100 {
            if tank.update(&frame(true), DT).fire.is_some() {
                fires += 1;
            }
        }
        for _ in 0..20 {
            if tank.update(&frame(false), DT).fire.is_some() {
                fires += 1;
            }
        }
        assert_eq!(fires, 1);
    }

    #[test]
    fn force_stays_clamped_over_arbitrary_input() {
        let mut tank = controller();
        let config = *tank.config();
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);

        for _ in 0..2000 {
            tank.update(&frame(rng.gen_bool(0.7)), DT);
            assert!(tank.launch_force() >= config.min_launch_force);
            assert!(tank.launch_force() <= config.max_launch_force);
        }
    }

    #[test]
    fn fresh_press_starts_a_new_cycle() {
        let mut tank = controller();

        // First cycle: quick tap.
        tank.update(&frame(true), DT);
        assert!(tank.update(&frame(false), DT).fire.is_some());

        // Second press resets the fired flag and charges again.
        let events = tank.update(&frame(true), DT);
        assert_eq!(events.audio, Some(AudioCue::Charging));
        for _ in 0..5 {
            tank.update(&frame(true), DT);
        }
        assert!(tank.update(&frame(false), DT).fire.is_some());
    }

    #[test]
    fn local_fire_spawns_shell_along_turret_forward() {
        let mut tank = controller();
        // Swing the turret off-axis first.
        tank.update(
            &InputFrame {
                fire_held: false,
                turret_axis: 1.0,
            },
            DT,
        );
        for _ in 0..10 {
            tank.fixed_update(DT);
        }
        let forward = tank.rig().forward();

        tank.update(&frame(true), DT);
        let events = tank.update(&frame(false), DT);
        let shell = events.shell.expect("release should spawn a shell");
        let fire = events.fire.unwrap();

        assert!((shell.velocity - fire.launch_force * forward).length() < 1e-4);
        assert_eq!(shell.position, fire.position);
    }

    #[test]
    fn remote_fire_spawns_one_shell_with_local_forward() {
        let mut replica = controller();
        replica.update(
            &InputFrame {
                fire_held: false,
                turret_axis: -1.0,
            },
            DT,
        );
        for _ in 0..8 {
            replica.fixed_update(DT);
        }
        let forward = replica.rig().forward();

        let position = Vec3::new(4.0, 1.7, -2.0);
        let shell = replica.apply_remote_fire(position, 21.0);

        assert_eq!(shell.position, position);
        assert!((shell.velocity - 21.0 * forward).length() < 1e-4);
        assert_eq!(replica.launch_force(), replica.config().min_launch_force);
    }

    #[test]
    fn reenable_resets_force_without_residual_charge() {
        let mut tank = controller();
        tank.update(&frame(true), DT);
        for _ in 0..15 {
            tank.update(&frame(true), DT);
        }
        assert!(tank.launch_force() > tank.config().min_launch_force);

        tank.on_enable();
        assert_eq!(tank.launch_force(), tank.config().min_launch_force);
        assert_eq!(tank.aim_slider(), tank.config().min_launch_force);
    }

    #[test]
    fn aim_slider_tracks_charge_and_rests_at_minimum() {
        let mut tank = controller();
        let min = tank.config().min_launch_force;

        assert_eq!(tank.aim_slider(), min);
        tank.update(&frame(true), DT);
        tank.update(&frame(true), DT);
        assert!(tank.aim_slider() > min);
        tank.update(&frame(false), DT);
        assert_eq!(tank.aim_slider(), min);
    }

    #[test]
    fn fire_axis_is_per_player() {
        let tank = ShootingController::new(2, ShootingConfig::default(), Vec3::ZERO);
        assert_eq!(tank.fire_axis(), "Fire2");
    }
}

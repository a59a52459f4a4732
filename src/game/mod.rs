pub mod input;
pub mod shell;
pub mod shooting;
pub mod turret;

pub use input::{FireButton, InputFrame, TURRET_AXIS, fire_axis};
pub use shell::Shell;
pub use shooting::{AudioCue, FireEvent, ShootingConfig, ShootingController, TickEvents};
pub use turret::{Turret, TurretRig};

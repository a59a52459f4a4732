/// Shared turret-turn axis, same binding for every player.
pub const TURRET_AXIS: &str = "HorizontalTurret";

/// Fire button binding for a given player number ("Fire1", "Fire2", ...).
pub fn fire_axis(player_number: u8) -> String {
    format!("Fire{player_number}")
}

/// One tick's raw input sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputFrame {
    pub fire_held: bool,
    pub turret_axis: f32,
}

/// Press/release edges derived from consecutive samples of a button.
#[derive(Clone, Copy, Debug)]
pub struct ButtonState {
    pub just_pressed: bool,
    pub held: bool,
    pub just_released: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FireButton {
    held: bool,
}

impl FireButton {
    pub fn sample(&mut self, held: bool) -> ButtonState {
        let state = ButtonState {
            just_pressed: held && !self.held,
            held,
            just_released: !held && self.held,
        };
        self.held = held;
        state
    }
}

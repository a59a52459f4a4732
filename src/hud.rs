use once_cell::sync::OnceCell;
use parking_lot::Mutex;

static HUD: OnceCell<Hud> = OnceCell::new();

/// Process-wide HUD state.
///
/// The first `Hud::global()` call installs the one instance; every later
/// call gets the same instance back, so a "second HUD" can never exist.
/// There is no teardown: the HUD lives for the rest of the process.
#[derive(Debug)]
pub struct Hud {
    state: Mutex<HudState>,
}

#[derive(Debug, Default)]
struct HudState {
    aim_readout: f32,
    status: String,
}

impl Hud {
    pub fn global() -> &'static Hud {
        HUD.get_or_init(|| Hud {
            state: Mutex::new(HudState::default()),
        })
    }

    /// Current launch-force readout shown next to the aim slider.
    pub fn set_aim_readout(&self, force: f32) {
        self.state.lock().aim_readout = force;
    }

    pub fn aim_readout(&self) -> f32 {
        self.state.lock().aim_readout
    }

    pub fn set_status(&self, status: impl Into<String>) {
        self.state.lock().status = status.into();
    }

    pub fn status(&self) -> String {
        self.state.lock().status.clone()
    }
}

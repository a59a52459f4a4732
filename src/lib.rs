pub mod client;
pub mod game;
pub mod hud;
pub mod protocol;
pub mod server;

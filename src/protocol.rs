use glam::Vec3;
use renet::{ChannelConfig, ConnectionConfig, SendType};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const PROTOCOL_ID: u64 = 0x54_56_4C_59; // "TVLY"

pub const CLIENT_COMMAND_CHANNEL: u8 = 0;
pub const CLIENT_FIRE_CHANNEL: u8 = 1;
pub const SERVER_RELIABLE_CHANNEL: u8 = 0;
pub const SERVER_FIRE_CHANNEL: u8 = 1;

const CHANNEL_MEMORY_BUDGET: usize = 256 * 1024;
const RESEND_MS: u64 = 150;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

pub fn serialize_client_message(message: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    bincode::serialize(message).map_err(ProtocolError::from)
}

pub fn deserialize_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    bincode::deserialize(data).map_err(ProtocolError::from)
}

pub fn serialize_server_message(message: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    bincode::serialize(message).map_err(ProtocolError::from)
}

pub fn deserialize_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    bincode::deserialize(data).map_err(ProtocolError::from)
}

/// Roster traffic is reliable-ordered; fire notifications ride an
/// unreliable channel. A fire is one-way and never retried: a peer
/// that misses the packet simply never spawns that shell.
pub fn connection_config() -> ConnectionConfig {
    ConnectionConfig {
        available_bytes_per_tick: 60_000,
        server_channels_config: vec![
            ChannelConfig {
                channel_id: SERVER_RELIABLE_CHANNEL,
                max_memory_usage_bytes: CHANNEL_MEMORY_BUDGET,
                send_type: SendType::ReliableOrdered {
                    resend_time: Duration::from_millis(RESEND_MS),
                },
            },
            ChannelConfig {
                channel_id: SERVER_FIRE_CHANNEL,
                max_memory_usage_bytes: CHANNEL_MEMORY_BUDGET,
                send_type: SendType::Unreliable,
            },
        ],
        client_channels_config: vec![
            ChannelConfig {
                channel_id: CLIENT_COMMAND_CHANNEL,
                max_memory_usage_bytes: CHANNEL_MEMORY_BUDGET,
                send_type: SendType::ReliableOrdered {
                    resend_time: Duration::from_millis(RESEND_MS),
                },
            },
            ChannelConfig {
                channel_id: CLIENT_FIRE_CHANNEL,
                max_memory_usage_bytes: CHANNEL_MEMORY_BUDGET,
                send_type: SendType::Unreliable,
            },
        ],
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub enum ClientMessage {
    Join {
        nickname: String,
        player_number: u8,
    },
    Leave,
    /// A locally simulated fire, relayed verbatim to every other peer.
    Fire {
        position: Vec3,
        launch_force: f32,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub enum ServerMessage {
    JoinOk {
        roster: Vec<PeerSummary>,
    },
    JoinError {
        error: String,
    },
    PeerJoined {
        peer: PeerSummary,
    },
    PeerLeft {
        client_id: u64,
    },
    RemoteFire {
        shooter: u64,
        position: Vec3,
        launch_force: f32,
    },
    ServerError {
        code: u16,
        message: String,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeerSummary {
    pub client_id: u64,
    pub nickname: String,
    pub player_number: u8,
}

mod state;

use self::state::{LeaveOutcome, SharedState, StateError};
use crate::protocol::{
    CLIENT_COMMAND_CHANNEL, CLIENT_FIRE_CHANNEL, ClientMessage, PROTOCOL_ID,
    SERVER_FIRE_CHANNEL, SERVER_RELIABLE_CHANNEL, ServerMessage, connection_config,
    deserialize_client_message, serialize_server_message,
};
use anyhow::{Context, Result};
use bytes::Bytes;
use glam::Vec3;
use renet::{ClientId, RenetServer, ServerEvent};
use renet_netcode::{
    NetcodeServerTransport, ServerAuthentication, ServerConfig as NetcodeServerConfig,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub struct ServerOptions {
    pub bind_addr: SocketAddr,
    pub max_clients: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".parse().expect("valid socket"),
            max_clients: 64,
        }
    }
}

/// Relay loop. The server never simulates tanks: peers run their own
/// charge/fire cycles and the server forwards each fire notification to
/// every other joined peer, fire-and-forget.
pub async fn run(options: ServerOptions) -> Result<()> {
    info!("starting tank_volley relay on {}", options.bind_addr);
    let state = SharedState::new();

    let socket = std::net::UdpSocket::bind(options.bind_addr).context("bind UDP socket")?;
    let netcode_config = NetcodeServerConfig {
        current_time: Duration::ZERO,
        max_clients: options.max_clients,
        protocol_id: PROTOCOL_ID,
        public_addresses: vec![options.bind_addr],
        authentication: ServerAuthentication::Unsecure,
    };

    let connection_config = connection_config();
    let mut renet_server = RenetServer::new(connection_config);
    let mut transport = NetcodeServerTransport::new(netcode_config, socket)?;

    let mut last_tick = Instant::now();
    let mut interval = tokio::time::interval(Duration::from_millis(16));

    loop {
        interval.tick().await;
        let now = Instant::now();
        let delta = now - last_tick;
        last_tick = now;
        renet_server.update(delta);
        transport.update(delta, &mut renet_server)?;

        process_events(&mut renet_server, &state);
        process_messages(&mut renet_server, &state);

        transport.send_packets(&mut renet_server);
    }
}

fn process_events(server: &mut RenetServer, state: &Arc<SharedState>) {
    while let Some(event) = server.get_event() {
        match event {
            ServerEvent::ClientConnected { client_id } => {
                state.register_client(client_id);
                info!("client {} connected", client_id);
            }
            ServerEvent::ClientDisconnected { client_id, reason } => {
                info!("client {} disconnected: {:?}", client_id, reason);
                if let Some(outcome) = state.unregister_client(client_id) {
                    send_peer_left(server, client_id, outcome);
                }
            }
        }
    }
}

fn process_messages(server: &mut RenetServer, state: &Arc<SharedState>) {
    for client_id in server.clients_id() {
        while let Some(bytes) = server.receive_message(client_id, CLIENT_COMMAND_CHANNEL) {
            match deserialize_client_message(bytes.as_ref()) {
                Ok(message) => handle_command(server, state, client_id, message),
                Err(err) => {
                    warn!("failed to deserialize message from {}: {}", client_id, err);
                    send_reliable(
                        server,
                        client_id,
                        ServerMessage::ServerError {
                            code: 4001,
                            message: "invalid payload".to_string(),
                        },
                    );
                }
            }
        }

        while let Some(bytes) = server.receive_message(client_id, CLIENT_FIRE_CHANNEL) {
            match deserialize_client_message(bytes.as_ref()) {
                Ok(ClientMessage::Fire {
                    position,
                    launch_force,
                }) => relay_fire(server, state, client_id, position, launch_force),
                Ok(other) => {
                    warn!("unexpected {:?} on fire channel from {}", other, client_id);
                }
                Err(err) => {
                    warn!("undecodable fire packet from {}: {}", client_id, err);
                }
            }
        }
    }
}

fn handle_command(
    server: &mut RenetServer,
    state: &Arc<SharedState>,
    client_id: ClientId,
    message: ClientMessage,
) {
    match message {
        ClientMessage::Join {
            nickname,
            player_number,
        } => match state.join(client_id, nickname, player_number) {
            Ok(outcome) => {
                send_reliable(
                    server,
                    client_id,
                    ServerMessage::JoinOk {
                        roster: outcome.roster,
                    },
                );
                let joined = ServerMessage::PeerJoined { peer: outcome.peer };
                send_to_many(server, &outcome.notify, &joined);
            }
            Err(err) => send_reliable(
                server,
                client_id,
                ServerMessage::JoinError {
                    error: err.to_string(),
                },
            ),
        },
        ClientMessage::Leave => match state.leave(client_id) {
            Ok(outcome) => send_peer_left(server, client_id, outcome),
            Err(err @ StateError::NotJoined) => {
                debug!("client {} left without joining: {}", client_id, err);
            }
            Err(err) => send_reliable(
                server,
                client_id,
                ServerMessage::ServerError {
                    code: 4002,
                    message: err.to_string(),
                },
            ),
        },
        // Tolerated on the reliable channel too; same relay either way.
        ClientMessage::Fire {
            position,
            launch_force,
        } => relay_fire(server, state, client_id, position, launch_force),
    }
}

fn relay_fire(
    server: &mut RenetServer,
    state: &Arc<SharedState>,
    shooter: ClientId,
    position: Vec3,
    launch_force: f32,
) {
    let recipients = state.fire_recipients(shooter);
    if recipients.is_empty() {
        debug!("dropping fire from {}: no joined recipients", shooter);
        return;
    }
    debug!(
        "relaying fire from {} (force {:.2}) to {} peers",
        shooter,
        launch_force,
        recipients.len()
    );
    let message = ServerMessage::RemoteFire {
        shooter,
        position,
        launch_force,
    };
    match serialize_server_message(&message) {
        Ok(payload) => {
            let bytes = Bytes::from(payload);
            for client_id in recipients {
                server.send_message(client_id, SERVER_FIRE_CHANNEL, bytes.clone());
            }
        }
        Err(err) => error!("failed to encode fire relay: {}", err),
    }
}

fn send_peer_left(server: &mut RenetServer, client_id: ClientId, outcome: LeaveOutcome) {
    let message = ServerMessage::PeerLeft { client_id };
    send_to_many(server, &outcome.notify, &message);
}

fn send_to_many(server: &mut RenetServer, recipients: &[ClientId], message: &ServerMessage) {
    match serialize_server_message(message) {
        Ok(payload) => {
            let bytes = Bytes::from(payload);
            for client_id in recipients {
                server.send_message(*client_id, SERVER_RELIABLE_CHANNEL, bytes.clone());
            }
        }
        Err(err) => error!("failed to serialize server message: {}", err),
    }
}

fn send_reliable(server: &mut RenetServer, client_id: ClientId, message: ServerMessage) {
    match serialize_server_message(&message) {
        Ok(payload) => {
            server.send_message(client_id, SERVER_RELIABLE_CHANNEL, Bytes::from(payload))
        }
        Err(err) => error!("failed to serialize server message: {}", err),
    }
}

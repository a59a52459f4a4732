use crate::game::{AudioCue, InputFrame, ShootingConfig, ShootingController};
use crate::hud::Hud;
use crate::protocol::{
    CLIENT_COMMAND_CHANNEL, CLIENT_FIRE_CHANNEL, ClientMessage, PROTOCOL_ID,
    SERVER_FIRE_CHANNEL, SERVER_RELIABLE_CHANNEL, ServerMessage, connection_config,
    deserialize_server_message, serialize_client_message,
};
use anyhow::{Context, Result};
use bytes::Bytes;
use glam::Vec3;
use rand::random;
use renet::RenetClient;
use renet_netcode::{ClientAuthentication, NetcodeClientTransport};
use std::collections::HashMap;
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(16);
const TICK_SECONDS: f32 = 0.016;

/// Scripted peer: joins the arena, runs one tank through a hold-to-max
/// cycle and an early-release cycle while sweeping the turret, relays its
/// fire events, and mirrors every remote fire into a local replica tank.
pub async fn run(args: ClientArgs) -> Result<()> {
    let mut client = RenetClient::new(connection_config());
    let socket = UdpSocket::bind("0.0.0.0:0").context("bind local udp")?;
    let auth = ClientAuthentication::Unsecure {
        protocol_id: PROTOCOL_ID,
        client_id: args.client_id,
        server_addr: args.server_addr,
        user_data: None,
    };
    let mut transport = NetcodeClientTransport::new(Duration::ZERO, auth, socket)?;

    let mut tank = ShootingController::new(
        args.player_number,
        ShootingConfig::default(),
        Vec3::ZERO,
    );
    let mut replicas: HashMap<u64, ShootingController> = HashMap::new();

    let mut interval = tokio::time::interval(TICK);
    let mut join_sent = false;
    let mut joined = false;
    let start = Instant::now();
    let mut tick: u64 = 0;

    Hud::global().set_status("connecting");

    loop {
        interval.tick().await;
        client.update(TICK);
        transport.update(TICK, &mut client).ok();

        if client.is_connected() && !join_sent {
            send_client_message(
                &mut client,
                ClientMessage::Join {
                    nickname: args.nickname.clone(),
                    player_number: args.player_number,
                },
            )?;
            join_sent = true;
        }

        process_server_messages(&mut client, &mut replicas, &mut joined);

        if joined {
            tick = tick.wrapping_add(1);
            let frame = scripted_frame(tick);
            let events = tank.update(&frame, TICK_SECONDS);
            tank.fixed_update(TICK_SECONDS);

            Hud::global().set_aim_readout(tank.aim_slider());
            match events.audio {
                Some(AudioCue::Charging) => {
                    Hud::global().set_status("charging");
                    tracing::debug!("charging audio cue");
                }
                Some(AudioCue::Fire) => {
                    Hud::global().set_status("fired");
                    tracing::debug!("fire audio cue");
                }
                None => {}
            }

            if let Some(shell) = events.shell {
                tracing::info!(
                    "local shell at {:?} with velocity {:?}",
                    shell.position,
                    shell.velocity
                );
            }
            if let Some(fire) = events.fire {
                let bytes = serialize_client_message(&ClientMessage::Fire {
                    position: fire.position,
                    launch_force: fire.launch_force,
                })?;
                client.send_message(CLIENT_FIRE_CHANNEL, Bytes::from(bytes));
            }
        }

        transport.send_packets(&mut client).ok();

        if start.elapsed() > Duration::from_secs(30) {
            break;
        }
    }

    send_client_message(&mut client, ClientMessage::Leave)?;
    transport.send_packets(&mut client).ok();
    Ok(())
}

/// Canned input: one hold-to-max cycle, one early-release cycle, repeat,
/// with the turret axis flipping direction every second or so.
fn scripted_frame(tick: u64) -> InputFrame {
    let phase = tick % 400;
    // 60 ticks held at 16 ms is ~0.96 s, past the 0.75 s charge cap.
    let fire_held = (60..120).contains(&phase) || (220..240).contains(&phase);
    let turret_axis = if (tick / 70) % 2 == 0 { 1.0 } else { -1.0 };
    InputFrame {
        fire_held,
        turret_axis,
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
}

pub struct ClientArgs {
    pub nickname: String,
    pub server_addr: SocketAddr,
    pub player_number: u8,
    pub client_id: u64,
}

impl ClientArgs {
    pub fn parse() -> Result<Self> {
        let mut args = std::env::args().skip(1);
        let nickname = args.next().unwrap_or_else(|| "Rumble".to_string());
        let server_addr = args
            .next()
            .unwrap_or_else(|| "127.0.0.1:5000".to_string())
            .parse()
            .context("invalid server address")?;
        let player_number = args
            .next()
            .unwrap_or_else(|| "1".to_string())
            .parse()
            .context("invalid player number")?;
        Ok(Self {
            nickname,
            server_addr,
            player_number,
            client_id: random(),
        })
    }
}

fn process_server_messages(
    client: &mut RenetClient,
    replicas: &mut HashMap<u64, ShootingController>,
    joined: &mut bool,
) {
    while let Some(bytes) = client.receive_message(SERVER_RELIABLE_CHANNEL) {
        if let Ok(message) = deserialize_server_message(bytes.as_ref()) {
            match message {
                ServerMessage::JoinOk { roster } => {
                    *joined = true;
                    tracing::info!("joined arena with {} peers", roster.len());
                    for peer in roster {
                        replicas.entry(peer.client_id).or_insert_with(|| {
                            replica_tank(peer.player_number)
                        });
                    }
                }
                ServerMessage::JoinError { error } => {
                    tracing::warn!("join rejected: {}", error);
                }
                ServerMessage::PeerJoined { peer } => {
                    tracing::info!("peer {} joined as player {}", peer.nickname, peer.player_number);
                    replicas.insert(peer.client_id, replica_tank(peer.player_number));
                }
                ServerMessage::PeerLeft { client_id } => {
                    tracing::info!("peer {} left", client_id);
                    replicas.remove(&client_id);
                }
                ServerMessage::ServerError { code, message } => {
                    tracing::warn!("server error {}: {}", code, message);
                }
                ServerMessage::RemoteFire { .. } => {}
            }
        }
    }

    while let Some(bytes) = client.receive_message(SERVER_FIRE_CHANNEL) {
        if let Ok(ServerMessage::RemoteFire {
            shooter,
            position,
            launch_force,
        }) = deserialize_server_message(bytes.as_ref())
        {
            // Unknown shooters still get a replica; the fire beat the
            // roster update.
            let replica = replicas
                .entry(shooter)
                .or_insert_with(|| replica_tank(0));
            let shell = replica.apply_remote_fire(position, launch_force);
            tracing::info!(
                "remote shell from {} at {:?} with velocity {:?}",
                shooter,
                shell.position,
                shell.velocity
            );
        }
    }
}

fn replica_tank(player_number: u8) -> ShootingController {
    ShootingController::new(player_number, ShootingConfig::default(), Vec3::ZERO)
}

fn send_client_message(client: &mut RenetClient, message: ClientMessage) -> Result<()> {
    let bytes = serialize_client_message(&message)?;
    client.send_message(CLIENT_COMMAND_CHANNEL, Bytes::from(bytes));
    Ok(())
}

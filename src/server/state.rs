use crate::protocol::PeerSummary;
use parking_lot::RwLock;
use renet::ClientId;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub(super) enum StateError {
    #[error("client is not registered")]
    UnknownClient,
    #[error("client already joined the arena")]
    AlreadyJoined,
    #[error("player number {0} already taken")]
    PlayerNumberTaken(u8),
    #[error("client has not joined the arena")]
    NotJoined,
}

#[derive(Debug, Clone)]
pub(super) struct JoinOutcome {
    /// Roster sent back to the joiner, including itself.
    pub roster: Vec<PeerSummary>,
    /// Peers that should hear about the join.
    pub notify: Vec<ClientId>,
    pub peer: PeerSummary,
}

#[derive(Debug, Clone)]
pub(super) struct LeaveOutcome {
    pub notify: Vec<ClientId>,
}

/// Connected clients and which of them joined the single arena.
///
/// The arena holds no gameplay state: tanks simulate on their own peers
/// and the server only needs to know who to relay fire events to.
#[derive(Debug)]
pub(super) struct SharedState {
    sessions: RwLock<BTreeMap<ClientId, Session>>,
}

#[derive(Debug, Clone)]
struct Session {
    peer: Option<PeerSummary>,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(BTreeMap::new()),
        })
    }

    pub fn register_client(&self, client_id: ClientId) {
        let mut sessions = self.sessions.write();
        sessions.entry(client_id).or_insert(Session { peer: None });
    }

    pub fn unregister_client(&self, client_id: ClientId) -> Option<LeaveOutcome> {
        let mut sessions = self.sessions.write();
        let session = sessions.remove(&client_id)?;
        session.peer.as_ref()?;
        Some(LeaveOutcome {
            notify: joined_except(&sessions, client_id),
        })
    }

    pub fn join(
        &self,
        client_id: ClientId,
        nickname: String,
        player_number: u8,
    ) -> Result<JoinOutcome, StateError> {
        let mut sessions = self.sessions.write();
        if !sessions.contains_key(&client_id) {
            return Err(StateError::UnknownClient);
        }
        if sessions
            .get(&client_id)
            .is_some_and(|session| session.peer.is_some())
        {
            return Err(StateError::AlreadyJoined);
        }
        if sessions.values().any(|session| {
            session
                .peer
                .as_ref()
                .is_some_and(|peer| peer.player_number == player_number)
        }) {
            return Err(StateError::PlayerNumberTaken(player_number));
        }

        let peer = PeerSummary {
            client_id,
            nickname,
            player_number,
        };
        let notify = joined_except(&sessions, client_id);
        if let Some(session) = sessions.get_mut(&client_id) {
            session.peer = Some(peer.clone());
        }
        let roster = sessions
            .values()
            .filter_map(|session| session.peer.clone())
            .collect();
        Ok(JoinOutcome {
            roster,
            notify,
            peer,
        })
    }

    pub fn leave(&self, client_id: ClientId) -> Result<LeaveOutcome, StateError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(&client_id)
            .ok_or(StateError::UnknownClient)?;
        if session.peer.take().is_none() {
            return Err(StateError::NotJoined);
        }
        Ok(LeaveOutcome {
            notify: joined_except(&sessions, client_id),
        })
    }

    /// Everyone a fire from `shooter` gets relayed to. Empty when the
    /// shooter never joined.
    pub fn fire_recipients(&self, shooter: ClientId) -> Vec<ClientId> {
        let sessions = self.sessions.read();
        if !sessions
            .get(&shooter)
            .is_some_and(|session| session.peer.is_some())
        {
            return Vec::new();
        }
        joined_except(&sessions, shooter)
    }
}

fn joined_except(sessions: &BTreeMap<ClientId, Session>, exclude: ClientId) -> Vec<ClientId> {
    sessions
        .iter()
        .filter(|(id, session)| **id != exclude && session.peer.is_some())
        .map(|(id, _)| *id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_reports_existing_peers_and_notifies_them() {
        let state = SharedState::new();
        state.register_client(1);
        state.register_client(2);

        let first = state.join(1, "Rumble".into(), 1).unwrap();
        assert!(first.notify.is_empty());
        assert_eq!(first.roster.len(), 1);

        let second = state.join(2, "Clank".into(), 2).unwrap();
        assert_eq!(second.notify, vec![1]);
        assert_eq!(second.roster.len(), 2);
        assert_eq!(second.peer.player_number, 2);
    }

    #[test]
    fn duplicate_player_number_is_rejected() {
        let state = SharedState::new();
        state.register_client(1);
        state.register_client(2);
        state.join(1, "Rumble".into(), 1).unwrap();

        let err = state.join(2, "Clank".into(), 1).unwrap_err();
        assert!(matches!(err, StateError::PlayerNumberTaken(1)));
    }

    #[test]
    fn double_join_is_rejected() {
        let state = SharedState::new();
        state.register_client(1);
        state.join(1, "Rumble".into(), 1).unwrap();
        let err = state.join(1, "Rumble".into(), 2).unwrap_err();
        assert!(matches!(err, StateError::AlreadyJoined));
    }

    #[test]
    fn fire_relay_reaches_every_joined_peer_except_the_shooter() {
        let state = SharedState::new();
        for id in 1..=4 {
            state.register_client(id);
        }
        state.join(1, "a".into(), 1).unwrap();
        state.join(2, "b".into(), 2).unwrap();
        state.join(3, "c".into(), 3).unwrap();
        // Client 4 connected but never joined.

        assert_eq!(state.fire_recipients(2), vec![1, 3]);
        assert!(state.fire_recipients(4).is_empty());
    }

    #[test]
    fn leave_and_disconnect_notify_the_rest() {
        let state = SharedState::new();
        state.register_client(1);
        state.register_client(2);
        state.join(1, "a".into(), 1).unwrap();
        state.join(2, "b".into(), 2).unwrap();

        let left = state.leave(1).unwrap();
        assert_eq!(left.notify, vec![2]);
        assert!(matches!(state.leave(1), Err(StateError::NotJoined)));

        let dropped = state.unregister_client(2).unwrap();
        assert!(dropped.notify.is_empty());
    }
}
